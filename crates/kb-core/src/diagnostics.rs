//! Recoverable warnings raised while importing a robot description
//!
//! Fatal problems are returned as errors; everything here is informational and
//! never stops processing. Callers inject a [`WarningSink`] and decide what to
//! do with the collected warnings.

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::description::InertiaCalculationMode;

/// A recoverable numeric problem found in the input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
pub enum Warning {
    #[error("Joint '{joint}': axis magnitude too small, using default (1, 0, 0)")]
    AxisTooSmall { joint: String },

    #[error("Link '{link}': mass {mass} is below the minimum, clamped to {clamped}")]
    MassClamped {
        link: String,
        mass: f64,
        clamped: f64,
    },

    #[error("Link '{link}': principal inertia {original} clamped to {clamped}")]
    InertiaClamped {
        link: String,
        original: DVec3,
        clamped: DVec3,
    },

    #[error(
        "No inertia calculation mode configured, defaulting to '{mode}'; \
         set one explicitly to control whether the engine recomputes inertia"
    )]
    CalculationModeDefaulted { mode: InertiaCalculationMode },
}

/// Destination for warnings produced by the core
pub trait WarningSink {
    fn warn(&mut self, warning: Warning);
}

/// Ordered warning accumulator
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Warnings {
    items: Vec<Warning>,
}

impl Warnings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Warning> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[Warning] {
        &self.items
    }

    pub fn into_vec(self) -> Vec<Warning> {
        self.items
    }

    /// Append everything from another collector, keeping order
    pub fn extend(&mut self, other: Warnings) {
        self.items.extend(other.items);
    }
}

impl WarningSink for Warnings {
    fn warn(&mut self, warning: Warning) {
        tracing::warn!("{}", warning);
        self.items.push(warning);
    }
}

impl<'a> IntoIterator for &'a Warnings {
    type Item = &'a Warning;
    type IntoIter = std::slice::Iter<'a, Warning>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warnings_keep_order() {
        let mut warnings = Warnings::new();
        warnings.warn(Warning::AxisTooSmall {
            joint: "a".to_string(),
        });
        warnings.warn(Warning::AxisTooSmall {
            joint: "b".to_string(),
        });

        let joints: Vec<_> = warnings
            .iter()
            .map(|w| match w {
                Warning::AxisTooSmall { joint } => joint.as_str(),
                _ => "",
            })
            .collect();
        assert_eq!(joints, vec!["a", "b"]);
    }

    #[test]
    fn test_warning_display_names_joint() {
        let warning = Warning::AxisTooSmall {
            joint: "elbow".to_string(),
        };
        assert!(warning.to_string().contains("elbow"));
    }
}
