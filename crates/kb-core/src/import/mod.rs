//! URDF import functionality
//!
//! Reads URDF XML into a [`RobotDescription`]. Structural checks (unknown
//! links, multiple parents, cycles) happen later in [`crate::assembly`];
//! only problems visible while reading the document are reported here.

mod options;
mod parser;

use std::path::Path;

use crate::description::RobotDescription;
use crate::diagnostics::WarningSink;

pub use options::ImportOptions;

/// Errors that can occur during URDF import
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ImportError {
    #[error("Failed to parse XML: {0}")]
    Xml(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Missing required element <{element}> in {context}")]
    MissingElement {
        element: &'static str,
        context: String,
    },

    #[error("Missing required attribute '{attribute}' on <{element}>")]
    MissingAttribute {
        attribute: &'static str,
        element: String,
    },

    #[error("Invalid value for '{attribute}' on <{element}>: {reason}")]
    InvalidAttribute {
        attribute: &'static str,
        element: String,
        reason: String,
    },

    #[error("Joint '{joint}' has unknown type '{joint_type}'")]
    UnknownJointType { joint: String, joint_type: String },

    #[error("Invalid name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    #[error("Empty URDF: no links defined")]
    EmptyRobot,
}

impl ImportError {
    pub(crate) fn missing_element(element: &'static str, context: impl Into<String>) -> Self {
        Self::MissingElement {
            element,
            context: context.into(),
        }
    }

    pub(crate) fn missing_attribute(attribute: &'static str, element: impl Into<String>) -> Self {
        Self::MissingAttribute {
            attribute,
            element: element.into(),
        }
    }

    pub(crate) fn invalid_attribute(
        attribute: &'static str,
        element: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidAttribute {
            attribute,
            element: element.into(),
            reason: reason.into(),
        }
    }
}

impl From<quick_xml::Error> for ImportError {
    fn from(e: quick_xml::Error) -> Self {
        ImportError::Xml(e.to_string())
    }
}

/// Parse a URDF document held in memory
pub fn parse_robot_str(
    xml: &str,
    sink: &mut dyn WarningSink,
) -> Result<RobotDescription, ImportError> {
    parser::parse_document(xml, sink)
}

/// Read and parse a URDF file
pub fn parse_robot_file(
    path: impl AsRef<Path>,
    sink: &mut dyn WarningSink,
) -> Result<RobotDescription, ImportError> {
    let path = path.as_ref();
    let xml = std::fs::read_to_string(path)
        .map_err(|e| ImportError::Io(format!("{}: {}", path.display(), e)))?;
    parse_robot_str(&xml, sink)
}
