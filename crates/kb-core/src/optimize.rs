//! Fixed-joint optimization
//!
//! Bodies connected through joints that cannot move are merged into the
//! nearest ancestor that can, so a physics engine sees one rigid body instead
//! of a welded chain. The merged-away links stay in the scene graph with
//! their visuals and collisions; only their mass properties move.

use glam::{DMat3, DVec3};
use serde::{Deserialize, Serialize};

use crate::assembly::LinkId;
use crate::convert::Transform;
use crate::inertial::RigidBody;
use crate::math::diagonalize;
use crate::model::KinematicModel;

/// Mass properties as a full tensor, for accumulation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MergedBody {
    pub mass: f64,
    pub center_of_mass: DVec3,
    /// About `center_of_mass`, in the accumulating frame
    pub inertia: DMat3,
    pub linear_damping: f64,
    pub angular_damping: f64,
}

impl MergedBody {
    /// Express `body` in a frame where its link sits at `transform`
    pub fn from_body(body: &RigidBody, transform: &Transform) -> Self {
        let rotation = DMat3::from_quat(transform.rotation);
        Self {
            mass: body.mass,
            center_of_mass: transform.transform_point(body.center_of_mass),
            inertia: rotation * body.inertia_tensor() * rotation.transpose(),
            linear_damping: body.linear_damping,
            angular_damping: body.angular_damping,
        }
    }

    /// Combine two bodies expressed in the same frame
    pub fn combine(&self, other: &MergedBody) -> MergedBody {
        let mass = self.mass + other.mass;
        let (wa, wb) = if mass > 0.0 {
            (self.mass / mass, other.mass / mass)
        } else {
            (0.5, 0.5)
        };
        let center_of_mass = self.center_of_mass * wa + other.center_of_mass * wb;

        let inertia = self.shifted_inertia(center_of_mass) + other.shifted_inertia(center_of_mass);

        MergedBody {
            mass,
            center_of_mass,
            inertia,
            linear_damping: self.linear_damping * wa + other.linear_damping * wb,
            angular_damping: self.angular_damping * wa + other.angular_damping * wb,
        }
    }

    /// Inertia about `point`: I + m (|d|² E − d dᵗ)
    fn shifted_inertia(&self, point: DVec3) -> DMat3 {
        let d = self.center_of_mass - point;
        let outer = DMat3::from_cols(d * d.x, d * d.y, d * d.z);
        self.inertia + (DMat3::IDENTITY * d.length_squared() - outer) * self.mass
    }

    /// Re-diagonalize into a body; mode and flags come from `template`
    pub fn into_body(self, template: &RigidBody) -> RigidBody {
        RigidBody {
            mass: self.mass,
            center_of_mass: self.center_of_mass,
            inertial_axis_rotation: glam::DQuat::IDENTITY,
            principal: diagonalize(&self.inertia),
            calculation_mode: template.calculation_mode,
            mode_declared: template.mode_declared,
            linear_damping: self.linear_damping,
            angular_damping: self.angular_damping,
        }
    }
}

/// One body moved across a rigid joint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeRecord {
    pub joint: String,
    pub child: String,
    pub into: String,
}

/// What [`optimize_fixed_joints`] did
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptimizationReport {
    pub merges: Vec<MergeRecord>,
    /// Links behind rigid joints that had no body to merge
    pub skipped_without_body: Vec<String>,
}

/// Merge every body behind a rigid joint into its nearest movable ancestor
pub fn optimize_fixed_joints(model: &mut KinematicModel) -> OptimizationReport {
    let mut report = OptimizationReport::default();

    for child in model.links_breadth_first() {
        let Some(joint_id) = model.link(child).joint else {
            continue;
        };
        if !model.joint(joint_id).is_rigid() {
            continue;
        }
        let joint_name = model.joint(joint_id).name.clone();

        let Some(body) = model.link(child).body else {
            tracing::debug!(
                "Skipping '{}' behind rigid joint '{}': no body",
                model.link(child).name,
                joint_name
            );
            report
                .skipped_without_body
                .push(model.link(child).name.clone());
            continue;
        };

        let (target, transform) = merge_target(model, child);
        let incoming = MergedBody::from_body(&body, &transform);

        let merged = match model.link(target).body {
            Some(existing) => MergedBody::from_body(&existing, &Transform::IDENTITY)
                .combine(&incoming)
                .into_body(&existing),
            None => incoming.into_body(&body),
        };

        tracing::debug!(
            "Merged '{}' into '{}' across '{}': mass {}",
            model.link(child).name,
            model.link(target).name,
            joint_name,
            merged.mass
        );

        model.link_mut(target).body = Some(merged);
        let link = model.link_mut(child);
        link.body = None;
        link.merged_into = Some(target);

        report.merges.push(MergeRecord {
            joint: joint_name,
            child: model.link(child).name.clone(),
            into: model.link(target).name.clone(),
        });
    }

    report
}

/// Nearest ancestor whose own incoming joint is movable, and `child`'s
/// transform relative to it
fn merge_target(model: &KinematicModel, child: LinkId) -> (LinkId, Transform) {
    let mut transform = model.link(child).local_transform;
    let mut target = match model.link(child).parent {
        Some(parent) => parent,
        None => return (child, Transform::IDENTITY),
    };

    loop {
        let link = model.link(target);
        let rigid = link.joint.is_some_and(|j| model.joint(j).is_rigid());
        match link.parent {
            Some(parent) if rigid => {
                transform = link.local_transform.mul_transform(&transform);
                target = parent;
            }
            _ => return (target, transform),
        }
    }
}
