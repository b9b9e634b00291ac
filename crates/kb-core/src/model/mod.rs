//! In-memory kinematic model in the target convention
//!
//! An arena of links and joints indexed by [`LinkId`] / [`JointId`], in the
//! same order as the description they were imported from. Each link stores
//! its transform relative to its scene-graph parent, which is the origin of
//! its incoming joint.

mod build;
mod mesh;

use glam::{DMat3, DQuat, DVec3};
use serde::{Deserialize, Serialize};

use crate::assembly::{JointId, LinkId};
use crate::convert::{ConversionSettings, Transform};
use crate::description::{
    Calibration, JointDynamics, JointLimit, JointMimic, JointType, MaterialDescription,
    PluginBlock, SafetyController,
};
use crate::inertial::RigidBody;

pub use build::{ImportResult, ModelError, import_model, import_robot_file, import_robot_str};
pub(crate) use build::scale_joint_positions;
pub use mesh::{MeshHandle, MeshResolver, NoMeshResolver, UuidMeshResolver};

/// Shape in target units and axes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ModelGeometry {
    Box {
        size: DVec3,
    },
    /// `axis` is the cylinder's long axis in the element frame
    Cylinder {
        radius: f64,
        length: f64,
        axis: DVec3,
    },
    Capsule {
        radius: f64,
        length: f64,
        axis: DVec3,
    },
    Sphere {
        radius: f64,
    },
    Mesh {
        filename: String,
        handle: Option<MeshHandle>,
        scale: Option<DVec3>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelVisual {
    pub name: Option<String>,
    pub local_transform: Transform,
    pub geometry: ModelGeometry,
    pub material: Option<MaterialDescription>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelCollision {
    pub name: Option<String>,
    pub local_transform: Transform,
    pub geometry: ModelGeometry,
}

/// A link in the scene graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelLink {
    pub name: String,
    pub parent: Option<LinkId>,
    /// Relative to `parent`; identity for the root
    pub local_transform: Transform,
    /// Incoming joint
    pub joint: Option<JointId>,
    pub body: Option<RigidBody>,
    pub visuals: Vec<ModelVisual>,
    pub collisions: Vec<ModelCollision>,
    /// Set when the fixed-joint optimizer moved this link's body elsewhere
    pub merged_into: Option<LinkId>,
}

impl ModelLink {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            local_transform: Transform::IDENTITY,
            joint: None,
            body: None,
            visuals: Vec::new(),
            collisions: Vec::new(),
            merged_into: None,
        }
    }
}

/// A joint in target axes; its origin is the child's `local_transform`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelJoint {
    pub name: String,
    pub joint_type: JointType,
    pub parent: LinkId,
    pub child: LinkId,
    pub axis: DVec3,
    /// Prismatic positions and velocities are in target length units
    pub limit: Option<JointLimit>,
    pub dynamics: Option<JointDynamics>,
    pub mimic: Option<JointMimic>,
    pub calibration: Option<Calibration>,
    pub safety_controller: Option<SafetyController>,
}

impl ModelJoint {
    /// Fixed joints, and revolute joints whose limits allow no motion
    pub fn is_rigid(&self) -> bool {
        match self.joint_type {
            JointType::Fixed => true,
            JointType::Revolute => self.limit.is_some_and(|limit| limit.is_zero_range()),
            _ => false,
        }
    }
}

/// Converted robot ready for a physics or rendering engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KinematicModel {
    pub name: String,
    pub links: Vec<ModelLink>,
    pub joints: Vec<ModelJoint>,
    pub root: LinkId,
    pub conversion: ConversionSettings,
    pub materials: Vec<MaterialDescription>,
    pub collision_ignore: Vec<(String, String)>,
    pub plugins: Vec<PluginBlock>,
}

impl KinematicModel {
    pub fn link(&self, id: LinkId) -> &ModelLink {
        &self.links[id.0]
    }

    pub fn link_mut(&mut self, id: LinkId) -> &mut ModelLink {
        &mut self.links[id.0]
    }

    pub fn joint(&self, id: JointId) -> &ModelJoint {
        &self.joints[id.0]
    }

    pub fn link_id(&self, name: &str) -> Option<LinkId> {
        self.links.iter().position(|l| l.name == name).map(LinkId)
    }

    pub fn link_by_name(&self, name: &str) -> Option<&ModelLink> {
        self.links.iter().find(|l| l.name == name)
    }

    pub fn joint_by_name(&self, name: &str) -> Option<&ModelJoint> {
        self.joints.iter().find(|j| j.name == name)
    }

    /// Direct children in link order
    pub fn children(&self, id: LinkId) -> Vec<LinkId> {
        self.links
            .iter()
            .enumerate()
            .filter(|(_, link)| link.parent == Some(id))
            .map(|(i, _)| LinkId(i))
            .collect()
    }

    /// Links in parent-to-child order starting at the root
    pub fn links_breadth_first(&self) -> Vec<LinkId> {
        let mut order = vec![self.root];
        let mut next = 0;
        while next < order.len() {
            let children = self.children(order[next]);
            order.extend(children);
            next += 1;
        }
        order
    }

    /// Transform of `id` relative to the root
    pub fn world_transform(&self, id: LinkId) -> Transform {
        let mut transform = self.link(id).local_transform;
        let mut current = self.link(id).parent;
        while let Some(parent) = current {
            let link = self.link(parent);
            transform = link.local_transform.mul_transform(&transform);
            current = link.parent;
        }
        transform
    }

    /// Sum of all body masses
    pub fn total_mass(&self) -> f64 {
        self.links
            .iter()
            .filter_map(|l| l.body.as_ref())
            .map(|b| b.mass)
            .sum()
    }

    /// Structural and numeric equality within `tolerance`
    ///
    /// Links and joints are matched by name, so two models that differ only
    /// in declaration order compare equal.
    pub fn approx_eq(&self, other: &KinematicModel, tolerance: f64) -> bool {
        self.name == other.name
            && self.link_name(Some(self.root)) == other.link_name(Some(other.root))
            && self.materials == other.materials
            && self.collision_ignore == other.collision_ignore
            && self.plugins == other.plugins
            && self.links.len() == other.links.len()
            && self.joints.len() == other.joints.len()
            && self.links.iter().all(|a| {
                other
                    .link_by_name(&a.name)
                    .is_some_and(|b| links_approx_eq(self, a, other, b, tolerance))
            })
            && self.joints.iter().all(|a| {
                other
                    .joint_by_name(&a.name)
                    .is_some_and(|b| joints_approx_eq(self, a, other, b, tolerance))
            })
    }

    fn link_name(&self, id: Option<LinkId>) -> Option<&str> {
        id.and_then(|id| self.links.get(id.0)).map(|l| l.name.as_str())
    }

    fn joint_name(&self, id: Option<JointId>) -> Option<&str> {
        id.and_then(|id| self.joints.get(id.0)).map(|j| j.name.as_str())
    }
}

fn close(a: f64, b: f64, tolerance: f64) -> bool {
    a == b || (a - b).abs() <= tolerance * a.abs().max(b.abs()).max(1.0)
}

fn vec_close(a: DVec3, b: DVec3, tolerance: f64) -> bool {
    close(a.x, b.x, tolerance) && close(a.y, b.y, tolerance) && close(a.z, b.z, tolerance)
}

/// Same rotation, either quaternion sign
fn quat_close(a: DQuat, b: DQuat, tolerance: f64) -> bool {
    a.dot(b).abs() >= 1.0 - tolerance
}

fn mat_close(a: &DMat3, b: &DMat3, tolerance: f64) -> bool {
    vec_close(a.x_axis, b.x_axis, tolerance)
        && vec_close(a.y_axis, b.y_axis, tolerance)
        && vec_close(a.z_axis, b.z_axis, tolerance)
}

fn transforms_close(a: &Transform, b: &Transform, tolerance: f64) -> bool {
    vec_close(a.translation, b.translation, tolerance)
        && quat_close(a.rotation, b.rotation, tolerance)
}

fn bodies_approx_eq(a: &RigidBody, b: &RigidBody, tolerance: f64) -> bool {
    close(a.mass, b.mass, tolerance)
        && vec_close(a.center_of_mass, b.center_of_mass, tolerance)
        && mat_close(&a.inertia_tensor(), &b.inertia_tensor(), tolerance)
        && a.calculation_mode == b.calculation_mode
}

fn geometry_approx_eq(a: &ModelGeometry, b: &ModelGeometry, tolerance: f64) -> bool {
    match (a, b) {
        (ModelGeometry::Box { size: a }, ModelGeometry::Box { size: b }) => {
            vec_close(*a, *b, tolerance)
        }
        (
            ModelGeometry::Cylinder {
                radius: ra,
                length: la,
                axis: aa,
            },
            ModelGeometry::Cylinder {
                radius: rb,
                length: lb,
                axis: ab,
            },
        )
        | (
            ModelGeometry::Capsule {
                radius: ra,
                length: la,
                axis: aa,
            },
            ModelGeometry::Capsule {
                radius: rb,
                length: lb,
                axis: ab,
            },
        ) => close(*ra, *rb, tolerance) && close(*la, *lb, tolerance) && vec_close(*aa, *ab, tolerance),
        (ModelGeometry::Sphere { radius: a }, ModelGeometry::Sphere { radius: b }) => {
            close(*a, *b, tolerance)
        }
        (
            ModelGeometry::Mesh {
                filename: fa,
                scale: sa,
                ..
            },
            ModelGeometry::Mesh {
                filename: fb,
                scale: sb,
                ..
            },
        ) => {
            fa == fb
                && match (sa, sb) {
                    (Some(a), Some(b)) => vec_close(*a, *b, tolerance),
                    (None, None) => true,
                    _ => false,
                }
        }
        _ => false,
    }
}

fn links_approx_eq(
    model_a: &KinematicModel,
    a: &ModelLink,
    model_b: &KinematicModel,
    b: &ModelLink,
    tolerance: f64,
) -> bool {
    let bodies = match (&a.body, &b.body) {
        (Some(x), Some(y)) => bodies_approx_eq(x, y, tolerance),
        (None, None) => true,
        _ => false,
    };

    a.name == b.name
        && model_a.link_name(a.parent) == model_b.link_name(b.parent)
        && model_a.joint_name(a.joint) == model_b.joint_name(b.joint)
        && model_a.link_name(a.merged_into) == model_b.link_name(b.merged_into)
        && bodies
        && transforms_close(&a.local_transform, &b.local_transform, tolerance)
        && a.visuals.len() == b.visuals.len()
        && a.visuals.iter().zip(&b.visuals).all(|(x, y)| {
            x.name == y.name
                && x.material == y.material
                && transforms_close(&x.local_transform, &y.local_transform, tolerance)
                && geometry_approx_eq(&x.geometry, &y.geometry, tolerance)
        })
        && a.collisions.len() == b.collisions.len()
        && a.collisions.iter().zip(&b.collisions).all(|(x, y)| {
            x.name == y.name
                && transforms_close(&x.local_transform, &y.local_transform, tolerance)
                && geometry_approx_eq(&x.geometry, &y.geometry, tolerance)
        })
}

fn joints_approx_eq(
    model_a: &KinematicModel,
    a: &ModelJoint,
    model_b: &KinematicModel,
    b: &ModelJoint,
    tolerance: f64,
) -> bool {
    let limits = match (&a.limit, &b.limit) {
        (Some(x), Some(y)) => {
            close(x.lower, y.lower, tolerance)
                && close(x.upper, y.upper, tolerance)
                && close(x.effort, y.effort, tolerance)
                && close(x.velocity, y.velocity, tolerance)
        }
        (None, None) => true,
        _ => false,
    };

    a.name == b.name
        && a.joint_type == b.joint_type
        && model_a.link_name(Some(a.parent)) == model_b.link_name(Some(b.parent))
        && model_a.link_name(Some(a.child)) == model_b.link_name(Some(b.child))
        && vec_close(a.axis, b.axis, tolerance)
        && limits
        && a.dynamics == b.dynamics
        && a.mimic == b.mimic
        && a.calibration == b.calibration
        && a.safety_controller == b.safety_controller
}
