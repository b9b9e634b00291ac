//! Visual and collision shapes

use glam::DVec3;
use serde::{Deserialize, Serialize};

use super::material::MaterialDescription;
use super::pose::Pose;

/// `<geometry>` content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Geometry {
    Box { size: DVec3 },
    Cylinder { radius: f64, length: f64 },
    Capsule { radius: f64, length: f64 },
    Sphere { radius: f64 },
    Mesh { filename: String, scale: Option<DVec3> },
}

impl Geometry {
    /// Element name inside `<geometry>`
    pub fn tag(&self) -> &'static str {
        match self {
            Geometry::Box { .. } => "box",
            Geometry::Cylinder { .. } => "cylinder",
            Geometry::Capsule { .. } => "capsule",
            Geometry::Sphere { .. } => "sphere",
            Geometry::Mesh { .. } => "mesh",
        }
    }
}

/// `<visual>`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Visual {
    pub name: Option<String>,
    pub origin: Option<Pose>,
    pub geometry: Geometry,
    pub material: Option<MaterialDescription>,
}

impl Visual {
    pub fn new(geometry: Geometry) -> Self {
        Self {
            name: None,
            origin: None,
            geometry,
            material: None,
        }
    }
}

/// `<collision>`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collision {
    pub name: Option<String>,
    pub origin: Option<Pose>,
    pub geometry: Geometry,
}

impl Collision {
    pub fn new(geometry: Geometry) -> Self {
        Self {
            name: None,
            origin: None,
            geometry,
        }
    }
}
