//! Typed robot description, one struct per XML element

mod geometry;
mod inertial;
mod joint;
mod link;
mod material;
mod pose;
mod robot;

pub use geometry::{Collision, Geometry, Visual};
pub use inertial::{InertiaCalculationMode, Inertial};
pub use joint::{
    Calibration, JointDescription, JointDynamics, JointLimit, JointMimic, JointType,
    SafetyController,
};
pub use link::LinkDescription;
pub use material::MaterialDescription;
pub use pose::{Pose, quat_to_rpy, rpy_to_quat};
pub use robot::{PluginBlock, RobotDescription};
