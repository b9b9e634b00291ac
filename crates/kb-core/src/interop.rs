//! Conversion from documents already loaded with `urdf-rs`
//!
//! `urdf-rs` does not keep plugin blocks, collision exclusions or
//! calculation modes, so those come through empty; dynamics get the default
//! spring.

use glam::DVec3;

use crate::constants::DEFAULT_SPRING;
use crate::description::{
    Calibration, Collision, Geometry, Inertial, JointDescription, JointDynamics, JointLimit,
    JointMimic, JointType, LinkDescription, MaterialDescription, Pose, RobotDescription,
    SafetyController, Visual,
};
use crate::math::InertiaMatrix;

impl From<&urdf_rs::Pose> for Pose {
    fn from(urdf_pose: &urdf_rs::Pose) -> Self {
        Pose::new(
            DVec3::from_array(urdf_pose.xyz.0),
            DVec3::from_array(urdf_pose.rpy.0),
        )
    }
}

impl From<&urdf_rs::JointType> for JointType {
    fn from(urdf_type: &urdf_rs::JointType) -> Self {
        match urdf_type {
            urdf_rs::JointType::Fixed => JointType::Fixed,
            urdf_rs::JointType::Revolute => JointType::Revolute,
            urdf_rs::JointType::Continuous => JointType::Continuous,
            urdf_rs::JointType::Prismatic => JointType::Prismatic,
            urdf_rs::JointType::Floating => JointType::Floating,
            urdf_rs::JointType::Planar => JointType::Planar,
            // No spherical joints in the description model
            urdf_rs::JointType::Spherical => JointType::Floating,
        }
    }
}

impl From<&urdf_rs::Material> for MaterialDescription {
    fn from(material: &urdf_rs::Material) -> Self {
        MaterialDescription {
            name: material.name.clone(),
            color: material.color.as_ref().map(|c| c.rgba.0),
            texture: material.texture.as_ref().map(|t| t.filename.clone()),
        }
    }
}

impl From<&urdf_rs::Geometry> for Geometry {
    fn from(geometry: &urdf_rs::Geometry) -> Self {
        match geometry {
            urdf_rs::Geometry::Box { size } => Geometry::Box {
                size: DVec3::from_array(size.0),
            },
            urdf_rs::Geometry::Cylinder { radius, length } => Geometry::Cylinder {
                radius: *radius,
                length: *length,
            },
            urdf_rs::Geometry::Capsule { radius, length } => Geometry::Capsule {
                radius: *radius,
                length: *length,
            },
            urdf_rs::Geometry::Sphere { radius } => Geometry::Sphere { radius: *radius },
            urdf_rs::Geometry::Mesh { filename, scale } => Geometry::Mesh {
                filename: filename.clone(),
                scale: scale.as_ref().map(|s| DVec3::from_array(s.0)),
            },
        }
    }
}

/// `urdf-rs` always fills an inertial; an all-zero one means none was given
fn convert_inertial(inertial: &urdf_rs::Inertial) -> Option<Inertial> {
    let inertia = InertiaMatrix::from(&inertial.inertia);
    if inertial.mass.value == 0.0 && inertia == InertiaMatrix::default() {
        return None;
    }
    let origin = Pose::from(&inertial.origin);
    Some(Inertial {
        origin: (!origin.is_identity()).then_some(origin),
        mass: inertial.mass.value,
        inertia,
        calculation_mode: None,
    })
}

impl From<&urdf_rs::Link> for LinkDescription {
    fn from(link: &urdf_rs::Link) -> Self {
        LinkDescription {
            name: link.name.clone(),
            inertial: convert_inertial(&link.inertial),
            visuals: link
                .visual
                .iter()
                .map(|v| Visual {
                    name: v.name.clone(),
                    origin: Some(Pose::from(&v.origin)),
                    geometry: Geometry::from(&v.geometry),
                    material: v.material.as_ref().map(MaterialDescription::from),
                })
                .collect(),
            collisions: link
                .collision
                .iter()
                .map(|c| Collision {
                    name: c.name.clone(),
                    origin: Some(Pose::from(&c.origin)),
                    geometry: Geometry::from(&c.geometry),
                })
                .collect(),
        }
    }
}

impl From<&urdf_rs::Joint> for JointDescription {
    fn from(joint: &urdf_rs::Joint) -> Self {
        let joint_type = JointType::from(&joint.joint_type);
        let axis = DVec3::from_array(joint.axis.xyz.0);

        JointDescription {
            name: joint.name.clone(),
            joint_type,
            parent: joint.parent.link.clone(),
            child: joint.child.link.clone(),
            origin: Some(Pose::from(&joint.origin)),
            axis: axis.try_normalize().unwrap_or(DVec3::X),
            calibration: joint.calibration.as_ref().map(|c| Calibration {
                rising: c.rising,
                falling: c.falling,
            }),
            dynamics: joint.dynamics.as_ref().map(|d| JointDynamics {
                // `urdf-rs` has no spring attribute
                spring: DEFAULT_SPRING,
                damping: d.damping,
                friction: d.friction,
            }),
            limit: joint_type.has_limits().then_some(JointLimit {
                lower: joint.limit.lower,
                upper: joint.limit.upper,
                effort: joint.limit.effort,
                velocity: joint.limit.velocity,
            }),
            mimic: joint.mimic.as_ref().map(|m| JointMimic {
                multiplier: m.multiplier.unwrap_or(1.0),
                offset: m.offset.unwrap_or(0.0),
                ..JointMimic::new(m.joint.clone())
            }),
            safety_controller: joint.safety_controller.as_ref().map(|s| SafetyController {
                soft_lower_limit: s.soft_lower_limit,
                soft_upper_limit: s.soft_upper_limit,
                k_position: s.k_position,
                k_velocity: s.k_velocity,
            }),
        }
    }
}

impl From<&urdf_rs::Robot> for RobotDescription {
    fn from(robot: &urdf_rs::Robot) -> Self {
        RobotDescription {
            name: robot.name.clone(),
            links: robot.links.iter().map(LinkDescription::from).collect(),
            joints: robot.joints.iter().map(JointDescription::from).collect(),
            materials: robot.materials.iter().map(MaterialDescription::from).collect(),
            collision_ignore: Vec::new(),
            plugins: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const URDF: &str = r#"<robot name="pan_tilt">
        <material name="blue"><color rgba="0 0 1 1"/></material>
        <link name="base">
          <inertial><mass value="1"/><inertia ixx="0.1" ixy="0" ixz="0" iyy="0.1" iyz="0" izz="0.1"/></inertial>
          <visual><geometry><box size="1 2 3"/></geometry><material name="blue"/></visual>
        </link>
        <link name="head"/>
        <joint name="pan" type="revolute">
          <parent link="base"/><child link="head"/>
          <origin xyz="0 0 0.5" rpy="0 0 0"/>
          <axis xyz="0 0 2"/>
          <limit lower="-1" upper="1" effort="3" velocity="4"/>
          <mimic joint="tilt"/>
        </joint>
      </robot>"#;

    #[test]
    fn test_joint_type_from() {
        assert_eq!(JointType::from(&urdf_rs::JointType::Fixed), JointType::Fixed);
        assert_eq!(
            JointType::from(&urdf_rs::JointType::Spherical),
            JointType::Floating
        );
    }

    #[test]
    fn test_robot_from_urdf_rs() {
        let urdf = urdf_rs::read_from_string(URDF).unwrap();
        let robot = RobotDescription::from(&urdf);

        assert_eq!(robot.name, "pan_tilt");
        assert_eq!(robot.materials[0].color, Some([0.0, 0.0, 1.0, 1.0]));

        let base = robot.link("base").unwrap();
        assert_eq!(base.inertial.as_ref().unwrap().mass, 1.0);
        assert_eq!(
            base.visuals[0].geometry,
            Geometry::Box {
                size: DVec3::new(1.0, 2.0, 3.0)
            }
        );
        assert!(robot.link("head").unwrap().inertial.is_none());

        let pan = robot.joint("pan").unwrap();
        assert_eq!(pan.axis, DVec3::Z);
        assert_eq!(pan.limit.unwrap().velocity, 4.0);
        let mimic = pan.mimic.as_ref().unwrap();
        assert_eq!((mimic.joint.as_str(), mimic.multiplier), ("tilt", 1.0));
    }
}
