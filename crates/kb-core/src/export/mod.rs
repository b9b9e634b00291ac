//! URDF export functionality
//!
//! [`export_model`] converts a kinematic model back into the description's
//! convention; [`write_robot_string`] and [`write_robot_file`] serialize a
//! description as URDF XML.

mod options;
mod xml;

use std::collections::HashSet;
use std::path::Path;

use glam::DVec3;

use crate::assembly::LinkId;
use crate::constants::EXPORT_ROUND_DIGITS;
use crate::convert::{CoordinateConverter, Transform};
use crate::description::{
    Collision, Geometry, Inertial, JointDescription, JointType, LinkDescription, Pose,
    RobotDescription, Visual,
};
use crate::inertial::{InertialResolver, InertialSettings};
use crate::math::round_to_digits;
use crate::model::{KinematicModel, ModelGeometry, ModelJoint};

pub use options::ExportOptions;
pub use xml::xml_escape;

/// Export-related errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExportError {
    #[error("Duplicate link name: {0}")]
    DuplicateLinkName(String),
    #[error("Link '{0}' has no inertial data")]
    MissingInertial(String),
    #[error("Link not found: {0}")]
    LinkNotFound(LinkId),
    #[error("XML error: {0}")]
    Xml(String),
    #[error("IO error: {0}")]
    Io(String),
}

/// Serialize a description as a URDF document
pub fn write_robot_string(robot: &RobotDescription) -> Result<String, ExportError> {
    xml::generate_urdf_string(robot)
}

/// Serialize a description and write it to `path`
pub fn write_robot_file(robot: &RobotDescription, path: impl AsRef<Path>) -> Result<(), ExportError> {
    let path = path.as_ref();
    let urdf = write_robot_string(robot)?;
    std::fs::write(path, urdf).map_err(|e| ExportError::Io(format!("{}: {}", path.display(), e)))?;
    tracing::info!("Wrote URDF to {}", path.display());
    Ok(())
}

/// Convert a kinematic model back into a description
///
/// Links are emitted parent-to-child from the root. A non-root link without
/// an incoming joint gets a fixed joint named `<link>_joint`, numbered when
/// that name is already taken.
pub fn export_model(
    model: &KinematicModel,
    options: &ExportOptions,
) -> Result<RobotDescription, ExportError> {
    let mut seen = HashSet::with_capacity(model.links.len());
    for link in &model.links {
        if !seen.insert(link.name.as_str()) {
            return Err(ExportError::DuplicateLinkName(link.name.clone()));
        }
    }

    let converter = CoordinateConverter::new(&model.conversion);
    let settings = InertialSettings::default();
    let resolver = InertialResolver::new(&converter, &settings);

    let mut robot = RobotDescription::new(
        options
            .robot_name
            .clone()
            .unwrap_or_else(|| model.name.clone()),
    );
    robot.materials = model.materials.clone();
    robot.collision_ignore = model.collision_ignore.clone();
    robot.plugins = model.plugins.clone();

    let mut joint_names: HashSet<String> = model.joints.iter().map(|j| j.name.clone()).collect();

    for id in export_order(model) {
        let link = model.link(id);
        robot.links.push(LinkDescription {
            name: link.name.clone(),
            inertial: link.body.as_ref().map(|body| round_inertial(resolver.export(body))),
            visuals: link
                .visuals
                .iter()
                .map(|visual| Visual {
                    name: visual.name.clone(),
                    origin: export_pose(&converter, &visual.local_transform),
                    geometry: export_geometry(&converter, &visual.geometry),
                    material: visual.material.clone(),
                })
                .collect(),
            collisions: link
                .collisions
                .iter()
                .map(|collision| Collision {
                    name: collision.name.clone(),
                    origin: export_pose(&converter, &collision.local_transform),
                    geometry: export_geometry(&converter, &collision.geometry),
                })
                .collect(),
        });

        let Some(parent) = link.parent else {
            continue;
        };
        let origin = export_pose(&converter, &link.local_transform);
        let joint = match link.joint {
            Some(joint) => export_joint(&converter, model, model.joint(joint), origin),
            None => {
                let mut joint = JointDescription::new(
                    unique_joint_name(&format!("{}_joint", link.name), &mut joint_names),
                    JointType::Fixed,
                    model.link(parent).name.clone(),
                    link.name.clone(),
                );
                joint.origin = origin;
                joint
            }
        };
        robot.joints.push(joint);
    }

    tracing::debug!(
        "Exported '{}': {} links, {} joints",
        robot.name,
        robot.links.len(),
        robot.joints.len()
    );

    Ok(robot)
}

/// The inertial a single link would export with
pub fn export_inertial(model: &KinematicModel, link: LinkId) -> Result<Inertial, ExportError> {
    let target = model.links.get(link.0).ok_or(ExportError::LinkNotFound(link))?;
    let body = target
        .body
        .as_ref()
        .ok_or_else(|| ExportError::MissingInertial(target.name.clone()))?;

    let converter = CoordinateConverter::new(&model.conversion);
    let settings = InertialSettings::default();
    Ok(round_inertial(
        InertialResolver::new(&converter, &settings).export(body),
    ))
}

/// `base`, or `base_<n>` with the smallest free `n`
fn unique_joint_name(base: &str, taken: &mut HashSet<String>) -> String {
    let mut name = base.to_string();
    let mut suffix = 1;
    while taken.contains(&name) {
        name = format!("{base}_{suffix}");
        suffix += 1;
    }
    taken.insert(name.clone());
    name
}

/// Breadth-first from the root, then anything unreachable in link order
fn export_order(model: &KinematicModel) -> Vec<LinkId> {
    let mut order = model.links_breadth_first();
    let reached: HashSet<LinkId> = order.iter().copied().collect();
    order.extend(
        (0..model.links.len())
            .map(LinkId)
            .filter(|id| !reached.contains(id)),
    );
    order
}

fn round(value: f64) -> f64 {
    round_to_digits(value, EXPORT_ROUND_DIGITS)
}

fn round_vec(v: DVec3) -> DVec3 {
    DVec3::new(round(v.x), round(v.y), round(v.z))
}

fn round_pose(pose: Pose) -> Option<Pose> {
    let pose = Pose::new(round_vec(pose.xyz), round_vec(pose.rpy));
    (!pose.is_identity()).then_some(pose)
}

fn round_inertial(mut inertial: Inertial) -> Inertial {
    inertial.origin = inertial.origin.and_then(round_pose);
    inertial
}

fn export_pose(converter: &CoordinateConverter, transform: &Transform) -> Option<Pose> {
    if transform.is_identity() {
        return None;
    }
    round_pose(converter.pose_back(transform))
}

fn export_geometry(converter: &CoordinateConverter, geometry: &ModelGeometry) -> Geometry {
    match geometry {
        ModelGeometry::Box { size } => Geometry::Box {
            size: round_vec(converter.size_back(*size)),
        },
        ModelGeometry::Cylinder { radius, length, .. } => Geometry::Cylinder {
            radius: round(converter.length_back(*radius)),
            length: round(converter.length_back(*length)),
        },
        ModelGeometry::Capsule { radius, length, .. } => Geometry::Capsule {
            radius: round(converter.length_back(*radius)),
            length: round(converter.length_back(*length)),
        },
        ModelGeometry::Sphere { radius } => Geometry::Sphere {
            radius: round(converter.length_back(*radius)),
        },
        ModelGeometry::Mesh {
            filename, scale, ..
        } => Geometry::Mesh {
            filename: filename.clone(),
            scale: scale.map(|s| converter.scale_factors_back(s)),
        },
    }
}

fn export_joint(
    converter: &CoordinateConverter,
    model: &KinematicModel,
    joint: &ModelJoint,
    origin: Option<Pose>,
) -> JointDescription {
    let mut joint = joint.clone();
    if joint.joint_type == JointType::Prismatic {
        crate::model::scale_joint_positions(&mut joint, |v| round(converter.length_back(v)));
    }

    let axis = match joint.joint_type {
        JointType::Revolute | JointType::Continuous => converter.rotation_axis_back(joint.axis),
        _ => converter.direction_back(joint.axis),
    };

    JointDescription {
        name: joint.name,
        joint_type: joint.joint_type,
        parent: model.link(joint.parent).name.clone(),
        child: model.link(joint.child).name.clone(),
        origin,
        axis: round_vec(axis),
        calibration: joint.calibration,
        dynamics: joint.dynamics,
        limit: joint.limit,
        mimic: joint.mimic,
        safety_controller: joint.safety_controller,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::{AxisConvention, ConversionSettings, LengthUnit};
    use crate::import::ImportOptions;
    use crate::model::{ModelLink, NoMeshResolver, import_robot_str};
    use approx::assert_relative_eq;

    const ROBOT: &str = r#"<robot name="arm">
        <link name="base"><inertial><mass value="1"/><inertia ixx="0.1" iyy="0.2" izz="0.3"/></inertial></link>
        <link name="upper">
          <inertial calculation_mode="force-manual">
            <origin xyz="0 0 0.25"/>
            <mass value="0.5"/><inertia ixx="0.01" ixy="0.001" iyy="0.02" izz="0.03"/>
          </inertial>
          <visual><origin xyz="0 0 0.25"/><geometry><box size="0.1 0.2 0.5"/></geometry></visual>
        </link>
        <link name="slide"/>
        <joint name="shoulder" type="revolute">
          <parent link="base"/><child link="upper"/>
          <origin xyz="0 0 0.1" rpy="0 0.5 0"/>
          <axis xyz="0 1 0"/>
          <limit lower="-1" upper="1" effort="20" velocity="2"/>
        </joint>
        <joint name="rail" type="prismatic">
          <parent link="upper"/><child link="slide"/>
          <origin xyz="0 0 0.5"/>
          <axis xyz="1 0 0"/>
          <limit lower="0" upper="0.3" effort="5" velocity="0.1"/>
        </joint>
      </robot>"#;

    fn options(target: AxisConvention, unit: LengthUnit) -> ImportOptions {
        ImportOptions::default().with_conversion(ConversionSettings {
            source: AxisConvention::Flu,
            target,
            length_unit: unit,
        })
    }

    #[test]
    fn test_export_restores_description() {
        let original = crate::import::parse_robot_str(ROBOT, &mut crate::diagnostics::Warnings::new())
            .unwrap();

        for target in [AxisConvention::Flu, AxisConvention::Enu, AxisConvention::Ruf] {
            let model = import_robot_str(
                ROBOT,
                &options(target, LengthUnit::Millimeters),
                &mut NoMeshResolver,
            )
            .unwrap()
            .model;
            let robot = export_model(&model, &ExportOptions::default()).unwrap();

            assert_eq!(robot.name, "arm");
            let shoulder = robot.joint("shoulder").unwrap();
            assert_eq!(shoulder.axis, DVec3::Y);
            let origin = shoulder.origin.unwrap();
            assert_relative_eq!(origin.xyz.z, 0.1, epsilon = 1e-12);
            assert_relative_eq!(origin.rpy.y, 0.5, epsilon = 1e-12);

            let rail = robot.joint("rail").unwrap();
            assert_eq!(rail.axis, DVec3::X);
            assert_eq!(rail.limit, original.joint("rail").unwrap().limit);

            let upper = robot.link("upper").unwrap();
            let inertial = upper.inertial.as_ref().unwrap();
            assert_eq!(inertial.origin, Some(Pose::from_translation(DVec3::new(0.0, 0.0, 0.25))));
            assert_relative_eq!(inertial.inertia.ixy, 0.001, epsilon = 1e-9);
            assert_eq!(
                upper.visuals[0].geometry,
                Geometry::Box {
                    size: DVec3::new(0.1, 0.2, 0.5)
                }
            );
        }
    }

    #[test]
    fn test_synthetic_joint_for_orphan_link() {
        let mut model = import_robot_str(
            ROBOT,
            &ImportOptions::default(),
            &mut NoMeshResolver,
        )
        .unwrap()
        .model;

        let mut sensor = ModelLink::new("sensor");
        sensor.parent = Some(LinkId(0));
        sensor.local_transform = Transform::from_translation(DVec3::new(0.0, 1.0, 0.0));
        model.links.push(sensor);

        let robot = export_model(&model, &ExportOptions::with_robot_name("renamed")).unwrap();
        assert_eq!(robot.name, "renamed");

        let joint = robot.joint("sensor_joint").unwrap();
        assert_eq!(joint.joint_type, JointType::Fixed);
        assert_eq!(joint.parent, "base");
        // Ruf (0, 1, 0) is FLU up
        assert_eq!(joint.origin.unwrap().xyz, DVec3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn test_synthetic_joint_name_avoids_existing_joints() {
        let mut model = import_robot_str(ROBOT, &ImportOptions::default(), &mut NoMeshResolver)
            .unwrap()
            .model;
        model.joints[0].name = "sensor_joint".into();
        model.joints[1].name = "sensor_joint_1".into();

        let mut sensor = ModelLink::new("sensor");
        sensor.parent = Some(LinkId(0));
        model.links.push(sensor);

        let robot = export_model(&model, &ExportOptions::default()).unwrap();
        let mut names: Vec<_> = robot.joints.iter().map(|j| j.name.as_str()).collect();
        names.sort_unstable();
        assert_eq!(names, ["sensor_joint", "sensor_joint_1", "sensor_joint_2"]);
        assert_eq!(robot.joint("sensor_joint_2").unwrap().child, "sensor");
    }

    #[test]
    fn test_duplicate_link_names_rejected() {
        let mut model = import_robot_str(ROBOT, &ImportOptions::default(), &mut NoMeshResolver)
            .unwrap()
            .model;
        model.links[2].name = "base".into();

        assert_eq!(
            export_model(&model, &ExportOptions::default()),
            Err(ExportError::DuplicateLinkName("base".into()))
        );
    }

    #[test]
    fn test_export_inertial_errors() {
        let model = import_robot_str(ROBOT, &ImportOptions::default(), &mut NoMeshResolver)
            .unwrap()
            .model;

        let inertial = export_inertial(&model, LinkId(0)).unwrap();
        assert_eq!(inertial.mass, 1.0);
        assert!(inertial.origin.is_none());

        assert_eq!(
            export_inertial(&model, LinkId(2)),
            Err(ExportError::MissingInertial("slide".into()))
        );
        assert_eq!(
            export_inertial(&model, LinkId(9)),
            Err(ExportError::LinkNotFound(LinkId(9)))
        );
    }

    #[test]
    fn test_write_robot_file() {
        let robot = crate::import::parse_robot_str(ROBOT, &mut crate::diagnostics::Warnings::new())
            .unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("arm.urdf");

        write_robot_file(&robot, &path).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, write_robot_string(&robot).unwrap());

        let missing = write_robot_file(&robot, dir.path().join("no/such/dir/arm.urdf"));
        assert!(matches!(missing, Err(ExportError::Io(_))));
    }
}
