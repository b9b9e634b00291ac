//! Description → kinematic model pipeline

use std::path::Path;

use glam::DVec3;

use super::{
    KinematicModel, MeshResolver, ModelCollision, ModelGeometry, ModelJoint, ModelLink,
    ModelVisual,
};
use crate::assembly::{LinkId, StructuralError, build_tree};
use crate::convert::CoordinateConverter;
use crate::description::{
    Collision, Geometry, JointDescription, JointType, RobotDescription, Visual,
};
use crate::diagnostics::Warnings;
use crate::import::{ImportError, ImportOptions, parse_robot_file, parse_robot_str};
use crate::inertial::InertialResolver;
use crate::optimize::{OptimizationReport, optimize_fixed_joints};

/// Errors from the one-call import pipeline
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    #[error(transparent)]
    Import(#[from] ImportError),

    #[error(transparent)]
    Structure(#[from] StructuralError),
}

/// Output of [`import_model`]
#[derive(Debug, Clone)]
pub struct ImportResult {
    pub model: KinematicModel,
    /// Recoverable problems in the order they were found
    pub warnings: Warnings,
    /// Present when fixed-joint optimization ran
    pub optimization: Option<OptimizationReport>,
}

/// Build a kinematic model from a parsed description
///
/// Links keep their declaration order, so `LinkId(i)` is
/// `description.links[i]`; the same holds for joints.
pub fn import_model(
    description: &RobotDescription,
    options: &ImportOptions,
    meshes: &mut dyn MeshResolver,
) -> Result<ImportResult, StructuralError> {
    let tree = build_tree(&description.links, &description.joints)?;
    let converter = CoordinateConverter::new(&options.conversion);
    let mut resolver = InertialResolver::new(&converter, &options.inertial);
    let mut warnings = Warnings::new();

    let mut links = Vec::with_capacity(description.links.len());
    for (i, link) in description.links.iter().enumerate() {
        let id = LinkId(i);
        let joint = tree.parent_joint(id);
        let local_transform = joint
            .map(|j| converter.pose(&description.joints[j.0].origin_or_identity()))
            .unwrap_or_default();

        links.push(ModelLink {
            name: link.name.clone(),
            parent: tree.parent_link(id),
            local_transform,
            joint,
            body: link
                .inertial
                .as_ref()
                .map(|inertial| resolver.resolve(&link.name, inertial, &mut warnings)),
            visuals: link
                .visuals
                .iter()
                .map(|visual| convert_visual(&converter, visual, meshes))
                .collect(),
            collisions: link
                .collisions
                .iter()
                .map(|collision| convert_collision(&converter, collision, meshes))
                .collect(),
            merged_into: None,
        });
    }

    let mut ends = vec![(tree.root(), tree.root()); description.joints.len()];
    for parent in tree.links_breadth_first() {
        for &(joint, child) in tree.child_joints(parent) {
            ends[joint.0] = (parent, child);
        }
    }
    let joints = description
        .joints
        .iter()
        .zip(ends)
        .map(|(joint, (parent, child))| convert_joint(&converter, joint, parent, child))
        .collect();

    let mut model = KinematicModel {
        name: description.name.clone(),
        links,
        joints,
        root: tree.root(),
        conversion: options.conversion,
        materials: description.materials.clone(),
        collision_ignore: description.collision_ignore.clone(),
        plugins: description.plugins.clone(),
    };

    let optimization = options
        .optimize_fixed_joints
        .then(|| optimize_fixed_joints(&mut model));

    tracing::info!(
        "Imported robot '{}': {} links, {} joints, {} warnings",
        model.name,
        model.links.len(),
        model.joints.len(),
        warnings.len()
    );

    Ok(ImportResult {
        model,
        warnings,
        optimization,
    })
}

/// Parse a URDF document and build its kinematic model
pub fn import_robot_str(
    xml: &str,
    options: &ImportOptions,
    meshes: &mut dyn MeshResolver,
) -> Result<ImportResult, ModelError> {
    let mut warnings = Warnings::new();
    let description = parse_robot_str(xml, &mut warnings)?;
    finish(description, warnings, options, meshes)
}

/// Read a URDF file and build its kinematic model
pub fn import_robot_file(
    path: impl AsRef<Path>,
    options: &ImportOptions,
    meshes: &mut dyn MeshResolver,
) -> Result<ImportResult, ModelError> {
    let mut warnings = Warnings::new();
    let description = parse_robot_file(path, &mut warnings)?;
    finish(description, warnings, options, meshes)
}

/// Parse warnings come before resolver warnings
fn finish(
    description: RobotDescription,
    mut warnings: Warnings,
    options: &ImportOptions,
    meshes: &mut dyn MeshResolver,
) -> Result<ImportResult, ModelError> {
    let mut result = import_model(&description, options, meshes)?;
    warnings.extend(std::mem::take(&mut result.warnings));
    result.warnings = warnings;
    Ok(result)
}

fn convert_geometry(
    converter: &CoordinateConverter,
    geometry: &Geometry,
    meshes: &mut dyn MeshResolver,
) -> ModelGeometry {
    match geometry {
        Geometry::Box { size } => ModelGeometry::Box {
            size: converter.size(*size),
        },
        Geometry::Cylinder { radius, length } => ModelGeometry::Cylinder {
            radius: converter.length(*radius),
            length: converter.length(*length),
            axis: converter.direction(DVec3::Z),
        },
        Geometry::Capsule { radius, length } => ModelGeometry::Capsule {
            radius: converter.length(*radius),
            length: converter.length(*length),
            axis: converter.direction(DVec3::Z),
        },
        Geometry::Sphere { radius } => ModelGeometry::Sphere {
            radius: converter.length(*radius),
        },
        Geometry::Mesh { filename, scale } => ModelGeometry::Mesh {
            filename: filename.clone(),
            handle: meshes.resolve(filename),
            scale: scale.map(|s| converter.scale_factors(s)),
        },
    }
}

fn convert_visual(
    converter: &CoordinateConverter,
    visual: &Visual,
    meshes: &mut dyn MeshResolver,
) -> ModelVisual {
    ModelVisual {
        name: visual.name.clone(),
        local_transform: converter.pose(&visual.origin.unwrap_or_default()),
        geometry: convert_geometry(converter, &visual.geometry, meshes),
        material: visual.material.clone(),
    }
}

fn convert_collision(
    converter: &CoordinateConverter,
    collision: &Collision,
    meshes: &mut dyn MeshResolver,
) -> ModelCollision {
    ModelCollision {
        name: collision.name.clone(),
        local_transform: converter.pose(&collision.origin.unwrap_or_default()),
        geometry: convert_geometry(converter, &collision.geometry, meshes),
    }
}

/// Revolute and continuous axes are rotation axes; the rest are directions
fn convert_axis(
    converter: &CoordinateConverter,
    joint_type: JointType,
    axis: DVec3,
) -> DVec3 {
    match joint_type {
        JointType::Revolute | JointType::Continuous => converter.rotation_axis(axis),
        _ => converter.direction(axis),
    }
}

fn convert_joint(
    converter: &CoordinateConverter,
    joint: &JointDescription,
    parent: LinkId,
    child: LinkId,
) -> ModelJoint {
    let mut converted = ModelJoint {
        name: joint.name.clone(),
        joint_type: joint.joint_type,
        parent,
        child,
        axis: convert_axis(converter, joint.joint_type, joint.axis),
        limit: joint.limit,
        dynamics: joint.dynamics,
        mimic: joint.mimic.clone(),
        calibration: joint.calibration,
        safety_controller: joint.safety_controller,
    };
    if joint.joint_type == JointType::Prismatic {
        scale_joint_positions(&mut converted, |v| converter.length(v));
    }
    converted
}

/// Apply a length scale to every position-valued field of a prismatic joint
pub(crate) fn scale_joint_positions(joint: &mut ModelJoint, scale: impl Fn(f64) -> f64) {
    if let Some(limit) = joint.limit.as_mut() {
        limit.lower = scale(limit.lower);
        limit.upper = scale(limit.upper);
        limit.velocity = scale(limit.velocity);
    }
    if let Some(mimic) = joint.mimic.as_mut() {
        mimic.offset = scale(mimic.offset);
    }
    if let Some(calibration) = joint.calibration.as_mut() {
        calibration.rising = calibration.rising.map(&scale);
        calibration.falling = calibration.falling.map(&scale);
    }
    if let Some(safety) = joint.safety_controller.as_mut() {
        safety.soft_lower_limit = scale(safety.soft_lower_limit);
        safety.soft_upper_limit = scale(safety.soft_upper_limit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembly::JointId;
    use crate::convert::{AxisConvention, ConversionSettings, LengthUnit};
    use crate::diagnostics::Warning;
    use crate::model::{NoMeshResolver, UuidMeshResolver};
    use approx::assert_relative_eq;

    const ROBOT: &str = r#"<robot name="cart">
        <link name="base">
          <inertial><mass value="2"/><inertia ixx="0.1" iyy="0.2" izz="0.3"/></inertial>
          <visual><geometry><cylinder radius="0.1" length="0.5"/></geometry></visual>
          <collision><geometry><mesh filename="package://cart/base.stl"/></geometry></collision>
        </link>
        <link name="slider">
          <visual><geometry><mesh filename="package://cart/base.stl" scale="1 2 3"/></geometry></visual>
        </link>
        <link name="arm"/>
        <joint name="rail" type="prismatic">
          <parent link="base"/><child link="slider"/>
          <origin xyz="1 2 3"/>
          <axis xyz="0 0 1"/>
          <limit lower="-0.5" upper="0.5" effort="10" velocity="0.2"/>
        </joint>
        <joint name="hinge" type="revolute">
          <parent link="slider"/><child link="arm"/>
          <axis xyz="0 0 1"/>
          <limit lower="-1" upper="1" effort="5" velocity="3"/>
        </joint>
      </robot>"#;

    fn ruf_mm() -> ImportOptions {
        ImportOptions::default().with_conversion(ConversionSettings {
            source: AxisConvention::Flu,
            target: AxisConvention::Ruf,
            length_unit: LengthUnit::Millimeters,
        })
    }

    #[test]
    fn test_links_and_joints_keep_declaration_order() {
        let result = import_robot_str(ROBOT, &ImportOptions::default(), &mut NoMeshResolver)
            .unwrap();
        let model = &result.model;

        assert_eq!(model.root, LinkId(0));
        let names: Vec<_> = model.links.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["base", "slider", "arm"]);

        let arm = model.link(LinkId(2));
        assert_eq!(arm.parent, Some(LinkId(1)));
        assert_eq!(arm.joint, Some(JointId(1)));
        assert_eq!(model.joint(JointId(0)).child, LinkId(1));
        assert_eq!(model.joint(JointId(1)).parent, LinkId(1));
        assert!(model.link(LinkId(0)).local_transform.is_identity());
        assert!(result.optimization.is_none());
    }

    #[test]
    fn test_converts_into_target_convention() {
        let result = import_robot_str(ROBOT, &ruf_mm(), &mut NoMeshResolver).unwrap();
        let model = &result.model;

        let slider = model.link(LinkId(1));
        assert_eq!(
            slider.local_transform.translation,
            DVec3::new(-2000.0, 3000.0, 1000.0)
        );

        // Prismatic axes are directions, revolute axes flip with handedness
        let rail = model.joint(JointId(0));
        assert_eq!(rail.axis, DVec3::new(0.0, 1.0, 0.0));
        let limit = rail.limit.unwrap();
        assert_relative_eq!(limit.lower, -500.0);
        assert_relative_eq!(limit.upper, 500.0);
        assert_relative_eq!(limit.velocity, 200.0);
        assert_eq!(limit.effort, 10.0);

        let hinge = model.joint(JointId(1));
        assert_eq!(hinge.axis, DVec3::new(0.0, -1.0, 0.0));
        assert_eq!(hinge.limit.unwrap().upper, 1.0);

        match &model.link(LinkId(0)).visuals[0].geometry {
            ModelGeometry::Cylinder {
                radius,
                length,
                axis,
            } => {
                assert_relative_eq!(*radius, 100.0);
                assert_relative_eq!(*length, 500.0);
                assert_eq!(*axis, DVec3::Y);
            }
            other => panic!("unexpected geometry {other:?}"),
        }
        match &slider.visuals[0].geometry {
            ModelGeometry::Mesh { scale, .. } => {
                assert_eq!(*scale, Some(DVec3::new(2.0, 3.0, 1.0)));
            }
            other => panic!("unexpected geometry {other:?}"),
        }

        let body = model.link(LinkId(0)).body.unwrap();
        assert_eq!(body.mass, 2.0);
        let mut moments = body.principal.moments.to_array();
        moments.sort_by(f64::total_cmp);
        assert_relative_eq!(moments[0], 0.1e6, max_relative = 1e-12);
        assert_relative_eq!(moments[2], 0.3e6, max_relative = 1e-12);
    }

    #[test]
    fn test_mesh_handles_shared_per_filename() {
        let mut meshes = UuidMeshResolver::new();
        let result = import_robot_str(ROBOT, &ImportOptions::default(), &mut meshes).unwrap();

        let handle = |geometry: &ModelGeometry| match geometry {
            ModelGeometry::Mesh { handle, .. } => *handle,
            _ => None,
        };
        let model = &result.model;
        let a = handle(&model.link(LinkId(0)).collisions[0].geometry);
        let b = handle(&model.link(LinkId(1)).visuals[0].geometry);
        assert!(a.is_some());
        assert_eq!(a, b);
        assert_eq!(meshes.handles().len(), 1);
    }

    #[test]
    fn test_parse_warnings_come_first() {
        let xml = r#"<robot name="r">
            <link name="a"><inertial><mass value="1"/><inertia ixx="1" iyy="1" izz="1"/></inertial></link>
            <link name="b"/>
            <joint name="j" type="continuous"><parent link="a"/><child link="b"/><axis xyz="0 0 0"/></joint>
          </robot>"#;
        let result = import_robot_str(xml, &ImportOptions::default(), &mut NoMeshResolver)
            .unwrap();

        let warnings = result.warnings.as_slice();
        assert_eq!(warnings.len(), 2);
        assert!(matches!(&warnings[0], Warning::AxisTooSmall { joint } if joint == "j"));
        assert!(matches!(
            warnings[1],
            Warning::CalculationModeDefaulted { .. }
        ));
    }

    #[test]
    fn test_structural_errors_are_reported() {
        let xml = r#"<robot name="r">
            <link name="a"/><link name="b"/><link name="c"/>
            <joint name="j1" type="fixed"><parent link="a"/><child link="c"/></joint>
            <joint name="j2" type="fixed"><parent link="b"/><child link="c"/></joint>
          </robot>"#;
        let err = import_robot_str(xml, &ImportOptions::default(), &mut NoMeshResolver)
            .unwrap_err();
        assert!(matches!(
            err,
            ModelError::Structure(StructuralError::MultipleParents { .. })
        ));

        let err = import_robot_str("<robot", &ImportOptions::default(), &mut NoMeshResolver)
            .unwrap_err();
        assert!(matches!(err, ModelError::Import(_)));
    }

    #[test]
    fn test_optimization_runs_when_enabled() {
        let xml = r#"<robot name="r">
            <link name="a"><inertial><mass value="1"/><inertia ixx="1" iyy="1" izz="1"/></inertial></link>
            <link name="b"><inertial><mass value="1"/><inertia ixx="1" iyy="1" izz="1"/></inertial></link>
            <joint name="weld" type="fixed"><parent link="a"/><child link="b"/></joint>
          </robot>"#;
        let options = ImportOptions::default().with_fixed_joint_optimization(true);
        let result = import_robot_str(xml, &options, &mut NoMeshResolver).unwrap();

        let report = result.optimization.unwrap();
        assert_eq!(report.merges.len(), 1);
        assert_eq!(result.model.link(LinkId(1)).merged_into, Some(LinkId(0)));
        assert_relative_eq!(result.model.total_mass(), 2.0);
    }
}
