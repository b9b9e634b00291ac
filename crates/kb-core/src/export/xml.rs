//! XML generation utilities for URDF export

use glam::DVec3;
use quick_xml::Reader;
use quick_xml::events::Event;

use crate::constants::DEFAULT_SPRING;
use crate::description::{
    Collision, Geometry, Inertial, JointDescription, LinkDescription, MaterialDescription, Pose,
    RobotDescription, Visual,
};

use super::ExportError;

/// Generate the URDF document for `robot`
///
/// Element order is materials, links, joints, collision exclusions, then
/// plugin blocks exactly as they were read.
pub fn generate_urdf_string(robot: &RobotDescription) -> Result<String, ExportError> {
    for plugin in &robot.plugins {
        check_fragment(&plugin.raw)
            .map_err(|e| ExportError::Xml(format!("plugin <{}>: {}", plugin.tag, e)))?;
    }

    let mut urdf = String::new();
    urdf.push_str(&format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<robot name=\"{}\">\n\n",
        xml_escape(&robot.name)
    ));

    for material in &robot.materials {
        write_material(&mut urdf, material, 2);
    }
    if !robot.materials.is_empty() {
        urdf.push('\n');
    }

    for link in &robot.links {
        write_link(&mut urdf, link);
    }

    for joint in &robot.joints {
        write_joint(&mut urdf, joint);
    }

    for (link1, link2) in &robot.collision_ignore {
        urdf.push_str(&format!(
            "  <disable_collisions link1=\"{}\" link2=\"{}\"/>\n",
            xml_escape(link1),
            xml_escape(link2)
        ));
    }
    if !robot.collision_ignore.is_empty() {
        urdf.push('\n');
    }

    for plugin in &robot.plugins {
        urdf.push_str(&format!("  {}\n", plugin.raw));
    }

    urdf.push_str("</robot>\n");

    Ok(urdf)
}

/// Reject fragments that would break the surrounding document
fn check_fragment(raw: &str) -> Result<(), String> {
    let mut reader = Reader::from_str(raw);
    let mut depth = 0usize;
    loop {
        match reader.read_event().map_err(|e| e.to_string())? {
            Event::Start(_) => depth += 1,
            Event::End(_) => depth = depth.saturating_sub(1),
            Event::Eof if depth == 0 => return Ok(()),
            Event::Eof => return Err("unclosed element".to_string()),
            _ => {}
        }
    }
}

fn vec3(v: DVec3) -> String {
    format!("{} {} {}", v.x, v.y, v.z)
}

pub fn write_origin(urdf: &mut String, origin: &Option<Pose>, indent: usize) {
    if let Some(origin) = origin {
        urdf.push_str(&format!(
            "{}<origin xyz=\"{}\" rpy=\"{}\"/>\n",
            " ".repeat(indent),
            vec3(origin.xyz),
            vec3(origin.rpy)
        ));
    }
}

pub fn write_material(urdf: &mut String, material: &MaterialDescription, indent: usize) {
    let pad = " ".repeat(indent);
    let name = xml_escape(&material.name);

    if material.is_reference() {
        urdf.push_str(&format!("{pad}<material name=\"{name}\"/>\n"));
        return;
    }

    urdf.push_str(&format!("{pad}<material name=\"{name}\">\n"));
    if let Some(color) = material.color {
        urdf.push_str(&format!(
            "{pad}  <color rgba=\"{} {} {} {}\"/>\n",
            color[0], color[1], color[2], color[3]
        ));
    }
    if let Some(ref texture) = material.texture {
        urdf.push_str(&format!(
            "{pad}  <texture filename=\"{}\"/>\n",
            xml_escape(texture)
        ));
    }
    urdf.push_str(&format!("{pad}</material>\n"));
}

pub fn write_link(urdf: &mut String, link: &LinkDescription) {
    if link.inertial.is_none() && link.visuals.is_empty() && link.collisions.is_empty() {
        urdf.push_str(&format!("  <link name=\"{}\"/>\n\n", xml_escape(&link.name)));
        return;
    }

    urdf.push_str(&format!("  <link name=\"{}\">\n", xml_escape(&link.name)));

    if let Some(ref inertial) = link.inertial {
        write_inertial(urdf, inertial);
    }
    for visual in &link.visuals {
        write_visual_element(urdf, visual);
    }
    for collision in &link.collisions {
        write_collision_element(urdf, collision);
    }

    urdf.push_str("  </link>\n\n");
}

pub fn write_inertial(urdf: &mut String, inertial: &Inertial) {
    match inertial.calculation_mode {
        Some(mode) => urdf.push_str(&format!(
            "    <inertial calculation_mode=\"{}\">\n",
            mode.as_str()
        )),
        None => urdf.push_str("    <inertial>\n"),
    }
    write_origin(urdf, &inertial.origin, 6);
    urdf.push_str(&format!("      <mass value=\"{}\"/>\n", inertial.mass));
    let inertia = &inertial.inertia;
    urdf.push_str(&format!(
        "      <inertia ixx=\"{}\" ixy=\"{}\" ixz=\"{}\" iyy=\"{}\" iyz=\"{}\" izz=\"{}\"/>\n",
        inertia.ixx, inertia.ixy, inertia.ixz, inertia.iyy, inertia.iyz, inertia.izz
    ));
    urdf.push_str("    </inertial>\n");
}

pub fn write_geometry(urdf: &mut String, geometry: &Geometry) {
    urdf.push_str("      <geometry>\n        ");
    match geometry {
        Geometry::Box { size } => urdf.push_str(&format!("<box size=\"{}\"/>", vec3(*size))),
        Geometry::Cylinder { radius, length } => urdf.push_str(&format!(
            "<cylinder radius=\"{radius}\" length=\"{length}\"/>"
        )),
        Geometry::Capsule { radius, length } => urdf.push_str(&format!(
            "<capsule radius=\"{radius}\" length=\"{length}\"/>"
        )),
        Geometry::Sphere { radius } => urdf.push_str(&format!("<sphere radius=\"{radius}\"/>")),
        Geometry::Mesh { filename, scale } => {
            urdf.push_str(&format!("<mesh filename=\"{}\"", xml_escape(filename)));
            if let Some(scale) = scale {
                urdf.push_str(&format!(" scale=\"{}\"", vec3(*scale)));
            }
            urdf.push_str("/>");
        }
    }
    urdf.push_str("\n      </geometry>\n");
}

pub fn write_visual_element(urdf: &mut String, visual: &Visual) {
    if let Some(ref n) = visual.name {
        urdf.push_str(&format!("    <visual name=\"{}\">\n", xml_escape(n)));
    } else {
        urdf.push_str("    <visual>\n");
    }

    write_origin(urdf, &visual.origin, 6);
    write_geometry(urdf, &visual.geometry);
    if let Some(ref material) = visual.material {
        write_material(urdf, material, 6);
    }
    urdf.push_str("    </visual>\n");
}

pub fn write_collision_element(urdf: &mut String, collision: &Collision) {
    if let Some(ref n) = collision.name {
        urdf.push_str(&format!("    <collision name=\"{}\">\n", xml_escape(n)));
    } else {
        urdf.push_str("    <collision>\n");
    }

    write_origin(urdf, &collision.origin, 6);
    write_geometry(urdf, &collision.geometry);
    urdf.push_str("    </collision>\n");
}

pub fn write_joint(urdf: &mut String, joint: &JointDescription) {
    urdf.push_str(&format!(
        "  <joint name=\"{}\" type=\"{}\">\n",
        xml_escape(&joint.name),
        joint.joint_type.as_str()
    ));
    urdf.push_str(&format!(
        "    <parent link=\"{}\"/>\n",
        xml_escape(&joint.parent)
    ));
    urdf.push_str(&format!(
        "    <child link=\"{}\"/>\n",
        xml_escape(&joint.child)
    ));
    write_origin(urdf, &joint.origin, 4);

    if joint.joint_type.has_axis() || joint.axis != DVec3::X {
        urdf.push_str(&format!("    <axis xyz=\"{}\"/>\n", vec3(joint.axis)));
    }

    if let Some(ref limits) = joint.limit {
        urdf.push_str(&format!(
            "    <limit lower=\"{}\" upper=\"{}\"",
            limits.lower, limits.upper
        ));
        if limits.effort.is_finite() {
            urdf.push_str(&format!(" effort=\"{}\"", limits.effort));
        }
        urdf.push_str(&format!(" velocity=\"{}\"/>\n", limits.velocity));
    }

    if let Some(ref dynamics) = joint.dynamics {
        urdf.push_str("    <dynamics");
        if dynamics.spring != DEFAULT_SPRING {
            urdf.push_str(&format!(" spring=\"{}\"", dynamics.spring));
        }
        urdf.push_str(&format!(
            " damping=\"{}\" friction=\"{}\"/>\n",
            dynamics.damping, dynamics.friction
        ));
    }

    if let Some(ref mimic) = joint.mimic {
        urdf.push_str(&format!("    <mimic joint=\"{}\"", xml_escape(&mimic.joint)));
        if mimic.multiplier != 1.0 {
            urdf.push_str(&format!(" multiplier=\"{}\"", mimic.multiplier));
        }
        if mimic.offset != 0.0 {
            urdf.push_str(&format!(" offset=\"{}\"", mimic.offset));
        }
        urdf.push_str("/>\n");
    }

    if let Some(ref safety) = joint.safety_controller {
        urdf.push_str(&format!(
            "    <safety_controller soft_lower_limit=\"{}\" soft_upper_limit=\"{}\" k_position=\"{}\" k_velocity=\"{}\"/>\n",
            safety.soft_lower_limit, safety.soft_upper_limit, safety.k_position, safety.k_velocity
        ));
    }

    if let Some(ref calibration) = joint.calibration {
        urdf.push_str("    <calibration");
        if let Some(rising) = calibration.rising {
            urdf.push_str(&format!(" rising=\"{rising}\""));
        }
        if let Some(falling) = calibration.falling {
            urdf.push_str(&format!(" falling=\"{falling}\""));
        }
        urdf.push_str("/>\n");
    }

    urdf.push_str("  </joint>\n\n");
}

pub fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::description::{
        InertiaCalculationMode, JointDynamics, JointLimit, JointMimic, JointType, PluginBlock,
    };
    use crate::math::InertiaMatrix;

    #[test]
    fn test_xml_escape() {
        assert_eq!(xml_escape(r#"a<b>&"c'"#), "a&lt;b&gt;&amp;&quot;c&apos;");
    }

    #[test]
    fn test_joint_defaults_are_omitted() {
        let mut joint = JointDescription::new("j", JointType::Revolute, "a", "b");
        joint.limit = Some(JointLimit::with_range(-1.0, 1.0));
        joint.dynamics = Some(JointDynamics::default());
        joint.mimic = Some(JointMimic::new("other"));

        let mut urdf = String::new();
        write_joint(&mut urdf, &joint);

        assert!(urdf.contains("<axis xyz=\"1 0 0\"/>"));
        assert!(urdf.contains("<limit lower=\"-1\" upper=\"1\" velocity=\"0\"/>"));
        assert!(urdf.contains("<dynamics damping=\"10\" friction=\"0\"/>"));
        assert!(urdf.contains("<mimic joint=\"other\"/>"));
        assert!(!urdf.contains("<origin"));
    }

    #[test]
    fn test_fixed_joint_axis_only_when_not_default() {
        let mut joint = JointDescription::new("j", JointType::Fixed, "a", "b");
        let mut urdf = String::new();
        write_joint(&mut urdf, &joint);
        assert!(!urdf.contains("<axis"));

        joint.axis = DVec3::Y;
        let mut urdf = String::new();
        write_joint(&mut urdf, &joint);
        assert!(urdf.contains("<axis xyz=\"0 1 0\"/>"));
    }

    #[test]
    fn test_inertial_and_materials() {
        let mut link = LinkDescription::new("base");
        link.inertial = Some(Inertial {
            origin: Some(Pose::from_translation(DVec3::new(0.0, 0.0, 0.5))),
            mass: 2.0,
            inertia: InertiaMatrix::diagonal(0.1, 0.2, 0.3),
            calculation_mode: Some(InertiaCalculationMode::ForceAutomatic),
        });
        let mut visual = Visual::new(Geometry::Sphere { radius: 0.25 });
        visual.material = Some(MaterialDescription::new("red").with_color([1.0, 0.0, 0.0, 1.0]));
        link.visuals.push(visual);

        let mut urdf = String::new();
        write_link(&mut urdf, &link);

        assert!(urdf.contains("<inertial calculation_mode=\"force-automatic\">"));
        assert!(urdf.contains("<origin xyz=\"0 0 0.5\" rpy=\"0 0 0\"/>"));
        assert!(urdf.contains(
            "<inertia ixx=\"0.1\" ixy=\"0\" ixz=\"0\" iyy=\"0.2\" iyz=\"0\" izz=\"0.3\"/>"
        ));
        assert!(urdf.contains("<sphere radius=\"0.25\"/>"));
        assert!(urdf.contains("<color rgba=\"1 0 0 1\"/>"));
    }

    #[test]
    fn test_document_order_and_plugins() {
        let mut robot = RobotDescription::new("r&d");
        robot.links.push(LinkDescription::new("a"));
        robot.links.push(LinkDescription::new("b"));
        robot
            .joints
            .push(JointDescription::new("j", JointType::Fixed, "a", "b"));
        robot.materials.push(MaterialDescription::new("grey"));
        robot.collision_ignore.push(("a".into(), "b".into()));
        robot.plugins.push(PluginBlock {
            tag: "gazebo".into(),
            raw: "<gazebo><static>true</static></gazebo>".into(),
        });

        let urdf = generate_urdf_string(&robot).unwrap();
        assert!(urdf.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<robot name=\"r&amp;d\">"));

        let positions: Vec<usize> = [
            "<material",
            "<link name=\"a\"/>",
            "<joint",
            "<disable_collisions",
            "<gazebo>",
            "</robot>",
        ]
        .iter()
        .map(|needle| urdf.find(needle).unwrap())
        .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_malformed_plugin_is_rejected() {
        let mut robot = RobotDescription::new("r");
        robot.links.push(LinkDescription::new("a"));
        robot.plugins.push(PluginBlock {
            tag: "gazebo".into(),
            raw: "<gazebo><a></b></gazebo>".into(),
        });
        assert!(matches!(
            generate_urdf_string(&robot),
            Err(ExportError::Xml(_))
        ));
    }
}
