//! Pull parser from URDF XML into the description model

use std::borrow::Cow;
use std::collections::HashSet;

use glam::DVec3;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use super::ImportError;
use crate::constants::MIN_AXIS_NORM;
use crate::description::{
    Calibration, Collision, Geometry, InertiaCalculationMode, Inertial, JointDescription,
    JointDynamics, JointLimit, JointMimic, JointType, LinkDescription, MaterialDescription,
    PluginBlock, Pose, RobotDescription, SafetyController, Visual,
};
use crate::diagnostics::{Warning, WarningSink};
use crate::math::InertiaMatrix;

type Result<T> = std::result::Result<T, ImportError>;
type XmlReader<'a> = Reader<&'a [u8]>;

pub(super) fn parse_document(xml: &str, sink: &mut dyn WarningSink) -> Result<RobotDescription> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    loop {
        match reader.read_event()? {
            Event::Start(e) if e.name().as_ref() == b"robot" => {
                return parse_robot(&mut reader, &e, sink);
            }
            Event::Empty(e) if e.name().as_ref() == b"robot" => {
                get_attribute(&e, "name")?;
                return Err(ImportError::EmptyRobot);
            }
            Event::Eof => return Err(ImportError::missing_element("robot", "document")),
            _ => {}
        }
    }
}

fn parse_robot(
    reader: &mut XmlReader<'_>,
    start: &BytesStart,
    sink: &mut dyn WarningSink,
) -> Result<RobotDescription> {
    let mut robot = RobotDescription::new(get_attribute(start, "name")?);
    let mut link_names = HashSet::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.name().as_ref() {
                b"link" => {
                    let link = parse_link(reader, &e)?;
                    push_link(&mut robot, &mut link_names, link)?;
                }
                b"joint" => robot.joints.push(parse_joint(reader, &e, sink)?),
                b"material" => robot.materials.push(parse_material(reader, &e)?),
                b"disable_collisions" => {
                    robot.collision_ignore.push(parse_collision_pair(&e)?);
                    skip_element(reader, &e)?;
                }
                _ => robot.plugins.push(capture_plugin(reader, &e)?),
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"link" => {
                    let link = LinkDescription::new(get_attribute(&e, "name")?);
                    push_link(&mut robot, &mut link_names, link)?;
                }
                b"joint" => {
                    // A joint needs <parent> and <child> children
                    let name = get_attribute(&e, "name")?;
                    return Err(ImportError::missing_element("parent", format!("joint '{name}'")));
                }
                b"material" => robot
                    .materials
                    .push(MaterialDescription::new(get_attribute(&e, "name")?)),
                b"disable_collisions" => robot.collision_ignore.push(parse_collision_pair(&e)?),
                _ => robot.plugins.push(PluginBlock {
                    tag: element_name(&e),
                    raw: format!("<{}/>", String::from_utf8_lossy(&e)),
                }),
            },
            Event::End(e) if e.name().as_ref() == b"robot" => break,
            Event::Eof => return Err(ImportError::Xml("unexpected EOF in robot".into())),
            _ => {}
        }
    }

    if robot.links.is_empty() {
        return Err(ImportError::EmptyRobot);
    }

    tracing::debug!(
        "Parsed robot '{}': {} links, {} joints, {} plugin blocks",
        robot.name,
        robot.links.len(),
        robot.joints.len(),
        robot.plugins.len()
    );

    Ok(robot)
}

/// Reject a second link with the same name as soon as it is read
fn push_link(
    robot: &mut RobotDescription,
    names: &mut HashSet<String>,
    link: LinkDescription,
) -> Result<()> {
    if !names.insert(link.name.clone()) {
        return Err(ImportError::InvalidName {
            name: link.name,
            reason: "duplicate link names are invalid".into(),
        });
    }
    robot.links.push(link);
    Ok(())
}

fn parse_link(reader: &mut XmlReader<'_>, start: &BytesStart) -> Result<LinkDescription> {
    let mut link = LinkDescription::new(get_attribute(start, "name")?);

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.name().as_ref() {
                b"inertial" => link.inertial = Some(parse_inertial(reader, &e)?),
                b"visual" => link.visuals.push(parse_visual(reader, &e)?),
                b"collision" => link.collisions.push(parse_collision(reader, &e)?),
                _ => skip_element(reader, &e)?,
            },
            Event::Empty(e) => {
                if e.name().as_ref() == b"inertial" {
                    link.inertial = Some(inertial_attributes(&e)?);
                }
            }
            Event::End(e) if e.name().as_ref() == b"link" => break,
            Event::Eof => return Err(ImportError::Xml("unexpected EOF in link".into())),
            _ => {}
        }
    }

    Ok(link)
}

fn inertial_attributes(e: &BytesStart) -> Result<Inertial> {
    let calculation_mode = get_attribute_opt(e, "calculation_mode")?
        .map(|value| {
            value.parse::<InertiaCalculationMode>().map_err(|_| {
                ImportError::invalid_attribute(
                    "calculation_mode",
                    "inertial",
                    format!("unknown calculation mode '{value}'"),
                )
            })
        })
        .transpose()?;

    Ok(Inertial {
        calculation_mode,
        ..Default::default()
    })
}

fn parse_inertial(reader: &mut XmlReader<'_>, start: &BytesStart) -> Result<Inertial> {
    let mut inertial = inertial_attributes(start)?;

    loop {
        let event = reader.read_event()?;
        let nested = matches!(event, Event::Start(_));
        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                match e.name().as_ref() {
                    b"origin" => inertial.origin = Some(parse_origin(e)?),
                    b"mass" => inertial.mass = parse_float_required(e, "value")?,
                    b"inertia" => inertial.inertia = parse_inertia_element(e)?,
                    _ => {}
                }
                // Everything read here is a leaf; drop whatever is nested inside
                if nested {
                    skip_element(reader, e)?;
                }
            }
            Event::End(e) if e.name().as_ref() == b"inertial" => break,
            Event::Eof => return Err(ImportError::Xml("unexpected EOF in inertial".into())),
            _ => {}
        }
    }

    Ok(inertial)
}

fn parse_inertia_element(e: &BytesStart) -> Result<InertiaMatrix> {
    Ok(InertiaMatrix {
        ixx: parse_float_attr(e, "ixx")?.unwrap_or(0.0),
        ixy: parse_float_attr(e, "ixy")?.unwrap_or(0.0),
        ixz: parse_float_attr(e, "ixz")?.unwrap_or(0.0),
        iyy: parse_float_attr(e, "iyy")?.unwrap_or(0.0),
        iyz: parse_float_attr(e, "iyz")?.unwrap_or(0.0),
        izz: parse_float_attr(e, "izz")?.unwrap_or(0.0),
    })
}

fn parse_origin(e: &BytesStart) -> Result<Pose> {
    let xyz = parse_vector3_attr(e, "xyz")?.unwrap_or(DVec3::ZERO);
    let rpy = parse_vector3_attr(e, "rpy")?.unwrap_or(DVec3::ZERO);
    Ok(Pose::new(xyz, rpy))
}

fn parse_visual(reader: &mut XmlReader<'_>, start: &BytesStart) -> Result<Visual> {
    let name = get_attribute_opt(start, "name")?;
    let mut origin = None;
    let mut geometry = None;
    let mut material = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.name().as_ref() {
                b"origin" => {
                    origin = Some(parse_origin(&e)?);
                    skip_element(reader, &e)?;
                }
                b"geometry" => geometry = Some(parse_geometry(reader)?),
                b"material" => material = Some(parse_material(reader, &e)?),
                _ => skip_element(reader, &e)?,
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"origin" => origin = Some(parse_origin(&e)?),
                b"geometry" => return Err(ImportError::missing_element("shape", "geometry")),
                b"material" => material = Some(MaterialDescription::new(get_attribute(&e, "name")?)),
                _ => {}
            },
            Event::End(e) if e.name().as_ref() == b"visual" => break,
            Event::Eof => return Err(ImportError::Xml("unexpected EOF in visual".into())),
            _ => {}
        }
    }

    let geometry = geometry.ok_or_else(|| ImportError::missing_element("geometry", "visual"))?;

    Ok(Visual {
        name,
        origin,
        geometry,
        material,
    })
}

fn parse_collision(reader: &mut XmlReader<'_>, start: &BytesStart) -> Result<Collision> {
    let name = get_attribute_opt(start, "name")?;
    let mut origin = None;
    let mut geometry = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.name().as_ref() {
                b"origin" => {
                    origin = Some(parse_origin(&e)?);
                    skip_element(reader, &e)?;
                }
                b"geometry" => geometry = Some(parse_geometry(reader)?),
                _ => skip_element(reader, &e)?,
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"origin" => origin = Some(parse_origin(&e)?),
                b"geometry" => return Err(ImportError::missing_element("shape", "geometry")),
                _ => {}
            },
            Event::End(e) if e.name().as_ref() == b"collision" => break,
            Event::Eof => return Err(ImportError::Xml("unexpected EOF in collision".into())),
            _ => {}
        }
    }

    let geometry =
        geometry.ok_or_else(|| ImportError::missing_element("geometry", "collision"))?;

    Ok(Collision {
        name,
        origin,
        geometry,
    })
}

fn parse_geometry(reader: &mut XmlReader<'_>) -> Result<Geometry> {
    let mut geometry = None;

    loop {
        let event = reader.read_event()?;
        let nested = matches!(event, Event::Start(_));
        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                match e.name().as_ref() {
                    b"box" => {
                        let size = parse_vector3_attr(e, "size")?
                            .ok_or_else(|| ImportError::missing_attribute("size", "box"))?;
                        geometry = Some(Geometry::Box { size });
                    }
                    b"cylinder" => {
                        geometry = Some(Geometry::Cylinder {
                            radius: parse_float_required(e, "radius")?,
                            length: parse_float_required(e, "length")?,
                        });
                    }
                    b"capsule" => {
                        geometry = Some(Geometry::Capsule {
                            radius: parse_float_required(e, "radius")?,
                            length: parse_float_required(e, "length")?,
                        });
                    }
                    b"sphere" => {
                        geometry = Some(Geometry::Sphere {
                            radius: parse_float_required(e, "radius")?,
                        });
                    }
                    b"mesh" => {
                        geometry = Some(Geometry::Mesh {
                            filename: get_attribute(e, "filename")?,
                            scale: parse_vector3_attr(e, "scale")?,
                        });
                    }
                    _ => {}
                }
                // Everything read here is a leaf; drop whatever is nested inside
                if nested {
                    skip_element(reader, e)?;
                }
            }
            Event::End(e) if e.name().as_ref() == b"geometry" => break,
            Event::Eof => return Err(ImportError::Xml("unexpected EOF in geometry".into())),
            _ => {}
        }
    }

    geometry.ok_or_else(|| ImportError::missing_element("shape", "geometry"))
}

/// `<material>` with optional `<color>` and `<texture>` children
fn parse_material(reader: &mut XmlReader<'_>, start: &BytesStart) -> Result<MaterialDescription> {
    let mut material = MaterialDescription::new(get_attribute(start, "name")?);

    loop {
        let event = reader.read_event()?;
        let nested = matches!(event, Event::Start(_));
        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                match e.name().as_ref() {
                    b"color" => {
                        let rgba = get_attribute(e, "rgba")?;
                        let values = parse_floats(&rgba, "rgba", "color")?;
                        let rgba: [f64; 4] = values.try_into().map_err(|v: Vec<f64>| {
                            ImportError::invalid_attribute(
                                "rgba",
                                "color",
                                format!("expected 4 values, got {}", v.len()),
                            )
                        })?;
                        material.color = Some(rgba);
                    }
                    b"texture" => material.texture = Some(get_attribute(e, "filename")?),
                    _ => {}
                }
                // Everything read here is a leaf; drop whatever is nested inside
                if nested {
                    skip_element(reader, e)?;
                }
            }
            Event::End(e) if e.name().as_ref() == b"material" => break,
            Event::Eof => return Err(ImportError::Xml("unexpected EOF in material".into())),
            _ => {}
        }
    }

    Ok(material)
}

fn parse_joint(
    reader: &mut XmlReader<'_>,
    start: &BytesStart,
    sink: &mut dyn WarningSink,
) -> Result<JointDescription> {
    let name = get_attribute(start, "name")?;
    let type_str = get_attribute(start, "type")?;
    let joint_type = type_str
        .parse::<JointType>()
        .map_err(|joint_type| ImportError::UnknownJointType {
            joint: name.clone(),
            joint_type,
        })?;

    let mut parent = None;
    let mut child = None;
    let mut origin = None;
    let mut axis = None;
    let mut calibration = None;
    let mut dynamics = None;
    let mut limit = None;
    let mut mimic = None;
    let mut safety_controller = None;

    loop {
        let event = reader.read_event()?;
        let nested = matches!(event, Event::Start(_));
        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                match e.name().as_ref() {
                    b"origin" => origin = Some(parse_origin(e)?),
                    b"parent" => parent = Some(get_attribute(e, "link")?),
                    b"child" => child = Some(get_attribute(e, "link")?),
                    b"axis" => axis = parse_vector3_attr(e, "xyz")?,
                    b"calibration" => {
                        calibration = Some(Calibration {
                            rising: parse_float_attr(e, "rising")?,
                            falling: parse_float_attr(e, "falling")?,
                        });
                    }
                    b"dynamics" => dynamics = Some(parse_dynamics(e)?),
                    b"limit" => limit = Some(parse_limit(e)?),
                    b"mimic" => {
                        let defaults = JointMimic::new(get_attribute(e, "joint")?);
                        mimic = Some(JointMimic {
                            multiplier: parse_float_attr(e, "multiplier")?
                                .unwrap_or(defaults.multiplier),
                            offset: parse_float_attr(e, "offset")?.unwrap_or(defaults.offset),
                            ..defaults
                        });
                    }
                    b"safety_controller" => {
                        safety_controller = Some(SafetyController {
                            soft_lower_limit: parse_float_attr(e, "soft_lower_limit")?.unwrap_or(0.0),
                            soft_upper_limit: parse_float_attr(e, "soft_upper_limit")?.unwrap_or(0.0),
                            k_position: parse_float_attr(e, "k_position")?.unwrap_or(0.0),
                            k_velocity: parse_float_required(e, "k_velocity")?,
                        });
                    }
                    _ => {}
                }
                // Everything read here is a leaf; drop whatever is nested inside
                if nested {
                    skip_element(reader, e)?;
                }
            }
            Event::End(e) if e.name().as_ref() == b"joint" => break,
            Event::Eof => return Err(ImportError::Xml("unexpected EOF in joint".into())),
            _ => {}
        }
    }

    let parent =
        parent.ok_or_else(|| ImportError::missing_element("parent", format!("joint '{name}'")))?;
    let child =
        child.ok_or_else(|| ImportError::missing_element("child", format!("joint '{name}'")))?;
    let axis = resolve_axis(&name, axis, sink);

    Ok(JointDescription {
        name,
        joint_type,
        parent,
        child,
        origin,
        axis,
        calibration,
        dynamics,
        limit,
        mimic,
        safety_controller,
    })
}

/// Normalize the declared axis, falling back to X when absent or degenerate
fn resolve_axis(joint: &str, axis: Option<DVec3>, sink: &mut dyn WarningSink) -> DVec3 {
    let Some(axis) = axis else {
        return DVec3::X;
    };

    // `!(a >= b)` also catches NaN
    if !(axis.length() >= MIN_AXIS_NORM) {
        sink.warn(Warning::AxisTooSmall {
            joint: joint.to_string(),
        });
        return DVec3::X;
    }

    axis.normalize()
}

fn parse_limit(e: &BytesStart) -> Result<JointLimit> {
    let defaults = JointLimit::default();
    Ok(JointLimit {
        lower: parse_float_attr(e, "lower")?.unwrap_or(defaults.lower),
        upper: parse_float_attr(e, "upper")?.unwrap_or(defaults.upper),
        effort: parse_float_attr(e, "effort")?.unwrap_or(defaults.effort),
        velocity: parse_float_attr(e, "velocity")?.unwrap_or(defaults.velocity),
    })
}

fn parse_dynamics(e: &BytesStart) -> Result<JointDynamics> {
    let defaults = JointDynamics::default();
    Ok(JointDynamics {
        spring: parse_float_attr(e, "spring")?.unwrap_or(defaults.spring),
        damping: parse_float_attr(e, "damping")?.unwrap_or(defaults.damping),
        friction: parse_float_attr(e, "friction")?.unwrap_or(defaults.friction),
    })
}

fn parse_collision_pair(e: &BytesStart) -> Result<(String, String)> {
    Ok((get_attribute(e, "link1")?, get_attribute(e, "link2")?))
}

/// Keep an unrecognised element, children included, exactly as written
fn capture_plugin(reader: &mut XmlReader<'_>, start: &BytesStart) -> Result<PluginBlock> {
    let tag = element_name(start);
    let inner = reader.read_text(start.name())?;
    Ok(PluginBlock {
        raw: format!("<{}>{}</{}>", String::from_utf8_lossy(start), inner, tag),
        tag,
    })
}

// ============================================================================
// Helper functions
// ============================================================================

/// Get a required attribute value
fn get_attribute(e: &BytesStart, name: &'static str) -> Result<String> {
    get_attribute_opt(e, name)?
        .ok_or_else(|| ImportError::missing_attribute(name, element_name(e)))
}

/// Get an optional attribute value, unescaped
fn get_attribute_opt(e: &BytesStart, name: &'static str) -> Result<Option<String>> {
    for attr in e.attributes() {
        let attr = attr.map_err(|err| ImportError::Xml(err.to_string()))?;
        if attr.key.as_ref() == name.as_bytes() {
            let value: Cow<'_, str> = attr.unescape_value().map_err(|err| {
                ImportError::invalid_attribute(name, element_name(e), err.to_string())
            })?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

/// Parse an optional float attribute; present but malformed is an error
fn parse_float_attr(e: &BytesStart, name: &'static str) -> Result<Option<f64>> {
    get_attribute_opt(e, name)?
        .map(|s| {
            s.trim().parse::<f64>().map_err(|_| {
                ImportError::invalid_attribute(
                    name,
                    element_name(e),
                    format!("expected a number, got '{s}'"),
                )
            })
        })
        .transpose()
}

fn parse_float_required(e: &BytesStart, name: &'static str) -> Result<f64> {
    parse_float_attr(e, name)?.ok_or_else(|| ImportError::missing_attribute(name, element_name(e)))
}

fn parse_vector3_attr(e: &BytesStart, name: &'static str) -> Result<Option<DVec3>> {
    get_attribute_opt(e, name)?
        .map(|s| parse_vector3(&s, name, &element_name(e)))
        .transpose()
}

/// Parse a space-separated vector3 string
fn parse_vector3(s: &str, attribute: &'static str, element: &str) -> Result<DVec3> {
    let parts = parse_floats(s, attribute, element)?;
    if parts.len() != 3 {
        return Err(ImportError::invalid_attribute(
            attribute,
            element,
            format!("expected 3 values, got {}: '{s}'", parts.len()),
        ));
    }
    Ok(DVec3::new(parts[0], parts[1], parts[2]))
}

fn parse_floats(s: &str, attribute: &'static str, element: &str) -> Result<Vec<f64>> {
    s.split_whitespace()
        .map(|p| p.parse::<f64>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|_| {
            ImportError::invalid_attribute(attribute, element, format!("invalid numbers: '{s}'"))
        })
}

/// Get element name as string for error messages
fn element_name(e: &BytesStart) -> String {
    String::from_utf8_lossy(e.name().as_ref()).to_string()
}

/// Skip an element and all its children
fn skip_element(reader: &mut XmlReader<'_>, start: &BytesStart) -> Result<()> {
    reader.read_to_end(start.name())?;
    Ok(())
}
