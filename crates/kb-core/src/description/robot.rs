//! Whole-document description

use serde::{Deserialize, Serialize};

use super::joint::JointDescription;
use super::link::LinkDescription;
use super::material::MaterialDescription;

/// Unrecognised `<robot>` child kept as raw XML and written back verbatim
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginBlock {
    /// Element name, e.g. `gazebo`
    pub tag: String,
    /// The full element, start tag to end tag
    pub raw: String,
}

/// Parsed `<robot>` document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RobotDescription {
    pub name: String,
    pub links: Vec<LinkDescription>,
    pub joints: Vec<JointDescription>,
    /// Robot-level `<material>` declarations
    pub materials: Vec<MaterialDescription>,
    /// Link pairs from `<disable_collisions link1 link2/>`
    pub collision_ignore: Vec<(String, String)>,
    pub plugins: Vec<PluginBlock>,
}

impl RobotDescription {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn link(&self, name: &str) -> Option<&LinkDescription> {
        self.links.iter().find(|l| l.name == name)
    }

    pub fn link_mut(&mut self, name: &str) -> Option<&mut LinkDescription> {
        self.links.iter_mut().find(|l| l.name == name)
    }

    pub fn joint(&self, name: &str) -> Option<&JointDescription> {
        self.joints.iter().find(|j| j.name == name)
    }

    /// Joint whose child is `link`
    pub fn parent_joint_of(&self, link: &str) -> Option<&JointDescription> {
        self.joints.iter().find(|j| j.child == link)
    }

    pub fn material(&self, name: &str) -> Option<&MaterialDescription> {
        self.materials.iter().find(|m| m.name == name)
    }
}
