//! Kinematic tree built from the link/joint lists
//!
//! Joints only name their parent and child links; this module turns that
//! implicit graph into a single-rooted tree, or says precisely why it is not
//! one.

mod types;

use std::collections::{HashMap, HashSet, VecDeque};

use crate::description::{JointDescription, LinkDescription};

pub use types::{JointId, LinkId};

/// Why the links and joints do not form a tree
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StructuralError {
    #[error("Joint '{joint}' references unknown link '{link}'")]
    UnknownLink { joint: String, link: String },

    #[error("Link '{link}' is the child of more than one joint: {joints:?}")]
    MultipleParents { link: String, joints: Vec<String> },

    #[error("Kinematic cycle detected through link '{link}'")]
    Cycle { link: String },

    #[error("Duplicate link name: {0}")]
    DuplicateLink(String),

    #[error("Robot has no links")]
    Empty,

    #[error("Links not reachable from the root: {links:?}")]
    Disconnected { links: Vec<String> },
}

/// Single-rooted tree over link and joint indices
#[derive(Debug, Clone)]
pub struct KinematicTree {
    link_names: Vec<String>,
    joint_names: Vec<String>,
    link_index: HashMap<String, LinkId>,
    joint_index: HashMap<String, JointId>,
    /// Children mapping: parent_link -> [(joint, child_link)], declaration order
    children: Vec<Vec<(JointId, LinkId)>>,
    /// Parent mapping: child_link -> (joint, parent_link)
    parent: Vec<Option<(JointId, LinkId)>>,
    root: LinkId,
}

/// Validate the link/joint graph and index it as a tree
pub fn build_tree(
    links: &[LinkDescription],
    joints: &[JointDescription],
) -> Result<KinematicTree, StructuralError> {
    let mut link_index = HashMap::with_capacity(links.len());
    for (i, link) in links.iter().enumerate() {
        if link_index.insert(link.name.clone(), LinkId(i)).is_some() {
            return Err(StructuralError::DuplicateLink(link.name.clone()));
        }
    }

    let mut children = vec![Vec::new(); links.len()];
    let mut parent: Vec<Option<(JointId, LinkId)>> = vec![None; links.len()];
    let mut joint_index = HashMap::with_capacity(joints.len());

    for (i, joint) in joints.iter().enumerate() {
        let id = JointId(i);
        let lookup = |name: &str| {
            link_index
                .get(name)
                .copied()
                .ok_or_else(|| StructuralError::UnknownLink {
                    joint: joint.name.clone(),
                    link: name.to_string(),
                })
        };
        let parent_link = lookup(&joint.parent)?;
        let child_link = lookup(&joint.child)?;

        if let Some((previous, _)) = parent[child_link.0] {
            return Err(StructuralError::MultipleParents {
                link: joint.child.clone(),
                joints: vec![joints[previous.0].name.clone(), joint.name.clone()],
            });
        }

        parent[child_link.0] = Some((id, parent_link));
        children[parent_link.0].push((id, child_link));
        joint_index.entry(joint.name.clone()).or_insert(id);
    }

    let link_names: Vec<String> = links.iter().map(|l| l.name.clone()).collect();

    check_cycles(&parent, &link_names)?;

    let root = match joints.first() {
        None if links.is_empty() => return Err(StructuralError::Empty),
        None => LinkId(0),
        Some(first) => {
            let mut current = link_index[&first.parent];
            while let Some((_, up)) = parent[current.0] {
                current = up;
            }
            current
        }
    };

    let tree = KinematicTree {
        link_names,
        joint_names: joints.iter().map(|j| j.name.clone()).collect(),
        link_index,
        joint_index,
        children,
        parent,
        root,
    };

    let reachable: HashSet<LinkId> = tree.links_breadth_first().into_iter().collect();
    if reachable.len() != links.len() {
        let links = tree
            .link_names
            .iter()
            .enumerate()
            .filter(|(i, _)| !reachable.contains(&LinkId(*i)))
            .map(|(_, name)| name.clone())
            .collect();
        return Err(StructuralError::Disconnected { links });
    }

    tracing::debug!(
        "Built kinematic tree: root '{}', {} links",
        tree.link_name(root),
        tree.link_count()
    );

    Ok(tree)
}

/// Walk up from every link; with one parent per link a revisit means a loop
fn check_cycles(
    parent: &[Option<(JointId, LinkId)>],
    link_names: &[String],
) -> Result<(), StructuralError> {
    // Links already known to lead to a root
    let mut grounded = vec![false; parent.len()];

    for start in 0..parent.len() {
        let mut path = HashSet::new();
        let mut current = start;
        while !grounded[current] {
            if !path.insert(current) {
                return Err(StructuralError::Cycle {
                    link: link_names[current].clone(),
                });
            }
            match parent[current] {
                Some((_, up)) => current = up.0,
                None => break,
            }
        }
        for link in path {
            grounded[link] = true;
        }
    }

    Ok(())
}

impl KinematicTree {
    pub fn root(&self) -> LinkId {
        self.root
    }

    pub fn link_count(&self) -> usize {
        self.link_names.len()
    }

    pub fn joint_count(&self) -> usize {
        self.joint_names.len()
    }

    pub fn link_id(&self, name: &str) -> Option<LinkId> {
        self.link_index.get(name).copied()
    }

    pub fn joint_id(&self, name: &str) -> Option<JointId> {
        self.joint_index.get(name).copied()
    }

    pub fn link_name(&self, link: LinkId) -> &str {
        &self.link_names[link.0]
    }

    pub fn joint_name(&self, joint: JointId) -> &str {
        &self.joint_names[joint.0]
    }

    /// Incoming joint of `link`; `None` for the root
    pub fn parent_joint(&self, link: LinkId) -> Option<JointId> {
        self.parent[link.0].map(|(joint, _)| joint)
    }

    pub fn parent_link(&self, link: LinkId) -> Option<LinkId> {
        self.parent[link.0].map(|(_, up)| up)
    }

    /// Outgoing joints of `link` with their child links
    pub fn child_joints(&self, link: LinkId) -> &[(JointId, LinkId)] {
        &self.children[link.0]
    }

    /// Links in parent-to-child order starting at the root
    pub fn links_breadth_first(&self) -> Vec<LinkId> {
        let mut order = Vec::with_capacity(self.link_names.len());
        let mut queue = VecDeque::from([self.root]);
        while let Some(link) = queue.pop_front() {
            order.push(link);
            queue.extend(self.children[link.0].iter().map(|(_, child)| *child));
        }
        order
    }

    /// Number of joints between `link` and the root
    pub fn depth(&self, link: LinkId) -> usize {
        let mut depth = 0;
        let mut current = link;
        while let Some(up) = self.parent_link(current) {
            depth += 1;
            current = up;
        }
        depth
    }
}
