//! URDF ⇄ kinematic model conversion
//!
//! This crate contains:
//! - Description: URDF documents as plain data, with an XML reader and writer
//! - Assembly: validation of the link/joint graph into a single-rooted tree
//! - Convert: axis conventions and length units
//! - Inertial: mass property resolution with closed-form and Jacobi solvers
//! - Model: the converted scene graph, fixed-joint optimization and export

pub mod assembly;
pub mod constants;
pub mod convert;
pub mod description;
pub mod diagnostics;
pub mod export;
pub mod import;
pub mod inertial;
pub mod interop;
pub mod math;
pub mod model;
pub mod optimize;
pub mod settings;

pub use assembly::*;
pub use constants::*;
pub use convert::*;
pub use description::*;
pub use diagnostics::*;
pub use export::*;
pub use import::*;
pub use inertial::*;
pub use math::*;
pub use model::*;
pub use optimize::*;
pub use settings::*;
