//! TSAudit control core - profile resolution and compliance control evaluation.

pub mod control;
pub mod checks;
pub mod patterns;
pub mod profile;
pub mod runner;

#[cfg(test)]
pub(crate) mod testutil;

pub use control::{Assertion, Control, ControlContext, ControlResult, ControlSettings, ControlStatus};
pub use profile::{resolve, Package, PackageChoice, PlatformProfile, ResolvedProfile};
pub use runner::{run_controls, RunReport};
