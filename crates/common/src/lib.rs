//! Common types shared across tsaudit crates.

pub mod error;
pub mod inspect;
pub mod os;

pub use error::{Error, Result};
pub use inspect::{CommandOutput, FileStat, Inspector, ProcessInfo, ServiceState};
pub use os::{EnvironmentFacts, OsFamily, OsInfo, VirtRole, Virtualization};
