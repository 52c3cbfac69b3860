//! Local host inspection for tsaudit.

pub mod facts;
pub mod local;

pub use facts::detect_facts;
pub use local::LocalInspector;
