//! The control set, in declaration (report) order.

mod drift;
mod presence;
mod process;
mod service;
mod sync;

pub use drift::{DriftFreshnessControl, DriftIntegrityControl};
pub use presence::PresenceControl;
pub use process::ProcessIdentityControl;
pub use service::ServiceStateControl;
pub use sync::LiveSyncControl;

use crate::control::Control;

/// All controls in evaluation order. Order is for report readability;
/// controls have no data dependency on each other.
pub fn all_controls() -> Vec<Box<dyn Control>> {
    vec![
        Box::new(PresenceControl),
        Box::new(ServiceStateControl),
        Box::new(ProcessIdentityControl),
        Box::new(DriftIntegrityControl),
        Box::new(DriftFreshnessControl),
        Box::new(LiveSyncControl),
    ]
}
