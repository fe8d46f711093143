//! Notifier that writes notices to tracing output.

use tracing::{error, info, warn};

use fleetops_application::{Notice, NoticeLevel, Notifier};

/// Notifier for headless clients. Notices become log events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl TracingNotifier {
    /// Creates a new tracing notifier.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Notifier for TracingNotifier {
    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Info | NoticeLevel::Success => {
                info!(level = ?notice.level, "{}", notice.message);
            }
            NoticeLevel::Warning => warn!("{}", notice.message),
            NoticeLevel::Error => error!("{}", notice.message),
        }
    }
}
