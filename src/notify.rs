// Check-in notifications - composes the message for a recorded movement.
// Delivery (SMTP or otherwise) lives outside the core, behind `Notifier`.

use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::movements::Direction;

/// The composed notification for one recorded movement.
#[derive(Debug, Clone)]
pub struct CheckinNotice {
    pub name: String,
    pub area: String,
    pub direction: Direction,
    pub occurred_at: DateTime<Utc>,
}

impl CheckinNotice {
    pub fn subject(&self) -> String {
        format!("{} Check-In: {}", self.area, self.name)
    }

    /// Body keeps the long-deployed template, `HH:MM:SS DD-MM-YYYY`
    /// timestamp included.
    pub fn body(&self) -> String {
        let verb = match self.direction {
            Direction::In => "checked in",
            Direction::Out => "checked out",
        };
        format!(
            "{} {} at {} at {}.",
            self.name,
            verb,
            self.area,
            self.occurred_at.format("%H:%M:%S %d-%m-%Y")
        )
    }
}

/// Delivery seam. A failed notification never undoes the persisted event;
/// callers log the error and move on.
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: &CheckinNotice) -> Result<()>;
}

/// Fallback notifier for deployments without a mail relay: the notice goes
/// to the log stream.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notice: &CheckinNotice) -> Result<()> {
        tracing::info!(
            subject = %notice.subject(),
            body = %notice.body(),
            "check-in notice"
        );
        Ok(())
    }
}
