// Check-in Kiosk - Core Library
// Movement recording and reporting for the campus check-in kiosks.
// Exposes all modules for use in the CLI, the UI layer, and tests.

pub mod config;
pub mod db;
pub mod directory;
pub mod kiosk;
pub mod movements;
pub mod notify;
pub mod reports;

// Re-export commonly used types
pub use config::{parse_area_list, KioskConfig};
pub use db::{setup_database, MovementStore, StorageError};
pub use directory::{normalize_name, Directory, DirectoryRow, DirectorySource};
pub use kiosk::{KioskError, KioskSession, KioskState};
pub use movements::{day_interval, Direction, MovementEvent, MovementService};
pub use notify::{CheckinNotice, LogNotifier, Notifier};
pub use reports::{parse_report_date, MovementSummary, ReportService};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
