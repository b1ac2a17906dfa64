//! Custom chart values for the call analytics dashboard.
//!
//! Each chart (call duration, sad path) runs its own [`EditWorkflow`]:
//! capture an email, check whether values were saved under it before,
//! confirm the overwrite, edit a working copy and upsert it.

mod utils;

pub mod charts;
pub mod config;
pub mod dashboard;
pub mod db;
pub mod email;
pub mod notify;
pub mod session;
pub mod store;
pub mod workflow;

pub use charts::{ChartData, ChartDataset, ChartType, DurationDataset, SadPathDataset};
pub use config::DashboardConfig;
pub use dashboard::Dashboard;
pub use db::Database;
pub use email::EmailAddress;
pub use notify::{LogNotifier, NotificationLevel, Notifier, RecordingNotifier};
pub use session::{SessionProvider, SessionStore};
pub use store::{CustomValueStore, MemoryStore, StoredRecord};
pub use utils::logging::init_logging;
pub use workflow::{EditWorkflow, WorkflowError, WorkflowState};
