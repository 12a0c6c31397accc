//! Background job scheduler and job implementations.

mod notification_cleanup;
mod scheduler;
mod session_cleanup;

pub use notification_cleanup::NotificationCleanupJob;
pub use scheduler::{Job, JobScheduler};
pub use session_cleanup::SessionCleanupJob;
