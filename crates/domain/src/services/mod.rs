//! Domain services.
//!
//! Relationship services drive the store transitions and then emit
//! best-effort notifications.

pub mod ban;
pub mod event_invite;
pub mod friendship;
pub mod notification;
pub mod session;

pub use ban::BanService;
pub use event_invite::EventInviteService;
pub use friendship::FriendshipService;
pub use notification::{Notifier, DEFAULT_NOTIFICATION_TTL_DAYS};
pub use session::{Session, SessionLookup, SessionStore, DEFAULT_SESSION_TTL_DAYS};
