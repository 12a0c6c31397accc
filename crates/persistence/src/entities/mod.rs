//! Database entity definitions.
//!
//! Entities are direct mappings to database rows.

pub mod ban;
pub mod event;
pub mod favorite;
pub mod friendship;
pub mod notification;
pub mod user;

pub use ban::{BanActionDb, BanHistoryEntity, BanListEntity, BanStatsEntity, UserBanEntity};
pub use event::{
    EventInviteEntity, EventInviteInfoEntity, EventParticipantEntity, InviteStatusDb,
    ParticipantEntity,
};
pub use favorite::FavoriteEntity;
pub use friendship::{FriendEntity, FriendRequestEntity, FriendRequestInfoEntity, FriendRequestStatusDb};
pub use notification::{
    NotificationEntity, NotificationStatsEntity, NotificationStatusDb, NotificationSummaryEntity,
    NotificationTypeDb,
};
pub use user::{UserEntity, UserProfileEntity};
