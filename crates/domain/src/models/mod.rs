//! Domain models for Squadra.

pub mod ban;
pub mod event;
pub mod favorite;
pub mod friendship;
pub mod notification;
pub mod user;

pub use ban::{
    BanAction, BanCommand, BanHistoryEntry, BanInfo, BanListItem, BanState, BanStats,
    BanUserRequest, UnbanUserRequest, UserBan,
};
pub use event::{
    EventInvite, EventInviteInfo, EventParticipant, InviteAction, InviteStatus, NewEventInvite,
    ParticipantInfo, ParticipantsResponse, ParticipationStatusResponse, SendEventInviteRequest,
};
pub use favorite::{Favorite, FavoriteListResponse, FavoriteRequest, FavoriteStatus};
pub use friendship::{
    canonical_pair, FriendInfo, FriendListResponse, FriendRequest, FriendRequestAction,
    FriendRequestInfo, FriendRequestStatus, Friendship, FriendshipStatusResponse,
    SendFriendRequestRequest,
};
pub use notification::{
    ListNotificationsQuery, NewNotification, Notification, NotificationListResponse,
    NotificationStats, NotificationStatus, NotificationSummary, NotificationType,
};
pub use user::{
    AuthResponse, ChangePasswordRequest, EmailLookupQuery, LoginRequest, NewUser,
    RegisterRequest, SearchQuery, User, UserProfile,
};
