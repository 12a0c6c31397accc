//! In-process implementation of every domain port.
//!
//! One mutex guards the whole state, so each port call is a single atomic
//! unit just like the PostgreSQL transactions. Used by the api tests and by
//! local runs without a database.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::{
    models::{
        ban::ensure_bannable, canonical_pair, BanAction, BanCommand, BanHistoryEntry,
        BanListItem, BanState, BanStats, EventInvite, EventInviteInfo, EventParticipant,
        Favorite, FriendInfo, FriendRequest, FriendRequestAction, FriendRequestInfo, FriendRequestStatus,
        Friendship, InviteAction, InviteStatus, NewEventInvite, NewNotification, NewUser,
        Notification, NotificationStats, NotificationStatus, NotificationSummary,
        NotificationType, ParticipantInfo, User, UserBan, UserProfile,
    },
    ports::{
        BanStore, EventStore, FavoriteStore, FriendshipStore, IdentityStore, NotificationSink,
    },
    DomainError, UserId,
};
use shared::pagination::PageRequest;

const SEARCH_LIMIT: usize = 20;

#[derive(Default)]
struct State {
    next_id: i64,
    users: BTreeMap<UserId, User>,
    requests: BTreeMap<i64, FriendRequest>,
    friendships: BTreeMap<(UserId, UserId), Friendship>,
    invites: BTreeMap<i64, EventInvite>,
    /// Keyed by (user, post).
    participants: BTreeMap<(UserId, i64), DateTime<Utc>>,
    /// Keyed by (user, post); the id orders same-instant inserts.
    favorites: BTreeMap<(UserId, i64), (i64, DateTime<Utc>)>,
    bans: BTreeMap<i64, UserBan>,
    history: Vec<BanHistoryEntry>,
    notifications: BTreeMap<i64, Notification>,
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn user(&self, id: UserId) -> Result<&User, DomainError> {
        self.users
            .get(&id)
            .ok_or_else(|| DomainError::not_found("User not found"))
    }

    fn profile(&self, id: UserId) -> Option<UserProfile> {
        self.users.get(&id).map(User::profile)
    }

    fn are_friends(&self, a: UserId, b: UserId) -> bool {
        self.friendships.contains_key(&canonical_pair(a, b))
    }

    fn friend_ids(&self, user: UserId) -> Vec<UserId> {
        self.friendships
            .values()
            .filter_map(|f| f.other(user))
            .collect()
    }

    fn pending_between(&self, a: UserId, b: UserId) -> bool {
        self.requests.values().any(|r| {
            r.status == FriendRequestStatus::Pending
                && ((r.sender_id == a && r.receiver_id == b)
                    || (r.sender_id == b && r.receiver_id == a))
        })
    }

    fn active_ban(&self, user: UserId) -> Option<&UserBan> {
        self.bans.values().find(|b| b.user_id == user && b.is_active)
    }

    fn push_history(&mut self, user_id: UserId, admin_id: UserId, action: BanAction, reason: &str, ban_id: i64) {
        let id = self.next_id();
        self.history.push(BanHistoryEntry {
            id,
            user_id,
            admin_id,
            action,
            reason: reason.to_string(),
            ban_id: Some(ban_id),
            created_at: Utc::now(),
        });
    }

    fn with_sender(&self, mut notification: Notification) -> Notification {
        notification.sender_username = notification
            .sender_id
            .and_then(|id| self.users.get(&id))
            .map(|u| u.username.clone());
        notification
    }

    fn ownership_failure(&self, id: i64) -> DomainError {
        if self.notifications.contains_key(&id) {
            DomainError::Unauthorized("Notification belongs to another user".to_string())
        } else {
            DomainError::not_found("Notification not found")
        }
    }

    fn request_info(&self, request: &FriendRequest, counterpart: UserId) -> Option<FriendRequestInfo> {
        self.profile(counterpart).map(|user| FriendRequestInfo {
            id: request.id,
            user,
            status: request.status,
            created_at: request.created_at,
        })
    }
}

/// Thread-safe store backing all ports with plain collections.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Grants or revokes admin rights; there is no API for this.
    pub fn set_admin(&self, id: UserId, is_admin: bool) -> Result<(), DomainError> {
        let mut state = self.lock();
        let user = state
            .users
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found("User not found"))?;
        user.is_admin = is_admin;
        Ok(())
    }

    /// Moves a notification's expiry, for exercising cleanup.
    pub fn set_notification_expiry(&self, id: i64, expires_at: Option<DateTime<Utc>>) -> Result<(), DomainError> {
        let mut state = self.lock();
        let notification = state
            .notifications
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found("Notification not found"))?;
        notification.expires_at = expires_at;
        Ok(())
    }
}

#[async_trait]
impl IdentityStore for MemoryStore {
    async fn create_user(&self, user: NewUser) -> Result<User, DomainError> {
        let mut state = self.lock();
        let email = user.email.to_lowercase();
        if state
            .users
            .values()
            .any(|u| u.username == user.username || u.email == email)
        {
            return Err(DomainError::Conflict(
                "Username or email already registered".to_string(),
            ));
        }

        let id = state.next_id();
        let created = User {
            id,
            username: user.username,
            email,
            first_name: user.first_name,
            last_name: user.last_name,
            password_hash: user.password_hash,
            is_admin: false,
            is_active: true,
            created_at: Utc::now(),
        };
        state.users.insert(id, created.clone());
        Ok(created)
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, DomainError> {
        Ok(self.lock().users.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DomainError> {
        let email = email.to_lowercase();
        Ok(self.lock().users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_login(&self, identifier: &str) -> Result<Option<User>, DomainError> {
        let state = self.lock();
        let by_username = state.users.values().find(|u| u.username == identifier);
        let lowered = identifier.to_lowercase();
        Ok(by_username
            .or_else(|| state.users.values().find(|u| u.email == lowered))
            .cloned())
    }

    async fn set_active(&self, id: UserId, active: bool) -> Result<(), DomainError> {
        let mut state = self.lock();
        let user = state
            .users
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found("User not found"))?;
        user.is_active = active;
        Ok(())
    }

    async fn toggle_active(&self, id: UserId) -> Result<bool, DomainError> {
        let mut state = self.lock();
        let banned = state.active_ban(id).is_some();
        let user = state
            .users
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found("User not found"))?;
        if !user.is_active && banned {
            return Err(DomainError::Conflict(
                "User has an active ban; lift the ban to reactivate them".to_string(),
            ));
        }
        user.is_active = !user.is_active;
        Ok(user.is_active)
    }

    async fn update_password(&self, id: UserId, password_hash: &str) -> Result<(), DomainError> {
        let mut state = self.lock();
        let user = state
            .users
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found("User not found"))?;
        user.password_hash = password_hash.to_string();
        Ok(())
    }

    async fn list_users(&self) -> Result<Vec<User>, DomainError> {
        let mut users: Vec<User> = self.lock().users.values().cloned().collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(users)
    }

    async fn count_users(&self) -> Result<i64, DomainError> {
        Ok(self.lock().users.len() as i64)
    }
}

#[async_trait]
impl FriendshipStore for MemoryStore {
    async fn create_request(&self, sender: UserId, receiver: UserId) -> Result<FriendRequest, DomainError> {
        if sender == receiver {
            return Err(DomainError::SelfReference(
                "You cannot send a friend request to yourself".to_string(),
            ));
        }

        let mut state = self.lock();
        state.user(sender)?;
        state.user(receiver)?;

        if state.are_friends(sender, receiver) {
            return Err(DomainError::Conflict(
                "You are already friends with this user".to_string(),
            ));
        }
        if state.pending_between(sender, receiver) {
            return Err(DomainError::Conflict(
                "A pending friend request already exists between you and this user".to_string(),
            ));
        }

        let id = state.next_id();
        let now = Utc::now();
        let request = FriendRequest {
            id,
            sender_id: sender,
            receiver_id: receiver,
            status: FriendRequestStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        state.requests.insert(id, request.clone());
        Ok(request)
    }

    async fn respond_to_request(
        &self,
        request_id: i64,
        actor: UserId,
        action: FriendRequestAction,
    ) -> Result<FriendRequest, DomainError> {
        let mut state = self.lock();
        let current = state
            .requests
            .get(&request_id)
            .cloned()
            .ok_or_else(|| DomainError::not_found("Friend request not found"))?;

        let next = current.transition(action, actor)?;
        let now = Utc::now();

        if next == FriendRequestStatus::Accepted {
            let edge = Friendship::between(current.sender_id, current.receiver_id, now)?;
            state
                .friendships
                .entry((edge.user1_id, edge.user2_id))
                .or_insert(edge);
        }

        let updated = FriendRequest {
            status: next,
            updated_at: now,
            ..current
        };
        state.requests.insert(request_id, updated.clone());
        Ok(updated)
    }

    async fn find_request(&self, request_id: i64) -> Result<Option<FriendRequest>, DomainError> {
        Ok(self.lock().requests.get(&request_id).cloned())
    }

    async fn remove_friendship(&self, a: UserId, b: UserId) -> Result<(), DomainError> {
        self.lock()
            .friendships
            .remove(&canonical_pair(a, b))
            .map(|_| ())
            .ok_or_else(|| DomainError::not_found("You are not friends with this user"))
    }

    async fn are_friends(&self, a: UserId, b: UserId) -> Result<bool, DomainError> {
        Ok(self.lock().are_friends(a, b))
    }

    async fn list_friends(&self, user: UserId) -> Result<Vec<FriendInfo>, DomainError> {
        let state = self.lock();
        let mut friends: Vec<FriendInfo> = state
            .friendships
            .values()
            .filter_map(|f| {
                let other = f.other(user)?;
                state.profile(other).map(|profile| FriendInfo {
                    user: profile,
                    friends_since: f.created_at,
                })
            })
            .collect();
        friends.sort_by(|a, b| {
            (&a.user.first_name, &a.user.last_name, a.user.id)
                .cmp(&(&b.user.first_name, &b.user.last_name, b.user.id))
        });
        Ok(friends)
    }

    async fn incoming_requests(&self, user: UserId) -> Result<Vec<FriendRequestInfo>, DomainError> {
        let state = self.lock();
        Ok(state
            .requests
            .values()
            .rev()
            .filter(|r| r.receiver_id == user && r.status == FriendRequestStatus::Pending)
            .filter_map(|r| state.request_info(r, r.sender_id))
            .collect())
    }

    async fn outgoing_requests(&self, user: UserId) -> Result<Vec<FriendRequestInfo>, DomainError> {
        let state = self.lock();
        Ok(state
            .requests
            .values()
            .rev()
            .filter(|r| r.sender_id == user && r.status == FriendRequestStatus::Pending)
            .filter_map(|r| state.request_info(r, r.receiver_id))
            .collect())
    }

    async fn search_candidates(&self, user: UserId, term: &str) -> Result<Vec<UserProfile>, DomainError> {
        let state = self.lock();
        let mut found: Vec<UserProfile> = state
            .users
            .values()
            .filter(|u| u.id != user && u.is_active)
            .filter(|u| !state.are_friends(user, u.id) && !state.pending_between(user, u.id))
            .map(User::profile)
            .filter(|p| p.matches(term))
            .collect();
        found.sort_by(|a, b| a.username.cmp(&b.username));
        found.truncate(SEARCH_LIMIT);
        Ok(found)
    }

    async fn mutual_friends(&self, a: UserId, b: UserId) -> Result<Vec<UserProfile>, DomainError> {
        let state = self.lock();
        let of_b = state.friend_ids(b);
        let mut mutual: Vec<UserProfile> = state
            .friend_ids(a)
            .into_iter()
            .filter(|id| of_b.contains(id))
            .filter_map(|id| state.profile(id))
            .collect();
        mutual.sort_by(|x, y| x.username.cmp(&y.username));
        Ok(mutual)
    }

    async fn friend_count(&self, user: UserId) -> Result<i64, DomainError> {
        Ok(self.lock().friend_ids(user).len() as i64)
    }
}

#[async_trait]
impl EventStore for MemoryStore {
    async fn send_invite(&self, invite: NewEventInvite) -> Result<EventInvite, DomainError> {
        if invite.sender_id == invite.receiver_id {
            return Err(DomainError::SelfReference(
                "You cannot invite yourself to an event".to_string(),
            ));
        }

        let mut state = self.lock();
        state.user(invite.sender_id)?;
        state.user(invite.receiver_id)?;

        if !state.are_friends(invite.sender_id, invite.receiver_id) {
            return Err(DomainError::Forbidden(
                "You can only invite friends to events".to_string(),
            ));
        }
        if state
            .participants
            .contains_key(&(invite.receiver_id, invite.post_id))
        {
            return Err(DomainError::Conflict(
                "This user already participates in the event".to_string(),
            ));
        }

        let existing = state
            .invites
            .values()
            .find(|i| i.receiver_id == invite.receiver_id && i.post_id == invite.post_id)
            .cloned();
        let now = Utc::now();

        let saved = match existing {
            Some(current) if current.status == InviteStatus::Pending => {
                return Err(DomainError::Conflict(
                    "An invite for this event is already pending".to_string(),
                ));
            }
            Some(current) => EventInvite {
                sender_id: invite.sender_id,
                message: invite.message,
                status: InviteStatus::Pending,
                updated_at: now,
                ..current
            },
            None => EventInvite {
                id: state.next_id(),
                sender_id: invite.sender_id,
                receiver_id: invite.receiver_id,
                post_id: invite.post_id,
                message: invite.message,
                status: InviteStatus::Pending,
                created_at: now,
                updated_at: now,
            },
        };
        state.invites.insert(saved.id, saved.clone());
        Ok(saved)
    }

    async fn respond_to_invite(
        &self,
        invite_id: i64,
        actor: UserId,
        action: InviteAction,
    ) -> Result<EventInvite, DomainError> {
        let mut state = self.lock();
        let current = state
            .invites
            .get(&invite_id)
            .cloned()
            .ok_or_else(|| DomainError::not_found("Event invite not found"))?;

        let next = current.transition(action, actor)?;
        let now = Utc::now();

        if next == InviteStatus::Accepted {
            state
                .participants
                .entry((current.receiver_id, current.post_id))
                .or_insert(now);
        }

        let updated = EventInvite {
            status: next,
            updated_at: now,
            ..current
        };
        state.invites.insert(invite_id, updated.clone());
        Ok(updated)
    }

    async fn pending_invites(&self, user: UserId) -> Result<Vec<EventInviteInfo>, DomainError> {
        let state = self.lock();
        let mut pending: Vec<(DateTime<Utc>, EventInviteInfo)> = state
            .invites
            .values()
            .filter(|i| i.receiver_id == user && i.status == InviteStatus::Pending)
            .filter_map(|i| {
                state.profile(i.sender_id).map(|sender| {
                    (
                        i.updated_at,
                        EventInviteInfo {
                            id: i.id,
                            post_id: i.post_id,
                            sender,
                            message: i.message.clone(),
                            status: i.status,
                            created_at: i.created_at,
                        },
                    )
                })
            })
            .collect();
        pending.sort_by(|a, b| b.0.cmp(&a.0).then(b.1.id.cmp(&a.1.id)));
        Ok(pending.into_iter().map(|(_, info)| info).collect())
    }

    async fn join(&self, user: UserId, post_id: i64) -> Result<EventParticipant, DomainError> {
        let mut state = self.lock();
        state.user(user)?;
        if state.participants.contains_key(&(user, post_id)) {
            return Err(DomainError::Conflict(
                "You already participate in this event".to_string(),
            ));
        }
        let registered_at = Utc::now();
        state.participants.insert((user, post_id), registered_at);
        Ok(EventParticipant {
            user_id: user,
            post_id,
            registered_at,
        })
    }

    async fn leave(&self, user: UserId, post_id: i64) -> Result<(), DomainError> {
        self.lock()
            .participants
            .remove(&(user, post_id))
            .map(|_| ())
            .ok_or_else(|| DomainError::not_found("You do not participate in this event"))
    }

    async fn is_participant(&self, user: UserId, post_id: i64) -> Result<bool, DomainError> {
        Ok(self.lock().participants.contains_key(&(user, post_id)))
    }

    async fn participants(&self, post_id: i64) -> Result<Vec<ParticipantInfo>, DomainError> {
        let state = self.lock();
        let mut list: Vec<ParticipantInfo> = state
            .participants
            .iter()
            .filter(|((_, post), _)| *post == post_id)
            .filter_map(|((user, _), registered_at)| {
                state.profile(*user).map(|profile| ParticipantInfo {
                    user: profile,
                    registered_at: *registered_at,
                })
            })
            .collect();
        list.sort_by(|a, b| a.registered_at.cmp(&b.registered_at).then(a.user.id.cmp(&b.user.id)));
        Ok(list)
    }

    async fn participations(&self, user: UserId) -> Result<Vec<EventParticipant>, DomainError> {
        let state = self.lock();
        let mut list: Vec<EventParticipant> = state
            .participants
            .iter()
            .filter(|((u, _), _)| *u == user)
            .map(|((user_id, post_id), registered_at)| EventParticipant {
                user_id: *user_id,
                post_id: *post_id,
                registered_at: *registered_at,
            })
            .collect();
        list.sort_by(|a, b| b.registered_at.cmp(&a.registered_at));
        Ok(list)
    }

    async fn available_friends(&self, user: UserId, post_id: i64) -> Result<Vec<UserProfile>, DomainError> {
        let state = self.lock();
        let mut friends: Vec<UserProfile> = state
            .friend_ids(user)
            .into_iter()
            .filter(|id| !state.participants.contains_key(&(*id, post_id)))
            .filter(|id| {
                !state.invites.values().any(|i| {
                    i.receiver_id == *id && i.post_id == post_id && i.status == InviteStatus::Pending
                })
            })
            .filter_map(|id| state.profile(id))
            .collect();
        friends.sort_by(|a, b| (&a.first_name, &a.last_name, a.id).cmp(&(&b.first_name, &b.last_name, b.id)));
        Ok(friends)
    }
}

#[async_trait]
impl BanStore for MemoryStore {
    async fn ban(&self, command: BanCommand) -> Result<UserBan, DomainError> {
        let mut state = self.lock();
        let target_is_admin = state.user(command.target)?.is_admin;
        ensure_bannable(target_is_admin)?;
        BanState::from_active(state.active_ban(command.target)).apply(BanAction::Ban)?;

        let ban = UserBan {
            id: state.next_id(),
            user_id: command.target,
            banned_by_admin_id: command.admin_id,
            reason: command.reason,
            banned_at: Utc::now(),
            unbanned_at: None,
            unbanned_by_admin_id: None,
            is_active: true,
            notes: command.notes,
        };
        state.bans.insert(ban.id, ban.clone());
        if let Some(user) = state.users.get_mut(&command.target) {
            user.is_active = false;
        }
        state.push_history(command.target, command.admin_id, BanAction::Ban, &ban.reason, ban.id);
        Ok(ban)
    }

    async fn unban(&self, target: UserId, admin_id: UserId, reason: &str) -> Result<UserBan, DomainError> {
        let mut state = self.lock();
        state.user(target)?;
        let active = state.active_ban(target).cloned();
        BanState::from_active(active.as_ref()).apply(BanAction::Unban)?;
        let mut ban = active.ok_or(DomainError::NoActiveBan)?;

        ban.lift(admin_id, reason, Utc::now());
        state.bans.insert(ban.id, ban.clone());
        if let Some(user) = state.users.get_mut(&target) {
            user.is_active = true;
        }
        state.push_history(target, admin_id, BanAction::Unban, reason, ban.id);
        Ok(ban)
    }

    async fn active_ban(&self, user: UserId) -> Result<Option<UserBan>, DomainError> {
        Ok(self.lock().active_ban(user).cloned())
    }

    async fn find_ban(&self, ban_id: i64) -> Result<Option<UserBan>, DomainError> {
        Ok(self.lock().bans.get(&ban_id).cloned())
    }

    async fn active_bans(&self) -> Result<Vec<BanListItem>, DomainError> {
        let state = self.lock();
        let mut list: Vec<BanListItem> = state
            .bans
            .values()
            .filter(|b| b.is_active)
            .filter_map(|b| {
                let username = state.users.get(&b.user_id)?.username.clone();
                let banned_by_username = state.users.get(&b.banned_by_admin_id)?.username.clone();
                Some(BanListItem {
                    ban: b.clone(),
                    username,
                    banned_by_username,
                })
            })
            .collect();
        list.sort_by(|a, b| b.ban.banned_at.cmp(&a.ban.banned_at).then(b.ban.id.cmp(&a.ban.id)));
        Ok(list)
    }

    async fn history(&self, user: UserId) -> Result<Vec<BanHistoryEntry>, DomainError> {
        Ok(self
            .lock()
            .history
            .iter()
            .rev()
            .filter(|h| h.user_id == user)
            .cloned()
            .collect())
    }

    async fn stats(&self) -> Result<BanStats, DomainError> {
        let state = self.lock();
        let today = Utc::now().date_naive();
        Ok(BanStats {
            active_bans: state.bans.values().filter(|b| b.is_active).count() as i64,
            total_bans: state.bans.len() as i64,
            unbanned_today: state
                .bans
                .values()
                .filter(|b| b.unbanned_at.map(|at| at.date_naive() == today).unwrap_or(false))
                .count() as i64,
        })
    }
}

#[async_trait]
impl FavoriteStore for MemoryStore {
    async fn add_favorite(&self, user: UserId, post_id: i64) -> Result<bool, DomainError> {
        let mut state = self.lock();
        state.user(user)?;
        if state.favorites.contains_key(&(user, post_id)) {
            return Ok(false);
        }
        let id = state.next_id();
        state.favorites.insert((user, post_id), (id, Utc::now()));
        Ok(true)
    }

    async fn remove_favorite(&self, user: UserId, post_id: i64) -> Result<bool, DomainError> {
        Ok(self.lock().favorites.remove(&(user, post_id)).is_some())
    }

    async fn is_favorite(&self, user: UserId, post_id: i64) -> Result<bool, DomainError> {
        Ok(self.lock().favorites.contains_key(&(user, post_id)))
    }

    async fn favorites(&self, user: UserId) -> Result<Vec<Favorite>, DomainError> {
        let state = self.lock();
        let mut entries: Vec<(i64, Favorite)> = state
            .favorites
            .iter()
            .filter(|((u, _), _)| *u == user)
            .map(|((user_id, post_id), (id, created_at))| {
                (
                    *id,
                    Favorite {
                        user_id: *user_id,
                        post_id: *post_id,
                        created_at: *created_at,
                    },
                )
            })
            .collect();
        entries.sort_by(|a, b| {
            b.1.created_at
                .cmp(&a.1.created_at)
                .then(b.0.cmp(&a.0))
        });
        Ok(entries.into_iter().map(|(_, favorite)| favorite).collect())
    }
}

#[async_trait]
impl NotificationSink for MemoryStore {
    async fn create(&self, notification: NewNotification) -> Result<Notification, DomainError> {
        let mut state = self.lock();
        state.user(notification.user_id)?;

        let id = state.next_id();
        let now = Utc::now();
        let created = Notification {
            id,
            user_id: notification.user_id,
            notification_type: notification.notification_type,
            title: notification.title,
            message: notification.message,
            related_id: notification.related_id,
            sender_id: notification.sender_id,
            sender_username: None,
            status: NotificationStatus::Unread,
            created_at: now,
            updated_at: now,
            expires_at: notification.expires_at,
        };
        state.notifications.insert(id, created.clone());
        Ok(state.with_sender(created))
    }

    async fn list_for_user(&self, user: UserId, page: PageRequest) -> Result<Vec<Notification>, DomainError> {
        let state = self.lock();
        let now = Utc::now();
        let mut mine: Vec<&Notification> = state
            .notifications
            .values()
            .filter(|n| n.user_id == user && !n.is_expired_at(now))
            .collect();
        mine.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let (start, end) = page.bounds(mine.len());
        Ok(mine[start..end]
            .iter()
            .map(|n| state.with_sender((*n).clone()))
            .collect())
    }

    async fn summary(&self, user: UserId) -> Result<NotificationSummary, DomainError> {
        let state = self.lock();
        let now = Utc::now();
        Ok(NotificationSummary::tally(
            state
                .notifications
                .values()
                .filter(|n| n.user_id == user && n.is_unread() && !n.is_expired_at(now))
                .map(|n| n.notification_type),
        ))
    }

    async fn mark_read(&self, id: i64, user: UserId) -> Result<(), DomainError> {
        let mut state = self.lock();
        match state.notifications.get_mut(&id) {
            Some(n) if n.user_id == user => {
                n.status = NotificationStatus::Read;
                n.updated_at = Utc::now();
                return Ok(());
            }
            _ => {}
        }
        Err(state.ownership_failure(id))
    }

    async fn mark_all_read(&self, user: UserId) -> Result<u64, DomainError> {
        let mut state = self.lock();
        let now = Utc::now();
        let mut changed = 0;
        for n in state
            .notifications
            .values_mut()
            .filter(|n| n.user_id == user && n.is_unread())
        {
            n.status = NotificationStatus::Read;
            n.updated_at = now;
            changed += 1;
        }
        Ok(changed)
    }

    async fn delete(&self, id: i64, user: UserId) -> Result<(), DomainError> {
        let mut state = self.lock();
        let owned = state.notifications.get(&id).map(|n| n.user_id == user);
        if owned != Some(true) {
            return Err(state.ownership_failure(id));
        }
        state.notifications.remove(&id);
        Ok(())
    }

    async fn delete_by_related(
        &self,
        user: UserId,
        notification_type: NotificationType,
        related_id: i64,
    ) -> Result<u64, DomainError> {
        let mut state = self.lock();
        let before = state.notifications.len();
        state.notifications.retain(|_, n| {
            !(n.user_id == user
                && n.notification_type == notification_type
                && n.related_id == Some(related_id))
        });
        Ok((before - state.notifications.len()) as u64)
    }

    async fn delete_expired(&self) -> Result<u64, DomainError> {
        let mut state = self.lock();
        let now = Utc::now();
        let before = state.notifications.len();
        state
            .notifications
            .retain(|_, n| n.expires_at.map(|at| at > now).unwrap_or(true));
        Ok((before - state.notifications.len()) as u64)
    }

    async fn stats(&self) -> Result<NotificationStats, DomainError> {
        let state = self.lock();
        let now = Utc::now();
        Ok(NotificationStats {
            total: state.notifications.len() as i64,
            unread: state.notifications.values().filter(|n| n.is_unread()).count() as i64,
            expired: state
                .notifications
                .values()
                .filter(|n| n.expires_at.map(|at| at <= now).unwrap_or(false))
                .count() as i64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::sync::Arc;

    fn new_user(name: &str) -> NewUser {
        NewUser {
            username: name.to_string(),
            email: format!("{}@Example.com", name),
            password_hash: "hash".to_string(),
            first_name: name.to_string(),
            last_name: "Rossi".to_string(),
        }
    }

    async fn seed(store: &MemoryStore, names: &[&str]) -> Vec<UserId> {
        let mut ids = Vec::new();
        for name in names {
            ids.push(store.create_user(new_user(name)).await.unwrap().id);
        }
        ids
    }

    async fn befriend(store: &MemoryStore, a: UserId, b: UserId) {
        let req = store.create_request(a, b).await.unwrap();
        store
            .respond_to_request(req.id, b, FriendRequestAction::Accept)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_duplicate_user_is_conflict() {
        let store = MemoryStore::new();
        seed(&store, &["marco"]).await;
        let err = store.create_user(new_user("marco")).await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_email_lookup_is_case_insensitive() {
        let store = MemoryStore::new();
        seed(&store, &["anna"]).await;
        let found = store.find_by_email("ANNA@example.COM").await.unwrap();
        assert_eq!(found.unwrap().username, "anna");
        assert!(store.find_by_login("anna").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_accept_creates_single_canonical_edge() {
        let store = MemoryStore::new();
        let ids = seed(&store, &["a", "b"]).await;
        let (a, b) = (ids[0], ids[1]);

        let req = store.create_request(b, a).await.unwrap();
        let accepted = store
            .respond_to_request(req.id, a, FriendRequestAction::Accept)
            .await
            .unwrap();
        assert_eq!(accepted.status, FriendRequestStatus::Accepted);

        let state = store.lock();
        assert_eq!(state.friendships.len(), 1);
        let edge = state.friendships.values().next().unwrap();
        assert!(edge.user1_id < edge.user2_id);
    }

    #[tokio::test]
    async fn test_pending_request_blocks_both_directions() {
        let store = MemoryStore::new();
        let ids = seed(&store, &["a", "b"]).await;
        store.create_request(ids[0], ids[1]).await.unwrap();

        let again = store.create_request(ids[0], ids[1]).await.unwrap_err();
        let reverse = store.create_request(ids[1], ids[0]).await.unwrap_err();
        assert!(matches!(again, DomainError::Conflict(_)));
        assert!(matches!(reverse, DomainError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_rerequest_after_rejection_creates_new_row() {
        let store = MemoryStore::new();
        let ids = seed(&store, &["a", "b"]).await;
        let first = store.create_request(ids[0], ids[1]).await.unwrap();
        store
            .respond_to_request(first.id, ids[1], FriendRequestAction::Reject)
            .await
            .unwrap();

        let second = store.create_request(ids[0], ids[1]).await.unwrap();
        assert_ne!(first.id, second.id);
        assert_eq!(second.status, FriendRequestStatus::Pending);
    }

    #[tokio::test]
    async fn test_concurrent_accepts_yield_one_success() {
        let store = Arc::new(MemoryStore::new());
        let ids = seed(&store, &["a", "b"]).await;
        let req = store.create_request(ids[0], ids[1]).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            let receiver = ids[1];
            handles.push(tokio::spawn(async move {
                store
                    .respond_to_request(req.id, receiver, FriendRequestAction::Accept)
                    .await
            }));
        }

        let mut ok = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => ok += 1,
                Err(e) => assert!(matches!(e, DomainError::InvalidState(_))),
            }
        }
        assert_eq!(ok, 1);
        assert_eq!(store.friend_count(ids[0]).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_invite_requires_friendship() {
        let store = MemoryStore::new();
        let ids = seed(&store, &["a", "b"]).await;
        let err = store
            .send_invite(NewEventInvite {
                sender_id: ids[0],
                receiver_id: ids[1],
                post_id: 9,
                message: String::new(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_reinvite_after_reject_reuses_row() {
        let store = MemoryStore::new();
        let ids = seed(&store, &["a", "b"]).await;
        befriend(&store, ids[0], ids[1]).await;

        let invite = NewEventInvite {
            sender_id: ids[0],
            receiver_id: ids[1],
            post_id: 9,
            message: "calcetto".to_string(),
        };
        let first = store.send_invite(invite.clone()).await.unwrap();
        assert!(matches!(
            store.send_invite(invite.clone()).await,
            Err(DomainError::Conflict(_))
        ));

        store
            .respond_to_invite(first.id, ids[1], InviteAction::Reject)
            .await
            .unwrap();
        let again = store.send_invite(invite).await.unwrap();
        assert_eq!(again.id, first.id);
        assert_eq!(again.status, InviteStatus::Pending);
    }

    #[tokio::test]
    async fn test_accepting_invite_adds_participant() {
        let store = MemoryStore::new();
        let ids = seed(&store, &["a", "b", "c"]).await;
        befriend(&store, ids[0], ids[1]).await;
        befriend(&store, ids[0], ids[2]).await;

        let invite = store
            .send_invite(NewEventInvite {
                sender_id: ids[0],
                receiver_id: ids[1],
                post_id: 3,
                message: String::new(),
            })
            .await
            .unwrap();
        store
            .respond_to_invite(invite.id, ids[1], InviteAction::Accept)
            .await
            .unwrap();

        assert!(store.is_participant(ids[1], 3).await.unwrap());
        let available = store.available_friends(ids[0], 3).await.unwrap();
        assert_eq!(available.len(), 1);
        assert_eq!(available[0].id, ids[2]);
    }

    #[tokio::test]
    async fn test_join_twice_and_leave_absent() {
        let store = MemoryStore::new();
        let ids = seed(&store, &["a"]).await;
        store.join(ids[0], 5).await.unwrap();
        assert!(matches!(store.join(ids[0], 5).await, Err(DomainError::Conflict(_))));
        store.leave(ids[0], 5).await.unwrap();
        assert!(matches!(store.leave(ids[0], 5).await, Err(DomainError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_ban_lifecycle() {
        let store = MemoryStore::new();
        let ids = seed(&store, &["admin", "user"]).await;
        store.set_admin(ids[0], true).unwrap();

        let command = BanCommand {
            target: ids[1],
            admin_id: ids[0],
            reason: "spam".to_string(),
            notes: None,
        };
        let ban = store.ban(command.clone()).await.unwrap();
        assert!(!store.find_by_id(ids[1]).await.unwrap().unwrap().is_active);
        assert_eq!(store.ban(command).await.unwrap_err(), DomainError::AlreadyBanned);

        assert_eq!(store.find_ban(ban.id).await.unwrap().unwrap().reason, "spam");
        assert!(store.find_ban(ban.id + 100).await.unwrap().is_none());

        let lifted = store.unban(ids[1], ids[0], "appeal").await.unwrap();
        assert_eq!(lifted.id, ban.id);
        assert_eq!(lifted.notes.as_deref(), Some("[unban] appeal"));
        assert!(store.find_by_id(ids[1]).await.unwrap().unwrap().is_active);
        assert_eq!(
            store.unban(ids[1], ids[0], "again").await.unwrap_err(),
            DomainError::NoActiveBan
        );

        let history = store.history(ids[1]).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].action, BanAction::Unban);

        let stats = BanStore::stats(&store).await.unwrap();
        assert_eq!(stats.total_bans, 1);
        assert_eq!(stats.active_bans, 0);
        assert_eq!(stats.unbanned_today, 1);
    }

    #[tokio::test]
    async fn test_toggle_active_respects_active_ban() {
        let store = MemoryStore::new();
        let ids = seed(&store, &["admin", "user"]).await;
        store.set_admin(ids[0], true).unwrap();

        assert!(!store.toggle_active(ids[1]).await.unwrap());
        assert!(store.toggle_active(ids[1]).await.unwrap());

        store
            .ban(BanCommand {
                target: ids[1],
                admin_id: ids[0],
                reason: "spam".to_string(),
                notes: None,
            })
            .await
            .unwrap();
        assert!(matches!(
            store.toggle_active(ids[1]).await,
            Err(DomainError::Conflict(_))
        ));
        assert!(!store.find_by_id(ids[1]).await.unwrap().unwrap().is_active);
        assert!(matches!(
            store.toggle_active(999).await,
            Err(DomainError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_admin_cannot_be_banned() {
        let store = MemoryStore::new();
        let ids = seed(&store, &["admin", "other"]).await;
        store.set_admin(ids[0], true).unwrap();
        store.set_admin(ids[1], true).unwrap();
        let err = store
            .ban(BanCommand {
                target: ids[1],
                admin_id: ids[0],
                reason: "x".to_string(),
                notes: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_notification_ownership() {
        let store = MemoryStore::new();
        let ids = seed(&store, &["a", "b"]).await;
        let n = store
            .create(NewNotification::new(ids[0], NotificationType::General, "t", "m").from_sender(ids[1]))
            .await
            .unwrap();
        assert_eq!(n.sender_username.as_deref(), Some("b"));

        assert!(matches!(
            store.mark_read(n.id, ids[1]).await,
            Err(DomainError::Unauthorized(_))
        ));
        assert!(matches!(
            store.mark_read(9999, ids[0]).await,
            Err(DomainError::NotFound(_))
        ));
        store.mark_read(n.id, ids[0]).await.unwrap();
        assert_eq!(store.summary(ids[0]).await.unwrap().unread_count, 0);

        assert!(matches!(
            store.delete(n.id, ids[1]).await,
            Err(DomainError::Unauthorized(_))
        ));
        store.delete(n.id, ids[0]).await.unwrap();
    }

    #[tokio::test]
    async fn test_expired_notifications_are_hidden_and_purged() {
        let store = MemoryStore::new();
        let ids = seed(&store, &["a"]).await;
        let kept = store
            .create(NewNotification::new(ids[0], NotificationType::EventInvite, "t", "m"))
            .await
            .unwrap();
        let stale = store
            .create(
                NewNotification::new(ids[0], NotificationType::FriendRequest, "t", "m")
                    .expiring_at(Some(Utc::now() - Duration::minutes(1))),
            )
            .await
            .unwrap();

        let listed = store.list_for_user(ids[0], PageRequest::default()).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, kept.id);

        let summary = store.summary(ids[0]).await.unwrap();
        assert_eq!(summary.unread_count, 1);
        assert_eq!(summary.event_invites, 1);
        assert_eq!(summary.friend_requests, 0);

        assert_eq!(NotificationSink::stats(&store).await.unwrap().expired, 1);
        assert_eq!(store.delete_expired().await.unwrap(), 1);
        assert!(store.lock().notifications.get(&stale.id).is_none());
    }

    #[tokio::test]
    async fn test_favorites_are_idempotent_and_newest_first() {
        let store = MemoryStore::new();
        let ids = seed(&store, &["marco", "giulia"]).await;

        assert!(store.add_favorite(ids[0], 10).await.unwrap());
        assert!(!store.add_favorite(ids[0], 10).await.unwrap());
        assert!(store.add_favorite(ids[0], 20).await.unwrap());
        assert!(store.add_favorite(ids[1], 10).await.unwrap());

        let posts: Vec<i64> = store
            .favorites(ids[0])
            .await
            .unwrap()
            .iter()
            .map(|f| f.post_id)
            .collect();
        assert_eq!(posts, vec![20, 10]);

        assert!(store.remove_favorite(ids[0], 10).await.unwrap());
        assert!(!store.remove_favorite(ids[0], 10).await.unwrap());
        assert!(!store.is_favorite(ids[0], 10).await.unwrap());
        assert!(store.is_favorite(ids[1], 10).await.unwrap());
    }

    #[tokio::test]
    async fn test_update_password_replaces_hash() {
        let store = MemoryStore::new();
        let ids = seed(&store, &["marco"]).await;
        store.update_password(ids[0], "new-hash").await.unwrap();
        let user = store.find_by_id(ids[0]).await.unwrap().unwrap();
        assert_eq!(user.password_hash, "new-hash");

        let err = store.update_password(999, "x").await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
    }
}
