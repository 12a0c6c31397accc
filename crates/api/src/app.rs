use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use domain::{
    ports::{
        BanStore, EventStore, FavoriteStore, FriendshipStore, IdentityStore, NotificationSink,
        PostService,
    },
    services::{BanService, EventInviteService, FriendshipService, Notifier, SessionStore},
};
use persistence::{
    repositories::{
        BanRepository, EventRepository, FavoriteRepository, FriendshipRepository,
        NotificationRepository, UserRepository,
    },
    MemoryStore,
};
use shared::password::PasswordHasher;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::Config;
use crate::middleware::{metrics_handler, metrics_middleware, require_admin, trace_id};
use crate::routes::{admin, auth, events, favorites, friends, health, notifications, users};
use crate::services::{AuthService, SessionCookie};

/// The port implementations the services run on.
#[derive(Clone)]
pub struct Stores {
    pub identity: Arc<dyn IdentityStore>,
    pub friendships: Arc<dyn FriendshipStore>,
    pub events: Arc<dyn EventStore>,
    pub bans: Arc<dyn BanStore>,
    pub notifications: Arc<dyn NotificationSink>,
    pub favorites: Arc<dyn FavoriteStore>,
    /// Present when backed by PostgreSQL; used by the health check.
    pub pool: Option<PgPool>,
}

impl Stores {
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            identity: Arc::new(UserRepository::new(pool.clone())),
            friendships: Arc::new(FriendshipRepository::new(pool.clone())),
            events: Arc::new(EventRepository::new(pool.clone())),
            bans: Arc::new(BanRepository::new(pool.clone())),
            notifications: Arc::new(NotificationRepository::new(pool.clone())),
            favorites: Arc::new(FavoriteRepository::new(pool.clone())),
            pool: Some(pool),
        }
    }

    pub fn memory(store: Arc<MemoryStore>) -> Self {
        Self {
            identity: store.clone(),
            friendships: store.clone(),
            events: store.clone(),
            bans: store.clone(),
            notifications: store.clone(),
            favorites: store,
            pool: None,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub pool: Option<PgPool>,
    pub sessions: Arc<SessionStore>,
    pub cookies: SessionCookie,
    pub identity: Arc<dyn IdentityStore>,
    pub notifications: Arc<dyn NotificationSink>,
    pub favorites: Arc<dyn FavoriteStore>,
    pub posts: Arc<dyn PostService>,
    pub auth: Arc<AuthService>,
    pub friendships: Arc<FriendshipService>,
    pub events: Arc<EventInviteService>,
    pub bans: Arc<BanService>,
}

impl AppState {
    pub fn new(
        config: Config,
        stores: Stores,
        posts: Arc<dyn PostService>,
        hasher: Arc<dyn PasswordHasher>,
    ) -> Self {
        let sessions = Arc::new(SessionStore::new(config.session_ttl()));
        let notifier = Notifier::new(stores.notifications.clone(), Some(config.notification_ttl()));

        let friendships = Arc::new(FriendshipService::new(
            stores.identity.clone(),
            stores.friendships.clone(),
            notifier.clone(),
        ));
        let events = Arc::new(EventInviteService::new(
            stores.identity.clone(),
            stores.events.clone(),
            posts.clone(),
            notifier.clone(),
        ));
        let bans = Arc::new(BanService::new(
            stores.identity.clone(),
            stores.bans.clone(),
            notifier,
        ));
        let auth = Arc::new(AuthService::new(
            stores.identity.clone(),
            bans.clone(),
            sessions.clone(),
            hasher,
        ));

        Self {
            cookies: SessionCookie::new(&config.session),
            config: Arc::new(config),
            pool: stores.pool,
            sessions,
            identity: stores.identity,
            notifications: stores.notifications,
            favorites: stores.favorites,
            posts,
            auth,
            friendships,
            events,
            bans,
        }
    }
}

pub fn create_app(state: AppState) -> Router {
    let config = state.config.clone();

    let cors = if config.security.cors_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        // Credentialed requests need explicit origins, methods and headers.
        let origins: Vec<_> = config
            .security
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods([
                axum::http::Method::GET,
                axum::http::Method::POST,
                axum::http::Method::DELETE,
                axum::http::Method::OPTIONS,
            ])
            .allow_headers([axum::http::header::CONTENT_TYPE])
            .allow_credentials(true)
    };

    // Session-authenticated routes; handlers take a `CurrentUser`.
    let user_routes = Router::new()
        .route("/api/v1/auth/logout", post(auth::logout))
        .route("/api/v1/users/me", get(users::me))
        .route("/api/v1/users/me/password", post(users::change_password))
        .route("/api/v1/users/me/participations", get(users::participations))
        .route("/api/v1/users/search", get(users::search))
        .route("/api/v1/users/by-email", get(users::find_by_email))
        .route("/api/v1/users/:user_id", get(users::get_user))
        .route("/api/v1/favorites", post(favorites::add).get(favorites::list))
        .route(
            "/api/v1/favorites/:post_id",
            get(favorites::status).delete(favorites::remove),
        )
        .route(
            "/api/v1/friends/requests",
            post(friends::send_request).get(friends::incoming_requests),
        )
        .route("/api/v1/friends/requests/sent", get(friends::outgoing_requests))
        .route("/api/v1/friends/requests/:id/accept", post(friends::accept_request))
        .route("/api/v1/friends/requests/:id/reject", post(friends::reject_request))
        .route("/api/v1/friends/requests/:id/cancel", post(friends::cancel_request))
        .route("/api/v1/friends", get(friends::list_friends))
        .route("/api/v1/friends/count", get(friends::friend_count))
        .route("/api/v1/friends/:user_id", delete(friends::remove_friend))
        .route("/api/v1/friends/:user_id/status", get(friends::friendship_status))
        .route("/api/v1/friends/:user_id/mutual", get(friends::mutual_friends))
        .route(
            "/api/v1/events/invites",
            post(events::send_invite).get(events::pending_invites),
        )
        .route("/api/v1/events/invites/:id/accept", post(events::accept_invite))
        .route("/api/v1/events/invites/:id/reject", post(events::reject_invite))
        .route(
            "/api/v1/events/:post_id/join",
            post(events::join).delete(events::leave),
        )
        .route("/api/v1/events/:post_id/participants", get(events::participants))
        .route("/api/v1/events/:post_id/participation", get(events::participation))
        .route(
            "/api/v1/events/:post_id/available-friends",
            get(events::available_friends),
        )
        .route("/api/v1/notifications", get(notifications::list))
        .route("/api/v1/notifications/summary", get(notifications::summary))
        .route("/api/v1/notifications/read-all", post(notifications::mark_all_read))
        .route("/api/v1/notifications/:id/read", post(notifications::mark_read))
        .route("/api/v1/notifications/:id", delete(notifications::delete));

    // Admin routes (require an admin session)
    let admin_routes = Router::new()
        .route("/api/v1/admin/users", get(admin::list_users))
        .route(
            "/api/v1/admin/users/:id/toggle-status",
            post(admin::toggle_user_status),
        )
        .route("/api/v1/admin/stats", get(admin::platform_stats))
        .route("/api/v1/admin/posts/:id", delete(admin::delete_post))
        .route("/api/v1/admin/comments/:id", delete(admin::delete_comment))
        .route("/api/v1/admin/bans", post(admin::ban_user).get(admin::list_bans))
        .route("/api/v1/admin/bans/stats", get(admin::ban_stats))
        .route("/api/v1/admin/bans/:user_id", get(admin::user_ban))
        .route("/api/v1/admin/bans/:user_id/history", get(admin::ban_history))
        .route("/api/v1/admin/bans/:user_id/unban", post(admin::unban_user))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin));

    // Public routes (no session required)
    let public_routes = Router::new()
        .route("/api/health", get(health::health_check))
        .route("/metrics", get(metrics_handler))
        .route("/api/v1/auth/register", post(auth::register))
        .route("/api/v1/auth/login", post(auth::login));

    Router::new()
        .merge(public_routes)
        .merge(user_routes)
        .merge(admin_routes)
        // Global middleware (order matters: bottom layers run first)
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_id))
        .layer(cors)
        .with_state(state)
}
