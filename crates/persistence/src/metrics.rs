//! Database metrics collection.

use domain::DomainError;
use metrics::{counter, gauge, histogram};
use sqlx::PgPool;
use std::time::Instant;

/// Record database query duration.
pub fn record_query_duration(query_name: &str, duration_secs: f64) {
    histogram!(
        "database_query_duration_seconds",
        "query" => query_name.to_string()
    )
    .record(duration_secs);
}

/// Record connection pool gauges.
pub fn record_pool_metrics(pool: &PgPool) {
    let size = pool.size() as usize;
    let idle = pool.num_idle();
    let active = size.saturating_sub(idle);

    gauge!("database_connections_active").set(active as f64);
    gauge!("database_connections_idle").set(idle as f64);
    gauge!("database_connections_total").set(size as f64);
}

/// Counts a relationship transition by outcome (`committed` or the error code).
pub fn record_transition<T>(kind: &'static str, action: &str, result: &Result<T, DomainError>) {
    let outcome = match result {
        Ok(_) => "committed",
        Err(e) => e.code(),
    };
    counter!(
        "relationship_transitions_total",
        "kind" => kind,
        "action" => action.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

/// Times a query and records it when dropped via [`QueryTimer::record`].
///
/// ```ignore
/// let timer = QueryTimer::new("find_user_by_id");
/// let result = sqlx::query_as::<_, UserEntity>(...).fetch_optional(&pool).await;
/// timer.record();
/// ```
pub struct QueryTimer {
    query_name: &'static str,
    start: Instant,
}

impl QueryTimer {
    pub fn new(query_name: &'static str) -> Self {
        Self {
            query_name,
            start: Instant::now(),
        }
    }

    pub fn record(self) {
        record_query_duration(self.query_name, self.start.elapsed().as_secs_f64());
    }
}
