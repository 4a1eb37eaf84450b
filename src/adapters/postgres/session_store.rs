//! PostgreSQL implementation of SessionStore.
//!
//! The full record is kept as JSONB; the columns alongside it are
//! projections used for filtering, counting and token lookups.
//! `update` runs inside a transaction holding a row lock so each change is
//! applied exactly once against the current row.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;

use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Row};

use crate::domain::foundation::{DomainError, SessionId, SessionStatus, Timestamp, UserId};
use crate::domain::session::{
    ChangeOutcome, DeviceFilter, SessionChange, SessionRecord, UNKNOWN_DEVICE_TYPE,
};
use crate::ports::{SessionStore, StoredChange};

const COLUMNS: &str = "session_id, user_id, status, start_time, last_activity_time, end_time, \
     device_type, browser, operating_system, ip_address, authentication_token, refresh_token, record";

const VALUES: &str = "$1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13";

/// PostgreSQL implementation of SessionStore.
#[derive(Clone)]
pub struct PostgresSessionStore {
    pool: PgPool,
    timeout: Duration,
}

impl PostgresSessionStore {
    /// Creates a store whose calls are bounded by `timeout`.
    pub fn new(pool: PgPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    async fn bounded<T, F>(&self, operation: &'static str, fut: F) -> Result<T, DomainError>
    where
        F: Future<Output = Result<T, DomainError>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(DomainError::timeout(operation)),
        }
    }

    async fn fetch_records(
        &self,
        operation: &'static str,
        query: Query<'_, Postgres, PgArguments>,
    ) -> Result<Vec<SessionRecord>, DomainError> {
        self.bounded(operation, async {
            let rows = query
                .fetch_all(&self.pool)
                .await
                .map_err(|e| db_error(operation, e))?;
            rows.into_iter().map(row_to_record).collect()
        })
        .await
    }

    async fn fetch_one_record(
        &self,
        operation: &'static str,
        query: Query<'_, Postgres, PgArguments>,
    ) -> Result<Option<SessionRecord>, DomainError> {
        self.bounded(operation, async {
            let row = query
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| db_error(operation, e))?;
            row.map(row_to_record).transpose()
        })
        .await
    }

    async fn count(
        &self,
        operation: &'static str,
        query: Query<'_, Postgres, PgArguments>,
    ) -> Result<u64, DomainError> {
        self.bounded(operation, async {
            let row = query
                .fetch_one(&self.pool)
                .await
                .map_err(|e| db_error(operation, e))?;
            let count: i64 = row.try_get(0).map_err(|e| db_error(operation, e))?;
            Ok(count.max(0) as u64)
        })
        .await
    }
}

impl std::fmt::Debug for PostgresSessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresSessionStore")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl SessionStore for PostgresSessionStore {
    async fn insert(&self, record: &SessionRecord) -> Result<bool, DomainError> {
        let sql = format!(
            "INSERT INTO user_sessions ({}) VALUES ({}) ON CONFLICT (session_id) DO NOTHING",
            COLUMNS, VALUES
        );
        self.bounded("insert session", async {
            let result = bind_record(sqlx::query(&sql), record)
                .execute(&self.pool)
                .await
                .map_err(|e| db_error("insert session", e))?;
            Ok(result.rows_affected() == 1)
        })
        .await
    }

    async fn save(&self, record: &SessionRecord) -> Result<SessionRecord, DomainError> {
        let sql = format!(
            r#"
            INSERT INTO user_sessions ({}) VALUES ({})
            ON CONFLICT (session_id) DO UPDATE SET
                user_id = EXCLUDED.user_id,
                status = EXCLUDED.status,
                start_time = EXCLUDED.start_time,
                last_activity_time = EXCLUDED.last_activity_time,
                end_time = EXCLUDED.end_time,
                device_type = EXCLUDED.device_type,
                browser = EXCLUDED.browser,
                operating_system = EXCLUDED.operating_system,
                ip_address = EXCLUDED.ip_address,
                authentication_token = EXCLUDED.authentication_token,
                refresh_token = EXCLUDED.refresh_token,
                record = EXCLUDED.record
            "#,
            COLUMNS, VALUES
        );
        self.bounded("save session", async {
            bind_record(sqlx::query(&sql), record)
                .execute(&self.pool)
                .await
                .map_err(|e| db_error("save session", e))?;
            Ok(record.clone())
        })
        .await
    }

    async fn find_by_id(&self, id: &SessionId) -> Result<Option<SessionRecord>, DomainError> {
        self.fetch_one_record(
            "fetch session",
            sqlx::query("SELECT record FROM user_sessions WHERE session_id = $1")
                .bind(id.as_str()),
        )
        .await
    }

    async fn update(
        &self,
        id: &SessionId,
        change: &SessionChange,
        now: Timestamp,
    ) -> Result<Option<StoredChange>, DomainError> {
        self.bounded("update session", async {
            let mut tx = self
                .pool
                .begin()
                .await
                .map_err(|e| db_error("begin transaction", e))?;

            let row = sqlx::query("SELECT record FROM user_sessions WHERE session_id = $1 FOR UPDATE")
                .bind(id.as_str())
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| db_error("lock session", e))?;

            let Some(row) = row else {
                return Ok(None);
            };
            let mut record = row_to_record(row)?;
            let outcome = record.apply(change, now);

            if outcome == ChangeOutcome::Changed {
                let sql = format!(
                    r#"
                    UPDATE user_sessions SET
                        ({}) = ({})
                    WHERE session_id = $1
                    "#,
                    COLUMNS, VALUES
                );
                bind_record(sqlx::query(&sql), &record)
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| db_error("update session", e))?;
            }

            tx.commit()
                .await
                .map_err(|e| db_error("commit transaction", e))?;

            Ok(Some(StoredChange { record, outcome }))
        })
        .await
    }

    async fn find_active_by_user_id(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<SessionRecord>, DomainError> {
        self.fetch_records(
            "fetch active sessions by user",
            sqlx::query(
                r#"
                SELECT record FROM user_sessions
                WHERE user_id = $1 AND status = 'ACTIVE'
                ORDER BY last_activity_time DESC
                "#,
            )
            .bind(user_id.as_str()),
        )
        .await
    }

    async fn find_by_user_id(&self, user_id: &UserId) -> Result<Vec<SessionRecord>, DomainError> {
        self.fetch_records(
            "fetch sessions by user",
            sqlx::query(
                "SELECT record FROM user_sessions WHERE user_id = $1 ORDER BY last_activity_time DESC",
            )
            .bind(user_id.as_str()),
        )
        .await
    }

    async fn find_by_status(
        &self,
        status: SessionStatus,
    ) -> Result<Vec<SessionRecord>, DomainError> {
        self.fetch_records(
            "fetch sessions by status",
            sqlx::query(
                "SELECT record FROM user_sessions WHERE status = $1 ORDER BY last_activity_time DESC",
            )
            .bind(status.as_str()),
        )
        .await
    }

    async fn find_expired_active(
        &self,
        cutoff: Timestamp,
    ) -> Result<Vec<SessionRecord>, DomainError> {
        self.fetch_records(
            "fetch idle sessions",
            sqlx::query(
                r#"
                SELECT record FROM user_sessions
                WHERE status = 'ACTIVE' AND last_activity_time < $1
                ORDER BY last_activity_time ASC
                "#,
            )
            .bind(*cutoff.as_datetime()),
        )
        .await
    }

    async fn find_by_activity_range(
        &self,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<Vec<SessionRecord>, DomainError> {
        self.fetch_records(
            "fetch sessions by activity range",
            sqlx::query(
                r#"
                SELECT record FROM user_sessions
                WHERE last_activity_time BETWEEN $1 AND $2
                ORDER BY last_activity_time DESC
                "#,
            )
            .bind(*start.as_datetime())
            .bind(*end.as_datetime()),
        )
        .await
    }

    async fn find_by_start_range(
        &self,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<Vec<SessionRecord>, DomainError> {
        self.fetch_records(
            "fetch sessions by start range",
            sqlx::query(
                r#"
                SELECT record FROM user_sessions
                WHERE start_time BETWEEN $1 AND $2
                ORDER BY start_time DESC
                "#,
            )
            .bind(*start.as_datetime())
            .bind(*end.as_datetime()),
        )
        .await
    }

    async fn find_active_by_device(
        &self,
        filter: &DeviceFilter,
    ) -> Result<Vec<SessionRecord>, DomainError> {
        // Column names come from a closed enum, never from input.
        let sql = format!(
            "SELECT record FROM user_sessions WHERE status = 'ACTIVE' AND {} = $1 \
             ORDER BY last_activity_time DESC",
            filter.column()
        );
        self.fetch_records(
            "fetch active sessions by device",
            sqlx::query(&sql).bind(filter.value()),
        )
        .await
    }

    async fn find_by_authentication_token(
        &self,
        token: &str,
    ) -> Result<Option<SessionRecord>, DomainError> {
        self.fetch_one_record(
            "fetch session by token",
            sqlx::query("SELECT record FROM user_sessions WHERE authentication_token = $1 LIMIT 1")
                .bind(token),
        )
        .await
    }

    async fn find_by_refresh_token(
        &self,
        token: &str,
    ) -> Result<Option<SessionRecord>, DomainError> {
        self.fetch_one_record(
            "fetch session by refresh token",
            sqlx::query("SELECT record FROM user_sessions WHERE refresh_token = $1 LIMIT 1")
                .bind(token),
        )
        .await
    }

    async fn count_active(&self) -> Result<u64, DomainError> {
        self.count(
            "count active sessions",
            sqlx::query("SELECT COUNT(*) FROM user_sessions WHERE status = 'ACTIVE'"),
        )
        .await
    }

    async fn count_all(&self) -> Result<u64, DomainError> {
        self.count(
            "count sessions",
            sqlx::query("SELECT COUNT(*) FROM user_sessions"),
        )
        .await
    }

    async fn count_active_by_device_type(&self) -> Result<BTreeMap<String, u64>, DomainError> {
        self.bounded("count sessions by device", async {
            let rows = sqlx::query(
                r#"
                SELECT COALESCE(device_type, $1) AS device, COUNT(*) AS n
                FROM user_sessions
                WHERE status = 'ACTIVE'
                GROUP BY 1
                "#,
            )
            .bind(UNKNOWN_DEVICE_TYPE)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("count sessions by device", e))?;

            let mut counts = BTreeMap::new();
            for row in rows {
                let device: String = row
                    .try_get("device")
                    .map_err(|e| db_error("read device", e))?;
                let n: i64 = row.try_get("n").map_err(|e| db_error("read count", e))?;
                counts.insert(device, n.max(0) as u64);
            }
            Ok(counts)
        })
        .await
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Helper functions
// ════════════════════════════════════════════════════════════════════════════════

fn db_error(operation: &str, e: sqlx::Error) -> DomainError {
    DomainError::database(format!("Failed to {}: {}", operation, e))
}

/// Binds the thirteen columns named in `COLUMNS`, in order.
fn bind_record<'q>(
    query: Query<'q, Postgres, PgArguments>,
    record: &'q SessionRecord,
) -> Query<'q, Postgres, PgArguments> {
    query
        .bind(record.session_id().as_str())
        .bind(record.user_id().as_str())
        .bind(record.status().as_str())
        .bind(*record.start_time().as_datetime())
        .bind(*record.last_activity_time().as_datetime())
        .bind(record.end_time().map(|t| *t.as_datetime()))
        .bind(record.device_type())
        .bind(record.browser())
        .bind(record.operating_system())
        .bind(record.ip_address())
        .bind(record.authentication_token())
        .bind(record.refresh_token())
        .bind(Json(record))
}

fn row_to_record(row: PgRow) -> Result<SessionRecord, DomainError> {
    let Json(record): Json<SessionRecord> = row
        .try_get("record")
        .map_err(|e| DomainError::database(format!("Invalid session record: {}", e)))?;
    Ok(record)
}
