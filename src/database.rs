#[cfg(feature = "database")]
use anyhow::Result;
#[cfg(feature = "database")]
use async_trait::async_trait;
#[cfg(feature = "database")]
use chrono::{DateTime, Utc};
#[cfg(feature = "database")]
use sqlx::{migrate::MigrateDatabase, Row, SqlitePool};
#[cfg(feature = "database")]
use tracing::info;
#[cfg(feature = "database")]
use uuid::Uuid;

#[cfg(feature = "database")]
use crate::forms::{number, FormDetails, FormRecord, FormStore, NewForm};
#[cfg(feature = "database")]
use crate::ledger::{
    LedgerEntry, LedgerStore, NewLedgerEntry, RequestStatus, StoreError,
};
#[cfg(feature = "database")]
use crate::trail::{TrailAction, TrailEntry, TrailStore};

#[cfg(feature = "database")]
/// Database manager for persistent workflow state
pub struct DatabaseManager {
    pool: SqlitePool,
}

#[cfg(feature = "database")]
impl DatabaseManager {
    /// Initialize database with automatic migrations
    pub async fn new(database_url: &str, auto_migrate: bool) -> Result<Self> {
        if !sqlx::Sqlite::database_exists(database_url).await? {
            info!("Creating database at {}", database_url);
            sqlx::Sqlite::create_database(database_url).await?;
        }

        let pool = SqlitePool::connect(database_url).await?;

        if auto_migrate {
            info!("Running database migrations...");
            sqlx::migrate!("./migrations").run(&pool).await?;
            info!("Database migrations completed");
        }

        Ok(Self { pool })
    }

    /// Get database pool for queries
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close database connections gracefully
    pub async fn shutdown(&self) {
        info!("Shutting down database connections...");
        self.pool.close().await;
        info!("Database connections closed");
    }
}

#[cfg(feature = "database")]
/// SQLite-backed implementation of the three workflow stores. Rows are
/// mapped by hand; detail bags travel as JSON.
#[derive(Clone)]
pub struct SqliteWorkflowStore {
    pool: SqlitePool,
    max_number_attempts: u32,
}

#[cfg(feature = "database")]
impl SqliteWorkflowStore {
    pub fn new(pool: SqlitePool, max_number_attempts: u32) -> Self {
        Self {
            pool,
            max_number_attempts,
        }
    }
}

#[cfg(feature = "database")]
fn backend(err: sqlx::Error) -> StoreError {
    StoreError::Backend(err.to_string())
}

#[cfg(feature = "database")]
fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .map(|db| db.is_unique_violation())
        .unwrap_or(false)
}

#[cfg(feature = "database")]
fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Backend(format!("bad timestamp '{raw}': {e}")))
}

#[cfg(feature = "database")]
fn parse_uuid(raw: &str) -> Result<Uuid, StoreError> {
    Uuid::parse_str(raw).map_err(|e| StoreError::Backend(format!("bad uuid '{raw}': {e}")))
}

#[cfg(feature = "database")]
fn ledger_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<LedgerEntry, StoreError> {
    let status: String = row.get("status");
    let kind: String = row.get("kind");
    Ok(LedgerEntry {
        id: parse_uuid(row.get::<String, _>("id").as_str())?,
        request_number: row.get("request_number"),
        kind: kind.parse().map_err(StoreError::Backend)?,
        ship_id: row.get("ship_id"),
        requested_by: row.get("requested_by"),
        requested_at: parse_timestamp(row.get::<String, _>("requested_at").as_str())?,
        purpose: row.get("purpose"),
        description: row.get("description"),
        status: status.parse().map_err(StoreError::Backend)?,
        created_at: parse_timestamp(row.get::<String, _>("created_at").as_str())?,
        updated_at: parse_timestamp(row.get::<String, _>("updated_at").as_str())?,
    })
}

#[cfg(feature = "database")]
fn form_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<FormRecord, StoreError> {
    let details_json: String = row.get("details");
    let details: FormDetails = serde_json::from_str(&details_json)
        .map_err(|e| StoreError::Backend(format!("bad form details: {e}")))?;
    Ok(FormRecord {
        id: parse_uuid(row.get::<String, _>("id").as_str())?,
        request_number: row.get("request_number"),
        requester_user_id: row.get("requester_user_id"),
        ship_id: row.get("ship_id"),
        purpose: row.get("purpose"),
        description: row.get("description"),
        details,
        is_under_review: row.get::<i64, _>("is_under_review") != 0,
        is_approved: row.get::<i64, _>("is_approved") != 0,
        created_at: parse_timestamp(row.get::<String, _>("created_at").as_str())?,
        updated_at: parse_timestamp(row.get::<String, _>("updated_at").as_str())?,
    })
}

#[cfg(feature = "database")]
fn trail_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<TrailEntry, StoreError> {
    let action: String = row.get("action");
    Ok(TrailEntry {
        id: parse_uuid(row.get::<String, _>("id").as_str())?,
        ledger_entry_id: parse_uuid(row.get::<String, _>("ledger_entry_id").as_str())?,
        stage: row.get::<i64, _>("stage") as u32,
        action: action.parse().map_err(StoreError::Backend)?,
        action_by: row.get("action_by"),
        action_at: parse_timestamp(row.get::<String, _>("action_at").as_str())?,
        comment: row.get("comment"),
    })
}

#[cfg(feature = "database")]
#[async_trait]
impl LedgerStore for SqliteWorkflowStore {
    async fn create_or_get(&self, new_entry: NewLedgerEntry) -> Result<LedgerEntry, StoreError> {
        // Both store traits carry a find_by_request_number; name the one we
        // mean.
        if let Some(existing) =
            LedgerStore::find_by_request_number(self, &new_entry.request_number).await?
        {
            return Ok(existing);
        }

        let now = Utc::now();
        let id = Uuid::new_v4();
        let insert = sqlx::query(
            r#"
            INSERT INTO change_request_ledger
                (id, request_number, kind, ship_id, requested_by, requested_at,
                 purpose, description, status, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(id.to_string())
        .bind(&new_entry.request_number)
        .bind(new_entry.kind.prefix())
        .bind(&new_entry.ship_id)
        .bind(&new_entry.requested_by)
        .bind(new_entry.requested_at.to_rfc3339())
        .bind(&new_entry.purpose)
        .bind(&new_entry.description)
        .bind(RequestStatus::Draft.as_str())
        .bind(now.to_rfc3339())
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await;

        match insert {
            Ok(_) => {}
            // Lost a race: another writer created the entry first. The
            // idempotent contract says return theirs unchanged.
            Err(e) if is_unique_violation(&e) => {}
            Err(e) => return Err(backend(e)),
        }

        LedgerStore::find_by_request_number(self, &new_entry.request_number)
            .await?
            .ok_or_else(|| StoreError::NotFound {
                request_number: new_entry.request_number.clone(),
            })
    }

    async fn set_status(
        &self,
        request_number: &str,
        new_status: RequestStatus,
    ) -> Result<LedgerEntry, StoreError> {
        let mut tx = self.pool.begin().await.map_err(backend)?;

        let row = sqlx::query(
            "SELECT * FROM change_request_ledger WHERE request_number = ?1",
        )
        .bind(request_number)
        .fetch_optional(&mut *tx)
        .await
        .map_err(backend)?
        .ok_or_else(|| StoreError::NotFound {
            request_number: request_number.to_string(),
        })?;
        let entry = ledger_from_row(&row)?;

        if !entry.status.can_transition_to(new_status) {
            return Err(StoreError::InvalidTransition {
                request_number: request_number.to_string(),
                from: entry.status,
                to: new_status,
            });
        }

        let updated_at = Utc::now();
        sqlx::query(
            "UPDATE change_request_ledger SET status = ?1, updated_at = ?2 WHERE request_number = ?3",
        )
        .bind(new_status.as_str())
        .bind(updated_at.to_rfc3339())
        .bind(request_number)
        .execute(&mut *tx)
        .await
        .map_err(backend)?;

        tx.commit().await.map_err(backend)?;

        Ok(LedgerEntry {
            status: new_status,
            updated_at,
            ..entry
        })
    }

    async fn find_by_request_number(
        &self,
        request_number: &str,
    ) -> Result<Option<LedgerEntry>, StoreError> {
        let row = sqlx::query(
            "SELECT * FROM change_request_ledger WHERE request_number = ?1",
        )
        .bind(request_number)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;
        row.as_ref().map(ledger_from_row).transpose()
    }

    async fn list(&self) -> Result<Vec<LedgerEntry>, StoreError> {
        let rows = sqlx::query("SELECT * FROM change_request_ledger ORDER BY created_at ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;
        rows.iter().map(ledger_from_row).collect()
    }
}

#[cfg(feature = "database")]
#[async_trait]
impl FormStore for SqliteWorkflowStore {
    async fn create(&self, new_form: NewForm) -> Result<FormRecord, StoreError> {
        let kind = new_form.details.kind();
        let details_json = serde_json::to_string(&new_form.details)
            .map_err(|e| StoreError::Backend(format!("bad form details: {e}")))?;

        for attempt in 0..self.max_number_attempts {
            let request_number = number::generate(kind, Utc::now(), attempt);
            let now = Utc::now();
            let id = Uuid::new_v4();

            let insert = sqlx::query(
                r#"
                INSERT INTO change_forms
                    (id, request_number, requester_user_id, ship_id, purpose,
                     description, kind, details, is_under_review, is_approved,
                     created_at, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0, 0, ?9, ?10)
                "#,
            )
            .bind(id.to_string())
            .bind(&request_number)
            .bind(&new_form.requester_user_id)
            .bind(&new_form.ship_id)
            .bind(&new_form.purpose)
            .bind(&new_form.description)
            .bind(kind.prefix())
            .bind(&details_json)
            .bind(now.to_rfc3339())
            .bind(now.to_rfc3339())
            .execute(&self.pool)
            .await;

            match insert {
                Ok(_) => {
                    return FormStore::find_by_request_number(self, &request_number)
                        .await?
                        .ok_or_else(|| StoreError::NotFound {
                            request_number: request_number.clone(),
                        });
                }
                Err(e) if is_unique_violation(&e) => continue,
                Err(e) => return Err(backend(e)),
            }
        }

        Err(StoreError::RequestNumberExhausted {
            kind,
            attempts: self.max_number_attempts,
        })
    }

    async fn update_details(
        &self,
        id: Uuid,
        details: FormDetails,
    ) -> Result<FormRecord, StoreError> {
        let form = self.find(id).await?.ok_or_else(|| StoreError::NotFound {
            request_number: id.to_string(),
        })?;

        if form.is_under_review || form.is_approved {
            return Err(StoreError::InvalidState {
                request_number: form.request_number,
            });
        }
        if details.kind() != form.details.kind() {
            return Err(StoreError::Validation {
                reason: format!(
                    "form {} is a {} request and cannot change kind",
                    form.request_number,
                    form.kind().label()
                ),
            });
        }

        let details_json = serde_json::to_string(&details)
            .map_err(|e| StoreError::Backend(format!("bad form details: {e}")))?;
        sqlx::query("UPDATE change_forms SET details = ?1, updated_at = ?2 WHERE id = ?3")
            .bind(&details_json)
            .bind(Utc::now().to_rfc3339())
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(backend)?;

        self.find(id).await?.ok_or_else(|| StoreError::NotFound {
            request_number: id.to_string(),
        })
    }

    async fn find(&self, id: Uuid) -> Result<Option<FormRecord>, StoreError> {
        let row = sqlx::query("SELECT * FROM change_forms WHERE id = ?1")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;
        row.as_ref().map(form_from_row).transpose()
    }

    async fn find_by_request_number(
        &self,
        request_number: &str,
    ) -> Result<Option<FormRecord>, StoreError> {
        let row = sqlx::query("SELECT * FROM change_forms WHERE request_number = ?1")
            .bind(request_number)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;
        row.as_ref().map(form_from_row).transpose()
    }

    async fn mark_under_review(&self, id: Uuid) -> Result<FormRecord, StoreError> {
        self.set_flags(id, true, false).await
    }

    async fn mark_approved(&self, id: Uuid) -> Result<FormRecord, StoreError> {
        self.set_flags(id, false, true).await
    }

    async fn mark_rejected(&self, id: Uuid) -> Result<FormRecord, StoreError> {
        self.set_flags(id, false, false).await
    }

    async fn list(&self) -> Result<Vec<FormRecord>, StoreError> {
        let rows = sqlx::query("SELECT * FROM change_forms ORDER BY created_at ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;
        rows.iter().map(form_from_row).collect()
    }
}

#[cfg(feature = "database")]
impl SqliteWorkflowStore {
    async fn set_flags(
        &self,
        id: Uuid,
        is_under_review: bool,
        is_approved: bool,
    ) -> Result<FormRecord, StoreError> {
        let result = sqlx::query(
            "UPDATE change_forms SET is_under_review = ?1, is_approved = ?2, updated_at = ?3 WHERE id = ?4",
        )
        .bind(is_under_review as i64)
        .bind(is_approved as i64)
        .bind(Utc::now().to_rfc3339())
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                request_number: id.to_string(),
            });
        }
        self.find(id).await?.ok_or_else(|| StoreError::NotFound {
            request_number: id.to_string(),
        })
    }
}

#[cfg(feature = "database")]
#[async_trait]
impl TrailStore for SqliteWorkflowStore {
    async fn append(
        &self,
        ledger_entry_id: Uuid,
        action: TrailAction,
        actor_id: &str,
        comment: Option<String>,
    ) -> Result<TrailEntry, StoreError> {
        if action == TrailAction::Reject
            && comment.as_deref().map(str::trim).unwrap_or("").is_empty()
        {
            return Err(StoreError::Validation {
                reason: "a rejection must carry a comment".to_string(),
            });
        }

        // Stage numbering and insert share one transaction; the unique
        // (ledger_entry_id, stage) index is the backstop.
        let mut tx = self.pool.begin().await.map_err(backend)?;

        let row = sqlx::query(
            "SELECT COALESCE(MAX(stage), 0) + 1 AS next_stage FROM approval_trail WHERE ledger_entry_id = ?1",
        )
        .bind(ledger_entry_id.to_string())
        .fetch_one(&mut *tx)
        .await
        .map_err(backend)?;
        let stage: i64 = row.get("next_stage");

        let entry = TrailEntry {
            id: Uuid::new_v4(),
            ledger_entry_id,
            stage: stage as u32,
            action,
            action_by: actor_id.to_string(),
            action_at: Utc::now(),
            comment,
        };

        sqlx::query(
            r#"
            INSERT INTO approval_trail
                (id, ledger_entry_id, stage, action, action_by, action_at, comment)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(entry.id.to_string())
        .bind(entry.ledger_entry_id.to_string())
        .bind(stage)
        .bind(entry.action.as_str())
        .bind(&entry.action_by)
        .bind(entry.action_at.to_rfc3339())
        .bind(&entry.comment)
        .execute(&mut *tx)
        .await
        .map_err(backend)?;

        tx.commit().await.map_err(backend)?;
        Ok(entry)
    }

    async fn history(&self, ledger_entry_id: Uuid) -> Result<Vec<TrailEntry>, StoreError> {
        let rows = sqlx::query(
            "SELECT * FROM approval_trail WHERE ledger_entry_id = ?1 ORDER BY stage ASC",
        )
        .bind(ledger_entry_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;
        rows.iter().map(trail_from_row).collect()
    }
}

// Stub implementations for when database feature is not enabled
#[cfg(not(feature = "database"))]
pub async fn init_database() -> anyhow::Result<()> {
    tracing::info!("Database feature not enabled, skipping database initialization");
    Ok(())
}

#[cfg(feature = "database")]
/// Initialize the database manager from configuration
pub async fn init_database() -> Result<Option<DatabaseManager>> {
    let config = crate::config::config()?;

    if let Some(db_config) = &config.database {
        info!("Initializing database at {}", db_config.url);
        let manager = DatabaseManager::new(&db_config.url, db_config.auto_migrate).await?;
        Ok(Some(manager))
    } else {
        info!("Database not configured, skipping initialization");
        Ok(None)
    }
}
