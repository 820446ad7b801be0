//! Database Layer with Connection Pooling and Safe Transactions
//!
//! SQLite ticket store featuring:
//! - Connection pooling via r2d2 for concurrent access
//! - Panic-safe transactions with automatic rollback
//! - Version-tracked migrations
//! - WAL mode for concurrent readers while a write is in flight

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, ErrorCode, OptionalExtension, params};

use crate::types::{
    AppError, Level, NewTicket, ProgressEntry, Result, ResultExt, Ticket, TicketStatus,
};

/// Shared database handle for async contexts.
pub type SharedDatabase = Arc<Database>;

const SCHEMA: &str = include_str!("schema.sql");

/// Current schema version for migration tracking
const SCHEMA_VERSION: u32 = 2;

/// Migration definitions
struct Migration {
    version: u32,
    description: &'static str,
    up: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "Index tickets by status",
        up: "CREATE INDEX IF NOT EXISTS idx_kanban_tickets_status ON kanban_tickets(status)",
    },
    Migration {
        version: 2,
        description: "Add progress_history column",
        up: "ALTER TABLE kanban_tickets ADD COLUMN progress_history TEXT NOT NULL DEFAULT '[]'",
    },
];

const TICKET_COLUMNS: &str = "id, ticket_id, ticket_number, title, description, status, category, \
     priority, estimated_time, progress_percentage, tags, access_required, dependencies, \
     created_at, updated_at, started_at, completed_at, ai_generated, progress_history";

/// Connection pool configuration
///
/// Pool size is dynamically calculated based on CPU cores.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Maximum number of connections in the pool
    pub max_size: u32,
    /// Minimum idle connections to keep ready
    pub min_idle: u32,
    /// Timeout for acquiring a connection (seconds)
    pub connection_timeout_secs: u64,
}

impl PoolConfig {
    const MIN_POOL_SIZE: u32 = 2;
    const MAX_POOL_SIZE: u32 = 16;

    /// clamp(cores * 2, MIN, MAX)
    pub fn optimal_pool_size() -> u32 {
        let cores = std::thread::available_parallelism()
            .map(|p| p.get() as u32)
            .unwrap_or(4);

        (cores * 2).clamp(Self::MIN_POOL_SIZE, Self::MAX_POOL_SIZE)
    }

    pub fn auto() -> Self {
        let max_size = Self::optimal_pool_size();
        Self {
            max_size,
            min_idle: (max_size / 4).max(1),
            connection_timeout_secs: 30,
        }
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::auto()
    }
}

/// Thread-safe ticket store with connection pooling.
pub struct Database {
    pool: Pool<SqliteConnectionManager>,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.pool.state();
        f.debug_struct("Database")
            .field("connections", &state.connections)
            .field("idle", &state.idle_connections)
            .finish()
    }
}

impl Database {
    /// Open database with connection pooling at the specified path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_config(path, PoolConfig::default())
    }

    /// Open database with custom pool configuration.
    pub fn open_with_config<P: AsRef<Path>>(path: P, config: PoolConfig) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let manager =
            SqliteConnectionManager::file(path.as_ref()).with_init(Self::configure_connection);

        let pool = Pool::builder()
            .max_size(config.max_size)
            .min_idle(Some(config.min_idle))
            .connection_timeout(std::time::Duration::from_secs(
                config.connection_timeout_secs,
            ))
            .build(manager)
            .map_err(|e| AppError::Storage(format!("Failed to create connection pool: {}", e)))?;

        Ok(Self { pool })
    }

    /// Open an in-memory database for testing or temporary use.
    pub fn open_in_memory() -> Result<Self> {
        let manager = SqliteConnectionManager::memory();

        // A single connection; every pooled memory connection is its own database
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|e| AppError::Storage(format!("Failed to create in-memory pool: {}", e)))?;

        Ok(Self { pool })
    }

    fn configure_connection(conn: &mut Connection) -> std::result::Result<(), rusqlite::Error> {
        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA cache_size = -16000;
            PRAGMA busy_timeout = 5000;
            PRAGMA wal_autocheckpoint = 1000;
            "#,
        )?;
        Ok(())
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>> {
        self.pool.get().map_err(|e| {
            AppError::Storage(format!("Failed to acquire database connection: {}", e))
        })
    }

    /// Create the schema on a fresh database, migrate an existing one.
    pub fn initialize(&self) -> Result<()> {
        let conn = self.conn()?;
        let existed: bool = conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'kanban_tickets')",
                [],
                |row| row.get(0),
            )
            .with_context("Failed to inspect schema")?;

        if existed {
            drop(conn);
            return self.migrate();
        }

        conn.execute_batch(SCHEMA)
            .with_context("Failed to initialize database schema")?;
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)
            .with_context("Failed to set schema version")?;
        Ok(())
    }

    /// Run version-tracked migrations.
    fn migrate(&self) -> Result<()> {
        let conn = self.conn()?;

        let current_version: u32 = conn
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .with_context("Failed to read schema version")?;

        for migration in MIGRATIONS {
            if migration.version > current_version {
                conn.execute_batch(migration.up).with_context_fn(|| {
                    format!(
                        "Failed to apply migration {}: {}",
                        migration.version, migration.description
                    )
                })?;

                tracing::info!(
                    "Applied migration {}: {}",
                    migration.version,
                    migration.description
                );
            }
        }

        if current_version < SCHEMA_VERSION {
            conn.pragma_update(None, "user_version", SCHEMA_VERSION)
                .with_context("Failed to update schema version")?;
        }

        Ok(())
    }

    /// Get a raw connection for advanced operations.
    ///
    /// An in-memory store has a single connection: drop this before calling
    /// any other method, or that call waits out the pool timeout.
    pub fn connection(&self) -> Result<PooledConnection<SqliteConnectionManager>> {
        self.conn()
    }

    /// Execute a closure within a transaction.
    ///
    /// All operations within the closure are atomic. If the closure panics,
    /// the transaction is rolled back and an error is returned instead of
    /// poisoning the connection pool.
    pub fn transaction<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let mut conn = self.conn()?;
        let tx = conn
            .transaction()
            .with_context("Failed to start transaction")?;

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| f(&tx)));

        match result {
            Ok(Ok(value)) => {
                tx.commit().with_context("Failed to commit transaction")?;
                Ok(value)
            }
            // Rolled back on drop
            Ok(Err(e)) => Err(e),
            Err(panic_payload) => {
                let panic_msg = panic_payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic_payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "Unknown panic".to_string());

                tracing::error!("Transaction panicked: {}", panic_msg);
                Err(AppError::Storage(format!(
                    "Transaction panicked: {}",
                    panic_msg
                )))
            }
        }
    }

    // =========================================================================
    // Tickets
    // =========================================================================

    /// Insert a ticket; a duplicate `ticket_id` is a conflict.
    pub fn insert_ticket(&self, ticket: &NewTicket) -> Result<Ticket> {
        let conn = self.conn()?;
        let now = Utc::now();

        let inserted = conn.execute(
            "INSERT INTO kanban_tickets (
                ticket_id, ticket_number, title, description, status, category, priority,
                estimated_time, progress_percentage, tags, access_required, dependencies,
                created_at, updated_at, ai_generated, progress_history
            ) VALUES (?1, ?2, ?3, ?4, 'new', NULL, ?5, ?6, 0, ?7, ?8, ?9, ?10, ?10, ?11, '[]')",
            params![
                ticket.ticket_id,
                ticket.ticket_number,
                ticket.title,
                ticket.description,
                ticket.priority.as_storage_str(),
                ticket.estimated_time,
                serde_json::to_string(&ticket.tags)?,
                serde_json::to_string(&ticket.access_required)?,
                serde_json::to_string(&ticket.dependencies)?,
                now.to_rfc3339(),
                ticket.ai_generated,
            ],
        );

        match inserted {
            Ok(_) => {}
            Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
                return Err(AppError::Conflict(format!(
                    "ticket {} already exists",
                    ticket.ticket_id
                )));
            }
            Err(e) => return Err(e.into()),
        }

        let id = conn.last_insert_rowid();
        tracing::debug!(id, ticket_id = %ticket.ticket_id, "Inserted ticket");
        query_one(&conn, "id = ?1", params![id])?
            .ok_or_else(|| AppError::not_found(format!("Ticket {}", id)))
    }

    pub fn get_ticket(&self, id: i64) -> Result<Option<Ticket>> {
        let conn = self.conn()?;
        query_one(&conn, "id = ?1", params![id])
    }

    pub fn find_by_ticket_number(&self, ticket_number: &str) -> Result<Option<Ticket>> {
        let conn = self.conn()?;
        query_one(&conn, "ticket_number = ?1", params![ticket_number])
    }

    pub fn find_by_ticket_id(&self, ticket_id: &str) -> Result<Option<Ticket>> {
        let conn = self.conn()?;
        query_one(&conn, "ticket_id = ?1", params![ticket_id])
    }

    /// Resolve a row id (all digits), a `TKT-` number, or a content hash id.
    pub fn find_by_identifier(&self, identifier: &str) -> Result<Option<Ticket>> {
        let identifier = identifier.trim();
        if !identifier.is_empty()
            && identifier.chars().all(|c| c.is_ascii_digit())
            && let Ok(id) = identifier.parse::<i64>()
        {
            return self.get_ticket(id);
        }

        match self.find_by_ticket_number(identifier)? {
            Some(ticket) => Ok(Some(ticket)),
            None => self.find_by_ticket_id(identifier),
        }
    }

    /// All tickets in creation order
    pub fn list_tickets(&self) -> Result<Vec<Ticket>> {
        let conn = self.conn()?;
        query_many(&conn, None, params![])
    }

    pub fn list_by_status(&self, status: TicketStatus) -> Result<Vec<Ticket>> {
        let conn = self.conn()?;
        query_many(&conn, Some("status = ?1"), params![status.as_str()])
    }

    pub fn count_tickets(&self) -> Result<usize> {
        let conn = self.conn()?;
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM kanban_tickets", [], |row| row.get(0))
            .with_context("Failed to count tickets")?;
        Ok(count as usize)
    }

    /// Persist every mutable column of an existing ticket.
    pub fn save_ticket(&self, ticket: &Ticket) -> Result<()> {
        let conn = self.conn()?;
        save_with(&conn, ticket)
    }

    /// Load, mutate and save one ticket atomically. `f` reports whether the
    /// ticket changed; unchanged tickets are not written.
    pub fn update_ticket<F>(&self, id: i64, f: F) -> Result<Ticket>
    where
        F: FnOnce(&mut Ticket) -> Result<bool>,
    {
        self.transaction(|conn| {
            let mut ticket = query_one(conn, "id = ?1", params![id])?
                .ok_or_else(|| AppError::not_found(format!("Ticket {}", id)))?;
            if f(&mut ticket)? {
                save_with(conn, &ticket)?;
            }
            Ok(ticket)
        })
    }

    /// Apply `f` to every ticket in one transaction, saving those it reports
    /// as changed. Returns the number of tickets visited.
    pub fn update_all<F>(&self, mut f: F) -> Result<usize>
    where
        F: FnMut(&mut Ticket) -> bool,
    {
        self.transaction(|conn| {
            let mut tickets = query_many(conn, None, params![])?;
            for ticket in &mut tickets {
                if f(ticket) {
                    save_with(conn, ticket)?;
                }
            }
            Ok(tickets.len())
        })
    }

    /// Move every ticket back to `new`. Returns the number of tickets reset.
    pub fn reset_all(&self, now: DateTime<Utc>) -> Result<usize> {
        let count = self.update_all(|ticket| crate::tracker::reset(ticket, now))?;
        tracing::info!(count, "Reset tickets to new");
        Ok(count)
    }

    pub fn delete_ticket(&self, id: i64) -> Result<bool> {
        let conn = self.conn()?;
        let deleted = conn
            .execute("DELETE FROM kanban_tickets WHERE id = ?1", params![id])
            .with_context("Failed to delete ticket")?;
        Ok(deleted > 0)
    }
}

// =============================================================================
// Row Mapping
// =============================================================================

fn query_one(
    conn: &Connection,
    filter: &str,
    params: impl rusqlite::Params,
) -> Result<Option<Ticket>> {
    let sql = format!(
        "SELECT {} FROM kanban_tickets WHERE {} LIMIT 1",
        TICKET_COLUMNS, filter
    );
    let row = conn
        .query_row(&sql, params, TicketRow::from_row)
        .optional()
        .with_context("Failed to load ticket")?;
    row.map(TicketRow::into_ticket).transpose()
}

fn query_many(
    conn: &Connection,
    filter: Option<&str>,
    params: impl rusqlite::Params,
) -> Result<Vec<Ticket>> {
    let sql = match filter {
        Some(filter) => format!(
            "SELECT {} FROM kanban_tickets WHERE {} ORDER BY id",
            TICKET_COLUMNS, filter
        ),
        None => format!("SELECT {} FROM kanban_tickets ORDER BY id", TICKET_COLUMNS),
    };

    let mut stmt = conn.prepare(&sql).with_context("Failed to prepare ticket query")?;
    let rows = stmt
        .query_map(params, TicketRow::from_row)
        .with_context("Failed to list tickets")?
        .collect::<std::result::Result<Vec<_>, _>>()
        .with_context("Failed to read ticket row")?;

    rows.into_iter().map(TicketRow::into_ticket).collect()
}

fn save_with(conn: &Connection, ticket: &Ticket) -> Result<()> {
    let updated = conn
        .execute(
            "UPDATE kanban_tickets SET
                title = ?2, description = ?3, status = ?4, category = ?5, priority = ?6,
                estimated_time = ?7, progress_percentage = ?8, tags = ?9,
                access_required = ?10, dependencies = ?11, updated_at = ?12,
                started_at = ?13, completed_at = ?14, progress_history = ?15
             WHERE id = ?1",
            params![
                ticket.id,
                ticket.title,
                ticket.description,
                ticket.status.as_str(),
                ticket.category,
                ticket.priority.as_storage_str(),
                ticket.estimated_time,
                ticket.progress_percentage,
                serde_json::to_string(&ticket.tags)?,
                serde_json::to_string(&ticket.access_required)?,
                serde_json::to_string(&ticket.dependencies)?,
                ticket.updated_at.to_rfc3339(),
                ticket.started_at.map(|t| t.to_rfc3339()),
                ticket.completed_at.map(|t| t.to_rfc3339()),
                serde_json::to_string(&ticket.progress_history)?,
            ],
        )
        .with_context_fn(|| format!("Failed to save ticket {}", ticket.id))?;

    if updated == 0 {
        return Err(AppError::not_found(format!("Ticket {}", ticket.id)));
    }
    Ok(())
}

/// Column values as stored, before JSON and timestamp decoding
struct TicketRow {
    id: i64,
    ticket_id: String,
    ticket_number: String,
    title: String,
    description: String,
    status: String,
    category: Option<String>,
    priority: String,
    estimated_time: String,
    progress_percentage: i64,
    tags: String,
    access_required: String,
    dependencies: String,
    created_at: String,
    updated_at: String,
    started_at: Option<String>,
    completed_at: Option<String>,
    ai_generated: bool,
    progress_history: String,
}

impl TicketRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            ticket_id: row.get(1)?,
            ticket_number: row.get(2)?,
            title: row.get(3)?,
            description: row.get(4)?,
            status: row.get(5)?,
            category: row.get(6)?,
            priority: row.get(7)?,
            estimated_time: row.get(8)?,
            progress_percentage: row.get(9)?,
            tags: row.get(10)?,
            access_required: row.get(11)?,
            dependencies: row.get(12)?,
            created_at: row.get(13)?,
            updated_at: row.get(14)?,
            started_at: row.get(15)?,
            completed_at: row.get(16)?,
            ai_generated: row.get(17)?,
            progress_history: row.get(18)?,
        })
    }

    fn into_ticket(self) -> Result<Ticket> {
        let priority = self.priority.parse::<Level>().unwrap_or_else(|e| {
            tracing::warn!(id = self.id, "{}; reading as Medium", e);
            Level::Medium
        });

        Ok(Ticket {
            id: self.id,
            ticket_id: self.ticket_id,
            ticket_number: self.ticket_number,
            title: self.title,
            description: self.description,
            status: self.status.parse()?,
            category: self.category,
            priority,
            estimated_time: self.estimated_time,
            progress_percentage: self.progress_percentage.clamp(0, 100) as u8,
            tags: json_list(&self.tags)?,
            access_required: json_list(&self.access_required)?,
            dependencies: json_list(&self.dependencies)?,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
            started_at: self.started_at.as_deref().map(parse_timestamp).transpose()?,
            completed_at: self.completed_at.as_deref().map(parse_timestamp).transpose()?,
            ai_generated: self.ai_generated,
            progress_history: serde_json::from_str::<Vec<ProgressEntry>>(&self.progress_history)?,
        })
    }
}

fn json_list(raw: &str) -> Result<Vec<String>> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_str(raw)?)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .with_context_fn(|| format!("Invalid timestamp '{}'", raw))
}
