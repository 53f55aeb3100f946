//! # Till Register Library
//!
//! Application layer of a Till POS register: shared state, startup and the
//! commands front ends call.
//!
//! ## Module Organization
//! ```text
//! till_register/
//! ├── lib.rs          ◄─── You are here (startup & AppContext)
//! ├── state/
//! │   ├── mod.rs      ◄─── State type exports
//! │   ├── db.rs       ◄─── Database state wrapper
//! │   ├── register.rs ◄─── Ledger + cart behind one mutex
//! │   ├── tables.rs   ◄─── Table registry
//! │   └── config.rs   ◄─── Configuration state
//! ├── commands/       ◄─── cashier, cart, table, sale, order, loyalty, ...
//! └── error.rs        ◄─── API error type for commands
//! ```
//!
//! ## Startup Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Register Startup                                  │
//! │                                                                         │
//! │  1. Initialize Logging ───────────────────────────────────────────────► │
//! │     • tracing-subscriber with env filter (RUST_LOG overrides)          │
//! │                                                                         │
//! │  2. Load ConfigState::from_env() ─────────────────────────────────────► │
//! │                                                                         │
//! │  3. Determine Database Path ──────────────────────────────────────────► │
//! │     • TILL_DB_PATH, else the platform data directory                   │
//! │                                                                         │
//! │  4. Connect to Database ──────────────────────────────────────────────► │
//! │     • SQLite with WAL mode, pending migrations applied                 │
//! │                                                                         │
//! │  5. Restore Drafts ───────────────────────────────────────────────────► │
//! │     • ledger, cart and table sessions of this terminal                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod commands;
pub mod error;
pub mod state;

use directories::ProjectDirs;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use error::ApiError;
use state::{ConfigState, DbState, RegisterState, TablesState};
use till_db::{Database, DbConfig};

/// Everything a front end needs to call commands.
#[derive(Debug, Clone)]
pub struct AppContext {
    pub db: DbState,
    pub register: RegisterState,
    pub tables: TablesState,
    pub config: ConfigState,
}

impl AppContext {
    /// Opens the configured database and restores this terminal's drafts.
    pub async fn bootstrap(config: ConfigState) -> Result<Self, ApiError> {
        let db_path = database_path(&config)?;
        info!(?db_path, "Database path determined");

        let db = Database::new(DbConfig::new(db_path)).await?;
        info!("Database connected and migrations applied");

        Self::with_database(db, config).await
    }

    /// Builds the context on an already opened database.
    pub async fn with_database(db: Database, config: ConfigState) -> Result<Self, ApiError> {
        let (register, registry) = commands::draft::restore(&db, &config.terminal_id).await?;

        info!(terminal = %config.terminal_id, store = %config.store_name, "State initialized");
        Ok(AppContext {
            db: DbState::new(db),
            register: RegisterState::from_register(register),
            tables: TablesState::from_registry(registry),
            config,
        })
    }
}

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=till=trace` - Show trace for till crates only
/// - Default: `info,till=debug,sqlx=warn`
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,till=debug,sqlx=warn"));

    // A second call (tests, embedding hosts) keeps the first subscriber
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Determines the database file path.
///
/// ## Platform-Specific Paths
/// - **macOS**: `~/Library/Application Support/com.till.pos/till.db`
/// - **Windows**: `%APPDATA%\till\pos\data\till.db`
/// - **Linux**: `~/.local/share/pos/till.db`
///
/// `TILL_DB_PATH` (via `ConfigState::database_path`) overrides it.
pub fn database_path(config: &ConfigState) -> Result<PathBuf, ApiError> {
    if let Some(path) = &config.database_path {
        return Ok(path.clone());
    }

    let proj_dirs = ProjectDirs::from("com", "till", "pos")
        .ok_or_else(|| ApiError::internal("Could not determine app data directory"))?;
    let data_dir = proj_dirs.data_dir();

    std::fs::create_dir_all(data_dir)
        .map_err(|e| ApiError::internal(format!("Could not create {}: {}", data_dir.display(), e)))?;

    Ok(data_dir.join("till.db"))
}
