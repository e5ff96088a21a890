use std::env;

/// AppConfig
///
/// Holds the application's configuration. Immutable once loaded and pulled into handlers via
/// FromRef as part of the shared application state.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Postgres connection string, or `memory` for the in-process store.
    pub db_url: String,
    // Runtime environment marker. Selects the log format.
    pub env: Env,
    // Symmetric key used to sign and validate bearer tokens.
    pub jwt_key: String,
    // Socket address the HTTP server binds to.
    pub bind_addr: String,
    // bcrypt work factor for new password hashes.
    pub bcrypt_cost: u32,
}

/// Env
///
/// Local runs log in a human-readable format; production emits JSON lines.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

// Work factor bounds accepted by bcrypt.
pub const MIN_BCRYPT_COST: u32 = 4;
pub const MAX_BCRYPT_COST: u32 = 31;

impl Default for AppConfig {
    /// default
    ///
    /// Non-panicking configuration for test scaffolding. Uses the in-process store and the
    /// cheapest bcrypt cost.
    fn default() -> Self {
        Self {
            db_url: "memory".to_string(),
            env: Env::Local,
            jwt_key: "puchealth-test-signing-key-local-only".to_string(),
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            bcrypt_cost: MIN_BCRYPT_COST,
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from environment variables at startup (fail-fast).
    ///
    /// # Panics
    /// Panics if `DATABASE_URL` or `JWT_KEY` is missing, or if `BCRYPT_COST` is set to something
    /// that is not a valid bcrypt cost. The signing key is required in every environment.
    pub fn load() -> Self {
        let env = match env::var("APP_ENV").as_deref() {
            Ok("production") => Env::Production,
            _ => Env::Local,
        };

        let jwt_key = env::var("JWT_KEY").expect("FATAL: JWT_KEY must be set.");
        let db_url = env::var("DATABASE_URL").expect("FATAL: DATABASE_URL must be set.");

        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());

        let bcrypt_cost = match env::var("BCRYPT_COST") {
            Ok(raw) => raw
                .parse::<u32>()
                .ok()
                .filter(|cost| (MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(cost))
                .expect("FATAL: BCRYPT_COST must be an integer between 4 and 31."),
            Err(_) => bcrypt::DEFAULT_COST,
        };

        Self {
            db_url,
            env,
            jwt_key,
            bind_addr,
            bcrypt_cost,
        }
    }

    pub fn uses_memory_store(&self) -> bool {
        self.db_url == "memory"
    }
}
