//! # Application State
//!
//! Shared state for the Axum application, passed to all route handlers
//! via the `State` extractor.
//!
//! ## Architecture
//!
//! All reads are served from in-memory stores. When a database pool is
//! configured, writes go through to Postgres as well (write-through) and
//! the stores are hydrated from the database on startup. Without a pool
//! the API runs in in-memory-only mode, suitable for development and
//! testing.
//!
//! Reference data (countries, cities) uses sequential `i64` identifiers;
//! flows and solutions use UUIDs assigned at creation time.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use utoipa::ToSchema;
use uuid::Uuid;

// -- Generic In-Memory Store --------------------------------------------------

/// Thread-safe, cloneable in-memory key-value store.
///
/// All operations are synchronous (the RwLock is `parking_lot`, not
/// `tokio::sync`) because the lock is never held across `.await` points.
/// `parking_lot::RwLock` is non-poisonable — a panicking writer does not
/// permanently corrupt the store.
#[derive(Debug)]
pub struct Store<K, T> {
    data: Arc<RwLock<HashMap<K, T>>>,
}

impl<K, T> Clone for Store<K, T> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
        }
    }
}

impl<K: Copy + Eq + Hash, T: Clone> Store<K, T> {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Insert a record, returning the previous value if the key existed.
    pub fn insert(&self, id: K, value: T) -> Option<T> {
        self.data.write().insert(id, value)
    }

    /// Retrieve a record by ID.
    pub fn get(&self, id: &K) -> Option<T> {
        self.data.read().get(id).cloned()
    }

    /// List all records.
    pub fn list(&self) -> Vec<T> {
        self.data.read().values().cloned().collect()
    }

    /// Update a record in place. Returns the updated record, or `None` if not found.
    pub fn update(&self, id: &K, f: impl FnOnce(&mut T)) -> Option<T> {
        let mut guard = self.data.write();
        if let Some(entry) = guard.get_mut(id) {
            f(entry);
            Some(entry.clone())
        } else {
            None
        }
    }

    /// Remove a record by ID.
    pub fn remove(&self, id: &K) -> Option<T> {
        self.data.write().remove(id)
    }

    /// Check if a record exists.
    pub fn contains(&self, id: &K) -> bool {
        self.data.read().contains_key(id)
    }

    /// Return the number of records.
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K: Copy + Eq + Hash, T: Clone> Default for Store<K, T> {
    fn default() -> Self {
        Self::new()
    }
}

// -- Record Types -------------------------------------------------------------

/// Country reference record. Read-only through the API; rows come from
/// seed data or the database.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CountryRecord {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// City reference record. Belongs to exactly one country; `(name,
/// country_id)` is unique.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CityRecord {
    pub id: i64,
    pub name: String,
    pub country_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated flow name.
///
/// Serializes/deserializes as a plain string. Validated on construction
/// via [`FlowName::new`]: alphanumeric only, between 1 and 64 characters.
/// Flow names are unique across the system and addressable via
/// `GET /v1/flows/by_name/{name}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
#[schema(value_type = String)]
pub struct FlowName(String);

impl FlowName {
    /// Create a validated flow name.
    ///
    /// Returns an error message if the string is empty, longer than 64
    /// characters, or contains anything besides ASCII letters and digits.
    pub fn new(s: impl Into<String>) -> Result<Self, String> {
        let s = s.into();
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err("name must not be empty".to_string());
        }
        if trimmed.len() > 64 || !trimmed.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(
                "name must contain only letters and numbers, at most 64 characters".to_string(),
            );
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Return the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for FlowName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<&str> for FlowName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Flow definition record.
///
/// The `json_schema` document is stored verbatim exactly as validated —
/// it is never re-derived or normalized. At least one of `city_id` /
/// `country_id` is always set.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FlowRecord {
    pub id: Uuid,
    pub name: FlowName,
    pub json_schema: serde_json::Value,
    pub city_id: Option<i64>,
    pub country_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One answered field within a form solution.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FieldSolutionRecord {
    pub id: Uuid,
    /// Field identifier from the flow's schema document.
    pub field_id: String,
    /// The captured answer, if any.
    pub field_value: Option<String>,
}

/// Answers for one form of a section.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FormSolutionRecord {
    pub id: Uuid,
    /// Form identifier from the flow's schema document.
    pub form_id: String,
    pub fields: Vec<FieldSolutionRecord>,
}

/// Answers for one section of a flow.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SectionSolutionRecord {
    pub id: Uuid,
    /// Section identifier from the flow's schema document.
    pub section_id: String,
    pub forms: Vec<FormSolutionRecord>,
}

/// A user's submitted answers for a flow.
///
/// One record per `(user_id, flow_id)` pair. The section/form/field tree
/// mirrors the flow's schema structure; identifiers at each level are
/// unique within their parent.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FlowSolutionRecord {
    pub id: Uuid,
    pub flow_id: Uuid,
    pub user_id: i64,
    pub sections: Vec<SectionSolutionRecord>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// -- Application State --------------------------------------------------------

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self { port: 8080 }
    }
}

/// Shared application state accessible to all route handlers.
///
/// Clone-friendly via `Arc` internals in each `Store`. The database pool
/// is optional — absent means in-memory-only mode.
#[derive(Debug, Clone)]
pub struct AppState {
    pub countries: Store<i64, CountryRecord>,
    pub cities: Store<i64, CityRecord>,
    pub flows: Store<Uuid, FlowRecord>,
    pub flow_solutions: Store<Uuid, FlowSolutionRecord>,

    /// PostgreSQL connection pool for durable persistence.
    /// When `Some`, every write goes through to Postgres in addition to
    /// the in-memory stores. When `None`, state lives in memory only.
    pub db_pool: Option<PgPool>,

    pub config: AppConfig,
}

impl AppState {
    /// Create a new application state with default configuration and no database.
    pub fn new() -> Self {
        Self::with_config(AppConfig::default(), None)
    }

    /// Create a new application state with the given configuration and
    /// optional database pool.
    pub fn with_config(config: AppConfig, db_pool: Option<PgPool>) -> Self {
        Self {
            countries: Store::new(),
            cities: Store::new(),
            flows: Store::new(),
            flow_solutions: Store::new(),
            db_pool,
            config,
        }
    }

    /// Look up a flow by its unique name.
    pub fn flow_by_name(&self, name: &str) -> Option<FlowRecord> {
        self.flows.list().into_iter().find(|f| f.name == name)
    }

    /// Hydrate in-memory stores from the database.
    ///
    /// Called once on startup when a database pool is available, so that
    /// read operations stay fast and synchronous afterwards.
    pub async fn hydrate_from_db(&self) -> Result<(), String> {
        let pool = match &self.db_pool {
            Some(pool) => pool,
            None => return Ok(()),
        };

        let countries = crate::db::countries::load_all(pool)
            .await
            .map_err(|e| format!("failed to load countries: {e}"))?;
        let country_count = countries.len();
        for record in countries {
            self.countries.insert(record.id, record);
        }

        let cities = crate::db::cities::load_all(pool)
            .await
            .map_err(|e| format!("failed to load cities: {e}"))?;
        let city_count = cities.len();
        for record in cities {
            self.cities.insert(record.id, record);
        }

        let flows = crate::db::flows::load_all(pool)
            .await
            .map_err(|e| format!("failed to load flows: {e}"))?;
        let flow_count = flows.len();
        for record in flows {
            self.flows.insert(record.id, record);
        }

        let solutions = crate::db::solutions::load_all(pool)
            .await
            .map_err(|e| format!("failed to load flow solutions: {e}"))?;
        let solution_count = solutions.len();
        for record in solutions {
            self.flow_solutions.insert(record.id, record);
        }

        tracing::info!(
            countries = country_count,
            cities = city_count,
            flows = flow_count,
            flow_solutions = solution_count,
            "Hydrated in-memory stores from database"
        );

        Ok(())
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
