use chrono_tz::Tz;
use serde::Serialize;
use sqlx::Row;

use crate::db::DbPool;
use crate::error::{CoreError, Result};

/// Opaque tenant key. Only this module can mint one, so every query that
/// filters by library must have gone through `Tenant::resolve` (or the
/// crate-internal by-id lookup) first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LibraryId(i64);

impl LibraryId {
    pub fn get(&self) -> i64 {
        self.0
    }
}

/// A resolved library: the scoping handle passed to every pipeline query.
#[derive(Debug, Clone)]
pub struct Tenant {
    id: LibraryId,
    pub code: String,
    pub library_name: String,
    pub owner_name: Option<String>,
    pub timezone: Tz,
}

impl Tenant {
    /// Look a library up by its public code. Codes are case-insensitive on
    /// input and normalized to uppercase before the lookup.
    pub async fn resolve(pool: &DbPool, code: &str) -> Result<Self> {
        let normalized = code.trim().to_uppercase();
        let row = sqlx::query(
            r#"
            SELECT library_id, code, library_name, owner_name, timezone
            FROM libraries
            WHERE code = $1
            "#,
        )
        .bind(&normalized)
        .fetch_optional(pool)
        .await?
        .ok_or(CoreError::NotFound("library"))?;

        Self::from_row(row)
    }

    /// Internal lookup for flows that start from a student row rather than a
    /// URL code (attendance scans).
    pub(crate) async fn resolve_by_id(pool: &DbPool, library_id: i64) -> Result<Self> {
        let row = sqlx::query(
            r#"
            SELECT library_id, code, library_name, owner_name, timezone
            FROM libraries
            WHERE library_id = $1
            "#,
        )
        .bind(library_id)
        .fetch_optional(pool)
        .await?
        .ok_or(CoreError::NotFound("library"))?;

        Self::from_row(row)
    }

    fn from_row(row: sqlx::postgres::PgRow) -> Result<Self> {
        let tz_name: String = row.try_get("timezone")?;
        let timezone = tz_name
            .parse::<Tz>()
            .map_err(|_| CoreError::Timezone(tz_name))?;

        Ok(Self {
            id: LibraryId(row.try_get("library_id")?),
            code: row.try_get("code")?,
            library_name: row.try_get("library_name")?,
            owner_name: row.try_get("owner_name")?,
            timezone,
        })
    }

    pub fn id(&self) -> LibraryId {
        self.id
    }

    /// Whether a raw library id from an untrusted payload names this tenant.
    pub fn matches(&self, raw_library_id: i64) -> bool {
        self.id.0 == raw_library_id
    }
}
