use crate::config::required_env;
use crate::error::{Result, SyncError};
use crate::storage::DirectoryStore;
use crate::types::{
    ContactInfo, ExhibitorUpdate, ExistingExhibitor, FeatureFlags, NewExhibitor, OrganizationType,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Builder, Connection, Database, Row};
use tracing::{debug, info};
use uuid::Uuid;

const SELECT_COLUMNS: &str = "id, event_id, organization_name, booth, fee_waiver, scholarship_offer, \
     on_spot_admission, contact_name, contact_phone, contact_email, organization_type, created_at, updated_at";

fn db_error(context: &str) -> impl Fn(libsql::Error) -> SyncError + '_ {
    move |e| SyncError::Database {
        message: format!("{context}: {e}"),
    }
}

/// Exhibitor directory stored in Turso/libSQL
pub struct LibsqlDirectoryStore {
    db: Database,
}

impl LibsqlDirectoryStore {
    /// Connect to Turso using `LIBSQL_URL` and `LIBSQL_AUTH_TOKEN`
    pub async fn from_env() -> Result<Self> {
        let url = required_env("LIBSQL_URL")?;
        let auth_token = required_env("LIBSQL_AUTH_TOKEN")?;

        info!("Connecting to Turso database at {}", url);

        let db = Builder::new_remote(url, auth_token)
            .build()
            .await
            .map_err(db_error("Failed to connect to database"))?;

        Ok(Self { db })
    }

    /// Open (or create) a local database file
    pub async fn open_local(path: &str) -> Result<Self> {
        let db = Builder::new_local(path)
            .build()
            .await
            .map_err(db_error("Failed to open local database"))?;
        Ok(Self { db })
    }

    async fn get_connection(&self) -> Result<Connection> {
        self.db
            .connect()
            .map_err(db_error("Failed to get database connection"))
    }

    pub async fn run_migrations(&self) -> Result<()> {
        info!("Running database migrations...");
        let conn = self.get_connection().await?;
        let migration_sql = include_str!("../migrations/001_create_exhibitors.sql");
        conn.execute_batch(migration_sql)
            .await
            .map_err(db_error("Failed to run migrations"))?;
        info!("Database migrations completed successfully");
        Ok(())
    }
}

fn row_to_exhibitor(row: &Row) -> Result<ExistingExhibitor> {
    let text = |i: i32, name: &str| -> Result<String> {
        row.get::<String>(i).map_err(|e| SyncError::Database {
            message: format!("Failed to get {name}: {e}"),
        })
    };
    let flag = |i: i32| row.get::<i64>(i).map(|v| v != 0).unwrap_or(false);
    let timestamp = |s: String| -> Result<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&s)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| SyncError::Database {
                message: format!("Invalid timestamp '{s}': {e}"),
            })
    };

    let id = text(0, "id")?;
    Ok(ExistingExhibitor {
        id: Uuid::parse_str(&id).map_err(|e| SyncError::Database {
            message: format!("Invalid id '{id}': {e}"),
        })?,
        event_id: text(1, "event_id")?,
        organization_name: text(2, "organization_name")?,
        booth: text(3, "booth")?,
        features: FeatureFlags {
            fee_waiver: flag(4),
            scholarship_offer: flag(5),
            on_spot_admission: flag(6),
        },
        contact: ContactInfo {
            name: row.get::<String>(7).ok(),
            phone: row.get::<String>(8).ok(),
            email: row.get::<String>(9).ok(),
        },
        organization_type: OrganizationType::from_str_lossy(&text(10, "organization_type")?),
        created_at: timestamp(text(11, "created_at")?)?,
        updated_at: timestamp(text(12, "updated_at")?)?,
    })
}

fn nullable(value: &Option<String>) -> libsql::Value {
    match value {
        Some(v) => libsql::Value::Text(v.clone()),
        None => libsql::Value::Null,
    }
}

#[async_trait]
impl DirectoryStore for LibsqlDirectoryStore {
    async fn fetch_all(&self, event_id: &str) -> Result<Vec<ExistingExhibitor>> {
        let conn = self.get_connection().await?;
        let mut rows = conn
            .query(
                &format!("SELECT {SELECT_COLUMNS} FROM exhibitors WHERE event_id = ? ORDER BY seq"),
                libsql::params![event_id],
            )
            .await
            .map_err(db_error("Failed to query exhibitors"))?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await.map_err(db_error("Failed to read row"))? {
            results.push(row_to_exhibitor(&row)?);
        }
        Ok(results)
    }

    async fn update(&self, id: Uuid, changes: &ExhibitorUpdate) -> Result<()> {
        let conn = self.get_connection().await?;
        let affected = conn
            .execute(
                "UPDATE exhibitors SET booth = ?, fee_waiver = ?, scholarship_offer = ?, on_spot_admission = ?, \
                 contact_name = ?, contact_phone = ?, contact_email = ?, updated_at = ? WHERE id = ?",
                libsql::params![
                    changes.booth.clone(),
                    changes.features.fee_waiver as i64,
                    changes.features.scholarship_offer as i64,
                    changes.features.on_spot_admission as i64,
                    nullable(&changes.contact.name),
                    nullable(&changes.contact.phone),
                    nullable(&changes.contact.email),
                    Utc::now().to_rfc3339(),
                    id.to_string()
                ],
            )
            .await
            .map_err(db_error("Failed to update exhibitor"))?;

        if affected == 0 {
            return Err(SyncError::store(format!("exhibitor {} not found", id)));
        }
        debug!("Updated exhibitor {}", id);
        Ok(())
    }

    async fn insert(&self, event_id: &str, exhibitor: &NewExhibitor) -> Result<Uuid> {
        let conn = self.get_connection().await?;
        let id = Uuid::new_v4();
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO exhibitors (id, event_id, organization_name, booth, fee_waiver, scholarship_offer, \
             on_spot_admission, contact_name, contact_phone, contact_email, organization_type, seq, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, (SELECT COALESCE(MAX(seq), 0) + 1 FROM exhibitors), ?, ?)",
            libsql::params![
                id.to_string(),
                event_id,
                exhibitor.organization_name.clone(),
                exhibitor.booth.clone(),
                exhibitor.features.fee_waiver as i64,
                exhibitor.features.scholarship_offer as i64,
                exhibitor.features.on_spot_admission as i64,
                nullable(&exhibitor.contact.name),
                nullable(&exhibitor.contact.phone),
                nullable(&exhibitor.contact.email),
                exhibitor.organization_type.as_str(),
                now.clone(),
                now
            ],
        )
        .await
        .map_err(db_error("Failed to insert exhibitor"))?;

        debug!("Created exhibitor: {} with id {}", exhibitor.organization_name, id);
        Ok(id)
    }

    async fn delete_all(&self, event_id: &str) -> Result<usize> {
        let conn = self.get_connection().await?;
        let deleted = conn
            .execute("DELETE FROM exhibitors WHERE event_id = ?", libsql::params![event_id])
            .await
            .map_err(db_error("Failed to clear exhibitors"))?;

        info!("Cleared {} exhibitors for event {}", deleted, event_id);
        Ok(deleted as usize)
    }
}
