//! SQLite-based store implementation

use chrono::{DateTime, Local};
use fuelwatch_gateway::{ApiCredential, Recipient};
use fuelwatch_util::{LocationId, StationId, TypeId};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

use crate::{AuditEvent, AuditEventType, Store, StoreError, StoreResult};

/// SQLite-based store
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a store at the given path
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Database("connection lock poisoned".into()))
    }

    fn init_schema(&self) -> StoreResult<()> {
        let conn = self.lock()?;

        conn.execute_batch(
            r#"
            -- Reference data
            CREATE TABLE IF NOT EXISTS fuel_usage (
                station_type INTEGER NOT NULL,
                fuel_type INTEGER NOT NULL,
                quantity INTEGER NOT NULL,
                PRIMARY KEY (station_type, fuel_type)
            );

            CREATE TABLE IF NOT EXISTS type_names (
                type_id INTEGER PRIMARY KEY,
                name TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS location_names (
                location_id INTEGER PRIMARY KEY,
                name TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS capacities (
                type_id INTEGER PRIMARY KEY,
                capacity INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS station_names (
                station_id INTEGER PRIMARY KEY,
                name TEXT NOT NULL
            );

            -- Accounts
            CREATE TABLE IF NOT EXISTS credentials (
                key_id INTEGER PRIMARY KEY,
                verification_code TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS recipients (
                username TEXT PRIMARY KEY,
                email TEXT NOT NULL
            );

            -- Audit log (append-only)
            CREATE TABLE IF NOT EXISTS audit_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                event_json TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_audit_timestamp ON audit_log(timestamp);
            "#,
        )?;

        debug!("Store schema initialized");
        Ok(())
    }

    /// Run a SQL script against the store, e.g. a reference data dump
    pub fn import_script(&self, sql: &str) -> StoreResult<()> {
        let conn = self.lock()?;
        conn.execute_batch(sql)?;
        debug!(bytes = sql.len(), "SQL script imported");
        Ok(())
    }

    pub fn set_fuel_usage(
        &self,
        station_type: TypeId,
        fuel_type: TypeId,
        quantity: u64,
    ) -> StoreResult<()> {
        let conn = self.lock()?;
        conn.execute(
            r#"
            INSERT INTO fuel_usage (station_type, fuel_type, quantity)
            VALUES (?, ?, ?)
            ON CONFLICT(station_type, fuel_type)
            DO UPDATE SET quantity = excluded.quantity
            "#,
            params![station_type.get(), fuel_type.get(), to_sql_int(quantity)?],
        )?;
        Ok(())
    }

    pub fn set_type_name(&self, type_id: TypeId, name: &str) -> StoreResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO type_names (type_id, name) VALUES (?, ?)",
            params![type_id.get(), name],
        )?;
        Ok(())
    }

    pub fn set_location_name(&self, location_id: LocationId, name: &str) -> StoreResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO location_names (location_id, name) VALUES (?, ?)",
            params![location_id.get(), name],
        )?;
        Ok(())
    }

    pub fn set_capacity(&self, station_type: TypeId, capacity: u64) -> StoreResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO capacities (type_id, capacity) VALUES (?, ?)",
            params![station_type.get(), to_sql_int(capacity)?],
        )?;
        Ok(())
    }

    pub fn set_station_name(&self, station_id: StationId, name: &str) -> StoreResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO station_names (station_id, name) VALUES (?, ?)",
            params![station_id.get(), name],
        )?;
        Ok(())
    }

    pub fn add_credential(&self, credential: &ApiCredential) -> StoreResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO credentials (key_id, verification_code) VALUES (?, ?)",
            params![credential.key_id, credential.verification_code],
        )?;
        debug!(key_id = credential.key_id, "Credential stored");
        Ok(())
    }

    pub fn add_recipient(&self, recipient: &Recipient) -> StoreResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO recipients (username, email) VALUES (?, ?)",
            params![recipient.username, recipient.email],
        )?;
        debug!(username = %recipient.username, "Recipient stored");
        Ok(())
    }

    fn query_text(&self, sql: &str, key: i64, what: &str) -> StoreResult<String> {
        let conn = self.lock()?;
        conn.query_row(sql, [key], |row| row.get(0))
            .optional()?
            .ok_or_else(|| StoreError::NotFound(format!("{} {}", what, key)))
    }
}

fn to_sql_int(value: u64) -> StoreResult<i64> {
    i64::try_from(value).map_err(|_| StoreError::Serialization(format!("{} out of range", value)))
}

fn from_sql_int(table: &'static str, value: i64) -> StoreResult<u64> {
    u64::try_from(value).map_err(|_| StoreError::InvalidValue { table, value })
}

impl Store for SqliteStore {
    fn fuel_usage(&self, station_type: TypeId, fuel_type: TypeId) -> StoreResult<u64> {
        let quantity: i64 = {
            let conn = self.lock()?;
            conn.query_row(
                "SELECT quantity FROM fuel_usage WHERE station_type = ? AND fuel_type = ?",
                params![station_type.get(), fuel_type.get()],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| {
                StoreError::NotFound(format!("fuel usage {}/{}", station_type, fuel_type))
            })?
        };
        from_sql_int("fuel_usage", quantity)
    }

    fn type_name(&self, type_id: TypeId) -> StoreResult<String> {
        self.query_text(
            "SELECT name FROM type_names WHERE type_id = ?",
            type_id.get(),
            "type",
        )
    }

    fn location_name(&self, location_id: LocationId) -> StoreResult<String> {
        self.query_text(
            "SELECT name FROM location_names WHERE location_id = ?",
            location_id.get(),
            "location",
        )
    }

    fn capacity(&self, station_type: TypeId) -> StoreResult<u64> {
        let capacity: i64 = {
            let conn = self.lock()?;
            conn.query_row(
                "SELECT capacity FROM capacities WHERE type_id = ?",
                [station_type.get()],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| StoreError::NotFound(format!("capacity {}", station_type)))?
        };
        from_sql_int("capacities", capacity)
    }

    fn station_name(&self, station_id: StationId) -> StoreResult<String> {
        self.query_text(
            "SELECT name FROM station_names WHERE station_id = ?",
            station_id.get(),
            "station",
        )
    }

    fn credentials(&self) -> StoreResult<Vec<ApiCredential>> {
        let conn = self.lock()?;
        let mut stmt =
            conn.prepare("SELECT key_id, verification_code FROM credentials ORDER BY key_id")?;

        let rows = stmt.query_map([], |row| {
            Ok(ApiCredential {
                key_id: row.get(0)?,
                verification_code: row.get(1)?,
            })
        })?;

        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn recipients(&self) -> StoreResult<Vec<Recipient>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT username, email FROM recipients ORDER BY username")?;

        let rows = stmt.query_map([], |row| {
            Ok(Recipient {
                username: row.get(0)?,
                email: row.get(1)?,
            })
        })?;

        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn append_audit(&self, mut event: AuditEvent) -> StoreResult<()> {
        let conn = self.lock()?;
        let event_json = serde_json::to_string(&event.event)?;

        conn.execute(
            "INSERT INTO audit_log (timestamp, event_json) VALUES (?, ?)",
            params![event.timestamp.to_rfc3339(), event_json],
        )?;

        event.id = conn.last_insert_rowid();
        debug!(event_id = event.id, "Audit event appended");

        Ok(())
    }

    fn get_recent_audits(&self, limit: usize) -> StoreResult<Vec<AuditEvent>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            "SELECT id, timestamp, event_json FROM audit_log ORDER BY id DESC LIMIT ?",
        )?;

        let rows = stmt.query_map([limit as i64], |row| {
            let id: i64 = row.get(0)?;
            let timestamp_str: String = row.get(1)?;
            let event_json: String = row.get(2)?;
            Ok((id, timestamp_str, event_json))
        })?;

        let mut events = Vec::new();
        for row in rows {
            let (id, timestamp_str, event_json) = row?;
            let timestamp = DateTime::parse_from_rfc3339(&timestamp_str)
                .map(|dt| dt.with_timezone(&Local))
                .unwrap_or_else(|_| fuelwatch_util::now());
            let event: AuditEventType = serde_json::from_str(&event_json)?;

            events.push(AuditEvent {
                id,
                timestamp,
                event,
            });
        }

        Ok(events)
    }

    fn is_healthy(&self) -> bool {
        match self.conn.lock() {
            Ok(conn) => conn.query_row("SELECT 1", [], |_| Ok(())).is_ok(),
            Err(_) => {
                warn!("Store lock poisoned");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_store() {
        let store = SqliteStore::in_memory().unwrap();
        assert!(store.is_healthy());
    }

    #[test]
    fn test_audit_log() {
        let store = SqliteStore::in_memory().unwrap();

        store
            .append_audit(AuditEvent::new(AuditEventType::ServiceStarted))
            .unwrap();
        store
            .append_audit(AuditEvent::new(AuditEventType::ReminderCleared {
                station_id: StationId::new(42),
            }))
            .unwrap();

        let events = store.get_recent_audits(10).unwrap();
        assert_eq!(events.len(), 2);
        // Newest first
        assert_eq!(
            events[0].event,
            AuditEventType::ReminderCleared {
                station_id: StationId::new(42)
            }
        );
        assert_eq!(events[1].event, AuditEventType::ServiceStarted);
    }

    #[test]
    fn test_reference_lookups() {
        let store = SqliteStore::in_memory().unwrap();
        let tower = TypeId::new(12235);
        let fuel = TypeId::new(4051);

        store.set_fuel_usage(tower, fuel, 40).unwrap();
        store.set_type_name(fuel, "Nitrogen Fuel Block").unwrap();
        store.set_capacity(tower, 140_000).unwrap();
        store
            .set_location_name(LocationId::new(40009082), "Jita IV - Moon 4")
            .unwrap();
        store
            .set_station_name(StationId::new(1_000_001), "Home Tower")
            .unwrap();

        assert_eq!(store.fuel_usage(tower, fuel).unwrap(), 40);
        assert_eq!(store.type_name(fuel).unwrap(), "Nitrogen Fuel Block");
        assert_eq!(store.capacity(tower).unwrap(), 140_000);
        assert_eq!(
            store.location_name(LocationId::new(40009082)).unwrap(),
            "Jita IV - Moon 4"
        );
        assert_eq!(
            store.station_name(StationId::new(1_000_001)).unwrap(),
            "Home Tower"
        );

        // Upsert replaces
        store.set_fuel_usage(tower, fuel, 30).unwrap();
        assert_eq!(store.fuel_usage(tower, fuel).unwrap(), 30);
    }

    #[test]
    fn test_missing_reference_data() {
        let store = SqliteStore::in_memory().unwrap();
        assert!(matches!(
            store.type_name(TypeId::new(1)),
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            store.fuel_usage(TypeId::new(1), TypeId::new(2)),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_negative_capacity_rejected() {
        let store = SqliteStore::in_memory().unwrap();
        store
            .import_script("INSERT INTO capacities (type_id, capacity) VALUES (7, -1);")
            .unwrap();
        assert!(matches!(
            store.capacity(TypeId::new(7)),
            Err(StoreError::InvalidValue { value: -1, .. })
        ));
    }

    #[test]
    fn test_accounts() {
        let store = SqliteStore::in_memory().unwrap();
        store.add_credential(&ApiCredential::new(2, "b")).unwrap();
        store.add_credential(&ApiCredential::new(1, "a")).unwrap();
        store
            .add_recipient(&Recipient::new("zoe", "zoe@example.com"))
            .unwrap();
        store
            .add_recipient(&Recipient::new("amy", "amy@example.com"))
            .unwrap();

        let credentials = store.credentials().unwrap();
        assert_eq!(credentials.len(), 2);
        assert_eq!(credentials[0].key_id, 1);

        let recipients = store.recipients().unwrap();
        assert_eq!(recipients[0].username, "amy");
        assert_eq!(recipients[1].email, "zoe@example.com");
    }

    #[test]
    fn test_file_backed_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fuelwatch.db");

        {
            let store = SqliteStore::open(&path).unwrap();
            store.set_type_name(TypeId::new(4051), "Nitrogen Fuel Block").unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(
            store.type_name(TypeId::new(4051)).unwrap(),
            "Nitrogen Fuel Block"
        );
    }
}
