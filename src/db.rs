use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::path::Path;

// ============================================================================
// ROW IDENTIFIERS
// ============================================================================

/// Row id of a governorate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GovernorateId(pub i64);

/// Row id of a city (scoped by its governorate)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CityId(pub i64);

/// Row id of a district (scoped by its city)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DistrictId(pub i64);

/// Row id of a town
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TownId(pub i64);

/// Identity of a town row: (district, name)
pub type TownKey = (DistrictId, String);

// ============================================================================
// AUDIT EVENTS
// ============================================================================

/// Event for the import audit trail
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Event {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub entity_type: String,
    pub entity_id: String,
    pub data: serde_json::Value,
    pub actor: String,
}

impl Event {
    pub fn new(
        event_type: &str,
        entity_type: &str,
        entity_id: &str,
        data: serde_json::Value,
        actor: &str,
    ) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event_type: event_type.to_string(),
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
            data,
            actor: actor.to_string(),
        }
    }
}

// ============================================================================
// SCHEMA
// ============================================================================

/// Open (or create) the database file and make sure the schema exists
pub fn open_database(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)
        .with_context(|| format!("Failed to open database {}", path.display()))?;
    setup_database(&conn)?;
    Ok(conn)
}

/// File backing the main schema, None for in-memory databases
pub fn database_file(conn: &Connection) -> Result<Option<String>> {
    let file: String = conn.query_row(
        "SELECT file FROM pragma_database_list WHERE name = 'main'",
        [],
        |row| row.get(0),
    )?;
    Ok(Some(file).filter(|f| !f.is_empty()))
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", true)?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS governorate (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS city (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            governorate_id INTEGER NOT NULL REFERENCES governorate(id),
            UNIQUE (name, governorate_id)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS district (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            city_id INTEGER NOT NULL REFERENCES city(id),
            UNIQUE (name, city_id)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS town (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            district_id INTEGER NOT NULL REFERENCES district(id),
            UNIQUE (name, district_id)
        )",
        [],
    )?;

    // ==========================================================================
    // Events Table (import audit trail)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            event_id TEXT UNIQUE NOT NULL,
            timestamp TEXT NOT NULL,
            event_type TEXT NOT NULL,
            entity_type TEXT NOT NULL,
            entity_id TEXT NOT NULL,
            data TEXT NOT NULL,
            actor TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_town_district ON town(district_id)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_events_timestamp ON events(timestamp)",
        [],
    )?;

    Ok(())
}

// ============================================================================
// TOWNS
// ============================================================================

/// Every persisted (district, town) key, used to seed the ledger
pub fn load_town_keys(conn: &Connection) -> Result<Vec<TownKey>> {
    let mut stmt = conn.prepare("SELECT district_id, name FROM town")?;

    let keys = stmt
        .query_map([], |row| Ok((DistrictId(row.get(0)?), row.get(1)?)))?
        .collect::<Result<Vec<_>, _>>()
        .context("Failed to load existing towns")?;

    Ok(keys)
}

pub fn find_town(conn: &Connection, name: &str, district: DistrictId) -> Result<Option<TownId>> {
    let id = conn
        .query_row(
            "SELECT id FROM town WHERE name = ?1 AND district_id = ?2",
            params![name, district.0],
            |row| row.get(0),
        )
        .optional()?;

    Ok(id.map(TownId))
}

/// Insert the town unless it already exists under `district`.
/// Returns the new row id, or None when it was already there.
pub fn insert_town_if_absent(
    conn: &Connection,
    name: &str,
    district: DistrictId,
) -> Result<Option<TownId>> {
    if find_town(conn, name, district)?.is_some() {
        return Ok(None);
    }

    conn.execute(
        "INSERT INTO town (name, district_id) VALUES (?1, ?2)",
        params![name, district.0],
    )
    .with_context(|| format!("Failed to insert town {}", name))?;

    Ok(Some(TownId(conn.last_insert_rowid())))
}

// ============================================================================
// EVENTS
// ============================================================================

/// Insert event into audit trail
pub fn insert_event(conn: &Connection, event: &Event) -> Result<()> {
    let data_json = serde_json::to_string(&event.data)?;

    conn.execute(
        "INSERT INTO events (
            event_id, timestamp, event_type, entity_type, entity_id, data, actor
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            event.event_id,
            event.timestamp.to_rfc3339(),
            event.event_type,
            event.entity_type,
            event.entity_id,
            data_json,
            event.actor,
        ],
    )?;

    Ok(())
}

/// Most recent events first
pub fn get_recent_events(conn: &Connection, limit: usize) -> Result<Vec<Event>> {
    let mut stmt = conn.prepare(
        "SELECT event_id, timestamp, event_type, entity_type, entity_id, data, actor
         FROM events
         ORDER BY timestamp DESC, id DESC
         LIMIT ?1",
    )?;

    let events = stmt
        .query_map(params![limit as i64], |row| {
            let timestamp_str: String = row.get(1)?;
            let data_json: String = row.get(5)?;

            Ok(Event {
                event_id: row.get(0)?,
                timestamp: DateTime::parse_from_rfc3339(&timestamp_str)
                    .map_err(|_| rusqlite::Error::InvalidQuery)?
                    .with_timezone(&Utc),
                event_type: row.get(2)?,
                entity_type: row.get(3)?,
                entity_id: row.get(4)?,
                data: serde_json::from_str(&data_json)
                    .map_err(|_| rusqlite::Error::InvalidQuery)?,
                actor: row.get(6)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(events)
}

// ============================================================================
// STATISTICS
// ============================================================================

/// Row counts of the four hierarchy tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TableCounts {
    pub governorates: i64,
    pub cities: i64,
    pub districts: i64,
    pub towns: i64,
}

pub fn table_counts(conn: &Connection) -> Result<TableCounts> {
    let count = |sql: &str| -> Result<i64> { Ok(conn.query_row(sql, [], |row| row.get(0))?) };

    Ok(TableCounts {
        governorates: count("SELECT COUNT(*) FROM governorate")?,
        cities: count("SELECT COUNT(*) FROM city")?,
        districts: count("SELECT COUNT(*) FROM district")?,
        towns: count("SELECT COUNT(*) FROM town")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        conn
    }

    fn seed_district(conn: &Connection) -> DistrictId {
        conn.execute("INSERT INTO governorate (name) VALUES ('Aleppo')", []).unwrap();
        conn.execute("INSERT INTO city (name, governorate_id) VALUES ('Aleppo', 1)", []).unwrap();
        conn.execute("INSERT INTO district (name, city_id) VALUES ('الباب', 1)", []).unwrap();
        DistrictId(1)
    }

    #[test]
    fn test_setup_is_idempotent() {
        let conn = test_conn();
        setup_database(&conn).unwrap();

        let counts = table_counts(&conn).unwrap();
        assert_eq!(counts.towns, 0);
        assert_eq!(counts.governorates, 0);
        assert_eq!(database_file(&conn).unwrap(), None);
    }

    #[test]
    fn test_insert_town_if_absent_twice() {
        let conn = test_conn();
        let district = seed_district(&conn);

        let first = insert_town_if_absent(&conn, "تادف", district).unwrap();
        let second = insert_town_if_absent(&conn, "تادف", district).unwrap();

        assert!(first.is_some());
        assert!(second.is_none());
        assert_eq!(find_town(&conn, "تادف", district).unwrap(), first);
        assert_eq!(table_counts(&conn).unwrap().towns, 1);
    }

    #[test]
    fn test_town_unique_constraint_is_scoped() {
        let conn = test_conn();
        let district = seed_district(&conn);

        conn.execute("INSERT INTO town (name, district_id) VALUES ('تادف', 1)", []).unwrap();
        let dup = conn.execute("INSERT INTO town (name, district_id) VALUES ('تادف', 1)", []);
        assert!(dup.is_err());

        conn.execute("INSERT INTO district (name, city_id) VALUES ('', 1)", []).unwrap();
        assert!(insert_town_if_absent(&conn, "تادف", DistrictId(2)).unwrap().is_some());

        let keys = load_town_keys(&conn).unwrap();
        assert_eq!(keys.len(), 2);
        assert!(keys.contains(&(district, "تادف".to_string())));
    }

    #[test]
    fn test_foreign_keys_enforced() {
        let conn = test_conn();
        let orphan = conn.execute("INSERT INTO town (name, district_id) VALUES ('تادف', 99)", []);
        assert!(orphan.is_err());
    }

    #[test]
    fn test_event_log() {
        let conn = test_conn();

        let event = Event::new(
            "towns_added",
            "source_file",
            "Aleppo - Aleppo",
            serde_json::json!({"new_towns": 2}),
            "test_actor",
        );

        insert_event(&conn, &event).unwrap();

        let events = get_recent_events(&conn, 10).unwrap();

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, "towns_added");
        assert_eq!(events[0].entity_id, "Aleppo - Aleppo");
        assert_eq!(events[0].data["new_towns"], 2);
    }
}
