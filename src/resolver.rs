// 🧭 Entity Resolver - scoped get-or-create for the lookup tables
// Governorate → City → District, each lookup scoped by the parent's id

use crate::db::{CityId, DistrictId, GovernorateId};
use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};

// ============================================================================
// TABLE DESCRIPTORS
// ============================================================================

/// Static SQL for one level of the hierarchy
struct EntityTable {
    label: &'static str,
    select: &'static str,
    insert: &'static str,
}

const GOVERNORATE: EntityTable = EntityTable {
    label: "governorate",
    select: "SELECT id FROM governorate WHERE name = ?1",
    insert: "INSERT INTO governorate (name) VALUES (?1)",
};

const CITY: EntityTable = EntityTable {
    label: "city",
    select: "SELECT id FROM city WHERE name = ?1 AND governorate_id = ?2",
    insert: "INSERT INTO city (name, governorate_id) VALUES (?1, ?2)",
};

const DISTRICT: EntityTable = EntityTable {
    label: "district",
    select: "SELECT id FROM district WHERE name = ?1 AND city_id = ?2",
    insert: "INSERT INTO district (name, city_id) VALUES (?1, ?2)",
};

/// Look the row up and insert it when missing. Every call hits the store.
fn get_or_create(conn: &Connection, table: &EntityTable, name: &str, parent: Option<i64>) -> Result<i64> {
    let existing: Option<i64> = match parent {
        Some(parent_id) => conn
            .query_row(table.select, params![name, parent_id], |row| row.get(0))
            .optional()?,
        None => conn
            .query_row(table.select, params![name], |row| row.get(0))
            .optional()?,
    };

    if let Some(id) = existing {
        return Ok(id);
    }

    let inserted = match parent {
        Some(parent_id) => conn.execute(table.insert, params![name, parent_id]),
        None => conn.execute(table.insert, params![name]),
    };
    inserted.with_context(|| format!("Failed to insert {} {}", table.label, name))?;

    Ok(conn.last_insert_rowid())
}

// ============================================================================
// TYPED RESOLVERS
// ============================================================================

pub fn resolve_governorate(conn: &Connection, name: &str) -> Result<GovernorateId> {
    get_or_create(conn, &GOVERNORATE, name, None).map(GovernorateId)
}

pub fn resolve_city(conn: &Connection, name: &str, governorate: GovernorateId) -> Result<CityId> {
    get_or_create(conn, &CITY, name, Some(governorate.0)).map(CityId)
}

pub fn resolve_district(conn: &Connection, name: &str, city: CityId) -> Result<DistrictId> {
    get_or_create(conn, &DISTRICT, name, Some(city.0)).map(DistrictId)
}

/// Resolve the full chain for one record, parent before child
pub fn resolve_chain(
    conn: &Connection,
    governorate: &str,
    city: &str,
    district: &str,
) -> Result<DistrictId> {
    let governorate_id = resolve_governorate(conn, governorate)?;
    let city_id = resolve_city(conn, city, governorate_id)?;
    resolve_district(conn, district, city_id)
}
