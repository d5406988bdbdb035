//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::model::{Agency, Contract, Heating, Listing, ScrapeRun};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::HomefinderError;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{named_params, params, Connection, OptionalExtension, Row};
use std::path::Path;

const LISTING_COLUMNS: &str = "title, agency, url, description, contract, price, city,
     neighborhood, address, rooms, bedrooms, bathrooms, square_meters, floor, year_built,
     has_elevator, heating, has_air_conditioning, has_garage, is_furnished, energy_class,
     energy_consumption, features, scrape_date, publication_date, raw_html_file, code";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
    history_retention: usize,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    /// * `history_retention` - Maximum number of scrape runs kept
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(HomefinderError)` - Failed to open database
    pub fn new(path: &Path, history_retention: usize) -> Result<Self, HomefinderError> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        tracing::debug!("Opened listing database at {}", path.display());

        Ok(Self {
            conn,
            history_retention,
        })
    }

    /// Creates an in-memory database
    pub fn new_in_memory(history_retention: usize) -> Result<Self, HomefinderError> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn,
            history_retention,
        })
    }

    /// Deletes the oldest runs beyond the retention cap
    fn prune_runs(&mut self) -> StorageResult<usize> {
        let removed = self.conn.execute(
            "DELETE FROM scrape_runs WHERE id NOT IN
             (SELECT id FROM scrape_runs ORDER BY run_at DESC, id DESC LIMIT ?1)",
            params![self.history_retention as i64],
        )?;
        if removed > 0 {
            tracing::debug!("Pruned {} old scrape runs", removed);
        }
        Ok(removed)
    }
}

/// Fixed-width RFC 3339 so that timestamps sort lexicographically
fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn row_to_listing(row: &Row<'_>) -> rusqlite::Result<Listing> {
    let contract: String = row.get(4)?;
    let heating: Option<String> = row.get(16)?;
    let features: Option<String> = row.get(22)?;
    let scrape_date: String = row.get(23)?;
    let publication_date: Option<String> = row.get(24)?;

    let features = match features {
        Some(raw) => Some(serde_json::from_str::<Vec<String>>(&raw).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(22, Type::Text, Box::new(e))
        })?),
        None => None,
    };

    Ok(Listing {
        title: row.get(0)?,
        agency: row.get(1)?,
        url: row.get(2)?,
        description: row.get(3)?,
        contract: Contract::from_db_string(&contract).unwrap_or(Contract::Sell),
        price: row.get(5)?,
        city: row.get(6)?,
        neighborhood: row.get(7)?,
        address: row.get(8)?,
        rooms: row.get(9)?,
        bedrooms: row.get(10)?,
        bathrooms: row.get(11)?,
        square_meters: row.get(12)?,
        floor: row.get(13)?,
        year_built: row.get(14)?,
        has_elevator: row.get(15)?,
        heating: heating.as_deref().and_then(Heating::from_db_string),
        has_air_conditioning: row.get(17)?,
        has_garage: row.get(18)?,
        is_furnished: row.get(19)?,
        energy_class: row.get(20)?,
        energy_consumption: row.get(21)?,
        features,
        scrape_date: parse_timestamp(23, &scrape_date)?,
        publication_date: publication_date
            .as_deref()
            .map(|raw| parse_timestamp(24, raw))
            .transpose()?,
        raw_html_file: row.get(25)?,
        code: row.get(26)?,
    })
}

fn row_to_run(row: &Row<'_>) -> rusqlite::Result<ScrapeRun> {
    let run_at: String = row.get(1)?;
    Ok(ScrapeRun {
        id: row.get(0)?,
        run_at: parse_timestamp(1, &run_at)?,
        source: row.get(2)?,
        listings: row.get(3)?,
        duration_seconds: row.get(4)?,
    })
}

impl Storage for SqliteStorage {
    // ===== Listings =====

    fn save_listing(&mut self, listing: &Listing) -> StorageResult<i64> {
        listing
            .validate()
            .map_err(|reason| StorageError::InvalidRecord {
                url: listing.url.clone(),
                reason: reason.to_string(),
            })?;

        let features = listing
            .features
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        let now = format_timestamp(&Utc::now());

        let sql = format!(
            "INSERT INTO listings ({LISTING_COLUMNS}, created_at, updated_at)
             VALUES (:title, :agency, :url, :description, :contract, :price, :city,
                     :neighborhood, :address, :rooms, :bedrooms, :bathrooms, :square_meters,
                     :floor, :year_built, :has_elevator, :heating, :has_air_conditioning,
                     :has_garage, :is_furnished, :energy_class, :energy_consumption, :features,
                     :scrape_date, :publication_date, :raw_html_file, :code, :now, :now)
             ON CONFLICT(url) DO UPDATE SET
                title = excluded.title,
                agency = excluded.agency,
                description = excluded.description,
                contract = excluded.contract,
                price = excluded.price,
                city = excluded.city,
                neighborhood = excluded.neighborhood,
                address = excluded.address,
                rooms = excluded.rooms,
                bedrooms = excluded.bedrooms,
                bathrooms = excluded.bathrooms,
                square_meters = excluded.square_meters,
                floor = excluded.floor,
                year_built = excluded.year_built,
                has_elevator = excluded.has_elevator,
                heating = excluded.heating,
                has_air_conditioning = excluded.has_air_conditioning,
                has_garage = excluded.has_garage,
                is_furnished = excluded.is_furnished,
                energy_class = excluded.energy_class,
                energy_consumption = excluded.energy_consumption,
                features = excluded.features,
                scrape_date = excluded.scrape_date,
                publication_date = excluded.publication_date,
                raw_html_file = excluded.raw_html_file,
                code = excluded.code,
                updated_at = excluded.updated_at"
        );

        self.conn.execute(
            &sql,
            named_params! {
                ":title": listing.title,
                ":agency": listing.agency,
                ":url": listing.url,
                ":description": listing.description,
                ":contract": listing.contract.to_db_string(),
                ":price": listing.price,
                ":city": listing.city,
                ":neighborhood": listing.neighborhood,
                ":address": listing.address,
                ":rooms": listing.rooms,
                ":bedrooms": listing.bedrooms,
                ":bathrooms": listing.bathrooms,
                ":square_meters": listing.square_meters,
                ":floor": listing.floor,
                ":year_built": listing.year_built,
                ":has_elevator": listing.has_elevator,
                ":heating": listing.heating.map(|h| h.to_db_string()),
                ":has_air_conditioning": listing.has_air_conditioning,
                ":has_garage": listing.has_garage,
                ":is_furnished": listing.is_furnished,
                ":energy_class": listing.energy_class,
                ":energy_consumption": listing.energy_consumption,
                ":features": features,
                ":scrape_date": format_timestamp(&listing.scrape_date),
                ":publication_date": listing.publication_date.as_ref().map(format_timestamp),
                ":raw_html_file": listing.raw_html_file,
                ":code": listing.code,
                ":now": now,
            },
        )?;

        let id = self.conn.query_row(
            "SELECT id FROM listings WHERE url = ?1",
            params![listing.url],
            |row| row.get(0),
        )?;

        Ok(id)
    }

    fn get_listing_by_url(&self, url: &str) -> StorageResult<Option<Listing>> {
        let sql = format!("SELECT {LISTING_COLUMNS} FROM listings WHERE url = ?1");
        let listing = self
            .conn
            .query_row(&sql, params![url], row_to_listing)
            .optional()?;
        Ok(listing)
    }

    fn count_listings(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM listings", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    // ===== Scrape history =====

    fn get_last_run_time(&self) -> StorageResult<Option<DateTime<Utc>>> {
        let raw: Option<String> = self
            .conn
            .query_row("SELECT MAX(run_at) FROM scrape_runs", [], |row| row.get(0))?;

        Ok(raw.as_deref().map(|s| parse_timestamp(0, s)).transpose()?)
    }

    fn record_run(&mut self, run: &ScrapeRun) -> StorageResult<i64> {
        self.conn.execute(
            "INSERT INTO scrape_runs (run_at, source, listings, duration_seconds)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                format_timestamp(&run.run_at),
                run.source,
                run.listings,
                run.duration_seconds
            ],
        )?;
        let id = self.conn.last_insert_rowid();

        self.prune_runs()?;

        Ok(id)
    }

    fn recent_runs(&self, limit: usize) -> StorageResult<Vec<ScrapeRun>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, run_at, source, listings, duration_seconds FROM scrape_runs
             ORDER BY run_at DESC, id DESC LIMIT ?1",
        )?;

        let runs = stmt
            .query_map(params![limit as i64], row_to_run)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(runs)
    }

    // ===== Agencies =====

    fn seed_agencies(&mut self, agencies: &[Agency]) -> StorageResult<()> {
        for agency in agencies {
            self.conn.execute(
                "INSERT INTO agencies (id, name, base_url, phone, email, address)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(id) DO UPDATE SET
                    name = excluded.name,
                    base_url = excluded.base_url,
                    phone = COALESCE(excluded.phone, agencies.phone),
                    email = COALESCE(excluded.email, agencies.email),
                    address = COALESCE(excluded.address, agencies.address)",
                params![
                    agency.id,
                    agency.name,
                    agency.base_url,
                    agency.phone,
                    agency.email,
                    agency.address
                ],
            )?;
        }
        Ok(())
    }

    fn get_agencies(&self) -> StorageResult<Vec<Agency>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, base_url, phone, email, address FROM agencies ORDER BY id",
        )?;

        let agencies = stmt
            .query_map([], |row| {
                Ok(Agency {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    base_url: row.get(2)?,
                    phone: row.get(3)?,
                    email: row.get(4)?,
                    address: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(agencies)
    }
}
