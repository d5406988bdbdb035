//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the HomeFinder database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Agencies whose websites are scraped
CREATE TABLE IF NOT EXISTS agencies (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    base_url TEXT NOT NULL,
    phone TEXT,
    email TEXT,
    address TEXT
);

-- Extracted listings, keyed by URL
CREATE TABLE IF NOT EXISTS listings (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL UNIQUE,
    title TEXT NOT NULL,
    agency TEXT NOT NULL,
    description TEXT NOT NULL,
    contract TEXT NOT NULL,
    price REAL NOT NULL,
    city TEXT NOT NULL,
    neighborhood TEXT,
    address TEXT,
    rooms INTEGER,
    bedrooms INTEGER,
    bathrooms INTEGER,
    square_meters INTEGER,
    floor TEXT,
    year_built INTEGER,
    has_elevator INTEGER,
    heating TEXT,
    has_air_conditioning INTEGER,
    has_garage INTEGER,
    is_furnished INTEGER,
    energy_class TEXT,
    energy_consumption REAL,
    features TEXT,
    scrape_date TEXT NOT NULL,
    publication_date TEXT,
    raw_html_file TEXT,
    code TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_listings_agency ON listings(agency);
CREATE INDEX IF NOT EXISTS idx_listings_contract ON listings(contract);
CREATE INDEX IF NOT EXISTS idx_listings_price ON listings(price);
CREATE INDEX IF NOT EXISTS idx_listings_square_meters ON listings(square_meters);

-- Append-only scrape history
CREATE TABLE IF NOT EXISTS scrape_runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_at TEXT NOT NULL,
    source TEXT NOT NULL,
    listings INTEGER NOT NULL,
    duration_seconds REAL NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_scrape_runs_run_at ON scrape_runs(run_at);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
