//! The trip model and its database functions.

use rusqlite::{Connection, Row, params};
use time::Date;

use crate::{Error, currency::CurrencyCode, database_id::DatabaseId};

// ============================================================================
// MODELS
// ============================================================================

/// Database identifier for a trip.
pub type TripId = DatabaseId;

/// A trip groups transactions for a stay abroad and tracks spending against
/// an optional budget.
#[derive(Debug, Clone, PartialEq)]
pub struct Trip {
    /// The ID of the trip.
    pub id: TripId,
    /// A short name for the trip, e.g. "Semester in Prague".
    pub name: String,
    /// Where the trip goes, e.g. "Prague, Czech Republic".
    pub destination: String,
    /// The first day of the trip.
    pub start_date: Date,
    /// The last day of the trip. Never before `start_date`.
    pub end_date: Date,
    /// How much the user plans to spend over the whole trip.
    pub estimated_budget: Option<f64>,
    /// The currency the trip is budgeted in. Totals on the detail page are
    /// converted into this currency.
    pub currency: CurrencyCode,
    /// Free-form notes.
    pub notes: Option<String>,
}

impl Trip {
    /// Create a builder for inserting or updating a trip.
    pub fn build(
        name: &str,
        destination: &str,
        start_date: Date,
        end_date: Date,
        currency: CurrencyCode,
    ) -> TripBuilder {
        TripBuilder {
            name: name.to_owned(),
            destination: destination.to_owned(),
            start_date,
            end_date,
            estimated_budget: None,
            currency,
            notes: None,
        }
    }
}

/// Builder for the optional fields of a trip.
#[derive(Debug, Clone, PartialEq)]
pub struct TripBuilder {
    pub(crate) name: String,
    pub(crate) destination: String,
    pub(crate) start_date: Date,
    pub(crate) end_date: Date,
    pub(crate) estimated_budget: Option<f64>,
    pub(crate) currency: CurrencyCode,
    pub(crate) notes: Option<String>,
}

impl TripBuilder {
    /// Set the estimated budget for the trip.
    pub fn estimated_budget(mut self, estimated_budget: Option<f64>) -> Self {
        self.estimated_budget = estimated_budget;
        self
    }

    /// Set the free-form notes for the trip.
    pub fn notes(mut self, notes: Option<String>) -> Self {
        self.notes = notes;
        self
    }
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Create a trip and return it with its generated ID.
///
/// # Errors
/// This function will return a:
/// - [Error::TripEndsBeforeStart] if the end date precedes the start date,
/// - or [Error::SqlError] if there is an SQL error.
pub fn create_trip(builder: TripBuilder, connection: &Connection) -> Result<Trip, Error> {
    if builder.end_date < builder.start_date {
        return Err(Error::TripEndsBeforeStart(
            builder.start_date,
            builder.end_date,
        ));
    }

    let trip = connection
        .prepare(
            "INSERT INTO trip (name, destination, start_date, end_date, estimated_budget, \
             currency, notes)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             RETURNING id, name, destination, start_date, end_date, estimated_budget, currency, \
             notes",
        )?
        .query_row(
            params![
                builder.name,
                builder.destination,
                builder.start_date,
                builder.end_date,
                builder.estimated_budget,
                builder.currency.as_ref(),
                builder.notes,
            ],
            map_trip_row,
        )?;

    Ok(trip)
}

/// Retrieve a single trip by ID.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if there is no trip with the given ID,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn get_trip(trip_id: TripId, connection: &Connection) -> Result<Trip, Error> {
    connection
        .prepare(
            "SELECT id, name, destination, start_date, end_date, estimated_budget, currency, \
             notes
             FROM trip WHERE id = :id",
        )?
        .query_row(&[(":id", &trip_id)], map_trip_row)
        .map_err(|error| error.into())
}

/// Retrieve all trips, most recently started first.
///
/// # Errors
/// This function will return an [Error::SqlError] if there is an SQL error.
pub fn get_all_trips(connection: &Connection) -> Result<Vec<Trip>, Error> {
    connection
        .prepare(
            "SELECT id, name, destination, start_date, end_date, estimated_budget, currency, \
             notes
             FROM trip ORDER BY start_date DESC, id ASC",
        )?
        .query_map((), map_trip_row)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(Error::from)
}

/// Update an existing trip with the fields in `builder`.
///
/// # Errors
/// This function will return a:
/// - [Error::TripEndsBeforeStart] if the end date precedes the start date,
/// - [Error::UpdateMissingTrip] if there is no trip with the given ID,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn update_trip(
    trip_id: TripId,
    builder: TripBuilder,
    connection: &Connection,
) -> Result<(), Error> {
    if builder.end_date < builder.start_date {
        return Err(Error::TripEndsBeforeStart(
            builder.start_date,
            builder.end_date,
        ));
    }

    let rows_affected = connection.execute(
        "UPDATE trip SET name = ?1, destination = ?2, start_date = ?3, end_date = ?4, \
         estimated_budget = ?5, currency = ?6, notes = ?7 WHERE id = ?8",
        params![
            builder.name,
            builder.destination,
            builder.start_date,
            builder.end_date,
            builder.estimated_budget,
            builder.currency.as_ref(),
            builder.notes,
            trip_id,
        ],
    )?;

    if rows_affected == 0 {
        return Err(Error::UpdateMissingTrip);
    }

    Ok(())
}

/// Delete a trip by ID. Transactions assigned to the trip are kept, their
/// trip reference is cleared by the foreign key.
///
/// # Errors
/// This function will return a:
/// - [Error::DeleteMissingTrip] if there is no trip with the given ID,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn delete_trip(trip_id: TripId, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute("DELETE FROM trip WHERE id = ?1", [trip_id])?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingTrip);
    }

    Ok(())
}

/// Create the trip table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_trip_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS trip (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                destination TEXT NOT NULL,
                start_date TEXT NOT NULL,
                end_date TEXT NOT NULL,
                estimated_budget REAL,
                currency TEXT NOT NULL,
                notes TEXT
                )",
        (),
    )?;

    // Ensure the sequence starts at 1
    connection.execute(
        "INSERT OR IGNORE INTO sqlite_sequence (name, seq) VALUES ('trip', 0)",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_trip_start_date ON trip(start_date)",
        (),
    )?;

    Ok(())
}

/// Map a database row to a Trip.
pub fn map_trip_row(row: &Row) -> Result<Trip, rusqlite::Error> {
    let id = row.get(0)?;
    let name = row.get(1)?;
    let destination = row.get(2)?;
    let start_date = row.get(3)?;
    let end_date = row.get(4)?;
    let estimated_budget = row.get(5)?;
    let currency: String = row.get(6)?;
    let notes = row.get(7)?;

    Ok(Trip {
        id,
        name,
        destination,
        start_date,
        end_date,
        estimated_budget,
        currency: CurrencyCode::new_unchecked(&currency),
        notes,
    })
}

// ============================================================================
// TESTS
// ============================================================================
