//! Defines the core data models and database queries for transactions.

use std::{fmt::Display, str::FromStr};

use rusqlite::{Connection, Row, params};
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    Error,
    category::{CategoryId, get_category},
    currency::CurrencyCode,
    database_id::DatabaseId,
    trip::TripId,
};

// ============================================================================
// MODELS
// ============================================================================

/// Database identifier for a transaction.
pub type TransactionId = DatabaseId;

/// Whether a transaction spends or earns money.
///
/// Amounts are stored as positive numbers, the kind carries the sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Money spent.
    Expense,
    /// Money earned.
    Income,
}

impl TransactionKind {
    /// All kinds, in the order they appear in form selects.
    pub const ALL: [TransactionKind; 2] = [TransactionKind::Expense, TransactionKind::Income];

    /// The string stored in the database and used in form values.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Expense => "expense",
            TransactionKind::Income => "income",
        }
    }
}

impl FromStr for TransactionKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "expense" => Ok(TransactionKind::Expense),
            "income" => Ok(TransactionKind::Income),
            other => Err(Error::InvalidTransactionKind(other.to_owned())),
        }
    }
}

impl Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An expense or income, i.e. an event where money was either spent or earned.
///
/// To create a new `Transaction`, use [Transaction::build].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: TransactionId,
    /// Whether the transaction is an expense or income.
    pub kind: TransactionKind,
    /// The amount of money spent or earned, always greater than zero.
    pub amount: f64,
    /// The currency the amount is denominated in.
    pub currency: CurrencyCode,
    /// When the transaction happened.
    pub date: Date,
    /// A text description of what the transaction was for.
    pub description: String,
    /// The ID of the category the transaction belongs to.
    pub category_id: Option<CategoryId>,
    /// The ID of the trip the transaction belongs to.
    pub trip_id: Option<TripId>,
}

impl Transaction {
    /// Create a new transaction.
    ///
    /// Shortcut for [TransactionBuilder] for discoverability.
    pub fn build(
        kind: TransactionKind,
        amount: f64,
        currency: CurrencyCode,
        date: Date,
        description: &str,
    ) -> TransactionBuilder {
        TransactionBuilder {
            kind,
            amount,
            currency,
            date,
            description: description.to_owned(),
            category_id: None,
            trip_id: None,
        }
    }
}

/// A builder for creating [Transaction] instances.
///
/// Fills in the optional category and trip before the transaction is written
/// to the database with [create_transaction].
#[derive(Debug, PartialEq, Clone)]
pub struct TransactionBuilder {
    /// Whether the transaction is an expense or income.
    pub kind: TransactionKind,
    /// The amount of money spent or earned, must be greater than zero.
    pub amount: f64,
    /// The currency the amount is denominated in.
    pub currency: CurrencyCode,
    /// The date when the transaction occurred.
    pub date: Date,
    /// A human-readable description of the transaction.
    pub description: String,
    /// The category of the transaction, e.g. "Groceries", "Transport", "Rent".
    pub category_id: Option<CategoryId>,
    /// The trip the transaction happened on, if any.
    pub trip_id: Option<TripId>,
}

impl TransactionBuilder {
    /// Set the category id for the transaction.
    pub fn category_id(mut self, category_id: Option<CategoryId>) -> Self {
        self.category_id = category_id;
        self
    }

    /// Set the trip id for the transaction.
    pub fn trip_id(mut self, trip_id: Option<TripId>) -> Self {
        self.trip_id = trip_id;
        self
    }
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Create a new transaction in the database from a builder.
///
/// # Errors
/// This function will return a:
/// - [Error::NonPositiveAmount] if the amount is zero or negative,
/// - [Error::InvalidCategory] if the category ID does not refer to a real category,
/// - [Error::InvalidTrip] if the trip ID does not refer to a real trip,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_transaction(
    builder: TransactionBuilder,
    connection: &Connection,
) -> Result<Transaction, Error> {
    if builder.amount <= 0.0 {
        return Err(Error::NonPositiveAmount(builder.amount));
    }

    let category_id = builder.category_id;
    let trip_id = builder.trip_id;

    let transaction = connection
        .prepare(
            "INSERT INTO \"transaction\" (kind, amount, currency, date, description, category_id, trip_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             RETURNING id, kind, amount, currency, date, description, category_id, trip_id",
        )?
        .query_row(
            (
                builder.kind.as_str(),
                builder.amount,
                builder.currency.as_ref(),
                builder.date,
                builder.description,
                category_id,
                trip_id,
            ),
            map_transaction_row,
        )
        .map_err(|error| foreign_key_error(error, category_id, trip_id, connection))?;

    Ok(transaction)
}

/// Retrieve a transaction from the database by its `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid transaction,
/// - or [Error::SqlError] there is some other SQL error.
pub fn get_transaction(id: TransactionId, connection: &Connection) -> Result<Transaction, Error> {
    let transaction = connection
        .prepare(
            "SELECT id, kind, amount, currency, date, description, category_id, trip_id \
            FROM \"transaction\" WHERE id = :id",
        )?
        .query_one(&[(":id", &id)], map_transaction_row)?;

    Ok(transaction)
}

/// Get the total number of transactions in the database.
///
/// # Errors
/// This function will return a [Error::SqlError] there is some SQL error.
pub fn count_transactions(connection: &Connection) -> Result<u32, Error> {
    connection
        .query_row("SELECT COUNT(id) FROM \"transaction\";", [], |row| {
            row.get(0)
        })
        .map_err(|error| error.into())
}

/// Get transactions whose date falls in the inclusive range `start..=end`,
/// newest first.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is some SQL error.
pub fn get_transactions_in_range(
    start: Date,
    end: Date,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    // Sort by date, and then ID to keep transaction order stable after updates
    connection
        .prepare(
            "SELECT id, kind, amount, currency, date, description, category_id, trip_id \
            FROM \"transaction\" \
            WHERE date BETWEEN ?1 AND ?2 \
            ORDER BY date DESC, id ASC",
        )?
        .query_map([start, end], map_transaction_row)?
        .map(|maybe_transaction| maybe_transaction.map_err(Error::SqlError))
        .collect()
}

/// Get all transactions recorded against the trip `trip_id`, oldest first.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is some SQL error.
pub fn get_transactions_for_trip(
    trip_id: TripId,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    connection
        .prepare(
            "SELECT id, kind, amount, currency, date, description, category_id, trip_id \
            FROM \"transaction\" \
            WHERE trip_id = :trip_id \
            ORDER BY date ASC, id ASC",
        )?
        .query_map(&[(":trip_id", &trip_id)], map_transaction_row)?
        .map(|maybe_transaction| maybe_transaction.map_err(Error::SqlError))
        .collect()
}

/// Overwrite the transaction `id` with the fields from `builder`.
///
/// # Errors
/// This function will return a:
/// - [Error::NonPositiveAmount] if the amount is zero or negative,
/// - [Error::UpdateMissingTransaction] if `id` does not refer to a transaction,
/// - [Error::InvalidCategory] if the category ID does not refer to a real category,
/// - [Error::InvalidTrip] if the trip ID does not refer to a real trip,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn update_transaction(
    id: TransactionId,
    builder: TransactionBuilder,
    connection: &Connection,
) -> Result<(), Error> {
    if builder.amount <= 0.0 {
        return Err(Error::NonPositiveAmount(builder.amount));
    }

    let category_id = builder.category_id;
    let trip_id = builder.trip_id;

    let rows_affected = connection
        .execute(
            "UPDATE \"transaction\" \
            SET kind = ?1, amount = ?2, currency = ?3, date = ?4, description = ?5, \
                category_id = ?6, trip_id = ?7 \
            WHERE id = ?8;",
            params![
                builder.kind.as_str(),
                builder.amount,
                builder.currency.as_ref(),
                builder.date,
                builder.description,
                category_id,
                trip_id,
                id,
            ],
        )
        .map_err(|error| foreign_key_error(error, category_id, trip_id, connection))?;

    if rows_affected == 0 {
        return Err(Error::UpdateMissingTransaction);
    }

    Ok(())
}

/// Delete the transaction `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::DeleteMissingTransaction] if `id` does not refer to a transaction,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn delete_transaction(id: TransactionId, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute("DELETE FROM \"transaction\" WHERE id = ?1", [id])?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingTransaction);
    }

    Ok(())
}

/// Create the transaction table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                kind TEXT NOT NULL,
                amount REAL NOT NULL,
                currency TEXT NOT NULL,
                date TEXT NOT NULL,
                description TEXT NOT NULL,
                category_id INTEGER,
                trip_id INTEGER,
                FOREIGN KEY(category_id) REFERENCES category(id) ON UPDATE CASCADE ON DELETE SET NULL,
                FOREIGN KEY(trip_id) REFERENCES trip(id) ON UPDATE CASCADE ON DELETE SET NULL
                )",
        (),
    )?;

    // Ensure the sequence starts at 1
    connection.execute(
        "INSERT OR IGNORE INTO sqlite_sequence (name, seq) VALUES ('transaction', 0)",
        (),
    )?;

    // Add composite index used by dashboard page.
    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_transaction_date_category \
        ON \"transaction\"(date, category_id);",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_transaction_trip ON \"transaction\"(trip_id);",
        (),
    )?;

    Ok(())
}

/// Map a database row to a Transaction.
pub fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    let id = row.get(0)?;
    let raw_kind: String = row.get(1)?;
    let kind = raw_kind.parse().map_err(|error: Error| {
        rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(error))
    })?;
    let amount = row.get(2)?;
    let raw_currency: String = row.get(3)?;
    let currency = CurrencyCode::new_unchecked(&raw_currency);
    let date = row.get(4)?;
    let description = row.get(5)?;
    let category_id = row.get(6)?;
    let trip_id = row.get(7)?;

    Ok(Transaction {
        id,
        kind,
        amount,
        currency,
        date,
        description,
        category_id,
        trip_id,
    })
}

/// Map SQLite foreign key failures to the category or trip error.
///
/// SQLite does not report which foreign key failed, so the category is checked
/// directly to tell the two apart.
fn foreign_key_error(
    error: rusqlite::Error,
    category_id: Option<CategoryId>,
    trip_id: Option<TripId>,
    connection: &Connection,
) -> Error {
    match error {
        rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error {
                code: _,
                extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY,
            },
            _,
        ) => match category_id {
            Some(id) if get_category(id, connection).is_err() => {
                Error::InvalidCategory(category_id)
            }
            _ => Error::InvalidTrip(trip_id),
        },
        error => error.into(),
    }
}

// ============================================================================
// TESTS
// ============================================================================
