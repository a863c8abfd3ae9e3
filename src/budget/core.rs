//! The monthly budget model and its database functions.

use rusqlite::{Connection, OptionalExtension, Row, params};
use time::Month;

use crate::{Error, database_id::DatabaseId};

// ============================================================================
// MODELS
// ============================================================================

/// Database identifier for a budget.
pub type BudgetId = DatabaseId;

/// A spending cap for one calendar month. At most one budget exists per
/// month.
#[derive(Debug, Clone, PartialEq)]
pub struct Budget {
    /// The ID of the budget.
    pub id: BudgetId,
    /// The calendar month the budget applies to.
    pub month: Month,
    /// The calendar year the budget applies to.
    pub year: i32,
    /// The maximum planned spend for the month, in the preferred currency.
    pub max_spending: f64,
    /// Percentage of `max_spending` (in the range 1 to 100) at which the
    /// budget is shown as running hot.
    pub warning_threshold: Option<f64>,
}

impl Budget {
    /// Create a builder for inserting or updating a budget.
    pub fn build(month: Month, year: i32, max_spending: f64) -> BudgetBuilder {
        BudgetBuilder {
            month,
            year,
            max_spending,
            warning_threshold: None,
        }
    }
}

/// Builder for the optional fields of a budget.
#[derive(Debug, Clone, PartialEq)]
pub struct BudgetBuilder {
    pub(crate) month: Month,
    pub(crate) year: i32,
    pub(crate) max_spending: f64,
    pub(crate) warning_threshold: Option<f64>,
}

impl BudgetBuilder {
    /// Set the warning threshold as a percentage of the maximum spend.
    pub fn warning_threshold(mut self, warning_threshold: Option<f64>) -> Self {
        self.warning_threshold = warning_threshold;
        self
    }
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Create a budget and return it with its generated ID.
///
/// # Errors
/// This function will return a:
/// - [Error::NonPositiveAmount] if the maximum spend is zero or negative,
/// - [Error::DuplicateBudgetMonth] if a budget already exists for the month,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_budget(builder: BudgetBuilder, connection: &Connection) -> Result<Budget, Error> {
    if builder.max_spending <= 0.0 {
        return Err(Error::NonPositiveAmount(builder.max_spending));
    }

    connection
        .prepare(
            "INSERT INTO budget (month, year, max_spending, warning_threshold)
             VALUES (?1, ?2, ?3, ?4)
             RETURNING id, month, year, max_spending, warning_threshold",
        )?
        .query_row(
            params![
                builder.month as u8,
                builder.year,
                builder.max_spending,
                builder.warning_threshold,
            ],
            map_budget_row,
        )
        .map_err(|error| unique_month_error(error, builder.month, builder.year))
}

/// Retrieve a single budget by ID.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if there is no budget with the given ID,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn get_budget(budget_id: BudgetId, connection: &Connection) -> Result<Budget, Error> {
    connection
        .prepare(
            "SELECT id, month, year, max_spending, warning_threshold
             FROM budget WHERE id = :id",
        )?
        .query_row(&[(":id", &budget_id)], map_budget_row)
        .map_err(|error| error.into())
}

/// Retrieve the budget for a calendar month, if one has been set.
///
/// # Errors
/// This function will return an [Error::SqlError] if there is an SQL error.
pub fn get_budget_for_month(
    month: Month,
    year: i32,
    connection: &Connection,
) -> Result<Option<Budget>, Error> {
    connection
        .prepare(
            "SELECT id, month, year, max_spending, warning_threshold
             FROM budget WHERE month = ?1 AND year = ?2",
        )?
        .query_row(params![month as u8, year], map_budget_row)
        .optional()
        .map_err(|error| error.into())
}

/// Retrieve all budgets, most recent month first.
///
/// # Errors
/// This function will return an [Error::SqlError] if there is an SQL error.
pub fn get_all_budgets(connection: &Connection) -> Result<Vec<Budget>, Error> {
    connection
        .prepare(
            "SELECT id, month, year, max_spending, warning_threshold
             FROM budget ORDER BY year DESC, month DESC",
        )?
        .query_map((), map_budget_row)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(Error::from)
}

/// Update an existing budget with the fields in `builder`.
///
/// # Errors
/// This function will return a:
/// - [Error::NonPositiveAmount] if the maximum spend is zero or negative,
/// - [Error::DuplicateBudgetMonth] if moving the budget to a month that
///   already has one,
/// - [Error::UpdateMissingBudget] if there is no budget with the given ID,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn update_budget(
    budget_id: BudgetId,
    builder: BudgetBuilder,
    connection: &Connection,
) -> Result<(), Error> {
    if builder.max_spending <= 0.0 {
        return Err(Error::NonPositiveAmount(builder.max_spending));
    }

    let rows_affected = connection
        .execute(
            "UPDATE budget SET month = ?1, year = ?2, max_spending = ?3, warning_threshold = ?4 \
             WHERE id = ?5",
            params![
                builder.month as u8,
                builder.year,
                builder.max_spending,
                builder.warning_threshold,
                budget_id,
            ],
        )
        .map_err(|error| unique_month_error(error, builder.month, builder.year))?;

    if rows_affected == 0 {
        return Err(Error::UpdateMissingBudget);
    }

    Ok(())
}

/// Delete a budget by ID.
///
/// # Errors
/// This function will return a:
/// - [Error::DeleteMissingBudget] if there is no budget with the given ID,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn delete_budget(budget_id: BudgetId, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute("DELETE FROM budget WHERE id = ?1", [budget_id])?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingBudget);
    }

    Ok(())
}

/// Create the budget table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_budget_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS budget (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                month INTEGER NOT NULL,
                year INTEGER NOT NULL,
                max_spending REAL NOT NULL,
                warning_threshold REAL,
                UNIQUE(year, month)
                )",
        (),
    )?;

    // Ensure the sequence starts at 1
    connection.execute(
        "INSERT OR IGNORE INTO sqlite_sequence (name, seq) VALUES ('budget', 0)",
        (),
    )?;

    Ok(())
}

/// Map a database row to a Budget.
pub fn map_budget_row(row: &Row) -> Result<Budget, rusqlite::Error> {
    let id = row.get(0)?;
    let raw_month: u8 = row.get(1)?;
    let month = Month::try_from(raw_month).map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Integer, Box::new(error))
    })?;
    let year = row.get(2)?;
    let max_spending = row.get(3)?;
    let warning_threshold = row.get(4)?;

    Ok(Budget {
        id,
        month,
        year,
        max_spending,
        warning_threshold,
    })
}

/// Map SQLite unique constraint failures on (year, month) to the duplicate
/// budget error.
fn unique_month_error(error: rusqlite::Error, month: Month, year: i32) -> Error {
    match error {
        rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error {
                code: _,
                extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE,
            },
            _,
        ) => Error::DuplicateBudgetMonth { month, year },
        error => error.into(),
    }
}

// ============================================================================
// TESTS
// ============================================================================
