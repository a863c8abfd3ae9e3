//! Defines the recurring transaction model and its database queries.

use rusqlite::{Connection, Row, params};
use time::Date;

use crate::{
    Error,
    category::CategoryId,
    currency::CurrencyCode,
    database_id::DatabaseId,
    recurring::{RecurrencePattern, pending_occurrences},
    transaction::{Transaction, TransactionKind, create_transaction},
};

// ============================================================================
// MODELS
// ============================================================================

/// Database identifier for a recurring transaction.
pub type RecurringTransactionId = DatabaseId;

/// A template for transactions that repeat on a schedule, e.g. rent.
///
/// The series itself never spends money; concrete [Transaction]s are
/// materialized from it, either by the user opting into a backfill at
/// creation time or by editing the series.
///
/// To create a new `RecurringTransaction`, use [RecurringTransaction::build].
#[derive(Debug, Clone, PartialEq)]
pub struct RecurringTransaction {
    /// The ID of the recurring transaction.
    pub id: RecurringTransactionId,
    /// Whether the series spends or earns money.
    pub kind: TransactionKind,
    /// The amount of each occurrence, always greater than zero.
    pub amount: f64,
    /// The currency the amount is denominated in.
    pub currency: CurrencyCode,
    /// A text description of what the series is for.
    pub description: String,
    /// The ID of the category occurrences belong to.
    pub category_id: Option<CategoryId>,
    /// How often the series repeats.
    pub pattern: RecurrencePattern,
    /// The date the next occurrence is due, if scheduled.
    pub next_execution: Option<Date>,
    /// The date after which no more occurrences are due.
    pub end_date: Option<Date>,
    /// The maximum number of occurrences before the series expires.
    pub max_occurrences: Option<u32>,
    /// How many occurrences have been materialized so far.
    pub executed_occurrences: u32,
    /// Whether the series is still running.
    pub active: bool,
}

impl RecurringTransaction {
    /// Create a new recurring transaction.
    ///
    /// Shortcut for [RecurringTransactionBuilder] for discoverability.
    pub fn build(
        kind: TransactionKind,
        amount: f64,
        currency: CurrencyCode,
        description: &str,
        pattern: RecurrencePattern,
        next_execution: Option<Date>,
    ) -> RecurringTransactionBuilder {
        RecurringTransactionBuilder {
            kind,
            amount,
            currency,
            description: description.to_owned(),
            category_id: None,
            pattern,
            next_execution,
            end_date: None,
            max_occurrences: None,
        }
    }

    /// Whether the series has run out, either past its end date or at its
    /// maximum occurrence count.
    pub fn is_expired(&self, today: Date) -> bool {
        let past_end = self.end_date.is_some_and(|end| today > end);
        let at_max = self
            .max_occurrences
            .is_some_and(|max| self.executed_occurrences >= max);

        past_end || at_max
    }
}

/// A builder for creating [RecurringTransaction] instances.
#[derive(Debug, PartialEq, Clone)]
pub struct RecurringTransactionBuilder {
    /// Whether the series spends or earns money.
    pub kind: TransactionKind,
    /// The amount of each occurrence, must be greater than zero.
    pub amount: f64,
    /// The currency the amount is denominated in.
    pub currency: CurrencyCode,
    /// A text description of what the series is for.
    pub description: String,
    /// The category occurrences belong to.
    pub category_id: Option<CategoryId>,
    /// How often the series repeats.
    pub pattern: RecurrencePattern,
    /// The date the next occurrence is due.
    pub next_execution: Option<Date>,
    /// The date after which no more occurrences are due.
    pub end_date: Option<Date>,
    /// The maximum number of occurrences before the series expires.
    pub max_occurrences: Option<u32>,
}

impl RecurringTransactionBuilder {
    /// Set the category id for the series.
    pub fn category_id(mut self, category_id: Option<CategoryId>) -> Self {
        self.category_id = category_id;
        self
    }

    /// Set the date after which no more occurrences are due.
    pub fn end_date(mut self, end_date: Option<Date>) -> Self {
        self.end_date = end_date;
        self
    }

    /// Set the maximum number of occurrences.
    pub fn max_occurrences(mut self, max_occurrences: Option<u32>) -> Self {
        self.max_occurrences = max_occurrences;
        self
    }
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Create a new recurring transaction in the database from a builder.
///
/// New series start active with zero executed occurrences.
///
/// # Errors
/// This function will return a:
/// - [Error::NonPositiveAmount] if the amount is zero or negative,
/// - [Error::InvalidCategory] if the category ID does not refer to a real category,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_recurring_transaction(
    builder: RecurringTransactionBuilder,
    connection: &Connection,
) -> Result<RecurringTransaction, Error> {
    if builder.amount <= 0.0 {
        return Err(Error::NonPositiveAmount(builder.amount));
    }

    let category_id = builder.category_id;

    let recurring_transaction = connection
        .prepare(
            "INSERT INTO recurring_transaction \
                (kind, amount, currency, description, category_id, pattern, next_execution, \
                end_date, max_occurrences, executed_occurrences, active)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 0, 1)
             RETURNING id, kind, amount, currency, description, category_id, pattern, \
                next_execution, end_date, max_occurrences, executed_occurrences, active",
        )?
        .query_row(
            params![
                builder.kind.as_str(),
                builder.amount,
                builder.currency.as_ref(),
                builder.description,
                category_id,
                builder.pattern.as_str(),
                builder.next_execution,
                builder.end_date,
                builder.max_occurrences,
            ],
            map_recurring_transaction_row,
        )
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY,
                },
                _,
            ) => Error::InvalidCategory(category_id),
            error => error.into(),
        })?;

    Ok(recurring_transaction)
}

/// Retrieve a recurring transaction from the database by its `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid recurring transaction,
/// - or [Error::SqlError] there is some other SQL error.
pub fn get_recurring_transaction(
    id: RecurringTransactionId,
    connection: &Connection,
) -> Result<RecurringTransaction, Error> {
    let recurring_transaction = connection
        .prepare(
            "SELECT id, kind, amount, currency, description, category_id, pattern, \
                next_execution, end_date, max_occurrences, executed_occurrences, active \
            FROM recurring_transaction WHERE id = :id",
        )?
        .query_one(&[(":id", &id)], map_recurring_transaction_row)?;

    Ok(recurring_transaction)
}

/// Retrieve all recurring transactions, soonest next execution first.
///
/// Series without a next execution date sort last.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is some SQL error.
pub fn get_all_recurring_transactions(
    connection: &Connection,
) -> Result<Vec<RecurringTransaction>, Error> {
    connection
        .prepare(
            "SELECT id, kind, amount, currency, description, category_id, pattern, \
                next_execution, end_date, max_occurrences, executed_occurrences, active \
            FROM recurring_transaction \
            ORDER BY next_execution IS NULL, next_execution ASC, id ASC",
        )?
        .query_map([], map_recurring_transaction_row)?
        .map(|maybe_series| maybe_series.map_err(Error::SqlError))
        .collect()
}

/// Overwrite the editable fields of the recurring transaction `id`.
///
/// The executed occurrence count is not touched; it only changes through
/// [backfill_recurring_transaction].
///
/// # Errors
/// This function will return a:
/// - [Error::NonPositiveAmount] if the amount is zero or negative,
/// - [Error::UpdateMissingRecurringTransaction] if `id` does not refer to a series,
/// - [Error::InvalidCategory] if the category ID does not refer to a real category,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn update_recurring_transaction(
    id: RecurringTransactionId,
    builder: RecurringTransactionBuilder,
    active: bool,
    connection: &Connection,
) -> Result<(), Error> {
    if builder.amount <= 0.0 {
        return Err(Error::NonPositiveAmount(builder.amount));
    }

    let category_id = builder.category_id;

    let rows_affected = connection
        .execute(
            "UPDATE recurring_transaction \
            SET kind = ?1, amount = ?2, currency = ?3, description = ?4, category_id = ?5, \
                pattern = ?6, next_execution = ?7, end_date = ?8, max_occurrences = ?9, \
                active = ?10 \
            WHERE id = ?11;",
            params![
                builder.kind.as_str(),
                builder.amount,
                builder.currency.as_ref(),
                builder.description,
                category_id,
                builder.pattern.as_str(),
                builder.next_execution,
                builder.end_date,
                builder.max_occurrences,
                active,
                id,
            ],
        )
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY,
                },
                _,
            ) => Error::InvalidCategory(category_id),
            error => error.into(),
        })?;

    if rows_affected == 0 {
        return Err(Error::UpdateMissingRecurringTransaction);
    }

    Ok(())
}

/// Delete the recurring transaction `id`.
///
/// Transactions already materialized from the series are kept.
///
/// # Errors
/// This function will return a:
/// - [Error::DeleteMissingRecurringTransaction] if `id` does not refer to a series,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn delete_recurring_transaction(
    id: RecurringTransactionId,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected =
        connection.execute("DELETE FROM recurring_transaction WHERE id = ?1", [id])?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingRecurringTransaction);
    }

    Ok(())
}

/// Materialize one transaction per pending occurrence of `series` and advance
/// its next execution date past `today`.
///
/// Occurrences past the series end date or beyond its maximum occurrence
/// count are not created. Returns the number of transactions created. An
/// expired series is marked inactive.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidCategory] if the series category was deleted concurrently,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn backfill_recurring_transaction(
    series: &RecurringTransaction,
    today: Date,
    connection: &Connection,
) -> Result<u32, Error> {
    let pending = pending_occurrences(series.next_execution, series.pattern, today);

    let Some(mut date) = pending.first else {
        return Ok(0);
    };

    let mut created = 0;

    while date <= today {
        if series.end_date.is_some_and(|end| date > end) {
            break;
        }

        if series
            .max_occurrences
            .is_some_and(|max| series.executed_occurrences + created >= max)
        {
            break;
        }

        create_transaction(
            Transaction::build(
                series.kind,
                series.amount,
                series.currency.clone(),
                date,
                &series.description,
            )
            .category_id(series.category_id),
            connection,
        )?;

        created += 1;
        date = series.pattern.step(date);
    }

    // The loop leaves `date` on the first occurrence after today.
    while date <= today {
        date = series.pattern.step(date);
    }

    let executed_occurrences = series.executed_occurrences + created;
    let expired = series.end_date.is_some_and(|end| date > end)
        || series
            .max_occurrences
            .is_some_and(|max| executed_occurrences >= max);

    connection.execute(
        "UPDATE recurring_transaction \
        SET next_execution = ?1, executed_occurrences = ?2, active = ?3 \
        WHERE id = ?4;",
        params![date, executed_occurrences, !expired, series.id],
    )?;

    Ok(created)
}

/// Create the recurring transaction table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_recurring_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS recurring_transaction (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                kind TEXT NOT NULL,
                amount REAL NOT NULL,
                currency TEXT NOT NULL,
                description TEXT NOT NULL,
                category_id INTEGER,
                pattern TEXT NOT NULL,
                next_execution TEXT,
                end_date TEXT,
                max_occurrences INTEGER,
                executed_occurrences INTEGER NOT NULL DEFAULT 0,
                active INTEGER NOT NULL DEFAULT 1,
                FOREIGN KEY(category_id) REFERENCES category(id) ON UPDATE CASCADE ON DELETE SET NULL
                )",
        (),
    )?;

    // Ensure the sequence starts at 1
    connection.execute(
        "INSERT OR IGNORE INTO sqlite_sequence (name, seq) VALUES ('recurring_transaction', 0)",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_recurring_next_execution \
        ON recurring_transaction(next_execution);",
        (),
    )?;

    Ok(())
}

/// Map a database row to a RecurringTransaction.
pub fn map_recurring_transaction_row(row: &Row) -> Result<RecurringTransaction, rusqlite::Error> {
    let id = row.get(0)?;
    let raw_kind: String = row.get(1)?;
    let kind = raw_kind.parse().map_err(|error: Error| {
        rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(error))
    })?;
    let amount = row.get(2)?;
    let raw_currency: String = row.get(3)?;
    let currency = CurrencyCode::new_unchecked(&raw_currency);
    let description = row.get(4)?;
    let category_id = row.get(5)?;
    let raw_pattern: String = row.get(6)?;
    let pattern = raw_pattern.parse().map_err(|error: Error| {
        rusqlite::Error::FromSqlConversionFailure(6, rusqlite::types::Type::Text, Box::new(error))
    })?;
    let next_execution = row.get(7)?;
    let end_date = row.get(8)?;
    let max_occurrences = row.get(9)?;
    let executed_occurrences = row.get(10)?;
    let active = row.get(11)?;

    Ok(RecurringTransaction {
        id,
        kind,
        amount,
        currency,
        description,
        category_id,
        pattern,
        next_execution,
        end_date,
        max_occurrences,
        executed_occurrences,
        active,
    })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod database_tests {
    use rusqlite::Connection;
    use time::macros::date;

    use crate::{
        Error,
        currency::CurrencyCode,
        db::initialize,
        recurring::{
            RecurrencePattern, RecurringTransaction, create_recurring_transaction,
            delete_recurring_transaction, get_all_recurring_transactions,
            get_recurring_transaction, update_recurring_transaction,
        },
        transaction::TransactionKind,
    };

    fn get_test_connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        conn
    }

    fn eur() -> CurrencyCode {
        CurrencyCode::new_unchecked("EUR")
    }

    #[test]
    fn create_succeeds_with_defaults() {
        let conn = get_test_connection();

        let series = create_recurring_transaction(
            RecurringTransaction::build(
                TransactionKind::Expense,
                650.0,
                eur(),
                "Rent",
                RecurrencePattern::Monthly,
                Some(date!(2025 - 11 - 01)),
            ),
            &conn,
        )
        .expect("Could not create recurring transaction");

        assert!(series.id > 0);
        assert_eq!(series.executed_occurrences, 0);
        assert!(series.active);
        assert_eq!(series.next_execution, Some(date!(2025 - 11 - 01)));
    }

    #[test]
    fn create_fails_on_invalid_category_id() {
        let conn = get_test_connection();
        let category_id = Some(42);

        let result = create_recurring_transaction(
            RecurringTransaction::build(
                TransactionKind::Expense,
                650.0,
                eur(),
                "Rent",
                RecurrencePattern::Monthly,
                Some(date!(2025 - 11 - 01)),
            )
            .category_id(category_id),
            &conn,
        );

        assert_eq!(result, Err(Error::InvalidCategory(category_id)));
    }

    #[test]
    fn get_recurring_transaction_round_trips() {
        let conn = get_test_connection();
        let inserted = create_recurring_transaction(
            RecurringTransaction::build(
                TransactionKind::Income,
                1200.0,
                CurrencyCode::new_unchecked("NZD"),
                "Stipend",
                RecurrencePattern::Monthly,
                Some(date!(2025 - 11 - 15)),
            )
            .end_date(Some(date!(2026 - 06 - 15)))
            .max_occurrences(Some(8)),
            &conn,
        )
        .expect("Could not create recurring transaction");

        let got = get_recurring_transaction(inserted.id, &conn)
            .expect("Could not get recurring transaction");

        assert_eq!(inserted, got);
    }

    #[test]
    fn get_all_orders_by_next_execution() {
        let conn = get_test_connection();
        let later = create_recurring_transaction(
            RecurringTransaction::build(
                TransactionKind::Expense,
                30.0,
                eur(),
                "Gym",
                RecurrencePattern::Monthly,
                Some(date!(2025 - 12 - 01)),
            ),
            &conn,
        )
        .unwrap();
        let unscheduled = create_recurring_transaction(
            RecurringTransaction::build(
                TransactionKind::Expense,
                9.99,
                eur(),
                "Paused subscription",
                RecurrencePattern::Monthly,
                None,
            ),
            &conn,
        )
        .unwrap();
        let sooner = create_recurring_transaction(
            RecurringTransaction::build(
                TransactionKind::Expense,
                650.0,
                eur(),
                "Rent",
                RecurrencePattern::Monthly,
                Some(date!(2025 - 11 - 01)),
            ),
            &conn,
        )
        .unwrap();

        let got = get_all_recurring_transactions(&conn).expect("Could not list series");

        assert_eq!(got, vec![sooner, later, unscheduled]);
    }

    #[test]
    fn update_recurring_transaction_succeeds() {
        let conn = get_test_connection();
        let inserted = create_recurring_transaction(
            RecurringTransaction::build(
                TransactionKind::Expense,
                650.0,
                eur(),
                "Rent",
                RecurrencePattern::Monthly,
                Some(date!(2025 - 11 - 01)),
            ),
            &conn,
        )
        .unwrap();

        update_recurring_transaction(
            inserted.id,
            RecurringTransaction::build(
                TransactionKind::Expense,
                700.0,
                eur(),
                "Rent (increased)",
                RecurrencePattern::Monthly,
                Some(date!(2025 - 12 - 01)),
            ),
            false,
            &conn,
        )
        .expect("Could not update recurring transaction");

        let got = get_recurring_transaction(inserted.id, &conn).unwrap();
        assert_eq!(got.amount, 700.0);
        assert_eq!(got.description, "Rent (increased)");
        assert_eq!(got.next_execution, Some(date!(2025 - 12 - 01)));
        assert!(!got.active);
    }

    #[test]
    fn update_recurring_transaction_fails_on_invalid_id() {
        let conn = get_test_connection();

        let result = update_recurring_transaction(
            999,
            RecurringTransaction::build(
                TransactionKind::Expense,
                1.0,
                eur(),
                "",
                RecurrencePattern::Daily,
                None,
            ),
            true,
            &conn,
        );

        assert_eq!(result, Err(Error::UpdateMissingRecurringTransaction));
    }

    #[test]
    fn delete_recurring_transaction_succeeds() {
        let conn = get_test_connection();
        let inserted = create_recurring_transaction(
            RecurringTransaction::build(
                TransactionKind::Expense,
                650.0,
                eur(),
                "Rent",
                RecurrencePattern::Monthly,
                Some(date!(2025 - 11 - 01)),
            ),
            &conn,
        )
        .unwrap();

        delete_recurring_transaction(inserted.id, &conn)
            .expect("Could not delete recurring transaction");

        assert_eq!(
            get_recurring_transaction(inserted.id, &conn),
            Err(Error::NotFound)
        );
    }

    #[test]
    fn delete_recurring_transaction_fails_on_invalid_id() {
        let conn = get_test_connection();

        let result = delete_recurring_transaction(999, &conn);

        assert_eq!(result, Err(Error::DeleteMissingRecurringTransaction));
    }
}

#[cfg(test)]
mod backfill_tests {
    use rusqlite::Connection;
    use time::macros::date;

    use crate::{
        currency::CurrencyCode,
        db::initialize,
        recurring::{
            RecurrencePattern, RecurringTransaction, backfill_recurring_transaction,
            create_recurring_transaction, get_recurring_transaction,
        },
        transaction::{TransactionKind, count_transactions, get_transactions_in_range},
    };

    fn get_test_connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        conn
    }

    fn eur() -> CurrencyCode {
        CurrencyCode::new_unchecked("EUR")
    }

    #[test]
    fn backfill_materializes_each_pending_occurrence() {
        let conn = get_test_connection();
        let today = date!(2024 - 04 - 10);
        let series = create_recurring_transaction(
            RecurringTransaction::build(
                TransactionKind::Expense,
                650.0,
                eur(),
                "Rent",
                RecurrencePattern::Monthly,
                Some(date!(2024 - 01 - 15)),
            ),
            &conn,
        )
        .unwrap();

        let created =
            backfill_recurring_transaction(&series, today, &conn).expect("Could not backfill");

        assert_eq!(created, 3);

        let transactions =
            get_transactions_in_range(date!(2024 - 01 - 01), today, &conn).unwrap();
        let dates: Vec<_> = transactions
            .iter()
            .map(|transaction| transaction.date)
            .collect();
        assert_eq!(
            dates,
            vec![date!(2024 - 03 - 15), date!(2024 - 02 - 15), date!(2024 - 01 - 15)]
        );
        for transaction in &transactions {
            assert_eq!(transaction.amount, 650.0);
            assert_eq!(transaction.description, "Rent");
        }

        let updated = get_recurring_transaction(series.id, &conn).unwrap();
        assert_eq!(updated.executed_occurrences, 3);
        assert_eq!(updated.next_execution, Some(date!(2024 - 04 - 15)));
        assert!(updated.active);
    }

    #[test]
    fn backfill_with_no_pending_occurrences_is_a_no_op() {
        let conn = get_test_connection();
        let today = date!(2024 - 04 - 10);
        let series = create_recurring_transaction(
            RecurringTransaction::build(
                TransactionKind::Expense,
                650.0,
                eur(),
                "Rent",
                RecurrencePattern::Monthly,
                Some(date!(2024 - 05 - 01)),
            ),
            &conn,
        )
        .unwrap();

        let created =
            backfill_recurring_transaction(&series, today, &conn).expect("Could not backfill");

        assert_eq!(created, 0);
        assert_eq!(count_transactions(&conn).unwrap(), 0);
    }

    #[test]
    fn backfill_stops_at_end_date() {
        let conn = get_test_connection();
        let today = date!(2024 - 04 - 10);
        let series = create_recurring_transaction(
            RecurringTransaction::build(
                TransactionKind::Expense,
                650.0,
                eur(),
                "Rent",
                RecurrencePattern::Monthly,
                Some(date!(2024 - 01 - 15)),
            )
            .end_date(Some(date!(2024 - 02 - 29))),
            &conn,
        )
        .unwrap();

        let created =
            backfill_recurring_transaction(&series, today, &conn).expect("Could not backfill");

        assert_eq!(created, 2);

        let updated = get_recurring_transaction(series.id, &conn).unwrap();
        assert!(!updated.active, "series past its end date should deactivate");
    }

    #[test]
    fn backfill_stops_at_max_occurrences() {
        let conn = get_test_connection();
        let today = date!(2024 - 04 - 10);
        let series = create_recurring_transaction(
            RecurringTransaction::build(
                TransactionKind::Expense,
                15.0,
                eur(),
                "Language class",
                RecurrencePattern::Weekly,
                Some(date!(2024 - 03 - 01)),
            )
            .max_occurrences(Some(3)),
            &conn,
        )
        .unwrap();

        let created =
            backfill_recurring_transaction(&series, today, &conn).expect("Could not backfill");

        assert_eq!(created, 3);

        let updated = get_recurring_transaction(series.id, &conn).unwrap();
        assert_eq!(updated.executed_occurrences, 3);
        assert!(!updated.active, "series at max occurrences should deactivate");
    }
}
