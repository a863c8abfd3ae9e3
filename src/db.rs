//! Database initialization for the application.

use rusqlite::{Connection, Transaction as SqlTransaction, TransactionBehavior};

use crate::{
    Error,
    auth::create_user_table,
    budget::create_budget_table,
    category::create_category_table,
    country::create_country_benchmark_table,
    currency::create_exchange_rate_table,
    recurring::create_recurring_transaction_table,
    transaction::create_transaction_table,
    trip::create_trip_table,
};

/// Create the application's tables if they do not exist yet.
///
/// Tables are created inside a single exclusive transaction so that two
/// connections racing at start-up cannot observe a half-initialized schema.
///
/// # Errors
/// This function will return an [Error::SqlError] if there is an SQL error.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    connection.pragma_update(None, "foreign_keys", "ON")?;

    let transaction = SqlTransaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;

    // Referenced tables must exist before the tables whose foreign keys
    // point at them.
    create_user_table(&transaction)?;
    create_category_table(&transaction)?;
    create_trip_table(&transaction)?;
    create_transaction_table(&transaction)?;
    create_recurring_transaction_table(&transaction)?;
    create_budget_table(&transaction)?;
    create_exchange_rate_table(&transaction)?;
    create_country_benchmark_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}

#[cfg(test)]
mod initialize_tests {
    use rusqlite::Connection;

    use super::initialize;

    #[test]
    fn creates_all_tables() {
        let connection = Connection::open_in_memory().unwrap();

        initialize(&connection).expect("Could not initialize database");

        let mut statement = connection
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
            .unwrap();
        let tables: Vec<String> = statement
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();

        for table in [
            "budget",
            "category",
            "country_benchmark",
            "exchange_rate",
            "recurring_transaction",
            "transaction",
            "trip",
            "user",
        ] {
            assert!(tables.iter().any(|name| name == table), "missing {table}");
        }
    }

    #[test]
    fn is_idempotent() {
        let connection = Connection::open_in_memory().unwrap();

        initialize(&connection).expect("Could not initialize database");
        initialize(&connection).expect("Could not initialize database twice");
    }
}
