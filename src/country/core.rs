//! The country benchmark model and its database functions.
//!
//! A benchmark is the running average monthly spend per category for one
//! country, built up from the samples users choose to share.

use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::{Error, currency::CurrencyCode, database_id::DatabaseId};

// ============================================================================
// MODELS
// ============================================================================

/// Database identifier for a country benchmark.
pub type CountryBenchmarkId = DatabaseId;

/// The average monthly spend for one category in one country.
#[derive(Debug, Clone, PartialEq)]
pub struct CountryBenchmark {
    /// The ID of the benchmark.
    pub id: CountryBenchmarkId,
    /// The country the benchmark describes, e.g. "Czech Republic".
    pub country: String,
    /// The category label, e.g. "Groceries".
    pub category: String,
    /// The average monthly amount spent on the category.
    pub average_amount: f64,
    /// How many monthly averages have been folded into `average_amount`.
    pub sample_size: u32,
    /// The currency `average_amount` is denominated in.
    pub currency: CurrencyCode,
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Fold one monthly average into the benchmark for `country` and `category`.
///
/// If a benchmark already exists, `sample_average` must be denominated in the
/// benchmark's stored currency; the running average is updated in place and
/// `currency` is ignored. Otherwise a new benchmark is created with a sample
/// size of one.
///
/// # Errors
/// This function will return an [Error::SqlError] if there is an SQL error.
pub fn add_benchmark_sample(
    country: &str,
    category: &str,
    sample_average: f64,
    currency: &CurrencyCode,
    connection: &Connection,
) -> Result<CountryBenchmark, Error> {
    let existing = connection
        .prepare(
            "SELECT id, country, category, average_amount, sample_size, currency
             FROM country_benchmark WHERE country = ?1 AND category = ?2",
        )?
        .query_row(params![country, category], map_country_benchmark_row)
        .optional()?;

    match existing {
        Some(benchmark) => {
            let sample_size = benchmark.sample_size + 1;
            let average_amount = (benchmark.average_amount * benchmark.sample_size as f64
                + sample_average)
                / sample_size as f64;

            connection.execute(
                "UPDATE country_benchmark SET average_amount = ?1, sample_size = ?2 WHERE id = ?3",
                params![average_amount, sample_size, benchmark.id],
            )?;

            Ok(CountryBenchmark {
                average_amount,
                sample_size,
                ..benchmark
            })
        }
        None => connection
            .prepare(
                "INSERT INTO country_benchmark \
                 (country, category, average_amount, sample_size, currency)
                 VALUES (?1, ?2, ?3, 1, ?4)
                 RETURNING id, country, category, average_amount, sample_size, currency",
            )?
            .query_row(
                params![country, category, sample_average, currency.as_ref()],
                map_country_benchmark_row,
            )
            .map_err(|error| error.into()),
    }
}

/// Retrieve all benchmarks for a country, ordered by category.
///
/// # Errors
/// This function will return an [Error::SqlError] if there is an SQL error.
pub fn get_benchmarks_for_country(
    country: &str,
    connection: &Connection,
) -> Result<Vec<CountryBenchmark>, Error> {
    connection
        .prepare(
            "SELECT id, country, category, average_amount, sample_size, currency
             FROM country_benchmark WHERE country = :country ORDER BY category ASC",
        )?
        .query_map(&[(":country", &country)], map_country_benchmark_row)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(Error::from)
}

/// Create the country benchmark table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_country_benchmark_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS country_benchmark (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                country TEXT NOT NULL,
                category TEXT NOT NULL,
                average_amount REAL NOT NULL,
                sample_size INTEGER NOT NULL,
                currency TEXT NOT NULL,
                UNIQUE(country, category)
                )",
        (),
    )?;

    // Ensure the sequence starts at 1
    connection.execute(
        "INSERT OR IGNORE INTO sqlite_sequence (name, seq) VALUES ('country_benchmark', 0)",
        (),
    )?;

    Ok(())
}

/// Map a database row to a CountryBenchmark.
pub fn map_country_benchmark_row(row: &Row) -> Result<CountryBenchmark, rusqlite::Error> {
    let id = row.get(0)?;
    let country = row.get(1)?;
    let category = row.get(2)?;
    let average_amount = row.get(3)?;
    let sample_size = row.get(4)?;
    let raw_currency: String = row.get(5)?;

    Ok(CountryBenchmark {
        id,
        country,
        category,
        average_amount,
        sample_size,
        currency: CurrencyCode::new_unchecked(&raw_currency),
    })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod database_tests {
    use rusqlite::Connection;

    use crate::currency::CurrencyCode;

    use super::{add_benchmark_sample, create_country_benchmark_table, get_benchmarks_for_country};

    fn get_test_db_connection() -> Connection {
        let connection = Connection::open_in_memory().unwrap();
        create_country_benchmark_table(&connection)
            .expect("Could not create country benchmark table");
        connection
    }

    fn eur() -> CurrencyCode {
        CurrencyCode::new_unchecked("EUR")
    }

    #[test]
    fn first_sample_creates_benchmark() {
        let connection = get_test_db_connection();

        let benchmark =
            add_benchmark_sample("Czech Republic", "Groceries", 120.0, &eur(), &connection)
                .expect("Could not add benchmark sample");

        assert!(benchmark.id > 0);
        assert_eq!(benchmark.country, "Czech Republic");
        assert_eq!(benchmark.category, "Groceries");
        assert_eq!(benchmark.average_amount, 120.0);
        assert_eq!(benchmark.sample_size, 1);
        assert_eq!(benchmark.currency, eur());
    }

    #[test]
    fn later_samples_update_the_running_average() {
        let connection = get_test_db_connection();
        add_benchmark_sample("Czech Republic", "Groceries", 120.0, &eur(), &connection).unwrap();

        let benchmark =
            add_benchmark_sample("Czech Republic", "Groceries", 60.0, &eur(), &connection)
                .expect("Could not add benchmark sample");

        assert_eq!(benchmark.average_amount, 90.0);
        assert_eq!(benchmark.sample_size, 2);
    }

    #[test]
    fn samples_for_other_categories_are_kept_apart() {
        let connection = get_test_db_connection();
        add_benchmark_sample("Czech Republic", "Groceries", 120.0, &eur(), &connection).unwrap();
        add_benchmark_sample("Czech Republic", "Rent", 450.0, &eur(), &connection).unwrap();
        add_benchmark_sample("Austria", "Groceries", 200.0, &eur(), &connection).unwrap();

        let benchmarks = get_benchmarks_for_country("Czech Republic", &connection)
            .expect("Could not get benchmarks");

        assert_eq!(benchmarks.len(), 2);
        assert_eq!(benchmarks[0].category, "Groceries");
        assert_eq!(benchmarks[0].sample_size, 1);
        assert_eq!(benchmarks[1].category, "Rent");
    }

    #[test]
    fn unknown_country_has_no_benchmarks() {
        let connection = get_test_db_connection();

        let benchmarks =
            get_benchmarks_for_country("Atlantis", &connection).expect("Could not get benchmarks");

        assert!(benchmarks.is_empty());
    }
}
