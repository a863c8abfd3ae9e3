//! Defines the currency code type, the exchange rate store and conversion.

use std::{fmt::Display, str::FromStr};

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{Error, database_id::DatabaseId};

// ============================================================================
// MODELS
// ============================================================================

/// A validated ISO 4217 currency code, e.g. "EUR" or "NZD".
///
/// Codes are stored uppercased, so "eur" and "EUR" are the same code.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CurrencyCode(String);

impl CurrencyCode {
    /// Create a currency code.
    ///
    /// # Errors
    ///
    /// This function will return an [Error::InvalidCurrencyCode] if `code` is
    /// not three ASCII letters.
    pub fn new(code: &str) -> Result<Self, Error> {
        let code = code.trim();

        if code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()) {
            Ok(Self(code.to_ascii_uppercase()))
        } else {
            Err(Error::InvalidCurrencyCode(code.to_owned()))
        }
    }

    /// Create a currency code without validation.
    ///
    /// The caller should ensure that the string is three uppercase ASCII
    /// letters. This function has `_unchecked` in the name but is not
    /// `unsafe`, because violating the invariant causes incorrect behaviour
    /// but does not affect memory safety.
    pub fn new_unchecked(code: &str) -> Self {
        Self(code.to_owned())
    }

    /// The euro, the pivot currency for cross conversions.
    pub fn eur() -> Self {
        Self("EUR".to_owned())
    }
}

impl AsRef<str> for CurrencyCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for CurrencyCode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CurrencyCode::new(s)
    }
}

impl Display for CurrencyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Database identifier for an exchange rate.
pub type ExchangeRateId = i64;

/// A stored quote for converting one unit of `base` into `quote`.
///
/// Only one rate is kept per currency pair; upserting replaces the stored
/// rate and its quote date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeRate {
    /// The ID of the exchange rate.
    pub id: ExchangeRateId,
    /// The currency converted from.
    pub base: CurrencyCode,
    /// The currency converted to.
    pub quote: CurrencyCode,
    /// How many units of `quote` one unit of `base` buys.
    pub rate: f64,
    /// The date the quote was taken.
    pub date: Date,
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Create the exchange rate table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_exchange_rate_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS exchange_rate (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                base TEXT NOT NULL,
                quote TEXT NOT NULL,
                rate REAL NOT NULL,
                date TEXT NOT NULL,
                UNIQUE(base, quote)
                )",
        (),
    )?;

    // Ensure the sequence starts at 1
    connection.execute(
        "INSERT OR IGNORE INTO sqlite_sequence (name, seq) VALUES ('exchange_rate', 0)",
        (),
    )?;

    Ok(())
}

/// Store a rate for a currency pair, replacing any existing rate for the
/// same pair.
///
/// # Errors
/// This function will return an [Error::SqlError] if there is an SQL error.
pub fn upsert_exchange_rate(
    base: &CurrencyCode,
    quote: &CurrencyCode,
    rate: f64,
    date: Date,
    connection: &Connection,
) -> Result<ExchangeRate, Error> {
    let exchange_rate = connection
        .prepare(
            "INSERT INTO exchange_rate (base, quote, rate, date)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(base, quote) DO UPDATE SET rate = excluded.rate, date = excluded.date
             RETURNING id, base, quote, rate, date",
        )?
        .query_row(
            (base.as_ref(), quote.as_ref(), rate, date),
            map_exchange_rate_row,
        )?;

    Ok(exchange_rate)
}

/// Retrieve all stored exchange rates ordered by currency pair.
///
/// # Errors
/// This function will return an [Error::SqlError] if there is an SQL error.
pub fn get_all_exchange_rates(connection: &Connection) -> Result<Vec<ExchangeRate>, Error> {
    connection
        .prepare("SELECT id, base, quote, rate, date FROM exchange_rate ORDER BY base, quote")?
        .query_map((), map_exchange_rate_row)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(Error::from)
}

/// Map a database row to an ExchangeRate.
pub fn map_exchange_rate_row(row: &Row) -> Result<ExchangeRate, rusqlite::Error> {
    let id = row.get(0)?;
    let base: String = row.get(1)?;
    let quote: String = row.get(2)?;
    let rate = row.get(3)?;
    let date = row.get(4)?;

    Ok(ExchangeRate {
        id,
        base: CurrencyCode::new_unchecked(&base),
        quote: CurrencyCode::new_unchecked(&quote),
        rate,
        date,
    })
}

fn get_stored_rate(
    base: &CurrencyCode,
    quote: &CurrencyCode,
    connection: &Connection,
) -> Result<Option<f64>, Error> {
    let mut statement =
        connection.prepare("SELECT rate FROM exchange_rate WHERE base = :base AND quote = :quote")?;
    let mut rows = statement.query(&[(":base", base.as_ref()), (":quote", quote.as_ref())])?;

    match rows.next()? {
        Some(row) => Ok(Some(row.get(0)?)),
        None => Ok(None),
    }
}

/// A rate for the pair itself, or the reciprocal of the reverse pair.
fn direct_or_inverse_rate(
    base: &CurrencyCode,
    quote: &CurrencyCode,
    connection: &Connection,
) -> Result<Option<f64>, Error> {
    if let Some(rate) = get_stored_rate(base, quote, connection)? {
        return Ok(Some(rate));
    }

    if let Some(rate) = get_stored_rate(quote, base, connection)? {
        return Ok(Some(1.0 / rate));
    }

    Ok(None)
}

/// The rate for converting one unit of `base` into `quote`.
///
/// Resolution order: identity for equal currencies, then a stored rate for
/// the pair, then the reciprocal of the reverse pair, then a cross rate
/// through EUR.
///
/// # Errors
/// This function will return a:
/// - [Error::MissingExchangeRate] naming the pair if no resolution succeeds,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn conversion_rate(
    base: &CurrencyCode,
    quote: &CurrencyCode,
    connection: &Connection,
) -> Result<f64, Error> {
    if base == quote {
        return Ok(1.0);
    }

    if let Some(rate) = direct_or_inverse_rate(base, quote, connection)? {
        return Ok(rate);
    }

    let eur = CurrencyCode::eur();
    let base_to_eur = direct_or_inverse_rate(base, &eur, connection)?;
    let eur_to_quote = direct_or_inverse_rate(&eur, quote, connection)?;

    if let (Some(base_to_eur), Some(eur_to_quote)) = (base_to_eur, eur_to_quote) {
        return Ok(base_to_eur * eur_to_quote);
    }

    Err(Error::MissingExchangeRate {
        base: base.to_string(),
        quote: quote.to_string(),
    })
}

/// Convert `amount` from one currency to another using the stored rates.
///
/// # Errors
/// This function will return an [Error::MissingExchangeRate] if no rate can
/// be resolved for the pair, see [conversion_rate].
pub fn convert(
    amount: f64,
    base: &CurrencyCode,
    quote: &CurrencyCode,
    connection: &Connection,
) -> Result<f64, Error> {
    Ok(amount * conversion_rate(base, quote, connection)?)
}

// ============================================================================
// TESTS
// ============================================================================
