//! Code for creating the user table and fetching users from the database.
//!
//! The user row also carries the profile settings (preferred display
//! currency, home country and the consent flag for the anonymised country
//! comparison). The app is single user, so these live on the user row
//! instead of a separate settings table.

use std::fmt::Display;

use rusqlite::{Connection, Row, params};
use serde::{Deserialize, Serialize};

use crate::{Error, auth::PasswordHash, currency::CurrencyCode};

/// A newtype wrapper for integer user IDs.
///
/// This helps disambiguate user IDs from other types of IDs, leading to better compile time
/// errors, and more flexible generics that can have distinct implementations for multiple ID types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct UserId(i64);

impl UserId {
    /// Create a new user ID.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Cast the user ID to a 64 bit integer.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A user of the application.
///
/// The caller should ensure that `id` is unique.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// The user's ID in the application database.
    pub id: UserId,
    /// The user's password hash.
    pub password_hash: PasswordHash,
    /// The currency that amounts on the dashboard and budget pages are
    /// displayed in.
    pub preferred_currency: CurrencyCode,
    /// The country the user considers home, used for the country comparison.
    pub home_country: Option<String>,
    /// Whether the user has consented to comparing their spending against the
    /// anonymised country benchmarks.
    pub data_sharing_consent: bool,
}

// ===== DATABASE FUNCTIONS =====

/// Create the user table.
///
/// # Errors
///
/// This function will return an error if the SQL query failed.
pub fn create_user_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS user (
                id INTEGER PRIMARY KEY,
                password TEXT NOT NULL,
                preferred_currency TEXT NOT NULL DEFAULT 'EUR',
                home_country TEXT,
                data_sharing_consent INTEGER NOT NULL DEFAULT 0
                )",
        (),
    )?;

    Ok(())
}

/// Create and insert a new user into the database.
///
/// The profile settings start at their defaults (EUR, no home country, no
/// consent) and can be changed on the profile page.
///
/// # Errors
///
/// Returns a [Error::SqlError] if an SQL related error occurred.
pub fn create_user(password_hash: PasswordHash, connection: &Connection) -> Result<User, Error> {
    connection.execute(
        "INSERT INTO user (password) VALUES (?1)",
        (password_hash.to_string(),),
    )?;

    let id = UserId::new(connection.last_insert_rowid());

    Ok(User {
        id,
        password_hash,
        preferred_currency: CurrencyCode::eur(),
        home_country: None,
        data_sharing_consent: false,
    })
}

/// Get the user from the database with an ID equal to `user_id`.
///
/// # Errors
///
/// This function will return an error if:
/// - `user_id` does not belong to a registered user.
/// - there was an error trying to access the store.
pub fn get_user_by_id(user_id: UserId, db_connection: &Connection) -> Result<User, Error> {
    db_connection
        .prepare(
            "SELECT id, password, preferred_currency, home_country, data_sharing_consent
            FROM user
            WHERE id = :id",
        )?
        .query_row(&[(":id", &user_id.as_i64())], map_user_row)
        .map_err(|error| error.into())
}

/// Get the number of users in the database.
///
/// # Errors
///
/// Returns a [Error::SqlError] if an SQL related error occurred.
pub fn count_users(connection: &Connection) -> Result<usize, Error> {
    connection
        .query_row("SELECT COUNT(id) FROM user;", [], |row| {
            row.get(0).map(|count: i64| count as usize)
        })
        .map_err(|error| error.into())
}

/// Update the profile settings of the user with `user_id`.
///
/// # Errors
///
/// This function will return an error if:
/// - `user_id` does not belong to a registered user.
/// - there was an error trying to access the store.
pub fn update_profile(
    user_id: UserId,
    preferred_currency: &CurrencyCode,
    home_country: Option<&str>,
    data_sharing_consent: bool,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE user
        SET preferred_currency = ?1, home_country = ?2, data_sharing_consent = ?3
        WHERE id = ?4",
        params![
            preferred_currency.as_ref(),
            home_country,
            data_sharing_consent,
            user_id.as_i64(),
        ],
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

/// Replace the password hash of the user with `user_id`.
///
/// # Errors
///
/// This function will return an error if:
/// - `user_id` does not belong to a registered user.
/// - there was an error trying to access the store.
pub fn update_password(
    user_id: UserId,
    password_hash: &PasswordHash,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE user SET password = ?1 WHERE id = ?2",
        params![password_hash.to_string(), user_id.as_i64()],
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

fn map_user_row(row: &Row) -> Result<User, rusqlite::Error> {
    let raw_id = row.get(0)?;
    let raw_password_hash: String = row.get(1)?;
    let raw_currency: String = row.get(2)?;
    let home_country: Option<String> = row.get(3)?;
    let data_sharing_consent: bool = row.get(4)?;

    Ok(User {
        id: UserId::new(raw_id),
        password_hash: PasswordHash::new_unchecked(&raw_password_hash),
        preferred_currency: CurrencyCode::new_unchecked(&raw_currency),
        home_country,
        data_sharing_consent,
    })
}

// ===== TESTS =====
