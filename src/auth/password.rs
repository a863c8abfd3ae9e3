//! Password validation and hashing for the app's single user.
//!
//! Registration and the reset_password bin both funnel raw passwords through
//! [ValidatedPassword] before hashing, so weak passwords are rejected with
//! the same feedback everywhere.

use std::fmt::Display;

use bcrypt::BcryptError;
use zxcvbn::{Score, zxcvbn};

use crate::Error;

/// A raw password that has passed the strength check.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedPassword(String);

impl ValidatedPassword {
    /// Check the strength of `raw_password` and wrap it if it is strong
    /// enough.
    ///
    /// # Errors
    /// This function will return an [Error::TooWeak] whose message explains
    /// how to choose a stronger password.
    pub fn new(raw_password: &str) -> Result<Self, Error> {
        let analysis = zxcvbn(raw_password, &[]);

        match analysis.score() {
            Score::Zero | Score::One | Score::Two => {
                let advice = analysis
                    .feedback()
                    .map(|feedback| feedback.to_string())
                    .unwrap_or_else(|| "Choose a longer, less predictable password.".to_owned());

                Err(Error::TooWeak(advice))
            }
            _ => Ok(Self(raw_password.to_owned())),
        }
    }

    /// Wrap `raw_password` without checking its strength.
    ///
    /// Despite the `_unchecked` suffix this is not `unsafe`: a weak password
    /// weakens the account but cannot violate memory safety.
    pub fn new_unchecked(raw_password: &str) -> Self {
        Self(raw_password.to_owned())
    }
}

impl Display for ValidatedPassword {
    // Never echo the raw password, not even in debug logs.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "********")
    }
}

/// A bcrypt hash of the user's password, as stored in the user table.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PasswordHash(String);

impl PasswordHash {
    /// The bcrypt cost used outside of tests.
    ///
    /// Tests pass a cost of 4 instead so that hashing does not dominate
    /// their runtime.
    pub const DEFAULT_COST: u32 = bcrypt::DEFAULT_COST;

    /// Hash a validated password with the given bcrypt `cost`.
    ///
    /// # Errors
    /// This function will return an [Error::HashingError] if bcrypt fails.
    /// The error string is for the server logs, clients should only see a
    /// generic internal error.
    pub fn new(password: ValidatedPassword, cost: u32) -> Result<Self, Error> {
        bcrypt::hash(&password.0, cost)
            .map(Self)
            .map_err(|error| Error::HashingError(error.to_string()))
    }

    /// Wrap an existing hash string, e.g. one read from the database.
    ///
    /// Despite the `_unchecked` suffix this is not `unsafe`: an invalid hash
    /// makes every log-in fail but cannot violate memory safety.
    pub fn new_unchecked(raw_password_hash: &str) -> Self {
        Self(raw_password_hash.to_owned())
    }

    /// Validate and hash a raw password in one step.
    ///
    /// Named instead of implementing `FromStr` to make clear that this hashes
    /// a password rather than parsing an existing hash.
    ///
    /// # Errors
    /// This function will return an [Error::TooWeak] if the password fails
    /// the strength check, or an [Error::HashingError] if bcrypt fails.
    pub fn from_raw_password(raw_password: &str, cost: u32) -> Result<Self, Error> {
        PasswordHash::new(ValidatedPassword::new(raw_password)?, cost)
    }

    /// Whether `raw_password` matches this hash.
    pub fn verify(&self, raw_password: &str) -> Result<bool, BcryptError> {
        bcrypt::verify(raw_password, &self.0)
    }
}

impl Display for PasswordHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod validated_password_tests {
    use crate::{Error, auth::ValidatedPassword};

    #[test]
    fn rejects_empty_password() {
        assert!(matches!(
            ValidatedPassword::new(""),
            Err(Error::TooWeak(_))
        ));
    }

    #[test]
    fn rejects_common_password() {
        assert!(matches!(
            ValidatedPassword::new("password1234"),
            Err(Error::TooWeak(_))
        ));
    }

    #[test]
    fn accepts_long_uncommon_password() {
        assert!(ValidatedPassword::new("semester in prague, two suitcases").is_ok());
    }

    #[test]
    fn display_masks_the_password() {
        let password = ValidatedPassword::new_unchecked("hunter2");

        assert!(!password.to_string().contains("hunter2"));
    }
}
