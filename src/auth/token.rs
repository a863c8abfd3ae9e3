//! The session token stored inside the private auth cookie.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::auth::UserId;

/// Proof of a logged-in session, serialized into the auth cookie as JSON.
///
/// The expiry is stored as a unix timestamp so the cookie stays compact and
/// does not depend on a datetime string format. Sub-second precision is lost,
/// which does not matter for expiry checks on the scale of minutes to days.
#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct Token {
    pub user_id: UserId,

    #[serde(with = "time::serde::timestamp")]
    pub expires_at: OffsetDateTime,
}
