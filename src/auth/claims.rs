use serde::{Deserialize, Serialize};

use crate::users::UserView;

/// Session token payload. `user` is the record as it was at login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,       // user ID
    pub iat: usize,     // issued at (unix timestamp)
    pub exp: usize,     // expires at (unix timestamp)
    pub iss: String,    // issuer
    pub aud: String,    // audience
    pub user: UserView, // public user fields
}
