use log::info;

use crate::{db, errors::MyError, models::User, PGPool};

const ACCESS_KEY_LEN: usize = 32;

/// Cheap shape check before a key reaches the database.
pub fn is_well_formed(access_key: &str) -> bool {
    access_key.len() == ACCESS_KEY_LEN && access_key.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Resolves an access key to an active participant.
pub async fn authenticate(access_key: &str, pool: &PGPool) -> Result<User, MyError> {
    let access_key = access_key.trim().to_lowercase();
    if !is_well_formed(&access_key) {
        return Err(MyError::AuthError);
    }
    match db::user::get_by_access_key(&access_key, pool).await {
        Ok(user) => {
            info!("portal login of {}", user.email);
            Ok(user)
        }
        Err(sqlx::Error::RowNotFound) => Err(MyError::AuthError),
        Err(err) => Err(err.into()),
    }
}
