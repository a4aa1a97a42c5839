//! Registration and login on top of the `USER` table.

use log::info;

use crate::{crypto, database::Db, forms, models, Error, Result};

/// Creates an account and returns its id. Password strength is the
/// caller's concern; see `forms::RegisterForm`.
pub async fn register(
    db : &Db,
    name : &str,
    email : &str,
    password : &str,
) -> Result<u32> {
    let (name, email) = (name.trim(), email.trim());

    if name.is_empty() || email.is_empty() || password.is_empty() {
        return Err(Error::MissingField);
    }
    if !forms::valid_email(email) {
        return Err(Error::InvalidEmail);
    }

    let hash = tokio::task::block_in_place(|| {
        crypto::encode_password(password.as_bytes())
    })?;

    let id = db.insert_user(name, email, &hash).await?;
    info!("registered user {}", id);

    Ok(id)
}

/// Unknown email and wrong password are indistinguishable to the caller.
pub async fn authenticate(
    db : &Db,
    email : &str,
    password : &str,
) -> Result<models::User> {
    let user = db
        .get_user_by_email(email.trim())
        .await?
        .ok_or(Error::FailedLogin)?;

    let ok = tokio::task::block_in_place(|| {
        crypto::verify_password(&user.password_hash, password.as_bytes())
    })?;

    if !ok {
        return Err(Error::FailedLogin);
    }

    Ok(user)
}
