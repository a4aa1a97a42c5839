use std::time;

use jsonwebtoken as jwt;
use rand::{thread_rng, Rng};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Salted Argon2 hash in the PHC encoded form, so the salt and
/// parameters travel with the hash.
pub fn encode_password(pass : &[u8]) -> Result<String> {
    let mut salt = [0; 32];
    thread_rng().fill(&mut salt);

    Ok(argon2::hash_encoded(pass, &salt, &Default::default())?)
}

pub fn verify_password(encoded : &str, pass : &[u8]) -> Result<bool> {
    Ok(argon2::verify_encoded(encoded, pass)?)
}

/// Claims carried by the session cookie.
#[derive(Debug, PartialEq)]
pub struct Token {
    pub iss : String,
    pub sub : String,
}

#[derive(Serialize, Deserialize)]
struct TokenFull {
    iss : String,
    sub : String,
    iat : u64,
    exp : u64,
}

impl Token {
    pub fn issue(
        &self,
        secret : &[u8],
        exp_duration : time::Duration,
    ) -> Result<String> {
        let now = time::SystemTime::now();

        let iat = now.duration_since(time::UNIX_EPOCH)?.as_secs();

        let exp = now
            .checked_add(exp_duration)
            .ok_or(Error::TokenDurationTooBig)?
            .duration_since(time::UNIX_EPOCH)?
            .as_secs();

        let tok = TokenFull {
            iss : self.iss.clone(),
            sub : self.sub.clone(),
            iat,
            exp,
        };

        Ok(jwt::encode(
            &jwt::Header::default(),
            &tok,
            &jwt::EncodingKey::from_secret(secret),
        )?)
    }

    pub fn validate(token : &str, secret : &[u8], iss : &str) -> Result<Self> {
        let mut validation = jwt::Validation::new(jwt::Algorithm::HS256);
        validation.set_issuer(&[iss]);

        let tok : TokenFull = jwt::decode(
            token,
            &jwt::DecodingKey::from_secret(secret),
            &validation,
        )?
        .claims;

        Ok(Self {
            iss : tok.iss,
            sub : tok.sub,
        })
    }
}
