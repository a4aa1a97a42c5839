//! Form bodies posted by the pages, and the checks that run on them
//! before anything reaches the store.

use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;

use crate::{Error, Result};

pub const MIN_PASSWORD_LEN : usize = 6;

lazy_static! {
    static ref EMAIL : Regex =
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
            .unwrap();
}

pub fn valid_email(email : &str) -> bool {
    EMAIL.is_match(email)
}

fn require<S : AsRef<str>>(fields : &[S]) -> Result<()> {
    if fields.iter().any(|f| f.as_ref().trim().is_empty()) {
        return Err(Error::MissingField);
    }
    Ok(())
}

/// Passwords are taken as typed; only an empty one is missing.
fn require_secret<S : AsRef<str>>(fields : &[S]) -> Result<()> {
    if fields.iter().any(|f| f.as_ref().is_empty()) {
        return Err(Error::MissingField);
    }
    Ok(())
}

/// Prefixes `https://` unless the address already names http(s).
pub fn normalize_url(url : &str) -> String {
    let url = url.trim();
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("https://{}", url)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RegisterForm {
    pub name :             String,
    pub email :            String,
    pub password :         String,
    pub confirm_password : String,
}

impl RegisterForm {
    pub fn validate(&self) -> Result<()> {
        require(&[&self.name, &self.email])?;
        require_secret(&[&self.password, &self.confirm_password])?;

        if !valid_email(self.email.trim()) {
            return Err(Error::InvalidEmail);
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(Error::WeakPassword);
        }
        if self.password != self.confirm_password {
            return Err(Error::PasswordMismatch);
        }

        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub email :    String,
    pub password : String,
}

impl LoginForm {
    pub fn validate(&self) -> Result<()> {
        require(&[&self.email])?;
        require_secret(&[&self.password])
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LinkForm {
    /// Only present on the manage page's edit form.
    pub link_id :     Option<u32>,
    pub name :        String,
    pub url :         String,
    pub description : String,
}

impl LinkForm {
    pub fn validate(&self) -> Result<()> {
        require(&[&self.name, &self.url])
    }

    pub fn name(&self) -> &str {
        self.name.trim()
    }

    pub fn url(&self) -> String {
        normalize_url(&self.url)
    }

    pub fn description(&self) -> Option<&str> {
        Some(self.description.trim()).filter(|d| !d.is_empty())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DeleteForm {
    pub link_id : Option<u32>,
}
