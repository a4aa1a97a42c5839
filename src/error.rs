use std::sync::Mutex;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Please fill in all fields!")]
    MissingField,
    #[error("Please enter a valid email address!")]
    InvalidEmail,
    #[error("Password must be at least 6 characters long!")]
    WeakPassword,
    #[error("Passwords do not match!")]
    PasswordMismatch,
    #[error("Email already exists!")]
    DuplicateEmail,
    #[error("Invalid email or password!")]
    FailedLogin,
    #[error("Link not found.")]
    LinkNotFound(u32),
    #[error("user {0} not found")]
    UserIdNotFound(u32),
    #[error("session duration too large")]
    TokenDurationTooBig,
    #[error("not logged in")]
    Unauthenticated,
    #[error("bad request")]
    BadRequest,
    #[error("route not found")]
    RouteNotFound,
    #[error("internal error")]
    Internal,

    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("time: {0}")]
    Time(#[from] std::time::SystemTimeError),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("config: {0}")]
    Config(#[from] toml::de::Error),
    #[error("template: {0}")]
    Template(#[from] handlebars::TemplateError),
    #[error("render: {0}")]
    Render(#[from] handlebars::RenderError),
    #[error("token: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
    #[error("password hash: {0}")]
    Password(#[from] argon2::Error),
}

impl Error {
    /// Errors whose message is meant to be shown to the person filling in
    /// the form. Everything else is reported generically.
    pub fn is_user_facing(&self) -> bool {
        use Error::*;
        matches!(
            self,
            MissingField
                | InvalidEmail
                | WeakPassword
                | PasswordMismatch
                | DuplicateEmail
                | FailedLogin
                | LinkNotFound(_)
        )
    }

    pub fn user_message(&self) -> String {
        if self.is_user_facing() {
            self.to_string()
        } else {
            log::error!("{}", self);
            "Something went wrong, please try again.".to_string()
        }
    }
}

/// Lets an `Error` travel through a warp rejection and be taken back out
/// by value when the response is built.
#[derive(Debug)]
pub struct ErrorCell(Mutex<Option<Error>>);

impl ErrorCell {
    pub fn new(err : Error) -> Self {
        ErrorCell(Mutex::new(Some(err)))
    }

    pub fn take(&self) -> Option<Error> {
        self.0.lock().ok().and_then(|mut err| err.take())
    }
}
