use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ValueRef};
use serde::{Serialize, Serializer};

/// A UTC timestamp as SQLite's `CURRENT_TIMESTAMP` writes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Time(time::OffsetDateTime);

pub(crate) const TIME_FORMAT : &[time::format_description::FormatItem<
    'static,
>] = time::macros::format_description!(
    "[year]-[month]-[day] [hour]:[minute]:[second]"
);

const DATE_FORMAT : &[time::format_description::FormatItem<'static>] =
    time::macros::format_description!("[year]-[month]-[day]");

impl Time {
    pub fn parse(s : &str) -> Result<Self, time::error::Parse> {
        let dt = time::PrimitiveDateTime::parse(s, &TIME_FORMAT)?;
        Ok(dt.assume_utc().into())
    }

    /// Day-only rendering used by the link lists.
    pub fn date(&self) -> String {
        self.0
            .format(&DATE_FORMAT)
            .unwrap_or_else(|_| "Unknown".to_string())
    }
}

impl Serialize for Time {
    fn serialize<S>(
        &self,
        serializer : S,
    ) -> std::result::Result<S::Ok, S::Error>
    where
        S : Serializer,
    {
        self.0
            .format(&TIME_FORMAT)
            .map_err(serde::ser::Error::custom)?
            .serialize(serializer)
    }
}

impl FromSql for Time {
    fn column_result(value : ValueRef) -> FromSqlResult<Time> {
        let s = String::column_result(value)?;

        Time::parse(&s).map_err(|err| FromSqlError::Other(Box::new(err)))
    }
}

impl From<time::OffsetDateTime> for Time {
    fn from(t : time::OffsetDateTime) -> Self {
        Time(t)
    }
}

impl std::ops::Deref for Time {
    type Target = time::OffsetDateTime;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
