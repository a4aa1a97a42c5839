use std::os::raw::c_int;

use log::info;
use rusqlite::{ffi, params, Connection, Params, Statement};
use tokio::sync::Mutex;

use crate::{models, Error, Result};

const SCHEMA : &str = "
CREATE TABLE IF NOT EXISTS USER (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    name          TEXT NOT NULL,
    email         TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    created_at    TIMESTAMP DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS LINK (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id     INTEGER REFERENCES USER(id) ON DELETE CASCADE,
    name        TEXT NOT NULL,
    url         TEXT NOT NULL,
    description TEXT,
    created_at  TIMESTAMP DEFAULT CURRENT_TIMESTAMP
);
";

// Columns a LINK table written by older tools may be missing. SQLite
// refuses non-constant defaults in ALTER TABLE, so created_at stays NULL
// for those rows.
const LINK_COLUMNS : &[(&str, &str)] = &[
    ("user_id", "INTEGER REFERENCES USER(id) ON DELETE CASCADE"),
    ("description", "TEXT"),
    ("created_at", "TIMESTAMP"),
];

const LINK_FIELDS : &str = "id, user_id, name, url, description, created_at";

fn error_code_match(
    err : &rusqlite::Error,
    code : ffi::ErrorCode,
    ext : c_int,
) -> bool {
    matches!(
            err,
            rusqlite::Error::SqliteFailure(e, _)
                if e.code == code
                && e.extended_code == ext)
}

macro_rules! db_method {
        ($name:ident (
            &$self:ident,
            $conn:ident,
            $($pname:ident : $ptype:ty),*
        ) -> $ret:ty $body:block ) => {
            pub async fn $name (&$self, $( $pname : $ptype, )* ) -> $ret {
                let $conn = $self.conn.lock().await;
                tokio::task::block_in_place(|| $body)
            }
        }
    }

/// The account and link store. One connection, serialized by the mutex;
/// every method is a single autocommitted statement.
pub struct Db {
    conn : Mutex<Connection>,
}

impl Db {
    pub fn new<P : AsRef<std::path::Path>>(p : P) -> Result<Self> {
        Self::from_connection(Connection::open(p)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    /// Wraps an already open connection, creating or upgrading the schema.
    pub fn from_connection(conn : Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.execute_batch(SCHEMA)?;
        migrate_links(&conn)?;

        Ok(Self {
            conn : Mutex::new(conn),
        })
    }

    db_method! {insert_user(
        &self,
        conn,
        name : &str,
        email : &str,
        password_hash : &str
    ) -> Result<u32> {
        conn
            .prepare_cached(
                "INSERT INTO USER (name, email, password_hash) VALUES (?1, ?2, ?3)",
            )?
            .execute(params![name, email, password_hash])
            .map_err(|err| {
                if error_code_match(
                    &err,
                    ffi::ErrorCode::ConstraintViolation,
                    ffi::SQLITE_CONSTRAINT_UNIQUE,
                ) {
                    Error::DuplicateEmail
                } else {
                    err.into()
                }
            })?;

        row_id(conn.last_insert_rowid())
    }}

    db_method! {get_user(&self, conn, user_id : u32) -> Result<models::User> {
        let mut stmt = conn
            .prepare_cached("SELECT * FROM USER WHERE USER.id = ?1")?;

        let mut rows = stmt.query(params![user_id])?;

        let row = rows.next()?
            .ok_or(Error::UserIdNotFound(user_id))?;

        Ok(models::User::from_row(row)?)
    }}

    db_method! {get_user_by_email(
        &self,
        conn,
        email : &str
    ) -> Result<Option<models::User>> {
        let mut stmt = conn
            .prepare_cached("SELECT * FROM USER WHERE USER.email = ?1")?;

        let mut rows = stmt.query(params![email])?;

        match rows.next()? {
            Some(row) => Ok(Some(models::User::from_row(row)?)),
            None => Ok(None),
        }
    }}

    db_method! {insert_link(
        &self,
        conn,
        user_id : u32,
        name : &str,
        url : &str,
        description : Option<&str>
    ) -> Result<u32> {
        conn
            .prepare_cached(
                "INSERT INTO LINK (user_id, name, url, description) \
                 VALUES (?1, ?2, ?3, ?4)",
            )?
            .execute(params![user_id, name, url, non_empty(description)])?;

        row_id(conn.last_insert_rowid())
    }}

    db_method! {get_links(
        &self,
        conn,
        user_id : u32
    ) -> Result<Vec<models::Link>> {
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {} FROM LINK \
             WHERE user_id = ?1 OR user_id IS NULL \
             ORDER BY id DESC",
            LINK_FIELDS,
        ))?;

        collect_links(&mut stmt, params![user_id])
    }}

    db_method! {search_links(
        &self,
        conn,
        user_id : u32,
        query : &str
    ) -> Result<Vec<models::Link>> {
        let mut stmt = conn.prepare_cached(&format!(
            r"SELECT {} FROM LINK
              WHERE (user_id = ?1 OR user_id IS NULL)
                AND (name LIKE ?2 ESCAPE '\' OR description LIKE ?2 ESCAPE '\')
              ORDER BY id DESC",
            LINK_FIELDS,
        ))?;

        collect_links(&mut stmt, params![user_id, like_pattern(query)])
    }}

    db_method! {update_link(
        &self,
        conn,
        link_id : u32,
        user_id : u32,
        name : &str,
        url : &str,
        description : Option<&str>
    ) -> Result<()> {
        let n = conn
            .prepare_cached(
                "UPDATE LINK SET name = ?1, url = ?2, description = ?3 \
                 WHERE id = ?4 AND (user_id = ?5 OR user_id IS NULL)",
            )?
            .execute(params![
                name,
                url,
                non_empty(description),
                link_id,
                user_id
            ])?;

        if n == 0 {
            return Err(Error::LinkNotFound(link_id));
        }

        Ok(())
    }}

    db_method! {delete_link(
        &self,
        conn,
        link_id : u32,
        user_id : u32
    ) -> Result<()> {
        let n = conn
            .prepare_cached(
                "DELETE FROM LINK \
                 WHERE id = ?1 AND (user_id = ?2 OR user_id IS NULL)",
            )?
            .execute(params![link_id, user_id])?;

        if n == 0 {
            return Err(Error::LinkNotFound(link_id));
        }

        Ok(())
    }}

    db_method! {assign_unowned_links(
        &self,
        conn,
        user_id : u32
    ) -> Result<usize> {
        let n = conn
            .prepare_cached("UPDATE LINK SET user_id = ?1 WHERE user_id IS NULL")?
            .execute(params![user_id])?;

        Ok(n)
    }}
}

fn link_columns(conn : &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("PRAGMA table_info(LINK)")?;
    let cols = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(cols)
}

/// Tables written by the first terminal tool keep the address in a
/// `link` column.
pub(crate) fn rename_link_column(conn : &Connection) -> Result<()> {
    let cols = link_columns(conn)?;

    if cols.iter().any(|c| c == "link") && !cols.iter().any(|c| c == "url") {
        info!("renaming column LINK.link to LINK.url");
        conn.execute_batch("ALTER TABLE LINK RENAME COLUMN link TO url")?;
    }

    Ok(())
}

fn migrate_links(conn : &Connection) -> Result<()> {
    rename_link_column(conn)?;
    let existing = link_columns(conn)?;

    for (column, decl) in LINK_COLUMNS {
        if existing.iter().any(|c| c == column) {
            continue;
        }

        info!("adding column LINK.{}", column);
        conn.execute_batch(&format!(
            "ALTER TABLE LINK ADD COLUMN {} {}",
            column, decl
        ))?;
    }

    Ok(())
}

fn collect_links<P : Params>(
    stmt : &mut Statement,
    params : P,
) -> Result<Vec<models::Link>> {
    let mut rows = stmt.query(params)?;

    let mut links = Vec::new();
    while let Some(row) = rows.next()? {
        links.push(models::Link::from_row(row)?);
    }

    Ok(links)
}

fn row_id(id : i64) -> Result<u32> {
    u32::try_from(id).map_err(|_| Error::Internal)
}

fn non_empty(s : Option<&str>) -> Option<&str> {
    s.filter(|s| !s.is_empty())
}

/// Substring pattern for `LIKE ... ESCAPE '\'`, with the query's own
/// wildcards matched literally.
fn like_pattern(query : &str) -> String {
    let mut pat = String::with_capacity(query.len() + 2);
    pat.push('%');
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pat.push('\\');
        }
        pat.push(c);
    }
    pat.push('%');
    pat
}

trait FromRow: Sized {
    fn from_row(row : &rusqlite::Row) -> rusqlite::Result<Self>;
}

macro_rules! impl_from_row {
        ($ty:ty { $($field:ident),* }) => {
            impl FromRow for $ty {
                fn from_row(row : &rusqlite::Row) -> rusqlite::Result<$ty> {
                    Ok(Self{
                    $(
                        $field : row.get(stringify!($field))?,
                    )*
                    })
                }
            }
        }
    }

impl_from_row! {models::User {
    id, name, email, password_hash, created_at
}}

impl FromRow for models::Link {
    fn from_row(row : &rusqlite::Row) -> rusqlite::Result<Self> {
        // a timestamp in any other shape reads as unknown rather than
        // failing the whole list
        let created_at = row
            .get_ref("created_at")?
            .as_str()
            .ok()
            .and_then(|s| models::Time::parse(s).ok());

        Ok(Self {
            id : row.get("id")?,
            user_id : row.get("user_id")?,
            name : row.get("name")?,
            url : row.get("url")?,
            description : row.get("description")?,
            created_at,
        })
    }
}
