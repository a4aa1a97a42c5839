//! Numbered terminal menu over a `LINK` table with no notion of owners.
//! It shares nothing with the web application except, possibly, the
//! database file.

use std::io::{BufRead, Write};

use log::debug;
use rusqlite::{params, Connection, OptionalExtension};

use crate::database::rename_link_column;
use crate::forms::normalize_url;
use crate::Result;

const SCHEMA : &str = "
CREATE TABLE IF NOT EXISTS LINK (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT NOT NULL,
    url         TEXT NOT NULL,
    description TEXT
);
";

const RULE : &str = "------------------------------";

#[derive(Debug, PartialEq)]
pub struct Entry {
    pub id :          i64,
    pub name :        String,
    pub url :         String,
    pub description : Option<String>,
}

pub struct Menu<'c, R, W> {
    conn :  &'c Connection,
    input : R,
    out :   W,
}

impl<'c, R : BufRead, W : Write> Menu<'c, R, W> {
    pub fn new(conn : &'c Connection, input : R, out : W) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        rename_link_column(conn)?;
        Ok(Menu { conn, input, out })
    }

    /// Runs until the user picks `0` or input ends.
    pub fn run(&mut self) -> Result<()> {
        writeln!(self.out, "\n-------- Link Manager --------\n")?;

        loop {
            for line in &[
                "1. List Links",
                "2. Add Link",
                "3. Update Link",
                "4. Delete Link",
                "5. Search Link",
                "0. Exit",
            ] {
                writeln!(self.out, "{}", line)?;
            }

            let choice = match self.prompt("Enter your choice: ")? {
                Some(c) => c,
                None => break,
            };

            match choice.parse::<i64>() {
                Ok(0) => {
                    writeln!(self.out, "Exiting ...")?;
                    break;
                },
                Ok(1) => self.list_all()?,
                Ok(2) => self.add()?,
                Ok(3) => self.update()?,
                Ok(4) => self.delete()?,
                Ok(5) => self.search()?,
                Ok(_) => writeln!(self.out, "Invalid choice, please enter 0-5")?,
                Err(_) => {
                    writeln!(self.out, "Invalid input, enter a number 0-5")?
                },
            }
        }

        Ok(())
    }

    fn prompt(&mut self, msg : &str) -> Result<Option<String>> {
        write!(self.out, "{}", msg)?;
        self.out.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }

        Ok(Some(line.trim().to_string()))
    }

    fn prompt_id(&mut self, msg : &str) -> Result<Option<i64>> {
        let id = self.prompt(msg)?.and_then(|s| s.parse().ok());
        if id.is_none() {
            writeln!(self.out, "Enter a valid numeric id")?;
        }
        Ok(id)
    }

    fn print(&mut self, e : &Entry) -> Result<()> {
        writeln!(self.out, "ID: {}", e.id)?;
        writeln!(self.out, "Name: {}", e.name)?;
        writeln!(self.out, "URL: {}", e.url)?;
        writeln!(
            self.out,
            "Description: {}",
            e.description.as_deref().unwrap_or("")
        )?;
        Ok(())
    }

    pub fn list_all(&mut self) -> Result<()> {
        let entries = all_entries(self.conn)?;

        if entries.is_empty() {
            writeln!(self.out, "\nNo links found.\n")?;
            return Ok(());
        }

        writeln!(self.out, "\nAll Links:\n{}", RULE)?;
        for e in &entries {
            self.print(e)?;
            writeln!(self.out, "{}", RULE)?;
        }

        Ok(())
    }

    fn add(&mut self) -> Result<()> {
        let name = self.prompt("Enter name of the link: ")?.unwrap_or_default();
        let url = self.prompt("Enter URL of the link: ")?.unwrap_or_default();
        let description = self
            .prompt("Enter description of the link: ")?
            .unwrap_or_default();

        if name.is_empty() || url.is_empty() {
            writeln!(self.out, "Name and URL are required")?;
            return Ok(());
        }

        self.conn.execute(
            "INSERT INTO LINK (name, url, description) VALUES (?1, ?2, ?3)",
            params![
                name,
                normalize_url(&url),
                Some(description).filter(|d| !d.is_empty())
            ],
        )?;
        debug!("added link {}", self.conn.last_insert_rowid());

        writeln!(self.out, "Link added successfully!")?;
        Ok(())
    }

    fn update(&mut self) -> Result<()> {
        writeln!(self.out, "---------- Update ----------")?;

        let id = match self.prompt_id("Enter link id: ")? {
            Some(id) => id,
            None => return Ok(()),
        };

        let current = match entry(self.conn, id)? {
            Some(e) => e,
            None => {
                writeln!(self.out, "No link found with that id")?;
                return Ok(());
            },
        };

        writeln!(self.out, "\nCurrent Values:")?;
        self.print(&current)?;
        writeln!(self.out)?;

        let name = self
            .prompt("Enter new name (leave blank to keep same): ")?
            .unwrap_or_default();
        let url = self
            .prompt("Enter new URL (leave blank to keep same): ")?
            .unwrap_or_default();
        let description = self
            .prompt("Enter new description (leave blank to keep same): ")?
            .unwrap_or_default();

        let name = if name.is_empty() { current.name } else { name };
        let url = if url.is_empty() {
            current.url
        } else {
            normalize_url(&url)
        };
        let description = if description.is_empty() {
            current.description
        } else {
            Some(description)
        };

        self.conn.execute(
            "UPDATE LINK SET name = ?1, url = ?2, description = ?3 WHERE id = ?4",
            params![name, url, description, id],
        )?;

        writeln!(self.out, "Record updated successfully!")?;
        Ok(())
    }

    fn delete(&mut self) -> Result<()> {
        writeln!(self.out, "---------- Delete ----------")?;

        let id = match self.prompt_id("Enter link id: ")? {
            Some(id) => id,
            None => return Ok(()),
        };

        let current = match entry(self.conn, id)? {
            Some(e) => e,
            None => {
                writeln!(self.out, "No link found with that id")?;
                return Ok(());
            },
        };

        let confirm = self
            .prompt(&format!(
                "Are you sure you want to delete '{}'? (y/n): ",
                current.name
            ))?
            .unwrap_or_default();

        if !confirm.eq_ignore_ascii_case("y") {
            writeln!(self.out, "Deletion cancelled")?;
            return Ok(());
        }

        self.conn
            .execute("DELETE FROM LINK WHERE id = ?1", params![id])?;
        writeln!(self.out, "Deleted successfully")?;
        Ok(())
    }

    fn search(&mut self) -> Result<()> {
        writeln!(self.out, "---------- Search ----------")?;

        let id = match self.prompt_id("Enter the id: ")? {
            Some(id) => id,
            None => return Ok(()),
        };

        if id <= 0 {
            writeln!(self.out, "Invalid id, must be greater than zero")?;
            return Ok(());
        }

        match entry(self.conn, id)? {
            Some(e) => self.print(&e)?,
            None => writeln!(self.out, "Not found in the database.")?,
        }

        Ok(())
    }
}

fn row_to_entry(row : &rusqlite::Row) -> rusqlite::Result<Entry> {
    Ok(Entry {
        id :          row.get("id")?,
        name :        row.get("name")?,
        url :         row.get("url")?,
        description : row.get("description")?,
    })
}

pub fn all_entries(conn : &Connection) -> Result<Vec<Entry>> {
    let mut stmt =
        conn.prepare("SELECT id, name, url, description FROM LINK ORDER BY id")?;
    let entries = stmt
        .query_map([], row_to_entry)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(entries)
}

fn entry(conn : &Connection, id : i64) -> Result<Option<Entry>> {
    Ok(conn
        .query_row(
            "SELECT id, name, url, description FROM LINK WHERE id = ?1",
            params![id],
            row_to_entry,
        )
        .optional()?)
}
