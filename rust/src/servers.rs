use std::sync::Mutex;

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::PushError;

/// Known servers the user is signed in to.
pub trait ServerRegistry: Send + Sync + 'static {
    fn server_url_for_identifier(&self, identifier: &str) -> Option<String>;
    /// The URL of the single active server, or `None` when zero or several are active.
    fn only_server_url(&self) -> Option<String>;
}

pub struct SqliteServerRegistry {
    conn: Mutex<Connection>,
}

impl SqliteServerRegistry {
    pub fn open(data_dir: &str) -> Result<Self, PushError> {
        let path = std::path::Path::new(data_dir).join("servers.sqlite3");
        Self::from_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, PushError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, PushError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS servers (
                identifier TEXT PRIMARY KEY,
                url TEXT NOT NULL,
                display_name TEXT NOT NULL DEFAULT '',
                last_active_at INTEGER NOT NULL DEFAULT 0
            );",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// `last_active_at == 0` marks a server the user signed out of.
    pub fn upsert_server(
        &self,
        identifier: &str,
        url: &str,
        display_name: &str,
        last_active_at: i64,
    ) -> Result<(), PushError> {
        let conn = self.conn.lock().unwrap_or_else(|poison| poison.into_inner());
        conn.execute(
            "INSERT INTO servers (identifier, url, display_name, last_active_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(identifier) DO UPDATE SET
               url = excluded.url,
               display_name = excluded.display_name,
               last_active_at = excluded.last_active_at",
            params![identifier, url, display_name, last_active_at],
        )?;
        Ok(())
    }

    pub fn remove_server(&self, identifier: &str) -> Result<(), PushError> {
        let conn = self.conn.lock().unwrap_or_else(|poison| poison.into_inner());
        conn.execute(
            "DELETE FROM servers WHERE identifier = ?1",
            params![identifier],
        )?;
        Ok(())
    }
}

impl ServerRegistry for SqliteServerRegistry {
    fn server_url_for_identifier(&self, identifier: &str) -> Option<String> {
        let conn = self.conn.lock().unwrap_or_else(|poison| poison.into_inner());
        match conn
            .query_row(
                "SELECT url FROM servers WHERE identifier = ?1",
                params![identifier],
                |row| row.get::<_, String>(0),
            )
            .optional()
        {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(%e, "failed to look up server by identifier");
                None
            }
        }
    }

    fn only_server_url(&self) -> Option<String> {
        let conn = self.conn.lock().unwrap_or_else(|poison| poison.into_inner());
        let mut stmt = match conn.prepare(
            "SELECT url FROM servers
             WHERE last_active_at != 0 AND identifier != ''
             LIMIT 2",
        ) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(%e, "failed to prepare active server query");
                return None;
            }
        };
        let urls: Vec<String> = match stmt.query_map([], |row| row.get::<_, String>(0)) {
            Ok(rows) => rows.flatten().collect(),
            Err(e) => {
                tracing::warn!(%e, "failed to query active servers");
                return None;
            }
        };
        match urls.as_slice() {
            [only] => Some(only.clone()),
            _ => None,
        }
    }
}
