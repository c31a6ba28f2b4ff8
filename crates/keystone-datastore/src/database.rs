// SPDX-FileCopyrightText: 2026 Keystone Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite connection lifecycle.
//!
//! All statements run on tokio-rusqlite's single background thread; clones of
//! [`Database`] share that thread.

use keystone_core::KeystoneError;
use tokio_rusqlite::Connection;

use crate::migrations::{migration_error, run_migrations};

/// Connection string that selects a private in-memory database.
pub const IN_MEMORY: &str = ":memory:";

/// Handle to an open, migrated SQLite database.
#[derive(Clone)]
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (creating if needed) the database at `connection_string` and
    /// bring its schema up to date.
    pub async fn open(connection_string: &str) -> Result<Self, KeystoneError> {
        let conn = if connection_string == IN_MEMORY {
            Connection::open_in_memory().await
        } else {
            Connection::open(connection_string).await
        }
        .map_err(|e| KeystoneError::DataStore {
            source: Box::new(e),
        })?;

        let migrated = conn
            .call(|conn| -> Result<_, rusqlite::Error> {
                conn.execute_batch("PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 5000;")?;
                Ok(run_migrations(conn))
            })
            .await
            .map_err(map_tr_err)?;
        migrated.map_err(migration_error)?;

        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Close the background connection. Clones of this handle fail afterwards.
    pub async fn close(self) -> Result<(), KeystoneError> {
        self.conn
            .close()
            .await
            .map_err(|e| KeystoneError::DataStore {
                source: Box::new(e),
            })
    }
}

pub fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> KeystoneError {
    KeystoneError::DataStore {
        source: Box::new(e),
    }
}
