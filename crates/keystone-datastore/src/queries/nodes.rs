// SPDX-FileCopyrightText: 2026 Keystone Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Attested node and node selector operations.

use keystone_core::KeystoneError;
use keystone_core::types::{AttestedNode, Selector};
use rusqlite::{OptionalExtension, Row, params};

use crate::database::{Database, map_tr_err};

const NODE_COLUMNS: &str = "spiffe_id, attestation_type, expires_at, can_reattest";

fn node_from_row(row: &Row<'_>) -> rusqlite::Result<AttestedNode> {
    Ok(AttestedNode {
        spiffe_id: row.get(0)?,
        attestation_type: row.get(1)?,
        expires_at: row.get(2)?,
        can_reattest: row.get(3)?,
    })
}

/// Insert a newly attested node.
pub async fn create_attested_node(db: &Database, node: &AttestedNode) -> Result<(), KeystoneError> {
    let node = node.clone();
    let id = node.spiffe_id.clone();
    let inserted = db
        .connection()
        .call(move |conn| {
            conn.execute(
                "INSERT OR IGNORE INTO attested_nodes (spiffe_id, attestation_type, expires_at, can_reattest)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    node.spiffe_id,
                    node.attestation_type,
                    node.expires_at,
                    node.can_reattest,
                ],
            )
        })
        .await
        .map_err(map_tr_err)?;
    if inserted == 0 {
        return Err(KeystoneError::AlreadyExists(format!("attested node {id}")));
    }
    Ok(())
}

/// Get an attested node by SPIFFE ID.
pub async fn fetch_attested_node(
    db: &Database,
    spiffe_id: &str,
) -> Result<Option<AttestedNode>, KeystoneError> {
    let id = spiffe_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {NODE_COLUMNS} FROM attested_nodes WHERE spiffe_id = ?1"),
                params![id],
                node_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// List attested nodes ordered by SPIFFE ID.
pub async fn list_attested_nodes(db: &Database) -> Result<Vec<AttestedNode>, KeystoneError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {NODE_COLUMNS} FROM attested_nodes ORDER BY spiffe_id"
            ))?;
            let nodes = stmt
                .query_map([], node_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(nodes)
        })
        .await
        .map_err(map_tr_err)
}

/// Delete an attested node together with its selectors.
pub async fn delete_attested_node(
    db: &Database,
    spiffe_id: &str,
) -> Result<AttestedNode, KeystoneError> {
    let id = spiffe_id.to_string();
    let deleted = {
        let id = id.clone();
        db.connection()
            .call(move |conn| {
                let tx = conn.transaction()?;
                let node = tx
                    .query_row(
                        &format!("SELECT {NODE_COLUMNS} FROM attested_nodes WHERE spiffe_id = ?1"),
                        params![id],
                        node_from_row,
                    )
                    .optional()?;
                if node.is_some() {
                    tx.execute("DELETE FROM node_selectors WHERE spiffe_id = ?1", params![id])?;
                    tx.execute("DELETE FROM attested_nodes WHERE spiffe_id = ?1", params![id])?;
                }
                tx.commit()?;
                Ok(node)
            })
            .await
            .map_err(map_tr_err)?
    };
    deleted.ok_or_else(|| KeystoneError::NotFound(format!("attested node {id}")))
}

/// Replace the selectors stored for a node.
pub async fn set_node_selectors(
    db: &Database,
    spiffe_id: &str,
    selectors: &[Selector],
) -> Result<(), KeystoneError> {
    let id = spiffe_id.to_string();
    let selectors = selectors.to_vec();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM node_selectors WHERE spiffe_id = ?1", params![id])?;
            {
                let mut stmt = tx.prepare(
                    "INSERT OR IGNORE INTO node_selectors (spiffe_id, type, value) VALUES (?1, ?2, ?3)",
                )?;
                for selector in &selectors {
                    stmt.execute(params![id, selector.kind, selector.value])?;
                }
            }
            tx.commit()
        })
        .await
        .map_err(map_tr_err)
}

/// Get the selectors stored for a node, ordered by type then value.
pub async fn get_node_selectors(
    db: &Database,
    spiffe_id: &str,
) -> Result<Vec<Selector>, KeystoneError> {
    let id = spiffe_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT type, value FROM node_selectors WHERE spiffe_id = ?1 ORDER BY type, value",
            )?;
            let selectors = stmt
                .query_map(params![id], |row| Ok(Selector::new(row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(selectors)
        })
        .await
        .map_err(map_tr_err)
}
