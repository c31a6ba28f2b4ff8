// SPDX-FileCopyrightText: 2026 Keystone Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bundle CRUD operations.

use keystone_core::KeystoneError;
use keystone_core::types::Bundle;
use rusqlite::types::Type;
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_tr_err};

fn encode(bundle: &Bundle) -> Result<String, KeystoneError> {
    serde_json::to_string(bundle).map_err(|e| KeystoneError::DataStore {
        source: Box::new(e),
    })
}

fn decode(data: &str) -> Result<Bundle, rusqlite::Error> {
    serde_json::from_str(data)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e)))
}

/// Insert a new bundle.
pub async fn create_bundle(db: &Database, bundle: &Bundle) -> Result<(), KeystoneError> {
    let id = bundle.trust_domain_id.clone();
    let data = encode(bundle)?;
    let inserted = {
        let id = id.clone();
        db.connection()
            .call(move |conn| {
                conn.execute(
                    "INSERT OR IGNORE INTO bundles (trust_domain_id, data) VALUES (?1, ?2)",
                    params![id, data],
                )
            })
            .await
            .map_err(map_tr_err)?
    };
    if inserted == 0 {
        return Err(KeystoneError::AlreadyExists(format!("bundle for {id}")));
    }
    Ok(())
}

/// Get the bundle for a trust domain.
pub async fn fetch_bundle(db: &Database, trust_domain_id: &str) -> Result<Option<Bundle>, KeystoneError> {
    let id = trust_domain_id.to_string();
    db.connection()
        .call(move |conn| {
            let data: Option<String> = conn
                .query_row(
                    "SELECT data FROM bundles WHERE trust_domain_id = ?1",
                    params![id],
                    |row| row.get(0),
                )
                .optional()?;
            data.as_deref().map(decode).transpose()
        })
        .await
        .map_err(map_tr_err)
}

/// List all bundles ordered by trust domain.
pub async fn list_bundles(db: &Database) -> Result<Vec<Bundle>, KeystoneError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare("SELECT data FROM bundles ORDER BY trust_domain_id")?;
            let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
            let mut bundles = Vec::new();
            for row in rows {
                bundles.push(decode(&row?)?);
            }
            Ok(bundles)
        })
        .await
        .map_err(map_tr_err)
}

/// Replace an existing bundle.
pub async fn update_bundle(db: &Database, bundle: &Bundle) -> Result<(), KeystoneError> {
    let id = bundle.trust_domain_id.clone();
    let data = encode(bundle)?;
    let updated = {
        let id = id.clone();
        db.connection()
            .call(move |conn| {
                conn.execute(
                    "UPDATE bundles SET data = ?2 WHERE trust_domain_id = ?1",
                    params![id, data],
                )
            })
            .await
            .map_err(map_tr_err)?
    };
    if updated == 0 {
        return Err(KeystoneError::NotFound(format!("bundle for {id}")));
    }
    Ok(())
}

/// Merge `bundle` into the stored bundle for its trust domain, creating it if absent.
pub async fn append_bundle(db: &Database, bundle: &Bundle) -> Result<Bundle, KeystoneError> {
    let bundle = bundle.clone();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let existing: Option<String> = tx
                .query_row(
                    "SELECT data FROM bundles WHERE trust_domain_id = ?1",
                    params![bundle.trust_domain_id],
                    |row| row.get(0),
                )
                .optional()?;

            let merged = match existing {
                Some(data) => {
                    let mut stored = decode(&data)?;
                    stored.append(&bundle);
                    stored
                }
                None => bundle,
            };
            let data = serde_json::to_string(&merged)
                .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
            tx.execute(
                "INSERT INTO bundles (trust_domain_id, data) VALUES (?1, ?2)
                 ON CONFLICT (trust_domain_id) DO UPDATE SET data = excluded.data",
                params![merged.trust_domain_id, data],
            )?;
            tx.commit()?;
            Ok(merged)
        })
        .await
        .map_err(map_tr_err)
}

/// Delete the bundle for a trust domain.
pub async fn delete_bundle(db: &Database, trust_domain_id: &str) -> Result<(), KeystoneError> {
    let id = trust_domain_id.to_string();
    let deleted = {
        let id = id.clone();
        db.connection()
            .call(move |conn| {
                conn.execute("DELETE FROM bundles WHERE trust_domain_id = ?1", params![id])
            })
            .await
            .map_err(map_tr_err)?
    };
    if deleted == 0 {
        return Err(KeystoneError::NotFound(format!("bundle for {id}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::IN_MEMORY;
    use keystone_core::types::JwtKey;

    fn bundle(td: &str, root: u8) -> Bundle {
        let mut bundle = Bundle::new(td);
        bundle.root_cas.push(vec![root]);
        bundle
    }

    #[tokio::test]
    async fn create_fetch_update_delete() {
        let db = Database::open(IN_MEMORY).await.unwrap();

        create_bundle(&db, &bundle("spiffe://a.org", 1)).await.unwrap();
        let err = create_bundle(&db, &bundle("spiffe://a.org", 2))
            .await
            .unwrap_err();
        assert!(matches!(err, KeystoneError::AlreadyExists(_)));

        let fetched = fetch_bundle(&db, "spiffe://a.org").await.unwrap().unwrap();
        assert_eq!(fetched.root_cas, vec![vec![1]]);

        update_bundle(&db, &bundle("spiffe://a.org", 9)).await.unwrap();
        let fetched = fetch_bundle(&db, "spiffe://a.org").await.unwrap().unwrap();
        assert_eq!(fetched.root_cas, vec![vec![9]]);

        delete_bundle(&db, "spiffe://a.org").await.unwrap();
        assert!(fetch_bundle(&db, "spiffe://a.org").await.unwrap().is_none());
        assert!(matches!(
            delete_bundle(&db, "spiffe://a.org").await.unwrap_err(),
            KeystoneError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn update_missing_bundle_is_not_found() {
        let db = Database::open(IN_MEMORY).await.unwrap();
        let err = update_bundle(&db, &bundle("spiffe://a.org", 1))
            .await
            .unwrap_err();
        assert!(matches!(err, KeystoneError::NotFound(_)));
    }

    #[tokio::test]
    async fn append_merges_into_existing_bundle() {
        let db = Database::open(IN_MEMORY).await.unwrap();

        let created = append_bundle(&db, &bundle("spiffe://a.org", 1)).await.unwrap();
        assert_eq!(created.root_cas, vec![vec![1]]);

        let mut more = bundle("spiffe://a.org", 2);
        more.root_cas.push(vec![1]);
        more.jwt_signing_keys.push(JwtKey {
            key_id: "k1".into(),
            public_key: vec![7],
            not_after: 100,
        });
        let merged = append_bundle(&db, &more).await.unwrap();
        assert_eq!(merged.root_cas, vec![vec![1], vec![2]]);
        assert_eq!(merged.jwt_signing_keys.len(), 1);

        let stored = fetch_bundle(&db, "spiffe://a.org").await.unwrap().unwrap();
        assert_eq!(stored, merged);
    }

    #[tokio::test]
    async fn list_orders_by_trust_domain() {
        let db = Database::open(IN_MEMORY).await.unwrap();
        create_bundle(&db, &bundle("spiffe://b.org", 1)).await.unwrap();
        create_bundle(&db, &bundle("spiffe://a.org", 1)).await.unwrap();

        let ids: Vec<String> = list_bundles(&db)
            .await
            .unwrap()
            .into_iter()
            .map(|b| b.trust_domain_id)
            .collect();
        assert_eq!(ids, vec!["spiffe://a.org", "spiffe://b.org"]);
    }
}
