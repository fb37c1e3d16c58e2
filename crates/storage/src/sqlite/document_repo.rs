use chrono::Utc;
use serde_json::Value;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use tokio::sync::broadcast;

use super::SqliteRepository;
use crate::document::{CollectionPath, DocPath, Document, Fields, merge_fields, union_into};
use crate::repository::{ChangeNotice, DocumentStore, StorageError, WriteBatch};

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

fn conn_err<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

fn parse_data(raw: &str) -> Result<Fields, StorageError> {
    match serde_json::from_str::<Value>(raw).map_err(ser)? {
        Value::Object(fields) => Ok(fields),
        _ => Err(StorageError::Serialization("document data is not an object".into())),
    }
}

fn document_from_row(row: &SqliteRow) -> Result<Document, StorageError> {
    let path: String = row.try_get("path").map_err(ser)?;
    let data: String = row.try_get("data").map_err(ser)?;
    Ok(Document {
        path: DocPath::parse(&path)?,
        fields: parse_data(&data)?,
    })
}

async fn load(conn: &mut SqliteConnection, path: &DocPath) -> Result<Option<Fields>, StorageError> {
    let row = sqlx::query("SELECT data FROM documents WHERE path = ?1")
        .bind(path.as_string())
        .fetch_optional(&mut *conn)
        .await
        .map_err(conn_err)?;
    row.map(|row| {
        let data: String = row.try_get("data").map_err(ser)?;
        parse_data(&data)
    })
    .transpose()
}

async fn store(
    conn: &mut SqliteConnection,
    path: &DocPath,
    fields: &Fields,
) -> Result<(), StorageError> {
    let data = serde_json::to_string(fields).map_err(ser)?;
    let parent = path.parent();
    sqlx::query(
        r"
        INSERT INTO documents (path, parent, collection_id, doc_id, data, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        ON CONFLICT(path) DO UPDATE SET
            data = excluded.data,
            updated_at = excluded.updated_at
        ",
    )
    .bind(path.as_string())
    .bind(parent.as_string())
    .bind(parent.collection_id())
    .bind(path.id())
    .bind(data)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await
    .map_err(conn_err)?;
    Ok(())
}

async fn merge_in(
    conn: &mut SqliteConnection,
    path: &DocPath,
    patch: Fields,
) -> Result<(), StorageError> {
    let mut fields = load(conn, path).await?.unwrap_or_default();
    merge_fields(&mut fields, patch);
    store(conn, path, &fields).await
}

impl SqliteRepository {
    fn notify(&self, path: &DocPath) {
        let _ = self.notices.send(ChangeNotice { path: path.clone() });
    }
}

#[async_trait::async_trait]
impl DocumentStore for SqliteRepository {
    async fn get(&self, path: &DocPath) -> Result<Option<Document>, StorageError> {
        let mut conn = self.pool.acquire().await.map_err(conn_err)?;
        Ok(load(&mut conn, path).await?.map(|fields| Document {
            path: path.clone(),
            fields,
        }))
    }

    async fn list(&self, collection: &CollectionPath) -> Result<Vec<Document>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT path, data FROM documents
            WHERE parent = ?1
            ORDER BY doc_id ASC
            ",
        )
        .bind(collection.as_string())
        .fetch_all(&self.pool)
        .await
        .map_err(conn_err)?;

        rows.iter().map(document_from_row).collect()
    }

    async fn list_group(&self, collection_id: &str) -> Result<Vec<Document>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT path, data FROM documents
            WHERE collection_id = ?1
            ORDER BY path ASC
            ",
        )
        .bind(collection_id)
        .fetch_all(&self.pool)
        .await
        .map_err(conn_err)?;

        rows.iter().map(document_from_row).collect()
    }

    async fn merge(&self, path: &DocPath, fields: Fields) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn_err)?;
        merge_in(&mut tx, path, fields).await?;
        tx.commit().await.map_err(conn_err)?;
        self.notify(path);
        Ok(())
    }

    async fn commit(&self, batch: WriteBatch) -> Result<(), StorageError> {
        let writes = batch.into_writes();
        let mut tx = self.pool.begin().await.map_err(conn_err)?;
        for (path, fields) in &writes {
            // An early return drops `tx`, which rolls everything back.
            merge_in(&mut tx, path, fields.clone()).await?;
        }
        tx.commit().await.map_err(conn_err)?;
        tracing::debug!(writes = writes.len(), "committed write batch");
        for (path, _) in &writes {
            self.notify(path);
        }
        Ok(())
    }

    async fn add(
        &self,
        collection: &CollectionPath,
        fields: Fields,
    ) -> Result<DocPath, StorageError> {
        let path = collection.doc(&uuid::Uuid::new_v4().simple().to_string())?;
        let mut conn = self.pool.acquire().await.map_err(conn_err)?;
        store(&mut conn, &path, &fields).await?;
        self.notify(&path);
        Ok(path)
    }

    async fn update(&self, path: &DocPath, fields: Fields) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn_err)?;
        let mut existing = load(&mut tx, path)
            .await?
            .ok_or_else(|| StorageError::NotFound(path.as_string()))?;
        merge_fields(&mut existing, fields);
        store(&mut tx, path, &existing).await?;
        tx.commit().await.map_err(conn_err)?;
        self.notify(path);
        Ok(())
    }

    async fn delete(&self, path: &DocPath) -> Result<(), StorageError> {
        let res = sqlx::query("DELETE FROM documents WHERE path = ?1")
            .bind(path.as_string())
            .execute(&self.pool)
            .await
            .map_err(conn_err)?;
        if res.rows_affected() > 0 {
            self.notify(path);
        }
        Ok(())
    }

    async fn array_union(
        &self,
        path: &DocPath,
        field: &str,
        values: Vec<Value>,
    ) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn_err)?;
        let mut existing = load(&mut tx, path)
            .await?
            .ok_or_else(|| StorageError::NotFound(path.as_string()))?;
        union_into(&mut existing, field, values);
        store(&mut tx, path, &existing).await?;
        tx.commit().await.map_err(conn_err)?;
        self.notify(path);
        Ok(())
    }

    fn changes(&self) -> broadcast::Receiver<ChangeNotice> {
        self.notices.subscribe()
    }
}
