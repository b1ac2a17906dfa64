use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use rusqlite::{params, OptionalExtension, Row};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::{
    charts::ChartType,
    db::{
        helpers::{parse_chart_type, parse_datetime},
        models::CustomValueRow,
        Database,
    },
    email::EmailAddress,
    store::{CustomValueStore, StoredRecord},
};

const SELECT_COLUMNS: &str =
    "SELECT id, email, chart_type, chart_data, created_at, updated_at FROM user_custom_values";

fn row_to_custom_value(row: &Row) -> Result<CustomValueRow> {
    let chart_type: String = row.get("chart_type")?;
    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;

    Ok(CustomValueRow {
        id: row.get("id")?,
        email: row.get("email")?,
        chart_type: parse_chart_type(&chart_type)?,
        chart_data: row.get("chart_data")?,
        created_at: parse_datetime(&created_at, "created_at")?,
        updated_at: parse_datetime(&updated_at, "updated_at")?,
    })
}

impl Database {
    /// Get the saved row for an email and chart
    pub async fn get_custom_value(
        &self,
        email: String,
        chart_type: ChartType,
    ) -> Result<Option<CustomValueRow>> {
        self.execute(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "{SELECT_COLUMNS} WHERE email = ?1 AND chart_type = ?2"
            ))?;
            let mut rows = stmt.query(params![email, chart_type.storage_key()])?;
            let value = match rows.next()? {
                Some(row) => Some(row_to_custom_value(row)?),
                None => None,
            };
            Ok(value)
        })
        .await
    }

    /// Insert or replace the row keyed by (email, chart_type).
    ///
    /// Runs in one transaction. If `cancel` fires before the worker reaches
    /// the task, or before the commit, the write is rolled back.
    pub async fn upsert_custom_value(
        &self,
        record: StoredRecord,
        cancel: CancellationToken,
    ) -> Result<CustomValueRow> {
        let chart_data = record
            .chart_data
            .to_json()
            .context("failed to serialize chart_data")?;
        let email = record.identifier.as_str().to_string();
        let chart_type = record.chart_type.storage_key();
        let updated_at = record.updated_at.to_rfc3339();

        self.execute(move |conn| {
            if cancel.is_cancelled() {
                bail!("request cancelled before reaching the database");
            }

            let tx = conn.transaction()?;

            // Existing rows keep their id and created_at
            let existing_id: Option<String> = tx
                .query_row(
                    "SELECT id FROM user_custom_values WHERE email = ?1 AND chart_type = ?2",
                    params![email, chart_type],
                    |row| row.get(0),
                )
                .optional()?;
            let id = existing_id.unwrap_or_else(|| format!("cv_{}", Uuid::new_v4()));

            tx.execute(
                "INSERT INTO user_custom_values (id, email, chart_type, chart_data, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)
                 ON CONFLICT(email, chart_type) DO UPDATE SET
                     chart_data = excluded.chart_data,
                     updated_at = excluded.updated_at",
                params![id, email, chart_type, chart_data, updated_at],
            )
            .context("failed to upsert custom values")?;

            let value = {
                let mut stmt = tx.prepare(&format!(
                    "{SELECT_COLUMNS} WHERE email = ?1 AND chart_type = ?2"
                ))?;
                let mut rows = stmt.query(params![email, chart_type])?;
                let saved = match rows.next()? {
                    Some(row) => row_to_custom_value(row)?,
                    None => bail!("custom values missing after upsert"),
                };
                saved
            };

            if cancel.is_cancelled() {
                bail!("request cancelled before commit");
            }
            tx.commit().context("failed to commit custom values")?;
            Ok(value)
        })
        .await
    }
}

#[async_trait]
impl CustomValueStore for Database {
    async fn lookup(
        &self,
        identifier: &EmailAddress,
        chart_type: ChartType,
    ) -> Result<Option<StoredRecord>> {
        self.get_custom_value(identifier.as_str().to_string(), chart_type)
            .await?
            .map(CustomValueRow::into_record)
            .transpose()
    }

    async fn upsert(&self, record: StoredRecord, cancel: &CancellationToken) -> Result<()> {
        self.upsert_custom_value(record, cancel.clone())
            .await
            .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::charts::{
        ChartData, ChartDataset, DurationDataset, SadPathDataset, SadPathEdit,
    };

    fn open(dir: &tempfile::TempDir) -> Database {
        Database::new(dir.path().join("nested").join("values.sqlite3")).unwrap()
    }

    fn email(raw: &str) -> EmailAddress {
        EmailAddress::parse(raw).unwrap()
    }

    async fn row_count(db: &Database) -> i64 {
        db.execute(|conn| {
            let count = conn.query_row("SELECT COUNT(*) FROM user_custom_values", [], |row| {
                row.get(0)
            })?;
            Ok(count)
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn missing_key_looks_up_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let db = open(&dir);
        assert!(db
            .lookup(&email("a@b.com"), ChartType::Duration)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn upsert_overwrites_but_keeps_identity() {
        let dir = tempfile::tempdir().unwrap();
        let db = open(&dir);
        let who = email("a@b.com");

        let first = db
            .upsert_custom_value(
                StoredRecord::new(who.clone(), ChartData::SadPath(SadPathDataset::default())),
                CancellationToken::new(),
            )
            .await
            .unwrap();

        let mut edited = SadPathDataset::default();
        edited
            .apply_edit(SadPathEdit::Subcategory {
                category: 1,
                subcategory: 0,
                value: 20.0,
            })
            .unwrap();
        let second = db
            .upsert_custom_value(
                StoredRecord::new(who.clone(), ChartData::SadPath(edited.clone())),
                CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.created_at, second.created_at);
        assert!(second.id.starts_with("cv_"));

        let stored = db.lookup(&who, ChartType::SadPath).await.unwrap().unwrap();
        assert_eq!(stored.chart_data, ChartData::SadPath(edited));
        assert_eq!(row_count(&db).await, 1);
    }

    #[tokio::test]
    async fn cancelled_while_queued_is_never_written() {
        let dir = tempfile::tempdir().unwrap();
        let db = open(&dir);
        let who = email("a@b.com");

        let busy = {
            let db = db.clone();
            tokio::spawn(async move {
                db.execute(|_| {
                    std::thread::sleep(Duration::from_millis(200));
                    Ok(())
                })
                .await
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        let cancel = CancellationToken::new();
        let upsert = {
            let db = db.clone();
            let cancel = cancel.clone();
            let record = StoredRecord::new(who.clone(), ChartData::SadPath(SadPathDataset::default()));
            tokio::spawn(async move { db.upsert(record, &cancel).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        cancel.cancel();

        busy.await.unwrap().unwrap();
        let err = upsert.await.unwrap().unwrap_err();
        assert!(err.to_string().contains("cancelled"));
        assert!(db.lookup(&who, ChartType::SadPath).await.unwrap().is_none());
        assert_eq!(row_count(&db).await, 0);
    }

    #[tokio::test]
    async fn rows_use_backend_partition_keys() {
        let dir = tempfile::tempdir().unwrap();
        let db = open(&dir);
        let who = email("a@b.com");
        db.upsert(
            StoredRecord::new(who.clone(), ChartData::Duration(DurationDataset::bell_curve())),
            &CancellationToken::new(),
        )
        .await
        .unwrap();
        db.upsert(
            StoredRecord::new(who.clone(), ChartData::SadPath(SadPathDataset::default())),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        let stored_keys: Vec<String> = db
            .execute(|conn| {
                let mut stmt =
                    conn.prepare("SELECT chart_type FROM user_custom_values ORDER BY chart_type")?;
                let keys = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(keys)
            })
            .await
            .unwrap();
        assert_eq!(stored_keys, vec!["call_duration", "sad_path"]);

        let duration = db.lookup(&who, ChartType::Duration).await.unwrap().unwrap();
        assert_eq!(
            duration.chart_data,
            ChartData::Duration(DurationDataset::bell_curve())
        );
    }

    #[tokio::test]
    async fn data_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let who = email("a@b.com");
        {
            let db = open(&dir);
            db.upsert(
                StoredRecord::new(who.clone(), ChartData::SadPath(SadPathDataset::default())),
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        }

        let db = open(&dir);
        assert!(db.lookup(&who, ChartType::SadPath).await.unwrap().is_some());
    }
}
