use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, Row};

use super::{parse_datetime, Database};
use crate::db::models::SessionRecord;

fn row_to_record(row: &Row) -> Result<SessionRecord> {
    let started_at: String = row.get("started_at")?;
    let ended_at: String = row.get("ended_at")?;

    Ok(SessionRecord {
        id: row.get("id")?,
        started_at: parse_datetime(&started_at, "started_at")?,
        ended_at: parse_datetime(&ended_at, "ended_at")?,
        poor_posture_secs: row.get("poor_posture_secs")?,
        average_pitch: row.get("average_pitch")?,
        min_pitch: row.get("min_pitch")?,
        max_pitch: row.get("max_pitch")?,
    })
}

impl Database {
    pub async fn insert_session(&self, record: &SessionRecord) -> Result<()> {
        let record = record.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO sessions (id, started_at, ended_at, poor_posture_secs, average_pitch, min_pitch, max_pitch, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    record.id,
                    record.started_at.to_rfc3339(),
                    record.ended_at.to_rfc3339(),
                    record.poor_posture_secs,
                    record.average_pitch,
                    record.min_pitch,
                    record.max_pitch,
                    Utc::now().to_rfc3339(),
                ],
            )
            .with_context(|| "failed to insert session")?;
            Ok(())
        })
        .await
    }

    /// All completed sessions, newest first.
    pub async fn list_sessions(&self) -> Result<Vec<SessionRecord>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, started_at, ended_at, poor_posture_secs, average_pitch, min_pitch, max_pitch
                 FROM sessions
                 ORDER BY started_at DESC",
            )?;

            let mut rows = stmt.query([])?;
            let mut sessions = Vec::new();
            while let Some(row) = rows.next()? {
                sessions.push(row_to_record(row)?);
            }

            Ok(sessions)
        })
        .await
    }

    pub async fn delete_session(&self, session_id: &str) -> Result<()> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            conn.execute("DELETE FROM sessions WHERE id = ?1", params![session_id])
                .with_context(|| "failed to delete session")?;
            Ok(())
        })
        .await
    }

    pub async fn delete_all_sessions(&self) -> Result<()> {
        self.execute(|conn| {
            conn.execute("DELETE FROM sessions", [])
                .with_context(|| "failed to clear sessions")?;
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record(offset_secs: i64) -> SessionRecord {
        let started_at = Utc::now() - Duration::seconds(offset_secs);
        SessionRecord {
            id: uuid::Uuid::new_v4().to_string(),
            started_at,
            ended_at: started_at + Duration::seconds(120),
            poor_posture_secs: 37.25,
            average_pitch: -11.625,
            min_pitch: -28.5,
            max_pitch: 3.125,
        }
    }

    async fn open_db() -> (Database, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path().join("sessions.sqlite3")).unwrap();
        (db, dir)
    }

    #[tokio::test]
    async fn round_trips_a_record() {
        let (db, _dir) = open_db().await;
        let original = record(600);

        db.insert_session(&original).await.unwrap();
        let loaded = db.list_sessions().await.unwrap();

        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0], original);
    }

    #[tokio::test]
    async fn lists_newest_first() {
        let (db, _dir) = open_db().await;
        let older = record(3_600);
        let newer = record(60);

        db.insert_session(&older).await.unwrap();
        db.insert_session(&newer).await.unwrap();

        let loaded = db.list_sessions().await.unwrap();
        assert_eq!(loaded[0].id, newer.id);
        assert_eq!(loaded[1].id, older.id);
    }

    #[tokio::test]
    async fn deletes_one_and_all() {
        let (db, _dir) = open_db().await;
        let a = record(600);
        let b = record(300);

        db.insert_session(&a).await.unwrap();
        db.insert_session(&b).await.unwrap();

        db.delete_session(&a.id).await.unwrap();
        let remaining = db.list_sessions().await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, b.id);

        db.delete_all_sessions().await.unwrap();
        assert!(db.list_sessions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn reopening_preserves_sessions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.sqlite3");
        let original = record(600);

        {
            let db = Database::new(path.clone()).unwrap();
            db.insert_session(&original).await.unwrap();
        }

        let db = Database::new(path).unwrap();
        let loaded = db.list_sessions().await.unwrap();
        assert_eq!(loaded, vec![original]);
    }
}
