use async_trait::async_trait;
use mathquest_core::model::LearnerId;
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{
    conn, id_to_i64, learner_id_from_i64, level_id_from_i64, ser, u8_from_i64, u32_from_i64,
};
use crate::repository::{QuizAttemptRecord, QuizAttemptRow, QuizResultRepository, StorageError};

fn map_attempt_row(row: &sqlx::sqlite::SqliteRow) -> Result<QuizAttemptRow, StorageError> {
    let id: i64 = row.try_get("id").map_err(ser)?;
    let attempt = QuizAttemptRecord {
        learner_id: learner_id_from_i64(row.try_get::<i64, _>("learner_id").map_err(ser)?)?,
        level_id: level_id_from_i64(row.try_get::<i64, _>("level_id").map_err(ser)?)?,
        correct: u32_from_i64("correct", row.try_get::<i64, _>("correct").map_err(ser)?)?,
        total: u32_from_i64("total", row.try_get::<i64, _>("total").map_err(ser)?)?,
        percentage: u8_from_i64("percentage", row.try_get::<i64, _>("percentage").map_err(ser)?)?,
        passed: row.try_get("passed").map_err(ser)?,
        recorded_at: row.try_get("recorded_at").map_err(ser)?,
        synced: row.try_get("synced").map_err(ser)?,
    };
    Ok(QuizAttemptRow { id, attempt })
}

#[async_trait]
impl QuizResultRepository for SqliteRepository {
    async fn append_result(&self, attempt: &QuizAttemptRecord) -> Result<i64, StorageError> {
        let res = sqlx::query(
            r"
                INSERT INTO quiz_results (
                    learner_id, level_id, correct, total,
                    percentage, passed, recorded_at, synced
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ",
        )
        .bind(id_to_i64("learner_id", attempt.learner_id.value())?)
        .bind(id_to_i64("level_id", attempt.level_id.value())?)
        .bind(i64::from(attempt.correct))
        .bind(i64::from(attempt.total))
        .bind(i64::from(attempt.percentage))
        .bind(attempt.passed)
        .bind(attempt.recorded_at)
        .bind(attempt.synced)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => StorageError::NotFound,
            other => conn(other),
        })?;

        Ok(res.last_insert_rowid())
    }

    async fn list_results(
        &self,
        learner_id: LearnerId,
        limit: u32,
    ) -> Result<Vec<QuizAttemptRow>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT id, learner_id, level_id, correct, total,
                       percentage, passed, recorded_at, synced
                FROM quiz_results
                WHERE learner_id = ?1
                ORDER BY recorded_at DESC, id DESC
                LIMIT ?2
            ",
        )
        .bind(id_to_i64("learner_id", learner_id.value())?)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_attempt_row).collect()
    }

    async fn list_unsynced(&self, learner_id: LearnerId) -> Result<Vec<QuizAttemptRow>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT id, learner_id, level_id, correct, total,
                       percentage, passed, recorded_at, synced
                FROM quiz_results
                WHERE learner_id = ?1 AND synced = 0
                ORDER BY recorded_at ASC, id ASC
            ",
        )
        .bind(id_to_i64("learner_id", learner_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_attempt_row).collect()
    }

    async fn mark_synced(&self, id: i64) -> Result<(), StorageError> {
        let res = sqlx::query("UPDATE quiz_results SET synced = 1 WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(conn)?;
        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}
