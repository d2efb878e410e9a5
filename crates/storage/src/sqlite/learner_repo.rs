use async_trait::async_trait;
use mathquest_core::model::{Learner, LearnerId};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{conn, id_to_i64, learner_id_from_i64, ser, u32_from_i64};
use crate::repository::{LearnerRepository, StorageError};

fn map_learner_row(row: &sqlx::sqlite::SqliteRow) -> Result<Learner, StorageError> {
    let id = learner_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?;
    let name: String = row.try_get("name").map_err(ser)?;
    let level = u32_from_i64("level", row.try_get::<i64, _>("level").map_err(ser)?)?;
    let completed_initial_quiz: bool = row.try_get("completed_initial_quiz").map_err(ser)?;
    let is_admin: bool = row.try_get("is_admin").map_err(ser)?;

    Learner::from_persisted(id, name, level, completed_initial_quiz, is_admin).map_err(ser)
}

#[async_trait]
impl LearnerRepository for SqliteRepository {
    async fn get_learner(&self, id: LearnerId) -> Result<Option<Learner>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, name, level, completed_initial_quiz, is_admin
            FROM learners
            WHERE id = ?1
            ",
        )
        .bind(id_to_i64("learner_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        row.as_ref().map(map_learner_row).transpose()
    }

    async fn save_learner(&self, learner: &Learner) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO learners (id, name, level, completed_initial_quiz, is_admin)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                level = MAX(learners.level, excluded.level),
                completed_initial_quiz = MAX(learners.completed_initial_quiz, excluded.completed_initial_quiz),
                is_admin = excluded.is_admin
            ",
        )
        .bind(id_to_i64("learner_id", learner.id().value())?)
        .bind(learner.name())
        .bind(i64::from(learner.level()))
        .bind(learner.completed_initial_quiz())
        .bind(learner.is_admin())
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }
}
