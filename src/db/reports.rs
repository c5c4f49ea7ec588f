use async_trait::async_trait;
use sqlx::PgPool;

use super::lecturers::count_lecturers;
use super::students::count_students;
use crate::core::AppError;
use crate::services::stores::StatisticsSource;

pub struct PgStatistics {
    pool: PgPool,
}

impl PgStatistics {
    pub fn new(pool: PgPool) -> Self {
        PgStatistics { pool }
    }
}

#[async_trait]
impl StatisticsSource for PgStatistics {
    async fn count_students(&self) -> Result<i64, AppError> {
        count_students(&self.pool).await
    }

    async fn count_lecturers(&self) -> Result<i64, AppError> {
        count_lecturers(&self.pool).await
    }

    async fn count_achievements_by_status(&self) -> Result<Vec<(String, i64)>, AppError> {
        let rows = sqlx::query_as::<_, (String, i64)>(
            r#"
            SELECT LOWER(status), COUNT(*)
            FROM achievement_references
            WHERE deleted_at IS NULL
            GROUP BY LOWER(status)
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
