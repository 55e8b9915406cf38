// /learnhub-lms/services/payments-service/src/repository/course.rs

use async_trait::async_trait;
use sqlx::PgPool;

use crate::core::stores::CourseCatalog;
use crate::models::Course;
use crate::utils::error::AppResult;

/// Read-only view ke course catalog (dikelola course service)
pub struct PgCourseCatalog {
    pool: PgPool,
}

impl PgCourseCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CourseCatalog for PgCourseCatalog {
    async fn find_by_slug(&self, slug: &str) -> AppResult<Option<Course>> {
        let course = sqlx::query_as::<_, Course>("SELECT * FROM courses WHERE slug = $1")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;

        Ok(course)
    }
}
