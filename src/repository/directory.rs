//! Project and user directories on Postgres

use async_trait::async_trait;

use super::{ProjectDirectory, Repository, UserDirectory};
use crate::{
    error::{AppError, AppResult, ResourceKind},
    models::project::Project,
};

#[async_trait]
impl ProjectDirectory for Repository {
    async fn get_project(&self, project_id: i32) -> AppResult<Project> {
        sqlx::query_as::<_, Project>("SELECT id, name FROM projects WHERE id = $1")
            .bind(project_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::not_found(ResourceKind::Project, project_id))
    }
}

#[async_trait]
impl UserDirectory for Repository {
    async fn ensure_user(&self, user_id: i32) -> AppResult<()> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        if !exists {
            return Err(AppError::not_found(ResourceKind::User, user_id));
        }
        Ok(())
    }
}
