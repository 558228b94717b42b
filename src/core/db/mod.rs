mod error;
mod http;
mod project;
mod state;

use std::{path::Path, sync::Arc};

use sqlx::{Row, sqlite::SqliteRow};
use state::StoreState;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use uuid::Uuid;

pub use error::StoreError;
pub use http::HttpProjectStore;
pub use project::{
    NewProject, Project, ProjectQuery, ProjectStore, ProjectUpdate, advance_status, approve, share,
};

/// Local SQLite-backed project store.
#[derive(Debug, Clone)]
pub struct ProjectDb {
    state: Arc<StoreState>,
}

impl ProjectDb {
    pub async fn new<P: AsRef<Path>>(database_file: P) -> anyhow::Result<Self> {
        Ok(Self {
            state: Arc::new(StoreState::open(database_file).await?),
        })
    }

    /// Checkpoints and closes the pool. The store is unusable afterwards.
    pub async fn close(&self) -> anyhow::Result<()> {
        self.state.close().await
    }
}

fn format_time(value: OffsetDateTime) -> Result<String, StoreError> {
    value
        .format(&Rfc3339)
        .map_err(|e| StoreError::Invalid(e.to_string()))
}

fn project_from_row(row: &SqliteRow) -> Result<Project, StoreError> {
    let id: String = row.try_get("id")?;
    let status: String = row.try_get("status")?;
    let date: String = row.try_get("date")?;
    let scenario: String = row.try_get("scenario")?;
    Ok(Project {
        id: Uuid::parse_str(&id).map_err(|e| StoreError::Invalid(e.to_string()))?,
        name: row.try_get("name")?,
        region_label: row.try_get("region")?,
        status: status
            .parse()
            .map_err(|e: anyhow::Error| StoreError::Invalid(e.to_string()))?,
        created_date: OffsetDateTime::parse(&date, &Rfc3339)
            .map_err(|e| StoreError::Invalid(e.to_string()))?,
        scenario: serde_json::from_str(&scenario)?,
    })
}

impl ProjectStore for ProjectDb {
    async fn list_projects(&self) -> Result<Vec<Project>, StoreError> {
        sqlx::query(
            r#"SELECT id, name, region, status, date, scenario FROM project ORDER BY rowid DESC"#,
        )
        .fetch_all(self.state.pool())
        .await?
        .iter()
        .map(project_from_row)
        .collect()
    }

    async fn search_projects(&self, query: &ProjectQuery) -> Result<Vec<Project>, StoreError> {
        let rows = sqlx::query(
            r#"SELECT id, name, region, status, date, scenario FROM project
            WHERE $1 IS NULL OR status = $1
            ORDER BY rowid DESC"#,
        )
        .bind(query.status.map(|s| s.as_str()))
        .fetch_all(self.state.pool())
        .await?;
        let mut found = Vec::new();
        for row in &rows {
            let project = project_from_row(row)?;
            if query.matches(&project) {
                found.push(project);
            }
        }
        tracing::debug!(?query, hits = found.len(), "Projects searched");
        Ok(found)
    }

    async fn get_project(&self, id: Uuid) -> Result<Project, StoreError> {
        let row = sqlx::query(
            r#"SELECT id, name, region, status, date, scenario FROM project WHERE id = $1"#,
        )
        .bind(id.to_string())
        .fetch_optional(self.state.pool())
        .await?
        .ok_or(StoreError::NotFound(id))?;
        project_from_row(&row)
    }

    async fn create_project(&self, project: &NewProject) -> Result<Project, StoreError> {
        let now = OffsetDateTime::now_utc();
        let created = Project {
            id: Uuid::new_v4(),
            name: project.name.clone(),
            region_label: project.region_label.clone(),
            status: project.status,
            created_date: now,
            scenario: project.scenario.clone(),
        };
        let stamp = format_time(now)?;
        sqlx::query(
            r#"INSERT INTO project (id, name, region, status, date, scenario, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)"#,
        )
        .bind(created.id.to_string())
        .bind(&created.name)
        .bind(&created.region_label)
        .bind(created.status.as_str())
        .bind(&stamp)
        .bind(serde_json::to_string(&created.scenario)?)
        .bind(&stamp)
        .execute(self.state.pool())
        .await?;
        tracing::info!(project = %created.id, name = %created.name, "Project created");
        Ok(created)
    }

    async fn update_project(
        &self,
        id: Uuid,
        update: &ProjectUpdate,
    ) -> Result<Project, StoreError> {
        let mut tx = self.state.pool().begin().await?;
        let row = sqlx::query(
            r#"SELECT id, name, region, status, date, scenario FROM project WHERE id = $1"#,
        )
        .bind(id.to_string())
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(StoreError::NotFound(id))?;

        let mut project = project_from_row(&row)?;
        update.apply(&mut project)?;

        sqlx::query(
            r#"UPDATE project
            SET name = $1, region = $2, status = $3, scenario = $4, updated_at = $5
            WHERE id = $6"#,
        )
        .bind(&project.name)
        .bind(&project.region_label)
        .bind(project.status.as_str())
        .bind(serde_json::to_string(&project.scenario)?)
        .bind(format_time(OffsetDateTime::now_utc())?)
        .bind(id.to_string())
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        tracing::info!(project = %id, "Project updated");
        Ok(project)
    }

    async fn delete_project(&self, id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query(r#"DELETE FROM project WHERE id = $1"#)
            .bind(id.to_string())
            .execute(self.state.pool())
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }
        tracing::info!(project = %id, "Project deleted");
        Ok(())
    }
}

/// Either store, picked at startup from configuration.
#[derive(Debug, Clone)]
pub enum AnyStore {
    Http(HttpProjectStore),
    Local(ProjectDb),
}

impl ProjectStore for AnyStore {
    async fn list_projects(&self) -> Result<Vec<Project>, StoreError> {
        match self {
            AnyStore::Http(store) => store.list_projects().await,
            AnyStore::Local(store) => store.list_projects().await,
        }
    }

    async fn search_projects(&self, query: &ProjectQuery) -> Result<Vec<Project>, StoreError> {
        match self {
            AnyStore::Http(store) => store.search_projects(query).await,
            AnyStore::Local(store) => store.search_projects(query).await,
        }
    }

    async fn get_project(&self, id: Uuid) -> Result<Project, StoreError> {
        match self {
            AnyStore::Http(store) => store.get_project(id).await,
            AnyStore::Local(store) => store.get_project(id).await,
        }
    }

    async fn create_project(&self, project: &NewProject) -> Result<Project, StoreError> {
        match self {
            AnyStore::Http(store) => store.create_project(project).await,
            AnyStore::Local(store) => store.create_project(project).await,
        }
    }

    async fn update_project(
        &self,
        id: Uuid,
        update: &ProjectUpdate,
    ) -> Result<Project, StoreError> {
        match self {
            AnyStore::Http(store) => store.update_project(id, update).await,
            AnyStore::Local(store) => store.update_project(id, update).await,
        }
    }

    async fn delete_project(&self, id: Uuid) -> Result<(), StoreError> {
        match self {
            AnyStore::Http(store) => store.delete_project(id).await,
            AnyStore::Local(store) => store.delete_project(id).await,
        }
    }
}
