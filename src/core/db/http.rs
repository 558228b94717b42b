use reqwest::{Response, StatusCode};
use uuid::Uuid;

use crate::core::db::{
    NewProject, Project, ProjectQuery, ProjectStore, ProjectUpdate, StoreError,
};

/// Client for a remote project store speaking `/api/projects/`.
#[derive(Debug, Clone)]
pub struct HttpProjectStore {
    client: reqwest::Client,
    base_url: String,
}

impl HttpProjectStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn collection_url(&self) -> String {
        format!("{}/api/projects/", self.base_url)
    }

    fn search_url(&self) -> String {
        format!("{}/api/projects/search/", self.base_url)
    }

    fn item_url(&self, id: Uuid) -> String {
        format!("{}/api/projects/{}", self.base_url, id)
    }
}

/// Maps non-success answers onto [`StoreError`].
async fn check(response: Response, id: Option<Uuid>) -> Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if let (StatusCode::NOT_FOUND, Some(id)) = (status, id) {
        return Err(StoreError::NotFound(id));
    }
    let message = response.text().await.unwrap_or_default();
    tracing::error!(status = status.as_u16(), %message, "Project store rejected request");
    Err(StoreError::Rejected {
        status: status.as_u16(),
        message,
    })
}

impl ProjectStore for HttpProjectStore {
    async fn list_projects(&self) -> Result<Vec<Project>, StoreError> {
        let response = self.client.get(self.collection_url()).send().await?;
        Ok(check(response, None).await?.json().await?)
    }

    async fn search_projects(&self, query: &ProjectQuery) -> Result<Vec<Project>, StoreError> {
        let response = self.client.get(self.search_url()).query(query).send().await?;
        Ok(check(response, None).await?.json().await?)
    }

    async fn get_project(&self, id: Uuid) -> Result<Project, StoreError> {
        let response = self.client.get(self.item_url(id)).send().await?;
        Ok(check(response, Some(id)).await?.json().await?)
    }

    async fn create_project(&self, project: &NewProject) -> Result<Project, StoreError> {
        let response = self
            .client
            .post(self.collection_url())
            .json(project)
            .send()
            .await?;
        let created: Project = check(response, None).await?.json().await?;
        tracing::info!(project = %created.id, "Project created remotely");
        Ok(created)
    }

    async fn update_project(
        &self,
        id: Uuid,
        update: &ProjectUpdate,
    ) -> Result<Project, StoreError> {
        let response = self
            .client
            .put(self.item_url(id))
            .json(update)
            .send()
            .await?;
        Ok(check(response, Some(id)).await?.json().await?)
    }

    async fn delete_project(&self, id: Uuid) -> Result<(), StoreError> {
        let response = self.client.delete(self.item_url(id)).send().await?;
        check(response, Some(id)).await?;
        Ok(())
    }
}
