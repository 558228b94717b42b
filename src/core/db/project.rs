use std::future::Future;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::core::{
    db::StoreError,
    scenario::{Scenario, ScenarioStatus, StatusError},
};

/// The persisted unit: one named scenario plus metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "region")]
    pub region_label: String,
    pub status: ScenarioStatus,
    #[serde(rename = "date", with = "time::serde::rfc3339")]
    pub created_date: OffsetDateTime,
    pub scenario: Scenario,
}

/// Body of a create call. The store assigns `id` and `date`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProject {
    pub name: String,
    #[serde(rename = "region")]
    pub region_label: String,
    #[serde(default)]
    pub status: ScenarioStatus,
    pub scenario: Scenario,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, rename = "region", skip_serializing_if = "Option::is_none")]
    pub region_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ScenarioStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scenario: Option<Scenario>,
}

fn check_forward(from: ScenarioStatus, to: ScenarioStatus) -> Result<(), StatusError> {
    if from == to || from.can_transition_to(to) {
        Ok(())
    } else {
        Err(StatusError { from, to })
    }
}

impl ProjectUpdate {
    /// Applies the update, keeping `status` and `scenario.status` in step.
    ///
    /// A status-only update moves the stored scenario along with it. A new
    /// scenario may only carry its predecessor's status or a forward move
    /// from it. On error `project` is left untouched.
    pub fn apply(&self, project: &mut Project) -> Result<(), StatusError> {
        let mut scenario = self
            .scenario
            .clone()
            .unwrap_or_else(|| project.scenario.clone());
        check_forward(project.scenario.status, scenario.status)?;
        let status = self.status.unwrap_or(scenario.status);
        check_forward(project.status, status)?;
        if scenario.status != status {
            scenario.transition(status)?;
        }

        if let Some(name) = &self.name {
            project.name = name.clone();
        }
        if let Some(region_label) = &self.region_label {
            project.region_label = region_label.clone();
        }
        project.status = status;
        project.scenario = scenario;
        Ok(())
    }
}

/// Filters for [`ProjectStore::search_projects`]. Every field that is set must match.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectQuery {
    /// Case-insensitive substring of the project name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    /// Case-insensitive substring of the region label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ScenarioStatus>,
}

fn contains_folded(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

impl ProjectQuery {
    pub fn is_empty(&self) -> bool {
        self.query.is_none() && self.region.is_none() && self.status.is_none()
    }

    pub fn matches(&self, project: &Project) -> bool {
        self.query
            .as_deref()
            .is_none_or(|q| contains_folded(&project.name, q))
            && self
                .region
                .as_deref()
                .is_none_or(|r| contains_folded(&project.region_label, r))
            && self.status.is_none_or(|s| project.status == s)
    }
}

/// CRUD access to saved projects.
pub trait ProjectStore: Send + Sync {
    fn list_projects(&self) -> impl Future<Output = Result<Vec<Project>, StoreError>> + Send;
    /// Projects matching `query`, in [`ProjectStore::list_projects`] order.
    fn search_projects(
        &self,
        query: &ProjectQuery,
    ) -> impl Future<Output = Result<Vec<Project>, StoreError>> + Send;
    fn get_project(&self, id: Uuid) -> impl Future<Output = Result<Project, StoreError>> + Send;
    fn create_project(
        &self,
        project: &NewProject,
    ) -> impl Future<Output = Result<Project, StoreError>> + Send;
    fn update_project(
        &self,
        id: Uuid,
        update: &ProjectUpdate,
    ) -> impl Future<Output = Result<Project, StoreError>> + Send;
    fn delete_project(&self, id: Uuid) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// Moves a saved project's scenario forward and pushes `{status, scenario}`.
///
/// Illegal transitions fail before the store is contacted.
pub async fn advance_status<S: ProjectStore>(
    store: &S,
    project: &Project,
    next: ScenarioStatus,
) -> Result<Project, StoreError> {
    let mut scenario = project.scenario.clone();
    scenario.transition(next)?;
    let update = ProjectUpdate {
        status: Some(next),
        scenario: Some(scenario),
        ..Default::default()
    };
    let updated = store.update_project(project.id, &update).await?;
    tracing::info!(project = %project.id, status = %next, "Project status updated");
    Ok(updated)
}

pub async fn approve<S: ProjectStore>(store: &S, project: &Project) -> Result<Project, StoreError> {
    advance_status(store, project, ScenarioStatus::Completed).await
}

pub async fn share<S: ProjectStore>(store: &S, project: &Project) -> Result<Project, StoreError> {
    advance_status(store, project, ScenarioStatus::Shared).await
}
