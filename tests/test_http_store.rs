//! Integration tests for the HTTP project store client against the project API.
//!
//! Tests cover:
//! - CRUD through `/api/projects/`
//! - 404 mapping to `StoreError::NotFound`
//! - Forward-only status over HTTP, for both `status` and `scenario.status`
//! - Search through `/api/projects/search/`
//! - Health and export endpoints

mod common;

use std::sync::Arc;

use metamorph::core::db::{approve, share};
use serde_json::Value;

use common::*;

#[tokio::test]
async fn test_http_crud_round_trip() -> anyhow::Result<()> {
    let (db, _temp_dir) = create_test_store().await;
    let server = start_server(Arc::new(db));
    let client = HttpProjectStore::new(format!("{}/", server.base_url()));

    assert!(client.list_projects().await?.is_empty());

    let created = client.create_project(&make_new_project("Canal Park").await).await?;
    assert_eq!(created.name, "Canal Park");
    assert_eq!(created.status, ScenarioStatus::Draft);

    let fetched = client.get_project(created.id).await?;
    assert_eq!(fetched.id, created.id);
    assert_eq!(fetched.scenario.green_zones.len(), created.scenario.green_zones.len());

    let update = ProjectUpdate {
        region_label: Some("Neukölln".to_string()),
        ..Default::default()
    };
    let updated = client.update_project(created.id, &update).await?;
    assert_eq!(updated.region_label, "Neukölln");
    assert_eq!(updated.name, "Canal Park");

    client.delete_project(created.id).await?;
    assert!(client.list_projects().await?.is_empty());

    server.stop().await;
    Ok(())
}

#[tokio::test]
async fn test_http_not_found() -> anyhow::Result<()> {
    let (db, _temp_dir) = create_test_store().await;
    let server = start_server(Arc::new(db));
    let client = HttpProjectStore::new(server.base_url());
    let id = uuid::Uuid::new_v4();

    assert!(client.get_project(id).await.is_err_and(|e| e.is_not_found()));
    assert!(client.delete_project(id).await.is_err_and(|e| e.is_not_found()));

    server.stop().await;
    Ok(())
}

#[tokio::test]
async fn test_http_status_is_forward_only() -> anyhow::Result<()> {
    let (db, _temp_dir) = create_test_store().await;
    let server = start_server(Arc::new(db));
    let client = HttpProjectStore::new(server.base_url());
    let project = client.create_project(&make_new_project("Lakeside").await).await?;

    let shared = share(&client, &project).await?;
    assert_eq!(shared.status, ScenarioStatus::Shared);
    assert!(approve(&client, &shared).await.is_err());

    // The server refuses a regression even when the client skips the check
    let regress = ProjectUpdate {
        status: Some(ScenarioStatus::Draft),
        ..Default::default()
    };
    let err = client
        .update_project(project.id, &regress)
        .await
        .expect_err("Server rejects backwards transitions");
    assert!(matches!(err, StoreError::Rejected { status: 409, .. }));

    server.stop().await;
    Ok(())
}

#[tokio::test]
async fn test_http_rejects_stale_draft_scenario() -> anyhow::Result<()> {
    let (db, _temp_dir) = create_test_store().await;
    let server = start_server(Arc::new(db));
    let client = HttpProjectStore::new(server.base_url());
    let project = client.create_project(&make_new_project("Millpond").await).await?;
    let approved = approve(&client, &project).await?;
    assert_eq!(approved.scenario.status, ScenarioStatus::Completed);

    // Pushing back the scenario as it was before approval would revert it to draft
    let stale = ProjectUpdate {
        scenario: Some(project.scenario.clone()),
        ..Default::default()
    };
    let err = client
        .update_project(project.id, &stale)
        .await
        .expect_err("Server rejects a draft scenario on a completed project");
    assert!(matches!(err, StoreError::Rejected { status: 409, .. }));

    let fetched = client.get_project(project.id).await?;
    assert_eq!(fetched.status, ScenarioStatus::Completed);
    assert_eq!(fetched.scenario.status, ScenarioStatus::Completed);

    server.stop().await;
    Ok(())
}

#[tokio::test]
async fn test_http_rejects_illegal_scenario_status() -> anyhow::Result<()> {
    let (db, _temp_dir) = create_test_store().await;
    let server = start_server(Arc::new(db));
    let client = HttpProjectStore::new(server.base_url());
    let project = client.create_project(&make_new_project("Orchard").await).await?;

    // Completed and shared are both terminal, so they cannot meet in one update
    let mut scenario = project.scenario.clone();
    scenario.status = ScenarioStatus::Completed;
    let mixed = ProjectUpdate {
        status: Some(ScenarioStatus::Shared),
        scenario: Some(scenario),
        ..Default::default()
    };
    let err = client
        .update_project(project.id, &mixed)
        .await
        .expect_err("Server rejects a mismatched scenario status");
    assert!(matches!(err, StoreError::Rejected { status: 409, .. }));

    let fetched = client.get_project(project.id).await?;
    assert_eq!(fetched.status, ScenarioStatus::Draft);
    assert_eq!(fetched.scenario.status, ScenarioStatus::Draft);

    server.stop().await;
    Ok(())
}

#[tokio::test]
async fn test_http_status_only_update_moves_scenario() -> anyhow::Result<()> {
    let (db, _temp_dir) = create_test_store().await;
    let server = start_server(Arc::new(db));
    let client = HttpProjectStore::new(server.base_url());
    let project = client.create_project(&make_new_project("Towpath").await).await?;

    let update = ProjectUpdate {
        status: Some(ScenarioStatus::Shared),
        ..Default::default()
    };
    let updated = client.update_project(project.id, &update).await?;
    assert_eq!(updated.status, ScenarioStatus::Shared);
    assert_eq!(updated.scenario.status, ScenarioStatus::Shared);

    let fetched = client.get_project(project.id).await?;
    assert_eq!(fetched.scenario.status, ScenarioStatus::Shared);
    assert_eq!(fetched.scenario.id, project.scenario.id);

    server.stop().await;
    Ok(())
}

#[tokio::test]
async fn test_http_search() -> anyhow::Result<()> {
    let (db, _temp_dir) = create_test_store().await;
    let server = start_server(Arc::new(db));
    let client = HttpProjectStore::new(server.base_url());
    let canal = client.create_project(&make_new_project("Canal Walk").await).await?;
    let mut dock = make_new_project("Dockside Garden").await;
    dock.region_label = "Hafen".to_string();
    let dock = client.create_project(&dock).await?;
    share(&client, &dock).await?;

    let query = ProjectQuery {
        query: Some("walk".to_string()),
        ..Default::default()
    };
    let found = client.search_projects(&query).await?;
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, canal.id);

    let query = ProjectQuery {
        region: Some("HAF".to_string()),
        status: Some(ScenarioStatus::Shared),
        ..Default::default()
    };
    let found = client.search_projects(&query).await?;
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, dock.id);
    assert_eq!(found[0].scenario.status, ScenarioStatus::Shared);

    assert_eq!(client.search_projects(&ProjectQuery::default()).await?.len(), 2);

    // Unknown status values are a bad request
    let bad = reqwest::get(format!(
        "{}/api/projects/search/?status=archived",
        server.base_url()
    ))
    .await?;
    assert_eq!(bad.status(), reqwest::StatusCode::BAD_REQUEST);

    server.stop().await;
    Ok(())
}

#[tokio::test]
async fn test_unreachable_store_is_an_error() -> anyhow::Result<()> {
    let (db, _temp_dir) = create_test_store().await;
    let server = start_server(Arc::new(db));
    let base_url = server.base_url();
    server.stop().await;

    let client = HttpProjectStore::new(base_url);
    let err = client.list_projects().await.expect_err("Server is gone");
    assert!(matches!(err, StoreError::Http(_)));

    Ok(())
}

#[tokio::test]
async fn test_health_and_export_endpoints() -> anyhow::Result<()> {
    let (db, _temp_dir) = create_test_store().await;
    let project = db.create_project(&make_new_project("Export Me").await).await?;
    let server = start_server(Arc::new(db));
    let http = reqwest::Client::new();

    let health: Value = http
        .get(format!("{}/health", server.base_url()))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(health["status"], "healthy");

    let exported: Value = http
        .get(format!("{}/api/projects/{}/export", server.base_url(), project.id))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(exported["name"], "Export Me");
    assert_eq!(exported["region"], "Mitte");

    let geojson: Value = http
        .get(format!("{}/api/projects/{}/export?format=geojson", server.base_url(), project.id))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(geojson["type"], "FeatureCollection");
    let features = geojson["features"].as_array().expect("Feature array");
    assert_eq!(features.len(), 1 + project.scenario.green_zones.len());

    let bad = http
        .get(format!("{}/api/projects/{}/export?format=kml", server.base_url(), project.id))
        .send()
        .await?;
    assert_eq!(bad.status(), reqwest::StatusCode::BAD_REQUEST);

    let missing = http
        .get(format!("{}/api/projects/{}/export", server.base_url(), uuid::Uuid::new_v4()))
        .send()
        .await?;
    assert_eq!(missing.status(), reqwest::StatusCode::NOT_FOUND);

    server.stop().await;
    Ok(())
}

#[tokio::test]
async fn test_failing_store_maps_to_server_error() -> anyhow::Result<()> {
    let server = start_server(Arc::new(FailingStore));
    let client = HttpProjectStore::new(server.base_url());

    let err = client.list_projects().await.expect_err("Backend fails");
    assert!(matches!(err, StoreError::Rejected { status: 500, .. }));

    server.stop().await;
    Ok(())
}
