use std::{net::SocketAddr, sync::Arc, time::Duration};

use metamorph::{
    AnalysisSettings, Coordinate, MockGenerator, NewProject, Project, ProjectDb, ProjectQuery,
    ProjectStore, ProjectUpdate, RandomTerrain, Region, StoreError, Wizard, server,
};
use tokio::{sync::oneshot, task::JoinHandle};
use uuid::Uuid;

/// Creates a ProjectDb in a temporary directory.
/// Returns both the store and the temp directory (which must be kept alive).
pub async fn create_test_store() -> (ProjectDb, tempfile::TempDir) {
    let dir = tempfile::TempDir::new().expect("Failed to create temp directory");
    let path = dir.path().join("projects.db");
    let store = ProjectDb::new(&path)
        .await
        .expect("Failed to create test store");
    (store, dir)
}

/// Four corners of a roughly 1.1 km square in central Berlin.
pub fn sample_points() -> Vec<Coordinate> {
    vec![
        Coordinate::new(52.510, 13.390),
        Coordinate::new(52.510, 13.405),
        Coordinate::new(52.520, 13.405),
        Coordinate::new(52.520, 13.390),
    ]
}

pub fn sample_region() -> Region {
    Region::new(sample_points()).expect("Sample region is valid")
}

/// Analysis settings with a short progress delay so tests run quickly.
pub fn fast_settings(target_percent: u8) -> AnalysisSettings {
    AnalysisSettings {
        target_percent,
        step_delay: Duration::from_millis(1),
        ..Default::default()
    }
}

/// Drives a fresh wizard through all steps up to Collaborate.
pub async fn run_wizard(target_percent: u8, seed: u64) -> Wizard {
    let mut wizard = Wizard::new(fast_settings(target_percent));
    assert!(wizard.start_drawing());
    for point in sample_points() {
        assert!(wizard.add_point(point));
    }
    assert!(wizard.finish_drawing());
    wizard.set_name("Mitte");
    assert!(wizard.next());

    assert!(wizard
        .import_terrain(&RandomTerrain::seeded(seed))
        .await
        .expect("Terrain import failed"));
    assert!(wizard.next());

    assert!(wizard
        .run_analysis(&MockGenerator::seeded(seed))
        .await
        .expect("Analysis failed"));
    assert!(wizard.next());
    assert!(wizard.next());
    wizard
}

/// A saved project built from a full wizard run.
pub async fn make_new_project(name: &str) -> NewProject {
    let wizard = run_wizard(25, 7).await;
    let mut project = wizard.to_new_project().expect("Wizard is ready to save");
    project.name = name.to_string();
    project
}

/// Store whose every call is rejected, as an unreachable backend would be.
pub struct FailingStore;

fn rejected() -> StoreError {
    StoreError::Rejected {
        status: 503,
        message: "service unavailable".to_string(),
    }
}

impl ProjectStore for FailingStore {
    async fn list_projects(&self) -> Result<Vec<Project>, StoreError> {
        Err(rejected())
    }

    async fn search_projects(&self, _query: &ProjectQuery) -> Result<Vec<Project>, StoreError> {
        Err(rejected())
    }

    async fn get_project(&self, _id: Uuid) -> Result<Project, StoreError> {
        Err(rejected())
    }

    async fn create_project(&self, _project: &NewProject) -> Result<Project, StoreError> {
        Err(rejected())
    }

    async fn update_project(
        &self,
        _id: Uuid,
        _update: &ProjectUpdate,
    ) -> Result<Project, StoreError> {
        Err(rejected())
    }

    async fn delete_project(&self, _id: Uuid) -> Result<(), StoreError> {
        Err(rejected())
    }
}

/// A running project API on an ephemeral port. Dropping it stops the server.
pub struct TestServer {
    pub addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl TestServer {
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        let _ = (&mut self.handle).await;
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub fn start_server<S: ProjectStore + 'static>(store: Arc<S>) -> TestServer {
    let (tx, rx) = oneshot::channel();
    let (addr, server) = server::serve(store, SocketAddr::from(([127, 0, 0, 1], 0)), async {
        let _ = rx.await;
    })
    .expect("Failed to bind test server");
    TestServer {
        addr,
        shutdown: Some(tx),
        handle: tokio::spawn(server),
    }
}
