pub mod config;
pub mod core;
pub mod server;
pub mod telemetry;

pub use crate::core::db::{
    AnyStore, HttpProjectStore, NewProject, Project, ProjectDb, ProjectQuery, ProjectStore,
    ProjectUpdate, StoreError,
};
pub use crate::core::generator::{GenerationRequest, MockGenerator, ScenarioGenerator};
pub use crate::core::geo::Coordinate;
pub use crate::core::region::{Region, RegionSelector};
pub use crate::core::scenario::{Comment, GreenZone, Priority, Scenario, ScenarioStatus, ZoneType};
pub use crate::core::terrain::{RandomTerrain, SoilType, TerrainRecord, TerrainSource, TerrainStats};
pub use crate::core::wizard::{AnalysisSettings, SaveError, Step, Wizard};
