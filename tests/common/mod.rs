mod fixtures;
pub use fixtures::*;

// Re-export commonly used types from metamorph for tests
pub use metamorph::{
    AnalysisSettings, Coordinate, HttpProjectStore, MockGenerator, NewProject, Priority, Project,
    ProjectDb, ProjectQuery, ProjectStore, ProjectUpdate, RandomTerrain, Region, Scenario,
    ScenarioGenerator, ScenarioStatus, Step, StoreError, Wizard, ZoneType,
};
