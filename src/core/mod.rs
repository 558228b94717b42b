pub mod db;
pub mod export;
pub mod generator;
pub mod geo;
pub mod map;
pub mod metrics;
pub mod progress;
pub mod region;
pub mod scenario;
pub mod terrain;
pub mod wizard;
