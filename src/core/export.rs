use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::core::{db::Project, geo::Coordinate, scenario::Scenario};

/// Used when nothing of the display name survives [`slugify`].
pub const FALLBACK_SLUG: &str = "project";

/// Lowercases and turns each run of whitespace into a single `-`.
///
/// Only alphanumerics, `-` and `_` are kept, so the result is always a
/// plain file name inside the export directory.
pub fn slugify(name: &str) -> String {
    let slug = name
        .to_lowercase()
        .split_whitespace()
        .map(|word| {
            word.chars()
                .filter(|c| c.is_alphanumeric() || matches!(c, '-' | '_'))
                .collect::<String>()
        })
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join("-");
    if slug.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        slug
    }
}

pub fn export_file_name(display_name: &str) -> String {
    format!("{}.json", slugify(display_name))
}

pub fn to_pretty_json<T: Serialize>(value: &T) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Writes `value` as pretty JSON to `<dir>/<slug>.json` and returns the path.
pub fn write_json<T: Serialize>(
    dir: &Path,
    display_name: &str,
    value: &T,
) -> anyhow::Result<PathBuf> {
    let path = dir.join(export_file_name(display_name));
    std::fs::write(&path, to_pretty_json(value)?)
        .with_context(|| format!("Failed to write export {:?}", path))?;
    tracing::info!(path = ?path, "Export written");
    Ok(path)
}

/// Reduced view handed out by the share action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShareSummary {
    pub name: String,
    pub coverage: f64,
    pub sustainability: u8,
    pub accessibility: u8,
    pub zones: usize,
}

impl From<&Scenario> for ShareSummary {
    fn from(scenario: &Scenario) -> Self {
        Self {
            name: scenario.name.clone(),
            coverage: scenario.coverage_percent,
            sustainability: scenario.sustainability_score,
            accessibility: scenario.accessibility_score,
            zones: scenario.green_zones.len(),
        }
    }
}

pub fn share_text(scenario: &Scenario) -> anyhow::Result<String> {
    to_pretty_json(&ShareSummary::from(scenario))
}

/// Closed `[lng, lat]` ring.
fn ring(points: &[Coordinate]) -> Vec<[f64; 2]> {
    let mut ring: Vec<[f64; 2]> = points.iter().map(|p| [p.lng, p.lat]).collect();
    if let Some(first) = ring.first().copied() {
        ring.push(first);
    }
    ring
}

fn polygon(points: &[Coordinate]) -> Value {
    json!({ "type": "Polygon", "coordinates": [ring(points)] })
}

/// GeoJSON `FeatureCollection` with the region outline and every zone.
pub fn geojson(project: &Project) -> Value {
    let scenario = &project.scenario;
    let mut features = vec![json!({
        "type": "Feature",
        "properties": {
            "name": format!("{} - Region", project.name),
            "type": "region",
        },
        "geometry": polygon(scenario.region.points()),
    })];
    features.extend(
        scenario
            .green_zones
            .iter()
            .filter(|z| !z.coordinates.is_empty())
            .map(|z| {
                json!({
                    "type": "Feature",
                    "properties": {
                        "id": z.id,
                        "name": z.name,
                        "type": z.zone_type,
                        "area": z.area,
                    },
                    "geometry": polygon(&z.coordinates),
                })
            }),
    );
    json!({ "type": "FeatureCollection", "features": features })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Json,
    Geojson,
}

impl std::str::FromStr for ExportFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "geojson" => Ok(ExportFormat::Geojson),
            other => Err(anyhow::anyhow!("Unsupported export format: {}", other)),
        }
    }
}

pub fn render(project: &Project, format: ExportFormat) -> anyhow::Result<Value> {
    Ok(match format {
        ExportFormat::Json => serde_json::to_value(project)?,
        ExportFormat::Geojson => geojson(project),
    })
}

/// Writes `project` to `<dir>/<slug>.json` or `<dir>/<slug>.geojson`.
pub fn write_export(
    dir: &Path,
    project: &Project,
    format: ExportFormat,
) -> anyhow::Result<PathBuf> {
    match format {
        ExportFormat::Json => write_json(dir, &project.name, project),
        ExportFormat::Geojson => {
            let path = dir.join(format!("{}.geojson", slugify(&project.name)));
            std::fs::write(&path, to_pretty_json(&geojson(project))?)
                .with_context(|| format!("Failed to write export {:?}", path))?;
            tracing::info!(path = ?path, "GeoJSON export written");
            Ok(path)
        }
    }
}
