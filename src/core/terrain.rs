use std::{collections::BTreeMap, future::Future, sync::Mutex};

use rand::{Rng, SeedableRng, rngs::StdRng, seq::IndexedRandom};
use serde::{Deserialize, Serialize};

use crate::core::{geo::Coordinate, region::Region, scenario::ZoneType};

/// Cells per axis when sampling a region for [`TerrainStats`].
pub const DEFAULT_GRID_SIZE: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SoilType {
    Clay,
    Loam,
    Sand,
    Rocky,
}

impl SoilType {
    pub const ALL: [SoilType; 4] = [
        SoilType::Clay,
        SoilType::Loam,
        SoilType::Sand,
        SoilType::Rocky,
    ];
}

impl std::fmt::Display for SoilType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            SoilType::Clay => "clay",
            SoilType::Loam => "loam",
            SoilType::Sand => "sand",
            SoilType::Rocky => "rocky",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TerrainRecord {
    /// Meters.
    pub elevation: f64,
    /// Degrees.
    pub slope: f64,
    pub soil_type: SoilType,
    pub water_presence: bool,
}

impl TerrainRecord {
    pub fn suits(&self, zone: ZoneType) -> bool {
        use SoilType::*;
        match zone {
            ZoneType::Park => self.slope < 10.0 && matches!(self.soil_type, Loam | Sand),
            ZoneType::Garden => self.slope < 5.0 && matches!(self.soil_type, Loam | Clay),
            ZoneType::Forest => self.elevation > 20.0 && matches!(self.soil_type, Loam | Clay),
            ZoneType::Wetland => self.elevation < 30.0 && self.water_presence,
        }
    }

    /// Zone types this terrain is suited to, in [`ZoneType::ALL`] order.
    pub fn suitable_zones(&self) -> Vec<ZoneType> {
        ZoneType::ALL.into_iter().filter(|z| self.suits(*z)).collect()
    }
}

/// Percent of samples per soil type. Types never sampled are absent.
pub fn soil_distribution(samples: &[TerrainRecord]) -> BTreeMap<SoilType, f64> {
    let mut counts = BTreeMap::new();
    for sample in samples {
        *counts.entry(sample.soil_type).or_insert(0usize) += 1;
    }
    let total = samples.len() as f64;
    counts
        .into_iter()
        .map(|(soil, count)| (soil, count as f64 / total * 100.0))
        .collect()
}

/// Percent of samples with surface water.
pub fn water_coverage(samples: &[TerrainRecord]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let wet = samples.iter().filter(|s| s.water_presence).count();
    wet as f64 / samples.len() as f64 * 100.0
}

/// Summary of a grid of terrain samples across a region.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TerrainStats {
    pub samples: usize,
    pub mean_elevation: f64,
    pub mean_slope: f64,
    pub soil_distribution: BTreeMap<SoilType, f64>,
    pub water_coverage: f64,
}

impl TerrainStats {
    pub fn of(samples: &[TerrainRecord]) -> Self {
        let n = samples.len().max(1) as f64;
        Self {
            samples: samples.len(),
            mean_elevation: samples.iter().map(|s| s.elevation).sum::<f64>() / n,
            mean_slope: samples.iter().map(|s| s.slope).sum::<f64>() / n,
            soil_distribution: soil_distribution(samples),
            water_coverage: water_coverage(samples),
        }
    }
}

/// Anything able to describe the terrain of a confirmed region.
pub trait TerrainSource: Send + Sync {
    fn survey(&self, region: &Region) -> impl Future<Output = anyhow::Result<TerrainRecord>> + Send;
}

/// Placeholder terrain service drawing every field uniformly at random.
#[derive(Debug)]
pub struct RandomTerrain {
    rng: Mutex<StdRng>,
}

impl RandomTerrain {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// One record per cell center of a `grid_size` x `grid_size` grid over
    /// the region's bounding box, keeping only cells inside the region.
    pub fn sample_grid(&self, region: &Region, grid_size: usize) -> Vec<TerrainRecord> {
        let bbox = region.bounding_box();
        let cells = grid_size as f64;
        let samples: Vec<TerrainRecord> = (0..grid_size)
            .flat_map(|i| (0..grid_size).map(move |j| (i, j)))
            .map(|(i, j)| {
                bbox.at_fraction((i as f64 + 0.5) / cells, (j as f64 + 0.5) / cells)
            })
            .filter(|point: &Coordinate| region.contains(*point))
            .map(|_| self.draw())
            .collect();
        tracing::debug!(grid = grid_size, samples = samples.len(), "Terrain grid sampled");
        samples
    }

    fn draw(&self) -> TerrainRecord {
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        TerrainRecord {
            elevation: rng.random_range(0.0..500.0),
            slope: rng.random_range(0.0..30.0),
            soil_type: *SoilType::ALL.choose(&mut *rng).unwrap_or(&SoilType::Loam),
            water_presence: rng.random_bool(0.5),
        }
    }
}

impl Default for RandomTerrain {
    fn default() -> Self {
        Self::new()
    }
}

impl TerrainSource for RandomTerrain {
    async fn survey(&self, region: &Region) -> anyhow::Result<TerrainRecord> {
        let record = self.draw();
        tracing::debug!(points = region.points().len(), ?record, "Terrain surveyed");
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_terrain_stays_in_range() {
        let terrain = RandomTerrain::seeded(7);
        for _ in 0..200 {
            let record = terrain.draw();
            assert!((0.0..500.0).contains(&record.elevation));
            assert!((0.0..30.0).contains(&record.slope));
        }
    }

    fn record(soil_type: SoilType, water_presence: bool) -> TerrainRecord {
        TerrainRecord {
            elevation: 40.0,
            slope: 4.0,
            soil_type,
            water_presence,
        }
    }

    #[test]
    fn stats_summarise_samples() {
        let samples = [
            record(SoilType::Clay, true),
            record(SoilType::Clay, false),
            record(SoilType::Loam, false),
            record(SoilType::Sand, true),
        ];
        let stats = TerrainStats::of(&samples);
        assert_eq!(stats.samples, 4);
        assert_eq!(stats.mean_elevation, 40.0);
        assert_eq!(stats.water_coverage, 50.0);
        assert_eq!(stats.soil_distribution.get(&SoilType::Clay), Some(&50.0));
        assert_eq!(stats.soil_distribution.get(&SoilType::Loam), Some(&25.0));
        assert!(!stats.soil_distribution.contains_key(&SoilType::Rocky));

        let empty = TerrainStats::of(&[]);
        assert_eq!(empty.samples, 0);
        assert_eq!(empty.water_coverage, 0.0);
        assert!(empty.soil_distribution.is_empty());
    }

    #[test]
    fn grid_keeps_cells_inside_region() {
        let square = Region::new(vec![
            Coordinate::new(0.0, 0.0),
            Coordinate::new(0.0, 1.0),
            Coordinate::new(1.0, 1.0),
            Coordinate::new(1.0, 0.0),
        ])
        .unwrap();
        let terrain = RandomTerrain::seeded(3);
        assert_eq!(terrain.sample_grid(&square, 10).len(), 100);

        // Apex at the north edge; rows narrow by two cells every other row
        let triangle = Region::new(vec![
            Coordinate::new(0.0, 0.0),
            Coordinate::new(0.0, 1.0),
            Coordinate::new(1.0, 0.5),
        ])
        .unwrap();
        assert_eq!(terrain.sample_grid(&triangle, 10).len(), 50);
        assert!(terrain.sample_grid(&triangle, 0).is_empty());
    }

    #[test]
    fn wetland_needs_water_and_low_ground() {
        let record = TerrainRecord {
            elevation: 10.0,
            slope: 2.0,
            soil_type: SoilType::Loam,
            water_presence: true,
        };
        assert_eq!(
            record.suitable_zones(),
            vec![ZoneType::Park, ZoneType::Garden, ZoneType::Wetland]
        );

        let dry = TerrainRecord {
            water_presence: false,
            elevation: 120.0,
            ..record
        };
        assert_eq!(
            dry.suitable_zones(),
            vec![ZoneType::Park, ZoneType::Garden, ZoneType::Forest]
        );
    }
}
