use std::{future::Future, ops::RangeInclusive, sync::Mutex};

use rand::{Rng, SeedableRng, rngs::StdRng};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::core::{
    geo::{BoundingBox, Coordinate, polygon_area_m2},
    region::Region,
    scenario::{GreenZone, Priority, Scenario, ScenarioStatus, ZoneType},
};

pub const TARGET_RANGE: RangeInclusive<u8> = 10..=50;
pub const SUSTAINABILITY_RANGE: RangeInclusive<u8> = 70..=99;
pub const ACCESSIBILITY_RANGE: RangeInclusive<u8> = 75..=99;
pub const POPULATION_RANGE: std::ops::Range<u32> = 100_000..150_000;

/// Input to a scenario generator.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub region: Region,
    /// Green-space target percent, clamped into [`TARGET_RANGE`].
    pub target_percent: u8,
    pub priority: Priority,
}

impl GenerationRequest {
    pub fn new(region: Region, target_percent: u8, priority: Priority) -> Self {
        Self {
            region,
            target_percent: clamp_target(target_percent),
            priority,
        }
    }
}

pub fn clamp_target(target: u8) -> u8 {
    target.clamp(*TARGET_RANGE.start(), *TARGET_RANGE.end())
}

/// `max(3, floor(target / 8) + 1)`
pub fn zone_count(target_percent: u8) -> usize {
    (target_percent as usize / 8 + 1).max(3)
}

/// Capability that turns a region and planning goals into a scenario.
///
/// The wizard only talks to this trait, so a trained optimizer can replace
/// [`MockGenerator`] without touching callers.
pub trait ScenarioGenerator: Send + Sync {
    fn generate(
        &self,
        request: &GenerationRequest,
    ) -> impl Future<Output = anyhow::Result<Scenario>> + Send;
}

/// Half the side of a zone footprint, in degrees.
fn half_extent(zone_type: ZoneType) -> f64 {
    match zone_type {
        ZoneType::Park => 0.0020,
        ZoneType::Garden => 0.0008,
        ZoneType::Forest => 0.0030,
        ZoneType::Wetland => 0.0015,
    }
}

fn zone_label(zone_type: ZoneType) -> &'static str {
    match zone_type {
        ZoneType::Park => "Community Park",
        ZoneType::Garden => "Pocket Garden",
        ZoneType::Forest => "Urban Forest",
        ZoneType::Wetland => "Retention Wetland",
    }
}

/// Fractional position of zone `index` inside the bounding box. Stays within
/// the inner 80% of each axis.
fn placement(index: usize) -> (f64, f64) {
    let i = index as f64;
    let fx = 0.1 + (0.2 + i * 0.37).fract() * 0.8;
    let fy = 0.1 + (0.3 + i * 0.53).fract() * 0.8;
    (fx, fy)
}

/// Half side for a zone of `zone_type` placed inside `bbox`.
///
/// [`placement`] keeps centers at least a tenth of each span away from the
/// edges, so the footprint shrinks in regions too small to hold it whole.
fn fitted_half_extent(zone_type: ZoneType, bbox: &BoundingBox) -> f64 {
    let half = half_extent(zone_type);
    let room = 0.1 * bbox.lat_span().min(bbox.lng_span());
    if room > 0.0 { half.min(room) } else { half }
}

/// Axis-aligned square of the given half side centered on `center`,
/// counter-clockwise from the south-west corner.
///
/// The center is pulled in from the poles and the antimeridian so every
/// corner is a valid coordinate.
pub fn square_around(center: Coordinate, half: f64) -> Vec<Coordinate> {
    let half = half.min(90.0);
    let lat = center.lat.clamp(-90.0 + half, 90.0 - half);
    let lng = center.lng.clamp(-180.0 + half, 180.0 - half);
    let corner = |dlat: f64, dlng: f64| {
        Coordinate::new(
            (lat + dlat).clamp(-90.0, 90.0),
            (lng + dlng).clamp(-180.0, 180.0),
        )
    };
    vec![
        corner(-half, -half),
        corner(-half, half),
        corner(half, half),
        corner(half, -half),
    ]
}

/// Stand-in for the optimization engine: lays out zones by formula and draws
/// scores at random.
///
/// `priority` is recorded in the scenario name and otherwise ignored.
#[derive(Debug)]
pub struct MockGenerator {
    rng: Mutex<StdRng>,
}

impl MockGenerator {
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

    fn zones(&self, request: &GenerationRequest) -> Vec<GreenZone> {
        let bbox = request.region.bounding_box();
        (0..zone_count(request.target_percent))
            .map(|index| {
                let zone_type = ZoneType::ALL[index % ZoneType::ALL.len()];
                let (fx, fy) = placement(index);
                let half = fitted_half_extent(zone_type, &bbox);
                let coordinates = square_around(bbox.at_fraction(fx, fy), half);
                GreenZone {
                    id: Uuid::new_v4(),
                    name: format!("{} {}", zone_label(zone_type), index + 1),
                    area: polygon_area_m2(&coordinates),
                    zone_type,
                    coordinates,
                }
            })
            .collect()
    }

    fn build(&self, request: &GenerationRequest) -> Scenario {
        let green_zones = self.zones(request);
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        Scenario {
            id: Uuid::new_v4(),
            name: format!(
                "Green plan: {} ({}% target)",
                request.priority.as_str(),
                request.target_percent
            ),
            created_at: OffsetDateTime::now_utc(),
            region: request.region.clone(),
            green_zones,
            coverage_percent: f64::from(request.target_percent),
            sustainability_score: rng.random_range(SUSTAINABILITY_RANGE),
            accessibility_score: rng.random_range(ACCESSIBILITY_RANGE),
            population_served: rng.random_range(POPULATION_RANGE),
            status: ScenarioStatus::Draft,
            comments: Vec::new(),
        }
    }
}

impl Default for MockGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl ScenarioGenerator for MockGenerator {
    async fn generate(&self, request: &GenerationRequest) -> anyhow::Result<Scenario> {
        let scenario = self.build(request);
        tracing::info!(
            zones = scenario.green_zones.len(),
            target = request.target_percent,
            priority = request.priority.as_str(),
            "Scenario generated"
        );
        Ok(scenario)
    }
}
