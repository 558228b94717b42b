use serde::{Deserialize, Serialize};

use crate::core::geo::{self, BoundingBox, Coordinate, polygon_area_m2};

/// Fewest points that close a polygon.
pub const MIN_REGION_POINTS: usize = 3;

/// A confirmed analysis boundary. Always holds at least [`MIN_REGION_POINTS`]
/// points and cannot be changed once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Coordinate>", into = "Vec<Coordinate>")]
pub struct Region {
    points: Vec<Coordinate>,
}

impl Region {
    pub fn new(points: Vec<Coordinate>) -> anyhow::Result<Self> {
        if points.len() < MIN_REGION_POINTS {
            anyhow::bail!(
                "A region needs at least {} points, got {}",
                MIN_REGION_POINTS,
                points.len()
            );
        }
        if let Some(bad) = points.iter().find(|p| !p.is_valid()) {
            anyhow::bail!("Region point out of range: {:?}", bad);
        }
        Ok(Self { points })
    }

    pub fn points(&self) -> &[Coordinate] {
        &self.points
    }

    pub fn bounding_box(&self) -> BoundingBox {
        // Non-empty by construction.
        BoundingBox::of(&self.points).unwrap_or(BoundingBox {
            min_lat: 0.0,
            min_lng: 0.0,
            max_lat: 0.0,
            max_lng: 0.0,
        })
    }

    pub fn area_m2(&self) -> f64 {
        polygon_area_m2(&self.points)
    }

    pub fn contains(&self, point: Coordinate) -> bool {
        geo::contains(&self.points, point)
    }
}

impl TryFrom<Vec<Coordinate>> for Region {
    type Error = anyhow::Error;

    fn try_from(points: Vec<Coordinate>) -> Result<Self, Self::Error> {
        Region::new(points)
    }
}

impl From<Region> for Vec<Coordinate> {
    fn from(region: Region) -> Self {
        region.points
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectorMode {
    Idle,
    Drawing,
}

/// Accumulates map clicks into a [`Region`].
///
/// Points are only accepted while drawing. `finish` below the threshold is
/// ignored and leaves the selector drawing.
#[derive(Debug, Clone)]
pub struct RegionSelector {
    mode: SelectorMode,
    points: Vec<Coordinate>,
}

impl Default for RegionSelector {
    fn default() -> Self {
        Self {
            mode: SelectorMode::Idle,
            points: Vec::new(),
        }
    }
}

impl RegionSelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> SelectorMode {
        self.mode
    }

    pub fn is_drawing(&self) -> bool {
        self.mode == SelectorMode::Drawing
    }

    /// Starts a fresh drawing, dropping any earlier partial points.
    pub fn start(&mut self) {
        self.mode = SelectorMode::Drawing;
        self.points.clear();
    }

    /// Returns whether the point was taken.
    pub fn add_point(&mut self, point: Coordinate) -> bool {
        if !self.is_drawing() || !point.is_valid() {
            return false;
        }
        self.points.push(point);
        true
    }

    /// Points drawn so far, for the live preview polygon.
    pub fn preview(&self) -> &[Coordinate] {
        &self.points
    }

    pub fn can_finish(&self) -> bool {
        self.is_drawing() && self.points.len() >= MIN_REGION_POINTS
    }

    pub fn finish(&mut self) -> Option<Region> {
        if !self.can_finish() {
            return None;
        }
        let region = Region::new(std::mem::take(&mut self.points)).ok()?;
        self.mode = SelectorMode::Idle;
        Some(region)
    }

    pub fn cancel(&mut self) {
        self.points.clear();
        self.mode = SelectorMode::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pt(i: usize) -> Coordinate {
        Coordinate::new(51.0 + i as f64 * 0.001, -0.1 - i as f64 * 0.002)
    }

    #[test]
    fn points_rejected_when_idle() {
        let mut selector = RegionSelector::new();
        assert!(!selector.add_point(pt(0)));
        assert!(selector.preview().is_empty());
    }

    #[test]
    fn finish_below_threshold_keeps_drawing() {
        let mut selector = RegionSelector::new();
        selector.start();
        selector.add_point(pt(0));
        selector.add_point(pt(1));
        assert!(selector.finish().is_none());
        assert!(selector.is_drawing());
        assert_eq!(selector.preview().len(), 2);

        selector.add_point(pt(2));
        let region = selector.finish().unwrap();
        assert_eq!(region.points(), &[pt(0), pt(1), pt(2)]);
        assert_eq!(selector.mode(), SelectorMode::Idle);
        assert!(selector.preview().is_empty());
    }

    #[test]
    fn cancel_discards_points() {
        let mut selector = RegionSelector::new();
        selector.start();
        for i in 0..4 {
            selector.add_point(pt(i));
        }
        selector.cancel();
        assert!(!selector.is_drawing());
        assert!(selector.preview().is_empty());
        assert!(selector.finish().is_none());
    }

    #[test]
    fn region_deserialization_enforces_minimum() {
        let json = r#"[{"lat":1.0,"lng":1.0},{"lat":2.0,"lng":2.0}]"#;
        assert!(serde_json::from_str::<Region>(json).is_err());
    }
}
