use serde::{Deserialize, Serialize};

/// Mean earth radius in meters.
const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// A geographic point in WGS84 degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

impl std::str::FromStr for Coordinate {
    type Err = anyhow::Error;

    /// Parses `"lat,lng"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (lat, lng) = s
            .split_once(',')
            .ok_or_else(|| anyhow::anyhow!("Expected \"lat,lng\", got {:?}", s))?;
        let coord = Coordinate {
            lat: lat.trim().parse()?,
            lng: lng.trim().parse()?,
        };
        if !coord.is_valid() {
            anyhow::bail!("Coordinate out of range: {}", s);
        }
        Ok(coord)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub min_lng: f64,
    pub max_lat: f64,
    pub max_lng: f64,
}

impl BoundingBox {
    /// Smallest box enclosing all points. `None` for an empty slice.
    pub fn of(points: &[Coordinate]) -> Option<Self> {
        let first = points.first()?;
        let init = BoundingBox {
            min_lat: first.lat,
            min_lng: first.lng,
            max_lat: first.lat,
            max_lng: first.lng,
        };
        Some(points.iter().skip(1).fold(init, |b, p| BoundingBox {
            min_lat: b.min_lat.min(p.lat),
            min_lng: b.min_lng.min(p.lng),
            max_lat: b.max_lat.max(p.lat),
            max_lng: b.max_lng.max(p.lng),
        }))
    }

    pub fn lat_span(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    pub fn lng_span(&self) -> f64 {
        self.max_lng - self.min_lng
    }

    /// Point at fractional offsets `(fx, fy)` from the south-west corner.
    pub fn at_fraction(&self, fx: f64, fy: f64) -> Coordinate {
        Coordinate {
            lat: self.min_lat + self.lat_span() * fy,
            lng: self.min_lng + self.lng_span() * fx,
        }
    }
}

/// Arithmetic mean of the vertices.
pub fn centroid(points: &[Coordinate]) -> Option<Coordinate> {
    if points.is_empty() {
        return None;
    }
    let n = points.len() as f64;
    let (lat, lng) = points
        .iter()
        .fold((0.0, 0.0), |(lat, lng), p| (lat + p.lat, lng + p.lng));
    Some(Coordinate::new(lat / n, lng / n))
}

/// Planar area of a simple polygon in square meters.
///
/// Vertices are projected equirectangularly about their mean latitude, which is
/// accurate enough at neighbourhood scale. The ring may be open or closed.
pub fn polygon_area_m2(points: &[Coordinate]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let Some(center) = centroid(points) else {
        return 0.0;
    };
    let cos_lat = center.lat.to_radians().cos();
    let project = |p: &Coordinate| {
        (
            EARTH_RADIUS_M * p.lng.to_radians() * cos_lat,
            EARTH_RADIUS_M * p.lat.to_radians(),
        )
    };

    let mut twice_area = 0.0;
    for (i, a) in points.iter().enumerate() {
        let b = &points[(i + 1) % points.len()];
        let (x1, y1) = project(a);
        let (x2, y2) = project(b);
        twice_area += x1 * y2 - x2 * y1;
    }
    (twice_area / 2.0).abs()
}

/// Even-odd ray casting. Points exactly on an edge may land either side.
pub fn contains(polygon: &[Coordinate], point: Coordinate) -> bool {
    if polygon.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = polygon.len() - 1;
    for (i, a) in polygon.iter().enumerate() {
        let b = &polygon[j];
        if (a.lat > point.lat) != (b.lat > point.lat)
            && point.lng < (b.lng - a.lng) * (point.lat - a.lat) / (b.lat - a.lat) + a.lng
        {
            inside = !inside;
        }
        j = i;
    }
    inside
}
