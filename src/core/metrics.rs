//! Derived indicators for a generated scenario.
//!
//! Nothing here feeds back into the scenario; in particular the geometric
//! coverage is reported next to, not instead of, `coverage_percent`.

use serde::Serialize;

use crate::core::{
    geo::{centroid, polygon_area_m2},
    scenario::{GreenZone, Scenario, ZoneType},
};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentalImpact {
    pub air_quality: f64,
    pub carbon_sequestration: f64,
    pub biodiversity: f64,
    pub water_management: f64,
    pub heat_island_reduction: f64,
    pub noise_reduction: f64,
}

impl EnvironmentalImpact {
    pub fn score(&self) -> f64 {
        (self.air_quality
            + self.carbon_sequestration
            + self.biodiversity
            + self.water_management
            + self.heat_island_reduction
            + self.noise_reduction)
            / 6.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SocialImpact {
    /// The scenario's accessibility score.
    pub community_access: f64,
    pub recreation: f64,
    pub health_benefits: f64,
    pub social_cohesion: f64,
    pub property_value_impact: f64,
    pub equity_distribution: f64,
}

impl SocialImpact {
    pub fn score(&self) -> f64 {
        (self.community_access
            + self.recreation
            + self.health_benefits
            + self.social_cohesion
            + self.property_value_impact
            + self.equity_distribution)
            / 6.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImpactReport {
    pub total_green_area: f64,
    pub zone_count: usize,
    /// Normalised Shannon diversity of zone types, 0-100.
    pub zone_diversity: f64,
    /// Zone area over region area, in percent.
    pub geometric_coverage: f64,
    pub environmental: EnvironmentalImpact,
    pub social: SocialImpact,
    pub recommendations: Vec<String>,
    pub environmental_recommendations: Vec<String>,
    pub community_benefits: Vec<String>,
}

struct ZoneFactors {
    sequestration: f64,
    biodiversity: f64,
    cooling: f64,
    noise: f64,
    recreation: f64,
}

fn factors(zone_type: ZoneType) -> ZoneFactors {
    match zone_type {
        ZoneType::Park => ZoneFactors {
            sequestration: 2.5,
            biodiversity: 60.0,
            cooling: 3.0,
            noise: 5.0,
            recreation: 80.0,
        },
        ZoneType::Garden => ZoneFactors {
            sequestration: 1.5,
            biodiversity: 40.0,
            cooling: 2.0,
            noise: 3.0,
            recreation: 60.0,
        },
        ZoneType::Forest => ZoneFactors {
            sequestration: 4.0,
            biodiversity: 90.0,
            cooling: 4.0,
            noise: 8.0,
            recreation: 70.0,
        },
        ZoneType::Wetland => ZoneFactors {
            sequestration: 3.0,
            biodiversity: 85.0,
            cooling: 3.5,
            noise: 4.0,
            recreation: 50.0,
        },
    }
}

fn total_area(zones: &[GreenZone]) -> f64 {
    zones.iter().map(|z| z.area).sum()
}

/// Area-weighted mean of a per-type value.
fn weighted(zones: &[GreenZone], value: impl Fn(&ZoneFactors) -> f64) -> f64 {
    let total = total_area(zones);
    if total <= 0.0 {
        return 0.0;
    }
    zones
        .iter()
        .map(|z| value(&factors(z.zone_type)) * z.area)
        .sum::<f64>()
        / total
}

/// Per-type sum of `area / 1000 * value`.
fn per_thousand(zones: &[GreenZone], value: impl Fn(&ZoneFactors) -> f64) -> f64 {
    zones
        .iter()
        .map(|z| value(&factors(z.zone_type)) * z.area / 1000.0)
        .sum()
}

pub fn zone_diversity(zones: &[GreenZone]) -> f64 {
    if zones.is_empty() {
        return 0.0;
    }
    let n = zones.len() as f64;
    let entropy: f64 = ZoneType::ALL
        .iter()
        .map(|t| zones.iter().filter(|z| z.zone_type == *t).count() as f64 / n)
        .filter(|p| *p > 0.0)
        .map(|p| -p * p.ln())
        .sum();
    entropy / (ZoneType::ALL.len() as f64).ln() * 100.0
}

pub fn geometric_coverage(scenario: &Scenario) -> f64 {
    let region_area = scenario.region.area_m2();
    if region_area <= 0.0 {
        return 0.0;
    }
    let zone_area: f64 = scenario
        .green_zones
        .iter()
        .map(|z| polygon_area_m2(&z.coordinates))
        .sum();
    zone_area / region_area * 100.0
}

pub fn environmental_impact(zones: &[GreenZone]) -> EnvironmentalImpact {
    let total = total_area(zones);
    let wetland: f64 = zones
        .iter()
        .filter(|z| z.zone_type == ZoneType::Wetland)
        .map(|z| z.area)
        .sum();
    // 27 kg CO2 filtered per 100 m2 a year
    let co2_kg = total / 100.0 * 27.0;
    EnvironmentalImpact {
        air_quality: (co2_kg / 1000.0 * 10.0).min(100.0),
        carbon_sequestration: (per_thousand(zones, |f| f.sequestration) * 5.0).min(100.0),
        biodiversity: weighted(zones, |f| f.biodiversity),
        water_management: (total / 10_000.0 * 50.0).min(80.0) + (wetland / 1000.0 * 10.0).min(20.0),
        heat_island_reduction: (per_thousand(zones, |f| f.cooling) * 2.0).min(100.0),
        noise_reduction: (per_thousand(zones, |f| f.noise) * 3.0).min(100.0),
    }
}

/// Expected uplift of nearby property values, 0-100. Grows with total area
/// and with every distinct zone type.
pub fn property_value_impact(zones: &[GreenZone]) -> f64 {
    let kinds = ZoneType::ALL
        .iter()
        .filter(|t| zones.iter().any(|z| z.zone_type == **t))
        .count();
    let area_impact = (total_area(zones) / 10_000.0 * 50.0).min(70.0);
    (area_impact + kinds as f64 * 5.0).min(100.0)
}

/// How evenly zones sit around the region center, 0-100.
///
/// Takes the spread (population standard deviation) of zone-center distances
/// from the region centroid, in degrees. Equal distances score 100.
pub fn equity_distribution(scenario: &Scenario) -> f64 {
    let Some(center) = centroid(scenario.region.points()) else {
        return 0.0;
    };
    let distances: Vec<f64> = scenario
        .green_zones
        .iter()
        .filter_map(|z| centroid(&z.coordinates))
        .map(|c| (c.lat - center.lat).hypot(c.lng - center.lng))
        .collect();
    if distances.is_empty() {
        return 0.0;
    }
    let n = distances.len() as f64;
    let mean = distances.iter().sum::<f64>() / n;
    let variance = distances.iter().map(|d| (d - mean).powi(2)).sum::<f64>() / n;
    (100.0 - variance.sqrt() * 10_000.0).max(0.0)
}

pub fn social_impact(scenario: &Scenario) -> SocialImpact {
    let zones = &scenario.green_zones;
    let total = total_area(zones);
    let social_area: f64 = zones
        .iter()
        .filter(|z| matches!(z.zone_type, ZoneType::Park | ZoneType::Garden))
        .map(|z| z.area)
        .sum();
    // 9 m2 per person at 100 people per hectare
    let recommended = 9.0 * 100.0;
    SocialImpact {
        community_access: f64::from(scenario.accessibility_score),
        recreation: weighted(zones, |f| f.recreation),
        health_benefits: (total / recommended * 100.0).min(100.0),
        social_cohesion: (social_area / 5000.0 * 80.0).min(100.0),
        property_value_impact: property_value_impact(zones),
        equity_distribution: equity_distribution(scenario),
    }
}

/// Follow-ups for each environmental indicator under its threshold.
pub fn environmental_recommendations(impact: &EnvironmentalImpact) -> Vec<String> {
    [
        (impact.air_quality < 50.0, "Increase tree density to improve air quality"),
        (
            impact.carbon_sequestration < 60.0,
            "Add more forest areas for better carbon sequestration",
        ),
        (impact.biodiversity < 70.0, "Create diverse habitats to support local wildlife"),
        (
            impact.water_management < 65.0,
            "Implement rain gardens and bioswales for stormwater management",
        ),
    ]
    .into_iter()
    .filter(|(applies, _)| *applies)
    .map(|(_, text)| text.to_string())
    .collect()
}

pub fn community_benefits(social: &SocialImpact) -> Vec<String> {
    let mut out: Vec<String> = [
        (social.community_access > 70.0, "Improved access to recreational facilities"),
        (
            social.health_benefits > 60.0,
            "Enhanced physical and mental health opportunities",
        ),
        (
            social.social_cohesion > 50.0,
            "Increased community interaction and social cohesion",
        ),
        (
            social.property_value_impact > 60.0,
            "Positive impact on local property values",
        ),
    ]
    .into_iter()
    .filter(|(applies, _)| *applies)
    .map(|(_, text)| text.to_string())
    .collect();
    out.extend(
        [
            "Reduced healthcare costs through improved air quality",
            "Enhanced quality of life for residents",
            "Increased tourism and economic activity",
        ]
        .map(String::from),
    );
    out
}

pub fn recommendations(scenario: &Scenario) -> Vec<String> {
    let mut out = Vec::new();
    if scenario.coverage_percent < 20.0 {
        out.push("Increase green space coverage to at least 9 m2 per resident".to_string());
    }
    if scenario.sustainability_score < 70 {
        out.push("Favour native plant species to strengthen the local ecosystem".to_string());
    }
    if scenario.accessibility_score < 60 {
        out.push("Add footpaths and transit links to reach the green zones".to_string());
    }
    out.extend(
        [
            "Consider water features for biodiversity and cooling",
            "Use smart irrigation to save water",
            "Add community gardens to encourage participation",
        ]
        .map(String::from),
    );
    out
}

pub fn assess(scenario: &Scenario) -> ImpactReport {
    let zones = &scenario.green_zones;
    let environmental = environmental_impact(zones);
    let social = social_impact(scenario);
    ImpactReport {
        total_green_area: total_area(zones),
        zone_count: zones.len(),
        zone_diversity: zone_diversity(zones),
        geometric_coverage: geometric_coverage(scenario),
        environmental_recommendations: environmental_recommendations(&environmental),
        community_benefits: community_benefits(&social),
        environmental,
        social,
        recommendations: recommendations(scenario),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn zone(zone_type: ZoneType, area: f64) -> GreenZone {
        GreenZone {
            id: Uuid::new_v4(),
            name: zone_type.to_string(),
            area,
            zone_type,
            coordinates: vec![],
        }
    }

    #[test]
    fn diversity_bounds() {
        assert_eq!(zone_diversity(&[]), 0.0);
        assert_eq!(zone_diversity(&[zone(ZoneType::Park, 10.0), zone(ZoneType::Park, 5.0)]), 0.0);
        let all: Vec<_> = ZoneType::ALL.iter().map(|t| zone(*t, 100.0)).collect();
        assert!((zone_diversity(&all) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn biodiversity_is_area_weighted() {
        let zones = [zone(ZoneType::Forest, 3000.0), zone(ZoneType::Garden, 1000.0)];
        let impact = environmental_impact(&zones);
        assert!((impact.biodiversity - 77.5).abs() < 1e-9);
        assert!(impact.water_management <= 100.0);
    }

    #[test]
    fn empty_zones_score_zero() {
        let impact = environmental_impact(&[]);
        assert_eq!(impact.score(), 0.0);
        assert_eq!(weighted(&[], |f| f.recreation), 0.0);
        assert_eq!(property_value_impact(&[]), 0.0);
    }

    #[test]
    fn property_value_rewards_area_and_variety() {
        let one = [zone(ZoneType::Park, 2000.0)];
        assert!((property_value_impact(&one) - 15.0).abs() < 1e-9);

        // Area impact caps at 70, plus 5 per zone type
        let all: Vec<_> = ZoneType::ALL.iter().map(|t| zone(*t, 50_000.0)).collect();
        assert!((property_value_impact(&all) - 90.0).abs() < 1e-9);
    }

    #[test]
    fn low_indicators_get_recommendations() {
        let weak = environmental_impact(&[]);
        assert_eq!(environmental_recommendations(&weak).len(), 4);

        let strong = EnvironmentalImpact {
            air_quality: 80.0,
            carbon_sequestration: 80.0,
            biodiversity: 80.0,
            water_management: 80.0,
            heat_island_reduction: 0.0,
            noise_reduction: 0.0,
        };
        assert!(environmental_recommendations(&strong).is_empty());
    }

    #[test]
    fn community_benefits_follow_thresholds() {
        let social = SocialImpact {
            community_access: 90.0,
            recreation: 0.0,
            health_benefits: 10.0,
            social_cohesion: 10.0,
            property_value_impact: 65.0,
            equity_distribution: 0.0,
        };
        let benefits = community_benefits(&social);
        assert_eq!(benefits.len(), 5);
        assert_eq!(benefits[0], "Improved access to recreational facilities");
        assert_eq!(benefits[1], "Positive impact on local property values");
    }
}
