//! Integration tests for the impact report of a generated scenario.

mod common;

use metamorph::core::generator::square_around;
use metamorph::core::geo::{centroid, polygon_area_m2};
use metamorph::core::metrics;

use common::*;

#[tokio::test]
async fn test_report_for_generated_scenario() -> anyhow::Result<()> {
    let wizard = run_wizard(25, 31).await;
    let scenario = wizard.scenario().expect("Scenario");
    let report = metrics::assess(scenario);

    assert_eq!(report.zone_count, 4);
    assert_eq!(report.social.community_access, f64::from(scenario.accessibility_score));
    assert!((0.0..=100.0).contains(&report.social.property_value_impact));
    assert!((0.0..=100.0).contains(&report.social.equity_distribution));
    assert!(report.social.score() > 0.0);

    // All four zone types are present, so variety alone adds 20
    assert!(report.social.property_value_impact >= 20.0);

    // Access is at least 75, which always earns the access benefit
    assert_eq!(report.community_benefits[0], "Improved access to recreational facilities");
    assert!(report
        .community_benefits
        .iter()
        .any(|b| b == "Enhanced quality of life for residents"));

    assert_eq!(
        report.environmental_recommendations,
        metrics::environmental_recommendations(&report.environmental)
    );

    Ok(())
}

#[tokio::test]
async fn test_equity_rewards_even_spread() -> anyhow::Result<()> {
    let wizard = run_wizard(25, 32).await;
    let mut scenario = wizard.scenario().cloned().expect("Scenario");
    let center = centroid(scenario.region.points()).expect("Region has points");

    // Four zones at the same distance from the center, one per direction
    let offsets = [(0.002, 0.0), (-0.002, 0.0), (0.0, 0.002), (0.0, -0.002)];
    for (zone, (dlat, dlng)) in scenario.green_zones.iter_mut().zip(offsets) {
        zone.coordinates = square_around(
            Coordinate::new(center.lat + dlat, center.lng + dlng),
            0.0005,
        );
        zone.area = polygon_area_m2(&zone.coordinates);
    }
    assert!(metrics::equity_distribution(&scenario) > 99.9);

    // Pull one zone far out and the spread shows up
    let far = Coordinate::new(center.lat + 0.004, center.lng + 0.006);
    scenario.green_zones[0].coordinates = square_around(far, 0.0005);
    assert!(metrics::equity_distribution(&scenario) < 90.0);

    // Zones without geometry carry no distance
    for zone in &mut scenario.green_zones {
        zone.coordinates.clear();
    }
    assert_eq!(metrics::equity_distribution(&scenario), 0.0);

    Ok(())
}
