use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::core::{geo::Coordinate, region::Region};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoneType {
    Park,
    Garden,
    Forest,
    Wetland,
}

impl ZoneType {
    pub const ALL: [ZoneType; 4] = [
        ZoneType::Park,
        ZoneType::Garden,
        ZoneType::Forest,
        ZoneType::Wetland,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ZoneType::Park => "park",
            ZoneType::Garden => "garden",
            ZoneType::Forest => "forest",
            ZoneType::Wetland => "wetland",
        }
    }
}

impl std::fmt::Display for ZoneType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GreenZone {
    pub id: Uuid,
    pub name: String,
    /// Square meters, always positive.
    pub area: f64,
    #[serde(rename = "type")]
    pub zone_type: ZoneType,
    pub coordinates: Vec<Coordinate>,
}

/// What the planner asked the optimizer to favour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    #[default]
    Balanced,
    Accessibility,
    Biodiversity,
    Sustainability,
    Recreation,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Balanced => "balanced",
            Priority::Accessibility => "accessibility",
            Priority::Biodiversity => "biodiversity",
            Priority::Sustainability => "sustainability",
            Priority::Recreation => "recreation",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ScenarioStatus {
    #[default]
    Draft,
    Completed,
    Shared,
}

impl ScenarioStatus {
    /// Status only moves out of `Draft`, never back into it or sideways.
    pub fn can_transition_to(self, next: ScenarioStatus) -> bool {
        matches!(
            (self, next),
            (ScenarioStatus::Draft, ScenarioStatus::Completed)
                | (ScenarioStatus::Draft, ScenarioStatus::Shared)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ScenarioStatus::Draft => "draft",
            ScenarioStatus::Completed => "completed",
            ScenarioStatus::Shared => "shared",
        }
    }
}

impl std::fmt::Display for ScenarioStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

impl std::str::FromStr for ScenarioStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(ScenarioStatus::Draft),
            "completed" => Ok(ScenarioStatus::Completed),
            "shared" => Ok(ScenarioStatus::Shared),
            _ => Err(anyhow::anyhow!("Invalid scenario status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("cannot move scenario status from {from} to {to}")]
pub struct StatusError {
    pub from: ScenarioStatus,
    pub to: ScenarioStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: Uuid,
    pub author: String,
    pub text: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Comment {
    pub fn new(author: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            author: author.into(),
            text: text.into(),
            created_at: OffsetDateTime::now_utc(),
        }
    }
}

/// One candidate green-zone layout with its scores.
///
/// After generation only `status` (forward only) and `comments` (append only)
/// change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    pub id: Uuid,
    pub name: String,
    #[serde(with = "time::serde::rfc3339", alias = "timestamp")]
    pub created_at: OffsetDateTime,
    pub region: Region,
    pub green_zones: Vec<GreenZone>,
    /// The requested target at creation time, not measured from the zones.
    pub coverage_percent: f64,
    pub sustainability_score: u8,
    pub accessibility_score: u8,
    pub population_served: u32,
    #[serde(default)]
    pub status: ScenarioStatus,
    #[serde(default)]
    pub comments: Vec<Comment>,
}

impl Scenario {
    pub fn transition(&mut self, next: ScenarioStatus) -> Result<(), StatusError> {
        if !self.status.can_transition_to(next) {
            return Err(StatusError {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }

    pub fn add_comment(&mut self, comment: Comment) {
        self.comments.push(comment);
    }

    pub fn zone_count(&self) -> usize {
        self.green_zones.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_moves_forward_only() {
        use ScenarioStatus::*;
        assert!(Draft.can_transition_to(Completed));
        assert!(Draft.can_transition_to(Shared));
        assert!(!Completed.can_transition_to(Draft));
        assert!(!Shared.can_transition_to(Draft));
        assert!(!Completed.can_transition_to(Shared));
        assert!(!Draft.can_transition_to(Draft));
    }

    #[test]
    fn zone_type_serializes_under_type_key() {
        let zone = GreenZone {
            id: Uuid::nil(),
            name: "Riverside Wetland".into(),
            area: 1200.0,
            zone_type: ZoneType::Wetland,
            coordinates: vec![],
        };
        let json = serde_json::to_value(&zone).unwrap();
        assert_eq!(json["type"], "wetland");
    }
}
