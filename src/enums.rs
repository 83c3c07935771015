use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Resource {
    #[serde(alias = "wood", alias = "WOOD")]
    Wood,
    #[serde(alias = "brick", alias = "BRICK")]
    Brick,
    #[serde(alias = "sheep", alias = "SHEEP")]
    Sheep,
    #[serde(alias = "wheat", alias = "WHEAT")]
    Wheat,
    #[serde(alias = "ore", alias = "ORE")]
    Ore,
}

impl FromStr for Resource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "wood" => Ok(Resource::Wood),
            "brick" => Ok(Resource::Brick),
            "sheep" => Ok(Resource::Sheep),
            "wheat" => Ok(Resource::Wheat),
            "ore" => Ok(Resource::Ore),
            other => Err(format!("unknown resource '{other}'")),
        }
    }
}

/// What a land tile produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TileKind {
    Produces(Resource),
    Desert,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DevCard {
    Knight,
    YearOfPlenty,
    Monopoly,
    RoadBuilding,
    VictoryPoint,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildingType {
    Settlement,
    City,
}

impl FromStr for BuildingType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "settlement" => Ok(BuildingType::Settlement),
            "city" => Ok(BuildingType::City),
            other => Err(format!("unknown building '{other}'")),
        }
    }
}

/// What the server is waiting for from the current seat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionPrompt {
    BuildInitialSettlement,
    BuildInitialRoad,
    PlayTurn,
    Discard,
    MoveRobber,
    DecideTrade,
    DecideAcceptees,
}

impl FromStr for ActionPrompt {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BUILD_INITIAL_SETTLEMENT" => Ok(ActionPrompt::BuildInitialSettlement),
            "BUILD_INITIAL_ROAD" => Ok(ActionPrompt::BuildInitialRoad),
            "PLAY_TURN" => Ok(ActionPrompt::PlayTurn),
            "DISCARD" => Ok(ActionPrompt::Discard),
            "MOVE_ROBBER" => Ok(ActionPrompt::MoveRobber),
            "DECIDE_TRADE" => Ok(ActionPrompt::DecideTrade),
            "DECIDE_ACCEPTEES" => Ok(ActionPrompt::DecideAcceptees),
            other => Err(format!("unknown prompt '{other}'")),
        }
    }
}

/// Seat colour. The server spells colours in both cases ("red", "RED").
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Color(String);

impl Color {
    pub fn new(name: impl AsRef<str>) -> Self {
        Color(name.as_ref().trim().to_ascii_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for Color {
    fn from(name: String) -> Self {
        Color::new(name)
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.0
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_spellings() {
        for spelling in ["\"Wood\"", "\"wood\"", "\"WOOD\""] {
            let parsed: Resource = serde_json::from_str(spelling).unwrap();
            assert_eq!(parsed, Resource::Wood);
        }
        assert_eq!("Ore".parse::<Resource>(), Ok(Resource::Ore));
        assert!("gold".parse::<Resource>().is_err());
    }

    #[test]
    fn test_colors_compare_case_insensitively() {
        let upper: Color = serde_json::from_str("\"RED\"").unwrap();
        assert_eq!(upper, Color::new("red"));
        assert_eq!(serde_json::to_string(&upper).unwrap(), "\"red\"");
    }

    #[test]
    fn test_prompt_parsing() {
        assert_eq!(
            "BUILD_INITIAL_ROAD".parse::<ActionPrompt>(),
            Ok(ActionPrompt::BuildInitialRoad)
        );
        assert_eq!("move_robber".parse::<ActionPrompt>(), Ok(ActionPrompt::MoveRobber));
        assert!("WAIT".parse::<ActionPrompt>().is_err());
    }
}
