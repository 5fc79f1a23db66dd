//! Wire records of the remote API
//!
//! These mirror the match-v5 and summoner-v4 payloads. The crawl itself only
//! needs a match's id and participant list and a summoner's PUUID; the rest
//! is carried through to storage unchanged.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Opaque player identifier (PUUID)
pub type PlayerId = String;

/// Opaque match identifier, e.g. "EUW1_5413144108"
pub type MatchId = String;

/// A completed match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub metadata: MatchMetadata,
    pub info: MatchInfo,
}

impl Match {
    pub fn id(&self) -> &str {
        &self.metadata.match_id
    }

    /// PUUIDs of everyone who took part
    pub fn participant_ids(&self) -> &[PlayerId] {
        &self.metadata.participants
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchMetadata {
    #[serde(default)]
    pub data_version: String,
    pub match_id: MatchId,
    pub participants: Vec<PlayerId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchInfo {
    pub game_creation: i64,
    pub game_duration: i64,
    #[serde(default)]
    pub game_end_timestamp: Option<i64>,
    pub game_id: i64,
    #[serde(default)]
    pub game_mode: String,
    #[serde(default)]
    pub game_name: String,
    #[serde(default)]
    pub game_start_timestamp: Option<i64>,
    #[serde(default)]
    pub game_type: String,
    #[serde(default)]
    pub game_version: String,
    #[serde(default)]
    pub map_id: i32,
    #[serde(default)]
    pub participants: Vec<Participant>,
    #[serde(default)]
    pub platform_id: String,
    #[serde(default)]
    pub queue_id: i32,
    #[serde(default)]
    pub teams: Vec<Team>,
    #[serde(default)]
    pub tournament_code: String,
}

/// Per-participant statistics
///
/// Identity and the headline numbers are typed; the remaining statistics
/// (damage, wards, items, perks, ...) are kept as they arrived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub puuid: PlayerId,
    #[serde(default)]
    pub participant_id: i32,
    #[serde(default)]
    pub summoner_id: String,
    #[serde(default)]
    pub summoner_name: String,
    #[serde(default)]
    pub champion_id: i32,
    #[serde(default)]
    pub champion_name: String,
    #[serde(default)]
    pub team_id: i32,
    #[serde(default)]
    pub team_position: String,
    #[serde(default)]
    pub kills: i32,
    #[serde(default)]
    pub deaths: i32,
    #[serde(default)]
    pub assists: i32,
    #[serde(default)]
    pub win: bool,
    #[serde(flatten)]
    pub stats: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    pub team_id: i32,
    #[serde(default)]
    pub win: bool,
    #[serde(default)]
    pub bans: Vec<Ban>,
    #[serde(default)]
    pub objectives: Objectives,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ban {
    pub champion_id: i32,
    pub pick_turn: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Objectives {
    #[serde(default)]
    pub baron: Objective,
    #[serde(default)]
    pub champion: Objective,
    #[serde(default)]
    pub dragon: Objective,
    #[serde(default)]
    pub inhibitor: Objective,
    #[serde(default)]
    pub rift_herald: Objective,
    #[serde(default)]
    pub tower: Objective,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Objective {
    pub first: bool,
    pub kills: i32,
}

/// A player profile (summoner-v4)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summoner {
    #[serde(default)]
    pub account_id: String,
    #[serde(default)]
    pub profile_icon_id: i32,
    #[serde(default)]
    pub revision_date: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub id: String,
    pub puuid: PlayerId,
    #[serde(default)]
    pub summoner_level: i64,
}
