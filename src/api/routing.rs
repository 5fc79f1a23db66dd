//! Platform and regional routing values
//!
//! Summoner resources live on a platform host (`euw1.api.riotgames.com`)
//! while match-v5 resources live on the regional host of that platform
//! (`europe.api.riotgames.com`).

use crate::ConfigError;

/// Platform selector -> platform routing value
const PLATFORMS: &[(&str, &str)] = &[
    ("EUW", "EUW1"),
    ("EUN", "EUN1"),
    ("TR", "TR1"),
    ("RU", "RU"),
    ("NA", "NA1"),
    ("BR", "BR1"),
    ("LAN", "LA1"),
    ("LAS", "LA2"),
    ("KR", "KR"),
    ("JP", "JP1"),
    ("OC", "OC1"),
];

/// Platform routing value -> regional routing value
const REGIONS: &[(&str, &str)] = &[
    ("EUW1", "europe"),
    ("EUN1", "europe"),
    ("TR1", "europe"),
    ("RU", "europe"),
    ("NA1", "americas"),
    ("BR1", "americas"),
    ("LA1", "americas"),
    ("LA2", "americas"),
    ("KR", "asia"),
    ("JP1", "asia"),
    ("OC1", "sea"),
];

/// Resolved routing values for one platform selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Routing {
    /// Platform routing value, e.g. "EUW1"
    pub platform: &'static str,

    /// Regional routing value, e.g. "europe"
    pub region: &'static str,
}

impl Routing {
    /// Resolves a platform selector ("EUW", "na", ...) case-insensitively
    pub fn for_platform(selector: &str) -> Result<Self, ConfigError> {
        let wanted = selector.trim().to_ascii_uppercase();

        let platform = PLATFORMS
            .iter()
            .find(|(name, _)| *name == wanted)
            .map(|(_, platform)| *platform)
            .ok_or_else(|| ConfigError::UnknownPlatform(selector.to_string()))?;

        let region = REGIONS
            .iter()
            .find(|(p, _)| *p == platform)
            .map(|(_, region)| *region)
            .ok_or_else(|| ConfigError::UnknownPlatform(selector.to_string()))?;

        Ok(Self { platform, region })
    }

    /// Base URL of the platform host
    pub fn platform_host(&self) -> String {
        format!("https://{}.api.riotgames.com", self.platform.to_ascii_lowercase())
    }

    /// Base URL of the regional host
    pub fn regional_host(&self) -> String {
        format!("https://{}.api.riotgames.com", self.region)
    }
}
