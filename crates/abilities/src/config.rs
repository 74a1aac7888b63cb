use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Tunables for every built-in ability. Durations are in milliseconds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AbilitiesConfig {
    pub fire_blast: FireBlastConfig,
    pub fire_shield: FireShieldConfig,
    pub fire_jet: FireJetConfig,
    pub earth_pillar: EarthPillarConfig,
    pub earth_blast: EarthBlastConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FireBlastConfig {
    pub cooldown_ms: u64,
    pub damage: f64,
    pub range: f64,
    /// Blocks per tick.
    pub speed: f64,
    pub collision_radius: f64,
}

impl Default for FireBlastConfig {
    fn default() -> Self {
        Self {
            cooldown_ms: 1500,
            damage: 2.0,
            range: 25.0,
            speed: 0.8,
            collision_radius: 1.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FireShieldConfig {
    pub damage: f64,
    pub disk_cooldown_ms: u64,
    pub disk_duration_ms: u64,
    pub disk_radius: f64,
    /// Distance of the disk from the user's eyes.
    pub disk_range: f64,
    pub shield_cooldown_ms: u64,
    pub shield_duration_ms: u64,
    pub shield_radius: f64,
}

impl Default for FireShieldConfig {
    fn default() -> Self {
        Self {
            damage: 0.5,
            disk_cooldown_ms: 1000,
            disk_duration_ms: 1000,
            disk_radius: 2.0,
            disk_range: 1.5,
            shield_cooldown_ms: 2000,
            shield_duration_ms: 10_000,
            shield_radius: 3.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FireJetConfig {
    pub cooldown_ms: u64,
    pub speed: f64,
    pub duration_ms: u64,
}

impl Default for FireJetConfig {
    fn default() -> Self {
        Self {
            cooldown_ms: 7000,
            speed: 0.85,
            duration_ms: 2000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EarthPillarConfig {
    pub cooldown_ms: u64,
    pub select_range: f64,
    /// Column length and rise distance in blocks.
    pub height: u32,
    /// Time between one-block rises.
    pub interval_ms: u64,
    pub revert_ms: u64,
}

impl Default for EarthPillarConfig {
    fn default() -> Self {
        Self {
            cooldown_ms: 1500,
            select_range: 8.0,
            height: 4,
            interval_ms: 125,
            revert_ms: 10_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EarthBlastConfig {
    pub cooldown_ms: u64,
    pub select_range: f64,
    pub range: f64,
    pub speed: f64,
    pub damage: f64,
    pub collision_radius: f64,
    /// How long the launched source stays hollow.
    pub revert_ms: u64,
}

impl Default for EarthBlastConfig {
    fn default() -> Self {
        Self {
            cooldown_ms: 1000,
            select_range: 8.0,
            range: 30.0,
            speed: 1.2,
            damage: 2.25,
            collision_radius: 1.0,
            revert_ms: 10_000,
        }
    }
}

pub(crate) fn millis(ms: u64) -> Duration {
    Duration::from_millis(ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_yaml_keeps_defaults() {
        let yaml = r#"
fire_blast:
  damage: 4.0
earth_pillar:
  height: 6
"#;
        let config: AbilitiesConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.fire_blast.damage, 4.0);
        assert_eq!(config.fire_blast.range, 25.0);
        assert_eq!(config.earth_pillar.height, 6);
        assert_eq!(config.fire_shield, FireShieldConfig::default());
    }
}
