use serde::{Deserialize, Serialize};

/// Structured collision configuration, already parsed by the caller.
///
/// Layers are listed lowest first. An ability in a lower layer is removed
/// when it collides with one in a higher layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollisionConfig {
    pub layers: Vec<LayerConfig>,
    pub pairs: Vec<PairConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerConfig {
    pub abilities: Vec<String>,
    /// Members of the layer cancel each other out (both removed).
    #[serde(default = "default_self_cancelling")]
    pub self_cancelling: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairConfig {
    pub first: String,
    pub second: String,
    pub remove_first: bool,
    pub remove_second: bool,
    #[serde(default)]
    pub allow_same_user: bool,
}

fn default_self_cancelling() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_yaml_with_defaults() {
        let yaml = r#"
layers:
  - abilities: [FireBlast, EarthBlast]
  - abilities: [FireShield]
    self_cancelling: false
pairs:
  - first: FireJet
    second: FireBlast
    remove_first: false
    remove_second: true
"#;
        let config: CollisionConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.layers.len(), 2);
        assert!(config.layers[0].self_cancelling);
        assert!(!config.layers[1].self_cancelling);
        assert!(!config.pairs[0].allow_same_user);
    }

    #[test]
    fn empty_document_is_default() {
        let config: CollisionConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config, CollisionConfig::default());
    }
}
