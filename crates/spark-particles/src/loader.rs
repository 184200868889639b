//! Emitter definitions: loading from and saving to TOML

use crate::emitter::EmitterConfig;
use crate::influencer::Influencer;
use crate::shape::ShapeDefinition;
use serde::{Deserialize, Serialize};
use spark_core::{ContentHash, Result};
use std::fs;
use std::path::Path;

/// Everything needed to rebuild an emitter
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmitterDefinition {
    #[serde(default)]
    pub config: EmitterConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape: Option<ShapeDefinition>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub influencers: Vec<Influencer>,
}

impl EmitterDefinition {
    /// Serialize to a TOML string
    pub fn to_toml_string(&self) -> Result<String> {
        let content = toml::to_string_pretty(self)?;
        Ok(content)
    }

    /// Save to a TOML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, self.to_toml_string()?)?;
        Ok(())
    }

    /// Hash of the serialized definition, for change detection
    pub fn content_hash(&self) -> Result<ContentHash> {
        Ok(ContentHash::from_str(&self.to_toml_string()?))
    }
}

/// Load an emitter definition from a TOML file
pub fn load_definition_from_file<P: AsRef<Path>>(path: P) -> Result<EmitterDefinition> {
    let content = fs::read_to_string(path)?;
    load_definition_from_str(&content)
}

/// Load an emitter definition from a TOML string. The config is validated.
pub fn load_definition_from_str(content: &str) -> Result<EmitterDefinition> {
    let definition: EmitterDefinition = toml::from_str(content)?;
    definition.config.validate()?;
    Ok(definition)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emitter::ParticleEmitter;
    use crate::influencer::InfluencerKind;
    use crate::shape::{DirectionType, EmissionPoint};
    use spark_core::{Interpolation, SparkError};

    const FOUNTAIN: &str = r#"
[config]
emissions_per_second = 40
max_particles = 64
life_min = 0.5
life_max = 1.5
force_min = 2.0
force_max = 3.0
direction_type = "normal"
emission_point = "edge_bottom"
interpolation = 12
sprite_cols = 2
sprite_rows = 2
material = "textures/spark.png"
seed = 7

[config.mesh_type]
type = "point"

[shape]
type = "quad"
width = 1.0
height = 1.0

[[influencers]]
type = "alpha"
keyframes = { steps = [{ value = 1.0 }, { value = 0.0, interpolation = "pow2_out" }] }

[[influencers]]
type = "gravity"
gravity = [0.0, -4.0, 0.0]

[[influencers]]
type = "sprite"
fixed_duration = 0.1
"#;

    #[test]
    fn load_full_definition() {
        let def = load_definition_from_str(FOUNTAIN).unwrap();
        assert!((def.config.emissions_per_second - 40.0).abs() < 0.01);
        assert_eq!(def.config.max_particles, 64);
        assert_eq!(def.config.direction_type, DirectionType::Normal);
        assert_eq!(def.config.emission_point, EmissionPoint::EdgeBottom);
        assert_eq!(
            def.config.interpolation,
            Interpolation::from_id(12).unwrap()
        );
        assert_eq!(def.config.material.as_deref(), Some("textures/spark.png"));
        assert_eq!(def.influencers.len(), 3);
        assert!(matches!(def.influencers[1].kind(), InfluencerKind::Gravity(g) if (g.gravity.y + 4.0).abs() < 1e-6));
        assert!(matches!(def.shape, Some(ShapeDefinition::Quad { .. })));
    }

    #[test]
    fn missing_sections_use_defaults() {
        let def = load_definition_from_str("").unwrap();
        assert_eq!(def, EmitterDefinition::default());
        assert_eq!(def.config.max_particles, 100);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let err = load_definition_from_str("[config]\nemissions_per_second = 0.01\n").unwrap_err();
        assert!(matches!(err, SparkError::ValueOutOfRange { .. }));

        let err = load_definition_from_str("[config]\nmax_particles = -3\n").unwrap_err();
        assert!(matches!(err, SparkError::TomlParseError(_)));

        let err = load_definition_from_str("[config]\ninterpolation = \"wobble\"\n").unwrap_err();
        assert!(matches!(err, SparkError::TomlParseError(_)));
    }

    #[test]
    fn save_and_reload_preserves_definition() {
        let def = load_definition_from_str(FOUNTAIN).unwrap();
        let saved = def.to_toml_string().unwrap();
        let reloaded = load_definition_from_str(&saved).unwrap();
        assert_eq!(def, reloaded);
        assert_eq!(
            def.content_hash().unwrap(),
            reloaded.content_hash().unwrap()
        );
    }

    #[test]
    fn reapplied_definition_reproduces_simulation() {
        let def = load_definition_from_str(FOUNTAIN).unwrap();
        let run = |def: &EmitterDefinition| {
            let mut emitter = ParticleEmitter::from_definition(def).unwrap();
            for _ in 0..40 {
                emitter.advance(0.05).unwrap();
            }
            emitter
                .particles()
                .iter()
                .map(|p| (p.position, p.alpha, p.sprite_col, p.sprite_row))
                .collect::<Vec<_>>()
        };

        let first = run(&def);
        let emitter = ParticleEmitter::from_definition(&def).unwrap();
        let round_trip = load_definition_from_str(&emitter.to_definition().to_toml_string().unwrap()).unwrap();
        assert_eq!(first, run(&round_trip));
    }

    #[test]
    fn file_round_trip() {
        let path = std::env::temp_dir().join(format!("spark-def-{}.toml", std::process::id()));
        let def = load_definition_from_str(FOUNTAIN).unwrap();
        def.save(&path).unwrap();
        let loaded = load_definition_from_file(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(def, loaded);
    }
}
