use std::{fs, path::Path};

use anyhow::{bail, Context, Result};
use rhythm_combat_system_chart_generation::TrackCatalog;
use rhythm_combat_world::WorldConfig;
use serde::{Deserialize, Serialize};

/// Everything a conductor needs to run encounters.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ConductorConfig {
    /// Root seed for chart generation, track selection and critical rolls.
    #[serde(default)]
    pub seed: u64,
    /// Arena configuration handed to the world.
    #[serde(default)]
    pub world: WorldConfig,
    /// Tracks available to [`crate::Conductor::begin_from_catalog`].
    #[serde(default)]
    pub catalog: TrackCatalog,
}

impl ConductorConfig {
    /// Parses and validates a configuration from TOML source.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(contents).context("failed to parse conductor config toml contents")?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a TOML configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read conductor config at {}", path.display()))?;
        Self::from_toml_str(&contents)
            .with_context(|| format!("invalid conductor config at {}", path.display()))
    }

    /// Rejects configurations the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        self.world
            .judgment
            .validate()
            .context("judgment settings are invalid")?;
        let lanes = self.world.lanes.lane_count();
        if lanes == 0 {
            bail!("lane layout must contain at least one lane");
        }
        if lanes > usize::from(u8::MAX) + 1 {
            bail!("lane layout has {lanes} lanes, at most 256 are addressable");
        }
        for tuning in [&self.world.tuning.skirmish, &self.world.tuning.boss] {
            if !(0.0..=100.0).contains(&tuning.win_threshold_percent) {
                bail!(
                    "win threshold {} is not a percentage",
                    tuning.win_threshold_percent
                );
            }
            if !tuning.damage_scale.is_finite() || tuning.damage_scale < 0.0 {
                bail!("damage scale {} must be non-negative", tuning.damage_scale);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::ConductorConfig;
    use rhythm_combat_core::{CombatantId, JudgmentWindows, TrackId};

    #[test]
    fn empty_document_uses_defaults() {
        let config = ConductorConfig::from_toml_str("").expect("defaults are valid");
        assert_eq!(config, ConductorConfig::default());
        assert_eq!(config.world.lanes.lane_count(), 4);
    }

    #[test]
    fn parses_seed_windows_and_catalog() {
        let config = ConductorConfig::from_toml_str(
            r#"
            seed = 99

            [world.judgment]
            base_note_speed = 650.0

            [world.judgment.base]
            perfect_ms = 40.0
            good_ms = 80.0
            okay_ms = 120.0

            [world.judgment.floor]
            perfect_ms = 15.0
            good_ms = 30.0
            okay_ms = 45.0

            [[catalog.entries]]
            opponents = [7]

            [catalog.entries.track]
            id = "forest-drums"
            bpm = 128.0
            audio_duration_secs = 45.0
            "#,
        )
        .expect("valid config");

        assert_eq!(config.seed, 99);
        assert_eq!(config.world.judgment.base_note_speed, 650.0);
        assert_eq!(config.world.judgment.base.okay_ms(), 120.0);
        assert_eq!(config.world.judgment.floor.perfect_ms(), 15.0);
        assert_eq!(config.catalog.len(), 1);
        let track = config
            .catalog
            .get(&TrackId::new("forest-drums"))
            .expect("track listed");
        assert_eq!(track.bpm(), 128.0);
        let mut rng = rand::rngs::mock::StepRng::new(0, 1);
        assert!(config.catalog.select(CombatantId::new(7), &mut rng).is_ok());
    }

    #[test]
    fn unordered_windows_are_rejected() {
        let error = ConductorConfig::from_toml_str(
            r#"
            [world.judgment]
            base_note_speed = 500.0

            [world.judgment.base]
            perfect_ms = 90.0
            good_ms = 60.0
            okay_ms = 30.0

            [world.judgment.floor]
            perfect_ms = 10.0
            good_ms = 25.0
            okay_ms = 40.0
            "#,
        )
        .expect_err("descending windows");
        assert!(format!("{error:#}").contains("judgment settings are invalid"));
        assert!(JudgmentWindows::DEFAULT.validate().is_ok());
    }

    #[test]
    fn missing_file_reports_path() {
        let error = ConductorConfig::load("/nonexistent/rhythm-combat.toml").expect_err("no file");
        assert!(format!("{error:#}").contains("/nonexistent/rhythm-combat.toml"));
    }
}
