//! TOML scan configuration.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use monument_survey_system_environment::{FilterConfig, DEFAULT_SEA_LEVEL};
use monument_survey_system_layout::{ClassificationPolicy, IntrospectorConfig};
use monument_survey_system_pipeline::YieldModel;
use monument_survey_system_placement::{
    PlacementParams, RegionRounding, MONUMENT_SALT, MONUMENT_SEPARATION, MONUMENT_SPACING,
};
use serde::Deserialize;

/// Every tunable the phases read; missing keys keep their defaults.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct ScanConfig {
    pub(crate) placement: PlacementSection,
    pub(crate) environment: EnvironmentSection,
    pub(crate) layout: LayoutSection,
    #[serde(rename = "yield")]
    pub(crate) yield_model: YieldSection,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct PlacementSection {
    pub(crate) spacing: i32,
    pub(crate) separation: i32,
    pub(crate) salt: i32,
    pub(crate) triangular: bool,
    pub(crate) legacy_region_math: bool,
}

impl Default for PlacementSection {
    fn default() -> Self {
        Self {
            spacing: MONUMENT_SPACING,
            separation: MONUMENT_SEPARATION,
            salt: MONUMENT_SALT,
            triangular: true,
            legacy_region_math: false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct EnvironmentSection {
    pub(crate) sea_level: i32,
    pub(crate) refine_radius: u32,
}

impl Default for EnvironmentSection {
    fn default() -> Self {
        Self {
            sea_level: DEFAULT_SEA_LEVEL,
            refine_radius: 0,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct LayoutSection {
    pub(crate) policy: ClassificationPolicy,
}

#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct YieldSection {
    pub(crate) per_room: f64,
    pub(crate) per_instance: f64,
}

impl Default for YieldSection {
    fn default() -> Self {
        let model = YieldModel::default();
        Self {
            per_room: model.per_room,
            per_instance: model.per_instance,
        }
    }
}

impl ScanConfig {
    /// Loads the configuration file, or the defaults when none is given.
    pub(crate) fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::parse(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    fn parse(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("failed to parse scan config toml contents")
    }

    pub(crate) fn placement_params(&self) -> PlacementParams {
        let section = self.placement;
        PlacementParams {
            spacing: section.spacing,
            separation: section.separation,
            salt: section.salt,
            triangular: section.triangular,
            rounding: if section.legacy_region_math {
                RegionRounding::Historical
            } else {
                RegionRounding::Floor
            },
        }
    }

    pub(crate) fn filter_config(&self) -> FilterConfig {
        FilterConfig {
            sea_level: self.environment.sea_level,
            refine_radius: self.environment.refine_radius,
        }
    }

    pub(crate) fn introspector_config(&self) -> IntrospectorConfig {
        IntrospectorConfig {
            policy: self.layout.policy,
            ..IntrospectorConfig::default()
        }
    }

    pub(crate) fn yield_model(&self) -> YieldModel {
        YieldModel {
            per_room: self.yield_model.per_room,
            per_instance: self.yield_model.per_instance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let config = ScanConfig::parse("").expect("empty config parses");
        assert_eq!(config, ScanConfig::default());
        assert_eq!(config.placement_params(), PlacementParams::ocean_monument());
        assert_eq!(config.introspector_config().policy, ClassificationPolicy::Volumetric);
        assert_eq!(config.yield_model(), YieldModel::default());
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let config = ScanConfig::parse(
            r#"
            [placement]
            legacy_region_math = true

            [environment]
            refine_radius = 2

            [layout]
            policy = "type_identity"

            [yield]
            per_room = 10.0
            "#,
        )
        .expect("config parses");

        let params = config.placement_params();
        assert_eq!(params.rounding, RegionRounding::Historical);
        assert_eq!(params.spacing, MONUMENT_SPACING);
        assert_eq!(config.filter_config().refine_radius, 2);
        assert_eq!(config.filter_config().sea_level, DEFAULT_SEA_LEVEL);
        assert_eq!(config.introspector_config().policy, ClassificationPolicy::TypeIdentity);
        assert_eq!(config.yield_model().per_instance, 3.0);
    }

    #[test]
    fn degenerate_placement_is_refused_by_the_predictor() {
        use monument_survey_system_placement::{PlacementError, PlacementPredictor};

        let config = ScanConfig::parse("[placement]\nspacing = 0\nseparation = -5\n")
            .expect("config parses");
        assert_eq!(
            PlacementPredictor::new(config.placement_params()).err(),
            Some(PlacementError::NonPositiveSpacing { spacing: 0 })
        );
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(ScanConfig::parse("[placement]\nspaceing = 4\n").is_err());
    }
}
