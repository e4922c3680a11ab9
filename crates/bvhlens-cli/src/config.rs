//! Cast settings from a TOML file plus command-line overrides.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use bvhlens::{CastSettings, CostModel};

/// Values given on the command line; each one overrides the file.
#[derive(Debug, Clone, Copy, Default)]
pub struct Overrides {
    pub count: Option<usize>,
    pub length: Option<f64>,
    pub seed: Option<u32>,
    pub internal_cost: Option<f64>,
    pub leaf_cost: Option<f64>,
}

/// Parse settings from TOML text; missing keys keep their defaults.
pub fn parse_settings(text: &str) -> Result<CastSettings> {
    toml::from_str(text).context("invalid cast settings")
}

/// Settings from `config` (or defaults) with the overrides applied, validated.
pub fn resolve_settings(config: Option<&Path>, overrides: &Overrides) -> Result<CastSettings> {
    let mut settings = match config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            parse_settings(&text).with_context(|| format!("in {}", path.display()))?
        }
        None => CastSettings::default(),
    };
    apply(&mut settings, overrides);
    settings.validate()?;
    Ok(settings)
}

fn apply(settings: &mut CastSettings, overrides: &Overrides) {
    if let Some(count) = overrides.count {
        settings.ray_count = count;
    }
    if let Some(length) = overrides.length {
        settings.length = length;
    }
    if let Some(seed) = overrides.seed {
        settings.seed = seed;
    }
}

/// The BVH's cost model with the overrides applied.
pub fn resolve_costs(base: CostModel, overrides: &Overrides) -> CostModel {
    CostModel {
        internal_node_cost: overrides.internal_cost.unwrap_or(base.internal_node_cost),
        leaf_node_cost: overrides.leaf_cost.unwrap_or(base.leaf_node_cost),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_partial() {
        let settings = parse_settings("length = 25.0").unwrap();
        assert_eq!(settings.length, 25.0);
        assert_eq!(settings.ray_count, 10);
    }

    #[test]
    fn test_parse_rejects_wrong_type() {
        assert!(parse_settings("ray_count = \"many\"").is_err());
    }

    #[test]
    fn test_flags_override_defaults() {
        let overrides = Overrides {
            count: Some(42),
            seed: Some(5),
            ..Default::default()
        };
        let settings = resolve_settings(None, &overrides).unwrap();
        assert_eq!(settings.ray_count, 42);
        assert_eq!(settings.seed, 5);
        assert_eq!(settings.length, 100.0);
    }

    #[test]
    fn test_out_of_range_flag() {
        let overrides = Overrides {
            length: Some(150.0),
            ..Default::default()
        };
        let err = resolve_settings(None, &overrides).unwrap_err();
        assert!(err.to_string().contains("length"));
    }

    #[test]
    fn test_missing_config_file() {
        let err = resolve_settings(Some(Path::new("/nonexistent/cast.toml")), &Overrides::default())
            .unwrap_err();
        assert!(err.to_string().contains("failed to read"));
    }

    #[test]
    fn test_cost_overrides() {
        let base = CostModel {
            internal_node_cost: 2.0,
            leaf_node_cost: 3.0,
        };
        let overrides = Overrides {
            leaf_cost: Some(0.5),
            ..Default::default()
        };
        let costs = resolve_costs(base, &overrides);
        assert_eq!(costs.internal_node_cost, 2.0);
        assert_eq!(costs.leaf_node_cost, 0.5);
    }
}
