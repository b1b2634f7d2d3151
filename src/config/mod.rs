use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::{DendriteError, DendriteResult};

/// Parameters shared by every analysis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalysisParams {
    pub exclude_axon: bool,
    pub exclude_basal: bool,
    /// µm of parent shaft past the last branch point beyond which a filo is terminal.
    pub terminal_dist: f64,
    /// Longest childless branch (µm) still counted as a filopodium.
    pub filo_dist: f64,
    pub include_filo: bool,
    #[serde(rename = "includeAS")]
    pub include_as: bool,
    pub sholl_bin_size: f64,
    pub channel: usize,
    /// `None`: farthest point distance plus one bin.
    pub sholl_max_radius: Option<f64>,
    pub sholl_degree: usize,
}

impl Default for AnalysisParams {
    fn default() -> Self {
        AnalysisParams {
            exclude_axon: true,
            exclude_basal: true,
            terminal_dist: 10.0,
            filo_dist: 10.0,
            include_filo: true,
            include_as: false,
            sholl_bin_size: 5.0,
            channel: 0,
            sholl_max_radius: None,
            sholl_degree: 7,
        }
    }
}

impl AnalysisParams {
    pub fn validate(&self) -> DendriteResult<()> {
        let distances = [
            ("terminalDist", self.terminal_dist),
            ("filoDist", self.filo_dist),
        ];
        for (name, value) in distances {
            if !value.is_finite() || value < 0.0 {
                return Err(DendriteError::InvalidInput(format!(
                    "{} must be a non-negative number, got {}",
                    name, value
                )));
            }
        }
        if !self.sholl_bin_size.is_finite() || self.sholl_bin_size <= 0.0 {
            return Err(DendriteError::InvalidInput(format!(
                "shollBinSize must be positive, got {}",
                self.sholl_bin_size
            )));
        }
        if let Some(r) = self.sholl_max_radius {
            if !r.is_finite() || r < 0.0 {
                return Err(DendriteError::InvalidInput(format!(
                    "shollMaxRadius must be a non-negative number, got {}",
                    r
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AlignerConfig {
    /// Points that may be skipped on either side between two matched pairs.
    pub max_skip: usize,
    /// Cost (µm) of leaving one point unmatched.
    pub unmatched_penalty: f64,
}

impl Default for AlignerConfig {
    fn default() -> Self {
        AlignerConfig {
            max_skip: 3,
            unmatched_penalty: 10.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub analysis: AnalysisParams,
    pub aligner: AlignerConfig,
}

impl Config {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Config = toml::from_str(text).context("failed to parse config")?;
        config.analysis.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(&path)
            .with_context(|| format!("failed to read config file {:?}", path.as_ref()))?;
        Self::from_toml_str(&text)
            .with_context(|| format!("invalid config file {:?}", path.as_ref()))
    }
}

#[cfg(test)]
mod config_tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let p = AnalysisParams::default();
        assert!(p.exclude_axon && p.exclude_basal && p.include_filo);
        assert!(!p.include_as);
        assert_eq!(p.terminal_dist, 10.0);
        assert_eq!(p.filo_dist, 10.0);
        assert_eq!(p.sholl_bin_size, 5.0);
        assert_eq!(p.channel, 0);
        assert_eq!(AlignerConfig::default().max_skip, 3);
        assert_eq!(AlignerConfig::default().unmatched_penalty, 10.0);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml_str(
            r#"
            [analysis]
            filoDist = 5.0
            includeAS = true

            [aligner]
            maxSkip = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.analysis.filo_dist, 5.0);
        assert!(config.analysis.include_as);
        assert_eq!(config.analysis.terminal_dist, 10.0);
        assert_eq!(config.aligner.max_skip, 5);
        assert_eq!(config.aligner.unmatched_penalty, 10.0);

        assert_eq!(Config::from_toml_str("").unwrap(), Config::default());
    }

    #[test]
    fn test_rejects_negative_distances() {
        assert!(Config::from_toml_str("[analysis]\nfiloDist = -1.0").is_err());
        assert!(Config::from_toml_str("[analysis]\nshollBinSize = 0.0").is_err());
        let p = AnalysisParams {
            terminal_dist: f64::NAN,
            ..Default::default()
        };
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[analysis]\nshollBinSize = 2.5").unwrap();
        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.analysis.sholl_bin_size, 2.5);
        assert!(Config::from_file("/definitely/not/here.toml").is_err());
    }
}
