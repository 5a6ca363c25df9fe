//! Catalog configuration: the fixed, priority-ordered list of indicators.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::color::Color;
use crate::error::{Error, Result};
use crate::pattern::PatternKind;

/// One catalog entry. Its priority rank is its position in [`CatalogCfg::indicators`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicatorCfg {
    pub id: String,
    pub pattern: PatternKind,
}

impl IndicatorCfg {
    pub fn new(id: impl Into<String>, pattern: PatternKind) -> Self {
        Self {
            id: id.into(),
            pattern,
        }
    }
}

/// Catalog in priority order: index 0 wins over everything after it.
///
/// ```toml
/// [[indicator]]
/// id = "error"
/// pattern = { kind = "single_pulse", color = "red" }
///
/// [[indicator]]
/// id = "eco"
/// pattern = { kind = "alternating_a" }
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogCfg {
    #[serde(rename = "indicator")]
    pub indicators: Vec<IndicatorCfg>,
}

impl Default for CatalogCfg {
    fn default() -> Self {
        Self {
            indicators: vec![
                IndicatorCfg::new("error", PatternKind::SinglePulse { color: Color::Red }),
                IndicatorCfg::new("random", PatternKind::AlternatingB),
                IndicatorCfg::new("eco", PatternKind::AlternatingA),
                IndicatorCfg::new("authorized", PatternKind::SinglePulse { color: Color::Blue }),
            ],
        }
    }
}

impl CatalogCfg {
    pub fn new(indicators: Vec<IndicatorCfg>) -> Self {
        Self { indicators }
    }

    /// Parse and validate a TOML catalog.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let cfg: CatalogCfg = toml::from_str(text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if self.indicators.is_empty() {
            return Err(Error::config("catalog has no indicators"));
        }
        let mut seen = HashSet::new();
        for ind in &self.indicators {
            if ind.id.trim().is_empty() {
                return Err(Error::config("indicator id is empty"));
            }
            if !seen.insert(ind.id.as_str()) {
                return Err(Error::config(format!("duplicate indicator id: {}", ind.id)));
            }
            ind.pattern.validate()?;
        }
        Ok(())
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.indicators.iter().map(|i| i.id.as_str())
    }
}
