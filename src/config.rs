use std::{fs::File, io::BufReader, path::Path, path::PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::{
    cli::parse_delimiter,
    labels::{LabelSet, Locale},
    loader::LoadOptions,
};

pub const DEFAULT_COUNTRY_THRESHOLD: usize = 1000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DashboardConfig {
    pub input: Option<PathBuf>,
    pub delimiter: Option<String>,
    pub input_encoding: Option<String>,
    pub country_threshold: usize,
    pub strict_months: bool,
    pub locale: Locale,
    pub labels: Option<LabelSet>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            input: None,
            delimiter: None,
            input_encoding: None,
            country_threshold: DEFAULT_COUNTRY_THRESHOLD,
            strict_months: false,
            locale: Locale::default(),
            labels: None,
        }
    }
}

impl DashboardConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening config file {path:?}"))?;
        let reader = BufReader::new(file);
        serde_yaml::from_reader(reader).context("Parsing dashboard config YAML")
    }

    pub fn load_optional(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Labels in effect: explicit `labels` win over the `locale` preset.
    pub fn label_set(&self) -> LabelSet {
        self.labels
            .clone()
            .unwrap_or_else(|| LabelSet::for_locale(self.locale))
    }

    pub fn delimiter_byte(&self) -> Result<Option<u8>> {
        self.delimiter
            .as_deref()
            .map(|value| parse_delimiter(value).map_err(|err| anyhow!(err)))
            .transpose()
    }

    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            country_threshold: self.country_threshold,
            strict_months: self.strict_months,
            labels: self.label_set(),
        }
    }
}
