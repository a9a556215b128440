use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::domain::{FilterConfig, GeneSelection, StudyKind, StudyName};
use crate::error::ScopeError;

pub const DEFAULT_STUDIES_BASE_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8000";

#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub studies_base_url: Option<String>,
    #[serde(default)]
    pub api_base_url: Option<String>,
    #[serde(default)]
    pub studies: Vec<StudyEntry>,
    #[serde(default)]
    pub significance_threshold: Option<f64>,
    #[serde(default)]
    pub fold_change_threshold: Option<f64>,
    #[serde(default)]
    pub gene_selection: Option<GeneSelection>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(untagged)]
pub enum StudyEntry {
    Shorthand(String),
    Detailed(StudyEntryObject),
}

#[derive(Debug, Deserialize, Serialize)]
pub struct StudyEntryObject {
    pub name: String,
    #[serde(default)]
    pub kind: Option<StudyKind>,
}

#[derive(Debug, Clone)]
pub struct StudyRequest {
    pub name: StudyName,
    pub kind: StudyKind,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub studies_base_url: String,
    pub api_base_url: String,
    pub studies: Vec<StudyRequest>,
    pub filter: FilterConfig,
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, ScopeError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from("dge-scope.json"),
        };

        if path.is_none() && !config_path.exists() {
            return Err(ScopeError::MissingConfig);
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| ScopeError::ConfigRead(config_path.clone()))?;
        let config: Config =
            serde_json::from_str(&content).map_err(|err| ScopeError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config)
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, ScopeError> {
        let schema_version = config.schema_version.unwrap_or(1);

        let studies = config
            .studies
            .into_iter()
            .map(|entry| match entry {
                StudyEntry::Shorthand(value) => Ok(StudyRequest {
                    name: value.parse()?,
                    kind: StudyKind::Study,
                }),
                StudyEntry::Detailed(obj) => Ok(StudyRequest {
                    name: obj.name.parse()?,
                    kind: obj.kind.unwrap_or(StudyKind::Study),
                }),
            })
            .collect::<Result<Vec<_>, ScopeError>>()?;

        let defaults = FilterConfig::default();
        let filter = FilterConfig::new(
            config
                .significance_threshold
                .unwrap_or(defaults.significance_threshold),
            config
                .fold_change_threshold
                .unwrap_or(defaults.fold_change_threshold),
            config.gene_selection.unwrap_or(defaults.gene_selection),
        )?;

        Ok(ResolvedConfig {
            schema_version,
            studies_base_url: config
                .studies_base_url
                .unwrap_or_else(|| DEFAULT_STUDIES_BASE_URL.to_string()),
            api_base_url: config
                .api_base_url
                .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string()),
            studies,
            filter,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_config_shorthand() {
        let config = Config {
            schema_version: None,
            studies_base_url: None,
            api_base_url: None,
            studies: vec![
                StudyEntry::Shorthand("liver".to_string()),
                StudyEntry::Detailed(StudyEntryObject {
                    name: "kidney".to_string(),
                    kind: Some(StudyKind::Processed),
                }),
            ],
            significance_threshold: None,
            fold_change_threshold: None,
            gene_selection: None,
        };

        let resolved = ConfigLoader::resolve_config(config).unwrap();
        assert_eq!(resolved.schema_version, 1);
        assert_eq!(resolved.studies.len(), 2);
        assert_eq!(resolved.studies[0].kind, StudyKind::Study);
        assert_eq!(resolved.studies[1].kind, StudyKind::Processed);
        assert_eq!(resolved.filter, FilterConfig::default());
        assert_eq!(resolved.studies_base_url, DEFAULT_STUDIES_BASE_URL);
    }

    #[test]
    fn invalid_threshold_in_config_is_rejected() {
        let config = Config {
            schema_version: None,
            studies_base_url: None,
            api_base_url: None,
            studies: vec![],
            significance_threshold: Some(-2.0),
            fold_change_threshold: None,
            gene_selection: None,
        };
        assert!(ConfigLoader::resolve_config(config).is_err());
    }
}
