use std::fs;
use std::time::Duration;

use camino::Utf8PathBuf;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};

use crate::dataset::StudyFile;
use crate::domain::{StudyKind, StudyName};
use crate::error::ScopeError;

/// Source of precomputed study files.
pub trait StudyClient: Send + Sync {
    fn fetch_study(&self, name: &StudyName, kind: StudyKind) -> Result<StudyFile, ScopeError>;
}

impl StudyClient for Box<dyn StudyClient> {
    fn fetch_study(&self, name: &StudyName, kind: StudyKind) -> Result<StudyFile, ScopeError> {
        self.as_ref().fetch_study(name, kind)
    }
}

#[derive(Clone)]
pub struct StudyHttpClient {
    client: Client,
    base_url: String,
}

impl StudyHttpClient {
    pub fn new(base_url: &str) -> Result<Self, ScopeError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("dge-scope/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| ScopeError::StudyHttp(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|err| ScopeError::StudyHttp(err.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn study_url(&self, name: &StudyName, kind: StudyKind) -> String {
        format!(
            "{}/{}/{}.json",
            self.base_url,
            kind.path_segment(),
            name.as_str()
        )
    }
}

impl StudyClient for StudyHttpClient {
    fn fetch_study(&self, name: &StudyName, kind: StudyKind) -> Result<StudyFile, ScopeError> {
        let url = self.study_url(name, kind);
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|err| ScopeError::StudyHttp(err.to_string()))?;
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ScopeError::StudyNotFound(name.as_str().to_string()));
        }
        if !status.is_success() {
            let message = response
                .text()
                .unwrap_or_else(|_| "study request failed".to_string());
            return Err(ScopeError::StudyStatus {
                status: status.as_u16(),
                message,
            });
        }
        response.json::<StudyFile>().map_err(|err| ScopeError::StudyParse {
            study: name.as_str().to_string(),
            message: err.to_string(),
        })
    }
}

/// Reads study files from a local directory laid out like the static
/// server: `{root}/studies/{name}.json` and `{root}/processed/{name}.json`.
#[derive(Debug, Clone)]
pub struct FileStudyClient {
    root: Utf8PathBuf,
}

impl FileStudyClient {
    pub fn new(root: Utf8PathBuf) -> Self {
        Self { root }
    }

    pub fn study_path(&self, name: &StudyName, kind: StudyKind) -> Utf8PathBuf {
        self.root
            .join(kind.path_segment())
            .join(format!("{}.json", name.as_str()))
    }
}

impl StudyClient for FileStudyClient {
    fn fetch_study(&self, name: &StudyName, kind: StudyKind) -> Result<StudyFile, ScopeError> {
        let path = self.study_path(name, kind);
        if !path.as_std_path().exists() {
            return Err(ScopeError::StudyNotFound(name.as_str().to_string()));
        }
        let content = fs::read_to_string(path.as_std_path())
            .map_err(|err| ScopeError::Filesystem(err.to_string()))?;
        serde_json::from_str::<StudyFile>(&content).map_err(|err| ScopeError::StudyParse {
            study: name.as_str().to_string(),
            message: err.to_string(),
        })
    }
}
