//! Fragment sources for native runs.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use reqwest::StatusCode;
use screenswap::{FetchError, FragmentRequest, FragmentSource};
use url::Url;

use crate::config::Origin;

/// Screens stored as files below a root directory.
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn resolve(&self, location: &str) -> Option<PathBuf> {
        let relative = Path::new(location.split(['?', '#']).next().unwrap_or_default());
        let escapes = relative
            .components()
            .any(|component| !matches!(component, Component::Normal(_) | Component::CurDir));
        (!escapes).then(|| self.root.join(relative))
    }
}

impl FragmentSource for DirectorySource {
    async fn fetch(&self, request: &FragmentRequest) -> Result<String, FetchError> {
        let location = request.location().to_owned();
        let Some(path) = self.resolve(&location) else {
            return Err(FetchError::Transport {
                location,
                reason: "location escapes the screen root".to_owned(),
            });
        };
        log::debug!("reading {}", path.display());
        match tokio::fs::read_to_string(&path).await {
            Ok(markup) => Ok(markup),
            Err(error) if error.kind() == ErrorKind::NotFound => Err(FetchError::Missing { location }),
            Err(error) => Err(FetchError::Transport {
                location,
                reason: error.to_string(),
            }),
        }
    }
}

/// Screens served below an HTTP origin.
pub struct HttpSource {
    client: reqwest::Client,
    base: Url,
}

impl HttpSource {
    pub fn new(base: Url) -> Self {
        Self {
            client: reqwest::Client::new(),
            base,
        }
    }
}

impl FragmentSource for HttpSource {
    async fn fetch(&self, request: &FragmentRequest) -> Result<String, FetchError> {
        let location = request.location().to_owned();
        let transport = |reason: String| FetchError::Transport {
            location: location.clone(),
            reason,
        };
        let url = self
            .base
            .join(&location)
            .map_err(|error| transport(error.to_string()))?;
        log::debug!("GET {url}");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|error| transport(error.to_string()))?;
        match response.status() {
            StatusCode::NOT_FOUND => Err(FetchError::Missing {
                location: location.clone(),
            }),
            status if !status.is_success() => Err(FetchError::Status {
                location: location.clone(),
                status: status.as_u16(),
            }),
            _ => response.text().await.map_err(|error| transport(error.to_string())),
        }
    }
}

pub enum CliSource {
    Directory(DirectorySource),
    Http(HttpSource),
}

impl CliSource {
    pub fn new(origin: &Origin) -> Self {
        match origin {
            Origin::Directory(root) => Self::Directory(DirectorySource::new(root.clone())),
            Origin::Http(base) => Self::Http(HttpSource::new(base.clone())),
        }
    }
}

impl FragmentSource for CliSource {
    async fn fetch(&self, request: &FragmentRequest) -> Result<String, FetchError> {
        match self {
            Self::Directory(source) => source.fetch(request).await,
            Self::Http(source) => source.fetch(request).await,
        }
    }
}
