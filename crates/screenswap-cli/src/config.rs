//! `Screenswap.toml` discovery.
//!
//! Searched upward from the working directory; command-line flags override
//! whatever the file sets.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use url::Url;

pub const CONFIG_FILE: &str = "Screenswap.toml";
pub const DEFAULT_MOUNT_ID: &str = "app";
pub const DEFAULT_STATE_DIR: &str = ".screenswap";

#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    /// Directory holding screen fragments and their scripts.
    pub root: Option<PathBuf>,
    /// HTTP origin serving the screens; wins over `root`.
    pub base_url: Option<String>,
    pub mount_id: Option<String>,
    /// Where field values persist between runs.
    pub state_dir: Option<PathBuf>,
}

pub enum ConfigSource {
    File(PathBuf),
    Default,
}

pub struct Config {
    pub file: FileConfig,
    pub source: ConfigSource,
}

/// Flags that override the file.
#[derive(Debug, Default)]
pub struct Overrides {
    pub root: Option<PathBuf>,
    pub base_url: Option<String>,
    pub mount_id: Option<String>,
    pub state_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    Directory(PathBuf),
    Http(Url),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub origin: Origin,
    pub mount_id: String,
    pub state_dir: PathBuf,
}

fn find_config(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        let candidate = current.join(CONFIG_FILE);
        if candidate.is_file() {
            return Some(candidate);
        }
        if !current.pop() {
            return None;
        }
    }
}

pub fn read_config(path: &Path) -> Result<FileConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let mut file: FileConfig =
        toml::from_str(&content).with_context(|| format!("invalid {}", path.display()))?;

    // Relative paths are relative to the file, not to the working directory.
    let base = path.parent().unwrap_or(Path::new("."));
    file.root = file.root.map(|root| base.join(root));
    file.state_dir = file.state_dir.map(|state_dir| base.join(state_dir));
    Ok(file)
}

/// Finds the nearest config, falling back to defaults when there is none.
pub fn detect(start: &Path) -> Result<Config> {
    match find_config(start) {
        Some(path) => {
            let file = read_config(&path)?;
            log::debug!("using {}", path.display());
            Ok(Config {
                file,
                source: ConfigSource::File(path),
            })
        }
        None => Ok(Config {
            file: FileConfig::default(),
            source: ConfigSource::Default,
        }),
    }
}

impl Config {
    pub fn describe(&self) -> String {
        match &self.source {
            ConfigSource::File(path) => path.display().to_string(),
            ConfigSource::Default => "defaults".to_owned(),
        }
    }

    pub fn resolve(self, overrides: Overrides) -> Result<Settings> {
        let file = self.file;
        // A root flag beats a configured base_url; a base_url flag beats both.
        let base_url = match (&overrides.base_url, &overrides.root) {
            (Some(base_url), _) => Some(base_url.clone()),
            (None, Some(_)) => None,
            (None, None) => file.base_url,
        };
        let origin = match base_url {
            Some(base_url) => Origin::Http(parse_base_url(&base_url)?),
            None => Origin::Directory(
                overrides
                    .root
                    .or(file.root)
                    .unwrap_or_else(|| PathBuf::from(".")),
            ),
        };
        Ok(Settings {
            origin,
            mount_id: overrides
                .mount_id
                .or(file.mount_id)
                .unwrap_or_else(|| DEFAULT_MOUNT_ID.to_owned()),
            state_dir: overrides
                .state_dir
                .or(file.state_dir)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_DIR)),
        })
    }
}

/// Parses an origin, making sure relative screen locations join below it.
pub fn parse_base_url(base_url: &str) -> Result<Url> {
    let mut url = Url::parse(base_url).with_context(|| format!("invalid base URL '{base_url}'"))?;
    if url.cannot_be_a_base() {
        bail!("base URL '{base_url}' cannot have screens below it");
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
