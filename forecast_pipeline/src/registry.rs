//! Versioned storage of model artifacts keyed by horizon and stage

use crate::artifact::ModelArtifact;
use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::info;

/// Lifecycle stage of a stored artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Staging,
    Production,
    Archived,
}

impl Stage {
    fn as_str(&self) -> &'static str {
        match self {
            Stage::Staging => "staging",
            Stage::Production => "production",
            Stage::Archived => "archived",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "staging" => Ok(Stage::Staging),
            "production" => Ok(Stage::Production),
            "archived" => Ok(Stage::Archived),
            other => Err(ForecastError::InvalidParameter(format!(
                "Unknown stage '{}', expected staging, production or archived",
                other
            ))),
        }
    }
}

/// Store key
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ArtifactKey {
    pub horizon: usize,
    pub stage: Stage,
}

/// Persistence of artifacts by (horizon, stage), each store call adding a
/// new version starting from 1
pub trait ArtifactStore {
    /// Store `artifact` under its horizon and `stage`, returning the version
    fn store(&mut self, stage: Stage, artifact: &ModelArtifact) -> Result<u32>;

    /// Versions stored for a key, ascending
    fn versions(&self, horizon: usize, stage: Stage) -> Result<Vec<u32>>;

    /// A specific version
    fn load(&self, horizon: usize, stage: Stage, version: u32) -> Result<Option<ModelArtifact>>;

    /// The most recent version
    fn latest(&self, horizon: usize, stage: Stage) -> Result<Option<ModelArtifact>> {
        match self.versions(horizon, stage)?.last() {
            Some(&version) => self.load(horizon, stage, version),
            None => Ok(None),
        }
    }
}

/// Artifact store held in memory
#[derive(Debug, Default)]
pub struct InMemoryStore {
    entries: BTreeMap<ArtifactKey, Vec<ModelArtifact>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ArtifactStore for InMemoryStore {
    fn store(&mut self, stage: Stage, artifact: &ModelArtifact) -> Result<u32> {
        let key = ArtifactKey {
            horizon: artifact.horizon,
            stage,
        };
        let versions = self.entries.entry(key).or_default();
        versions.push(artifact.clone());
        Ok(versions.len() as u32)
    }

    fn versions(&self, horizon: usize, stage: Stage) -> Result<Vec<u32>> {
        let count = self
            .entries
            .get(&ArtifactKey { horizon, stage })
            .map_or(0, Vec::len);
        Ok((1..=count as u32).collect())
    }

    fn load(&self, horizon: usize, stage: Stage, version: u32) -> Result<Option<ModelArtifact>> {
        if version == 0 {
            return Ok(None);
        }
        Ok(self
            .entries
            .get(&ArtifactKey { horizon, stage })
            .and_then(|v| v.get(version as usize - 1))
            .cloned())
    }
}

/// Artifact store writing JSON files as `{root}/h{h}/{stage}/v{NNNN}.json`
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn key_dir(&self, horizon: usize, stage: Stage) -> PathBuf {
        self.root.join(format!("h{}", horizon)).join(stage.as_str())
    }

    fn version_path(&self, horizon: usize, stage: Stage, version: u32) -> PathBuf {
        self.key_dir(horizon, stage)
            .join(format!("v{:04}.json", version))
    }
}

/// Publish `tmp` as `path` unless another writer already holds that
/// version. `tmp` is removed either way.
fn claim_version(tmp: &Path, path: &Path, version: u32) -> Result<()> {
    let linked = fs::hard_link(tmp, path);
    fs::remove_file(tmp)?;
    match linked {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            Err(ForecastError::RegistryError(format!(
                "Version {} already exists at {}",
                version,
                path.display()
            )))
        }
        Err(e) => Err(e.into()),
    }
}

fn parse_version(file_name: &str) -> Option<u32> {
    file_name
        .strip_prefix('v')?
        .strip_suffix(".json")?
        .parse()
        .ok()
}

impl ArtifactStore for FileStore {
    fn store(&mut self, stage: Stage, artifact: &ModelArtifact) -> Result<u32> {
        let dir = self.key_dir(artifact.horizon, stage);
        fs::create_dir_all(&dir)?;

        let version = self
            .versions(artifact.horizon, stage)?
            .last()
            .map_or(1, |v| v + 1);
        let path = self.version_path(artifact.horizon, stage, version);

        // Readers never observe a partially written artifact
        let tmp = dir.join(format!(".v{:04}.{}.json.tmp", version, std::process::id()));
        fs::write(&tmp, artifact.to_json()?)?;
        claim_version(&tmp, &path, version)?;

        info!(
            horizon = artifact.horizon,
            stage = %stage,
            version,
            path = %path.display(),
            "stored model artifact"
        );
        Ok(version)
    }

    fn versions(&self, horizon: usize, stage: Stage) -> Result<Vec<u32>> {
        let dir = self.key_dir(horizon, stage);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut versions = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            if let Some(v) = entry.file_name().to_str().and_then(parse_version) {
                versions.push(v);
            }
        }
        versions.sort_unstable();
        Ok(versions)
    }

    fn load(&self, horizon: usize, stage: Stage, version: u32) -> Result<Option<ModelArtifact>> {
        let path = self.version_path(horizon, stage, version);
        if !path.is_file() {
            return Ok(None);
        }
        ModelArtifact::load(&path).map(Some)
    }
}
