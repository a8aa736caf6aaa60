// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-workspace settings.
//!
//! Settings are read from `.config/atest.toml` inside the workspace. Every key is optional, and a
//! missing file is the same as an empty one.
//!
//! ```toml
//! runner = "pytest"
//!
//! [pytest]
//! python = "python3"
//!
//! [generic]
//! command = "make test-junit"
//! args = ["--verbose"]
//! report = "build/junit.xml"
//!
//! [generic.env]
//! CI = "1"
//!
//! [ingest]
//! malformed-records = "skip"
//! path-strategy = "code-path"
//! line-base = "one-based"
//! ```

use crate::{
    errors::SettingsError,
    ingest::{IngestOptions, MalformedRecordPolicy, PathStrategy},
    runner::RunnerKind,
    tree::LineBase,
};
use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;
use std::{
    collections::{BTreeMap, BTreeSet},
    io,
};
use tracing::{debug, warn};

/// The location of the settings file, relative to the workspace directory.
pub const SETTINGS_PATH: &str = ".config/atest.toml";

/// Settings for a workspace.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[non_exhaustive]
pub struct WorkspaceSettings {
    /// The runner used for this workspace.
    #[serde(default)]
    pub runner: RunnerKind,

    /// Settings for the pytest runner.
    #[serde(default)]
    pub pytest: PytestSettings,

    /// Settings for the generic runner.
    #[serde(default)]
    pub generic: GenericSettings,

    /// Settings for report ingestion.
    #[serde(default)]
    pub ingest: IngestSettings,
}

/// Settings for the pytest runner.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PytestSettings {
    /// The Python interpreter used to run `python -m pytest`.
    #[serde(default = "default_python")]
    pub python: String,
}

impl Default for PytestSettings {
    fn default() -> Self {
        Self {
            python: default_python(),
        }
    }
}

fn default_python() -> String {
    "python3".to_owned()
}

/// Settings for the generic runner.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct GenericSettings {
    /// The command to run, split into words with shell quoting rules.
    pub command: Option<String>,

    /// Extra arguments appended to the command.
    #[serde(default)]
    pub args: Vec<String>,

    /// Extra environment variables for the command.
    #[serde(default)]
    pub env: BTreeMap<String, String>,

    /// Where the command writes its JUnit report, relative to the workspace. If unset, the run
    /// produces no results.
    pub report: Option<Utf8PathBuf>,
}

/// Settings for report ingestion.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct IngestSettings {
    /// What to do with records that are missing required attributes.
    #[serde(default)]
    pub malformed_records: MalformedRecordPolicy,

    /// How records are placed in the result tree.
    #[serde(default)]
    pub path_strategy: PathStrategy,

    /// The base of reported line numbers. Defaults to the runner's convention.
    pub line_base: Option<LineBase>,
}

impl WorkspaceSettings {
    /// Loads settings for the workspace at `workspace_dir`, logging unknown keys as warnings.
    pub fn load(workspace_dir: &Utf8Path) -> Result<Self, SettingsError> {
        let path = workspace_dir.join(SETTINGS_PATH);
        let settings = Self::from_path_with_warnings(&path, &mut DefaultSettingsWarnings)?;
        Ok(settings.unwrap_or_default())
    }

    /// Returns the ingestion options for these settings.
    pub fn ingest_options(&self, workspace_dir: &Utf8Path) -> IngestOptions {
        IngestOptions {
            policy: self.ingest.malformed_records,
            path_strategy: self.ingest.path_strategy,
            line_base: self
                .ingest
                .line_base
                .unwrap_or_else(|| self.runner.default_line_base()),
            workspace_dir: workspace_dir.to_owned(),
        }
    }

    /// Returns `Ok(None)` if the file does not exist.
    fn from_path_with_warnings(
        path: &Utf8Path,
        warnings: &mut impl SettingsWarnings,
    ) -> Result<Option<Self>, SettingsError> {
        debug!("settings: attempting to load from {path}");
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                debug!("settings: file does not exist at {path}");
                return Ok(None);
            }
            Err(error) => {
                return Err(SettingsError::Read {
                    path: path.to_owned(),
                    error,
                });
            }
        };

        let (settings, unknown) =
            Self::deserialize_toml(&contents).map_err(|error| SettingsError::Parse {
                path: path.to_owned(),
                error,
            })?;
        if !unknown.is_empty() {
            warnings.unknown_keys(path, &unknown);
        }

        debug!("settings: loaded successfully from {path}");
        Ok(Some(settings))
    }

    fn deserialize_toml(contents: &str) -> Result<(Self, BTreeSet<String>), toml::de::Error> {
        let deserializer = toml::Deserializer::parse(contents)?;
        let mut unknown = BTreeSet::new();
        let settings: WorkspaceSettings =
            serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
                unknown.insert(path.to_string());
            })?;
        Ok((settings, unknown))
    }
}

/// Receives warnings produced while loading settings.
trait SettingsWarnings {
    fn unknown_keys(&mut self, path: &Utf8Path, unknown: &BTreeSet<String>);
}

struct DefaultSettingsWarnings;

impl SettingsWarnings for DefaultSettingsWarnings {
    fn unknown_keys(&mut self, path: &Utf8Path, unknown: &BTreeSet<String>) {
        let unknown_str = if let [key] = unknown.iter().collect::<Vec<_>>().as_slice() {
            // Print this on the same line.
            format!("key: {key}")
        } else {
            let mut unknown_str = "keys:\n".to_owned();
            for key in unknown {
                unknown_str.push_str("\n  - ");
                unknown_str.push_str(key);
            }
            unknown_str
        };

        warn!("in settings file {path}, ignoring unknown configuration {unknown_str}");
    }
}
