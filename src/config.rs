//! Run configuration (`reingest.toml`).
//!
//! Every field has a default, so an absent file is not an error. A file that
//! exists but does not parse (or names an unknown key) is.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use uuid::Uuid;

use crate::error::ReingestError;

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "METS_REINGEST_CONFIG";

/// Config file looked up in the working directory when [`CONFIG_ENV`] is
/// unset.
pub const DEFAULT_CONFIG_FILE: &str = "reingest.toml";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReingestConfig {
    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub document: DocumentConfig,

    /// The software agent recorded against reingestion events.
    #[serde(default)]
    pub agent: AgentConfig,

    #[serde(default)]
    pub package: PackageConfig,
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// Where pending change records are read from.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// SQLite database path (default: `reingest.sqlite3`).
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

fn default_store_path() -> PathBuf {
    PathBuf::from("reingest.sqlite3")
}

/// Where the reconciled document goes.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    /// File name, relative to the working directory (default: `mets.xml`).
    #[serde(default = "default_output_file")]
    pub file: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            file: default_output_file(),
        }
    }
}

fn default_output_file() -> PathBuf {
    PathBuf::from("mets.xml")
}

/// Where the prior document lives inside the package.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DocumentConfig {
    /// Path relative to the package root; `{uuid}` is replaced with the
    /// package identifier.
    #[serde(default = "default_input_template")]
    pub input_template: String,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            input_template: default_input_template(),
        }
    }
}

fn default_input_template() -> String {
    "objects/submissionDocumentation/METS.{uuid}.xml".to_owned()
}

/// The identifying triple of the canonical software agent.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    #[serde(default = "default_agent_identifier_type")]
    pub identifier_type: String,
    #[serde(default = "default_agent_name")]
    pub name: String,
    #[serde(default = "default_agent_type")]
    pub agent_type: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            identifier_type: default_agent_identifier_type(),
            name: default_agent_name(),
            agent_type: default_agent_type(),
        }
    }
}

fn default_agent_identifier_type() -> String {
    "preservation system".to_owned()
}

fn default_agent_name() -> String {
    "Archivematica".to_owned()
}

fn default_agent_type() -> String {
    "software".to_owned()
}

/// How the record store spells package locations.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PackageConfig {
    /// Prefix standing for the package root (default: `%SIPDirectory%`).
    #[serde(default = "default_placeholder")]
    pub placeholder: String,
}

impl Default for PackageConfig {
    fn default() -> Self {
        Self {
            placeholder: default_placeholder(),
        }
    }
}

fn default_placeholder() -> String {
    "%SIPDirectory%".to_owned()
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl ReingestConfig {
    /// Load configuration from a TOML file.
    ///
    /// A missing file yields the defaults.
    ///
    /// # Errors
    /// Returns [`ReingestError::Config`] if the file cannot be read or does not
    /// parse.
    pub fn load(path: &Path) -> Result<Self, ReingestError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(ReingestError::Config {
                    path: Some(path.to_owned()),
                    detail: format!("could not read file: {e}"),
                });
            }
        };
        Self::parse(&contents).map_err(|e| match e {
            ReingestError::Config { detail, .. } => ReingestError::Config {
                path: Some(path.to_owned()),
                detail,
            },
            other => other,
        })
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    /// Returns [`ReingestError::Config`] on invalid TOML or unknown fields.
    pub fn parse(toml_str: &str) -> Result<Self, ReingestError> {
        toml::from_str(toml_str).map_err(|e| {
            let mut detail = e.message().to_owned();
            if let Some(span) = e.span() {
                let line = toml_str[..span.start]
                    .chars()
                    .filter(|&c| c == '\n')
                    .count()
                    + 1;
                detail = format!("line {line}: {detail}");
            }
            ReingestError::Config { path: None, detail }
        })
    }

    /// Load from `$METS_REINGEST_CONFIG` if set, else `./reingest.toml`.
    ///
    /// # Errors
    /// As for [`ReingestConfig::load`].
    pub fn load_default() -> Result<Self, ReingestError> {
        let path = std::env::var_os(CONFIG_ENV)
            .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE), PathBuf::from);
        Self::load(&path)
    }

    /// Path of the prior document for `package` under `package_root`.
    #[must_use]
    pub fn input_path(&self, package_root: &Path, package: Uuid) -> PathBuf {
        let relative = self
            .document
            .input_template
            .replace("{uuid}", &package.to_string());
        package_root.join(relative)
    }
}
