use std::{fs, path::Path};

use serde::Deserialize;
use thiserror::Error;

/// Default number of interpreter steps a VM process gets per scheduler turn.
pub const DEFAULT_QUANTUM: u32 = 100;

/// How the interpreter decodes instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchMode {
    /// Decode the integer opcode and `match` on it.
    #[default]
    Switch,
    /// Rewrite opcodes into dispatch tokens once, then jump through the handler table.
    Threaded,
}

/// Embedder-facing run settings.
///
/// Loaded from a JSON file (every field optional) and then overridden by
/// command-line flags.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    /// Steps per VM quantum.
    pub quantum: u32,
    pub dispatch: DispatchMode,
    /// Log every executed instruction to stderr.
    pub trace: bool,
    /// Print phase summaries and run statistics.
    pub verbose: bool,
    /// Collect garbage after every `n` scheduler rounds. `None` never collects.
    pub collect_every: Option<u32>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            quantum: DEFAULT_QUANTUM,
            dispatch: DispatchMode::Switch,
            trace: false,
            verbose: false,
            collect_every: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("quantum must be at least 1")]
    ZeroQuantum,
}

impl RunConfig {
    pub fn from_json_str(text: &str, path: &str) -> Result<Self, ConfigError> {
        let config: RunConfig =
            serde_json::from_str(text).map_err(|source| ConfigError::Parse {
                path: path.to_string(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let display = path.display().to_string();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: display.clone(),
            source,
        })?;
        Self::from_json_str(&text, &display)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.quantum == 0 {
            return Err(ConfigError::ZeroQuantum);
        }
        Ok(())
    }
}
