// Copyright 2024 The Kubernetes Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Engine configuration.

use crate::admission::AdmissionError;
use crate::plugins::ALL_ORDERED_PLUGINS;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Authorization timeout applied when none is configured.
pub const DEFAULT_AUTHORIZATION_TIMEOUT_SECONDS: u64 = 10;

/// ConfigError is returned when a configuration cannot be loaded.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("unknown admission plugin {0:?}")]
    UnknownPlugin(String),

    #[error("failed to initialize admission plugin {name:?}: {source}")]
    Plugin {
        name: String,
        #[source]
        source: AdmissionError,
    },
}

/// Config provides configuration for the admission engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Time budget for all authorization checks of one request.
    pub authorization_timeout_seconds: u64,
    /// Enabled plugins, in the order they run.
    pub plugins: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            authorization_timeout_seconds: DEFAULT_AUTHORIZATION_TIMEOUT_SECONDS,
            plugins: ALL_ORDERED_PLUGINS.iter().map(|name| name.to_string()).collect(),
        }
    }
}

impl Config {
    /// Parse a JSON configuration.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, ConfigError> {
        Ok(serde_json::from_reader(reader)?)
    }

    /// Load a JSON configuration file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn authorization_timeout(&self) -> Duration {
        Duration::from_secs(self.authorization_timeout_seconds)
    }
}
