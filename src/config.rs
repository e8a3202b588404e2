// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

use crate::error::{DigestError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Layout and format knobs of the perftest output being digested.
///
/// Every field has a default matching the current benchmark harness, so a
/// config file only needs to name the values it overrides.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DigestConfig {
    /// Directory nested in every test holding the artifacts. Empty means the test root.
    pub run_dir: String,
    pub logs_dir: String,
    pub leftovers_dir: String,
    /// Substring identifying the progress log inside the raw root.
    pub progress_log_marker: String,
    /// Per-test JSON describing the machine to process assignment.
    pub machine_config: String,
    pub csv_preamble_rows: usize,
    pub publisher_footer_rows: usize,
    pub subscriber_footer_rows: usize,
    /// Average rows perftest appends to every subscriber series.
    pub subscriber_average_rows: usize,
    /// Rows dropped from the tail of summed subscriber series.
    pub total_trailing_rows: usize,
    pub os_log_header_rows: usize,
    pub os_log_footer_rows: usize,
    pub include_os_logs: bool,
    pub include_allocation: bool,
}

impl Default for DigestConfig {
    fn default() -> Self {
        Self {
            run_dir: "run_1".to_owned(),
            logs_dir: "logs".to_owned(),
            leftovers_dir: "leftovers".to_owned(),
            progress_log_marker: "progress.log".to_owned(),
            machine_config: "config.json".to_owned(),
            csv_preamble_rows: 2,
            publisher_footer_rows: 5,
            subscriber_footer_rows: 3,
            subscriber_average_rows: 2,
            total_trailing_rows: 3,
            os_log_header_rows: 1,
            os_log_footer_rows: 1,
            include_os_logs: true,
            include_allocation: true,
        }
    }
}

impl DigestConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&data)?;
        config.validate()?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.progress_log_marker.trim().is_empty() {
            return Err(DigestError::InvalidConfig(
                "progress_log_marker cannot be empty".to_owned(),
            ));
        }
        if self.logs_dir.trim().is_empty() {
            return Err(DigestError::InvalidConfig(
                "logs_dir cannot be empty".to_owned(),
            ));
        }
        if self.leftovers_dir.trim().is_empty() {
            return Err(DigestError::InvalidConfig(
                "leftovers_dir cannot be empty".to_owned(),
            ));
        }
        Ok(())
    }

    /// Directory holding the csv artifacts of `test`.
    pub fn run_path(&self, test: &Path) -> PathBuf {
        if self.run_dir.is_empty() {
            test.to_path_buf()
        } else {
            test.join(&self.run_dir)
        }
    }

    pub fn leftovers_path(&self, test: &Path) -> PathBuf {
        self.run_path(test).join(&self.leftovers_dir)
    }

    pub fn logs_path(&self, test: &Path) -> PathBuf {
        self.run_path(test).join(&self.logs_dir)
    }

    /// Label used in log lines for the run directory.
    pub fn run_dir_label(&self) -> &str {
        if self.run_dir.is_empty() {
            "test"
        } else {
            &self.run_dir
        }
    }
}
