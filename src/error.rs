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

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DigestError>;

#[derive(Error, Debug)]
pub enum DigestError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Invalid JSON: {0}")]
    InvalidJson(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Invalid path: {0}")]
    InvalidPath(String),
    #[error("No column matching '{column}' found in {}", .path.display())]
    ColumnNotFound { column: String, path: PathBuf },
    #[error("Malformed test name: {0}")]
    MalformedTestName(String),
    #[error("No progress.log found in {}", .0.display())]
    MissingProgressLog(PathBuf),
    #[error("Found {count} progress logs in {}, merging them is not supported", .path.display())]
    AmbiguousProgressLog { path: PathBuf, count: usize },
    #[error("Progress log {} is empty", .0.display())]
    EmptyProgressLog(PathBuf),
    #[error(
        "Mismatch in number of tests: progress.log has {log_tests} tests while there are {test_dirs} test folders"
    )]
    ProgressLogMismatch { log_tests: usize, test_dirs: usize },
    #[error("Test {0} expects no csv files")]
    NoExpectedArtifacts(String),
    #[error("No {artifact} found in {}", .path.display())]
    MissingArtifact { artifact: String, path: PathBuf },
    #[error("No data found in {}", .0.display())]
    NoData(PathBuf),
    #[error("Invalid summary {}: {reason}", .path.display())]
    InvalidSummary { path: PathBuf, reason: String },
}

impl DigestError {
    /// Batch-level preconditions that abort the whole run.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::InvalidPath(_)
                | Self::MissingProgressLog(_)
                | Self::AmbiguousProgressLog { .. }
                | Self::EmptyProgressLog(_)
                | Self::ProgressLogMismatch { .. }
                | Self::NoExpectedArtifacts(_)
        )
    }
}

impl From<serde_json::Error> for DigestError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidJson(err.to_string())
    }
}

impl From<toml::de::Error> for DigestError {
    fn from(err: toml::de::Error) -> Self {
        Self::InvalidConfig(err.to_string())
    }
}
