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

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Parser;

use crate::error::DigestError;

/// Validates raw perftest runs, promotes the usable ones and summarises them.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None, verbatim_doc_comment)]
pub struct PerftestDigestArgs {
    /// Directory with one folder per raw test and a single progress log
    pub raw_dir: PathBuf,

    /// Directory usable tests are copied into
    pub output_dir: PathBuf,

    /// Directory `<test>_summary.csv` files are written to
    pub summary_dir: PathBuf,

    /// Wipe output and summary directories before running
    #[arg(long, short = 'd')]
    pub delete: bool,

    /// Where to write the audit of rejected tests
    #[arg(long, default_value = "test_report.csv")]
    pub report: PathBuf,

    /// TOML file overriding the run layout and csv footer sizes
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Also write descriptive statistics of every summary
    #[arg(long)]
    pub stats: bool,

    /// Log level (error|warn|info|debug|trace)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl PerftestDigestArgs {
    pub fn validate(&self) -> Result<()> {
        for dir in [&self.raw_dir, &self.output_dir] {
            if !dir.is_dir() {
                return Err(DigestError::InvalidPath(format!(
                    "{} does not exist or is not a folder.",
                    dir.display()
                ))
                .into());
            }
        }

        if let Some(config) = &self.config {
            if !config.is_file() {
                anyhow::bail!("Config file '{}' does not exist", config.display());
            }
        }

        if self.delete && same_dir(&self.raw_dir, &self.output_dir) {
            anyhow::bail!(
                "Refusing to delete '{}': it is also the raw test directory",
                self.output_dir.display()
            );
        }

        Ok(())
    }
}

fn same_dir(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
