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

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::reporter::Reporter;
use crate::stats::{StatsRow, describe_summary, write_stats};
use crate::summarizer::SUMMARY_SUFFIX;
use crate::table::SummaryTable;

/// Removes `dir` with everything inside and creates it again empty.
pub fn reset_dir(dir: &Path) -> Result<()> {
    if dir.exists() {
        std::fs::remove_dir_all(dir)
            .with_context(|| format!("Failed to delete {}", dir.display()))?;
    }
    std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    Ok(())
}

/// Every `<test>_summary.csv` in `summary_dir` with its test name, by name.
pub fn summary_files(summary_dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    let entries = std::fs::read_dir(summary_dir)
        .with_context(|| format!("Failed to read directory: {}", summary_dir.display()))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if let Some(test) = name.strip_suffix(SUMMARY_SUFFIX) {
            if entry.path().is_file() {
                files.push((test.to_owned(), entry.path()));
            }
        }
    }
    files.sort();
    Ok(files)
}

/// Reloads every summary and writes their descriptive statistics to `path`.
/// Returns the number of rows written.
pub fn write_summary_stats(
    summary_dir: &Path,
    path: &Path,
    reporter: &dyn Reporter,
) -> Result<usize> {
    let mut rows: Vec<StatsRow> = Vec::new();
    for (test, file) in summary_files(summary_dir)? {
        match SummaryTable::read_csv(&file) {
            Ok(table) => rows.extend(describe_summary(&test, &table)),
            Err(err) => reporter.warn(&format!("Skipping statistics of {test}: {err}")),
        }
    }
    write_stats(path, &rows)
        .with_context(|| format!("Failed to write statistics to {}", path.display()))?;
    Ok(rows.len())
}
