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
use regex::Regex;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, error};

const TEST_MARKER: &str = "TEST ";
const STARTED_PREFIX: &str = "[1/1]: Started at ";
const FINISHED_PREFIX: &str = "[1/1]: Finished at ";
const RUN_PREFIX: &str = "[1/1]: ";

static TEST_NUMBER_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"TEST #\d*: ").expect("static test prefix regex"));

/// One `TEST #<n>: <name>` block of the harness progress log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunLogEntry {
    pub test: String,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    /// Elapsed time as `DD Days HH Hours MM Minutes SS Seconds`, `None` when the log ends early.
    pub duration: Option<String>,
}

impl RunLogEntry {
    pub fn duration_seconds(&self) -> u64 {
        self.duration.as_deref().map_or(0, parse_duration)
    }
}

/// Finds the single progress log directly inside `raw_root`.
pub fn locate_progress_log(raw_root: &Path, marker: &str) -> Result<PathBuf> {
    let mut candidates: Vec<PathBuf> = std::fs::read_dir(raw_root)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
        .filter(|entry| entry.file_name().to_string_lossy().contains(marker))
        .map(|entry| entry.path())
        .collect();

    match candidates.len() {
        0 => Err(DigestError::MissingProgressLog(raw_root.to_path_buf())),
        1 => Ok(candidates.remove(0)),
        count => Err(DigestError::AmbiguousProgressLog {
            path: raw_root.to_path_buf(),
            count,
        }),
    }
}

pub fn parse_progress_log(path: &Path) -> Result<Vec<RunLogEntry>> {
    let contents = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => DigestError::MissingProgressLog(path.to_path_buf()),
        _ => DigestError::Io(e),
    })?;

    let lines: Vec<&str> = contents.lines().map(str::trim).collect();
    if lines.iter().all(|line| line.is_empty()) {
        return Err(DigestError::EmptyProgressLog(path.to_path_buf()));
    }

    let entries: Vec<RunLogEntry> = lines
        .iter()
        .enumerate()
        .filter(|(_, line)| line.contains(TEST_MARKER))
        .map(|(index, line)| RunLogEntry {
            test: TEST_NUMBER_PREFIX.replace_all(line, "").into_owned(),
            start_time: lines
                .get(index + 1)
                .map(|l| l.replace(STARTED_PREFIX, "")),
            end_time: lines
                .get(index + 2)
                .map(|l| l.replace(FINISHED_PREFIX, "")),
            duration: lines
                .get(index + 3)
                .map(|l| l.replace(RUN_PREFIX, "").replace(':', "")),
        })
        .collect();

    debug!("Parsed {} tests from {}", entries.len(), path.display());
    Ok(entries)
}

/// Converts `DD Days HH Hours MM Minutes SS Seconds` into seconds.
///
/// Anything that is not exactly eight space separated tokens, carries non
/// numeric amounts or does not fit in a `u64` of seconds is logged and
/// counted as zero.
pub fn parse_duration(duration: &str) -> u64 {
    let items: Vec<&str> = duration.split(' ').collect();
    if items.len() != 8 {
        error!("Error parsing test duration: {duration}");
        return 0;
    }

    let amounts: Option<Vec<u64>> = [0, 2, 4, 6]
        .iter()
        .map(|&i| items[i].parse::<u64>().ok())
        .collect();

    let total = match amounts.as_deref() {
        Some(&[days, hours, minutes, seconds]) => days
            .checked_mul(86_400)
            .zip(hours.checked_mul(3_600))
            .zip(minutes.checked_mul(60))
            .and_then(|((days, hours), minutes)| {
                days.checked_add(hours)?
                    .checked_add(minutes)?
                    .checked_add(seconds)
            }),
        _ => None,
    };

    total.unwrap_or_else(|| {
        error!("Error parsing test duration: {duration}");
        0
    })
}

/// Entry belonging to `test_name`: an exact identifier match wins, otherwise
/// the first entry whose identifier is contained in the name.
pub fn find_entry<'a>(entries: &'a [RunLogEntry], test_name: &str) -> Option<&'a RunLogEntry> {
    entries
        .iter()
        .find(|entry| entry.test == test_name)
        .or_else(|| {
            entries
                .iter()
                .find(|entry| !entry.test.is_empty() && test_name.contains(&entry.test))
        })
}
