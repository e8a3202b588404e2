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

use crate::config::DigestConfig;
use crate::corpus::{TestCase, TestCorpus};
use crate::error::{DigestError, Result};
use crate::progress_log::{RunLogEntry, find_entry};
use crate::reporter::{Reporter, Stage};
use crate::test_name::{expected_artifacts, expected_duration_seconds};
use std::path::{Path, PathBuf};

/// Outcome of validating one test directory. No reasons means usable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    pub test: String,
    pub path: PathBuf,
    pub reasons: Vec<String>,
    /// Artifacts copied in from the next test's leftovers.
    pub recovered: Vec<String>,
}

impl ValidationReport {
    fn new(test: &TestCase) -> Self {
        Self {
            test: test.name.clone(),
            path: test.path.clone(),
            reasons: Vec::new(),
            recovered: Vec::new(),
        }
    }

    pub fn is_usable(&self) -> bool {
        self.reasons.is_empty()
    }
}

pub struct TestValidator<'a> {
    config: &'a DigestConfig,
    corpus: &'a TestCorpus,
    entries: &'a [RunLogEntry],
    reporter: &'a dyn Reporter,
}

impl<'a> TestValidator<'a> {
    pub fn new(
        config: &'a DigestConfig,
        corpus: &'a TestCorpus,
        entries: &'a [RunLogEntry],
        reporter: &'a dyn Reporter,
    ) -> Self {
        Self {
            config,
            corpus,
            entries,
            reporter,
        }
    }

    /// Validates every test in corpus order.
    pub fn validate_all(&self) -> Result<Vec<ValidationReport>> {
        (0..self.corpus.len())
            .map(|index| self.validate(index))
            .collect()
    }

    /// Collects every defect of the test at `index`.
    ///
    /// Defects never stop validation early except a missing run directory.
    /// The only error returned is a test that expects no artifacts at all.
    pub fn validate(&self, index: usize) -> Result<ValidationReport> {
        let tests = self.corpus.tests();
        let Some(test) = tests.get(index) else {
            return Err(DigestError::InvalidPath(format!(
                "no test at position {index} of {}",
                self.corpus.root().display()
            )));
        };
        self.reporter
            .progress(Stage::Analysing, index + 1, tests.len(), &test.name);

        let mut report = ValidationReport::new(test);
        self.check_duration(test, &mut report);

        let expected = match expected_artifacts(&test.name) {
            Ok(expected) if expected.is_empty() => {
                return Err(DigestError::NoExpectedArtifacts(test.name.clone()));
            }
            Ok(expected) => Some(expected),
            Err(err) => {
                report.reasons.push(format!("{err}."));
                None
            }
        };

        let run_path = self.config.run_path(&test.path);
        if !run_path.is_dir() {
            report
                .reasons
                .push(format!("No {} folder found.", self.config.run_dir_label()));
            return Ok(report);
        }

        let mut actual = csv_files(&run_path)?;
        if let Some(expected) = &expected {
            let missing = missing_artifacts(expected, &actual);
            if !missing.is_empty() {
                report.recovered = self.recover_leftovers(index, &run_path, &missing);
                if !report.recovered.is_empty() {
                    actual = csv_files(&run_path)?;
                }
            }
        }

        if actual.is_empty() {
            report.reasons.push("Test has no csv files.".to_owned());
        } else if let Some(expected) = &expected {
            let missing = missing_artifacts(expected, &actual);
            if actual.len() < expected.len() || !missing.is_empty() {
                report.reasons.push(format!(
                    "Missing csv files. Expected {} but found {}. Missing: {}.",
                    expected.len(),
                    actual.len(),
                    missing.join(", ")
                ));
            }
        }

        let empty: Vec<&str> = actual
            .iter()
            .filter(|file| file.size == 0)
            .map(|file| file.name.as_str())
            .collect();
        if !empty.is_empty() {
            report
                .reasons
                .push(format!("Empty Files: {}", empty.join(", ")));
        }

        if !has_entries(&self.config.logs_path(&test.path)) {
            report.reasons.push("No logs found.".to_owned());
        }

        Ok(report)
    }

    fn check_duration(&self, test: &TestCase, report: &mut ValidationReport) {
        let Some(entry) = find_entry(self.entries, &test.name) else {
            report.reasons.push(format!(
                "No {} entry found for test.",
                self.config.progress_log_marker
            ));
            return;
        };
        let expected = expected_duration_seconds(&test.name);
        let actual = entry.duration_seconds();
        if actual < expected {
            report.reasons.push(format!(
                "Test ran shorter than expected. {actual} seconds instead of {expected} seconds."
            ));
        }
    }

    /// Copies missing artifacts that the harness flushed late into the next
    /// test's leftovers folder. Best effort: failures are only reported.
    fn recover_leftovers(&self, index: usize, run_path: &Path, missing: &[&str]) -> Vec<String> {
        let Some(next) = self.corpus.next_after(index) else {
            return Vec::new();
        };
        let leftovers = self.config.leftovers_path(&next.path);
        if !leftovers.is_dir() {
            return Vec::new();
        }

        let mut recovered = Vec::new();
        for name in missing {
            let source = leftovers.join(name);
            if !source.is_file() {
                continue;
            }
            match std::fs::copy(&source, run_path.join(name)) {
                Ok(_) => {
                    self.reporter.info(&format!(
                        "Recovered {name} for {} from {}",
                        run_path.display(),
                        next.name
                    ));
                    recovered.push((*name).to_owned());
                }
                Err(err) => self.reporter.warn(&format!(
                    "Failed to recover {name} from {}: {err}",
                    source.display()
                )),
            }
        }
        recovered
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CsvFile {
    name: String,
    size: u64,
}

fn csv_files(run_path: &Path) -> Result<Vec<CsvFile>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(run_path)? {
        let entry = entry?;
        let metadata = entry.metadata()?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if metadata.is_file() && name.contains(".csv") {
            files.push(CsvFile {
                name,
                size: metadata.len(),
            });
        }
    }
    files.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(files)
}

fn missing_artifacts<'e>(expected: &'e [String], actual: &[CsvFile]) -> Vec<&'e str> {
    expected
        .iter()
        .filter(|name| !actual.iter().any(|file| &file.name == *name))
        .map(String::as_str)
        .collect()
}

fn has_entries(dir: &Path) -> bool {
    std::fs::read_dir(dir)
        .map(|mut entries| entries.next().is_some())
        .unwrap_or(false)
}

/// Writes the audit of rejected tests: `,test,reports` with the reasons of
/// each test joined by `; `. Usable tests are not listed.
pub fn write_audit_report(path: &Path, reports: &[ValidationReport]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["", "test", "reports"])?;
    for (row, report) in reports.iter().filter(|r| !r.is_usable()).enumerate() {
        writer.write_record([
            row.to_string(),
            report.test.clone(),
            report.reasons.join("; "),
        ])?;
    }
    writer.flush()?;
    Ok(())
}
