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

use crate::allocation::read_allocation;
use crate::config::DigestConfig;
use crate::error::{DigestError, Result};
use crate::os_logs::{discover_os_logs, read_os_log};
use crate::reader::{
    ColumnMatcher, LOST_SAMPLES, SAMPLE_RATE, THROUGHPUT, TOTAL_SAMPLES, latency_series,
    series_name, subscriber_peak, subscriber_series, total_series,
};
use crate::reporter::Reporter;
use crate::table::SummaryTable;
use crate::test_name::PUBLISHER_ARTIFACT;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

pub const SUMMARY_SUFFIX: &str = "_summary.csv";

static SUBSCRIBER_FILE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^sub_(\d+)\.csv$").expect("static subscriber file regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummaryOutcome {
    Written(PathBuf),
    /// A summary from an earlier run is kept untouched.
    Exists(PathBuf),
    Skipped { test: String, reason: String },
}

pub fn summary_path(test_name: &str, summary_dir: &Path) -> PathBuf {
    summary_dir.join(format!("{test_name}{SUMMARY_SUFFIX}"))
}

/// Subscriber csv files of a run directory ordered by subscriber index.
pub fn subscriber_files(run_path: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<(usize, PathBuf)> = std::fs::read_dir(run_path)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
        .filter_map(|entry| {
            let name = entry.file_name().to_string_lossy().into_owned();
            let index = SUBSCRIBER_FILE
                .captures(&name)
                .and_then(|captures| captures[1].parse::<usize>().ok())?;
            Some((index, entry.path()))
        })
        .collect();
    files.sort_by_key(|(index, _)| *index);
    Ok(files.into_iter().map(|(_, path)| path).collect())
}

/// Reduces a promoted test into its `<test>_summary.csv`.
pub struct Summarizer<'a> {
    config: &'a DigestConfig,
    reporter: &'a dyn Reporter,
}

impl<'a> Summarizer<'a> {
    pub fn new(config: &'a DigestConfig, reporter: &'a dyn Reporter) -> Self {
        Self { config, reporter }
    }

    /// Writes the summary of `test_path` unless one already exists.
    ///
    /// Only failures to persist the table are returned as errors; a test
    /// whose data cannot be reduced is reported and skipped.
    pub fn summarize(&self, test_path: &Path, summary_dir: &Path) -> Result<SummaryOutcome> {
        let test = test_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| DigestError::InvalidPath(test_path.display().to_string()))?;
        let destination = summary_path(&test, summary_dir);
        if destination.exists() {
            return Ok(SummaryOutcome::Exists(destination));
        }

        let table = match self.build(&test, test_path) {
            Ok(table) => table,
            Err(err) => {
                let reason = err.to_string();
                self.reporter
                    .error(&format!("Skipping summary of {test}: {reason}"));
                return Ok(SummaryOutcome::Skipped { test, reason });
            }
        };

        std::fs::create_dir_all(summary_dir)?;
        let partial = destination.with_extension("csv.partial");
        table.write_csv(&partial)?;
        std::fs::rename(&partial, &destination)?;
        Ok(SummaryOutcome::Written(destination))
    }

    pub fn build(&self, test: &str, test_path: &Path) -> Result<SummaryTable> {
        let run_path = self.config.run_path(test_path);
        if !run_path.is_dir() {
            return Err(DigestError::MissingArtifact {
                artifact: self.config.run_dir_label().to_owned(),
                path: run_path,
            });
        }
        let publisher = run_path.join(PUBLISHER_ARTIFACT);
        if !publisher.is_file() {
            return Err(DigestError::MissingArtifact {
                artifact: PUBLISHER_ARTIFACT.to_owned(),
                path: publisher,
            });
        }
        let latency = latency_series(&publisher, self.config)?;
        if latency.observed().is_empty() {
            return Err(DigestError::NoData(publisher));
        }

        let mut table = SummaryTable::new();
        table.push_series("latency_us", latency.values);

        let subscribers = subscriber_files(&run_path)?;
        if subscribers.is_empty() {
            self.reporter
                .warn(&format!("{test}: no subscriber files in {}", run_path.display()));
        } else {
            self.push_totals(test, &subscribers, &mut table);
            for file in &subscribers {
                self.push_subscriber(test, file, &mut table);
            }
        }

        if self.config.include_os_logs {
            self.push_os_logs(test, &self.config.logs_path(test_path), &mut table);
        }
        if self.config.include_allocation {
            let machine_config = test_path.join(&self.config.machine_config);
            if machine_config.is_file() {
                self.push_allocation(test, &machine_config, &mut table);
            }
        }
        Ok(table)
    }

    fn push_totals(&self, test: &str, subscribers: &[PathBuf], table: &mut SummaryTable) {
        for (column, matcher) in [
            ("total_throughput_mbps", &THROUGHPUT),
            ("total_sample_rate", &SAMPLE_RATE),
        ] {
            let totals = total_series(subscribers, matcher, self.config);
            if let Some(series) = self.optional(test, column, totals) {
                table.push_series(column, series.values);
            }
        }

        for (column, matcher) in [
            ("total_samples_received", &TOTAL_SAMPLES),
            ("total_samples_lost", &LOST_SAMPLES),
        ] {
            let peaks = subscribers
                .iter()
                .map(|file| subscriber_peak(file, matcher, self.config))
                .collect::<Result<Vec<_>>>();
            if let Some(peaks) = self.optional(test, column, peaks) {
                table.push_scalar(column, peaks.into_iter().flatten().sum());
            }
        }
    }

    fn push_subscriber(&self, test: &str, file: &Path, table: &mut SummaryTable) {
        let name = series_name(file);
        let series: [(String, &ColumnMatcher); 2] = [
            (format!("{name}_throughput_mbps"), &THROUGHPUT),
            (format!("{name}_sample_rate"), &SAMPLE_RATE),
        ];
        for (column, matcher) in series {
            if let Some(series) =
                self.optional(test, &column, subscriber_series(file, matcher, self.config))
            {
                table.push_series(column, series.values);
            }
        }

        let scalars: [(String, &ColumnMatcher); 2] = [
            (format!("{name}_total_samples_received"), &TOTAL_SAMPLES),
            (format!("{name}_lost_samples"), &LOST_SAMPLES),
        ];
        for (column, matcher) in scalars {
            let peak = self.optional(test, &column, subscriber_peak(file, matcher, self.config));
            if let Some(Some(value)) = peak {
                table.push_scalar(column, value);
            }
        }
    }

    fn push_os_logs(&self, test: &str, logs_path: &Path, table: &mut SummaryTable) {
        if !logs_path.is_dir() {
            return;
        }
        let Some(logs) = self.optional(test, "os logs", discover_os_logs(logs_path)) else {
            return;
        };
        for log in &logs {
            let label = log.path.display().to_string();
            if let Some(series) = self.optional(test, &label, read_os_log(log, self.config)) {
                for series in series {
                    table.push_series(series.name, series.values);
                }
            }
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn push_allocation(&self, test: &str, machine_config: &Path, table: &mut SummaryTable) {
        let Some(allocation) =
            self.optional(test, "participant allocation", read_allocation(machine_config))
        else {
            return;
        };
        let to_values = |counts: &[usize]| {
            counts
                .iter()
                .map(|count| Some(*count as f64))
                .collect::<Vec<_>>()
        };
        table.push_series("pub_allocation_per_machine", to_values(&allocation.publishers));
        table.push_series("sub_allocation_per_machine", to_values(&allocation.subscribers));
    }

    /// Drops a column that could not be produced, leaving it absent from the summary.
    fn optional<T>(&self, test: &str, column: &str, result: Result<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                self.reporter
                    .warn(&format!("{test}: {column} left out of summary: {err}"));
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporter::MemoryReporter;
    use std::fs;
    use tempfile::TempDir;

    const PUBLISHER: &str = "\
Perftest Publisher
Data Length 100
Length (Bytes), Latency (us), Ave (us), Std (us), Min (us), Max (us)
100, 10, 10, 0, 10, 10
100, 12, 11, 1, 10, 12
100, 14, 12, 2, 10, 14
Summary:
Length (Bytes), Latency (us), Ave (us), Std (us), Min (us), Max (us)
100, 12, 12, 2, 10, 14
Finished
Done
";

    fn subscriber(rows: &[(u64, f64, f64, u64)]) -> String {
        let mut csv = String::from(
            "Perftest Subscriber\nData Length 100\n\
             Length (Bytes), Total Samples, Samples/s, Avg Samples/s, Mbps, Avg Mbps, Lost Samples, Lost Samples (%)\n",
        );
        for (total, rate, mbps, lost) in rows {
            csv.push_str(&format!("100, {total}, {rate}, {rate}, {mbps}, {mbps}, {lost}, 0.00\n"));
        }
        let (total, _, _, lost) = rows.last().copied().unwrap_or_default();
        csv.push_str(&format!("100, {total}, 0, 0, 0, 0, {lost}, 0.00\n"));
        csv.push_str(&format!("100, {total}, 0, 0, 0, 0, {lost}, 0.00\n"));
        csv.push_str("Summary:\nLength (Bytes), Total Samples, Lost Samples\n");
        csv.push_str(&format!("100, {total}, {lost}\n"));
        csv
    }

    fn test_dir(root: &TempDir) -> PathBuf {
        let test = root.path().join("raw").join("60s_100B_1P_2S_rel_uc_1dur_100lc");
        let run = test.join("run_1");
        fs::create_dir_all(&run).unwrap();
        fs::write(run.join("pub_0.csv"), PUBLISHER).unwrap();
        fs::write(
            run.join("sub_0.csv"),
            subscriber(&[(100, 100.0, 1.0, 0), (200, 100.0, 1.0, 1), (300, 100.0, 1.0, 1)]),
        )
        .unwrap();
        fs::write(
            run.join("sub_1.csv"),
            subscriber(&[(50, 50.0, 0.5, 0), (100, 50.0, 0.5, 2)]),
        )
        .unwrap();
        test
    }

    #[test]
    fn builds_totals_and_per_subscriber_columns() {
        let root = TempDir::new().unwrap();
        let test = test_dir(&root);
        let config = DigestConfig::default();
        let reporter = MemoryReporter::new();

        let table = Summarizer::new(&config, &reporter)
            .build("t", &test)
            .unwrap();

        assert_eq!(
            table.column_names(),
            vec![
                "latency_us",
                "total_throughput_mbps",
                "total_sample_rate",
                "total_samples_received",
                "total_samples_lost",
                "sub_0_throughput_mbps",
                "sub_0_sample_rate",
                "sub_0_total_samples_received",
                "sub_0_lost_samples",
                "sub_1_throughput_mbps",
                "sub_1_sample_rate",
                "sub_1_total_samples_received",
                "sub_1_lost_samples",
            ]
        );
        assert_eq!(table.column("latency_us").unwrap().observed(), vec![10.0, 12.0, 14.0]);
        assert_eq!(table.column("total_samples_received").unwrap().observed(), vec![400.0]);
        assert_eq!(table.column("total_samples_lost").unwrap().observed(), vec![3.0]);
        assert_eq!(
            table.column("sub_0_throughput_mbps").unwrap().observed(),
            vec![1.0, 1.0, 1.0]
        );
        assert!(reporter.warnings().is_empty());
    }

    #[test]
    fn garbled_sample_leaves_a_blank_in_its_row() {
        let root = TempDir::new().unwrap();
        let test = test_dir(&root);
        let sub_0 = test.join("run_1").join("sub_0.csv");
        let garbled = fs::read_to_string(&sub_0).unwrap().replace(
            "100, 200, 100, 100, 1, 1, 1, 0.00",
            "100, 200, 100, 100, -nan(ind), 1, 1, 0.00",
        );
        fs::write(&sub_0, garbled).unwrap();
        let summaries = root.path().join("summaries");
        let config = DigestConfig::default();
        let reporter = MemoryReporter::new();

        let outcome = Summarizer::new(&config, &reporter)
            .summarize(&test, &summaries)
            .unwrap();

        let SummaryOutcome::Written(path) = outcome else {
            panic!("summary not written: {outcome:?}");
        };
        let table = SummaryTable::read_csv(&path).unwrap();
        assert_eq!(
            table.column("sub_0_throughput_mbps").unwrap().values,
            vec![Some(1.0), None, Some(1.0)]
        );
        assert_eq!(
            table.column("sub_0_sample_rate").unwrap().observed(),
            vec![100.0, 100.0, 100.0]
        );
    }

    #[test]
    fn missing_publisher_is_skipped_not_fatal() {
        let root = TempDir::new().unwrap();
        let test = test_dir(&root);
        fs::remove_file(test.join("run_1").join("pub_0.csv")).unwrap();
        let summaries = root.path().join("summaries");
        let config = DigestConfig::default();
        let reporter = MemoryReporter::new();

        let outcome = Summarizer::new(&config, &reporter)
            .summarize(&test, &summaries)
            .unwrap();

        assert!(matches!(outcome, SummaryOutcome::Skipped { .. }));
        assert_eq!(reporter.errors().len(), 1);
        assert!(!summary_path("60s_100B_1P_2S_rel_uc_1dur_100lc", &summaries).exists());
    }

    #[test]
    fn existing_summary_is_left_alone() {
        let root = TempDir::new().unwrap();
        let test = test_dir(&root);
        let summaries = root.path().join("summaries");
        fs::create_dir_all(&summaries).unwrap();
        let existing = summary_path("60s_100B_1P_2S_rel_uc_1dur_100lc", &summaries);
        fs::write(&existing, "kept").unwrap();
        let config = DigestConfig::default();
        let reporter = MemoryReporter::new();

        let outcome = Summarizer::new(&config, &reporter)
            .summarize(&test, &summaries)
            .unwrap();

        assert_eq!(outcome, SummaryOutcome::Exists(existing.clone()));
        assert_eq!(fs::read_to_string(existing).unwrap(), "kept");
    }

    #[test]
    fn allocation_columns_come_from_machine_config() {
        let root = TempDir::new().unwrap();
        let test = test_dir(&root);
        fs::write(
            test.join("config.json"),
            r#"{"machines": [{"scripts": ["perftest -pub"]}, {"scripts": ["perftest -sub", "perftest -sub"]}]}"#,
        )
        .unwrap();
        let config = DigestConfig::default();
        let reporter = MemoryReporter::new();

        let table = Summarizer::new(&config, &reporter).build("t", &test).unwrap();

        assert_eq!(
            table.column("pub_allocation_per_machine").unwrap().observed(),
            vec![1.0, 0.0]
        );
        assert_eq!(
            table.column("sub_allocation_per_machine").unwrap().observed(),
            vec![0.0, 2.0]
        );
    }

    #[test]
    fn subscriber_files_sort_numerically() {
        let dir = TempDir::new().unwrap();
        for name in ["sub_10.csv", "sub_2.csv", "pub_0.csv", "sub_1.csv.bak"] {
            fs::write(dir.path().join(name), "").unwrap();
        }
        let names: Vec<String> = subscriber_files(dir.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["sub_2.csv", "sub_10.csv"]);
    }
}
