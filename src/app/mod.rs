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

mod utils;

use anyhow::{Context, Result};
use tracing::info;

use crate::args::PerftestDigestArgs;
use crate::config::DigestConfig;
use crate::corpus::TestCorpus;
use crate::error::DigestError;
use crate::progress_log::{locate_progress_log, parse_progress_log};
use crate::promoter::{Promotion, promote, sweep_partials};
use crate::reporter::{Reporter, Stage};
use crate::summarizer::{Summarizer, SummaryOutcome};
use crate::test_name::SweepCoverage;
use crate::validator::{TestValidator, write_audit_report};
use utils::{reset_dir, write_summary_stats};

pub const STATS_FILE: &str = "summary_stats.csv";

/// Process exit code for a failed batch. Batch preconditions end the run
/// like a completed batch with nothing to do (0); anything else is 1.
pub fn exit_code(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<DigestError>() {
        Some(err) if err.is_fatal() => 0,
        _ => 1,
    }
}

/// Counts of what one batch did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchTally {
    pub tests: usize,
    pub usable: usize,
    pub rejected: usize,
    pub recovered_files: usize,
    pub promoted: usize,
    pub already_promoted: usize,
    pub summaries_written: usize,
    pub summaries_existing: usize,
    pub summaries_skipped: usize,
}

pub struct PerftestDigestApp {
    args: PerftestDigestArgs,
    config: DigestConfig,
}

impl PerftestDigestApp {
    pub fn new(args: PerftestDigestArgs) -> Result<Self> {
        let config = match &args.config {
            Some(path) => DigestConfig::load(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => DigestConfig::default(),
        };
        Ok(Self { args, config })
    }

    pub fn config(&self) -> &DigestConfig {
        &self.config
    }

    /// Runs validation, promotion and summarisation over the raw directory.
    ///
    /// Only batch preconditions end the run with an error; every per-test
    /// problem is reported and the batch carries on.
    pub fn run(&self, reporter: &dyn Reporter) -> Result<BatchTally> {
        let args = &self.args;
        if args.delete {
            info!("Deleting everything in {}", args.output_dir.display());
            reset_dir(&args.output_dir)?;
            reset_dir(&args.summary_dir)?;
        }

        let corpus = TestCorpus::discover(&args.raw_dir)?;
        let log_path = locate_progress_log(&args.raw_dir, &self.config.progress_log_marker)?;
        let entries = parse_progress_log(&log_path)?;
        if entries.len() < corpus.len() {
            return Err(DigestError::ProgressLogMismatch {
                log_tests: entries.len(),
                test_dirs: corpus.len(),
            }
            .into());
        }
        info!(
            "Found {} tests in {} and {} entries in {}",
            corpus.len(),
            args.raw_dir.display(),
            entries.len(),
            log_path.display()
        );

        let mut tally = BatchTally {
            tests: corpus.len(),
            ..BatchTally::default()
        };

        let reports =
            TestValidator::new(&self.config, &corpus, &entries, reporter).validate_all()?;
        write_audit_report(&args.report, &reports)?;
        reporter.info(&format!("Test issues written to {}", args.report.display()));

        let usable: Vec<_> = reports.iter().filter(|r| r.is_usable()).collect();
        tally.usable = usable.len();
        tally.rejected = reports.len() - usable.len();
        tally.recovered_files = reports.iter().map(|r| r.recovered.len()).sum();

        for (position, report) in usable.iter().enumerate() {
            reporter.progress(Stage::Copying, position + 1, usable.len(), &report.test);
            match promote(&report.path, &args.output_dir) {
                Ok(Promotion::Copied(_)) => tally.promoted += 1,
                Ok(Promotion::AlreadyPromoted(_)) => tally.already_promoted += 1,
                Err(err) => reporter.error(&format!("Failed to copy {}: {err}", report.test)),
            }
        }

        for stale in sweep_partials(&args.output_dir)? {
            reporter.warn(&format!("Removed interrupted copy {}", stale.display()));
        }

        std::fs::create_dir_all(&args.summary_dir)?;
        let promoted = TestCorpus::discover(&args.output_dir)?;
        let summarizer = Summarizer::new(&self.config, reporter);
        let tests = promoted.tests();
        for (position, test) in tests.iter().enumerate() {
            reporter.progress(Stage::Summarising, position + 1, tests.len(), &test.name);
            match summarizer.summarize(&test.path, &args.summary_dir) {
                Ok(SummaryOutcome::Written(_)) => tally.summaries_written += 1,
                Ok(SummaryOutcome::Exists(_)) => tally.summaries_existing += 1,
                Ok(SummaryOutcome::Skipped { .. }) => tally.summaries_skipped += 1,
                Err(err) => {
                    tally.summaries_skipped += 1;
                    reporter.error(&format!("Failed to write summary of {}: {err}", test.name));
                }
            }
        }

        if args.stats {
            let path = args.summary_dir.join(STATS_FILE);
            let rows = write_summary_stats(&args.summary_dir, &path, reporter)?;
            reporter.info(&format!("{rows} statistics rows written to {}", path.display()));
        }

        let mut coverage = SweepCoverage::new();
        for name in corpus.names() {
            coverage.add(name);
        }
        if coverage.tests() > 0 {
            for line in coverage.lines() {
                reporter.info(&line);
            }
            reporter.info(&format!(
                "{} of {} setting combinations captured",
                coverage.tests(),
                coverage.combinations()
            ));
        }

        reporter.info(&format!(
            "{} tests: {} usable, {} rejected, {} copied, {} summaries written",
            tally.tests, tally.usable, tally.rejected, tally.promoted, tally.summaries_written
        ));
        Ok(tally)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn preconditions_exit_cleanly_and_other_failures_do_not() {
        let mismatch = anyhow::Error::from(DigestError::ProgressLogMismatch {
            log_tests: 1,
            test_dirs: 2,
        });
        let ambiguous = anyhow::Error::from(DigestError::AmbiguousProgressLog {
            path: PathBuf::from("raw"),
            count: 2,
        });
        let io = anyhow::Error::from(DigestError::Io(std::io::Error::other("disk full")));
        let config = anyhow::anyhow!("Config file 'digest.toml' does not exist");

        assert_eq!(exit_code(&mismatch), 0);
        assert_eq!(exit_code(&ambiguous), 0);
        assert_eq!(exit_code(&io), 1);
        assert_eq!(exit_code(&config), 1);
    }
}
