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

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const CPU_LOG: &str = "\
Linux 5.15.0 (app1) \t03/01/2023 \t_x86_64_\t(8 CPU)

10:00:01 AM     CPU     %user     %nice   %system   %iowait    %steal     %idle
10:00:02 AM     all      2.00      0.00      1.00      0.50      0.00     96.50
10:00:03 AM     all      3.00      0.00      1.50      0.00      0.00     95.50
10:00:04 AM     all      1.00      0.00      0.50      0.00      0.00     98.50
Average:        all      2.00      0.00      1.00      0.17      0.00     96.83
";

/// Raw, usable and summary roots inside one temporary directory.
pub struct Fixture {
    dir: TempDir,
    log: Vec<(String, String)>,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("temp dir");
        for sub in ["raw", "usable", "summaries"] {
            fs::create_dir_all(dir.path().join(sub)).expect("fixture dirs");
        }
        Self {
            dir,
            log: Vec::new(),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn raw(&self) -> PathBuf {
        self.root().join("raw")
    }

    pub fn usable(&self) -> PathBuf {
        self.root().join("usable")
    }

    pub fn summaries(&self) -> PathBuf {
        self.root().join("summaries")
    }

    pub fn report(&self) -> PathBuf {
        self.root().join("test_report.csv")
    }

    pub fn run_dir(&self, test: &str) -> PathBuf {
        self.raw().join(test).join("run_1")
    }

    /// Writes a complete run: publisher, one file per subscriber and a cpu log.
    pub fn add_test(&mut self, test: &str, subscribers: usize, duration: &str) -> PathBuf {
        let run = self.run_dir(test);
        fs::create_dir_all(run.join("logs")).expect("run dir");
        fs::write(run.join("pub_0.csv"), publisher_csv(&[250.0, 260.0, 240.0, 255.0]))
            .expect("publisher csv");
        for index in 0..subscribers {
            let base = 1000 * (index as u64 + 1);
            let rows: Vec<(u64, f64, f64, u64)> = (1..=4)
                .map(|row| (base * row, 1000.0, 8.0, row - 1))
                .collect();
            fs::write(run.join(format!("sub_{index}.csv")), subscriber_csv(&rows))
                .expect("subscriber csv");
        }
        fs::write(run.join("logs").join("app1_cpu.log"), CPU_LOG).expect("cpu log");
        self.log.push((test.to_owned(), duration.to_owned()));
        self.raw().join(test)
    }

    /// Adds a log entry without a matching test directory.
    pub fn add_log_entry(&mut self, test: &str, duration: &str) {
        self.log.push((test.to_owned(), duration.to_owned()));
    }

    pub fn write_progress_log(&self) -> PathBuf {
        let mut text = String::from("Starting 1 machine(s)\n");
        for (number, (test, duration)) in self.log.iter().enumerate() {
            text.push_str(&format!("TEST #{}: {test}\n", number + 1));
            text.push_str("[1/1]: Started at 2023-03-01 10:00:00\n");
            text.push_str("[1/1]: Finished at 2023-03-01 10:10:00\n");
            text.push_str(&format!("[1/1]: {duration}\n"));
        }
        let path = self.raw().join("progress.log");
        fs::write(&path, text).expect("progress log");
        path
    }
}

pub fn publisher_csv(latencies: &[f64]) -> String {
    let mut csv = String::from(
        "Perftest Publisher\nData Length 100\n\
         Length (Bytes), Latency (us), Ave (us), Std (us), Min (us), Max (us)\n",
    );
    for latency in latencies {
        csv.push_str(&format!("100, {latency}, {latency}, 0, {latency}, {latency}\n"));
    }
    csv.push_str("Summary:\n");
    csv.push_str("Length (Bytes), Latency (us), Ave (us), Std (us), Min (us), Max (us)\n");
    csv.push_str("100, 250, 250, 7, 240, 260\n");
    csv.push_str("Finished\nDone\n");
    csv
}

/// Subscriber rows as `(total samples, samples/s, mbps, lost samples)`,
/// followed by the two average rows and the summary footer perftest appends.
pub fn subscriber_csv(rows: &[(u64, f64, f64, u64)]) -> String {
    let mut csv = String::from(
        "Perftest Subscriber\nData Length 100\n\
         Length (Bytes), Total Samples, Samples/s, Avg Samples/s, Mbps, Avg Mbps, Lost Samples, Lost Samples (%)\n",
    );
    for (total, rate, mbps, lost) in rows {
        csv.push_str(&format!("100, {total}, {rate}, {rate}, {mbps}, {mbps}, {lost}, 0.00\n"));
    }
    let (total, _, _, lost) = rows.last().copied().unwrap_or_default();
    for _ in 0..2 {
        csv.push_str(&format!("100, {total}, 0, 0, 0, 0, {lost}, 0.00\n"));
    }
    csv.push_str("Summary:\nLength (Bytes), Total Samples, Lost Samples\n");
    csv.push_str(&format!("100, {total}, {lost}\n"));
    csv
}
