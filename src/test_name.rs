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
use std::collections::BTreeSet;
use std::sync::LazyLock;

pub const TEST_NAME_DELIMITER: char = '_';
pub const PUBLISHER_ARTIFACT: &str = "pub_0.csv";

static SUBSCRIBER_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)S$").expect("static subscriber token regex"));
static DURATION_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)s_").expect("static duration marker regex"));

/// Number of csv files a completed run of `test_name` leaves behind:
/// one publisher file plus one per subscriber.
pub fn expected_artifact_count(test_name: &str) -> Result<usize> {
    Ok(subscriber_count(test_name)? + 1)
}

/// File names of every csv a completed run must contain, publisher first.
pub fn expected_artifacts(test_name: &str) -> Result<Vec<String>> {
    let subscribers = subscriber_count(test_name)?;
    let mut artifacts = Vec::with_capacity(subscribers + 1);
    artifacts.push(PUBLISHER_ARTIFACT.to_owned());
    artifacts.extend((0..subscribers).map(|i| format!("sub_{i}.csv")));
    Ok(artifacts)
}

pub fn subscriber_count(test_name: &str) -> Result<usize> {
    test_name
        .split(TEST_NAME_DELIMITER)
        .find_map(|token| SUBSCRIBER_TOKEN.captures(token))
        .and_then(|captures| captures[1].parse().ok())
        .ok_or_else(|| DigestError::MalformedTestName(test_name.to_owned()))
}

/// Duration the test was configured to run for. Zero when the name carries
/// no `<int>s_` marker, meaning duration is not checked.
pub fn expected_duration_seconds(test_name: &str) -> u64 {
    DURATION_MARKER
        .captures(test_name)
        .and_then(|captures| captures[1].parse().ok())
        .unwrap_or(0)
}

/// The eight ordered settings encoded in a test name,
/// e.g. `600s_32000B_25P_1S_rel_uc_1dur_100lc`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestParameters {
    pub duration: String,
    pub payload_size: String,
    pub publishers: String,
    pub subscribers: String,
    pub reliability: String,
    pub communication_pattern: String,
    pub durability: String,
    pub latency_count: String,
}

impl TestParameters {
    pub fn parse(test_name: &str) -> Option<Self> {
        let tokens: Vec<&str> = test_name.split(TEST_NAME_DELIMITER).collect();
        if tokens.len() < 8 {
            return None;
        }
        Some(Self {
            duration: tokens[0].to_owned(),
            payload_size: tokens[1].to_owned(),
            publishers: tokens[2].to_owned(),
            subscribers: tokens[3].to_owned(),
            reliability: tokens[4].to_owned(),
            communication_pattern: tokens[5].to_owned(),
            durability: tokens[6].to_owned(),
            latency_count: tokens[7].to_owned(),
        })
    }

    fn fields(&self) -> [&str; 8] {
        [
            &self.duration,
            &self.payload_size,
            &self.publishers,
            &self.subscribers,
            &self.reliability,
            &self.communication_pattern,
            &self.durability,
            &self.latency_count,
        ]
    }
}

const SWEEP_FIELDS: [&str; 8] = [
    "Durations",
    "Data Lengths",
    "Publishers",
    "Subscribers",
    "Reliabilities",
    "Communication Patterns",
    "Durabilities",
    "Latency Counts",
];

/// Distinct values seen per setting across a batch of tests.
#[derive(Debug, Default, Clone)]
pub struct SweepCoverage {
    values: [BTreeSet<String>; 8],
    tests: usize,
}

impl SweepCoverage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `test_name`; returns false when it does not carry all eight settings.
    pub fn add(&mut self, test_name: &str) -> bool {
        let Some(parameters) = TestParameters::parse(test_name) else {
            return false;
        };
        for (set, value) in self.values.iter_mut().zip(parameters.fields()) {
            set.insert(value.to_owned());
        }
        self.tests += 1;
        true
    }

    pub fn tests(&self) -> usize {
        self.tests
    }

    /// Size of the full cartesian sweep over the observed values.
    pub fn combinations(&self) -> usize {
        if self.tests == 0 {
            return 0;
        }
        self.values.iter().map(BTreeSet::len).product()
    }

    pub fn lines(&self) -> Vec<String> {
        SWEEP_FIELDS
            .iter()
            .zip(&self.values)
            .map(|(field, values)| {
                let joined = values.iter().cloned().collect::<Vec<_>>().join(", ");
                format!("{field}: {joined} ({})", values.len())
            })
            .collect()
    }
}
