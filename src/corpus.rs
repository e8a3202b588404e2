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
use std::path::{Path, PathBuf};

/// A test directory discovered under a corpus root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    pub name: String,
    pub path: PathBuf,
}

/// Snapshot of the test directories under a root, sorted by name.
///
/// The order is fixed at discovery and defines which test is "next" for
/// leftover recovery, so the root is never re-listed afterwards.
#[derive(Debug, Clone, Default)]
pub struct TestCorpus {
    root: PathBuf,
    tests: Vec<TestCase>,
}

impl TestCorpus {
    pub fn discover(root: &Path) -> Result<Self> {
        if !root.is_dir() {
            return Err(DigestError::InvalidPath(format!(
                "{} does not exist or is not a folder",
                root.display()
            )));
        }

        let mut tests: Vec<TestCase> = std::fs::read_dir(root)?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().map(|t| t.is_dir()).unwrap_or(false))
            .map(|entry| TestCase {
                name: entry.file_name().to_string_lossy().into_owned(),
                path: entry.path(),
            })
            .collect();
        tests.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(Self {
            root: root.to_path_buf(),
            tests,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn tests(&self) -> &[TestCase] {
        &self.tests
    }

    pub fn len(&self) -> usize {
        self.tests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tests.is_empty()
    }

    pub fn next_after(&self, index: usize) -> Option<&TestCase> {
        self.tests.get(index + 1)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tests.iter().map(|test| test.name.as_str())
    }
}
