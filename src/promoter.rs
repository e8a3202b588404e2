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
use dircpy::copy_dir;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const PARTIAL_SUFFIX: &str = ".partial";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Promotion {
    Copied(PathBuf),
    /// Destination existed already and was not touched.
    AlreadyPromoted(PathBuf),
}

/// Copies a validated test tree to `destination_root/<test name>`.
///
/// The tree is copied into a `.partial` sibling first and renamed into place,
/// so an interrupted run never leaves a half-copied test that a rerun would
/// mistake for a promoted one.
pub fn promote(test_path: &Path, destination_root: &Path) -> Result<Promotion> {
    let name = test_path
        .file_name()
        .ok_or_else(|| DigestError::InvalidPath(test_path.display().to_string()))?;
    let destination = destination_root.join(name);
    if destination.exists() {
        return Ok(Promotion::AlreadyPromoted(destination));
    }

    let mut partial_name = name.to_os_string();
    partial_name.push(PARTIAL_SUFFIX);
    let partial = destination_root.join(partial_name);
    if partial.exists() {
        debug!("Removing stale partial copy {}", partial.display());
        std::fs::remove_dir_all(&partial)?;
    }

    copy_dir(test_path, &partial)?;
    std::fs::rename(&partial, &destination)?;
    Ok(Promotion::Copied(destination))
}

/// Removes copies left half-done by an interrupted run, whichever test they
/// belong to. Returns the removed paths.
pub fn sweep_partials(destination_root: &Path) -> Result<Vec<PathBuf>> {
    let mut removed = Vec::new();
    for entry in std::fs::read_dir(destination_root)? {
        let entry = entry?;
        if !entry.file_name().to_string_lossy().ends_with(PARTIAL_SUFFIX) {
            continue;
        }
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            std::fs::remove_dir_all(&path)?;
        } else {
            std::fs::remove_file(&path)?;
        }
        removed.push(path);
    }
    removed.sort();
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn raw_test(root: &TempDir) -> PathBuf {
        let test = root.path().join("raw").join("60s_100B_1P_1S_rel_uc_1dur_100lc");
        fs::create_dir_all(test.join("run_1").join("logs")).unwrap();
        fs::write(test.join("run_1").join("pub_0.csv"), "pub").unwrap();
        fs::write(test.join("run_1").join("logs").join("app1_cpu.log"), "cpu").unwrap();
        test
    }

    #[test]
    fn copies_whole_tree() {
        let root = TempDir::new().unwrap();
        let test = raw_test(&root);
        let output = root.path().join("usable");
        fs::create_dir_all(&output).unwrap();

        let promotion = promote(&test, &output).unwrap();

        let destination = output.join("60s_100B_1P_1S_rel_uc_1dur_100lc");
        assert_eq!(promotion, Promotion::Copied(destination.clone()));
        assert_eq!(
            fs::read_to_string(destination.join("run_1").join("logs").join("app1_cpu.log"))
                .unwrap(),
            "cpu"
        );
        assert!(!output.join("60s_100B_1P_1S_rel_uc_1dur_100lc.partial").exists());
    }

    #[test]
    fn existing_destination_is_not_overwritten() {
        let root = TempDir::new().unwrap();
        let test = raw_test(&root);
        let output = root.path().join("usable");
        fs::create_dir_all(&output).unwrap();
        promote(&test, &output).unwrap();
        fs::write(test.join("run_1").join("pub_0.csv"), "changed").unwrap();

        let promotion = promote(&test, &output).unwrap();

        let destination = output.join("60s_100B_1P_1S_rel_uc_1dur_100lc");
        assert_eq!(promotion, Promotion::AlreadyPromoted(destination.clone()));
        assert_eq!(
            fs::read_to_string(destination.join("run_1").join("pub_0.csv")).unwrap(),
            "pub"
        );
    }

    #[test]
    fn stale_partials_of_any_test_are_swept() {
        let root = TempDir::new().unwrap();
        let test = raw_test(&root);
        let output = root.path().join("usable");
        fs::create_dir_all(output.join("600s_9B_1P_1S_rel_uc_1dur_100lc.partial").join("run_1"))
            .unwrap();
        promote(&test, &output).unwrap();

        let removed = sweep_partials(&output).unwrap();

        assert_eq!(
            removed,
            vec![output.join("600s_9B_1P_1S_rel_uc_1dur_100lc.partial")]
        );
        let left: Vec<String> = fs::read_dir(&output)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(left, vec!["60s_100B_1P_1S_rel_uc_1dur_100lc"]);
    }
}
