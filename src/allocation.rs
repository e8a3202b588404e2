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

use crate::error::Result;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Default, Deserialize)]
struct MachineLayout {
    #[serde(default)]
    machines: Vec<Machine>,
}

#[derive(Debug, Default, Deserialize)]
struct Machine {
    #[serde(default)]
    scripts: Vec<String>,
}

/// Publisher and subscriber processes started on each machine of a test.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParticipantAllocation {
    pub publishers: Vec<usize>,
    pub subscribers: Vec<usize>,
}

impl ParticipantAllocation {
    pub fn machines(&self) -> usize {
        self.publishers.len()
    }
}

pub fn read_allocation(path: &Path) -> Result<ParticipantAllocation> {
    let data = std::fs::read_to_string(path)?;
    let layout: MachineLayout = serde_json::from_str(&data)?;

    let count = |scripts: &[String], flag: &str| {
        scripts
            .iter()
            .flat_map(|script| script.split_whitespace())
            .filter(|token| *token == flag)
            .count()
    };

    Ok(ParticipantAllocation {
        publishers: layout
            .machines
            .iter()
            .map(|m| count(&m.scripts, "-pub"))
            .collect(),
        subscribers: layout
            .machines
            .iter()
            .map(|m| count(&m.scripts, "-sub"))
            .collect(),
    })
}
