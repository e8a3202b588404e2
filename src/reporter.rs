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

use std::cell::RefCell;
use std::fmt::Display;
use tracing::{error, info, warn};

/// Step of the batch a progress line belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Analysing,
    Copying,
    Summarising,
}

impl Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Analysing => "Analysing",
            Self::Copying => "Copying",
            Self::Summarising => "Summarising",
        };
        f.write_str(name)
    }
}

/// Status sink handed to every component for the lifetime of one batch.
pub trait Reporter {
    fn progress(&self, stage: Stage, position: usize, total: usize, test: &str);
    fn info(&self, message: &str);
    fn warn(&self, message: &str);
    fn error(&self, message: &str);
}

/// Forwards everything to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn progress(&self, stage: Stage, position: usize, total: usize, test: &str) {
        info!("[{position}/{total}] {stage} {test}");
    }

    fn info(&self, message: &str) {
        info!("{message}");
    }

    fn warn(&self, message: &str) {
        warn!("{message}");
    }

    fn error(&self, message: &str) {
        error!("{message}");
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportEvent {
    Progress {
        stage: Stage,
        position: usize,
        total: usize,
        test: String,
    },
    Info(String),
    Warn(String),
    Error(String),
}

/// Keeps every event in memory, used to inspect a batch after the fact.
#[derive(Debug, Default)]
pub struct MemoryReporter {
    events: RefCell<Vec<ReportEvent>>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ReportEvent> {
        self.events.borrow().clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.events
            .borrow()
            .iter()
            .filter_map(|event| match event {
                ReportEvent::Error(message) => Some(message.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.events
            .borrow()
            .iter()
            .filter_map(|event| match event {
                ReportEvent::Warn(message) => Some(message.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn progress_count(&self, stage: Stage) -> usize {
        self.events
            .borrow()
            .iter()
            .filter(|event| matches!(event, ReportEvent::Progress { stage: s, .. } if *s == stage))
            .count()
    }
}

impl Reporter for MemoryReporter {
    fn progress(&self, stage: Stage, position: usize, total: usize, test: &str) {
        self.events.borrow_mut().push(ReportEvent::Progress {
            stage,
            position,
            total,
            test: test.to_owned(),
        });
    }

    fn info(&self, message: &str) {
        self.events
            .borrow_mut()
            .push(ReportEvent::Info(message.to_owned()));
    }

    fn warn(&self, message: &str) {
        self.events
            .borrow_mut()
            .push(ReportEvent::Warn(message.to_owned()));
    }

    fn error(&self, message: &str) {
        self.events
            .borrow_mut()
            .push(ReportEvent::Error(message.to_owned()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_reporter_records_in_order() {
        let reporter = MemoryReporter::new();
        reporter.progress(Stage::Copying, 1, 2, "a");
        reporter.warn("careful");
        reporter.error("broken");

        assert_eq!(reporter.events().len(), 3);
        assert_eq!(reporter.progress_count(Stage::Copying), 1);
        assert_eq!(reporter.progress_count(Stage::Analysing), 0);
        assert_eq!(reporter.warnings(), vec!["careful".to_owned()]);
        assert_eq!(reporter.errors(), vec!["broken".to_owned()]);
    }
}
