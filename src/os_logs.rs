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
use crate::error::Result;
use crate::reader::MetricSeries;
use std::path::{Path, PathBuf};

/// Kind of sar log collected per machine during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OsLogKind {
    Cpu,
    Memory,
    Network,
    NetworkErrors,
}

/// How rows sharing a timestamp are narrowed down before summing.
#[derive(Debug, Clone, Copy)]
enum RowFilter {
    Keep(&'static str, &'static str),
    Exclude(&'static str, &'static str),
}

impl OsLogKind {
    // `_edev` must be tried before `_dev`.
    const ALL: [Self; 4] = [Self::NetworkErrors, Self::Network, Self::Cpu, Self::Memory];

    pub fn suffix(&self) -> &'static str {
        match self {
            Self::Cpu => "_cpu.log",
            Self::Memory => "_mem.log",
            Self::Network => "_dev.log",
            Self::NetworkErrors => "_edev.log",
        }
    }

    /// `(sar header, summary metric)` pairs.
    pub fn metrics(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            Self::Cpu => &[
                ("%user", "cpu_user"),
                ("%system", "cpu_system"),
                ("%iowait", "cpu_iowait"),
                ("%idle", "cpu_idle"),
            ],
            Self::Memory => &[
                ("kbmemfree", "mem_free_kb"),
                ("kbmemused", "mem_used_kb"),
                ("%memused", "mem_used_percent"),
            ],
            Self::Network => &[
                ("rxpck/s", "net_rx_packets_per_s"),
                ("txpck/s", "net_tx_packets_per_s"),
                ("rxkB/s", "net_rx_kb_per_s"),
                ("txkB/s", "net_tx_kb_per_s"),
            ],
            Self::NetworkErrors => &[
                ("rxerr/s", "net_rx_errors_per_s"),
                ("txerr/s", "net_tx_errors_per_s"),
                ("coll/s", "net_collisions_per_s"),
            ],
        }
    }

    fn filter(&self) -> Option<RowFilter> {
        match self {
            Self::Cpu => Some(RowFilter::Keep("CPU", "all")),
            Self::Memory => None,
            Self::Network | Self::NetworkErrors => Some(RowFilter::Exclude("IFACE", "lo")),
        }
    }

    fn anchor(&self) -> &'static str {
        self.metrics()[0].0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OsLogFile {
    pub path: PathBuf,
    pub host: String,
    pub kind: OsLogKind,
}

/// Splits `<host>_<kind>.log` into its host and kind.
pub fn classify(file_name: &str) -> Option<(String, OsLogKind)> {
    OsLogKind::ALL.iter().find_map(|kind| {
        file_name
            .strip_suffix(kind.suffix())
            .filter(|host| !host.is_empty())
            .map(|host| (host.to_owned(), *kind))
    })
}

/// Every recognised log file in `logs_dir`, ordered by file name.
pub fn discover_os_logs(logs_dir: &Path) -> Result<Vec<OsLogFile>> {
    let mut logs: Vec<OsLogFile> = std::fs::read_dir(logs_dir)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
        .filter_map(|entry| {
            let name = entry.file_name().to_string_lossy().into_owned();
            classify(&name).map(|(host, kind)| OsLogFile {
                path: entry.path(),
                host,
                kind,
            })
        })
        .collect();
    logs.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(logs)
}

/// Parses one sar text log into `<host>_<metric>` series.
///
/// Rows are grouped by timestamp; network rows are summed over every
/// interface except loopback and CPU rows are limited to the `all` line.
pub fn read_os_log(log: &OsLogFile, config: &DigestConfig) -> Result<Vec<MetricSeries>> {
    let bytes = std::fs::read(&log.path)?;
    let text = String::from_utf8_lossy(&bytes);
    let lines: Vec<Vec<&str>> = text
        .lines()
        .skip(config.os_log_header_rows)
        .map(|line| line.split_whitespace().collect::<Vec<_>>())
        .filter(|tokens| !tokens.is_empty())
        .collect();
    let lines = &lines[..lines.len().saturating_sub(config.os_log_footer_rows)];

    let anchor = log.kind.anchor();
    let Some(header_index) = lines.iter().position(|tokens| tokens.contains(&anchor)) else {
        return Ok(Vec::new());
    };
    let headers = &lines[header_index];

    let filter = log.kind.filter().and_then(|filter| {
        let (column, value, keep) = match filter {
            RowFilter::Keep(column, value) => (column, value, true),
            RowFilter::Exclude(column, value) => (column, value, false),
        };
        headers
            .iter()
            .position(|h| *h == column)
            .map(|index| (index, value, keep))
    });

    let metric_columns: Vec<(Option<usize>, &str)> = log
        .kind
        .metrics()
        .iter()
        .map(|(header, metric)| (headers.iter().position(|h| h == header), *metric))
        .collect();

    let key_len = match filter {
        Some((index, _, _)) => index,
        None => metric_columns
            .iter()
            .filter_map(|(index, _)| *index)
            .min()
            .unwrap_or(1),
    };

    let rows = lines[header_index + 1..]
        .iter()
        .filter(|tokens| tokens.len() == headers.len())
        .filter(|tokens| !tokens.contains(&anchor))
        .filter(|tokens| !tokens[0].starts_with("Average"))
        .filter(|tokens| match filter {
            Some((index, value, keep)) => (tokens[index] == value) == keep,
            None => true,
        });

    let mut groups: Vec<(Vec<&str>, Vec<&Vec<&str>>)> = Vec::new();
    for row in rows {
        let key = &row[..key_len];
        let same_timestamp = groups
            .last()
            .is_some_and(|(last_key, _)| last_key.as_slice() == key);
        if same_timestamp {
            if let Some((_, members)) = groups.last_mut() {
                members.push(row);
            }
        } else {
            groups.push((key.to_vec(), vec![row]));
        }
    }

    Ok(metric_columns
        .iter()
        .filter_map(|(index, metric)| index.map(|index| (index, *metric)))
        .map(|(index, metric)| {
            let values = groups
                .iter()
                .map(|(_, members)| {
                    members
                        .iter()
                        .filter_map(|row| row[index].parse::<f64>().ok())
                        .reduce(|total, value| total + value)
                })
                .collect();
            MetricSeries::new(format!("{}_{metric}", log.host), values)
        })
        .collect())
}
