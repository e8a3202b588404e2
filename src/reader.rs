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
use crate::error::{DigestError, Result};
use csv::{ReaderBuilder, Trim};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Case-insensitive substring test against a perftest header cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnMatcher {
    pub needle: &'static str,
    pub exclude: Option<&'static str>,
}

impl ColumnMatcher {
    pub const fn new(needle: &'static str) -> Self {
        Self {
            needle,
            exclude: None,
        }
    }

    pub const fn excluding(needle: &'static str, exclude: &'static str) -> Self {
        Self {
            needle,
            exclude: Some(exclude),
        }
    }

    pub fn matches(&self, header: &str) -> bool {
        let header = header.to_lowercase();
        header.contains(self.needle) && self.exclude.is_none_or(|ex| !header.contains(ex))
    }
}

pub const LATENCY: ColumnMatcher = ColumnMatcher::new("latency");
pub const THROUGHPUT: ColumnMatcher = ColumnMatcher::new("mbps");
pub const SAMPLE_RATE: ColumnMatcher = ColumnMatcher::new("samples/s");
pub const TOTAL_SAMPLES: ColumnMatcher = ColumnMatcher::excluding("total samples", "%");
pub const LOST_SAMPLES: ColumnMatcher = ColumnMatcher::excluding("lost samples", "%");

/// First header satisfying `matcher`; ambiguity is not an error.
pub fn resolve_column(headers: &[String], matcher: &ColumnMatcher) -> Option<usize> {
    headers.iter().position(|header| matcher.matches(header))
}

/// A named series of samples read from one perftest csv.
///
/// Values keep their row position; a cell that did not parse is `None`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MetricSeries {
    pub name: String,
    pub values: Vec<Option<f64>>,
}

impl MetricSeries {
    pub fn new(name: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn max(&self) -> Option<f64> {
        self.values.iter().flatten().copied().reduce(f64::max)
    }

    /// Values that were actually observed, in row order.
    pub fn observed(&self) -> Vec<f64> {
        self.values.iter().flatten().copied().collect()
    }

    /// Removes up to `rows` values from the tail.
    pub fn drop_tail(mut self, rows: usize) -> Self {
        let keep = self.values.len().saturating_sub(rows);
        self.values.truncate(keep);
        self
    }
}

/// Body of a perftest csv with preamble and footer removed.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    pub path: PathBuf,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    /// Reads `path`, skipping `preamble_rows` leading lines and `footer_rows`
    /// trailing data lines. Blank lines are ignored, and rows whose field
    /// count differs from the header are dropped.
    pub fn read(path: &Path, preamble_rows: usize, footer_rows: usize) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let text = String::from_utf8_lossy(&bytes);
        let lines: Vec<&str> = text
            .lines()
            .skip(preamble_rows)
            .filter(|line| !line.trim().is_empty())
            .collect();

        let Some((header_line, body)) = lines.split_first() else {
            return Ok(Self {
                path: path.to_path_buf(),
                ..Self::default()
            });
        };
        let body = &body[..body.len().saturating_sub(footer_rows)];

        let headers: Vec<String> = parse_records(header_line)
            .into_iter()
            .next()
            .unwrap_or_default();

        let mut skipped = 0usize;
        let mut rows = Vec::with_capacity(body.len());
        for record in parse_records(&body.join("\n")) {
            if record.len() == headers.len() {
                rows.push(record);
            } else {
                skipped += 1;
            }
        }
        if skipped > 0 {
            debug!("Skipped {skipped} malformed rows in {}", path.display());
        }

        Ok(Self {
            path: path.to_path_buf(),
            headers,
            rows,
        })
    }

    pub fn column(&self, matcher: &ColumnMatcher) -> Result<usize> {
        resolve_column(&self.headers, matcher).ok_or_else(|| DigestError::ColumnNotFound {
            column: matcher.needle.to_owned(),
            path: self.path.clone(),
        })
    }

    /// One entry per row of column `index`; cells that do not parse are `None`.
    pub fn values(&self, index: usize) -> Vec<Option<f64>> {
        self.rows
            .iter()
            .map(|row| row.get(index).and_then(|cell| cell.parse::<f64>().ok()))
            .collect()
    }
}

fn parse_records(text: &str) -> Vec<Vec<String>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(text.as_bytes());

    reader
        .records()
        .filter_map(|record| record.ok())
        .map(|record| record.iter().map(str::to_owned).collect())
        .collect()
}

/// Series name for a participant file, e.g. `sub_3` for `.../sub_3.csv`.
pub fn series_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().replace(".csv", ""))
        .unwrap_or_default()
}

pub fn read_metric_series(
    path: &Path,
    matcher: &ColumnMatcher,
    preamble_rows: usize,
    footer_rows: usize,
) -> Result<MetricSeries> {
    let table = RawTable::read(path, preamble_rows, footer_rows)?;
    let column = table.column(matcher)?;
    Ok(MetricSeries::new(series_name(path), table.values(column)))
}

/// Latency samples of the publisher file.
pub fn latency_series(path: &Path, config: &DigestConfig) -> Result<MetricSeries> {
    read_metric_series(
        path,
        &LATENCY,
        config.csv_preamble_rows,
        config.publisher_footer_rows,
    )
}

/// One subscriber's samples with the perftest average rows removed.
pub fn subscriber_series(
    path: &Path,
    matcher: &ColumnMatcher,
    config: &DigestConfig,
) -> Result<MetricSeries> {
    let series = read_metric_series(
        path,
        matcher,
        config.csv_preamble_rows,
        config.subscriber_footer_rows,
    )?;
    Ok(series.drop_tail(config.subscriber_average_rows))
}

/// Largest value a subscriber reported for a cumulative counter column.
pub fn subscriber_peak(
    path: &Path,
    matcher: &ColumnMatcher,
    config: &DigestConfig,
) -> Result<Option<f64>> {
    let series = read_metric_series(
        path,
        matcher,
        config.csv_preamble_rows,
        config.subscriber_footer_rows,
    )?;
    Ok(series.max())
}

/// Row-wise sum of the same column across every subscriber file.
///
/// Series are aligned on row index; a subscriber that ran out of rows or has
/// an unreadable cell simply does not contribute to that row. A row no
/// subscriber observed stays `None`. The trailing rows perftest appends are
/// dropped after summing.
pub fn total_series(
    files: &[PathBuf],
    matcher: &ColumnMatcher,
    config: &DigestConfig,
) -> Result<MetricSeries> {
    let series = files
        .iter()
        .map(|file| {
            read_metric_series(
                file,
                matcher,
                config.csv_preamble_rows,
                config.subscriber_footer_rows,
            )
        })
        .collect::<Result<Vec<_>>>()?;

    let name = format!("total_{}", matcher.needle);
    Ok(MetricSeries::new(name, outer_sum(&series)).drop_tail(config.total_trailing_rows))
}

fn outer_sum(series: &[MetricSeries]) -> Vec<Option<f64>> {
    let rows = series.iter().map(MetricSeries::len).max().unwrap_or(0);
    (0..rows)
        .map(|row| {
            series
                .iter()
                .filter_map(|s| s.values.get(row).copied().flatten())
                .reduce(|total, value| total + value)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn subscriber_csv(samples: &[(u64, f64, f64, u64)]) -> String {
        let mut csv = String::from(
            "Perftest subscriber\nReliable, Unicast\n\
             Length (Bytes), Total Samples, Samples/s, Avg Samples/s, Mbps, Avg Mbps, Lost Samples, Lost Samples (%)\n",
        );
        for (total, rate, mbps, lost) in samples {
            csv.push_str(&format!(
                "32000, {total}, {rate}, {rate}, {mbps}, {mbps}, {lost}, 0.00\n"
            ));
        }
        let (last_total, _, _, last_lost) = samples.last().copied().unwrap_or_default();
        for _ in 0..2 {
            csv.push_str(&format!(
                "32000, {last_total}, 15, 15, 2.0, 2.0, {last_lost}, 0.00\n"
            ));
        }
        csv.push_str("\nSummary:\nLength (Bytes), Total Samples, Avg Samples/s\n32000, 999, 15\n");
        csv
    }

    fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn matcher_is_case_insensitive_and_honours_exclusion() {
        assert!(LATENCY.matches("Latency (us)"));
        assert!(LOST_SAMPLES.matches("Lost Samples"));
        assert!(!LOST_SAMPLES.matches("Lost Samples (%)"));
        let headers = vec!["Samples/s".to_owned(), "Avg Samples/s".to_owned()];
        assert_eq!(resolve_column(&headers, &SAMPLE_RATE), Some(0));
        assert_eq!(resolve_column(&headers, &LATENCY), None);
    }

    #[test]
    fn subscriber_series_strips_footer_and_averages() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "sub_0.csv",
            &subscriber_csv(&[(100, 10.0, 1.5, 0), (200, 20.0, 2.5, 1)]),
        );
        let config = DigestConfig::default();

        let series = subscriber_series(&path, &THROUGHPUT, &config).unwrap();
        assert_eq!(series.name, "sub_0");
        assert_eq!(series.observed(), vec![1.5, 2.5]);

        let peak = subscriber_peak(&path, &TOTAL_SAMPLES, &config).unwrap();
        assert_eq!(peak, Some(200.0));
    }

    #[test]
    fn truncated_rows_are_skipped_and_garbled_cells_keep_their_row() {
        let dir = TempDir::new().unwrap();
        let contents = "a\nb\nLength, Latency (us)\n32000, 10\n32000\n32000, x\n32000, 30\n";
        let path = write(&dir, "pub_0.csv", contents);
        let series = read_metric_series(&path, &LATENCY, 2, 0).unwrap();
        assert_eq!(series.values, vec![Some(10.0), None, Some(30.0)]);
        assert_eq!(series.observed(), vec![10.0, 30.0]);
    }

    #[test]
    fn missing_column_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "pub_0.csv", "a\nb\nLength, Samples\n1, 2\n");
        let err = read_metric_series(&path, &LATENCY, 2, 0).unwrap_err();
        assert!(matches!(err, DigestError::ColumnNotFound { .. }));
    }

    #[test]
    fn fewer_rows_than_footer_yields_empty_series() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "sub_0.csv", "a\nb\nLength, Mbps\n32000, 1.0\n");
        let series = subscriber_series(&path, &THROUGHPUT, &DigestConfig::default()).unwrap();
        assert!(series.is_empty());
    }

    #[test]
    fn totals_are_outer_joined_sums() {
        let dir = TempDir::new().unwrap();
        let config = DigestConfig {
            subscriber_footer_rows: 0,
            total_trailing_rows: 1,
            ..DigestConfig::default()
        };
        let a = write(&dir, "sub_0.csv", "a\nb\nMbps\n1\n2\n3\n4\n");
        let b = write(&dir, "sub_1.csv", "a\nb\nMbps\n10\n20\n");

        let total = total_series(&[a, b], &THROUGHPUT, &config).unwrap();
        assert_eq!(total.name, "total_mbps");
        assert_eq!(total.values, vec![Some(11.0), Some(22.0), Some(3.0)]);
    }

    #[test]
    fn garbled_cell_does_not_shift_later_samples() {
        let dir = TempDir::new().unwrap();
        let config = DigestConfig {
            subscriber_footer_rows: 0,
            total_trailing_rows: 0,
            ..DigestConfig::default()
        };
        let a = write(&dir, "sub_0.csv", "a\nb\nMbps\n1\n-nan(ind)\n3\n");
        let b = write(&dir, "sub_1.csv", "a\nb\nMbps\n10\n20\n30\n");

        let total = total_series(&[a, b], &THROUGHPUT, &config).unwrap();
        assert_eq!(total.values, vec![Some(11.0), Some(20.0), Some(33.0)]);
    }

    #[test]
    fn row_without_any_observation_stays_empty() {
        let dir = TempDir::new().unwrap();
        let config = DigestConfig {
            subscriber_footer_rows: 0,
            total_trailing_rows: 0,
            ..DigestConfig::default()
        };
        let a = write(&dir, "sub_0.csv", "a\nb\nMbps\n1\nx\n3\n");

        let total = total_series(&[a], &THROUGHPUT, &config).unwrap();
        assert_eq!(total.values, vec![Some(1.0), None, Some(3.0)]);
    }
}
