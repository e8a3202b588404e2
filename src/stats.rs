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

#![allow(clippy::cast_precision_loss)]

use crate::error::Result;
use crate::table::SummaryTable;
use serde::Serialize;
use std::path::Path;

/// z-score of a two sided 95% normal interval.
const Z_95: f64 = 1.959_963_984_540_054;

/// Whole-test series that get a statistics row.
pub const DESCRIBED_COLUMNS: [&str; 3] = ["latency_us", "total_throughput_mbps", "total_sample_rate"];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DescriptiveStats {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub variance: f64,
    pub std: f64,
    pub skew: f64,
    pub range: f64,
    pub lower_quartile: f64,
    pub upper_quartile: f64,
    pub interquartile_range: f64,
    pub min: f64,
    pub max: f64,
    pub confidence_interval_95: (f64, f64),
}

impl DescriptiveStats {
    /// Returns `None` for an empty sample. Dispersion measures need at
    /// least two values and are zero otherwise.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }

        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let count = sorted.len();
        let n = count as f64;
        let mean = sorted.iter().sum::<f64>() / n;
        let min = sorted[0];
        let max = sorted[count - 1];

        let squared: f64 = sorted.iter().map(|v| (v - mean).powi(2)).sum();
        let variance = if count > 1 { squared / (n - 1.0) } else { 0.0 };
        let std = variance.sqrt();

        let lower_quartile = percentile(&sorted, 25.0);
        let upper_quartile = percentile(&sorted, 75.0);

        let sem = if count > 1 { std / n.sqrt() } else { 0.0 };

        Some(Self {
            count,
            mean,
            median: percentile(&sorted, 50.0),
            variance,
            std,
            skew: skewness(&sorted, mean),
            range: max - min,
            lower_quartile,
            upper_quartile,
            interquartile_range: upper_quartile - lower_quartile,
            min,
            max,
            confidence_interval_95: (mean - Z_95 * sem, mean + Z_95 * sem),
        })
    }
}

/// Linear interpolation between closest ranks of already sorted data.
pub fn percentile(sorted: &[f64], percentile: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }

    let last = (sorted.len() - 1) as f64;
    let rank = (percentile / 100.0 * last).clamp(0.0, last);
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let weight = rank - lower as f64;
    sorted[lower].mul_add(1.0 - weight, sorted[upper] * weight)
}

/// Adjusted Fisher-Pearson sample skewness; zero below three samples or
/// for a constant series.
fn skewness(values: &[f64], mean: f64) -> f64 {
    let n = values.len() as f64;
    if values.len() < 3 {
        return 0.0;
    }
    let m2 = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    if m2 == 0.0 {
        return 0.0;
    }
    let m3 = values.iter().map(|v| (v - mean).powi(3)).sum::<f64>() / n;
    let g1 = m3 / m2.powf(1.5);
    g1 * (n * (n - 1.0)).sqrt() / (n - 2.0)
}

/// One row of `summary_stats.csv`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsRow {
    pub test: String,
    pub metric: String,
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub variance: f64,
    pub std: f64,
    pub skew: f64,
    pub range: f64,
    pub lower_quartile: f64,
    pub upper_quartile: f64,
    pub interquartile_range: f64,
    pub min: f64,
    pub max: f64,
    pub ci95_low: f64,
    pub ci95_high: f64,
}

impl StatsRow {
    fn new(test: &str, metric: &str, stats: DescriptiveStats) -> Self {
        Self {
            test: test.to_owned(),
            metric: metric.to_owned(),
            count: stats.count,
            mean: stats.mean,
            median: stats.median,
            variance: stats.variance,
            std: stats.std,
            skew: stats.skew,
            range: stats.range,
            lower_quartile: stats.lower_quartile,
            upper_quartile: stats.upper_quartile,
            interquartile_range: stats.interquartile_range,
            min: stats.min,
            max: stats.max,
            ci95_low: stats.confidence_interval_95.0,
            ci95_high: stats.confidence_interval_95.1,
        }
    }
}

/// Statistics rows for the whole-test series of one summary table.
pub fn describe_summary(test: &str, table: &SummaryTable) -> Vec<StatsRow> {
    DESCRIBED_COLUMNS
        .iter()
        .filter_map(|metric| {
            let column = table.column(metric)?;
            let stats = DescriptiveStats::from_values(&column.observed())?;
            Some(StatsRow::new(test, metric, stats))
        })
        .collect()
}

pub fn write_stats(path: &Path, rows: &[StatsRow]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}
