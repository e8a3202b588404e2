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
use std::path::Path;

/// A named column of variable length. `None` marks a row without an
/// observation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SummaryColumn {
    pub name: String,
    pub values: Vec<Option<f64>>,
}

impl SummaryColumn {
    pub fn observed(&self) -> Vec<f64> {
        self.values.iter().flatten().copied().collect()
    }
}

/// Wide, ragged table: columns keep their own length and are only padded
/// with blank cells when written out.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SummaryTable {
    columns: Vec<SummaryColumn>,
}

impl SummaryTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a series column, replacing an existing column of the same name.
    /// The column ends at its last observation.
    pub fn push_series(&mut self, name: impl Into<String>, mut values: Vec<Option<f64>>) {
        trim_unobserved(&mut values);
        let name = name.into();
        match self.columns.iter_mut().find(|column| column.name == name) {
            Some(column) => column.values = values,
            None => self.columns.push(SummaryColumn { name, values }),
        }
    }

    /// A single observation stored in the first row only.
    pub fn push_scalar(&mut self, name: impl Into<String>, value: f64) {
        self.push_series(name, vec![Some(value)]);
    }

    pub fn columns(&self) -> &[SummaryColumn] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&SummaryColumn> {
        self.columns.iter().find(|column| column.name == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn row_count(&self) -> usize {
        self.columns.iter().map(|c| c.values.len()).max().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Writes the table with a leading row-index column. Missing cells are
    /// left empty so they can be told apart from an observed zero.
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;

        let mut header = Vec::with_capacity(self.columns.len() + 1);
        header.push(String::new());
        header.extend(self.columns.iter().map(|c| c.name.clone()));
        writer.write_record(&header)?;

        for row in 0..self.row_count() {
            let mut record = Vec::with_capacity(self.columns.len() + 1);
            record.push(row.to_string());
            record.extend(self.columns.iter().map(|c| {
                c.values
                    .get(row)
                    .copied()
                    .flatten()
                    .map(|value| value.to_string())
                    .unwrap_or_default()
            }));
            writer.write_record(&record)?;
        }

        writer.flush()?;
        Ok(())
    }

    pub fn read_csv(path: &Path) -> Result<Self> {
        let invalid = |reason: String| DigestError::InvalidSummary {
            path: path.to_path_buf(),
            reason,
        };

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_path(path)?;
        let headers = reader.headers()?.clone();
        let mut columns: Vec<SummaryColumn> = headers
            .iter()
            .skip(1)
            .map(|name| SummaryColumn {
                name: name.to_owned(),
                values: Vec::new(),
            })
            .collect();

        for (row, record) in reader.records().enumerate() {
            let record = record?;
            for (index, column) in columns.iter_mut().enumerate() {
                let cell = record.get(index + 1).unwrap_or_default();
                if cell.is_empty() {
                    column.values.push(None);
                    continue;
                }
                let value = cell.parse::<f64>().map_err(|e| {
                    invalid(format!("row {row} of '{}' is not a number: {e}", column.name))
                })?;
                column.values.push(Some(value));
            }
        }

        // Blank padding after a column's last observation is not part of it.
        for column in &mut columns {
            trim_unobserved(&mut column.values);
        }

        Ok(Self { columns })
    }
}

fn trim_unobserved(values: &mut Vec<Option<f64>>) {
    let len = values
        .iter()
        .rposition(Option::is_some)
        .map_or(0, |last| last + 1);
    values.truncate(len);
}
