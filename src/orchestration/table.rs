use std::collections::BTreeMap;

use anyhow::{bail, Context};
use serde::Serialize;

/// `<metric>_<TT>` with `TT` the 1-based, two-digit timepoint.
pub fn timepoint_column(metric: &str, t: usize) -> String {
    format!("{}_{:02}", metric, t + 1)
}

/// Tidy numeric table: one string index and named `f64` columns kept in
/// lexicographic order. NaN marks a missing value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    pub index_name: String,
    pub index: Vec<String>,
    pub columns: BTreeMap<String, Vec<f64>>,
}

impl Table {
    pub fn new(index_name: impl Into<String>, index: Vec<String>) -> Self {
        Table {
            index_name: index_name.into(),
            index,
            columns: BTreeMap::new(),
        }
    }

    pub fn n_rows(&self) -> usize {
        self.index.len()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.keys().map(String::as_str).collect()
    }

    pub fn insert_column(&mut self, name: impl Into<String>, values: Vec<f64>) -> anyhow::Result<()> {
        let name = name.into();
        if values.len() != self.index.len() {
            bail!(
                "column {} has {} values for {} rows",
                name,
                values.len(),
                self.index.len()
            );
        }
        if self.columns.contains_key(&name) {
            bail!("duplicate column {}", name);
        }
        self.columns.insert(name, values);
        Ok(())
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns.get(name).map(Vec::as_slice)
    }

    pub fn get(&self, row: &str, column: &str) -> Option<f64> {
        let i = self.index.iter().position(|r| r == row)?;
        self.columns.get(column).map(|values| values[i])
    }

    /// Appends the columns of `other`, which must share this table's index.
    pub fn join(&mut self, other: Table) -> anyhow::Result<()> {
        if other.index != self.index {
            bail!(
                "cannot join tables over different {} indices ({} vs {} rows)",
                self.index_name,
                self.index.len(),
                other.index.len()
            );
        }
        for (name, values) in other.columns {
            self.insert_column(name, values)
                .context("joining analysis tables")?;
        }
        Ok(())
    }

    pub fn to_json(&self) -> anyhow::Result<String> {
        serde_json::to_string_pretty(self).context("failed to serialize table")
    }
}
