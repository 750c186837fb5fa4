use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A running mean kept as a weighted sum.
///
/// `metric` is always `total / numel` and is `None` while nothing has been
/// observed, so merging records never averages averages.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MetricRecord {
    pub metric: Option<f64>,
    pub total: f64,
    pub numel: usize,
}

impl MetricRecord {
    pub fn from_sum(total: f64, numel: usize) -> Self {
        let mut record = Self {
            metric: None,
            total,
            numel,
        };
        record.refresh();
        record
    }

    pub fn update(&mut self, stat: impl Into<Stat>) {
        match stat.into() {
            Stat::Scalar(value) => {
                self.total += value;
                self.numel += 1;
            }
            Stat::Aggregate { total, numel } => {
                self.total += total;
                self.numel += numel;
            }
        }
        self.refresh();
    }

    fn refresh(&mut self) {
        self.metric = (self.numel > 0).then(|| self.total / self.numel as f64);
    }
}

/// One observation handed to the accumulator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Stat {
    /// A single value; counts as one element.
    Scalar(f64),
    /// A pre-reduced sum over `numel` elements.
    Aggregate { total: f64, numel: usize },
}

impl From<f64> for Stat {
    fn from(value: f64) -> Self {
        Stat::Scalar(value)
    }
}

impl From<i64> for Stat {
    fn from(value: i64) -> Self {
        Stat::Scalar(value as f64)
    }
}

impl From<MetricRecord> for Stat {
    fn from(record: MetricRecord) -> Self {
        Stat::Aggregate {
            total: record.total,
            numel: record.numel,
        }
    }
}

/// Metric name to running record. Entries are created on first update and
/// never removed.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricsTable {
    records: BTreeMap<String, MetricRecord>,
}

impl MetricsTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, name: &str, stat: impl Into<Stat>) {
        if let Some(record) = self.records.get_mut(name) {
            record.update(stat);
        } else {
            let mut record = MetricRecord::default();
            record.update(stat);
            self.records.insert(name.to_string(), record);
        }
    }

    /// Folds every record of `other` into this table.
    pub fn merge(&mut self, other: &MetricsTable) {
        for (name, record) in &other.records {
            self.update(name, *record);
        }
    }

    pub fn get(&self, name: &str) -> Option<&MetricRecord> {
        self.records.get(name)
    }

    pub fn metric(&self, name: &str) -> Option<f64> {
        self.records.get(name).and_then(|r| r.metric)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.records.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetricRecord)> {
        self.records.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl<'a> IntoIterator for &'a MetricsTable {
    type Item = (&'a String, &'a MetricRecord);
    type IntoIter = std::collections::btree_map::Iter<'a, String, MetricRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
