use std::collections::BTreeMap;

use serde::Serialize;

use crate::{
    aggregate::{Dimension, Key, NumericField},
    record::Booking,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FiveNumber {
    pub count: usize,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
    pub mean: f64,
}

impl FiveNumber {
    /// `None` for an empty sample; non-finite values are skipped.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        let mut sorted = values
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .collect::<Vec<_>>();
        if sorted.is_empty() {
            return None;
        }
        sorted.sort_by(f64::total_cmp);
        let count = sorted.len();
        Some(Self {
            count,
            min: sorted[0],
            q1: quantile(&sorted, 0.25),
            median: quantile(&sorted, 0.5),
            q3: quantile(&sorted, 0.75),
            max: sorted[count - 1],
            mean: sorted.iter().sum::<f64>() / count as f64,
        })
    }

    pub fn render_cells(&self) -> Vec<String> {
        [self.min, self.q1, self.median, self.q3, self.max, self.mean]
            .iter()
            .map(|value| format!("{value:.2}"))
            .collect()
    }
}

/// Linear interpolation between the closest ranks of a sorted sample.
fn quantile(sorted: &[f64], p: f64) -> f64 {
    let position = p * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let weight = position - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * weight
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistributionRow {
    pub keys: Vec<Key>,
    pub summary: FiveNumber,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistributionTable {
    pub dimensions: Vec<Dimension>,
    pub field: NumericField,
    pub rows: Vec<DistributionRow>,
}

impl DistributionTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn header(&self) -> Vec<String> {
        let mut header = self
            .dimensions
            .iter()
            .map(|dim| dim.column().to_string())
            .collect::<Vec<_>>();
        header.push("count".to_string());
        for stat in ["min", "q1", "median", "q3", "max", "mean"] {
            header.push(format!("{stat}_{}", self.field.column()));
        }
        header
    }

    pub fn render_rows(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|row| {
                let mut cells = row.keys.iter().map(Key::to_string).collect::<Vec<_>>();
                cells.push(row.summary.count.to_string());
                cells.extend(row.summary.render_cells());
                cells
            })
            .collect()
    }
}

pub fn distribution_by(
    rows: &[&Booking],
    dimensions: &[Dimension],
    field: NumericField,
) -> DistributionTable {
    let mut samples: BTreeMap<Vec<Key>, Vec<f64>> = BTreeMap::new();
    for booking in rows {
        let keys = dimensions.iter().map(|dim| dim.key(booking)).collect();
        samples
            .entry(keys)
            .or_default()
            .push(field.value_of(booking));
    }
    DistributionTable {
        dimensions: dimensions.to_vec(),
        field,
        rows: samples
            .into_iter()
            .filter_map(|(keys, values)| {
                FiveNumber::from_values(&values).map(|summary| DistributionRow { keys, summary })
            })
            .collect(),
    }
}
