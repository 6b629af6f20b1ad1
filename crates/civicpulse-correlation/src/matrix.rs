//! Pairwise Pearson correlation across analysis columns.

use std::collections::BTreeMap;

use civicpulse_types::ZoneId;
use serde::{Deserialize, Serialize};

use crate::aggregate::{AggregatedRow, Column, column_values, coverage};
use crate::analysis::Analysis;
use crate::stats::pearson_pairwise;

/// Fewest aggregated rows a matrix is computed from.
pub const MIN_MATRIX_ROWS: usize = 10;

/// Fewest non-null values for a column to enter the matrix.
pub const MIN_COLUMN_COVERAGE: usize = 2;

/// Correlation between every pair of usable columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    /// `matrix[a][b]` is the correlation of `a` with `b`. Undefined pairs
    /// are absent.
    pub matrix: BTreeMap<Column, BTreeMap<Column, f64>>,
    /// Usable columns in canonical order.
    pub columns: Vec<Column>,
    /// Rows the matrix was computed from.
    pub data_points: usize,
    /// The zone analysed, or `None` for the whole city.
    pub zone_id: Option<ZoneId>,
}

impl CorrelationMatrix {
    /// Correlation of two columns, if defined.
    pub fn get(&self, a: Column, b: Column) -> Option<f64> {
        self.matrix.get(&a).and_then(|row| row.get(&b)).copied()
    }

    /// Each defined unordered pair once, in canonical order.
    pub fn pairs(&self) -> Vec<(Column, Column, f64)> {
        let mut pairs = Vec::new();
        for (i, a) in self.columns.iter().enumerate() {
            for b in self.columns.iter().skip(i.saturating_add(1)) {
                if let Some(r) = self.get(*a, *b) {
                    pairs.push((*a, *b, r));
                }
            }
        }
        pairs
    }
}

/// Compute the matrix over already-filtered rows.
pub fn correlation_matrix(
    rows: &[AggregatedRow],
    zone_id: Option<ZoneId>,
) -> Analysis<CorrelationMatrix> {
    if rows.len() < MIN_MATRIX_ROWS {
        return Analysis::insufficient(format!(
            "{} aggregated rows, need at least {MIN_MATRIX_ROWS}",
            rows.len()
        ));
    }

    let columns: Vec<Column> = Column::ALL
        .into_iter()
        .filter(|c| coverage(rows, *c) >= MIN_COLUMN_COVERAGE)
        .collect();
    if columns.len() < 2 {
        return Analysis::insufficient(format!("{} usable columns, need at least 2", columns.len()));
    }

    let values: Vec<Vec<Option<f64>>> = columns.iter().map(|c| column_values(rows, *c)).collect();
    let mut matrix: BTreeMap<Column, BTreeMap<Column, f64>> =
        columns.iter().map(|c| (*c, BTreeMap::new())).collect();

    for (i, (a, xs)) in columns.iter().zip(&values).enumerate() {
        for (b, ys) in columns.iter().zip(&values).skip(i) {
            let Some((r, _)) = pearson_pairwise(xs, ys) else {
                continue;
            };
            // The diagonal is exactly 1 whenever the variance is nonzero.
            let r = if a == b { 1.0 } else { r };
            if let Some(row) = matrix.get_mut(a) {
                row.insert(*b, r);
            }
            if let Some(row) = matrix.get_mut(b) {
                row.insert(*a, r);
            }
        }
    }

    Analysis::Ok(CorrelationMatrix {
        matrix,
        columns,
        data_points: rows.len(),
        zone_id,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::aggregate::COLUMN_COUNT;

    fn row(bucket: i64, zone: &str, set: &[(Column, f64)]) -> AggregatedRow {
        let mut values = [None; COLUMN_COUNT];
        for (column, value) in set {
            if let Some(slot) = values.get_mut(column.index()) {
                *slot = Some(*value);
            }
        }
        AggregatedRow {
            bucket,
            zone_id: ZoneId::from(zone),
            values,
        }
    }

    fn sample_rows(n: i64) -> Vec<AggregatedRow> {
        (0..n)
            .map(|i| {
                #[allow(clippy::cast_precision_loss)]
                let x = i as f64;
                row(
                    i * 300,
                    "Z01",
                    &[
                        (Column::TrafficVolume, x),
                        (Column::TrafficSpeed, 60.0 - 2.0 * x),
                        (Column::Temp, (x * 1.7).sin() * 10.0),
                        (Column::Humidity, 50.0),
                    ],
                )
            })
            .collect()
    }

    #[test]
    fn too_few_rows_is_insufficient() {
        let outcome = correlation_matrix(&sample_rows(9), None);
        assert!(outcome.is_insufficient());
    }

    #[test]
    fn single_usable_column_is_insufficient() {
        let rows: Vec<AggregatedRow> = (0..12)
            .map(|i| row(i * 300, "Z01", &[(Column::AgriSupply, 1.0)]))
            .collect();
        assert!(correlation_matrix(&rows, None).is_insufficient());
    }

    #[test]
    fn matrix_is_symmetric_with_unit_diagonal() {
        let m = correlation_matrix(&sample_rows(20), None).ok().unwrap();
        assert_eq!(m.data_points, 20);
        for a in &m.columns {
            for b in &m.columns {
                assert_eq!(m.get(*a, *b), m.get(*b, *a));
            }
        }
        assert_eq!(m.get(Column::TrafficVolume, Column::TrafficVolume), Some(1.0));
        assert!((m.get(Column::TrafficVolume, Column::TrafficSpeed).unwrap() + 1.0).abs() < 1e-12);
    }

    #[test]
    fn constant_columns_have_no_defined_pairs() {
        let m = correlation_matrix(&sample_rows(20), None).ok().unwrap();
        assert!(m.columns.contains(&Column::Humidity));
        assert_eq!(m.get(Column::Humidity, Column::Temp), None);
        assert_eq!(m.get(Column::Humidity, Column::Humidity), None);
    }

    #[test]
    fn pairs_are_canonical_and_unique() {
        let m = correlation_matrix(&sample_rows(20), None).ok().unwrap();
        let pairs = m.pairs();
        assert_eq!(pairs.len(), 3);
        assert!(pairs.iter().all(|(a, b, _)| a < b));
    }
}
