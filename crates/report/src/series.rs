//! Per-field time series extracted from the committed records.

use blockwatch_store::BlockRecord;

/// One numeric field's values against height.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSeries {
    /// The store column this series was taken from.
    pub name: &'static str,
    /// `(height, value)` pairs in height order.
    pub points: Vec<(u64, f64)>,
}

impl FieldSeries {
    /// The values without their heights.
    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|&(_, value)| value).collect()
    }
}

/// Extracts the four numeric series from the records, in store order.
///
/// Rows with an absent `time_since_prev_block` are skipped for that series
/// rather than coerced to zero; a missing measurement is not a measurement
/// of zero.
pub fn extract_series(records: &[BlockRecord]) -> Vec<FieldSeries> {
    let mut block_size = Vec::with_capacity(records.len());
    let mut num_txs = Vec::with_capacity(records.len());
    let mut num_validators = Vec::with_capacity(records.len());
    let mut block_time = Vec::with_capacity(records.len().saturating_sub(1));

    for record in records {
        block_size.push((record.height, record.block_size as f64));
        num_txs.push((record.height, record.num_txs as f64));
        num_validators.push((record.height, record.num_validators as f64));
        if let Some(elapsed) = record.time_since_prev_block {
            block_time.push((record.height, elapsed));
        }
    }

    vec![
        FieldSeries { name: "block_size", points: block_size },
        FieldSeries { name: "num_txs", points: num_txs },
        FieldSeries { name: "num_validators", points: num_validators },
        FieldSeries { name: "time_since_prev_block", points: block_time },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn record(height: u64, elapsed: Option<f64>) -> BlockRecord {
        BlockRecord {
            height,
            block_time: Utc.timestamp_opt(1_700_000_000 + height as i64 * 6, 0).unwrap(),
            block_size: 100 * height,
            num_txs: height,
            num_validators: 145,
            time_since_prev_block: elapsed,
        }
    }

    #[test]
    fn absent_derived_values_are_skipped_not_zeroed() {
        let records =
            vec![record(1, None), record(2, Some(6.0)), record(3, Some(6.5))];
        let series = extract_series(&records);

        let block_time = series.iter().find(|s| s.name == "time_since_prev_block").unwrap();
        assert_eq!(block_time.points, vec![(2, 6.0), (3, 6.5)]);

        let sizes = series.iter().find(|s| s.name == "block_size").unwrap();
        assert_eq!(sizes.points.len(), 3);
    }
}
