//! Assembles the report document from the store's committed records.

use crate::{FieldSeries, ReportError, Summary, estimate_height_at, extract_series, render_chart};
use blockwatch_store::{BlockRecord, CsvStore};
use chrono::Utc;
use std::{fs, path::PathBuf};
use tabled::{Table, Tabled, settings::Style};
use tracing::info;

/// How many trailing records feed the block-time estimate.
pub const TRAILING_WINDOW: usize = 3000;

#[derive(Tabled)]
struct StatRow {
    field: &'static str,
    count: usize,
    mean: String,
    median: String,
    range: String,
    std: String,
}

/// One-shot reader of the record store that writes the report artifacts:
/// per-field SVG charts and a markdown document with a statistics table.
///
/// Pure function of the store's contents at read time; runs independently
/// of (and concurrently with) the ingestion loop.
#[derive(Debug)]
pub struct Reporter {
    store_path: PathBuf,
    out_dir: PathBuf,
}

impl Reporter {
    /// Creates a reporter reading `store_path` and writing under `out_dir`.
    pub const fn new(store_path: PathBuf, out_dir: PathBuf) -> Self {
        Self { store_path, out_dir }
    }

    /// Generates the report.
    ///
    /// Returns `Ok(false)` without writing anything when the store is
    /// missing or holds no records. `estimate_at` optionally requests a
    /// height projection for that unix timestamp.
    pub fn generate(&self, estimate_at: Option<i64>) -> Result<bool, ReportError> {
        if !self.store_path.exists() {
            info!(target: "report", path = %self.store_path.display(), "no store, nothing to report");
            return Ok(false);
        }
        // Read-only view: the reporter must never repair or otherwise
        // mutate the store; that is the writer's job at open.
        let records: Vec<BlockRecord> =
            CsvStore::open_read_only(&self.store_path)?.collect::<Result<_, _>>()?;
        if records.is_empty() {
            info!(target: "report", "store is empty, nothing to report");
            return Ok(false);
        }

        let charts_dir = self.out_dir.join("charts");
        fs::create_dir_all(&charts_dir)?;

        let series = extract_series(&records);
        for field in &series {
            render_chart(field, &charts_dir.join(format!("{}.svg", field.name)))?;
        }

        let document = self.render_document(&records, &series, estimate_at);
        let report_path = self.out_dir.join("report.md");
        fs::write(&report_path, document)?;

        info!(
            target: "report",
            records = records.len(),
            path = %report_path.display(),
            "report written"
        );
        Ok(true)
    }

    fn render_document(
        &self,
        records: &[BlockRecord],
        series: &[FieldSeries],
        estimate_at: Option<i64>,
    ) -> String {
        let rows: Vec<StatRow> = series
            .iter()
            .map(|field| {
                let values = field.values();
                let summary = Summary::compute(&values);
                StatRow {
                    field: field.name,
                    count: values.len(),
                    mean: fmt_stat(summary.map(|s| s.mean)),
                    median: fmt_stat(summary.map(|s| s.median)),
                    range: fmt_stat(summary.map(|s| s.range)),
                    std: fmt_stat(summary.map(|s| s.std)),
                }
            })
            .collect();
        let table = Table::new(rows).with(Style::markdown()).to_string();

        let first = records[0].height;
        let last = records[records.len() - 1].height;
        let mut doc = format!(
            "# Chain report\n\nGenerated: {}\nRecords: {} (heights {first}..={last})\n\n## Statistics\n\n{table}\n\n## Charts\n",
            Utc::now().to_rfc3339(),
            records.len(),
        );
        for field in series {
            if !field.points.is_empty() {
                doc.push_str(&format!("\n![{name}](charts/{name}.svg)\n", name = field.name));
            }
        }

        if let Some(target) = estimate_at {
            doc.push_str(&self.render_estimate(records, target));
        }
        doc
    }

    /// Projects the height at `target` from the trailing window's mean
    /// inter-block time, mirroring the statistics the table reports.
    fn render_estimate(&self, records: &[BlockRecord], target: i64) -> String {
        let window_start = records.len().saturating_sub(TRAILING_WINDOW);
        let trailing: Vec<f64> =
            records[window_start..].iter().filter_map(|r| r.time_since_prev_block).collect();

        let latest = records[records.len() - 1].height;
        match Summary::compute(&trailing) {
            Some(summary) => {
                let estimated = estimate_height_at(
                    latest,
                    summary.mean,
                    Utc::now().timestamp() as f64,
                    target as f64,
                );
                format!(
                    "\n## Height projection\n\nMean block time over the trailing {} records: {:.3}s.\nEstimated height at unix time {target}: **{estimated}**\n",
                    trailing.len(),
                    summary.mean,
                )
            }
            None => {
                "\n## Height projection\n\nNot enough inter-block samples to project a height.\n"
                    .to_string()
            }
        }
    }
}

fn fmt_stat(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.4}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockwatch_store::RecordStorage;
    use chrono::TimeZone;
    use std::path::Path;
    use tempfile::TempDir;

    fn seed_store(path: &Path, sizes: &[u64]) {
        let mut store = CsvStore::open(path).expect("open");
        for (idx, &size) in sizes.iter().enumerate() {
            let height = idx as u64 + 1;
            store
                .append(BlockRecord {
                    height,
                    block_time: Utc
                        .timestamp_opt(1_700_000_000 + height as i64 * 6, 0)
                        .unwrap(),
                    block_size: size,
                    num_txs: height,
                    num_validators: 145,
                    time_since_prev_block: (height > 1).then_some(6.0),
                })
                .expect("append");
        }
    }

    #[test]
    fn missing_store_is_nothing_to_report() {
        let tmp = TempDir::new().expect("create temp dir");
        let reporter =
            Reporter::new(tmp.path().join("absent.csv"), tmp.path().join("out"));
        assert!(!reporter.generate(None).expect("generate"));
        assert!(!tmp.path().join("out").exists());
    }

    #[test]
    fn empty_store_is_nothing_to_report() {
        let tmp = TempDir::new().expect("create temp dir");
        let store_path = tmp.path().join("chain_data.csv");
        drop(CsvStore::open(&store_path).expect("init"));

        let reporter = Reporter::new(store_path, tmp.path().join("out"));
        assert!(!reporter.generate(None).expect("generate"));
    }

    #[test]
    fn writes_charts_and_statistics_table() {
        let tmp = TempDir::new().expect("create temp dir");
        let store_path = tmp.path().join("chain_data.csv");
        seed_store(&store_path, &[100, 200, 300]);

        let out = tmp.path().join("out");
        let reporter = Reporter::new(store_path, out.clone());
        assert!(reporter.generate(None).expect("generate"));

        let report = fs::read_to_string(out.join("report.md")).expect("read report");
        // Known sample: sizes [100, 200, 300].
        assert!(report.contains("block_size"));
        assert!(report.contains("200.0000"));
        assert!(report.contains("81.6497"));
        assert!(out.join("charts").join("block_size.svg").exists());
        assert!(out.join("charts").join("time_since_prev_block.svg").exists());
    }

    #[test]
    fn generate_does_not_mutate_the_store() {
        let tmp = TempDir::new().expect("create temp dir");
        let store_path = tmp.path().join("chain_data.csv");
        seed_store(&store_path, &[100, 200, 300]);

        // A torn tail left by a crashed writer stays on disk for the
        // writer to repair; the report covers the committed prefix.
        let mut file =
            fs::OpenOptions::new().append(true).open(&store_path).expect("reopen raw");
        std::io::Write::write_all(&mut file, b"4,2023-10-0").expect("write partial");
        drop(file);
        let len_before = fs::metadata(&store_path).expect("stat").len();

        let out = tmp.path().join("out");
        let reporter = Reporter::new(store_path.clone(), out.clone());
        assert!(reporter.generate(None).expect("generate"));

        assert_eq!(fs::metadata(&store_path).expect("stat").len(), len_before);
        let report = fs::read_to_string(out.join("report.md")).expect("read report");
        assert!(report.contains("heights 1..=3"));
    }

    #[test]
    fn projection_section_appears_when_requested() {
        let tmp = TempDir::new().expect("create temp dir");
        let store_path = tmp.path().join("chain_data.csv");
        seed_store(&store_path, &[100, 200, 300]);

        let reporter = Reporter::new(store_path, tmp.path().join("out"));
        let target = Utc::now().timestamp() + 3_600;
        assert!(reporter.generate(Some(target)).expect("generate"));

        let report =
            fs::read_to_string(tmp.path().join("out").join("report.md")).expect("read report");
        assert!(report.contains("Height projection"));
        assert!(report.contains("6.000s"));
    }
}
