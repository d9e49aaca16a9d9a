//! Aggregation and reporting over the committed record store.
//!
//! Everything here is a pure function of the store's contents at read time:
//! per-field population statistics, per-field time-series charts, and a
//! combined report document. An empty or missing store is "nothing to
//! report", never an error.

mod stats;
pub use stats::{Summary, estimate_height_at};

mod series;
pub use series::{FieldSeries, extract_series};

mod charts;
pub use charts::render_chart;

mod error;
pub use error::ReportError;

mod report;
pub use report::{Reporter, TRAILING_WINDOW};
