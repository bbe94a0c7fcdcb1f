#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod calendar;
pub mod config;
pub mod correlate;
pub mod derived;
pub mod error;
pub mod frame;
pub mod load;
pub mod quality;
pub mod record;
pub mod report;
pub mod rolling;
pub mod trend;

// Re-export core types
pub use config::ReportConfig;
pub use correlate::{CorrelationResult, CorrelationStatus, OverlapInterval};
pub use derived::{MetricPoint, MetricSeries};
pub use error::{MetricsError, Result};
pub use load::{load_content_csv, load_follower_csv};
pub use record::{DailyRecord, Dated, FollowerRecord, SponsoredMetrics, Stream, StreamKind};
pub use report::{AnalysisReport, assemble, assemble_records};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
