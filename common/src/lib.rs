//! Patch Report Common Library
//!
//! カタログ取得結果の正規化・振り分け・適用対象マトリクス・レポートグリッド生成

pub mod types;
pub mod dates;
pub mod error;
pub mod extractor;
pub mod aggregator;
pub mod applicability;
pub mod layout;
pub mod report;
pub mod export;

pub use types::{Bucket, HeaderSwap, NormalizedRecord, RawTable, SourceDescriptor};
pub use error::{Error, Result};
pub use extractor::{extract, ExtractRules, Extraction};
pub use aggregator::{
    aggregate, dedup_keep_last, Aggregate, AggregateOptions, MonotonicProgress, NullProgress,
    ProgressSink, ProgressUpdate, TableSource,
};
pub use applicability::{annotate, build_matrix, AnnotatedRecord, Annotation, Applicability, Target};
pub use report::{render, ReportGrid};
