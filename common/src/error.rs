//! エラー型定義

use thiserror::Error;

/// 共通エラー型
#[derive(Error, Debug)]
pub enum Error {
    #[error("Date error: {0}")]
    Date(String),

    #[error("Missing column '{column}' in source '{source_label}'")]
    MissingColumn { source_label: String, column: String },

    #[error("Column skew in source '{source_label}': expected {expected:?}, got {actual:?}")]
    ColumnSkew {
        source_label: String,
        expected: Vec<String>,
        actual: Vec<String>,
    },
}

/// Result型エイリアス
pub type Result<T> = std::result::Result<T, Error>;
