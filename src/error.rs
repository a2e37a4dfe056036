use thiserror::Error;

#[derive(Error, Debug)]
pub enum PatchReportError {
    #[error("設定エラー: {0}")]
    Config(String),

    #[error("ファイルが見つかりません: {0}")]
    FileNotFound(String),

    #[error("カタログ取得エラー: {0}")]
    Http(#[from] reqwest::Error),

    #[error("結果テーブルが見つかりません: {0}")]
    MarkupMissing(String),

    #[error("ページが開かれていません")]
    NoPage,

    #[error("セッションは解放済みです")]
    SessionReleased,

    #[error("スナップショット保存エラー: {0}")]
    Snapshot(String),

    #[error("Excel生成エラー: {0}")]
    ExcelGeneration(String),

    #[error("CSV出力エラー: {0}")]
    Csv(#[from] csv::Error),

    #[error("ワーカー実行エラー: {0}")]
    Worker(String),

    #[error("JSON解析エラー: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Common(#[from] patch_report_common::Error),
}

pub type Result<T> = std::result::Result<T, PatchReportError>;
