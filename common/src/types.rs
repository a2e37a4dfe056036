//! パッチレコードの型定義
//!
//! CLIと各テーブルソースで共有される型:
//! - SourceDescriptor: 取得対象の製品ライン
//! - RawTable: ソースから取得した生テーブル
//! - NormalizedRecord: 正規化済みレコード

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// 連番列
pub const COL_INDEX: &str = "#";
/// 表示用に付け替える先頭4列
pub const COL_DESCRIPTION: &str = "Patch Description";
pub const COL_RELEASE_DATE: &str = "Release Date";
pub const COL_UPDATE_TYPE: &str = "Update Type";
/// 末尾に追加する合成列
pub const COL_VENDOR: &str = "Vendor Name";
pub const COL_PRODUCT: &str = "Vendor Product";
pub const COL_VERSION: &str = "Model/Version";
pub const COL_PATCH_NAME: &str = "Patch Name";
pub const COL_PATCH_LINK: &str = "Patch Link";
/// レビュー用の空列
pub const COL_APPROVED: &str = "Approved by BN";
pub const COL_TEST_STATUS: &str = "Test Status";
pub const COL_COMMENT: &str = "Comment";

/// 合成列（この順で末尾に追加）
pub const SYNTHETIC_COLUMNS: [&str; 5] = [
    COL_VENDOR,
    COL_PRODUCT,
    COL_VERSION,
    COL_PATCH_NAME,
    COL_PATCH_LINK,
];

/// 取得対象の製品ライン
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDescriptor {
    /// カタログ検索クエリ
    pub query: String,
    /// 製品ラベル（Vendor Product列）
    pub label: String,
    /// バージョンラベル（Model/Version列）
    pub version: String,
}

impl SourceDescriptor {
    pub fn new(query: &str, label: &str, version: &str) -> Self {
        Self {
            query: query.to_string(),
            label: label.to_string(),
            version: version.to_string(),
        }
    }
}

/// ヘッダ名の入れ替え指定
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderSwap {
    pub from: String,
    pub to: String,
}

impl HeaderSwap {
    pub fn new(from: &str, to: &str) -> Self {
        Self {
            from: from.to_string(),
            to: to.to_string(),
        }
    }
}

/// ソースから読み取ったテーブル（ヘッダ行 + 本文行）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTable {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// 振り分け先バケット
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Bucket {
    /// レポート対象
    Tracked,
    /// フィルタ語に一致したもの（レポート対象外）
    Status,
}

/// 正規化済みレコード
///
/// 列名→値の順序付きマップ。列の並びは同一実行内の全レコードで共通。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    pub fields: Vec<(String, String)>,
    pub release_date: NaiveDate,
}

impl NormalizedRecord {
    pub fn new(release_date: NaiveDate) -> Self {
        Self {
            fields: Vec::new(),
            release_date,
        }
    }

    pub fn push(&mut self, name: &str, value: impl Into<String>) {
        self.fields.push((name.to_string(), value.into()));
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// 値を上書き（列がなければ末尾に追加）
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.fields.iter_mut().find(|(n, _)| n == name) {
            Some((_, v)) => *v = value,
            None => self.fields.push((name.to_string(), value)),
        }
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.fields.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// KB番号（Patch Name列）
    pub fn identifier(&self) -> &str {
        self.get(COL_PATCH_NAME).unwrap_or_default()
    }

    /// 製品ラベル（Vendor Product列）
    pub fn label(&self) -> &str {
        self.get(COL_PRODUCT).unwrap_or_default()
    }

    /// 指定した列順に並べ替える（存在しない列は空文字）
    pub fn reindexed(&self, columns: &[&str]) -> NormalizedRecord {
        NormalizedRecord {
            fields: columns
                .iter()
                .map(|c| (c.to_string(), self.get(c).unwrap_or_default().to_string()))
                .collect(),
            release_date: self.release_date,
        }
    }
}
