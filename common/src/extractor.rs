//! レコード抽出モジュール
//!
//! ソースの生テーブルを正規化済みレコードに変換する。
//!
//! ## 処理フロー
//! 1. ヘッダの列名→位置マップ作成（先頭列は "#"）
//! 2. ヘッダ名の入れ替え・不要列の削除
//! 3. 行ごとに日付チェック → KB番号抽出 → バケット振り分け
//! 4. 合成列の追加と先頭4列の表示名付け替え

use crate::dates::parse_catalog_date;
use crate::error::{Error, Result};
use crate::types::{
    Bucket, HeaderSwap, NormalizedRecord, RawTable, SourceDescriptor, COL_DESCRIPTION, COL_INDEX,
    COL_RELEASE_DATE, COL_UPDATE_TYPE, SYNTHETIC_COLUMNS,
};
use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// ベンダー名（このカタログは固定）
pub const VENDOR_NAME: &str = "Microsoft";
/// KB番号が見つからない場合
pub const NO_IDENTIFIER: &str = "No KB Number";
pub const NO_LINK: &str = "No Link";
/// KB記事URL
pub const LINK_PREFIX: &str = "https://support.microsoft.com/kb/";

/// 抽出ルール（列の入れ替え・削除・フィルタ語）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractRules {
    #[serde(default)]
    pub header_swaps: Vec<HeaderSwap>,
    #[serde(default)]
    pub remove_columns: Vec<String>,
    #[serde(default)]
    pub filter_terms: Vec<String>,
    #[serde(default = "default_title_column")]
    pub title_column: String,
    #[serde(default = "default_date_column")]
    pub date_column: String,
}

fn default_title_column() -> String {
    "Title".to_string()
}

fn default_date_column() -> String {
    "Last Updated".to_string()
}

impl Default for ExtractRules {
    fn default() -> Self {
        Self {
            header_swaps: vec![HeaderSwap::new("Classification", "Last Updated")],
            remove_columns: ["Products", "Version", "Size", "Download"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            filter_terms: [
                "Preview",
                "Dynamic",
                "Azure Stack HCI",
                "Office 2019",
                "Access",
                "Project",
                "Outlook",
                "PowerPoint",
                "Visio",
                "Publisher",
                "3.5, 4.8 and 4.8.1",
                "3.5, 4.7.2 and 4.8",
                ".NET Framework 3.5 and 4.8.1 for Windows 10 Version 22H2 for x64",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            title_column: default_title_column(),
            date_column: default_date_column(),
        }
    }
}

/// 1ソース分の抽出結果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    /// 確定ヘッダ（レコードの列順と一致）
    pub header: Vec<String>,
    pub tracked: Vec<NormalizedRecord>,
    pub status: Vec<NormalizedRecord>,
}

/// 日付チェック結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateCheck {
    Accepted(NaiveDate),
    BeforeCutoff,
    Malformed,
}

/// KB番号とリンク
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identifier {
    pub name: String,
    pub link: String,
}

/// カットオフ判定（パース不能は Malformed）
pub fn check_date(date_text: &str, cutoff: NaiveDate) -> DateCheck {
    match parse_catalog_date(date_text) {
        Some(date) if date >= cutoff => DateCheck::Accepted(date),
        Some(_) => DateCheck::BeforeCutoff,
        None => DateCheck::Malformed,
    }
}

/// タイトルから最初の "KB" + 6桁以上 を取り出す
pub fn extract_identifier(title: &str) -> Identifier {
    lazy_static::lazy_static! {
        static ref KB_RE: Regex = Regex::new(r"KB\d{6,}").unwrap();
    }

    match KB_RE.find(title) {
        Some(m) => Identifier {
            name: m.as_str().to_string(),
            link: format!("{}{}", LINK_PREFIX, m.as_str()),
        },
        None => Identifier {
            name: NO_IDENTIFIER.to_string(),
            link: NO_LINK.to_string(),
        },
    }
}

/// フィルタ語（大文字小文字無視の部分一致）で振り分け
pub fn classify(title: &str, filter_terms: &[String]) -> Bucket {
    let title = title.to_lowercase();
    if filter_terms
        .iter()
        .any(|term| title.contains(&term.to_lowercase()))
    {
        Bucket::Status
    } else {
        Bucket::Tracked
    }
}

/// 入れ替え・削除後の作業用ヘッダと、元の列名→位置マップ
fn prepare_header(
    header: &[String],
    rules: &ExtractRules,
) -> (Vec<String>, HashMap<String, usize>) {
    let mut header: Vec<String> = header.iter().map(|h| h.trim().to_string()).collect();
    if let Some(first) = header.first_mut() {
        *first = COL_INDEX.to_string();
    }

    let column_indices: HashMap<String, usize> = header
        .iter()
        .enumerate()
        .map(|(i, name)| (name.clone(), i))
        .collect();

    // ラベルのみ入れ替え（位置マップは元のまま）
    for swap in &rules.header_swaps {
        if let (Some(&a), Some(&b)) = (
            column_indices.get(&swap.from),
            column_indices.get(&swap.to),
        ) {
            header.swap(a, b);
        }
    }

    header.retain(|col| !rules.remove_columns.contains(col));

    (header, column_indices)
}

/// 合成列を追加し、先頭4列を表示名に付け替える
fn finalize_header(mut header: Vec<String>) -> Vec<String> {
    header.extend(SYNTHETIC_COLUMNS.iter().map(|c| c.to_string()));
    header[1] = COL_DESCRIPTION.to_string();
    header[2] = COL_RELEASE_DATE.to_string();
    header[3] = COL_UPDATE_TYPE.to_string();
    header
}

/// 生テーブルからレコードを抽出
///
/// # Arguments
/// * `table` - ソースの生テーブル
/// * `source` - 製品ライン（合成列の値に使う）
/// * `rules` - 列の入れ替え・削除・フィルタ語
/// * `cutoff` - これより前の日付の行は捨てる
pub fn extract(
    table: &RawTable,
    source: &SourceDescriptor,
    rules: &ExtractRules,
    cutoff: NaiveDate,
) -> Result<Extraction> {
    let (header, column_indices) = prepare_header(&table.header, rules);

    let missing = |column: &str| Error::MissingColumn {
        source_label: source.label.clone(),
        column: column.to_string(),
    };
    let title_idx = *column_indices
        .get(&rules.title_column)
        .ok_or_else(|| missing(&rules.title_column))?;
    let date_idx = *column_indices
        .get(&rules.date_column)
        .ok_or_else(|| missing(&rules.date_column))?;

    // 本文から読む列（先頭の "#" は連番で置き換える）
    let passthrough: Vec<usize> = header
        .iter()
        .skip(1)
        .filter_map(|col| column_indices.get(col).copied())
        .collect();

    let final_header = finalize_header(header);

    let mut extraction = Extraction::default();
    let mut patch_number: u32 = 1;

    for row in table.rows.iter().filter(|r| !r.is_empty()) {
        let title = row.get(title_idx).map(|s| s.as_str()).unwrap_or_default();
        let date_text = row.get(date_idx).map(|s| s.as_str()).unwrap_or_default();

        let release_date = match check_date(date_text, cutoff) {
            DateCheck::Accepted(date) => date,
            DateCheck::BeforeCutoff => continue,
            DateCheck::Malformed => {
                tracing::warn!(
                    source = %source.label,
                    title = %title,
                    date = %date_text,
                    "Invalid date format found in row"
                );
                continue;
            }
        };

        let identifier = extract_identifier(title);

        let mut values: Vec<String> = Vec::with_capacity(final_header.len());
        values.push(patch_number.to_string());
        values.extend(
            passthrough
                .iter()
                .map(|&i| row.get(i).map(|s| s.trim().to_string()).unwrap_or_default()),
        );
        values.push(VENDOR_NAME.to_string());
        values.push(source.label.clone());
        values.push(source.version.clone());
        values.push(identifier.name);
        values.push(identifier.link);

        let record = NormalizedRecord {
            fields: final_header.iter().cloned().zip(values).collect(),
            release_date,
        };

        match classify(title, &rules.filter_terms) {
            Bucket::Status => extraction.status.push(record),
            Bucket::Tracked => {
                extraction.tracked.push(record);
                patch_number += 1;
            }
        }
    }

    extraction.header = final_header;
    Ok(extraction)
}
