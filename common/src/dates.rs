//! 日付ユーティリティ
//!
//! カットオフ日・シート名・前月ラベルの計算

use crate::error::{Error, Result};
use chrono::{Datelike, Duration, NaiveDate, Weekday};

/// カットオフ日の入力形式
pub const CUTOFF_FORMAT: &str = "%Y-%m-%d";
/// カタログの Last Updated 列の形式
pub const CATALOG_DATE_FORMAT: &str = "%m/%d/%Y";

/// カットオフ日（YYYY-MM-DD）をパース
pub fn parse_cutoff(text: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), CUTOFF_FORMAT)
        .map_err(|e| Error::Date(format!("invalid cutoff '{}': {}", text, e)))
}

/// カタログ日付（MM/DD/YYYY）をパース
pub fn parse_catalog_date(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), CATALOG_DATE_FORMAT).ok()
}

/// 月初日
pub fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// 前月の最終日（当月1日 - 1日）
pub fn last_day_of_previous_month(date: NaiveDate) -> NaiveDate {
    first_of_month(date) - Duration::days(1)
}

/// 月の第2火曜日（Patch Tuesday）
pub fn patch_tuesday(year: i32, month: u32) -> Option<NaiveDate> {
    NaiveDate::from_weekday_of_month_opt(year, month, Weekday::Tue, 2)
}

/// 前回の Patch Wednesday（前月 Patch Tuesday の翌日）
///
/// デフォルトのカットオフ日として使う。
pub fn previous_patch_wednesday(today: NaiveDate) -> NaiveDate {
    let previous = last_day_of_previous_month(today);
    patch_tuesday(previous.year(), previous.month())
        .map(|d| d + Duration::days(1))
        .unwrap_or(previous)
}

/// シート名（例: September-2024）
pub fn sheet_name(today: NaiveDate) -> String {
    today.format("%B-%Y").to_string()
}

/// ファイル名用の日付スタンプ（例: 2024_09_10）
pub fn file_stamp(today: NaiveDate) -> String {
    today.format("%Y_%m_%d").to_string()
}
