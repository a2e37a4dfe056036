//! レポートレイアウト設定モジュール
//!
//! 出力列の並び・列幅・行高・配色の定義（Source of Truth）

use crate::applicability::Target;
use crate::types::{
    COL_APPROVED, COL_COMMENT, COL_DESCRIPTION, COL_INDEX, COL_PATCH_LINK, COL_PATCH_NAME,
    COL_PRODUCT, COL_RELEASE_DATE, COL_TEST_STATUS, COL_UPDATE_TYPE, COL_VENDOR, COL_VERSION,
};

// ============================================
// 列定義
// ============================================

/// ヘッダの配色グループ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnGroup {
    /// カタログ由来の列
    Base,
    /// 手入力のレビュー列
    Review,
    /// 区切り列
    Spacer,
    /// 適用対象マトリクス
    Target,
}

/// 出力列
#[derive(Debug, Clone, Copy)]
pub struct ColumnDefinition {
    pub title: &'static str,
    pub width: f64,
    pub group: ColumnGroup,
}

const fn column(title: &'static str, width: f64, group: ColumnGroup) -> ColumnDefinition {
    ColumnDefinition { title, width, group }
}

/// 基本列（A〜L列）
pub const BASE_COLUMNS: &[ColumnDefinition] = &[
    column(COL_INDEX, 3.0, ColumnGroup::Base),
    column(COL_VENDOR, 7.0, ColumnGroup::Base),
    column(COL_PRODUCT, 11.0, ColumnGroup::Base),
    column(COL_VERSION, 12.0, ColumnGroup::Base),
    column(COL_PATCH_NAME, 11.0, ColumnGroup::Base),
    column(COL_DESCRIPTION, 45.0, ColumnGroup::Base),
    column(COL_PATCH_LINK, 30.0, ColumnGroup::Base),
    column(COL_RELEASE_DATE, 10.0, ColumnGroup::Base),
    column(COL_UPDATE_TYPE, 11.0, ColumnGroup::Base),
    column(COL_APPROVED, 7.0, ColumnGroup::Review),
    column(COL_TEST_STATUS, 7.0, ColumnGroup::Review),
    column(COL_COMMENT, 35.0, ColumnGroup::Review),
];

/// 基本列と適用対象の間の区切り列
pub const SPACER_COLUMN: ColumnDefinition = column("", 2.0, ColumnGroup::Spacer);

/// 適用対象列の幅
pub const TARGET_COLUMN_WIDTH: f64 = 12.0;

/// 基本列の列名
pub fn base_column_titles() -> Vec<&'static str> {
    BASE_COLUMNS.iter().map(|c| c.title).collect()
}

/// 全出力列（基本列 + 区切り列 + 適用対象列）
pub fn report_columns() -> Vec<ColumnDefinition> {
    BASE_COLUMNS
        .iter()
        .copied()
        .chain(std::iter::once(SPACER_COLUMN))
        .chain(
            Target::ALL
                .iter()
                .map(|t| column(t.column(), TARGET_COLUMN_WIDTH, ColumnGroup::Target)),
        )
        .collect()
}

// ============================================
// 行・スタイル
// ============================================

/// 先頭3行の行高（pt）
pub const ROW_HEIGHTS: [f64; 3] = [46.5, 46.5, 34.5];

/// 緑塗りする列（Patch Name、0始まり）
pub const HIGHLIGHT_COLUMN: usize = 4;

/// 左寄せする列
pub const LEFT_ALIGNED_COLUMNS: &[&str] = &[COL_DESCRIPTION, COL_PATCH_LINK];

/// ハイパーリンクにする値の接頭辞
pub const HYPERLINK_PREFIX: &str = "http";

pub const FONT_NAME: &str = "Calibri";
pub const FONT_SIZE: f64 = 8.0;

/// 配色（RGB）
pub const COLOR_BLACK: u32 = 0x000000;
pub const COLOR_LINK: u32 = 0x0000FF;
pub const COLOR_HIGHLIGHT: u32 = 0x92D050;
pub const COLOR_SPACER: u32 = 0x808080;

/// ヘッダの塗り色
pub fn header_fill(group: ColumnGroup) -> u32 {
    match group {
        ColumnGroup::Base => 0xDDEBF7,
        ColumnGroup::Review => 0xFFF2CC,
        ColumnGroup::Spacer => COLOR_SPACER,
        ColumnGroup::Target => 0xE2EFDA,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_columns_order() {
        let columns = report_columns();
        assert_eq!(columns.len(), BASE_COLUMNS.len() + 1 + Target::ALL.len());
        assert_eq!(columns[HIGHLIGHT_COLUMN].title, COL_PATCH_NAME);
        assert_eq!(columns[BASE_COLUMNS.len()].group, ColumnGroup::Spacer);
        assert_eq!(columns.last().unwrap().title, Target::ALL.last().unwrap().column());
    }

    #[test]
    fn test_left_aligned_columns_are_base_columns() {
        let titles = base_column_titles();
        for col in LEFT_ALIGNED_COLUMNS {
            assert!(titles.contains(col));
        }
    }
}
