//! レポートグリッド生成
//!
//! 注記済みレコードを (値, スタイル) のグリッドに変換する。
//! 書き出しはレンダラ側（export::excel_core）が行う。

use crate::applicability::{AnnotatedRecord, Target};
use crate::layout::{
    header_fill, report_columns, ColumnDefinition, ColumnGroup, COLOR_BLACK, COLOR_HIGHLIGHT,
    COLOR_LINK, COLOR_SPACER, FONT_NAME, FONT_SIZE, HIGHLIGHT_COLUMN, HYPERLINK_PREFIX,
    LEFT_ALIGNED_COLUMNS, ROW_HEIGHTS,
};
use crate::types::COL_INDEX;

/// セル値
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Blank,
    Text(String),
    Number(f64),
}

impl CellValue {
    fn from_text(text: &str) -> Self {
        if text.is_empty() {
            CellValue::Blank
        } else {
            CellValue::Text(text.to_string())
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(text) => Some(text),
            _ => None,
        }
    }
}

/// 横位置（縦は常に中央）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HorizontalAlign {
    Left,
    Center,
}

/// 罫線
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BorderStyle {
    Thin,
}

/// フォント
#[derive(Debug, Clone, PartialEq)]
pub struct FontSpec {
    pub name: &'static str,
    pub size: f64,
    pub bold: bool,
    pub color: u32,
    pub underline: bool,
}

impl FontSpec {
    fn body() -> Self {
        Self {
            name: FONT_NAME,
            size: FONT_SIZE,
            bold: false,
            color: COLOR_BLACK,
            underline: false,
        }
    }

    fn header() -> Self {
        Self {
            bold: true,
            ..Self::body()
        }
    }

    fn hyperlink() -> Self {
        Self {
            color: COLOR_LINK,
            underline: true,
            ..Self::body()
        }
    }
}

/// セルスタイル
#[derive(Debug, Clone, PartialEq)]
pub struct CellStyle {
    pub fill: Option<u32>,
    pub font: FontSpec,
    pub align: HorizontalAlign,
    pub wrap: bool,
    pub border: BorderStyle,
    pub hyperlink: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub value: CellValue,
    pub style: CellStyle,
}

/// レンダラに渡すスタイル指示
#[derive(Debug, Clone, PartialEq)]
pub struct StyleDirective<'a> {
    pub row: u32,
    pub col: u16,
    pub style: &'a CellStyle,
    /// ハイパーリンク先（hyperlink セルのみ）
    pub link: Option<&'a str>,
}

/// レポートグリッド（0行目がヘッダ）
#[derive(Debug, Clone, PartialEq)]
pub struct ReportGrid {
    pub sheet_name: String,
    pub column_widths: Vec<f64>,
    /// (行番号, 高さpt)
    pub row_heights: Vec<(u32, f64)>,
    /// 固定する行数
    pub freeze_rows: u32,
    pub rows: Vec<Vec<Cell>>,
}

impl ReportGrid {
    pub fn header(&self) -> &[Cell] {
        self.rows.first().map(|r| r.as_slice()).unwrap_or_default()
    }

    pub fn data_rows(&self) -> &[Vec<Cell>] {
        self.rows.get(1..).unwrap_or_default()
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&Cell> {
        self.rows.get(row)?.get(col)
    }

    /// 全セルのスタイル指示
    pub fn directives(&self) -> impl Iterator<Item = StyleDirective<'_>> {
        self.rows.iter().enumerate().flat_map(|(r, row)| {
            row.iter().enumerate().map(move |(c, cell)| StyleDirective {
                row: r as u32,
                col: c as u16,
                style: &cell.style,
                link: if cell.style.hyperlink {
                    cell.value.as_text()
                } else {
                    None
                },
            })
        })
    }
}

fn header_cell(column: &ColumnDefinition) -> Cell {
    Cell {
        value: CellValue::from_text(column.title),
        style: CellStyle {
            fill: Some(header_fill(column.group)),
            font: FontSpec::header(),
            align: HorizontalAlign::Center,
            wrap: true,
            border: BorderStyle::Thin,
            hyperlink: false,
        },
    }
}

fn data_cell(col: usize, column: &ColumnDefinition, value: CellValue) -> Cell {
    let hyperlink = value
        .as_text()
        .is_some_and(|t| t.starts_with(HYPERLINK_PREFIX));

    let fill = if column.group == ColumnGroup::Spacer {
        Some(COLOR_SPACER)
    } else if col == HIGHLIGHT_COLUMN {
        Some(COLOR_HIGHLIGHT)
    } else {
        None
    };

    let align = if LEFT_ALIGNED_COLUMNS.contains(&column.title) {
        HorizontalAlign::Left
    } else {
        HorizontalAlign::Center
    };

    Cell {
        value,
        style: CellStyle {
            fill,
            font: if hyperlink {
                FontSpec::hyperlink()
            } else {
                FontSpec::body()
            },
            align,
            wrap: true,
            border: BorderStyle::Thin,
            hyperlink,
        },
    }
}

/// 1レコード分のセル値（出力列順）
fn row_values(row: &AnnotatedRecord, columns: &[ColumnDefinition]) -> Vec<CellValue> {
    let mut targets = Target::ALL.iter();
    columns
        .iter()
        .map(|column| match column.group {
            ColumnGroup::Spacer => CellValue::Blank,
            ColumnGroup::Target => targets
                .next()
                .map(|t| CellValue::from_text(row.get(*t).text()))
                .unwrap_or(CellValue::Blank),
            ColumnGroup::Base | ColumnGroup::Review => {
                let text = row.record.get(column.title).unwrap_or_default();
                match (column.title, text.parse::<u32>()) {
                    (COL_INDEX, Ok(n)) => CellValue::Number(n as f64),
                    _ => CellValue::from_text(text),
                }
            }
        })
        .collect()
}

/// グリッドを組み立てる
pub fn render(rows: &[AnnotatedRecord], sheet_name: &str) -> ReportGrid {
    let columns = report_columns();

    let mut grid_rows = Vec::with_capacity(rows.len() + 1);
    grid_rows.push(columns.iter().map(header_cell).collect::<Vec<_>>());

    for row in rows {
        let cells = row_values(row, &columns)
            .into_iter()
            .enumerate()
            .map(|(c, value)| data_cell(c, &columns[c], value))
            .collect();
        grid_rows.push(cells);
    }

    ReportGrid {
        sheet_name: sheet_name.to_string(),
        column_widths: columns.iter().map(|c| c.width).collect(),
        row_heights: ROW_HEIGHTS
            .iter()
            .enumerate()
            .map(|(i, h)| (i as u32, *h))
            .collect(),
        freeze_rows: 1,
        rows: grid_rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::applicability::annotate;
    use crate::layout::BASE_COLUMNS;
    use crate::types::{
        NormalizedRecord, COL_DESCRIPTION, COL_PATCH_LINK, COL_PATCH_NAME, COL_PRODUCT,
    };
    use chrono::NaiveDate;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn annotated_row() -> AnnotatedRecord {
        let mut record = NormalizedRecord::new(ymd(2024, 8, 20));
        record.push(COL_INDEX, "3");
        record.push(COL_DESCRIPTION, "2024-08 Cumulative Update (KB5041773)");
        record.push(COL_PRODUCT, "Windows Server 2016");
        record.push(COL_PATCH_NAME, "KB5041773");
        record.push(COL_PATCH_LINK, "https://support.microsoft.com/kb/KB5041773");

        let mut row = AnnotatedRecord::prepare(&record);
        annotate(&mut row, ymd(2024, 9, 10));
        row
    }

    fn col(title: &str) -> usize {
        report_columns().iter().position(|c| c.title == title).unwrap()
    }

    #[test]
    fn test_header_row_styles() {
        let grid = render(&[], "September-2024");

        assert_eq!(grid.rows.len(), 1);
        assert_eq!(grid.header()[0].value, CellValue::Text("#".to_string()));
        assert!(grid.header().iter().all(|c| c.style.font.bold));
        assert_eq!(grid.header()[0].style.fill, Some(0xDDEBF7));
        assert_eq!(grid.header()[col("Comment")].style.fill, Some(0xFFF2CC));
        assert_eq!(grid.header()[BASE_COLUMNS.len()].style.fill, Some(COLOR_SPACER));
        assert_eq!(grid.header()[col("Domain Controller")].style.fill, Some(0xE2EFDA));
        assert_eq!(grid.row_heights, vec![(0, 46.5), (1, 46.5), (2, 34.5)]);
        assert_eq!(grid.column_widths.len(), report_columns().len());
    }

    #[test]
    fn test_data_row_styles() {
        let grid = render(&[annotated_row()], "September-2024");
        let row = &grid.data_rows()[0];

        // # は数値セル
        assert_eq!(row[0].value, CellValue::Number(3.0));

        // リンクはハイパーリンク
        let link = &row[col(COL_PATCH_LINK)];
        assert!(link.style.hyperlink);
        assert!(link.style.font.underline);
        assert_eq!(link.style.font.color, COLOR_LINK);
        assert_eq!(link.style.align, HorizontalAlign::Left);

        // E列は緑
        assert_eq!(row[HIGHLIGHT_COLUMN].style.fill, Some(COLOR_HIGHLIGHT));
        assert_eq!(row[col(COL_DESCRIPTION)].style.align, HorizontalAlign::Left);
        assert_eq!(row[col(COL_PRODUCT)].style.align, HorizontalAlign::Center);

        // 区切り列は塗りつぶし
        assert_eq!(row[BASE_COLUMNS.len()].value, CellValue::Blank);
        assert_eq!(row[BASE_COLUMNS.len()].style.fill, Some(COLOR_SPACER));

        // 適用対象
        assert_eq!(row[col("Domain Controller")].value, CellValue::Blank);
        assert_eq!(
            row[col("Operator Workstation")].value,
            CellValue::Text("N/A".to_string())
        );
        assert!(row.iter().all(|c| c.style.border == BorderStyle::Thin));
    }

    #[test]
    fn test_directives_cover_grid_and_links() {
        let grid = render(&[annotated_row()], "September-2024");
        let directives: Vec<StyleDirective<'_>> = grid.directives().collect();

        assert_eq!(directives.len(), 2 * report_columns().len());
        let links: Vec<&str> = directives.iter().filter_map(|d| d.link).collect();
        assert_eq!(links, vec!["https://support.microsoft.com/kb/KB5041773"]);
        assert_eq!(grid.cell(1, HIGHLIGHT_COLUMN).unwrap().value, CellValue::Text("KB5041773".to_string()));
    }
}
