//! Excel生成（共通ライブラリ）
//!
//! report.rs のグリッドとスタイル指示をそのまま xlsx に書き出す

use crate::report::{BorderStyle, CellStyle, CellValue, HorizontalAlign, ReportGrid};
use rust_xlsxwriter::*;

/// スタイル → Format
fn to_format(style: &CellStyle) -> Format {
    let mut format = Format::new()
        .set_font_name(style.font.name)
        .set_font_size(style.font.size)
        .set_font_color(Color::RGB(style.font.color))
        .set_align(match style.align {
            HorizontalAlign::Left => FormatAlign::Left,
            HorizontalAlign::Center => FormatAlign::Center,
        })
        .set_align(FormatAlign::VerticalCenter);

    if style.font.bold {
        format = format.set_bold();
    }
    if style.font.underline {
        format = format.set_underline(FormatUnderline::Single);
    }
    if style.wrap {
        format = format.set_text_wrap();
    }
    if let Some(fill) = style.fill {
        format = format
            .set_pattern(FormatPattern::Solid)
            .set_background_color(Color::RGB(fill));
    }
    match style.border {
        BorderStyle::Thin => format = format.set_border(FormatBorder::Thin),
    }

    format
}

/// Excelをバッファに生成
pub fn generate_excel_buffer(grid: &ReportGrid) -> Result<Vec<u8>, String> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet
        .set_name(&grid.sheet_name)
        .map_err(|e| format!("シート名設定エラー: {}", e))?;

    // 列幅・行高
    for (col, width) in grid.column_widths.iter().enumerate() {
        worksheet
            .set_column_width(col as u16, *width)
            .map_err(|e| format!("列幅設定エラー: {}", e))?;
    }
    for (row, height) in &grid.row_heights {
        worksheet
            .set_row_height(*row, *height)
            .map_err(|e| format!("行高さ設定エラー: {}", e))?;
    }
    if grid.freeze_rows > 0 {
        worksheet
            .set_freeze_panes(grid.freeze_rows, 0)
            .map_err(|e| format!("ウィンドウ枠固定エラー: {}", e))?;
    }

    for directive in grid.directives() {
        let (row, col) = (directive.row, directive.col);
        let Some(cell) = grid.cell(row as usize, col as usize) else {
            continue;
        };
        let format = to_format(directive.style);

        let written = match (&cell.value, directive.link) {
            (_, Some(link)) => worksheet
                .write_url_with_format(row, col, Url::new(link), &format)
                .map(|_| ()),
            (CellValue::Text(text), None) => worksheet
                .write_string_with_format(row, col, text, &format)
                .map(|_| ()),
            (CellValue::Number(n), None) => worksheet
                .write_number_with_format(row, col, *n, &format)
                .map(|_| ()),
            (CellValue::Blank, None) => worksheet.write_blank(row, col, &format).map(|_| ()),
        };
        written.map_err(|e| format!("セル書き込みエラー ({}, {}): {}", row, col, e))?;
    }

    // バッファに書き出し
    workbook
        .save_to_buffer()
        .map_err(|e| format!("Excel保存エラー: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::render;

    #[test]
    fn test_generate_empty_report() {
        let grid = render(&[], "September-2024");
        let buffer = generate_excel_buffer(&grid).expect("Excel生成失敗");
        // xlsx は zip（PK）
        assert!(buffer.starts_with(b"PK"));
    }

    #[test]
    fn test_invalid_sheet_name_is_error() {
        let grid = render(&[], "bad/name");
        assert!(generate_excel_buffer(&grid).is_err());
    }
}
