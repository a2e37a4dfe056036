//! Excel生成（CLI版）
//!
//! 共通ライブラリの excel_core でバッファを作ってファイルに書き出す

use crate::error::{PatchReportError, Result};
use patch_report_common::export::excel_core;
use patch_report_common::ReportGrid;
use std::path::Path;

pub fn generate_excel(grid: &ReportGrid, output_path: &Path) -> Result<()> {
    let buffer =
        excel_core::generate_excel_buffer(grid).map_err(PatchReportError::ExcelGeneration)?;

    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(output_path, buffer)?;

    tracing::info!(
        path = %output_path.display(),
        rows = grid.data_rows().len(),
        "spreadsheet written"
    );
    Ok(())
}
