//! tracked/status バケットのCSV出力

use crate::error::Result;
use patch_report_common::dates::file_stamp;
use patch_report_common::NormalizedRecord;
use chrono::NaiveDate;
use std::path::{Path, PathBuf};

/// 1バケットをヘッダ順でCSVに書き出す（欠けた列は空欄）
pub fn write_records(path: &Path, header: &[String], records: &[NormalizedRecord]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(header)?;
    for record in records {
        writer.write_record(header.iter().map(|column| record.get(column).unwrap_or("")))?;
    }
    writer.flush()?;
    Ok(())
}

/// `system1_<日付>.csv` と `patch_status_<日付>.csv` を出力
pub fn write_buckets(
    dir: &Path,
    run_date: NaiveDate,
    header: &[String],
    tracked: &[NormalizedRecord],
    status: &[NormalizedRecord],
) -> Result<(PathBuf, PathBuf)> {
    std::fs::create_dir_all(dir)?;
    let stamp = file_stamp(run_date);
    let tracked_path = dir.join(format!("system1_{}.csv", stamp));
    let status_path = dir.join(format!("patch_status_{}.csv", stamp));

    write_records(&tracked_path, header, tracked)?;
    write_records(&status_path, header, status)?;
    Ok((tracked_path, status_path))
}
