//! 処理パイプライン
//!
//! ## 処理フロー
//! 1. collect: 全ソースを集約 → (CSV出力) → KB番号で重複排除
//! 2. export: 適用対象マトリクス作成 → レポートグリッド → xlsx 書き出し
//! 3. run: 1 と 2 を続けて実行
//!
//! 進捗は集約が 0〜80、以降は 85 / 90 / 95 / 100。
//! `run_in_background` は成功・失敗どちらでも最後に 100 を送る。

use crate::config::Config;
use crate::error::{PatchReportError, Result};
use crate::export;
use crate::progress::{self, ChannelProgress};
use chrono::NaiveDate;
use patch_report_common::dates::sheet_name;
use patch_report_common::{
    aggregate, build_matrix, dedup_keep_last, render, AggregateOptions, MonotonicProgress,
    NormalizedRecord, ProgressSink, ProgressUpdate, TableSource,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc::UnboundedSender;

pub const PROGRESS_DEDUP: u8 = 85;
pub const PROGRESS_ANNOTATE: u8 = 90;
pub const PROGRESS_RENDER: u8 = 95;
pub const PROGRESS_DONE: u8 = 100;

/// collect の結果（export の入力JSON）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchList {
    pub run_date: NaiveDate,
    pub cutoff: NaiveDate,
    pub header: Vec<String>,
    pub records: Vec<NormalizedRecord>,
}

impl PatchList {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(PatchReportError::FileNotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

/// collect のオプション
#[derive(Debug, Clone)]
pub struct CollectOptions<'a> {
    pub config: &'a Config,
    pub cutoff: NaiveDate,
    pub run_date: NaiveDate,
    /// 各ソースのスナップショットを config.snapshot_dir に保存
    pub screenshot: bool,
    /// tracked/status バケットのCSV出力先
    pub csv_dir: Option<&'a Path>,
}

/// export の結果
#[derive(Debug, Clone, PartialEq)]
pub struct ExportSummary {
    pub output: PathBuf,
    pub sheet_name: String,
    pub rows: usize,
}

/// 全ソースを集約して重複排除
pub fn collect<S, P>(
    source: &mut S,
    options: &CollectOptions<'_>,
    progress: &mut P,
) -> Result<PatchList>
where
    S: TableSource<Error = PatchReportError> + ?Sized,
    P: ProgressSink + ?Sized,
{
    let aggregate_options = AggregateOptions {
        rules: &options.config.rules,
        cutoff: options.cutoff,
        snapshot_dir: options
            .screenshot
            .then_some(options.config.snapshot_dir.as_path()),
        run_date: options.run_date,
    };
    let aggregate = aggregate(
        source,
        &options.config.sources,
        &aggregate_options,
        progress,
    )?;

    if let Some(dir) = options.csv_dir {
        let (tracked_path, status_path) = export::csv::write_buckets(
            dir,
            options.run_date,
            &aggregate.header,
            &aggregate.tracked,
            &aggregate.status,
        )?;
        tracing::info!(
            tracked = %tracked_path.display(),
            status = %status_path.display(),
            "bucket CSV written"
        );
    }

    progress.report(PROGRESS_DEDUP, "Removing duplicate patches");
    let before = aggregate.tracked.len();
    let records = dedup_keep_last(aggregate.tracked);
    tracing::info!(before, after = records.len(), "duplicates removed");

    Ok(PatchList {
        run_date: options.run_date,
        cutoff: options.cutoff,
        header: aggregate.header,
        records,
    })
}

/// 適用対象を付けてExcelに書き出す
///
/// `today` はシート名と駆除ツールのコメントに使う。
pub fn export<P>(
    records: &[NormalizedRecord],
    today: NaiveDate,
    output: &Path,
    progress: &mut P,
) -> Result<ExportSummary>
where
    P: ProgressSink + ?Sized,
{
    progress.report(PROGRESS_ANNOTATE, "Annotating applicability");
    let matrix = build_matrix(records, today);

    progress.report(PROGRESS_RENDER, "Writing spreadsheet");
    let sheet = sheet_name(today);
    let grid = render(&matrix, &sheet);
    export::excel::generate_excel(&grid, output)?;

    Ok(ExportSummary {
        output: output.to_path_buf(),
        sheet_name: sheet,
        rows: matrix.len(),
    })
}

/// 取得からExcel生成まで
pub fn run<S, P>(
    source: &mut S,
    options: &CollectOptions<'_>,
    output: &Path,
    progress: &mut P,
) -> Result<ExportSummary>
where
    S: TableSource<Error = PatchReportError> + ?Sized,
    P: ProgressSink + ?Sized,
{
    let list = collect(source, options, progress)?;
    export(&list.records, options.run_date, output, progress)
}

/// ジョブを実行し、結果に応じて最後に 100 を送る
///
/// ジョブには単調化済みの進捗シンクが渡される。完了時は `done_status`、
/// 失敗時は `Failed: <エラー>` を送る。
pub fn run_reporting<T, F>(
    job: F,
    done_status: &str,
    tx: UnboundedSender<ProgressUpdate>,
) -> Result<T>
where
    F: FnOnce(&mut dyn ProgressSink) -> Result<T>,
{
    let mut sink = MonotonicProgress::new(ChannelProgress::new(tx));
    let result = job(&mut sink);
    match &result {
        Ok(_) => sink.report(PROGRESS_DONE, done_status),
        Err(e) => sink.report(PROGRESS_DONE, &format!("Failed: {}", e)),
    }
    result
}

/// ジョブをブロッキングスレッドで実行し、進捗バーを表示する
///
/// `hide_bar` が true なら進捗バーを出さない（詳細ログと stderr を取り合わないため）。
pub async fn run_in_background<T, F>(job: F, done_status: &'static str, hide_bar: bool) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&mut dyn ProgressSink) -> Result<T> + Send + 'static,
{
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    let bar = progress::new_bar(hide_bar);

    let handle = tokio::task::spawn_blocking(move || run_reporting(job, done_status, tx));

    progress::watch(rx, bar).await;
    handle
        .await
        .map_err(|e| PatchReportError::Worker(e.to_string()))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::tests::catalog_html;
    use crate::source::DirectoryCatalogSource;
    use patch_report_common::SourceDescriptor;
    use tempfile::tempdir;
    use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};

    fn drain(rx: &mut UnboundedReceiver<ProgressUpdate>) -> Vec<ProgressUpdate> {
        std::iter::from_fn(|| rx.try_recv().ok()).collect()
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn config_for(labels: &[&str]) -> Config {
        let mut config = Config::default();
        config.sources = labels
            .iter()
            .map(|l| SourceDescriptor::new(l, l, "version"))
            .collect();
        config
    }

    #[test]
    fn test_collect_dedups_across_sources() {
        let dir = tempdir().expect("Failed to create temp dir");
        std::fs::write(
            dir.path().join("Windows 10.html"),
            catalog_html(&[
                ["2024-09 Cumulative Update (KB5043064)", "Security Updates", "9/10/2024"],
                ["2024-09 Dynamic Update (KB5043100)", "Updates", "9/10/2024"],
            ]),
        )
        .unwrap();
        std::fs::write(
            dir.path().join("Windows 11.html"),
            catalog_html(&[["2024-09 Cumulative Update (KB5043064)", "Security Updates", "9/10/2024"]]),
        )
        .unwrap();

        let config = config_for(&["Windows 10", "Windows 11"]);
        let csv_dir = dir.path().join("csv");
        let options = CollectOptions {
            config: &config,
            cutoff: ymd(2024, 8, 14),
            run_date: ymd(2024, 9, 11),
            screenshot: false,
            csv_dir: Some(&csv_dir),
        };
        let mut source = DirectoryCatalogSource::new(dir.path()).unwrap();
        let mut updates: Vec<ProgressUpdate> = Vec::new();

        let list = collect(&mut source, &options, &mut updates).unwrap();

        assert_eq!(list.records.len(), 1);
        assert_eq!(list.records[0].label(), "Windows 11");
        assert!(csv_dir.join("patch_status_2024_09_11.csv").is_file());
        assert_eq!(updates.last().map(|u| u.percent), Some(PROGRESS_DEDUP));
    }

    #[test]
    fn test_run_writes_workbook() {
        let dir = tempdir().expect("Failed to create temp dir");
        std::fs::write(
            dir.path().join("SQL Server 2019.html"),
            catalog_html(&[["Security Update for SQL Server 2019 RTM GDR (KB5040986)", "Security Updates", "9/10/2024"]]),
        )
        .unwrap();

        let config = config_for(&["SQL Server 2019"]);
        let options = CollectOptions {
            config: &config,
            cutoff: ymd(2024, 8, 14),
            run_date: ymd(2024, 9, 11),
            screenshot: false,
            csv_dir: None,
        };
        let output = dir.path().join("out").join("patches.xlsx");
        let mut source = DirectoryCatalogSource::new(dir.path()).unwrap();
        let mut updates: Vec<ProgressUpdate> = Vec::new();

        let summary = run(&mut source, &options, &output, &mut updates).unwrap();

        assert!(output.is_file());
        assert_eq!(summary.sheet_name, "September-2024");
        assert_eq!(summary.rows, 1);
        let percents: Vec<u8> = updates.iter().map(|u| u.percent).collect();
        assert!(percents.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(percents.last(), Some(&PROGRESS_RENDER));
    }

    #[test]
    fn test_patch_list_roundtrip() {
        let dir = tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("patches.json");
        let list = PatchList {
            run_date: ymd(2024, 9, 11),
            cutoff: ymd(2024, 8, 14),
            header: vec!["#".into()],
            records: Vec::new(),
        };
        list.save(&path).unwrap();
        assert_eq!(PatchList::load(&path).unwrap(), list);

        let err = PatchList::load(&dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, PatchReportError::FileNotFound(_)));
    }

    #[tokio::test]
    async fn test_run_in_background_reports_failure() {
        let result: Result<()> = run_in_background(
            |progress| {
                progress.report(30, "working");
                Err(PatchReportError::MarkupMissing("Windows 10".into()))
            },
            "done",
            true,
        )
        .await;
        assert!(matches!(result, Err(PatchReportError::MarkupMissing(_))));
    }

    #[tokio::test]
    async fn test_run_in_background_returns_value() {
        let value = run_in_background(|_| Ok(42), "done", true).await.unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn test_run_reporting_ends_at_100_on_failure() {
        let (tx, mut rx) = unbounded_channel();
        let result: Result<()> = run_reporting(
            |progress| {
                progress.report(30, "Searching catalog: Windows 10");
                Err(PatchReportError::MarkupMissing("Windows 10".into()))
            },
            "Patches spreadsheet created.",
            tx,
        );
        assert!(result.is_err());

        let updates = drain(&mut rx);
        let last = updates.last().expect("進捗なし");
        assert_eq!(last.percent, PROGRESS_DONE);
        assert_eq!(last.status, "Failed: 結果テーブルが見つかりません: Windows 10");
    }

    #[test]
    fn test_run_reporting_ends_at_100_on_success() {
        let (tx, mut rx) = unbounded_channel();
        let dir = tempdir().expect("Failed to create temp dir");
        let output = dir.path().join("empty.xlsx");

        let summary = run_reporting(
            |progress| export(&[], ymd(2024, 9, 11), &output, progress),
            "Patches spreadsheet created.",
            tx,
        )
        .unwrap();
        assert_eq!(summary.rows, 0);

        let updates = drain(&mut rx);
        let percents: Vec<u8> = updates.iter().map(|u| u.percent).collect();
        assert_eq!(percents, vec![PROGRESS_ANNOTATE, PROGRESS_RENDER, PROGRESS_DONE]);
        assert_eq!(
            updates.last().map(|u| u.status.as_str()),
            Some("Patches spreadsheet created.")
        );
    }
}
