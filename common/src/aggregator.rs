//! カタログ集約モジュール
//!
//! 複数ソースを順番に取得・抽出し、tracked バケットを結合する。
//! テーブルソースのセッションは1実行で1つだけ使い、終了時（エラー時も）に必ず解放する。

use crate::extractor::{extract, ExtractRules};
use crate::types::{
    NormalizedRecord, RawTable, SourceDescriptor, COL_DESCRIPTION, COL_INDEX, COL_RELEASE_DATE,
    COL_UPDATE_TYPE, SYNTHETIC_COLUMNS,
};
use crate::error::Error;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};

/// 集約処理が使う進捗の上限（残りはエクスポート側）
pub const AGGREGATE_PROGRESS_SPAN: u8 = 80;

/// テーブルソース（外部コラボレータ）
///
/// 1インスタンス = 1セッション。`release` は集約処理が1回だけ呼ぶ。
pub trait TableSource {
    type Error: From<Error>;

    /// ソースの検索結果ページを開く
    fn navigate(&mut self, source: &SourceDescriptor) -> Result<(), Self::Error>;

    /// 更新日の新しい順に並べ替える
    fn sort_by_date(&mut self) -> Result<(), Self::Error>;

    /// 現在のページのスナップショットを保存し、保存先を返す
    fn capture_snapshot(&mut self, dir: &Path, name: &str) -> Result<PathBuf, Self::Error>;

    /// 結果テーブルを読み取る
    fn read_table(&mut self) -> Result<RawTable, Self::Error>;

    /// セッションを解放する
    fn release(&mut self);
}

/// 進捗の通知先
pub trait ProgressSink {
    fn report(&mut self, percent: u8, status: &str);
}

/// 進捗メッセージ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressUpdate {
    pub percent: u8,
    pub status: String,
}

/// 何もしない進捗
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn report(&mut self, _percent: u8, _status: &str) {}
}

impl ProgressSink for Vec<ProgressUpdate> {
    fn report(&mut self, percent: u8, status: &str) {
        self.push(ProgressUpdate {
            percent,
            status: status.to_string(),
        });
    }
}

impl<P: ProgressSink + ?Sized> ProgressSink for &mut P {
    fn report(&mut self, percent: u8, status: &str) {
        (**self).report(percent, status);
    }
}

/// 単調非減少・100以下に丸める進捗ラッパー
pub struct MonotonicProgress<P> {
    inner: P,
    last: u8,
}

impl<P: ProgressSink> MonotonicProgress<P> {
    pub fn new(inner: P) -> Self {
        Self { inner, last: 0 }
    }

    pub fn last(&self) -> u8 {
        self.last
    }

    pub fn into_inner(self) -> P {
        self.inner
    }
}

impl<P: ProgressSink> ProgressSink for MonotonicProgress<P> {
    fn report(&mut self, percent: u8, status: &str) {
        self.last = self.last.max(percent.min(100));
        self.inner.report(self.last, status);
    }
}

/// 集約オプション
#[derive(Debug, Clone)]
pub struct AggregateOptions<'a> {
    pub rules: &'a ExtractRules,
    pub cutoff: NaiveDate,
    /// Some の場合、各ソースのスナップショットをこのディレクトリに保存
    pub snapshot_dir: Option<&'a Path>,
    /// スナップショットのファイル名に付ける日付
    pub run_date: NaiveDate,
}

/// 集約結果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Aggregate {
    pub header: Vec<String>,
    pub tracked: Vec<NormalizedRecord>,
    pub status: Vec<NormalizedRecord>,
}

/// ソースが1つもヘッダを返さなかった場合の列構成
pub fn default_header() -> Vec<String> {
    [COL_INDEX, COL_DESCRIPTION, COL_RELEASE_DATE, COL_UPDATE_TYPE]
        .iter()
        .chain(SYNTHETIC_COLUMNS.iter())
        .map(|c| c.to_string())
        .collect()
}

/// セッションのスコープガード（Drop で解放）
struct Session<'a, S: TableSource + ?Sized> {
    source: &'a mut S,
}

impl<S: TableSource + ?Sized> Deref for Session<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        self.source
    }
}

impl<S: TableSource + ?Sized> DerefMut for Session<'_, S> {
    fn deref_mut(&mut self) -> &mut S {
        self.source
    }
}

impl<S: TableSource + ?Sized> Drop for Session<'_, S> {
    fn drop(&mut self) {
        self.source.release();
    }
}

/// 全ソースを順番に処理して tracked を結合する
///
/// ソースのエラーは即座に返す（それまでの結果は破棄）。どの経路でも
/// セッションは1回だけ解放される。
pub fn aggregate<S, P>(
    source: &mut S,
    sources: &[SourceDescriptor],
    options: &AggregateOptions<'_>,
    progress: &mut P,
) -> Result<Aggregate, S::Error>
where
    S: TableSource + ?Sized,
    P: ProgressSink + ?Sized,
{
    let mut session = Session { source };
    let mut result = Aggregate::default();
    let mut header: Option<Vec<String>> = None;
    let total = sources.len().max(1);
    let span = AGGREGATE_PROGRESS_SPAN as usize;

    for (i, descriptor) in sources.iter().enumerate() {
        progress.report(
            (i * span / total) as u8,
            &format!("Searching catalog: {}", descriptor.label),
        );

        session.navigate(descriptor)?;
        session.sort_by_date()?;

        if let Some(dir) = options.snapshot_dir {
            let name = format!("{}_{}", descriptor.label, crate::dates::file_stamp(options.run_date));
            let saved = session.capture_snapshot(dir, &name)?;
            tracing::debug!(path = %saved.display(), "snapshot saved");
        }

        let table = session.read_table()?;
        let extraction = extract(&table, descriptor, options.rules, options.cutoff)?;

        let expected = header.get_or_insert_with(|| extraction.header.clone());
        if *expected != extraction.header {
            return Err(Error::ColumnSkew {
                source_label: descriptor.label.clone(),
                expected: expected.clone(),
                actual: extraction.header,
            }
            .into());
        }

        tracing::info!(
            source = %descriptor.label,
            rows = table.rows.len(),
            tracked = extraction.tracked.len(),
            status = extraction.status.len(),
            "source extracted"
        );

        progress.report(
            ((i + 1) * span / total) as u8,
            &format!(
                "{}: {} patches ({} filtered)",
                descriptor.label,
                extraction.tracked.len(),
                extraction.status.len()
            ),
        );

        result.tracked.extend(extraction.tracked);
        result.status.extend(extraction.status);
    }

    result.header = header.unwrap_or_else(default_header);
    Ok(result)
}

/// KB番号で重複排除（後勝ち）
///
/// 各KB番号の最後の出現だけを残し、残ったレコードは元の相対順を保つ。
pub fn dedup_keep_last(records: Vec<NormalizedRecord>) -> Vec<NormalizedRecord> {
    let last: HashMap<String, usize> = records
        .iter()
        .enumerate()
        .map(|(i, r)| (r.identifier().to_string(), i))
        .collect();

    records
        .into_iter()
        .enumerate()
        .filter(|(i, r)| last.get(r.identifier()) == Some(i))
        .map(|(_, r)| r)
        .collect()
}
