//! カタログのテーブルソース
//!
//! - http: カタログ検索ページを取得（reqwest blocking）
//! - directory: 保存済みHTMLを読み込む（オフライン実行・テスト用）
//!
//! どちらも結果テーブルを scraper で解析し、同じ `CatalogPage` を保持する。

mod directory;
mod http;

pub use directory::DirectoryCatalogSource;
pub use http::HttpCatalogSource;

use crate::error::{PatchReportError, Result};
use lazy_static::lazy_static;
use patch_report_common::dates::parse_catalog_date;
use patch_report_common::{RawTable, TableSource};
use scraper::{ElementRef, Html, Selector};
use std::path::{Path, PathBuf};

/// 検索結果テーブルのID
pub const RESULTS_TABLE_ID: &str = "ctl00_catalogBody_updateMatches";
/// 並べ替えに使う列
pub const SORT_COLUMN: &str = "Last Updated";
/// 「Last Updated」見出しリンクのポストバック先
pub const SORT_EVENT_TARGET: &str = "ctl00$catalogBody$updateMatches$ctl02$dateHeaderLink";

lazy_static! {
    static ref ROW_SELECTOR: Selector = Selector::parse(&format!(
        "table#{id} > thead > tr, table#{id} > tbody > tr, table#{id} > tr",
        id = RESULTS_TABLE_ID
    ))
    .unwrap();
    static ref HEADER_CELL_SELECTOR: Selector = Selector::parse("th").unwrap();
    static ref DATA_CELL_SELECTOR: Selector = Selector::parse("td").unwrap();
    static ref HIDDEN_INPUT_SELECTOR: Selector =
        Selector::parse("input[type=hidden][name]").unwrap();
}

/// CLIが使うソース
pub type CatalogSource = Box<dyn TableSource<Error = PatchReportError> + Send>;

/// オフラインディレクトリがあればそちら、なければHTTP
pub fn open_source(
    offline_dir: Option<&Path>,
    catalog_url: &str,
    timeout: std::time::Duration,
) -> Result<CatalogSource> {
    match offline_dir {
        Some(dir) => Ok(Box::new(DirectoryCatalogSource::new(dir)?)),
        None => Ok(Box::new(HttpCatalogSource::new(catalog_url, timeout)?)),
    }
}

/// 開いている検索結果ページ
#[derive(Debug, Clone)]
pub(crate) struct CatalogPage {
    pub label: String,
    pub html: String,
    pub table: RawTable,
    /// `__VIEWSTATE` などのフォーム隠しフィールド（ポストバックで送り返す）
    pub hidden_fields: Vec<(String, String)>,
}

impl CatalogPage {
    /// HTMLを解析してページを作る（結果テーブルがなければエラー）
    pub fn parse(label: &str, html: String) -> Result<Self> {
        let table = parse_results_table(&html)
            .ok_or_else(|| PatchReportError::MarkupMissing(label.to_string()))?;
        let hidden_fields = parse_hidden_fields(&html);
        Ok(Self {
            label: label.to_string(),
            html,
            table,
            hidden_fields,
        })
    }

    /// 読み込み済みの行をその場で並べ替える（保存済みページ用）
    pub fn sort_by_date(&mut self) {
        sort_rows_by_date(&mut self.table, SORT_COLUMN);
    }

    /// `<dir>/<name>.html` に保存
    pub fn save_snapshot(&self, dir: &Path, name: &str) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)
            .map_err(|e| PatchReportError::Snapshot(format!("{}: {}", dir.display(), e)))?;
        let path = dir.join(format!("{}.html", name));
        std::fs::write(&path, &self.html)
            .map_err(|e| PatchReportError::Snapshot(format!("{}: {}", path.display(), e)))?;
        Ok(path)
    }
}

/// 結果テーブルを RawTable に変換
///
/// 1行目の th をヘッダ、以降の行の td をデータとする。
/// テーブルがなければ None。
pub fn parse_results_table(html: &str) -> Option<RawTable> {
    let document = Html::parse_document(html);
    let mut rows = document.select(&ROW_SELECTOR);

    let header_row = rows.next()?;
    let mut header = cell_texts(header_row, &HEADER_CELL_SELECTOR);
    if header.is_empty() {
        header = cell_texts(header_row, &DATA_CELL_SELECTOR);
    }

    let rows = rows
        .map(|row| cell_texts(row, &DATA_CELL_SELECTOR))
        .filter(|cells| !cells.is_empty())
        .collect();

    Some(RawTable { header, rows })
}

/// フォームの隠しフィールドを (name, value) で文書順に取り出す
pub fn parse_hidden_fields(html: &str) -> Vec<(String, String)> {
    let document = Html::parse_document(html);
    document
        .select(&HIDDEN_INPUT_SELECTOR)
        .filter_map(|input| {
            let element = input.value();
            let name = element.attr("name")?;
            Some((
                name.to_string(),
                element.attr("value").unwrap_or_default().to_string(),
            ))
        })
        .collect()
}

/// 日付見出しのクリックに相当するポストバックのフォーム
///
/// 隠しフィールドはそのまま送り、`__EVENTTARGET` / `__EVENTARGUMENT` だけ差し替える。
pub fn sort_postback_form(hidden_fields: &[(String, String)]) -> Vec<(String, String)> {
    let mut form: Vec<(String, String)> = hidden_fields
        .iter()
        .filter(|(name, _)| name != "__EVENTTARGET" && name != "__EVENTARGUMENT")
        .cloned()
        .collect();
    form.push(("__EVENTTARGET".to_string(), SORT_EVENT_TARGET.to_string()));
    form.push(("__EVENTARGUMENT".to_string(), String::new()));
    form
}

fn cell_texts(row: ElementRef<'_>, selector: &Selector) -> Vec<String> {
    row.select(selector).map(|cell| normalize_text(cell.text())).collect()
}

/// 連続する空白を1つにまとめる
fn normalize_text<'a>(parts: impl Iterator<Item = &'a str>) -> String {
    let joined: String = parts.collect::<Vec<_>>().join(" ");
    joined.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// 日付列で新しい順に安定ソート（読めない日付は末尾）
pub fn sort_rows_by_date(table: &mut RawTable, column: &str) {
    let Some(idx) = table.header.iter().position(|h| h == column) else {
        tracing::debug!(column, "sort column not found, keeping page order");
        return;
    };
    table.rows.sort_by(|a, b| {
        let da = a.get(idx).and_then(|t| parse_catalog_date(t));
        let db = b.get(idx).and_then(|t| parse_catalog_date(t));
        // None < Some なので逆順比較で None が末尾に来る
        db.cmp(&da)
    });
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// カタログ検索結果ページ（簡略版）
    pub(crate) fn catalog_html(rows: &[[&str; 3]]) -> String {
        let body: String = rows
            .iter()
            .map(|[title, classification, date]| {
                format!(
                    "<tr><td></td><td><a href=\"#\">\n  {}\n</a></td><td>Windows</td><td>{}</td><td>{}</td><td>n/a</td><td>1 MB</td><td><input type=\"button\" value=\"Download\"></td></tr>",
                    title, classification, date
                )
            })
            .collect();
        format!(
            "<html><body><table id=\"{}\"><tr id=\"headerRow\"><th></th><th>Title</th><th>Products</th><th>Classification</th><th>Last Updated</th><th>Version</th><th>Size</th><th>Download</th></tr>{}</table></body></html>",
            RESULTS_TABLE_ID, body
        )
    }

    #[test]
    fn test_parse_results_table() {
        let html = catalog_html(&[
            ["2024-09 Cumulative Update (KB5043050)", "Security Updates", "9/10/2024"],
            ["2024-08 Cumulative Update (KB5041773)", "Security Updates", "8/13/2024"],
        ]);
        let table = parse_results_table(&html).expect("テーブルが見つからない");

        assert_eq!(table.header.len(), 8);
        assert_eq!(table.header[1], "Title");
        assert_eq!(table.header[4], "Last Updated");
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0][1], "2024-09 Cumulative Update (KB5043050)");
        assert_eq!(table.rows[1][4], "8/13/2024");
    }

    #[test]
    fn test_parse_missing_table() {
        assert!(parse_results_table("<html><body><p>No results</p></body></html>").is_none());
        let err = CatalogPage::parse("Windows 10", "<html></html>".to_string()).unwrap_err();
        assert!(matches!(err, PatchReportError::MarkupMissing(label) if label == "Windows 10"));
    }

    #[test]
    fn test_parse_hidden_fields() {
        let html = format!(
            "<html><body><form method=\"post\">\
             <input type=\"hidden\" name=\"__EVENTTARGET\" id=\"__EVENTTARGET\" value=\"\">\
             <input type=\"hidden\" name=\"__VIEWSTATE\" value=\"dDwtMTA4\">\
             <input type=\"hidden\" name=\"__EVENTVALIDATION\" value=\"/wEdAAk=\">\
             <input type=\"text\" name=\"ctl00$searchTextBox\" value=\"Windows 10\">\
             <input type=\"hidden\" value=\"unnamed\">\
             </form>{}</body></html>",
            catalog_html(&[])
        );
        let fields = parse_hidden_fields(&html);
        assert_eq!(
            fields,
            vec![
                ("__EVENTTARGET".to_string(), String::new()),
                ("__VIEWSTATE".to_string(), "dDwtMTA4".to_string()),
                ("__EVENTVALIDATION".to_string(), "/wEdAAk=".to_string()),
            ]
        );

        let page = CatalogPage::parse("Windows 10", html).unwrap();
        assert_eq!(page.hidden_fields.len(), 3);
    }

    #[test]
    fn test_sort_postback_form_replaces_event_target() {
        let hidden = vec![
            ("__EVENTTARGET".to_string(), "ctl00$other".to_string()),
            ("__EVENTARGUMENT".to_string(), "x".to_string()),
            ("__VIEWSTATE".to_string(), "dDwtMTA4".to_string()),
        ];
        let form = sort_postback_form(&hidden);
        assert_eq!(
            form,
            vec![
                ("__VIEWSTATE".to_string(), "dDwtMTA4".to_string()),
                ("__EVENTTARGET".to_string(), SORT_EVENT_TARGET.to_string()),
                ("__EVENTARGUMENT".to_string(), String::new()),
            ]
        );
    }

    #[test]
    fn test_normalize_text() {
        let parts = ["  Security\n", "   Updates  "];
        assert_eq!(normalize_text(parts.into_iter()), "Security Updates");
    }

    #[test]
    fn test_sort_rows_by_date_newest_first() {
        let mut table = RawTable {
            header: vec!["Title".into(), "Last Updated".into()],
            rows: vec![
                vec!["a".into(), "8/13/2024".into()],
                vec!["b".into(), "bad".into()],
                vec!["c".into(), "9/10/2024".into()],
                vec!["d".into(), "8/13/2024".into()],
            ],
        };
        sort_rows_by_date(&mut table, SORT_COLUMN);
        let titles: Vec<&str> = table.rows.iter().map(|r| r[0].as_str()).collect();
        assert_eq!(titles, vec!["c", "a", "d", "b"]);
    }

    #[test]
    fn test_sort_without_column_keeps_order() {
        let mut table = RawTable {
            header: vec!["Title".into()],
            rows: vec![vec!["b".into()], vec!["a".into()]],
        };
        sort_rows_by_date(&mut table, SORT_COLUMN);
        assert_eq!(table.rows[0][0], "b");
    }
}
