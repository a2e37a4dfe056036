use super::{sort_postback_form, CatalogPage};
use crate::error::{PatchReportError, Result};
use patch_report_common::{RawTable, SourceDescriptor, TableSource};
use reqwest::blocking::Client;
use reqwest::Url;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// カタログ検索ページを HTTP で取得するソース
///
/// blocking クライアントを使うため、非同期ランタイム上では
/// `spawn_blocking` の中で生成・使用すること。
pub struct HttpCatalogSource {
    client: Option<Client>,
    base_url: String,
    page: Option<CatalogPage>,
    /// 開いているページのURL（ポストバック先）
    page_url: Option<Url>,
}

impl HttpCatalogSource {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("patch-report/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client: Some(client),
            base_url: base_url.to_string(),
            page: None,
            page_url: None,
        })
    }

    /// 検索URL（?q=<query>）
    pub fn search_url(&self, query: &str) -> Result<Url> {
        Url::parse_with_params(&self.base_url, &[("q", query)])
            .map_err(|e| PatchReportError::Config(format!("catalog_url: {}", e)))
    }

    fn page_mut(&mut self) -> Result<&mut CatalogPage> {
        self.page.as_mut().ok_or(PatchReportError::NoPage)
    }
}

impl TableSource for HttpCatalogSource {
    type Error = PatchReportError;

    fn navigate(&mut self, source: &SourceDescriptor) -> Result<()> {
        let url = self.search_url(&source.query)?;
        let client = self
            .client
            .as_ref()
            .ok_or(PatchReportError::SessionReleased)?;

        tracing::debug!(%url, "fetching catalog page");
        let html = client.get(url.clone()).send()?.error_for_status()?.text()?;
        self.page = Some(CatalogPage::parse(&source.label, html)?);
        self.page_url = Some(url);
        Ok(())
    }

    /// 日付見出しのポストバックを送り、サーバが並べ替えたページに置き換える
    fn sort_by_date(&mut self) -> Result<()> {
        let client = self
            .client
            .as_ref()
            .ok_or(PatchReportError::SessionReleased)?;
        let (page, url) = match (self.page.as_ref(), self.page_url.as_ref()) {
            (Some(page), Some(url)) => (page, url),
            _ => return Err(PatchReportError::NoPage),
        };

        let form = sort_postback_form(&page.hidden_fields);
        tracing::debug!(%url, fields = form.len(), "posting sort by date");
        let html = client
            .post(url.clone())
            .form(&form)
            .send()?
            .error_for_status()?
            .text()?;
        let sorted = CatalogPage::parse(&page.label, html)?;
        self.page = Some(sorted);
        Ok(())
    }

    fn capture_snapshot(&mut self, dir: &Path, name: &str) -> Result<PathBuf> {
        self.page_mut()?.save_snapshot(dir, name)
    }

    fn read_table(&mut self) -> Result<RawTable> {
        Ok(self.page_mut()?.table.clone())
    }

    fn release(&mut self) {
        if self.client.take().is_some() {
            tracing::debug!("catalog session released");
        }
        self.page = None;
        self.page_url = None;
    }
}
