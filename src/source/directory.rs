use super::CatalogPage;
use crate::error::{PatchReportError, Result};
use patch_report_common::{RawTable, SourceDescriptor, TableSource};
use std::path::{Path, PathBuf};

/// 保存済みの検索結果HTMLを読むソース
///
/// `<dir>/<label>.html` を優先し、なければ `<dir>/<query>.html` を探す。
pub struct DirectoryCatalogSource {
    dir: PathBuf,
    page: Option<CatalogPage>,
    released: bool,
}

impl DirectoryCatalogSource {
    pub fn new(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            return Err(PatchReportError::FileNotFound(dir.display().to_string()));
        }
        Ok(Self {
            dir: dir.to_path_buf(),
            page: None,
            released: false,
        })
    }

    /// ソースに対応するHTMLファイル
    pub fn page_path(&self, source: &SourceDescriptor) -> Option<PathBuf> {
        [&source.label, &source.query]
            .iter()
            .map(|name| self.dir.join(format!("{}.html", name)))
            .find(|path| path.is_file())
    }

    fn page_mut(&mut self) -> Result<&mut CatalogPage> {
        self.page.as_mut().ok_or(PatchReportError::NoPage)
    }
}

impl TableSource for DirectoryCatalogSource {
    type Error = PatchReportError;

    fn navigate(&mut self, source: &SourceDescriptor) -> Result<()> {
        if self.released {
            return Err(PatchReportError::SessionReleased);
        }
        let path = self.page_path(source).ok_or_else(|| {
            PatchReportError::FileNotFound(
                self.dir.join(format!("{}.html", source.label)).display().to_string(),
            )
        })?;
        tracing::debug!(path = %path.display(), "loading saved catalog page");

        let html = std::fs::read_to_string(&path)?;
        self.page = Some(CatalogPage::parse(&source.label, html)?);
        Ok(())
    }

    fn sort_by_date(&mut self) -> Result<()> {
        self.page_mut()?.sort_by_date();
        Ok(())
    }

    fn capture_snapshot(&mut self, dir: &Path, name: &str) -> Result<PathBuf> {
        self.page_mut()?.save_snapshot(dir, name)
    }

    fn read_table(&mut self) -> Result<RawTable> {
        Ok(self.page_mut()?.table.clone())
    }

    fn release(&mut self) {
        self.released = true;
        self.page = None;
    }
}
