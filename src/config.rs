use crate::error::{PatchReportError, Result};
use patch_report_common::{ExtractRules, SourceDescriptor};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// カタログ検索ページ
pub const CATALOG_SEARCH_URL: &str = "https://www.catalog.update.microsoft.com/Search.aspx";
/// 出力先がディレクトリの場合のファイル名
pub const DEFAULT_OUTPUT_NAME: &str = "System 1 Patches.xlsx";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 取得する製品ライン（この順に処理）
    pub sources: Vec<SourceDescriptor>,
    /// 列の入れ替え・削除・フィルタ語
    pub rules: ExtractRules,
    /// 出力Excel
    pub output: PathBuf,
    /// スナップショット保存先
    pub snapshot_dir: PathBuf,
    pub catalog_url: String,
    pub timeout_seconds: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            Ok(Self::default_config())
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(PatchReportError::FileNotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self) -> Result<PathBuf> {
        let config_path = Self::config_path()?;
        self.save_to(&config_path)?;
        Ok(config_path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| PatchReportError::Config("ホームディレクトリが見つかりません".into()))?;
        Ok(home.join(".config").join("patch-report").join("config.json"))
    }

    pub fn validate(&self) -> Result<()> {
        if self.sources.is_empty() {
            return Err(PatchReportError::Config("sources が空です".into()));
        }
        if self.timeout_seconds == 0 {
            return Err(PatchReportError::Config("timeout_seconds は1以上".into()));
        }
        Ok(())
    }

    fn default_config() -> Self {
        let sources = [
            ("Windows Server 2016 for x64 2024", "Windows Server 2016 (2024)", "version 1607"),
            ("Windows Server 2019 for x64 2024", "Windows Server 2019 (2024)", "version 1809"),
            ("Windows Server 2016 for x64", "Windows Server 2016", "version 1607"),
            ("Windows Server 2019 for x64", "Windows Server 2019", "version 1809"),
            ("Microsoft Server Operating System-21H2 for x64", "Windows Server 2022", "version 21H2"),
            ("Windows 10 Version 22H2 for x64", "Windows 10", "version 22H2"),
            ("Windows 11 Version 23H2 for x64", "Windows 11", "version 23H2"),
            ("SQL Server 2016 Service Pack 3", "SQL Server 2016", "SP3 (13.0.6419.1)"),
            ("SQL Server 2019", "SQL Server 2019", "RTM"),
            ("Microsoft Office 2016 32-bit", "Office 2016", "x32 bits"),
        ]
        .iter()
        .map(|(query, label, version)| SourceDescriptor::new(query, label, version))
        .collect();

        Self {
            sources,
            rules: ExtractRules::default(),
            output: PathBuf::from(DEFAULT_OUTPUT_NAME),
            snapshot_dir: PathBuf::from("."),
            catalog_url: CATALOG_SEARCH_URL.into(),
            timeout_seconds: 10, // 結果テーブル待ちの上限
        }
    }
}
