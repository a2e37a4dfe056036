//! 適用対象マトリクス
//!
//! 製品ラベルごとの固定ルールで、各デプロイ対象への適用可否を埋める。
//! ルールは KB番号ルール → ラベルルール の順に評価し、最初に一致したものだけを適用する。

use crate::dates::last_day_of_previous_month;
use crate::layout::base_column_titles;
use crate::types::{
    NormalizedRecord, COL_COMMENT, COL_DESCRIPTION, COL_INDEX, COL_PRODUCT, COL_VERSION,
};
use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// デプロイ対象
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Target {
    DomainController,
    HistorianServer,
    ApplicationServer,
    DatabaseServer,
    EngineeringWorkstation,
    OperatorWorkstation,
    RemoteAccessWorkstation,
}

/// 対象数
pub const TARGET_COUNT: usize = 7;

impl Target {
    /// 出力列の順
    pub const ALL: [Target; TARGET_COUNT] = [
        Target::DomainController,
        Target::HistorianServer,
        Target::ApplicationServer,
        Target::DatabaseServer,
        Target::EngineeringWorkstation,
        Target::OperatorWorkstation,
        Target::RemoteAccessWorkstation,
    ];

    /// 列見出し
    pub fn column(&self) -> &'static str {
        match self {
            Target::DomainController => "Domain Controller",
            Target::HistorianServer => "Historian Server",
            Target::ApplicationServer => "Application Server",
            Target::DatabaseServer => "Database Server",
            Target::EngineeringWorkstation => "Engineering Workstation",
            Target::OperatorWorkstation => "Operator Workstation",
            Target::RemoteAccessWorkstation => "Remote Access Workstation",
        }
    }

    fn index(&self) -> usize {
        *self as usize
    }
}

/// マトリクスのセル値
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Applicability {
    /// 注記前（未評価）
    #[default]
    Pending,
    /// 手入力待ち
    Blank,
    /// 対象外
    NotApplicable,
    /// 説明文
    Note(String),
}

impl Applicability {
    pub fn text(&self) -> &str {
        match self {
            Applicability::Pending | Applicability::Blank => "",
            Applicability::NotApplicable => "N/A",
            Applicability::Note(text) => text,
        }
    }
}

/// 製品ラベルごとのルール
#[derive(Debug, Clone, Copy)]
pub struct LabelRule {
    pub label: &'static str,
    pub not_applicable: &'static [Target],
    /// 関連するマイナーバージョンも対象であることの注記
    pub note: Option<(Target, &'static str)>,
}

use Target::*;

pub const LABEL_RULES: &[LabelRule] = &[
    LabelRule {
        label: "Windows Server 2016",
        not_applicable: &[
            ApplicationServer,
            EngineeringWorkstation,
            OperatorWorkstation,
            RemoteAccessWorkstation,
        ],
        note: None,
    },
    LabelRule {
        label: "Windows Server 2019",
        not_applicable: &[
            DomainController,
            HistorianServer,
            EngineeringWorkstation,
            OperatorWorkstation,
            RemoteAccessWorkstation,
        ],
        note: None,
    },
    LabelRule {
        label: "Windows 10",
        not_applicable: &[
            DomainController,
            HistorianServer,
            ApplicationServer,
            DatabaseServer,
            EngineeringWorkstation,
        ],
        note: Some((
            RemoteAccessWorkstation,
            "Also applies to Windows 10 Version 21H2 on remote access workstations.",
        )),
    },
    LabelRule {
        label: "Windows 11",
        not_applicable: &[
            DomainController,
            HistorianServer,
            ApplicationServer,
            DatabaseServer,
            OperatorWorkstation,
            RemoteAccessWorkstation,
        ],
        note: Some((
            EngineeringWorkstation,
            "Also applies to Windows 11 Version 22H2 on engineering workstations.",
        )),
    },
    LabelRule {
        label: "SQL Server 2016",
        not_applicable: &[
            DomainController,
            ApplicationServer,
            DatabaseServer,
            EngineeringWorkstation,
            OperatorWorkstation,
            RemoteAccessWorkstation,
        ],
        note: None,
    },
    LabelRule {
        label: "SQL Server 2019",
        not_applicable: &[
            DomainController,
            HistorianServer,
            ApplicationServer,
            EngineeringWorkstation,
            OperatorWorkstation,
            RemoteAccessWorkstation,
        ],
        note: None,
    },
    LabelRule {
        label: "Office 2016",
        not_applicable: &[
            DomainController,
            HistorianServer,
            ApplicationServer,
            DatabaseServer,
            OperatorWorkstation,
        ],
        note: None,
    },
];

// ============================================
// 悪意のあるソフトウェアの削除ツール（毎月リリース）
// ============================================

/// 削除ツールのKB番号
pub const REMOVAL_TOOL_IDENTIFIER: &str = "KB890830";
/// 削除ツールの製品ラベル
pub const REMOVAL_TOOL_PRODUCT: &str = "Windows";

/// "Windows Malicious Software Removal Tool x64 - v5.127 (KB890830)" の v5.127 の位置
const VERSION_OFFSET: usize = 46;
const VERSION_LEN: usize = 6;
/// バージョン文字列内のビルド番号の位置（"v5." の後）
const BUILD_OFFSET: usize = 3;

/// 削除ツールのバージョン
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolVersion {
    /// 例: v5.127
    pub version: String,
    /// 例: v5.
    pub prefix: String,
    /// 例: 127
    pub build: u32,
}

impl ToolVersion {
    /// 前月リリースのバージョン（ビルド番号 - 1）
    pub fn previous(&self) -> String {
        format!("{}{}", self.prefix, self.build.saturating_sub(1))
    }
}

lazy_static::lazy_static! {
    static ref VERSION_RE: Regex = Regex::new(r"v\d+\.(\d+)").unwrap();
}

fn split_version(version: &str, build_offset: usize) -> Option<ToolVersion> {
    let prefix = version.get(..build_offset)?;
    let build = version.get(build_offset..)?.parse().ok()?;
    Some(ToolVersion {
        version: version.to_string(),
        prefix: prefix.to_string(),
        build,
    })
}

/// 説明文からバージョンを取り出す
///
/// 固定位置で読み、バージョン形式でなければ `v<major>.<build>` を検索する。
pub fn parse_tool_version(description: &str) -> Option<ToolVersion> {
    let fixed = description
        .get(VERSION_OFFSET..VERSION_OFFSET + VERSION_LEN)
        .filter(|v| VERSION_RE.find(v).map(|m| m.as_str()) == Some(*v))
        .and_then(|v| split_version(v, BUILD_OFFSET));
    if fixed.is_some() {
        return fixed;
    }

    let caps = VERSION_RE.captures(description)?;
    let whole = caps.get(0)?;
    let build = caps.get(1)?;
    split_version(whole.as_str(), build.start() - whole.start())
}

/// 前月ラベル（当月1日 - 1日、例: Aug/24）
pub fn previous_month_label(today: NaiveDate) -> String {
    last_day_of_previous_month(today).format("%b/%y").to_string()
}

/// 削除ツール行のコメント
pub fn superseded_comment(version: &ToolVersion, today: NaiveDate) -> String {
    format!(
        "Supersedes {} released in {}",
        version.previous(),
        previous_month_label(today)
    )
}

// ============================================
// 注記
// ============================================

/// 適用対象マトリクス付きレコード
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotatedRecord {
    /// 基本列に並べ替えたレコード
    pub record: NormalizedRecord,
    pub applicability: [Applicability; TARGET_COUNT],
}

impl AnnotatedRecord {
    /// 基本列に並べ替え、マトリクスを未評価で初期化
    pub fn prepare(record: &NormalizedRecord) -> Self {
        Self {
            record: record.reindexed(&base_column_titles()),
            applicability: Default::default(),
        }
    }

    pub fn get(&self, target: Target) -> &Applicability {
        &self.applicability[target.index()]
    }

    pub fn set(&mut self, target: Target, value: Applicability) {
        self.applicability[target.index()] = value;
    }

    fn fill(&mut self, value: Applicability) {
        for target in Target::ALL {
            self.set(target, value.clone());
        }
    }
}

/// 適用したルール
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Annotation {
    /// 削除ツール（バージョンが読めなかった場合は None）
    RemovalTool(Option<ToolVersion>),
    Label(&'static str),
    /// 一致するルールなし（マトリクスは未変更）
    Unmatched,
}

/// 1レコードに注記を付ける
///
/// `today` は実行日（前月ラベルの計算に使う）。
pub fn annotate(row: &mut AnnotatedRecord, today: NaiveDate) -> Annotation {
    if row.record.identifier() == REMOVAL_TOOL_IDENTIFIER {
        return annotate_removal_tool(row, today);
    }

    let Some(rule) = LABEL_RULES.iter().find(|r| r.label == row.record.label()) else {
        return Annotation::Unmatched;
    };

    for target in Target::ALL {
        let value = if rule.not_applicable.contains(&target) {
            Applicability::NotApplicable
        } else {
            Applicability::Blank
        };
        row.set(target, value);
    }
    if let Some((target, text)) = rule.note {
        row.set(target, Applicability::Note(text.to_string()));
    }

    Annotation::Label(rule.label)
}

fn annotate_removal_tool(row: &mut AnnotatedRecord, today: NaiveDate) -> Annotation {
    row.fill(Applicability::Blank);
    row.record.set(COL_INDEX, "1");
    row.record.set(COL_PRODUCT, REMOVAL_TOOL_PRODUCT);

    let parsed = parse_tool_version(row.record.get(COL_DESCRIPTION).unwrap_or_default());
    if let Some(version) = &parsed {
        row.record.set(COL_VERSION, version.version.clone());
        row.record.set(COL_COMMENT, superseded_comment(version, today));
    }

    Annotation::RemovalTool(parsed)
}

/// 重複排除済みレコードからマトリクス行を作る
pub fn build_matrix(records: &[NormalizedRecord], today: NaiveDate) -> Vec<AnnotatedRecord> {
    records
        .iter()
        .map(|record| {
            let mut row = AnnotatedRecord::prepare(record);
            match annotate(&mut row, today) {
                Annotation::Unmatched => {
                    tracing::debug!(label = %row.record.label(), "no applicability rule");
                }
                Annotation::RemovalTool(None) => {
                    tracing::warn!(
                        description = %row.record.get(COL_DESCRIPTION).unwrap_or_default(),
                        "removal tool version not found"
                    );
                }
                _ => {}
            }
            row
        })
        .collect()
}
