use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "patch-report")]
#[command(about = "Microsoft Update Catalog パッチ一覧・適用対象表生成ツール", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// 設定ファイル（デフォルト: ~/.config/patch-report/config.json）
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// カタログを取得してパッチ一覧JSONを出力
    Collect {
        /// 前回の Patch Wednesday (YYYY-MM-DD)。省略時は対話入力
        #[arg(short, long)]
        cutoff: Option<String>,

        /// 出力JSONファイル
        #[arg(short, long, default_value = "patches.json")]
        output: PathBuf,

        /// 各ソースのスナップショットを保存
        #[arg(long)]
        screenshot: bool,

        /// tracked/status のCSVを出力するディレクトリ
        #[arg(long)]
        csv_dir: Option<PathBuf>,

        /// 保存済みHTMLから読み込む（ネットワークを使わない）
        #[arg(long)]
        offline: Option<PathBuf>,
    },

    /// パッチ一覧JSONからExcelを生成
    Export {
        /// 入力JSONファイル
        #[arg(required = true)]
        input: PathBuf,

        /// 出力Excelファイル/ディレクトリ
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// 実行日 (YYYY-MM-DD)。シート名と駆除ツールのコメントに使う
        #[arg(short, long)]
        date: Option<String>,
    },

    /// 取得からExcel生成まで一括処理
    Run {
        /// 前回の Patch Wednesday (YYYY-MM-DD)。省略時は対話入力
        #[arg(short, long)]
        cutoff: Option<String>,

        /// 出力Excelファイル/ディレクトリ
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// 各ソースのスナップショットを保存
        #[arg(long)]
        screenshot: bool,

        /// tracked/status のCSVを出力するディレクトリ
        #[arg(long)]
        csv_dir: Option<PathBuf>,

        /// 保存済みHTMLから読み込む（ネットワークを使わない）
        #[arg(long)]
        offline: Option<PathBuf>,
    },

    /// 設定を表示・初期化
    Config {
        /// 現在の設定を表示
        #[arg(long)]
        show: bool,

        /// デフォルト設定をファイルに書き出す
        #[arg(long)]
        init: bool,
    },
}
