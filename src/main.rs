use anyhow::Context;
use chrono::{Local, NaiveDate};
use clap::Parser;
use dialoguer::Input;
use patch_report::pipeline::{self, CollectOptions, ExportSummary, PatchList};
use patch_report::{cli, config, error, export, logging, source};
use patch_report_common::dates::{parse_cutoff, previous_patch_wednesday, CUTOFF_FORMAT};
use patch_report_common::ProgressSink;
use cli::{Cli, Commands};
use config::Config;
use error::PatchReportError;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);
    let today = Local::now().date_naive();
    // -v のときは詳細ログを stderr に流すので進捗バーは出さない
    let hide_bar = cli.verbose;

    match cli.command {
        Commands::Collect {
            cutoff,
            output,
            screenshot,
            csv_dir,
            offline,
        } => {
            println!("📋 patch-report - カタログ取得\n");
            let config = load_config(cli.config.as_deref())?;
            let cutoff = resolve_cutoff(cutoff, today)?;

            println!("[1/2] カタログ取得中... ({}件, {}以降)", config.sources.len(), cutoff);
            let list = pipeline::run_in_background(
                move |progress: &mut dyn ProgressSink| {
                    let mut source = source::open_source(
                        offline.as_deref(),
                        &config.catalog_url,
                        Duration::from_secs(config.timeout_seconds),
                    )?;
                    let options = CollectOptions {
                        config: &config,
                        cutoff,
                        run_date: today,
                        screenshot,
                        csv_dir: csv_dir.as_deref(),
                    };
                    pipeline::collect(source.as_mut(), &options, progress)
                },
                "Patches collected.",
                hide_bar,
            )
            .await?;
            println!("✔ {}件のパッチを取得\n", list.records.len());

            println!("[2/2] 結果を保存中...");
            list.save(&output)?;
            println!("✔ 結果を保存: {}", output.display());

            println!("\n✅ 取得完了");
        }

        Commands::Export {
            input,
            output,
            date,
        } => {
            println!("📄 patch-report - エクスポート\n");
            let config = load_config(cli.config.as_deref())?;
            let list = PatchList::load(&input)
                .with_context(|| format!("入力JSONを読み込めません: {}", input.display()))?;
            let run_date = match date {
                Some(text) => parse_cutoff(&text).map_err(PatchReportError::from)?,
                None => list.run_date,
            };
            let output_path = resolve_output(output, &config);

            println!("- Excelを生成中... ({}件)", list.records.len());
            let summary = pipeline::run_in_background(
                move |progress: &mut dyn ProgressSink| {
                    pipeline::export(&list.records, run_date, &output_path, progress)
                },
                "Patches spreadsheet created.",
                hide_bar,
            )
            .await?;
            print_summary(&summary);

            println!("\n✅ エクスポート完了");
        }

        Commands::Run {
            cutoff,
            output,
            screenshot,
            csv_dir,
            offline,
        } => {
            println!("🚀 patch-report - 一括処理\n");
            let config = load_config(cli.config.as_deref())?;
            let cutoff = resolve_cutoff(cutoff, today)?;
            let output_path = resolve_output(output, &config);

            println!("- {}件のソースを処理 ({}以降)", config.sources.len(), cutoff);
            let summary = pipeline::run_in_background(
                move |progress: &mut dyn ProgressSink| {
                    let mut source = source::open_source(
                        offline.as_deref(),
                        &config.catalog_url,
                        Duration::from_secs(config.timeout_seconds),
                    )?;
                    let options = CollectOptions {
                        config: &config,
                        cutoff,
                        run_date: today,
                        screenshot,
                        csv_dir: csv_dir.as_deref(),
                    };
                    pipeline::run(source.as_mut(), &options, &output_path, progress)
                },
                "Patches spreadsheet created.",
                hide_bar,
            )
            .await?;
            print_summary(&summary);

            println!("\n✅ 完了");
        }

        Commands::Config { show, init } => {
            if init {
                let config = Config::default();
                let path = match &cli.config {
                    Some(path) => {
                        config.save_to(path)?;
                        path.clone()
                    }
                    None => config.save()?,
                };
                println!("✔ デフォルト設定を書き出しました: {}", path.display());
            }

            if show || !init {
                let config = load_config(cli.config.as_deref())?;
                println!("設定:");
                println!("  カタログURL: {}", config.catalog_url);
                println!("  タイムアウト: {}秒", config.timeout_seconds);
                println!("  出力: {}", config.output.display());
                println!("  スナップショット: {}", config.snapshot_dir.display());
                println!("  フィルタ語: {}件", config.rules.filter_terms.len());
                println!("  ソース:");
                for source in &config.sources {
                    println!("    - {} ({}) [{}]", source.label, source.version, source.query);
                }
            }
        }
    }

    Ok(())
}

/// --config 指定があればそのファイル、なければ既定の場所（なければデフォルト）
fn load_config(path: Option<&Path>) -> error::Result<Config> {
    match path {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
}

/// カットオフ日（省略時は前回の Patch Wednesday をデフォルトにして入力を求める）
fn resolve_cutoff(arg: Option<String>, today: NaiveDate) -> error::Result<NaiveDate> {
    if let Some(text) = arg {
        return Ok(parse_cutoff(&text)?);
    }

    let default = previous_patch_wednesday(today)
        .format(CUTOFF_FORMAT)
        .to_string();
    let input: String = Input::new()
        .with_prompt("前回の Patch Wednesday (YYYY-MM-DD)")
        .default(default)
        .interact_text()
        .map_err(|e| PatchReportError::Config(e.to_string()))?;

    Ok(parse_cutoff(&input)?)
}

fn resolve_output(output: Option<PathBuf>, config: &Config) -> PathBuf {
    let output = output.unwrap_or_else(|| config.output.clone());
    export::output_path_for(&output, Path::new(config::DEFAULT_OUTPUT_NAME))
}

fn print_summary(summary: &ExportSummary) {
    println!(
        "✔ Excel出力: {} (シート: {}, {}行)",
        summary.output.display(),
        summary.sheet_name,
        summary.rows
    );
}
