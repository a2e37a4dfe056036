use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// ログ初期化（stderr に出力、RUST_LOG があればそちらを優先）
pub fn init_logging(verbose: bool) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(verbose)));

    // 進捗バーと混ざらないよう stderr へ
    let console_layer = fmt::layer()
        .with_target(verbose)
        .with_writer(std::io::stderr);

    // 2回目以降の初期化は無視
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .try_init();
}

fn default_directives(verbose: bool) -> String {
    let level = if verbose { "debug" } else { "warn" };
    format!("patch_report={level},patch_report_common={level},warn")
}
