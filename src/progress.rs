//! 進捗表示
//!
//! ワーカー（spawn_blocking）は `ChannelProgress` に進捗を送るだけ。
//! 表示側は 100ms ごとにチャネルをポーリングして進捗バーを更新し、
//! 100% を受け取ったら終了する。

use indicatif::{ProgressBar, ProgressStyle};
use patch_report_common::{ProgressSink, ProgressUpdate};
use std::time::Duration;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

/// ポーリング間隔
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// チャネルに進捗を送る（受信側がいなくても失敗しない）
pub struct ChannelProgress {
    tx: UnboundedSender<ProgressUpdate>,
}

impl ChannelProgress {
    pub fn new(tx: UnboundedSender<ProgressUpdate>) -> Self {
        Self { tx }
    }
}

impl ProgressSink for ChannelProgress {
    fn report(&mut self, percent: u8, status: &str) {
        let _ = self.tx.send(ProgressUpdate {
            percent,
            status: status.to_string(),
        });
    }
}

/// 0〜100 の進捗バー
pub fn new_bar(hidden: bool) -> ProgressBar {
    if hidden {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(100);
    bar.set_style(
        ProgressStyle::with_template("{bar:40.cyan/blue} {pos:>3}% {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    bar
}

/// 進捗を監視してバーに反映する
///
/// 100% を受け取るか送信側が全て閉じたら戻り、最後に受け取った進捗を返す。
pub async fn watch(
    mut rx: UnboundedReceiver<ProgressUpdate>,
    bar: ProgressBar,
) -> Option<ProgressUpdate> {
    let mut ticker = tokio::time::interval(POLL_INTERVAL);
    let mut last: Option<ProgressUpdate> = None;

    loop {
        ticker.tick().await;
        loop {
            match rx.try_recv() {
                Ok(update) => {
                    bar.set_position(update.percent as u64);
                    bar.set_message(update.status.clone());
                    let done = update.percent >= 100;
                    last = Some(update);
                    if done {
                        bar.finish();
                        return last;
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    bar.abandon();
                    return last;
                }
            }
        }
    }
}
