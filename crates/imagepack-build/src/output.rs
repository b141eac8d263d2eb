//! コンソール出力
//!
//! 並列ビルドの出力が混ざっても読めるように、イメージごとに
//! 大文字の論理名でプレフィックスした行単位で書き出す。

use colored::{Color, Colorize};
use std::collections::HashMap;
use std::io::Write;
use std::sync::{Arc, Mutex, MutexGuard};

/// ラベルに割り当てる色（先に登場した名前から順に割り当て、一巡したら再利用）
const LABEL_COLORS: [Color; 12] = [
    Color::Cyan,
    Color::Magenta,
    Color::Yellow,
    Color::Green,
    Color::Blue,
    Color::Red,
    Color::BrightCyan,
    Color::BrightMagenta,
    Color::BrightYellow,
    Color::BrightGreen,
    Color::BrightBlue,
    Color::BrightRed,
];

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// 複数タスクから共有される出力先
#[derive(Clone)]
pub struct Console {
    writer: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl Console {
    pub fn stdout() -> Self {
        Self::from_writer(std::io::stdout())
    }

    pub fn from_writer(writer: impl Write + Send + 'static) -> Self {
        Self {
            writer: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    /// 進捗などの1行メッセージ
    pub fn line(&self, message: &str) {
        let mut writer = lock(&self.writer);
        writeln!(writer, "{}", message).ok();
        writer.flush().ok();
    }

    /// `label` でプレフィックスされた出力シンクを作成
    pub fn sink(&self, label: impl Into<String>) -> OutputSink {
        OutputSink {
            prefix: format!("{}\t", label.into()),
            console: self.clone(),
            pending: String::new(),
        }
    }
}

/// 1イメージ分の行プレフィックス付き出力シンク
///
/// 改行で終わらない断片はバッファし、行が揃った時点で書き出す。
/// drop 時に残りを書き出す。
pub struct OutputSink {
    prefix: String,
    console: Console,
    pending: String,
}

impl OutputSink {
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn write_str(&mut self, chunk: &str) {
        self.pending.push_str(chunk);

        let Some(last_newline) = self.pending.rfind('\n') else {
            return;
        };
        let rest = self.pending.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.pending, rest);

        let mut writer = lock(&self.console.writer);
        for line in complete.lines() {
            writeln!(writer, "{}{}", self.prefix, line).ok();
        }
        writer.flush().ok();
    }

    /// バッファに残った改行なしの断片を書き出す
    pub fn flush(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let line = std::mem::take(&mut self.pending);
        let mut writer = lock(&self.console.writer);
        writeln!(writer, "{}{}", self.prefix, line).ok();
        writer.flush().ok();
    }
}

impl Drop for OutputSink {
    fn drop(&mut self) {
        self.flush();
    }
}

/// 論理名ごとに安定した色ラベルを割り当てるレジストリ
///
/// 1回の実行ごとに作成し、明示的に受け渡す。
#[derive(Debug, Default)]
pub struct LabelPalette {
    assigned: Mutex<HashMap<String, Color>>,
}

impl LabelPalette {
    pub fn new() -> Self {
        Self::default()
    }

    /// 論理名に割り当てられた色
    pub fn color(&self, name: &str) -> Color {
        let mut assigned = lock(&self.assigned);
        let next = LABEL_COLORS[assigned.len() % LABEL_COLORS.len()];
        *assigned.entry(name.to_string()).or_insert(next)
    }

    /// 大文字化して色付けしたラベル（NO_COLOR 設定時は色なし）
    pub fn label(&self, name: &str) -> String {
        let color = self.color(name);
        name.to_uppercase().color(color).to_string()
    }
}
