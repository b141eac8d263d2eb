//! 実行全体の期限
//!
//! 期限は呼び出しの開始時に1度だけ決め、認証情報の取得から
//! ビルド/プッシュまでの全ての外部呼び出しで共有する。

use crate::error::{OrchestrateError, Result};
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    timeout: Duration,
    at: Instant,
}

impl Deadline {
    /// 現在時刻から `timeout` 後に期限切れになる
    pub fn after(timeout: Duration) -> Self {
        Self {
            timeout,
            at: Instant::now() + timeout,
        }
    }

    /// 指定されたタイムアウト（エラー表示用）
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn remaining(&self) -> Duration {
        self.at.saturating_duration_since(Instant::now())
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.at
    }

    /// 期限までに `fut` が終わらなければ drop して `DeadlineExceeded` を返す
    pub async fn limit<F: Future>(&self, fut: F) -> Result<F::Output> {
        tokio::time::timeout_at(self.at, fut)
            .await
            .map_err(|_| OrchestrateError::DeadlineExceeded(self.timeout))
    }

    /// 期限が来たら `token` をキャンセルするタイマーを起動
    pub(crate) fn arm(&self, token: CancellationToken) -> DeadlineGuard {
        let at = self.at;
        let timeout = self.timeout;
        DeadlineGuard(tokio::spawn(async move {
            tokio::time::sleep_until(at).await;
            tracing::warn!(?timeout, "Deadline reached, cancelling in-flight work");
            token.cancel();
        }))
    }
}

/// drop でタイマーを解除
pub(crate) struct DeadlineGuard(JoinHandle<()>);

impl Drop for DeadlineGuard {
    fn drop(&mut self) {
        self.0.abort();
    }
}
