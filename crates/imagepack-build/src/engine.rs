//! イメージ実行エンジンの抽象
//!
//! オーケストレータはこのトレイトだけに依存する。
//! 実際に Docker デーモンと通信する実装は [`crate::docker::DockerEngine`]。

use crate::error::EngineResult;
use crate::output::OutputSink;
use async_trait::async_trait;
use imagepack_core::{BuildJob, Credentials, PushJob};
use tokio_util::sync::CancellationToken;

/// イメージのビルドとプッシュを実行する外部機能
///
/// どちらの操作もキャンセルトークンを受け取る。トークンがキャンセルされたら
/// 実装は可能な限り早く [`crate::EngineError::Cancelled`] を返すこと。
/// 既に確保されたリソース（途中まで作られたレイヤーなど）の回収は保証しない。
#[async_trait]
pub trait ImageEngine: Send + Sync {
    /// `job.image` としてイメージをビルドし、ビルド出力を `sink` に書き出す
    async fn build_image(
        &self,
        job: &BuildJob,
        sink: &mut OutputSink,
        cancel: &CancellationToken,
    ) -> EngineResult<()>;

    /// `job.registry:job.tag` をレジストリにプッシュ
    async fn push_image(
        &self,
        job: &PushJob,
        credentials: &Credentials,
        cancel: &CancellationToken,
    ) -> EngineResult<()>;
}
