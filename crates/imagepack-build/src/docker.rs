//! Docker デーモンを使った [`ImageEngine`] 実装

use crate::builder::ImageBuilder;
use crate::context::ContextBuilder;
use crate::engine::ImageEngine;
use crate::error::{EngineError, EngineResult};
use crate::output::OutputSink;
use crate::pusher::ImagePusher;
use async_trait::async_trait;
use bollard::Docker;
use imagepack_core::{BuildJob, Credentials, PushJob};
use tokio_util::sync::CancellationToken;

pub struct DockerEngine {
    builder: ImageBuilder,
    pusher: ImagePusher,
}

impl DockerEngine {
    pub fn new(docker: Docker) -> Self {
        Self {
            builder: ImageBuilder::new(docker.clone()),
            pusher: ImagePusher::new(docker),
        }
    }

    /// ローカルの Docker に接続し、疎通確認をしてから返す
    ///
    /// `DOCKER_HOST` などの標準的な環境変数に従う。
    pub async fn connect() -> EngineResult<Self> {
        let docker = Docker::connect_with_local_defaults()?;
        docker.ping().await?;
        tracing::debug!("Connected to Docker daemon");
        Ok(Self::new(docker))
    }
}

#[async_trait]
impl ImageEngine for DockerEngine {
    async fn build_image(
        &self,
        job: &BuildJob,
        sink: &mut OutputSink,
        cancel: &CancellationToken,
    ) -> EngineResult<()> {
        if cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }

        // アーカイブ作成はブロッキングI/Oなので専用スレッドで行う
        let context_dir = job.context_dir.clone();
        let dockerfile = job.dockerfile.clone();
        let context_data = tokio::task::spawn_blocking(move || {
            ContextBuilder::create_context(&context_dir, &dockerfile)
        })
        .await
        .map_err(|e| EngineError::BuildFailed(format!("Build context task failed: {}", e)))??;

        self.builder
            .build_image(context_data, &job.image, &job.build_args, sink, cancel)
            .await
    }

    async fn push_image(
        &self,
        job: &PushJob,
        credentials: &Credentials,
        cancel: &CancellationToken,
    ) -> EngineResult<()> {
        if cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }

        let pushed = self
            .pusher
            .push(&job.registry, &job.tag, credentials, cancel)
            .await?;
        tracing::debug!("Pushed {}", pushed);
        Ok(())
    }
}
