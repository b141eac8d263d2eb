use crate::context::DOCKERFILE_ENTRY;
use crate::error::{EngineError, EngineResult};
use crate::output::OutputSink;
use bollard::Docker;
use futures_util::stream::StreamExt;
use imagepack_core::BuildArg;
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;

pub struct ImageBuilder {
    docker: Docker,
}

impl ImageBuilder {
    pub fn new(docker: Docker) -> Self {
        Self { docker }
    }

    /// イメージをビルド
    ///
    /// `context_data` は [`crate::ContextBuilder`] で作成した tar.gz アーカイブ。
    pub async fn build_image(
        &self,
        context_data: Vec<u8>,
        tag: &str,
        build_args: &[BuildArg],
        sink: &mut OutputSink,
        cancel: &CancellationToken,
    ) -> EngineResult<()> {
        tracing::info!("Building image: {}", tag);

        let build_args: HashMap<String, String> = build_args
            .iter()
            .map(|arg| (arg.name.clone(), arg.value.clone()))
            .collect();

        // compile イメージはローカルにしか存在しないため pull はしない
        #[allow(deprecated)]
        let options = bollard::image::BuildImageOptions {
            dockerfile: DOCKERFILE_ENTRY.to_string(),
            t: tag.to_string(),
            buildargs: build_args,
            rm: true,      // 中間コンテナを削除
            forcerm: true, // ビルド失敗時も中間コンテナを削除
            ..Default::default()
        };

        tracing::debug!("Build options: {:?}", options);

        use bytes::Bytes;
        use http_body_util::{Either, Full};
        let body = Full::new(Bytes::from(context_data));
        let mut stream = self
            .docker
            .build_image(options, None, Some(Either::Left(body)));

        loop {
            let next = tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!("Build cancelled: {}", tag);
                    return Err(EngineError::Cancelled);
                }
                next = stream.next() => next,
            };

            match next {
                Some(Ok(output)) => Self::handle_build_output(output, sink)?,
                Some(Err(e)) => return Err(EngineError::DockerConnection(e)),
                None => break,
            }
        }

        sink.flush();
        tracing::info!("Successfully built: {}", tag);
        Ok(())
    }

    /// ビルド出力の処理
    fn handle_build_output(
        output: bollard::models::BuildInfo,
        sink: &mut OutputSink,
    ) -> EngineResult<()> {
        if let Some(stream) = output.stream {
            // ビルドステップの出力
            sink.write_str(&stream);
        }

        if let Some(error) = output.error {
            return Err(EngineError::BuildFailed(error));
        }

        if let Some(error_detail) = output.error_detail {
            let error_msg = error_detail
                .message
                .unwrap_or_else(|| "Unknown build error".to_string());
            return Err(EngineError::BuildFailed(error_msg));
        }

        if let Some(status) = output.status {
            // ステータスメッセージ（pull 等）
            sink.write_str(&status);
            sink.write_str("\n");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ContextBuilder;
    use crate::output::Console;
    use std::fs;
    use tempfile::tempdir;

    #[tokio::test]
    #[ignore] // Docker接続が必要なため、通常のテストではスキップ
    async fn test_build_simple_image() {
        let docker = Docker::connect_with_local_defaults().unwrap();
        let builder = ImageBuilder::new(docker.clone());

        let temp_dir = tempdir().unwrap();
        let dockerfile = temp_dir.path().join("Dockerfile");
        fs::write(&dockerfile, "ARG BASE=alpine:latest\nFROM ${BASE}\nCMD echo 'test'").unwrap();

        let context_data = ContextBuilder::create_context(temp_dir.path(), &dockerfile).unwrap();
        let mut sink = Console::stdout().sink("TEST");

        let result = builder
            .build_image(
                context_data,
                "imagepack-test:latest",
                &[BuildArg::new("BASE", "alpine:latest")],
                &mut sink,
                &CancellationToken::new(),
            )
            .await;

        assert!(result.is_ok());

        // クリーンアップ
        docker
            .remove_image(
                "imagepack-test:latest",
                None::<bollard::query_parameters::RemoveImageOptions>,
                None,
            )
            .await
            .ok();
    }
}
