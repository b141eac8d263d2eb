//! イメージプッシュ処理
//!
//! ビルドしたイメージをコンテナレジストリにプッシュします。

use crate::auth;
use crate::error::{EngineError, EngineResult};
use bollard::Docker;
use bollard::models::PushImageInfo;
use futures_util::StreamExt;
use imagepack_core::Credentials;
use tokio_util::sync::CancellationToken;

/// イメージプッシュを実行するハンドラ
pub struct ImagePusher {
    docker: Docker,
}

impl ImagePusher {
    pub fn new(docker: Docker) -> Self {
        Self { docker }
    }

    /// イメージをレジストリにプッシュ
    ///
    /// # Arguments
    /// * `image` - イメージ名（レジストリ込み、タグなし）
    /// * `tag` - イメージタグ
    ///
    /// # Returns
    /// プッシュ成功時は完全なイメージ名を返す
    pub async fn push(
        &self,
        image: &str,
        tag: &str,
        credentials: &Credentials,
        cancel: &CancellationToken,
    ) -> EngineResult<String> {
        let full_image = format!("{}:{}", image, tag);

        validate_tag(tag)?;

        let credentials = auth::docker_credentials(image, credentials);

        #[allow(deprecated)]
        let options = bollard::image::PushImageOptions::<String> {
            tag: tag.to_string(),
        };

        tracing::info!("Pushing image: {}", full_image);

        #[allow(deprecated)]
        let mut stream = self.docker.push_image(image, Some(options), credentials);

        let mut last_status = String::new();
        let mut error_message: Option<String> = None;

        loop {
            let next = tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!("Push cancelled: {}", full_image);
                    return Err(EngineError::Cancelled);
                }
                next = stream.next() => next,
            };

            match next {
                Some(Ok(info)) => {
                    if let Some(err) = info.error {
                        error_message = Some(err);
                    } else {
                        log_progress(&full_image, &info, &mut last_status);
                    }
                }
                Some(Err(e)) => {
                    return Err(EngineError::PushFailed {
                        message: e.to_string(),
                    });
                }
                None => break,
            }
        }

        if let Some(err) = error_message {
            return Err(EngineError::PushFailed { message: err });
        }

        Ok(full_image)
    }
}

/// タグのバリデーション
///
/// Docker タグの制約:
/// - 128文字以下
/// - 英数字、ピリオド、ハイフン、アンダースコアのみ
/// - 先頭はピリオドまたはハイフンではない
pub fn validate_tag(tag: &str) -> EngineResult<()> {
    if tag.is_empty() {
        return Err(EngineError::InvalidTag {
            tag: "(empty)".to_string(),
        });
    }

    if tag.len() > 128 {
        return Err(EngineError::InvalidTag {
            tag: format!("Tag too long ({} characters, max 128)", tag.len()),
        });
    }

    if tag.starts_with('.') || tag.starts_with('-') {
        return Err(EngineError::InvalidTag {
            tag: tag.to_string(),
        });
    }

    if let Some(c) = tag
        .chars()
        .find(|c| !c.is_ascii_alphanumeric() && *c != '.' && *c != '-' && *c != '_')
    {
        return Err(EngineError::InvalidTag {
            tag: format!("Invalid character '{}' in tag: {}", c, tag),
        });
    }

    Ok(())
}

/// プッシュ進捗をログに出す（同じステータスの連続は省略）
fn log_progress(image: &str, info: &PushImageInfo, last_status: &mut String) {
    let Some(status) = &info.status else {
        return;
    };

    match status.as_str() {
        // 準備中・転送中はノイズになるのでスキップ
        "Preparing" | "Waiting" | "Pushing" => {}
        _ => {
            if status != last_status {
                tracing::debug!(image = %image, "{}", status);
                *last_status = status.clone();
            }
        }
    }
}
