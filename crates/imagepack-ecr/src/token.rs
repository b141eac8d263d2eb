//! ECR 認可トークンの取得

use crate::error::{EcrError, Result};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_ecr::config::Region;
use aws_sdk_ecr::error::DisplayErrorContext;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use imagepack_core::Credentials;

/// 静的な認証情報を ECR 認可トークンに交換する
#[async_trait]
pub trait TokenExchange: Send + Sync {
    /// base64 エンコードされた `user:password` のトークンをそのまま返す
    async fn authorization_token(&self, region: &str, credentials: &Credentials)
    -> Result<String>;
}

/// AWS の `GetAuthorizationToken` を呼ぶ実装
///
/// 静的な認証情報をアクセスキー/シークレットキーとして使う。
/// 環境の AWS プロファイルは読まない。
#[derive(Debug, Default, Clone, Copy)]
pub struct AwsTokenExchange;

#[async_trait]
impl TokenExchange for AwsTokenExchange {
    async fn authorization_token(
        &self,
        region: &str,
        credentials: &Credentials,
    ) -> Result<String> {
        let provider = aws_sdk_ecr::config::Credentials::new(
            credentials.username.clone(),
            credentials.secret.clone(),
            None,
            None,
            "imagepack-static",
        );

        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .credentials_provider(provider)
            .load()
            .await;
        let client = aws_sdk_ecr::Client::new(&config);

        let output = client
            .get_authorization_token()
            .send()
            .await
            .map_err(|e| EcrError::Authorization(DisplayErrorContext(&e).to_string()))?;

        let data = output
            .authorization_data()
            .first()
            .ok_or_else(|| EcrError::Authorization("no authorization data returned".to_string()))?;

        data.authorization_token()
            .map(str::to_string)
            .ok_or_else(|| EcrError::Authorization("no authorization token returned".to_string()))
    }
}

/// base64 の `user:password` トークンをデコードしてパスワード部分を返す
///
/// 区切りは最初の `:` のみ（パスワード自体に `:` が含まれうる）。
pub fn decode_authorization_token(token: &str) -> Result<String> {
    let decoded = STANDARD
        .decode(token)
        .map_err(|e| EcrError::MalformedToken(e.to_string()))?;
    let decoded =
        String::from_utf8(decoded).map_err(|e| EcrError::MalformedToken(e.to_string()))?;

    decoded
        .split_once(':')
        .map(|(_, password)| password.to_string())
        .ok_or_else(|| EcrError::MalformedToken("auth data contains invalid payload".to_string()))
}
