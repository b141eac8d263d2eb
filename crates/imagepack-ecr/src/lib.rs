//! AWS ECR 向けの認証情報アップグレード
//!
//! ECR は `docker push` に静的な IAM 認証情報を受け付けない。
//! プッシュ先が ECR の場合は、ビルドやプッシュを始める前に
//! 静的な認証情報を短期間有効な認可トークンに交換する。

pub mod error;
pub mod region;
pub mod token;

pub use error::{EcrError, Result};
pub use region::extract_region;
pub use token::{AwsTokenExchange, TokenExchange, decode_authorization_token};

use imagepack_core::Credentials;

/// ECR のエンドポイントを識別する部分文字列
pub const MANAGED_REGISTRY_MARKER: &str = ".ecr.";

/// 認可トークンと組み合わせて使うユーザー名
pub const USERNAME: &str = "AWS";

pub fn is_managed_registry(endpoint: &str) -> bool {
    endpoint.contains(MANAGED_REGISTRY_MARKER)
}

/// 静的な認証情報を ECR のプッシュ用認証情報に交換
pub async fn upgrade_credentials(
    exchange: &dyn TokenExchange,
    endpoint: &str,
    credentials: &Credentials,
) -> Result<Credentials> {
    let region = extract_region(endpoint)?;
    tracing::debug!(region, "Requesting ECR authorization token");

    let token = exchange.authorization_token(region, credentials).await?;
    let password = decode_authorization_token(&token)?;

    Ok(Credentials::new(USERNAME, password))
}

/// `endpoint` へのプッシュに使う認証情報
///
/// ECR の場合は交換後の認証情報、それ以外はそのまま返す。
pub async fn resolve_credentials(
    exchange: &dyn TokenExchange,
    endpoint: &str,
    credentials: Credentials,
) -> Result<Credentials> {
    if !is_managed_registry(endpoint) {
        return Ok(credentials);
    }

    tracing::info!("Upgrading credentials for ECR registry {}", endpoint);
    upgrade_credentials(exchange, endpoint, &credentials).await
}
