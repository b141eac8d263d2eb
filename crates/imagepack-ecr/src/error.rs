//! ECR 認証情報のエラー型

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EcrError {
    #[error("region not found for registry: {0}")]
    RegionNotFound(String),

    #[error("ECR authorization failed: {0}")]
    Authorization(String),

    #[error("malformed ECR authorization token: {0}")]
    MalformedToken(String),
}

pub type Result<T> = std::result::Result<T, EcrError>;
