use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// イメージのビルド・プッシュを実行するエンジン側のエラー
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Dockerfile not found: {0}")]
    DockerfileNotFound(PathBuf),

    #[error("Build context directory not found: {0}")]
    ContextNotFound(PathBuf),

    #[error("Docker connection error: {0}")]
    DockerConnection(#[from] bollard::errors::Error),

    #[error("Build failed: {0}")]
    BuildFailed(String),

    #[error("Push failed: {message}")]
    PushFailed { message: String },

    #[error("Invalid tag: {tag}")]
    InvalidTag { tag: String },

    #[error("Invalid build configuration: {0}")]
    InvalidConfig(String),

    #[error("Build context walk failed: {0}")]
    ContextWalk(#[from] ignore::Error),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, EngineError::Cancelled)
    }
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// オーケストレーション全体のエラー
///
/// どのエラーも実行全体にとって致命的で、リトライはしない。
/// 並列フェーズでは最初に観測されたエラーだけが返る。
#[derive(Debug, Error)]
pub enum OrchestrateError {
    #[error("\"compile\" is a required dockerfile")]
    MissingBaseImage,

    #[error("failed to build image \"{image}\": {source}")]
    Build {
        image: String,
        #[source]
        source: EngineError,
    },

    #[error("failed to push image \"{image}\": {source}")]
    Push {
        image: String,
        #[source]
        source: EngineError,
    },

    #[error("deadline of {0:?} exceeded")]
    DeadlineExceeded(Duration),
}

impl OrchestrateError {
    /// ビルド/プッシュがキャンセルによって中断されたか
    pub fn is_cancelled(&self) -> bool {
        match self {
            OrchestrateError::Build { source, .. } | OrchestrateError::Push { source, .. } => {
                source.is_cancelled()
            }
            _ => false,
        }
    }

    /// ユーザー向けの分かりやすいエラーメッセージ
    pub fn user_message(&self) -> String {
        match self {
            OrchestrateError::MissingBaseImage => "compile イメージのビルド定義が見つかりません\n\
                 \n\
                 解決方法:\n\
                 1. パッケージディレクトリに compile/Dockerfile を作成してください\n\
                 2. --directory でパッケージディレクトリを確認してください"
                .to_string(),
            OrchestrateError::Build { image, source } => {
                format!(
                    "イメージ '{}' のビルドに失敗しました: {}\n\
                     \n\
                     Dockerfileの内容を確認してください。",
                    image, source
                )
            }
            OrchestrateError::Push { image, source } => {
                format!(
                    "イメージ '{}' のプッシュに失敗しました: {}\n\
                     \n\
                     レジストリの認証情報を確認してください。",
                    image, source
                )
            }
            _ => format!("{}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, OrchestrateError>;
