mod docker;
mod package;

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "imagepack", version)]
#[command(
    about = "compile イメージをビルドし、それに依存するイメージを並列にビルド・プッシュする",
    long_about = None
)]
pub struct Cli {
    /// イメージのタグに使うバージョン
    #[arg(value_name = "VERSION")]
    pub release: String,

    /// ビルド定義（Dockerfile）を探すディレクトリ
    #[arg(long, env = "IMAGEPACK_DIRECTORY", default_value = ".imagepack")]
    pub directory: PathBuf,

    /// ビルドコンテキストのディレクトリ
    #[arg(long, env = "IMAGEPACK_CONTEXT", default_value = ".")]
    pub context: PathBuf,

    /// プッシュ先のレジストリ（リポジトリまで含む）
    #[arg(long, env = "IMAGEPACK_REGISTRY")]
    pub registry: String,

    /// レジストリのユーザー名（ECR の場合は AWS アクセスキー）
    #[arg(long, env = "DOCKER_USERNAME", default_value = "")]
    pub docker_username: String,

    /// レジストリのパスワード（ECR の場合は AWS シークレットキー）
    #[arg(long, env = "DOCKER_PASSWORD", default_value = "", hide_env_values = true)]
    pub docker_password: String,

    /// ビルドのみ行い、プッシュしない
    #[arg(long)]
    pub no_push: bool,

    /// デバッグ出力を有効化
    #[arg(long)]
    pub debug: bool,

    /// 結果のマニフェスト(JSON)の書き出し先
    #[arg(long)]
    pub manifest: Option<PathBuf>,

    /// 実行全体のタイムアウト（秒）
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // ログは stderr（stdout はマニフェスト出力に使う）
    let default_level = if cli.debug { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    package::run(cli).await
}
