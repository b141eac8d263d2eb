use colored::Colorize;
use imagepack_build::DockerEngine;

/// Docker に接続（失敗時は対処方法を表示）
pub async fn connect_with_error_handling() -> anyhow::Result<DockerEngine> {
    match DockerEngine::connect().await {
        Ok(engine) => Ok(engine),
        Err(e) => {
            eprintln!();
            eprintln!("{}", "✗ Docker接続エラー".red().bold());
            eprintln!();
            eprintln!("{}", "原因:".yellow());
            eprintln!("  {}", e);
            eprintln!();
            eprintln!("{}", "解決方法:".yellow());
            eprintln!("  • Dockerが起動しているか確認してください");
            eprintln!("  • DOCKER_HOST が正しいソケットを指しているか確認してください");
            eprintln!("  • docker ps コマンドが正常に動作するか確認してください");
            Err(anyhow::Error::new(e).context("Docker接続に失敗しました"))
        }
    }
}
