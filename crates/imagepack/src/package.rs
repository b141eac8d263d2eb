use crate::Cli;
use crate::docker;
use anyhow::Context;
use colored::Colorize;
use imagepack_build::{Console, Deadline, Orchestrator, PackageParams};
use imagepack_core::{BuildDefinitionSet, Credentials, RunResult};
use imagepack_ecr::AwsTokenExchange;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    // 期限は認証情報の取得や Docker 接続も含めた実行全体にかかる
    let deadline = cli.timeout.map(|secs| Deadline::after(Duration::from_secs(secs)));

    let definitions = imagepack_core::locate_build_definitions(&cli.directory)
        .with_context(|| format!("ビルド定義の探索に失敗しました: {}", cli.directory.display()))?;

    for notice in definitions.deprecation_notices() {
        tracing::warn!(image = %notice.name, "Legacy build definition layout");
        eprintln!("{}", notice.to_string().yellow());
    }

    if cli.debug {
        print_definitions(&definitions);
    }

    let credentials = within(
        deadline.as_ref(),
        imagepack_ecr::resolve_credentials(
            &AwsTokenExchange,
            &cli.registry,
            Credentials::new(cli.docker_username, cli.docker_password),
        ),
    )
    .await?
    .context("レジストリ認証情報の取得に失敗しました")?;

    let engine = within(deadline.as_ref(), docker::connect_with_error_handling()).await??;
    let orchestrator = Orchestrator::new(Arc::new(engine), Console::stdout());

    let params = PackageParams {
        registry: cli.registry,
        version: cli.release,
        context_dir: cli.context,
        no_push: cli.no_push,
        credentials,
        deadline,
    };

    let result = match orchestrator.run(definitions, &params).await {
        Ok(result) => result,
        Err(e) => {
            eprintln!();
            eprintln!("{} {}", "✗".red().bold(), e.user_message());
            return Err(e.into());
        }
    };

    emit_manifest(&result, cli.manifest.as_deref())
}

/// 期限があれば `fut` をその範囲で実行
async fn within<F: Future>(deadline: Option<&Deadline>, fut: F) -> anyhow::Result<F::Output> {
    match deadline {
        Some(deadline) => Ok(deadline.limit(fut).await?),
        None => Ok(fut.await),
    }
}

fn print_definitions(definitions: &BuildDefinitionSet) {
    eprintln!("{}", "Found build definitions:".bold());
    for name in definitions.names() {
        if let Some(definition) = definitions.get(name) {
            eprintln!("  {} {}", name.cyan(), definition.path.display());
        }
    }
}

fn emit_manifest(result: &RunResult, path: Option<&std::path::Path>) -> anyhow::Result<()> {
    let json = result.to_json_pretty()?;
    println!("{}", json);

    if let Some(path) = path {
        std::fs::write(path, format!("{}\n", json))
            .with_context(|| format!("マニフェストの書き込みに失敗しました: {}", path.display()))?;
        tracing::info!(path = %path.display(), "Wrote manifest");
    }
    Ok(())
}
