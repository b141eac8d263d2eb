//! ビルド/プッシュのオーケストレーション
//!
//! 実行の流れ:
//!
//! ```text
//! Init → BuildingBase → BuildingDependents → PushingDependents → Done
//!   └──────────┴──────────────┴────────────────────┴──→ Failed
//! ```
//!
//! 1. compile イメージを単独でビルド（他の全イメージの前提）
//! 2. 残りのイメージを `COMPILE_IMAGE` ビルド引数付きで並列ビルド
//! 3. compile 以外のイメージを並列プッシュし、結果マニフェストを作る
//!
//! 並列フェーズはそれぞれ独立したキャンセルトークンを持ち、最初のエラーで
//! 同じフェーズの残りのタスクを止める。

use crate::deadline::Deadline;
use crate::engine::ImageEngine;
use crate::error::{EngineError, OrchestrateError, Result};
use crate::group::TaskGroup;
use crate::output::{Console, LabelPalette, OutputSink};
use imagepack_core::{
    BASE_IMAGE_NAME, BuildArg, BuildDefinitionSet, BuildJob, Credentials, PushJob, RunResult,
    naming,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// 依存イメージから compile イメージを参照するためのビルド引数名
pub const BASE_IMAGE_BUILD_ARG: &str = "COMPILE_IMAGE";

/// 1回の実行に必要なパラメータ
#[derive(Debug, Clone, Default)]
pub struct PackageParams {
    pub registry: String,
    pub version: String,
    /// ビルドコンテキストのディレクトリ（全イメージ共通）
    pub context_dir: PathBuf,
    /// ビルドのみ行い、プッシュしない
    pub no_push: bool,
    pub credentials: Credentials,
    /// 実行全体の期限
    pub deadline: Option<Deadline>,
}

/// オーケストレーションの状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Init,
    BuildingBase,
    BuildingDependents,
    PushingDependents,
    Done,
    Failed,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Done | Phase::Failed)
    }
}

pub struct Orchestrator {
    engine: Arc<dyn ImageEngine>,
    console: Console,
}

impl Orchestrator {
    pub fn new(engine: Arc<dyn ImageEngine>, console: Console) -> Self {
        Self { engine, console }
    }

    /// パッケージを構成する全イメージをビルドし、プッシュする
    ///
    /// 返り値はプッシュに成功したイメージの論理名 → 完全なイメージ参照。
    /// compile イメージは含まれない。`no_push` の場合は空。
    #[tracing::instrument(skip_all, fields(registry = %params.registry, version = %params.version))]
    pub async fn run(
        &self,
        definitions: BuildDefinitionSet,
        params: &PackageParams,
    ) -> Result<RunResult> {
        let root = CancellationToken::new();
        let _deadline = params.deadline.map(|deadline| deadline.arm(root.clone()));

        let mut phase = Phase::Init;
        let outcome = self.execute(definitions, params, &root, &mut phase).await;

        match outcome {
            Ok(result) => {
                transition(&mut phase, Phase::Done);
                Ok(result)
            }
            Err(err) => {
                transition(&mut phase, Phase::Failed);
                // 期限より前に保持された実際の失敗はそのまま返す
                match params.deadline {
                    Some(deadline) if root.is_cancelled() && err.is_cancelled() => {
                        warn!(error = %err, "Run aborted by deadline");
                        Err(OrchestrateError::DeadlineExceeded(deadline.timeout()))
                    }
                    _ => Err(err),
                }
            }
        }
    }

    async fn execute(
        &self,
        mut definitions: BuildDefinitionSet,
        params: &PackageParams,
        root: &CancellationToken,
        phase: &mut Phase,
    ) -> Result<RunResult> {
        let palette = LabelPalette::new();

        // compile イメージは他の全イメージのベースになるため必須
        let base = definitions
            .take_base()
            .ok_or(OrchestrateError::MissingBaseImage)?;

        transition(phase, Phase::BuildingBase);
        let base_image = naming::name(&params.registry, &params.version, BASE_IMAGE_NAME);
        let base_job = BuildJob {
            name: BASE_IMAGE_NAME.to_string(),
            dockerfile: base.path,
            image: base_image.clone(),
            context_dir: params.context_dir.clone(),
            build_args: Vec::new(),
        };
        build_one(
            self.engine.as_ref(),
            &self.console,
            &base_job,
            self.console.sink(palette.label(BASE_IMAGE_NAME)),
            root,
        )
        .await?;

        transition(phase, Phase::BuildingDependents);
        let names: Vec<String> = definitions.names().into_iter().map(String::from).collect();
        let build_args = vec![BuildArg::new(BASE_IMAGE_BUILD_ARG, &base_image)];

        let mut builds = TaskGroup::new(root);
        for (name, definition) in definitions.iter() {
            let job = BuildJob {
                name: name.to_string(),
                dockerfile: definition.path.clone(),
                image: naming::name(&params.registry, &params.version, name),
                context_dir: params.context_dir.clone(),
                build_args: build_args.clone(),
            };
            let sink = self.console.sink(palette.label(name));
            let engine = Arc::clone(&self.engine);
            let console = self.console.clone();
            let token = builds.token();

            builds.spawn(async move {
                build_one(engine.as_ref(), &console, &job, sink, &token).await
            });
        }
        builds.wait().await?;

        if params.no_push {
            info!("Skipping push phase");
            return Ok(RunResult::new());
        }

        transition(phase, Phase::PushingDependents);
        let credentials = Arc::new(params.credentials.clone());
        let result = Arc::new(Mutex::new(RunResult::new()));

        let mut pushes = TaskGroup::new(root);
        for name in &names {
            let job = PushJob::new(name, &params.registry, &params.version);
            let engine = Arc::clone(&self.engine);
            let console = self.console.clone();
            let credentials = Arc::clone(&credentials);
            let result = Arc::clone(&result);
            let token = pushes.token();

            pushes.spawn(async move {
                push_one(engine.as_ref(), &console, &job, &credentials, &token).await?;
                result.lock().await.insert(job.name.clone(), job.reference());
                Ok(())
            });
        }
        pushes.wait().await?;

        let result = result.lock().await.clone();
        Ok(result)
    }
}

fn transition(phase: &mut Phase, next: Phase) {
    debug_assert!(!phase.is_terminal(), "transition out of terminal phase");
    info!(from = ?*phase, to = ?next, "Phase transition");
    *phase = next;
}

/// 1イメージをビルド（開始前にキャンセル済みなら何もしない）
async fn build_one(
    engine: &dyn ImageEngine,
    console: &Console,
    job: &BuildJob,
    mut sink: OutputSink,
    cancel: &CancellationToken,
) -> Result<()> {
    let build_error = |source| OrchestrateError::Build {
        image: job.name.clone(),
        source,
    };

    if cancel.is_cancelled() {
        debug!(image = %job.name, "Skipping build, group already cancelled");
        return Err(build_error(EngineError::Cancelled));
    }

    console.line(&format!("Building image: {}", job.image));
    let start = Instant::now();

    let built = engine.build_image(job, &mut sink, cancel).await;
    // 失敗時もエラー表示より先に最後の出力を書き出す
    sink.flush();
    built.map_err(build_error)?;

    let elapsed = format_elapsed(start.elapsed());
    info!(image = %job.image, elapsed = %elapsed, "Built image");
    console.line(&format!("Built {} image in {}", job.image, elapsed));
    Ok(())
}

/// 1イメージをプッシュ（開始前にキャンセル済みなら何もしない）
async fn push_one(
    engine: &dyn ImageEngine,
    console: &Console,
    job: &PushJob,
    credentials: &Credentials,
    cancel: &CancellationToken,
) -> Result<()> {
    let push_error = |source| OrchestrateError::Push {
        image: job.name.clone(),
        source,
    };

    if cancel.is_cancelled() {
        debug!(image = %job.name, "Skipping push, group already cancelled");
        return Err(push_error(EngineError::Cancelled));
    }

    let reference = job.reference();
    console.line(&format!("Pushing image: {}", reference));
    let start = Instant::now();

    engine
        .push_image(job, credentials, cancel)
        .await
        .map_err(push_error)?;

    let elapsed = format_elapsed(start.elapsed());
    info!(image = %reference, elapsed = %elapsed, "Pushed image");
    console.line(&format!("Pushed {} image in {}", reference, elapsed));
    Ok(())
}

/// 経過時間を秒単位に丸めて表示 (`42s`, `3m5s`)
fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs_f64().round() as u64;
    if secs >= 60 {
        format!("{}m{}s", secs / 60, secs % 60)
    } else {
        format!("{}s", secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineResult;
    use async_trait::async_trait;
    use std::io::Write;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// 呼び出し回数を数え、部分行を書いてから失敗するエンジン
    #[derive(Default)]
    struct CountingEngine {
        builds: AtomicUsize,
        pushes: AtomicUsize,
    }

    #[async_trait]
    impl ImageEngine for CountingEngine {
        async fn build_image(
            &self,
            _job: &BuildJob,
            sink: &mut OutputSink,
            _cancel: &CancellationToken,
        ) -> EngineResult<()> {
            self.builds.fetch_add(1, Ordering::SeqCst);
            sink.write_str("Step 2/2 : RUN make");
            Err(EngineError::BuildFailed("make: *** [all] Error 2".to_string()))
        }

        async fn push_image(
            &self,
            _job: &PushJob,
            _credentials: &Credentials,
            _cancel: &CancellationToken,
        ) -> EngineResult<()> {
            self.pushes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<std::sync::Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuf {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    fn build_job(name: &str) -> BuildJob {
        BuildJob {
            name: name.to_string(),
            dockerfile: PathBuf::from(format!("/pkg/{}/Dockerfile", name)),
            image: naming::name("foo", "1", name),
            context_dir: PathBuf::from("/src"),
            build_args: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_cancelled_build_skips_engine() {
        let engine = CountingEngine::default();
        let buf = SharedBuf::default();
        let console = Console::from_writer(buf.clone());
        let token = CancellationToken::new();
        token.cancel();

        let err = build_one(&engine, &console, &build_job("cli"), console.sink("CLI"), &token)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            OrchestrateError::Build { ref image, source: EngineError::Cancelled } if image == "cli"
        ));
        assert!(err.is_cancelled());
        assert_eq!(engine.builds.load(Ordering::SeqCst), 0);
        assert_eq!(buf.contents(), "");
    }

    #[tokio::test]
    async fn test_cancelled_push_skips_engine() {
        let engine = CountingEngine::default();
        let console = Console::from_writer(SharedBuf::default());
        let token = CancellationToken::new();
        token.cancel();

        let job = PushJob::new("web", "foo", "1");
        let err = push_one(&engine, &console, &job, &Credentials::default(), &token)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            OrchestrateError::Push { ref image, source: EngineError::Cancelled } if image == "web"
        ));
        assert_eq!(engine.pushes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failed_build_flushes_partial_output() {
        let engine = CountingEngine::default();
        let buf = SharedBuf::default();
        let console = Console::from_writer(buf.clone());
        let sink = console.sink("APP");

        let result = build_one(
            &engine,
            &console,
            &build_job("app"),
            sink,
            &CancellationToken::new(),
        )
        .await;

        assert!(matches!(result, Err(OrchestrateError::Build { .. })));
        assert_eq!(engine.builds.load(Ordering::SeqCst), 1);
        assert_eq!(
            buf.contents(),
            "Building image: foo:1-app\nAPP\tStep 2/2 : RUN make\n"
        );
    }

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(Duration::from_millis(400)), "0s");
        assert_eq!(format_elapsed(Duration::from_millis(1600)), "2s");
        assert_eq!(format_elapsed(Duration::from_secs(185)), "3m5s");
    }

    #[test]
    fn test_terminal_phases() {
        assert!(Phase::Done.is_terminal());
        assert!(Phase::Failed.is_terminal());
        assert!(!Phase::PushingDependents.is_terminal());
    }
}
