use async_trait::async_trait;
use imagepack_build::{Console, EngineError, EngineResult, ImageEngine, OutputSink};
use imagepack_core::{BuildDefinitionSet, BuildJob, Credentials, PushJob};
use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// 呼び出しを記録するだけのエンジン
///
/// `fail_*` に入った名前は失敗し、`hang_*` に入った名前はキャンセルされるまで戻らない。
/// `slow_build` に入った名前はキャンセルを無視して指定時間待ってから成功する。
#[derive(Default)]
pub struct RecordingEngine {
    pub builds: Mutex<Vec<BuildJob>>,
    pub pushes: Mutex<Vec<(PushJob, Credentials)>>,
    pub cancelled: Mutex<Vec<String>>,
    fail_builds: HashSet<String>,
    fail_pushes: HashSet<String>,
    hang_builds: HashSet<String>,
    hang_pushes: HashSet<String>,
    slow_builds: HashMap<String, Duration>,
}

#[allow(dead_code)]
impl RecordingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_build(mut self, name: &str) -> Self {
        self.fail_builds.insert(name.to_string());
        self
    }

    pub fn fail_push(mut self, name: &str) -> Self {
        self.fail_pushes.insert(name.to_string());
        self
    }

    pub fn hang_build(mut self, name: &str) -> Self {
        self.hang_builds.insert(name.to_string());
        self
    }

    pub fn hang_push(mut self, name: &str) -> Self {
        self.hang_pushes.insert(name.to_string());
        self
    }

    pub fn slow_build(mut self, name: &str, duration: Duration) -> Self {
        self.slow_builds.insert(name.to_string(), duration);
        self
    }

    pub fn built_names(&self) -> Vec<String> {
        self.builds
            .lock()
            .unwrap()
            .iter()
            .map(|job| job.name.clone())
            .collect()
    }

    pub fn pushed_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .pushes
            .lock()
            .unwrap()
            .iter()
            .map(|(job, _)| job.name.clone())
            .collect();
        names.sort();
        names
    }

    pub fn cancelled_names(&self) -> Vec<String> {
        self.cancelled.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageEngine for RecordingEngine {
    async fn build_image(
        &self,
        job: &BuildJob,
        sink: &mut OutputSink,
        cancel: &CancellationToken,
    ) -> EngineResult<()> {
        self.builds.lock().unwrap().push(job.clone());
        sink.write_str(&format!("Step 1/1 : FROM scratch ({})\n", job.name));

        if let Some(duration) = self.slow_builds.get(&job.name) {
            tokio::time::sleep(*duration).await;
            return Ok(());
        }
        if self.hang_builds.contains(&job.name) {
            cancel.cancelled().await;
            self.cancelled.lock().unwrap().push(job.name.clone());
            return Err(EngineError::Cancelled);
        }
        if self.fail_builds.contains(&job.name) {
            return Err(EngineError::BuildFailed(format!("{} exploded", job.name)));
        }
        Ok(())
    }

    async fn push_image(
        &self,
        job: &PushJob,
        credentials: &Credentials,
        cancel: &CancellationToken,
    ) -> EngineResult<()> {
        self.pushes
            .lock()
            .unwrap()
            .push((job.clone(), credentials.clone()));

        if self.hang_pushes.contains(&job.name) {
            cancel.cancelled().await;
            self.cancelled.lock().unwrap().push(job.name.clone());
            return Err(EngineError::Cancelled);
        }
        if self.fail_pushes.contains(&job.name) {
            return Err(EngineError::PushFailed {
                message: "denied: requested access to the resource is denied".to_string(),
            });
        }
        Ok(())
    }
}

/// テスト用に出力を溜めておく Writer
#[derive(Clone, Default)]
pub struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[allow(dead_code)]
impl SharedBuf {
    pub fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }

    pub fn console(&self) -> Console {
        Console::from_writer(self.clone())
    }
}

/// `<name>` → `/pkg/<name>/Dockerfile` の定義集合
pub fn definitions(names: &[&str]) -> BuildDefinitionSet {
    names
        .iter()
        .map(|name| (*name, format!("/pkg/{}/Dockerfile", name)))
        .collect()
}
