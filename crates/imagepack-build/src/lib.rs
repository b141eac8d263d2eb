//! imagepack のビルド/プッシュ実行
//!
//! compile ベースイメージのビルド、依存イメージの並列ビルド、
//! 並列プッシュまでのオーケストレーションと、Docker デーモンを使った
//! イメージエンジンを提供します。

pub mod auth;
pub mod builder;
pub mod context;
pub mod deadline;
pub mod docker;
pub mod engine;
pub mod error;
pub mod group;
pub mod orchestrator;
pub mod output;
pub mod pusher;

pub use builder::ImageBuilder;
pub use context::ContextBuilder;
pub use deadline::Deadline;
pub use docker::DockerEngine;
pub use engine::ImageEngine;
pub use error::{EngineError, EngineResult, OrchestrateError, Result};
pub use group::TaskGroup;
pub use orchestrator::{BASE_IMAGE_BUILD_ARG, Orchestrator, PackageParams, Phase};
pub use output::{Console, LabelPalette, OutputSink};
pub use pusher::{ImagePusher, validate_tag};
