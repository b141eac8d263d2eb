//! imagepack core
//!
//! パッケージを構成するイメージ群のデータモデル、イメージ命名規則、
//! ビルド定義（Dockerfile）の自動発見を提供します。

pub mod discovery;
pub mod error;
pub mod model;
pub mod naming;

pub use discovery::locate_build_definitions;
pub use error::{CoreError, Result};
pub use model::*;
