//! モデル定義
//!
//! imagepack で使用されるデータモデルを定義します。
//! 各モデルは機能ごとにモジュールに分離されています。

mod credentials;
mod definition;
mod job;
mod manifest;

// Re-exports
pub use credentials::*;
pub use definition::*;
pub use job::*;
pub use manifest::*;
