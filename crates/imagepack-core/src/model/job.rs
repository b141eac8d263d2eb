use crate::naming;
use std::path::PathBuf;

/// ビルド引数（名前と値のペア）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildArg {
    pub name: String,
    pub value: String,
}

impl BuildArg {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// 1イメージ分のビルドジョブ
///
/// 作成後は変更せず、1つのビルドタスクだけが消費する。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildJob {
    /// 論理イメージ名
    pub name: String,
    /// ビルド定義（Dockerfile）のパス
    pub dockerfile: PathBuf,
    /// ビルド後に付与するイメージ参照 (`registry:version-name`)
    pub image: String,
    /// ビルドコンテキストのディレクトリ
    pub context_dir: PathBuf,
    pub build_args: Vec<BuildArg>,
}

impl BuildJob {
    pub fn build_arg(&self, name: &str) -> Option<&str> {
        self.build_args
            .iter()
            .find(|arg| arg.name == name)
            .map(|arg| arg.value.as_str())
    }
}

/// 1イメージ分のプッシュジョブ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushJob {
    pub name: String,
    pub registry: String,
    pub tag: String,
}

impl PushJob {
    pub fn new(name: &str, registry: &str, version: &str) -> Self {
        Self {
            name: name.to_string(),
            registry: registry.to_string(),
            tag: naming::tag(version, name),
        }
    }

    /// プッシュ対象の完全なイメージ参照
    pub fn reference(&self) -> String {
        format!("{}:{}", self.registry, self.tag)
    }
}
