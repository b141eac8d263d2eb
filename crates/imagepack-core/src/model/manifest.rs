use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 実行結果: 論理イメージ名 → プッシュ済みの完全なイメージ参照
///
/// ビルドとプッシュの両方に成功したイメージだけが含まれる。
/// デプロイ工程が読むマニフェストとしてそのまま JSON 化できる。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunResult {
    #[serde(rename = "image")]
    pub images: BTreeMap<String, String>,
}

impl RunResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, reference: impl Into<String>) {
        self.images.insert(name.into(), reference.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.images.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
