//! イメージ命名規則
//!
//! ビルド時のイメージ参照とプッシュ時のタグは必ずここから導出する。
//! 同じ関数を通すことで、ビルドした参照とプッシュする参照が常に一致する。

/// バージョンタグ: `<version>-<suffix>`
pub fn tag(version: &str, suffix: &str) -> String {
    format!("{}-{}", version, suffix)
}

/// 完全なイメージ参照: `<registry>:<version>-<suffix>`
pub fn name(registry: &str, version: &str, suffix: &str) -> String {
    format!("{}:{}", registry, tag(version, suffix))
}
