//! ビルド定義の自動発見
//!
//! パッケージディレクトリを再帰的に走査し、論理イメージ名ごとの
//! Dockerfile を見つけます。
//!
//! 対応するレイアウト:
//! - `<dir>/<name>/Dockerfile`（現行）
//! - `<dir>/<name>.dockerfile`（非推奨）
//!
//! 同じ論理名が複数見つかった場合は後から訪問した方が残る。
//! 訪問順はファイルシステム依存のため、どちらが残るかは保証されない。

use crate::error::{CoreError, Result};
use crate::model::{
    BuildDefinition, BuildDefinitionSet, DOCKERFILE_NAME, LEGACY_DOCKERFILE_SUFFIX,
};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// パッケージディレクトリからビルド定義を発見
#[tracing::instrument(skip(root), fields(root = %root.display()))]
pub fn locate_build_definitions(root: &Path) -> Result<BuildDefinitionSet> {
    debug!("Starting build definition discovery");

    // ルート自体が存在しない・読めない場合はエラー
    let metadata = std::fs::metadata(root).map_err(|e| CoreError::Discovery {
        path: root.to_path_buf(),
        source: e,
    })?;
    if !metadata.is_dir() {
        return Err(CoreError::Discovery {
            path: root.to_path_buf(),
            source: std::io::Error::new(
                std::io::ErrorKind::NotADirectory,
                "package directory is not a directory",
            ),
        });
    }

    let mut definitions = BuildDefinitionSet::new();
    let mut visited = HashSet::new();
    visit_dir(root, &mut definitions, &mut visited)?;

    info!(
        definition_count = definitions.len(),
        "Discovered build definitions"
    );
    Ok(definitions)
}

/// ファイル名から論理イメージ名とビルド定義を判定
fn classify(path: &Path) -> Option<(String, BuildDefinition)> {
    let file_name = path.file_name()?.to_str()?;

    if file_name == DOCKERFILE_NAME {
        // 親ディレクトリ名をイメージ名として使う
        let parent = path.parent()?.file_name()?.to_str()?;
        return Some((parent.to_string(), BuildDefinition::new(path)));
    }

    // 後方互換: <name>.dockerfile
    let name = file_name.strip_suffix(LEGACY_DOCKERFILE_SUFFIX)?;
    if name.is_empty() {
        return None;
    }
    Some((name.to_string(), BuildDefinition::legacy(path)))
}

/// ディレクトリを再帰的に走査
fn visit_dir(
    dir: &Path,
    definitions: &mut BuildDefinitionSet,
    visited: &mut HashSet<PathBuf>,
) -> Result<()> {
    // 正規化されたパスを取得してループを検出
    let canonical_dir = dir.canonicalize().map_err(|e| CoreError::Discovery {
        path: dir.to_path_buf(),
        source: e,
    })?;

    if !visited.insert(canonical_dir.clone()) {
        warn!(dir = %canonical_dir.display(), "Symlink loop detected, skipping");
        return Ok(());
    }

    let entries = std::fs::read_dir(dir).map_err(|e| CoreError::Discovery {
        path: dir.to_path_buf(),
        source: e,
    })?;

    for entry in entries {
        let entry = entry.map_err(|e| CoreError::Discovery {
            path: dir.to_path_buf(),
            source: e,
        })?;
        let path = entry.path();

        if path.is_dir() {
            visit_dir(&path, definitions, visited)?;
            continue;
        }

        let Some((name, definition)) = classify(&path) else {
            continue;
        };

        debug!(name = %name, path = %path.display(), "Found build definition");
        if let Some(previous) = definitions.insert(name.clone(), definition) {
            debug!(
                name = %name,
                previous = %previous.path.display(),
                "Duplicate build definition, keeping the later one"
            );
        }
    }

    Ok(())
}
