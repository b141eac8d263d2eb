use crate::error::{EngineError, EngineResult};
use flate2::Compression;
use flate2::write::GzEncoder;
use ignore::WalkBuilder;
use std::io::Write;
use std::path::Path;
use tar::Builder;

/// コンテキストから除外するパスを列挙するファイル（docker build と同じ名前）
pub const IGNORE_FILE: &str = ".dockerignore";

/// ビルドコンテキスト内でビルド定義を置くエントリ名
///
/// コンテキスト直下の Dockerfile と衝突しない名前にしている。
pub const DOCKERFILE_ENTRY: &str = ".imagepack.Dockerfile";

pub struct ContextBuilder;

impl ContextBuilder {
    /// ビルドコンテキストをtar.gzアーカイブとして作成
    ///
    /// `dockerfile_path` は [`DOCKERFILE_ENTRY`] としてアーカイブに追加される。
    pub fn create_context(context_path: &Path, dockerfile_path: &Path) -> EngineResult<Vec<u8>> {
        if !context_path.is_dir() {
            return Err(EngineError::ContextNotFound(context_path.to_path_buf()));
        }
        if !dockerfile_path.is_file() {
            return Err(EngineError::DockerfileNotFound(dockerfile_path.to_path_buf()));
        }

        tracing::debug!("Creating build context from: {}", context_path.display());

        let dockerfile_content = std::fs::read(dockerfile_path)?;

        let mut archive_data = Vec::new();
        {
            let encoder = GzEncoder::new(&mut archive_data, Compression::default());
            let mut tar = Builder::new(encoder);
            // シンボリックリンクはリンクのまま格納（docker build と同じ挙動）
            tar.follow_symlinks(false);

            Self::append_context(&mut tar, context_path)?;

            let mut header = tar::Header::new_gnu();
            header.set_path(DOCKERFILE_ENTRY).map_err(|e| {
                EngineError::InvalidConfig(format!("Failed to set Dockerfile path: {}", e))
            })?;
            header.set_size(dockerfile_content.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();

            tar.append(&header, &dockerfile_content[..])?;

            tar.into_inner()?.finish()?;
        }

        tracing::debug!("Build context created: {} bytes", archive_data.len());

        Self::check_context_size(archive_data.len());

        Ok(archive_data)
    }

    /// `.dockerignore` に従ってコンテキストディレクトリをアーカイブに追加
    ///
    /// git 関連の除外や隠しファイルの除外は行わない。
    fn append_context<W: Write>(tar: &mut Builder<W>, context_path: &Path) -> EngineResult<()> {
        let walk = WalkBuilder::new(context_path)
            .add_custom_ignore_filename(IGNORE_FILE)
            .ignore(false)
            .parents(false)
            .git_global(false)
            .git_ignore(false)
            .git_exclude(false)
            .hidden(false)
            .build();

        for entry in walk {
            let entry = entry?;
            let Ok(relative) = entry.path().strip_prefix(context_path) else {
                continue;
            };
            if relative.as_os_str().is_empty() {
                continue;
            }

            match entry.file_type() {
                Some(file_type) if file_type.is_dir() => tar.append_dir(relative, entry.path())?,
                _ => tar.append_path_with_name(entry.path(), relative)?,
            }
        }

        Ok(())
    }

    /// コンテキストサイズのチェックと警告
    fn check_context_size(size: usize) {
        const MAX_CONTEXT_SIZE: usize = 500 * 1024 * 1024; // 500MB

        if size > MAX_CONTEXT_SIZE {
            tracing::warn!(
                "Build context is large ({}MB); consider excluding paths via .dockerignore",
                size / 1024 / 1024
            );
        }
    }
}
