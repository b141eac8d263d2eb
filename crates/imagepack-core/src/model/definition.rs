use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// ベースイメージ（compile イメージ）の論理名
///
/// 他の全イメージはこのイメージをベースレイヤーとしてビルドされる。
pub const BASE_IMAGE_NAME: &str = "compile";

/// 現行レイアウトのビルド定義ファイル名 (`<name>/Dockerfile`)
pub const DOCKERFILE_NAME: &str = "Dockerfile";

/// 非推奨レイアウトのビルド定義サフィックス (`<name>.dockerfile`)
pub const LEGACY_DOCKERFILE_SUFFIX: &str = ".dockerfile";

/// ビルド定義がどのレイアウトで発見されたか
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefinitionLayout {
    /// `<name>/Dockerfile`
    Current,
    /// `<name>.dockerfile`（非推奨）
    Legacy,
}

/// 1つの論理イメージに対応するビルド定義
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildDefinition {
    pub path: PathBuf,
    pub layout: DefinitionLayout,
}

impl BuildDefinition {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            layout: DefinitionLayout::Current,
        }
    }

    pub fn legacy(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            layout: DefinitionLayout::Legacy,
        }
    }

    pub fn is_legacy(&self) -> bool {
        self.layout == DefinitionLayout::Legacy
    }
}

/// 論理イメージ名 → ビルド定義 のマッピング
///
/// 1回の実行につき1度だけ作成され、オーケストレータがベースイメージの
/// エントリを取り除いた後は読み取り専用として扱われる。
#[derive(Debug, Clone, Default)]
pub struct BuildDefinitionSet {
    definitions: HashMap<String, BuildDefinition>,
}

impl BuildDefinitionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// エントリを追加。同名のエントリが既にあれば上書きし、古い方を返す
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        definition: BuildDefinition,
    ) -> Option<BuildDefinition> {
        self.definitions.insert(name.into(), definition)
    }

    pub fn get(&self, name: &str) -> Option<&BuildDefinition> {
        self.definitions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<BuildDefinition> {
        self.definitions.remove(name)
    }

    /// ベースイメージのエントリを取り出す
    pub fn take_base(&mut self) -> Option<BuildDefinition> {
        self.remove(BASE_IMAGE_NAME)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// 論理名をアルファベット順で返す
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.definitions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &BuildDefinition)> {
        self.definitions.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// 非推奨レイアウトで発見された定義ごとの警告（論理名順）
    pub fn deprecation_notices(&self) -> Vec<DeprecationNotice> {
        let mut notices: Vec<DeprecationNotice> = self
            .definitions
            .iter()
            .filter(|(_, def)| def.is_legacy())
            .map(|(name, def)| DeprecationNotice::new(name, &def.path))
            .collect();
        notices.sort_by(|a, b| a.name.cmp(&b.name));
        notices
    }
}

impl<N, P> FromIterator<(N, P)> for BuildDefinitionSet
where
    N: Into<String>,
    P: Into<PathBuf>,
{
    fn from_iter<I: IntoIterator<Item = (N, P)>>(iter: I) -> Self {
        let mut set = Self::new();
        for (name, path) in iter {
            set.insert(name, BuildDefinition::new(path));
        }
        set
    }
}

/// 非推奨レイアウトの警告
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeprecationNotice {
    pub name: String,
    pub path: PathBuf,
    /// 推奨される移行先 `<dir>/<name>/Dockerfile`
    pub replacement: PathBuf,
}

impl DeprecationNotice {
    pub fn new(name: &str, path: &Path) -> Self {
        let dir = path.parent().unwrap_or_else(|| Path::new(""));
        Self {
            name: name.to_string(),
            path: path.to_path_buf(),
            replacement: dir.join(name).join(DOCKERFILE_NAME),
        }
    }
}

impl fmt::Display for DeprecationNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[DEPRECATED] Dockerfile location {:?} is deprecated. Use {:?} instead.",
            self.path.display().to_string(),
            self.replacement.display().to_string()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_base() {
        let mut set: BuildDefinitionSet = [
            ("compile", "pkg/compile/Dockerfile"),
            ("cli", "pkg/cli/Dockerfile"),
        ]
        .into_iter()
        .collect();

        let base = set.take_base().unwrap();
        assert_eq!(base.path, PathBuf::from("pkg/compile/Dockerfile"));
        assert!(!set.contains(BASE_IMAGE_NAME));
        assert_eq!(set.names(), vec!["cli"]);
        assert!(set.take_base().is_none());
    }

    #[test]
    fn test_insert_overwrites() {
        let mut set = BuildDefinitionSet::new();
        assert!(set.insert("app", BuildDefinition::new("a/app/Dockerfile")).is_none());
        let old = set.insert("app", BuildDefinition::legacy("b/app.dockerfile"));
        assert_eq!(old, Some(BuildDefinition::new("a/app/Dockerfile")));
        assert_eq!(set.len(), 1);
        assert!(set.get("app").unwrap().is_legacy());
    }

    #[test]
    fn test_deprecation_notices_only_for_legacy() {
        let mut set = BuildDefinitionSet::new();
        set.insert("web", BuildDefinition::legacy("pkg/web.dockerfile"));
        set.insert("cli", BuildDefinition::new("pkg/cli/Dockerfile"));
        set.insert("app", BuildDefinition::legacy("pkg/app.dockerfile"));

        let notices = set.deprecation_notices();
        assert_eq!(notices.len(), 2);
        assert_eq!(notices[0].name, "app");
        assert_eq!(notices[0].replacement, PathBuf::from("pkg/app/Dockerfile"));
        assert_eq!(notices[1].name, "web");
    }

    #[test]
    fn test_deprecation_notice_display() {
        let notice = DeprecationNotice::new("php", Path::new("pkg/php.dockerfile"));
        assert_eq!(
            notice.to_string(),
            "[DEPRECATED] Dockerfile location \"pkg/php.dockerfile\" is deprecated. Use \"pkg/php/Dockerfile\" instead."
        );
    }
}
