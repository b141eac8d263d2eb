//! レジストリ認証処理
//!
//! 呼び出し元から渡された認証情報を Bollard の DockerCredentials に変換します。

use bollard::auth::DockerCredentials;
use imagepack_core::Credentials;

/// イメージ名からレジストリを抽出
///
/// # Examples
/// - `ghcr.io/org/app` -> `ghcr.io`
/// - `myuser/app` -> `docker.io`
/// - `123456.dkr.ecr.region.amazonaws.com/app` -> `123456.dkr.ecr.region.amazonaws.com`
/// - `localhost:5000/app` -> `localhost:5000`
pub fn extract_registry(image: &str) -> &str {
    if let Some((first, _)) = image.split_once('/') {
        // `.` か `:` を含むものをレジストリとみなす（ghcr.io, localhost:5000 など）
        if first.contains('.') || first.contains(':') {
            return first;
        }
    }

    // デフォルトは Docker Hub
    "docker.io"
}

/// プッシュ用の認証情報を作成
///
/// 認証情報が空の場合は None（デーモン側の設定に任せる）。
pub fn docker_credentials(image: &str, credentials: &Credentials) -> Option<DockerCredentials> {
    if credentials.is_empty() {
        tracing::debug!("No credentials supplied for {}", image);
        return None;
    }

    Some(DockerCredentials {
        username: Some(credentials.username.clone()),
        password: Some(credentials.secret.clone()),
        serveraddress: Some(extract_registry(image).to_string()),
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_registry_ghcr() {
        assert_eq!(extract_registry("ghcr.io/org/app"), "ghcr.io");
    }

    #[test]
    fn test_extract_registry_docker_hub() {
        assert_eq!(extract_registry("myuser/app"), "docker.io");
        assert_eq!(extract_registry("nginx"), "docker.io");
        assert_eq!(extract_registry("foo"), "docker.io");
    }

    #[test]
    fn test_extract_registry_ecr() {
        assert_eq!(
            extract_registry("123456789.dkr.ecr.ap-southeast-2.amazonaws.com/app"),
            "123456789.dkr.ecr.ap-southeast-2.amazonaws.com"
        );
    }

    #[test]
    fn test_extract_registry_localhost() {
        assert_eq!(extract_registry("localhost:5000/myapp"), "localhost:5000");
    }

    #[test]
    fn test_docker_credentials() {
        let creds = Credentials::new("AWS", "token");
        let docker = docker_credentials("123.dkr.ecr.us-east-1.amazonaws.com/site", &creds).unwrap();
        assert_eq!(docker.username.as_deref(), Some("AWS"));
        assert_eq!(docker.password.as_deref(), Some("token"));
        assert_eq!(
            docker.serveraddress.as_deref(),
            Some("123.dkr.ecr.us-east-1.amazonaws.com")
        );
    }

    #[test]
    fn test_empty_credentials_are_omitted() {
        assert!(docker_credentials("ghcr.io/org/app", &Credentials::default()).is_none());
    }
}
