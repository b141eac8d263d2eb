//! レジストリのエンドポイントから AWS リージョンを決定

use crate::error::{EcrError, Result};

/// エンドポイントから認識するリージョン
///
/// 部分文字列で照合するため、他のエントリを含むエントリは置かないこと。
pub const KNOWN_REGIONS: &[&str] = &[
    "us-east-1",
    "us-east-2",
    "us-west-1",
    "us-west-2",
    "ca-central-1",
    "eu-west-1",
    "eu-west-2",
    "eu-west-3",
    "eu-central-1",
    "eu-north-1",
    "ap-northeast-1",
    "ap-northeast-2",
    "ap-northeast-3",
    "ap-southeast-1",
    "ap-southeast-2",
    "ap-south-1",
    "sa-east-1",
];

/// `endpoint` に含まれるリージョンを探す
pub fn extract_region(endpoint: &str) -> Result<&'static str> {
    KNOWN_REGIONS
        .iter()
        .copied()
        .find(|region| endpoint.contains(region))
        .ok_or_else(|| EcrError::RegionNotFound(endpoint.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_region() {
        assert_eq!(
            extract_region("example.ap-southeast-2.aws.amazon.com").unwrap(),
            "ap-southeast-2"
        );
        assert_eq!(
            extract_region("123456789012.dkr.ecr.us-east-1.amazonaws.com/site").unwrap(),
            "us-east-1"
        );
    }

    #[test]
    fn test_unknown_region() {
        let err = extract_region("example.nope.aws.amazon.com").unwrap_err();
        assert!(matches!(err, EcrError::RegionNotFound(ref url) if url == "example.nope.aws.amazon.com"));
    }

    #[test]
    fn test_regions_do_not_overlap() {
        for a in KNOWN_REGIONS {
            for b in KNOWN_REGIONS {
                if a != b {
                    assert!(!a.contains(b), "{} contains {}", a, b);
                }
            }
        }
    }
}
