//! Keyed clip locations.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A keyed storage location holding one clip's per-frame keypoint objects.
///
/// Frame objects live directly under the location as
/// `<location>/<frame-index>.<ext>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct ClipLocation(pub String);

impl ClipLocation {
    pub fn new(location: impl Into<String>) -> Self {
        Self(location.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Listing prefix with exactly one trailing `/`.
    ///
    /// Without the separator, listing clip `1004` would also return the
    /// objects of clip `10041`.
    pub fn prefix(&self) -> String {
        format!("{}/", self.0.trim_end_matches('/'))
    }
}

impl fmt::Display for ClipLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ClipLocation {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ClipLocation {
    fn from(s: String) -> Self {
        Self(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_normalization() {
        assert_eq!(ClipLocation::from("keypoints/1004").prefix(), "keypoints/1004/");
        assert_eq!(ClipLocation::from("keypoints/1004/").prefix(), "keypoints/1004/");
        assert_eq!(ClipLocation::from("keypoints/1004//").prefix(), "keypoints/1004/");
    }

    #[test]
    fn test_transparent_serde() {
        let clip: ClipLocation = serde_json::from_str("\"lookup/keypoints/12\"").unwrap();
        assert_eq!(clip.as_str(), "lookup/keypoints/12");
    }
}
