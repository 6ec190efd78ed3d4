//! Frame key parsing.
//!
//! Frame objects live directly under a clip prefix as
//! `<prefix><frame-index>.<ext>`. Anything nested deeper, and "directory"
//! placeholder keys ending in `/`, are not frames.

/// How a listed key relates to a clip prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameKey {
    /// A frame object with its parsed index.
    Frame { key: String, index: u64 },
    /// A direct child whose name is not `<unsigned-integer>[.ext]`.
    Malformed { key: String },
}

impl FrameKey {
    pub fn key(&self) -> &str {
        match self {
            FrameKey::Frame { key, .. } | FrameKey::Malformed { key } => key,
        }
    }
}

/// Parse the frame index from a file name such as `12.npy`.
pub fn parse_frame_index(name: &str) -> Option<u64> {
    let stem = match name.find('.') {
        Some(pos) => &name[..pos],
        None => name,
    };
    if stem.is_empty() || !stem.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    stem.parse().ok()
}

/// Classify a listed key against a `/`-terminated prefix.
///
/// Returns `None` for keys that are not direct children of the prefix.
pub fn classify_key(prefix: &str, key: &str) -> Option<FrameKey> {
    let name = key.strip_prefix(prefix)?;
    if name.is_empty() || name.contains('/') {
        return None;
    }

    Some(match parse_frame_index(name) {
        Some(index) => FrameKey::Frame {
            key: key.to_string(),
            index,
        },
        None => FrameKey::Malformed {
            key: key.to_string(),
        },
    })
}

/// Classify every listed key, keeping direct children only.
pub fn frame_keys<I, S>(prefix: &str, keys: I) -> Vec<FrameKey>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    keys.into_iter()
        .filter_map(|key| classify_key(prefix, key.as_ref()))
        .collect()
}
