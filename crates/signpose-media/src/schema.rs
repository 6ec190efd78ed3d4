//! Skeleton schemas: keypoint count, link topology and colors.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{MediaError, MediaResult};

/// RGB color.
pub type Rgb = [u8; 3];

/// Number of keypoints in the display convention (COCO-WholeBody plus neck).
pub const WHOLEBODY_OPENPOSE_KEYPOINTS: usize = 134;

/// Number of leading links drawn as body segments.
pub const BODY_LINK_COUNT: usize = 17;

/// OpenPose body limbs in display-convention indices.
pub const BODY_LINKS: [[usize; 2]; 17] = [
    [1, 2],   // neck to right shoulder
    [1, 5],   // neck to left shoulder
    [2, 3],   // right upper arm
    [3, 4],   // right forearm
    [5, 6],   // left upper arm
    [6, 7],   // left forearm
    [1, 8],   // neck to right hip
    [8, 9],   // right thigh
    [9, 10],  // right shin
    [1, 11],  // neck to left hip
    [11, 12], // left thigh
    [12, 13], // left shin
    [1, 0],   // neck to nose
    [0, 14],  // nose to right eye
    [14, 16], // right eye to right ear
    [0, 15],  // nose to left eye
    [15, 17], // left eye to left ear
];

/// OpenPose body palette; entry `i` colors body keypoint `i` and body link `i`.
pub const BODY_COLORS: [Rgb; 18] = [
    [255, 0, 0],
    [255, 85, 0],
    [255, 170, 0],
    [255, 255, 0],
    [170, 255, 0],
    [85, 255, 0],
    [0, 255, 0],
    [0, 255, 85],
    [0, 255, 170],
    [0, 255, 255],
    [0, 170, 255],
    [0, 85, 255],
    [0, 0, 255],
    [85, 0, 255],
    [170, 0, 255],
    [255, 0, 255],
    [255, 0, 170],
    [255, 0, 85],
];

const RIGHT_ANKLE: usize = 10;
const LEFT_ANKLE: usize = 13;
/// Left foot keypoints (big toe, small toe, heel).
const LEFT_FOOT: [usize; 3] = [18, 19, 20];
/// Right foot keypoints (big toe, small toe, heel).
const RIGHT_FOOT: [usize; 3] = [21, 22, 23];
const FACE_START: usize = 24;
const FACE_END: usize = 91;
const LEFT_HAND_ROOT: usize = 92;
const RIGHT_HAND_ROOT: usize = 113;
const HAND_KEYPOINTS: usize = 21;

/// Hand links relative to the hand root (wrist).
const HAND_LINKS: [[usize; 2]; 20] = [
    [0, 1],
    [1, 2],
    [2, 3],
    [3, 4],
    [0, 5],
    [5, 6],
    [6, 7],
    [7, 8],
    [0, 9],
    [9, 10],
    [10, 11],
    [11, 12],
    [0, 13],
    [13, 14],
    [14, 15],
    [15, 16],
    [0, 17],
    [17, 18],
    [18, 19],
    [19, 20],
];

const WHITE: Rgb = [255, 255, 255];
const BLUE: Rgb = [0, 0, 255];

/// Skeleton description used by the renderer.
///
/// Immutable once constructed; every constructor validates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkeletonSchema {
    pub name: String,
    pub num_keypoints: usize,
    /// Pairs of keypoint indices
    pub links: Vec<[usize; 2]>,
    /// One entry per link; `None` means the link is never drawn
    pub link_colors: Vec<Option<Rgb>>,
    /// One entry per keypoint; `None` means the keypoint is never drawn
    pub keypoint_colors: Vec<Option<Rgb>>,
    #[serde(default)]
    pub keypoint_weights: Option<Vec<f32>>,
}

impl SkeletonSchema {
    /// Build and validate a schema.
    pub fn new(
        name: impl Into<String>,
        num_keypoints: usize,
        links: Vec<[usize; 2]>,
        link_colors: Vec<Option<Rgb>>,
        keypoint_colors: Vec<Option<Rgb>>,
        keypoint_weights: Option<Vec<f32>>,
    ) -> MediaResult<Self> {
        let schema = Self {
            name: name.into(),
            num_keypoints,
            links,
            link_colors,
            keypoint_colors,
            keypoint_weights,
        };
        schema.validate()?;
        Ok(schema)
    }

    /// Parse a schema from JSON. Colors are `[r, g, b]` or `null`.
    pub fn from_json_str(json: &str) -> MediaResult<Self> {
        let schema: SkeletonSchema = serde_json::from_str(json)
            .map_err(|e| MediaError::invalid_schema(format!("malformed schema JSON: {}", e)))?;
        schema.validate()?;
        Ok(schema)
    }

    /// Load a schema from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> MediaResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            MediaError::invalid_schema(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&json)
    }

    /// Check the structural invariants.
    pub fn validate(&self) -> MediaResult<()> {
        if self.num_keypoints == 0 {
            return Err(MediaError::invalid_schema(format!(
                "{}: schema has no keypoints",
                self.name
            )));
        }
        if self.link_colors.len() != self.links.len() {
            return Err(MediaError::invalid_schema(format!(
                "{}: {} link colors for {} links",
                self.name,
                self.link_colors.len(),
                self.links.len()
            )));
        }
        if self.keypoint_colors.len() != self.num_keypoints {
            return Err(MediaError::invalid_schema(format!(
                "{}: {} keypoint colors for {} keypoints",
                self.name,
                self.keypoint_colors.len(),
                self.num_keypoints
            )));
        }
        if let Some(weights) = &self.keypoint_weights {
            if weights.len() != self.num_keypoints {
                return Err(MediaError::invalid_schema(format!(
                    "{}: {} keypoint weights for {} keypoints",
                    self.name,
                    weights.len(),
                    self.num_keypoints
                )));
            }
        }
        if let Some((i, link)) = self
            .links
            .iter()
            .enumerate()
            .find(|(_, [a, b])| *a >= self.num_keypoints || *b >= self.num_keypoints)
        {
            return Err(MediaError::invalid_schema(format!(
                "{}: link {} {:?} references a keypoint outside 0..{}",
                self.name, i, link, self.num_keypoints
            )));
        }
        Ok(())
    }

    /// Ensure a pose with `num_keypoints` points can be drawn with this schema.
    pub fn check_keypoint_count(&self, num_keypoints: usize) -> MediaResult<()> {
        if num_keypoints != self.num_keypoints {
            return Err(MediaError::invalid_schema(format!(
                "{} expects {} keypoints, pose has {}",
                self.name, self.num_keypoints, num_keypoints
            )));
        }
        Ok(())
    }

    pub fn num_links(&self) -> usize {
        self.links.len()
    }

    /// OpenPose-style whole body skeleton over the 134-point display convention.
    ///
    /// Links are the 17 body limbs, then 6 foot links, then 20 links per hand
    /// (left, right).
    pub fn coco_wholebody_openpose() -> Self {
        let mut links: Vec<[usize; 2]> = BODY_LINKS.to_vec();
        let mut link_colors: Vec<Option<Rgb>> =
            BODY_COLORS[..BODY_LINK_COUNT].iter().map(|c| Some(*c)).collect();

        for (ankle, foot) in [(LEFT_ANKLE, LEFT_FOOT), (RIGHT_ANKLE, RIGHT_FOOT)] {
            for toe in foot {
                links.push([ankle, toe]);
                link_colors.push(Some(BODY_COLORS[ankle]));
            }
        }

        let hand_colors = hand_palette();
        for root in [LEFT_HAND_ROOT, RIGHT_HAND_ROOT] {
            for (link, color) in HAND_LINKS.iter().zip(hand_colors.iter()) {
                links.push([root + link[0], root + link[1]]);
                link_colors.push(Some(*color));
            }
        }

        let mut keypoint_colors: Vec<Option<Rgb>> =
            vec![None; WHOLEBODY_OPENPOSE_KEYPOINTS];
        for (i, color) in BODY_COLORS.iter().enumerate() {
            keypoint_colors[i] = Some(*color);
        }
        for (ankle, foot) in [(LEFT_ANKLE, LEFT_FOOT), (RIGHT_ANKLE, RIGHT_FOOT)] {
            for toe in foot {
                keypoint_colors[toe] = Some(BODY_COLORS[ankle]);
            }
        }
        for color in &mut keypoint_colors[FACE_START..=FACE_END] {
            *color = Some(WHITE);
        }
        for root in [LEFT_HAND_ROOT, RIGHT_HAND_ROOT] {
            for color in &mut keypoint_colors[root..root + HAND_KEYPOINTS] {
                *color = Some(BLUE);
            }
        }

        Self {
            name: "coco_wholebody_openpose".to_string(),
            num_keypoints: WHOLEBODY_OPENPOSE_KEYPOINTS,
            links,
            link_colors,
            keypoint_colors,
            keypoint_weights: None,
        }
    }
}

/// Rainbow palette for the hand links: hue `i / 20`, full saturation and value.
fn hand_palette() -> Vec<Rgb> {
    (0..HAND_LINKS.len())
        .map(|i| hsv_to_rgb(i as f32 / HAND_LINKS.len() as f32, 1.0, 1.0))
        .collect()
}

/// Convert HSV (each in [0, 1]) to 8-bit RGB.
fn hsv_to_rgb(h: f32, s: f32, v: f32) -> Rgb {
    let h6 = (h * 6.0).rem_euclid(6.0);
    let sector = h6.floor() as u32;
    let f = h6 - sector as f32;
    let p = v * (1.0 - s);
    let q = v * (1.0 - s * f);
    let t = v * (1.0 - s * (1.0 - f));
    let (r, g, b) = match sector {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    };
    [
        (r * 255.0) as u8,
        (g * 255.0) as u8,
        (b * 255.0) as u8,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_schema_is_valid() {
        let schema = SkeletonSchema::coco_wholebody_openpose();
        assert!(schema.validate().is_ok());
        assert_eq!(schema.num_keypoints, 134);
        assert_eq!(schema.num_links(), 17 + 6 + 40);
        assert_eq!(schema.keypoint_colors[17], Some([255, 0, 85]));
        assert_eq!(schema.keypoint_colors[50], Some(WHITE));
        assert_eq!(schema.keypoint_colors[133], Some(BLUE));
        assert_eq!(schema.links[17], [13, 18]);
        assert_eq!(schema.links[23], [92, 93]);
        assert_eq!(schema.links[62], [132, 133]);
    }

    #[test]
    fn test_hsv_to_rgb() {
        assert_eq!(hsv_to_rgb(0.0, 1.0, 1.0), [255, 0, 0]);
        assert_eq!(hsv_to_rgb(1.0 / 3.0, 1.0, 1.0)[1], 255);
        assert_eq!(hsv_to_rgb(0.0, 0.0, 1.0), [255, 255, 255]);
    }

    #[test]
    fn test_json_schema_with_null_colors() {
        let json = r#"{
            "name": "toy",
            "num_keypoints": 3,
            "links": [[0, 1], [1, 2]],
            "link_colors": [[255, 0, 0], null],
            "keypoint_colors": [[0, 255, 0], null, [0, 0, 255]]
        }"#;
        let schema = SkeletonSchema::from_json_str(json).unwrap();
        assert_eq!(schema.link_colors[1], None);
        assert!(schema.keypoint_weights.is_none());
    }

    #[test]
    fn test_invalid_schemas_are_rejected() {
        let out_of_range = SkeletonSchema::new(
            "bad",
            2,
            vec![[0, 2]],
            vec![Some([1, 2, 3])],
            vec![None, None],
            None,
        );
        assert!(matches!(out_of_range, Err(MediaError::InvalidSchema(_))));

        let color_mismatch =
            SkeletonSchema::new("bad", 2, vec![[0, 1]], vec![], vec![None, None], None);
        assert!(color_mismatch.is_err());

        let weight_mismatch = SkeletonSchema::new(
            "bad",
            2,
            vec![],
            vec![],
            vec![None, None],
            Some(vec![1.0]),
        );
        assert!(weight_mismatch.is_err());
    }

    #[test]
    fn test_check_keypoint_count() {
        let schema = SkeletonSchema::coco_wholebody_openpose();
        assert!(schema.check_keypoint_count(134).is_ok());
        assert!(schema.check_keypoint_count(133).is_err());
    }
}
