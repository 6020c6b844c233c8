// Copyright 2026 the Easel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Filter types and their parameters.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::state::ControlModelConfig;

/// The closed set of image filters the processing backend understands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterType {
    /// Canny edge detection.
    Canny,
    /// Mosaic colour map.
    ColorMap,
    /// Content shuffle.
    ContentShuffle,
    /// Depth Anything depth estimation.
    DepthAnything,
    /// HED soft edges.
    Hed,
    /// Line art extraction.
    Lineart,
    /// Anime-style line art extraction.
    LineartAnime,
    /// MediaPipe face landmarks.
    MediapipeFace,
    /// M-LSD straight lines.
    Mlsd,
    /// Normal map estimation.
    NormalBae,
    /// PiDiNet edges.
    Pidi,
    /// DW openpose skeletons.
    DwOpenpose,
}

impl FilterType {
    /// Every filter type.
    pub const ALL: [Self; 12] = [
        Self::Canny,
        Self::ColorMap,
        Self::ContentShuffle,
        Self::DepthAnything,
        Self::Hed,
        Self::Lineart,
        Self::LineartAnime,
        Self::MediapipeFace,
        Self::Mlsd,
        Self::NormalBae,
        Self::Pidi,
        Self::DwOpenpose,
    ];

    /// The backend's name for this filter.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Canny => "canny_image_processor",
            Self::ColorMap => "color_map_image_processor",
            Self::ContentShuffle => "content_shuffle_image_processor",
            Self::DepthAnything => "depth_anything_image_processor",
            Self::Hed => "hed_image_processor",
            Self::Lineart => "lineart_image_processor",
            Self::LineartAnime => "lineart_anime_image_processor",
            Self::MediapipeFace => "mediapipe_face_processor",
            Self::Mlsd => "mlsd_image_processor",
            Self::NormalBae => "normalbae_image_processor",
            Self::Pidi => "pidi_image_processor",
            Self::DwOpenpose => "dw_openpose_image_processor",
        }
    }

    /// Looks a filter up by its backend name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name() == name)
    }

    /// Default parameters for this filter.
    #[must_use]
    pub fn build_defaults(self) -> FilterConfig {
        match self {
            Self::Canny => FilterConfig::Canny {
                low_threshold: 100,
                high_threshold: 200,
            },
            Self::ColorMap => FilterConfig::ColorMap { tile_size: 64 },
            Self::ContentShuffle => FilterConfig::ContentShuffle { scale_factor: 256 },
            Self::DepthAnything => FilterConfig::DepthAnything {
                model_size: DepthAnythingModelSize::SmallV2,
            },
            Self::Hed => FilterConfig::Hed { scribble: false },
            Self::Lineart => FilterConfig::Lineart { coarse: false },
            Self::LineartAnime => FilterConfig::LineartAnime,
            Self::MediapipeFace => FilterConfig::MediapipeFace {
                max_faces: 1,
                min_confidence: 0.5,
            },
            Self::Mlsd => FilterConfig::Mlsd {
                thr_v: 0.1,
                thr_d: 0.1,
            },
            Self::NormalBae => FilterConfig::NormalBae,
            Self::Pidi => FilterConfig::Pidi {
                quantize_edges: false,
                scribble: false,
            },
            Self::DwOpenpose => FilterConfig::DwOpenpose {
                draw_body: true,
                draw_face: false,
                draw_hands: false,
            },
        }
    }

    /// The filter a control model asks for, falling back to canny when the
    /// model names none or names a filter that no longer exists.
    #[must_use]
    pub fn preferred_for(model: &ControlModelConfig) -> Self {
        model
            .default_preprocessor
            .as_deref()
            .and_then(Self::from_name)
            .unwrap_or(Self::Canny)
    }
}

impl fmt::Display for FilterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Model size for depth estimation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepthAnythingModelSize {
    /// Large v1.
    Large,
    /// Base v1.
    Base,
    /// Small v1.
    Small,
    /// Small v2.
    SmallV2,
}

/// A filter together with its parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FilterConfig {
    /// Canny edge detection.
    Canny {
        /// Lower hysteresis threshold.
        low_threshold: u8,
        /// Upper hysteresis threshold.
        high_threshold: u8,
    },
    /// Mosaic colour map.
    ColorMap {
        /// Tile edge in pixels.
        tile_size: u32,
    },
    /// Content shuffle.
    ContentShuffle {
        /// Shuffle scale.
        scale_factor: u32,
    },
    /// Depth estimation.
    DepthAnything {
        /// Model size.
        model_size: DepthAnythingModelSize,
    },
    /// HED soft edges.
    Hed {
        /// Produce scribble-style output.
        scribble: bool,
    },
    /// Line art.
    Lineart {
        /// Use the coarse model.
        coarse: bool,
    },
    /// Anime line art.
    LineartAnime,
    /// Face landmarks.
    MediapipeFace {
        /// Maximum faces to detect.
        max_faces: u32,
        /// Minimum detection confidence.
        min_confidence: f32,
    },
    /// Straight lines.
    Mlsd {
        /// Value threshold.
        thr_v: f32,
        /// Distance threshold.
        thr_d: f32,
    },
    /// Normal map.
    NormalBae,
    /// PiDiNet edges.
    Pidi {
        /// Quantize edge strength.
        quantize_edges: bool,
        /// Produce scribble-style output.
        scribble: bool,
    },
    /// Pose skeletons.
    DwOpenpose {
        /// Draw body keypoints.
        draw_body: bool,
        /// Draw face keypoints.
        draw_face: bool,
        /// Draw hand keypoints.
        draw_hands: bool,
    },
}

impl FilterConfig {
    /// The filter this config parameterizes.
    #[must_use]
    pub fn filter_type(&self) -> FilterType {
        match self {
            Self::Canny { .. } => FilterType::Canny,
            Self::ColorMap { .. } => FilterType::ColorMap,
            Self::ContentShuffle { .. } => FilterType::ContentShuffle,
            Self::DepthAnything { .. } => FilterType::DepthAnything,
            Self::Hed { .. } => FilterType::Hed,
            Self::Lineart { .. } => FilterType::Lineart,
            Self::LineartAnime => FilterType::LineartAnime,
            Self::MediapipeFace { .. } => FilterType::MediapipeFace,
            Self::Mlsd { .. } => FilterType::Mlsd,
            Self::NormalBae => FilterType::NormalBae,
            Self::Pidi { .. } => FilterType::Pidi,
            Self::DwOpenpose { .. } => FilterType::DwOpenpose,
        }
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        FilterType::Canny.build_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::BaseModel;

    fn model(preprocessor: Option<&str>) -> ControlModelConfig {
        ControlModelConfig {
            key: "cn".into(),
            base: BaseModel::Sdxl,
            default_preprocessor: preprocessor.map(str::to_owned),
        }
    }

    #[test]
    fn names_round_trip() {
        for t in FilterType::ALL {
            assert_eq!(FilterType::from_name(t.name()), Some(t), "{t}");
            assert_eq!(t.build_defaults().filter_type(), t);
        }
    }

    #[test]
    fn preferred_filter_falls_back_to_canny() {
        assert_eq!(
            FilterType::preferred_for(&model(Some("depth_anything_image_processor"))),
            FilterType::DepthAnything
        );
        assert_eq!(
            FilterType::preferred_for(&model(Some("zoe_depth_image_processor"))),
            FilterType::Canny,
            "a removed filter falls back"
        );
        assert_eq!(FilterType::preferred_for(&model(None)), FilterType::Canny);
    }

    #[test]
    fn canny_defaults() {
        assert_eq!(
            FilterConfig::default(),
            FilterConfig::Canny {
                low_threshold: 100,
                high_threshold: 200
            }
        );
    }
}
