// Copyright 2026 the Easel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Static canvas configuration.

use kurbo::Size;

/// Host-supplied configuration, fixed for the lifetime of a manager.
#[derive(Clone, Debug, PartialEq)]
pub struct CanvasConfig {
    /// Smallest allowed stage scale.
    pub min_scale: f64,
    /// Largest allowed stage scale.
    pub max_scale: f64,
    /// Padding in screen pixels kept around a rect fitted into the container.
    pub fit_padding: f64,
    /// Maximum number of rasters held by the cache.
    pub cache_capacity: usize,
    /// Size of the generation bbox for a fresh canvas.
    pub default_bbox_size: Size,
    /// Grid the bbox snaps to while dragged, in canvas pixels.
    pub bbox_grid: f64,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            min_scale: 0.1,
            max_scale: 20.0,
            fit_padding: 48.0,
            cache_capacity: 64,
            default_bbox_size: Size::new(512.0, 512.0),
            bbox_grid: 8.0,
        }
    }
}

impl CanvasConfig {
    /// Clamps `scale` into the configured range.
    #[must_use]
    pub fn clamp_scale(&self, scale: f64) -> f64 {
        scale.clamp(self.min_scale, self.max_scale)
    }
}
