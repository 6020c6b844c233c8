// Copyright 2026 the Easel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dirty-tracking channel constants for the scene graph.
//!
//! - **Propagating**: [`TRANSFORM`] and [`OPACITY`] are marked with
//!   [`EagerPolicy`](understory_dirty::EagerPolicy) and have child-to-parent
//!   dependency edges, so marking a group marks its whole subtree. Visibility
//!   changes ride on [`TRANSFORM`] so the same pass recomputes effective
//!   hidden state.
//! - **Local-only**: [`CLIP`], [`GEOMETRY`] and [`STYLE`] mark only the node
//!   that changed.
//! - **Structural**: [`TOPOLOGY`] triggers a traversal-order rebuild.

use understory_dirty::Channel;

/// Transform or visibility changed.
pub const TRANSFORM: Channel = Channel::new(0);

/// Opacity changed.
pub const OPACITY: Channel = Channel::new(1);

/// Clip rectangle changed.
pub const CLIP: Channel = Channel::new(2);

/// Points, rect, circle or image changed.
pub const GEOMETRY: Channel = Channel::new(3);

/// Stroke, fill or composite operation changed.
pub const STYLE: Channel = Channel::new(4);

/// Tree topology changed.
pub const TOPOLOGY: Channel = Channel::new(5);
