// Copyright 2026 the Easel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Deterministic software compositing of entity state.
//!
//! Everything here works from immutable [`EntityState`] snapshots and never
//! reads the drawing surface, so the same states always produce the same
//! pixels. Rasterization goes through a `vello_cpu` [`RenderContext`] sized
//! to the requested rect, with the rect's origin at pixel `(0, 0)`:
//!
//! - brush lines are stroked with round caps and joins; a one-point line is
//!   a dot of the stroke width;
//! - eraser lines are stroked into a destination-out layer, so they clear
//!   what earlier objects of the same entity painted;
//! - images are painted at their position with nearest-neighbour sampling.
//!
//! Output buffers are straight alpha. Mask kinds paint in their fill colour.

use core::borrow::Borrow;
use core::ops::Deref;
use std::sync::Arc;

use image::RgbaImage;
use kurbo::{Point, Rect};
use vello_cpu::color::{AlphaColor, PremulRgba8, Srgb};
use vello_cpu::kurbo::{self as vk, Cap, Join, Shape, Stroke};
use vello_cpu::peniko::{BlendMode, Compose, Extend, ImageQuality, ImageSampler, Mix};
use vello_cpu::{Image, ImageSource, Pixmap, RenderContext};

use crate::state::{CanvasObject, EntityState, Rgba};

const TOLERANCE: f64 = 0.1;

/// Pixel size of `rect`, rounding each side to the nearest whole pixel.
#[must_use]
#[expect(
    clippy::cast_possible_truncation,
    reason = "canvas sizes are far below u32::MAX and negative sizes clamp to zero"
)]
pub fn pixel_size(rect: Rect) -> (u32, u32) {
    let w = rect.width().round().max(0.0) as u32;
    let h = rect.height().round().max(0.0) as u32;
    (w, h)
}

/// Rasterizes one entity's objects into a buffer covering `rect` (canvas
/// coordinates). Entity opacity and visibility are not applied.
#[must_use]
pub fn rasterize_entity(state: &EntityState, rect: Rect) -> RgbaImage {
    let (width, height) = pixel_size(rect);
    let Some((w, h)) = render_size(width, height) else {
        return RgbaImage::new(width, height);
    };
    let origin = rect.origin().to_vec2() - state.position.to_vec2();
    let tint = state.fill();

    let mut ctx = RenderContext::new(w, h);
    ctx.set_transform(vk::Affine::translate((-origin.x, -origin.y)));
    ctx.push_blend_layer(BlendMode::new(Mix::Normal, Compose::SrcOver));
    for object in &state.objects {
        draw_object(&mut ctx, object, tint);
    }
    ctx.pop_layer();
    finish(ctx, w, h)
}

/// Flattens `states` back to front into a buffer covering `rect`.
///
/// Disabled entities are skipped. Each entity raster is produced by
/// `rasterize` (so callers can route it through a cache) and painted
/// source-over inside an opacity layer carrying the entity's opacity.
pub fn composite_with<T, R>(
    states: impl IntoIterator<Item = T>,
    rect: Rect,
    mut rasterize: impl FnMut(&T) -> R,
) -> RgbaImage
where
    T: Deref<Target = EntityState>,
    R: Borrow<RgbaImage>,
{
    let (width, height) = pixel_size(rect);
    let Some((w, h)) = render_size(width, height) else {
        return RgbaImage::new(width, height);
    };
    let mut ctx = RenderContext::new(w, h);
    for state in states {
        if !state.is_enabled || state.opacity <= 0.0 {
            continue;
        }
        let layer = rasterize(&state);
        let Some(pixmap) = to_pixmap(layer.borrow(), None) else {
            continue;
        };
        ctx.push_opacity_layer(state.opacity.clamp(0.0, 1.0));
        paint_image(&mut ctx, pixmap, Point::ZERO);
        ctx.pop_layer();
    }
    finish(ctx, w, h)
}

/// [`composite_with`] rasterizing every entity directly.
#[must_use]
pub fn composite<'a>(states: impl IntoIterator<Item = &'a EntityState>, rect: Rect) -> RgbaImage {
    composite_with(states, rect, |state: &&EntityState| rasterize_entity(state, rect))
}

/// The render target size, or `None` for an empty or oversized buffer.
fn render_size(width: u32, height: u32) -> Option<(u16, u16)> {
    if width == 0 || height == 0 {
        return None;
    }
    match (u16::try_from(width), u16::try_from(height)) {
        (Ok(w), Ok(h)) => Some((w, h)),
        _ => {
            log::warn!("compositor: {width}x{height} exceeds the render target limit");
            None
        }
    }
}

fn draw_object(ctx: &mut RenderContext, object: &CanvasObject, tint: Option<Rgba>) {
    match object {
        CanvasObject::BrushLine(line) => {
            with_clip(ctx, line.clip, |ctx| {
                ctx.set_paint(color(tint.unwrap_or(line.color)));
                draw_line(ctx, &line.points, line.stroke_width);
            });
        }
        CanvasObject::EraserLine(line) => {
            with_clip(ctx, line.clip, |ctx| {
                ctx.push_blend_layer(BlendMode::new(Mix::Normal, Compose::DestOut));
                ctx.set_paint(color(Rgba::new(0, 0, 0, 255)));
                draw_line(ctx, &line.points, line.stroke_width);
                ctx.pop_layer();
            });
        }
        CanvasObject::Rect(shape) => {
            ctx.set_paint(color(tint.unwrap_or(shape.color)));
            ctx.fill_rect(&to_vk_rect(shape.rect));
        }
        CanvasObject::Image(object) => {
            if let Some(pixmap) = to_pixmap(&object.image, tint) {
                paint_image(ctx, pixmap, object.position);
            }
        }
    }
}

fn with_clip(ctx: &mut RenderContext, clip: Option<Rect>, draw: impl FnOnce(&mut RenderContext)) {
    match clip {
        Some(clip) => {
            ctx.push_clip_layer(&to_vk_rect(clip).to_path(TOLERANCE));
            draw(ctx);
            ctx.pop_layer();
        }
        None => draw(ctx),
    }
}

fn draw_line(ctx: &mut RenderContext, points: &[Point], stroke_width: f64) {
    match points {
        [] => {}
        [only] => {
            let dot = vk::Circle::new(to_vk_point(*only), stroke_width / 2.0);
            ctx.fill_path(&dot.to_path(TOLERANCE));
        }
        [first, rest @ ..] => {
            let mut path = vk::BezPath::new();
            path.move_to(to_vk_point(*first));
            for p in rest {
                path.line_to(to_vk_point(*p));
            }
            ctx.set_stroke(
                Stroke::new(stroke_width)
                    .with_caps(Cap::Round)
                    .with_join(Join::Round),
            );
            ctx.stroke_path(&path);
        }
    }
}

fn paint_image(ctx: &mut RenderContext, pixmap: Pixmap, at: Point) {
    let (w, h) = (f64::from(pixmap.width()), f64::from(pixmap.height()));
    ctx.set_paint_transform(vk::Affine::translate((at.x, at.y)));
    ctx.set_paint(Image {
        image: ImageSource::Pixmap(Arc::new(pixmap)),
        sampler: ImageSampler {
            x_extend: Extend::Pad,
            y_extend: Extend::Pad,
            quality: ImageQuality::Low,
            alpha: 1.0,
        },
    });
    ctx.fill_rect(&vk::Rect::new(at.x, at.y, at.x + w, at.y + h));
    ctx.set_paint_transform(vk::Affine::IDENTITY);
}

fn finish(mut ctx: RenderContext, width: u16, height: u16) -> RgbaImage {
    ctx.flush();
    let mut pixmap = Pixmap::new(width, height);
    ctx.render_to_pixmap(&mut pixmap);
    to_image(pixmap)
}

/// Premultiplies `image`, replacing its colour with `tint` when given.
fn to_pixmap(image: &RgbaImage, tint: Option<Rgba>) -> Option<Pixmap> {
    let width = u16::try_from(image.width()).ok()?;
    let height = u16::try_from(image.height()).ok()?;
    if width == 0 || height == 0 {
        return None;
    }
    let data = image
        .pixels()
        .map(|px| {
            let [r, g, b, a] = px.0;
            let (r, g, b) = tint.map_or((r, g, b), |fill| (fill.r, fill.g, fill.b));
            #[expect(
                clippy::cast_possible_truncation,
                reason = "the product divided by 255 is at most 255"
            )]
            let mul = |c: u8| ((u16::from(c) * u16::from(a) + 127) / 255) as u8;
            PremulRgba8 {
                r: mul(r),
                g: mul(g),
                b: mul(b),
                a,
            }
        })
        .collect();
    Some(Pixmap::from_parts(data, width, height))
}

fn to_image(pixmap: Pixmap) -> RgbaImage {
    let (width, height) = (u32::from(pixmap.width()), u32::from(pixmap.height()));
    let raw: Vec<u8> = pixmap
        .take_unpremultiplied()
        .into_iter()
        .flat_map(|px| [px.r, px.g, px.b, px.a])
        .collect();
    RgbaImage::from_raw(width, height, raw).unwrap_or_else(|| RgbaImage::new(width, height))
}

fn color(c: Rgba) -> AlphaColor<Srgb> {
    AlphaColor::from_rgba8(c.r, c.g, c.b, c.a)
}

fn to_vk_point(p: Point) -> vk::Point {
    vk::Point::new(p.x, p.y)
}

fn to_vk_rect(r: Rect) -> vk::Rect {
    vk::Rect::new(r.x0, r.y0, r.x1, r.y1)
}
