// Copyright 2026 the Easel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Interaction tools.
//!
//! The tool module turns pointer events into [`CanvasAction`]s against the
//! selected entity. It never edits state itself: every stroke point, rect
//! resize or drag step is an action the caller dispatches, and the next event
//! reads the object back from the store. If the store drops an object
//! mid-stroke, later moves produce nothing until the next press.
//!
//! Pointer positions are in canvas coordinates.

use core::fmt;

use flo_binding::{BindRef, Binding, Bound, MutableBound, bind};
use kurbo::{Circle, Point, Rect};
use serde::Serialize;

use crate::context::LogContext;
use crate::error::ToolError;
use crate::id::{EntityIdentifier, ObjectId};
use crate::scene::{DrawingSurface, NodeId, NodeKind};
use crate::state::{
    BrushLine, CanvasObject, CanvasSettings, CanvasState, EntityState, EraserLine, ObjectKind,
    RectShape, Rgba, Tool,
};
use crate::store::CanvasAction;
use crate::version::Versioned;

/// A pointer event in canvas coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PointerEvent {
    /// Button pressed.
    Down(Point),
    /// Pointer moved.
    Move(Point),
    /// Button released.
    Up(Point),
    /// Pointer left the stage.
    Leave,
}

#[derive(Clone, Debug, PartialEq)]
enum Interaction {
    Line {
        entity: EntityIdentifier,
        object: ObjectId,
    },
    Rect {
        entity: EntityIdentifier,
        object: ObjectId,
        anchor: Point,
        color: Rgba,
        added: bool,
    },
    Move {
        entity: EntityIdentifier,
        origin: Point,
        start: Point,
    },
}

/// Debug snapshot of the tool module.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ToolRepr {
    /// Active tool.
    pub tool: Tool,
    /// Whether a stroke, rect or drag is in progress.
    pub interacting: bool,
    /// Whether the brush cursor is shown.
    pub cursor_visible: bool,
}

/// Active tool, in-progress interaction and the preview nodes.
pub struct ToolModule {
    log: LogContext,
    tool: Binding<Tool>,
    group: NodeId,
    cursor: NodeId,
    outline: NodeId,
    interaction: Option<Interaction>,
    cursor_visible: bool,
    destroyed: bool,
}

impl fmt::Debug for ToolModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolModule")
            .field("log", &self.log)
            .field("tool", &self.tool.get())
            .field("group", &self.group)
            .field("interaction", &self.interaction)
            .field("cursor_visible", &self.cursor_visible)
            .field("destroyed", &self.destroyed)
            .finish_non_exhaustive()
    }
}

impl ToolModule {
    /// Creates the preview nodes under `parent`.
    pub fn new(parent: NodeId, log: &LogContext, surface: &mut dyn DrawingSurface) -> Self {
        let group = surface.create_node(NodeKind::Group);
        surface.set_name(group, "tool_preview");
        let cursor = surface.create_node(NodeKind::Circle);
        let outline = surface.create_node(NodeKind::Rect);
        surface.append_child(group, cursor);
        surface.append_child(group, outline);
        surface.append_child(parent, group);
        surface.set_stroke_width(cursor, 1.0);
        surface.set_stroke_width(outline, 1.0);
        surface.set_visible(cursor, false);
        surface.set_visible(outline, false);
        Self {
            log: log.child("tool", "module"),
            tool: bind(Tool::default()),
            group,
            cursor,
            outline,
            interaction: None,
            cursor_visible: false,
            destroyed: false,
        }
    }

    /// The active tool.
    #[must_use]
    pub fn tool(&self) -> BindRef<Tool> {
        BindRef::from(self.tool.clone())
    }

    /// Switches tools, ending any interaction.
    pub fn set_tool(&mut self, tool: Tool, surface: &mut dyn DrawingSurface) {
        if self.destroyed {
            return;
        }
        self.end(surface);
        if self.tool.get() != tool {
            self.tool.set(tool);
            log::debug!("{}: tool -> {tool:?}", self.log);
        }
        if !draws_cursor(tool) {
            self.show_cursor(false, surface);
        }
    }

    /// Whether a stroke, rect or drag is in progress.
    #[must_use]
    pub fn is_interacting(&self) -> bool {
        self.interaction.is_some()
    }

    /// The preview group node.
    #[must_use]
    pub fn group(&self) -> NodeId {
        self.group
    }

    /// The brush cursor node.
    #[must_use]
    pub fn cursor(&self) -> NodeId {
        self.cursor
    }

    /// Handles one pointer event and returns the actions to dispatch.
    ///
    /// Pressing is refused while `is_busy`, with no selection, or when the
    /// selected entity is locked or disabled. Refusals leave no interaction
    /// behind.
    pub fn handle_pointer(
        &mut self,
        event: PointerEvent,
        state: &CanvasState,
        settings: &CanvasSettings,
        is_busy: bool,
        surface: &mut dyn DrawingSurface,
    ) -> Result<Vec<CanvasAction>, ToolError> {
        if self.destroyed {
            return Err(ToolError::Destroyed);
        }
        let tool = self.tool.get();
        match event {
            PointerEvent::Down(p) => {
                self.update_cursor(tool, p, settings, surface);
                self.end(surface);
                if tool == Tool::View {
                    return Ok(Vec::new());
                }
                if is_busy {
                    return Err(ToolError::Busy);
                }
                let entity = target(state)?;
                Ok(self.begin(tool, p, entity, state.bbox, settings))
            }
            PointerEvent::Move(p) => {
                self.update_cursor(tool, p, settings, surface);
                Ok(self.extend(p, state, surface))
            }
            PointerEvent::Up(p) => {
                self.update_cursor(tool, p, settings, surface);
                self.end(surface);
                Ok(Vec::new())
            }
            PointerEvent::Leave => {
                self.show_cursor(false, surface);
                Ok(Vec::new())
            }
        }
    }

    fn begin(
        &mut self,
        tool: Tool,
        p: Point,
        entity: &EntityState,
        bbox: Rect,
        settings: &CanvasSettings,
    ) -> Vec<CanvasAction> {
        let identifier = entity.identifier();
        let local = entity.to_local(p);
        let clip = settings
            .clip_to_bbox
            .then(|| bbox - entity.position.to_vec2());
        let (interaction, action) = match tool {
            Tool::Brush => {
                let line = BrushLine {
                    id: ObjectId::generate(ObjectKind::BrushLine.prefix()),
                    points: vec![local],
                    stroke_width: settings.brush_width,
                    color: settings.color,
                    clip,
                };
                line_start(identifier, CanvasObject::BrushLine(Versioned::new(line)))
            }
            Tool::Eraser => {
                let line = EraserLine {
                    id: ObjectId::generate(ObjectKind::EraserLine.prefix()),
                    points: vec![local],
                    stroke_width: settings.eraser_width,
                    clip,
                };
                line_start(identifier, CanvasObject::EraserLine(Versioned::new(line)))
            }
            Tool::Rect => (
                Interaction::Rect {
                    entity: identifier,
                    object: ObjectId::generate(ObjectKind::Rect.prefix()),
                    anchor: local,
                    color: settings.color,
                    added: false,
                },
                None,
            ),
            Tool::Move => (
                Interaction::Move {
                    entity: identifier,
                    origin: entity.position,
                    start: p,
                },
                None,
            ),
            Tool::View => return Vec::new(),
        };
        log::trace!("{}: begin {tool:?} on {}", self.log, entity.id);
        self.interaction = Some(interaction);
        action.into_iter().collect()
    }

    fn extend(
        &mut self,
        p: Point,
        state: &CanvasState,
        surface: &mut dyn DrawingSurface,
    ) -> Vec<CanvasAction> {
        let Some(interaction) = &mut self.interaction else {
            return Vec::new();
        };
        let Some(entity) = state.entity(interaction_entity(interaction)) else {
            log::debug!("{}: target vanished, ending interaction", self.log);
            self.end(surface);
            return Vec::new();
        };
        match interaction {
            Interaction::Line { entity: id, object } => {
                let local = entity.to_local(p);
                let Some(extended) = entity.object(object).and_then(|o| push_point(o, local))
                else {
                    return Vec::new();
                };
                vec![CanvasAction::ObjectReplaced {
                    entity: id.clone(),
                    object: extended,
                }]
            }
            Interaction::Rect {
                entity: id,
                object,
                anchor,
                color,
                added,
            } => {
                let local = entity.to_local(p);
                let rect = Rect::from_points(*anchor, local);
                let outline = rect + entity.position.to_vec2();
                surface.set_rect(self.outline, outline);
                surface.set_visible(self.outline, true);
                if rect.area() <= 0.0 {
                    if *added {
                        *added = false;
                        return vec![CanvasAction::ObjectRemoved {
                            entity: id.clone(),
                            object: object.clone(),
                        }];
                    }
                    return Vec::new();
                }
                let shape = CanvasObject::Rect(Versioned::new(RectShape {
                    id: object.clone(),
                    rect,
                    color: *color,
                }));
                let action = if *added {
                    CanvasAction::ObjectReplaced {
                        entity: id.clone(),
                        object: shape,
                    }
                } else {
                    CanvasAction::ObjectAdded {
                        entity: id.clone(),
                        object: shape,
                    }
                };
                *added = true;
                vec![action]
            }
            Interaction::Move {
                entity: id,
                origin,
                start,
            } => {
                let position = *origin + (p - *start);
                if position == entity.position {
                    return Vec::new();
                }
                vec![CanvasAction::EntityMoved {
                    entity: id.clone(),
                    position,
                }]
            }
        }
    }

    fn end(&mut self, surface: &mut dyn DrawingSurface) {
        if self.interaction.take().is_some() {
            surface.set_visible(self.outline, false);
        }
    }

    fn update_cursor(
        &mut self,
        tool: Tool,
        p: Point,
        settings: &CanvasSettings,
        surface: &mut dyn DrawingSurface,
    ) {
        let (width, color) = match tool {
            Tool::Brush => (settings.brush_width, settings.color),
            Tool::Eraser => (settings.eraser_width, Rgba::WHITE),
            Tool::Rect | Tool::Move | Tool::View => {
                self.show_cursor(false, surface);
                return;
            }
        };
        surface.set_circle(self.cursor, Circle::new(p, width / 2.0));
        surface.set_stroke_color(self.cursor, color);
        self.show_cursor(true, surface);
    }

    fn show_cursor(&mut self, visible: bool, surface: &mut dyn DrawingSurface) {
        if self.cursor_visible != visible {
            self.cursor_visible = visible;
            surface.set_visible(self.cursor, visible);
        }
    }

    /// Destroys the preview nodes. Idempotent.
    pub fn destroy(&mut self, surface: &mut dyn DrawingSurface) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        self.interaction = None;
        surface.destroy_node(self.group);
        log::debug!("{}: destroyed", self.log);
    }

    /// Debug snapshot.
    #[must_use]
    pub fn repr(&self) -> ToolRepr {
        ToolRepr {
            tool: self.tool.get(),
            interacting: self.interaction.is_some(),
            cursor_visible: self.cursor_visible,
        }
    }
}

fn draws_cursor(tool: Tool) -> bool {
    matches!(tool, Tool::Brush | Tool::Eraser)
}

fn target(state: &CanvasState) -> Result<&EntityState, ToolError> {
    let entity = state.selected().ok_or(ToolError::NoSelection)?;
    if entity.is_locked {
        return Err(ToolError::Locked(entity.identifier()));
    }
    if !entity.is_enabled {
        return Err(ToolError::Disabled(entity.identifier()));
    }
    Ok(entity)
}

fn line_start(
    entity: EntityIdentifier,
    object: CanvasObject,
) -> (Interaction, Option<CanvasAction>) {
    let interaction = Interaction::Line {
        entity: entity.clone(),
        object: object.id().clone(),
    };
    (interaction, Some(CanvasAction::ObjectAdded { entity, object }))
}

fn interaction_entity(interaction: &Interaction) -> &EntityIdentifier {
    match interaction {
        Interaction::Line { entity, .. }
        | Interaction::Rect { entity, .. }
        | Interaction::Move { entity, .. } => entity,
    }
}

/// A new snapshot of `object` with `p` appended, or `None` when `p` repeats
/// the last point or the object is not a line.
fn push_point(object: &CanvasObject, p: Point) -> Option<CanvasObject> {
    match object {
        CanvasObject::BrushLine(line) => (line.points.last() != Some(&p))
            .then(|| CanvasObject::BrushLine(line.map(|l| l.points.push(p)))),
        CanvasObject::EraserLine(line) => (line.points.last() != Some(&p))
            .then(|| CanvasObject::EraserLine(line.map(|l| l.points.push(p)))),
        CanvasObject::Rect(_) | CanvasObject::Image(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::EntityKind;
    use crate::scene::SceneGraph;
    use crate::store::{MemoryStore, StateStore};

    struct Fixture {
        scene: SceneGraph,
        tool: ToolModule,
        store: MemoryStore,
        entity: EntityIdentifier,
    }

    impl Fixture {
        fn new() -> Self {
            let mut scene = SceneGraph::new();
            let root = scene.create_node(NodeKind::Group);
            let tool = ToolModule::new(root, &LogContext::root("test", "tool"), &mut scene);
            let mut store = MemoryStore::default();
            let state = EntityState::new(EntityKind::RasterLayer);
            let entity = state.identifier();
            store.dispatch(CanvasAction::EntityAdded { state });
            store.dispatch(CanvasAction::EntitySelected {
                entity: Some(entity.clone()),
            });
            Self {
                scene,
                tool,
                store,
                entity,
            }
        }

        fn send(&mut self, event: PointerEvent) -> Result<usize, ToolError> {
            let state = self.store.canvas_state();
            let settings = self.store.settings();
            let actions =
                self.tool
                    .handle_pointer(event, &state, &settings, false, &mut self.scene)?;
            let n = actions.len();
            for action in actions {
                self.store.dispatch(action);
            }
            Ok(n)
        }

        fn objects(&self) -> Vec<CanvasObject> {
            self.store
                .state()
                .entity(&self.entity)
                .map(|e| e.objects.clone())
                .unwrap_or_default()
        }
    }

    #[test]
    fn brush_stroke_extends_one_object() {
        let mut fx = Fixture::new();
        fx.send(PointerEvent::Down(Point::new(1.0, 1.0))).expect("down");
        fx.send(PointerEvent::Move(Point::new(2.0, 2.0))).expect("move");
        fx.send(PointerEvent::Move(Point::new(2.0, 2.0))).expect("repeat");
        fx.send(PointerEvent::Move(Point::new(3.0, 2.0))).expect("move");
        fx.send(PointerEvent::Up(Point::new(3.0, 2.0))).expect("up");

        let objects = fx.objects();
        assert_eq!(objects.len(), 1, "a stroke is a single object");
        let CanvasObject::BrushLine(line) = &objects[0] else {
            panic!("expected a brush line");
        };
        assert_eq!(line.points.len(), 3, "repeated points are dropped");
        assert!(!fx.tool.is_interacting());
    }

    #[test]
    fn eraser_uses_eraser_width_and_bbox_clip() {
        let mut fx = Fixture::new();
        fx.store.dispatch(CanvasAction::EraserWidthChanged { width: 7.0 });
        fx.store
            .dispatch(CanvasAction::ClipToBboxChanged { clip_to_bbox: true });
        fx.tool.set_tool(Tool::Eraser, &mut fx.scene);
        fx.send(PointerEvent::Down(Point::new(5.0, 5.0))).expect("down");

        let CanvasObject::EraserLine(line) = &fx.objects()[0] else {
            panic!("expected an eraser line");
        };
        assert_eq!(line.stroke_width, 7.0);
        assert_eq!(line.clip, Some(fx.store.state().bbox));
    }

    #[test]
    fn zero_size_rect_is_dropped() {
        let mut fx = Fixture::new();
        fx.tool.set_tool(Tool::Rect, &mut fx.scene);
        fx.send(PointerEvent::Down(Point::new(1.0, 1.0))).expect("down");
        fx.send(PointerEvent::Move(Point::new(1.0, 9.0))).expect("move");
        fx.send(PointerEvent::Up(Point::new(1.0, 9.0))).expect("up");
        assert!(fx.objects().is_empty());

        fx.send(PointerEvent::Down(Point::new(1.0, 1.0))).expect("down");
        fx.send(PointerEvent::Move(Point::new(4.0, 5.0))).expect("move");
        fx.send(PointerEvent::Move(Point::new(6.0, 5.0))).expect("move");
        fx.send(PointerEvent::Up(Point::new(6.0, 5.0))).expect("up");
        let objects = fx.objects();
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].bounds(), Some(Rect::new(1.0, 1.0, 6.0, 5.0)));
    }

    #[test]
    fn move_tool_drags_entity() {
        let mut fx = Fixture::new();
        fx.tool.set_tool(Tool::Move, &mut fx.scene);
        fx.send(PointerEvent::Down(Point::new(10.0, 10.0))).expect("down");
        fx.send(PointerEvent::Move(Point::new(15.0, 12.0))).expect("move");
        fx.send(PointerEvent::Move(Point::new(20.0, 20.0))).expect("move");
        let position = fx.store.state().entity(&fx.entity).map(|e| e.position);
        assert_eq!(position, Some(Point::new(10.0, 10.0)));
    }

    #[test]
    fn refusals() {
        let mut fx = Fixture::new();
        fx.store.dispatch(CanvasAction::EntityIsLockedChanged {
            entity: fx.entity.clone(),
            is_locked: true,
        });
        assert_eq!(
            fx.send(PointerEvent::Down(Point::ZERO)),
            Err(ToolError::Locked(fx.entity.clone()))
        );
        fx.store.dispatch(CanvasAction::EntitySelected { entity: None });
        assert_eq!(
            fx.send(PointerEvent::Down(Point::ZERO)),
            Err(ToolError::NoSelection)
        );

        let state = fx.store.canvas_state();
        let settings = fx.store.settings();
        let busy = fx
            .tool
            .handle_pointer(PointerEvent::Down(Point::ZERO), &state, &settings, true, &mut fx.scene);
        assert_eq!(busy, Err(ToolError::Busy));
        assert!(!fx.tool.is_interacting(), "refusals leave nothing behind");
    }

    #[test]
    fn cursor_follows_pointer_for_drawing_tools() {
        let mut fx = Fixture::new();
        fx.send(PointerEvent::Move(Point::new(3.0, 4.0))).expect("move");
        assert!(fx.scene.is_visible(fx.tool.cursor()));
        fx.send(PointerEvent::Leave).expect("leave");
        assert!(!fx.scene.is_visible(fx.tool.cursor()));

        fx.tool.set_tool(Tool::View, &mut fx.scene);
        fx.send(PointerEvent::Move(Point::new(3.0, 4.0))).expect("move");
        assert!(!fx.scene.is_visible(fx.tool.cursor()));
        assert_eq!(fx.send(PointerEvent::Down(Point::ZERO)), Ok(0));
    }

    #[test]
    fn stroke_ends_if_object_is_removed() {
        let mut fx = Fixture::new();
        fx.send(PointerEvent::Down(Point::ZERO)).expect("down");
        fx.store.dispatch(CanvasAction::EntityReset {
            entity: fx.entity.clone(),
        });
        assert_eq!(fx.send(PointerEvent::Move(Point::new(1.0, 1.0))), Ok(0));
        assert!(fx.objects().is_empty());
    }
}
