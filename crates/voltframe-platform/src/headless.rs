//! In-memory host: a fixed-step clock, a surface that records draw calls,
//! settable frame bounds and an overlay recorder. Used by the demo binary
//! and by tests.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::ops::ControlFlow;
use std::rc::Rc;

use glam::Vec2;
use tracing::{trace, warn};

use crate::{
    BoundsProvider, FrameRect, FrameScheduler, FrameTick, LayerDesc, LayerId, OverlayLayout,
    OverlayPresenter, RenderSurface, SpriteId, SpriteState, StrokeStyle, SubscriptionId,
    TickCallback, BASELINE_FPS,
};

/// Milliseconds per frame at the 60 Hz baseline.
pub const FRAME_MS: f64 = 1000.0 / BASELINE_FPS as f64;

type SharedCallback = Rc<RefCell<TickCallback>>;

/// Clock that only moves when told to.
pub struct ManualClock {
    now_ms: Cell<f64>,
    next_id: Cell<u64>,
    subscribers: RefCell<Vec<(SubscriptionId, SharedCallback)>>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now_ms: Cell::new(0.0),
            next_id: Cell::new(1),
            subscribers: RefCell::new(Vec::new()),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.borrow().len()
    }

    /// Advances by one 60 Hz frame.
    pub fn step_frame(&self) {
        self.advance_ms(FRAME_MS);
    }

    /// Moves time forward by `ms` and ticks every subscriber once.
    pub fn advance_ms(&self, ms: f64) {
        let now_ms = self.now_ms.get() + ms;
        self.now_ms.set(now_ms);
        let tick = FrameTick {
            delta: (ms / FRAME_MS) as f32,
            now_ms,
        };

        // Snapshot so callbacks may subscribe or unsubscribe while we iterate.
        let snapshot: Vec<(SubscriptionId, SharedCallback)> = self
            .subscribers
            .borrow()
            .iter()
            .map(|(id, cb)| (*id, Rc::clone(cb)))
            .collect();

        for (id, callback) in snapshot {
            if !self.is_subscribed(id) {
                continue;
            }
            let flow = match callback.try_borrow_mut() {
                Ok(mut cb) => (&mut *cb)(&tick),
                Err(_) => {
                    warn!(subscription = id.0, "tick callback re-entered; skipped");
                    ControlFlow::Continue(())
                }
            };
            if flow.is_break() {
                self.unsubscribe(id);
            }
        }
    }

    fn is_subscribed(&self, id: SubscriptionId) -> bool {
        self.subscribers.borrow().iter().any(|(sid, _)| *sid == id)
    }
}

impl FrameScheduler for ManualClock {
    fn subscribe(&self, callback: TickCallback) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.subscribers
            .borrow_mut()
            .push((id, Rc::new(RefCell::new(callback))));
        trace!(subscription = id.0, "clock subscribe");
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subs = self.subscribers.borrow_mut();
        let before = subs.len();
        subs.retain(|(sid, _)| *sid != id);
        let removed = subs.len() != before;
        if removed {
            trace!(subscription = id.0, "clock unsubscribe");
        }
        removed
    }

    fn now_ms(&self) -> f64 {
        self.now_ms.get()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StrokeRecord {
    pub points: Vec<Vec2>,
    pub style: StrokeStyle,
    pub closed: bool,
}

#[derive(Debug, Clone)]
pub struct LayerRecord {
    pub desc: LayerDesc,
    pub alpha: f32,
    /// Strokes issued since the last clear.
    pub strokes: Vec<StrokeRecord>,
}

#[derive(Debug, Clone)]
pub struct SpriteRecord {
    pub layer: LayerId,
    pub state: Option<SpriteState>,
    pub visible: bool,
}

#[derive(Default)]
struct SurfaceState {
    next_id: u64,
    layers: BTreeMap<LayerId, LayerRecord>,
    sprites: BTreeMap<SpriteId, SpriteRecord>,
    sprites_created: u64,
}

impl SurfaceState {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Surface that keeps the current frame's draw state in memory.
pub struct RecordingSurface {
    state: RefCell<SurfaceState>,
    backdrop_alpha: Cell<f32>,
}

impl Default for RecordingSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self {
            state: RefCell::new(SurfaceState::default()),
            backdrop_alpha: Cell::new(1.0),
        }
    }

    pub fn layer_count(&self) -> usize {
        self.state.borrow().layers.len()
    }

    pub fn layer(&self, layer: LayerId) -> Option<LayerRecord> {
        self.state.borrow().layers.get(&layer).cloned()
    }

    pub fn layers(&self) -> Vec<(LayerId, LayerRecord)> {
        self.state
            .borrow()
            .layers
            .iter()
            .map(|(id, rec)| (*id, rec.clone()))
            .collect()
    }

    /// Strokes currently held on all layers.
    pub fn stroke_count(&self) -> usize {
        self.state
            .borrow()
            .layers
            .values()
            .map(|l| l.strokes.len())
            .sum()
    }

    /// Sprites alive on the surface, visible or not.
    pub fn sprite_count(&self) -> usize {
        self.state.borrow().sprites.len()
    }

    pub fn visible_sprite_count(&self) -> usize {
        self.state
            .borrow()
            .sprites
            .values()
            .filter(|s| s.visible)
            .count()
    }

    pub fn visible_sprites(&self) -> Vec<SpriteState> {
        self.state
            .borrow()
            .sprites
            .values()
            .filter(|s| s.visible)
            .filter_map(|s| s.state)
            .collect()
    }

    /// Total sprites ever created, including since-destroyed ones.
    pub fn sprites_created(&self) -> u64 {
        self.state.borrow().sprites_created
    }
}

impl RenderSurface for RecordingSurface {
    fn create_layer(&self, desc: LayerDesc) -> LayerId {
        let mut state = self.state.borrow_mut();
        let id = LayerId(state.next_id());
        state.layers.insert(
            id,
            LayerRecord {
                desc,
                alpha: 1.0,
                strokes: Vec::new(),
            },
        );
        id
    }

    fn destroy_layer(&self, layer: LayerId) {
        let mut state = self.state.borrow_mut();
        if state.layers.remove(&layer).is_none() {
            warn!(layer = layer.0, "destroy of unknown layer");
        }
        state.sprites.retain(|_, s| s.layer != layer);
    }

    fn clear_layer(&self, layer: LayerId) {
        if let Some(rec) = self.state.borrow_mut().layers.get_mut(&layer) {
            rec.strokes.clear();
        }
    }

    fn set_layer_alpha(&self, layer: LayerId, alpha: f32) {
        if let Some(rec) = self.state.borrow_mut().layers.get_mut(&layer) {
            rec.alpha = alpha;
        }
    }

    fn stroke_polyline(&self, layer: LayerId, points: &[Vec2], style: StrokeStyle, closed: bool) {
        if let Some(rec) = self.state.borrow_mut().layers.get_mut(&layer) {
            rec.strokes.push(StrokeRecord {
                points: points.to_vec(),
                style,
                closed,
            });
        }
    }

    fn create_sprite(&self, layer: LayerId) -> SpriteId {
        let mut state = self.state.borrow_mut();
        let id = SpriteId(state.next_id());
        state.sprites_created += 1;
        state.sprites.insert(
            id,
            SpriteRecord {
                layer,
                state: None,
                visible: false,
            },
        );
        id
    }

    fn update_sprite(&self, sprite: SpriteId, sprite_state: &SpriteState) {
        if let Some(rec) = self.state.borrow_mut().sprites.get_mut(&sprite) {
            rec.state = Some(*sprite_state);
        }
    }

    fn set_sprite_visible(&self, sprite: SpriteId, visible: bool) {
        if let Some(rec) = self.state.borrow_mut().sprites.get_mut(&sprite) {
            rec.visible = visible;
        }
    }

    fn destroy_sprite(&self, sprite: SpriteId) {
        self.state.borrow_mut().sprites.remove(&sprite);
    }

    fn backdrop_alpha(&self) -> f32 {
        self.backdrop_alpha.get()
    }

    fn set_backdrop_alpha(&self, alpha: f32) {
        self.backdrop_alpha.set(alpha);
    }
}

/// Reference frame bounds that tests and drivers can move, resize or unmount.
#[derive(Debug, Default)]
pub struct FrameBounds {
    rect: Cell<Option<FrameRect>>,
}

impl FrameBounds {
    pub fn new(rect: FrameRect) -> Self {
        Self {
            rect: Cell::new(Some(rect)),
        }
    }

    pub fn set(&self, rect: FrameRect) {
        self.rect.set(Some(rect));
    }

    pub fn clear(&self) {
        self.rect.set(None);
    }
}

impl BoundsProvider for FrameBounds {
    fn frame_bounds(&self) -> Option<FrameRect> {
        self.rect.get()
    }
}

#[derive(Debug, Default)]
pub struct RecordingOverlay {
    visible: RefCell<Option<OverlayLayout>>,
    shows: Cell<u32>,
    hides: Cell<u32>,
}

impl RecordingOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn visible(&self) -> Option<OverlayLayout> {
        self.visible.borrow().clone()
    }

    pub fn show_count(&self) -> u32 {
        self.shows.get()
    }

    pub fn hide_count(&self) -> u32 {
        self.hides.get()
    }
}

impl OverlayPresenter for RecordingOverlay {
    fn show_overlay(&self, layout: &OverlayLayout) {
        *self.visible.borrow_mut() = Some(layout.clone());
        self.shows.set(self.shows.get() + 1);
    }

    fn hide_overlay(&self) {
        if self.visible.borrow_mut().take().is_some() {
            self.hides.set(self.hides.get() + 1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Color;

    #[test]
    fn clock_ticks_subscribers_with_frame_delta() {
        let clock = ManualClock::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        clock.subscribe(Box::new(move |tick| {
            sink.borrow_mut().push(*tick);
            ControlFlow::Continue(())
        }));
        clock.step_frame();
        clock.advance_ms(FRAME_MS * 2.0);
        let seen = seen.borrow();
        assert_eq!(seen.len(), 2);
        assert!((seen[0].delta - 1.0).abs() < 1e-5);
        assert!((seen[1].delta - 2.0).abs() < 1e-5);
        assert!((seen[1].now_ms - FRAME_MS * 3.0).abs() < 1e-9);
    }

    #[test]
    fn break_unsubscribes() {
        let clock = ManualClock::new();
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        clock.subscribe(Box::new(move |_| {
            counter.set(counter.get() + 1);
            ControlFlow::Break(())
        }));
        clock.step_frame();
        clock.step_frame();
        assert_eq!(calls.get(), 1);
        assert_eq!(clock.subscriber_count(), 0);
    }

    #[test]
    fn unsubscribe_is_idempotent() {
        let clock = ManualClock::new();
        let id = clock.subscribe(Box::new(|_| ControlFlow::Continue(())));
        assert!(clock.unsubscribe(id));
        assert!(!clock.unsubscribe(id));
    }

    #[test]
    fn callback_may_unsubscribe_a_later_subscriber() {
        let clock = Rc::new(ManualClock::new());
        let later_calls = Rc::new(Cell::new(0));
        let target: Rc<Cell<Option<SubscriptionId>>> = Rc::new(Cell::new(None));

        let clock_ref = Rc::clone(&clock);
        let target_ref = Rc::clone(&target);
        clock.subscribe(Box::new(move |_| {
            if let Some(id) = target_ref.get() {
                clock_ref.unsubscribe(id);
            }
            ControlFlow::Continue(())
        }));
        let counter = Rc::clone(&later_calls);
        let later = clock.subscribe(Box::new(move |_| {
            counter.set(counter.get() + 1);
            ControlFlow::Continue(())
        }));
        target.set(Some(later));

        clock.step_frame();
        assert_eq!(later_calls.get(), 0);
        assert_eq!(clock.subscriber_count(), 1);
    }

    #[test]
    fn surface_records_and_clears_strokes() {
        let surface = RecordingSurface::new();
        let layer = surface.create_layer(LayerDesc::default());
        let style = StrokeStyle {
            width: 2.0,
            color: Color::WHITE,
            alpha: 1.0,
        };
        surface.stroke_polyline(layer, &[Vec2::ZERO, Vec2::ONE], style, false);
        assert_eq!(surface.stroke_count(), 1);
        surface.clear_layer(layer);
        assert_eq!(surface.stroke_count(), 0);
    }

    #[test]
    fn destroying_layer_drops_its_sprites() {
        let surface = RecordingSurface::new();
        let layer = surface.create_layer(LayerDesc::default());
        let sprite = surface.create_sprite(layer);
        surface.set_sprite_visible(sprite, true);
        assert_eq!(surface.visible_sprite_count(), 1);
        surface.destroy_layer(layer);
        assert_eq!(surface.sprite_count(), 0);
        assert_eq!(surface.sprites_created(), 1);
    }

    #[test]
    fn overlay_counts_only_real_hides() {
        let overlay = RecordingOverlay::new();
        overlay.hide_overlay();
        assert_eq!(overlay.hide_count(), 0);
        overlay.show_overlay(&OverlayLayout {
            rect: FrameRect::new(0.0, 0.0, 10.0, 10.0),
            title: "t".into(),
            subtitle: "s".into(),
            hint: "h".into(),
        });
        assert!(overlay.visible().is_some());
        overlay.hide_overlay();
        assert_eq!(overlay.hide_count(), 1);
        assert!(overlay.visible().is_none());
    }
}
