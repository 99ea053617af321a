//! Binding of effects to the host clock and surface.
//!
//! An effect is plain state plus a per-tick update. [`EffectHandle`] puts it
//! behind `Rc<RefCell<_>>`, subscribes it to the [`FrameScheduler`] and tears
//! it down on `destroy()` or drop.

use std::cell::{Cell, RefCell};
use std::ops::ControlFlow;
use std::rc::{Rc, Weak};

use tracing::{debug, warn};
use voltframe_platform::{
    BlendMode, BoundsProvider, FrameRect, FrameScheduler, FrameTick, LayerDesc, LayerId,
    RenderSurface, SubscriptionId,
};

/// Borrowed host collaborators. The surface is held weakly: once the host
/// drops it, every effect turns into a no-op.
#[derive(Clone)]
pub struct HostContext {
    scheduler: Rc<dyn FrameScheduler>,
    surface: Weak<dyn RenderSurface>,
    bounds: Rc<dyn BoundsProvider>,
}

impl HostContext {
    pub fn new<C, S, B>(scheduler: Rc<C>, surface: &Rc<S>, bounds: Rc<B>) -> Self
    where
        C: FrameScheduler + 'static,
        S: RenderSurface + 'static,
        B: BoundsProvider + 'static,
    {
        let surface: Rc<dyn RenderSurface> = surface.clone();
        Self {
            scheduler,
            surface: Rc::downgrade(&surface),
            bounds,
        }
    }

    pub fn surface(&self) -> Option<Rc<dyn RenderSurface>> {
        self.surface.upgrade()
    }

    pub fn frame_bounds(&self) -> Option<FrameRect> {
        self.bounds.frame_bounds()
    }

    pub fn now_ms(&self) -> f64 {
        self.scheduler.now_ms()
    }
}

/// Something redrawn on every host tick.
pub trait FrameEffect: 'static {
    const NAME: &'static str;

    /// Creates the effect's drawables. Called once, before the first tick.
    fn bind(&mut self, surface: &dyn RenderSurface);

    /// `frame` is `None` while the reference frame is unavailable.
    fn tick(
        &mut self,
        tick: &FrameTick,
        surface: &dyn RenderSurface,
        frame: Option<FrameRect>,
    ) -> ControlFlow<()>;

    /// Frees drawables and empties live collections. `surface` is `None`
    /// when the host already dropped it.
    fn release(&mut self, surface: Option<&dyn RenderSurface>);
}

pub struct EffectHandle<E: FrameEffect> {
    effect: Rc<RefCell<E>>,
    scheduler: Rc<dyn FrameScheduler>,
    surface: Weak<dyn RenderSurface>,
    subscription: Option<SubscriptionId>,
    /// Set once the effect's own tick returns `Break`.
    ended: Rc<Cell<bool>>,
}

impl<E: FrameEffect> EffectHandle<E> {
    /// Binds `effect` to the surface and subscribes it to the host clock.
    pub fn attach(host: &HostContext, mut effect: E) -> Self {
        match host.surface() {
            Some(surface) => effect.bind(&*surface),
            None => warn!(effect = E::NAME, "render surface unavailable; effect stays inert"),
        }

        let effect = Rc::new(RefCell::new(effect));
        let state = Rc::downgrade(&effect);
        let surface = host.surface.clone();
        let bounds = Rc::clone(&host.bounds);
        let ended = Rc::new(Cell::new(false));
        let ended_flag = Rc::clone(&ended);
        let subscription = host.scheduler.subscribe(Box::new(move |tick| {
            let (Some(effect), Some(surface)) = (state.upgrade(), surface.upgrade()) else {
                return ControlFlow::Continue(());
            };
            let frame = bounds.frame_bounds();
            let Ok(mut guard) = effect.try_borrow_mut() else {
                warn!(effect = E::NAME, "effect busy during tick; skipped");
                return ControlFlow::Continue(());
            };
            let flow = guard.tick(tick, &*surface, frame);
            if flow.is_break() {
                ended_flag.set(true);
            }
            flow
        }));
        debug!(effect = E::NAME, subscription = subscription.0, "effect attached");

        Self {
            effect,
            scheduler: Rc::clone(&host.scheduler),
            surface: host.surface.clone(),
            subscription: Some(subscription),
            ended,
        }
    }

    /// Detaches from the clock and frees drawables. Later calls do nothing.
    pub fn destroy(&mut self) {
        let Some(subscription) = self.subscription.take() else {
            return;
        };
        self.scheduler.unsubscribe(subscription);
        let surface = self.surface.upgrade();
        match self.effect.try_borrow_mut() {
            Ok(mut effect) => effect.release(surface.as_deref()),
            Err(_) => warn!(effect = E::NAME, "effect busy during destroy; drawables leaked"),
        }
        debug!(effect = E::NAME, subscription = subscription.0, "effect destroyed");
    }

    /// `false` after `destroy()` or once the effect finished on its own.
    pub fn is_active(&self) -> bool {
        self.subscription.is_some() && !self.ended.get()
    }

    pub fn inspect<R>(&self, f: impl FnOnce(&E) -> R) -> R {
        f(&*self.effect.borrow())
    }

    /// Mutable access, with the surface if the host still has one.
    pub fn update<R>(&self, f: impl FnOnce(&mut E, Option<&dyn RenderSurface>) -> R) -> R {
        let surface = self.surface.upgrade();
        f(&mut *self.effect.borrow_mut(), surface.as_deref())
    }
}

impl<E: FrameEffect> Drop for EffectHandle<E> {
    fn drop(&mut self) {
        self.destroy();
    }
}

/// A blurred additive glow layer under a sharp additive core layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct StrokeLayers {
    pub glow: LayerId,
    pub core: LayerId,
}

impl StrokeLayers {
    pub fn create(surface: &dyn RenderSurface, blur: f32, z_index: Option<i32>) -> Self {
        let glow = surface.create_layer(LayerDesc {
            blend: BlendMode::Additive,
            blur: (blur > 0.0).then_some(blur),
            z_index,
        });
        let core = surface.create_layer(LayerDesc {
            blend: BlendMode::Additive,
            blur: None,
            z_index,
        });
        Self { glow, core }
    }

    pub fn begin_frame(&self, surface: &dyn RenderSurface, alpha: f32) {
        surface.clear_layer(self.glow);
        surface.clear_layer(self.core);
        surface.set_layer_alpha(self.glow, alpha);
        surface.set_layer_alpha(self.core, alpha);
    }

    pub fn destroy(&self, surface: &dyn RenderSurface) {
        surface.destroy_layer(self.glow);
        surface.destroy_layer(self.core);
    }
}
