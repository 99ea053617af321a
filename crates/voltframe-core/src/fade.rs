//! Linear backdrop alpha transition.

use std::ops::ControlFlow;

use tracing::trace;
use voltframe_platform::{FrameRect, FrameTick, RenderSurface};

use crate::host::{EffectHandle, FrameEffect, HostContext};

pub type FadeHandle = EffectHandle<BackdropFade>;

/// Moves the surface backdrop alpha from wherever it is at bind time to
/// `target` over `duration_ms`, then unsubscribes itself.
#[derive(Debug, Clone)]
pub struct BackdropFade {
    from: f32,
    target: f32,
    start_ms: f64,
    duration_ms: f64,
    finished: bool,
}

impl BackdropFade {
    pub fn new(target: f32, start_ms: f64, duration_ms: f64) -> Self {
        Self {
            from: target,
            target,
            start_ms,
            duration_ms,
            finished: false,
        }
    }

    pub fn start(host: &HostContext, target: f32, duration_ms: f64) -> FadeHandle {
        EffectHandle::attach(host, Self::new(target, host.now_ms(), duration_ms))
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Alpha at `now_ms`.
    pub fn alpha_at(&self, now_ms: f64) -> f32 {
        if self.duration_ms <= 0.0 {
            return self.target;
        }
        let t = ((now_ms - self.start_ms) / self.duration_ms).clamp(0.0, 1.0) as f32;
        self.from + (self.target - self.from) * t
    }
}

impl FrameEffect for BackdropFade {
    const NAME: &'static str = "backdrop-fade";

    fn bind(&mut self, surface: &dyn RenderSurface) {
        self.from = surface.backdrop_alpha();
        if self.duration_ms <= 0.0 {
            surface.set_backdrop_alpha(self.target);
            self.finished = true;
        }
    }

    fn tick(
        &mut self,
        tick: &FrameTick,
        surface: &dyn RenderSurface,
        _frame: Option<FrameRect>,
    ) -> ControlFlow<()> {
        if self.finished {
            return ControlFlow::Break(());
        }
        surface.set_backdrop_alpha(self.alpha_at(tick.now_ms));
        if tick.now_ms - self.start_ms >= self.duration_ms {
            self.finished = true;
            trace!(target_alpha = self.target, "backdrop fade finished");
            return ControlFlow::Break(());
        }
        ControlFlow::Continue(())
    }

    fn release(&mut self, _surface: Option<&dyn RenderSurface>) {}
}

impl EffectHandle<BackdropFade> {
    pub fn is_finished(&self) -> bool {
        self.inspect(BackdropFade::is_finished)
    }
}
