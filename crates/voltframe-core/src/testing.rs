//! Headless host wiring shared by unit tests.

use std::rc::Rc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use voltframe_platform::headless::{FrameBounds, ManualClock, RecordingOverlay, RecordingSurface};
use voltframe_platform::FrameRect;

use crate::host::HostContext;

pub(crate) const FRAME: FrameRect = FrameRect::new(275.0, 70.0, 730.0, 580.0);

pub(crate) struct TestHost {
    pub clock: Rc<ManualClock>,
    pub surface: Rc<RecordingSurface>,
    pub bounds: Rc<FrameBounds>,
    pub overlay: Rc<RecordingOverlay>,
    pub context: HostContext,
}

impl TestHost {
    pub fn new() -> Self {
        let clock = Rc::new(ManualClock::new());
        let surface = Rc::new(RecordingSurface::new());
        let bounds = Rc::new(FrameBounds::new(FRAME));
        let overlay = Rc::new(RecordingOverlay::new());
        let context = HostContext::new(Rc::clone(&clock), &surface, Rc::clone(&bounds));
        Self {
            clock,
            surface,
            bounds,
            overlay,
            context,
        }
    }
}

pub(crate) fn rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}
