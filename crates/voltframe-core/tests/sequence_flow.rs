use std::cell::RefCell;
use std::rc::Rc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use voltframe_core::{
    CelebrationSequence, EffectsConfig, HostContext, Phase, SequenceOutcome, SequenceState,
};
use voltframe_platform::headless::{
    FrameBounds, ManualClock, RecordingOverlay, RecordingSurface, FRAME_MS,
};
use voltframe_platform::{FrameRect, RenderSurface};

const FRAME: FrameRect = FrameRect::new(275.0, 70.0, 730.0, 580.0);

struct Harness {
    clock: Rc<ManualClock>,
    surface: Rc<RecordingSurface>,
    bounds: Rc<FrameBounds>,
    overlay: Rc<RecordingOverlay>,
    sequence: CelebrationSequence,
}

impl Harness {
    fn new(config: EffectsConfig, seed: u64) -> Self {
        let clock = Rc::new(ManualClock::new());
        let surface = Rc::new(RecordingSurface::new());
        let bounds = Rc::new(FrameBounds::new(FRAME));
        let overlay = Rc::new(RecordingOverlay::new());
        let host = HostContext::new(Rc::clone(&clock), &surface, Rc::clone(&bounds));
        let sequence = CelebrationSequence::new(
            host,
            overlay.clone(),
            config,
            StdRng::seed_from_u64(seed),
        );
        Self {
            clock,
            surface,
            bounds,
            overlay,
            sequence,
        }
    }

    fn frames(&mut self, n: u32) {
        for _ in 0..n {
            self.clock.step_frame();
            self.sequence.update();
        }
    }
}

#[test]
fn full_run_is_acknowledged_and_cleans_up() {
    let mut h = Harness::new(EffectsConfig::default(), 42);
    let done = h.sequence.start();

    h.frames(60);
    assert_eq!(h.sequence.state(), SequenceState::Active(Phase::Sparking));
    assert!(h.surface.stroke_count() > 0);
    assert!(h.sequence.effects().active_particles() > 0);

    // 2000 ms is frame 120 at 60 Hz; allow one frame of float slack
    h.frames(61);
    assert_eq!(h.sequence.state(), SequenceState::AwaitingDismiss);
    assert_eq!(h.overlay.show_count(), 1);
    assert_eq!(h.sequence.effects().active_bolts(), 0);
    assert!(h.sequence.effects().active_particles() > 0);

    assert_eq!(h.sequence.dismiss(), Some(SequenceOutcome::Acknowledged));
    assert_eq!(done.outcome(), Some(SequenceOutcome::Acknowledged));
    assert!(h.overlay.visible().is_none());
    assert_eq!(h.surface.layer_count(), 0);
    assert_eq!(h.surface.sprite_count(), 0);

    h.frames(45);
    assert!((h.surface.backdrop_alpha() - 1.0).abs() < 1e-5);
    assert_eq!(h.clock.subscriber_count(), 0);
}

#[test]
fn early_dismiss_leaves_nothing_behind() {
    let mut h = Harness::new(EffectsConfig::default(), 7);
    let done = h.sequence.start();
    h.frames(30);
    assert_eq!(h.sequence.dismiss(), Some(SequenceOutcome::DismissedEarly));
    assert_eq!(done.outcome(), Some(SequenceOutcome::DismissedEarly));
    assert_eq!(h.sequence.effects().active_bolts(), 0);
    assert_eq!(h.sequence.effects().active_particles(), 0);

    h.frames(300);
    assert_eq!(h.overlay.show_count(), 0);
    assert_eq!(h.sequence.state(), SequenceState::Done);
    assert_eq!(h.surface.sprite_count(), 0);
}

#[test]
fn populations_stay_capped_while_frame_moves() {
    let config = EffectsConfig::default();
    let max_bolts = config.bolts.max_bolts;
    let max_particles = config.particles.max_particles;
    let mut h = Harness::new(config, 3);
    h.sequence.start();
    for i in 0..110 {
        let shift = (i % 20) as f32 * 3.0;
        h.bounds.set(FrameRect::new(
            FRAME.x + shift,
            FRAME.y,
            FRAME.width - shift,
            FRAME.height + shift,
        ));
        h.frames(1);
        assert!(h.sequence.effects().active_bolts() <= max_bolts);
        assert!(h.sequence.effects().active_particles() <= max_particles);
        assert!(h.surface.visible_sprite_count() <= max_particles);
    }
}

#[test]
fn unmounted_frame_pauses_effects_without_errors() {
    let mut h = Harness::new(EffectsConfig::default(), 5);
    h.sequence.start();
    h.bounds.clear();
    h.frames(30);
    assert_eq!(h.sequence.effects().active_particles(), 0);
    assert_eq!(h.surface.stroke_count(), 0);

    h.bounds.set(FRAME);
    h.frames(5);
    assert!(h.sequence.effects().active_particles() > 0);
}

#[test]
fn callback_and_signal_agree_on_restart() {
    let mut h = Harness::new(EffectsConfig::default(), 9);
    let outcomes = Rc::new(RefCell::new(Vec::new()));

    let first = h.sequence.start();
    let sink = Rc::clone(&outcomes);
    h.sequence.on_complete(move |o| sink.borrow_mut().push(o));
    h.frames(10);

    let second = h.sequence.start();
    let sink = Rc::clone(&outcomes);
    h.sequence.on_complete(move |o| sink.borrow_mut().push(o));
    h.frames(130);
    h.sequence.dismiss();

    assert_eq!(first.outcome(), Some(SequenceOutcome::DismissedEarly));
    assert_eq!(second.outcome(), Some(SequenceOutcome::Acknowledged));
    assert_eq!(
        *outcomes.borrow(),
        vec![SequenceOutcome::DismissedEarly, SequenceOutcome::Acknowledged]
    );
}

#[test]
fn toml_overrides_change_timing() {
    let config = EffectsConfig::from_toml_str(
        r#"
        [sequence]
        spark_duration_ms = 500.0
        "#,
    )
    .unwrap();
    let mut h = Harness::new(config, 1);
    h.sequence.start();
    let frames_to_overlay = (500.0 / FRAME_MS).ceil() as u32 + 1;
    h.frames(frames_to_overlay);
    assert_eq!(h.sequence.state(), SequenceState::AwaitingDismiss);
}

#[test]
fn dropping_surface_makes_effects_inert() {
    let mut h = Harness::new(EffectsConfig::default(), 2);
    h.sequence.start();
    h.frames(10);
    let Harness {
        clock,
        surface,
        mut sequence,
        ..
    } = h;
    drop(surface);
    for _ in 0..10 {
        clock.step_frame();
        sequence.update();
    }
    assert_eq!(sequence.stop(), Some(SequenceOutcome::DismissedEarly));
}
