//! The phased celebration: sparks, then flowing particles, then an overlay
//! waiting to be dismissed.
//!
//! The sequence owns no clock subscription of its own. The host calls
//! [`CelebrationSequence::update`] once per frame (after ticking the
//! scheduler) and every delayed step is a cancellable timer, so teardown
//! never leaves a step to fire against destroyed state.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use voltframe_platform::{OverlayLayout, OverlayPresenter, BASELINE_FPS};

use crate::config::EffectsConfig;
use crate::effects::ElectricEffects;
use crate::fade::{BackdropFade, FadeHandle};
use crate::host::HostContext;
use crate::timer::TimerQueue;

/// Retry interval while the frame bounds are unavailable.
const OVERLAY_RETRY_MS: f64 = 1000.0 / BASELINE_FPS as f64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// Outline, bolts and particles all running.
    Sparking,
    /// Sparks retired; particles keep flowing until the overlay shows.
    Flowing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SequenceState {
    Idle,
    Active(Phase),
    AwaitingDismiss,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SequenceOutcome {
    /// Dismissed while the overlay was showing.
    Acknowledged,
    /// Stopped, restarted or dropped before the overlay showed.
    DismissedEarly,
}

impl fmt::Display for SequenceOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Acknowledged => f.write_str("acknowledged"),
            Self::DismissedEarly => f.write_str("dismissed early"),
        }
    }
}

/// Single-shot completion signal returned by `start()`.
#[derive(Debug, Clone, Default)]
pub struct Completion {
    outcome: Rc<Cell<Option<SequenceOutcome>>>,
}

impl Completion {
    pub fn outcome(&self) -> Option<SequenceOutcome> {
        self.outcome.get()
    }

    pub fn is_resolved(&self) -> bool {
        self.outcome.get().is_some()
    }
}

type CompletionCallback = Box<dyn FnOnce(SequenceOutcome)>;

struct PendingRun {
    completion: Completion,
    callback: Option<CompletionCallback>,
}

impl PendingRun {
    fn resolve(mut self, outcome: SequenceOutcome) {
        if self.completion.is_resolved() {
            return;
        }
        self.completion.outcome.set(Some(outcome));
        if let Some(callback) = self.callback.take() {
            callback(outcome);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    RetireSparks,
    ShowOverlay,
}

pub struct CelebrationSequence {
    host: HostContext,
    overlay: Rc<dyn OverlayPresenter>,
    config: EffectsConfig,
    rng: StdRng,
    state: SequenceState,
    effects: ElectricEffects,
    fade: Option<FadeHandle>,
    timers: TimerQueue<Step>,
    pending: Option<PendingRun>,
}

impl CelebrationSequence {
    pub fn new(
        host: HostContext,
        overlay: Rc<dyn OverlayPresenter>,
        config: EffectsConfig,
        rng: StdRng,
    ) -> Self {
        Self {
            host,
            overlay,
            config,
            rng,
            state: SequenceState::Idle,
            effects: ElectricEffects::default(),
            fade: None,
            timers: TimerQueue::new(),
            pending: None,
        }
    }

    pub fn state(&self) -> SequenceState {
        self.state
    }

    pub fn config(&self) -> &EffectsConfig {
        &self.config
    }

    pub fn effects(&self) -> &ElectricEffects {
        &self.effects
    }

    pub fn is_running(&self) -> bool {
        matches!(
            self.state,
            SequenceState::Active(_) | SequenceState::AwaitingDismiss
        )
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    /// Starts a fresh run. A run already in progress is torn down first and
    /// resolves as [`SequenceOutcome::DismissedEarly`].
    pub fn start(&mut self) -> Completion {
        if self.is_running() {
            debug!(state = ?self.state, "restarting celebration");
            self.cancel_run(SequenceOutcome::DismissedEarly);
        }

        let now = self.host.now_ms();
        let timing = &self.config.sequence;
        let (dim_alpha, fade_ms, spark_ms) =
            (timing.dim_alpha, timing.fade_ms, timing.spark_duration_ms);

        self.effects = ElectricEffects::enable(&self.host, &self.config, &mut self.rng);
        self.fade = Some(BackdropFade::start(&self.host, dim_alpha, fade_ms));
        self.timers.schedule(now + spark_ms, Step::RetireSparks);
        self.state = SequenceState::Active(Phase::Sparking);

        let completion = Completion::default();
        self.pending = Some(PendingRun {
            completion: completion.clone(),
            callback: None,
        });
        info!(now_ms = now, spark_ms, "celebration started");
        completion
    }

    /// Registers a callback for the current run's outcome, replacing any
    /// earlier one. Returns `false` when no run is pending.
    pub fn on_complete(&mut self, callback: impl FnOnce(SequenceOutcome) + 'static) -> bool {
        match self.pending.as_mut() {
            Some(run) => {
                run.callback = Some(Box::new(callback));
                true
            }
            None => false,
        }
    }

    /// Fires every step due by the host clock's current time.
    pub fn update(&mut self) {
        let now = self.host.now_ms();
        while let Some((due, step)) = self.timers.pop_due(now) {
            match step {
                Step::RetireSparks => {
                    self.effects.retire_sparks();
                    self.state = SequenceState::Active(Phase::Flowing);
                    let delay = self.config.sequence.overlay_delay_ms;
                    self.timers.schedule(due + delay, Step::ShowOverlay);
                }
                Step::ShowOverlay => self.show_overlay(now),
            }
        }
    }

    fn show_overlay(&mut self, now: f64) {
        let Some(frame) = self.host.frame_bounds() else {
            warn!("frame bounds unavailable; overlay postponed");
            self.timers.schedule(now + OVERLAY_RETRY_MS, Step::ShowOverlay);
            return;
        };
        let copy = &self.config.sequence;
        let layout = OverlayLayout {
            rect: frame.scaled_about_center(copy.overlay_scale),
            title: copy.title.clone(),
            subtitle: copy.subtitle.clone(),
            hint: copy.hint.clone(),
        };
        self.overlay.show_overlay(&layout);
        self.state = SequenceState::AwaitingDismiss;
        info!(now_ms = now, "overlay shown");
    }

    /// User dismissal. Acknowledges the run if the overlay is showing,
    /// otherwise ends it early. `None` when nothing is running.
    pub fn dismiss(&mut self) -> Option<SequenceOutcome> {
        let outcome = match self.state {
            SequenceState::AwaitingDismiss => SequenceOutcome::Acknowledged,
            SequenceState::Active(_) => SequenceOutcome::DismissedEarly,
            SequenceState::Idle | SequenceState::Done => return None,
        };
        self.finish(outcome);
        Some(outcome)
    }

    /// Host teardown. Always ends the run as `DismissedEarly`.
    pub fn stop(&mut self) -> Option<SequenceOutcome> {
        if !self.is_running() {
            return None;
        }
        self.finish(SequenceOutcome::DismissedEarly);
        Some(SequenceOutcome::DismissedEarly)
    }

    fn finish(&mut self, outcome: SequenceOutcome) {
        self.cancel_run(outcome);
        let timing = &self.config.sequence;
        let (restore_alpha, fade_ms) = (timing.restore_alpha, timing.fade_ms);
        self.fade = Some(BackdropFade::start(&self.host, restore_alpha, fade_ms));
        self.state = SequenceState::Done;
        info!(%outcome, "celebration finished");
    }

    fn cancel_run(&mut self, outcome: SequenceOutcome) {
        let cancelled = self.timers.clear();
        self.effects.destroy();
        self.overlay.hide_overlay();
        if let Some(run) = self.pending.take() {
            run.resolve(outcome);
        }
        debug!(cancelled_timers = cancelled, "celebration run cancelled");
    }
}

impl Drop for CelebrationSequence {
    fn drop(&mut self) {
        let running = self.is_running();
        let fading = self.fade.as_ref().map_or(false, FadeHandle::is_active);
        if !running && !fading {
            return;
        }
        self.fade = None;
        if running {
            self.cancel_run(SequenceOutcome::DismissedEarly);
        }
        if let Some(surface) = self.host.surface() {
            surface.set_backdrop_alpha(self.config.sequence.restore_alpha);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{rng, TestHost, FRAME};
    use voltframe_platform::headless::FRAME_MS;
    use voltframe_platform::RenderSurface;

    fn sequence(host: &TestHost) -> CelebrationSequence {
        CelebrationSequence::new(
            host.context.clone(),
            host.overlay.clone(),
            EffectsConfig::default(),
            rng(11),
        )
    }

    fn advance(host: &TestHost, seq: &mut CelebrationSequence, ms: f64) {
        host.clock.advance_ms(ms);
        seq.update();
    }

    #[test]
    fn phases_follow_timers() {
        let host = TestHost::new();
        let mut seq = sequence(&host);
        assert_eq!(seq.state(), SequenceState::Idle);

        let done = seq.start();
        assert_eq!(seq.state(), SequenceState::Active(Phase::Sparking));
        advance(&host, &mut seq, 1999.0);
        assert_eq!(seq.state(), SequenceState::Active(Phase::Sparking));
        assert!(seq.effects().sparks_active());

        advance(&host, &mut seq, 1.0);
        assert_eq!(seq.state(), SequenceState::AwaitingDismiss);
        assert!(!seq.effects().sparks_active());
        assert!(seq.effects().particles().is_some());

        let layout = host.overlay.visible().unwrap();
        assert_eq!(layout.title, "Congratulations");
        assert_eq!(layout.rect, FRAME.scaled_about_center(0.9));
        assert!(!done.is_resolved());
    }

    #[test]
    fn overlay_delay_keeps_particles_flowing() {
        let host = TestHost::new();
        let mut config = EffectsConfig::default();
        config.sequence.overlay_delay_ms = 500.0;
        let mut seq = CelebrationSequence::new(
            host.context.clone(),
            host.overlay.clone(),
            config,
            rng(2),
        );
        assert_eq!(seq.config().sequence.overlay_delay_ms, 500.0);
        seq.start();
        advance(&host, &mut seq, 2000.0);
        assert_eq!(seq.state(), SequenceState::Active(Phase::Flowing));
        assert!(host.overlay.visible().is_none());
        advance(&host, &mut seq, 499.0);
        assert!(host.overlay.visible().is_none());
        advance(&host, &mut seq, 1.0);
        assert_eq!(seq.state(), SequenceState::AwaitingDismiss);
    }

    #[test]
    fn dismiss_with_overlay_acknowledges() {
        let host = TestHost::new();
        let mut seq = sequence(&host);
        let done = seq.start();
        advance(&host, &mut seq, 2000.0);
        assert_eq!(seq.dismiss(), Some(SequenceOutcome::Acknowledged));
        assert_eq!(done.outcome(), Some(SequenceOutcome::Acknowledged));
        assert_eq!(seq.state(), SequenceState::Done);
        assert!(host.overlay.visible().is_none());
        assert!(!seq.effects().is_active());
    }

    #[test]
    fn early_dismiss_cancels_pending_steps() {
        let host = TestHost::new();
        let mut seq = sequence(&host);
        let done = seq.start();
        advance(&host, &mut seq, 500.0);
        assert_eq!(seq.dismiss(), Some(SequenceOutcome::DismissedEarly));
        assert_eq!(seq.pending_timers(), 0);
        advance(&host, &mut seq, 5000.0);
        assert_eq!(host.overlay.show_count(), 0);
        assert_eq!(done.outcome(), Some(SequenceOutcome::DismissedEarly));
    }

    #[test]
    fn dismiss_twice_is_noop() {
        let host = TestHost::new();
        let mut seq = sequence(&host);
        seq.start();
        assert!(seq.dismiss().is_some());
        assert_eq!(seq.dismiss(), None);
        assert_eq!(seq.stop(), None);
    }

    #[test]
    fn backdrop_dims_and_restores() {
        let host = TestHost::new();
        let mut seq = sequence(&host);
        seq.start();
        advance(&host, &mut seq, 700.0);
        assert!((host.surface.backdrop_alpha() - 0.15).abs() < 1e-5);
        advance(&host, &mut seq, 1300.0);
        seq.dismiss();
        advance(&host, &mut seq, 350.0);
        assert!((host.surface.backdrop_alpha() - 0.575).abs() < 1e-4);
        advance(&host, &mut seq, 350.0);
        assert!((host.surface.backdrop_alpha() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn restart_resolves_previous_run_early() {
        let host = TestHost::new();
        let mut seq = sequence(&host);
        let first = seq.start();
        advance(&host, &mut seq, 1000.0);
        let second = seq.start();
        assert_eq!(first.outcome(), Some(SequenceOutcome::DismissedEarly));
        assert!(!second.is_resolved());
        assert_eq!(seq.pending_timers(), 1);

        // the first run's retire step must not fire at t = 2000
        advance(&host, &mut seq, 1000.0);
        assert_eq!(seq.state(), SequenceState::Active(Phase::Sparking));
        advance(&host, &mut seq, 1000.0);
        assert_eq!(seq.state(), SequenceState::AwaitingDismiss);
    }

    #[test]
    fn callback_fires_exactly_once() {
        let host = TestHost::new();
        let mut seq = sequence(&host);
        seq.start();
        let calls = Rc::new(Cell::new(0));
        let seen = Rc::clone(&calls);
        assert!(seq.on_complete(move |outcome| {
            assert_eq!(outcome, SequenceOutcome::DismissedEarly);
            seen.set(seen.get() + 1);
        }));
        seq.stop();
        seq.stop();
        seq.dismiss();
        assert_eq!(calls.get(), 1);
        assert!(!seq.on_complete(|_| {}));
    }

    #[test]
    fn overlay_waits_for_frame_bounds() {
        let host = TestHost::new();
        let mut seq = sequence(&host);
        seq.start();
        host.bounds.clear();
        advance(&host, &mut seq, 2000.0);
        assert_eq!(seq.state(), SequenceState::Active(Phase::Flowing));
        host.bounds.set(FRAME);
        advance(&host, &mut seq, FRAME_MS);
        assert_eq!(seq.state(), SequenceState::AwaitingDismiss);
    }

    #[test]
    fn drop_resolves_and_restores() {
        let host = TestHost::new();
        let done = {
            let mut seq = sequence(&host);
            let done = seq.start();
            advance(&host, &mut seq, 700.0);
            done
        };
        assert_eq!(done.outcome(), Some(SequenceOutcome::DismissedEarly));
        assert_eq!(host.surface.backdrop_alpha(), 1.0);
        assert_eq!(host.clock.subscriber_count(), 0);
        assert_eq!(host.surface.layer_count(), 0);
    }

    #[test]
    fn drop_during_restore_fade_snaps_backdrop() {
        let host = TestHost::new();
        {
            let mut seq = sequence(&host);
            seq.start();
            advance(&host, &mut seq, 700.0);
            seq.dismiss();
            advance(&host, &mut seq, 100.0);
            assert!(host.surface.backdrop_alpha() < 1.0);
        }
        assert_eq!(host.surface.backdrop_alpha(), 1.0);
        host.clock.advance_ms(1000.0);
        assert_eq!(host.surface.backdrop_alpha(), 1.0);
        assert_eq!(host.clock.subscriber_count(), 0);
    }

    #[test]
    fn drop_after_finished_fade_leaves_backdrop_alone() {
        let host = TestHost::new();
        {
            let mut seq = sequence(&host);
            seq.start();
            seq.dismiss();
            advance(&host, &mut seq, 800.0);
            host.surface.set_backdrop_alpha(0.5);
        }
        assert_eq!(host.surface.backdrop_alpha(), 0.5);
    }
}
