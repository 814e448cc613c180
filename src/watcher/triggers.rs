//! When composer events turn into pipeline runs
//!
//! - text changed: 500ms trailing debounce, ignored right after a paste
//! - paste: 1000ms cooldown, run 100ms later so the host's own paste settles
//! - space/Enter released: run now, ignored right after a paste
//!
//! Time is passed in, so the state machine can be driven by tests without a
//! clock.

use crate::config::TriggerTimings;
use crate::host::ElementToken;
use tokio::time::Instant;

/// What an event did to the schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Suppressed by the paste cooldown or an irrelevant key
    Ignored,
    /// Debounce timer (re)started
    Debounced,
    /// Run scheduled after the paste settle delay
    Scheduled,
    /// Run immediately
    RunNow,
}

/// Keys whose release means a word was just finished
pub fn is_trigger_key(key: &str) -> bool {
    key == " " || key == "Enter"
}

/// Debounce and cooldown timers
#[derive(Debug)]
pub struct TriggerState {
    timings: TriggerTimings,
    last_paste: Option<Instant>,
    debounce: Option<(Instant, ElementToken)>,
    paste: Option<(Instant, ElementToken)>,
}

impl TriggerState {
    /// Idle timers
    pub fn new(timings: TriggerTimings) -> Self {
        Self {
            timings,
            last_paste: None,
            debounce: None,
            paste: None,
        }
    }

    fn in_paste_cooldown(&self, now: Instant) -> bool {
        self.last_paste
            .is_some_and(|at| now.saturating_duration_since(at) < self.timings.paste_cooldown)
    }

    /// Text changed in `element`
    pub fn on_text_changed(&mut self, element: ElementToken, now: Instant) -> Trigger {
        if self.in_paste_cooldown(now) {
            return Trigger::Ignored;
        }
        self.debounce = Some((now + self.timings.typing_debounce, element));
        Trigger::Debounced
    }

    /// Paste into `element`
    pub fn on_paste(&mut self, element: ElementToken, now: Instant) -> Trigger {
        if self.in_paste_cooldown(now) {
            return Trigger::Ignored;
        }
        self.last_paste = Some(now);
        self.paste = Some((now + self.timings.paste_settle, element));
        Trigger::Scheduled
    }

    /// Key released in `element`
    pub fn on_key_release(&mut self, _element: ElementToken, key: &str, now: Instant) -> Trigger {
        if !is_trigger_key(key) || self.in_paste_cooldown(now) {
            return Trigger::Ignored;
        }
        Trigger::RunNow
    }

    /// Earliest pending deadline
    pub fn next_deadline(&self) -> Option<Instant> {
        [self.debounce, self.paste]
            .into_iter()
            .flatten()
            .map(|(at, _)| at)
            .min()
    }

    /// Take every timer that has expired by `now`, earliest first
    pub fn take_due(&mut self, now: Instant) -> Vec<ElementToken> {
        let mut due = Vec::new();
        for slot in [&mut self.debounce, &mut self.paste] {
            if slot.is_some_and(|(at, _)| at <= now) {
                due.extend(slot.take());
            }
        }
        due.sort_by_key(|(at, _)| *at);
        due.into_iter().map(|(_, element)| element).collect()
    }

    /// Cancel all pending timers and forget the last paste
    pub fn clear(&mut self) {
        self.last_paste = None;
        self.debounce = None;
        self.paste = None;
    }

    /// Whether any timer is pending
    pub fn has_pending(&self) -> bool {
        self.debounce.is_some() || self.paste.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const EL: ElementToken = ElementToken(1);

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn state() -> TriggerState {
        TriggerState::new(TriggerTimings::default())
    }

    #[test]
    fn test_typing_debounce_restarts() {
        let mut s = state();
        let t0 = Instant::now();

        assert_eq!(s.on_text_changed(EL, t0), Trigger::Debounced);
        assert_eq!(s.on_text_changed(EL, t0 + ms(300)), Trigger::Debounced);
        assert_eq!(s.next_deadline(), Some(t0 + ms(800)));

        assert!(s.take_due(t0 + ms(600)).is_empty());
        assert_eq!(s.take_due(t0 + ms(800)), vec![EL]);
        assert!(!s.has_pending());
    }

    #[test]
    fn test_paste_cooldown() {
        let mut s = state();
        let t0 = Instant::now();

        assert_eq!(s.on_paste(EL, t0), Trigger::Scheduled);
        assert_eq!(s.on_paste(EL, t0 + ms(999)), Trigger::Ignored);
        assert_eq!(s.take_due(t0 + ms(100)), vec![EL]);
        assert_eq!(s.on_paste(EL, t0 + ms(1000)), Trigger::Scheduled);
    }

    #[test]
    fn test_input_after_paste_ignored() {
        let mut s = state();
        let t0 = Instant::now();

        s.on_paste(EL, t0);
        assert_eq!(s.on_text_changed(EL, t0 + ms(5)), Trigger::Ignored);
        assert_eq!(s.on_text_changed(EL, t0 + ms(1200)), Trigger::Debounced);
    }

    #[test]
    fn test_key_release() {
        let mut s = state();
        let t0 = Instant::now();

        assert_eq!(s.on_key_release(EL, " ", t0), Trigger::RunNow);
        assert_eq!(s.on_key_release(EL, "Enter", t0), Trigger::RunNow);
        assert_eq!(s.on_key_release(EL, "a", t0), Trigger::Ignored);

        s.on_paste(EL, t0);
        assert_eq!(s.on_key_release(EL, "Enter", t0 + ms(500)), Trigger::Ignored);
    }

    #[test]
    fn test_clear_cancels_timers() {
        let mut s = state();
        let t0 = Instant::now();
        s.on_text_changed(EL, t0);
        s.on_paste(ElementToken(2), t0 + ms(1));

        s.clear();
        assert!(!s.has_pending());
        assert_eq!(s.next_deadline(), None);
        assert_eq!(s.on_paste(EL, t0 + ms(2)), Trigger::Scheduled);
    }

    #[test]
    fn test_due_in_deadline_order() {
        let mut s = state();
        let t0 = Instant::now();
        s.on_text_changed(ElementToken(1), t0);
        s.on_paste(ElementToken(2), t0 + ms(1200));

        assert_eq!(
            s.take_due(t0 + ms(2000)),
            vec![ElementToken(1), ElementToken(2)]
        );
    }
}
