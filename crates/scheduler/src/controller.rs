//! Schedule Controller
//!
//! Pure, time-driven state machine over [`SessionPhase`]. It never sleeps and
//! never reads a clock: the session loop feeds it readings and asks what is
//! due. Phases only move forward within a session; `rollover` is the only
//! way back to `PreOpen`.

use argus_core::Timestamp;
use chrono::Duration;
use log::{debug, info};

use crate::error::ScheduleError;
use crate::phase::{PhaseTransition, SessionPhase};
use crate::window::SessionWindows;

#[derive(Debug, Clone)]
pub struct ScheduleController {
    windows: SessionWindows,
    phase: SessionPhase,
    deep_scan_done: bool,
    last_tick: Option<Timestamp>,
}

impl ScheduleController {
    pub fn new(windows: SessionWindows) -> Self {
        Self {
            windows,
            phase: SessionPhase::PreOpen,
            deep_scan_done: false,
            last_tick: None,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn windows(&self) -> &SessionWindows {
        &self.windows
    }

    /// Tier scan interval of the current phase
    pub fn interval(&self) -> Option<Duration> {
        self.windows.window(self.phase).and_then(|w| w.interval)
    }

    /// Advance to the phase in force at `now`
    ///
    /// May skip phases when time jumped. A reading earlier than the current
    /// phase never moves the controller back.
    pub fn observe(&mut self, now: Timestamp) -> Option<PhaseTransition> {
        let target = self.windows.phase_at(now);
        if target <= self.phase {
            if target < self.phase {
                debug!(
                    "[SCHED] Ignoring clock reading {} ({}): already in {}",
                    now, target, self.phase
                );
            }
            return None;
        }

        let transition = PhaseTransition {
            from: self.phase,
            to: target,
            at: now,
        };
        self.phase = target;
        self.last_tick = None;
        info!("[SCHED] Phase {}", transition);
        Some(transition)
    }

    /// Whether the once-per-session deep scan should run now
    pub fn deep_scan_due(&self, now: Timestamp) -> bool {
        !self.deep_scan_done && !self.phase.is_terminal() && now >= self.windows.deep_scan_at()
    }

    /// Deep scan still pending after `PreOpen` already ended
    pub fn deep_scan_overdue(&self) -> bool {
        !self.deep_scan_done && self.phase > SessionPhase::PreOpen
    }

    pub fn deep_scan_done(&self) -> bool {
        self.deep_scan_done
    }

    pub fn mark_deep_scan_complete(&mut self) {
        self.deep_scan_done = true;
    }

    /// Whether a scheduled tier scan should run now
    ///
    /// Never true while a due deep scan is still outstanding, so the
    /// shortlist is in place before the first tier tick.
    pub fn tick_due(&self, now: Timestamp) -> bool {
        if self.deep_scan_due(now) {
            return false;
        }
        match self.next_tick_at() {
            Some(at) => now >= at,
            None => false,
        }
    }

    /// Record a scheduled tier scan that started at `at`
    pub fn record_tick(&mut self, at: Timestamp) {
        self.last_tick = Some(at);
    }

    pub fn last_tick(&self) -> Option<Timestamp> {
        self.last_tick
    }

    /// When the next scheduled tier scan falls due
    ///
    /// The first tick of a scanning phase is due at the phase start.
    pub fn next_tick_at(&self) -> Option<Timestamp> {
        let window = self.windows.window(self.phase)?;
        let interval = window.interval?;
        Some(self.last_tick.map_or(window.start, |last| last + interval))
    }

    /// Earliest instant something changes: a tick, the deep scan, or the
    /// phase boundary. `None` once `Closed`.
    pub fn next_deadline(&self, now: Timestamp) -> Option<Timestamp> {
        if self.phase.is_terminal() {
            return None;
        }

        let mut deadline = self
            .windows
            .window(self.phase)
            .map(|w| w.end)
            .unwrap_or_else(|| self.windows.session_end());
        if !self.deep_scan_done {
            deadline = deadline.min(self.windows.deep_scan_at());
        }
        if let Some(tick) = self.next_tick_at() {
            deadline = deadline.min(tick);
        }
        if deadline < now {
            debug!("[SCHED] Deadline {} already passed at {}", deadline, now);
        }
        Some(deadline)
    }

    /// Preemptions are only serviced while tier scanning is active
    pub fn accepts_preemption(&self) -> bool {
        self.phase.is_scanning()
    }

    /// Start the next session
    pub fn rollover(&mut self, next: SessionWindows) -> Result<(), ScheduleError> {
        if next.session_start() < self.windows.session_end() {
            return Err(ScheduleError::RolloverBackwards {
                current_end: self.windows.session_end(),
                next_start: next.session_start(),
            });
        }

        info!(
            "[SCHED] Rollover {} -> {}",
            self.windows.date(),
            next.date()
        );
        self.windows = next;
        self.phase = SessionPhase::PreOpen;
        self.deep_scan_done = false;
        self.last_tick = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::window::WindowTemplate;
    use chrono::{FixedOffset, NaiveDate, TimeZone, Utc};

    fn windows_for(day: u32) -> SessionWindows {
        SessionWindows::build(
            NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
            FixedOffset::east_opt(0).unwrap(),
            &WindowTemplate::default(),
        )
        .unwrap()
    }

    fn at(h: u32, m: u32) -> Timestamp {
        Utc.with_ymd_and_hms(2024, 3, 4, h, m, 0).unwrap()
    }

    #[test]
    fn test_starts_in_pre_open() {
        let mut ctl = ScheduleController::new(windows_for(4));
        assert_eq!(ctl.phase(), SessionPhase::PreOpen);
        assert_eq!(ctl.observe(at(7, 0)), None);
        assert!(!ctl.accepts_preemption());
        assert!(!ctl.tick_due(at(8, 10)));
    }

    #[test]
    fn test_observe_is_monotone() {
        let mut ctl = ScheduleController::new(windows_for(4));

        let t = ctl.observe(at(10, 30)).unwrap();
        assert_eq!(t.from, SessionPhase::PreOpen);
        assert_eq!(t.to, SessionPhase::LowActivity);

        // Clock went backwards: stay put
        assert_eq!(ctl.observe(at(9, 15)), None);
        assert_eq!(ctl.phase(), SessionPhase::LowActivity);

        assert_eq!(ctl.observe(at(16, 0)).unwrap().to, SessionPhase::Closed);
        assert_eq!(ctl.observe(at(9, 0)), None);
        assert_eq!(ctl.phase(), SessionPhase::Closed);
        assert_eq!(ctl.next_deadline(at(16, 0)), None);
    }

    #[test]
    fn test_deep_scan_fires_once() {
        let mut ctl = ScheduleController::new(windows_for(4));

        assert!(!ctl.deep_scan_due(at(8, 29)));
        assert!(ctl.deep_scan_due(at(8, 30)));
        ctl.mark_deep_scan_complete();
        assert!(!ctl.deep_scan_due(at(8, 45)));

        ctl.observe(at(9, 0));
        assert!(!ctl.deep_scan_due(at(9, 0)));
        assert!(!ctl.deep_scan_overdue());
    }

    #[test]
    fn test_late_start_blocks_ticks_until_deep_scan() {
        let mut ctl = ScheduleController::new(windows_for(4));
        ctl.observe(at(9, 5));

        assert!(ctl.deep_scan_overdue());
        assert!(ctl.deep_scan_due(at(9, 5)));
        assert!(!ctl.tick_due(at(9, 5)));

        ctl.mark_deep_scan_complete();
        assert!(ctl.tick_due(at(9, 5)));
    }

    #[test]
    fn test_tick_cadence() {
        let mut ctl = ScheduleController::new(windows_for(4));
        ctl.mark_deep_scan_complete();
        ctl.observe(at(10, 0));

        assert!(ctl.tick_due(at(10, 0)));
        ctl.record_tick(at(10, 0));
        assert!(!ctl.tick_due(at(10, 9)));
        assert_eq!(ctl.next_tick_at(), Some(at(10, 10)));
        assert!(ctl.tick_due(at(10, 10)));
    }

    #[test]
    fn test_next_deadline() {
        let mut ctl = ScheduleController::new(windows_for(4));

        // Pre-open: deep scan instant comes first
        assert_eq!(ctl.next_deadline(at(8, 0)), Some(at(8, 30)));
        ctl.mark_deep_scan_complete();
        // Then the open
        assert_eq!(ctl.next_deadline(at(8, 31)), Some(at(9, 0)));

        ctl.observe(at(12, 55));
        ctl.record_tick(at(12, 55));
        // Phase boundary beats the 10-minute tick
        assert_eq!(ctl.next_deadline(at(12, 55)), Some(at(13, 0)));
    }

    #[test]
    fn test_overdue_deadline_is_now() {
        let mut ctl = ScheduleController::new(windows_for(4));
        ctl.observe(at(9, 30));
        assert!(ctl.next_deadline(at(9, 30)).unwrap() <= at(9, 30));
    }

    #[test]
    fn test_rollover() {
        let mut ctl = ScheduleController::new(windows_for(4));
        ctl.mark_deep_scan_complete();
        ctl.observe(at(16, 0));
        assert!(ctl.phase().is_terminal());

        assert!(matches!(
            ctl.rollover(windows_for(3)),
            Err(ScheduleError::RolloverBackwards { .. })
        ));
        assert_eq!(ctl.phase(), SessionPhase::Closed);

        ctl.rollover(windows_for(5)).unwrap();
        assert_eq!(ctl.phase(), SessionPhase::PreOpen);
        assert!(!ctl.deep_scan_done());
        assert_eq!(ctl.windows().date(), NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());
    }
}
