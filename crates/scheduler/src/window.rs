//! Session calendars
//!
//! A [`WindowTemplate`] describes one trading day in exchange-local wall
//! time. [`SessionWindows::build`] pins it to a date and offset, producing
//! UTC windows that partition the session: no gaps, no overlaps.

use argus_core::Timestamp;
use chrono::{Duration, FixedOffset, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ScheduleError;
use crate::phase::SessionPhase;

/// One phase of the template, in local time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowSpec {
    pub phase: SessionPhase,
    pub start: NaiveTime,
    pub end: NaiveTime,
    /// Tier scan interval; absent for `PreOpen`
    #[serde(default)]
    pub interval_secs: Option<u64>,
}

impl WindowSpec {
    pub fn new(phase: SessionPhase, start: NaiveTime, end: NaiveTime, interval_secs: Option<u64>) -> Self {
        Self {
            phase,
            start,
            end,
            interval_secs,
        }
    }
}

/// Local-time description of a trading day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowTemplate {
    pub windows: Vec<WindowSpec>,
    /// Fixed pre-open instant of the daily deep scan
    pub deep_scan_at: NaiveTime,
}

fn hm(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or_default()
}

impl Default for WindowTemplate {
    /// Regular equity session: 08:00 pre-open, 09:00 open, 15:30 close
    fn default() -> Self {
        Self {
            windows: vec![
                WindowSpec::new(SessionPhase::PreOpen, hm(8, 0), hm(9, 0), None),
                WindowSpec::new(SessionPhase::HighActivity, hm(9, 0), hm(10, 0), Some(60)),
                WindowSpec::new(SessionPhase::LowActivity, hm(10, 0), hm(13, 0), Some(600)),
                WindowSpec::new(SessionPhase::TrendConfirm, hm(13, 0), hm(14, 30), Some(300)),
                WindowSpec::new(SessionPhase::FinalWindow, hm(14, 30), hm(15, 30), Some(60)),
            ],
            deep_scan_at: hm(8, 30),
        }
    }
}

impl WindowTemplate {
    /// Check the template partitions its session
    pub fn validate(&self) -> Result<(), ScheduleError> {
        if self.windows.is_empty() {
            return Err(ScheduleError::NoWindows);
        }

        for spec in &self.windows {
            if spec.phase == SessionPhase::Closed {
                return Err(ScheduleError::OutOfOrder(spec.phase));
            }
            if spec.start >= spec.end {
                return Err(ScheduleError::EmptyWindow(spec.phase));
            }
            if spec.phase.is_scanning() && spec.interval_secs.unwrap_or(0) == 0 {
                return Err(ScheduleError::MissingInterval(spec.phase));
            }
        }

        for pair in self.windows.windows(2) {
            let (prev, next) = (&pair[0], &pair[1]);
            if next.phase <= prev.phase {
                return Err(ScheduleError::OutOfOrder(next.phase));
            }
            if next.start > prev.end {
                return Err(ScheduleError::Gap {
                    before: prev.phase,
                    after: next.phase,
                });
            }
            if next.start < prev.end {
                return Err(ScheduleError::Overlap {
                    before: prev.phase,
                    after: next.phase,
                });
            }
        }

        let in_pre_open = self
            .windows
            .iter()
            .find(|w| w.phase == SessionPhase::PreOpen)
            .is_some_and(|w| w.start <= self.deep_scan_at && self.deep_scan_at < w.end);
        if !in_pre_open {
            return Err(ScheduleError::DeepScanOutsidePreOpen(self.deep_scan_at));
        }

        Ok(())
    }
}

/// One phase pinned to UTC
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleWindow {
    pub phase: SessionPhase,
    pub start: Timestamp,
    pub end: Timestamp,
    pub interval: Option<Duration>,
}

impl ScheduleWindow {
    /// Half-open containment: `[start, end)`
    pub fn contains(&self, at: Timestamp) -> bool {
        self.start <= at && at < self.end
    }
}

/// Immutable calendar of one session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionWindows {
    date: NaiveDate,
    windows: Vec<ScheduleWindow>,
    session_start: Timestamp,
    session_end: Timestamp,
    deep_scan_at: Timestamp,
}

impl SessionWindows {
    /// Materialise `template` for `date` at `utc_offset`
    pub fn build(
        date: NaiveDate,
        utc_offset: FixedOffset,
        template: &WindowTemplate,
    ) -> Result<Self, ScheduleError> {
        template.validate()?;

        let to_utc = |t: NaiveTime| -> Result<Timestamp, ScheduleError> {
            date.and_time(t)
                .and_local_timezone(utc_offset)
                .single()
                .map(|local| local.with_timezone(&Utc))
                .ok_or(ScheduleError::LocalTime(t))
        };

        let mut windows = Vec::with_capacity(template.windows.len());
        for spec in &template.windows {
            windows.push(ScheduleWindow {
                phase: spec.phase,
                start: to_utc(spec.start)?,
                end: to_utc(spec.end)?,
                interval: spec
                    .interval_secs
                    .filter(|_| spec.phase.is_scanning())
                    .and_then(|secs| Duration::try_seconds(secs as i64)),
            });
        }

        let (Some(first), Some(last)) = (windows.first(), windows.last()) else {
            return Err(ScheduleError::NoWindows);
        };
        let (session_start, session_end) = (first.start, last.end);

        Ok(Self {
            date,
            deep_scan_at: to_utc(template.deep_scan_at)?,
            windows,
            session_start,
            session_end,
        })
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn windows(&self) -> &[ScheduleWindow] {
        &self.windows
    }

    pub fn session_start(&self) -> Timestamp {
        self.session_start
    }

    pub fn session_end(&self) -> Timestamp {
        self.session_end
    }

    pub fn deep_scan_at(&self) -> Timestamp {
        self.deep_scan_at
    }

    pub fn window(&self, phase: SessionPhase) -> Option<&ScheduleWindow> {
        self.windows.iter().find(|w| w.phase == phase)
    }

    /// Phase in force at `at`
    ///
    /// Anything before the first window counts as `PreOpen`; anything from
    /// the session end on is `Closed`.
    pub fn phase_at(&self, at: Timestamp) -> SessionPhase {
        if at < self.session_start {
            return SessionPhase::PreOpen;
        }
        self.windows
            .iter()
            .find(|w| w.contains(at))
            .map(|w| w.phase)
            .unwrap_or(SessionPhase::Closed)
    }

    /// Shortest tier scan interval of the session
    pub fn shortest_interval(&self) -> Option<Duration> {
        self.windows.iter().filter_map(|w| w.interval).min()
    }
}
