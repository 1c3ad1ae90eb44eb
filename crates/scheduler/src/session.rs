//! Session Scheduler
//!
//! The single scheduling loop. Each iteration asks the controller what is
//! due; when nothing is, it waits on the earliest of:
//!
//! - shutdown
//! - a position event (admit `Held` / release)
//! - a preemption signal (only while tier scanning is active)
//! - the controller's next deadline
//!
//! Runs are never interrupted. The start of a scheduled run and the end of
//! every run are safe points where queued preemptions are serviced.

use argus_allocator::{Admission, Release, SlotAllocator, SnapshotDiff};
use argus_core::{PositionEvent, Slot, SymbolId, Tier, Timestamp};
use argus_pipeline::PipelineCoordinator;
use argus_ports::Clock;
use chrono::NaiveDate;
use log::{debug, info, warn};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use uuid::Uuid;

use crate::controller::ScheduleController;
use crate::deep_scanner::DeepScanner;
use crate::error::Result;
use crate::phase::{PhaseTransition, SessionPhase};
use crate::preemption::{Preemption, PreemptionReceiver, PreemptionSender, preemption_channel};
use crate::tier_scanner::{TierScanReport, TierScanner};
use crate::window::SessionWindows;

/// Kind of work the loop performed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunKind {
    Deep,
    Scheduled,
    Preempted,
}

/// One completed run, in clock time
#[derive(Debug, Clone, PartialEq)]
pub struct RunRecord {
    pub kind: RunKind,
    pub phase: SessionPhase,
    pub started_at: Timestamp,
    pub finished_at: Timestamp,
}

/// Outcome of one session
#[derive(Debug, Clone)]
pub struct SessionSummary {
    pub session_id: Uuid,
    pub date: NaiveDate,
    pub final_phase: SessionPhase,
    pub transitions: Vec<PhaseTransition>,
    pub runs: Vec<RunRecord>,
    /// Deep scan ran after `PreOpen` had already ended
    pub deep_scan_catch_up: bool,
    pub shortlist: Vec<SymbolId>,
    pub preemption_signals: usize,
    pub pipeline_cycles: usize,
    pub position_events: usize,
    /// Loop left on shutdown before reaching `Closed`
    pub stopped_early: bool,
    /// Allocator state when the loop ended
    pub final_snapshot: Vec<Slot>,
}

impl SessionSummary {
    fn new(session_id: Uuid, date: NaiveDate) -> Self {
        Self {
            session_id,
            date,
            final_phase: SessionPhase::PreOpen,
            transitions: Vec::new(),
            runs: Vec::new(),
            deep_scan_catch_up: false,
            shortlist: Vec::new(),
            preemption_signals: 0,
            pipeline_cycles: 0,
            position_events: 0,
            stopped_early: false,
            final_snapshot: Vec::new(),
        }
    }

    pub fn count(&self, kind: RunKind) -> usize {
        self.runs.iter().filter(|r| r.kind == kind).count()
    }
}

/// Sending half of the loop's inputs, handed to upstream sources
#[derive(Debug, Clone)]
pub struct SessionIngress {
    pub preemption: PreemptionSender,
    pub positions: mpsc::Sender<PositionEvent>,
    pub shutdown: Arc<watch::Sender<bool>>,
}

impl SessionIngress {
    pub fn shutdown(&self) {
        // send_replace never fails, even with the loop gone
        self.shutdown.send_replace(true);
    }
}

/// Receiving half of the loop's inputs
#[derive(Debug)]
pub struct SessionChannels {
    pub preemptions: PreemptionReceiver,
    pub positions: mpsc::Receiver<PositionEvent>,
    pub shutdown: watch::Receiver<bool>,
}

/// Create the loop's input channels
pub fn session_channels(capacity: usize) -> (SessionIngress, SessionChannels) {
    let (preemption, preemptions) = preemption_channel();
    let (positions_tx, positions_rx) = mpsc::channel(capacity.max(1));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    (
        SessionIngress {
            preemption,
            positions: positions_tx,
            shutdown: Arc::new(shutdown_tx),
        },
        SessionChannels {
            preemptions,
            positions: positions_rx,
            shutdown: shutdown_rx,
        },
    )
}

pub struct SessionScheduler {
    session_id: Uuid,
    controller: ScheduleController,
    tier_scanner: TierScanner,
    deep_scanner: DeepScanner,
    pipeline: Arc<PipelineCoordinator>,
    allocator: Arc<SlotAllocator>,
    clock: Arc<dyn Clock>,
    preemptions: PreemptionReceiver,
    positions: mpsc::Receiver<PositionEvent>,
    shutdown: watch::Receiver<bool>,
    preemptions_open: bool,
    positions_open: bool,
    shutdown_open: bool,
}

impl SessionScheduler {
    pub fn new(
        controller: ScheduleController,
        tier_scanner: TierScanner,
        deep_scanner: DeepScanner,
        pipeline: Arc<PipelineCoordinator>,
        allocator: Arc<SlotAllocator>,
        clock: Arc<dyn Clock>,
        channels: SessionChannels,
    ) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            controller,
            tier_scanner,
            deep_scanner,
            pipeline,
            allocator,
            clock,
            preemptions: channels.preemptions,
            positions: channels.positions,
            shutdown: channels.shutdown,
            preemptions_open: true,
            positions_open: true,
            shutdown_open: true,
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn controller(&self) -> &ScheduleController {
        &self.controller
    }

    /// Drive the session until `Closed` or shutdown
    pub async fn run(&mut self) -> Result<SessionSummary> {
        let date = self.controller.windows().date();
        let mut summary = SessionSummary::new(self.session_id, date);
        info!(
            "[SCHED] Session {} ({}) starting at {} on {}",
            self.session_id,
            date,
            self.clock.now(),
            self.clock.name()
        );

        loop {
            let now = self.clock.now();
            self.observe(now, &mut summary);
            if self.controller.phase().is_terminal() {
                break;
            }

            if self.controller.deep_scan_due(now) {
                self.run_deep_scan(now, &mut summary).await?;
                self.safe_point(&mut summary).await?;
                continue;
            }

            if self.controller.tick_due(now) {
                self.controller.record_tick(now);
                self.safe_point(&mut summary).await?;
                self.run_tier(RunKind::Scheduled, &[], &mut summary).await?;
                self.safe_point(&mut summary).await?;
                continue;
            }

            let Some(deadline) = self.controller.next_deadline(now) else {
                break;
            };
            let wait = self.clock.wall_duration_until(deadline);
            let accepting = self.controller.accepts_preemption();

            tokio::select! {
                biased;

                changed = self.shutdown.changed(), if self.shutdown_open => {
                    match changed {
                        Ok(()) if *self.shutdown.borrow() => {
                            info!("[SCHED] Shutdown requested in {}", self.controller.phase());
                            summary.stopped_early = true;
                            break;
                        }
                        Ok(()) => {}
                        Err(_) => {
                            debug!("[SCHED] Shutdown handle dropped");
                            self.shutdown_open = false;
                        }
                    }
                }

                event = self.positions.recv(), if self.positions_open => {
                    match event {
                        Some(event) => self.handle_position(event, &mut summary)?,
                        None => {
                            debug!("[SCHED] Position feed closed");
                            self.positions_open = false;
                        }
                    }
                }

                reason = self.preemptions.recv(), if self.preemptions_open && accepting => {
                    match reason {
                        Some(reason) => {
                            let preemption = self.preemptions.coalesce(reason);
                            self.run_preempted(preemption, &mut summary).await?;
                            self.safe_point(&mut summary).await?;
                        }
                        None => {
                            debug!("[SCHED] Preemption ingress closed");
                            self.preemptions_open = false;
                        }
                    }
                }

                _ = tokio::time::sleep(wait) => {}
            }
        }

        summary.final_phase = self.controller.phase();
        summary.final_snapshot = self.allocator.snapshot()?;
        info!(
            "[SCHED] Session {} ended in {}: {} scheduled, {} preempted, {} deep, {} slots held",
            self.session_id,
            summary.final_phase,
            summary.count(RunKind::Scheduled),
            summary.count(RunKind::Preempted),
            summary.count(RunKind::Deep),
            summary.final_snapshot.len()
        );
        Ok(summary)
    }

    /// Move to the next session's calendar
    pub fn rollover(&mut self, windows: SessionWindows) -> Result<()> {
        self.controller.rollover(windows)?;
        self.session_id = Uuid::new_v4();
        Ok(())
    }

    fn observe(&mut self, now: Timestamp, summary: &mut SessionSummary) {
        if let Some(transition) = self.controller.observe(now) {
            summary.transitions.push(transition);
        }
    }

    /// Safe point: service at most one coalesced preemption
    async fn safe_point(&mut self, summary: &mut SessionSummary) -> Result<()> {
        let now = self.clock.now();
        self.observe(now, summary);
        if !self.controller.accepts_preemption() {
            return Ok(());
        }
        if let Some(preemption) = self.preemptions.try_take() {
            self.run_preempted(preemption, summary).await?;
        }
        Ok(())
    }

    async fn run_deep_scan(&mut self, now: Timestamp, summary: &mut SessionSummary) -> Result<()> {
        let phase = self.controller.phase();
        if self.controller.deep_scan_overdue() {
            warn!(
                "[SCHED] Deep scan catch-up: loop reached {} in {} after the pre-open trigger",
                now, phase
            );
            summary.deep_scan_catch_up = true;
        }

        let report = self.deep_scanner.scan().await?;
        self.controller.mark_deep_scan_complete();
        summary.shortlist = report.shortlist;
        summary.runs.push(RunRecord {
            kind: RunKind::Deep,
            phase,
            started_at: now,
            finished_at: self.clock.now(),
        });
        Ok(())
    }

    async fn run_preempted(
        &mut self,
        preemption: Preemption,
        summary: &mut SessionSummary,
    ) -> Result<()> {
        info!(
            "[SCHED] Preempted run for {} signal(s): {}",
            preemption.len(),
            preemption
                .reasons()
                .iter()
                .map(|r| r.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        );
        summary.preemption_signals += preemption.len();
        self.run_tier(RunKind::Preempted, &preemption.symbols(), summary)
            .await?;
        Ok(())
    }

    /// Refresh the admitted set's data, then re-evaluate tiers on it
    async fn run_tier(
        &mut self,
        kind: RunKind,
        extra: &[SymbolId],
        summary: &mut SessionSummary,
    ) -> Result<TierScanReport> {
        let started_at = self.clock.now();
        let phase = self.controller.phase();
        let before = self.allocator.snapshot()?;

        let cycle = self.pipeline.run_cycle().await?;
        summary.pipeline_cycles += 1;
        let stale: Vec<SymbolId> = cycle.failed.iter().map(|f| f.symbol_id.clone()).collect();
        if !stale.is_empty() {
            debug!(
                "[SCHED] Cycle {} left {} symbol(s) stale",
                cycle.cycle_id,
                stale.len()
            );
        }

        let report = self.tier_scanner.scan_with_stale(extra, &stale).await?;
        let diff = SnapshotDiff::between(&before, &self.allocator.snapshot()?);
        if !diff.is_empty() {
            debug!("[SCHED] {:?} run changed the pool: {}", kind, diff);
        }
        summary.runs.push(RunRecord {
            kind,
            phase,
            started_at,
            finished_at: self.clock.now(),
        });
        Ok(report)
    }

    fn handle_position(&mut self, event: PositionEvent, summary: &mut SessionSummary) -> Result<()> {
        summary.position_events += 1;
        match event {
            PositionEvent::Opened { symbol_id, score } => {
                match self.allocator.admit(&symbol_id, Tier::Held, score)? {
                    Admission::Rejected(_) => {
                        warn!("[SCHED] No slot for held position {}", symbol_id)
                    }
                    outcome => debug!("[SCHED] Position opened on {}: {:?}", symbol_id, outcome),
                }
            }
            PositionEvent::Closed { symbol_id } => match self.allocator.release(&symbol_id)? {
                Release::Released(slot) => {
                    info!("[SCHED] Position closed, released {} ({})", symbol_id, slot.tier)
                }
                Release::NotFound | Release::TierMismatch(_) => {
                    debug!("[SCHED] Position closed on unsubscribed {}", symbol_id)
                }
            },
        }
        Ok(())
    }
}

impl std::fmt::Debug for SessionScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionScheduler")
            .field("session_id", &self.session_id)
            .field("phase", &self.controller.phase())
            .finish()
    }
}
