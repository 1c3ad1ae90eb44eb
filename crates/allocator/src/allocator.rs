//! Slot Allocator
//!
//! Single-lock owner of the capacity pool. Every mutation and every snapshot
//! happens under the same `parking_lot::Mutex`, which is never held across an
//! `.await`, so allocator operations are totally ordered for all callers.

use argus_core::{LogicalTime, Score, Slot, SymbolId, Tier};
use log::{debug, error, info, warn};
use parking_lot::Mutex;
use std::collections::HashMap;
use tokio::sync::broadcast;

use crate::config::AllocatorConfig;
use crate::error::{AllocatorError, Result};
use crate::eviction::{EvictionPolicy, RankedEviction};

/// Why an admission was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Pool full and no occupant yields to the requesting tier
    CapacityExceeded,
}

/// Outcome of [`SlotAllocator::admit`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// A free slot was used
    Admitted,
    /// `victim` was evicted to make room
    Evicted(SymbolId),
    /// Nothing changed
    Rejected(Rejection),
    /// Already admitted at the same or a more important tier; score refreshed
    Refreshed,
    /// Already admitted at a less important tier; moved up, subscription time kept
    Upgraded { from: Tier },
}

impl Admission {
    /// Whether the symbol holds a slot after the call
    pub fn is_admitted(&self) -> bool {
        !matches!(self, Admission::Rejected(_))
    }
}

/// Outcome of a release
#[derive(Debug, Clone, PartialEq)]
pub enum Release {
    /// Slot freed; the removed slot is returned
    Released(Slot),
    NotFound,
    /// Conditional release refused: the symbol is currently at another tier
    TierMismatch(Tier),
}

/// Pool change notification
#[derive(Debug, Clone, PartialEq)]
pub enum AllocationEvent {
    Admitted {
        symbol_id: SymbolId,
        tier: Tier,
        score: Score,
    },
    Evicted {
        victim: Slot,
        by: SymbolId,
    },
    Upgraded {
        symbol_id: SymbolId,
        from: Tier,
        to: Tier,
    },
    Released {
        slot: Slot,
    },
    Rejected {
        symbol_id: SymbolId,
        tier: Tier,
    },
}

#[derive(Debug, Default)]
struct PoolState {
    slots: HashMap<SymbolId, Slot>,
    clock: LogicalTime,
    halted: Option<String>,
}

impl PoolState {
    fn tick(&mut self) -> LogicalTime {
        self.clock = self.clock.next();
        self.clock
    }

    fn verify(&self, capacity: usize) -> std::result::Result<(), String> {
        if self.slots.len() > capacity {
            return Err(format!(
                "{} slots occupied, capacity {}",
                self.slots.len(),
                capacity
            ));
        }
        if let Some((key, slot)) = self.slots.iter().find(|(k, s)| **k != s.symbol_id) {
            return Err(format!("slot for {} filed under {}", slot.symbol_id, key));
        }
        if let Some(slot) = self.slots.values().find(|s| s.subscribed_at > self.clock) {
            return Err(format!(
                "slot {} subscribed at {} after allocator clock {}",
                slot.symbol_id, slot.subscribed_at, self.clock
            ));
        }
        Ok(())
    }
}

/// Fixed-capacity, priority-tiered pool of live-subscription slots
pub struct SlotAllocator {
    capacity: usize,
    policy: Box<dyn EvictionPolicy>,
    state: Mutex<PoolState>,
    events: broadcast::Sender<AllocationEvent>,
}

impl SlotAllocator {
    /// Create an allocator with the default ranked eviction policy
    pub fn new(config: AllocatorConfig) -> Self {
        Self::with_policy(
            config.capacity,
            Box::new(RankedEviction::new(config.tie_break)),
        )
    }

    /// Create an allocator with a custom eviction policy
    pub fn with_policy(capacity: usize, policy: Box<dyn EvictionPolicy>) -> Self {
        let (events, _) = broadcast::channel(1024);
        info!(
            "[ALLOC] Pool created: capacity={}, policy={}",
            capacity,
            policy.name()
        );

        Self {
            capacity,
            policy,
            state: Mutex::new(PoolState::default()),
            events,
        }
    }

    /// Request a slot for `symbol_id` at `tier`
    pub fn admit(&self, symbol_id: &SymbolId, tier: Tier, score: Score) -> Result<Admission> {
        let mut state = self.state.lock();
        Self::ensure_running(&state)?;

        let next = state.clock.next();
        if let Some(slot) = state.slots.get_mut(symbol_id) {
            let from = slot.tier;
            let upgrade = tier.outranks(from);
            if upgrade {
                slot.tier = tier;
            }
            slot.refresh(score, next);
            state.clock = next;

            if upgrade {
                debug!("[ALLOC] Upgraded {}: {} -> {}", symbol_id, from, tier);
                self.publish(AllocationEvent::Upgraded {
                    symbol_id: symbol_id.clone(),
                    from,
                    to: tier,
                });
                return Ok(Admission::Upgraded { from });
            }
            return Ok(Admission::Refreshed);
        }

        if state.slots.len() < self.capacity {
            let now = state.tick();
            state
                .slots
                .insert(symbol_id.clone(), Slot::new(symbol_id.clone(), tier, score, now));
            self.verify(&mut state)?;

            debug!(
                "[ALLOC] Admitted {} as {} (score {:.4})",
                symbol_id, tier, score
            );
            self.publish(AllocationEvent::Admitted {
                symbol_id: symbol_id.clone(),
                tier,
                score,
            });
            return Ok(Admission::Admitted);
        }

        let occupants: Vec<Slot> = state.slots.values().cloned().collect();
        let Some(victim_id) = self.policy.select_victim(&occupants, tier) else {
            debug!(
                "[ALLOC] Rejected {} as {}: capacity {} exhausted",
                symbol_id, tier, self.capacity
            );
            self.publish(AllocationEvent::Rejected {
                symbol_id: symbol_id.clone(),
                tier,
            });
            return Ok(Admission::Rejected(Rejection::CapacityExceeded));
        };

        let removed = state.slots.remove(&victim_id);
        let Some(victim) = removed else {
            return Err(self.halt(
                &mut state,
                format!("eviction policy chose non-occupant {}", victim_id),
            ));
        };
        if !victim.tier.yields_to(tier) {
            let reason = format!(
                "eviction policy chose {} ({}) for a {} request",
                victim.symbol_id, victim.tier, tier
            );
            state.slots.insert(victim_id, victim);
            return Err(self.halt(&mut state, reason));
        }

        let now = state.tick();
        state
            .slots
            .insert(symbol_id.clone(), Slot::new(symbol_id.clone(), tier, score, now));
        self.verify(&mut state)?;

        info!(
            "[ALLOC] Evicted {} ({}, score {:.4}) for {} ({}, score {:.4})",
            victim.symbol_id, victim.tier, victim.score, symbol_id, tier, score
        );
        self.publish(AllocationEvent::Evicted {
            victim,
            by: symbol_id.clone(),
        });
        Ok(Admission::Evicted(victim_id))
    }

    /// Voluntarily free a symbol's slot
    pub fn release(&self, symbol_id: &SymbolId) -> Result<Release> {
        self.release_matching(symbol_id, None)
    }

    /// Free a symbol's slot only if it currently sits at `expected`
    ///
    /// Guards scanners against demoting a symbol whose tier changed between
    /// their read and their write.
    pub fn release_if_tier(&self, symbol_id: &SymbolId, expected: Tier) -> Result<Release> {
        self.release_matching(symbol_id, Some(expected))
    }

    fn release_matching(&self, symbol_id: &SymbolId, expected: Option<Tier>) -> Result<Release> {
        let mut state = self.state.lock();
        Self::ensure_running(&state)?;

        let current = state.slots.get(symbol_id).map(|s| s.tier);
        match current {
            None => Ok(Release::NotFound),
            Some(actual) if expected.is_some_and(|t| t != actual) => {
                Ok(Release::TierMismatch(actual))
            }
            Some(_) => {
                let removed = state.slots.remove(symbol_id);
                let Some(slot) = removed else {
                    return Err(self.halt(&mut state, format!("slot {} vanished", symbol_id)));
                };
                state.tick();
                debug!("[ALLOC] Released {} ({})", slot.symbol_id, slot.tier);
                self.publish(AllocationEvent::Released { slot: slot.clone() });
                Ok(Release::Released(slot))
            }
        }
    }

    /// Consistent copy of every occupied slot
    ///
    /// Ordered by tier (most important first), then score (highest first).
    pub fn snapshot(&self) -> Result<Vec<Slot>> {
        let mut state = self.state.lock();
        Self::ensure_running(&state)?;
        self.verify(&mut state)?;

        let mut slots: Vec<Slot> = state.slots.values().cloned().collect();
        slots.sort_by(|a, b| {
            a.tier
                .priority()
                .cmp(&b.tier.priority())
                .then_with(|| b.score.total_cmp(&a.score))
                .then_with(|| a.symbol_id.cmp(&b.symbol_id))
        });
        Ok(slots)
    }

    /// Symbols currently holding a slot (the live subscription list)
    pub fn symbols(&self) -> Result<Vec<SymbolId>> {
        Ok(self
            .snapshot()?
            .into_iter()
            .map(|slot| slot.symbol_id)
            .collect())
    }

    pub fn get(&self, symbol_id: &SymbolId) -> Option<Slot> {
        self.state.lock().slots.get(symbol_id).cloned()
    }

    pub fn tier_of(&self, symbol_id: &SymbolId) -> Option<Tier> {
        self.state.lock().slots.get(symbol_id).map(|s| s.tier)
    }

    pub fn len(&self) -> usize {
        self.state.lock().slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn free_slots(&self) -> usize {
        self.capacity.saturating_sub(self.len())
    }

    pub fn is_halted(&self) -> bool {
        self.state.lock().halted.is_some()
    }

    /// Clear the pool and any halt (external operator reset)
    pub fn reset(&self) {
        let mut state = self.state.lock();
        if let Some(reason) = state.halted.take() {
            warn!("[ALLOC] Reset after halt: {}", reason);
        }
        state.slots.clear();
        state.tick();
    }

    /// Subscribe to pool change notifications
    pub fn subscribe_events(&self) -> broadcast::Receiver<AllocationEvent> {
        self.events.subscribe()
    }

    fn ensure_running(state: &PoolState) -> Result<()> {
        match &state.halted {
            Some(reason) => Err(AllocatorError::Halted(reason.clone())),
            None => Ok(()),
        }
    }

    fn verify(&self, state: &mut PoolState) -> Result<()> {
        match state.verify(self.capacity) {
            Ok(()) => Ok(()),
            Err(reason) => Err(self.halt(state, reason)),
        }
    }

    fn halt(&self, state: &mut PoolState, reason: String) -> AllocatorError {
        error!("[ALLOC] Halting allocator: {}", reason);
        state.halted = Some(reason.clone());
        AllocatorError::InvariantViolation(reason)
    }

    fn publish(&self, event: AllocationEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}

impl std::fmt::Debug for SlotAllocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlotAllocator")
            .field("capacity", &self.capacity)
            .field("policy", &self.policy.name())
            .field("occupied", &self.len())
            .finish()
    }
}
