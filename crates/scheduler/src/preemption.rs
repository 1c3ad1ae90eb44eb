//! Event preemption ingress
//!
//! External sources raise high-priority signals through cloneable
//! [`PreemptionSender`]s. The scheduling loop owns the single
//! [`PreemptionReceiver`] and only looks at it at safe points, so a scan in
//! progress always finishes first. Everything queued at a safe point is
//! coalesced into one out-of-band run.
//!
//! The queue is unbounded: a signal is never refused while the loop is busy,
//! and coalescing keeps the backlog to one run per safe point.

use argus_core::SymbolId;
use std::fmt;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;

use crate::error::PreemptionClosed;

/// Why an out-of-band tier scan was requested
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PreemptionReason {
    /// An order on the symbol executed
    ExecutionNotice(SymbolId),
    /// Sudden price move on the symbol
    PriceSurge(SymbolId),
    /// Operator request
    Manual,
}

impl PreemptionReason {
    pub fn symbol_id(&self) -> Option<&SymbolId> {
        match self {
            PreemptionReason::ExecutionNotice(s) | PreemptionReason::PriceSurge(s) => Some(s),
            PreemptionReason::Manual => None,
        }
    }
}

impl fmt::Display for PreemptionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PreemptionReason::ExecutionNotice(s) => write!(f, "execution on {}", s),
            PreemptionReason::PriceSurge(s) => write!(f, "price surge on {}", s),
            PreemptionReason::Manual => f.write_str("manual"),
        }
    }
}

/// All signals serviced by one preempted run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Preemption {
    reasons: Vec<PreemptionReason>,
}

impl Preemption {
    pub fn reasons(&self) -> &[PreemptionReason] {
        &self.reasons
    }

    pub fn len(&self) -> usize {
        self.reasons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reasons.is_empty()
    }

    /// Symbols named by the signals, first mention first, no repeats
    pub fn symbols(&self) -> Vec<SymbolId> {
        let mut symbols: Vec<SymbolId> = Vec::new();
        for symbol_id in self.reasons.iter().filter_map(|r| r.symbol_id()) {
            if !symbols.contains(symbol_id) {
                symbols.push(symbol_id.clone());
            }
        }
        symbols
    }
}

/// Create the preemption ingress
pub fn preemption_channel() -> (PreemptionSender, PreemptionReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (PreemptionSender { tx }, PreemptionReceiver { rx })
}

#[derive(Debug, Clone)]
pub struct PreemptionSender {
    tx: mpsc::UnboundedSender<PreemptionReason>,
}

impl PreemptionSender {
    /// Ask for an immediate tier scan
    pub async fn request(&self, reason: PreemptionReason) -> Result<(), PreemptionClosed> {
        self.try_request(reason)
    }

    /// Non-blocking variant for synchronous callers
    pub fn try_request(&self, reason: PreemptionReason) -> Result<(), PreemptionClosed> {
        self.tx.send(reason).map_err(|_| PreemptionClosed)
    }
}

#[derive(Debug)]
pub struct PreemptionReceiver {
    rx: mpsc::UnboundedReceiver<PreemptionReason>,
}

impl PreemptionReceiver {
    /// Wait for the next signal; `None` once every sender is gone
    pub async fn recv(&mut self) -> Option<PreemptionReason> {
        self.rx.recv().await
    }

    /// Fold `first` and everything already queued into one preemption
    pub fn coalesce(&mut self, first: PreemptionReason) -> Preemption {
        let mut reasons = vec![first];
        reasons.extend(self.drain());
        Preemption { reasons }
    }

    /// Take whatever is queued without waiting
    pub fn try_take(&mut self) -> Option<Preemption> {
        let reasons = self.drain();
        if reasons.is_empty() {
            None
        } else {
            Some(Preemption { reasons })
        }
    }

    fn drain(&mut self) -> Vec<PreemptionReason> {
        let mut reasons = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(reason) => reasons.push(reason),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        reasons
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_signals_coalesce() {
        let (tx, mut rx) = preemption_channel();
        let other = tx.clone();

        tx.request(PreemptionReason::PriceSurge("A".into())).await.unwrap();
        other.request(PreemptionReason::Manual).await.unwrap();
        tx.request(PreemptionReason::ExecutionNotice("B".into())).await.unwrap();
        tx.request(PreemptionReason::PriceSurge("A".into())).await.unwrap();

        let first = rx.recv().await.unwrap();
        let batch = rx.coalesce(first);

        assert_eq!(batch.len(), 4);
        assert_eq!(batch.symbols(), vec![SymbolId::from("A"), SymbolId::from("B")]);
        assert!(rx.try_take().is_none());
    }

    #[tokio::test]
    async fn test_try_take_at_safe_point() {
        let (tx, mut rx) = preemption_channel();
        assert!(rx.try_take().is_none());

        tx.try_request(PreemptionReason::Manual).unwrap();
        let batch = rx.try_take().unwrap();
        assert_eq!(batch.reasons(), &[PreemptionReason::Manual]);
        assert!(batch.symbols().is_empty());
    }

    #[test]
    fn test_backlog_keeps_every_symbol() {
        let (tx, mut rx) = preemption_channel();
        for i in 0..256 {
            tx.try_request(PreemptionReason::PriceSurge(format!("S{}", i).into()))
                .unwrap();
        }
        tx.try_request(PreemptionReason::ExecutionNotice("B".into()))
            .unwrap();

        let batch = rx.try_take().unwrap();
        assert_eq!(batch.len(), 257);
        let symbols = batch.symbols();
        assert_eq!(symbols.first(), Some(&SymbolId::from("S0")));
        assert_eq!(symbols.last(), Some(&SymbolId::from("B")));
        assert!(rx.try_take().is_none());
    }

    #[test]
    fn test_closed_receiver() {
        let (tx, rx) = preemption_channel();
        drop(rx);
        assert_eq!(tx.try_request(PreemptionReason::Manual), Err(PreemptionClosed));
    }
}
