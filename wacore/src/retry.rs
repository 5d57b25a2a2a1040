//! Bounded retry state machine for messages that arrive undecrypted.
//!
//! A message is normalized on one or two independent attempt chains: the
//! polling chain, and (for ciphertext that exposes a decryption wait) a chain
//! started when decryption settles. Each chain has its own attempt budget.
//! The first chain to produce a plaintext result claims the message; the
//! message is exhausted once every chain has given up without a claim.

use crate::types::message::{NormalizedMessage, RawMessage};
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::time::Duration;

pub const CIPHERTEXT_RETRY_DELAY: Duration = Duration::from_millis(500);
pub const CIPHERTEXT_MAX_RETRIES: u32 = 20;
/// Store metadata for body-less messages lags behind the notification.
pub const BODYLESS_INITIAL_DELAY: Duration = Duration::from_millis(2000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub retry_delay: Duration,
    pub max_retries: u32,
    pub bodyless_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retry_delay: CIPHERTEXT_RETRY_DELAY,
            max_retries: CIPHERTEXT_MAX_RETRIES,
            bodyless_delay: BODYLESS_INITIAL_DELAY,
        }
    }
}

/// How the first attempt for a message gets scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitialPlan {
    /// Wait on the message's decryption, and independently poll after `poll_after`.
    AwaitDecryption { poll_after: Duration },
    /// Poll only, starting after `after`.
    Poll { after: Duration },
}

/// Outcome of one normalization attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Deliver,
    RetryAfter { delay: Duration, attempt: u32 },
    GiveUp,
}

impl RetryPolicy {
    pub fn initial_plan(&self, raw: &RawMessage) -> InitialPlan {
        if raw.is_ciphertext() && raw.decryption.is_some() {
            InitialPlan::AwaitDecryption {
                poll_after: self.retry_delay,
            }
        } else if raw.has_body() {
            InitialPlan::Poll {
                after: Duration::ZERO,
            }
        } else {
            InitialPlan::Poll {
                after: self.bodyless_delay,
            }
        }
    }

    /// Both a failed normalization and a still-ciphertext result are retried.
    pub fn next_step(&self, attempt: u32, normalized: Option<&NormalizedMessage>) -> Step {
        match normalized {
            Some(msg) if !msg.is_ciphertext() => Step::Deliver,
            _ if attempt < self.max_retries => Step::RetryAfter {
                delay: self.retry_delay,
                attempt: attempt + 1,
            },
            _ => Step::GiveUp,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RetryPhase {
    AwaitingDecryption = 0,
    Polling = 1,
    Delivered = 2,
    Exhausted = 3,
}

impl RetryPhase {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => RetryPhase::AwaitingDecryption,
            1 => RetryPhase::Polling,
            2 => RetryPhase::Delivered,
            _ => RetryPhase::Exhausted,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, RetryPhase::Delivered | RetryPhase::Exhausted)
    }
}

/// Shared per-message state, safe to touch from every attempt chain.
#[derive(Debug)]
pub struct RetryState {
    phase: AtomicU8,
    chains: AtomicUsize,
}

impl RetryState {
    pub fn new(plan: InitialPlan) -> Self {
        let phase = match plan {
            InitialPlan::AwaitDecryption { .. } => RetryPhase::AwaitingDecryption,
            InitialPlan::Poll { .. } => RetryPhase::Polling,
        };
        Self {
            phase: AtomicU8::new(phase as u8),
            chains: AtomicUsize::new(0),
        }
    }

    pub fn phase(&self) -> RetryPhase {
        RetryPhase::from_u8(self.phase.load(Ordering::Acquire))
    }

    pub fn is_delivered(&self) -> bool {
        self.phase() == RetryPhase::Delivered
    }

    /// Registers an attempt chain. Call before the chain's first attempt is scheduled.
    pub fn start_chain(&self) {
        self.chains.fetch_add(1, Ordering::AcqRel);
    }

    /// Records that an attempt failed and polling is now driving the message.
    pub fn mark_polling(&self) {
        let _ = self.phase.compare_exchange(
            RetryPhase::AwaitingDecryption as u8,
            RetryPhase::Polling as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    /// Claims the message for delivery. Only the first caller gets `true`.
    pub fn claim(&self) -> bool {
        self.phase
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |p| {
                (!RetryPhase::from_u8(p).is_terminal()).then_some(RetryPhase::Delivered as u8)
            })
            .is_ok()
    }

    /// Ends a chain that ran out of attempts. Returns `true` if this was the
    /// last live chain and the message is now exhausted.
    pub fn give_up_chain(&self) -> bool {
        let remaining = self
            .chains
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |c| Some(c.saturating_sub(1)))
            .map(|prev| prev.saturating_sub(1))
            .unwrap_or(0);
        if remaining > 0 {
            return false;
        }
        self.phase
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |p| {
                (!RetryPhase::from_u8(p).is_terminal()).then_some(RetryPhase::Exhausted as u8)
            })
            .is_ok()
    }
}
