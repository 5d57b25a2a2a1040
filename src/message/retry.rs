//! Normalization attempts for newly arrived messages.
//!
//! Messages may show up before the store has decrypted them. Each eligible
//! message gets a [`RetryState`] and one or two attempt chains (see
//! `wacore::retry`); whichever chain first sees a plaintext result claims the
//! message and enqueues it.

use super::PipelineInner;
use log::debug;
use std::sync::Arc;
use std::time::Duration;
use wacore::retry::{InitialPlan, RetryState, Step};
use wacore::types::message::RawMessage;

struct InFlight {
    raw: Arc<RawMessage>,
    state: RetryState,
}

impl PipelineInner {
    pub(crate) fn on_message_added(self: &Arc<Self>, raw: Arc<RawMessage>) {
        if !raw.is_deliverable() {
            return;
        }

        let plan = self.config.retry.initial_plan(&raw);
        let flight = Arc::new(InFlight {
            raw,
            state: RetryState::new(plan),
        });

        match plan {
            InitialPlan::AwaitDecryption { poll_after } => {
                self.await_decryption(&flight);
                flight.state.start_chain();
                self.schedule_attempt(&flight, poll_after, 0);
            }
            InitialPlan::Poll { after } => {
                flight.state.start_chain();
                self.schedule_attempt(&flight, after, 0);
            }
        }
    }

    // Decryption settling, successfully or not, starts a fresh attempt chain.
    fn await_decryption(self: &Arc<Self>, flight: &Arc<InFlight>) {
        let Some(decryption) = flight.raw.decryption.as_ref() else {
            return;
        };

        match decryption.wait_decrypted() {
            Ok(Some(decrypted)) => {
                flight.state.start_chain();
                let inner = Arc::clone(self);
                let flight = Arc::clone(flight);
                self.scheduler.schedule(
                    Duration::ZERO,
                    Box::pin(async move {
                        if let Err(e) = decrypted.await {
                            debug!("Decryption of message {} failed: {e:?}", flight.raw.id);
                        }
                        inner.attempt(&flight, 0);
                    }),
                );
            }
            Ok(None) => {}
            Err(e) => {
                debug!(
                    "Could not wait on decryption of message {}: {e:?}",
                    flight.raw.id
                );
                flight.state.start_chain();
                self.schedule_attempt(flight, Duration::ZERO, 0);
            }
        }
    }

    fn schedule_attempt(self: &Arc<Self>, flight: &Arc<InFlight>, delay: Duration, attempt: u32) {
        let inner = Arc::clone(self);
        let flight = Arc::clone(flight);
        self.scheduler.schedule(
            delay,
            Box::pin(async move { inner.attempt(&flight, attempt) }),
        );
    }

    fn attempt(self: &Arc<Self>, flight: &Arc<InFlight>, attempt: u32) {
        if flight.state.is_delivered() {
            return;
        }

        let normalized = self
            .normalizer
            .normalize(&flight.raw, self.config.normalize_options);

        let step = self.config.retry.next_step(attempt, normalized.as_ref());
        match (step, normalized) {
            (Step::Deliver, Some(message)) => {
                if flight.state.claim() {
                    self.enqueue(message);
                }
            }
            (Step::RetryAfter { delay, attempt }, _) => {
                flight.state.mark_polling();
                self.schedule_attempt(flight, delay, attempt);
            }
            (Step::GiveUp, _) | (Step::Deliver, None) => {
                if flight.state.give_up_chain() {
                    debug!(
                        "Giving up on message {} after {} attempt(s)",
                        flight.raw.id,
                        attempt + 1
                    );
                }
            }
        }
    }
}
