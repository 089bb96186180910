//! # tally-worker
//!
//! The consumer side of Tally and the producer-side dispatcher.
//!
//! - [`Dispatcher`] hands events to the store or the queue and never fails
//!   the caller.
//! - [`Worker`] drains the queue into a batch and flushes it on size or
//!   interval, writing failed batches to the [`RescueStore`].
//! - [`Recovery`] re-inserts rescued batches; [`prune()`] enforces retention.
//! - [`signal::watch_for_shutdown`] turns SIGINT/SIGTERM/SIGQUIT into a
//!   graceful drain.

pub mod dispatcher;
pub mod error;
pub mod policy;
pub mod prune;
pub mod recovery;
pub mod rescue;
pub mod signal;
pub mod worker;

#[cfg(test)]
mod test_support;

pub use dispatcher::{DispatchOutcome, Dispatcher};
pub use error::WorkerError;
pub use policy::{FlushPolicy, FlushTrigger};
pub use prune::{prune, prune_at};
pub use recovery::Recovery;
pub use rescue::RescueStore;
pub use worker::{FlushOutcome, Worker, WorkerPhase, WorkerSettings, WorkerState};
