//! Call lifecycle orchestration and transcript reconciliation
//!
//! The engine keeps local call records in agreement with the remote
//! conversational sessions behind them:
//! - [`Reconciler`] - the periodic sweep deciding when a call is over
//! - [`extract`] - pure transcript-to-denial-data mapping
//! - [`ClaimResolver`] - maps a finished call back to its claim
//! - [`CallTerminator`] - best-effort remote session teardown
//! - [`Dialer`] - single-flight dispatch of the next call
//!
//! The store is the single source of truth; every component reads
//! immediately before deciding and writes immediately after. Nothing
//! here caches call or claim state across sweeps.
//!
//! [`extract`]: extract::extract

pub mod dial;
pub mod extract;
pub mod prompt;
pub mod reconcile;
pub mod resolve;
pub mod terminate;

pub use dial::Dialer;
pub use reconcile::{EndCallTarget, Reconciler, SweepSummary};
pub use resolve::{ClaimResolver, ResolutionOutcome};
pub use terminate::{CallTerminator, TerminationStrategy};
