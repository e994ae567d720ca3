//! The reconciliation sweep
//!
//! Brings local call records into agreement with remote conversation
//! state and decides when a call is definitively over. The sweep is
//! stateless and re-entrant: it is invoked on a timer or on demand,
//! processes candidates one at a time, and re-running it over an
//! already-completed, already-extracted call is a no-op.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use claimcall_config::ReconcilerConfig;
use claimcall_core::{
    completion_reason, Call, CallStatus, ClaimStore, CompletionReason, ConversationState, Error,
    ExtractedData, Result, Transcript, VoiceProvider,
};

use crate::dial::Dialer;
use crate::extract::extract;
use crate::resolve::ClaimResolver;
use crate::terminate::CallTerminator;

/// Outcome of one sweep
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SweepSummary {
    /// Candidates processed without error
    pub processed: usize,
    /// Candidates that failed and will be retried next sweep
    pub errors: usize,
    pub error_details: Vec<String>,
}

/// Target of the explicit end-call operation
#[derive(Debug, Clone)]
pub enum EndCallTarget {
    CallId(Uuid),
    ConversationId(String),
}

/// Per-sweep state threaded through the call graph.
///
/// The dispatch guard is an explicit flag here, not module state, so
/// concurrent sweep invocations stay independent: within one sweep at
/// most one new call is started no matter how many candidates
/// complete.
#[derive(Default)]
struct SweepContext {
    dispatched: bool,
}

impl SweepContext {
    /// Attempt dispatch unless this sweep already started a call.
    ///
    /// The flag is set only once a call was actually created. A
    /// declined attempt (another candidate still active, nothing
    /// eligible) leaves later completions in the same sweep free to
    /// try again; the dialer's own lock and fresh active-call read
    /// keep actual dispatches at one.
    async fn try_dispatch(&mut self, dialer: &Dialer) {
        if self.dispatched {
            return;
        }
        // Dispatch failures never fail the candidate that triggered
        // them; the next sweep gets another chance.
        match dialer.try_dispatch_next().await {
            Ok(Some(call)) => {
                self.dispatched = true;
                tracing::debug!(call_id = %call.id, "sweep started the next call");
            }
            Ok(None) => {}
            Err(e) => tracing::error!(error = %e, "failed to dispatch next call"),
        }
    }
}

pub struct Reconciler {
    store: Arc<dyn ClaimStore>,
    provider: Arc<dyn VoiceProvider>,
    config: ReconcilerConfig,
    dialer: Dialer,
    resolver: ClaimResolver,
    terminator: CallTerminator,
}

impl Reconciler {
    pub fn new(
        store: Arc<dyn ClaimStore>,
        provider: Arc<dyn VoiceProvider>,
        config: ReconcilerConfig,
    ) -> Self {
        Self {
            dialer: Dialer::new(store.clone(), provider.clone()),
            resolver: ClaimResolver::new(store.clone()),
            terminator: CallTerminator::new(provider.clone()),
            store,
            provider,
            config,
        }
    }

    fn grace(&self) -> Duration {
        Duration::seconds(self.config.grace_period_secs)
    }

    fn recent_window(&self) -> Duration {
        Duration::hours(self.config.recent_window_hours)
    }

    fn abandoned_after(&self) -> Duration {
        Duration::minutes(self.config.abandoned_after_mins)
    }

    fn max_duration(&self) -> Duration {
        Duration::hours(self.config.max_call_duration_hours)
    }

    /// Run one reconciliation sweep.
    ///
    /// Per-candidate failures are caught at the candidate boundary,
    /// counted and reported in the summary; they never abort the rest
    /// of the sweep. The sweep closes with a next-call check so a
    /// system with no calls in flight can still dispatch.
    pub async fn run_sweep(&self) -> SweepSummary {
        let now = Utc::now();
        let mut summary = SweepSummary::default();

        let candidates = match self
            .store
            .reconciliation_candidates(now, self.grace(), self.recent_window())
            .await
        {
            Ok(candidates) => candidates,
            Err(e) => {
                tracing::error!(error = %e, "could not load reconciliation candidates");
                summary.errors = 1;
                summary.error_details.push(format!("candidate query: {e}"));
                return summary;
            }
        };

        tracing::debug!(candidates = candidates.len(), "starting reconciliation sweep");
        let mut ctx = SweepContext::default();

        for call in candidates {
            let call_id = call.id;
            match self.reconcile_call(call, now, &mut ctx).await {
                Ok(()) => summary.processed += 1,
                Err(e) => {
                    if e.is_transient() {
                        tracing::debug!(call_id = %call_id, error = %e, "candidate deferred to next sweep");
                    } else {
                        tracing::warn!(call_id = %call_id, error = %e, "candidate failed this sweep");
                    }
                    summary.errors += 1;
                    summary.error_details.push(format!("call {call_id}: {e}"));
                }
            }
        }

        // An idle line with an eligible claim still gets its call,
        // even when no candidate completed this sweep.
        ctx.try_dispatch(&self.dialer).await;

        tracing::info!(
            processed = summary.processed,
            errors = summary.errors,
            "reconciliation sweep finished"
        );
        summary
    }

    async fn reconcile_call(
        &self,
        mut call: Call,
        now: DateTime<Utc>,
        ctx: &mut SweepContext,
    ) -> Result<()> {
        let age = now - call.started_at;

        let Some(conversation_id) = call.conversation_id.clone() else {
            // Without a conversation id the call can never be
            // reconciled remotely; past the threshold it is abandoned.
            if call.is_active() && age >= self.abandoned_after() {
                call.mark_completed(now);
                self.store.update_call(&call).await?;
                tracing::info!(
                    call_id = %call.id,
                    reason = ?CompletionReason::NoConversationId,
                    "force-completed call"
                );
                ctx.try_dispatch(&self.dialer).await;
            }
            return Ok(());
        };

        // Safety valve against stuck state, applied before the remote
        // fetch so a wedged provider cannot keep the call alive.
        if call.is_active() && age >= self.max_duration() {
            self.terminator.terminate(&conversation_id, call.call_sid.as_deref()).await;
            call.mark_completed(now);
            self.store.update_call(&call).await?;
            tracing::info!(
                call_id = %call.id,
                reason = ?CompletionReason::MaxDurationExceeded,
                "force-completed call"
            );
            ctx.try_dispatch(&self.dialer).await;
        }

        // A failed fetch skips the candidate with no local write;
        // absence of conversation data is not "call ended".
        let state = self.provider.fetch_conversation(&conversation_id).await?;

        let locally_completed = call.status == CallStatus::Completed;
        let Some(reason) = completion_reason(locally_completed, &state) else {
            if call.status == CallStatus::Initiated && state.has_activity() {
                call.status = CallStatus::InProgress;
                self.store.update_call(&call).await?;
                tracing::debug!(call_id = %call.id, "promoted call to in_progress");
            }
            return Ok(());
        };

        if call.is_active() {
            call.mark_completed(state.ended_at.unwrap_or(now));
            self.store.update_call(&call).await?;
            tracing::info!(call_id = %call.id, reason = ?reason, "marked call completed");
            // The next call starts before transcript processing so the
            // line is not idle while we parse.
            ctx.try_dispatch(&self.dialer).await;
        }

        if call.needs_extraction() {
            self.apply_transcript(&mut call, state).await?;
        }
        Ok(())
    }

    /// Extract denial data out of the fetched state and apply it to
    /// the resolved claim, persisting transcript and extraction on the
    /// call either way.
    ///
    /// An empty transcript gets exactly one delayed retry fetch before
    /// failing as not-yet-available.
    async fn apply_transcript(
        &self,
        call: &mut Call,
        state: ConversationState,
    ) -> Result<ExtractedData> {
        let state = if state.turns.is_empty() {
            let conversation_id = call
                .conversation_id
                .as_deref()
                .ok_or_else(|| Error::TranscriptNotReady("<no conversation>".to_string()))?;
            tokio::time::sleep(StdDuration::from_secs(self.config.transcript_retry_delay_secs))
                .await;
            let retried = self.provider.fetch_conversation(conversation_id).await?;
            if retried.turns.is_empty() {
                return Err(Error::TranscriptNotReady(conversation_id.to_string()));
            }
            retried
        } else {
            state
        };

        let transcript = Transcript::new(state.turns);
        let extracted = extract(&transcript);

        call.transcript = Some(transcript);
        call.extracted_data = Some(extracted.clone());
        // Claim resolution is recoverable; transcript and extraction
        // are persisted even when no claim matches.
        self.resolver.apply_extraction(call, &extracted).await?;
        self.store.update_call(call).await?;

        Ok(extracted)
    }

    /// Explicit transcript-processing operation: fetch the
    /// conversation, extract, resolve and persist.
    pub async fn process_transcript(
        &self,
        conversation_id: &str,
        call_id: Option<Uuid>,
    ) -> Result<ExtractedData> {
        let mut call = self.locate_call(call_id, Some(conversation_id)).await?;
        let state = self.provider.fetch_conversation(conversation_id).await?;
        self.apply_transcript(&mut call, state).await
    }

    /// Explicit end-call operation: best-effort remote teardown, local
    /// completion, then the next-call check.
    ///
    /// Idempotent; ending an already-completed call re-applies the
    /// same terminal state, so this can race harmlessly with a sweep.
    pub async fn end_call(&self, target: EndCallTarget) -> Result<Call> {
        let mut call = match &target {
            EndCallTarget::CallId(id) => self.locate_call(Some(*id), None).await?,
            EndCallTarget::ConversationId(conversation_id) => {
                self.locate_call(None, Some(conversation_id)).await?
            }
        };

        if let Some(conversation_id) = call.conversation_id.clone() {
            self.terminator.terminate(&conversation_id, call.call_sid.as_deref()).await;
        }

        call.mark_completed(Utc::now());
        self.store.update_call(&call).await?;
        tracing::info!(call_id = %call.id, "call ended by explicit request");

        if let Err(e) = self.dialer.try_dispatch_next().await {
            tracing::error!(error = %e, "failed to dispatch next call after end-call");
        }
        Ok(call)
    }

    /// Find a call by id, falling back to its conversation id.
    async fn locate_call(
        &self,
        call_id: Option<Uuid>,
        conversation_id: Option<&str>,
    ) -> Result<Call> {
        if let Some(id) = call_id {
            if let Some(call) = self.store.get_call(id).await? {
                return Ok(call);
            }
        }
        if let Some(conversation_id) = conversation_id {
            if let Some(call) = self.store.get_call_by_conversation(conversation_id).await? {
                return Ok(call);
            }
            return Err(Error::not_found("call", conversation_id));
        }
        Err(Error::not_found(
            "call",
            call_id.map(|id| id.to_string()).unwrap_or_default(),
        ))
    }
}
