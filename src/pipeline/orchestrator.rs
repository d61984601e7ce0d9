//! Pipeline orchestrator.
//!
//! Each identity-change event is admitted synchronously (dedup guard + generation tag) and
//! then executed as Upsert -> Lookup -> Login, each stage bounded by `stage_timeout`.
//! A run is current while its generation is the latest one handed out and the orchestrator
//! has not been shut down; stale runs stop before their next stage and never write back.

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::client::{BackendHttp, LookupClient, SessionClient, SessionLogin, UpsertClient, UserLookup, UserUpsert};
use crate::config::SyncConfig;
use crate::error::{Cause, Stage, SyncError, SyncResult};
use crate::identity::{ExternalIdentity, IdentityEvents, UpsertPayload};
use crate::session::SessionStore;

use super::diagnostics::{DiagnosticSink, RunContext};
use super::outcome::{RunOutcome, SkipReason};

const DEFAULT_STAGE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    InFlight(u64),
    Completed,
}

/// Last admitted identity and how far its run got.
#[derive(Debug)]
struct Guard {
    last: Option<UpsertPayload>,
    phase: Phase,
}

enum Admission {
    Run { payload: UpsertPayload, generation: u64 },
    Skip(SkipReason),
}

pub struct Orchestrator {
    upsert: Arc<dyn UserUpsert>,
    lookup: Arc<dyn UserLookup>,
    session: Arc<dyn SessionLogin>,
    sink: Arc<dyn DiagnosticSink>,
    stage_timeout: Duration,
    generation: AtomicU64,
    shut_down: AtomicBool,
    stop: Notify,
    guard: Mutex<Guard>,
}

impl Orchestrator {
    pub fn new(
        upsert: Arc<dyn UserUpsert>,
        lookup: Arc<dyn UserLookup>,
        session: Arc<dyn SessionLogin>,
        sink: Arc<dyn DiagnosticSink>,
    ) -> Self {
        Self {
            upsert,
            lookup,
            session,
            sink,
            stage_timeout: DEFAULT_STAGE_TIMEOUT,
            generation: AtomicU64::new(0),
            shut_down: AtomicBool::new(false),
            stop: Notify::new(),
            guard: Mutex::new(Guard { last: None, phase: Phase::Idle }),
        }
    }

    /// Wire the three HTTP clients against the configured backend.
    pub fn from_config(
        config: &SyncConfig,
        store: Arc<dyn SessionStore>,
        sink: Arc<dyn DiagnosticSink>,
    ) -> anyhow::Result<Self> {
        let http = BackendHttp::new(config)?;
        let upsert = Arc::new(UpsertClient::new(http.clone()));
        let lookup = Arc::new(LookupClient::new(http.clone()));
        let session = Arc::new(SessionClient::new(http, config.provider.clone(), store));
        Ok(Self::new(upsert, lookup, session, sink).with_stage_timeout(config.stage_timeout))
    }

    pub fn with_stage_timeout(mut self, timeout: Duration) -> Self {
        self.stage_timeout = timeout;
        self
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    /// Tear down: every in-flight run becomes stale and later events are ignored.
    pub fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return;
        }
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.stop.notify_waiters();
        info!("identity sync orchestrator shut down");
    }

    /// Handle one identity-change event to completion. Never fails; the outcome says what happened.
    pub async fn on_identity_change(&self, identity: Option<ExternalIdentity>) -> RunOutcome {
        match self.admit(identity) {
            Admission::Run { payload, generation } => self.execute(payload, generation).await,
            Admission::Skip(reason) => RunOutcome::Skipped(reason),
        }
    }

    /// Admit the event now, in call order, and run its stages on a separate task.
    pub fn spawn(self: &Arc<Self>, identity: Option<ExternalIdentity>) -> JoinHandle<RunOutcome> {
        match self.admit(identity) {
            Admission::Run { payload, generation } => {
                let this = Arc::clone(self);
                tokio::spawn(async move { this.execute(payload, generation).await })
            }
            Admission::Skip(reason) => tokio::spawn(async move { RunOutcome::Skipped(reason) }),
        }
    }

    /// Drive the orchestrator from a feed, admitting every event in publish order.
    ///
    /// Returns when the feed closes (after in-flight runs finish) or on `shutdown`
    /// (in-flight runs are aborted). Any number of loops may share one orchestrator.
    pub async fn run(self: Arc<Self>, mut events: IdentityEvents) {
        // Registered before the flag check so a shutdown in between still wakes this loop
        let stop = self.stop.notified();
        tokio::pin!(stop);
        stop.as_mut().enable();

        let mut inflight: Vec<JoinHandle<RunOutcome>> = Vec::new();
        while !self.is_shut_down() {
            tokio::select! {
                event = events.recv() => match event {
                    Some(identity) => {
                        inflight.retain(|h| !h.is_finished());
                        inflight.push(self.spawn(identity));
                    }
                    None => {
                        debug!("identity feed closed");
                        break;
                    }
                },
                _ = &mut stop => break,
            }
        }
        if self.is_shut_down() {
            for handle in inflight {
                handle.abort();
            }
            return;
        }
        for handle in inflight {
            match handle.await {
                Ok(outcome) => debug!(?outcome, "run settled"),
                Err(e) => warn!("identity sync task failed: {}", e),
            }
        }
    }

    fn admit(&self, identity: Option<ExternalIdentity>) -> Admission {
        if self.is_shut_down() {
            debug!("event ignored after shutdown");
            return Admission::Skip(SkipReason::ShutDown);
        }
        let Some(identity) = identity else {
            // Signing out invalidates whatever is in flight and forgets the last identity
            let mut guard = self.guard.lock();
            self.generation.fetch_add(1, Ordering::SeqCst);
            guard.last = None;
            guard.phase = Phase::Idle;
            debug!("signed out");
            return Admission::Skip(SkipReason::SignedOut);
        };
        let Some(payload) = UpsertPayload::for_identity(&identity) else {
            debug!(external_id = %identity.external_id, "identity has no email");
            return Admission::Skip(SkipReason::MissingEmail);
        };

        let mut guard = self.guard.lock();
        let seen = guard.last.as_ref() == Some(&payload);
        if seen && guard.phase != Phase::Idle {
            debug!(email = %payload.email, external_id = %payload.external_id, "identity unchanged; run skipped");
            return Admission::Skip(SkipReason::Duplicate);
        }
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        guard.last = Some(payload.clone());
        guard.phase = Phase::InFlight(generation);
        Admission::Run { payload, generation }
    }

    fn is_current(&self, generation: u64) -> bool {
        !self.is_shut_down() && self.generation() == generation
    }

    fn finish(&self, generation: u64) {
        let mut guard = self.guard.lock();
        if guard.phase == Phase::InFlight(generation) {
            guard.phase = Phase::Completed;
        }
    }

    async fn bounded<T, F>(&self, stage: F, on_timeout: impl FnOnce(Cause) -> SyncError) -> SyncResult<T>
    where
        F: Future<Output = SyncResult<T>>,
    {
        match tokio::time::timeout(self.stage_timeout, stage).await {
            Ok(result) => result,
            Err(_) => Err(on_timeout(Cause::timeout(self.stage_timeout))),
        }
    }

    async fn execute(&self, payload: UpsertPayload, generation: u64) -> RunOutcome {
        let ctx = RunContext {
            email: payload.email.clone(),
            external_id: payload.external_id.clone(),
            generation,
        };
        info!(email = %ctx.email, external_id = %ctx.external_id, generation, "identity sync run started");
        let outcome = self.stages(&payload, &ctx).await;
        match &outcome {
            RunOutcome::Established { email, .. } => {
                info!(email = %email, generation, "session established")
            }
            RunOutcome::Superseded { stage } => {
                debug!(email = %ctx.email, generation, stage = %stage, "stale run discarded")
            }
            _ => {}
        }
        outcome
    }

    async fn stages(&self, payload: &UpsertPayload, ctx: &RunContext) -> RunOutcome {
        let generation = ctx.generation;
        let email = payload.email.as_str();

        let upserted = self
            .bounded(self.upsert.upsert(payload), |c| SyncError::upsert(payload, c))
            .await;
        if let Err(e) = upserted {
            return self.fail(e, ctx);
        }
        if !self.is_current(generation) {
            return RunOutcome::Superseded { stage: Stage::Lookup };
        }

        let found = self
            .bounded(self.lookup.find_by_email(email), |c| SyncError::lookup(email, c))
            .await;
        if let Err(e) = found {
            return self.fail(e, ctx);
        }
        if !self.is_current(generation) {
            return RunOutcome::Superseded { stage: Stage::Login };
        }

        let credential = match self
            .bounded(self.session.login(email), |c| SyncError::login(email, c))
            .await
        {
            Ok(credential) => credential,
            Err(e) => return self.fail(e, ctx),
        };
        if !self.is_current(generation) {
            return RunOutcome::Superseded { stage: Stage::Login };
        }

        self.session.install(credential);
        self.finish(generation);
        RunOutcome::Established { email: payload.email.clone(), external_id: payload.external_id.clone() }
    }

    fn fail(&self, error: SyncError, ctx: &RunContext) -> RunOutcome {
        let stage = error.stage();
        if !self.is_current(ctx.generation) {
            debug!(email = %ctx.email, stage = %stage, "failure from stale run dropped: {}", error);
            return RunOutcome::Superseded { stage };
        }
        self.finish(ctx.generation);
        self.sink.report(stage, &error, ctx);
        RunOutcome::Failed { stage, error }
    }
}
