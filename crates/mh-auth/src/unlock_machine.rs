use crate::{
    AuthBridgeContext, AuthError, CreationStep, FailureReason, Identity, Phase, Pin,
    Result as AuthErrorResult, SubmitOutcome, UnlockState, VerificationSource, VerifyResult,
};

use chrono::Utc;
use log::{debug, info, warn};

pub type UnlockListener = Box<dyn Fn(&UnlockState) + Send + Sync>;

/// Unlock State Machine.
///
/// `SelectingIdentity → {NeedsPinCreation, NeedsPinEntry} → Verifying →
/// {Unlocked, Locked, Failed}`. Calls take `&mut self`, so at most one
/// verification can be in flight.
pub struct UnlockMachine {
    context: AuthBridgeContext,
    phase: Phase,
    listeners: Vec<UnlockListener>,
}

impl UnlockMachine {
    pub fn new(context: AuthBridgeContext) -> Self {
        Self {
            context,
            phase: Phase::SelectingIdentity,
            listeners: Vec::new(),
        }
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn context(&self) -> &AuthBridgeContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut AuthBridgeContext {
        &mut self.context
    }

    /// Register a consumer for unlock events.
    pub fn on_unlocked(&mut self, listener: impl Fn(&UnlockState) + Send + Sync + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Re-enter `Unlocked` if the context still holds a live unlock.
    pub fn resume(&mut self) -> Option<UnlockState> {
        if matches!(self.phase, Phase::Locked { .. }) {
            return None;
        }

        let state = self.context.current_unlock().cloned()?;
        self.phase = Phase::Unlocked(state.clone());
        Some(state)
    }

    /// Whether the machine is unlocked and the unlock has not expired.
    pub fn is_unlocked(&mut self) -> bool {
        if !matches!(self.phase, Phase::Unlocked(_)) {
            return false;
        }

        if self.context.current_unlock().is_none() {
            self.phase = Phase::SelectingIdentity;
            return false;
        }
        true
    }

    pub async fn select(&mut self, identity: Identity) -> AuthErrorResult<Phase> {
        let same_identity = match &self.phase {
            Phase::Locked { .. } | Phase::Verifying { .. } => {
                return Err(AuthError::invalid_transition(
                    "select an identity",
                    self.phase.name(),
                ));
            }
            Phase::Unlocked(state) => state.identity == identity,
            _ => false,
        };

        if same_identity && self.context.current_unlock().is_some() {
            return Ok(self.phase.clone());
        }

        // Identity switch or expired unlock
        self.context.clear_unlock();
        self.phase = Phase::SelectingIdentity;

        let status = self.context.verifier().lookup(identity).await?;
        let account_id = match status.account_id {
            Some(account_id) => Some(account_id),
            None if status.source == VerificationSource::LocalFallback => self
                .context
                .sessions()
                .get(identity)?
                .map(|stored| stored.account_id),
            None => None,
        };

        self.phase = if status.protected {
            Phase::NeedsPinEntry {
                identity,
                account_id,
            }
        } else {
            Phase::NeedsPinCreation {
                identity,
                account_id,
                step: CreationStep::Enter,
            }
        };

        debug!("Selected {identity}: {}", self.phase.name());
        Ok(self.phase.clone())
    }

    /// PIN entry, or the first step of PIN creation.
    ///
    /// Input is sanitized to at most 6 digits; fewer than 4 is rejected with
    /// `InvalidPin` before any backend call.
    pub async fn submit_pin(&mut self, input: &str) -> AuthErrorResult<SubmitOutcome> {
        match self.phase.clone() {
            Phase::Locked { identity } => {
                debug!("Ignoring PIN for locked out {identity}");
                Ok(SubmitOutcome::LockedOut)
            }
            Phase::Verifying { .. } => Ok(SubmitOutcome::Ignored),
            Phase::NeedsPinCreation {
                identity,
                account_id,
                step: CreationStep::Enter,
            } => {
                let first = Pin::parse(input)?;
                self.phase = Phase::NeedsPinCreation {
                    identity,
                    account_id,
                    step: CreationStep::Confirm { first },
                };
                Ok(SubmitOutcome::AwaitingConfirmation)
            }
            Phase::NeedsPinEntry {
                identity,
                account_id,
            } => {
                let pin = Pin::parse(input)?;
                self.verify_entry(identity, account_id, pin).await
            }
            other => Err(AuthError::invalid_transition("submit a PIN", other.name())),
        }
    }

    /// Second step of PIN creation.
    pub async fn confirm_pin(&mut self, input: &str) -> AuthErrorResult<SubmitOutcome> {
        let (identity, account_id, first) = match self.phase.clone() {
            Phase::NeedsPinCreation {
                identity,
                account_id,
                step: CreationStep::Confirm { first },
            } => (identity, account_id, first),
            Phase::Verifying { .. } => return Ok(SubmitOutcome::Ignored),
            other => {
                return Err(AuthError::invalid_transition("confirm a PIN", other.name()));
            }
        };

        if Pin::sanitize(input) != first.expose() {
            self.phase = Phase::NeedsPinCreation {
                identity,
                account_id,
                step: CreationStep::Enter,
            };
            return Ok(SubmitOutcome::ConfirmationMismatch);
        }

        self.phase = Phase::Verifying { identity };

        match self.create_pin(identity, account_id, &first).await {
            Ok(account_id) => Ok(self.unlock(
                identity,
                Some(account_id),
                VerificationSource::Backend,
                true,
            )),
            Err(e) => Err(self.fail(identity, e)),
        }
    }

    /// Finish a magic-link sign-in; resumes a flow that failed for lack of one.
    pub async fn complete_authentication(
        &mut self,
        token: &str,
    ) -> AuthErrorResult<Option<Identity>> {
        let identity = self.context.complete_authentication(token).await?;

        if let Phase::Failed {
            reason: FailureReason::NotAuthenticated,
            ..
        } = self.phase
        {
            self.retry().await?;
        }

        Ok(identity)
    }

    /// Leave `Failed` by re-running selection for the same identity.
    pub async fn retry(&mut self) -> AuthErrorResult<Phase> {
        let Phase::Failed { identity, .. } = self.phase else {
            return Err(AuthError::invalid_transition("retry", self.phase.name()));
        };

        self.phase = Phase::SelectingIdentity;
        self.select(identity).await
    }

    /// Drop an in-progress flow. No backend state is touched.
    pub fn abandon(&mut self) -> AuthErrorResult<()> {
        if matches!(self.phase, Phase::Locked { .. } | Phase::Unlocked(_)) {
            return Err(AuthError::invalid_transition("abandon", self.phase.name()));
        }

        self.phase = Phase::SelectingIdentity;
        Ok(())
    }

    /// The only exit from `Locked`; also the "forgot PIN" path.
    pub async fn sign_out(&mut self) -> AuthErrorResult<()> {
        let result = self.context.sign_out().await;
        self.phase = Phase::SelectingIdentity;
        result
    }

    async fn verify_entry(
        &mut self,
        identity: Identity,
        account_id: Option<String>,
        pin: Pin,
    ) -> AuthErrorResult<SubmitOutcome> {
        self.phase = Phase::Verifying { identity };

        let result = self
            .context
            .verifier()
            .verify(identity, account_id.as_deref(), &pin)
            .await;

        match result {
            Ok(VerifyResult::Correct(source)) => {
                let linked_account = self.link_backend(identity, account_id.as_deref()).await;
                let backend_linked = linked_account.is_some();
                let account_id = account_id.or(linked_account);
                Ok(self.unlock(identity, account_id, source, backend_linked))
            }
            Ok(VerifyResult::Incorrect {
                attempts,
                remaining,
            }) => {
                self.phase = Phase::NeedsPinEntry {
                    identity,
                    account_id,
                };
                Ok(SubmitOutcome::Incorrect {
                    attempts,
                    remaining,
                })
            }
            Ok(VerifyResult::LockedOut) => {
                self.phase = Phase::Locked { identity };
                Ok(SubmitOutcome::LockedOut)
            }
            Err(e) => Err(self.fail(identity, e)),
        }
    }

    async fn create_pin(
        &self,
        identity: Identity,
        account_id: Option<String>,
        pin: &Pin,
    ) -> AuthErrorResult<String> {
        let live = self
            .context
            .auth()
            .current_session()
            .await?
            .ok_or_else(|| AuthError::not_authenticated("creating a PIN requires sign-in"))?;

        let account_id = match account_id {
            Some(account_id) if account_id != live.account_id => {
                return Err(AuthError::not_authenticated(format!(
                    "signed in account does not own {identity}"
                )));
            }
            Some(account_id) => account_id,
            None => {
                self.context.claim_identity(identity).await?;
                live.account_id.clone()
            }
        };

        self.context.verifier().set(identity, &account_id, pin).await?;
        if let Err(e) = self.context.sessions().store_session(identity, &live) {
            warn!("PIN set for {identity} but its session was not stored: {e}");
        }

        Ok(account_id)
    }

    /// Make sure a backend session for `identity` is live, restoring the
    /// stored one if needed. Returns the linked account, if any.
    ///
    /// Restore failures are logged and swallowed: the unlock still succeeds.
    async fn link_backend(&self, identity: Identity, account_id: Option<&str>) -> Option<String> {
        let sessions = self.context.sessions();

        let live = match self.context.auth().current_session().await {
            Ok(live) => live,
            Err(e) => {
                debug!("No live session while unlocking {identity}: {e}");
                None
            }
        };

        if let Some(live) = live {
            let owns_identity = match account_id {
                Some(account_id) => live.account_id == account_id,
                None => {
                    sessions.identity_for_account(&live.account_id).ok().flatten()
                        == Some(identity)
                }
            };
            if owns_identity {
                return Some(live.account_id);
            }
        }

        match sessions.has_valid(identity) {
            Ok(true) => {}
            Ok(false) => return None,
            Err(e) => {
                warn!("Could not read stored session for {identity}: {e}");
                return None;
            }
        }

        match sessions.restore(identity, self.context.auth()).await {
            Ok(session) => Some(session.account_id),
            Err(e) => {
                warn!("Unlocking {identity} without a backend session: {e}");
                None
            }
        }
    }

    fn unlock(
        &mut self,
        identity: Identity,
        account_id: Option<String>,
        source: VerificationSource,
        backend_linked: bool,
    ) -> SubmitOutcome {
        let state = UnlockState {
            identity,
            account_id,
            unlocked_at: Utc::now(),
            source,
            backend_linked,
        };

        self.context.record_unlock(state.clone());
        for listener in &self.listeners {
            listener(&state);
        }

        info!("{identity} unlocked via {source:?} (backend linked: {backend_linked})");
        self.phase = Phase::Unlocked(state.clone());
        SubmitOutcome::Unlocked(state)
    }

    fn fail(&mut self, identity: Identity, error: AuthError) -> AuthError {
        let reason = FailureReason::from_error(&error);
        warn!("PIN flow for {identity} failed ({reason:?}): {error}");
        self.phase = Phase::Failed { identity, reason };
        error
    }
}
