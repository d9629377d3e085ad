use crate::tests::{
    FailingWrites, FakeBackend, fallback_settings, machine_over, machine_with, session_for,
};
use crate::{
    AuthError, BridgeSettings, CreationStep, FailureReason, Identity, Phase, Pin, SubmitOutcome,
    VerificationSource,
};

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::TimeDelta;
use googletest::assert_that;
use googletest::prelude::{anything, eq, err, none, ok, some};

// =========================================================================
// Selection
// =========================================================================

#[tokio::test]
async fn given_unprotected_identities_when_selected_then_always_creation() {
    for identity in Identity::ALL {
        // Given
        let backend = FakeBackend::new();
        let (mut machine, _store) = machine_with(&backend, BridgeSettings::default());

        // When
        let phase = machine.select(identity).await.unwrap();

        // Then
        assert!(matches!(phase, Phase::NeedsPinCreation { .. }));
        assert!(!matches!(phase, Phase::NeedsPinEntry { .. }));
    }
}

#[tokio::test]
async fn given_protected_identity_when_selected_then_entry() {
    let backend = FakeBackend::new();
    backend.with_profile("acct-peter", Identity::Peter, Some("2468"));
    let (mut machine, _store) = machine_with(&backend, BridgeSettings::default());

    let phase = machine.select(Identity::Peter).await.unwrap();

    assert_eq!(
        phase,
        Phase::NeedsPinEntry {
            identity: Identity::Peter,
            account_id: Some("acct-peter".to_string()),
        }
    );
}

#[tokio::test]
async fn given_backend_offline_without_fallback_when_selected_then_error_and_still_selecting() {
    let backend = FakeBackend::new();
    backend.set_offline(true);
    let (mut machine, _store) = machine_with(&backend, BridgeSettings::default());

    let result = machine.select(Identity::Peter).await;

    assert!(matches!(result, Err(AuthError::NetworkUnavailable { .. })));
    assert_eq!(machine.phase(), &Phase::SelectingIdentity);
}

// =========================================================================
// PIN creation
// =========================================================================

#[tokio::test]
async fn given_creation_when_short_pin_submitted_then_invalid_pin_without_backend_call() {
    // Given
    let backend = FakeBackend::new();
    backend.with_profile("acct-casi", Identity::Casi, None);
    backend.sign_in("acct-casi");
    let (mut machine, _store) = machine_with(&backend, BridgeSettings::default());
    machine.select(Identity::Casi).await.unwrap();

    // When
    let result = machine.submit_pin("12a3").await;

    // Then
    assert!(matches!(result, Err(AuthError::InvalidPin { .. })));
    assert!(matches!(
        machine.phase(),
        Phase::NeedsPinCreation {
            step: CreationStep::Enter,
            ..
        }
    ));
    assert_that!(backend.set_calls(), eq(0));
}

#[tokio::test]
async fn given_creation_when_confirmation_differs_then_back_to_entry_step() {
    // Given
    let backend = FakeBackend::new();
    backend.with_profile("acct-casi", Identity::Casi, None);
    backend.sign_in("acct-casi");
    let (mut machine, _store) = machine_with(&backend, BridgeSettings::default());
    machine.select(Identity::Casi).await.unwrap();
    machine.submit_pin("1234").await.unwrap();

    // When
    let outcome = machine.confirm_pin("4321").await.unwrap();

    // Then
    assert_eq!(outcome, SubmitOutcome::ConfirmationMismatch);
    assert_eq!(
        machine.phase(),
        &Phase::NeedsPinCreation {
            identity: Identity::Casi,
            account_id: Some("acct-casi".to_string()),
            step: CreationStep::Enter,
        }
    );
    assert_that!(backend.set_calls(), eq(0));
}

#[tokio::test]
async fn given_creation_after_mismatch_when_new_pin_confirmed_then_unlocked() {
    // Given
    let backend = FakeBackend::new();
    backend.with_profile("acct-casi", Identity::Casi, None);
    backend.sign_in("acct-casi");
    let (mut machine, _store) = machine_with(&backend, BridgeSettings::default());
    machine.select(Identity::Casi).await.unwrap();
    machine.submit_pin("1234").await.unwrap();
    machine.confirm_pin("4321").await.unwrap();

    // When
    machine.submit_pin("5678").await.unwrap();
    let outcome = machine.confirm_pin("5678").await.unwrap();

    // Then
    assert!(matches!(outcome, SubmitOutcome::Unlocked(_)));
    assert_eq!(
        backend.last_set(),
        Some(("acct-casi".to_string(), "5678".to_string()))
    );
}

#[tokio::test]
async fn given_confirmation_with_separators_when_confirmed_then_matches_sanitized() {
    let backend = FakeBackend::new();
    backend.with_profile("acct-casi", Identity::Casi, None);
    backend.sign_in("acct-casi");
    let (mut machine, _store) = machine_with(&backend, BridgeSettings::default());
    machine.select(Identity::Casi).await.unwrap();
    machine.submit_pin("1234").await.unwrap();

    let outcome = machine.confirm_pin("12-34").await.unwrap();

    assert!(matches!(outcome, SubmitOutcome::Unlocked(_)));
}

#[tokio::test]
async fn given_creation_without_backend_session_when_confirmed_then_failed_not_authenticated() {
    // Given
    let backend = FakeBackend::new();
    backend.with_profile("acct-casi", Identity::Casi, None);
    let (mut machine, _store) = machine_with(&backend, BridgeSettings::default());
    machine.select(Identity::Casi).await.unwrap();
    machine.submit_pin("1234").await.unwrap();

    // When
    let result = machine.confirm_pin("1234").await;

    // Then
    assert!(matches!(result, Err(AuthError::NotAuthenticated { .. })));
    assert_eq!(
        machine.phase(),
        &Phase::Failed {
            identity: Identity::Casi,
            reason: FailureReason::NotAuthenticated,
        }
    );
    assert_that!(backend.set_calls(), eq(0));
}

#[tokio::test]
async fn given_session_lost_before_confirmation_when_fallback_enabled_then_pin_not_cached() {
    // Given
    let backend = FakeBackend::new();
    backend.with_profile("acct-casi", Identity::Casi, None);
    backend.sign_in("acct-casi");
    let (mut machine, _store) = machine_with(&backend, fallback_settings());
    machine.select(Identity::Casi).await.unwrap();
    machine.submit_pin("1234").await.unwrap();
    backend.drop_session();

    // When
    let result = machine.confirm_pin("1234").await;

    // Then
    assert!(matches!(result, Err(AuthError::NotAuthenticated { .. })));
    assert_that!(backend.set_calls(), eq(0));
    assert!(!machine.context().verifier().cache().contains(Identity::Casi).unwrap());
}

#[tokio::test]
async fn given_failed_not_authenticated_when_magic_link_completed_then_flow_resumes() {
    // Given
    let backend = FakeBackend::new();
    backend.with_profile("acct-casi", Identity::Casi, None);
    let (mut machine, _store) = machine_with(&backend, BridgeSettings::default());
    machine.select(Identity::Casi).await.unwrap();
    machine.submit_pin("1234").await.unwrap();
    let _ = machine.confirm_pin("1234").await;

    // When
    let identity = machine.complete_authentication("link-acct-casi").await.unwrap();

    // Then
    assert_eq!(identity, Some(Identity::Casi));
    assert!(matches!(
        machine.phase(),
        Phase::NeedsPinCreation {
            step: CreationStep::Enter,
            ..
        }
    ));
    machine.submit_pin("1234").await.unwrap();
    let outcome = machine.confirm_pin("1234").await.unwrap();
    assert!(matches!(outcome, SubmitOutcome::Unlocked(_)));
}

#[tokio::test]
async fn given_unclaimed_identity_when_pin_created_then_identity_claimed_and_session_stored() {
    // Given
    let backend = FakeBackend::new();
    backend.sign_in("acct-new");
    let (mut machine, _store) = machine_with(&backend, BridgeSettings::default());
    machine.select(Identity::Delphine).await.unwrap();
    machine.submit_pin("9999").await.unwrap();

    // When
    let outcome = machine.confirm_pin("9999").await.unwrap();

    // Then
    let SubmitOutcome::Unlocked(state) = outcome else {
        panic!("expected unlock");
    };
    assert_eq!(state.account_id.as_deref(), Some("acct-new"));
    assert!(state.backend_linked);
    assert_that!(backend.claim_calls(), eq(1));
    assert!(
        machine
            .context()
            .sessions()
            .has_valid(Identity::Delphine)
            .unwrap()
    );
}

#[tokio::test]
async fn given_identity_taken_meanwhile_when_pin_created_then_failed_identity_taken() {
    // Given: Delphine looked unclaimed at selection, then another account took it
    let backend = FakeBackend::new();
    backend.sign_in("acct-late");
    let (mut machine, _store) = machine_with(&backend, BridgeSettings::default());
    machine.select(Identity::Delphine).await.unwrap();
    machine.submit_pin("9999").await.unwrap();
    backend.with_profile("acct-first", Identity::Delphine, None);

    // When
    let result = machine.confirm_pin("9999").await;

    // Then
    assert!(matches!(result, Err(AuthError::IdentityTaken { .. })));
    assert!(matches!(
        machine.phase(),
        Phase::Failed {
            reason: FailureReason::IdentityTaken,
            ..
        }
    ));
    assert_that!(backend.set_calls(), eq(0));
}

#[tokio::test]
async fn given_session_for_other_account_when_pin_created_then_not_authenticated() {
    let backend = FakeBackend::new();
    backend.with_profile("acct-casi", Identity::Casi, None);
    backend.sign_in("acct-peter");
    let (mut machine, _store) = machine_with(&backend, BridgeSettings::default());
    machine.select(Identity::Casi).await.unwrap();
    machine.submit_pin("1234").await.unwrap();

    let result = machine.confirm_pin("1234").await;

    assert!(matches!(result, Err(AuthError::NotAuthenticated { .. })));
    assert_that!(backend.set_calls(), eq(0));
}

#[tokio::test]
async fn given_entry_phase_when_confirm_called_then_invalid_transition() {
    let backend = FakeBackend::new();
    backend.with_profile("acct-peter", Identity::Peter, Some("2468"));
    let (mut machine, _store) = machine_with(&backend, BridgeSettings::default());
    machine.select(Identity::Peter).await.unwrap();

    let result = machine.confirm_pin("2468").await;

    assert!(matches!(result, Err(AuthError::InvalidTransition { .. })));
}

// =========================================================================
// PIN entry
// =========================================================================

#[tokio::test]
async fn given_live_session_when_correct_pin_then_unlocked_without_restore() {
    // Given
    let backend = FakeBackend::new();
    backend.with_profile("acct-peter", Identity::Peter, Some("2468"));
    backend.sign_in("acct-peter");
    let (mut machine, _store) = machine_with(&backend, BridgeSettings::default());
    machine.select(Identity::Peter).await.unwrap();

    // When
    let outcome = machine.submit_pin("2468").await.unwrap();

    // Then
    let SubmitOutcome::Unlocked(state) = outcome else {
        panic!("expected unlock");
    };
    assert_eq!(state.source, VerificationSource::Backend);
    assert!(state.backend_linked);
    assert_that!(backend.refresh_calls(), eq(0));
    assert!(machine.is_unlocked());
}

#[tokio::test]
async fn given_local_fallback_without_stored_session_when_correct_pin_then_unlocked_unlinked() {
    // Given
    let backend = FakeBackend::new();
    backend.with_profile("acct-peter", Identity::Peter, Some("2468"));
    let (mut machine, _store) = machine_with(&backend, fallback_settings());
    machine
        .context()
        .verifier()
        .cache()
        .remember(Identity::Peter, &crate::Pin::parse("2468").unwrap())
        .unwrap();
    machine.select(Identity::Peter).await.unwrap();

    // When
    let outcome = machine.submit_pin("2468").await.unwrap();

    // Then
    let SubmitOutcome::Unlocked(state) = outcome else {
        panic!("expected unlock");
    };
    assert_eq!(state.source, VerificationSource::LocalFallback);
    assert!(!state.backend_linked);
}

#[tokio::test]
async fn given_entry_when_short_pin_submitted_then_invalid_pin_without_backend_call() {
    // Given
    let backend = FakeBackend::new();
    backend.with_profile("acct-peter", Identity::Peter, Some("2468"));
    backend.sign_in("acct-peter");
    let (mut machine, _store) = machine_with(&backend, BridgeSettings::default());
    machine.select(Identity::Peter).await.unwrap();

    // When
    let result = machine.submit_pin("1a2").await;

    // Then
    assert!(matches!(result, Err(AuthError::InvalidPin { .. })));
    assert_that!(backend.verify_calls(), eq(0));
    assert_that!(
        machine.context().verifier().attempts().failures(Identity::Peter),
        eq(0)
    );
    assert!(matches!(machine.phase(), Phase::NeedsPinEntry { .. }));
}

#[tokio::test]
async fn given_fallback_without_cached_pin_when_correct_pin_then_not_authenticated_without_penalty() {
    // Given
    let backend = FakeBackend::new();
    backend.with_profile("acct-peter", Identity::Peter, Some("2468"));
    let (mut machine, _store) = machine_with(&backend, fallback_settings());
    machine
        .context()
        .sessions()
        .store_session(Identity::Peter, &session_for("acct-peter", TimeDelta::days(7)))
        .unwrap();
    machine.select(Identity::Peter).await.unwrap();

    // When
    let mut results = Vec::new();
    for _ in 0..5 {
        results.push(machine.submit_pin("2468").await);
        if matches!(machine.phase(), Phase::Failed { .. }) {
            machine.retry().await.unwrap();
        }
    }

    // Then
    assert!(
        results
            .iter()
            .all(|result| matches!(result, Err(AuthError::NotAuthenticated { .. })))
    );
    assert_that!(
        machine.context().verifier().attempts().failures(Identity::Peter),
        eq(0)
    );
    assert!(!matches!(machine.phase(), Phase::Locked { .. }));
    assert_that!(backend.refresh_calls(), eq(0));
    assert_that!(
        machine.context().sessions().get(Identity::Peter).unwrap(),
        some(anything())
    );
}

#[tokio::test]
async fn given_fallback_without_cached_pin_when_submitted_then_failed_not_authenticated() {
    // Given
    let backend = FakeBackend::new();
    backend.with_profile("acct-peter", Identity::Peter, Some("2468"));
    let (mut machine, _store) = machine_with(&backend, fallback_settings());
    machine.select(Identity::Peter).await.unwrap();

    // When
    let result = machine.submit_pin("2468").await;

    // Then
    assert!(matches!(result, Err(AuthError::NotAuthenticated { .. })));
    assert_eq!(
        machine.phase(),
        &Phase::Failed {
            identity: Identity::Peter,
            reason: FailureReason::NotAuthenticated,
        }
    );
}

#[tokio::test]
async fn given_stored_session_when_pin_wrong_then_credential_not_used_until_correct() {
    // Given
    let backend = FakeBackend::new();
    backend.with_profile("acct-peter", Identity::Peter, Some("2468"));
    let (mut machine, _store) = machine_with(&backend, fallback_settings());
    let context = machine.context();
    context
        .sessions()
        .store_session(Identity::Peter, &session_for("acct-peter", TimeDelta::days(7)))
        .unwrap();
    context
        .verifier()
        .cache()
        .remember(Identity::Peter, &Pin::parse("2468").unwrap())
        .unwrap();

    // When
    machine.select(Identity::Peter).await.unwrap();
    let wrong = machine.submit_pin("1111").await.unwrap();

    // Then
    assert!(matches!(wrong, SubmitOutcome::Incorrect { .. }));
    assert_that!(backend.refresh_calls(), eq(0));
    assert_that!(backend.live_account(), none());

    // When
    let outcome = machine.submit_pin("2468").await.unwrap();

    // Then
    assert!(matches!(outcome, SubmitOutcome::Unlocked(ref state) if state.backend_linked));
    assert_that!(backend.refresh_calls(), eq(1));
    assert_eq!(backend.live_account().as_deref(), Some("acct-peter"));
}

#[tokio::test]
async fn given_revoked_stored_session_when_correct_pin_then_unlocked_and_restore_failure_swallowed() {
    // Given
    let backend = FakeBackend::new();
    backend.with_profile("acct-peter", Identity::Peter, Some("2468"));
    backend.set_refresh(crate::tests::RefreshBehavior::Reject);
    let (mut machine, _store) = machine_with(&backend, fallback_settings());
    let context = machine.context();
    context
        .sessions()
        .store_session(Identity::Peter, &session_for("acct-peter", TimeDelta::hours(1)))
        .unwrap();
    context
        .verifier()
        .cache()
        .remember(Identity::Peter, &crate::Pin::parse("2468").unwrap())
        .unwrap();
    machine.select(Identity::Peter).await.unwrap();

    // When
    let result = machine.submit_pin("2468").await;

    // Then
    assert_that!(result, ok(anything()));
    assert!(matches!(machine.phase(), Phase::Unlocked(state) if !state.backend_linked));
    assert_that!(backend.refresh_calls(), eq(1));
    assert_that!(
        machine.context().sessions().get(Identity::Peter).unwrap(),
        none()
    );
}

#[tokio::test]
async fn given_entry_when_backend_errors_then_failed_and_retry_returns_to_entry() {
    // Given
    let backend = FakeBackend::new();
    backend.with_profile("acct-peter", Identity::Peter, Some("2468"));
    backend.sign_in("acct-peter");
    let (mut machine, _store) = machine_with(&backend, BridgeSettings::default());
    machine.select(Identity::Peter).await.unwrap();
    backend.set_offline(true);

    // When
    let result = machine.submit_pin("2468").await;

    // Then
    assert_that!(result, err(anything()));
    assert!(matches!(
        machine.phase(),
        Phase::Failed {
            reason: FailureReason::NetworkUnavailable,
            ..
        }
    ));

    backend.set_offline(false);
    let phase = machine.retry().await.unwrap();
    assert!(matches!(phase, Phase::NeedsPinEntry { .. }));
}

#[tokio::test]
async fn given_not_failed_when_retry_then_invalid_transition() {
    let backend = FakeBackend::new();
    let (mut machine, _store) = machine_with(&backend, BridgeSettings::default());

    let result = machine.retry().await;

    assert!(matches!(result, Err(AuthError::InvalidTransition { .. })));
}

// =========================================================================
// Lockout and sign-out
// =========================================================================

#[tokio::test]
async fn given_locked_when_identity_selected_then_rejected() {
    // Given
    let backend = FakeBackend::new();
    backend.with_profile("acct-peter", Identity::Peter, Some("2468"));
    backend.sign_in("acct-peter");
    let (mut machine, _store) = machine_with(&backend, BridgeSettings::default());
    machine.select(Identity::Peter).await.unwrap();
    for _ in 0..5 {
        machine.submit_pin("0000").await.unwrap();
    }

    // When
    let select = machine.select(Identity::Casi).await;
    let abandon = machine.abandon();

    // Then
    assert!(matches!(select, Err(AuthError::InvalidTransition { .. })));
    assert_that!(abandon, err(anything()));
    assert_eq!(
        machine.phase(),
        &Phase::Locked {
            identity: Identity::Peter
        }
    );
}

#[tokio::test]
async fn given_backend_reported_lockout_when_pin_submitted_then_locked() {
    let backend = FakeBackend::new();
    backend.with_profile("acct-peter", Identity::Peter, Some("2468"));
    backend.lock_out_on_server("acct-peter");
    backend.sign_in("acct-peter");
    let (mut machine, _store) = machine_with(&backend, BridgeSettings::default());
    machine.select(Identity::Peter).await.unwrap();

    let outcome = machine.submit_pin("2468").await.unwrap();

    assert_eq!(outcome, SubmitOutcome::LockedOut);
    assert!(matches!(machine.phase(), Phase::Locked { .. }));
}

#[tokio::test]
async fn given_locked_when_signed_out_then_selecting_and_state_cleared() {
    // Given
    let backend = FakeBackend::new();
    backend.with_profile("acct-peter", Identity::Peter, Some("2468"));
    backend.sign_in("acct-peter");
    let (mut machine, _store) = machine_with(&backend, fallback_settings());
    machine
        .context()
        .sessions()
        .store_session(Identity::Peter, &session_for("acct-peter", TimeDelta::hours(1)))
        .unwrap();
    machine.select(Identity::Peter).await.unwrap();
    for _ in 0..5 {
        machine.submit_pin("0000").await.unwrap();
    }

    // When
    machine.sign_out().await.unwrap();

    // Then
    assert_eq!(machine.phase(), &Phase::SelectingIdentity);
    let context = machine.context();
    assert!(!context.sessions().has_valid(Identity::Peter).unwrap());
    assert!(!context.verifier().attempts().is_locked(Identity::Peter));
    assert!(!context.verifier().cache().contains(Identity::Peter).unwrap());
    assert_that!(backend.sign_out_calls(), eq(1));
    assert_that!(backend.live_account(), none());
}

#[tokio::test]
async fn given_entry_when_abandoned_then_selecting_without_backend_changes() {
    let backend = FakeBackend::new();
    backend.with_profile("acct-peter", Identity::Peter, Some("2468"));
    backend.sign_in("acct-peter");
    let (mut machine, _store) = machine_with(&backend, BridgeSettings::default());
    machine.select(Identity::Peter).await.unwrap();

    machine.abandon().unwrap();

    assert_eq!(machine.phase(), &Phase::SelectingIdentity);
    assert_that!(backend.verify_calls(), eq(0));
    assert_that!(backend.sign_out_calls(), eq(0));
}

#[tokio::test]
async fn given_failures_when_abandoned_and_reselected_then_counter_kept() {
    // Given
    let backend = FakeBackend::new();
    backend.with_profile("acct-peter", Identity::Peter, Some("2468"));
    backend.sign_in("acct-peter");
    let (mut machine, _store) = machine_with(&backend, BridgeSettings::default());
    machine.select(Identity::Peter).await.unwrap();
    machine.submit_pin("0000").await.unwrap();
    machine.submit_pin("0000").await.unwrap();
    machine.abandon().unwrap();
    machine.select(Identity::Peter).await.unwrap();

    // When
    let outcome = machine.submit_pin("0000").await.unwrap();

    // Then
    assert_eq!(
        outcome,
        SubmitOutcome::Incorrect {
            attempts: 3,
            remaining: 2
        }
    );
}

// =========================================================================
// In-flight verification
// =========================================================================

#[tokio::test]
async fn given_verification_abandoned_by_caller_when_pin_submitted_again_then_ignored() {
    // Given
    let backend = FakeBackend::new();
    backend.with_profile("acct-peter", Identity::Peter, Some("2468"));
    backend.sign_in("acct-peter");
    backend.set_verify_delay(Duration::from_secs(5));
    let (mut machine, _store) = machine_with(&backend, BridgeSettings::default());
    machine.select(Identity::Peter).await.unwrap();

    // When: the caller times out the in-flight verification
    let timed_out =
        tokio::time::timeout(Duration::from_millis(20), machine.submit_pin("2468")).await;

    // Then
    assert_that!(timed_out, err(anything()));
    assert!(matches!(machine.phase(), Phase::Verifying { .. }));

    let outcome = machine.submit_pin("2468").await.unwrap();
    assert_eq!(outcome, SubmitOutcome::Ignored);
    assert_that!(backend.verify_calls(), eq(1));

    machine.abandon().unwrap();
    assert_eq!(machine.phase(), &Phase::SelectingIdentity);
}

// =========================================================================
// Unlock lifetime
// =========================================================================

#[tokio::test]
async fn given_unlock_when_listener_registered_then_notified_once() {
    // Given
    let backend = FakeBackend::new();
    backend.with_profile("acct-peter", Identity::Peter, Some("2468"));
    backend.sign_in("acct-peter");
    let (mut machine, _store) = machine_with(&backend, BridgeSettings::default());
    let notified = Arc::new(AtomicUsize::new(0));
    let seen = Arc::new(Mutex::new(None));
    {
        let notified = Arc::clone(&notified);
        let seen = Arc::clone(&seen);
        machine.on_unlocked(move |state| {
            notified.fetch_add(1, Ordering::SeqCst);
            *seen.lock().unwrap() = Some(state.identity);
        });
    }
    machine.select(Identity::Peter).await.unwrap();

    // When
    machine.submit_pin("2468").await.unwrap();

    // Then
    assert_that!(notified.load(Ordering::SeqCst), eq(1));
    assert_eq!(*seen.lock().unwrap(), Some(Identity::Peter));
}

#[tokio::test]
async fn given_unlocked_when_same_identity_selected_then_stays_unlocked() {
    let backend = FakeBackend::new();
    backend.with_profile("acct-peter", Identity::Peter, Some("2468"));
    backend.sign_in("acct-peter");
    let (mut machine, _store) = machine_with(&backend, BridgeSettings::default());
    machine.select(Identity::Peter).await.unwrap();
    machine.submit_pin("2468").await.unwrap();

    let phase = machine.select(Identity::Peter).await.unwrap();

    assert!(matches!(phase, Phase::Unlocked(_)));
    assert_that!(backend.verify_calls(), eq(1));
}

#[tokio::test]
async fn given_unlocked_when_other_identity_selected_then_unlock_cleared() {
    // Given
    let backend = FakeBackend::new();
    backend.with_profile("acct-peter", Identity::Peter, Some("2468"));
    backend.with_profile("acct-casi", Identity::Casi, Some("1357"));
    backend.sign_in("acct-peter");
    let (mut machine, _store) = machine_with(&backend, BridgeSettings::default());
    machine.select(Identity::Peter).await.unwrap();
    machine.submit_pin("2468").await.unwrap();

    // When
    let phase = machine.select(Identity::Casi).await.unwrap();

    // Then
    assert!(matches!(phase, Phase::NeedsPinEntry { .. }));
    assert_that!(machine.context_mut().current_unlock(), none());
    assert_that!(machine.resume(), none());
}

#[tokio::test]
async fn given_zero_ttl_when_unlocked_then_expires_immediately() {
    // Given
    let backend = FakeBackend::new();
    backend.with_profile("acct-peter", Identity::Peter, Some("2468"));
    backend.sign_in("acct-peter");
    let settings = BridgeSettings {
        unlock_ttl: TimeDelta::zero(),
        ..BridgeSettings::default()
    };
    let (mut machine, _store) = machine_with(&backend, settings);
    machine.select(Identity::Peter).await.unwrap();
    machine.submit_pin("2468").await.unwrap();

    // When
    let unlocked = machine.is_unlocked();

    // Then
    assert!(!unlocked);
    assert_eq!(machine.phase(), &Phase::SelectingIdentity);
}

#[tokio::test]
async fn given_live_unlock_when_resumed_then_unlocked_phase() {
    let backend = FakeBackend::new();
    backend.with_profile("acct-peter", Identity::Peter, Some("2468"));
    backend.sign_in("acct-peter");
    let (mut machine, _store) = machine_with(&backend, BridgeSettings::default());
    machine.select(Identity::Peter).await.unwrap();
    machine.submit_pin("2468").await.unwrap();
    machine.abandon().unwrap_err();

    let resumed = machine.resume();

    assert_that!(resumed, some(anything()));
    assert!(matches!(machine.phase(), Phase::Unlocked(_)));
}

// =========================================================================
// Local storage failures after the backend accepted the PIN
// =========================================================================

#[tokio::test]
async fn given_pin_cache_unwritable_when_backend_accepts_pin_then_still_unlocked() {
    // Given
    let backend = FakeBackend::new();
    backend.with_profile("acct-peter", Identity::Peter, Some("2468"));
    backend.sign_in("acct-peter");
    let mut machine = machine_over(&backend, FailingWrites::new("munro_pins"), fallback_settings());
    machine.select(Identity::Peter).await.unwrap();

    // When
    let outcome = machine.submit_pin("2468").await.unwrap();

    // Then
    let SubmitOutcome::Unlocked(state) = outcome else {
        panic!("expected unlock");
    };
    assert_eq!(state.source, VerificationSource::Backend);
    assert!(
        !machine
            .context()
            .verifier()
            .cache()
            .contains(Identity::Peter)
            .unwrap()
    );
}

#[tokio::test]
async fn given_session_store_unwritable_when_pin_created_then_still_unlocked() {
    // Given
    let backend = FakeBackend::new();
    backend.with_profile("acct-casi", Identity::Casi, None);
    backend.sign_in("acct-casi");
    let mut machine = machine_over(
        &backend,
        FailingWrites::new("munro_sessions"),
        BridgeSettings::default(),
    );
    machine.select(Identity::Casi).await.unwrap();
    machine.submit_pin("1234").await.unwrap();

    // When
    let outcome = machine.confirm_pin("1234").await.unwrap();

    // Then
    assert!(matches!(outcome, SubmitOutcome::Unlocked(_)));
    assert_eq!(
        backend.last_set(),
        Some(("acct-casi".to_string(), "1234".to_string()))
    );
    assert_that!(
        machine.context().sessions().get(Identity::Casi).unwrap(),
        none()
    );
}

#[tokio::test]
async fn given_session_store_unwritable_when_identity_claimed_then_still_unlocked() {
    // Given
    let backend = FakeBackend::new();
    backend.sign_in("acct-olympia");
    let mut machine = machine_over(
        &backend,
        FailingWrites::new("munro_sessions"),
        BridgeSettings::default(),
    );
    machine.select(Identity::Olympia).await.unwrap();
    machine.submit_pin("1357").await.unwrap();

    // When
    let outcome = machine.confirm_pin("1357").await.unwrap();

    // Then
    assert!(matches!(outcome, SubmitOutcome::Unlocked(_)));
    assert_that!(backend.claim_calls(), eq(1));
    assert_that!(backend.set_calls(), eq(1));
}
