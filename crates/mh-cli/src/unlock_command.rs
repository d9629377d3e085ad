use crate::bridge::Bridge;
use crate::error::{CliError, Result as CliResult};

use mh_auth::{AuthError, CreationStep, FailureReason, Identity, Phase, SubmitOutcome};

use std::io::Write;

use log::debug;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

pub(crate) async fn run(bridge: &mut Bridge, identity: Identity, token: Option<&str>) -> CliResult<()> {
    begin(bridge, identity, token).await?;
    let machine = &mut bridge.machine;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        match machine.phase().clone() {
            Phase::NeedsPinCreation {
                step: CreationStep::Enter,
                ..
            } => {
                let input = prompt(&mut lines, &format!("Choose a PIN for {identity}: ")).await?;
                report(machine.submit_pin(&input).await)?;
            }
            Phase::NeedsPinCreation {
                step: CreationStep::Confirm { .. },
                ..
            } => {
                let input = prompt(&mut lines, "Confirm PIN: ").await?;
                report(machine.confirm_pin(&input).await)?;
            }
            Phase::NeedsPinEntry { .. } => {
                let input = prompt(&mut lines, &format!("PIN for {identity}: ")).await?;
                report(machine.submit_pin(&input).await)?;
            }
            Phase::Unlocked(state) => {
                println!("Unlocked {}", state.identity);
                if !state.backend_linked {
                    println!("Offline: real-time features unavailable until the next sign-in");
                }
                return Ok(());
            }
            Phase::Locked { .. } => {
                return Err(CliError::aborted(
                    "Too many failed attempts. Run `mh sign-out` to try again.",
                ));
            }
            Phase::Failed {
                reason: FailureReason::NetworkUnavailable,
                ..
            } => {
                println!("{}", failure_hint(FailureReason::NetworkUnavailable));
                let answer = prompt(&mut lines, "Retry? [y/N] ").await?;
                if !answer.trim().eq_ignore_ascii_case("y") {
                    return Err(CliError::aborted("Unlock abandoned"));
                }
                machine.retry().await?;
            }
            Phase::Failed { reason, .. } => return Err(CliError::aborted(failure_hint(reason))),
            Phase::SelectingIdentity | Phase::Verifying { .. } => {
                return Err(CliError::aborted(format!(
                    "Unexpected state: {}",
                    machine.phase().name()
                )));
            }
        }
    }
}

/// Optional magic-link completion, then identity selection.
///
/// The stored session is left alone; the machine restores it after a
/// correct PIN.
pub(crate) async fn begin(
    bridge: &mut Bridge,
    identity: Identity,
    token: Option<&str>,
) -> CliResult<Phase> {
    let machine = &mut bridge.machine;

    if let Some(token) = token {
        match machine.complete_authentication(token).await? {
            Some(claimed) => println!("Signed in as {claimed}"),
            None => println!("Signed in"),
        }
    }

    let phase = machine.select(identity).await?;
    machine.on_unlocked(|state| {
        debug!(
            "Unlock event: {} via {:?}, backend linked: {}",
            state.identity, state.source, state.backend_linked
        )
    });
    Ok(phase)
}

pub(crate) fn failure_hint(reason: FailureReason) -> &'static str {
    match reason {
        FailureReason::NotAuthenticated => {
            "Sign in with a magic link first: `mh request-link`, then `mh unlock --token`"
        }
        FailureReason::NetworkUnavailable => "Backend unreachable. Check your connection and retry.",
        FailureReason::IdentityTaken => "That identity belongs to another account",
        FailureReason::Other => "Unlock failed, see the log for details",
    }
}

/// Print what happened; recoverable input errors keep the loop going.
fn report(result: Result<SubmitOutcome, AuthError>) -> CliResult<()> {
    match result {
        Ok(outcome) => {
            if !matches!(outcome, SubmitOutcome::Unlocked(_)) {
                println!("{}", outcome.message());
            }
            Ok(())
        }
        Err(AuthError::InvalidPin { message, .. }) => {
            println!("{message}");
            Ok(())
        }
        Err(
            e @ (AuthError::NotAuthenticated { .. }
            | AuthError::NetworkUnavailable { .. }
            | AuthError::IdentityTaken { .. }),
        ) => {
            debug!("Unlock step failed: {e}");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

async fn prompt(lines: &mut Lines<BufReader<Stdin>>, text: &str) -> CliResult<String> {
    print!("{text}");
    std::io::stdout().flush()?;

    lines
        .next_line()
        .await?
        .ok_or_else(|| CliError::aborted("Input closed"))
}
