use crate::bridge::Bridge;
use crate::error::Result as CliResult;

use mh_auth::{Identity, VerificationSource};

use chrono::Utc;
use log::debug;

pub(crate) async fn run(bridge: &Bridge) -> CliResult<()> {
    let context = bridge.machine.context();

    match &bridge.client {
        Some(client) => println!("Backend: {}", client.base_url()),
        None => println!("Backend: none (local-only)"),
    }
    println!(
        "Local PIN fallback: {}",
        if context.settings().local_fallback {
            "enabled"
        } else {
            "disabled"
        }
    );
    println!();

    let now = Utc::now();
    for identity in Identity::ALL {
        let session = match context.sessions().get(identity)? {
            Some(stored) if stored.is_expired(now) => String::from("expired"),
            Some(stored) => format!("valid until {}", stored.expires_at.format("%Y-%m-%d %H:%M")),
            None => String::from("none"),
        };

        let pin = match context.verifier().lookup(identity).await {
            Ok(status) if !status.claimed => String::from("unclaimed"),
            Ok(status) => {
                let state = if status.protected { "set" } else { "not set" };
                match status.source {
                    VerificationSource::Backend => state.to_string(),
                    VerificationSource::LocalFallback => format!("{state} (local cache)"),
                }
            }
            Err(e) => {
                debug!("PIN lookup for {identity} failed: {e}");
                format!("unknown ({})", e.error_code())
            }
        };

        println!("{identity:<10} session: {session:<28} PIN: {pin}");
    }

    Ok(())
}
