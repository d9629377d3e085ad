use crate::UnlockState;

/// What a PIN submission did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// First creation entry accepted; confirm it next
    AwaitingConfirmation,
    /// Confirmation differed; the first entry was discarded
    ConfirmationMismatch,
    Incorrect { attempts: u32, remaining: u32 },
    LockedOut,
    Unlocked(UnlockState),
    /// Dropped because a verification is already in flight
    Ignored,
}

impl SubmitOutcome {
    pub fn message(&self) -> String {
        match self {
            Self::AwaitingConfirmation => String::from("Enter your PIN again to confirm"),
            Self::ConfirmationMismatch => String::from("PINs do not match. Please try again."),
            Self::Incorrect { remaining: 1, .. } => {
                String::from("Incorrect PIN. 1 attempt remaining.")
            }
            Self::Incorrect { remaining, .. } => {
                format!("Incorrect PIN. {remaining} attempts remaining.")
            }
            Self::LockedOut => String::from("Too many failed attempts. Sign out to try again."),
            Self::Unlocked(state) => format!("Welcome back, {}", state.identity),
            Self::Ignored => String::from("Still verifying"),
        }
    }
}
