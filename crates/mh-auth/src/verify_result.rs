use crate::VerificationSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyResult {
    Correct(VerificationSource),
    Incorrect { attempts: u32, remaining: u32 },
    LockedOut,
}

impl VerifyResult {
    /// Text for the PIN screen
    pub fn message(&self) -> String {
        match self {
            Self::Correct(_) => String::from("PIN accepted"),
            Self::Incorrect { remaining: 1, .. } => {
                String::from("Incorrect PIN. 1 attempt remaining.")
            }
            Self::Incorrect { remaining, .. } => {
                format!("Incorrect PIN. {remaining} attempts remaining.")
            }
            Self::LockedOut => String::from("Too many failed attempts. Sign out to try again."),
        }
    }
}
