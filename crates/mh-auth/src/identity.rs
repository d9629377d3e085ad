use crate::{AuthError, Result as AuthErrorResult};

use std::fmt;
use std::panic::Location;
use std::str::FromStr;

use error_location::ErrorLocation;
use serde::{Deserialize, Serialize};

/// A family member role an account may claim exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Identity {
    Balthazar,
    Olympia,
    Casi,
    Peter,
    Delphine,
}

impl Identity {
    pub const ALL: [Identity; 5] = [
        Self::Balthazar,
        Self::Olympia,
        Self::Casi,
        Self::Peter,
        Self::Delphine,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Balthazar => "Balthazar",
            Self::Olympia => "Olympia",
            Self::Casi => "Casi",
            Self::Peter => "Peter",
            Self::Delphine => "Delphine",
        }
    }

    /// Accent colour used for avatars and message bubbles
    pub fn color(&self) -> &'static str {
        match self {
            Self::Balthazar => "#004225",
            Self::Olympia => "#40E0D0",
            Self::Casi => "#00008B",
            Self::Peter => "#7B3F00",
            Self::Delphine => "#800080",
        }
    }

    pub fn initial(&self) -> char {
        self.as_str().chars().next().unwrap_or('?')
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Identity {
    type Err = AuthError;

    #[track_caller]
    fn from_str(s: &str) -> AuthErrorResult<Self> {
        Self::ALL
            .into_iter()
            .find(|identity| identity.as_str() == s)
            .ok_or_else(|| AuthError::InvalidIdentity {
                value: s.to_string(),
                location: ErrorLocation::from(Location::caller()),
            })
    }
}
