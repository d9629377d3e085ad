use mh_auth::Identity;

use clap::Subcommand;

#[derive(Subcommand, Debug)]
pub(crate) enum Commands {
    /// Show the backend, stored sessions and PIN status of every identity
    Status,

    /// Email a magic link
    RequestLink {
        /// Address to send the link to
        #[arg(long)]
        email: String,
    },

    /// Complete a magic-link sign-in and remember the session
    Login {
        /// Token hash from the magic link
        #[arg(long)]
        token: String,
    },

    /// Unlock an identity with its PIN, creating one if needed
    Unlock {
        /// Family identity (Balthazar, Olympia, Casi, Peter, Delphine)
        #[arg(long)]
        identity: Identity,

        /// Complete a magic-link sign-in first
        #[arg(long)]
        token: Option<String>,
    },

    /// Forget every stored session and cached PIN, then sign out of the backend
    SignOut,
}
