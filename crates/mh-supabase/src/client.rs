use crate::profile_row::{PROFILE_COLUMNS, ProfileRow};
use crate::token_response::TokenResponse;
use crate::{ClientError, SupabaseResult};

use mh_auth::{
    AuthProvider, Identity, Pin, Profile, ProfileStore, Result as AuthErrorResult, Session,
};

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use log::{debug, info, warn};
use reqwest::{Client as ReqwestClient, Method, RequestBuilder};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// The session this client currently acts as.
struct HeldSession {
    session: Session,
    access_expires_at: DateTime<Utc>,
}

/// HTTP client for the hosted backend's auth and REST APIs.
///
/// Implements both bridge collaborators: [`AuthProvider`] against `/auth/v1`
/// and [`ProfileStore`] against the `profiles_safe` view and the PIN remote
/// procedures under `/rest/v1/rpc`.
pub struct SupabaseClient {
    base_url: String,
    anon_key: String,
    http: ReqwestClient,
    session: RwLock<Option<HeldSession>>,
    session_lifetime: TimeDelta,
}

impl SupabaseClient {
    /// Create a new client
    ///
    /// # Arguments
    /// * `base_url` - Project URL (e.g., "https://abc.supabase.co")
    /// * `anon_key` - Public API key sent with every request
    /// * `timeout` - Per-request timeout
    /// * `session_lifetime` - How long a refresh credential is trusted locally
    pub fn new(
        base_url: &str,
        anon_key: &str,
        timeout: Duration,
        session_lifetime: TimeDelta,
    ) -> SupabaseResult<Self> {
        let http = ReqwestClient::builder().timeout(timeout).build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
            http,
            session: RwLock::new(None),
            session_lifetime,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Email a magic link to `email`, creating the account if needed.
    pub async fn request_magic_link(&self, email: &str) -> SupabaseResult<()> {
        #[derive(Serialize)]
        struct OtpRequest<'a> {
            email: &'a str,
            create_user: bool,
        }

        let email = email.trim().to_lowercase();
        let body = OtpRequest {
            email: &email,
            create_user: true,
        };
        let req = self.request(Method::POST, "/auth/v1/otp").json(&body);
        self.execute_empty(req).await?;

        info!("Magic link sent to {email}");
        Ok(())
    }

    /// Build a request carrying the API key and the best available bearer token
    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let bearer = self
            .access_token()
            .unwrap_or_else(|| self.anon_key.clone());

        self.http
            .request(method, &url)
            .header("apikey", &self.anon_key)
            .bearer_auth(bearer)
    }

    /// Execute request and decode a JSON body
    async fn execute<T: DeserializeOwned>(&self, req: RequestBuilder) -> SupabaseResult<T> {
        let body = self.send(req).await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn execute_empty(&self, req: RequestBuilder) -> SupabaseResult<()> {
        self.send(req).await?;
        Ok(())
    }

    async fn send(&self, req: RequestBuilder) -> SupabaseResult<String> {
        let response = req.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(Self::api_error(status.as_u16(), &body));
        }

        Ok(body)
    }

    /// Auth and REST endpoints report errors in different shapes
    #[track_caller]
    fn api_error(status: u16, body: &str) -> ClientError {
        let value: Value = serde_json::from_str(body).unwrap_or(Value::Null);
        let text = |key: &str| value.get(key).and_then(Value::as_str).map(str::to_string);

        let code = text("error_code")
            .or_else(|| text("error"))
            .or_else(|| text("code"))
            .unwrap_or_else(|| "UNKNOWN".to_string());
        let message = text("msg")
            .or_else(|| text("error_description"))
            .or_else(|| text("message"))
            .unwrap_or_else(|| body.to_string());

        ClientError::api_error(status, code, message)
    }

    fn adopt(&self, token: TokenResponse) -> Session {
        let now = Utc::now();
        let session = Session {
            account_id: token.user.id,
            access_token: token.access_token,
            refresh_credential: token.refresh_token,
            expires_at: now + self.session_lifetime,
        };

        *self.write_session() = Some(HeldSession {
            session: session.clone(),
            access_expires_at: now + access_lifetime(token.expires_in),
        });
        session
    }

    /// The held session, unless its access token has expired
    fn live_session(&self) -> Option<Session> {
        let guard = self.read_session();
        guard
            .as_ref()
            .filter(|held| held.access_expires_at > Utc::now())
            .map(|held| held.session.clone())
    }

    fn access_token(&self) -> Option<String> {
        self.live_session().map(|session| session.access_token)
    }

    async fn rpc<B: Serialize>(&self, function: &str, body: &B) -> SupabaseResult<bool> {
        let req = self
            .request(Method::POST, &format!("/rest/v1/rpc/{function}"))
            .json(body);
        self.execute(req).await
    }

    /// First `profiles_safe` row where `column` equals `value`
    async fn select_profile(&self, column: &str, value: &str) -> SupabaseResult<Option<Profile>> {
        let req = self
            .request(Method::GET, "/rest/v1/profiles_safe")
            .query(&[
                ("select", PROFILE_COLUMNS.to_string()),
                (column, format!("eq.{value}")),
                ("limit", String::from("1")),
            ]);
        let rows: Vec<ProfileRow> = self.execute(req).await?;
        Ok(rows.into_iter().next().map(Profile::from))
    }

    fn read_session(&self) -> RwLockReadGuard<'_, Option<HeldSession>> {
        self.session.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_session(&self) -> RwLockWriteGuard<'_, Option<HeldSession>> {
        self.session.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Out-of-range lifetimes count as already expired.
pub(crate) fn access_lifetime(expires_in: i64) -> TimeDelta {
    TimeDelta::try_seconds(expires_in).unwrap_or_else(TimeDelta::zero)
}

#[async_trait]
impl AuthProvider for SupabaseClient {
    async fn current_session(&self) -> AuthErrorResult<Option<Session>> {
        Ok(self.live_session())
    }

    async fn exchange_for_session(&self, token: &str) -> AuthErrorResult<Session> {
        #[derive(Serialize)]
        struct VerifyRequest<'a> {
            #[serde(rename = "type")]
            kind: &'a str,
            token_hash: &'a str,
        }

        let body = VerifyRequest {
            kind: "magiclink",
            token_hash: token,
        };
        let req = self.request(Method::POST, "/auth/v1/verify").json(&body);
        let response: TokenResponse = self.execute(req).await?;

        let session = self.adopt(response);
        info!("Magic link exchanged for account {}", session.account_id);
        Ok(session)
    }

    async fn refresh_session(&self, refresh_credential: &str) -> AuthErrorResult<Session> {
        #[derive(Serialize)]
        struct RefreshRequest<'a> {
            refresh_token: &'a str,
        }

        let body = RefreshRequest {
            refresh_token: refresh_credential,
        };
        let req = self
            .request(Method::POST, "/auth/v1/token?grant_type=refresh_token")
            .json(&body);
        let response: TokenResponse = self.execute(req).await?;

        let session = self.adopt(response);
        debug!("Refreshed session for account {}", session.account_id);
        Ok(session)
    }

    async fn sign_out(&self) -> AuthErrorResult<()> {
        let had_session = self.access_token().is_some();
        let result = if had_session {
            self.execute_empty(self.request(Method::POST, "/auth/v1/logout"))
                .await
        } else {
            Ok(())
        };

        *self.write_session() = None;

        if let Err(e) = result {
            warn!("Backend logout failed: {e}");
            return Err(e.into());
        }
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for SupabaseClient {
    async fn find_by_identity(&self, identity: Identity) -> AuthErrorResult<Option<Profile>> {
        Ok(self
            .select_profile("family_identity", identity.as_str())
            .await?)
    }

    async fn find_by_account(&self, account_id: &str) -> AuthErrorResult<Option<Profile>> {
        Ok(self.select_profile("id", account_id).await?)
    }

    async fn claim_identity(&self, identity: Identity) -> AuthErrorResult<bool> {
        #[derive(Serialize)]
        struct ClaimRequest<'a> {
            chosen_identity: &'a str,
        }

        let body = ClaimRequest {
            chosen_identity: identity.as_str(),
        };
        Ok(self.rpc("claim_my_identity", &body).await?)
    }

    async fn set_pin(&self, account_id: &str, pin: &Pin) -> AuthErrorResult<bool> {
        #[derive(Serialize)]
        struct SetPinRequest<'a> {
            user_uuid: &'a str,
            new_pin: &'a str,
        }

        let body = SetPinRequest {
            user_uuid: account_id,
            new_pin: pin.expose(),
        };
        Ok(self.rpc("set_pin", &body).await?)
    }

    async fn verify_pin(&self, account_id: &str, pin: &Pin) -> AuthErrorResult<bool> {
        #[derive(Serialize)]
        struct VerifyPinRequest<'a> {
            user_uuid: &'a str,
            pin_input: &'a str,
        }

        let body = VerifyPinRequest {
            user_uuid: account_id,
            pin_input: pin.expose(),
        };
        Ok(self.rpc("verify_pin", &body).await?)
    }
}
