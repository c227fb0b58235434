use log::{debug, info, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use url::Url;

use crate::error::AuthError;
use crate::models::Identity;

const IDENTITY_TOOLKIT_URL: &str = "https://identitytoolkit.googleapis.com/v1/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Authenticating,
    Authenticated(Identity),
    SignedOut,
}

/// External identity provider capability.
pub trait IdentityProvider {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AuthError>;
    async fn sign_out(&self) -> Result<(), AuthError>;
}

/// Firebase Authentication over its REST API (email/password accounts).
pub struct FirebaseAuth {
    http: Client,
    api_key: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SignInRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    local_id: String,
    id_token: String,
    email: Option<String>,
    display_name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LookupRequest<'a> {
    id_token: &'a str,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupUser {
    display_name: Option<String>,
    photo_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FirebaseErrorBody {
    error: FirebaseError,
}

#[derive(Debug, Deserialize)]
struct FirebaseError {
    message: String,
}

impl FirebaseAuth {
    pub fn new(http: Client, api_key: String) -> Self {
        FirebaseAuth { http, api_key }
    }

    async fn post<Req: Serialize, Resp: for<'de> Deserialize<'de>>(
        &self,
        method: &str,
        body: &Req,
    ) -> Result<Resp, AuthError> {
        let url = format!("{IDENTITY_TOOLKIT_URL}accounts:{method}");
        let response = self
            .http
            .post(url)
            .query(&[("key", &self.api_key)])
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let message = response
                .json::<FirebaseErrorBody>()
                .await
                .map(|b| b.error.message)
                .unwrap_or_else(|_| format!("HTTP {status}"));
            return Err(AuthError::Rejected(message));
        }
        Ok(response.json::<Resp>().await?)
    }
}

impl IdentityProvider for FirebaseAuth {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let signed_in: SignInResponse = self
            .post(
                "signInWithPassword",
                &SignInRequest {
                    email,
                    password,
                    return_secure_token: true,
                },
            )
            .await?;

        // profile fields such as the photo only come back from lookup
        let profile = match self
            .post::<_, LookupResponse>("lookup", &LookupRequest { id_token: &signed_in.id_token })
            .await
        {
            Ok(lookup) => lookup.users.into_iter().next(),
            Err(e) => {
                warn!("Profile lookup failed: {}", e);
                None
            }
        };

        let display_name = profile
            .as_ref()
            .and_then(|p| p.display_name.clone())
            .or(signed_in.display_name)
            .filter(|n| !n.is_empty())
            .or(signed_in.email)
            .unwrap_or_else(|| email.to_string());
        let avatar_url = profile
            .and_then(|p| p.photo_url)
            .and_then(|u| Url::parse(&u).ok());

        Ok(Identity {
            uid: signed_in.local_id,
            display_name,
            avatar_url,
        })
    }

    /// Tokens are never persisted, so there is nothing to revoke remotely.
    async fn sign_out(&self) -> Result<(), AuthError> {
        Ok(())
    }
}

/// Provider used when sign-in is not configured.
pub struct NoIdentityProvider;

impl IdentityProvider for NoIdentityProvider {
    async fn sign_in(&self, _email: &str, _password: &str) -> Result<Identity, AuthError> {
        Err(AuthError::Unavailable)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        Ok(())
    }
}

pub enum AuthBackend {
    Firebase(FirebaseAuth),
    Disabled(NoIdentityProvider),
}

impl IdentityProvider for AuthBackend {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        match self {
            AuthBackend::Firebase(p) => p.sign_in(email, password).await,
            AuthBackend::Disabled(p) => p.sign_in(email, password).await,
        }
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        match self {
            AuthBackend::Firebase(p) => p.sign_out().await,
            AuthBackend::Disabled(p) => p.sign_out().await,
        }
    }
}

/// Holds the current identity for the lifetime of the session. Listeners
/// observe changes through [`SessionContext::subscribe`].
pub struct SessionContext<P> {
    provider: P,
    state: watch::Sender<SessionState>,
}

impl<P: IdentityProvider> SessionContext<P> {
    pub fn new(provider: P) -> Self {
        let (state, _) = watch::channel(SessionState::Uninitialized);
        SessionContext { provider, state }
    }

    /// A session that starts signed in, for running without an identity provider.
    pub fn with_identity(provider: P, identity: Identity) -> Self {
        let (state, _) = watch::channel(SessionState::Authenticated(identity));
        SessionContext { provider, state }
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn current_identity(&self) -> Option<Identity> {
        match &*self.state.borrow() {
            SessionState::Authenticated(identity) => Some(identity.clone()),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(*self.state.borrow(), SessionState::Authenticated(_))
    }

    /// On failure the previous state is restored.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let previous = self.state();
        if previous == SessionState::Authenticating {
            return Err(AuthError::InProgress);
        }
        self.state.send_replace(SessionState::Authenticating);
        debug!("Signing in");

        match self.provider.sign_in(email, password).await {
            Ok(identity) => {
                info!("Signed in as {}", identity.display_name);
                self.state.send_replace(SessionState::Authenticated(identity.clone()));
                Ok(identity)
            }
            Err(e) => {
                warn!("Sign-in failed: {}", e);
                self.state.send_replace(previous);
                Err(e)
            }
        }
    }

    /// On failure the session is left unchanged.
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        self.provider.sign_out().await?;
        info!("Signed out");
        self.state.send_replace(SessionState::SignedOut);
        Ok(())
    }
}
