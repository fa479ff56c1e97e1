//! Authorization lifecycle: cached token, refresh, or interactive consent.
//!
//! ```text
//! Unauthenticated ──(cached token / refresh)──────────────► Authorized
//!        │                                                      ▲
//!        └──► PendingUserConsent ──(code exchanged + saved)─────┘
//!                    │
//!                    └──(exchange failed)──► Unauthenticated
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{Result, SheetError};
use crate::models::{Credentials, Token};
use crate::oauth::IdentityProvider;
use crate::token_store::TokenStore;

/// Where the authorizer currently is in the consent lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Unauthenticated,
    PendingUserConsent,
    Authorized,
}

/// An authorized handle: application credentials plus a usable token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSession {
    credentials: Arc<Credentials>,
    token: Token,
}

impl AuthSession {
    pub fn new(credentials: Arc<Credentials>, token: Token) -> Self {
        Self { credentials, token }
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn token(&self) -> &Token {
        &self.token
    }

    /// True iff a non-expired token is attached.
    pub fn is_authorized(&self) -> bool {
        self.token.is_usable()
    }

    /// Bearer credential for API requests.
    pub fn bearer(&self) -> Result<&str> {
        if self.is_authorized() {
            Ok(&self.token.access_token)
        } else {
            Err(SheetError::NotAuthorized)
        }
    }
}

/// Interactive half of the consent flow.
#[async_trait]
pub trait ConsentPrompt: Send + Sync {
    /// Present `auth_url` to the user and wait for the authorization code.
    async fn request_code(&self, auth_url: &str) -> Result<String>;
}

/// [`ConsentPrompt`] that prints the URL and reads the code from stdin.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdinConsent;

#[async_trait]
impl ConsentPrompt for StdinConsent {
    async fn request_code(&self, auth_url: &str) -> Result<String> {
        let mut stderr = tokio::io::stderr();
        let prompt = format!(
            "Authorize this app by visiting this url: {}\nEnter the code from that page here: ",
            auth_url
        );
        stderr.write_all(prompt.as_bytes()).await?;
        stderr.flush().await?;

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        match lines.next_line().await? {
            Some(line) => Ok(line.trim().to_string()),
            None => Err(SheetError::Authorization(
                "stdin closed before an authorization code was entered".to_string(),
            )),
        }
    }
}

struct AuthInner {
    state: AuthState,
    session: Option<AuthSession>,
}

/// Turns application credentials and a token store into an [`AuthSession`].
pub struct Authorizer {
    credentials: Arc<Credentials>,
    scopes: Vec<String>,
    store: Arc<dyn TokenStore>,
    provider: Arc<dyn IdentityProvider>,
    consent: Arc<dyn ConsentPrompt>,
    inner: Mutex<AuthInner>,
}

impl Authorizer {
    pub fn new(
        credentials: Credentials,
        scopes: Vec<String>,
        store: Arc<dyn TokenStore>,
        provider: Arc<dyn IdentityProvider>,
        consent: Arc<dyn ConsentPrompt>,
    ) -> Self {
        Self {
            credentials: Arc::new(credentials),
            scopes,
            store,
            provider,
            consent,
            inner: Mutex::new(AuthInner {
                state: AuthState::Unauthenticated,
                session: None,
            }),
        }
    }

    pub async fn state(&self) -> AuthState {
        self.inner.lock().await.state
    }

    /// Establish an authorized session.
    ///
    /// The whole flow runs under one lock, so concurrent callers never start a
    /// second consent; they wait and receive the session established first.
    ///
    /// A token obtained through consent must be persisted or the call fails:
    /// the authorization code is single-use and nothing on disk could restore
    /// the session. A refreshed token that cannot be persisted is only logged,
    /// since the stored refresh token still works on the next run.
    pub async fn authorize(&self) -> Result<AuthSession> {
        let mut inner = self.inner.lock().await;

        if let Some(session) = inner.session.as_ref().filter(|s| s.is_authorized()) {
            debug!("reusing established session");
            return Ok(session.clone());
        }
        inner.session = None;
        inner.state = AuthState::Unauthenticated;

        let token = match self.store.load()? {
            Some(token) if token.is_usable() => {
                debug!("cached token is valid");
                Some(token)
            }
            Some(token) => self.try_refresh(token).await,
            None => None,
        };

        let token = match token {
            Some(token) => token,
            None => {
                inner.state = AuthState::PendingUserConsent;
                match self.run_consent().await {
                    Ok(token) => token,
                    Err(e) => {
                        inner.state = AuthState::Unauthenticated;
                        return Err(e);
                    }
                }
            }
        };

        let session = AuthSession::new(self.credentials.clone(), token);
        inner.state = AuthState::Authorized;
        inner.session = Some(session.clone());
        info!("authorized");
        Ok(session)
    }

    /// Refresh an expired token. `None` sends the caller to consent.
    async fn try_refresh(&self, expired: Token) -> Option<Token> {
        let refresh_token = match expired.refresh_token.as_deref() {
            Some(refresh_token) => refresh_token,
            None => {
                info!("cached token expired and cannot be refreshed");
                return None;
            }
        };

        let token = match self
            .provider
            .refresh_token(&self.credentials, refresh_token)
            .await
        {
            Ok(token) if token.is_usable() => token,
            Ok(_) => {
                warn!("refresh returned no usable access token, falling back to consent");
                return None;
            }
            Err(e) => {
                warn!(error = %e, "token refresh failed, falling back to consent");
                return None;
            }
        };

        if let Err(e) = self.store.save(&token) {
            warn!(error = %e, "refreshed token could not be cached");
        }
        Some(token)
    }

    async fn run_consent(&self) -> Result<Token> {
        let auth_url = self
            .provider
            .authorization_url(&self.credentials, &self.scopes)?;

        info!("waiting for user consent");
        let code = self.consent.request_code(&auth_url).await?;
        if code.is_empty() {
            return Err(SheetError::Authorization(
                "empty authorization code".to_string(),
            ));
        }

        let token = self
            .provider
            .exchange_code(&self.credentials, &code)
            .await
            .map_err(|e| match e {
                SheetError::Authorization(_) => e,
                other => SheetError::Authorization(other.to_string()),
            })?;
        if !token.is_usable() {
            return Err(SheetError::Authorization(
                "token endpoint returned no usable access token".to_string(),
            ));
        }

        self.store.save(&token)?;
        Ok(token)
    }
}
