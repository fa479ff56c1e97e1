//! Test doubles for the authorization and metadata seams.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sheet_loader::models::{now_millis, Spreadsheet};
use sheet_loader::{
    AuthSession, ConsentPrompt, Credentials, IdentityProvider, Result, SheetDescriptor,
    SheetError, SheetsApi, Token, TokenStore,
};

pub fn credentials() -> Credentials {
    Credentials {
        client_id: "client.apps.googleusercontent.com".to_string(),
        client_secret: "secret".to_string(),
        redirect_uri: "http://localhost:3000/oauth2callback".to_string(),
    }
}

pub fn valid_token(access_token: &str) -> Token {
    Token {
        access_token: access_token.to_string(),
        refresh_token: Some("1//refresh".to_string()),
        scope: None,
        token_type: Some("Bearer".to_string()),
        expiry_date: Some(now_millis() + 3_600_000),
    }
}

pub fn expired_token(refresh_token: Option<&str>) -> Token {
    Token {
        access_token: "stale".to_string(),
        refresh_token: refresh_token.map(str::to_string),
        scope: None,
        token_type: Some("Bearer".to_string()),
        expiry_date: Some(now_millis() - 3_600_000),
    }
}

pub fn session(token: Token) -> AuthSession {
    AuthSession::new(Arc::new(credentials()), token)
}

/// In-memory token slot that counts its calls.
#[derive(Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<Token>>,
    fail_load: bool,
    fail_save: bool,
    loads: AtomicUsize,
    saves: AtomicUsize,
}

impl MemoryTokenStore {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_token(token: Token) -> Self {
        Self {
            token: Mutex::new(Some(token)),
            ..Self::default()
        }
    }

    pub fn unreadable() -> Self {
        Self {
            fail_load: true,
            ..Self::default()
        }
    }

    pub fn read_only() -> Self {
        Self {
            fail_save: true,
            ..Self::default()
        }
    }

    pub fn read_only_with_token(token: Token) -> Self {
        Self {
            token: Mutex::new(Some(token)),
            fail_save: true,
            ..Self::default()
        }
    }

    pub fn stored(&self) -> Option<Token> {
        self.token.lock().unwrap().clone()
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Result<Option<Token>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if self.fail_load {
            return Err(SheetError::TokenStoreUnavailable("permission denied".to_string()));
        }
        Ok(self.token.lock().unwrap().clone())
    }

    fn save(&self, token: &Token) -> Result<()> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        if self.fail_save {
            return Err(SheetError::Persistence("read-only file system".to_string()));
        }
        *self.token.lock().unwrap() = Some(token.clone());
        Ok(())
    }
}

/// Identity provider answering from fixed tokens. `None` means the call fails.
#[derive(Default)]
pub struct ScriptedProvider {
    exchange: Option<Token>,
    refresh: Option<Token>,
    exchanges: AtomicUsize,
    refreshes: AtomicUsize,
}

impl ScriptedProvider {
    pub fn exchanging(token: Token) -> Self {
        Self {
            exchange: Some(token),
            ..Self::default()
        }
    }

    pub fn refreshing(token: Token) -> Self {
        Self {
            refresh: Some(token),
            ..Self::default()
        }
    }

    pub fn scripted(exchange: Option<Token>, refresh: Option<Token>) -> Self {
        Self {
            exchange,
            refresh,
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self::default()
    }

    pub fn exchanges(&self) -> usize {
        self.exchanges.load(Ordering::SeqCst)
    }

    pub fn refreshes(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityProvider for ScriptedProvider {
    fn authorization_url(&self, _credentials: &Credentials, scopes: &[String]) -> Result<String> {
        Ok(format!("https://accounts.example/consent?scope={}", scopes.join("+")))
    }

    async fn exchange_code(&self, _credentials: &Credentials, _code: &str) -> Result<Token> {
        self.exchanges.fetch_add(1, Ordering::SeqCst);
        self.exchange
            .clone()
            .ok_or_else(|| SheetError::Authorization("invalid_grant".to_string()))
    }

    async fn refresh_token(&self, _credentials: &Credentials, _refresh_token: &str) -> Result<Token> {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        self.refresh
            .clone()
            .ok_or_else(|| SheetError::Authorization("invalid_grant".to_string()))
    }
}

/// Consent prompt that fails the test if it is ever shown.
pub struct ForbiddenConsent;

#[async_trait]
impl ConsentPrompt for ForbiddenConsent {
    async fn request_code(&self, auth_url: &str) -> Result<String> {
        panic!("consent must not be requested (url: {})", auth_url);
    }
}

/// Consent prompt that answers with a fixed code.
pub struct FixedConsent {
    code: String,
    calls: AtomicUsize,
    urls: Mutex<Vec<String>>,
}

impl FixedConsent {
    pub fn new(code: &str) -> Self {
        Self {
            code: code.to_string(),
            calls: AtomicUsize::new(0),
            urls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ConsentPrompt for FixedConsent {
    async fn request_code(&self, auth_url: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.urls.lock().unwrap().push(auth_url.to_string());
        // Give concurrent callers a chance to run while consent is pending.
        tokio::task::yield_now().await;
        Ok(self.code.clone())
    }
}

/// Metadata API returning a fixed spreadsheet.
pub struct FakeSheetsApi {
    spreadsheet: Spreadsheet,
    calls: AtomicUsize,
}

impl FakeSheetsApi {
    pub fn new(url: &str, titles: &[(i64, &str)]) -> Self {
        Self {
            spreadsheet: Spreadsheet {
                id: "abc123".to_string(),
                url: url.to_string(),
                sheets: titles
                    .iter()
                    .map(|(id, title)| SheetDescriptor::new(*id, *title))
                    .collect(),
            },
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SheetsApi for FakeSheetsApi {
    async fn get_spreadsheet(
        &self,
        _session: &AuthSession,
        _spreadsheet_id: &str,
    ) -> Result<Spreadsheet> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.spreadsheet.clone())
    }
}
