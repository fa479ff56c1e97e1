//! OAuth2 authorization-code flow against Google's identity endpoints.

use async_trait::async_trait;
use reqwest::{Client, Url};
use tracing::{debug, info};

use crate::error::{Result, SheetError};
use crate::models::{Credentials, OAuthErrorResponse, Token, TokenResponse};

/// Google OAuth2 consent endpoint.
pub const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";

/// Google OAuth2 token endpoint.
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Identity provider capable of issuing tokens for the application.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Build the URL the user visits to grant access.
    fn authorization_url(&self, credentials: &Credentials, scopes: &[String]) -> Result<String>;

    /// Exchange a one-time authorization code for a token.
    async fn exchange_code(&self, credentials: &Credentials, code: &str) -> Result<Token>;

    /// Obtain a fresh access token from a refresh token.
    async fn refresh_token(&self, credentials: &Credentials, refresh_token: &str) -> Result<Token>;
}

/// [`IdentityProvider`] talking to Google's OAuth2 endpoints.
#[derive(Debug, Clone)]
pub struct GoogleOAuth {
    http: Client,
    auth_url: String,
    token_url: String,
}

impl GoogleOAuth {
    pub fn new() -> Self {
        Self::with_endpoints(GOOGLE_AUTH_URL, GOOGLE_TOKEN_URL)
    }

    /// Use custom consent and token endpoints.
    pub fn with_endpoints(auth_url: impl Into<String>, token_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            auth_url: auth_url.into(),
            token_url: token_url.into(),
        }
    }

    async fn request_token(&self, params: &[(&str, &str)]) -> Result<TokenResponse> {
        let response = self
            .http
            .post(&self.token_url)
            .form(params)
            .send()
            .await
            .map_err(|e| SheetError::Authorization(format!("token request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SheetError::Authorization(format!("failed to read token response: {}", e)))?;

        if !status.is_success() {
            let message = match serde_json::from_str::<OAuthErrorResponse>(&body) {
                Ok(err) => match err.error_description {
                    Some(description) => format!("{}: {}", err.error, description),
                    None => err.error,
                },
                Err(_) => body,
            };
            return Err(SheetError::Authorization(format!(
                "Status {}: {}",
                status.as_u16(),
                message
            )));
        }

        serde_json::from_str(&body)
            .map_err(|e| SheetError::Authorization(format!("invalid token response: {}", e)))
    }
}

impl Default for GoogleOAuth {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentityProvider for GoogleOAuth {
    fn authorization_url(&self, credentials: &Credentials, scopes: &[String]) -> Result<String> {
        let scope = scopes.join(" ");
        let url = Url::parse_with_params(
            &self.auth_url,
            &[
                ("access_type", "offline"),
                ("scope", scope.as_str()),
                ("response_type", "code"),
                ("client_id", credentials.client_id.as_str()),
                ("redirect_uri", credentials.redirect_uri.as_str()),
            ],
        )
        .map_err(|e| SheetError::InvalidUrlOrId(format!("{}: {}", self.auth_url, e)))?;

        Ok(url.into())
    }

    async fn exchange_code(&self, credentials: &Credentials, code: &str) -> Result<Token> {
        debug!("exchanging authorization code");
        let response = self
            .request_token(&[
                ("code", code),
                ("client_id", credentials.client_id.as_str()),
                ("client_secret", credentials.client_secret.as_str()),
                ("redirect_uri", credentials.redirect_uri.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .await?;

        info!("obtained access token");
        Ok(Token::from_response(response, None))
    }

    async fn refresh_token(&self, credentials: &Credentials, refresh_token: &str) -> Result<Token> {
        debug!("refreshing access token");
        let response = self
            .request_token(&[
                ("refresh_token", refresh_token),
                ("client_id", credentials.client_id.as_str()),
                ("client_secret", credentials.client_secret.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .await?;

        info!("refreshed access token");
        Ok(Token::from_response(response, Some(refresh_token.to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials() -> Credentials {
        Credentials {
            client_id: "client.apps.googleusercontent.com".to_string(),
            client_secret: "secret".to_string(),
            redirect_uri: "http://localhost:3000/oauth2callback".to_string(),
        }
    }

    #[test]
    fn test_authorization_url_parameters() {
        let oauth = GoogleOAuth::new();
        let scopes = vec![
            "https://www.googleapis.com/auth/spreadsheets.readonly".to_string(),
            "https://www.googleapis.com/auth/drive.readonly".to_string(),
        ];

        let url = oauth.authorization_url(&credentials(), &scopes).unwrap();
        let parsed = Url::parse(&url).unwrap();
        let params: Vec<(String, String)> = parsed.query_pairs().into_owned().collect();

        assert!(url.starts_with(GOOGLE_AUTH_URL));
        assert!(params.contains(&("access_type".to_string(), "offline".to_string())));
        assert!(params.contains(&("response_type".to_string(), "code".to_string())));
        assert!(params.contains(&(
            "client_id".to_string(),
            "client.apps.googleusercontent.com".to_string()
        )));
        assert!(params.contains(&(
            "redirect_uri".to_string(),
            "http://localhost:3000/oauth2callback".to_string()
        )));
        assert!(params.contains(&("scope".to_string(), scopes.join(" "))));
    }

    #[test]
    fn test_authorization_url_rejects_bad_endpoint() {
        let oauth = GoogleOAuth::with_endpoints("not a url", GOOGLE_TOKEN_URL);
        assert!(matches!(
            oauth.authorization_url(&credentials(), &[]),
            Err(SheetError::InvalidUrlOrId(_))
        ));
    }
}
