//! Login session shared by every market binding

use super::types::{LoginResponse, UserInfo};
use crate::error::{TunerError, TunerResult};
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde_json::json;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// A login token is reused for this long
pub const TOKEN_LIFETIME: Duration = Duration::from_secs(3600);

const REQUEST_TIMEOUT_SECONDS: u64 = 30;

#[derive(Debug, Clone)]
struct Token {
    value: String,
    issued_at: Instant,
}

impl Token {
    fn is_fresh(&self, lifetime: Duration) -> bool {
        self.issued_at.elapsed() < lifetime
    }
}

/// Credentials plus the current token.
///
/// The token lock is held for the whole login, so concurrent callers wait for
/// one login instead of each starting their own.
pub struct AuthSession {
    client: Client,
    base_url: String,
    username: String,
    password: String,
    lifetime: Duration,
    token: Mutex<Option<Token>>,
}

impl AuthSession {
    pub fn new(
        base_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> TunerResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECONDS))
            .build()
            .map_err(|e| TunerError::fetch("HTTP client", e))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            username: username.into(),
            password: password.into(),
            lifetime: TOKEN_LIFETIME,
            token: Mutex::new(None),
        })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// A valid bearer token, logging in first if there is none or it is too old
    pub async fn token(&self) -> TunerResult<String> {
        let mut token = self.token.lock().await;

        if let Some(current) = token.as_ref().filter(|t| t.is_fresh(self.lifetime)) {
            return Ok(current.value.clone());
        }
        if token.is_some() {
            tracing::info!("Login token expired, logging in again");
        }

        let fresh = self.login().await?;
        let value = fresh.value.clone();
        *token = Some(fresh);
        Ok(value)
    }

    /// Log in now and validate the account, replacing any current token
    pub async fn connect(&self) -> TunerResult<()> {
        let mut token = self.token.lock().await;
        *token = Some(self.login().await?);
        Ok(())
    }

    async fn login(&self) -> TunerResult<Token> {
        tracing::info!("Logging in as {}", self.username);

        let response = self
            .client
            .post(format!("{}/user/login", self.base_url))
            .json(&json!({
                "username": self.username,
                "password": self.password,
            }))
            .send()
            .await
            .map_err(|e| TunerError::UserInvalid(format!("login failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(TunerError::UserInvalid(format!(
                "login failed: HTTP {}",
                response.status()
            )));
        }

        let login: LoginResponse = response
            .json()
            .await
            .map_err(|e| TunerError::UserInvalid(format!("unreadable login response: {}", e)))?;

        let user = self.user_info(&login.token).await?;
        validate_user(&user, Utc::now())?;

        tracing::info!("Login succeeded for {}", self.username);
        Ok(Token {
            value: login.token,
            issued_at: Instant::now(),
        })
    }

    async fn user_info(&self, token: &str) -> TunerResult<UserInfo> {
        let response = self
            .client
            .get(format!("{}/user/me", self.base_url))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| TunerError::fetch("user info", e))?;

        if !response.status().is_success() {
            return Err(TunerError::fetch(
                "user info",
                format!("HTTP error {}", response.status()),
            ));
        }

        response
            .json()
            .await
            .map_err(|e| TunerError::fetch("user info", e))
    }
}

/// Only donating accounts with an unexpired donation may stream
pub fn validate_user(user: &UserInfo, now: DateTime<Utc>) -> TunerResult<()> {
    if !user.did_donate {
        return Err(TunerError::UserInvalid("user didn't donate".to_string()));
    }

    let expired = user
        .donation_expire
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .filter(|expires| now > *expires);
    if let Some(expires) = expired {
        return Err(TunerError::UserInvalid(format!(
            "donation expired at {}",
            expires.format("%Y-%m-%d %H:%M:%S")
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    // 2021-02-01T06:00:00Z
    const DONATION_EXPIRE: i64 = 1_612_159_200_000;

    fn user(did_donate: bool, donation_expire: Option<i64>) -> UserInfo {
        UserInfo {
            did_donate,
            donation_expire,
        }
    }

    #[test]
    fn test_donating_user_valid() {
        let now = Utc.with_ymd_and_hms(2021, 1, 15, 0, 0, 0).unwrap();
        assert!(validate_user(&user(true, Some(DONATION_EXPIRE)), now).is_ok());
        assert!(validate_user(&user(true, None), now).is_ok());
    }

    #[test]
    fn test_non_donating_user_invalid() {
        let now = Utc.with_ymd_and_hms(2021, 1, 15, 0, 0, 0).unwrap();
        let err = validate_user(&user(false, Some(DONATION_EXPIRE)), now).unwrap_err();
        assert_eq!(err.to_string(), "user invalid: user didn't donate");
    }

    #[test]
    fn test_expired_donation_invalid() {
        let now = Utc.with_ymd_and_hms(2021, 2, 2, 0, 0, 0).unwrap();
        let err = validate_user(&user(true, Some(DONATION_EXPIRE)), now).unwrap_err();
        assert!(matches!(err, TunerError::UserInvalid(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_token_freshness() {
        let token = Token {
            value: "token".to_string(),
            issued_at: Instant::now(),
        };
        assert!(token.is_fresh(TOKEN_LIFETIME));

        tokio::time::advance(TOKEN_LIFETIME - Duration::from_secs(1)).await;
        assert!(token.is_fresh(TOKEN_LIFETIME));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(!token.is_fresh(TOKEN_LIFETIME));
    }

    #[tokio::test]
    async fn test_fresh_token_reused_without_login() {
        let session = AuthSession::new("http://127.0.0.1:9", "user", "pass").unwrap();
        *session.token.lock().await = Some(Token {
            value: "cached".to_string(),
            issued_at: Instant::now(),
        });

        assert_eq!(session.token().await.unwrap(), "cached");
    }
}
