use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
    response::{IntoResponse, Redirect, Response},
};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use crate::config::SupabaseConfig;
use crate::errors::AppError;
use crate::handlers::AppState;

/// Cookie carrying the admin access token.
pub const SESSION_COOKIE: &str = "sb-access-token";

pub const LOGIN_PATH: &str = "/admin/login";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SignedIn {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
    pub user: AdminUser,
}

/// Identity provider for the admin area.
#[async_trait]
pub trait AdminAuth: Send + Sync {
    /// Resolves an access token to its user; `AppError::Unauthorized` when invalid.
    async fn current_user(&self, access_token: &str) -> Result<AdminUser, AppError>;

    /// Password sign-in; `AppError::Unauthorized` on bad credentials.
    async fn sign_in(&self, email: &str, password: &str) -> Result<SignedIn, AppError>;
}

/// Client for the hosted auth REST API.
#[derive(Clone)]
pub struct SupabaseAuth {
    client: Client,
    base_url: String,
    api_key: String,
}

impl SupabaseAuth {
    pub fn new(config: &SupabaseConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| AppError::ExternalApiError(format!("Failed to create auth client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.url.clone(),
            api_key: config.service_key.clone(),
        })
    }
}

#[async_trait]
impl AdminAuth for SupabaseAuth {
    async fn current_user(&self, access_token: &str) -> Result<AdminUser, AppError> {
        let response = self
            .client
            .get(format!("{}/auth/v1/user", self.base_url))
            .header("apikey", &self.api_key)
            .bearer_auth(access_token)
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => Ok(response.json::<AdminUser>().await?),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(AppError::Unauthorized(
                "Invalid or expired session".to_string(),
            )),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(AppError::ExternalApiError(format!(
                    "Auth user lookup returned {}: {}",
                    status, body
                )))
            }
        }
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<SignedIn, AppError> {
        let response = self
            .client
            .post(format!("{}/auth/v1/token", self.base_url))
            .query(&[("grant_type", "password")])
            .header("apikey", &self.api_key)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => {
                let signed_in = response.json::<SignedIn>().await?;
                tracing::info!("✓ Admin signed in: {}", signed_in.user.id);
                Ok(signed_in)
            }
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED => {
                tracing::warn!("⚠️  Admin sign-in rejected for {}", email);
                Err(AppError::Unauthorized(
                    "Invalid login credentials".to_string(),
                ))
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(AppError::ExternalApiError(format!(
                    "Auth sign-in returned {}: {}",
                    status, body
                )))
            }
        }
    }
}

/// Access token from `Authorization: Bearer`, else from the session cookie.
pub fn access_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

pub fn session_cookie(access_token: &str, max_age: Option<u64>) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax",
        SESSION_COOKIE, access_token
    );
    if let Some(max_age) = max_age {
        cookie.push_str(&format!("; Max-Age={}", max_age));
    }
    cookie
}

pub fn clear_session_cookie() -> String {
    format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", SESSION_COOKIE)
}

/// An authenticated admin request.
#[derive(Debug, Clone)]
pub struct AdminSession {
    pub user: AdminUser,
}

#[derive(Debug)]
pub enum AuthRejection {
    /// Browser request without a valid session.
    LoginRequired,
    Failed(AppError),
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            AuthRejection::LoginRequired => Redirect::to(LOGIN_PATH).into_response(),
            AuthRejection::Failed(e) => e.into_response(),
        }
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AdminSession {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let auth = state.admin_auth().map_err(AuthRejection::Failed)?;
        let wants_json = parts.uri.path().starts_with("/api/");
        let deny = |e: AppError| {
            if wants_json {
                AuthRejection::Failed(e)
            } else {
                AuthRejection::LoginRequired
            }
        };

        let token = access_token(&parts.headers)
            .ok_or_else(|| deny(AppError::Unauthorized("Missing access token".to_string())))?;

        match auth.current_user(&token).await {
            Ok(user) => Ok(AdminSession { user }),
            Err(e @ AppError::Unauthorized(_)) => Err(deny(e)),
            Err(e) => Err(AuthRejection::Failed(e)),
        }
    }
}
