use reqwest::{Method, StatusCode};
use serde_json::Value;
use std::collections::HashMap;
use validator::Validate;

use crate::{
    api::{ensure_success, ApiClient},
    middleware::auth::AuthTokens,
    models::user::{LoginRequest, LoginResponse, RefreshRequest, RefreshResponse, User},
    utils::{errors::AppError, logger::LOGGER},
};

impl ApiClient {
    /// `POST /auth/login/`; stores the returned token pair.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AppError> {
        let request = LoginRequest {
            email: email.trim().to_string(),
            password: password.to_string(),
        };
        request.validate()?;

        let response = self
            .send_anonymous(Method::POST, "auth/login/", |r| Ok(r.json(&request)))
            .await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(AppError::InvalidCredentials);
        }
        let login: LoginResponse = ensure_success(response).await?.json().await?;

        self.token_store().save(&AuthTokens {
            access: login.access,
            refresh: Some(login.refresh),
            user: Some(login.user.clone()),
        })?;

        LOGGER.log_business_event(
            "login",
            Some(login.user.id),
            HashMap::from([("role".to_string(), Value::from(login.user.role.as_str()))]),
        );

        Ok(login.user)
    }

    /// `POST /auth/refresh/`; replaces the stored access token.
    pub async fn refresh_access_token(&self) -> Result<String, AppError> {
        let current = self.token_store().load().ok_or_else(AppError::session_expired)?;
        let refresh = current
            .refresh
            .clone()
            .ok_or_else(AppError::session_expired)?;

        let response = self
            .send_anonymous(Method::POST, "auth/refresh/", |r| {
                Ok(r.json(&RefreshRequest { refresh: &refresh }))
            })
            .await?;
        if !response.status().is_success() {
            tracing::debug!("Refresh rejected with status {}", response.status());
            return Err(AppError::session_expired());
        }
        let refreshed: RefreshResponse = response.json().await?;

        self.token_store().save(&AuthTokens {
            access: refreshed.access.clone(),
            refresh: refreshed.refresh.or(current.refresh),
            user: current.user,
        })?;

        Ok(refreshed.access)
    }

    pub fn logout(&self) -> Result<(), AppError> {
        self.token_store().clear()
    }
}
