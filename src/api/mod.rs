//! Typed client for the StageBloom REST backend.

pub mod auth;
pub mod dashboards;
pub mod demandes;
pub mod interviews;
pub mod notifications;
pub mod offres;
pub mod testimonials;

use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use std::{sync::Arc, time::Instant};
use uuid::Uuid;

use crate::{
    middleware::auth::{with_bearer, AuthUser, TokenStore},
    models::ListPage,
    utils::{config::Config, errors::AppError, logger::LOGGER},
};

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    tokens: Arc<dyn TokenStore>,
}

impl ApiClient {
    pub fn new(config: &Config, tokens: Arc<dyn TokenStore>) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            http,
            base_url: config.api_url.clone(),
            tokens,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn token_store(&self) -> &Arc<dyn TokenStore> {
        &self.tokens
    }

    pub fn current_user(&self) -> Option<AuthUser> {
        self.tokens.load().as_ref().and_then(AuthUser::from_tokens)
    }

    pub fn is_authenticated(&self) -> bool {
        self.tokens.load().is_some()
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// One HTTP round trip. `build` may run more than once for the same
    /// logical request, so it must be repeatable.
    async fn dispatch<F>(
        &self,
        method: &Method,
        path: &str,
        build: &F,
        authorized: bool,
    ) -> Result<Response, AppError>
    where
        F: Fn(RequestBuilder) -> Result<RequestBuilder, AppError>,
    {
        let request_id = Uuid::new_v4().to_string();
        let mut request = self
            .http
            .request(method.clone(), self.url(path))
            .header("X-Request-Id", &request_id);
        if authorized {
            request = with_bearer(request, self.tokens.load().as_ref());
        }
        let request = build(request)?;

        let started = Instant::now();
        let result = request.send().await;
        LOGGER.log_request(
            method.as_str(),
            path,
            &request_id,
            result.as_ref().ok().map(|r| r.status().as_u16()),
            started.elapsed().as_millis(),
        );

        Ok(result?)
    }

    /// Authenticated request. A 401 triggers a single token refresh and a
    /// single replay; when the refresh fails the stored tokens are dropped
    /// and the original error is returned.
    pub(crate) async fn send<F>(&self, method: Method, path: &str, build: F) -> Result<Response, AppError>
    where
        F: Fn(RequestBuilder) -> Result<RequestBuilder, AppError>,
    {
        let response = self.dispatch(&method, path, &build, true).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return ensure_success(response).await;
        }

        let original = AppError::from_response(response).await;
        if let Err(refresh_error) = self.refresh_access_token().await {
            tracing::warn!("Token refresh failed after 401 on {}: {}", path, refresh_error);
            self.drop_tokens();
            return Err(original);
        }

        let replay = self.dispatch(&method, path, &build, true).await?;
        if replay.status() == StatusCode::UNAUTHORIZED {
            tracing::warn!("Still unauthorized on {} after refresh, signing out", path);
            self.drop_tokens();
            return Err(AppError::session_expired());
        }

        ensure_success(replay).await
    }

    /// Request without bearer token and without the refresh loop.
    pub(crate) async fn send_anonymous<F>(
        &self,
        method: Method,
        path: &str,
        build: F,
    ) -> Result<Response, AppError>
    where
        F: Fn(RequestBuilder) -> Result<RequestBuilder, AppError>,
    {
        self.dispatch(&method, path, &build, false).await
    }

    fn drop_tokens(&self) {
        if let Err(e) = self.tokens.clear() {
            tracing::error!("Failed to clear stored tokens: {}", e);
        }
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, AppError> {
        let response = self.send(Method::GET, path, |r| Ok(r)).await?;
        Ok(response.json::<T>().await?)
    }

    pub(crate) async fn get_list<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, AppError> {
        let page: ListPage<T> = self.get_json(path).await?;
        Ok(page.into_items())
    }

    pub(crate) async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, AppError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.send(Method::POST, path, |r| Ok(r.json(body))).await?;
        Ok(response.json::<T>().await?)
    }

    /// POST whose response body, if any, is not needed.
    pub(crate) async fn post_action<B>(&self, path: &str, body: &B) -> Result<(), AppError>
    where
        B: Serialize + ?Sized,
    {
        self.send(Method::POST, path, |r| Ok(r.json(body))).await?;
        Ok(())
    }
}

async fn ensure_success(response: Response) -> Result<Response, AppError> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(AppError::from_response(response).await)
    }
}
