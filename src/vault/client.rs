// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! HTTP client for Vault logical reads

use crate::config::{VaultAuth, VaultConfig};
use crate::constants::vault::{NAMESPACE_HEADER, TOKEN_HEADER};
use crate::error::{Result, SyncError};
use crate::store::SecretStore;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};
use url::Url;

#[derive(Debug, Deserialize)]
struct LoginResponse {
    auth: LoginAuth,
}

#[derive(Debug, Deserialize)]
struct LoginAuth {
    client_token: String,
}

#[derive(Debug, Deserialize)]
struct ReadResponse {
    #[serde(default)]
    data: Option<Map<String, Value>>,
}

pub struct VaultClient {
    http: Client,
    base: Url,
    namespace: Option<String>,
    auth: VaultAuth,
    token: RwLock<String>,
}

impl VaultClient {
    /// Build a client without contacting Vault; call [`VaultClient::login`] before reading
    pub fn new(config: &VaultConfig) -> Result<Self> {
        let mut base = Url::parse(&config.address).map_err(|e| {
            SyncError::ConfigError(format!("invalid Vault address {}: {}", config.address, e))
        })?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let http = Client::builder().timeout(config.timeout()).build()?;

        Ok(Self {
            http,
            base,
            namespace: config.namespace.clone(),
            auth: config.auth.clone(),
            token: RwLock::new(String::new()),
        })
    }

    /// Build a client and obtain its first token
    pub async fn connect(config: &VaultConfig) -> Result<Self> {
        let client = Self::new(config)?;
        client.login().await?;
        Ok(client)
    }

    /// Obtain a fresh token for the configured auth method
    #[instrument(skip(self))]
    pub async fn login(&self) -> Result<()> {
        let (url, body, identity) = match &self.auth {
            VaultAuth::Token { token } => {
                *self.token.write().await = token.clone();
                return Ok(());
            }
            VaultAuth::Kubernetes {
                role,
                mount,
                token_path,
            } => {
                let jwt = tokio::fs::read_to_string(token_path).await.map_err(|e| {
                    SyncError::VaultError(format!(
                        "failed to read service account token {}: {}",
                        token_path, e
                    ))
                })?;
                (
                    self.url(&format!("auth/{}/login", mount))?,
                    json!({ "role": role, "jwt": jwt.trim() }),
                    format!("role {}", role),
                )
            }
            VaultAuth::Userpass {
                username,
                password,
                mount,
            } => (
                self.url(&format!("auth/{}/login/{}", mount, username))?,
                json!({ "password": password }),
                format!("user {}", username),
            ),
        };

        let response = self
            .with_namespace(self.http.post(url))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(SyncError::VaultError(format!(
                "login as {} failed: {} {}",
                identity, status, text
            )));
        }

        *self.token.write().await = parse_login_response(&text)?;
        info!("Logged in to Vault as {}", identity);
        Ok(())
    }

    fn url(&self, path: &str) -> Result<Url> {
        let relative = format!("v1/{}", path.trim_start_matches('/'));
        self.base
            .join(&relative)
            .map_err(|e| SyncError::VaultError(format!("invalid Vault path {}: {}", path, e)))
    }

    fn with_namespace(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.namespace {
            Some(namespace) => builder.header(NAMESPACE_HEADER, namespace),
            None => builder,
        }
    }

    async fn get(&self, url: &Url) -> Result<Response> {
        let token = self.token.read().await.clone();
        let response = self
            .with_namespace(self.http.get(url.clone()))
            .header(TOKEN_HEADER, token)
            .send()
            .await?;
        Ok(response)
    }
}

#[async_trait]
impl SecretStore for VaultClient {
    #[instrument(skip(self))]
    async fn read(&self, path: &str) -> Result<Option<Map<String, Value>>> {
        let url = self.url(path)?;
        let mut response = self.get(&url).await?;

        if response.status() == StatusCode::FORBIDDEN
            && !matches!(self.auth, VaultAuth::Token { .. })
        {
            warn!("Vault rejected the token, logging in again");
            self.login().await?;
            response = self.get(&url).await?;
        }

        let status = response.status();
        let body = response.text().await?;
        debug!("Vault answered {} for {}", status, path);
        parse_read_response(status, &body, path)
    }
}

/// Interpret the answer to a logical read
pub(crate) fn parse_read_response(
    status: StatusCode,
    body: &str,
    path: &str,
) -> Result<Option<Map<String, Value>>> {
    match status {
        StatusCode::NOT_FOUND => Ok(None),
        status if status.is_success() => {
            let parsed: ReadResponse = serde_json::from_str(body).map_err(|e| {
                SyncError::VaultError(format!("failed to decode read of {}: {}", path, e))
            })?;
            Ok(parsed.data)
        }
        status => Err(SyncError::VaultError(format!(
            "read of {} failed: {} {}",
            path, status, body
        ))),
    }
}

fn parse_login_response(body: &str) -> Result<String> {
    let parsed: LoginResponse = serde_json::from_str(body)
        .map_err(|e| SyncError::VaultError(format!("failed to decode login response: {}", e)))?;
    if parsed.auth.client_token.is_empty() {
        return Err(SyncError::VaultError("login returned an empty token".into()));
    }
    Ok(parsed.auth.client_token)
}
