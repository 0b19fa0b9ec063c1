// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP client for the daemon's control plane.

use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    /// Backend unavailable (exit 2)
    #[error("daemon unreachable: {0}")]
    Unreachable(String),

    /// Daemon rejected the request (exit 1)
    #[error("{0}")]
    Rejected(String),

    #[error("bad response: {0}")]
    BadResponse(String),
}

pub struct Client {
    http: reqwest::Client,
    base: String,
}

impl Client {
    /// Connect to the local daemon, reading the bound port from the state
    /// directory (falling back to `SESH_PORT`).
    pub fn connect() -> Result<Self, ClientError> {
        let port = port_from_state_file().unwrap_or_else(sesh_daemon::env::http_port);
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ClientError::Unreachable(e.to_string()))?;
        Ok(Self {
            http,
            base: format!("http://127.0.0.1:{port}"),
        })
    }

    pub async fn get(&self, path: &str) -> Result<Value, ClientError> {
        let response = self
            .http
            .get(format!("{}{}", self.base, path))
            .send()
            .await
            .map_err(connect_error)?;
        decode(response).await
    }

    pub async fn post(&self, path: &str, body: Value) -> Result<Value, ClientError> {
        let response = self
            .http
            .post(format!("{}{}", self.base, path))
            .json(&body)
            .send()
            .await
            .map_err(connect_error)?;
        decode(response).await
    }

    pub async fn delete(&self, path: &str) -> Result<Value, ClientError> {
        let response = self
            .http
            .delete(format!("{}{}", self.base, path))
            .send()
            .await
            .map_err(connect_error)?;
        decode(response).await
    }
}

fn connect_error(e: reqwest::Error) -> ClientError {
    if e.is_connect() || e.is_timeout() {
        ClientError::Unreachable(e.to_string())
    } else {
        ClientError::BadResponse(e.to_string())
    }
}

async fn decode(response: reqwest::Response) -> Result<Value, ClientError> {
    let status = response.status();
    let body: Value = response
        .json()
        .await
        .map_err(|e| ClientError::BadResponse(e.to_string()))?;
    if status.is_success() {
        Ok(body)
    } else {
        let message = body
            .get("error")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown error")
            .to_string();
        Err(ClientError::Rejected(message))
    }
}

fn port_from_state_file() -> Option<u16> {
    let path = sesh_daemon::env::state_dir()?.join("daemon.port");
    std::fs::read_to_string(path).ok()?.trim().parse().ok()
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
