//! HTTP plumbing shared by the index and package parsers.

use reqwest::{Client, Url};
use tracing::{debug, warn};

use armory_schema::ArmoryConfig;

use crate::error::FetchError;
use crate::settings::FetchOptions;

/// Parse `url`, accepting only `http` and `https`.
///
/// # Errors
///
/// Returns [`FetchError::Config`] for unparsable URLs, other schemes or a missing host.
pub fn validate_url(url: &str) -> Result<Url, FetchError> {
    let config_err = |reason: &str| FetchError::Config {
        url: url.to_string(),
        reason: reason.to_string(),
    };
    let parsed = Url::parse(url).map_err(|e| config_err(&e.to_string()))?;
    match parsed.scheme() {
        "http" | "https" => {}
        other => return Err(config_err(&format!("unsupported scheme '{other}'"))),
    }
    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(config_err("missing host"));
    }
    Ok(parsed)
}

/// Build the shared client from connection options.
///
/// # Errors
///
/// Returns [`FetchError::Config`] for an invalid proxy URL or TLS backend failure.
pub fn build_client(options: &FetchOptions) -> Result<Client, FetchError> {
    let mut builder = Client::builder()
        .user_agent(crate::USER_AGENT)
        .timeout(options.timeout)
        .tcp_nodelay(true);
    if let Some(proxy) = options.proxy.as_deref().filter(|p| !p.is_empty()) {
        let proxy = reqwest::Proxy::all(proxy).map_err(|e| FetchError::Config {
            url: proxy.to_string(),
            reason: e.to_string(),
        })?;
        builder = builder.proxy(proxy);
    }
    if options.insecure {
        warn!("TLS certificate verification is disabled");
        builder = builder.danger_accept_invalid_certs(true);
    }
    builder.build().map_err(|e| FetchError::Config {
        url: String::new(),
        reason: e.to_string(),
    })
}

/// Resolve the token to send to `armory`.
///
/// A static token wins; otherwise `authorization_cmd` is run through the
/// shell and its trimmed stdout is used.
///
/// # Errors
///
/// Returns [`FetchError::Authorization`] if the command cannot be run or exits non-zero.
pub async fn resolve_authorization(armory: &ArmoryConfig) -> Result<Option<String>, FetchError> {
    if !armory.authorization.is_empty() {
        return Ok(Some(armory.authorization.clone()));
    }
    if armory.authorization_cmd.is_empty() {
        return Ok(None);
    }

    debug!("Running authorization command for armory '{}'", armory.name);
    let output = shell_command(&armory.authorization_cmd)
        .stdin(std::process::Stdio::null())
        .output()
        .await
        .map_err(|e| FetchError::Authorization(e.to_string()))?;
    if !output.status.success() {
        return Err(FetchError::Authorization(format!(
            "command exited with {}",
            output.status
        )));
    }
    let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
    Ok((!token.is_empty()).then_some(token))
}

#[cfg(windows)]
fn shell_command(cmd: &str) -> tokio::process::Command {
    let mut command = tokio::process::Command::new("cmd");
    command.arg("/C").arg(cmd);
    command
}

#[cfg(not(windows))]
fn shell_command(cmd: &str) -> tokio::process::Command {
    let mut command = tokio::process::Command::new("sh");
    command.arg("-c").arg(cmd);
    command
}

/// A client bound to one armory's credentials.
///
/// The token is only attached to requests for the armory's own host, so
/// redirects and third-party asset hosts never see it.
#[derive(Debug, Clone)]
pub struct ArmoryRequester {
    client: Client,
    auth_host: Option<String>,
    token: Option<String>,
}

impl ArmoryRequester {
    /// Requester that sends `token` only to the host of `armory_url`.
    pub fn new(client: Client, armory_url: &Url, token: Option<String>) -> Self {
        Self {
            client,
            auth_host: armory_url.host_str().map(str::to_string),
            token,
        }
    }

    /// GET `url` and return the body.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Transport`] on connection failure or timeout and
    /// [`FetchError::Status`] for non-success responses.
    pub async fn get_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let parsed = validate_url(url)?;
        let mut request = self.client.get(parsed.clone());
        if let Some(token) = &self.token {
            if parsed.host_str() == self.auth_host.as_deref() {
                request = request.header(reqwest::header::AUTHORIZATION, token);
            }
        }
        if parsed.host_str() == Some("api.github.com") {
            request = request.header(reqwest::header::ACCEPT, "application/vnd.github+json");
        }

        debug!("GET {url}");
        let transport = |e: reqwest::Error| FetchError::Transport {
            url: url.to_string(),
            message: if e.is_timeout() {
                "timed out".to_string()
            } else {
                e.to_string()
            },
        };
        let response = request.send().await.map_err(transport)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let bytes = response.bytes().await.map_err(transport)?;
        Ok(bytes.to_vec())
    }

    /// GET `url` and decode a JSON body.
    ///
    /// # Errors
    ///
    /// As [`Self::get_bytes`], plus [`FetchError::Parse`] for bodies that do not decode.
    pub async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, FetchError> {
        let bytes = self.get_bytes(url).await?;
        serde_json::from_slice(&bytes).map_err(|e| FetchError::parse(url, e))
    }
}
