// src/server/tunnel.rs

//! Public URL for the dev server through a `cloudflared` quick tunnel.

use std::path::PathBuf;
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStderr, Command};
use tokio::time::{timeout, Duration};

/// Seconds to wait for the tunnel URL; overridable for slow networks.
pub const TUNNEL_TIMEOUT_ENV_VAR: &str = "ASSETPIPE_TUNNEL_TIMEOUT_SECS";
const DEFAULT_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, thiserror::Error)]
pub enum TunnelError {
    #[error(
        "cloudflared not found; install it to use `tunnel = true` \
         (https://developers.cloudflare.com/cloudflare-one/connections/connect-networks/downloads/)"
    )]
    NotFound,

    #[error("cloudflared tunnel did not start within {0} seconds")]
    Timeout(u64),

    #[error("cloudflared exited unexpectedly; try `cloudflared tunnel --url {target}` manually")]
    ExitedEarly { target: String },

    #[error("process error: {0}")]
    Process(#[from] std::io::Error),
}

/// A running quick tunnel. The process is killed when this value is dropped.
#[derive(Debug)]
pub struct Tunnel {
    /// Public HTTPS URL, e.g. `https://fancy-rabbit.trycloudflare.com`.
    pub url: String,
    _process: Child,
}

impl Tunnel {
    /// Start `cloudflared` for `target` (e.g. `http://127.0.0.1:3000`) and
    /// wait until it prints its public URL.
    pub async fn start(target: &str) -> Result<Self, TunnelError> {
        let binary = find_cloudflared()?;
        let timeout_secs = std::env::var(TUNNEL_TIMEOUT_ENV_VAR)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let mut child = Command::new(binary)
            .args(["tunnel", "--url", target, "--no-autoupdate"])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let exited = || TunnelError::ExitedEarly {
            target: target.to_string(),
        };
        let stderr = child.stderr.take().ok_or_else(exited)?;

        match timeout(Duration::from_secs(timeout_secs), read_tunnel_url(stderr)).await {
            Ok(Some((url, mut rest))) => {
                // Keep draining stderr; cloudflared dies on SIGPIPE otherwise.
                tokio::spawn(async move {
                    let _ = tokio::io::copy(&mut rest, &mut tokio::io::sink()).await;
                });
                Ok(Tunnel {
                    url,
                    _process: child,
                })
            }
            Ok(None) => Err(exited()),
            Err(_elapsed) => Err(TunnelError::Timeout(timeout_secs)),
        }
    }
}

async fn read_tunnel_url(stderr: ChildStderr) -> Option<(String, BufReader<ChildStderr>)> {
    let mut reader = BufReader::new(stderr);
    let mut line = String::new();
    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) | Err(_) => return None,
            Ok(_) => {
                if let Some(url) = extract_tunnel_url(&line) {
                    return Some((url.to_string(), reader));
                }
            }
        }
    }
}

pub fn find_cloudflared() -> Result<PathBuf, TunnelError> {
    which::which("cloudflared").map_err(|_| TunnelError::NotFound)
}

/// Pull a `https://*.trycloudflare.com` URL out of a cloudflared log line.
pub fn extract_tunnel_url(line: &str) -> Option<&str> {
    let start = line.find("https://")?;
    let rest = &line[start..];
    let end = rest
        .find(|c: char| c.is_whitespace() || c == '"' || c == '\'' || c == '|')
        .unwrap_or(rest.len());
    let url = &rest[..end];
    url.contains(".trycloudflare.com").then_some(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_in_boxed_banner_line() {
        let line = "2024-01-01T00:00:00Z INF |  https://quiet-lake-42.trycloudflare.com  |";
        assert_eq!(
            extract_tunnel_url(line),
            Some("https://quiet-lake-42.trycloudflare.com")
        );
    }

    #[test]
    fn other_https_urls_are_ignored() {
        assert_eq!(
            extract_tunnel_url("see https://developers.cloudflare.com for docs"),
            None
        );
        assert_eq!(extract_tunnel_url("no url here"), None);
    }
}
