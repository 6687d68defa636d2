// src/server/mod.rs

//! Development HTTP server.
//!
//! Serves the site directory with `tower-http`'s `ServeDir`, pushes reload
//! events over SSE ([`reload`]) and can expose itself through a public
//! tunnel ([`tunnel`]).

pub mod reload;
pub mod tunnel;

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use axum::middleware::map_response;
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::{PathConfig, ServerConfig};
use crate::errors::{AssetpipeError, Result};

pub use reload::{inject_livereload, inject_script, ReloadHub, CLIENT_SCRIPT, LIVERELOAD_PATH};
pub use tunnel::{Tunnel, TunnelError};

/// Resolved `[server]` options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DevServerOptions {
    pub root: PathBuf,
    pub host: String,
    pub port: u16,
    pub open: bool,
    pub browser: Option<String>,
    pub cors: bool,
    pub tunnel: bool,
    pub live_reload: bool,
}

impl DevServerOptions {
    /// `root` defaults to the site directory; a relative `root` is taken
    /// from the project root.
    pub fn from_config(cfg: &ServerConfig, paths: &PathConfig) -> Self {
        let root = match &cfg.root {
            Some(r) => paths.root().join(r),
            None => paths.site_dir().to_path_buf(),
        };
        Self {
            root,
            host: cfg.host.clone(),
            port: cfg.port,
            open: cfg.open,
            browser: cfg.browser.clone(),
            cors: cfg.cors,
            tunnel: cfg.tunnel,
            live_reload: cfg.live_reload,
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Build the router: static files, plus the SSE endpoint and HTML script
/// injection when `live_reload` is given, plus permissive CORS if asked.
pub fn build_router(root: &Path, live_reload: Option<ReloadHub>, cors: bool) -> Router {
    let mut app = Router::new();

    let inject = live_reload.is_some();
    if let Some(hub) = live_reload {
        app = app.route(LIVERELOAD_PATH, get(reload::sse_handler).with_state(hub));
    }

    app = app.fallback_service(ServeDir::new(root));

    if inject {
        app = app.layer(map_response(inject_livereload));
    }
    if cors {
        app = app.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );
    }
    app.layer(TraceLayer::new_for_http())
}

/// A bound, not yet serving, dev server.
#[derive(Debug)]
pub struct DevServer {
    options: DevServerOptions,
    hub: ReloadHub,
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl DevServer {
    /// Bind the listening socket. Failure is reported as
    /// [`AssetpipeError::Bind`] and is never retried.
    pub async fn bind(options: DevServerOptions) -> Result<Self> {
        let addr = options.addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| AssetpipeError::Bind {
                addr: addr.clone(),
                source,
            })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| AssetpipeError::Bind { addr, source })?;

        Ok(Self {
            options,
            hub: ReloadHub::new(),
            listener,
            local_addr,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.local_addr)
    }

    /// Hub the runtime notifies after successful rebuilds.
    pub fn reload_hub(&self) -> ReloadHub {
        self.hub.clone()
    }

    pub fn router(&self) -> Router {
        let hub = self.options.live_reload.then(|| self.hub.clone());
        build_router(&self.options.root, hub, self.options.cors)
    }

    /// Serve until the process is interrupted.
    pub async fn serve(self) -> Result<()> {
        let app = self.router();
        let url = self.url();
        info!(root = ?self.options.root, "dev server listening on {url}");

        if self.options.open {
            open_browser(&url, self.options.browser.as_deref());
        }

        let tunnel_task = self
            .options
            .tunnel
            .then(|| tokio::spawn(hold_tunnel(url.clone())));

        let result = axum::serve(self.listener, app).await;

        if let Some(task) = tunnel_task {
            task.abort();
        }
        result.map_err(AssetpipeError::from)
    }
}

fn open_browser(url: &str, browser: Option<&str>) {
    let opened = match browser {
        Some(app) => open::with(url, app),
        None => open::that(url),
    };
    if let Err(err) = opened {
        warn!("could not open browser for {url}: {err}");
    }
}

/// Start a tunnel to `target` and keep it alive until this task is aborted.
async fn hold_tunnel(target: String) {
    match Tunnel::start(&target).await {
        Ok(tunnel) => {
            info!("public tunnel: {}", tunnel.url);
            std::future::pending::<()>().await;
            drop(tunnel);
        }
        Err(err) => warn!("tunnel unavailable: {err:#}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{parse_str, ConfigFile};

    #[test]
    fn options_default_to_site_dir() {
        let cfg = ConfigFile::try_from(
            parse_str("[config]\nsite = \"public\"\n\n[task.noop]\ncmd = \"true\"\n").unwrap(),
        )
        .unwrap();
        let paths = PathConfig::from_config(&cfg, "/srv/site").unwrap();
        let opts = DevServerOptions::from_config(cfg.server(), &paths);

        assert_eq!(opts.root, PathBuf::from("/srv/site/public"));
        assert_eq!(opts.addr(), "127.0.0.1:3000");
        assert!(opts.live_reload);
        assert!(!opts.cors);
    }
}
