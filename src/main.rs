use anyhow::{Context, Result};
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

use streetscape::assets::AssetDir;
use streetscape::config::Config;
use streetscape::data::{build_manifest, load_csv};
use streetscape::http::{parse_request_line, route, AppState};
use streetscape::logging::{log, log_request, obj, v_str, Domain, Level};
use streetscape::view::ViewContext;

const MAX_HEADER_LINES: usize = 100;

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = Config::from_env();
    let store = load_csv(&cfg.data_path)?;
    let manifest = build_manifest(&cfg.data_path, &store)?;
    let view_ctx = ViewContext {
        thresholds: cfg.quality,
        assets: Some(AssetDir::new(cfg.assets_dir.clone())),
    };

    let listener = TcpListener::bind(&cfg.bind_addr)
        .await
        .with_context(|| format!("binding {}", cfg.bind_addr))?;
    log(
        Level::Info,
        Domain::System,
        "server_started",
        obj(&[
            ("bind", v_str(&cfg.bind_addr)),
            ("data", v_str(&cfg.data_path.display().to_string())),
            ("default_selection", json!(cfg.default_selection)),
            ("max_sessions", json!(cfg.max_sessions)),
        ]),
    );

    let app = Arc::new(AppState::new(cfg, store, manifest, view_ctx));
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(conn) => conn,
            Err(err) => {
                log(Level::Warn, Domain::Http, "accept_failed", obj(&[("error", v_str(&err.to_string()))]));
                continue;
            }
        };
        let app = Arc::clone(&app);
        tokio::spawn(async move {
            if let Err(err) = serve(stream, &app).await {
                log(
                    Level::Warn,
                    Domain::Http,
                    "connection_failed",
                    obj(&[("peer", v_str(&peer.to_string())), ("error", v_str(&format!("{:#}", err)))]),
                );
            }
        });
    }
}

async fn serve(mut stream: TcpStream, app: &AppState) -> Result<()> {
    let started = Instant::now();
    let (read, mut write) = stream.split();
    let mut reader = BufReader::new(read);

    let mut request_line = String::new();
    if reader.read_line(&mut request_line).await? == 0 {
        return Ok(());
    }
    // drain headers; bodies are never read
    for _ in 0..MAX_HEADER_LINES {
        let mut header = String::new();
        if reader.read_line(&mut header).await? == 0 || header.trim().is_empty() {
            break;
        }
    }

    let Some((method, target)) = parse_request_line(&request_line) else {
        return Ok(());
    };
    // rendering is synchronous and CPU-bound
    let response = tokio::task::block_in_place(|| route(app, method, target));
    write.write_all(response.to_http().as_bytes()).await?;
    write.flush().await?;

    log_request(method, target, response.status, started.elapsed().as_secs_f64() * 1000.0);
    Ok(())
}
