use std::{path::PathBuf, sync::Arc, time::Duration};

use air_quality_bridge::{
    clock::Clock,
    sensor::{SharedReading, Snapshot},
};
use anyhow::{Context as _, Result, anyhow};
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    net::TcpListener,
};
use tokio_stream::{StreamExt as _, wrappers::TcpListenerStream};

const MAX_HEAD_LEN: usize = 8 * 1024;

/// Idle clients are dropped once this passes without a complete request head.
const HEAD_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug)]
pub struct AppState<C> {
    pub reading: SharedReading,
    pub clock: C,
    pub assets_dir: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    Data,
    Asset {
        file: &'static str,
        content_type: &'static str,
    },
    NotFound,
    MethodNotAllowed,
}

#[derive(Debug, PartialEq, Eq)]
struct Response {
    status: u16,
    content_type: &'static str,
    body: Vec<u8>,
}

impl Response {
    fn new(status: u16, content_type: &'static str, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            content_type,
            body: body.into(),
        }
    }

    fn text(status: u16, body: &str) -> Self {
        Self::new(status, "text/plain", body)
    }

    fn reason(&self) -> &'static str {
        match self.status {
            200 => "OK",
            400 => "Bad Request",
            404 => "Not Found",
            405 => "Method Not Allowed",
            _ => "Internal Server Error",
        }
    }

    fn to_bytes(&self) -> Vec<u8> {
        let mut out = format!(
            "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            self.status,
            self.reason(),
            self.content_type,
            self.body.len()
        )
        .into_bytes();
        out.extend_from_slice(&self.body);
        out
    }
}

pub async fn serve<C>(listener: TcpListener, state: Arc<AppState<C>>) -> Result<()>
where
    C: Clock + Send + Sync + 'static,
{
    let local_addr = listener
        .local_addr()
        .context("failed to get listener address")?;
    log::info!("web server started on http://{local_addr}");

    let mut incoming = TcpListenerStream::new(listener);
    while let Some(stream) = incoming.next().await {
        let stream = match stream {
            Ok(s) => s,
            Err(err) => {
                log::warn!("failed to accept connection: {err}");
                continue;
            }
        };

        let state = Arc::clone(&state);
        tokio::spawn(async move {
            if let Err(err) = handle_connection(stream, &state).await {
                log::warn!("http connection failed: {err:#}");
            }
        });
    }

    Ok(())
}

async fn handle_connection<S, C>(mut stream: S, state: &AppState<C>) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
    C: Clock,
{
    let head = tokio::time::timeout(HEAD_TIMEOUT, read_head(&mut stream))
        .await
        .map_err(|_| anyhow!("timed out waiting for request head"))??;

    let response = match head {
        Some(head) => match parse_request_line(&head) {
            Some((method, path)) => {
                let route = route(method, path);
                let response = respond(route, state).await;
                log::debug!("{method} {path} -> {}", response.status);
                response
            }
            // Oversized, truncated or not HTTP/1.x.
            None => Response::text(400, "Bad Request"),
        },
        None => return Ok(()),
    };

    stream
        .write_all(&response.to_bytes())
        .await
        .context("failed to write response")?;
    stream
        .shutdown()
        .await
        .context("failed to shut down connection")?;

    Ok(())
}

/// Reads up to the blank line ending the request head. `None` if the client
/// closed the connection without sending anything.
async fn read_head<S>(stream: &mut S) -> Result<Option<String>>
where
    S: AsyncRead + Unpin,
{
    let mut head = Vec::with_capacity(512);
    let mut buf = [0u8; 512];

    loop {
        let n = stream
            .read(&mut buf)
            .await
            .context("failed to read request")?;
        if n == 0 {
            if head.is_empty() {
                return Ok(None);
            }
            break;
        }

        head.extend_from_slice(&buf[..n]);
        if head.windows(4).any(|w| w == b"\r\n\r\n") || head.len() > MAX_HEAD_LEN {
            break;
        }
    }

    Ok(Some(String::from_utf8_lossy(&head).into_owned()))
}

fn parse_request_line(head: &str) -> Option<(&str, &str)> {
    if !head.contains("\r\n\r\n") {
        return None;
    }

    let line = head.lines().next()?;
    let mut parts = line.split_whitespace();
    let method = parts.next()?;
    let target = parts.next()?;
    let version = parts.next()?;
    if !version.starts_with("HTTP/1.") || parts.next().is_some() {
        return None;
    }

    let path = target.split_once('?').map_or(target, |(p, _)| p);
    Some((method, path))
}

fn route(method: &str, path: &str) -> Route {
    let route = match path {
        "/data" => Route::Data,
        "/" => Route::Asset {
            file: "index.html",
            content_type: "text/html",
        },
        "/style.css" => Route::Asset {
            file: "style.css",
            content_type: "text/css",
        },
        _ => return Route::NotFound,
    };

    if method == "GET" {
        route
    } else {
        Route::MethodNotAllowed
    }
}

async fn respond<C: Clock>(route: Route, state: &AppState<C>) -> Response {
    match route {
        Route::Data => data_response(&state.reading, &state.clock),
        Route::Asset { file, content_type } => {
            let path = state.assets_dir.join(file);
            match tokio::fs::read(&path).await {
                Ok(body) => Response::new(200, content_type, body),
                Err(err) => {
                    log::debug!("failed to read asset {}: {err}", path.display());
                    Response::text(404, "File not found")
                }
            }
        }
        Route::NotFound => Response::text(404, "Not Found"),
        Route::MethodNotAllowed => Response::text(405, "Method Not Allowed"),
    }
}

fn data_response<C: Clock>(reading: &SharedReading, clock: &C) -> Response {
    let snapshot = {
        let reading = reading.lock();
        Snapshot::new(&reading, clock.now_ms())
    };
    let json = snapshot.to_json();
    log::debug!("sending JSON data: {json}");

    Response::new(200, "application/json", json)
}
