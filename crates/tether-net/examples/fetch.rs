//! Fetch a URL through the request controller and print the response.
//!
//! ```text
//! RUST_LOG=tether_net=debug cargo run -p tether-net --example fetch -- https://example.com
//! cargo run -p tether-net --example fetch -- https://httpbin.org/post '{"name":"x"}'
//! ```
//!
//! With a second argument the request is a POST carrying it as the body.

use std::sync::Arc;

use tether_net::{RequestController, TransferProgress};
use tokio::sync::Notify;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tether_net=info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let url = args.next().ok_or("usage: fetch <url> [post-body]")?;
    let body = args.next();

    let controller = RequestController::new()?;
    let done = Arc::new(Notify::new());

    controller.state_changed().connect(|state| {
        tracing::info!(%state, "state changed");
    });
    controller
        .download_progress()
        .connect(|progress: &TransferProgress| match progress.percent() {
            Some(percent) => tracing::info!(percent, "downloading"),
            None => tracing::info!(bytes = progress.bytes_transferred, "downloading"),
        });

    let finished_done = done.clone();
    controller.finished().connect(move |body| {
        println!("{}", String::from_utf8_lossy(body));
        finished_done.notify_one();
    });
    let error_done = done.clone();
    controller.error_occurred().connect(move |message| {
        eprintln!("{message}");
        error_done.notify_one();
    });

    let started = match body {
        Some(body) => controller.start_post(&url, body, [("Accept", "application/json")]),
        None => controller.start_get(&url),
    };
    if !started {
        return Err("controller busy".into());
    }

    done.notified().await;
    tracing::debug!(status = ?controller.status_code(), "request settled");
    Ok(())
}
