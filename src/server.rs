use crate::config::AppConfig;
use anyhow::{Context, Result};
use axum::{response::Html, routing::get, Router};
use std::net::SocketAddr;
use std::path::Path;
use tower_http::services::ServeDir;
use tracing::info;

/// Serves the rendered figure for viewing in a browser. Static only: an
/// index page embedding the image, and the output directory itself.
pub async fn start_server(config: AppConfig) -> Result<()> {
    let output = &config.render.output;
    let file_name = output
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("map.png")
        .to_string();
    let dir = output
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."))
        .to_path_buf();

    let page = index_page(&config.render.title, &file_name);

    let app = Router::new()
        .route("/", get(move || async move { Html(page) }))
        .nest_service("/map", ServeDir::new(dir));

    let addr = SocketAddr::from(([127, 0, 0, 1], config.server.port));
    info!("Serving rendered map on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn index_page(title: &str, file_name: &str) -> String {
    format!(
        "<!DOCTYPE html>\n\
         <html>\n\
         <head><title>{title}</title></head>\n\
         <body style=\"margin:0;background:#f0f0f0;text-align:center\">\n\
         <img src=\"/map/{file_name}\" alt=\"{title}\" style=\"max-width:100%\">\n\
         </body>\n\
         </html>\n"
    )
}
