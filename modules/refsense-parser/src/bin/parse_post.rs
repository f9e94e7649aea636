//! Parse a post/thread request from a JSON file (or stdin) and print the
//! combined output together with its triple conversion.

use std::io::Read;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use ai_client::Claude;
use refsense_common::Config;
use refsense_parser::citoid::CitoidClient;
use refsense_parser::dispatcher::ThreadParser;
use refsense_parser::expand::UrlExpander;
use refsense_parser::output::to_triples;
use refsense_parser::request::{build_thread, ParseRequest};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env();

    let raw = match std::env::args().nth(1) {
        Some(path) => std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read request file {path}"))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read request from stdin")?;
            buf
        }
    };
    let request: ParseRequest = serde_json::from_str(&raw).context("Invalid request JSON")?;

    let expander = UrlExpander::new();
    let thread = build_thread(request, Some(&expander)).await?;
    let post_url = thread.url().to_string();

    let model = Arc::new(Claude::new(&config.anthropic_api_key, &config.model));
    let fetcher = Arc::new(CitoidClient::new(&config.citoid_base_url));
    let parser = ThreadParser::new(model, fetcher, config);

    let output = parser.process_thread(&thread, None).await;
    let triples = to_triples(&post_url, &output);

    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "output": output,
            "triples": triples,
        }))?
    );
    Ok(())
}
