use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use volley::{
    ApiTarget, DispatcherConfig, MalformedPolicy, ReqwestHttpClient, UploadConfig, upload_feed,
};

/// Upload a product feed to a marketplace API with bounded concurrency.
#[derive(Parser, Debug)]
#[command(name = "volley", version, about)]
struct Args {
    /// Path to the delimited product feed (sku,price[,title] per row)
    feed: PathBuf,

    /// Base URL of the marketplace API
    #[arg(long, env = "VOLLEY_ENDPOINT", default_value = "https://api-seller.ozon.ru")]
    endpoint: String,

    /// Path of the product import endpoint
    #[arg(long, env = "VOLLEY_API_PATH", default_value = "/v1/product/import")]
    api_path: String,

    /// API credential, sent in the Api-Key header
    #[arg(long, env = "VOLLEY_API_KEY")]
    api_key: String,

    /// Maximum number of uploads in flight at any instant
    #[arg(long, default_value_t = 5)]
    concurrency: usize,

    /// Per-request timeout in milliseconds
    #[arg(long, default_value_t = 30_000)]
    timeout_ms: u64,

    /// Abort the whole run on the first malformed feed row instead of
    /// skipping it
    #[arg(long)]
    abort_on_malformed: bool,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let config = UploadConfig {
        feed_path: args.feed,
        target: ApiTarget {
            endpoint: args.endpoint,
            path: args.api_path,
            api_key: args.api_key,
        },
        dispatcher: DispatcherConfig {
            concurrency: args.concurrency,
            timeout_ms: args.timeout_ms,
            ..Default::default()
        },
        on_malformed: if args.abort_on_malformed {
            MalformedPolicy::Abort
        } else {
            MalformedPolicy::Skip
        },
    };

    // Per-product failures are reflected in the summary, not the exit code;
    // only setup failures terminate the process non-zero.
    if let Err(error) = upload_feed(&config, ReqwestHttpClient::new()).await {
        tracing::error!(error = %error, "upload run aborted");
        std::process::exit(1);
    }
}
