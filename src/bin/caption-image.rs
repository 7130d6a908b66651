//! Download an image and print the caption Gemini writes for it.
//!
//! Only the caption goes to stdout; logs and errors go to stderr.

use std::{process::ExitCode, time::Duration};

use clap::Parser;
use display_error_chain::DisplayErrorChain;
use gemini_caption::{
    CaptionPipeline, ClientError, FetchError, Gemini, GeminiCaptioner, ImageFetcher, MimeStrategy,
    PipelineError, Reporter, DEFAULT_BASE_URL, DEFAULT_PROMPT,
};
use mime::Mime;
use snafu::{ResultExt, Snafu};
use tracing::info;
use tracing_subscriber::EnvFilter;
use url::Url;

const DEFAULT_IMAGE_URL: &str = "https://upload.wikimedia.org/wikipedia/commons/thumb/8/87/Palace_of_Westminster_from_the_dome_on_Methodist_Central_Hall.jpg/2560px-Palace_of_Westminster_from_the_dome_on_Methodist_Central_Hall.jpg";

/// Command-line arguments for caption-image.
#[derive(Parser, Debug)]
#[command(name = "caption-image")]
#[command(about = "Caption an image fetched over HTTP with Google Gemini")]
#[command(version)]
struct Args {
    /// URL of the image to caption
    #[arg(default_value = DEFAULT_IMAGE_URL)]
    url: Url,

    /// Prompt sent alongside the image
    #[arg(short, long, default_value = DEFAULT_PROMPT)]
    prompt: String,

    /// Gemini model name, with or without the `models/` prefix
    #[arg(short, long, env = "GEMINI_MODEL", default_value = "models/gemini-1.5-pro")]
    model: String,

    /// Gemini API key
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: String,

    /// Base URL of the Gemini API
    #[arg(long, env = "GEMINI_BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: Url,

    /// MIME type the image is submitted as
    #[arg(long, default_value = "image/jpeg", conflicts_with = "detect_mime")]
    mime_type: Mime,

    /// Derive the MIME type from the response headers or the URL extension
    #[arg(long)]
    detect_mime: bool,

    /// Sampling temperature
    #[arg(long)]
    temperature: Option<f32>,

    /// Upper bound on generated tokens
    #[arg(long)]
    max_output_tokens: Option<i32>,

    /// Per-request timeout in seconds for both the download and the model call
    #[arg(long)]
    timeout: Option<u64>,
}

#[derive(Debug, Snafu)]
enum Error {
    #[snafu(display("failed to create Gemini API client"))]
    Client { source: ClientError },

    #[snafu(display("failed to create image fetcher"))]
    Fetcher { source: FetchError },

    #[snafu(display("captioning failed"))]
    Pipeline { source: PipelineError },
}

async fn do_main(args: Args) -> Result<(), Error> {
    let timeout = args.timeout.map(Duration::from_secs);

    let client = Gemini::with_options(&args.api_key, args.model, args.base_url, timeout)
        .context(ClientSnafu)?;

    let mime_strategy = if args.detect_mime {
        MimeStrategy::Detect
    } else {
        MimeStrategy::Fixed(args.mime_type)
    };
    let fetcher = ImageFetcher::with_options(mime_strategy, timeout).context(FetcherSnafu)?;

    let mut captioner = GeminiCaptioner::new(client);
    if let Some(temperature) = args.temperature {
        captioner = captioner.with_temperature(temperature);
    }
    if let Some(max_output_tokens) = args.max_output_tokens {
        captioner = captioner.with_max_output_tokens(max_output_tokens);
    }

    info!(url = %args.url, "captioning image");
    CaptionPipeline::new(fetcher, captioner)
        .with_prompt(args.prompt)
        .run(&args.url, &mut Reporter::stdout())
        .await
        .context(PipelineSnafu)
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    if let Err(err) = do_main(args).await {
        let formated = DisplayErrorChain::new(err).to_string();
        eprintln!("{formated}");
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
