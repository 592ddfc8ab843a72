mod error;
mod generate;
mod rate_limit;
mod routes;

use std::path::PathBuf;

use catpp_core::manifest::{ManifestLoader, ManifestSource};
use catpp_core::openai::{OpenAiClient, OpenAiClientConfig};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use error::AppError;
use generate::Generator;
use rate_limit::RateLimiter;

/// CAT++ content generator
///
/// Produces the topic manifest and one page document per chapter using an
/// OpenAI-compatible chat-completions endpoint.
#[derive(Parser, Debug)]
#[command(name = "catpp-gen")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Directory holding topics.json
    #[arg(long, env = "CATPP_PUBLIC_DIR", default_value = "public", global = true)]
    public_dir: PathBuf,

    /// Directory receiving chapter pages ({category}/{slug}.json)
    #[arg(long, env = "CATPP_CONTENT_DIR", default_value = "content", global = true)]
    content_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct ModelArgs {
    /// Chat model name
    #[arg(long, env = "CATPP_MODEL")]
    model: String,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate topics.json
    Topics {
        #[command(flatten)]
        llm: ModelArgs,
    },
    /// Generate chapter pages for the manifest
    Content {
        #[command(flatten)]
        llm: ModelArgs,

        /// Only this topic category
        #[arg(long, value_name = "CATEGORY")]
        topic: Option<String>,

        /// Regenerate pages that already exist
        #[arg(long)]
        force: bool,
    },
    /// Print every chapter route
    Routes {
        /// Manifest file path or http(s) URL (default: <public-dir>/topics.json)
        #[arg(long, value_name = "PATH_OR_URL")]
        manifest: Option<String>,

        /// Fail if any route has no page file under the content dir
        #[arg(long)]
        check: bool,
    },
}

fn build_generator(model: String) -> Result<Generator, AppError> {
    let openai_config = OpenAiClientConfig::from_env();
    info!(
        base_url = %openai_config.base_url,
        model = %model,
        timeout_ms = openai_config.default_timeout.as_millis(),
        max_retries = openai_config.max_retries,
        "openai client configured"
    );
    let limiter = RateLimiter::from_env();
    if let Some(limiter) = &limiter {
        info!(rps = limiter.rps(), "rate limiting enabled");
    }
    Ok(Generator::new(OpenAiClient::new(openai_config)?, model, limiter))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // stdout carries command output (routes); logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let default_manifest = cli.public_dir.join("topics.json");

    match cli.command {
        Command::Topics { llm } => {
            let generator = build_generator(llm.model)?;
            generate::write_topics(&generator, &cli.public_dir).await?;
        }
        Command::Content { llm, topic, force } => {
            let manifest = ManifestLoader::from_path(&default_manifest)
                .try_load()
                .await?;
            info!(topics = manifest.len(), "manifest loaded");
            let generator = build_generator(llm.model)?;
            let report = generate::write_content(
                &generator,
                &manifest,
                &cli.content_dir,
                topic.as_deref(),
                force,
            )
            .await?;
            info!(
                written = report.written,
                skipped = report.skipped,
                failed = report.failed,
                "content generation complete"
            );
        }
        Command::Routes { manifest, check } => {
            let loader = match manifest {
                Some(location) => ManifestLoader::new(ManifestSource::parse(&location)),
                None => ManifestLoader::from_path(&default_manifest),
            };
            let manifest = loader.try_load().await?;
            let statuses = routes::route_statuses(&manifest, &cli.content_dir);
            let mut missing = 0;
            for status in &statuses {
                if check && !status.has_page {
                    missing += 1;
                    println!("{}\tmissing", status.route);
                } else {
                    println!("{}", status.route);
                }
            }
            if missing > 0 {
                return Err(AppError::MissingPages(missing).into());
            }
        }
    }
    Ok(())
}
