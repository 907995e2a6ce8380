//! PdfPress command-line client

use anyhow::Result;
use clap::Parser;
use tokio::sync::mpsc;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use pdfpress_client::{report, Args, CompressClient};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Progress and results go to the terminal; logs stay quiet unless asked for
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let client = CompressClient::new(&args.server)?;
    debug!(endpoint = %client.endpoint(), file = %args.file.display(), "Starting upload");

    let (events, mut progress) = mpsc::unbounded_channel();
    let quiet = args.quiet;
    let renderer = tokio::spawn(async move {
        while let Some(event) = progress.recv().await {
            if !quiet {
                report::draw_progress(&event);
            }
        }
    });

    eprintln!("Compressing {}...", args.file.display());
    let outcome = client.compress_file(&args.file, events).await;
    // Sender is gone once the upload future finishes, so the renderer drains and exits
    let _ = renderer.await;

    let outcome = match outcome {
        Ok(outcome) => outcome,
        Err(err) => {
            eprintln!("Error compressing PDF. Please try again.");
            return Err(err);
        }
    };

    let path = outcome.save(&args.output).await?;
    println!("{}", report::summary(&outcome.result));
    println!("Saved to {}", path.display());

    Ok(())
}
