use anyhow::{bail, Context, Result};
use indicatif::{HumanBytes, ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Duration;
use tokio::fs::{self, OpenOptions};
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

use slicedl::client::build_client;
use slicedl::hashing::{calculate_hash, verify_hash};
use slicedl::utils::{get_filename_from_url, sanitize_filename};
use slicedl::{DownloadConfig, DownloadSession, RunState};

use crate::Args;

pub async fn run_download(args: Args) -> Result<()> {
    let url = Url::parse(&args.url).context("Invalid URL")?;
    let output = match args.output {
        Some(path) => path,
        None => PathBuf::from(sanitize_filename(&get_filename_from_url(&url))),
    };

    let config = DownloadConfig::new(url.as_str(), &output)?
        .with_block_count(args.blocks)?
        .with_buffer_size(args.buffer_size)?
        .with_durable(!args.no_sync);

    // Existing content is kept.
    let target = config.target_path().to_path_buf();
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).await.context("Failed to create output directory")?;
    }
    OpenOptions::new()
        .create(true)
        .write(true)
        .open(&target)
        .await
        .context("Failed to create output file")?;

    let client = build_client(Duration::from_secs(args.connect_timeout))?;
    println!("Probing {}...", url);
    let session = DownloadSession::create_with_client(&client, config)
        .await
        .context("Preflight request failed")?;
    session.init(client)?;

    let pb = ProgressBar::new(session.content_length());
    pb.set_style(ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes:>12}/{total_bytes:<12} {bytes_per_sec:>12} {eta:>4} {msg}")?
        .progress_chars("=>-"));
    pb.set_message(format!("Downloading {}", target.display()));

    let scope = CancellationToken::new();
    session.start(&scope)?;

    let monitor = {
        let session = session.clone();
        let pb = pb.clone();
        tokio::spawn(async move {
            loop {
                pb.set_position(session.download_size());
                if !session.is_downloading() {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
        })
    };

    let outcome = tokio::select! {
        outcome = session.wait() => outcome,
        _ = tokio::signal::ctrl_c() => {
            if let Err(e) = session.pause() {
                debug!(error = %e, "pause after interrupt");
            }
            session.wait().await
        }
    };
    let _ = monitor.await;
    pb.set_position(session.download_size());

    match outcome {
        Ok(RunState::Completed) => {
            pb.finish_with_message(format!("Completed   {}", target.display()));
        }
        Ok(state) => {
            pb.abandon_with_message(format!(
                "{} at {} of {}",
                state,
                HumanBytes(session.download_size()),
                HumanBytes(session.content_length())
            ));
            bail!("Download of {} did not complete", url);
        }
        Err(e) => {
            pb.abandon_with_message(format!("Failed      {}", target.display()));
            return Err(e).context(format!("Failed to download {}", url));
        }
    }

    match args.sha256 {
        Some(expected) => {
            let hash = verify_hash(&target, &expected).await?;
            println!("Verified    {} (SHA256: {})", target.display(), hash);
        }
        None => {
            let hash = calculate_hash(&target).await?;
            println!("SHA256      {}", hash);
        }
    }

    Ok(())
}
