#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::style)]

use anyhow::Context;
use clap::Parser;
use tokio::io::AsyncWriteExt;
use tracing::Level;

use routeforge::cli::{Args, Command, LinkDocument};
use routeforge::generator::compile_profile;
use routeforge::helpers::{expand_tilde, read_source, read_source_text};
use routeforge::parser::{LinkRegistry, decode_subscription};
use routeforge::profile::Profile;
use routeforge::settings::Settings;

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let is_verbose = args.verbose;
    tracing_subscriber::fmt()
        .with_max_level(if is_verbose {
            Level::TRACE
        } else {
            Level::INFO
        })
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(args).await {
        tracing::error!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let registry = LinkRegistry::with_builtin_codecs();

    match args.command {
        Command::Decode { link } => {
            let decoded = registry.decode(&link)?;
            print_json(&LinkDocument::from(decoded)).await?;
        }
        Command::Encode { file } => {
            let content = read_source_text(&file).await?;
            let doc: LinkDocument = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse outbound document {file}"))?;
            let link = registry.encode(&doc.name, &doc.outbound)?;
            write_stdout(&link).await?;
        }
        Command::Subscription { source } => {
            tracing::info!("Loading subscription from: {}", source);
            let raw = read_source(&source).await?;
            let content = decode_subscription(&raw);
            if content.is_empty() {
                anyhow::bail!("Subscription {source} contains nothing usable");
            }

            let link_count = content.links.len();
            let mut outbounds: Vec<LinkDocument> = content
                .outbounds
                .into_iter()
                .map(LinkDocument::from)
                .collect();
            let decoded = registry.decode_lines_lossy(&content.links.join("\n"));
            tracing::info!("Decoded {} of {} links", decoded.len(), link_count);
            outbounds.extend(decoded.into_iter().map(LinkDocument::from));

            if let Some(usage) = &content.usage {
                tracing::info!("Subscription usage: {}", serde_json::to_string(usage)?);
            }
            print_json(&outbounds).await?;
        }
        Command::Generate {
            profile,
            settings,
            output,
        } => {
            tracing::info!("Loading profile from: {}", profile);
            let content = read_source_text(&profile).await?;
            let profile = Profile::from_json(&content)
                .with_context(|| format!("Failed to parse profile {profile}"))?;

            let settings = match settings {
                Some(path) => {
                    tracing::info!("Loading settings from: {}", path);
                    Settings::load(&path).await?
                }
                None => Settings::default(),
            };

            let config = compile_profile(&profile, &settings)?;
            config.validate().log_errors();

            let json = config.to_json_pretty()?;
            match output {
                Some(path) => {
                    let path = expand_tilde(&path);
                    tokio::fs::write(&path, json)
                        .await
                        .with_context(|| format!("Failed to write config to {path}"))?;
                    tracing::info!("Config written to {}", path);
                }
                None => write_stdout(&json).await?,
            }
            tracing::info!("Config generation complete!");
        }
    }

    Ok(())
}

async fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    write_stdout(&serde_json::to_string_pretty(value)?).await
}

async fn write_stdout(text: &str) -> anyhow::Result<()> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(text.as_bytes()).await?;
    stdout.write_all(b"\n").await?;
    stdout.flush().await?;
    Ok(())
}
