use anyhow::Context as _;
use colored::Colorize;
use oreg_driver::{Context, FilesystemDriver};
use oreg_server::{OregServer, ServerConfig, StorageConfig};
use oreg_storage::{
    resolve_referrers, ManifestPut, ManifestService, ReferenceService, Registry, Repository,
    RepositoryName, StoredRepository,
};
use oreg_types::{Digest, ImageIndex};
use std::sync::Arc;

use crate::cli::*;

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Serve(args) => cmd_serve(args).await,
        Command::PutManifest(args) => cmd_put_manifest(args).await,
        Command::Link(args) => cmd_link(args).await,
        Command::Referrers(args) => cmd_referrers(args, &cli.format).await,
    }
}

async fn cmd_serve(args: ServeArgs) -> anyhow::Result<()> {
    let mut config = match &args.config {
        Some(path) => ServerConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if let Some(root) = args.root {
        config.storage = StorageConfig::Filesystem {
            root_directory: root,
        };
    }
    println!("oreg listening on {}", config.bind_addr.to_string().bold());
    OregServer::new(config).serve().await?;
    Ok(())
}

fn open_repository(target: &RepoArgs) -> anyhow::Result<StoredRepository> {
    let name = RepositoryName::parse(&target.repo)?;
    let registry = Registry::new(Arc::new(FilesystemDriver::new(target.root.clone())));
    tracing::debug!(root = %target.root.display(), repository = %name, "opened repository");
    Ok(registry.open(&name))
}

async fn cmd_put_manifest(args: PutManifestArgs) -> anyhow::Result<()> {
    let payload = tokio::fs::read(&args.file)
        .await
        .with_context(|| format!("reading {}", args.file.display()))?;
    let repo = open_repository(&args.target)?;

    let mut manifest = ManifestPut::new(args.media_type, bytes::Bytes::from(payload));
    if let Some(artifact_type) = args.artifact_type {
        manifest = manifest.with_artifact_type(artifact_type);
    }
    if let Some(subject) = &args.subject {
        manifest = manifest.with_subject(Digest::parse(subject)?);
    }

    let descriptor = repo.manifests().put(&Context::background(), manifest).await?;
    println!("{} Stored {}", "✓".green().bold(), descriptor.digest.to_string().yellow());
    if let Some(subject) = &args.subject {
        println!("  Subject: {}", subject.cyan());
    }
    Ok(())
}

async fn cmd_link(args: LinkArgs) -> anyhow::Result<()> {
    let referrer = Digest::parse(&args.referrer)?;
    let subject = Digest::parse(&args.subject)?;
    let repo = open_repository(&args.target)?;
    repo.references()
        .link(&Context::background(), &args.media_type, &referrer, &subject)
        .await?;
    println!(
        "{} Linked {} → {}",
        "✓".green().bold(),
        referrer.short().yellow(),
        subject.short().cyan()
    );
    Ok(())
}

async fn cmd_referrers(args: ReferrersArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let subject = Digest::parse(&args.subject)?;
    let repo = open_repository(&args.target)?;
    let descriptors =
        resolve_referrers(&Context::background(), &repo, &subject, &args.media_type).await?;

    match format {
        OutputFormat::Text => {
            if descriptors.is_empty() {
                println!("No referrers for {}.", subject.short().cyan());
            }
            for descriptor in &descriptors {
                let kind = descriptor
                    .artifact_type
                    .as_deref()
                    .unwrap_or(&descriptor.media_type);
                println!("{}  {}", descriptor.digest.to_string().yellow(), kind.dimmed());
            }
        }
        OutputFormat::Json => {
            let index = ImageIndex::new(descriptors);
            println!("{}", serde_json::to_string_pretty(&index)?);
        }
    }
    Ok(())
}
