//! dotnet-kits - download and manage .NET SDKs, runtimes and OmniSharp

mod cli;
mod config;
mod notify;

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use cli::{Cli, Commands, DeleteArgs, DownloadArgs, ListArgs, ListTarget, OmnisharpArgs};
use config::KitsConfig;
use kits_lib::dotnet::installer::core::downloader::ReqwestTransport;
use kits_lib::dotnet::inventory::{delete_artifact, InventoryLocations};
use kits_lib::dotnet::types::HostPlatform;
use kits_lib::omnisharp::{self, OmnisharpInstaller};
use kits_lib::{
    ArtifactInstaller, ArtifactRequest, CancelSource, CancelToken, DotnetInventory, InstallError,
    PlatformRid,
};
use notify::ConsoleReporter;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

fn home_dir() -> Result<PathBuf> {
    directories::BaseDirs::new()
        .map(|dirs| dirs.home_dir().to_path_buf())
        .context("Could not determine the home directory")
}

fn load_config(cli: &Cli) -> Result<KitsConfig> {
    match cli.config.clone().or_else(KitsConfig::default_path) {
        Some(path) => Ok(KitsConfig::load(&path)?),
        None => Ok(KitsConfig::default()),
    }
}

fn inventory(config: &KitsConfig) -> Result<DotnetInventory> {
    let mut locations = InventoryLocations::detect().context("Could not determine the home directory")?;
    if let Some(root) = &config.ide_managed_root {
        locations = locations.with_ide_managed_root(Some(root.clone()));
    }
    Ok(DotnetInventory::new(locations))
}

async fn download(args: DownloadArgs, config: &KitsConfig, cancel: &CancelToken) -> Result<()> {
    let rid = match args.rid {
        Some(rid) => rid,
        None => PlatformRid::from_host(HostPlatform::current())
            .ok_or_else(|| anyhow!("No .NET builds are published for this platform, pass --rid"))?,
    };
    let base = match args.base_folder.or_else(|| config.base_install_folder.clone()) {
        Some(base) => base,
        None => home_dir()?.join(".dotnet"),
    };
    let request = ArtifactRequest::new(args.channel, args.artifact_type, rid, base);

    let mut installer =
        ArtifactInstaller::with_config(&config.transport_config()).context("Failed to create HTTP client")?;
    if let Some(url) = args.feed_url.or_else(|| config.feed_url.clone()) {
        installer = installer.with_feed_url(url);
    }

    let reporter = ConsoleReporter::default();
    let outcome = match args.deadline_secs.map(Duration::from_secs).or_else(|| config.deadline()) {
        Some(deadline) => {
            installer
                .install_with_deadline(&request, &reporter, cancel, deadline)
                .await?
        }
        None => installer.install_cancellable(&request, &reporter, cancel).await?,
    };

    notify::notify_install(&outcome, args.open);
    Ok(())
}

async fn list(target: ListTarget, config: &KitsConfig) -> Result<()> {
    let inventory = inventory(config)?;
    let (artifacts, args, label) = match target {
        ListTarget::Sdks(args) => (inventory.list_installed_sdks().await, args, "SDKs"),
        ListTarget::Runtimes(args) => (inventory.list_installed_runtimes().await, args, "runtimes"),
    };
    let ListArgs { json } = args;

    if json {
        println!("{}", serde_json::to_string_pretty(&artifacts)?);
    } else if artifacts.is_empty() {
        println!("No .NET {} found", label);
    } else {
        for artifact in &artifacts {
            println!("{} ({})", artifact, artifact.origin);
        }
    }
    Ok(())
}

async fn delete(args: DeleteArgs, config: &KitsConfig) -> Result<()> {
    let requested = std::fs::canonicalize(&args.path).unwrap_or_else(|_| args.path.clone());
    let snapshot = inventory(config)?.snapshot().await;

    let artifact = snapshot
        .sdks
        .iter()
        .chain(snapshot.runtimes.iter())
        .find(|artifact| {
            artifact.install_path == args.path
                || std::fs::canonicalize(&artifact.install_path).is_ok_and(|p| p == requested)
        })
        .with_context(|| format!("{} is not an installed .NET SDK or runtime", args.path.display()))?;

    delete_artifact(artifact).await?;
    println!("Deleted {}", artifact);
    Ok(())
}

async fn install_omnisharp(args: OmnisharpArgs, config: &KitsConfig, cancel: &CancelToken) -> Result<()> {
    let target = match args.target.or_else(|| config.omnisharp_folder.clone()) {
        Some(target) => target,
        None => omnisharp::default_target(&home_dir()?),
    };
    let transport =
        ReqwestTransport::new(&config.transport_config()).context("Failed to create HTTP client")?;

    let path = OmnisharpInstaller::new(Arc::new(transport))
        .install_latest(&target, &ConsoleReporter::default(), cancel)
        .await?;

    println!("Installed OmniSharp to {}", path.display());
    if args.open {
        notify::reveal(&path);
    }
    Ok(())
}

async fn run(command: Commands, config: &KitsConfig, cancel: &CancelToken) -> Result<()> {
    match command {
        Commands::Download(args) => download(args, config, cancel).await,
        Commands::List(target) => list(target, config).await,
        Commands::Delete(args) => delete(args, config).await,
        Commands::Omnisharp(args) => install_omnisharp(args, config, cancel).await,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };

    let filter = cli
        .log_level
        .clone()
        .unwrap_or_else(|| config.log_filter().to_string());
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();

    let source = CancelSource::new();
    let cancel = source.token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupted, cancelling");
            source.cancel();
        }
    });

    if let Err(e) = run(cli.command, &config, &cancel).await {
        if e.downcast_ref::<InstallError>().is_some_and(InstallError::is_cancelled) {
            eprintln!("Cancelled");
            std::process::exit(130);
        }
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
