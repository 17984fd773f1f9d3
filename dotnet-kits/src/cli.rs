//! Command line definitions

use clap::{Args, Parser, Subcommand};
use kits_lib::{ArtifactType, ChannelVersion, PlatformRid};
use std::path::PathBuf;

/// Download and manage .NET SDKs, runtimes and OmniSharp
#[derive(Parser, Debug)]
#[command(name = "dotnet-kits", author, version)]
pub struct Cli {
    /// Config file (defaults to config.json in the platform config directory)
    #[arg(long, global = true, env = "DOTNET_KITS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log filter, overrides the config file (RUST_LOG wins over both)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download the latest build of a channel into the install folder
    Download(DownloadArgs),

    /// List SDKs or runtimes installed on this machine
    #[command(subcommand)]
    List(ListTarget),

    /// Delete an installed SDK or runtime by its folder
    Delete(DeleteArgs),

    /// Download the latest OmniSharp server
    Omnisharp(OmnisharpArgs),
}

#[derive(Args, Debug)]
pub struct DownloadArgs {
    /// Channel, e.g. 9.0
    #[arg(long, short = 'c', default_value = "10.0")]
    pub channel: ChannelVersion,

    /// sdk, runtime or aspnet-runtime
    #[arg(long = "type", short = 't', default_value = "sdk")]
    pub artifact_type: ArtifactType,

    /// Runtime identifier, e.g. linux-x64 (defaults to this machine)
    #[arg(long)]
    pub rid: Option<PlatformRid>,

    /// Install root (defaults to ~/.dotnet)
    #[arg(long)]
    pub base_folder: Option<PathBuf>,

    /// Release index URL
    #[arg(long)]
    pub feed_url: Option<String>,

    /// Give up after this many seconds
    #[arg(long)]
    pub deadline_secs: Option<u64>,

    /// Open the installed folder when done
    #[arg(long)]
    pub open: bool,
}

#[derive(Subcommand, Debug)]
pub enum ListTarget {
    Sdks(ListArgs),
    Runtimes(ListArgs),
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Print JSON instead of one line per artifact
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// Version folder as shown by `list`
    pub path: PathBuf,
}

#[derive(Args, Debug)]
pub struct OmnisharpArgs {
    /// Install folder (defaults to ~/.omnisharp)
    #[arg(long)]
    pub target: Option<PathBuf>,

    /// Open the installed folder when done
    #[arg(long)]
    pub open: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_download_flags() {
        let cli = Cli::try_parse_from([
            "dotnet-kits",
            "download",
            "-c",
            "8.0",
            "--type",
            "aspnet-runtime",
            "--rid",
            "win-arm64",
            "--open",
        ])
        .unwrap();

        let Commands::Download(args) = cli.command else {
            panic!("expected download");
        };
        assert_eq!(args.channel, ChannelVersion::Version8);
        assert_eq!(args.artifact_type, ArtifactType::AspNetRuntime);
        assert_eq!(args.rid, Some(PlatformRid::WinArm64));
        assert!(args.open);
    }

    #[test]
    fn download_defaults_to_latest_sdk() {
        let cli = Cli::try_parse_from(["dotnet-kits", "download"]).unwrap();
        let Commands::Download(args) = cli.command else {
            panic!("expected download");
        };
        assert_eq!(args.channel, ChannelVersion::Version10);
        assert_eq!(args.artifact_type, ArtifactType::Sdk);
        assert_eq!(args.rid, None);
    }

    #[test]
    fn rejects_unknown_channel() {
        assert!(Cli::try_parse_from(["dotnet-kits", "download", "-c", "4.0"]).is_err());
    }

    #[test]
    fn parses_list_subcommands() {
        let cli = Cli::try_parse_from(["dotnet-kits", "list", "runtimes", "--json"]).unwrap();
        assert!(matches!(cli.command, Commands::List(ListTarget::Runtimes(ListArgs { json: true }))));
    }
}
