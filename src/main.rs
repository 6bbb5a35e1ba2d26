use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use swinstall::commands::{install, list, uninstall};

/// swinstall - Swift package installer
///
/// Fetch Swift packages from GitHub, any git URL or a local directory, build
/// their executable products in release mode and link them into one bin
/// directory.
///
/// If the GITHUB_TOKEN environment variable is set, it is used when searching
/// GitHub for a package by name.
///
/// Examples:
///   swinstall install nicklockwood/SwiftFormat     # Latest commit of a GitHub repository
///   swinstall install realm/SwiftLint@0.54.0       # A tag, branch or commit
///   swinstall install ./MyTool                     # A local package
///   swinstall uninstall SwiftFormat
#[derive(Parser, Debug)]
#[command(author, version = env!("SWINSTALL_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Install root directory (defaults to ~/.swinstall; also via SWINSTALL_ROOT)
    #[arg(
        long = "root",
        short = 'r',
        env = "SWINSTALL_ROOT",
        value_name = "PATH",
        global = true
    )]
    pub install_root: Option<PathBuf>,

    /// GitHub API URL used for name search (defaults to https://api.github.com)
    #[arg(long = "api-url", value_name = "URL", global = true)]
    pub api_url: Option<String>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Fetch, build and link a package
    Install(InstallArgs),

    /// Remove an installed package and its links
    #[command(alias = "remove")]
    Uninstall(UninstallArgs),

    /// List installed packages and their linked executables
    List,
}

#[derive(clap::Args, Debug)]
pub struct InstallArgs {
    /// OWNER/REPO[@VERSION], a git URL, a local path or a package name
    #[arg(value_name = "PACKAGE")]
    pub package: String,

    /// Tag, branch or commit to check out
    #[arg(long, short = 'v', value_name = "VERSION")]
    pub version: Option<String>,

    /// Install the top search result without asking
    #[arg(long, short = 'y')]
    pub yes: bool,
}

#[derive(clap::Args, Debug)]
pub struct UninstallArgs {
    /// OWNER/REPO, a package name or the name of a linked executable
    #[arg(value_name = "PACKAGE")]
    pub package: String,

    /// Remove without asking
    #[arg(long, short = 'y')]
    pub yes: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    let runtime = swinstall::runtime::RealRuntime;

    match cli.command {
        Commands::Install(args) => {
            install(
                runtime,
                &args.package,
                args.version,
                args.yes,
                cli.install_root,
                cli.api_url,
            )
            .await?
        }
        Commands::Uninstall(args) => uninstall(runtime, &args.package, args.yes, cli.install_root)?,
        Commands::List => list(runtime, cli.install_root)?,
    }
    Ok(())
}
