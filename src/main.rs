mod auth;
mod commands;
mod config;
mod download;
mod error;
mod options;
mod resolve;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing::error;
use tracing_subscriber::EnvFilter;

use crate::auth::HttpTransport;
use crate::commands::login::LoginMethod;
use crate::config::Settings;
use crate::error::Result;
use crate::options::{Options, Overrides, StreamMode};

#[derive(Parser, Debug)]
#[command(version, about = "Download videos from Bilibili")]
struct Args {
    #[clap(subcommand)]
    subcmd: SubCmd,

    #[clap(long, global = true)]
    /// use this settings file instead of the default one
    config: Option<PathBuf>,

    #[clap(short, long, global = true)]
    /// directory the downloaded files are written to
    output: Option<PathBuf>,

    #[clap(short, long, global = true)]
    /// maximum number of simultaneous transfers; 1 fetches video and audio one after the other
    threads: Option<usize>,

    #[clap(short, long, global = true)]
    /// enable debug logging
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum SubCmd {
    /// Login with a QR code, a cookie file or the browser
    Login {
        #[clap(long, conflicts_with_all = ["browser", "cookie"])]
        /// import cookies from a tab separated file
        cookie_file: Option<PathBuf>,

        #[clap(long, conflicts_with = "browser")]
        /// use a Cookie header value such as "SESSDATA=...; bili_jct=..."
        cookie: Option<String>,

        #[clap(long)]
        /// open the login page in the browser and export cookies manually
        browser: bool,

        #[clap(short, long)]
        /// login again even if a valid session exists
        force: bool,
    },
    /// Remove the saved login session
    Logout {
        #[clap(short, long)]
        /// do not ask for confirmation
        force: bool,
    },
    /// Download a video, a multi-part video or a season
    Download {
        /// video or season URL
        url: String,

        #[clap(short, long)]
        /// quality label: best, 1080p, 720p, 480p or 360p
        quality: Option<String>,

        #[clap(short, long)]
        /// container of the merged file
        format: Option<String>,

        #[clap(long, conflicts_with = "video_only")]
        /// only download the audio stream
        audio_only: bool,

        #[clap(long)]
        /// only download the video stream
        video_only: bool,

        #[clap(short, long, default_value = "all")]
        /// pages to download, e.g. "1-3,5"
        pages: String,
    },
    /// Show version and build information
    Version,
    /// Show the terms of use, privacy notice and disclaimer
    Legal,
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(args: Args, settings: Settings) -> Result<()> {
    match args.subcmd {
        SubCmd::Login { cookie_file, cookie, browser, force } => {
            let method = match (cookie_file, cookie) {
                (Some(path), _) => LoginMethod::CookieFile(path),
                (None, Some(cookies)) => LoginMethod::CookieHeader(cookies),
                (None, None) if browser => LoginMethod::Browser,
                (None, None) => LoginMethod::Qr,
            };
            let mut store = commands::open_store()?;
            let transport = HttpTransport::new()?;
            commands::login::run(&mut store, &transport, method, force).await
        }
        SubCmd::Logout { force } => {
            let mut store = commands::open_store()?;
            let transport = HttpTransport::new()?;
            commands::logout::run(&mut store, &transport, force).await
        }
        SubCmd::Download { url, quality, format, audio_only, video_only, pages } => {
            let mode = match (audio_only, video_only) {
                (true, _) => StreamMode::AudioOnly,
                (false, true) => StreamMode::VideoOnly,
                (false, false) => StreamMode::Both,
            };
            let overrides = Overrides { output: args.output, threads: args.threads, quality, format };
            let options = Options::new(settings, overrides, mode);

            let store = commands::open_store()?;
            let transport = HttpTransport::new()?;
            commands::download::run(&store, &transport, &url, &pages, &options).await?;
            Ok(())
        }
        SubCmd::Version => {
            commands::version::run();
            Ok(())
        }
        SubCmd::Legal => {
            commands::legal::run();
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let config_path = args.config.clone().unwrap_or_else(config::default_config_path);
    let settings = Settings::load(&config_path);
    let verbose = args.verbose || settings.as_ref().map(|settings| settings.verbose).unwrap_or(false);
    init_tracing(verbose);

    let result = match settings {
        Ok(settings) => run(args, settings).await,
        Err(err) => Err(err),
    };

    if let Err(err) = result {
        error!("{}", err);
        process::exit(1);
    }
}
