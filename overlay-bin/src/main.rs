//! Console front-end: parses CLI flags, loads settings, and drives
//! `overlay_lib::overlord::Overlord` from a plain-text output sink.
//!
//! Logging setup is grounded on `gossip-bin/src/main.rs`'s use of
//! `tracing_subscriber::fmt` with an `EnvFilter`, honoring `RUST_LOG` but
//! overridable by `-q`/`-v` counts from the CLI.

mod console;

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use overlay_lib::nick_database::NickDatabase;
use overlay_lib::overlord::Overlord;
use overlay_lib::player::Column;
use overlay_lib::settings::Settings;
use overlay_lib::tailer::StartPosition;

/// Live Bed Wars lobby stat overlay.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Path to the Minecraft client's chat log (e.g. `.minecraft/logs/latest.log`).
    #[arg(long)]
    logfile: Option<PathBuf>,

    /// Path to the settings TOML file.
    #[arg(long, default_value = "settings.toml")]
    settings: PathBuf,

    /// Suppress all output below error level.
    #[arg(short, long)]
    quiet: bool,

    /// Increase log verbosity; repeatable up to `-vvvvv`.
    #[arg(short, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Number of stats-fetch worker threads, clipped to [2, 16].
    #[arg(short = 't', long = "threads")]
    threads: Option<usize>,

    /// Replay `--logfile` from the beginning instead of tailing from the end,
    /// for exercising the pipeline against a bundled static logfile.
    #[arg(long)]
    test: bool,
}

fn init_logging(quiet: bool, verbose: u8) {
    let default_level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn acquire_single_instance_lock(path: &std::path::Path) -> std::io::Result<std::fs::File> {
    std::fs::OpenOptions::new().write(true).create_new(true).open(path)
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.quiet, cli.verbose);

    let lock_path = std::env::temp_dir().join("bw-overlay.lock");
    let _lock_file = match acquire_single_instance_lock(&lock_path) {
        Ok(file) => file,
        Err(_) => {
            tracing::error!("another instance is already running ({})", lock_path.display());
            std::process::exit(1);
        }
    };

    let Some(logfile) = cli.logfile else {
        tracing::error!("--logfile is required");
        std::process::exit(1);
    };

    let mut settings = match Settings::load(&cli.settings) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("failed to load settings: {e}");
            std::process::exit(1);
        }
    };
    if let Some(threads) = cli.threads {
        settings.worker_threads = threads.clamp(2, 16);
    }

    let nick_database = NickDatabase::new(settings.known_nicks.clone(), Vec::new());

    let mut overlord = match Overlord::new(settings, cli.settings.clone(), nick_database) {
        Ok(o) => o,
        Err(e) => {
            tracing::error!("failed to start overlay: {e}");
            std::process::exit(1);
        }
    };

    let start_at = if cli.test {
        StartPosition::Beginning
    } else {
        StartPosition::End
    };
    overlord.start_tailer(logfile, start_at);

    let redraw_event = overlord.redraw_event();
    loop {
        overlord.poll_completed();
        if redraw_event.wait_timeout(Duration::from_millis(250)) {
            let state = overlord.state_snapshot();
            let players = overlord.player_list(Column::Index);
            print!("\x1B[2J\x1B[1;1H"); // clear screen
            println!("{}", console::render_table(&players, state.own_username.as_deref()));
        }
    }
}
