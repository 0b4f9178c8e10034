use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use plaintest::cli::commands::{SuiteSources, cmd_interactive, cmd_parse, cmd_run};
use plaintest::cli::config::{AppConfig, Cli, Commands, RunOverrides, load_config};
use plaintest::spec::cancel::CancelToken;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let loaded = load_config(cli.config.as_deref());

    let log_level = match &loaded {
        Ok(config) => config.log_level.clone(),
        Err(_) => AppConfig::default().log_level,
    };
    init_tracing(&log_level, cli.verbose);

    let mut config = loaded.unwrap_or_else(|e| {
        warn!(error = %e, "using default configuration");
        AppConfig::default()
    });

    match cli.command {
        Commands::Run {
            files,
            test_dir,
            headless,
            headed,
            mock,
            robust,
            workers,
            output_dir,
            format,
            trace,
            suite_timeout,
        } => {
            config.apply(&RunOverrides {
                headless: headless_override(headless, headed),
                mock,
                robust,
                workers,
                output_dir,
                suite_timeout_secs: suite_timeout,
            });

            let cancel = match config.suite_timeout() {
                Some(timeout) => CancelToken::with_timeout(timeout),
                None => CancelToken::new(),
            };
            spawn_ctrl_c_watcher(cancel.clone());

            let sources = SuiteSources { files, test_dir };
            let code = cmd_run(&sources, &config, format, trace.as_deref(), cancel)?;
            if code != 0 {
                std::process::exit(code);
            }
        }
        Commands::Interactive {
            url,
            headless,
            headed,
            mock,
        } => {
            config.apply(&RunOverrides {
                headless: headless_override(headless, headed),
                mock,
                ..RunOverrides::default()
            });
            cmd_interactive(&config, url.as_deref(), CancelToken::new())?;
        }
        Commands::Parse { instructions, mock } => {
            cmd_parse(&instructions, &config, mock)?;
        }
    }

    Ok(())
}

fn headless_override(headless: bool, headed: bool) -> Option<bool> {
    if headed {
        Some(false)
    } else if headless {
        Some(true)
    } else {
        None
    }
}

/// RUST_LOG wins; otherwise the config level, raised by -v / -vv.
fn init_tracing(config_level: &str, verbose: u8) {
    let level = match verbose {
        0 => config_level,
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Cancel the run on the first Ctrl-C.
fn spawn_ctrl_c_watcher(cancel: CancelToken) {
    std::thread::spawn(move || {
        let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
            Ok(rt) => rt,
            Err(e) => {
                warn!(error = %e, "could not install Ctrl-C handler");
                return;
            }
        };
        runtime.block_on(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("interrupt received, cancelling run");
                cancel.cancel();
            }
        });
    });
}
