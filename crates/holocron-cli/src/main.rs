// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod logging;
mod probe;
mod runtime;

use anyhow::{Context, Result};
use config::Config;
use holocron_app::{ConnectivityMonitor, ConnectivitySignal};
use holocron_tui::BrowserState;
use logging::{LogConfig, init_logging};
use probe::{ConnectivityProbe, ProbeTarget};
use runtime::HttpRuntime;
use std::env;
use std::path::PathBuf;

fn main() {
    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;
    if options.show_help {
        print_help();
        return Ok(());
    }

    if options.print_config_path {
        println!("{}", options.config_path.display());
        return Ok(());
    }

    if options.print_example {
        print!("{}", Config::example_config(&options.config_path));
        return Ok(());
    }

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `holocron --print-example-config` to generate a v1 template",
            options.config_path.display()
        )
    })?;

    let log_config = LogConfig::from_config(&config, options.verbosity)?;
    init_logging(&log_config)?;
    tracing::info!(
        config = %options.config_path.display(),
        log_file = %log_config.log_file.display(),
        "holocron starting"
    );

    let client = holocron_api::Client::new(config.catalog_base_url(), config.catalog_timeout()?)
        .with_context(|| {
            format!(
                "invalid [catalog] config in {}; fix base_url/timeout values",
                options.config_path.display()
            )
        })?;
    if options.check_only {
        return Ok(());
    }

    let monitor = ConnectivityMonitor::new();
    let _probe = if options.offline {
        monitor.report(ConnectivitySignal::Offline);
        None
    } else if config.probe_enabled() {
        let target = ProbeTarget::from_base_url(config.catalog_base_url())?;
        Some(ConnectivityProbe::spawn(
            target,
            config.probe_interval()?,
            monitor.clone(),
        ))
    } else {
        None
    };

    let mut state = BrowserState::default();
    let mut runtime = HttpRuntime::new(client, monitor);
    let result = holocron_tui::run_app(&mut state, &mut runtime);
    tracing::info!(ok = result.is_ok(), "holocron exiting");
    result
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    print_config_path: bool,
    print_example: bool,
    check_only: bool,
    offline: bool,
    verbosity: u8,
    show_help: bool,
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        config_path: default_config_path,
        print_config_path: false,
        print_example: false,
        check_only: false,
        offline: false,
        verbosity: 0,
        show_help: false,
    };

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_ref() {
            "--config" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--config requires a file path"))?;
                options.config_path = PathBuf::from(value.as_ref());
            }
            "--print-config-path" => {
                options.print_config_path = true;
            }
            "--print-example-config" => {
                options.print_example = true;
            }
            "--check" => {
                options.check_only = true;
            }
            "--offline" => {
                options.offline = true;
            }
            "-v" | "--verbose" => {
                options.verbosity = options.verbosity.saturating_add(1);
            }
            "-vv" => {
                options.verbosity = options.verbosity.saturating_add(2);
            }
            "--help" | "-h" => {
                options.show_help = true;
            }
            unknown => {
                return Err(anyhow::anyhow!(
                    "unknown argument {unknown:?}; run with --help to see supported options"
                ));
            }
        }
    }

    Ok(options)
}

fn print_help() {
    println!("holocron: browse planets, starships, and films from the catalog");
    println!("  --config <path>          Use a specific config path");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-example-config   Print a v1 config template");
    println!("  --check                  Validate config and catalog client, then exit");
    println!("  --offline                Start offline with the probe disabled");
    println!("  -v, -vv                  Raise log level to debug or trace");
    println!("  --help                   Show this help");
}
