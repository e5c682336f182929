use bitmeter_core::{config::CliConfig, Config, Monitor, SpeedUnit};
use clap::{Arg, ArgMatches, Command};
use std::{
    fs::OpenOptions,
    io::{stdout, Write},
    path::{Path, PathBuf},
    process,
    sync::Mutex,
    thread,
};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn command() -> Command {
    Command::new("bitmeter")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Live network throughput and system load meter")
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("PATH")
                .help("Path to JSON configuration file")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("interval")
                .long("interval")
                .value_name("MS")
                .help("Rate sampling interval in milliseconds")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("interface")
                .long("interface")
                .value_name("NAME")
                .help("Monitor a single interface instead of all of them"),
        )
        .arg(
            Arg::new("unit")
                .long("unit")
                .value_name("UNIT")
                .help("Speed unit")
                .value_parser(["auto", "bytes", "kbps", "mbps", "gbps"]),
        )
        .arg(
            Arg::new("no-system-stats")
                .long("no-system-stats")
                .help("Hide the CPU/RAM panel")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("list-interfaces")
                .long("list-interfaces")
                .help("Print the selectable interfaces and exit")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .help("Print one JSON snapshot per refresh instead of the live view")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("count")
                .long("count")
                .value_name("N")
                .help("Number of JSON snapshots to print (default: until interrupted)")
                .requires("json")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("write-config")
                .long("write-config")
                .value_name("PATH")
                .help("Write the effective configuration as JSON and exit")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("log-file")
                .long("log-file")
                .value_name("PATH")
                .help("Log file for the live view")
                .default_value("bitmeter.log")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .value_name("LEVEL")
                .help("Log filter when RUST_LOG is not set")
                .default_value("info"),
        )
}

fn run() -> anyhow::Result<()> {
    let matches = command().get_matches();

    let log_to_stderr = matches.get_flag("json") || matches.get_flag("list-interfaces");
    init_logging(
        matches.get_one::<PathBuf>("log-file").map(PathBuf::as_path),
        matches.get_one::<String>("log-level").map(String::as_str).unwrap_or("info"),
        log_to_stderr,
    )?;

    let cli_config = cli_config(&matches)?;
    let config_path = matches.get_one::<PathBuf>("config").map(PathBuf::as_path);
    let config = Config::load(Some(&cli_config), config_path)?;

    if let Some(path) = matches.get_one::<PathBuf>("write-config") {
        config.save_to_file(path)?;
        println!("Wrote configuration to {}", path.display());
        return Ok(());
    }

    if matches.get_flag("list-interfaces") {
        return list_interfaces(&config);
    }

    let mut monitor = Monitor::with_system_sources(config.sampler.clone())?;
    monitor.start()?;

    if matches.get_flag("json") {
        run_json(&config, monitor, matches.get_one::<u64>("count").copied())
    } else {
        run_console(config, monitor, Config::settings_path(config_path))
    }
}

fn cli_config(matches: &ArgMatches) -> anyhow::Result<CliConfig> {
    let speed_unit = matches
        .get_one::<String>("unit")
        .map(|u| u.parse::<SpeedUnit>())
        .transpose()?;

    Ok(CliConfig {
        interval_ms: matches.get_one::<u64>("interval").copied(),
        interface: matches.get_one::<String>("interface").cloned(),
        speed_unit,
        no_system_stats: matches.get_flag("no-system-stats"),
    })
}

fn init_logging(log_file: Option<&Path>, level: &str, to_stderr: bool) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match log_file.filter(|_| !to_stderr) {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    fmt::layer()
                        .with_writer(Mutex::new(file))
                        .with_target(true)
                        .with_thread_names(true)
                        .with_ansi(false),
                )
                .try_init()?;
        }
        None => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
                .try_init()?;
        }
    }

    Ok(())
}

fn list_interfaces(config: &Config) -> anyhow::Result<()> {
    let monitor = Monitor::with_system_sources(config.sampler.clone())?;
    for name in monitor.list_interfaces() {
        println!("{}", name);
    }
    Ok(())
}

/// Print one snapshot per display refresh, one JSON document per line
fn run_json(config: &Config, mut monitor: Monitor, count: Option<u64>) -> anyhow::Result<()> {
    let mut out = stdout().lock();
    let mut printed = 0u64;

    while count.map_or(true, |n| printed < n) {
        thread::sleep(config.display.refresh_interval());
        serde_json::to_writer(&mut out, &monitor.snapshot())?;
        writeln!(out)?;
        out.flush()?;
        printed += 1;
    }

    monitor.stop();
    info!(snapshots = printed, "json stream finished");
    Ok(())
}

fn run_console(
    config: Config,
    monitor: Monitor,
    settings_path: Option<PathBuf>,
) -> anyhow::Result<()> {
    let mut app =
        bitmeter_console::App::new(config.display, monitor).with_settings_path(settings_path);
    let mut stdout = stdout();
    app.run(&mut stdout)?;
    Ok(())
}
