use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use pomodoro_applet::applet::{Applet, run};
use pomodoro_applet::config::ConfigStore;
use pomodoro_applet::hypr::{HotkeyRegistrar, HyprlandHotkeys};
use pomodoro_applet::notify::DesktopNotifier;
use pomodoro_applet::pomodoro::{EngineEvents, Snapshot};
use pomodoro_applet::scheduler::TokioScheduler;
use pomodoro_applet::ws::{
    self, ControlCommand, DEFAULT_CONTROL_ADDR, bind_control_socket, create_control_channel,
    send_command,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Pomodoro timer for desktop panels", long_about = None)]
struct Cli {
    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Control socket address of the running applet
    #[arg(long, global = true, default_value = DEFAULT_CONTROL_ADDR)]
    addr: SocketAddr,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the applet, printing the panel label every time it changes
    Run {
        /// Settings file (defaults to the platform config directory)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Global key combination that toggles the timer
        #[arg(long, default_value = "F9")]
        hotkey: String,

        /// Do not register the global hotkey
        #[arg(long)]
        no_hotkey: bool,

        /// Start the first pomodoro right away
        #[arg(long)]
        start: bool,
    },
    /// Start or pause the timer
    Toggle,
    Start,
    Stop,
    /// Reset the timer and the completed session count
    Reset {
        /// Keep the completed session count
        #[arg(long)]
        keep_count: bool,
    },
    /// Change the pomodoro length (rounded up to whole minutes)
    Duration {
        #[arg(long, conflicts_with = "fraction", required_unless_present = "fraction")]
        minutes: Option<u32>,

        /// Slider position between 0 and 1, where 1 is one hour
        #[arg(long)]
        fraction: Option<f64>,
    },
    /// Show remaining time instead of elapsed time
    Countdown { state: Switch },
    /// Send a desktop notification when a pomodoro finishes
    Notifications { state: Switch },
    /// Print the current state
    Status,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Switch {
    On,
    Off,
}

impl Switch {
    fn enabled(self) -> bool {
        matches!(self, Switch::On)
    }
}

fn control_command(command: &Commands) -> Result<ControlCommand> {
    let command = match command {
        Commands::Run { .. } => bail!("run is not a control command"),
        Commands::Toggle => ControlCommand::Toggle,
        Commands::Start => ControlCommand::Start,
        Commands::Stop => ControlCommand::Stop,
        Commands::Reset { keep_count } => ControlCommand::Reset {
            reset_count: !keep_count,
        },
        Commands::Duration {
            minutes: Some(minutes),
            ..
        } => ControlCommand::SetDuration {
            seconds: minutes
                .checked_mul(60)
                .context("Duration is too long")?,
        },
        Commands::Duration {
            fraction: Some(fraction),
            ..
        } => ControlCommand::SetDurationFraction {
            fraction: *fraction,
        },
        Commands::Duration { .. } => bail!("Either --minutes or --fraction is required"),
        Commands::Countdown { state } => ControlCommand::SetShowCountdown {
            enabled: state.enabled(),
        },
        Commands::Notifications { state } => ControlCommand::SetShowNotifications {
            enabled: state.enabled(),
        },
        Commands::Status => ControlCommand::Status,
    };
    Ok(command)
}

/// Single-quote `word` for `sh`, which runs Hyprland `exec` bindings.
fn shell_quote(word: &str) -> String {
    format!("'{}'", word.replace('\'', r"'\''"))
}

fn toggle_command(exe: &str, addr: SocketAddr) -> String {
    format!("{} --addr {} toggle", shell_quote(exe), addr)
}

fn on_off(enabled: bool) -> &'static str {
    if enabled { "on" } else { "off" }
}

fn print_status(snapshot: &Snapshot) {
    println!("{}", snapshot.label);
    println!(
        "state: {:?} | elapsed: {}s | completed: {}",
        snapshot.state,
        snapshot.elapsed_seconds.max(0),
        snapshot.completed_sessions
    );
    println!(
        "duration: {} | countdown: {} | notifications: {}",
        snapshot.duration_label,
        on_off(snapshot.show_countdown),
        on_off(snapshot.show_notifications)
    );
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = terminate.recv() => {}
                }
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

async fn run_applet(
    addr: SocketAddr,
    config: Option<PathBuf>,
    hotkey: Option<String>,
    start: bool,
) -> Result<()> {
    let config_path = match config {
        Some(path) => path,
        None => ConfigStore::default_path().context("Could not determine config directory")?,
    };

    let (scheduler, ticks) = TokioScheduler::new();
    let mut applet = Applet::init(
        ConfigStore::new(config_path),
        scheduler,
        DesktopNotifier::default(),
    );

    // Bind before anything else so a second instance fails loudly
    let listener = bind_control_socket(addr).await?;
    let (control_tx, controls) = create_control_channel();
    tokio::spawn(async move {
        if let Err(e) = ws::serve(listener, control_tx).await {
            error!("Control socket error: {}", e);
        }
    });

    let mut hotkeys = HyprlandHotkeys::new();
    if let Some(combo) = hotkey {
        let exe = std::env::current_exe().context("Failed to locate own executable")?;
        let command = toggle_command(&exe.display().to_string(), addr);
        if let Err(e) = hotkeys.register(&combo, &command) {
            warn!("Hotkey {} not registered: {}", combo, e);
        }
    }

    if start {
        applet.start();
    }

    info!("Applet running, control socket on ws://{}", addr);
    run(
        &mut applet,
        ticks,
        controls,
        shutdown_signal(),
        |label| println!("{}", label),
    )
    .await;

    hotkeys.unregister_all();
    Ok(())
}

async fn run_client(addr: SocketAddr, command: &Commands) -> Result<()> {
    let control = control_command(command)?;
    let response = send_command(addr, &control)
        .await
        .with_context(|| format!("Is the applet running on {}?", addr))?;

    if !response.success {
        bail!(
            "{}",
            response
                .message
                .unwrap_or_else(|| "Command failed".to_string())
        );
    }

    if let Some(snapshot) = response.snapshot {
        match command {
            Commands::Status => print_status(&snapshot),
            _ => println!("{}", snapshot.label),
        }
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    // stdout carries panel labels, logs go to stderr
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    match &cli.command {
        Commands::Run {
            config,
            hotkey,
            no_hotkey,
            start,
        } => {
            let hotkey = (!no_hotkey).then(|| hotkey.clone());
            run_applet(cli.addr, config.clone(), hotkey, *start).await
        }
        command => run_client(cli.addr, command).await,
    }
}
