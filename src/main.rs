// src/main.rs - Command-line host for the servo-bus robot
use aracna_rs::sim::{spawn_simulated, SimFaults};
use aracna_rs::{load_config, serial, Config, Position, RobotError, RobotSession, RunOptions, TickLog, TickSink};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokio::io::{AsyncRead, AsyncWrite};

#[derive(Debug, Parser)]
#[command(name = "aracna-host", version, about = "Drive a serial servo-bus walking robot")]
struct Cli {
    /// Configuration file
    #[arg(short, long, default_value = "robot.toml")]
    config: PathBuf,

    /// Talk to an in-process simulated controller instead of the serial port
    #[arg(long)]
    simulate: bool,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: HostCommand,
}

#[derive(Debug, Subcommand)]
enum HostCommand {
    /// Handshake with the controller
    Hello,
    /// Print current servo positions
    Status,
    /// Move to the ready pose
    Ready {
        /// Keep re-sending the pose for two seconds
        #[arg(long)]
        persist: bool,
    },
    /// Run the configured motion (or hold the ready pose)
    Run {
        /// Steady-state seconds
        #[arg(long)]
        seconds: Option<f64>,
        /// Time scale, higher is slower
        #[arg(long)]
        time_scale: Option<f64>,
        /// Skip the flat/ready reset
        #[arg(long)]
        no_reset: bool,
        /// Seconds of blending into the motion
        #[arg(long)]
        interp_begin: Option<f64>,
        /// Seconds of blending back to ready
        #[arg(long)]
        interp_end: Option<f64>,
        /// Write one line per tick to this file
        #[arg(long)]
        log: Option<PathBuf>,
    },
    /// List serial ports
    Ports,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    let cli = Cli::parse();

    // Initialize logging
    let level = match (cli.quiet, cli.verbose) {
        (true, _) => tracing::Level::WARN,
        (false, 0) => tracing::Level::INFO,
        (false, 1) => tracing::Level::DEBUG,
        (false, _) => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    if let HostCommand::Ports = cli.command {
        for port in serial::available_ports()? {
            println!("{}", port.display());
        }
        return Ok(());
    }

    let config = if cli.config.exists() {
        tracing::info!("Loading configuration from: {}", cli.config.display());
        load_config(&cli.config)?
    } else {
        tracing::warn!("{} not found, using defaults", cli.config.display());
        Config::default()
    };
    tracing::info!(
        "Robot: {} servos {:?} @ {} Hz",
        config.robot.servo_count(),
        config.robot.expected_ids,
        config.robot.command_rate
    );

    if cli.simulate {
        let initial = config.robot.flat_pose()?;
        let (stream, device) = spawn_simulated(&config, initial, SimFaults::default());
        let session = RobotSession::new(stream, &config)?;
        execute(session, &config, cli.command).await?;
        let report = device.await??;
        tracing::info!(
            "Simulated controller saw {} hellos, {} queries, {} position commands",
            report.hellos,
            report.queries,
            report.positions.len()
        );
    } else {
        let session = serial::connect(&config)?;
        execute(session, &config, cli.command).await?;
    }
    Ok(())
}

async fn execute<S>(mut session: RobotSession<S>, config: &Config, command: HostCommand) -> Result<(), RobotError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    session.hello().await?;
    match command {
        HostCommand::Hello => {
            println!("Controller answered after {} handshake attempts", session.stats().handshake_attempts);
        }
        HostCommand::Status => {
            println!("{}", session.status_line().await?);
        }
        HostCommand::Ready { persist } => {
            session.hold_ready(persist).await?;
        }
        HostCommand::Run {
            seconds,
            time_scale,
            no_reset,
            interp_begin,
            interp_end,
            log,
        } => {
            let mut options: RunOptions = config.run.options.clone();
            if let Some(seconds) = seconds {
                options.run_seconds = seconds;
            }
            if let Some(scale) = time_scale {
                options.time_scale = scale;
            }
            if no_reset {
                options.reset_first = false;
            }
            if interp_begin.is_some() {
                options.interp_begin = interp_begin;
            }
            if interp_end.is_some() {
                options.interp_end = interp_end;
            }

            let ready: Position = session.ready_pose().to_vec();
            let hold_ready = move |_t: f64| ready.clone();

            let log_path = log.or_else(|| config.run.log_file.clone());
            let mut tick_log = match &log_path {
                Some(path) => Some(TickLog::create(path).await.map_err(RobotError::Log)?),
                None => None,
            };
            let sink = tick_log.as_mut().map(|log| log as &mut dyn TickSink);

            let summary = match &config.motion {
                Some(motion) => session.run(motion.as_motion(), &options, sink).await?,
                None => {
                    tracing::info!("No [motion] configured, holding the ready pose");
                    session.run(hold_ready, &options, sink).await?
                }
            };
            println!("{} ticks in {:.2}s", summary.ticks, summary.elapsed);
        }
        HostCommand::Ports => {}
    }

    let stats = session.stats();
    tracing::info!(
        "Sent {} commands ({} bytes), {} replies accepted, {} rejected, {} timeouts",
        stats.commands_sent,
        stats.bytes_sent,
        stats.replies_accepted,
        stats.replies_rejected,
        stats.timeouts
    );
    Ok(())
}
