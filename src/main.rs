use anyhow::{bail, Context};
use armdraw::{
    init_logging, list_ports, process_image, run_motor_test, Config, DeviceSession,
    GcodeProgram, MotionSequencer, MotorTestTiming, ProcessedDrawing, RunHandle, RunMode,
    RunOutcome, RunReport, SequencerEvent, BUILD_DATE, VERSION,
};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, error, info, warn};

#[derive(Parser)]
#[command(
    name = "armdraw",
    version,
    long_version = concat!(env!("CARGO_PKG_VERSION"), " (built ", env!("BUILD_DATE"), ")"),
    about = "Turn raster images into pen drawings on a two-link robot arm"
)]
struct Cli {
    /// Config file (.toml or .json); defaults to the per-user config
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct PortArgs {
    /// Serial port, overriding the config
    #[arg(long)]
    port: Option<String>,

    /// Baud rate, overriding the config
    #[arg(long)]
    baud: Option<u32>,
}

#[derive(Subcommand)]
enum Command {
    /// Vectorize an image and emit G-code
    Process {
        image: PathBuf,
        /// Write the program here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Draw an image on the arm
    Draw {
        image: PathBuf,
        #[command(flatten)]
        port: PortArgs,
        /// Run without a device
        #[arg(long)]
        simulate: bool,
    },
    /// Stream a G-code file line by line
    Stream {
        gcode: PathBuf,
        #[command(flatten)]
        port: PortArgs,
    },
    /// List candidate serial ports
    Ports,
    /// Run the motor test sequence
    TestMotors {
        #[command(flatten)]
        port: PortArgs,
    },
    /// Write a default config file
    InitConfig {
        /// Destination; defaults to the per-user config path
        path: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    init_logging()?;
    let cli = Cli::parse();
    debug!(version = VERSION, built = BUILD_DATE, "armdraw starting");

    if let Command::InitConfig { path } = &cli.command {
        return init_config(path.as_deref());
    }

    let mut config =
        Config::load_or_default(cli.config.as_deref()).context("Failed to load configuration")?;

    match cli.command {
        Command::Process { image, output } => {
            let processed = load_and_process(&image, &config)?;
            match output {
                Some(path) => {
                    std::fs::write(&path, processed.gcode.to_string())
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    info!(path = %path.display(), "wrote G-code");
                }
                None => print!("{}", processed.gcode),
            }
        }
        Command::Draw {
            image,
            port,
            simulate,
        } => {
            apply_port_args(&mut config, &port);
            let processed = load_and_process(&image, &config)?;
            let mut sequencer = MotionSequencer::new(config.arm, config.motion_params());
            let mode = if simulate {
                RunMode::Simulation
            } else {
                sequencer.attach_session(open_session(&config)?)?;
                RunMode::Device
            };

            let handle = sequencer.start(processed.robot_path, mode)?;
            install_stop_handler(&handle)?;
            let report = follow_run(handle)?;
            sequencer.disconnect()?;
            check_outcome(&report)?;
        }
        Command::Stream { gcode, port } => {
            apply_port_args(&mut config, &port);
            let text = std::fs::read_to_string(&gcode)
                .with_context(|| format!("Failed to read {}", gcode.display()))?;
            let program = GcodeProgram::from_text(&text);

            let mut sequencer = MotionSequencer::new(config.arm, config.motion_params());
            sequencer.attach_session(open_session(&config)?)?;
            let handle = sequencer.start_gcode(program)?;
            install_stop_handler(&handle)?;
            let report = follow_run(handle)?;
            sequencer.disconnect()?;
            check_outcome(&report)?;
        }
        Command::Ports => {
            let ports = list_ports()?;
            if ports.is_empty() {
                println!("No candidate serial ports found");
            }
            for port in ports {
                println!("{}\t{}", port.port_name, port.description);
            }
        }
        Command::TestMotors { port } => {
            apply_port_args(&mut config, &port);
            let mut session = open_session(&config)?;
            let report = run_motor_test(&mut session, &MotorTestTiming::default())?;
            for exchange in &report.exchanges {
                println!(
                    "{:<18} {}",
                    exchange.command,
                    exchange.response.as_deref().unwrap_or("<no response>")
                );
            }
            session.close()?;
        }
        Command::InitConfig { .. } => {}
    }

    Ok(())
}

fn init_config(path: Option<&Path>) -> anyhow::Result<()> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => Config::default_path()?,
    };
    if path.exists() {
        bail!("{} already exists", path.display());
    }
    Config::default().save_to_file(&path)?;
    println!("Wrote {}", path.display());
    Ok(())
}

fn apply_port_args(config: &mut Config, args: &PortArgs) {
    if let Some(port) = &args.port {
        config.connection.port = port.clone();
    }
    if let Some(baud) = args.baud {
        config.connection.baud_rate = baud;
    }
}

fn open_session(config: &Config) -> anyhow::Result<DeviceSession> {
    let connection = config.connection_params();
    DeviceSession::open(&connection, config.motion_params())
        .with_context(|| format!("Failed to connect on {}", connection.port))
}

fn load_and_process(image: &Path, config: &Config) -> anyhow::Result<ProcessedDrawing> {
    let gray = image::open(image)
        .with_context(|| format!("Failed to open image {}", image.display()))?
        .to_luma8();
    let processed = process_image(&gray, &config.pipeline_params())
        .with_context(|| format!("Failed to process {}", image.display()))?;

    let stats = processed.stats();
    info!(
        polylines = stats.polylines,
        points = stats.robot_points,
        pen_down = stats.pen_down_points,
        gcode_lines = stats.gcode_lines,
        threshold = processed.threshold_used,
        "image processed"
    );
    Ok(processed)
}

/// First Ctrl-C stops the run and parks the arm; a second one sends an emergency stop
fn install_stop_handler(handle: &RunHandle) -> anyhow::Result<()> {
    let control = handle.control();
    let presses = AtomicUsize::new(0);
    ctrlc::set_handler(move || {
        if presses.fetch_add(1, Ordering::SeqCst) == 0 {
            warn!("interrupted, stopping run (Ctrl-C again for emergency stop)");
            control.stop();
        } else if let Err(err) = control.emergency_stop() {
            error!("emergency stop failed: {}", err);
        }
    })
    .context("Failed to install Ctrl-C handler")
}

/// Consume run events on this thread until the run finishes
fn follow_run(mut handle: RunHandle) -> anyhow::Result<RunReport> {
    let mut last_decile = 0;
    while let Some(event) = handle.next_event() {
        match event {
            SequencerEvent::Progress(pct) => {
                let decile = (pct / 10.0).floor() as u32;
                if decile > last_decile {
                    last_decile = decile;
                    info!("{:.0}% done", pct);
                }
            }
            SequencerEvent::Warning(message) => warn!("{}", message),
            SequencerEvent::StateChanged(state) => debug!(%state, "run state"),
            SequencerEvent::Finished(_) => break,
            other => debug!("{}", other),
        }
    }
    Ok(handle.join()?)
}

fn check_outcome(report: &RunReport) -> anyhow::Result<()> {
    println!(
        "{}: {}/{} processed, {} skipped, {} missed responses",
        report.outcome,
        report.processed,
        report.total,
        report.skipped_unreachable,
        report.missed_responses
    );
    if let RunOutcome::Faulted(reason) = &report.outcome {
        bail!("run faulted: {}", reason);
    }
    Ok(())
}
