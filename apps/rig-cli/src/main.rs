use anyhow::{anyhow, bail, Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::collections::HashMap;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

use motion_control::{MockArm, MotionBackend, Pose};
use routine_engine::{
    execute, ContinuousIndent, CsvSink, DiscreteIndent, OperatorPrompt, OrientRoutine, Outcome,
    RoutineContext, TeachRoutine, ZeroRoutine,
};
use sensor_link::{AcquisitionWorker, LinkConfig, MockLink, SensorLink, WorkerHandle};

#[derive(Parser, Debug)]
#[command(
    name = "rig",
    version,
    about = "Indentation rig control: sensor acquisition and motion routines",
    disable_help_subcommand = true
)]
struct Cli {
    /// Use mock link and mock arm backends (portable, no hardware)
    #[arg(long, action = ArgAction::SetTrue, global = true)]
    mock: bool,

    /// Baud rate for serial sensor links
    #[arg(long, global = true, default_value_t = 115_200)]
    baud: u32,

    /// Sensor device as NAME=PATH (repeatable)
    #[arg(long = "device", global = true, value_name = "NAME=PATH")]
    devices: Vec<String>,

    /// Rolling buffer capacity per device, in records
    #[arg(long, global = true, default_value_t = 50)]
    buffer: usize,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum Backend {
    Mock,
    Serial,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List candidate sensor ports
    Ports {
        #[arg(long, value_enum, default_value_t = Backend::Mock)]
        backend: Backend,
    },
    /// Stream live readings from one device
    Monitor {
        /// Device name (from --device)
        #[arg(long)]
        name: String,
        /// Field to display
        #[arg(long, default_value = "force")]
        field: String,
        /// Time window for the windowed mean, seconds
        #[arg(long, default_value_t = 1.0)]
        window: f64,
    },
    /// Fire one control-plane command at a device (e.g. tare)
    Send {
        #[arg(long)]
        name: String,
        /// Command text; a newline is appended on the wire
        #[arg(long)]
        text: String,
    },
    /// Step toward the surface until the sensor hits a threshold
    Zero {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "force")]
        field: String,
        #[arg(long)]
        threshold: f64,
        #[arg(long, default_value_t = 1.0)]
        step_mm: f64,
        #[arg(long, default_value_t = 10.0)]
        max_mm: f64,
    },
    /// Stepwise indentation with settle-and-average sampling
    IndentDiscrete {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "force")]
        field: String,
        #[arg(long)]
        step_mm: f64,
        #[arg(long)]
        total_mm: f64,
        /// Settle time after each step, seconds
        #[arg(long, default_value_t = 0.5)]
        settle: f64,
        /// Directory for run CSVs
        #[arg(long, default_value = "data/runs")]
        out_dir: PathBuf,
    },
    /// Continuous indentation scan with live sampling
    IndentContinuous {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "force")]
        field: String,
        #[arg(long)]
        total_mm: f64,
        #[arg(long, default_value = "data/runs")]
        out_dir: PathBuf,
    },
    /// Rotate the tool to a new orientation, holding position
    Orient {
        /// Axis-angle components, radians
        #[arg(long)]
        rx: f64,
        #[arg(long)]
        ry: f64,
        #[arg(long)]
        rz: f64,
    },
    /// Freedrive the arm by hand, then re-lock
    Teach,
}

fn main() -> Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Ports { backend } => cmd_ports(backend, cli.mock),
        Commands::Monitor {
            ref name,
            ref field,
            window,
        } => cmd_monitor(&cli, name, field, window),
        Commands::Send { ref name, ref text } => cmd_send(&cli, name, text),
        Commands::Zero {
            ref name,
            ref field,
            threshold,
            step_mm,
            max_mm,
        } => {
            let mut routine = ZeroRoutine::new(name, field, threshold);
            routine.step_size_mm = step_mm;
            routine.max_size_mm = max_mm;
            run_routine(&cli, routine)
        }
        Commands::IndentDiscrete {
            ref name,
            ref field,
            step_mm,
            total_mm,
            settle,
            ref out_dir,
        } => {
            let sink = CsvSink::create(out_dir, "indent_discrete")?;
            let routine = DiscreteIndent::new(
                name,
                field,
                step_mm,
                total_mm,
                Duration::from_secs_f64(settle),
                Box::new(sink),
            );
            run_routine(&cli, routine)
        }
        Commands::IndentContinuous {
            ref name,
            ref field,
            total_mm,
            ref out_dir,
        } => {
            let sink = CsvSink::create(out_dir, "indent_continuous")?;
            let routine = ContinuousIndent::new(name, field, total_mm, Box::new(sink));
            run_routine(&cli, routine)
        }
        Commands::Orient { rx, ry, rz } => run_routine(&cli, OrientRoutine::new([rx, ry, rz])),
        Commands::Teach => run_routine(&cli, TeachRoutine),
    }
}

fn cmd_ports(backend: Backend, mock: bool) -> Result<()> {
    let ports = match effective_backend(backend, mock) {
        Backend::Mock => MockLink::list()?,
        Backend::Serial => serial_list()?,
    };
    if ports.is_empty() {
        println!("no ports found");
    }
    for port in ports {
        println!("{}\t{}", port.path, port.driver);
    }
    Ok(())
}

fn cmd_monitor(cli: &Cli, name: &str, field: &str, window: f64) -> Result<()> {
    let devices = spawn_devices(cli)?;
    let worker = devices
        .get(name)
        .ok_or_else(|| anyhow!("unknown device: {name} (pass --device {name}=PATH)"))?;

    let interrupt = routine_engine::InterruptFlag::new();
    install_ctrlc(&interrupt)?;

    println!("monitoring '{name}' field '{field}' (Ctrl-C to stop)");
    while !interrupt.interrupted() {
        let latest = worker.latest(field);
        let mean_n = worker.mean_over_n(field, 10);
        let mean_t = worker.mean_over_time(field, window);
        println!(
            "latest: {}  mean(10): {}  mean({window}s): {}  [{:?}]",
            fmt_reading(latest),
            fmt_reading(mean_n),
            fmt_reading(mean_t),
            worker.state(),
        );
        std::thread::sleep(Duration::from_secs(1));
    }

    for worker in devices.values() {
        worker.stop();
    }
    Ok(())
}

fn cmd_send(cli: &Cli, name: &str, text: &str) -> Result<()> {
    let devices = spawn_devices(cli)?;
    let worker = devices
        .get(name)
        .ok_or_else(|| anyhow!("unknown device: {name}"))?;
    worker.send_command(text);
    // Give the worker loop a moment to drain the command queue
    std::thread::sleep(Duration::from_millis(200));
    for worker in devices.values() {
        worker.stop();
    }
    Ok(())
}

fn run_routine<R: routine_engine::Routine>(cli: &Cli, mut routine: R) -> Result<()> {
    let devices = spawn_devices(cli)?;
    let arm = build_arm(cli)?;
    let mut ctx = RoutineContext::new(arm, devices);
    install_ctrlc(&ctx.interrupt)?;

    let mut prompt = StdinPrompt;
    let outcome = execute(&mut routine, &mut ctx, &mut prompt);
    println!("outcome: {outcome}");
    ctx.shutdown();

    match outcome {
        Outcome::Aborted => bail!("routine aborted"),
        _ => Ok(()),
    }
}

fn effective_backend(backend: Backend, mock: bool) -> Backend {
    if mock {
        Backend::Mock
    } else {
        backend
    }
}

fn parse_device_specs(specs: &[String]) -> Result<Vec<(String, String)>> {
    specs
        .iter()
        .map(|spec| {
            spec.split_once('=')
                .map(|(name, path)| (name.to_string(), path.to_string()))
                .ok_or_else(|| anyhow!("bad --device spec '{spec}', expected NAME=PATH"))
        })
        .collect()
}

fn spawn_devices(cli: &Cli) -> Result<HashMap<String, WorkerHandle>> {
    let specs = parse_device_specs(&cli.devices)?;
    let config = LinkConfig {
        baud_rate: cli.baud,
        ..LinkConfig::default()
    };

    let mut devices = HashMap::new();
    for (name, path) in specs {
        let worker = if cli.mock {
            AcquisitionWorker::spawn::<MockLink>(&name, &path, config.clone(), cli.buffer)
        } else {
            spawn_serial(&name, &path, config.clone(), cli.buffer)?
        };
        info!(device = %name, "acquisition worker started");
        devices.insert(name, worker);
    }
    Ok(devices)
}

#[cfg(feature = "serial")]
fn spawn_serial(
    name: &str,
    path: &str,
    config: LinkConfig,
    capacity: usize,
) -> Result<WorkerHandle> {
    Ok(AcquisitionWorker::spawn::<sensor_link::SerialLink>(
        name, path, config, capacity,
    ))
}

#[cfg(not(feature = "serial"))]
fn spawn_serial(
    _name: &str,
    _path: &str,
    _config: LinkConfig,
    _capacity: usize,
) -> Result<WorkerHandle> {
    bail!("serial backend not compiled in; rebuild with --features serial or pass --mock")
}

#[cfg(feature = "serial")]
fn serial_list() -> Result<Vec<sensor_link::PortInfo>> {
    Ok(sensor_link::SerialLink::list()?)
}

#[cfg(not(feature = "serial"))]
fn serial_list() -> Result<Vec<sensor_link::PortInfo>> {
    bail!("serial backend not compiled in; rebuild with --features serial")
}

fn build_arm(cli: &Cli) -> Result<Box<dyn MotionBackend>> {
    if cli.mock {
        // Plausible bench pose so tool-frame math has something to chew on
        let arm = MockArm::new(Pose::new([0.3, 0.0, 0.4], [0.0, std::f64::consts::PI, 0.0]));
        return Ok(Box::new(arm));
    }
    bail!("no vendor motion backend compiled in; pass --mock")
}

fn install_ctrlc(interrupt: &routine_engine::InterruptFlag) -> Result<()> {
    let flag = interrupt.clone();
    ctrlc::set_handler(move || {
        eprintln!("\ninterrupt requested");
        flag.set();
    })
    .context("installing Ctrl-C handler")?;
    Ok(())
}

fn fmt_reading(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{v:8.3}"),
        None => "   --   ".to_string(),
    }
}

/// Operator prompts on stdin, mirroring the pendant-side recovery flow.
struct StdinPrompt;

impl OperatorPrompt for StdinPrompt {
    fn retry_ready(&mut self) -> bool {
        println!();
        println!("ROBOT STATUS NOT READY");
        println!("   1. Check the teach pendant.");
        println!("   2. Clear any protective/emergency stops.");
        println!("   3. Enable the robot and release brakes.");
        print!("   Press [ENTER] to retry, or type 'x' to cancel: ");
        let _ = std::io::stdout().flush();

        let mut line = String::new();
        if std::io::stdin().lock().read_line(&mut line).is_err() {
            return false;
        }
        !line.trim().eq_ignore_ascii_case("x")
    }

    fn confirm(&mut self, message: &str) {
        print!("{message} (press [ENTER] to continue): ");
        let _ = std::io::stdout().flush();
        let mut line = String::new();
        let _ = std::io::stdin().lock().read_line(&mut line);
    }
}
