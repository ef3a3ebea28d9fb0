//! CLI wiring for the perfsweep harness.

use crate::domain::SweepDomain;
use crate::driver::{DriverOptions, SweepDriver, XAxis};
use crate::plot::PlotSink;
use crate::report::JsonSink;
use crate::sink::{ConsoleSink, ReportSink, RunLabel};
use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use perfsweep_invoker::{CancellationToken, DeviceRegistry, InvokerOptions, ProcessInvoker};
use perfsweep_model::{Device, TimeUnit};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "perfsweep", about = "Sweep matmul kernel executables over problem sizes")]
pub struct Cli {
    /// Device preset or label. Unknown labels need `--time-unit`.
    #[arg(long, default_value = "gpu")]
    pub device: String,

    /// Kernel executable, overriding the preset or `./{device}_performance.x`.
    #[arg(long)]
    pub executable: Option<PathBuf>,

    /// Unit of the time the executable prints (s, ms, us, ns).
    #[arg(long)]
    pub time_unit: Option<TimeUnit>,

    #[arg(long)]
    pub peak_gflops: Option<f64>,

    #[arg(long)]
    pub peak_bandwidth_gbps: Option<f64>,

    /// Kill a kernel that has not finished after this many milliseconds.
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    #[arg(long, value_enum, default_value = "size")]
    pub x_axis: XAxisArg,

    /// Print one GFLOP/s value per line (the default when no other sink is set).
    #[arg(long, default_value_t = false)]
    pub print: bool,

    /// Directory for `{device}_performance_{sweep}.svg`.
    #[arg(long)]
    pub plot_dir: Option<PathBuf>,

    /// Path for a JSON sweep report.
    #[arg(long)]
    pub json: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
pub enum XAxisArg {
    Size,
    Intensity,
}

impl From<XAxisArg> for XAxis {
    fn from(value: XAxisArg) -> XAxis {
        match value {
            XAxisArg::Size => XAxis::Size,
            XAxisArg::Intensity => XAxis::ArithmeticIntensity,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// m = n = 2^i for i in [min-exp, max-exp], k fixed.
    Geometric {
        #[arg(long, default_value_t = 4)]
        min_exp: u32,
        #[arg(long, default_value_t = 12)]
        max_exp: u32,
        #[arg(long, default_value_t = 64)]
        k: u64,
    },
    /// Square problems from start to end inclusive.
    Linear {
        #[arg(long, default_value_t = 32)]
        start: u64,
        #[arg(long, default_value_t = 2048)]
        end: u64,
        #[arg(long, default_value_t = 32)]
        step: u64,
    },
    /// Square problems for the given sizes, optionally with a fixed k.
    Explicit {
        #[arg(long, num_args = 1.., required = true)]
        sizes: Vec<u64>,
        #[arg(long)]
        k: Option<u64>,
    },
    /// List the built-in device presets.
    Devices,
}

impl Command {
    fn domain(&self) -> Option<SweepDomain> {
        match self {
            Command::Geometric { min_exp, max_exp, k } => {
                Some(SweepDomain::geometric(*min_exp..=*max_exp, *k))
            }
            Command::Linear { start, end, step } => {
                Some(SweepDomain::linear(*start, *end, *step))
            }
            Command::Explicit { sizes, k } => Some(SweepDomain::explicit(sizes.clone(), *k)),
            Command::Devices => None,
        }
    }
}

pub fn run_cli(cli: Cli) -> Result<()> {
    tracing_subscriber::fmt::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let registry = DeviceRegistry::with_default_devices();

    let Some(domain) = cli.command.domain() else {
        for device in registry.devices() {
            println!(
                "{:<6} {:<24} {}",
                device.name,
                device.executable.display(),
                device.time_unit
            );
        }
        return Ok(());
    };

    let device = resolve_device(&cli, &registry)?;
    let x_axis = XAxis::from(cli.x_axis);

    let options = InvokerOptions {
        per_invocation_timeout: cli.timeout_ms.map(Duration::from_millis),
        ..InvokerOptions::default()
    };
    options.validate()?;

    let cancel = CancellationToken::new();
    install_interrupt_handler(cancel.clone())?;

    let invoker = ProcessInvoker::new(options).with_cancellation(cancel.clone());
    let driver = SweepDriver::new(invoker)
        .with_options(DriverOptions { x_axis })
        .with_cancellation(cancel);

    info!(
        device = %device.name,
        executable = %device.executable.display(),
        time_unit = %device.time_unit,
        sweep = domain.label(),
        "running sweep"
    );
    let series = driver.run_domain(&device, &domain)?;
    let run = RunLabel::for_domain(device, &domain, x_axis);

    let mut sinks: Vec<Box<dyn ReportSink>> = Vec::new();
    if cli.print || (cli.plot_dir.is_none() && cli.json.is_none()) {
        sinks.push(Box::new(ConsoleSink::stdout()));
    }
    if let Some(dir) = cli.plot_dir {
        sinks.push(Box::new(PlotSink::new(dir)));
    }
    if let Some(path) = cli.json {
        sinks.push(Box::new(JsonSink::new(path)));
    }
    for sink in &mut sinks {
        sink.report(&run, &series)?;
    }

    if series.is_interrupted() {
        warn!(
            completed = series.len(),
            "sweep was interrupted; reported the points measured so far"
        );
    }
    Ok(())
}

/// Looks the device up in the presets and applies command-line overrides.
fn resolve_device(cli: &Cli, registry: &DeviceRegistry) -> Result<Device> {
    let mut device = match (registry.find(&cli.device), cli.time_unit) {
        (Some(preset), Some(unit)) => preset.clone().with_time_unit(unit),
        (Some(preset), None) => preset.clone(),
        (None, Some(unit)) => Device::new(cli.device.clone(), unit),
        (None, None) => bail!(
            "unknown device `{}`; pass --time-unit to describe its executable",
            cli.device
        ),
    };

    if let Some(executable) = &cli.executable {
        device = device.with_executable(executable.clone());
    }
    if let Some(peak) = cli.peak_gflops {
        device = device.with_peak_gflops(peak);
    }
    if let Some(peak) = cli.peak_bandwidth_gbps {
        device = device.with_peak_bandwidth_gbps(peak);
    }
    device.validate()?;
    Ok(device)
}

/// Cancels the sweep on Ctrl-C so the running kernel is killed and the
/// partial series still reaches the sinks.
fn install_interrupt_handler(cancel: CancellationToken) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    thread::Builder::new()
        .name("interrupt".into())
        .spawn(move || {
            if runtime.block_on(tokio::signal::ctrl_c()).is_ok() {
                warn!("interrupt received; stopping sweep");
                cancel.cancel();
            }
        })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn subcommands_build_their_domains() {
        let cli = parse(&["perfsweep", "geometric", "--min-exp", "4", "--max-exp", "6"]);
        assert_eq!(cli.command.domain(), Some(SweepDomain::geometric(4..=6, 64)));

        let cli = parse(&["perfsweep", "linear", "--end", "96"]);
        assert_eq!(cli.command.domain(), Some(SweepDomain::linear(32, 96, 32)));

        let cli = parse(&["perfsweep", "explicit", "--sizes", "64", "128"]);
        assert_eq!(
            cli.command.domain(),
            Some(SweepDomain::explicit(vec![64, 128], None))
        );

        assert_eq!(parse(&["perfsweep", "devices"]).command.domain(), None);
    }

    #[test]
    fn presets_take_overrides() {
        let registry = DeviceRegistry::with_default_devices();
        let cli = parse(&[
            "perfsweep",
            "--device",
            "m2",
            "--executable",
            "./build/sgemm.x",
            "--peak-gflops",
            "3600",
            "linear",
        ]);
        let device = resolve_device(&cli, &registry).unwrap();
        assert_eq!(device.time_unit, TimeUnit::Nanoseconds);
        assert_eq!(device.executable, PathBuf::from("./build/sgemm.x"));
        assert_eq!(device.peak_gflops, Some(3600.0));
    }

    #[test]
    fn unknown_device_needs_a_time_unit() {
        let registry = DeviceRegistry::with_default_devices();
        let cli = parse(&["perfsweep", "--device", "tpu", "linear"]);
        assert!(resolve_device(&cli, &registry).is_err());

        let cli = parse(&["perfsweep", "--device", "tpu", "--time-unit", "us", "linear"]);
        let device = resolve_device(&cli, &registry).unwrap();
        assert_eq!(device.time_unit, TimeUnit::Microseconds);
        assert_eq!(device.executable, PathBuf::from("./tpu_performance.x"));
    }

    #[test]
    fn rejects_non_positive_peaks() {
        let registry = DeviceRegistry::with_default_devices();
        let cli = parse(&["perfsweep", "--peak-gflops", "0", "linear"]);
        assert!(resolve_device(&cli, &registry).is_err());
    }
}
