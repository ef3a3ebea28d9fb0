use anyhow::Result;
use approx::assert_relative_eq;
use perfsweep_driver::{DriverOptions, SweepDomain, SweepDriver, XAxis};
use perfsweep_invoker::{
    CancellationToken, InvocationError, InvocationFailure, InvocationResult, KernelInvoker,
};
use perfsweep_model::{metrics, ConfigError, Device, ProblemShape, TimeUnit};
use std::cell::RefCell;
use std::path::PathBuf;

enum Step {
    Seconds(f64),
    Garbage,
    Cancel,
}

/// Replays a fixed list of outcomes, one per call, and records the shapes it saw.
struct ScriptedInvoker {
    steps: Vec<Step>,
    calls: RefCell<Vec<ProblemShape>>,
    cancel: CancellationToken,
}

impl ScriptedInvoker {
    fn new(steps: Vec<Step>) -> Self {
        Self {
            steps,
            calls: RefCell::new(Vec::new()),
            cancel: CancellationToken::new(),
        }
    }

    fn failure(device: &Device, shape: ProblemShape, error: InvocationError) -> InvocationFailure {
        InvocationFailure {
            device: device.name.clone(),
            executable: device.executable.clone(),
            shape,
            error,
        }
    }
}

impl KernelInvoker for ScriptedInvoker {
    fn invoke(&self, device: &Device, shape: ProblemShape) -> InvocationResult {
        let index = self.calls.borrow().len();
        self.calls.borrow_mut().push(shape);
        match &self.steps[index] {
            Step::Seconds(seconds) => Ok(metrics::throughput(&shape, *seconds)
                .expect("scripted time is positive")),
            Step::Garbage => {
                let source = "nan?".parse::<f64>().unwrap_err();
                Err(Self::failure(
                    device,
                    shape,
                    InvocationError::NotNumeric {
                        line: "nan?".into(),
                        source,
                    },
                ))
            }
            Step::Cancel => {
                self.cancel.cancel();
                Err(Self::failure(device, shape, InvocationError::Cancelled))
            }
        }
    }
}

fn gpu() -> Device {
    Device::new("gpu", TimeUnit::Milliseconds)
}

#[test]
fn failed_point_leaves_a_gap_in_place() -> Result<()> {
    let invoker = ScriptedInvoker::new(vec![
        Step::Seconds(1.0e-3),
        Step::Garbage,
        Step::Seconds(2.0e-3),
    ]);
    let driver = SweepDriver::new(&invoker);

    let series = driver.run_domain(&gpu(), &SweepDomain::linear(32, 96, 32))?;

    assert_eq!(series.len(), 3);
    assert_eq!(series.gap_positions(), vec![1]);
    assert!(!series.is_interrupted());
    assert_eq!(series.x_values(), vec![32.0, 64.0, 96.0]);

    let first = ProblemShape::square(32)?;
    let gflops = series.gflops();
    assert_relative_eq!(
        gflops[0].unwrap(),
        metrics::operations(&first) as f64 / 1.0e-3 / 1.0e9
    );
    assert!(gflops[2].is_some());
    Ok(())
}

#[test]
fn shapes_are_invoked_once_each_in_sweep_order() -> Result<()> {
    let invoker = ScriptedInvoker::new((0..3).map(|_| Step::Seconds(1.0)).collect());
    let driver = SweepDriver::new(&invoker);

    driver.run_domain(&gpu(), &SweepDomain::geometric(4..=6, 64))?;

    assert_eq!(
        *invoker.calls.borrow(),
        vec![
            ProblemShape::new(16, 16, 64)?,
            ProblemShape::new(32, 32, 64)?,
            ProblemShape::new(64, 64, 64)?,
        ]
    );
    Ok(())
}

#[test]
fn all_failures_still_complete_the_sweep() -> Result<()> {
    let invoker = ScriptedInvoker::new((0..4).map(|_| Step::Garbage).collect());
    let driver = SweepDriver::new(&invoker);

    let series = driver.run_domain(&gpu(), &SweepDomain::explicit(vec![8, 16, 32, 64], None))?;

    assert_eq!(series.len(), 4);
    assert_eq!(series.gaps(), 4);
    assert!(!series.is_interrupted());
    Ok(())
}

#[test]
fn cancellation_returns_the_partial_series() -> Result<()> {
    let invoker = ScriptedInvoker::new(vec![
        Step::Seconds(1.0e-3),
        Step::Garbage,
        Step::Cancel,
        Step::Seconds(1.0e-3),
    ]);
    let driver = SweepDriver::new(&invoker).with_cancellation(invoker.cancel.clone());

    let series = driver.run_domain(&gpu(), &SweepDomain::linear(8, 32, 8))?;

    assert!(series.is_interrupted());
    assert_eq!(series.len(), 2);
    assert_eq!(series.gap_positions(), vec![1]);
    assert_eq!(invoker.calls.borrow().len(), 3);
    Ok(())
}

#[test]
fn cancelled_before_start_launches_nothing() -> Result<()> {
    let invoker = ScriptedInvoker::new(Vec::new());
    let cancel = CancellationToken::new();
    cancel.cancel();
    let driver = SweepDriver::new(&invoker).with_cancellation(cancel);

    let series = driver.run_domain(&gpu(), &SweepDomain::default_linear())?;

    assert!(series.is_empty());
    assert!(series.is_interrupted());
    assert!(invoker.calls.borrow().is_empty());
    Ok(())
}

#[test]
fn malformed_sweeps_fail_before_any_launch() {
    let invoker = ScriptedInvoker::new(Vec::new());
    let driver = SweepDriver::new(&invoker);

    let err = driver
        .run_domain(&gpu(), &SweepDomain::linear(32, 2048, 0))
        .unwrap_err();
    assert_eq!(err, ConfigError::ZeroStep);

    let unnamed = Device::new("", TimeUnit::Milliseconds).with_executable(PathBuf::from("./k.x"));
    let err = driver
        .run_domain(&unnamed, &SweepDomain::default_linear())
        .unwrap_err();
    assert_eq!(err, ConfigError::EmptyDeviceName);

    assert!(invoker.calls.borrow().is_empty());
}

#[test]
fn intensity_axis_records_arithmetic_intensity() -> Result<()> {
    let invoker = ScriptedInvoker::new((0..3).map(|_| Step::Seconds(1.0)).collect());
    let driver = SweepDriver::new(&invoker).with_options(DriverOptions {
        x_axis: XAxis::ArithmeticIntensity,
    });

    let series = driver.run_domain(&gpu(), &SweepDomain::linear(32, 96, 32))?;

    // square p has intensity p / 2
    assert_eq!(series.x_values(), vec![16.0, 32.0, 48.0]);
    Ok(())
}

#[cfg(unix)]
mod process {
    use super::*;
    use perfsweep_driver::{JsonSink, ReportSink, RunLabel};
    use perfsweep_invoker::ProcessInvoker;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;

    /// Prints 1.5 for every size except 64, where it prints garbage.
    fn write_flaky_kernel(dir: &Path) -> Result<PathBuf> {
        let path = dir.join("flaky_performance.x");
        fs::write(
            &path,
            "#!/bin/sh\nif [ \"$1\" = 64 ]; then echo oops; else echo 1.5; fi\n",
        )?;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755))?;
        Ok(path)
    }

    #[test]
    fn end_to_end_sweep_with_one_bad_point() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let exe = write_flaky_kernel(dir.path())?;
        let device = Device::new("flaky", TimeUnit::Milliseconds).with_executable(&exe);
        let domain = SweepDomain::linear(32, 96, 32);

        let series = SweepDriver::new(ProcessInvoker::default()).run_domain(&device, &domain)?;

        assert_eq!(series.len(), 3);
        assert_eq!(series.gap_positions(), vec![1]);

        let report_path = dir.path().join("flaky.json");
        let run = RunLabel::for_domain(device, &domain, XAxis::Size);
        JsonSink::new(&report_path).report(&run, &series)?;
        let report: serde_json::Value = serde_json::from_str(&fs::read_to_string(report_path)?)?;
        assert_eq!(report["gaps"], 1);
        Ok(())
    }

    #[test]
    fn wrong_time_unit_shifts_every_point_by_the_same_factor() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let exe = write_flaky_kernel(dir.path())?;
        let domain = SweepDomain::explicit(vec![16, 32, 128], None);
        let driver = SweepDriver::new(ProcessInvoker::default());

        let as_ms = driver.run_domain(
            &Device::new("ms", TimeUnit::Milliseconds).with_executable(&exe),
            &domain,
        )?;
        let as_us = driver.run_domain(
            &Device::new("us", TimeUnit::Microseconds).with_executable(&exe),
            &domain,
        )?;

        for (ms, us) in as_ms.gflops().into_iter().zip(as_us.gflops()) {
            let (ms, us) = (ms.expect("measured"), us.expect("measured"));
            assert_relative_eq!(us / ms, 1000.0, max_relative = 1e-12);
        }

        let shape = ProblemShape::square(16)?;
        assert_relative_eq!(
            as_ms.gflops()[0].expect("measured"),
            metrics::operations(&shape) as f64 / 1.5e-3 / 1.0e9,
            max_relative = 1e-12
        );
        Ok(())
    }
}
