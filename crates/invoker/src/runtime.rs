//! Child-process kernel invocation.

use crate::cancel::CancellationToken;
use crate::error::{InvocationError, InvocationFailure};
use perfsweep_model::{metrics, ConfigError, Device, ProblemShape, Throughput};
use std::io::{BufRead, BufReader};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

pub type InvocationResult = Result<Throughput, InvocationFailure>;

/// Produces one throughput measurement for one problem shape on one device.
pub trait KernelInvoker {
    fn invoke(&self, device: &Device, shape: ProblemShape) -> InvocationResult;
}

impl<T: KernelInvoker + ?Sized> KernelInvoker for &T {
    fn invoke(&self, device: &Device, shape: ProblemShape) -> InvocationResult {
        (**self).invoke(device, shape)
    }
}

#[derive(Debug, Clone)]
pub struct InvokerOptions {
    /// Upper bound on a single launch, from spawn to exit. `None` waits
    /// for as long as the kernel takes.
    pub per_invocation_timeout: Option<Duration>,
    /// How often a blocked wait checks for cancellation and the deadline.
    pub poll_interval: Duration,
}

impl Default for InvokerOptions {
    fn default() -> Self {
        Self {
            per_invocation_timeout: None,
            poll_interval: Duration::from_millis(10),
        }
    }
}

impl InvokerOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.per_invocation_timeout = Some(timeout);
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.per_invocation_timeout == Some(Duration::ZERO) {
            return Err(ConfigError::ZeroDuration("per_invocation_timeout"));
        }
        if self.poll_interval.is_zero() {
            return Err(ConfigError::ZeroDuration("poll_interval"));
        }
        Ok(())
    }
}

/// Launches `<executable> <m> <n> <k>` and reads the elapsed time it prints.
#[derive(Debug, Clone, Default)]
pub struct ProcessInvoker {
    options: InvokerOptions,
    cancel: CancellationToken,
}

impl ProcessInvoker {
    pub fn new(options: InvokerOptions) -> Self {
        Self {
            options,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Runs the executable once and returns the raw value it reported, in the
    /// device's time unit.
    pub fn measure(&self, device: &Device, shape: &ProblemShape) -> Result<f64, InvocationError> {
        self.launch(device, shape).map_err(|err| self.attribute_cancellation(err))
    }

    fn launch(&self, device: &Device, shape: &ProblemShape) -> Result<f64, InvocationError> {
        if self.cancel.is_cancelled() {
            return Err(InvocationError::Cancelled);
        }

        let deadline = self
            .options
            .per_invocation_timeout
            .map(|timeout| Instant::now() + timeout);

        let mut command = Command::new(&device.executable);
        command
            .args(shape.args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());
        // Own process group: a terminal Ctrl-C reaches only the harness, and
        // terminate() can reach anything the kernel forked.
        #[cfg(unix)]
        std::os::unix::process::CommandExt::process_group(&mut command, 0);

        let mut child = command
            .spawn()
            .map_err(|source| InvocationError::Spawn { source })?;

        let Some(stdout) = child.stdout.take() else {
            terminate(&mut child);
            return Err(InvocationError::NoOutput);
        };

        // The reader thread owns the pipe so the wait below can observe the
        // deadline and the cancellation token.
        let (tx, rx) = mpsc::channel();
        let reader = thread::spawn(move || {
            let _ = tx.send(read_single_line(BufReader::new(stdout)));
        });

        let outcome = self.await_line(&rx, deadline).and_then(|line| {
            let status = self.await_exit(&mut child, deadline)?;
            Ok((line, status))
        });
        if outcome.is_err() {
            terminate(&mut child);
        }
        // Every writer end is gone once the group is killed, so this returns.
        let _ = reader.join();

        let (line, status) = outcome?;
        if !status.success() {
            return Err(InvocationError::ExitStatus { status });
        }

        parse_elapsed(&line)
    }

    /// A kernel that dies because the run is being interrupted reports
    /// whatever its death looked like; the token says what actually happened.
    fn attribute_cancellation(&self, err: InvocationError) -> InvocationError {
        if self.cancel.is_cancelled() {
            InvocationError::Cancelled
        } else {
            err
        }
    }

    fn await_line(
        &self,
        rx: &Receiver<Result<String, InvocationError>>,
        deadline: Option<Instant>,
    ) -> Result<String, InvocationError> {
        loop {
            let wait = self.next_wait(deadline)?;
            match rx.recv_timeout(wait) {
                Ok(result) => return result,
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => return Err(InvocationError::NoOutput),
            }
        }
    }

    fn await_exit(
        &self,
        child: &mut Child,
        deadline: Option<Instant>,
    ) -> Result<ExitStatus, InvocationError> {
        loop {
            if let Some(status) = child
                .try_wait()
                .map_err(|source| InvocationError::Read { source })?
            {
                return Ok(status);
            }
            thread::sleep(self.next_wait(deadline)?);
        }
    }

    fn next_wait(&self, deadline: Option<Instant>) -> Result<Duration, InvocationError> {
        if self.cancel.is_cancelled() {
            return Err(InvocationError::Cancelled);
        }
        let Some(deadline) = deadline else {
            return Ok(self.options.poll_interval);
        };
        let now = Instant::now();
        if now >= deadline {
            return Err(InvocationError::TimedOut {
                after: self.options.per_invocation_timeout.unwrap_or_default(),
            });
        }
        Ok((deadline - now).min(self.options.poll_interval))
    }
}

impl KernelInvoker for ProcessInvoker {
    fn invoke(&self, device: &Device, shape: ProblemShape) -> InvocationResult {
        debug!(
            device = %device.name,
            executable = %device.executable.display(),
            m = shape.m(),
            n = shape.n(),
            k = shape.k(),
            "launching kernel"
        );

        let outcome = self.measure(device, &shape).and_then(|raw| {
            let seconds = device.time_unit.to_seconds(raw);
            metrics::throughput(&shape, seconds)
                .map_err(|_| InvocationError::NonPositiveTime { value: raw })
        });

        outcome.map_err(|error| {
            let failure = InvocationFailure {
                device: device.name.clone(),
                executable: device.executable.clone(),
                shape,
                error,
            };
            if failure.is_cancelled() {
                warn!(device = %failure.device, m = shape.m(), n = shape.n(), k = shape.k(), "kernel invocation cancelled");
            } else {
                error!(
                    device = %failure.device,
                    executable = %failure.executable.display(),
                    m = shape.m(),
                    n = shape.n(),
                    k = shape.k(),
                    error = %failure.error,
                    "kernel invocation failed"
                );
            }
            failure
        })
    }
}

/// Kills the kernel together with its process group and reaps it.
fn terminate(child: &mut Child) {
    #[cfg(unix)]
    {
        if let Ok(group) = libc::pid_t::try_from(child.id()) {
            // SAFETY: kill(2) takes no pointers. The child is not reaped yet,
            // so its pid still names the group it leads.
            unsafe {
                libc::kill(-group, libc::SIGKILL);
            }
        }
    }
    let _ = child.kill();
    let _ = child.wait();
}

/// Reads the first line and requires the rest of the stream to be blank.
fn read_single_line<R: BufRead>(mut reader: R) -> Result<String, InvocationError> {
    let mut first = String::new();
    let read = reader
        .read_line(&mut first)
        .map_err(|source| InvocationError::Read { source })?;
    if read == 0 {
        return Err(InvocationError::NoOutput);
    }

    for line in reader.lines() {
        let line = line.map_err(|source| InvocationError::Read { source })?;
        if !line.trim().is_empty() {
            return Err(InvocationError::ExtraOutput { line });
        }
    }

    Ok(first.trim().to_string())
}

fn parse_elapsed(line: &str) -> Result<f64, InvocationError> {
    let value: f64 = line
        .trim()
        .parse()
        .map_err(|source| InvocationError::NotNumeric {
            line: line.to_string(),
            source,
        })?;
    if !value.is_finite() || value <= 0.0 {
        return Err(InvocationError::NonPositiveTime { value });
    }
    Ok(value)
}
