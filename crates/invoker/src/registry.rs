//! Known kernel builds and their reporting conventions.

use perfsweep_model::{Device, TimeUnit};

#[derive(Debug, Clone, Default)]
pub struct DeviceRegistry {
    devices: Vec<Device>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self {
            devices: Vec::new(),
        }
    }

    /// Presets for the kernel builds shipped alongside the harness.
    pub fn with_default_devices() -> Self {
        let mut registry = Self::new();
        // cuBLAS timed with CUDA events on Jetson Orin.
        registry.register(Device::new("gpu", TimeUnit::Milliseconds));
        // ArmPL sgemm on the Orin host cores.
        registry.register(Device::new("cpu", TimeUnit::Milliseconds));
        // Accelerate cblas_sgemm on Apple M2.
        registry.register(
            Device::new("m2", TimeUnit::Nanoseconds).with_executable("./performance.x"),
        );
        // oneMKL SYCL gemm on Sapphire Rapids.
        registry.register(Device::new("spr", TimeUnit::Nanoseconds));
        registry
    }

    /// Adds a device, replacing any existing entry with the same name.
    pub fn register(&mut self, device: Device) {
        match self.devices.iter_mut().find(|d| d.name == device.name) {
            Some(existing) => *existing = device,
            None => self.devices.push(device),
        }
    }

    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    pub fn find(&self, name: &str) -> Option<&Device> {
        self.devices.iter().find(|device| device.name == name)
    }
}
