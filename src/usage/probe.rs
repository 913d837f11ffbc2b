use futures::future::{BoxFuture, FutureExt};
use sysinfo::System;

use crate::container_management::{ContainerUsage, DockerCli, EngineError};

/// Source of per-container CPU and memory percentages.
pub trait ContainerProbe: Send + Sync {
    fn container_usage<'a>(
        &'a self,
        container_id: &'a str,
    ) -> BoxFuture<'a, Result<ContainerUsage, EngineError>>;
}

impl ContainerProbe for DockerCli {
    fn container_usage<'a>(
        &'a self,
        container_id: &'a str,
    ) -> BoxFuture<'a, Result<ContainerUsage, EngineError>> {
        DockerCli::container_usage(self, container_id).boxed()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HostUsage {
    pub cpu: f64,
    pub mem: f64,
}

/// Host-wide CPU and memory percentages. Always succeeds.
pub trait HostProbe: Send {
    fn sample(&mut self) -> HostUsage;
}

pub struct SystemProbe {
    sys: System,
}

impl SystemProbe {
    pub fn new() -> Self {
        let mut sys = System::new();
        // CPU usage is a delta between two refreshes; prime the first one.
        sys.refresh_cpu_usage();
        sys.refresh_memory();
        Self { sys }
    }
}

impl Default for SystemProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl HostProbe for SystemProbe {
    fn sample(&mut self) -> HostUsage {
        self.sys.refresh_cpu_usage();
        self.sys.refresh_memory();

        let total = self.sys.total_memory();
        let mem = if total == 0 {
            0.0
        } else {
            self.sys.used_memory() as f64 / total as f64 * 100.0
        };
        HostUsage {
            cpu: self.sys.global_cpu_usage() as f64,
            mem,
        }
    }
}
