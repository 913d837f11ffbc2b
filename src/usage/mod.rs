//! Live resource usage of one container next to the host's.
//!
//! A [`Sampler`] owns a bounded [`SeriesBuffer`]; [`run_sampler`] drives it
//! from a timer and posts a [`UsageSnapshot`] after every tick.

mod probe;
mod task;

use std::collections::VecDeque;

use log::{info, warn};

use crate::container_management::{ContainerUsage, EngineError};

pub use probe::{ContainerProbe, HostProbe, HostUsage, SystemProbe};
pub use task::{run_sampler, SamplerSettings};

pub const DEFAULT_WINDOW: usize = 60;
pub const DEFAULT_FRAME_BUDGET: u64 = 60;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub index: u64,
    pub container_cpu: f64,
    pub container_mem: f64,
    pub system_cpu: f64,
    pub system_mem: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    ContainerCpu,
    ContainerMem,
    SystemCpu,
    SystemMem,
}

impl Metric {
    pub const ALL: [Metric; 4] = [
        Metric::ContainerCpu,
        Metric::ContainerMem,
        Metric::SystemCpu,
        Metric::SystemMem,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Metric::ContainerCpu => "Container CPU %",
            Metric::ContainerMem => "Container Mem %",
            Metric::SystemCpu => "System CPU %",
            Metric::SystemMem => "System Mem %",
        }
    }
}

/// Five parallel sequences (index plus one per metric) of equal length,
/// never longer than `capacity`.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesBuffer {
    capacity: usize,
    index: VecDeque<u64>,
    container_cpu: VecDeque<f64>,
    container_mem: VecDeque<f64>,
    system_cpu: VecDeque<f64>,
    system_mem: VecDeque<f64>,
}

impl SeriesBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            index: VecDeque::with_capacity(capacity),
            container_cpu: VecDeque::with_capacity(capacity),
            container_mem: VecDeque::with_capacity(capacity),
            system_cpu: VecDeque::with_capacity(capacity),
            system_mem: VecDeque::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, sample: Sample) {
        if self.index.len() >= self.capacity {
            self.index.pop_front();
            self.container_cpu.pop_front();
            self.container_mem.pop_front();
            self.system_cpu.pop_front();
            self.system_mem.pop_front();
        }
        self.index.push_back(sample.index);
        self.container_cpu.push_back(sample.container_cpu);
        self.container_mem.push_back(sample.container_mem);
        self.system_cpu.push_back(sample.system_cpu);
        self.system_mem.push_back(sample.system_mem);
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn indices(&self) -> &VecDeque<u64> {
        &self.index
    }

    pub fn series(&self, metric: Metric) -> &VecDeque<f64> {
        match metric {
            Metric::ContainerCpu => &self.container_cpu,
            Metric::ContainerMem => &self.container_mem,
            Metric::SystemCpu => &self.system_cpu,
            Metric::SystemMem => &self.system_mem,
        }
    }

    /// `(index, value)` pairs, oldest first, ready to plot.
    pub fn points(&self, metric: Metric) -> Vec<(f64, f64)> {
        self.index
            .iter()
            .zip(self.series(metric))
            .map(|(i, v)| (*i as f64, *v))
            .collect()
    }

    pub fn samples(&self) -> impl Iterator<Item = Sample> + '_ {
        (0..self.len()).map(move |i| Sample {
            index: self.index[i],
            container_cpu: self.container_cpu[i],
            container_mem: self.container_mem[i],
            system_cpu: self.system_cpu[i],
            system_mem: self.system_mem[i],
        })
    }

    /// Largest value across all metrics, 0 when empty.
    pub fn peak(&self) -> f64 {
        Metric::ALL
            .iter()
            .flat_map(|m| self.series(*m).iter().copied())
            .fold(0.0, f64::max)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplerState {
    Running,
    Stopped,
}

/// Copy of a sampler's window handed to the UI.
#[derive(Debug, Clone, PartialEq)]
pub struct UsageSnapshot {
    pub container_id: String,
    pub state: SamplerState,
    pub series: SeriesBuffer,
}

pub struct Sampler {
    buffer: SeriesBuffer,
    next_index: u64,
    frame_budget: Option<u64>,
    state: SamplerState,
    failing: bool,
}

impl Sampler {
    pub fn new(window: usize, frame_budget: Option<u64>) -> Self {
        Self {
            buffer: SeriesBuffer::new(window),
            next_index: 0,
            frame_budget,
            state: if frame_budget == Some(0) {
                SamplerState::Stopped
            } else {
                SamplerState::Running
            },
            failing: false,
        }
    }

    pub fn state(&self) -> SamplerState {
        self.state
    }

    pub fn is_stopped(&self) -> bool {
        self.state == SamplerState::Stopped
    }

    pub fn buffer(&self) -> &SeriesBuffer {
        &self.buffer
    }

    pub fn ticks(&self) -> u64 {
        self.next_index
    }

    /// Terminal: once stopped, `record` ignores every further tick.
    pub fn stop(&mut self) {
        self.state = SamplerState::Stopped;
    }

    /// Applies one tick. A failed container query becomes a zero sample and
    /// never reaches the caller. Returns `None` when the sampler is stopped.
    pub fn record(
        &mut self,
        container: Result<ContainerUsage, EngineError>,
        host: HostUsage,
    ) -> Option<&SeriesBuffer> {
        if self.is_stopped() {
            return None;
        }

        let usage = match container {
            Ok(usage) => {
                if self.failing {
                    info!("Container stats available again at tick {}", self.next_index);
                }
                self.failing = false;
                usage
            }
            Err(e) => {
                if !self.failing {
                    warn!("Container stats unavailable, recording zeros: {}", e);
                }
                self.failing = true;
                ContainerUsage { cpu: 0.0, mem: 0.0 }
            }
        };

        self.buffer.push(Sample {
            index: self.next_index,
            container_cpu: usage.cpu,
            container_mem: usage.mem,
            system_cpu: host.cpu,
            system_mem: host.mem,
        });
        self.next_index += 1;

        if matches!(self.frame_budget, Some(budget) if self.next_index >= budget) {
            self.state = SamplerState::Stopped;
        }
        Some(&self.buffer)
    }

    pub fn snapshot(&self, container_id: &str) -> UsageSnapshot {
        UsageSnapshot {
            container_id: container_id.to_string(),
            state: self.state,
            series: self.buffer.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOST: HostUsage = HostUsage {
        cpu: 7.0,
        mem: 42.0,
    };

    fn ok(cpu: f64, mem: f64) -> Result<ContainerUsage, EngineError> {
        Ok(ContainerUsage { cpu, mem })
    }

    fn assert_aligned(buffer: &SeriesBuffer) {
        let len = buffer.indices().len();
        for metric in Metric::ALL {
            assert_eq!(buffer.series(metric).len(), len);
        }
        assert!(len <= buffer.capacity());
    }

    #[test]
    fn keeps_the_most_recent_window() {
        let mut sampler = Sampler::new(DEFAULT_WINDOW, None);
        for i in 0..65 {
            sampler.record(ok(i as f64, 1.0), HOST);
            assert_aligned(sampler.buffer());
        }
        let buffer = sampler.buffer();
        assert_eq!(buffer.len(), 60);
        assert_eq!(buffer.indices().front(), Some(&5));
        assert_eq!(buffer.indices().back(), Some(&64));
        assert_eq!(buffer.series(Metric::ContainerCpu).front(), Some(&5.0));
        assert!(buffer
            .indices()
            .iter()
            .zip(buffer.indices().iter().skip(1))
            .all(|(a, b)| b - a == 1));
    }

    #[test]
    fn failure_only_zeroes_its_own_tick() {
        let mut sampler = Sampler::new(DEFAULT_WINDOW, None);
        sampler.record(ok(10.0, 20.0), HOST);
        sampler.record(
            Err(EngineError::MalformedOutput("bad data".to_string())),
            HOST,
        );
        sampler.record(ok(30.0, 40.0), HOST);

        let samples: Vec<Sample> = sampler.buffer().samples().collect();
        assert_eq!(samples[0].container_cpu, 10.0);
        assert_eq!((samples[1].container_cpu, samples[1].container_mem), (0.0, 0.0));
        assert_eq!(samples[1].system_mem, 42.0);
        assert_eq!(samples[2].container_mem, 40.0);
    }

    #[test]
    fn stopped_sampler_does_not_grow() {
        let mut sampler = Sampler::new(DEFAULT_WINDOW, None);
        for _ in 0..10 {
            sampler.record(ok(1.0, 1.0), HOST);
        }
        sampler.stop();
        for _ in 0..5 {
            assert!(sampler.record(ok(1.0, 1.0), HOST).is_none());
        }
        assert_eq!(sampler.buffer().len(), 10);
        assert_eq!(sampler.state(), SamplerState::Stopped);
    }

    #[test]
    fn frame_budget_stops_after_last_frame() {
        let mut sampler = Sampler::new(DEFAULT_WINDOW, Some(3));
        assert!(sampler.record(ok(1.0, 1.0), HOST).is_some());
        assert!(sampler.record(ok(1.0, 1.0), HOST).is_some());
        assert!(!sampler.is_stopped());
        assert!(sampler.record(ok(1.0, 1.0), HOST).is_some());
        assert!(sampler.is_stopped());
        assert!(sampler.record(ok(1.0, 1.0), HOST).is_none());
        assert_eq!(sampler.snapshot("abc").series.len(), 3);
    }

    #[test]
    fn points_pair_index_with_value() {
        let mut buffer = SeriesBuffer::new(2);
        for index in 0..3 {
            buffer.push(Sample {
                index,
                container_cpu: 0.0,
                container_mem: 0.0,
                system_cpu: index as f64 * 10.0,
                system_mem: 0.0,
            });
        }
        assert_eq!(buffer.points(Metric::SystemCpu), vec![(1.0, 10.0), (2.0, 20.0)]);
        assert_eq!(buffer.peak(), 20.0);
    }
}
