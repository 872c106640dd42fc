//! Config-driven wrapper over the three driver instantiations.

use std::sync::Arc;

use swarm_core::config::{SwarmConfig, VariantParams};
use swarm_core::types::{FrameClock, Pose, SwarmVariant};
use swarm_core::SwarmError;
use swarm_volume::VolumeData;

use crate::backend::ComputeBackend;
use crate::buffers::SwarmBuffers;
use crate::driver::{DriverSettings, SwarmDriver, TickReport};
use crate::policies::{CrawlingPolicy, FloatingPolicy, SwirlingPolicy};
use crate::policy::UpdatePolicy;
use crate::ring::HistoryRing;

pub enum Swarm {
    Crawling(SwarmDriver<CrawlingPolicy>),
    Floating(SwarmDriver<FloatingPolicy>),
    Swirling(SwarmDriver<SwirlingPolicy>),
}

macro_rules! each_driver {
    ($self:expr, $driver:ident => $body:expr) => {
        match $self {
            Swarm::Crawling($driver) => $body,
            Swarm::Floating($driver) => $body,
            Swarm::Swirling($driver) => $body,
        }
    };
}

impl Swarm {
    /// Build an uninitialised swarm from a (sanitised) config. `volume` is
    /// only used by the crawling variant.
    pub fn from_config(config: &SwarmConfig, volume: Option<Arc<VolumeData>>) -> Self {
        let config = config.sanitized();
        let settings = DriverSettings::from_config(&config);
        match config.variant {
            VariantParams::Crawling(p) => {
                Swarm::Crawling(SwarmDriver::new(CrawlingPolicy::new(p, volume), settings))
            }
            VariantParams::Floating(p) => {
                Swarm::Floating(SwarmDriver::new(FloatingPolicy::new(p), settings))
            }
            VariantParams::Swirling(p) => {
                let segments = config.template.segments;
                Swarm::Swirling(SwarmDriver::new(SwirlingPolicy::new(p, segments), settings))
            }
        }
    }

    pub fn variant(&self) -> SwarmVariant {
        each_driver!(self, d => d.policy().variant())
    }

    pub fn is_running(&self) -> bool {
        each_driver!(self, d => d.is_running())
    }

    pub fn ring(&self) -> Option<&HistoryRing> {
        each_driver!(self, d => d.ring())
    }

    pub fn buffers(&self) -> Option<&SwarmBuffers> {
        each_driver!(self, d => d.buffers())
    }

    pub fn set_transform(&mut self, transform: Pose) {
        each_driver!(self, d => d.set_transform(transform))
    }

    pub fn initialize(&mut self, backend: &mut dyn ComputeBackend) -> Result<(), SwarmError> {
        each_driver!(self, d => d.initialize(backend))
    }

    pub fn reset(&mut self, backend: &mut dyn ComputeBackend) -> Result<(), SwarmError> {
        each_driver!(self, d => d.reset(backend))
    }

    pub fn tick(
        &mut self,
        backend: &mut dyn ComputeBackend,
        clock: FrameClock,
    ) -> Result<TickReport, SwarmError> {
        each_driver!(self, d => d.tick(backend, clock))
    }

    pub fn teardown(&mut self, backend: &mut dyn ComputeBackend) {
        each_driver!(self, d => d.teardown(backend))
    }
}
