//! Lifecycle shared by every swarm variant.
//!
//! A driver is `Uninitialized` until [`SwarmDriver::initialize`] succeeds and
//! returns there on [`SwarmDriver::teardown`]. While running it owns one
//! [`SwarmBuffers`] set and one [`HistoryRing`]; the policy decides what the
//! kernels compute.

use glam::Mat4;
use swarm_core::config::{RenderParams, SwarmConfig, TubeTemplate};
use swarm_core::constants::THREAD_GROUP_WIDTH;
use swarm_core::gradient::CosineGradient;
use swarm_core::types::{FrameClock, Pose};
use swarm_core::SwarmError;

use crate::backend::{ComputeBackend, DrawRequest};
use crate::buffers::SwarmBuffers;
use crate::kernel::ResolvedKernels;
use crate::policy::{PolicyContext, UpdatePolicy};
use crate::ring::HistoryRing;
use crate::uniforms::DrawUniforms;

/// Variant-independent swarm settings.
#[derive(Debug, Clone, PartialEq)]
pub struct DriverSettings {
    pub instance_count: u32,
    pub random_seed: u32,
    pub template: TubeTemplate,
    pub render: RenderParams,
    pub gradient: Option<CosineGradient>,
    pub transform: Pose,
}

impl Default for DriverSettings {
    fn default() -> Self {
        Self::from_config(&SwarmConfig::default())
    }
}

impl DriverSettings {
    pub fn from_config(config: &SwarmConfig) -> Self {
        Self {
            instance_count: config.instance_count,
            random_seed: config.random_seed,
            template: config.template,
            render: config.render,
            gradient: config.gradient,
            transform: config.transform,
        }
    }
}

/// What one tick did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickReport {
    /// Delta actually integrated, after clamping.
    pub delta: f32,
    /// Whether update and reconstruct were dispatched.
    pub simulated: bool,
    /// Ring frame after the tick.
    pub frame: u64,
    /// Slot the tick's draw starts from.
    pub index_offset: u32,
}

struct SimulationState {
    ring: HistoryRing,
    buffers: SwarmBuffers,
    kernels: ResolvedKernels,
    gradient: CosineGradient,
}

pub struct SwarmDriver<P: UpdatePolicy> {
    policy: P,
    settings: DriverSettings,
    state: Option<SimulationState>,
}

impl<P: UpdatePolicy> SwarmDriver<P> {
    pub fn new(policy: P, settings: DriverSettings) -> Self {
        Self {
            policy,
            settings,
            state: None,
        }
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    pub fn settings(&self) -> &DriverSettings {
        &self.settings
    }

    pub fn is_running(&self) -> bool {
        self.state.is_some()
    }

    pub fn ring(&self) -> Option<&HistoryRing> {
        self.state.as_ref().map(|s| &s.ring)
    }

    pub fn buffers(&self) -> Option<&SwarmBuffers> {
        self.state.as_ref().map(|s| &s.buffers)
    }

    /// Move the swarm. Takes effect from the next tick.
    pub fn set_transform(&mut self, transform: Pose) {
        self.settings.transform = transform;
    }

    /// Validate references, allocate every resource and seed the history.
    ///
    /// Nothing stays allocated if this fails. Calling it while running is a
    /// no-op.
    pub fn initialize(&mut self, backend: &mut dyn ComputeBackend) -> Result<(), SwarmError> {
        if self.state.is_some() {
            log::warn!(
                "SwarmDriver({}): initialize called while running, ignored",
                self.policy.variant().name()
            );
            return Ok(());
        }

        let gradient = self
            .settings
            .gradient
            .ok_or(SwarmError::MissingReference("cosine gradient"))?;
        self.policy.validate()?;

        let ring = HistoryRing::new(self.settings.instance_count, self.settings.template.segments);
        if ring.instance_count() != self.settings.instance_count {
            log::warn!(
                "SwarmDriver({}): instance count {} floored to {}",
                self.policy.variant().name(),
                self.settings.instance_count,
                ring.instance_count()
            );
        }

        let set = self.policy.kernels();
        let kernels = ResolvedKernels {
            init: set.init.map(|k| backend.resolve_kernel(k)).transpose()?,
            update: backend.resolve_kernel(set.update)?,
            reconstruct: backend.resolve_kernel(set.reconstruct)?,
        };

        let buffers = SwarmBuffers::allocate(
            backend,
            &ring,
            self.settings.template.index_count(),
            self.policy.uses_velocity(),
            self.policy.volume(),
        )?;

        self.policy.restart(self.settings.random_seed);
        if let Some(init) = kernels.init {
            let uniforms = self.policy.init_uniforms(&self.context(&ring, 0.0));
            let groups = ring.instance_count() / THREAD_GROUP_WIDTH;
            if let Err(e) = backend.dispatch(init, &uniforms, &buffers.bindings(), groups) {
                buffers.release(backend);
                return Err(e);
            }
        }

        log::info!(
            "SwarmDriver({}): initialised {} instances, history {}",
            self.policy.variant().name(),
            ring.instance_count(),
            ring.history_length()
        );
        self.state = Some(SimulationState {
            ring,
            buffers,
            kernels,
            gradient,
        });
        Ok(())
    }

    /// Re-seed the history at the current ring position. Deterministic for
    /// a given seed; buffers are kept.
    pub fn reset(&mut self, backend: &mut dyn ComputeBackend) -> Result<(), SwarmError> {
        let state = self.state.as_ref().ok_or(SwarmError::NotInitialized)?;
        self.policy.restart(self.settings.random_seed);
        if let Some(init) = state.kernels.init {
            let ctx = self.context(&state.ring, 0.0);
            let uniforms = self.policy.init_uniforms(&ctx);
            let groups = state.ring.instance_count() / THREAD_GROUP_WIDTH;
            backend.dispatch(init, &uniforms, &state.buffers.bindings(), groups)?;
        }
        log::debug!(
            "SwarmDriver({}): reset at frame {}",
            self.policy.variant().name(),
            state.ring.frame()
        );
        Ok(())
    }

    /// Advance the simulation by the clamped delta and record this frame's
    /// draw.
    ///
    /// With a positive delta the update and reconstruct kernels run and the
    /// ring advances. The draw is recorded either way.
    ///
    /// A zero, negative or NaN delta leaves the frame counter where it is, so
    /// the ring frame counts simulated ticks rather than calls.
    pub fn tick(
        &mut self,
        backend: &mut dyn ComputeBackend,
        clock: FrameClock,
    ) -> Result<TickReport, SwarmError> {
        let max_delta = self.policy.max_delta();
        let delta = if clock.delta_time > 0.0 {
            clock.delta_time.min(max_delta)
        } else {
            0.0
        };

        let state = self.state.as_mut().ok_or(SwarmError::NotInitialized)?;
        let simulated = delta > 0.0;
        if simulated {
            let ctx = PolicyContext {
                history: state.ring.uniforms(),
                random_seed: self.settings.random_seed,
                time: clock.time,
                world_to_local: self.settings.transform.world_to_local(),
            };
            let uniforms = self.policy.update_uniforms(&ctx, delta);
            let bindings = state.buffers.bindings();
            let groups = state.ring.instance_count() / THREAD_GROUP_WIDTH;
            backend.dispatch(state.kernels.update, &uniforms, &bindings, groups)?;
            backend.dispatch(state.kernels.reconstruct, &uniforms, &bindings, groups)?;
            state.ring.advance();
            self.policy.after_tick(delta);
        }

        let ring = &state.ring;
        let render = &self.settings.render;
        let transform = &self.settings.transform;
        let uniforms = DrawUniforms {
            local_to_world: Mat4::from(transform.local_to_world()).to_cols_array_2d(),
            world_to_local: Mat4::from(transform.world_to_local()).to_cols_array_2d(),
            gradient: state.gradient.to_uniforms(),
            radius: render.radius,
            instance_count: ring.instance_count(),
            history_length: ring.history_length(),
            index_offset: ring.index_offset(),
            index_limit: (render.trim.clamp(0.0, 1.0) * ring.history_length() as f32) as u32,
            _pad: [0; 3],
        };
        backend.draw_indirect(&DrawRequest {
            args: state.buffers.draw_args(),
            positions: state.buffers.positions(),
            tangents: state.buffers.tangents(),
            normals: state.buffers.normals(),
            uniforms,
        })?;

        Ok(TickReport {
            delta,
            simulated,
            frame: ring.frame(),
            index_offset: ring.index_offset(),
        })
    }

    /// Release everything. Safe to call more than once.
    pub fn teardown(&mut self, backend: &mut dyn ComputeBackend) {
        match self.state.take() {
            Some(state) => {
                state.buffers.release(backend);
                log::info!(
                    "SwarmDriver({}): torn down at frame {}",
                    self.policy.variant().name(),
                    state.ring.frame()
                );
            }
            None => log::debug!(
                "SwarmDriver({}): teardown while not running",
                self.policy.variant().name()
            ),
        }
    }

    fn context(&self, ring: &HistoryRing, time: f32) -> PolicyContext {
        PolicyContext {
            history: ring.uniforms(),
            random_seed: self.settings.random_seed,
            time,
            world_to_local: self.settings.transform.world_to_local(),
        }
    }
}
