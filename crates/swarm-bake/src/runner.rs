use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use swarm_core::config::{ConfigError, SwarmConfig};
use swarm_core::types::FrameClock;
use swarm_core::SwarmError;
use swarm_persist::PersistError;
use swarm_sim::{ComputeBackend, CpuBackend, KernelSources, Swarm, WgpuBackend};
use swarm_volume::{BakeJob, JobError, VolumeData};
use thiserror::Error;

use crate::report::{BakeReport, PositionBounds, SwarmReport};

/// Fixed step of the headless swarm run.
pub const HEADLESS_STEP: f32 = 1.0 / 60.0;

#[derive(Debug, Error)]
pub enum BakeError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    Job(#[from] JobError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Persist(#[from] PersistError),
    #[error(transparent)]
    Swarm(#[from] SwarmError),
    #[error("reloaded asset does not match the bake: {0}")]
    Verify(String),
    #[error("no suitable GPU adapter found")]
    NoAdapter,
    #[error("failed to create device: {0}")]
    Device(String),
}

/// Everything the CLI can ask for.
#[derive(Debug, Clone, PartialEq)]
pub struct BakeOptions {
    pub scene: PathBuf,
    pub output: PathBuf,
    pub resolution: Option<u32>,
    pub extent: Option<f32>,
    pub compress: bool,
    pub swarm: Option<PathBuf>,
    pub frames: u32,
    /// Run the swarm on the wgpu backend instead of the host kernels.
    pub gpu: bool,
    /// WGSL kernel overrides; implies `gpu`.
    pub kernels: Option<PathBuf>,
}

impl BakeOptions {
    pub fn new(scene: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            scene: scene.into(),
            output: output.into(),
            resolution: None,
            extent: None,
            compress: true,
            swarm: None,
            frames: 120,
            gpu: false,
            kernels: None,
        }
    }
}

fn read_text(path: &Path) -> Result<String, BakeError> {
    std::fs::read_to_string(path).map_err(|source| BakeError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Bake, write, reload and verify; then run the swarm if one was given.
pub fn run(options: &BakeOptions) -> Result<BakeReport, BakeError> {
    let mut job = BakeJob::from_ron_str(&read_text(&options.scene)?)?;
    if let Some(resolution) = options.resolution {
        job.resolution = resolution;
    }
    if let Some(extent) = options.extent {
        job.extent = extent;
    }

    let scene = job.scene();
    if scene.is_empty() {
        log::warn!(
            "{}: no colliders, every cell will hold the maximum distance",
            options.scene.display()
        );
    }

    let sampler = job.sampler();
    let start = Instant::now();
    let volume = sampler.bake(&scene);
    let bake_ms = start.elapsed().as_secs_f64() * 1000.0;
    let (distance_min, distance_max) = volume.distance_range();
    log::info!(
        "Baked {}^3 cells over ±{} in {:.1} ms, distance {:.4} .. {:.4}",
        volume.resolution(),
        volume.extent(),
        bake_ms,
        distance_min,
        distance_max
    );

    let file_bytes = swarm_persist::save_to_path(&options.output, &volume, options.compress)?;
    let loaded = swarm_persist::load_from_path(&options.output)?;
    verify(&volume, &loaded.volume)?;

    let swarm = match &options.swarm {
        Some(path) => {
            let config = SwarmConfig::from_ron_str(&read_text(path)?)?;
            let volume = Arc::new(loaded.volume);
            if options.gpu || options.kernels.is_some() {
                let kernel_dir = options.kernels.as_deref();
                Some(run_swarm_gpu(&config, volume, options.frames, kernel_dir)?)
            } else {
                Some(run_swarm_cpu(&config, volume, options.frames)?)
            }
        }
        None => None,
    };

    Ok(BakeReport {
        scene: options.scene.display().to_string(),
        output: options.output.display().to_string(),
        resolution: volume.resolution(),
        extent: volume.extent(),
        collider_count: scene.len(),
        cell_count: volume.cell_count(),
        distance_min,
        distance_max,
        bake_ms,
        file_bytes,
        raw_bytes: volume.byte_size(),
        compressed: options.compress,
        warnings: loaded.warnings,
        swarm,
    })
}

/// Check that a reloaded volume is the one that was written.
pub fn verify(baked: &VolumeData, loaded: &VolumeData) -> Result<(), BakeError> {
    if baked.resolution() != loaded.resolution() {
        return Err(BakeError::Verify(format!(
            "resolution {} != {}",
            loaded.resolution(),
            baked.resolution()
        )));
    }
    if baked.extent() != loaded.extent() {
        return Err(BakeError::Verify(format!(
            "extent {} != {}",
            loaded.extent(),
            baked.extent()
        )));
    }
    if let Some(index) = baked
        .cells()
        .iter()
        .zip(loaded.cells())
        .position(|(a, b)| a != b)
    {
        return Err(BakeError::Verify(format!("cell {} differs", index)));
    }
    Ok(())
}

struct DriveOutcome {
    simulated_frames: u32,
    final_frame: u64,
    run_ms: f64,
}

/// Initialise, tick `frames` times at a fixed step, then leave the swarm
/// running for inspection. `after_frame` runs after every tick.
fn drive<B: ComputeBackend>(
    swarm: &mut Swarm,
    backend: &mut B,
    frames: u32,
    mut after_frame: impl FnMut(&mut B),
) -> Result<DriveOutcome, SwarmError> {
    swarm.initialize(&mut *backend)?;
    let start = Instant::now();
    let mut simulated_frames = 0;
    let mut final_frame = 0;
    for i in 0..frames {
        let clock = FrameClock::new(i as f32 * HEADLESS_STEP, HEADLESS_STEP);
        let report = swarm.tick(&mut *backend, clock)?;
        if report.simulated {
            simulated_frames += 1;
        }
        final_frame = report.frame;
        after_frame(&mut *backend);
    }
    Ok(DriveOutcome {
        simulated_frames,
        final_frame,
        run_ms: start.elapsed().as_secs_f64() * 1000.0,
    })
}

fn swarm_report(swarm: &Swarm, backend: &str, frames: u32, outcome: &DriveOutcome) -> SwarmReport {
    let (instance_count, history_length) = swarm
        .ring()
        .map(|r| (r.instance_count(), r.history_length()))
        .unwrap_or_default();
    SwarmReport {
        variant: swarm.variant().name().to_string(),
        backend: backend.to_string(),
        instance_count,
        history_length,
        frames,
        simulated_frames: outcome.simulated_frames,
        final_frame: outcome.final_frame,
        run_ms: outcome.run_ms,
        bounds: None,
    }
}

/// Run a swarm on the host reference kernels.
pub fn run_swarm_cpu(
    config: &SwarmConfig,
    volume: Arc<VolumeData>,
    frames: u32,
) -> Result<SwarmReport, BakeError> {
    let mut backend = CpuBackend::new();
    let mut swarm = Swarm::from_config(config, Some(volume));
    let outcome = drive(&mut swarm, &mut backend, frames, |_| {});

    let result = outcome.map(|outcome| {
        let mut report = swarm_report(&swarm, "cpu", frames, &outcome);
        report.bounds = swarm
            .buffers()
            .and_then(|b| backend.buffer(b.positions()))
            .map(PositionBounds::from_positions);
        report
    });
    swarm.teardown(&mut backend);
    let report = result?;
    log::info!(
        "Swarm ({}) ran {} frames on the host backend in {:.1} ms",
        report.variant,
        frames,
        report.run_ms
    );
    Ok(report)
}

/// Create a headless device. Blocks on the async adapter and device requests.
pub fn request_device() -> Result<(wgpu::Device, wgpu::Queue), BakeError> {
    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::PRIMARY,
        ..Default::default()
    });

    let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
        power_preference: wgpu::PowerPreference::HighPerformance,
        compatible_surface: None,
        force_fallback_adapter: false,
    }))
    .ok_or(BakeError::NoAdapter)?;

    log::info!("Swarm adapter: {}", adapter.get_info().name);

    pollster::block_on(adapter.request_device(
        &wgpu::DeviceDescriptor {
            label: Some("swarm-bake-device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            memory_hints: wgpu::MemoryHints::Performance,
        },
        None,
    ))
    .map_err(|e| BakeError::Device(e.to_string()))
}

/// Run a swarm on the GPU with the built-in kernels, or with WGSL kernels
/// from `kernel_dir`. Draws are recorded and then dropped since there is no
/// surface.
pub fn run_swarm_gpu(
    config: &SwarmConfig,
    volume: Arc<VolumeData>,
    frames: u32,
    kernel_dir: Option<&Path>,
) -> Result<SwarmReport, BakeError> {
    let sources = match kernel_dir {
        Some(dir) => KernelSources::from_dir(dir).map_err(|source| BakeError::Read {
            path: dir.to_path_buf(),
            source,
        })?,
        None => KernelSources::builtin(),
    };
    let (device, queue) = request_device()?;
    let mut backend = WgpuBackend::new(Arc::new(device), Arc::new(queue), sources);
    let mut swarm = Swarm::from_config(config, Some(volume));

    let outcome = drive(&mut swarm, &mut backend, frames, |b| {
        b.submit();
        b.discard_draws();
    });
    let result = outcome.map(|outcome| swarm_report(&swarm, "wgpu", frames, &outcome));
    swarm.teardown(&mut backend);
    backend.submit();
    backend.wait_idle();
    let report = result?;
    log::info!(
        "Swarm ({}) ran {} frames on the GPU in {:.1} ms",
        report.variant,
        frames,
        report.run_ms
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use swarm_volume::VolumeCell;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("swarm-bake-{}-{}", name, std::process::id()));
        std::fs::create_dir_all(&dir).expect("temp dir");
        dir
    }

    const JOB: &str = r#"(
        resolution: 8,
        extent: 0.5,
        colliders: [Sphere(center: (0.0, 0.0, 0.0), radius: 0.2)],
    )"#;

    #[test]
    fn test_bake_write_reload() {
        let dir = temp_dir("plain");
        std::fs::write(dir.join("job.ron"), JOB).expect("write job");

        let mut options = BakeOptions::new(dir.join("job.ron"), dir.join("out.dfv"));
        options.resolution = Some(6);
        let report = run(&options).expect("run");

        assert_eq!(report.resolution, 6);
        assert_eq!(report.cell_count, 216);
        assert_eq!(report.collider_count, 1);
        assert_eq!(report.raw_bytes, 216 * 16);
        assert!(report.distance_min < report.distance_max);
        assert!(report.swarm.is_none());
        assert!(report.warnings.is_empty());

        let loaded = swarm_persist::load_from_path(dir.join("out.dfv")).expect("reload");
        assert_eq!(loaded.volume.resolution(), 6);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_crawling_swarm_on_baked_volume() {
        let dir = temp_dir("crawl");
        std::fs::write(dir.join("job.ron"), JOB).expect("write job");
        std::fs::write(
            dir.join("swarm.ron"),
            "(instance_count: 130, template: (segments: 8), variant: Crawling((speed: 0.5)))",
        )
        .expect("write swarm");

        let mut options = BakeOptions::new(dir.join("job.ron"), dir.join("out.dfv"));
        options.swarm = Some(dir.join("swarm.ron"));
        options.frames = 12;
        let report = run(&options).expect("run");

        let swarm = report.swarm.expect("swarm report");
        assert_eq!(swarm.variant, "crawling");
        assert_eq!(swarm.backend, "cpu");
        assert_eq!(swarm.instance_count, 128);
        assert_eq!(swarm.history_length, 9);
        assert_eq!(swarm.simulated_frames, 12);
        assert_eq!(swarm.final_frame, 12);
        assert!(swarm.bounds.expect("bounds").all_finite);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_missing_scene_reports_path() {
        let options = BakeOptions::new("/nonexistent/job.ron", "/nonexistent/out.dfv");
        match run(&options) {
            Err(BakeError::Read { path, .. }) => assert_eq!(path, PathBuf::from("/nonexistent/job.ron")),
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn test_verify_detects_changed_cell() {
        let a = VolumeData::from_cells(2, 1.0, vec![VolumeCell::default(); 8]).expect("volume");
        let mut cells = vec![VolumeCell::default(); 8];
        cells[5].distance = 0.5;
        let b = VolumeData::from_cells(2, 1.0, cells).expect("volume");
        assert!(verify(&a, &a).is_ok());
        match verify(&a, &b) {
            Err(BakeError::Verify(msg)) => assert!(msg.contains("cell 5")),
            other => panic!("unexpected result {other:?}"),
        }
    }
}
