//! Host reference implementations of the swarm kernels.
//!
//! Same inputs and buffer layout as the WGSL kernels: one invocation per
//! instance, history slots addressed through the ring offsets in the uniform
//! prefix. Used by [`CpuBackend`](super::cpu::CpuBackend).

use glam::Vec3;
use swarm_core::constants::THREAD_GROUP_WIDTH;
use swarm_core::SwarmError;
use swarm_volume::VolumeData;

use crate::kernel::Kernel;
use crate::noise::{noise_vector, random, random_in_sphere};
use crate::uniforms::{CrawlingUniforms, FloatingUniforms, HistoryUniforms, SwirlingUniforms};

/// Buffers visible to one dispatch.
pub(crate) struct KernelIo<'a> {
    pub positions: &'a mut [[f32; 4]],
    pub velocities: Option<&'a mut [[f32; 4]]>,
    pub tangents: &'a mut [[f32; 4]],
    pub normals: &'a mut [[f32; 4]],
    pub volume: Option<&'a VolumeData>,
}

/// Decode a uniform block from the front of `bytes`.
pub(crate) fn decode<T: bytemuck::Pod>(bytes: &[u8]) -> Result<T, SwarmError> {
    let size = std::mem::size_of::<T>();
    if bytes.len() < size {
        return Err(SwarmError::InvalidUniforms {
            expected: size,
            actual: bytes.len(),
        });
    }
    Ok(bytemuck::pod_read_unaligned(&bytes[..size]))
}

pub(crate) fn run(
    kernel: Kernel,
    uniforms: &[u8],
    io: KernelIo<'_>,
    groups: u32,
) -> Result<(), SwarmError> {
    match kernel {
        Kernel::CrawlingInit => crawling_init(&decode(uniforms)?, io, groups),
        Kernel::CrawlingUpdate => crawling_update(&decode(uniforms)?, io, groups),
        Kernel::FloatingInit => floating_init(&decode(uniforms)?, io, groups),
        Kernel::FloatingUpdate => floating_update(&decode(uniforms)?, io, groups),
        Kernel::CrawlingReconstruct | Kernel::FloatingReconstruct => {
            reconstruct_head(&decode(uniforms)?, io, groups);
            Ok(())
        }
        Kernel::SwirlingUpdate => {
            swirling_update(&decode(uniforms)?, io, groups);
            Ok(())
        }
        Kernel::SwirlingReconstruct => {
            reconstruct_all(&decode(uniforms)?, io, groups);
            Ok(())
        }
    }
}

fn invocations(history: &HistoryUniforms, groups: u32) -> u32 {
    (groups * THREAD_GROUP_WIDTH).min(history.instance_count)
}

fn load(buffer: &[[f32; 4]], index: usize) -> Vec3 {
    Vec3::from_slice(&buffer[index][..3])
}

fn store(buffer: &mut [[f32; 4]], index: usize, value: Vec3) {
    buffer[index] = value.extend(0.0).to_array();
}

/// Shorter vectors are rounding residue and have no usable direction.
const MIN_DIRECTION_LENGTH_SQUARED: f32 = 1e-12;

fn unit_or(v: Vec3, fallback: Vec3) -> Vec3 {
    if v.length_squared() < MIN_DIRECTION_LENGTH_SQUARED {
        fallback
    } else {
        v.normalize()
    }
}

/// Carry the previous frame's normal onto a new tangent.
///
/// Projected twice so a nearly parallel normal still comes out
/// perpendicular.
fn transport(normal: Vec3, tangent: Vec3) -> Vec3 {
    let r = normal - tangent * normal.dot(tangent);
    let r = r - tangent * r.dot(tangent);
    unit_or(r, tangent.any_orthonormal_vector())
}

/// Fill every history slot of instance `i` with one position and frame.
fn seed_history(io: &mut KernelIo<'_>, h: &HistoryUniforms, i: usize, p: Vec3, t: Vec3) {
    let ic = h.instance_count as usize;
    let n = t.any_orthonormal_vector();
    for slot in 0..h.history_length as usize {
        let idx = slot * ic + i;
        store(io.positions, idx, p);
        store(io.tangents, idx, t);
        store(io.normals, idx, n);
    }
}

fn crawling_init(
    u: &CrawlingUniforms,
    mut io: KernelIo<'_>,
    groups: u32,
) -> Result<(), SwarmError> {
    let volume = io
        .volume
        .ok_or(SwarmError::MissingReference("distance-field volume"))?;
    let h = u.history;
    for i in 0..invocations(&h, groups) {
        let mut p = random_in_sphere(i, 0, u.random_seed) * u.initial_spread;
        // Drop onto the zero-crossing along the field gradient.
        let cell = volume.sample(p);
        let normal = cell.gradient().normalize_or_zero();
        p -= normal * cell.distance * 2.0 * u.volume_extent;

        let heading = unit_or(random_in_sphere(i, 3, u.random_seed), Vec3::X);
        let t = unit_or(heading - normal * heading.dot(normal), heading);
        seed_history(&mut io, &h, i as usize, p, t);
    }
    Ok(())
}

fn crawling_update(
    u: &CrawlingUniforms,
    mut io: KernelIo<'_>,
    groups: u32,
) -> Result<(), SwarmError> {
    let volume = io
        .volume
        .ok_or(SwarmError::MissingReference("distance-field volume"))?;
    let h = u.history;
    for i in 0..invocations(&h, groups) {
        let idx0 = (h.offset0 + i) as usize;
        let idx1 = (h.offset1 + i) as usize;
        let idx2 = (h.offset2 + i) as usize;

        let p0 = load(io.positions, idx0);
        let p1 = load(io.positions, idx1);
        let heading = unit_or(p1 - p0, unit_or(load(io.tangents, idx1), Vec3::X));

        let np = p1 * u.noise_frequency + Vec3::splat(u.noise_offset + i as f32 * u.noise_spread);
        let mut dir = heading + noise_vector(np, u.random_seed) * 0.5;

        let cell = volume.sample(p1);
        let normal = cell.gradient().normalize_or_zero();
        dir -= normal * dir.dot(normal);
        dir -= normal * (cell.distance * u.constraint);

        store(io.positions, idx2, p1 + unit_or(dir, heading) * u.speed);
    }
    Ok(())
}

fn floating_init(
    u: &FloatingUniforms,
    mut io: KernelIo<'_>,
    groups: u32,
) -> Result<(), SwarmError> {
    let h = u.history;
    let attractor = Vec3::from_slice(&u.attractor[..3]);
    let spread = u.attractor[3];
    for i in 0..invocations(&h, groups) {
        let p = attractor + random_in_sphere(i, 0, u.random_seed) * spread;
        let t = unit_or(random_in_sphere(i, 3, u.random_seed), Vec3::X);
        seed_history(&mut io, &h, i as usize, p, t);
        if let Some(velocities) = io.velocities.as_deref_mut() {
            store(velocities, i as usize, Vec3::ZERO);
        }
    }
    Ok(())
}

fn floating_update(
    u: &FloatingUniforms,
    mut io: KernelIo<'_>,
    groups: u32,
) -> Result<(), SwarmError> {
    let velocities = io
        .velocities
        .ok_or(SwarmError::MissingReference("velocity buffer"))?;
    let h = u.history;
    let ic = h.instance_count as usize;
    let newest_slot = (h.offset2 / h.instance_count) as usize;
    let attractor = Vec3::from_slice(&u.attractor[..3]);
    let spread = u.attractor[3];
    let offset = Vec3::from_array(u.noise_offset);
    let dt = u.delta_time;

    for i in 0..invocations(&h, groups) {
        let idx1 = (h.offset1 + i) as usize;
        let idx2 = (h.offset2 + i) as usize;
        let p = load(io.positions, idx1);
        let v = load(velocities, i as usize);

        let target = attractor + random_in_sphere(i, 0, u.random_seed) * spread;
        let force = u.force[0] + (u.force[1] - u.force[0]) * random(i, 4, u.random_seed);
        let pull = (target - p) * force;

        let np = p * u.head_noise_frequency + offset + Vec3::splat(i as f32 * u.noise_spread);
        let push = noise_vector(np, u.random_seed) * u.head_noise_force;

        let v = v * u.drag + (pull + push) * dt;
        store(velocities, i as usize, v);
        store(io.positions, idx2, p + v * dt);

        // The trail drifts through its own, slower noise field.
        for slot in (0..h.history_length as usize).filter(|&s| s != newest_slot) {
            let idx = slot * ic + i as usize;
            let q = load(io.positions, idx);
            let drift = noise_vector(
                q * u.trail_noise_frequency + offset,
                u.random_seed.wrapping_add(1),
            );
            store(io.positions, idx, q + drift * u.trail_noise_velocity * dt);
        }
    }
    Ok(())
}

fn swirling_update(u: &SwirlingUniforms, mut io: KernelIo<'_>, groups: u32) {
    let h = u.history;
    let ic = h.instance_count as usize;
    let hl = h.history_length as usize;
    let offset = Vec3::from_array(u.noise_offset);

    for i in 0..invocations(&h, groups) {
        let mut p = random_in_sphere(i, 0, u.random_seed) * u.spread;
        for s in 0..hl {
            let slot = (h.index_offset as usize + s) % hl;
            store(io.positions, slot * ic + i as usize, p);
            let flow = noise_vector(p * u.noise_frequency + offset, u.random_seed);
            p += flow.normalize_or_zero() * u.step_width;
        }
    }
}

/// Rebuild the frames of the two newest slots from offsets 0, 1 and 2.
fn reconstruct_head(h: &HistoryUniforms, mut io: KernelIo<'_>, groups: u32) {
    for i in 0..invocations(h, groups) {
        let idx0 = (h.offset0 + i) as usize;
        let idx1 = (h.offset1 + i) as usize;
        let idx2 = (h.offset2 + i) as usize;

        let p0 = load(io.positions, idx0);
        let p1 = load(io.positions, idx1);
        let p2 = load(io.positions, idx2);

        let t1 = unit_or(p2 - p0, unit_or(load(io.tangents, idx1), Vec3::X));
        let n1 = transport(load(io.normals, idx0), t1);
        let t2 = unit_or(p2 - p1, t1);
        let n2 = transport(n1, t2);

        store(io.tangents, idx1, t1);
        store(io.normals, idx1, n1);
        store(io.tangents, idx2, t2);
        store(io.normals, idx2, n2);
    }
}

/// Rebuild every slot, walking from the oldest to the newest.
fn reconstruct_all(h: &HistoryUniforms, mut io: KernelIo<'_>, groups: u32) {
    let ic = h.instance_count as usize;
    let hl = h.history_length as usize;
    let slot_index = |s: usize, i: u32| ((h.index_offset as usize + s) % hl) * ic + i as usize;

    for i in 0..invocations(h, groups) {
        let mut tangent = Vec3::X;
        let mut normal = Vec3::Y;
        for s in 0..hl {
            let prev = load(io.positions, slot_index(s.saturating_sub(1), i));
            let next = load(io.positions, slot_index((s + 1).min(hl - 1), i));
            tangent = unit_or(next - prev, tangent);
            normal = transport(normal, tangent);

            let idx = slot_index(s, i);
            store(io.tangents, idx, tangent);
            store(io.normals, idx, normal);
        }
    }
}
