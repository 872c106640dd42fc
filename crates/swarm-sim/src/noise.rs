//! Deterministic hash noise for the host reference kernels.
//!
//! Pure functions; no state. `hash` is keyed on an instance index, a stream
//! and the random seed so every kernel draws independent, reproducible values.

use glam::Vec3;

/// Hash three integers and a seed into a well-mixed u32.
pub(crate) fn hash(x: i32, y: i32, z: i32, seed: u32) -> u32 {
    let mut state = (x as u32)
        .wrapping_mul(0x9E3779B9)
        .wrapping_add((y as u32).wrapping_mul(0x517CC1B7))
        .wrapping_add((z as u32).wrapping_mul(0x6C62272E))
        .wrapping_add(seed.wrapping_mul(0x2545F491));

    state ^= state >> 16;
    state = state.wrapping_mul(0x45D9F3B);
    state ^= state >> 16;
    state = state.wrapping_mul(0x45D9F3B);
    state ^= state >> 16;

    state
}

/// Map a hash to [0, 1).
pub(crate) fn hash_to_float(hash: u32) -> f32 {
    (hash >> 8) as f32 / 16_777_216.0
}

/// Uniform value in [0, 1) for one instance and stream.
pub(crate) fn random(instance: u32, stream: i32, seed: u32) -> f32 {
    hash_to_float(hash(instance as i32, stream, 0, seed))
}

/// Point uniformly distributed in the unit ball.
pub(crate) fn random_in_sphere(instance: u32, stream: i32, seed: u32) -> Vec3 {
    let u = random(instance, stream, seed) * 2.0 - 1.0;
    let theta = random(instance, stream + 1, seed) * std::f32::consts::TAU;
    let r = random(instance, stream + 2, seed).cbrt();
    let s = (1.0 - u * u).max(0.0).sqrt();
    Vec3::new(s * theta.cos(), s * theta.sin(), u) * r
}

fn lattice(x: i32, y: i32, z: i32, seed: u32) -> f32 {
    hash_to_float(hash(x, y, z, seed)) * 2.0 - 1.0
}

/// Smooth value noise in [-1, 1].
pub(crate) fn value_noise(p: Vec3, seed: u32) -> f32 {
    let base = p.floor();
    let f = p - base;
    let t = f * f * (Vec3::splat(3.0) - 2.0 * f);
    // Casts saturate for far-off points; neighbours wrap like WGSL i32 math.
    let (x, y, z) = (base.x as i32, base.y as i32, base.z as i32);
    let (x1, y1, z1) = (x.wrapping_add(1), y.wrapping_add(1), z.wrapping_add(1));

    let x00 = lerp(lattice(x, y, z, seed), lattice(x1, y, z, seed), t.x);
    let x10 = lerp(lattice(x, y1, z, seed), lattice(x1, y1, z, seed), t.x);
    let x01 = lerp(lattice(x, y, z1, seed), lattice(x1, y, z1, seed), t.x);
    let x11 = lerp(lattice(x, y1, z1, seed), lattice(x1, y1, z1, seed), t.x);
    lerp(lerp(x00, x10, t.y), lerp(x01, x11, t.y), t.z)
}

/// Three decorrelated noise channels.
pub(crate) fn noise_vector(p: Vec3, seed: u32) -> Vec3 {
    Vec3::new(
        value_noise(p, seed),
        value_noise(p, seed.wrapping_add(0x68E31DA4)),
        value_noise(p, seed.wrapping_add(0xB5297A4D)),
    )
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}
