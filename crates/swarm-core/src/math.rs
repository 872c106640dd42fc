use crate::constants::{
    MAX_DIVISIONS, MAX_RESOLUTION, MAX_SEGMENTS, MIN_DIVISIONS, MIN_RESOLUTION, MIN_SEGMENTS,
    THREAD_GROUP_WIDTH,
};

/// Number of full workgroups a configured instance count can fill.
///
/// Counts below one workgroup are raised to one workgroup first.
pub fn thread_group_count(configured: u32) -> u32 {
    configured.max(THREAD_GROUP_WIDTH) / THREAD_GROUP_WIDTH
}

/// Effective instance count: the configured count floored to a multiple of
/// the workgroup width (never rounded up).
pub fn effective_instance_count(configured: u32) -> u32 {
    thread_group_count(configured) * THREAD_GROUP_WIDTH
}

/// Clamp a tube segment count to [MIN_SEGMENTS, MAX_SEGMENTS].
pub fn clamp_segments(segments: u32) -> u32 {
    segments.clamp(MIN_SEGMENTS, MAX_SEGMENTS)
}

/// Clamp a tube ring division count to [MIN_DIVISIONS, MAX_DIVISIONS].
pub fn clamp_divisions(divisions: u32) -> u32 {
    divisions.clamp(MIN_DIVISIONS, MAX_DIVISIONS)
}

/// Ring length of the position history for a tube with `segments` segments.
pub fn history_length(segments: u32) -> u32 {
    clamp_segments(segments) + 1
}

/// Clamp a distance-field grid resolution to [MIN_RESOLUTION, MAX_RESOLUTION].
pub fn clamp_resolution(resolution: u32) -> u32 {
    resolution.clamp(MIN_RESOLUTION, MAX_RESOLUTION)
}

/// Index count of the tube template mesh.
///
/// Head cap (3 per division) + body (6 per division per segment) + tail cap
/// (3 per division).
pub fn tube_index_count(divisions: u32, segments: u32) -> u32 {
    let d = clamp_divisions(divisions);
    let s = clamp_segments(segments);
    6 * d * (s + 1)
}

/// Vertex count of the tube template mesh: two tips plus one ring per history slot.
pub fn tube_vertex_count(divisions: u32, segments: u32) -> u32 {
    2 + clamp_divisions(divisions) * (clamp_segments(segments) + 1)
}

/// Flat cell index in a cubic grid, x fastest.
pub fn grid_index(resolution: u32, x: u32, y: u32, z: u32) -> usize {
    let r = resolution as usize;
    x as usize + r * (y as usize + r * z as usize)
}

/// Flat cell index with each coordinate clamped into the grid (edge replicate).
pub fn grid_index_clamped(resolution: u32, x: i64, y: i64, z: i64) -> usize {
    let max = resolution as i64 - 1;
    grid_index(
        resolution,
        x.clamp(0, max) as u32,
        y.clamp(0, max) as u32,
        z.clamp(0, max) as u32,
    )
}
