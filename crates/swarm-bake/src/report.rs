use std::path::Path;

/// Outcome of one bake, written as JSON with `--report`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BakeReport {
    pub scene: String,
    pub output: String,
    pub resolution: u32,
    pub extent: f32,
    pub collider_count: usize,
    pub cell_count: usize,
    pub distance_min: f32,
    pub distance_max: f32,
    pub bake_ms: f64,
    pub file_bytes: usize,
    pub raw_bytes: u64,
    pub compressed: bool,
    /// Compatibility warnings raised when the asset was reloaded.
    pub warnings: Vec<String>,
    pub swarm: Option<SwarmReport>,
}

/// Outcome of the optional headless swarm run.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SwarmReport {
    pub variant: String,
    pub backend: String,
    pub instance_count: u32,
    pub history_length: u32,
    pub frames: u32,
    pub simulated_frames: u32,
    pub final_frame: u64,
    pub run_ms: f64,
    /// Position bounds over the whole history; host backend only.
    pub bounds: Option<PositionBounds>,
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PositionBounds {
    pub min: [f32; 3],
    pub max: [f32; 3],
    pub all_finite: bool,
}

impl PositionBounds {
    /// Bounds of the xyz part of `positions`. Non-finite entries are skipped
    /// and clear `all_finite`.
    pub fn from_positions(positions: &[[f32; 4]]) -> Self {
        let mut min = [f32::INFINITY; 3];
        let mut max = [f32::NEG_INFINITY; 3];
        let mut all_finite = true;
        for p in positions {
            if !p[..3].iter().all(|c| c.is_finite()) {
                all_finite = false;
                continue;
            }
            for axis in 0..3 {
                min[axis] = min[axis].min(p[axis]);
                max[axis] = max[axis].max(p[axis]);
            }
        }
        Self {
            min,
            max,
            all_finite,
        }
    }
}

/// Save a report as pretty JSON, creating parent directories.
pub fn save_report(path: &Path, report: &BakeReport) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(report).map_err(std::io::Error::other)?;
    std::fs::write(path, json)
}

/// Load a report. Returns None if the file is missing or unreadable.
pub fn load_report(path: &Path) -> Option<BakeReport> {
    let contents = std::fs::read_to_string(path).ok()?;
    serde_json::from_str(&contents).ok()
}

/// Markdown summary for the terminal.
pub fn format_markdown(report: &BakeReport) -> String {
    let mut out = String::new();
    out.push_str("| Scene | Resolution | Extent | Colliders | Distance | Bake (ms) | File (bytes) |\n");
    out.push_str("|-------|------------|--------|-----------|----------|-----------|--------------|\n");
    out.push_str(&format!(
        "| {} | {}^3 | {:.3} | {} | {:.4} .. {:.4} | {:.1} | {}{} |\n",
        report.scene,
        report.resolution,
        report.extent,
        report.collider_count,
        report.distance_min,
        report.distance_max,
        report.bake_ms,
        report.file_bytes,
        if report.compressed { " (lz4)" } else { "" },
    ));

    if let Some(swarm) = &report.swarm {
        out.push_str(&format!(
            "\nSwarm: {} on {} backend, {} instances x {} slots, {}/{} frames simulated in {:.1} ms\n",
            swarm.variant,
            swarm.backend,
            swarm.instance_count,
            swarm.history_length,
            swarm.simulated_frames,
            swarm.frames,
            swarm.run_ms,
        ));
        if let Some(b) = &swarm.bounds {
            out.push_str(&format!(
                "Positions: min ({:.3}, {:.3}, {:.3}) max ({:.3}, {:.3}, {:.3}){}\n",
                b.min[0],
                b.min[1],
                b.min[2],
                b.max[0],
                b.max[1],
                b.max[2],
                if b.all_finite { "" } else { " [non-finite values]" },
            ));
        }
    }

    for warning in &report.warnings {
        out.push_str(&format!("warning: {}\n", warning));
    }
    out
}
