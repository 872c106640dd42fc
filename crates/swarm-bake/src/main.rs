use std::path::PathBuf;
use std::process;

use swarm_bake::report;
use swarm_bake::runner::{self, BakeOptions};

fn usage() {
    eprintln!("Usage: swarm-bake --scene <job.ron> --output <asset.dfv> [OPTIONS]");
    eprintln!("  --scene <path>        Bake job (RON): resolution, extent, origin, colliders");
    eprintln!("  --output <path>       Volume asset to write");
    eprintln!("  --resolution <n>      Override the job's grid resolution");
    eprintln!("  --extent <e>          Override the job's half-size");
    eprintln!("  --uncompressed        Write the payload without LZ4");
    eprintln!("  --swarm <path>        Swarm config (RON) to run on the baked volume");
    eprintln!("  --frames <n>          Frames to simulate (default: 120)");
    eprintln!("  --gpu                 Run the swarm on the GPU with the built-in kernels");
    eprintln!("  --kernels <dir>       WGSL kernel overrides; implies --gpu");
    eprintln!("  --report <path>       Write a JSON report");
}

fn value<'a>(args: &'a [String], i: usize, flag: &str) -> &'a str {
    match args.get(i) {
        Some(v) => v,
        None => {
            eprintln!("Missing value for {}", flag);
            process::exit(1);
        }
    }
}

fn parse<T: std::str::FromStr>(raw: &str, flag: &str) -> T {
    match raw.parse() {
        Ok(v) => v,
        Err(_) => {
            eprintln!("Invalid {} value: {}", flag, raw);
            process::exit(1);
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();

    let mut scene: Option<PathBuf> = None;
    let mut output: Option<PathBuf> = None;
    let mut report_path: Option<PathBuf> = None;
    let mut resolution: Option<u32> = None;
    let mut extent: Option<f32> = None;
    let mut compress = true;
    let mut swarm: Option<PathBuf> = None;
    let mut frames = 120u32;
    let mut gpu = false;
    let mut kernels: Option<PathBuf> = None;

    let mut i = 1;
    while i < args.len() {
        let flag = args[i].as_str();
        match flag {
            "--scene" => {
                i += 1;
                scene = Some(PathBuf::from(value(&args, i, flag)));
            }
            "--output" => {
                i += 1;
                output = Some(PathBuf::from(value(&args, i, flag)));
            }
            "--resolution" => {
                i += 1;
                resolution = Some(parse(value(&args, i, flag), flag));
            }
            "--extent" => {
                i += 1;
                extent = Some(parse(value(&args, i, flag), flag));
            }
            "--uncompressed" => compress = false,
            "--swarm" => {
                i += 1;
                swarm = Some(PathBuf::from(value(&args, i, flag)));
            }
            "--frames" => {
                i += 1;
                frames = parse(value(&args, i, flag), flag);
            }
            "--gpu" => gpu = true,
            "--kernels" => {
                i += 1;
                kernels = Some(PathBuf::from(value(&args, i, flag)));
            }
            "--report" => {
                i += 1;
                report_path = Some(PathBuf::from(value(&args, i, flag)));
            }
            "--help" | "-h" => {
                usage();
                process::exit(0);
            }
            other => {
                eprintln!("Unknown argument: {}", other);
                usage();
                process::exit(1);
            }
        }
        i += 1;
    }

    let (Some(scene), Some(output)) = (scene, output) else {
        usage();
        process::exit(1);
    };

    let options = BakeOptions {
        resolution,
        extent,
        compress,
        swarm,
        frames,
        gpu,
        kernels,
        ..BakeOptions::new(scene, output)
    };

    let result = match runner::run(&options) {
        Ok(result) => result,
        Err(e) => {
            log::error!("{}", e);
            process::exit(1);
        }
    };

    println!("\n## Bake Results\n");
    println!("{}", report::format_markdown(&result));

    if let Some(ref path) = report_path {
        if let Err(e) = report::save_report(path, &result) {
            log::error!("Failed to write report {}: {}", path.display(), e);
            process::exit(1);
        }
        log::info!("Saved report to {}", path.display());
    }

    log::info!("Bake complete.");
}
