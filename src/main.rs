use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use strata_blocks::ContentRegistry;
use strata_chunk::FlatGenerator;
use strata_geom::V3;
use strata_io::FORMAT_VERSION;
use strata_runtime::ServerMap;
use strata_world::{BLOCK_SIZE, BlockPos, WorldConfig};

#[derive(Parser)]
#[command(name = "strata", about = "Inspect and maintain a saved strata world")]
struct Cli {
    /// World settings (TOML); defaults apply when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Content table (TOML); the built-in table is used when omitted
    #[arg(long, global = true)]
    content: Option<PathBuf>,
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print every stored block position
    List,
    /// Show the state of one block
    Info {
        #[arg(allow_hyphen_values = true)]
        x: i32,
        #[arg(allow_hyphen_values = true)]
        y: i32,
        #[arg(allow_hyphen_values = true)]
        z: i32,
    },
    /// Rewrite blocks stored in an older format and quarantine broken ones
    Migrate,
    /// Recompute the light of one block and store the result
    Relight {
        #[arg(allow_hyphen_values = true)]
        x: i32,
        #[arg(allow_hyphen_values = true)]
        y: i32,
        #[arg(allow_hyphen_values = true)]
        z: i32,
    },
    /// Generate a block (and blank neighbours) if it does not exist yet
    Generate {
        #[arg(allow_hyphen_values = true)]
        x: i32,
        #[arg(allow_hyphen_values = true)]
        y: i32,
        #[arg(allow_hyphen_values = true)]
        z: i32,
    },
    /// Load every stored block and run liquid and metadata steps
    Tick {
        #[arg(long, default_value_t = 1)]
        steps: u32,
        /// Seconds per step; the configured liquid tick when omitted
        #[arg(long)]
        dt: Option<f32>,
    },
}

fn open_world(cli: &Cli) -> Result<ServerMap, Box<dyn Error>> {
    let config = match &cli.config {
        Some(path) => WorldConfig::load_from_path(path)?,
        None => WorldConfig::default(),
    };
    let reg = match &cli.content {
        Some(path) => ContentRegistry::load_from_path(path)?,
        None => ContentRegistry::builtin(),
    };
    let generator = FlatGenerator::from_registry(&reg, config.flat_ground_y)
        .ok_or("content table has no \"stone\" entry for the flat generator")?;
    let sm = ServerMap::open(Arc::new(reg), config, Box::new(generator));
    if !sm.persistence_enabled() {
        return Err(format!("cannot open world at {}", sm.config().save_dir.display()).into());
    }
    Ok(sm)
}

fn list(sm: &ServerMap) -> Result<(), Box<dyn Error>> {
    let mut keys = sm.list_all_loadable_blocks()?;
    keys.sort();
    for bp in &keys {
        println!("{bp}");
    }
    println!("{} blocks", keys.len());
    Ok(())
}

fn info(sm: &mut ServerMap, bp: BlockPos) -> Result<(), Box<dyn Error>> {
    if sm.emerge_block(bp, false)?.is_none() {
        return Err(format!("block {bp} is not stored").into());
    }
    let raw = sm.store().and_then(|s| s.load_raw(bp).ok().flatten());
    if let Some(summary) = sm.analyze_block(bp) {
        println!("{summary}");
    }
    if let Some(version) = raw.as_ref().and_then(|b| b.first()) {
        println!("stored format v{version} (current v{FORMAT_VERSION}), {} bytes", raw.as_ref().map_or(0, Vec::len));
    }
    println!("day/night differs around it: {}", sm.day_night_diffed(bp));

    let origin = bp.origin();
    let centre = origin + V3::splat(BLOCK_SIZE / 2);
    match sm.find_ground_level(centre.x, centre.z) {
        Some(y) => println!("ground at ({}, {}): y={y}", centre.x, centre.z),
        None => println!("no ground in the loaded part of ({}, {})", centre.x, centre.z),
    }
    if let Some(block) = sm.map().block(bp) {
        for (idx, meta) in block.meta.iter() {
            let p = origin + strata_world::local_from_index(idx as usize);
            println!(
                "meta at ({}, {}, {}) owner={:?}: {}",
                p.x,
                p.y,
                p.z,
                meta.owner(),
                meta.info_text()
            );
        }
    }
    Ok(())
}

fn migrate(sm: &mut ServerMap) -> Result<(), Box<dyn Error>> {
    let report = sm.migrate_store()?;
    println!(
        "scanned {}, migrated {}, quarantined {}",
        report.scanned, report.migrated, report.quarantined
    );
    Ok(())
}

fn relight(sm: &mut ServerMap, bp: BlockPos) -> Result<(), Box<dyn Error>> {
    if sm.emerge_block(bp, false)?.is_none() {
        return Err(format!("block {bp} is not stored").into());
    }
    // neighbours give the relight something to read across faces
    for n in bp.face_neighbours() {
        sm.emerge_block(n, false)?;
    }
    let modified = sm.relight_block(bp)?;
    let report = sm.save(true);
    println!(
        "relit {bp}: {} blocks changed, {} written",
        modified.len(),
        report.written
    );
    Ok(())
}

fn generate(sm: &mut ServerMap, bp: BlockPos) -> Result<(), Box<dyn Error>> {
    sm.emerge_block(bp, true)?;
    let report = sm.save(true);
    println!("{bp} ready, {} blocks written", report.written);
    Ok(())
}

fn tick(sm: &mut ServerMap, steps: u32, dt: Option<f32>) -> Result<(), Box<dyn Error>> {
    let dt = dt.unwrap_or(sm.config().liquid_tick_s);
    let keys = sm.list_all_loadable_blocks()?;
    let mut queued = 0;
    for &bp in &keys {
        if sm.load_block(bp) {
            queued += sm.queue_liquids_in_block(bp);
        }
    }
    log::info!(target: "liquid", "{} blocks loaded, {queued} liquid nodes queued", keys.len());

    for step in 0..steps {
        let tick = sm.transform_liquids();
        let meta = sm.node_metadata_step(dt);
        println!(
            "step {step}: {} liquid nodes, {} blocks changed, {} throttled, {} metadata blocks",
            tick.processed,
            tick.modified.len(),
            tick.throttled,
            meta.len()
        );
    }
    let report = sm.save(true);
    println!(
        "{} blocks written, {} in memory, {} liquid nodes still queued",
        report.written,
        report.in_memory,
        sm.liquid_queue_len()
    );
    Ok(())
}

fn run(cli: &Cli) -> Result<(), Box<dyn Error>> {
    let mut sm = open_world(cli)?;
    match cli.command {
        Command::List => list(&sm),
        Command::Info { x, y, z } => info(&mut sm, BlockPos::new(x, y, z)),
        Command::Migrate => migrate(&mut sm),
        Command::Relight { x, y, z } => relight(&mut sm, BlockPos::new(x, y, z)),
        Command::Generate { x, y, z } => generate(&mut sm, BlockPos::new(x, y, z)),
        Command::Tick { steps, dt } => tick(&mut sm, steps, dt),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
