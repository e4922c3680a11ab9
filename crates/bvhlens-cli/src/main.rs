//! bvhlens CLI - inspect precomputed BVHs and octrees
//!
//! Loads a scene document, prints tree summaries and node reports, and casts
//! synthetic rays from a BVH's influence region to measure traversal cost.

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use bvhlens::bvhlens_tree::OctreeVisibility;
use bvhlens::{CastSettings, Scene};

mod config;
mod report;

use config::Overrides;
use report::{RayRow, RaysReport};

#[derive(Parser)]
#[command(name = "bvhlens")]
#[command(about = "Inspect BVHs and octrees and measure ray traversal cost", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize every BVH and the octree of a scene
    Info {
        /// Scene document (.json)
        file: PathBuf,
    },
    /// Show a node and its children
    Node {
        /// Scene document (.json)
        file: PathBuf,
        /// Node id
        id: u32,
        /// Index of the BVH in the document
        #[arg(long, default_value_t = 0)]
        bvh: usize,
    },
    /// Cast rays from a BVH's influence region
    Rays {
        /// Scene document (.json)
        file: PathBuf,
        /// Index of the BVH in the document
        #[arg(long, default_value_t = 0)]
        bvh: usize,
        /// Number of rays (0-500)
        #[arg(short = 'n', long)]
        count: Option<usize>,
        /// Ray length (0-100]
        #[arg(short, long)]
        length: Option<f64>,
        /// Random seed
        #[arg(short, long)]
        seed: Option<u32>,
        /// TOML file with cast settings
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Cost of an internal node test
        #[arg(long)]
        internal_cost: Option<f64>,
        /// Cost of a primitive test in a leaf
        #[arg(long)]
        leaf_cost: Option<f64>,
        /// Print every ray
        #[arg(long)]
        show_rays: bool,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Show how each octree cell would be drawn
    Octree {
        /// Scene document (.json)
        file: PathBuf,
        /// Display mode
        #[arg(long, value_enum, default_value_t = OctreeMode::WireframeAndLeaves)]
        mode: OctreeMode,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OctreeMode {
    Nothing,
    Leaves,
    Wireframe,
    WireframeAndLeaves,
}

impl From<OctreeMode> for OctreeVisibility {
    fn from(mode: OctreeMode) -> Self {
        match mode {
            OctreeMode::Nothing => Self::Nothing,
            OctreeMode::Leaves => Self::Leaves,
            OctreeMode::Wireframe => Self::Wireframe,
            OctreeMode::WireframeAndLeaves => Self::WireframeAndLeaves,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Info { file } => {
            let scene = load(&file, Default::default())?;
            print!("{}", report::scene_info(&scene));
        }
        Commands::Node { file, id, bvh } => {
            show_node(&file, bvh, id)?;
        }
        Commands::Rays {
            file,
            bvh,
            count,
            length,
            seed,
            config,
            internal_cost,
            leaf_cost,
            show_rays,
            json,
        } => {
            let overrides = Overrides {
                count,
                length,
                seed,
                internal_cost,
                leaf_cost,
            };
            cast_rays(&file, bvh, config.as_deref(), &overrides, show_rays, json)?;
        }
        Commands::Octree { file, mode } => {
            let scene = load(&file, Default::default())?;
            let Some(octree) = scene.octree() else {
                bail!("{} has no octree", file.display());
            };
            let cells = octree.visibility(mode.into());
            print!("{}", report::octree_cells(octree, &cells));
        }
    }

    Ok(())
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load(file: &Path, settings: CastSettings) -> Result<Scene> {
    Scene::load(file, settings).with_context(|| format!("failed to load {}", file.display()))
}

fn show_node(file: &Path, bvh: usize, id: u32) -> Result<()> {
    let scene = load(file, Default::default())?;
    let tree = scene.bvh(bvh)?.tree();
    let highlight = tree.highlight(id)?;
    print!("{}", report::highlight(&highlight));
    Ok(())
}

fn cast_rays(
    file: &Path,
    bvh: usize,
    config: Option<&Path>,
    overrides: &Overrides,
    show_rays: bool,
    json: bool,
) -> Result<()> {
    let settings = config::resolve_settings(config, overrides)?;
    let mut scene = load(file, settings)?;
    let loaded = scene.bvh_mut(bvh)?;
    let costs = config::resolve_costs(*loaded.costs(), overrides);
    let (tree, caster) = loaded.tree_and_caster_mut();
    let Some(caster) = caster else {
        bail!("BVH {bvh} has no influence area");
    };
    caster.set_costs(costs);
    let summary = caster.generate(tree);

    let rows: Vec<RayRow> = caster
        .segments()
        .into_iter()
        .zip(caster.per_ray().iter().copied())
        .map(|(segment, info)| RayRow { segment, info })
        .collect();

    if json {
        let report = RaysReport {
            bvh,
            region: caster.region().kind(),
            settings: *caster.settings(),
            costs: *caster.costs(),
            summary: summary.as_ref().ok().copied(),
            error: summary.as_ref().err().map(ToString::to_string),
            rays: show_rays.then_some(rows),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", report::batch(&summary));
        if show_rays {
            print!("{}", report::ray_rows(&rows));
        }
    }
    Ok(())
}
