//! vizpipe - command line entry point
//!
//! # Usage
//!
//! List the registered sources:
//! ```bash
//! vizpipe sources
//! ```
//!
//! Build source → ExtractGrid → Outline, print the scene and optionally save it:
//! ```bash
//! vizpipe demo --save scene.vizproj
//! ```
//!
//! Restore a saved project:
//! ```bash
//! vizpipe replay scene.vizproj
//! ```
//!
//! Write a default settings file:
//! ```bash
//! vizpipe init
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use vizpipe::config::{AppConfig, LoggingConfig, ProjectFile};
use vizpipe::pipeline::{
    registry, NodeFactory, NodeType, OutlineMode, Pipeline, PipelineBridge, PipelineError,
    PipelineResult, RecordingScene, ReferenceEngine, SceneRef, SourceNode,
};
use vizpipe::types::{Axis, DatasetKind, Extent};

#[derive(Parser)]
#[command(name = "vizpipe")]
#[command(about = "Visualization pipeline core with a reference engine", long_about = None)]
struct Cli {
    /// Settings file (TOML); defaults to the platform data directory
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered data sources
    Sources,

    /// Build a demo pipeline and print the scene
    Demo {
        /// Save the resulting pipeline as a project file
        #[arg(long)]
        save: Option<PathBuf>,
    },

    /// Restore a project file and print the scene
    Replay {
        /// Path to a .vizproj file
        project: PathBuf,
    },

    /// Write a default settings file (to --config, or the data directory)
    Init,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // `init` runs before a settings file exists.
    let config = match (&cli.command, &cli.config) {
        (Commands::Init, _) => AppConfig::default(),
        (_, Some(path)) => {
            AppConfig::load(path).with_context(|| format!("loading {:?}", path))?
        }
        (_, None) => AppConfig::load_or_default(),
    };
    let _guard = init_logging(&config.logging)?;

    match cli.command {
        Commands::Sources => list_sources(),
        Commands::Demo { save } => run_demo(&config, save.as_deref()),
        Commands::Replay { project } => replay(&config, &project),
        Commands::Init => init_config(cli.config.as_deref()),
    }
}

/// Console logging plus an optional daily rolling file. The returned guard
/// flushes the file writer when dropped.
fn init_logging(logging: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.filter));

    let (file_layer, guard) = match &logging.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir).with_context(|| format!("creating log dir {:?}", dir))?;
            let appender = tracing_appender::rolling::daily(dir, "vizpipe.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();

    Ok(guard)
}

fn init_config(path: Option<&Path>) -> Result<()> {
    let (path, written) = match path {
        Some(path) => (path.to_path_buf(), AppConfig::write_default(path)?),
        None => AppConfig::init_app_data()?,
    };
    if written {
        println!("wrote {}", path.display());
    } else {
        println!("{} already exists, left unchanged", path.display());
    }
    Ok(())
}

fn list_sources() -> Result<()> {
    for source in registry::sources() {
        let extensions = if source.extensions.is_empty() {
            "-".to_string()
        } else {
            source.extensions.join(", ")
        };
        println!(
            "{:<24} {:<32} [{}]  {}",
            source.id, source.menu_name, extensions, source.tooltip
        );
    }
    Ok(())
}

fn run_demo(config: &AppConfig, save: Option<&Path>) -> Result<()> {
    let scene = RecordingScene::shared();
    let shared: SceneRef = scene.clone();
    let factory = NodeFactory::new(Rc::new(ReferenceEngine::new()));
    let mut pipeline =
        Pipeline::with_scene(shared).with_message_capacity(config.pipeline.message_capacity);
    let bridge = pipeline.subscribe();

    let mut source = SourceNode::from_id("PLOT3DFile")?;
    source.set_dataset(
        DatasetKind::StructuredGrid,
        Extent::new((0, 31), (0, 31), (0, 15)),
    )?;
    let source = pipeline.add_node(source);
    let grid = pipeline.add_node(factory.create(NodeType::ExtractGrid)?);
    let outline = pipeline.add_node(factory.create(NodeType::Outline)?);
    pipeline.connect(source, grid)?;
    pipeline.connect(grid, outline)?;
    if config.pipeline.auto_start {
        pipeline.start();
    }

    pipeline.modify(grid, |n| -> PipelineResult<()> {
        let grid = n
            .as_extract_grid_mut()
            .ok_or(PipelineError::InvalidNode(grid))?;
        grid.set_min(Axis::X, 8)?;
        grid.set_ratio(Axis::Z, 2)
    })??;
    pipeline.modify(outline, |n| -> PipelineResult<()> {
        n.as_outline_mut()
            .ok_or(PipelineError::InvalidNode(outline))?
            .set_mode(OutlineMode::Cornered)
    })??;

    print_messages(&bridge);
    print_scene(&mut pipeline, &scene.borrow());

    if let Some(path) = save {
        let project = ProjectFile::from_snapshot("demo", pipeline.snapshot());
        project.save(path)?;
        println!("saved {}", path.display());
    }
    Ok(())
}

fn replay(config: &AppConfig, path: &Path) -> Result<()> {
    let project = ProjectFile::load(path)?;
    let scene = RecordingScene::shared();
    let shared: SceneRef = scene.clone();
    let mut pipeline = Pipeline::restore(
        &project.snapshot,
        Rc::new(ReferenceEngine::new()),
        Some(shared),
    )
    .with_context(|| format!("restoring project '{}'", project.name))?;
    if !config.pipeline.auto_start {
        pipeline.stop();
    }

    println!("project '{}' ({} nodes)", project.name, pipeline.len());
    print_scene(&mut pipeline, &scene.borrow());
    Ok(())
}

fn print_messages(bridge: &PipelineBridge) {
    for message in bridge.drain() {
        println!("  {:?}", message);
    }
}

fn print_scene(pipeline: &mut Pipeline, scene: &RecordingScene) {
    println!("pipeline (running: {}):", pipeline.is_running());
    for id in pipeline.execution_order() {
        let Some(node) = pipeline.node(id) else {
            continue;
        };
        let outputs: Vec<String> = node
            .outputs()
            .iter()
            .map(|d| format!("{} {:?}", d.kind(), d.extent()))
            .collect();
        println!(
            "  {} {:<16} visible={} outputs=[{}]",
            id,
            node.name(),
            node.is_visible(),
            outputs.join(", ")
        );
        if let Some(err) = pipeline.last_error(id) {
            println!("      error: {}", err);
        }
    }
    println!(
        "scene: {} actors, {} widgets, {} renders",
        scene.actors().len(),
        scene.widgets().len(),
        scene.render_count()
    );
    for actor in scene.actors() {
        println!("  actor '{}' visible={}", actor.label(), actor.is_visible());
    }
}
