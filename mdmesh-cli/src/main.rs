//! mdmesh command-line interface.
//!
//! Converts workspace descriptions into legacy VTK meshes.
#![allow(clippy::uninlined_format_args, clippy::too_many_lines)]

use clap::{Args, Parser, Subcommand, ValueEnum};
use log::{debug, info};
use mdmesh_core::{
    MDWorkspace, MetadataJson, Normalization, ThresholdConfig, ThresholdRange, WorkspaceHandle,
    WorkspaceKind, WorkspaceRegistry,
};
use mdmesh_factories::{BuildConfig, FactoryChain, MeshProduct, METADATA_JSON_FIELD};
use mdmesh_io::{
    can_read_file, identify, load_workspace_json, read_field_data, FileFormat, VtkWriter,
};
use mdmesh_presenter::{
    InMemoryLoadingPresenter, LoadingViewState, PresenterConfig, PresenterError,
    RebinningPresenter, RebinningViewState, ViewProgress,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

/// Result type for CLI operations.
type Result<T> = std::result::Result<T, CliError>;

/// CLI error types.
#[derive(Error, Debug)]
enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("I/O error: {0}")]
    MdmeshIo(#[from] mdmesh_io::Error),

    #[error("Core error: {0}")]
    Core(#[from] mdmesh_core::Error),

    #[error("Mesh error: {0}")]
    Mesh(#[from] mdmesh_factories::MeshError),

    #[error("Presenter error: {0}")]
    Presenter(#[from] PresenterError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid arguments: {0}")]
    Usage(String),

    #[error("no mesh was built")]
    NothingBuilt,
}

/// Threshold policy selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Threshold {
    /// Hide zero-signal cells
    IgnoreZeros,
    /// Draw every cell
    None,
    /// Keep cells within --min and --max
    User,
    /// Keep cells at or below the sampled median
    Median,
    /// Keep cells within --n-std standard deviations of the mean
    Gaussian,
}

/// Converts multi-dimensional workspaces into meshes.
#[derive(Parser)]
#[command(name = "mdmesh")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbose output (debug logging)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a mesh from a workspace description
    Mesh {
        /// Input workspace JSON
        #[arg(short, long)]
        input: PathBuf,

        /// Output VTK file
        #[arg(short, long)]
        output: PathBuf,

        #[command(flatten)]
        build: BuildArgs,
    },

    /// Rebin a workspace onto new axes, then build a mesh
    Rebin {
        /// Input workspace JSON
        #[arg(short, long)]
        input: PathBuf,

        /// Geometry XML describing the target axes
        #[arg(short, long)]
        geometry: PathBuf,

        /// Output VTK file
        #[arg(short, long)]
        output: PathBuf,

        #[command(flatten)]
        build: BuildArgs,
    },

    /// Show the dimensions and metadata of a workspace description
    Info {
        /// Input workspace JSON
        #[arg(short, long)]
        input: PathBuf,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Report whether a file can be read
    Sniff {
        /// File to inspect
        path: PathBuf,
    },
}

/// Mesh building options shared by `mesh` and `rebin`.
#[derive(Args, Debug, Clone, Default)]
struct BuildArgs {
    /// Threshold policy
    #[arg(long, value_enum)]
    threshold: Option<Threshold>,

    /// Lower bound of a user threshold
    #[arg(long, requires = "max", allow_negative_numbers = true)]
    min: Option<f64>,

    /// Upper bound of a user threshold
    #[arg(long, requires = "min", allow_negative_numbers = true)]
    max: Option<f64>,

    /// Standard deviations kept by the gaussian threshold
    #[arg(long, default_value = "2.0")]
    n_std: f64,

    /// Signals sampled by statistical thresholds (0 = all)
    #[arg(long, default_value = "0")]
    sample_size: usize,

    /// Signal normalization (auto, none, num-events, volume)
    #[arg(long, value_parser = parse_normalization)]
    normalization: Option<Normalization>,

    /// Time value selecting the slice of a fourth dimension
    #[arg(long, allow_negative_numbers = true)]
    time: Option<f64>,

    /// Render a point cloud of at most N points
    #[arg(long, value_name = "N")]
    splatter: Option<usize>,

    /// Share of the brightest boxes sampled by --splatter (percent)
    #[arg(long)]
    percent: Option<f64>,

    /// Box depth rendered for event workspaces
    #[arg(long)]
    recursion_depth: Option<usize>,

    /// JSON presenter configuration; flags override its values
    #[arg(long)]
    config: Option<PathBuf>,
}

fn parse_normalization(s: &str) -> std::result::Result<Normalization, String> {
    s.parse().map_err(|e: mdmesh_core::Error| e.to_string())
}

impl Threshold {
    fn config(self, args: &BuildArgs) -> ThresholdConfig {
        match self {
            Self::IgnoreZeros => ThresholdConfig::IgnoreZeros,
            Self::None => ThresholdConfig::NoThreshold,
            Self::Median => ThresholdConfig::MedianAndBelow {
                sample_size: args.sample_size,
            },
            Self::Gaussian => ThresholdConfig::Gaussian {
                n_std: args.n_std,
                sample_size: args.sample_size,
            },
            Self::User => ThresholdConfig::UserDefined {
                min: args.min.unwrap_or_default(),
                max: args.max.unwrap_or_default(),
            },
        }
    }
}

impl BuildArgs {
    /// Presenter configuration from `--config` with the flags applied on top.
    fn presenter_config(&self) -> Result<PresenterConfig> {
        let mut config = match &self.config {
            Some(path) => PresenterConfig::from_json_str(&fs::read_to_string(path)?)?,
            None => PresenterConfig::default(),
        };

        let bounds = self.min.is_some() && self.max.is_some();
        match self.threshold {
            Some(Threshold::User) | None if bounds => {
                config.threshold = Threshold::User.config(self);
            }
            Some(Threshold::User) => {
                return Err(CliError::Usage(
                    "--threshold user needs --min and --max".into(),
                ));
            }
            Some(_) if bounds => {
                return Err(CliError::Usage(
                    "--min and --max only apply to --threshold user".into(),
                ));
            }
            Some(threshold) => config.threshold = threshold.config(self),
            None => {}
        }

        let mut build = config.build.clone();
        if let Some(normalization) = self.normalization {
            build = build.with_normalization(normalization);
        }
        if self.time.is_some() {
            build = build.with_time(self.time);
        }
        if let Some(depth) = self.recursion_depth {
            build = build.with_recursion_depth(depth);
        }
        if let Some(points) = self.splatter {
            build = build.try_with_number_of_points(points)?;
        }
        if let Some(percent) = self.percent {
            build = build.try_with_percent_to_use(percent)?;
        }
        config = config.with_build(build);
        config.validate()?;
        Ok(config)
    }

    fn chain(&self, kind: WorkspaceKind) -> fn(&dyn ThresholdRange, &BuildConfig) -> FactoryChain {
        chain_for(self.splatter.is_some(), kind)
    }
}

/// Splatter when asked for, the event box chain for events, the histogram chain otherwise.
fn chain_for(
    splatter: bool,
    kind: WorkspaceKind,
) -> fn(&dyn ThresholdRange, &BuildConfig) -> FactoryChain {
    match (splatter, kind) {
        (true, _) => FactoryChain::splatter,
        (false, WorkspaceKind::Event) => FactoryChain::event,
        (false, WorkspaceKind::Histo) => FactoryChain::standard,
    }
}

fn log_progress(fraction: f64, text: &str) {
    debug!("{}: {:.0}%", text, fraction * 100.0);
}

fn registry_with(workspace: WorkspaceHandle) -> WorkspaceRegistry {
    let mut registry = WorkspaceRegistry::new();
    registry.insert(workspace);
    registry
}

fn write_product(product: &MeshProduct, name: &str, output: &Path) -> Result<()> {
    let mut writer =
        VtkWriter::create(output)?.with_title(format!("{} mesh of {}", product.builder, name));
    writer.write_grid(&product.grid)?;
    println!(
        "Built {} cells ({} points) with {}",
        product.grid.n_cells(),
        product.grid.n_points(),
        product.builder
    );
    println!(
        "Signal range: {} - {}",
        product.signal_range.0, product.signal_range.1
    );
    for warning in &product.warnings {
        eprintln!("Warning: {}", warning);
    }
    println!("Wrote {}", output.display());
    Ok(())
}

fn run_mesh(input: &Path, output: &Path, args: &BuildArgs) -> Result<MeshProduct> {
    let workspace = load_workspace_json(input)?;
    let kind = workspace.kind();
    let name = workspace.name().to_string();
    let config = args.presenter_config()?;

    let view = LoadingViewState {
        time: config.build.time.unwrap_or_default(),
        recursion_depth: config.build.recursion_depth,
        ..LoadingViewState::default()
    };
    let provider = Arc::new(registry_with(workspace));
    let mut presenter =
        InMemoryLoadingPresenter::new(view, provider, name.as_str(), kind).with_config(config);

    let start = Instant::now();
    let mut loading = ViewProgress::new("Loading", log_progress);
    let mut drawing = ViewProgress::new("Drawing", log_progress);
    let product = presenter
        .execute(&args.chain(kind), &mut loading, &mut drawing)?
        .into_product()
        .ok_or(CliError::NothingBuilt)?;
    info!("built mesh in {:.2}s", start.elapsed().as_secs_f64());

    write_product(&product, &name, output)?;
    Ok(product)
}

fn run_rebin(input: &Path, geometry: &Path, output: &Path, args: &BuildArgs) -> Result<MeshProduct> {
    let workspace = load_workspace_json(input)?;
    let name = workspace.name().to_string();
    let config = args.presenter_config()?;
    let xml = fs::read_to_string(geometry)?;

    let mut view = RebinningViewState::new(xml);
    view.time = config.build.time.unwrap_or_default();
    let registry = registry_with(workspace);
    let mut presenter = RebinningPresenter::new(view, &registry, name.as_str(), config)?;

    let start = Instant::now();
    let mut rebinning = ViewProgress::new("Rebinning", log_progress);
    let mut drawing = ViewProgress::new("Drawing", log_progress);
    let product = presenter
        .execute(&args.chain(WorkspaceKind::Histo), &mut rebinning, &mut drawing)?
        .into_product()
        .ok_or(CliError::NothingBuilt)?;
    info!("rebinned and built mesh in {:.2}s", start.elapsed().as_secs_f64());

    if presenter.has_t_dimension_available()? {
        println!(
            "Time axis: {} ({} steps)",
            presenter.time_step_label()?,
            presenter.time_step_values()?.len()
        );
    }
    write_product(&product, &name, output)?;
    Ok(product)
}

fn run_info(input: &Path, json: bool) -> Result<()> {
    let workspace = load_workspace_json(input)?;
    let kind = workspace.kind();
    let name = workspace.name().to_string();
    let provider = Arc::new(registry_with(Arc::clone(&workspace)));
    let mut presenter =
        InMemoryLoadingPresenter::new(LoadingViewState::default(), provider, name.as_str(), kind);
    presenter.execute_load_metadata()?;

    let time_steps = presenter.time_step_values()?;
    if json {
        let dimensions: Vec<_> = workspace
            .dimensions()
            .iter()
            .map(|d| {
                serde_json::json!({
                    "id": d.id(),
                    "label": d.label(),
                    "minimum": d.minimum(),
                    "maximum": d.maximum(),
                    "n_bins": d.n_bins(),
                    "integrated": d.is_integrated(),
                })
            })
            .collect();
        let summary = serde_json::json!({
            "name": name,
            "type": kind.to_string(),
            "instrument": presenter.instrument()?,
            "special_coordinates": i32::from(presenter.special_coordinates()?),
            "normalization": workspace.display_normalization().to_string(),
            "dimensions": dimensions,
            "time_steps": time_steps,
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("Workspace: {}", name);
    println!("Type: {}", kind);
    println!("Instrument: {}", presenter.instrument()?);
    println!("Special coordinates: {:?}", presenter.special_coordinates()?);
    println!("Normalization: {}", workspace.display_normalization());
    println!("Dimensions:");
    for d in workspace.dimensions() {
        println!(
            "  {:<8} {:<24} [{}, {}] {} bins{}",
            d.id(),
            d.label(),
            d.minimum(),
            d.maximum(),
            d.n_bins(),
            if d.is_integrated() { " (integrated)" } else { "" }
        );
    }
    if presenter.has_t_dimension_available()? {
        println!(
            "Time axis: {} ({} steps)",
            presenter.time_step_label()?,
            time_steps.len()
        );
    }
    println!("Geometry XML:\n{}", presenter.geometry_xml()?);
    Ok(())
}

fn run_sniff(path: &Path) -> Result<()> {
    if !can_read_file(path) {
        println!("{}: not readable", path.display());
        return Ok(());
    }
    match identify(path)? {
        Some(FileFormat::MeshVtk) => {
            println!("{}: mdmesh VTK mesh", path.display());
            let fields = read_field_data(path)?;
            if let Some(json) = fields.get(METADATA_JSON_FIELD) {
                let metadata = MetadataJson::from_json_str(json)?;
                println!("Instrument: {}", metadata.instrument);
                println!(
                    "Signal range: {} - {}",
                    metadata.min_value, metadata.max_value
                );
            }
        }
        Some(FileFormat::Nexus(kind)) => println!("{}: NeXus {}", path.display(), kind),
        None => println!("{}: not readable", path.display()),
    }
    Ok(())
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default)).init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Mesh {
            input,
            output,
            build,
        } => {
            run_mesh(&input, &output, &build)?;
        }
        Commands::Rebin {
            input,
            geometry,
            output,
            build,
        } => {
            run_rebin(&input, &geometry, &output, &build)?;
        }
        Commands::Info { input, json } => run_info(&input, json)?,
        Commands::Sniff { path } => run_sniff(&path)?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::float_cmp)]
    use super::*;
    use mdmesh_core::{Dimension, GeometryXml, NoThresholdRange};
    use mdmesh_io::read_vtk;
    use tempfile::tempdir;

    const EVENTS: &str = r#"{
        "type": "MDEventWorkspace",
        "name": "events",
        "dimensions": [
            {"id": "x", "name": "X", "units": "m", "minimum": 0.0, "maximum": 4.0, "n_bins": 4},
            {"id": "y", "name": "Y", "units": "m", "minimum": 0.0, "maximum": 4.0, "n_bins": 4}
        ],
        "events": [
            {"signal": 1.0, "error_sq": 1.0, "center": [0.5, 0.5]},
            {"signal": 2.0, "error_sq": 1.0, "center": [3.5, 0.5]},
            {"signal": 3.0, "error_sq": 1.0, "center": [3.5, 3.5]}
        ],
        "info": {"instrument": "HYSPEC"}
    }"#;

    fn build_args(argv: &[&str]) -> BuildArgs {
        let mut full = vec!["mdmesh", "mesh", "-i", "in.json", "-o", "out.vtk"];
        full.extend_from_slice(argv);
        match Cli::try_parse_from(full).unwrap().command {
            Commands::Mesh { build, .. } => build,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_user_threshold_from_bounds() {
        let config = build_args(&["--min", "-1", "--max", "2.5"])
            .presenter_config()
            .unwrap();
        assert_eq!(
            config.threshold,
            ThresholdConfig::UserDefined { min: -1.0, max: 2.5 }
        );
    }

    #[test]
    fn test_threshold_flag_conflicts() {
        let missing = build_args(&["--threshold", "user"]).presenter_config();
        assert!(matches!(missing, Err(CliError::Usage(_))));
        let mixed =
            build_args(&["--threshold", "median", "--min", "0", "--max", "1"]).presenter_config();
        assert!(matches!(mixed, Err(CliError::Usage(_))));
        let full = vec!["mdmesh", "mesh", "-i", "a", "-o", "b", "--min", "1"];
        assert!(Cli::try_parse_from(full).is_err());
    }

    #[test]
    fn test_build_flags_reach_config() {
        let args = build_args(&[
            "--threshold",
            "gaussian",
            "--n-std",
            "1.5",
            "--normalization",
            "num-events",
            "--time",
            "2",
            "--splatter",
            "500",
            "--recursion-depth",
            "3",
        ]);
        let config = args.presenter_config().unwrap();
        assert_eq!(
            config.threshold,
            ThresholdConfig::Gaussian {
                n_std: 1.5,
                sample_size: 0
            }
        );
        assert_eq!(config.build.normalization, Normalization::NumEventsNormalization);
        assert_eq!(config.build.time, Some(2.0));
        assert_eq!(config.build.number_of_points, 500);
        assert_eq!(config.build.recursion_depth, 3);
        assert!(build_args(&["--splatter", "0"]).presenter_config().is_err());
    }

    #[test]
    fn test_config_file_is_overridden_by_flags() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"threshold": {"kind": "no_threshold"}, "output_histogram": true}"#).unwrap();
        let path_arg = path.to_str().unwrap();
        let config = build_args(&["--config", path_arg]).presenter_config().unwrap();
        assert_eq!(config.threshold, ThresholdConfig::NoThreshold);
        assert!(config.output_histogram);
        let config = build_args(&["--config", path_arg, "--threshold", "ignore-zeros"])
            .presenter_config()
            .unwrap();
        assert_eq!(config.threshold, ThresholdConfig::IgnoreZeros);
    }

    #[test]
    fn test_chain_selection() {
        let threshold = NoThresholdRange::new();
        let config = BuildConfig::default();
        let names = |chain: fn(&dyn ThresholdRange, &BuildConfig) -> FactoryChain| {
            chain(&threshold, &config).builder_names()
        };
        assert_eq!(names(chain_for(false, WorkspaceKind::Event))[0], "EventBox");
        assert_eq!(names(chain_for(false, WorkspaceKind::Histo))[0], "HistoHexahedron4D");
        assert_eq!(names(chain_for(true, WorkspaceKind::Histo))[0], "Splatter");
    }

    #[test]
    fn test_mesh_command_writes_vtk() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("events.json");
        let output = dir.path().join("events.vtk");
        fs::write(&input, EVENTS).unwrap();

        let product = run_mesh(&input, &output, &BuildArgs::default()).unwrap();
        assert_eq!(product.builder, "EventBox");
        let read = read_vtk(&output).unwrap();
        assert_eq!(read.n_cells(), product.grid.n_cells());
        assert!(can_read_file(&output));
        let metadata =
            MetadataJson::from_json_str(read.field_data().get(METADATA_JSON_FIELD).unwrap())
                .unwrap();
        assert_eq!(metadata.instrument, "HYSPEC");
    }

    #[test]
    fn test_rebin_command_histograms_events() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("events.json");
        let geometry = dir.path().join("geometry.xml");
        let output = dir.path().join("rebinned.vtk");
        fs::write(&input, EVENTS).unwrap();
        let target = [
            Dimension::new("x", "X", "m", 0.0, 4.0, 2).unwrap(),
            Dimension::new("y", "Y", "m", 0.0, 4.0, 2).unwrap(),
        ];
        let xml = GeometryXml::from_dimensions(&target)
            .unwrap()
            .to_xml_string()
            .unwrap();
        fs::write(&geometry, xml).unwrap();

        let args = build_args(&["--normalization", "none"]);
        let product = run_rebin(&input, &geometry, &output, &args).unwrap();
        assert_eq!(product.builder, "HistoQuad");
        // three occupied quadrants out of four
        assert_eq!(product.grid.n_cells(), 3);
        assert_eq!(product.signal_range, (1.0, 3.0));
        assert!(output.exists());
    }
}
