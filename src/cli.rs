use crate::config::load_config;
use crate::dump::write_graph_dump;
use crate::gateway::parse_source;
use crate::model::{DiagramKind, Direction};
use crate::snapshot::DiagramDoc;
use crate::state::LayoutState;
use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(
    name = "reqflow",
    version,
    about = "Layout engine for artifact-registry diagrams"
)]
pub struct Args {
    /// Source data JSON (components/artifacts/linkages) or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Saved diagram document JSON to hydrate positions and handles from
    #[arg(short = 'd', long = "diagram")]
    pub diagram: Option<PathBuf>,

    /// Diagram type when no saved document is given
    #[arg(short = 't', long = "diagramType", value_enum, default_value = "component")]
    pub diagram_type: DiagramTypeArg,

    /// Layout direction override (TB or LR)
    #[arg(long = "direction")]
    pub direction: Option<String>,

    /// Config JSON file
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Output file for the layout dump. Defaults to stdout.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Backend base URL; fetches source data and the diagram from it
    #[cfg(feature = "http")]
    #[arg(long = "url")]
    pub url: Option<String>,

    /// Diagram id to load from the backend
    #[cfg(feature = "http")]
    #[arg(long = "diagramId")]
    pub diagram_id: Option<String>,

    /// Write the recomputed snapshot back to the backend
    #[cfg(feature = "http")]
    #[arg(long = "save", default_value_t = false)]
    pub save: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum DiagramTypeArg {
    Component,
    ArtifactGraph,
}

impl From<DiagramTypeArg> for DiagramKind {
    fn from(arg: DiagramTypeArg) -> Self {
        match arg {
            DiagramTypeArg::Component => DiagramKind::Component,
            DiagramTypeArg::ArtifactGraph => DiagramKind::ArtifactGraph,
        }
    }
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    let mut config = load_config(args.config.as_deref())?;

    if let Some(token) = args.direction.as_deref() {
        let direction = Direction::from_token(token)
            .ok_or_else(|| anyhow::anyhow!("Unknown direction: {token} (expected TB or LR)"))?;
        config.layout.component_direction = direction;
        config.layout.artifact_direction = direction;
    }

    #[cfg(feature = "http")]
    if let (Some(url), Some(diagram_id)) = (args.url.as_deref(), args.diagram_id.as_deref()) {
        return run_remote(&args, config, url, diagram_id);
    }

    let input = read_input(args.input.as_deref())?;
    let data = parse_source(&input)?;

    let state = match args.diagram.as_deref() {
        Some(path) => {
            let contents = std::fs::read_to_string(path)?;
            let doc: DiagramDoc = serde_json::from_str(&contents)?;
            LayoutState::hydrate(&doc)
        }
        None => LayoutState::new(args.diagram_type.into()),
    };

    let graph = state.recompute(&data, &config);
    write_graph_dump(args.output.as_deref(), &graph)?;
    Ok(())
}

#[cfg(feature = "http")]
fn run_remote(
    args: &Args,
    config: crate::config::Config,
    url: &str,
    diagram_id: &str,
) -> Result<()> {
    use crate::controller::{DiagramSession, SaveStatus};
    use crate::gateway::HttpStore;
    use std::time::Duration;

    let store = HttpStore::new(
        url,
        Duration::from_secs(config.persistence.request_timeout_secs),
    );
    let data = store.fetch_source()?;
    let mut session = DiagramSession::open(diagram_id, Box::new(store), config, &data)?;

    if args.save {
        session.save();
        if session.save_status() == SaveStatus::Error {
            anyhow::bail!("saving diagram {diagram_id} failed");
        }
    }

    write_graph_dump(args.output.as_deref(), session.graph())?;
    Ok(())
}

fn read_input(path: Option<&Path>) -> Result<String> {
    if let Some(path) = path {
        if path == Path::new("-") {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            return Ok(buf);
        }
        return Ok(std::fs::read_to_string(path)?);
    }

    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}
