use futures::StreamExt as _;
use futures::executor::block_on;
use recflow::{
    Base, BaseHandle, ChannelExpander, ClickTarget, ConfigStore, ContainerBox, DisplayState,
    ExportFormat, Flowchart, WriteIntent,
};
use recflow_core::{BuildOutcome, Record, Settings, SettingsValidation};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug)]
enum CliError {
    Usage(&'static str),
    Io(std::io::Error),
    Core(recflow_core::Error),
    Flowchart(recflow::Error),
    Json(serde_json::Error),
    /// The pipeline ended in a state without a drawing (invalid settings, empty, too many).
    NotDrawn(String),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Usage(msg) => write!(f, "{msg}"),
            CliError::Io(err) => write!(f, "I/O error: {err}"),
            CliError::Core(err) => write!(f, "{err}"),
            CliError::Flowchart(err) => write!(f, "{err}"),
            CliError::Json(err) => write!(f, "JSON error: {err}"),
            CliError::NotDrawn(msg) => write!(f, "{msg}"),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<recflow_core::Error> for CliError {
    fn from(value: recflow_core::Error) -> Self {
        Self::Core(value)
    }
}

impl From<recflow::Error> for CliError {
    fn from(value: recflow::Error) -> Self {
        Self::Flowchart(value)
    }
}

impl From<recflow::ExportError> for CliError {
    fn from(value: recflow::ExportError) -> Self {
        Self::Flowchart(value.into())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

#[derive(Debug, Clone, Copy, Default)]
enum Command {
    #[default]
    Validate,
    Graph,
    Dot,
    Render,
    Resolve,
}

#[derive(Debug)]
struct Args {
    command: Command,
    base: Option<String>,
    config: Option<String>,
    sets: Vec<String>,
    format: ExportFormat,
    out_dir: PathBuf,
    container: ContainerBox,
    pretty: bool,
    target: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ValidateOut {
    is_valid: bool,
    message: Option<String>,
    settings: Settings,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ResolveOut<'a> {
    target: &'a str,
    record: Option<Record>,
}

fn usage() -> &'static str {
    "recflow-cli\n\
\n\
USAGE:\n\
  recflow-cli validate --base <base.json> [--config <config.json>] [--set key=value]... [--pretty]\n\
  recflow-cli graph    --base <base.json> [--config <config.json>] [--set key=value]... [--pretty]\n\
  recflow-cli dot      --base <base.json> [--config <config.json>] [--set key=value]...\n\
  recflow-cli render   --base <base.json> [--config <config.json>] [--set key=value]... [--format svg|png] [--out-dir <dir>] [--container <w>x<h>]\n\
  recflow-cli resolve  --base <base.json> [--config <config.json>] [--set key=value]... [--container <w>x<h>] [--pretty] <element-id>[/<child>...]\n\
\n\
NOTES:\n\
  - Config keys: tableId, viewId, fieldId, chartOrientation, linkStyle, recordShape.\n\
  - --set applies after --config; an empty value clears the key.\n\
  - render writes `<view name>.<ext>` into --out-dir (default: current directory) and prints the path.\n\
  - Exit codes: 0 ok, 1 error, 2 usage, 3 no drawing (invalid settings, empty view, too many records).\n\
"
}

fn parse_args(argv: &[String]) -> Result<Args, CliError> {
    let mut args = Args {
        command: Command::default(),
        base: None,
        config: None,
        sets: Vec::new(),
        format: ExportFormat::Svg,
        out_dir: PathBuf::from("."),
        container: ContainerBox::default(),
        pretty: false,
        target: None,
    };

    let mut it = argv.iter().skip(1);
    while let Some(a) = it.next() {
        match a.as_str() {
            "--help" | "-h" => return Err(CliError::Usage(usage())),
            "validate" => args.command = Command::Validate,
            "graph" => args.command = Command::Graph,
            "dot" => args.command = Command::Dot,
            "render" => args.command = Command::Render,
            "resolve" => args.command = Command::Resolve,
            "--pretty" => args.pretty = true,
            "--base" => {
                let Some(path) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.base = Some(path.clone());
            }
            "--config" => {
                let Some(path) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.config = Some(path.clone());
            }
            "--set" => {
                let Some(assignment) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.sets.push(assignment.clone());
            }
            "--format" => {
                let Some(fmt) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.format = fmt
                    .parse::<ExportFormat>()
                    .map_err(|_| CliError::Usage(usage()))?;
            }
            "--out-dir" => {
                let Some(dir) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.out_dir = PathBuf::from(dir);
            }
            "--container" => {
                let Some(size) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.container = size
                    .parse::<ContainerBox>()
                    .map_err(|_| CliError::Usage(usage()))?;
            }
            other if other.starts_with('-') => return Err(CliError::Usage(usage())),
            target => {
                if args.target.is_some() {
                    return Err(CliError::Usage(usage()));
                }
                args.target = Some(target.to_string());
            }
        }
    }

    if args.base.is_none() {
        return Err(CliError::Usage(usage()));
    }
    match (args.command, args.target.is_some()) {
        (Command::Resolve, false) => return Err(CliError::Usage(usage())),
        (Command::Resolve, true) => {}
        (_, true) => return Err(CliError::Usage(usage())),
        (_, false) => {}
    }
    Ok(args)
}

fn write_json(value: &impl Serialize, pretty: bool) -> Result<(), CliError> {
    if pretty {
        serde_json::to_writer_pretty(std::io::stdout().lock(), value)?;
    } else {
        serde_json::to_writer(std::io::stdout().lock(), value)?;
    }
    println!();
    Ok(())
}

fn load(args: &Args) -> Result<(BaseHandle, ConfigStore), CliError> {
    let base = match args.base.as_deref() {
        Some(path) => Base::load(path)?,
        None => return Err(CliError::Usage(usage())),
    };
    let config = match args.config.as_deref() {
        Some(path) => ConfigStore::load(path)?,
        None => ConfigStore::default(),
    };
    for assignment in &args.sets {
        config.apply(WriteIntent::parse_assignment(assignment)?)?;
    }
    Ok((BaseHandle::new(base), config))
}

fn not_drawn(state: &DisplayState) -> CliError {
    CliError::NotDrawn(
        state
            .prompt()
            .unwrap_or_else(|| format!("no drawing ({})", state.name())),
    )
}

/// Runs the controller up to graph construction; the layout it starts is not awaited.
fn evaluate(chart: &mut Flowchart) -> Result<BuildOutcome, CliError> {
    drop(chart.refresh());
    if let Some(graph) = chart.graph() {
        return Ok(BuildOutcome::Graph(graph.clone()));
    }
    match chart.display_state() {
        DisplayState::Empty => Ok(BuildOutcome::Empty),
        DisplayState::TooManyRecords { count, limit } => {
            Ok(BuildOutcome::CapExceeded { count, limit })
        }
        state => Err(not_drawn(&state)),
    }
}

fn outcome_result(outcome: &BuildOutcome) -> Result<(), CliError> {
    match outcome {
        BuildOutcome::Graph(_) => Ok(()),
        BuildOutcome::Empty => Err(CliError::NotDrawn(recflow::EMPTY_PROMPT.to_string())),
        BuildOutcome::CapExceeded { limit, .. } => Err(CliError::NotDrawn(
            recflow::too_many_records_prompt(*limit),
        )),
    }
}

fn run(args: Args) -> Result<(), CliError> {
    let (base, config) = load(&args)?;

    match args.command {
        Command::Validate => {
            let validation = recflow::validate_settings(&base.snapshot(), &config.snapshot());
            write_json(
                &ValidateOut {
                    is_valid: validation.is_valid(),
                    message: validation.message(),
                    settings: validation.settings(),
                },
                args.pretty,
            )?;
            match validation {
                SettingsValidation::Valid(_) => Ok(()),
                SettingsValidation::Invalid { reason, .. } => {
                    Err(CliError::NotDrawn(reason.to_string()))
                }
            }
        }
        Command::Graph => {
            let mut chart = Flowchart::new(base, config);
            let outcome = evaluate(&mut chart)?;
            write_json(&outcome, args.pretty)?;
            outcome_result(&outcome)
        }
        Command::Dot => {
            let mut chart = Flowchart::new(base, config);
            let outcome = evaluate(&mut chart)?;
            let Some(dot) = chart.dot() else {
                return outcome_result(&outcome);
            };
            print!("{dot}");
            Ok(())
        }
        Command::Render => {
            let mut chart = Flowchart::new(base, config).with_container(args.container);
            let state = chart.refresh_blocking();
            if state.drawing().is_none() {
                return Err(not_drawn(&state));
            }
            let file = chart.export(args.format)?;
            let path = file.write_to(&args.out_dir)?;
            println!("{}", path.display());
            Ok(())
        }
        Command::Resolve => {
            let raw_target = args.target.as_deref().unwrap_or_default();
            let target = raw_target
                .parse::<ClickTarget>()
                .map_err(|_| CliError::Usage(usage()))?;
            let mut chart = Flowchart::new(base, config).with_container(args.container);
            let state = chart.refresh_blocking();
            if state.drawing().is_none() {
                return Err(not_drawn(&state));
            }
            let (expander, mut expanded) = ChannelExpander::new();
            chart.click(&target, &expander);
            drop(expander);
            let record = block_on(expanded.next());
            write_json(
                &ResolveOut {
                    target: raw_target,
                    record,
                },
                args.pretty,
            )
        }
    }
}

fn main() {
    let args = match parse_args(&std::env::args().collect::<Vec<_>>()) {
        Ok(v) => v,
        Err(CliError::Usage(msg)) => {
            eprintln!("{msg}");
            std::process::exit(2);
        }
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    };

    match run(args) {
        Ok(()) => {}
        Err(CliError::NotDrawn(msg)) => {
            eprintln!("{msg}");
            std::process::exit(3);
        }
        Err(CliError::Usage(msg)) => {
            eprintln!("{msg}");
            std::process::exit(2);
        }
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    }
}
