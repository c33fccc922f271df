use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use textflow_generator::{
    GenerationEvent, GenerationEventSink, GenerationOutcome, GenerationParams, GeneratorConfig,
    GraphGenerationError, GraphGenerator, generation_event_channel,
};
use textflow_graph::{
    Diagnostic, DotStyle, DuplicateIds, Graph, SchemaOptions, UnknownFields, to_dot, validate,
};
use textflow_llm::Client;
use tracing::Level;

#[derive(Parser, Debug)]
#[command(name = "textflow")]
#[command(about = "Turn process descriptions into validated flowchart graphs")]
struct Cli {
    /// Raise log verbosity (-v info, -vv debug).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    Generate(GenerateArgs),
    Validate(ValidateArgs),
    Export(ExportArgs),
}

#[derive(clap::Args, Debug)]
struct GenerateArgs {
    #[arg(long)]
    text: Option<String>,
    #[arg(long)]
    text_file: Option<PathBuf>,
    #[arg(long)]
    model: Option<String>,
    #[arg(long)]
    temperature: Option<f64>,
    #[arg(long)]
    max_retries: Option<u32>,
    #[arg(long)]
    output: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,
    #[command(flatten)]
    schema: SchemaArgs,
    #[arg(long, action = ArgAction::SetTrue)]
    event_json: bool,
}

#[derive(clap::Args, Debug)]
struct ValidateArgs {
    #[arg(long)]
    input: PathBuf,
    #[command(flatten)]
    schema: SchemaArgs,
    #[arg(long, action = ArgAction::SetTrue)]
    json: bool,
}

#[derive(clap::Args, Debug)]
struct ExportArgs {
    #[arg(long)]
    input: PathBuf,
    #[arg(long)]
    output: Option<PathBuf>,
    #[arg(long)]
    layout_engine: Option<String>,
    #[arg(long)]
    node_color: Option<String>,
    #[arg(long)]
    font: Option<String>,
}

#[derive(clap::Args, Debug)]
struct SchemaArgs {
    /// Reject fields the schema does not define.
    #[arg(long, action = ArgAction::SetTrue)]
    strict: bool,
    #[arg(long, action = ArgAction::SetTrue)]
    allow_duplicate_ids: bool,
}

impl SchemaArgs {
    fn options(&self) -> SchemaOptions {
        SchemaOptions {
            unknown_fields: if self.strict {
                UnknownFields::Reject
            } else {
                UnknownFields::Ignore
            },
            duplicate_ids: if self.allow_duplicate_ids {
                DuplicateIds::Allow
            } else {
                DuplicateIds::Reject
            },
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Json,
    Dot,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Generate(args) => generate_command(args).await,
        Commands::Validate(args) => validate_command(args),
        Commands::Export(args) => export_command(args),
    };

    match result {
        Ok(code) => code,
        Err(error) => {
            eprintln!("error: {error}");
            ExitCode::from(1)
        }
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    };
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

async fn generate_command(args: GenerateArgs) -> Result<ExitCode, String> {
    let text = load_text(args.text.as_deref(), args.text_file.as_deref())?;
    let mut config = GeneratorConfig::from_env().map_err(|error| error.to_string())?;
    config.schema = args.schema.options();

    let mut params = config.params();
    if let Some(model) = args.model {
        params.model = model;
    }
    if let Some(temperature) = args.temperature {
        if !(0.0..=2.0).contains(&temperature) {
            return Err(format!(
                "--temperature must be between 0.0 and 2.0, got {temperature}"
            ));
        }
        params.temperature = temperature;
    }
    if let Some(max_retries) = args.max_retries {
        params.max_retries = max_retries;
    }

    let client = Client::from_env().map_err(|error| error.to_string())?;
    let (events, event_task) = event_stream(args.event_json);
    let outcome = run_generation(
        GraphGenerator::new(Arc::new(client))
            .with_config(config)
            .with_events(events),
        &text,
        &params,
    )
    .await;

    if let Some(task) = event_task {
        task.await.map_err(|error| error.to_string())?;
    }
    let outcome = outcome.map_err(|error| error.to_string())?;

    for warning in &outcome.warnings {
        eprintln!("warning: {warning}");
    }
    let rendered = render_graph(&outcome.graph, args.format)?;
    write_output(args.output.as_deref(), &rendered)?;
    if let Some(path) = args.output.as_deref() {
        eprintln!(
            "wrote {} nodes, {} edges to {} after {} attempt(s)",
            outcome.graph.nodes().len(),
            outcome.graph.edges().len(),
            path.display(),
            outcome.attempts
        );
    }
    Ok(ExitCode::SUCCESS)
}

/// Consumes the generator so its event sender is closed once generation ends.
async fn run_generation(
    generator: GraphGenerator,
    text: &str,
    params: &GenerationParams,
) -> Result<GenerationOutcome, GraphGenerationError> {
    generator.generate_detailed(text, params).await
}

fn validate_command(args: ValidateArgs) -> Result<ExitCode, String> {
    let source = read_file(&args.input)?;
    let options = args.schema.options();

    let result = match serde_json::from_str::<Value>(&source) {
        Ok(document) => validate(&document, &options).map_err(|error| error.diagnostics),
        Err(error) => Err(vec![Diagnostic::error(
            "json",
            "",
            format!("invalid JSON: {error}"),
        )]),
    };

    if args.json {
        let report = match &result {
            Ok(validated) => json!({
                "valid": true,
                "errors": [],
                "warnings": validated.warnings,
            }),
            Err(errors) => json!({
                "valid": false,
                "errors": errors,
                "warnings": [],
            }),
        };
        let rendered = serde_json::to_string_pretty(&report).map_err(|e| e.to_string())?;
        println!("{rendered}");
    } else {
        match &result {
            Ok(validated) => {
                println!(
                    "valid: {} nodes, {} edges",
                    validated.graph.nodes().len(),
                    validated.graph.edges().len()
                );
                for warning in &validated.warnings {
                    println!("warning: {warning}");
                }
            }
            Err(errors) => {
                println!("invalid: {} error(s)", errors.len());
                for error in errors {
                    println!("  {error}");
                }
            }
        }
    }

    Ok(if result.is_ok() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(2)
    })
}

fn export_command(args: ExportArgs) -> Result<ExitCode, String> {
    let source = read_file(&args.input)?;
    let graph = Graph::from_json_str(&source).map_err(|error| error.to_string())?;

    let mut style = DotStyle::default();
    if let Some(engine) = args.layout_engine {
        style.layout_engine = engine;
    }
    if let Some(color) = args.node_color {
        style.node_color = color;
    }
    if let Some(font) = args.font {
        style.font = font;
    }

    write_output(args.output.as_deref(), &to_dot(&graph, &style))?;
    Ok(ExitCode::SUCCESS)
}

fn load_text(text: Option<&str>, text_file: Option<&Path>) -> Result<String, String> {
    let text = match (text, text_file) {
        (Some(_), Some(_)) => return Err("provide only one of --text or --text-file".to_string()),
        (None, None) => return Err("one of --text or --text-file is required".to_string()),
        (Some(text), None) => text.to_string(),
        (None, Some(path)) => read_file(path)?,
    };
    if text.trim().is_empty() {
        return Err("process description is empty".to_string());
    }
    Ok(text)
}

fn read_file(path: &Path) -> Result<String, String> {
    std::fs::read_to_string(path)
        .map_err(|e| format!("failed reading '{}': {e}", path.display()))
}

fn write_output(path: Option<&Path>, contents: &str) -> Result<(), String> {
    match path {
        Some(path) => std::fs::write(path, contents)
            .map_err(|e| format!("failed writing '{}': {e}", path.display())),
        None => {
            println!("{contents}");
            Ok(())
        }
    }
}

fn render_graph(graph: &Graph, format: OutputFormat) -> Result<String, String> {
    match format {
        OutputFormat::Json => graph.to_json_pretty().map_err(|e| e.to_string()),
        OutputFormat::Dot => Ok(to_dot(graph, &DotStyle::default())),
    }
}

fn event_stream(event_json: bool) -> (GenerationEventSink, Option<tokio::task::JoinHandle<()>>) {
    if !event_json {
        return (GenerationEventSink::default(), None);
    }

    let (tx, mut rx) = generation_event_channel();
    let task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            print_event_json(&event);
        }
    });
    (GenerationEventSink::with_sender(tx), Some(task))
}

fn print_event_json(event: &GenerationEvent) {
    match serde_json::to_string(event) {
        Ok(line) => eprintln!("{line}"),
        Err(error) => eprintln!("[event seq={}] unserializable: {error}", event.sequence_no),
    }
}
