use anyhow::{Context as AnyhowContext, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use evidence_protocol::{serialize_json, CrossEncoderScore, Evidence, RerankRequest, RerankResponse};
use evidence_rerank::{EvidenceReranker, RerankProfile};
use serde::Serialize;
use std::env;
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

const PROFILE_ENV: &str = "EVIDENCE_RERANK_PROFILE";
const DEFAULT_PROFILE: &str = "default";

/// Writes one line of JSON. A reader that went away early (`| head`) is not an error.
fn print_stdout(text: &str) -> Result<()> {
    use std::io::Write;

    let mut stdout = io::stdout().lock();
    if let Err(err) = stdout
        .write_all(text.as_bytes())
        .and_then(|_| stdout.write_all(b"\n"))
        .and_then(|_| stdout.flush())
    {
        if err.kind() == io::ErrorKind::BrokenPipe {
            log::debug!("stdout closed before the response was written");
            return Ok(());
        }
        return Err(err).context("Failed to write response to stdout");
    }
    Ok(())
}

#[derive(Parser)]
#[command(name = "evidence-rerank")]
#[command(about = "Cross-encoder reranking of borderline claim evidence", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only errors (stdout is reserved for JSON)
    #[arg(long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Builtin profile name or path to a JSON/TOML profile file
    #[arg(long, global = true)]
    profile: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Rerank an evidence list for a claim (JSON request in, JSON response out)
    Rerank(RerankArgs),

    /// Score a single (claim, evidence) pair
    Score(ScoreArgs),

    /// Print the resolved profile
    Profile(ProfileArgs),

    /// Print the JSON schema of a wire type
    Schema(SchemaArgs),
}

#[derive(Args)]
struct RerankArgs {
    /// Inline JSON request (mutually exclusive with --file)
    #[arg(long, conflicts_with = "file")]
    json: Option<String>,

    /// Path to file containing the JSON request
    #[arg(long)]
    file: Option<PathBuf>,

    /// Pretty-print JSON response
    #[arg(long)]
    pretty: bool,
}

#[derive(Args)]
struct ScoreArgs {
    #[arg(long)]
    claim: String,

    #[arg(long)]
    evidence: String,

    /// Embedding similarity of the pair; enables the adjusted score in the output
    #[arg(long)]
    cosine: Option<f32>,

    #[arg(long)]
    pretty: bool,
}

#[derive(Args)]
struct ProfileArgs {
    /// List builtin profile names instead of printing the resolved profile
    #[arg(long)]
    list: bool,

    #[arg(long)]
    pretty: bool,
}

#[derive(Args)]
struct SchemaArgs {
    #[arg(value_enum, default_value_t = SchemaTarget::Request)]
    target: SchemaTarget,
}

#[derive(Clone, Copy, ValueEnum)]
enum SchemaTarget {
    Request,
    Response,
    Evidence,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ScoreOutput {
    profile: String,
    score: CrossEncoderScore,
    #[serde(skip_serializing_if = "Option::is_none")]
    cosine_similarity: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    adjusted_score: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    borderline: Option<bool>,
}

#[derive(Serialize)]
struct ProfileList<'a> {
    selected: &'a str,
    builtin: &'a [&'a str],
}

pub async fn main_entry() -> Result<()> {
    let cli = Cli::parse();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Error);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    let profile_name = cli
        .profile
        .clone()
        .or_else(|| env::var(PROFILE_ENV).ok())
        .unwrap_or_else(|| DEFAULT_PROFILE.to_string());

    match cli.command {
        Commands::Rerank(args) => run_rerank(args, &profile_name).await?,
        Commands::Score(args) => run_score(args, &profile_name)?,
        Commands::Profile(args) => run_profile(args, &profile_name)?,
        Commands::Schema(args) => run_schema(args)?,
    }

    Ok(())
}

fn load_profile(name_or_path: &str) -> Result<RerankProfile> {
    let profile = RerankProfile::resolve(name_or_path)
        .with_context(|| format!("Failed to load profile '{name_or_path}'"))?;
    log::debug!("Using profile '{}'", profile.name());
    Ok(profile)
}

async fn run_rerank(args: RerankArgs, profile_name: &str) -> Result<()> {
    let raw = read_payload(&args)?;
    let request: RerankRequest =
        serde_json::from_str(&raw).context("Invalid rerank request JSON")?;
    let profile = load_profile(profile_name)?;

    let reranker = EvidenceReranker::new(&profile);
    let outcome = reranker.rerank(&request.claim, request.evidence).await;
    let response = RerankResponse::new(outcome.results, outcome.stats);

    print_stdout(&serialize_json(&response, args.pretty)?)
}

fn run_score(args: ScoreArgs, profile_name: &str) -> Result<()> {
    let profile = load_profile(profile_name)?;
    let reranker = EvidenceReranker::new(&profile);
    let evidence = Evidence::new("score", args.evidence, args.cosine.unwrap_or(0.0));
    let scored = reranker.cross_encode_score(&args.claim, &evidence);

    let output = ScoreOutput {
        profile: profile.name().to_string(),
        score: scored.score,
        cosine_similarity: args.cosine,
        adjusted_score: args.cosine.map(|_| scored.adjusted_score),
        borderline: args.cosine.map(|cosine| reranker.is_borderline(cosine)),
    };
    print_stdout(&serialize_json(&output, args.pretty)?)
}

fn run_profile(args: ProfileArgs, profile_name: &str) -> Result<()> {
    let rendered = if args.list {
        serialize_json(
            &ProfileList {
                selected: profile_name,
                builtin: RerankProfile::BUILTIN_NAMES,
            },
            args.pretty,
        )?
    } else {
        serialize_json(&load_profile(profile_name)?, args.pretty)?
    };
    print_stdout(&rendered)
}

fn run_schema(args: SchemaArgs) -> Result<()> {
    let schema = match args.target {
        SchemaTarget::Request => schemars::schema_for!(RerankRequest),
        SchemaTarget::Response => schemars::schema_for!(RerankResponse),
        SchemaTarget::Evidence => schemars::schema_for!(Evidence),
    };
    print_stdout(&serialize_json(&schema, true)?)
}

fn read_payload(args: &RerankArgs) -> Result<String> {
    if let Some(raw) = &args.json {
        return Ok(raw.clone());
    }
    if let Some(path) = &args.file {
        return fs::read_to_string(path)
            .with_context(|| format!("Failed to read JSON from {}", path.display()));
    }

    let mut buffer = String::new();
    io::stdin()
        .read_to_string(&mut buffer)
        .context("Failed to read JSON from stdin")?;

    if buffer.trim().is_empty() {
        anyhow::bail!("Rerank request is empty. Provide --json, --file, or pipe JSON via stdin.");
    }

    Ok(buffer)
}
