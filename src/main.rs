use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use axum_prometheus::PrometheusMetricLayer;
use clap::{Args, Parser, Subcommand};
use metrics_exporter_prometheus::PrometheusHandle;
use readiness_engine::assessment::{
    assessment_router, load_engine, AnswerSet, AssessmentService, InMemoryRunStore, ProfileFacts,
    RunReport,
};
use readiness_engine::config::AppConfig;
use readiness_engine::error::AppError;
use readiness_engine::telemetry;
use serde_json::json;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
struct AppState {
    readiness: Arc<AtomicBool>,
    metrics: PrometheusHandle,
}

#[derive(Parser, Debug)]
#[command(
    name = "Readiness Assessment Engine",
    about = "Evaluate conditional readiness assessments from the command line or over HTTP",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Evaluate an answer snapshot against a schema document
    Evaluate(EvaluateArgs),
}

#[derive(Args, Debug, Default)]
struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    port: Option<u16>,
    /// Override the configured schema document path
    #[arg(long)]
    schema: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct EvaluateArgs {
    /// Schema document to evaluate against (defaults to the configured path)
    #[arg(long)]
    schema: Option<PathBuf>,
    /// JSON file mapping question ids to answer tokens
    #[arg(long)]
    answers: PathBuf,
    /// JSON file mapping profile fields to booleans
    #[arg(long)]
    profile: Option<PathBuf>,
    /// Include the ranked improvement items in the output
    #[arg(long)]
    improvements: bool,
    /// Emit the full run report as JSON instead of a rendered summary
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run_cli().await {
        eprintln!("application error: {err}");
        std::process::exit(1);
    }
}

async fn run_cli() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => run_server(args).await,
        Command::Evaluate(args) => run_evaluate(args),
    }
}

async fn run_server(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }
    if let Some(schema) = args.schema.take() {
        config.schema.path = schema;
    }

    telemetry::init(&config.telemetry)?;

    let engine = Arc::new(load_engine(&config.schema.path)?);
    info!(
        schema = %config.schema.path.display(),
        assessment_id = %engine.schema().assessment_id,
        version = %engine.schema().version,
        questions = engine.schema().questions.len(),
        "schema document compiled"
    );

    let store = Arc::new(InMemoryRunStore::default());
    let service = Arc::new(AssessmentService::new(engine, store));

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let state = AppState {
        readiness: readiness_flag.clone(),
        metrics: prometheus_handle,
    };

    let app = Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .with_state(state)
        .merge(assessment_router(service))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "assessment engine ready");

    axum::serve(listener, app).await?;
    Ok(())
}

fn run_evaluate(args: EvaluateArgs) -> Result<(), AppError> {
    let EvaluateArgs {
        schema,
        answers,
        profile,
        improvements,
        json,
    } = args;

    let schema_path = match schema {
        Some(path) => path,
        None => AppConfig::load()?.schema.path,
    };

    let engine = load_engine(&schema_path)?;
    let answer_set = parse_answer_set(&std::fs::read_to_string(&answers)?)
        .map_err(|err| AppError::Input(format!("{}: {err}", answers.display())))?;
    let profile_facts = match profile {
        Some(path) => parse_profile_facts(&std::fs::read_to_string(&path)?)
            .map_err(|err| AppError::Input(format!("{}: {err}", path.display())))?,
        None => ProfileFacts::new(),
    };

    let report = engine.evaluate(&answer_set, &profile_facts);

    if json {
        let rendered = serde_json::to_string_pretty(&report)
            .map_err(|err| AppError::Input(err.to_string()))?;
        println!("{rendered}");
    } else {
        render_report(&report);
    }

    if improvements {
        render_improvements(&engine, &answer_set, &profile_facts);
    }

    Ok(())
}

fn parse_answer_set(raw: &str) -> Result<AnswerSet, serde_json::Error> {
    serde_json::from_str(raw)
}

fn parse_profile_facts(raw: &str) -> Result<ProfileFacts, serde_json::Error> {
    serde_json::from_str(raw)
}

fn render_report(report: &RunReport) {
    println!(
        "Assessment {} ({})",
        report.assessment_id, report.version
    );
    println!(
        "Overall score: {:.1} ({})",
        report.overall_score, report.band_label
    );

    println!("\nDimensions");
    for dimension in &report.dimensions {
        match dimension.score {
            Some(score) => println!("- {}: {:.1}", dimension.label, score),
            None => println!("- {}: no scored sections", dimension.label),
        }
    }

    println!("\nSections");
    for section in &report.sections {
        let score = match section.score {
            Some(score) => format!("{score:.1}"),
            None => "n/a".to_string(),
        };
        println!(
            "- {}: {} ({}/{} answered, {} flagged for review)",
            section.label,
            score,
            section.questions_answered,
            section.questions_total,
            section.review_count
        );
    }

    if report.pending_question_ids.is_empty() {
        println!("\nPending questions: none");
    } else {
        println!("\nPending questions");
        for id in &report.pending_question_ids {
            println!("- {id}");
        }
    }

    let flags = &report.flags_summary;
    println!(
        "\nFlags: {} review, {} follow-up, {} not applicable, {} invalid answer",
        flags.review, flags.follow_up, flags.not_applicable, flags.invalid_answer
    );
}

fn render_improvements(
    engine: &readiness_engine::assessment::AssessmentEngine,
    answers: &AnswerSet,
    profile: &ProfileFacts,
) {
    let items = engine.improvement_items(answers, profile);
    if items.is_empty() {
        println!("\nImprovement items: none");
        return;
    }

    println!("\nImprovement items by potential");
    for item in items {
        println!(
            "- [{}] {} ({}): potential {:.2}, currently '{}'",
            item.priority.label(),
            item.question_id,
            item.section_label,
            item.improvement_potential,
            item.answer.label()
        );
    }
}

async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn readiness_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

async fn metrics_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use readiness_engine::assessment::AnswerToken;

    #[test]
    fn answer_file_parses_token_map() {
        let answers = parse_answer_set(r#"{"1.1": "yes", "1.2": "not_sure"}"#).expect("parses");
        assert_eq!(answers.get("1.1"), Some(AnswerToken::Yes));
        assert_eq!(answers.get("1.2"), Some(AnswerToken::NotSure));
    }

    #[test]
    fn answer_file_rejects_unknown_token() {
        assert!(parse_answer_set(r#"{"1.1": "maybe"}"#).is_err());
    }

    #[test]
    fn profile_file_parses_boolean_facts() {
        let facts = parse_profile_facts(r#"{"pets.has_pets": true}"#).expect("parses");
        assert_eq!(facts.get("pets.has_pets"), Some(true));
    }
}
