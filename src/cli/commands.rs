//! Command implementations for the hoplite CLI.

use std::fs;
use std::path::Path;

use serde_json::Value;

use crate::cli::args::*;
use crate::cli::output::*;
use crate::client::{Client, ReplayTransport, RequestOptions, parse_batch};
use crate::error::Result;
use crate::query::create_msearch_body;
use crate::request::SearchRequest;
use crate::rules::evaluate_rules;
use crate::settings::SearchSettings;

/// Execute a CLI command.
pub fn execute_command(args: HopliteArgs) -> Result<()> {
    match &args.command {
        Command::Compile(compile_args) => compile(compile_args, &args),
        Command::Transform(transform_args) => transform(transform_args, &args),
        Command::Run(run_args) => run(run_args, &args),
        Command::Rules(rules_args) => show_rules(rules_args, &args),
        Command::Validate(validate_args) => validate(validate_args, &args),
    }
}

fn compile(args: &CompileArgs, cli_args: &HopliteArgs) -> Result<()> {
    let settings = load_settings(&args.settings)?;
    let requests = load_requests(&args.requests)?;
    let client = Client::new(settings, ReplayTransport::default());

    let batch = client.compile_batch(&requests, None)?;
    match cli_args.output_format {
        OutputFormat::Human => output_text(
            &format!("Compiled {} requests", batch.requests.len()),
            &create_msearch_body(&batch.requests)?,
            cli_args,
        ),
        OutputFormat::Json => output_result("Compiled requests", &batch.requests, cli_args),
    }
}

fn transform(args: &TransformArgs, cli_args: &HopliteArgs) -> Result<()> {
    let settings = load_settings(&args.settings)?;
    let requests = load_requests(&args.requests)?;
    let recorded = ReplayTransport::from_file(&args.responses)?;
    let client = Client::new(settings, ReplayTransport::default());

    let batch = client.compile_batch(&requests, None)?;
    let results = client.transform_batch(&requests, recorded.responses(), &batch.actions)?;

    output_result(
        &format!("Transformed {} responses", results.len()),
        &results,
        cli_args,
    )
}

fn run(args: &TransformArgs, cli_args: &HopliteArgs) -> Result<()> {
    let settings = load_settings(&args.settings)?;
    let requests = load_requests(&args.requests)?;
    let client = Client::new(settings, ReplayTransport::from_file(&args.responses)?);

    let runtime = tokio::runtime::Runtime::new()?;
    let results =
        runtime.block_on(client.handle_requests(&requests, &RequestOptions::default()))?;

    output_result(
        &format!("Completed {} requests", results.results.len()),
        &results,
        cli_args,
    )
}

fn show_rules(args: &CompileArgs, cli_args: &HopliteArgs) -> Result<()> {
    let settings = load_settings(&args.settings)?;
    let requests = load_requests(&args.requests)?;

    let evaluations: Vec<RuleEvaluation> = requests
        .iter()
        .map(|request| RuleEvaluation {
            index_name: request.index_name.clone(),
            query: request.params.query().to_string(),
            actions: evaluate_rules(&settings.query_rules, request),
        })
        .collect();

    output_result("Query rule evaluation", &evaluations, cli_args)
}

fn validate(args: &ValidateArgs, cli_args: &HopliteArgs) -> Result<()> {
    let settings = load_settings(&args.settings)?;

    output_result(
        "Settings are valid",
        &SettingsSummary {
            path: args.settings.to_string_lossy().to_string(),
            search_attributes: settings.search_attributes.len(),
            facet_attributes: settings
                .facet_names()
                .into_iter()
                .map(str::to_string)
                .collect(),
            sort_options: settings.sorting.keys().cloned().collect(),
            query_rules: settings.query_rules.len(),
        },
        cli_args,
    )
}

fn load_settings(path: &Path) -> Result<SearchSettings> {
    log::info!("loading settings from {}", path.display());
    SearchSettings::from_file(path)
}

fn load_requests(path: &Path) -> Result<Vec<SearchRequest>> {
    log::info!("loading requests from {}", path.display());
    let content = fs::read_to_string(path)?;
    let body: Value = serde_json::from_str(&content)?;
    parse_batch(&body)
}
