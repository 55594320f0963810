//! `sproc`: validate stored procedure call sites and call procedures
//! through the gateway.

mod commands;

use std::process::ExitCode;

use clap::Parser;
use serde::Serialize;
use sproc_analysis::corrections::{self, CorrectionAnalyzer, CorrectionPlan};
use sproc_analysis::{ValidationPipeline, ValidationReport};
use sproc_core::config::{CliOverrides, SprocConfig};
use sproc_gateway::{Gateway, GatewaySettings, MySqlBackend, ProcedureParams, Row};
use tokio_util::sync::CancellationToken;

use commands::{Cli, Commands};

const EXIT_MISMATCH: u8 = 1;
const EXIT_ERROR: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    sproc_core::tracing::init_tracing();
    let cli = Cli::parse();

    let overrides = CliOverrides {
        connection_string: cli.connection_string.clone(),
        command_timeout_secs: cli.command_timeout,
        max_retry_attempts: cli.max_retries,
        root: Some(cli.root.clone()),
        sql_paths: cli.sql.clone(),
        dry_run: match &cli.command {
            Commands::Apply { execute: true } => Some(false),
            _ => None,
        },
    };
    let config = match SprocConfig::load(&cli.root, Some(&overrides)) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(EXIT_ERROR);
        }
    };

    match cli.command {
        Commands::Validate { fail_on_mismatch } => {
            let report = run_pipeline(&config);
            if cli.json {
                print_json(&report);
            } else {
                print!("{}", report.to_summary_text());
            }
            if fail_on_mismatch && report.has_mismatches() {
                return ExitCode::from(EXIT_MISMATCH);
            }
            ExitCode::SUCCESS
        }
        Commands::Corrections => {
            let report = run_pipeline(&config);
            let corrections = CorrectionAnalyzer::from_config(&config.corrections).analyze(&report);
            if cli.json {
                print_json(&corrections);
            } else {
                print!("{}", corrections.to_summary_text());
            }
            ExitCode::SUCCESS
        }
        Commands::Plan { out } => {
            let report = run_pipeline(&config);
            let analyzer = CorrectionAnalyzer::from_config(&config.corrections);
            let actions = analyzer.generate_actions(&analyzer.analyze(&report));
            let plan = CorrectionPlan::build(&report, &actions);
            if cli.json {
                print_json(&plan);
            } else {
                print!("{}", plan.summary_text());
            }
            if let Some(path) = out {
                if let Err(e) = plan.write_sql_script(&path) {
                    eprintln!("error: {e}");
                    return ExitCode::from(EXIT_ERROR);
                }
                eprintln!("wrote {}", path.display());
            }
            ExitCode::SUCCESS
        }
        Commands::Apply { .. } => {
            let report = run_pipeline(&config);
            let analyzer = CorrectionAnalyzer::from_config(&config.corrections);
            let actions = analyzer.generate_actions(&analyzer.analyze(&report));
            let dry_run = config.corrections.effective_dry_run();
            match corrections::apply(&actions, dry_run, analyzer.preview_limit()) {
                Ok(count) => {
                    println!("{count} correction actions previewed");
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    eprintln!("error: {e}");
                    ExitCode::from(EXIT_ERROR)
                }
            }
        }
        Commands::Ping => {
            let Some(gateway) = connect(&config) else {
                return ExitCode::from(EXIT_ERROR);
            };
            let result = gateway.ping().await;
            if result.is_success() {
                println!("connection ok");
                ExitCode::SUCCESS
            } else {
                eprintln!("error: {}", result.message);
                ExitCode::from(EXIT_ERROR)
            }
        }
        Commands::Call {
            procedure,
            params,
            with_status,
            user,
        } => {
            let Some(gateway) = connect(&config) else {
                return ExitCode::from(EXIT_ERROR);
            };
            let token = CancellationToken::new();
            let on_interrupt = token.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    on_interrupt.cancel();
                }
            });

            let params = params
                .into_iter()
                .fold(ProcedureParams::new(), |acc, (name, value)| acc.with(name, value));
            let mut call = gateway.call(procedure).params(params).cancel_on(&token);
            if let Some(user) = user {
                call = call.user(user);
            }
            let result = if with_status {
                call.query_with_status::<Row>().await
            } else {
                call.query::<Row>().await
            };
            print_json(&result);
            if result.is_success() {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(EXIT_ERROR)
            }
        }
    }
}

fn run_pipeline(config: &SprocConfig) -> ValidationReport {
    let result = ValidationPipeline::new(config.clone()).run();
    for warning in &result.errors {
        tracing::debug!(%warning, "pipeline warning");
    }
    result.data
}

fn connect(config: &SprocConfig) -> Option<Gateway<MySqlBackend>> {
    match MySqlBackend::from_config(&config.database) {
        Ok(backend) => Some(Gateway::with_tracing_sink(
            backend,
            GatewaySettings::from_config(&config.database),
        )),
        Err(e) => {
            eprintln!("error: {e}");
            None
        }
    }
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("error: failed to serialize output: {e}"),
    }
}
