//! `readmission` command line client.
//!
//! Usage:
//!   readmission submit --field idade=71 --field sexo=F
//!   readmission submit --query 'idade=71&sexo=F' --format locale
//!   readmission config

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use readmission_client::config::{Config, ConfigOverrides};
use readmission_client::ui::{ErrorNotice, ResultsView};
use readmission_client::{FormSnapshot, NumberFormat, SubmissionHandler, SubmissionOutcome, Trigger};
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "readmission")]
#[command(about = "Submit patient data and show the 30-day readmission risk", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Post form fields to the scoring endpoint and print the result
    Submit {
        /// Form field, repeatable
        #[arg(short, long = "field", value_name = "NAME=VALUE")]
        fields: Vec<String>,
        /// Already URL-encoded fields, placed before any --field values
        #[arg(long, value_name = "ENCODED")]
        query: Option<String>,
        /// Override the configured endpoint
        #[arg(long)]
        endpoint: Option<String>,
        /// Override the number format (raw or locale)
        #[arg(long)]
        format: Option<String>,
    },
    /// Print the effective configuration as TOML
    Config,
}

/// Terminal rendition of the results area.
#[derive(Default)]
struct ConsoleView {
    result_text: Mutex<String>,
}

impl ResultsView for ConsoleView {
    fn set_loading(&self, visible: bool) {
        if visible {
            eprintln!("Calculando...");
        }
    }

    fn set_result_text(&self, text: &str) {
        if let Ok(mut slot) = self.result_text.lock() {
            *slot = text.to_string();
        }
    }

    fn set_results_visible(&self, visible: bool) {
        if visible && let Ok(text) = self.result_text.lock() {
            println!("Risco de readmissão em 30 dias: {}", text);
        }
    }

    fn append_error(&self, notice: ErrorNotice) {
        eprintln!("{}", notice.text);
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let overrides = match &cli.command {
        Commands::Submit {
            endpoint, format, ..
        } => cli_overrides(endpoint.clone(), format.as_deref())?,
        Commands::Config => ConfigOverrides::default(),
    };
    let config =
        Config::load_with_overrides(&overrides).context("Failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.runtime.log_level))
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Submit { fields, query, .. } => {
            let form = build_form(query.as_deref(), &fields)?;
            submit(&config, form).await
        }
        Commands::Config => {
            print!("{}", config.to_toml()?);
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn cli_overrides(endpoint: Option<String>, format: Option<&str>) -> Result<ConfigOverrides> {
    let format = format.map(str::parse::<NumberFormat>).transpose()?;
    Ok(ConfigOverrides { endpoint, format })
}

fn build_form(query: Option<&str>, fields: &[String]) -> Result<FormSnapshot> {
    let mut form = match query {
        Some(q) => q.parse::<FormSnapshot>()?,
        None => FormSnapshot::new(),
    };
    for field in fields {
        let (name, value) = FormSnapshot::parse_field(field)?;
        form.push(name, value);
    }
    Ok(form)
}

async fn submit(config: &Config, form: FormSnapshot) -> Result<ExitCode> {
    let view = Arc::new(ConsoleView::default());
    let handler = Arc::new(SubmissionHandler::from_config(
        config,
        view,
        tokio::runtime::Handle::current(),
    )?);
    info!(endpoint = %handler.settings().endpoint, "submitting form");

    let trigger: Trigger<()> = Trigger::new();
    let (subscription, mut dispatched) = handler.bind(&trigger, Arc::new(form));
    trigger.fire(&());
    subscription.unsubscribe();

    let handle = dispatched
        .recv()
        .await
        .context("submission was not dispatched")?;
    Ok(match handle.outcome().await {
        SubmissionOutcome::Rendered { .. } => ExitCode::SUCCESS,
        SubmissionOutcome::Failed { .. } => ExitCode::FAILURE,
    })
}
