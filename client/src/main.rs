//! Survey Client
//!
//! Command-line front end for the survey backend.
//!
//! ## Commands
//!
//! - `forms`: list the forms still open to the current user
//! - `export <form-id> [out-dir]`: write the response and summary CSV files
//! - `dashboard <form-id>`: print the per-question analytics summary

use anyhow::{bail, Result};
use std::path::PathBuf;
use survey_client::config::ClientConfig;
use survey_client::services::catalog::resolve;
use survey_client::services::build_dashboard;
use survey_client::state::ClientState;
use survey_shared::analytics::{format_average, Presentation};
use survey_shared::FormId;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const USAGE: &str = "usage: survey-client <forms | export <form-id> [out-dir] | dashboard <form-id>>";

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    init_tracing();

    let config = ClientConfig::load()?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        env = if ClientConfig::is_production() { "production" } else { "development" },
        backend = %config.api.base_url,
        "Starting survey client"
    );

    let state = ClientState::new(config)?;
    let args: Vec<String> = std::env::args().skip(1).collect();

    match args.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
        ["forms"] => list_forms(&state).await,
        ["export", form_id] => export(&state, form_id, PathBuf::from(".")).await,
        ["export", form_id, out_dir] => export(&state, form_id, PathBuf::from(out_dir)).await,
        ["dashboard", form_id] => dashboard(&state, form_id).await,
        _ => bail!(USAGE),
    }
}

async fn list_forms(state: &ClientState) -> Result<()> {
    let resolution = resolve(state.api.fetch_active_forms().await?);
    println!("{:?}", resolution.mode);
    for (i, form) in resolution.forms.iter().enumerate() {
        println!(
            "{:>3}. {} ({} questions) [{}]",
            i + 1,
            form.title,
            form.questions.len(),
            form.id
        );
    }
    Ok(())
}

async fn export(state: &ClientState, form_id: &str, out_dir: PathBuf) -> Result<()> {
    let files = state
        .exporter()
        .export_form(&FormId::new(form_id), &out_dir)
        .await?;
    println!("{}", files.responses.display());
    println!("{}", files.summary.display());
    Ok(())
}

async fn dashboard(state: &ClientState, form_id: &str) -> Result<()> {
    let analysis = state.api.get_full_analysis(&FormId::new(form_id)).await?;
    let dashboard = build_dashboard(&analysis, state.config().analytics.sample_answer_limit);

    println!("{} ({} responses)", dashboard.form_title, dashboard.total_responses);
    for panel in &dashboard.panels {
        println!("\n{} [{}] {} answers", panel.title, panel.question_type, panel.total_answers);
        match &panel.presentation {
            Presentation::Chart { series, average } => {
                let shares = series.percentages();
                for (point, share) in series.points.iter().zip(shares) {
                    println!("  {:<24} {:>5} {:>5.1}%", point.label, point.count, share);
                }
                if let Some(average) = average {
                    println!("  average: {}", format_average(*average));
                }
            }
            Presentation::Samples(samples) => {
                for sample in samples {
                    println!("  - {}", sample);
                }
            }
            Presentation::DateRange(range) => println!(
                "  {} .. {}",
                range.earliest.as_deref().unwrap_or("?"),
                range.latest.as_deref().unwrap_or("?")
            ),
            Presentation::Skipped => println!("  (no data)"),
        }
    }
    Ok(())
}

/// Initialize tracing/logging
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if ClientConfig::is_production() {
            "survey_client=info,survey_shared=info".into()
        } else {
            "survey_client=debug,survey_shared=debug,reqwest=warn".into()
        }
    });

    let subscriber = tracing_subscriber::registry().with(env_filter);

    if ClientConfig::is_production() {
        // JSON logging for production
        subscriber
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(tracing_subscriber::fmt::layer().pretty().with_writer(std::io::stderr))
            .init();
    }
}
