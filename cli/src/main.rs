use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use doctor_core::hospitals::{MAX_RADIUS_METERS, MIN_RADIUS_METERS};
use doctor_core::{DoctorConfig, OverpassClient, SearchQuery, get_default_config_file};
use log::LevelFilter;

mod app;
mod cli;
mod input;
mod logging;
mod map;
mod output;

use crate::app::{ChatContext, build_session};
use crate::cli::Args;
use crate::logging::{log_error, log_info};

const APP_NAME: &str = "ai-doctor";

/// Main function - loads configuration and dispatches to the requested mode
#[tokio::main]
async fn main() -> Result<()> {
    // .env must be read before clap looks at GEMINI_API_KEY
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let config_path = match &args.config {
        Some(path) => path.clone(),
        None => get_default_config_file(APP_NAME)?,
    };
    let file_config = DoctorConfig::load_from_file(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;
    let config = file_config.merge(&overrides_from_args(&args));

    let log_level = if args.verbose {
        LevelFilter::Debug
    } else {
        logging::parse_level(config.log_level.as_deref())
    };
    logging::init(log_level);
    log_info(&format!("Using config file {}", config_path.display()));

    if args.save_config {
        config
            .save_to_file(&config_path)
            .context("Failed to save configuration")?;
        println!("{} {}", "Configuration saved to".green(), config_path.display());
        return Ok(());
    }

    let search_defaults = SearchQuery::from_config(&config);

    if args.hospitals {
        let finder = OverpassClient::new(&config)?;
        let query = args.search_query(&search_defaults);
        app::run_hospital_search(&finder, &query, args.map_out.as_deref()).await;
        return Ok(());
    }

    let mut session = build_session(&config, args.api_key.as_deref())?;

    if args.list_models {
        match session.assistant() {
            Some(client) => app::run_list_models(client).await,
            None => log_error("Please enter your Gemini API Key (--api-key or GEMINI_API_KEY)."),
        }
        return Ok(());
    }

    match args.single_query() {
        Some(prompt) => {
            app::run_single_query(&mut session, prompt).await?;
        }
        None => {
            if args.model.is_none() && !session.is_configured() {
                // First run without flags: offer the picker as well as the key prompt
                let choice = input::select_model(session.model_name());
                app::apply_model_choice(&mut session, choice);
            }
            let finder = OverpassClient::new(&config)?;
            let ctx = ChatContext {
                config: &config,
                finder: &finder,
                search_defaults,
                map_out: args.map_out.clone(),
                opening_message: args.prompt.clone(),
            };
            if let Err(e) = app::run_interactive_chat(&mut session, ctx).await {
                log_error(&format!("Interactive chat failed: {:#}", e));
            }
        }
    }

    Ok(())
}

/// Only the flags that were actually given override the file
fn overrides_from_args(args: &Args) -> DoctorConfig {
    DoctorConfig {
        model_name: args.model.clone(),
        gemini_base_url: None,
        overpass_url: None,
        request_timeout_secs: None,
        max_context_turns: None,
        max_context_chars: None,
        default_latitude: args.lat,
        default_longitude: args.lon,
        default_radius_meters: args
            .radius
            .map(|r| r.clamp(MIN_RADIUS_METERS as i64, MAX_RADIUS_METERS as i64) as u32),
        log_level: None,
    }
}
