use clap::Parser;
use doctor_core::SearchQuery;
use std::path::PathBuf;

/// AI doctor assistant: describe symptoms, get general guidance, find nearby hospitals
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Symptoms to send as a single query (omit to start an interactive chat).
    /// With --interactive they become the first message of the chat.
    #[arg(index = 1)] // Positional argument
    pub prompt: Option<String>,

    /// Gemini API key; prompted for (masked) when absent. Never saved.
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Gemini model to use (e.g. gemini-1.5-flash)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Enter interactive chat mode (the default when no prompt is given)
    #[arg(short, long, default_value_t = false)]
    pub interactive: bool,

    /// Search for hospitals near --lat/--lon and exit
    #[arg(long, default_value_t = false)]
    pub hospitals: bool,

    /// Latitude for the hospital search
    #[arg(long, allow_negative_numbers = true)]
    pub lat: Option<f64>,

    /// Longitude for the hospital search
    #[arg(long, allow_negative_numbers = true)]
    pub lon: Option<f64>,

    /// Search radius in meters; clamped to 1000..=10000
    #[arg(long, allow_negative_numbers = true)]
    pub radius: Option<i64>,

    /// Write an HTML map of the hospitals found to this file
    #[arg(long)]
    pub map_out: Option<PathBuf>,

    /// List the models exposed by the Gemini API and exit
    #[arg(long, default_value_t = false)]
    pub list_models: bool,

    /// Path to the configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Save the effective configuration (without the API key) and exit
    #[arg(long, default_value_t = false)]
    pub save_config: bool,

    /// Enable verbose output
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl Args {
    /// The prompt to answer once and exit with, unless an interactive chat was requested
    pub fn single_query(&self) -> Option<&str> {
        if self.interactive {
            None
        } else {
            self.prompt.as_deref()
        }
    }

    /// Fills any location flag that was not given from `defaults`
    pub fn search_query(&self, defaults: &SearchQuery) -> SearchQuery {
        SearchQuery::new(
            self.lat.unwrap_or(defaults.latitude),
            self.lon.unwrap_or(defaults.longitude),
            self.radius.unwrap_or(defaults.radius_meters as i64),
        )
    }
}
