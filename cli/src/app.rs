use anyhow::{Context, Result};
use colored::*;
use doctor_core::{
    ChatSession, DoctorConfig, GeminiClient, HospitalFinder, HospitalRecord, SearchQuery,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::input::{parse_search_args, prompt_api_key, prompt_search_query, select_model};
use crate::logging::log_error;
use crate::map::{DEFAULT_MAP_FILE, write_map};
use crate::output::{
    print_conversation, print_disclaimer, print_hospital_list, print_models, print_turn,
    print_usage_instructions,
};

pub type DoctorSession = ChatSession<GeminiClient>;

/// Result of one hospital search, as shown to the user
#[derive(Debug, PartialEq)]
pub enum SearchOutcome {
    Found(Vec<HospitalRecord>),
    NoneFound,
    InvalidLocation,
    Failed(String),
}

fn spinner(message: &'static str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
            .template("{spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner
}

/// Builds the session and configures it when a non-empty key is available
pub fn build_session(config: &DoctorConfig, api_key: Option<&str>) -> Result<DoctorSession> {
    let mut session = DoctorSession::new(config.model_name(), config.context_policy());
    if let Some(key) = api_key.filter(|k| !k.trim().is_empty()) {
        let client = GeminiClient::new(key, config).context("Failed to create Gemini client")?;
        session.configure(client);
    }
    Ok(session)
}

/// Sends one message and prints the reply (or the validation error)
async fn send_and_print(session: &mut DoctorSession, text: &str) {
    let spinner = spinner("Consulting the AI doctor...");
    let result = session.send(text).await;
    spinner.finish_and_clear();

    match result {
        Ok(reply) => print_turn(reply),
        Err(e) => log_error(&e.to_string()),
    }
}

/// Runs a single query mode, sending one symptom description and displaying the response
pub async fn run_single_query(session: &mut DoctorSession, prompt: &str) -> Result<()> {
    info!("Running single query");
    print_disclaimer();
    send_and_print(session, prompt).await;
    Ok(())
}

/// Searches for hospitals, keeping "nothing nearby" apart from "the search failed"
pub async fn find_hospitals<F: HospitalFinder + ?Sized>(
    finder: &F,
    query: &SearchQuery,
) -> SearchOutcome {
    if !query.has_valid_coordinates() {
        return SearchOutcome::InvalidLocation;
    }

    match finder.search(query).await {
        Ok(hospitals) if hospitals.is_empty() => SearchOutcome::NoneFound,
        Ok(hospitals) => SearchOutcome::Found(hospitals),
        Err(e) => {
            warn!("Hospital search failed: {}", e);
            SearchOutcome::Failed(format!("Error fetching hospital data: {}", e))
        }
    }
}

/// Runs a hospital search, prints the list and optionally writes the map.
/// Returns the hospitals found (empty on failure).
pub async fn run_hospital_search<F: HospitalFinder + ?Sized>(
    finder: &F,
    query: &SearchQuery,
    map_out: Option<&Path>,
) -> Vec<HospitalRecord> {
    println!(
        "{} {:.6}, {:.6} within {} m",
        "Searching near".cyan(),
        query.latitude,
        query.longitude,
        query.radius_meters
    );

    let spinner = spinner("Searching for nearby hospitals...");
    let outcome = find_hospitals(finder, query).await;
    spinner.finish_and_clear();

    match outcome {
        SearchOutcome::Found(hospitals) => {
            print_hospital_list(&hospitals);
            if let Some(path) = map_out {
                save_map(path, query, &hospitals);
            }
            hospitals
        }
        SearchOutcome::NoneFound => {
            print_hospital_list(&[]);
            Vec::new()
        }
        SearchOutcome::InvalidLocation => {
            log_error("Please enter valid latitude and longitude.");
            Vec::new()
        }
        SearchOutcome::Failed(message) => {
            log_error(&message);
            Vec::new()
        }
    }
}

fn save_map(path: &Path, query: &SearchQuery, hospitals: &[HospitalRecord]) {
    match write_map(path, query, hospitals) {
        Ok(()) => println!("{} {}", "Map written to".green(), path.display()),
        Err(e) => log_error(&format!("{:#}", e)),
    }
}

/// Diagnostic listing of the models the API exposes
pub async fn run_list_models(client: &GeminiClient) {
    let spinner = spinner("Fetching available models...");
    let models = client.list_model_names().await;
    spinner.finish_and_clear();
    print_models(&models);
}

/// Everything the interactive loop needs besides the session
pub struct ChatContext<'a, F: HospitalFinder + ?Sized> {
    pub config: &'a DoctorConfig,
    pub finder: &'a F,
    pub search_defaults: SearchQuery,
    pub map_out: Option<PathBuf>,
    /// Sent as the first message once the session is set up
    pub opening_message: Option<String>,
}

/// Runs an interactive chat session
pub async fn run_interactive_chat<F: HospitalFinder + ?Sized>(
    session: &mut DoctorSession,
    ctx: ChatContext<'_, F>,
) -> Result<()> {
    println!("{}", "AI Doctor Assistant".bright_cyan().bold());
    println!("Describe your symptoms and get potential information about your condition.");
    println!();
    print_disclaimer();

    if !session.is_configured() {
        configure_key(session, ctx.config);
    }
    println!("{} {}", "Model:".cyan(), session.model_name());
    print_usage_instructions();

    if let Some(message) = ctx.opening_message.as_deref() {
        println!("{}: {}", "You".green().bold(), message);
        send_and_print(session, message).await;
        println!();
    }

    let mut last_search: Option<(SearchQuery, Vec<HospitalRecord>)> = None;

    loop {
        print!("{}: ", "You".green().bold());
        io::stdout().flush().context("Failed to flush stdout")?;

        let mut input = String::new();
        let read = io::stdin()
            .read_line(&mut input)
            .context("Failed to read input")?;
        if read == 0 {
            // EOF
            println!();
            break;
        }

        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            println!("Exiting chat session.");
            break;
        }

        let (command, rest) = match input.split_once(char::is_whitespace) {
            Some((command, rest)) => (command, rest.trim()),
            None => (input, ""),
        };

        match command {
            "/help" => print_usage_instructions(),
            "/disclaimer" => print_disclaimer(),
            "/history" => print_conversation(session.conversation().all()),
            "/clear" => {
                session.clear();
                println!("{}", "Started a new conversation.".yellow());
            }
            "/key" => configure_key(session, ctx.config),
            "/model" => {
                let choice = select_model(session.model_name());
                apply_model_choice(session, choice);
            }
            "/models" => match session.assistant() {
                Some(client) => run_list_models(client).await,
                None => log_error("Please enter your Gemini API Key first (/key)."),
            },
            "/hospitals" => {
                let query = if rest == "?" {
                    prompt_search_query(&ctx.search_defaults).map_err(|e| format!("{:#}", e))
                } else {
                    parse_search_args(rest, &ctx.search_defaults)
                };
                let query = match query {
                    Ok(query) => query,
                    Err(message) => {
                        log_error(&message);
                        continue;
                    }
                };
                let hospitals =
                    run_hospital_search(ctx.finder, &query, ctx.map_out.as_deref()).await;
                last_search = Some((query, hospitals));
            }
            "/map" => match &last_search {
                Some((query, hospitals)) if !hospitals.is_empty() => {
                    let path = if rest.is_empty() {
                        ctx.map_out.clone().unwrap_or_else(|| PathBuf::from(DEFAULT_MAP_FILE))
                    } else {
                        PathBuf::from(rest)
                    };
                    save_map(&path, query, hospitals);
                }
                _ => log_error("Run /hospitals first; there is nothing to map yet."),
            },
            _ if command.starts_with('/') => {
                log_error(&format!("Unknown command: {}", command));
            }
            _ => {
                debug!(session = %session.id(), "Sending message");
                send_and_print(session, input).await;
            }
        }

        println!(); // Add spacing between interactions
    }

    Ok(())
}

/// Prompts for an API key and installs a client built from it
fn configure_key(session: &mut DoctorSession, config: &DoctorConfig) {
    apply_key_input(session, config, prompt_api_key());
}

/// Installs the entered key. Prompt failures are reported and leave the session as it was.
fn apply_key_input(session: &mut DoctorSession, config: &DoctorConfig, input: Result<String>) {
    let key = match input {
        Ok(key) => key,
        Err(e) => {
            log_error(&format!("{:#}", e));
            return;
        }
    };
    if key.trim().is_empty() {
        println!(
            "{}",
            "No API key entered. Messages cannot be sent until you set one with /key.".yellow()
        );
        return;
    }
    match GeminiClient::new(&key, config) {
        Ok(client) => session.configure(client),
        Err(e) => log_error(&format!("Failed to create Gemini client: {}", e)),
    }
}

/// Switches to the picked model; a failed picker keeps the current one
pub fn apply_model_choice(session: &mut DoctorSession, choice: Result<String>) {
    match choice {
        Ok(model) => {
            session.set_model_name(model);
            println!("{} {}", "Model:".cyan(), session.model_name());
        }
        Err(e) => log_error(&format!("{:#}", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use doctor_core::{DoctorError, DoctorResult, Speaker};

    enum FakeFinder {
        Results(Vec<HospitalRecord>),
        Broken,
    }

    #[async_trait]
    impl HospitalFinder for FakeFinder {
        async fn search(&self, _query: &SearchQuery) -> DoctorResult<Vec<HospitalRecord>> {
            match self {
                FakeFinder::Results(hospitals) => Ok(hospitals.clone()),
                FakeFinder::Broken => Err(DoctorError::RequestError("timed out".to_string())),
            }
        }
    }

    fn general_hospital() -> HospitalRecord {
        HospitalRecord {
            name: "General Hospital".to_string(),
            phone: "555-1234".to_string(),
            latitude: 37.78,
            longitude: -122.41,
            address: "Address not available".to_string(),
        }
    }

    #[tokio::test]
    async fn test_find_hospitals_found() {
        let finder = FakeFinder::Results(vec![general_hospital()]);
        let query = SearchQuery::new(37.7749, -122.4194, 5000);
        assert_eq!(
            find_hospitals(&finder, &query).await,
            SearchOutcome::Found(vec![general_hospital()])
        );
    }

    #[tokio::test]
    async fn test_empty_result_distinct_from_failure() {
        let query = SearchQuery::new(37.7749, -122.4194, 5000);

        let empty = find_hospitals(&FakeFinder::Results(vec![]), &query).await;
        assert_eq!(empty, SearchOutcome::NoneFound);

        let failed = find_hospitals(&FakeFinder::Broken, &query).await;
        assert_eq!(
            failed,
            SearchOutcome::Failed(
                "Error fetching hospital data: Request Error: timed out".to_string()
            )
        );
    }

    #[tokio::test]
    async fn test_invalid_location_skips_search() {
        let query = SearchQuery::new(123.0, 0.0, 5000);
        assert_eq!(
            find_hospitals(&FakeFinder::Broken, &query).await,
            SearchOutcome::InvalidLocation
        );
    }

    #[tokio::test]
    async fn test_run_hospital_search_returns_records_and_writes_map() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("map.html");
        let finder = FakeFinder::Results(vec![general_hospital()]);
        let query = SearchQuery::new(37.7749, -122.4194, 5000);

        let hospitals = run_hospital_search(&finder, &query, Some(path.as_path())).await;
        assert_eq!(hospitals.len(), 1);
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_failed_search_yields_no_records() {
        let query = SearchQuery::new(37.7749, -122.4194, 5000);
        let hospitals = run_hospital_search(&FakeFinder::Broken, &query, None).await;
        assert!(hospitals.is_empty());
    }

    #[tokio::test]
    async fn test_send_without_key_makes_no_change() {
        let config = DoctorConfig::default();
        let mut session = build_session(&config, Some("  ")).unwrap();
        assert!(!session.is_configured());

        send_and_print(&mut session, "I have a rash").await;
        assert!(session.conversation().is_empty());
        assert_eq!(session.conversation().count(Speaker::User), 0);
    }

    #[test]
    fn test_failed_key_prompt_keeps_session() {
        let config = DoctorConfig::default();
        let mut session = build_session(&config, None).unwrap();

        apply_key_input(&mut session, &config, Err(anyhow::anyhow!("not a terminal")));
        assert!(!session.is_configured());

        apply_key_input(&mut session, &config, Ok("abc123".to_string()));
        assert!(session.is_configured());

        apply_key_input(&mut session, &config, Err(anyhow::anyhow!("not a terminal")));
        assert!(session.is_configured());
    }

    #[test]
    fn test_failed_model_picker_keeps_model() {
        let config = DoctorConfig::default();
        let mut session = build_session(&config, None).unwrap();
        let before = session.model_name().to_string();

        apply_model_choice(&mut session, Err(anyhow::anyhow!("not a terminal")));
        assert_eq!(session.model_name(), before);

        apply_model_choice(&mut session, Ok("gemini-1.5-pro".to_string()));
        assert_eq!(session.model_name(), "gemini-1.5-pro");
    }

    #[test]
    fn test_build_session_with_key() {
        let config = DoctorConfig::default();
        let session = build_session(&config, Some("abc123")).unwrap();
        assert!(session.is_configured());
        assert_eq!(session.model_name(), config.model_name());
    }
}
