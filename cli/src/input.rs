use anyhow::{Context, Result};
use dialoguer::{Input, Password, Select, theme::ColorfulTheme};
use doctor_core::{AVAILABLE_MODELS, SearchQuery, normalize_model_name};

/// Masked prompt for the API key. An empty answer is allowed; sending will then be refused.
pub fn prompt_api_key() -> Result<String> {
    Password::with_theme(&ColorfulTheme::default())
        .with_prompt("Enter your Gemini API Key")
        .allow_empty_password(true)
        .interact()
        .context("Failed to read API key")
}

/// Picker over the fixed model list, preselecting `current` when it is one of them
pub fn select_model(current: &str) -> Result<String> {
    let selected = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("Select Gemini Model")
        .items(&AVAILABLE_MODELS)
        .default(model_index(current))
        .interact()
        .context("Failed to read model selection")?;
    Ok(AVAILABLE_MODELS[selected].to_string())
}

fn model_index(model: &str) -> usize {
    let model = normalize_model_name(model);
    AVAILABLE_MODELS.iter().position(|m| *m == model).unwrap_or(0)
}

/// Asks for latitude, longitude and radius, offering `defaults`
pub fn prompt_search_query(defaults: &SearchQuery) -> Result<SearchQuery> {
    let theme = ColorfulTheme::default();
    let latitude: f64 = Input::with_theme(&theme)
        .with_prompt("Latitude")
        .default(defaults.latitude)
        .interact_text()
        .context("Failed to read latitude")?;
    let longitude: f64 = Input::with_theme(&theme)
        .with_prompt("Longitude")
        .default(defaults.longitude)
        .interact_text()
        .context("Failed to read longitude")?;
    let radius: i64 = Input::with_theme(&theme)
        .with_prompt("Search Radius (meters, 1000-10000)")
        .default(defaults.radius_meters as i64)
        .interact_text()
        .context("Failed to read radius")?;
    Ok(SearchQuery::new(latitude, longitude, radius))
}

/// Parses `/hospitals` arguments: nothing, `lat lon`, or `lat lon radius`.
/// Missing values come from `defaults`.
pub fn parse_search_args(args: &str, defaults: &SearchQuery) -> Result<SearchQuery, String> {
    let parts: Vec<&str> = args.split_whitespace().collect();
    let number = |s: &str, what: &str| -> Result<f64, String> {
        s.parse::<f64>().map_err(|_| format!("Invalid {}: {}", what, s))
    };

    match parts.as_slice() {
        [] => Ok(*defaults),
        [lat, lon] => Ok(SearchQuery::new(
            number(*lat, "latitude")?,
            number(*lon, "longitude")?,
            defaults.radius_meters as i64,
        )),
        [lat, lon, radius] => Ok(SearchQuery::new(
            number(*lat, "latitude")?,
            number(*lon, "longitude")?,
            number(*radius, "radius")?.round() as i64,
        )),
        _ => Err("Usage: /hospitals [lat lon [radius]]".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> SearchQuery {
        SearchQuery::new(37.7749, -122.4194, 5000)
    }

    #[test]
    fn test_parse_no_args_uses_defaults() {
        assert_eq!(parse_search_args("  ", &defaults()), Ok(defaults()));
    }

    #[test]
    fn test_parse_coordinates_only() {
        let query = parse_search_args("40.7128 -74.0060", &defaults()).unwrap();
        assert_eq!(query, SearchQuery::new(40.7128, -74.006, 5000));
    }

    #[test]
    fn test_parse_radius_is_clamped() {
        let query = parse_search_args("40.7128 -74.0060 25000", &defaults()).unwrap();
        assert_eq!(query.radius_meters, 10_000);
        let query = parse_search_args("40.7128 -74.0060 12", &defaults()).unwrap();
        assert_eq!(query.radius_meters, 1000);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            parse_search_args("north 12", &defaults()),
            Err("Invalid latitude: north".to_string())
        );
        assert!(parse_search_args("1", &defaults()).is_err());
        assert!(parse_search_args("1 2 3 4", &defaults()).is_err());
    }

    #[test]
    fn test_model_index() {
        assert_eq!(model_index("gemini-1.5-pro"), 1);
        assert_eq!(model_index("models/gemini-1.5-flash"), 2);
        assert_eq!(model_index("something-else"), 0);
    }
}
