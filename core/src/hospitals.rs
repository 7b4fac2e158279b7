//! Nearby-hospital lookup against the Overpass (OpenStreetMap) API.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, info};

use crate::config::DoctorConfig;
use crate::errors::{DoctorError, DoctorResult};

pub const MIN_RADIUS_METERS: u32 = 1000;
pub const MAX_RADIUS_METERS: u32 = 10_000;
pub const DEFAULT_RADIUS_METERS: u32 = 5000;

pub const DEFAULT_PHONE: &str = "N/A";
pub const DEFAULT_ADDRESS: &str = "Address not available";

/// Where to search and how far out
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchQuery {
    pub latitude: f64,
    pub longitude: f64,
    pub radius_meters: u32,
}

impl SearchQuery {
    /// The radius is clamped into `[MIN_RADIUS_METERS, MAX_RADIUS_METERS]`
    pub fn new(latitude: f64, longitude: f64, radius_meters: i64) -> Self {
        let clamped = radius_meters.clamp(MIN_RADIUS_METERS as i64, MAX_RADIUS_METERS as i64);
        if clamped != radius_meters {
            debug!(requested = radius_meters, used = clamped, "Clamped search radius");
        }
        Self {
            latitude,
            longitude,
            radius_meters: clamped as u32,
        }
    }

    /// Search around the configured default location
    pub fn from_config(config: &DoctorConfig) -> Self {
        Self::new(
            config.default_latitude.unwrap_or(37.7749),
            config.default_longitude.unwrap_or(-122.4194),
            config.default_radius_meters.unwrap_or(DEFAULT_RADIUS_METERS) as i64,
        )
    }

    pub fn has_valid_coordinates(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// A named hospital with its location
#[derive(Debug, Clone, PartialEq)]
pub struct HospitalRecord {
    pub name: String,
    pub phone: String,
    pub latitude: f64,
    pub longitude: f64,
    pub address: String,
}

impl HospitalRecord {
    pub fn has_phone(&self) -> bool {
        self.phone != DEFAULT_PHONE
    }
}

/// Raw Overpass response
#[derive(Debug, Deserialize)]
pub struct OverpassResponse {
    #[serde(default)]
    pub elements: Vec<OverpassElement>,
}

#[derive(Debug, Deserialize)]
pub struct OverpassElement {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    #[serde(default)]
    pub tags: HashMap<String, String>,
}

/// Source of hospital records
#[async_trait]
pub trait HospitalFinder: Send + Sync {
    /// `Ok(vec![])` means the search succeeded and found nothing
    async fn search(&self, query: &SearchQuery) -> DoctorResult<Vec<HospitalRecord>>;
}

/// Overpass QL selecting hospital nodes within the radius of the point
pub fn build_overpass_query(query: &SearchQuery) -> String {
    format!(
        "[out:json];\nnode[\"amenity\"=\"hospital\"](around:{},{},{});\nout body;",
        query.radius_meters, query.latitude, query.longitude
    )
}

/// Normalizes Overpass elements. Unnamed elements are dropped, as are elements without coordinates.
pub fn parse_hospitals(response: OverpassResponse) -> Vec<HospitalRecord> {
    response
        .elements
        .into_iter()
        .filter_map(|mut element| {
            let name = element.tags.remove("name")?;
            let (latitude, longitude) = (element.lat?, element.lon?);
            Some(HospitalRecord {
                name,
                phone: element
                    .tags
                    .remove("phone")
                    .unwrap_or_else(|| DEFAULT_PHONE.to_string()),
                latitude,
                longitude,
                address: element
                    .tags
                    .remove("addr:full")
                    .unwrap_or_else(|| DEFAULT_ADDRESS.to_string()),
            })
        })
        .collect()
}

/// Hospital finder backed by the public Overpass interpreter
#[derive(Debug, Clone)]
pub struct OverpassClient {
    client: Client,
    url: String,
}

impl OverpassClient {
    pub fn new(config: &DoctorConfig) -> DoctorResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| DoctorError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: config.overpass_url().to_string(),
        })
    }
}

#[async_trait]
impl HospitalFinder for OverpassClient {
    async fn search(&self, query: &SearchQuery) -> DoctorResult<Vec<HospitalRecord>> {
        let overpass_query = build_overpass_query(query);
        info!(
            lat = query.latitude,
            lon = query.longitude,
            radius = query.radius_meters,
            "Searching for hospitals"
        );

        let response = self
            .client
            .post(&self.url)
            .form(&[("data", overpass_query.as_str())])
            .send()
            .await
            .map_err(|e| DoctorError::RequestError(format!("Failed to send request: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(DoctorError::HttpError {
                status_code: status.as_u16(),
                message: format!("Overpass request failed: {}", message.trim()),
            });
        }

        let body = response
            .json::<OverpassResponse>()
            .await
            .map_err(|e| {
                DoctorError::ParsingError(format!("Failed to parse hospital data: {}", e))
            })?;

        let hospitals = parse_hospitals(body);
        debug!(count = hospitals.len(), "Parsed hospitals");
        Ok(hospitals)
    }
}
