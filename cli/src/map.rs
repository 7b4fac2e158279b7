use anyhow::{Context, Result};
use doctor_core::{HospitalRecord, SearchQuery};
use serde::Serialize;
use std::fs;
use std::path::Path;

pub const DEFAULT_MAP_FILE: &str = "hospitals_map.html";

/// Marker data handed to the page script
#[derive(Serialize)]
struct Marker {
    lat: f64,
    lon: f64,
    tooltip: String,
    popup: String,
    hospital: bool,
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn popup_html(hospital: &HospitalRecord) -> String {
    format!(
        "<b>{}</b><br>Phone: {}<br>Address: {}",
        escape_html(&hospital.name),
        escape_html(&hospital.phone),
        escape_html(&hospital.address)
    )
}

/// Self-contained Leaflet page: one marker for the search center, one per hospital
pub fn render_map_html(center: &SearchQuery, hospitals: &[HospitalRecord]) -> Result<String> {
    let mut markers = vec![Marker {
        lat: center.latitude,
        lon: center.longitude,
        tooltip: "Your Location".to_string(),
        popup: "Your Location".to_string(),
        hospital: false,
    }];
    markers.extend(hospitals.iter().map(|h| Marker {
        lat: h.latitude,
        lon: h.longitude,
        tooltip: escape_html(&h.name),
        popup: popup_html(h),
        hospital: true,
    }));

    // "</" would end the script element early
    let markers_json = serde_json::to_string(&markers)
        .context("Failed to serialize map markers")?
        .replace("</", "<\\/");

    Ok(format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>Nearby Hospitals</title>
<link rel="stylesheet" href="https://unpkg.com/leaflet@1.9.4/dist/leaflet.css">
<script src="https://unpkg.com/leaflet@1.9.4/dist/leaflet.js"></script>
<style>html, body, #map {{ height: 100%; margin: 0; }}</style>
</head>
<body>
<div id="map"></div>
<script>
var map = L.map('map').setView([{lat}, {lon}], 13);
L.tileLayer('https://{{s}}.tile.openstreetmap.org/{{z}}/{{x}}/{{y}}.png', {{
  attribution: '&copy; OpenStreetMap contributors'
}}).addTo(map);
var hospitalIcon = L.divIcon({{ className: '', html: '<div style="color:#d33;font-size:22px;font-weight:bold">+</div>' }});
var markers = {markers};
markers.forEach(function (m) {{
  var options = m.hospital ? {{ icon: hospitalIcon }} : {{}};
  L.marker([m.lat, m.lon], options).bindPopup(m.popup).bindTooltip(m.tooltip).addTo(map);
}});
</script>
</body>
</html>
"#,
        lat = center.latitude,
        lon = center.longitude,
        markers = markers_json,
    ))
}

/// Writes the map page to `path`
pub fn write_map(path: &Path, center: &SearchQuery, hospitals: &[HospitalRecord]) -> Result<()> {
    let html = render_map_html(center, hospitals)?;
    fs::write(path, html).with_context(|| format!("Failed to write map to {}", path.display()))?;
    Ok(())
}
