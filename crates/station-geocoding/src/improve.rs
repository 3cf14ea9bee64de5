//! Heuristic corrections for reverse geocoding results
//!
//! Nominatim addresses are not schema-stable across countries. The passes in
//! [`ImproveRules::apply`] resolve the synonyms to a small vocabulary (`city`,
//! `suburb`, `road`, `state`, `country`) using fixed fallback chains plus a
//! few lookup tables for known upstream anomalies. Pass order matters, later
//! passes read fields set by earlier ones.

use std::collections::HashMap;

use tracing::trace;

use crate::address::{Address, Location};

/// Placeholder for `city` and `road` when nothing better is known.
/// The formatter never renders it.
pub const UNKNOWN: &str = "unknown";

const CITY_FALLBACKS: [&str; 6] = [
    "village",
    "town",
    "county",
    "suburb",
    "city_district",
    "state",
];

const SUBURB_FALLBACKS: [&str; 2] = ["residential", "neighbourhood"];

const ROAD_FALLBACKS: [&str; 6] = [
    "path",
    "pedestrian",
    "cycleway",
    "footway",
    "neighbourhood",
    "house_number",
];

/// Lookup tables used by the improver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImproveRules {
    /// Places that are both city and state
    pub city_states: Vec<String>,
    /// Country names forced per upper-case country code
    pub country_names: HashMap<String, String>,
    /// Literal replacements for known-bad city names
    pub city_names: HashMap<String, String>,
}

impl Default for ImproveRules {
    fn default() -> Self {
        Self {
            city_states: ["Berlin", "Bremen", "Hamburg", "Wien"]
                .into_iter()
                .map(String::from)
                .collect(),
            country_names: HashMap::from([
                ("DO".to_string(), "Dominican Republic".to_string()),
                ("PL".to_string(), "Poland".to_string()),
            ]),
            city_names: HashMap::from([("Rgbg".to_string(), "Regensburg".to_string())]),
        }
    }
}

impl ImproveRules {
    /// Run all correction passes on an address, in place
    pub fn apply(&self, address: &mut Address) {
        // Country code
        if let Some(code) = address.country_code.as_mut() {
            *code = code.to_uppercase();
        }

        // Country name
        if let Some(name) = address
            .country_code
            .as_deref()
            .and_then(|code| self.country_names.get(code))
        {
            address.country = Some(name.clone());
        }

        // City-states get both fields set to the same name
        let city_state = [&address.city, &address.state]
            .into_iter()
            .flatten()
            .find(|name| self.city_states.contains(*name))
            .cloned();
        if let Some(name) = city_state {
            address.city = Some(name.clone());
            address.state = Some(name);
        }

        if address.city.is_none() {
            address.city = first_present(address, &CITY_FALLBACKS);
        }

        if let Some(patched) = address
            .city
            .as_deref()
            .and_then(|city| self.city_names.get(city))
        {
            address.city = Some(patched.clone());
        }

        if address.city.is_none() {
            address.city = Some(UNKNOWN.to_string());
        }

        if address.suburb.is_none() {
            address.suburb = first_present(address, &SUBURB_FALLBACKS);
        }

        if address.road.is_none() {
            address.road =
                first_present(address, &ROAD_FALLBACKS).or_else(|| Some(UNKNOWN.to_string()));
        }

        trace!(?address, "Improved address");
    }
}

fn first_present(address: &Address, candidates: &[&str]) -> Option<String> {
    candidates
        .iter()
        .find_map(|&name| address.get(name))
        .map(str::to_string)
}

/// Apply the correction passes to a location, doing nothing without one
pub fn improve_location(location: Option<&mut Location>, rules: &ImproveRules) {
    if let Some(location) = location {
        rules.apply(&mut location.address);
    }
}
