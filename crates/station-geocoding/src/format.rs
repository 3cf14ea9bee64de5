//! Single-line display labels for improved addresses

use std::sync::LazyLock;

use regex::Regex;

use crate::address::{Address, Location};
use crate::improve::UNKNOWN;

/// Administrative boilerplate removed from the noisy fields.
/// "Bezirksteil" has to go before "Bezirk".
const NOISE_WORDS: [&str; 7] = [
    "Landkreis",
    "Kreis",
    "Verwaltungsgemeinschaft",
    "Stadtbezirk",
    "Bezirksteil",
    "Bezirk",
    "KG",
];

const NOISY_FIELDS: [&str; 3] = ["county", "city_district", "suburb"];

/// Label components in output order, each with its candidate fields
const COMPONENTS: [&[&str]; 7] = [
    &["road"],
    &["suburb"],
    &["city_district"],
    &["city", "town", "village"],
    &["county"],
    &["state"],
    &["country_code"],
];

static LEADING_DIGITS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+").unwrap());

/// Reduce a location to a label like "Ulmer Straße, Wangen, Stuttgart, Baden-Württemberg, DE"
///
/// Works on a copy of the address, so calling it repeatedly yields the same
/// result. Adjacent duplicates, the `unknown` placeholder and values starting
/// with a digit are left out.
pub fn format_address(location: &Location) -> String {
    let address = strip_noise(&location.address);

    let mut parts: Vec<&str> = Vec::with_capacity(COMPONENTS.len());
    for candidates in COMPONENTS {
        let Some(value) = candidates.iter().find_map(|&name| address.get(name)) else {
            continue;
        };
        let value = value.trim();

        if value.is_empty()
            || value == UNKNOWN
            || parts.last() == Some(&value)
            || LEADING_DIGITS.is_match(value)
        {
            continue;
        }
        parts.push(value);
    }

    parts.join(", ")
}

fn strip_noise(address: &Address) -> Address {
    let mut address = address.clone();
    for field in NOISY_FIELDS {
        let Some(value) = address.get(field) else {
            continue;
        };
        let cleaned = NOISE_WORDS
            .iter()
            .fold(value.to_string(), |acc, word| acc.replace(word, ""))
            .trim()
            .to_string();
        address.set(field, cleaned);
    }
    address
}
