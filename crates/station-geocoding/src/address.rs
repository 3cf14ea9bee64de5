//! Curated address model and the split of raw geocoder responses into it

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use nominatim_client::RawLocation;

use crate::error::RebundleError;

macro_rules! address_fields {
    ($($field:ident),+ $(,)?) => {
        /// Address fields the improver and formatter work with
        ///
        /// Declared in canonical order, which serialization preserves.
        #[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
        pub struct Address {
            $(
                #[serde(default, skip_serializing_if = "Option::is_none")]
                pub $field: Option<String>,
            )+
        }

        /// Canonical allow-list of address fields, in order
        pub const ADDRESS_FIELDS: &[&str] = &[$(stringify!($field)),+];

        impl Address {
            /// Look up a field by its Nominatim name
            pub fn get(&self, name: &str) -> Option<&str> {
                match name {
                    $(stringify!($field) => self.$field.as_deref(),)+
                    _ => None,
                }
            }

            fn slot_mut(&mut self, name: &str) -> Option<&mut Option<String>> {
                match name {
                    $(stringify!($field) => Some(&mut self.$field),)+
                    _ => None,
                }
            }
        }
    };
}

address_fields!(
    continent,
    country_code,
    country,
    state,
    state_district,
    county,
    postcode,
    post_box,
    city,
    town,
    village,
    city_district,
    suburb,
    residential,
    road,
    pedestrian,
    cycleway,
    footway,
    path,
    house_number,
    administrative,
    region,
    neighbourhood,
    industrial,
    common,
    address26,
    address29,
);

impl Address {
    /// Set a known field, returns `false` for names outside the allow-list
    pub fn set(&mut self, name: &str, value: impl Into<String>) -> bool {
        match self.slot_mut(name) {
            Some(slot) => {
                *slot = Some(value.into());
                true
            }
            None => false,
        }
    }

    pub fn is_empty(&self) -> bool {
        ADDRESS_FIELDS.iter().all(|name| self.get(name).is_none())
    }

    /// Present fields in canonical order
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> + '_ {
        ADDRESS_FIELDS
            .iter()
            .filter_map(|&name| self.get(name).map(|value| (name, value)))
    }
}

/// A reverse geocoding result split into curated and extra address fields
///
/// Top-level response fields such as `display_name`, `osm_id` or
/// `boundingbox` are kept verbatim in `meta`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    #[serde(flatten)]
    pub meta: Map<String, Value>,
    #[serde(default)]
    pub address: Address,
    #[serde(default)]
    pub address_more: Map<String, Value>,
}

/// Partition a raw response into a [`Location`]
///
/// Allow-listed string fields move into `address`; everything else from the
/// raw `address` object lands in `address_more` untouched.
pub fn rebundle(raw: RawLocation) -> Result<Location, RebundleError> {
    let mut meta = raw;
    let mut pool = match meta.remove("address") {
        Some(Value::Object(address)) => address,
        Some(other) => {
            return Err(RebundleError::MalformedResponse(format!(
                "expected address object, got {}",
                other
            )))
        }
        None => {
            return Err(RebundleError::MalformedResponse(
                "missing address object".to_string(),
            ))
        }
    };

    let mut address = Address::default();
    for &name in ADDRESS_FIELDS {
        if !matches!(pool.get(name), Some(Value::String(_))) {
            continue;
        }
        if let Some(Value::String(value)) = pool.remove(name) {
            address.set(name, value);
        }
    }

    Ok(Location {
        meta,
        address,
        address_more: pool,
    })
}
