//! Coordinate resolution for the offline calculator.
//!
//! Configured coordinates always win. Otherwise the configured city and
//! country are looked up in the bundled world-cities database.

use crate::config::Config;

/// Geographic position in degrees, east and north positive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Where a resolved position came from, for log output.
#[derive(Debug, Clone, PartialEq)]
pub enum CoordinateSource {
    Configured,
    CityDatabase { city: String, country: String },
}

/// Resolve the mosque position from configuration.
///
/// Returns `None` when neither coordinates nor a known city are available.
pub fn resolve_coordinates(config: &Config) -> Option<(Coordinates, CoordinateSource)> {
    if let (Some(latitude), Some(longitude)) = (config.latitude, config.longitude) {
        return Some((
            Coordinates {
                latitude,
                longitude,
            },
            CoordinateSource::Configured,
        ));
    }

    lookup_city(config.city(), config.country())
}

/// Find a city by name, preferring an exact country match.
///
/// Names are compared case-insensitively. When several cities share the name
/// and none matches the country, the first database entry is used.
pub fn lookup_city(city: &str, country: &str) -> Option<(Coordinates, CoordinateSource)> {
    let wanted_city = normalize(city);
    if wanted_city.is_empty() {
        return None;
    }
    let wanted_country = normalize(country);

    let mut first_match = None;
    for entry in cities::all() {
        if normalize(entry.city) != wanted_city {
            continue;
        }

        let found = (
            Coordinates {
                latitude: entry.latitude,
                longitude: entry.longitude,
            },
            CoordinateSource::CityDatabase {
                city: entry.city.to_string(),
                country: entry.country.to_string(),
            },
        );

        if normalize(entry.country) == wanted_country {
            return Some(found);
        }
        if first_match.is_none() {
            first_match = Some(found);
        }
    }

    first_match
}

fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configured_coordinates_win() {
        let config = Config {
            latitude: Some(21.4225),
            longitude: Some(39.8262),
            city: Some("Nowhere-At-All".to_string()),
            ..Config::default()
        };
        let (coords, source) = resolve_coordinates(&config).unwrap();
        assert_eq!(coords.latitude, 21.4225);
        assert_eq!(source, CoordinateSource::Configured);
    }

    #[test]
    fn test_unknown_city_resolves_to_none() {
        assert!(lookup_city("Definitely Not A City 123", "Atlantis").is_none());
        assert!(lookup_city("   ", "Saudi Arabia").is_none());
    }

    #[test]
    fn test_partial_coordinates_fall_through_to_city_lookup() {
        let config = Config {
            latitude: Some(10.0),
            longitude: None,
            city: Some("Definitely Not A City 123".to_string()),
            ..Config::default()
        };
        assert!(resolve_coordinates(&config).is_none());
    }
}
