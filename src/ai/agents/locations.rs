//! Resolving the places mentioned in a travel request.
use std::sync::LazyLock;

use regex::Regex;

const AIRPORT_TO_CITY: &[(&str, &str)] = &[
    ("SFO", "San Francisco"),
    ("LAX", "Los Angeles"),
    ("JFK", "New York"),
    ("LGA", "New York"),
    ("EWR", "Newark"),
    ("ORD", "Chicago"),
    ("DFW", "Dallas"),
    ("ATL", "Atlanta"),
    ("MIA", "Miami"),
    ("SEA", "Seattle"),
    ("DEN", "Denver"),
    ("LAS", "Las Vegas"),
    ("PHX", "Phoenix"),
    ("BOS", "Boston"),
    ("IAD", "Washington"),
    ("DCA", "Washington"),
    ("SJC", "San Jose"),
    ("OAK", "Oakland"),
    ("PDX", "Portland"),
    ("SAN", "San Diego"),
];

// "from <origin> to <destination>" where each place ends at a word
// that usually starts the rest of the sentence (dates, qualifiers) or
// at punctuation
static ROUTE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\bfrom\s+([a-z][a-z .'-]*?)\s+to\s+([a-z][a-z .'-]*?)(?:\s+(?:on|in|for|next|this|leaving|departing|returning|around|between|during|with|and|at|by)\b|\s*[,.?!;]|\s*$)",
    )
    .expect("Invalid route regex")
});

/// Convert an airport code to its city name. Anything that isn't a
/// known code is returned trimmed but otherwise unchanged.
pub fn city_name(location: &str) -> String {
    let trimmed = location.trim();
    let code = trimmed.to_uppercase();
    AIRPORT_TO_CITY
        .iter()
        .find(|(airport, _)| *airport == code)
        .map(|(_, city)| city.to_string())
        .unwrap_or_else(|| trimmed.to_string())
}

/// A trip's origin and destination as city names.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub origin: String,
    pub destination: String,
}

/// Find a "from X to Y" route in free text.
pub fn extract_route(text: &str) -> Option<Route> {
    let caps = ROUTE_RE.captures(text)?;
    let origin = caps.get(1)?.as_str().trim();
    let destination = caps.get(2)?.as_str().trim();
    if origin.is_empty() || destination.is_empty() {
        return None;
    }
    Some(Route {
        origin: city_name(origin),
        destination: city_name(destination),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_city_name() {
        assert_eq!(city_name("sfo"), "San Francisco");
        assert_eq!(city_name(" BOS "), "Boston");
        assert_eq!(city_name("Toronto"), "Toronto");
    }

    #[test]
    fn test_extract_route_with_codes() {
        let route = extract_route("Find me a flight from SFO to LAX").unwrap();
        assert_eq!(route.origin, "San Francisco");
        assert_eq!(route.destination, "Los Angeles");
    }

    #[test]
    fn test_extract_route_stops_at_dates() {
        let route =
            extract_route("I need to fly from boston to san diego on March 3 with a wheelchair")
                .unwrap();
        assert_eq!(route.origin, "boston");
        assert_eq!(route.destination, "san diego");
    }

    #[test]
    fn test_extract_route_with_punctuation() {
        let route = extract_route("Flights from New York to Chicago?").unwrap();
        assert_eq!(route.origin, "New York");
        assert_eq!(route.destination, "Chicago");
    }

    #[test]
    fn test_extract_route_missing() {
        assert!(extract_route("I want to fly somewhere warm").is_none());
        assert!(extract_route("Book a hotel in Denver").is_none());
    }
}
