//! OpenWeatherMap current weather client
use std::time::Duration;

use anyhow::{Error, Result, anyhow};
use reqwest::StatusCode;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct WeatherCondition {
    description: String,
}

#[derive(Debug, Deserialize)]
struct MainReadings {
    temp: f64,
    feels_like: f64,
    humidity: f64,
}

#[derive(Debug, Deserialize)]
struct Wind {
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct CurrentWeatherResponse {
    weather: Vec<WeatherCondition>,
    main: MainReadings,
    wind: Wind,
}

/// Current conditions for a city in metric units.
#[derive(Debug, Clone, PartialEq)]
pub struct Weather {
    pub city: String,
    pub description: String,
    pub temp: f64,
    pub feels_like: f64,
    pub humidity: f64,
    pub wind_speed: f64,
}

impl Weather {
    pub fn to_markdown(&self) -> String {
        format!(
            "**Weather in {}**: {}, {}°C (feels like {}°C), Humidity: {}%, Wind: {} m/s",
            title_case(&self.city),
            capitalize(&self.description),
            self.temp,
            self.feels_like,
            self.humidity,
            self.wind_speed
        )
    }
}

/// Returned when the API answers but doesn't know the city.
#[derive(Debug)]
pub struct CityNotFound(pub String);

impl std::fmt::Display for CityNotFound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Weather for {}: Not found.", self.0)
    }
}

impl std::error::Error for CityNotFound {}

pub async fn current_weather(api_url: &str, api_key: &str, city: &str) -> Result<Weather, Error> {
    let mut url = reqwest::Url::parse(&format!(
        "{}/data/2.5/weather",
        api_url.trim_end_matches('/')
    ))?;
    url.query_pairs_mut()
        .append_pair("q", city)
        .append_pair("appid", api_key)
        .append_pair("units", "metric");

    let resp = reqwest::Client::new()
        .get(url)
        .timeout(Duration::from_secs(5))
        .send()
        .await?;

    if resp.status() != StatusCode::OK {
        tracing::warn!("Weather lookup for {} returned {}", city, resp.status());
        return Err(CityNotFound(city.to_string()).into());
    }

    let data: CurrentWeatherResponse = resp.json().await?;
    let description = data
        .weather
        .first()
        .map(|w| w.description.clone())
        .ok_or(anyhow!("Weather response for {} has no conditions", city))?;

    Ok(Weather {
        city: city.to_string(),
        description,
        temp: data.main.temp,
        feels_like: data.main.feels_like,
        humidity: data.main.humidity,
        wind_speed: data.wind.speed,
    })
}

/// Markdown summary of the current weather that never fails. Lookup
/// problems are reported inline so they can be shown to the user.
pub async fn weather_markdown(api_url: &str, api_key: Option<&str>, city: &str) -> String {
    let Some(api_key) = api_key else {
        return String::from("Weather API key not set.");
    };

    match current_weather(api_url, api_key, city).await {
        Ok(weather) => weather.to_markdown(),
        Err(e) if e.is::<CityNotFound>() => e.to_string(),
        Err(e) => {
            tracing::error!("Weather lookup for {} failed: {}", city, e);
            format!("Weather for {}: Error fetching data.", city)
        }
    }
}

fn capitalize(s: &str) -> String {
    let lower = s.to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

// Every letter that follows a non-letter starts a word, so hyphenated
// names and names with apostrophes are capitalized too
fn title_case(s: &str) -> String {
    let mut prev_is_letter = false;
    s.chars()
        .flat_map(|c| {
            let out: Vec<char> = if prev_is_letter {
                c.to_lowercase().collect()
            } else {
                c.to_uppercase().collect()
            };
            prev_is_letter = c.is_alphabetic();
            out
        })
        .collect()
}
