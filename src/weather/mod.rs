pub mod openweather;
pub use openweather::{CityNotFound, Weather, current_weather, weather_markdown};
