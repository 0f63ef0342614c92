use anyhow::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::ai::agents::locations::city_name;
use crate::openai::{Function, Parameters, Property, ToolCall, ToolType};
use crate::weather::weather_markdown;

#[derive(Serialize)]
pub struct WeatherProps {
    pub city: Property,
}

#[derive(Deserialize)]
pub struct WeatherArgs {
    pub city: String,
}

#[derive(Serialize)]
pub struct WeatherTool {
    pub r#type: ToolType,
    pub function: Function<WeatherProps>,
    #[serde(skip)]
    api_url: String,
    #[serde(skip)]
    api_key: Option<String>,
}

#[async_trait]
impl ToolCall for WeatherTool {
    async fn call(&self, args: &str) -> Result<String, Error> {
        let fn_args: WeatherArgs = serde_json::from_str(args)?;
        let city = city_name(&fn_args.city);
        Ok(weather_markdown(&self.api_url, self.api_key.as_deref(), &city).await)
    }

    fn function_name(&self) -> String {
        self.function.name.clone()
    }
}

impl WeatherTool {
    pub fn new(api_url: &str, api_key: Option<&str>) -> Self {
        let function = Function {
            name: String::from("get_weather"),
            description: String::from(
                "Get the current weather for a city. Use it for departure and destination cities when planning a trip.",
            ),
            parameters: Parameters {
                r#type: String::from("object"),
                properties: WeatherProps {
                    city: Property {
                        r#type: String::from("string"),
                        description: String::from(
                            "City name or airport code, e.g. \"Boston\" or \"SFO\".",
                        ),
                    },
                },
                required: vec![String::from("city")],
                additional_properties: false,
            },
            strict: true,
        };

        Self {
            r#type: ToolType::Function,
            function,
            api_url: api_url.to_string(),
            api_key: api_key.map(String::from),
        }
    }
}
