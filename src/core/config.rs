use std::env;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub storage_path: String,
    pub db_path: String,
    pub web_ui_path: String,
    pub openai_model: String,
    pub openai_api_hostname: String,
    pub openai_api_key: String,
    pub system_message: String,
    pub openweather_api_url: String,
    pub openweather_api_key: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        let storage_path = env::var("NAVIABLE_STORAGE_PATH").unwrap_or("./".to_string());
        let db_path = format!("{}/naviable.db", storage_path.trim_end_matches('/'));
        let web_ui_path =
            env::var("NAVIABLE_WEB_UI_PATH").unwrap_or_else(|_| "./web-ui/out".to_string());
        let openai_api_hostname = env::var("NAVIABLE_LLM_HOST")
            .unwrap_or_else(|_| "https://api.openai.com".to_string());
        let openai_api_key =
            env::var("OPENAI_API_KEY").unwrap_or_else(|_| "thiswontworkforopenai".to_string());
        let openai_model =
            env::var("NAVIABLE_LLM_MODEL").unwrap_or_else(|_| "gpt-4.1-mini".to_string());
        let system_message = env::var("NAVIABLE_SYSTEM_MESSAGE").unwrap_or_else(|_| {
            "You are NaviAble, a friendly travel assistant. Always assume the person asking may have a disability or need accessible accommodations. Format answers in Markdown.".to_string()
        });
        let openweather_api_url = env::var("NAVIABLE_WEATHER_API_URL")
            .unwrap_or_else(|_| "https://api.openweathermap.org".to_string());
        // An empty key is treated the same as a missing one
        let openweather_api_key = env::var("OPENWEATHER_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty());

        Self {
            storage_path,
            db_path,
            web_ui_path,
            openai_api_hostname,
            openai_api_key,
            openai_model,
            system_message,
            openweather_api_url,
            openweather_api_key,
        }
    }
}
