//! Routes a conversation to the agent best suited to answer it.
use std::fmt;

use anyhow::{Error, Result, anyhow};
use serde_json::json;

use super::locations::{Route, extract_route};
use crate::ai::chat::ChatBuilder;
use crate::ai::prompt::{self, Prompt};
use crate::ai::tools::WeatherTool;
use crate::core::AppConfig;
use crate::openai::{BoxedToolCall, Message, Role};
use crate::weather::weather_markdown;

const FLIGHT_KEYWORDS: &[&str] = &[
    "flight", "fly", "ticket", "airline", "airport", "depart", "arrive",
];
const LODGING_KEYWORDS: &[&str] = &[
    "hotel",
    "lodging",
    "accommodation",
    "stay",
    "inn",
    "motel",
    "hostel",
    "bnb",
    "room",
];

// Fillers inserted between two messages from the same role
const ASSISTANT_FILLER: &str = "I'm processing your request...";
const USER_FILLER: &str = "...";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Agent {
    Flight,
    Lodging,
    General,
}

impl fmt::Display for Agent {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Agent::Flight => "flight_agent",
            Agent::Lodging => "lodging_agent",
            Agent::General => "general_agent",
        };
        write!(f, "{}", name)
    }
}

impl Agent {
    /// Pick an agent from the text of the latest user message. Flight
    /// requests take priority over lodging.
    pub fn route(text: &str) -> Self {
        let text = text.to_lowercase();
        if FLIGHT_KEYWORDS.iter().any(|k| text.contains(k)) {
            Agent::Flight
        } else if LODGING_KEYWORDS.iter().any(|k| text.contains(k)) {
            Agent::Lodging
        } else {
            Agent::General
        }
    }

    fn prompt(&self) -> Prompt {
        match self {
            Agent::Flight => Prompt::FlightAgent,
            Agent::Lodging => Prompt::LodgingAgent,
            Agent::General => Prompt::GeneralAgent,
        }
    }

    fn system_message(&self, config: &AppConfig) -> Result<Message, Error> {
        let content = prompt::render(
            self.prompt(),
            &json!({"system_message": config.system_message}),
        )?;
        Ok(Message::new(Role::System, &content))
    }

    fn tools(&self, config: &AppConfig) -> Option<Vec<BoxedToolCall>> {
        match self {
            Agent::Flight | Agent::Lodging => {
                let weather_tool = WeatherTool::new(
                    &config.openweather_api_url,
                    config.openweather_api_key.as_deref(),
                );
                Some(vec![Box::new(weather_tool) as BoxedToolCall])
            }
            Agent::General => None,
        }
    }
}

/// Make sure user and assistant messages alternate by inserting a
/// filler message between two consecutive messages with the same
/// role. Some models reject transcripts that don't alternate.
pub fn enforce_role_alternation(messages: Vec<Message>) -> Vec<Message> {
    let mut fixed: Vec<Message> = Vec::with_capacity(messages.len());
    for msg in messages.into_iter() {
        if let Some(prev) = fixed.last()
            && prev.role == msg.role
        {
            match msg.role {
                Role::User => fixed.push(Message::new(Role::Assistant, ASSISTANT_FILLER)),
                Role::Assistant => fixed.push(Message::new(Role::User, USER_FILLER)),
                _ => {}
            }
        }
        fixed.push(msg);
    }
    fixed
}

async fn route_weather(config: &AppConfig, route: &Route) -> String {
    let api_url = &config.openweather_api_url;
    let api_key = config.openweather_api_key.as_deref();
    let (origin, destination) = tokio::join!(
        weather_markdown(api_url, api_key, &route.origin),
        weather_markdown(api_url, api_key, &route.destination),
    );
    format!("---\n{}\n\n{}\n---", origin, destination)
}

/// Answer the conversation in `history`, which must end with the
/// user's latest message. Returns the assistant's Markdown reply.
pub async fn respond(config: &AppConfig, history: &[Message]) -> Result<String, Error> {
    let mut transcript = enforce_role_alternation(history.to_vec());
    let last = transcript
        .pop()
        .filter(|m| m.role == Role::User)
        .ok_or(anyhow!("Conversation must end with a user message"))?;

    let agent = Agent::route(last.text());
    tracing::info!("Invoking {} for this query", agent);

    let mut messages = vec![agent.system_message(config)?];
    messages.extend(transcript);

    let mut builder = ChatBuilder::new(
        &config.openai_api_hostname,
        &config.openai_api_key,
        &config.openai_model,
    )
    .transcript(messages);
    if let Some(tools) = agent.tools(config) {
        builder = builder.tools(tools);
    }
    let mut chat = builder.build();

    let route = match agent {
        Agent::Flight => extract_route(last.text()),
        _ => None,
    };

    let reply = chat
        .next_msg(last)
        .await?
        .last()
        .map(|m| m.text().to_string())
        .ok_or(anyhow!("{} returned no messages", agent))?;

    match route {
        Some(route) => {
            tracing::debug!("Adding weather for {} -> {}", route.origin, route.destination);
            let weather = route_weather(config, &route).await;
            Ok(format!("{}\n\n{}", weather, reply))
        }
        None => Ok(reply),
    }
}
