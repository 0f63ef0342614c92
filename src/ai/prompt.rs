//! Reusable prompts using Handlebars for templating. Strict mode is
//! on so a missing variable is an error instead of an empty string.

use std::fmt;

use anyhow::{Error, Result};
use handlebars::Handlebars;
use serde::Serialize;

#[derive(Debug, Clone, Copy)]
pub enum Prompt {
    FlightAgent,
    LodgingAgent,
    GeneralAgent,
    ChatTitle,
}

impl fmt::Display for Prompt {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

const FLIGHT_AGENT_PROMPT: &str = r"
{{system_message}}

You are the flight agent. Find the best flights for a traveler who may need accessibility support.

If the departure city, destination, travel dates, accessibility needs, or budget are missing, ask for them in plain conversational Markdown. Never show raw JSON or function calls to the traveler.

For each option include:
- Airline and flight number
- Price and travel dates
- A direct booking link formatted as a Markdown link
- Wheelchair assistance, pre-boarding, and special assistance services
- Policies for mobility aids and medical equipment

Order options by accessibility first, then price, then duration. Use ✅ for available features, ❌ for unavailable ones, and ℹ️ for extra information. Use the get_weather tool when the traveler asks about conditions at either end of the trip.
";

const LODGING_AGENT_PROMPT: &str = r"
{{system_message}}

You are the lodging agent. Find accessible hotels and accommodations.

If the destination, dates, accessibility needs, or budget are missing, ask for them in plain conversational Markdown.

Recommend two or three places. For each include:
- Name, star rating, and location relative to the airport or main landmarks
- Nightly rate and total cost
- Accessible room features such as roll-in showers, grab bars, lowered counters, and visual alarms
- Accessible amenities such as elevators, Braille signage, assistive listening devices, and ADA shuttles

Format results as Markdown lists, not tables. Use the get_weather tool when the traveler asks about conditions at the destination.
";

const GENERAL_AGENT_PROMPT: &str = r"
{{system_message}}

You can help with accessible flights and hotels. When a request is unclear, ask a short clarifying question.
";

const CHAT_TITLE_PROMPT: &str = r"
Summarize the following request in six words or fewer so it can be used as the title of a chat thread. Reply with the title only, without quotes or punctuation.

Request: {{message}}
";

pub fn templates<'a>() -> Handlebars<'a> {
    let mut registry = Handlebars::new();
    registry.set_strict_mode(true);
    // Prompts are plain text, not HTML
    registry.register_escape_fn(handlebars::no_escape);
    for (prompt, template) in [
        (Prompt::FlightAgent, FLIGHT_AGENT_PROMPT),
        (Prompt::LodgingAgent, LODGING_AGENT_PROMPT),
        (Prompt::GeneralAgent, GENERAL_AGENT_PROMPT),
        (Prompt::ChatTitle, CHAT_TITLE_PROMPT),
    ] {
        registry
            .register_template_string(&prompt.to_string(), template)
            .expect("Failed to register template");
    }
    registry
}

/// Render `prompt` with `data` and trim surrounding whitespace.
pub fn render<T: Serialize>(prompt: Prompt, data: &T) -> Result<String, Error> {
    let rendered = templates().render(&prompt.to_string(), data)?;
    Ok(rendered.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_agent_prompt() {
        let out = render(
            Prompt::LodgingAgent,
            &json!({"system_message": "You are NaviAble."}),
        )
        .unwrap();
        assert!(out.starts_with("You are NaviAble."));
        assert!(out.contains("lodging agent"));
    }

    #[test]
    fn test_render_does_not_escape() {
        let out = render(Prompt::ChatTitle, &json!({"message": "Flights from \"SFO\" & <LAX>"}))
            .unwrap();
        assert!(out.ends_with("Request: Flights from \"SFO\" & <LAX>"));
    }

    #[test]
    fn test_render_missing_variable_fails() {
        assert!(render(Prompt::FlightAgent, &json!({})).is_err());
    }
}
