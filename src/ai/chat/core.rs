use anyhow::{Error, Result, anyhow, bail};
use futures_util::future::try_join_all;

use super::models::Transcript;
use crate::openai::{BoxedToolCall, FunctionCall, Message, Role, completion};

// Upper bound on model round trips for a single turn so a model that
// keeps asking for tools can't loop forever
const MAX_TOOL_ROUNDS: usize = 6;

/// The core abstraction around interacting with an LLM in a chat
/// completion style using an OpenAI compatible API.
///
/// Supports tool calling. Persistence is left to the caller.
///
/// Use `ChatBuilder` to construct a valid `Chat`.
pub struct Chat {
    api_hostname: String,
    api_key: String,
    model: String,
    tools: Option<Vec<BoxedToolCall>>,
    transcript: Transcript,
}

impl Chat {
    async fn handle_tool_call(
        tools: &[BoxedToolCall],
        tool_call: &FunctionCall,
    ) -> Result<Vec<Message>, Error> {
        let name = &tool_call.function.name;
        let args = &tool_call.function.arguments;

        tracing::debug!("\nTool call: {}\nargs: {}", name, args);

        let tool_call_result = tools
            .iter()
            .find(|i| i.function_name() == *name)
            .ok_or(anyhow!("Received tool call that doesn't exist: {}", name))?
            .call(args)
            .await?;

        Ok(vec![
            Message::new_tool_call_request(vec![tool_call.clone()]),
            Message::new_tool_call_response(&tool_call_result, &tool_call.id),
        ])
    }

    async fn handle_tool_calls(
        tools: &[BoxedToolCall],
        tool_calls: &[FunctionCall],
    ) -> Result<Vec<Message>, Error> {
        // Calls run concurrently but results are kept in request order
        let futures = tool_calls
            .iter()
            .map(|call| Self::handle_tool_call(tools, call));
        let results = try_join_all(futures).await?.into_iter().flatten().collect();
        Ok(results)
    }

    /// Runs the next turn in chat by passing the transcript plus `msg`
    /// to the LLM. Can return multiple messages when there are tool
    /// calls; the last one is always the assistant's reply.
    pub async fn next_msg(&mut self, msg: Message) -> Result<Vec<Message>, Error> {
        self.transcript.push(msg);

        let messages = Self::chat(
            &self.tools,
            &self.transcript,
            &self.api_hostname,
            &self.api_key,
            &self.model,
        )
        .await?;

        for m in messages.iter() {
            self.transcript.push(m.clone());
        }

        Ok(messages)
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    async fn chat(
        tools: &Option<Vec<BoxedToolCall>>,
        transcript: &Transcript,
        api_hostname: &str,
        api_key: &str,
        model: &str,
    ) -> Result<Vec<Message>, Error> {
        let mut history = transcript.messages().to_vec();
        let mut messages = Vec::new();

        let mut resp = completion(&history, tools, api_hostname, api_key, model).await?;

        // Tool calls need to be handled for the chat to proceed
        for _ in 0..MAX_TOOL_ROUNDS {
            let tool_calls = match &resp.first_message()?.tool_calls {
                Some(calls) if !calls.is_empty() => calls.clone(),
                _ => break,
            };

            let tools_ref = tools
                .as_ref()
                .ok_or(anyhow!("Received tool call but no tools were specified"))?;

            let tool_call_msgs = Self::handle_tool_calls(tools_ref, &tool_calls).await?;
            for m in tool_call_msgs.into_iter() {
                messages.push(m.clone());
                history.push(m);
            }

            // Provide the results of the tool calls back to the chat
            resp = completion(&history, tools, api_hostname, api_key, model).await?;
        }

        match &resp.first_message()?.content {
            Some(content) => messages.push(Message::new(Role::Assistant, content)),
            None => bail!("No message received from model {}", model),
        }

        Ok(messages)
    }
}

#[derive(Default)]
pub struct ChatBuilder {
    api_hostname: String,
    api_key: String,
    model: String,
    tools: Option<Vec<BoxedToolCall>>,
    transcript: Transcript,
}

impl ChatBuilder {
    pub fn new(api_hostname: &str, api_key: &str, model: &str) -> Self {
        Self {
            api_hostname: api_hostname.to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            tools: None,
            transcript: Transcript::new(),
        }
    }

    pub fn build(self) -> Chat {
        Chat {
            api_hostname: self.api_hostname,
            api_key: self.api_key,
            model: self.model,
            tools: self.tools,
            transcript: self.transcript,
        }
    }

    pub fn transcript(mut self, messages: Vec<Message>) -> Self {
        self.transcript = Transcript::new_with_messages(messages);
        self
    }

    pub fn tools(mut self, tools: Vec<BoxedToolCall>) -> Self {
        self.tools = Some(tools);
        self
    }
}
