use anyhow::Result;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use crate::ai::agents::respond;
use crate::core::AppConfig;
use crate::openai::{Message, Role};

/// Talk to the agents from the terminal. Nothing is persisted.
pub async fn run(config: AppConfig) -> Result<()> {
    let mut rl = DefaultEditor::new()?;
    let mut history: Vec<Message> = vec![];

    loop {
        let readline = rl.readline(">>> ");
        match readline {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(line);
                history.push(Message::new(Role::User, line));
                match respond(&config, &history).await {
                    Ok(reply) => {
                        println!("{}\n", reply);
                        history.push(Message::new(Role::Assistant, &reply));
                    }
                    Err(err) => {
                        // Drop the message so the next attempt starts clean
                        history.pop();
                        println!("Error: {}", err);
                    }
                }
            }
            Err(ReadlineError::Interrupted) => break,
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                println!("Error: {:?}", err);
                break;
            }
        }
    }

    Ok(())
}
