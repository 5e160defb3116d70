use crate::commands::{self, Command, PROMPT_USAGE};
use parley_agent::{fetch_resource, list_prompts, AgentEvent, AgentRunner, EventSink};
use parley_core::ParleyError;
use std::collections::BTreeMap;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

/// Prints agent progress to stdout as it happens.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleSink;

impl EventSink for ConsoleSink {
    fn emit(&self, event: AgentEvent) {
        match event {
            AgentEvent::Note { text } | AgentEvent::Answer { text } => println!("{text}"),
            AgentEvent::ToolCall {
                name, arguments, ..
            } => println!("Calling tool {name} with args {arguments}"),
            AgentEvent::ToolSkipped { reason, .. } => println!("{reason}"),
            AgentEvent::PromptStarted { name } => println!("\nExecuting prompt '{name}'..."),
            AgentEvent::ToolResult { .. } => {}
        }
    }
}

/// Line-oriented front end over an [`AgentRunner`].
pub struct Repl {
    runner: AgentRunner,
    resource_scheme: String,
}

impl Repl {
    pub fn new(runner: AgentRunner, resource_scheme: impl Into<String>) -> Self {
        Self {
            runner,
            resource_scheme: resource_scheme.into(),
        }
    }

    /// Read commands until `quit` or end of input.
    pub async fn run(&self) -> std::io::Result<()> {
        let scheme = &self.resource_scheme;
        println!("\nMCP Chatbot Started!");
        println!("Type your queries or 'quit' to exit.");
        println!("Use @folders to see available topics");
        println!("Use @<topic> to search {scheme} in that topic");
        println!("Use /prompts to list available prompts");
        println!("Use /prompt <name> <arg1=value1> to execute a prompt");

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            print!("\nQuery: ");
            std::io::stdout().flush()?;

            let Some(line) = lines.next_line().await? else {
                debug!("End of input");
                break;
            };
            match commands::parse(&line, scheme) {
                Command::Quit => break,
                command => self.execute(command).await,
            }
        }
        Ok(())
    }

    async fn execute(&self, command: Command) {
        match command {
            Command::Empty | Command::Quit => {}
            Command::Query(query) => {
                if let Err(e) = self.runner.process_query(&query).await {
                    println!("{}", describe_error(&e));
                }
            }
            Command::Resource(uri) => self.show_resource(&uri).await,
            Command::ListPrompts => self.show_prompts(),
            Command::RunPrompt { name, arguments } => self.run_prompt(&name, &arguments).await,
            Command::PromptUsage => println!("{PROMPT_USAGE}"),
            Command::Unknown(command) => println!("Unknown command: {command}"),
        }
    }

    async fn show_resource(&self, uri: &str) {
        match fetch_resource(self.runner.registry(), uri).await {
            Ok(Some(content)) => {
                println!("\nResource: {uri}");
                println!("Content:");
                println!("{content}");
            }
            Ok(None) => println!("No content available."),
            Err(e) => println!("{}", describe_error(&e)),
        }
    }

    fn show_prompts(&self) {
        let prompts = list_prompts(self.runner.registry());
        if prompts.is_empty() {
            println!("No prompts available.");
            return;
        }
        println!("\nAvailable prompts:");
        for prompt in prompts {
            println!("- {}: {}", prompt.name, prompt.description);
            if !prompt.arguments.is_empty() {
                println!("  Arguments:");
                for argument in &prompt.arguments {
                    println!("    - {}", argument.name);
                }
            }
        }
    }

    async fn run_prompt(&self, name: &str, arguments: &BTreeMap<String, String>) {
        match self.runner.run_prompt(name, arguments).await {
            Ok(Some(_)) => {}
            Ok(None) => println!("Prompt '{name}' returned no messages."),
            Err(e) => println!("{}", describe_error(&e)),
        }
    }
}

/// Not-found outcomes print as-is; everything else is an error line.
pub fn describe_error(error: &ParleyError) -> String {
    if error.is_not_found() {
        error.to_string()
    } else {
        format!("\nError: {error}")
    }
}
