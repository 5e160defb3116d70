use std::collections::BTreeMap;

/// One line of interactive input, classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Empty,
    Quit,
    /// Free text for the model.
    Query(String),
    /// `@topic`, already expanded to a URI.
    Resource(String),
    ListPrompts,
    RunPrompt {
        name: String,
        arguments: BTreeMap<String, String>,
    },
    /// `/prompt` without a name.
    PromptUsage,
    Unknown(String),
}

pub const PROMPT_USAGE: &str = "Usage: /prompt <name> <arg1=value1> <arg2=value2>";

/// Classify a line. `@topic` expands to `<scheme>://topic`.
pub fn parse(line: &str, resource_scheme: &str) -> Command {
    let line = line.trim();
    if line.is_empty() {
        return Command::Empty;
    }
    if line.eq_ignore_ascii_case("quit") {
        return Command::Quit;
    }
    if let Some(topic) = line.strip_prefix('@') {
        return Command::Resource(format!("{resource_scheme}://{topic}"));
    }
    if line.starts_with('/') {
        return parse_slash(line);
    }
    Command::Query(line.to_string())
}

fn parse_slash(line: &str) -> Command {
    let mut parts = line.split_whitespace();
    let command = parts.next().unwrap_or_default().to_lowercase();
    match command.as_str() {
        "/prompts" => Command::ListPrompts,
        "/prompt" => {
            let Some(name) = parts.next() else {
                return Command::PromptUsage;
            };
            // Tokens without `=` are ignored.
            let arguments = parts
                .filter_map(|token| token.split_once('='))
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .collect();
            Command::RunPrompt {
                name: name.to_string(),
                arguments,
            }
        }
        _ => Command::Unknown(command),
    }
}
