use std::path::PathBuf;

use crate::core::conversation::QuickPrompt;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Send(String),
    New,
    List(Option<String>),
    Open(String),
    Delete(String),
    Show,
    Edit { index: usize, text: String },
    EditRegenerate { index: usize, text: String },
    Remove(usize),
    Regenerate(usize),
    Reset,
    System(String),
    Export(PathBuf),
    Import(PathBuf),
    Attach(PathBuf),
    Analyze(String),
    Prompt(QuickPrompt),
    Model(String),
    Temperature(f32),
    MaxTokens(u32),
    Key(String),
    Help,
    Quit,
}

pub const HELP: &str = "\
Type a message to chat. Commands:
  /new                     start a conversation
  /list [query]            list conversations, newest first
  /open <id>               switch conversation
  /delete <id>             delete a conversation
  /show                    print the current transcript
  /edit <n> <text>         replace message n
  /edit-regen <n> <text>   replace user message n, drop later turns, answer again
  /rm <n>                  delete message n
  /regen <n>               regenerate assistant message n
  /reset                   clear the current conversation
  /system <text>           set the system prompt
  /export <path>           write messages as JSON
  /import <path>           replace messages from JSON
  /attach <path>           attach an image to the next message
  /analyze <text>          match text against skin conditions
  /prompt <name>           send a quick prompt (explain, summarize, python)
  /model <name>            choose the model
  /temp <value>            set temperature (0.0 - 2.0)
  /max-tokens <n>          set max output tokens (256 - 8192)
  /key <api key>           set the Gemini API key
  /help                    show this help
  /quit                    exit";

fn required<'a>(argument: &'a str, usage: &str) -> Result<&'a str, String> {
    if argument.is_empty() {
        Err(format!("Usage: {usage}"))
    } else {
        Ok(argument)
    }
}

fn parse_index(raw: &str, usage: &str) -> Result<usize, String> {
    raw.parse::<usize>()
        .map_err(|_| format!("'{raw}' is not a message number. Usage: {usage}"))
}

fn index_and_text(argument: &str, usage: &str) -> Result<(usize, String), String> {
    let (raw_index, text) = argument
        .split_once(char::is_whitespace)
        .ok_or_else(|| format!("Usage: {usage}"))?;
    let text = text.trim();
    if text.is_empty() {
        return Err(format!("Usage: {usage}"));
    }
    Ok((parse_index(raw_index, usage)?, text.to_string()))
}

/// `None` for blank input.
pub fn parse_command(line: &str) -> Option<Result<Command, String>> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let Some(rest) = line.strip_prefix('/') else {
        return Some(Ok(Command::Send(line.to_string())));
    };

    let (name, argument) = match rest.split_once(char::is_whitespace) {
        Some((name, argument)) => (name, argument.trim()),
        None => (rest, ""),
    };

    let parsed = match name.to_ascii_lowercase().as_str() {
        "new" => Ok(Command::New),
        "list" => Ok(Command::List(
            (!argument.is_empty()).then(|| argument.to_string()),
        )),
        "open" => required(argument, "/open <id>").map(|id| Command::Open(id.to_string())),
        "delete" => required(argument, "/delete <id>").map(|id| Command::Delete(id.to_string())),
        "show" => Ok(Command::Show),
        "edit" => index_and_text(argument, "/edit <n> <text>")
            .map(|(index, text)| Command::Edit { index, text }),
        "edit-regen" => index_and_text(argument, "/edit-regen <n> <text>")
            .map(|(index, text)| Command::EditRegenerate { index, text }),
        "rm" => required(argument, "/rm <n>")
            .and_then(|raw| parse_index(raw, "/rm <n>"))
            .map(Command::Remove),
        "regen" => required(argument, "/regen <n>")
            .and_then(|raw| parse_index(raw, "/regen <n>"))
            .map(Command::Regenerate),
        "reset" => Ok(Command::Reset),
        "system" => required(argument, "/system <text>").map(|text| Command::System(text.to_string())),
        "export" => required(argument, "/export <path>").map(|path| Command::Export(PathBuf::from(path))),
        "import" => required(argument, "/import <path>").map(|path| Command::Import(PathBuf::from(path))),
        "attach" => required(argument, "/attach <path>").map(|path| Command::Attach(PathBuf::from(path))),
        "analyze" => required(argument, "/analyze <text>").map(|text| Command::Analyze(text.to_string())),
        "prompt" => required(argument, "/prompt <explain|summarize|python>").and_then(|name| {
            name.parse::<QuickPrompt>()
                .map(Command::Prompt)
                .map_err(|e| e.to_string())
        }),
        "model" => required(argument, "/model <name>").map(|model| Command::Model(model.to_string())),
        "temp" => required(argument, "/temp <value>").and_then(|raw| {
            raw.parse::<f32>()
                .map(Command::Temperature)
                .map_err(|_| format!("'{raw}' is not a number"))
        }),
        "max-tokens" => required(argument, "/max-tokens <n>").and_then(|raw| {
            raw.parse::<u32>()
                .map(Command::MaxTokens)
                .map_err(|_| format!("'{raw}' is not a whole number"))
        }),
        "key" => required(argument, "/key <api key>").map(|key| Command::Key(key.to_string())),
        "help" | "?" => Ok(Command::Help),
        "quit" | "exit" => Ok(Command::Quit),
        other => Err(format!("Unknown command /{other}. Type /help for the list")),
    };
    Some(parsed)
}
