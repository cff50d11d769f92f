use regex::Regex;

pub mod handler;

pub use handler::CommandHandler;

pub const INCORRECT_COMMAND_REPLY: &str = "Sorry mate, incorrect command. Peace.";
pub const NO_TRACKS_REPLY: &str = "No tracks in a queue";

pub const HELP_REPLY: &str = "\
list - show the channel's queue
find <query> - search for tracks
add <query> - queue the first match (starts streaming on an idle channel)
remove <id> - drop a queued track by its id
play / pause / stop - control playback
next (or skip) - jump to the next track
help - this text";

/// A recognized, validated chat command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    List,
    Find { query: String },
    Add { query: String },
    Remove { data: String },
    Play,
    Pause,
    Stop,
    Next,
    Help,
}

impl Command {
    /// The name token as typed in chat. `skip` normalizes to `next`.
    pub fn name(&self) -> &'static str {
        match self {
            Command::List => "list",
            Command::Find { .. } => "find",
            Command::Add { .. } => "add",
            Command::Remove { .. } => "remove",
            Command::Play => "play",
            Command::Pause => "pause",
            Command::Stop => "stop",
            Command::Next => "next",
            Command::Help => "help",
        }
    }

    fn data(&self) -> Option<&str> {
        match self {
            Command::Find { query } | Command::Add { query } => Some(query),
            Command::Remove { data } => Some(data),
            _ => None,
        }
    }
}

/// What to do with an inbound message.
#[derive(Debug, PartialEq, Eq)]
pub enum ParseOutcome {
    /// No trigger prefix; the message is not for us.
    Ignored,
    /// Trigger matched but validation failed; reply without dispatching.
    Rejected(String),
    Command(Command),
}

/// Splits trigger-prefixed messages into commands.
///
/// The trigger is one configured letter followed by a space, matched
/// case-insensitively. Command names after it are case-sensitive.
pub struct CommandParser {
    trigger: Regex,
}

impl CommandParser {
    /// `trigger` is a single ASCII letter, enforced at config load.
    pub fn new(trigger: &str) -> Self {
        let pattern = format!("(?i)^{} ", regex::escape(trigger));
        Self {
            trigger: Regex::new(&pattern).expect("trigger pattern is valid"),
        }
    }

    pub fn parse(&self, text: &str) -> ParseOutcome {
        if !self.trigger.is_match(text) {
            return ParseOutcome::Ignored;
        }

        let mut tokens = text.split_whitespace();
        tokens.next(); // the trigger itself
        let name = tokens.next().unwrap_or("");
        let data = tokens.collect::<Vec<_>>().join(" ");

        let command = match name {
            "list" => Command::List,
            "find" => Command::Find { query: data },
            "add" => Command::Add { query: data },
            "remove" => Command::Remove { data },
            "play" => Command::Play,
            "pause" => Command::Pause,
            "stop" => Command::Stop,
            "next" | "skip" => Command::Next,
            "help" => Command::Help,
            _ => return ParseOutcome::Rejected(INCORRECT_COMMAND_REPLY.to_string()),
        };

        if command.data().is_some_and(str::is_empty) {
            return ParseOutcome::Rejected(format!(
                "Got your command ({}), but you didn't specify data mate!",
                name
            ));
        }

        ParseOutcome::Command(command)
    }
}
