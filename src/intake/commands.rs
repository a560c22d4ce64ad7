/// Commands the transport recognises.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Add(String),
    Info,
    Done,
    Cancel,
    List,
    Delete { all: bool },
    Help,
}

impl Command {
    /// Parses `/name args`. A `@botname` suffix on the name is ignored.
    /// Returns `None` for text that is not a known command.
    pub fn parse(line: &str) -> Option<Command> {
        let line = line.trim();
        let rest = line.strip_prefix('/')?;
        let (name, args) = match rest.split_once(char::is_whitespace) {
            Some((name, args)) => (name, args.trim()),
            None => (rest, ""),
        };
        let name = name.split('@').next().unwrap_or(name).to_lowercase();

        match name.as_str() {
            "add" => Some(Command::Add(args.to_string())),
            "info" => Some(Command::Info),
            "done" => Some(Command::Done),
            "cancel" => Some(Command::Cancel),
            "list" => Some(Command::List),
            "del" => Some(Command::Delete {
                all: args.eq_ignore_ascii_case("all"),
            }),
            "help" | "start" => Some(Command::Help),
            _ => None,
        }
    }
}

/// One message delivered by the transport for a given owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Command(Command),
    Text(String),
    /// Opaque token of a previously offered choice.
    Selection(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceOption {
    pub label: String,
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Text(String),
    Choices {
        prompt: String,
        options: Vec<ChoiceOption>,
    },
}

impl Reply {
    pub fn text(message: impl Into<String>) -> Self {
        Reply::Text(message.into())
    }
}
