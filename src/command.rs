use crate::error::ModeError;

pub const SELECT_USAGE: &str = "!set <#userid | partialName | @me>";
pub const CONSOLE_SELECT_USAGE: &str = "stealth_set <#userid | partialName | @me>";

const CONSOLE_PREFIX: &str = "stealth_";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TargetSelector {
    /// `@me`: whoever issued the command.
    Caller,
    Id(u32),
    /// Case-insensitive substring of the display name.
    Name(String),
}

impl TargetSelector {
    pub fn parse(raw: &str) -> Option<Self> {
        let value = raw.trim();
        if value.is_empty() {
            return None;
        }
        if value.eq_ignore_ascii_case("@me") {
            return Some(Self::Caller);
        }
        if let Some(id) = value
            .strip_prefix('#')
            .and_then(|digits| digits.parse::<u32>().ok())
        {
            return Some(Self::Id(id));
        }
        Some(Self::Name(value.to_string()))
    }

    pub fn describe(&self) -> String {
        match self {
            Self::Caller => "@me".to_string(),
            Self::Id(id) => format!("#{id}"),
            Self::Name(name) => name.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ModeCommand {
    Select(TargetSelector),
    Random,
    Start,
    Stop,
    Reload,
    Save,
}

/// Parses a chat line such as `!set bob` or `/stop`.
///
/// Returns `None` for ordinary chat and unknown commands so the host can let
/// the message through untouched.
pub fn parse_chat_line(raw: &str) -> Option<Result<ModeCommand, ModeError>> {
    let message = raw.trim();
    let line = message
        .strip_prefix('!')
        .or_else(|| message.strip_prefix('/'))?
        .trim();
    let (name, arg) = split_command(line)?;
    let command = match name.as_str() {
        "set" | "ghost" | "invisible" | "man" => select(arg, SELECT_USAGE),
        other => Ok(simple_command(other)?),
    };
    Some(command)
}

/// Parses a console command such as `stealth_set #4`.
pub fn parse_console_line(raw: &str) -> Option<Result<ModeCommand, ModeError>> {
    let (name, arg) = split_command(raw.trim())?;
    let name = name.strip_prefix(CONSOLE_PREFIX)?;
    let command = match name {
        "set" => select(arg, CONSOLE_SELECT_USAGE),
        other => Ok(simple_command(other)?),
    };
    Some(command)
}

/// Tries the chat grammar first, then the console one.
pub fn parse_line(raw: &str) -> Option<Result<ModeCommand, ModeError>> {
    parse_chat_line(raw).or_else(|| parse_console_line(raw))
}

fn split_command(line: &str) -> Option<(String, &str)> {
    if line.is_empty() {
        return None;
    }
    let mut parts = line.splitn(2, char::is_whitespace);
    let name = parts.next()?.to_ascii_lowercase();
    let arg = parts.next().unwrap_or("").trim();
    Some((name, arg))
}

fn select(arg: &str, usage: &'static str) -> Result<ModeCommand, ModeError> {
    TargetSelector::parse(arg)
        .map(ModeCommand::Select)
        .ok_or(ModeError::MissingArgument { usage })
}

fn simple_command(name: &str) -> Option<ModeCommand> {
    match name {
        "random" => Some(ModeCommand::Random),
        "start" => Some(ModeCommand::Start),
        "stop" => Some(ModeCommand::Stop),
        "reload" => Some(ModeCommand::Reload),
        "save" => Some(ModeCommand::Save),
        _ => None,
    }
}
