//! `:`-prefixed commands typed at the prompt.
//!
//! Everything else on a line is field text.

#[derive(Debug, Clone, Copy)]
pub struct CommandSpec {
    pub usage: &'static str,
    pub description: &'static str,
}

const COMMAND_SPECS: &[CommandSpec] = &[
    CommandSpec {
        usage: "pick N",
        description: "Choose suggestion N from the list on screen",
    },
    CommandSpec {
        usage: "dismiss",
        description: "Close the suggestion list and the undo control",
    },
    CommandSpec {
        usage: "undo",
        description: "Restore the text from before the last change",
    },
    CommandSpec {
        usage: "redo",
        description: "Put the generated text back",
    },
    CommandSpec {
        usage: "move X Y",
        description: "Move the undo control and remember the position",
    },
    CommandSpec {
        usage: "select START END",
        description: "Select characters START..END of the field",
    },
    CommandSpec {
        usage: "apply TRIGGER",
        description: "Run TRIGGER over the selection",
    },
    CommandSpec {
        usage: "pause",
        description: "Stop reacting to text until :resume",
    },
    CommandSpec {
        usage: "resume",
        description: "React to text again",
    },
    CommandSpec {
        usage: "reload",
        description: "Re-read the configuration file",
    },
    CommandSpec {
        usage: "help",
        description: "Show this list",
    },
    CommandSpec {
        usage: "q, quit",
        description: "Exit",
    },
];

pub fn help_text() -> String {
    let width = COMMAND_SPECS
        .iter()
        .map(|spec| spec.usage.len())
        .max()
        .unwrap_or(0);
    COMMAND_SPECS
        .iter()
        .map(|spec| format!("  :{:<width$}  {}", spec.usage, spec.description))
        .collect::<Vec<_>>()
        .join("\n")
}

/// One line of input.
#[derive(Debug, PartialEq, Eq)]
pub enum Input<'a> {
    Text(&'a str),
    Command(Command<'a>),
}

impl<'a> Input<'a> {
    pub fn parse(line: &'a str) -> Self {
        match line.strip_prefix(':') {
            Some(raw) => Input::Command(Command::parse(raw)),
            None => Input::Text(line),
        }
    }
}

/// Parsed command with typed arguments.
#[derive(Debug, PartialEq, Eq)]
pub enum Command<'a> {
    /// Zero-based suggestion index.
    Pick(usize),
    Dismiss,
    Undo,
    Redo,
    Move { x: i32, y: i32 },
    Select { start: usize, end: usize },
    Apply(&'a str),
    Pause,
    Resume,
    Reload,
    Help,
    Quit,
    /// Known command, bad arguments. Carries the expected usage.
    Usage(&'static str),
    Unknown(&'a str),
    Empty,
}

impl<'a> Command<'a> {
    pub fn parse(raw: &'a str) -> Self {
        let parts: Vec<&str> = raw.split_whitespace().collect();

        match parts.as_slice() {
            ["pick" | "p", n] => match n.parse::<usize>() {
                Ok(n) if n > 0 => Command::Pick(n - 1),
                _ => Command::Usage("pick N"),
            },
            ["pick" | "p", ..] => Command::Usage("pick N"),
            ["dismiss"] => Command::Dismiss,
            ["undo" | "u"] => Command::Undo,
            ["redo" | "r"] => Command::Redo,
            ["move", x, y] => match (x.parse(), y.parse()) {
                (Ok(x), Ok(y)) => Command::Move { x, y },
                _ => Command::Usage("move X Y"),
            },
            ["move", ..] => Command::Usage("move X Y"),
            ["select", start, end] => match (start.parse(), end.parse()) {
                (Ok(start), Ok(end)) => Command::Select { start, end },
                _ => Command::Usage("select START END"),
            },
            ["select", ..] => Command::Usage("select START END"),
            ["apply", trigger] => Command::Apply(*trigger),
            ["apply", ..] => Command::Usage("apply TRIGGER"),
            ["pause"] => Command::Pause,
            ["resume"] => Command::Resume,
            ["reload"] => Command::Reload,
            ["help" | "?"] => Command::Help,
            ["q" | "quit"] => Command::Quit,
            [cmd, ..] => Command::Unknown(*cmd),
            [] => Command::Empty,
        }
    }
}
