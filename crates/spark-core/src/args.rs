//! Invocation parsing.
//!
//! A message is a command invocation when it starts with the configured
//! prefix immediately followed by a name:
//!
//! ```text
//! !echo "hello world" again
//! │└──┘ └──────────────────┘
//! │name        raw args
//! prefix
//! ```
//!
//! [`Args`] keeps the raw remainder for commands that take one free-form
//! argument, and a shell-split token list for commands that take several.

/// Simple shell-like argument splitting.
///
/// Handles:
/// - Whitespace-separated arguments
/// - Quoted strings (single and double quotes)
/// - Escape sequences within double quotes
pub fn shell_split(input: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_single_quote = false;
    let mut in_double_quote = false;
    let mut escape_next = false;
    let mut quoted = false;

    for ch in input.chars() {
        if escape_next {
            current.push(ch);
            escape_next = false;
            continue;
        }

        match ch {
            '\\' if in_double_quote => {
                escape_next = true;
            }
            '\'' if !in_double_quote => {
                in_single_quote = !in_single_quote;
                quoted = true;
            }
            '"' if !in_single_quote => {
                in_double_quote = !in_double_quote;
                quoted = true;
            }
            c if c.is_whitespace() && !in_single_quote && !in_double_quote => {
                if !current.is_empty() || quoted {
                    args.push(std::mem::take(&mut current));
                }
                quoted = false;
            }
            _ => {
                current.push(ch);
            }
        }
    }

    if !current.is_empty() || quoted {
        args.push(current);
    }

    args
}

/// Arguments following a command name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Args {
    raw: String,
    tokens: Vec<String>,
}

impl Args {
    /// Parses arguments from the text following the command name.
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into().trim().to_string();
        let tokens = shell_split(&raw);
        Self { raw, tokens }
    }

    /// The remainder of the message after the command name, trimmed.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Shell-split arguments.
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// Returns the argument at `index`.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.tokens.get(index).map(String::as_str)
    }

    /// Returns the argument at `index`, or an invalid-arguments error naming it.
    pub fn require(&self, index: usize, name: &str) -> crate::error::CommandResult<&str> {
        self.get(index).ok_or_else(|| {
            crate::error::CommandError::invalid_args(format!("missing argument <{name}>"))
        })
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Parses the arguments into a clap command.
    ///
    /// `name` is used as the binary name in generated usage text.
    #[cfg(feature = "command")]
    pub fn parse<T: clap::Parser>(&self, name: &str) -> crate::error::CommandResult<T> {
        T::try_parse_from(std::iter::once(name.to_string()).chain(self.tokens.iter().cloned()))
            .map_err(|e| crate::error::CommandError::invalid_args(e.to_string()))
    }
}

/// A parsed command invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// The name the command was invoked by.
    pub name: String,
    /// Everything after the name.
    pub args: Args,
}

impl Invocation {
    /// Parses `content` as an invocation under `prefix`.
    ///
    /// Returns `None` when the text does not start with the prefix or no
    /// name follows it.
    pub fn parse(prefix: &str, content: &str) -> Option<Self> {
        let rest = content.strip_prefix(prefix)?;
        let (name, raw) = match rest.find(char::is_whitespace) {
            Some(at) => rest.split_at(at),
            None => (rest, ""),
        };
        if name.is_empty() {
            return None;
        }
        Some(Self {
            name: name.to_string(),
            args: Args::new(raw),
        })
    }
}
