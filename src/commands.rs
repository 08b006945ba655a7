//! Discovery of the `run` and `check` commands declared in a model.
//!
//! The solver identifies commands by their position in the source, so the
//! order returned here is the order the solver uses for `command_index`.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Run,
    Check,
}

impl CommandKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Run => "run",
            Self::Check => "check",
        }
    }
}

/// A command selectable for execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub index: usize,
    pub kind: CommandKind,
    /// Declared name; `None` for anonymous commands such as `run {}`.
    pub name: Option<String>,
}

impl Command {
    /// Human-readable label. Anonymous commands are numbered from 1 in
    /// declaration order (`run$1`, `check$2`, ...).
    pub fn label(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => format!("{}${}", self.kind.as_str(), self.index + 1),
        }
    }
}

/// All commands in `source`, in declaration order. Commented-out commands
/// are ignored.
pub fn list_commands(source: &str) -> Vec<Command> {
    let stripped = strip_comments(source);
    let tokens = tokenize(&stripped);

    let mut commands = Vec::new();
    for (i, token) in tokens.iter().enumerate() {
        let kind = match *token {
            "run" => CommandKind::Run,
            "check" => CommandKind::Check,
            _ => continue,
        };
        let name = tokens
            .get(i + 1)
            .filter(|t| is_name(t))
            .map(|t| t.to_string());
        commands.push(Command {
            index: commands.len(),
            kind,
            name,
        });
    }
    commands
}

/// Label for the command at `index`, falling back to a positional label when
/// the source declares fewer commands.
pub fn command_label(source: &str, index: usize) -> String {
    list_commands(source)
        .into_iter()
        .nth(index)
        .map(|c| c.label())
        .unwrap_or_else(|| format!("command #{}", index + 1))
}

const SCOPE_KEYWORDS: &[&str] = &["for", "but", "expect", "run", "check"];

fn is_name(token: &str) -> bool {
    token
        .chars()
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_')
        && !SCOPE_KEYWORDS.contains(&token)
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '\'' | '"' | '$')
}

fn tokenize(source: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut start: Option<usize> = None;

    for (i, c) in source.char_indices() {
        if is_ident_char(c) {
            start.get_or_insert(i);
            continue;
        }
        if let Some(s) = start.take() {
            tokens.push(&source[s..i]);
        }
        if !c.is_whitespace() {
            tokens.push(&source[i..i + c.len_utf8()]);
        }
    }
    if let Some(s) = start {
        tokens.push(&source[s..]);
    }
    tokens
}

/// Blank out `//`, `--` and `/* */` comments, keeping line breaks.
fn strip_comments(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();

    while let Some(c) = chars.next() {
        match (c, chars.peek().copied()) {
            ('/', Some('/')) | ('-', Some('-')) => {
                for c in chars.by_ref() {
                    if c == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            ('/', Some('*')) => {
                chars.next();
                let mut prev = '\0';
                for c in chars.by_ref() {
                    if c == '\n' {
                        out.push('\n');
                    }
                    if prev == '*' && c == '/' {
                        break;
                    }
                    prev = c;
                }
                out.push(' ');
            }
            _ => out.push(c),
        }
    }
    out
}
