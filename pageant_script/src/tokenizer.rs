use pest::Parser;
use pest::iterators::Pair;
use pest_derive::Parser as PestParser;

#[derive(PestParser)]
#[grammar = "grammar.pest"]
struct ScriptParser;

/// Errors raised while splitting script text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScriptSyntaxError {
    #[error("script syntax error: {0}")]
    Pest(String),
    #[error("command syntax error in '{command}': {reason}")]
    Command { command: String, reason: String },
}

/// Split raw script text into trimmed command strings.
///
/// Slashes inside double quotes are literal. A quote with no closing partner
/// ends at the next slash, so only its own command is malformed. Empty
/// commands (from `//` or a trailing slash) are dropped.
pub fn split_script(text: &str) -> Result<Vec<String>, ScriptSyntaxError> {
    let mut pairs =
        ScriptParser::parse(Rule::script, text).map_err(|e| ScriptSyntaxError::Pest(e.to_string()))?;
    let Some(script) = pairs.next() else {
        return Ok(Vec::new());
    };
    Ok(script
        .into_inner()
        .filter(|p| p.as_rule() == Rule::segment)
        .map(|p| p.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
        .collect())
}

/// Split one command into its name and arguments.
///
/// Quoted runs keep their spaces and lose their quotes; `\"` inside a quoted
/// run yields a literal quote. Element 0 of the result is the command name.
pub fn split_command(command: &str) -> Result<Vec<String>, ScriptSyntaxError> {
    let mut pairs = ScriptParser::parse(Rule::command, command).map_err(|e| ScriptSyntaxError::Command {
        command: command.to_string(),
        reason: e.to_string(),
    })?;
    let Some(root) = pairs.next() else {
        return Ok(Vec::new());
    };
    Ok(root
        .into_inner()
        .filter(|p| p.as_rule() == Rule::token)
        .map(decode_token)
        .collect())
}

fn decode_token(token: Pair<Rule>) -> String {
    let mut out = String::new();
    for part in token.into_inner() {
        match part.as_rule() {
            Rule::word => out.push_str(part.as_str()),
            Rule::quoted => {
                if let Some(inner) = part.into_inner().next() {
                    out.push_str(&unescape(inner.as_str()));
                }
            },
            _ => {},
        }
    }
    out
}

/// Strip one pair of surrounding double quotes (if present) and unescape `\"` and `\\`.
pub fn unquote(s: &str) -> String {
    let trimmed = s.trim();
    match trimmed.strip_prefix('"').and_then(|t| t.strip_suffix('"')) {
        Some(inner) => unescape(inner),
        None => trimmed.to_string(),
    }
}

fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            },
            None => out.push('\\'),
        }
    }
    out
}
