//! Environment lookup with an optional `.env` overlay

use crate::expand::expand_env;
use helpers_error::{Error, Field, Result, ResultExt};
use std::collections::HashMap;
use std::path::Path;

/// File loaded by [`Env::load_default`] when present.
pub const DEFAULT_ENV_FILE: &str = ".env";

/// The variables visible to config expansion.
///
/// Process variables take precedence over the overlay, so a `.env` file never
/// overrides what the deployment sets. The process environment itself is
/// never modified.
#[derive(Debug, Clone)]
pub struct Env {
    use_process: bool,
    overlay: HashMap<String, String>,
}

impl Env {
    /// The process environment only.
    pub fn process() -> Self {
        Self {
            use_process: true,
            overlay: HashMap::new(),
        }
    }

    /// An environment that ignores the process and only knows the variables
    /// added to it.
    pub fn isolated() -> Self {
        Self {
            use_process: false,
            overlay: HashMap::new(),
        }
    }

    /// The process environment plus `./.env` when it exists.
    pub fn load_default() -> Result<Self> {
        let env = Self::process();
        if !Path::new(DEFAULT_ENV_FILE).exists() {
            return Ok(env);
        }
        env.with_file(DEFAULT_ENV_FILE)
    }

    /// Add the variables of a `.env` file. The file must exist.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(Error::from)
            .wrap_err_with(|| format!("unable to read environment file {}", path.display()))?;

        for (key, value) in parse_dotenv(&content, |name| self.get(name))
            .wrap_err_with(|| format!("unable to parse environment file {}", path.display()))?
        {
            tracing::debug!(key = %key, file = %path.display(), "loaded environment variable");
            self.overlay.entry(key).or_insert(value);
        }
        Ok(self)
    }

    /// Add one variable. An existing overlay value is kept.
    pub fn with_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.overlay.entry(key.into()).or_insert_with(|| value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<String> {
        if self.use_process {
            if let Ok(value) = std::env::var(name) {
                return Some(value);
            }
        }
        self.overlay.get(name).cloned()
    }
}

/// Parse `.env` content into ordered key/value pairs.
///
/// Supports `#` comments, an `export ` prefix, single-quoted values (taken
/// literally), double-quoted values (`\n`, `\"`, `\\` escapes) and unquoted
/// values with trailing ` #` comments. Unquoted and double-quoted values are
/// expanded against `lookup` and the pairs defined above them.
fn parse_dotenv(
    content: &str,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<Vec<(String, String)>> {
    let mut pairs: Vec<(String, String)> = Vec::new();

    for (index, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line).trim_start();

        let invalid = |reason: &str| {
            Error::invalid_argument(
                format!("invalid environment line {}", index + 1),
                vec![Field::new(format!("line {}", index + 1), reason)],
            )
        };

        let (key, value) = line.split_once('=').ok_or_else(|| invalid("expected KEY=VALUE"))?;
        let key = key.trim();
        if key.is_empty() || key.chars().any(char::is_whitespace) {
            return Err(invalid("invalid variable name"));
        }

        let value = value.trim();
        let (value, expand) = if let Some(rest) = value.strip_prefix('\'') {
            let inner = rest
                .strip_suffix('\'')
                .ok_or_else(|| invalid("unterminated single quote"))?;
            (inner.to_string(), false)
        } else if let Some(rest) = value.strip_prefix('"') {
            let inner = rest
                .strip_suffix('"')
                .ok_or_else(|| invalid("unterminated double quote"))?;
            (unescape(inner), true)
        } else {
            let value = match value.find(" #") {
                Some(comment) => value[..comment].trim_end(),
                None => value,
            };
            (value.to_string(), true)
        };

        let value = if expand {
            expand_env(&value, |name| {
                lookup(name).or_else(|| {
                    pairs
                        .iter()
                        .rev()
                        .find(|(key, _)| key == name)
                        .map(|(_, value)| value.clone())
                })
            })
        } else {
            value
        };

        pairs.push((key.to_string(), value));
    }

    Ok(pairs)
}

fn unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use helpers_error::ErrorCode;
    use std::io::Write;

    fn parse(content: &str) -> Vec<(String, String)> {
        parse_dotenv(content, |_| None).unwrap()
    }

    #[test]
    fn test_parse_basic() {
        let pairs = parse("# comment\n\nA=1\nexport B = two \nC=three # trailing\n");
        assert_eq!(
            pairs,
            vec![
                ("A".to_string(), "1".to_string()),
                ("B".to_string(), "two".to_string()),
                ("C".to_string(), "three".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_quotes() {
        let pairs = parse("A='lit $HOME # x'\nB=\"line\\nnext \\\"q\\\"\"\n");
        assert_eq!(pairs[0].1, "lit $HOME # x");
        assert_eq!(pairs[1].1, "line\nnext \"q\"");
    }

    #[test]
    fn test_parse_expands_earlier_pairs() {
        let pairs = parse("HOST=db\nURL=postgres://${HOST}:5432\nRAW='${HOST}'\n");
        assert_eq!(pairs[1].1, "postgres://db:5432");
        assert_eq!(pairs[2].1, "${HOST}");
    }

    #[test]
    fn test_parse_errors() {
        let err = parse_dotenv("A=1\nNOT A PAIR\n", |_| None).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidArgument);
        assert_eq!(err.fields()[0].name, "line 2");

        assert!(parse_dotenv("A='open", |_| None).is_err());
        assert!(parse_dotenv("=value", |_| None).is_err());
    }

    #[test]
    fn test_overlay_lookup() {
        let env = Env::isolated().with_var("A", "1").with_var("A", "2");
        assert_eq!(env.get("A").as_deref(), Some("1"));
        assert!(env.get("B").is_none());
    }

    #[test]
    fn test_process_wins_over_overlay() {
        let path = std::env::var("PATH").unwrap();
        let env = Env::process().with_var("PATH", "/overlay");
        assert_eq!(env.get("PATH"), Some(path));
    }

    #[test]
    fn test_with_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "DB_USER=admin\nDB_URL=postgres://$DB_USER@db").unwrap();

        let env = Env::isolated().with_file(file.path()).unwrap();
        assert_eq!(env.get("DB_URL").as_deref(), Some("postgres://admin@db"));
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = Env::isolated().with_file(dir.path().join("missing.env")).unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);
    }
}
