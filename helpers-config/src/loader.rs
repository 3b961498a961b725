//! Config file loading

use crate::expand::expand_env;
use crate::secrets::{secret_path, SecretSource};
use crate::Env;
use helpers_error::{Error, ErrorCode, Field, Result, ResultExt};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Config file syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Toml,
}

impl Format {
    /// Pick the format from the file extension.
    pub fn from_path(path: &Path) -> Result<Format> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default();
        extension.parse().map_err(|_| {
            Error::invalid_argument(
                format!("unsupported config file {}", path.display()),
                vec![Field::new("file", "extension must be .json or .toml")],
            )
        })
    }
}

impl FromStr for Format {
    type Err = Error;

    fn from_str(s: &str) -> Result<Format> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Format::Json),
            "toml" => Ok(Format::Toml),
            _ => Err(Error::invalid_argument(
                format!("unknown config format '{}'", s),
                vec![Field::new("format", "must be json or toml")],
            )),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Format::Json => write!(f, "json"),
            Format::Toml => write!(f, "toml"),
        }
    }
}

/// Loads config files into typed structs.
///
/// Every string value is expanded for `$NAME`/`${NAME}` references first.
/// A value that is then exactly `gSecret://<path>` is replaced by the
/// secret at `<path>`.
///
/// ```rust
/// use helpers_config::{ConfigLoader, Env, Format, MemorySecrets};
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct Db {
///     url: String,
///     password: String,
/// }
///
/// let secrets = MemorySecrets::new().with_secret("db-password", "hunter2");
/// let loader = ConfigLoader::new()
///     .with_env(Env::isolated().with_var("DB_HOST", "db.internal"))
///     .with_secrets(&secrets);
///
/// let db: Db = loader.load_str(
///     r#"{"url": "postgres://${DB_HOST}/app", "password": "gSecret://db-password"}"#,
///     Format::Json,
/// )?;
/// assert_eq!(db.url, "postgres://db.internal/app");
/// assert_eq!(db.password, "hunter2");
/// # Ok::<(), helpers_error::Error>(())
/// ```
pub struct ConfigLoader<'a> {
    env: Env,
    secrets: Option<&'a dyn SecretSource>,
}

impl Default for ConfigLoader<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> ConfigLoader<'a> {
    /// A loader over the process environment, without a secret source.
    pub fn new() -> Self {
        Self {
            env: Env::process(),
            secrets: None,
        }
    }

    pub fn with_env(mut self, env: Env) -> Self {
        self.env = env;
        self
    }

    pub fn with_secrets(mut self, secrets: &'a dyn SecretSource) -> Self {
        self.secrets = Some(secrets);
        self
    }

    /// Load and decode the file at `path`. The format comes from its
    /// extension.
    pub fn load<T: DeserializeOwned>(&self, path: impl AsRef<Path>) -> Result<T> {
        let path = path.as_ref();
        let format = Format::from_path(path)?;
        let content = std::fs::read_to_string(path)
            .map_err(Error::from)
            .wrap_err_with(|| format!("unable to read config {}", path.display()))?;

        tracing::debug!(file = %path.display(), format = %format, "loading config");
        self.load_str(&content, format)
            .wrap_err_with(|| format!("unable to load config {}", path.display()))
    }

    /// Decode `content` in the given format.
    pub fn load_str<T: DeserializeOwned>(&self, content: &str, format: Format) -> Result<T> {
        let mut value = self.load_value(content, format)?;
        self.expand(&mut value)?;
        serde_json::from_value(value).map_err(|e| {
            Error::invalid_argument(
                "config does not match the expected shape",
                vec![Field::new("config", e.to_string())],
            )
        })
    }

    fn load_value(&self, content: &str, format: Format) -> Result<Value> {
        let invalid = |reason: String| {
            Error::invalid_argument(
                format!("invalid {} config", format),
                vec![Field::new("file", reason)],
            )
        };

        match format {
            Format::Json => serde_json::from_str(content).map_err(|e| invalid(e.to_string())),
            Format::Toml => {
                let table: toml::Table = toml::from_str(content).map_err(|e| invalid(e.to_string()))?;
                serde_json::to_value(table).map_err(|e| invalid(e.to_string()))
            }
        }
    }

    fn expand(&self, value: &mut Value) -> Result<()> {
        match value {
            Value::String(s) => {
                let expanded = expand_env(s, |name| self.env.get(name));
                let secret = match secret_path(&expanded) {
                    Some(path) => Some(self.secret(path)?),
                    None => None,
                };
                *s = secret.unwrap_or(expanded);
            }
            Value::Array(items) => {
                for item in items {
                    self.expand(item)?;
                }
            }
            Value::Object(map) => {
                for (_, item) in map.iter_mut() {
                    self.expand(item)?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn secret(&self, path: &str) -> Result<String> {
        let source = self.secrets.ok_or_else(|| {
            Error::with_fields(
                ErrorCode::FailedPrecondition,
                "config references a secret but no secret source is configured",
                vec![Field::new(path, "secret source required")],
            )
        })?;

        tracing::debug!(path = %path, "resolving config secret");
        source
            .get_secret(path)
            .wrap_err_with(|| format!("unable to resolve secret {}", path))
    }
}

/// Load `path` against the process environment and `./.env`, without a
/// secret source.
pub fn load_config<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let env = Env::load_default().wrap_err("unable to read environment variables")?;
    ConfigLoader::new().with_env(env).load(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemorySecrets;
    use serde::Deserialize;
    use std::io::Write;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Service {
        name: String,
        port: u16,
        #[serde(default)]
        tags: Vec<String>,
        db: Db,
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Db {
        uri: String,
        password: String,
    }

    fn env() -> Env {
        Env::isolated()
            .with_var("SERVICE", "ledger")
            .with_var("DB_HOST", "db.internal")
    }

    fn write(suffix: &str, content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_json_with_env() {
        let file = write(
            ".json",
            r#"{
                "name": "${SERVICE}-api",
                "port": 8080,
                "tags": ["$SERVICE", "cost: $$5"],
                "db": {"uri": "postgres://${DB_HOST}/app", "password": "plain"}
            }"#,
        );

        let service: Service = ConfigLoader::new().with_env(env()).load(file.path()).unwrap();
        assert_eq!(service.name, "ledger-api");
        assert_eq!(service.port, 8080);
        assert_eq!(service.tags, vec!["ledger", "cost: $5"]);
        assert_eq!(service.db.uri, "postgres://db.internal/app");
    }

    #[test]
    fn test_load_toml_with_secret() {
        let file = write(
            ".toml",
            r#"
name = "ledger"
port = 9090

[db]
uri = "postgres://${DB_HOST}/app"
password = "gSecret://projects/p/secrets/db/versions/latest"
"#,
        );
        let secrets =
            MemorySecrets::new().with_secret("projects/p/secrets/db/versions/latest", "hunter2");

        let service: Service = ConfigLoader::new()
            .with_env(env())
            .with_secrets(&secrets)
            .load(file.path())
            .unwrap();
        assert_eq!(service.db.password, "hunter2");
        assert!(service.tags.is_empty());
    }

    #[test]
    fn test_secret_path_from_env() {
        let secrets = MemorySecrets::new().with_secret("db", "hunter2");
        let loader = ConfigLoader::new()
            .with_env(Env::isolated().with_var("DB_SECRET", "gSecret://db"))
            .with_secrets(&secrets);

        let value: String = loader.load_str(r#""${DB_SECRET}""#, Format::Json).unwrap();
        assert_eq!(value, "hunter2");
    }

    #[test]
    fn test_secret_without_source() {
        let err = ConfigLoader::new()
            .with_env(env())
            .load_str::<String>(r#""gSecret://db""#, Format::Json)
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::FailedPrecondition);
    }

    #[test]
    fn test_missing_secret_is_wrapped() {
        let secrets = MemorySecrets::new();
        let err = ConfigLoader::new()
            .with_env(env())
            .with_secrets(&secrets)
            .load_str::<String>(r#""gSecret://db""#, Format::Json)
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);
        assert!(err.to_string().starts_with("unable to resolve secret db: "));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = ConfigLoader::new()
            .load::<Service>(dir.path().join("missing.json"))
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);
    }

    #[test]
    fn test_unsupported_extension() {
        let file = write(".yaml", "name: x");
        let err = ConfigLoader::new().load::<Service>(file.path()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidArgument);
        assert_eq!(err.fields()[0].name, "file");
    }

    #[test]
    fn test_parse_error() {
        let file = write(".json", "{ not json");
        let err = ConfigLoader::new().load::<Service>(file.path()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidArgument);
        assert!(err.to_string().contains("invalid json config"));
    }

    #[test]
    fn test_shape_mismatch() {
        let err = ConfigLoader::new()
            .load_str::<Service>(r#"{"name": "x"}"#, Format::Json)
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidArgument);
        assert_eq!(err.fields()[0].name, "config");
    }

    #[test]
    fn test_format_parse() {
        assert_eq!("TOML".parse::<Format>().unwrap(), Format::Toml);
        assert!("yaml".parse::<Format>().is_err());
        assert_eq!(Format::from_path(Path::new("a/b.json")).unwrap(), Format::Json);
    }
}
