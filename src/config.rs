use crate::api::types::NATIVE_LANGUAGES;
use crate::defaults;
use crate::error::{Result, SchoolError};
use crate::karaoke::KaraokeTimeouts;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub user: UserConfig,
    pub stream: StreamConfig,
    pub karaoke: KaraokeConfig,
}

/// Solving service connection
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub base_url: String,
    pub request_timeout_secs: u64,
}

/// Learner identity and defaults for new tasks
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct UserConfig {
    /// Set by `schoolai register`.
    pub user_id: Option<String>,
    pub native_language: String,
    pub grade: u8,
}

/// Solving stream parsing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct StreamConfig {
    /// Tolerate `event:`/`id:` lines in front of the `data:` line of a frame.
    pub accept_event_lines: bool,
}

/// Speech practice backends
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct KaraokeConfig {
    /// TTS command template; empty prints lines instead of speaking them.
    pub synthesizer_command: Vec<String>,
    pub recognizer: RecognizerMode,
    pub recognizer_command: Vec<String>,
    pub synthesis_timeout_secs: u64,
    pub recognition_timeout_secs: u64,
}

/// Where learner transcripts come from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RecognizerMode {
    /// No recognition available; practice is unsupported.
    None,
    /// Typed on the terminal.
    Stdin,
    /// Stdout of `recognizer_command`.
    Command,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: defaults::REQUEST_TIMEOUT_SECS,
        }
    }
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            user_id: None,
            native_language: defaults::DEFAULT_LANGUAGE.to_string(),
            grade: defaults::DEFAULT_GRADE,
        }
    }
}

impl Default for KaraokeConfig {
    fn default() -> Self {
        Self {
            synthesizer_command: Vec::new(),
            recognizer: RecognizerMode::Stdin,
            recognizer_command: Vec::new(),
            synthesis_timeout_secs: defaults::SYNTHESIS_TIMEOUT_SECS,
            recognition_timeout_secs: defaults::RECOGNITION_TIMEOUT_SECS,
        }
    }
}

impl KaraokeConfig {
    pub fn timeouts(&self) -> KaraokeTimeouts {
        KaraokeTimeouts {
            synthesis: Duration::from_secs(self.synthesis_timeout_secs),
            recognition: Duration::from_secs(self.recognition_timeout_secs),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Missing fields use default values; out-of-range values are rejected.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if file doesn't exist
    ///
    /// Invalid TOML is still an error.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Err(SchoolError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                Ok(Self::default())
            }
            other => other,
        }
    }

    /// Write the configuration, creating parent directories as needed.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_display_toml()?)?;
        Ok(())
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - SCHOOLAI_SERVER → server.base_url
    /// - SCHOOLAI_USER_ID → user.user_id
    /// - SCHOOLAI_LANGUAGE → user.native_language
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(server) = std::env::var("SCHOOLAI_SERVER")
            && !server.is_empty()
        {
            self.server.base_url = server;
        }

        if let Ok(user_id) = std::env::var("SCHOOLAI_USER_ID")
            && !user_id.is_empty()
        {
            self.user.user_id = Some(user_id);
        }

        if let Ok(language) = std::env::var("SCHOOLAI_LANGUAGE")
            && !language.is_empty()
        {
            self.user.native_language = language;
        }

        self
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/schoolai/config.toml on Linux
    pub fn default_path() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join("schoolai").join("config.toml"))
            .ok_or_else(|| SchoolError::Other("Could not determine config directory".to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        if !(defaults::MIN_GRADE..=defaults::MAX_GRADE).contains(&self.user.grade) {
            return Err(invalid(
                "user.grade",
                format!(
                    "must be between {} and {}",
                    defaults::MIN_GRADE,
                    defaults::MAX_GRADE
                ),
            ));
        }
        if !NATIVE_LANGUAGES.contains(&self.user.native_language.as_str()) {
            return Err(invalid(
                "user.native_language",
                format!("must be one of {}", NATIVE_LANGUAGES.join(", ")),
            ));
        }
        if self.server.request_timeout_secs == 0 {
            return Err(invalid("server.request_timeout_secs", "must be positive"));
        }
        if self.karaoke.synthesis_timeout_secs == 0 {
            return Err(invalid("karaoke.synthesis_timeout_secs", "must be positive"));
        }
        if self.karaoke.recognition_timeout_secs == 0 {
            return Err(invalid("karaoke.recognition_timeout_secs", "must be positive"));
        }
        if self.karaoke.recognizer == RecognizerMode::Command
            && self.karaoke.recognizer_command.is_empty()
        {
            return Err(invalid(
                "karaoke.recognizer_command",
                "required when karaoke.recognizer = \"command\"",
            ));
        }
        Ok(())
    }

    pub fn to_display_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| SchoolError::ConfigParse {
            message: e.to_string(),
        })
    }

    /// Read one value by dotted key, e.g. `server.base_url`.
    ///
    /// Strings print bare; other values print as TOML. Unset optional keys
    /// print as an empty string.
    pub fn get_value_by_path(&self, key: &str) -> Result<String> {
        let current = to_table(self)?;
        match lookup(&current, key) {
            Some(toml::Value::String(s)) => Ok(s.clone()),
            Some(value) => Ok(value.to_string()),
            None if lookup(&key_template()?, key).is_some() => Ok(String::new()),
            None => Err(invalid(key, "unknown configuration key")),
        }
    }

    /// Set one value by dotted key in the file at `path` and save it.
    ///
    /// The raw string is converted to the key's type. The result must still
    /// form a valid configuration or nothing is written.
    pub fn set_value_by_path(path: &Path, key: &str, raw: &str) -> Result<()> {
        let mut table = match fs::read_to_string(path) {
            Ok(contents) => toml::from_str::<toml::Table>(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => toml::Table::new(),
            Err(e) => return Err(e.into()),
        };

        let template = key_template()?;
        let Some(existing) = lookup(&template, key) else {
            return Err(invalid(key, "unknown configuration key"));
        };
        let value = convert_value(key, existing, raw)?;
        insert(&mut table, key, value);

        let config = Config::deserialize(toml::Value::Table(table))
            .map_err(|e| invalid(key, e.to_string()))?;
        config.validate()?;
        config.save(path)
    }
}

fn invalid(key: &str, message: impl Into<String>) -> SchoolError {
    SchoolError::ConfigInvalidValue {
        key: key.to_string(),
        message: message.into(),
    }
}

fn to_table(config: &Config) -> Result<toml::Table> {
    match toml::Value::try_from(config) {
        Ok(toml::Value::Table(table)) => Ok(table),
        Ok(_) => Err(SchoolError::ConfigParse {
            message: "configuration did not serialize to a table".to_string(),
        }),
        Err(e) => Err(SchoolError::ConfigParse {
            message: e.to_string(),
        }),
    }
}

/// Every settable key with a value of the right type.
fn key_template() -> Result<toml::Table> {
    let mut config = Config::default();
    config.user.user_id = Some(String::new());
    to_table(&config)
}

fn lookup<'a>(table: &'a toml::Table, key: &str) -> Option<&'a toml::Value> {
    let (section, field) = key.split_once('.')?;
    table.get(section)?.as_table()?.get(field)
}

fn insert(table: &mut toml::Table, key: &str, value: toml::Value) {
    let Some((section, field)) = key.split_once('.') else {
        return;
    };
    let entry = table
        .entry(section)
        .or_insert_with(|| toml::Value::Table(toml::Table::new()));
    if !entry.is_table() {
        *entry = toml::Value::Table(toml::Table::new());
    }
    if let toml::Value::Table(section) = entry {
        section.insert(field.to_string(), value);
    }
}

/// Parse `raw` into the same TOML type as `like`.
fn convert_value(key: &str, like: &toml::Value, raw: &str) -> Result<toml::Value> {
    match like {
        toml::Value::String(_) => Ok(toml::Value::String(raw.to_string())),
        toml::Value::Integer(_) => raw
            .trim()
            .parse::<i64>()
            .map(toml::Value::Integer)
            .map_err(|_| invalid(key, format!("expected an integer, got '{raw}'"))),
        toml::Value::Boolean(_) => raw
            .trim()
            .parse::<bool>()
            .map(toml::Value::Boolean)
            .map_err(|_| invalid(key, format!("expected true or false, got '{raw}'"))),
        toml::Value::Array(_) => Ok(parse_array(raw)),
        _ => Err(invalid(key, "cannot be set from the command line")),
    }
}

/// A TOML array literal, or whitespace-separated words.
fn parse_array(raw: &str) -> toml::Value {
    let literal = toml::from_str::<toml::Table>(&format!("value = {raw}"))
        .ok()
        .and_then(|mut t| t.remove("value"))
        .filter(toml::Value::is_array);

    literal.unwrap_or_else(|| {
        toml::Value::Array(
            raw.split_whitespace()
                .map(|word| toml::Value::String(word.to_string()))
                .collect(),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Mutex;
    use tempfile::{NamedTempFile, TempDir};

    // Mutex to serialize tests that modify environment variables
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    // SAFETY: These helpers are only used in tests with ENV_LOCK held,
    // ensuring no concurrent access to environment variables.
    fn set_env(key: &str, value: &str) {
        unsafe { std::env::set_var(key, value) }
    }

    fn remove_env(key: &str) {
        unsafe { std::env::remove_var(key) }
    }

    fn clear_schoolai_env() {
        remove_env("SCHOOLAI_SERVER");
        remove_env("SCHOOLAI_USER_ID");
        remove_env("SCHOOLAI_LANGUAGE");
    }

    fn write_config(contents: &str) -> NamedTempFile {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(contents.as_bytes()).unwrap();
        temp_file
    }

    #[test]
    fn test_default_config_has_correct_values() {
        let config = Config::default();

        assert_eq!(config.server.base_url, "http://localhost:8000");
        assert_eq!(config.server.request_timeout_secs, 30);

        assert_eq!(config.user.user_id, None);
        assert_eq!(config.user.native_language, "ru");
        assert_eq!(config.user.grade, 5);

        assert!(!config.stream.accept_event_lines);

        assert!(config.karaoke.synthesizer_command.is_empty());
        assert_eq!(config.karaoke.recognizer, RecognizerMode::Stdin);
        assert_eq!(config.karaoke.synthesis_timeout_secs, 30);
        assert_eq!(config.karaoke.recognition_timeout_secs, 15);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_toml_file() {
        let temp_file = write_config(
            r#"
            [server]
            base_url = "https://school.example"
            request_timeout_secs = 10

            [user]
            user_id = "u-1"
            native_language = "en"
            grade = 7

            [stream]
            accept_event_lines = true

            [karaoke]
            synthesizer_command = ["espeak-ng", "-v", "{lang}"]
            recognizer = "command"
            recognizer_command = ["my-stt", "--lang", "{lang}"]
            recognition_timeout_secs = 20
        "#,
        );

        let config = Config::load(temp_file.path()).unwrap();

        assert_eq!(config.server.base_url, "https://school.example");
        assert_eq!(config.server.request_timeout_secs, 10);
        assert_eq!(config.user.user_id.as_deref(), Some("u-1"));
        assert_eq!(config.user.native_language, "en");
        assert_eq!(config.user.grade, 7);
        assert!(config.stream.accept_event_lines);
        assert_eq!(config.karaoke.synthesizer_command, vec!["espeak-ng", "-v", "{lang}"]);
        assert_eq!(config.karaoke.recognizer, RecognizerMode::Command);
        assert_eq!(
            config.karaoke.timeouts(),
            KaraokeTimeouts {
                synthesis: Duration::from_secs(30),
                recognition: Duration::from_secs(20),
            }
        );
    }

    #[test]
    fn test_load_partial_config_uses_defaults() {
        let temp_file = write_config("[user]\ngrade = 9\n");

        let config = Config::load(temp_file.path()).unwrap();

        assert_eq!(config.user.grade, 9);
        assert_eq!(config.user.native_language, "ru");
        assert_eq!(config.server, ServerConfig::default());
        assert_eq!(config.karaoke, KaraokeConfig::default());
    }

    #[test]
    fn test_load_rejects_out_of_range_grade() {
        let temp_file = write_config("[user]\ngrade = 12\n");
        match Config::load(temp_file.path()) {
            Err(SchoolError::ConfigInvalidValue { key, .. }) => assert_eq!(key, "user.grade"),
            other => panic!("Expected ConfigInvalidValue, got: {:?}", other),
        }
    }

    #[test]
    fn test_command_recognizer_requires_command() {
        let temp_file = write_config("[karaoke]\nrecognizer = \"command\"\n");
        assert!(Config::load(temp_file.path()).is_err());
    }

    #[test]
    fn test_invalid_toml_returns_error() {
        let temp_file = write_config("[server\nbase_url = \"broken\n");
        assert!(matches!(
            Config::load(temp_file.path()),
            Err(SchoolError::Config(_))
        ));
    }

    #[test]
    fn test_load_or_default_returns_default_for_missing_file() {
        let missing_path = Path::new("/tmp/nonexistent_schoolai_config_12345.toml");
        let config = Config::load_or_default(missing_path).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_or_default_errors_on_invalid_toml() {
        let temp_file = write_config("[server\n");
        assert!(Config::load_or_default(temp_file.path()).is_err());
    }

    #[test]
    fn test_env_override_server_and_user() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_schoolai_env();

        set_env("SCHOOLAI_SERVER", "http://10.0.0.2:8000");
        set_env("SCHOOLAI_USER_ID", "u-env");
        let config = Config::default().with_env_overrides();

        assert_eq!(config.server.base_url, "http://10.0.0.2:8000");
        assert_eq!(config.user.user_id.as_deref(), Some("u-env"));
        assert_eq!(config.user.native_language, "ru"); // Not overridden

        clear_schoolai_env();
    }

    #[test]
    fn test_env_override_language() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_schoolai_env();

        set_env("SCHOOLAI_LANGUAGE", "en");
        let config = Config::default().with_env_overrides();
        assert_eq!(config.user.native_language, "en");

        clear_schoolai_env();
    }

    #[test]
    fn test_env_override_empty_string_ignored() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_schoolai_env();

        set_env("SCHOOLAI_SERVER", "");
        let config = Config::default().with_env_overrides();
        assert_eq!(config.server.base_url, "http://localhost:8000");

        clear_schoolai_env();
    }

    #[test]
    fn test_default_path_is_xdg_compliant() {
        let path = Config::default_path().unwrap();
        let path_str = path.to_string_lossy();

        assert!(path_str.contains("schoolai"));
        assert!(path_str.ends_with("config.toml"));
    }

    #[test]
    fn test_get_value_by_path() {
        let config = Config::default();
        assert_eq!(
            config.get_value_by_path("server.base_url").unwrap(),
            "http://localhost:8000"
        );
        assert_eq!(config.get_value_by_path("user.grade").unwrap(), "5");
        assert_eq!(
            config.get_value_by_path("stream.accept_event_lines").unwrap(),
            "false"
        );
        assert_eq!(config.get_value_by_path("karaoke.recognizer").unwrap(), "stdin");
        assert_eq!(config.get_value_by_path("user.user_id").unwrap(), "");
        assert!(config.get_value_by_path("user.nickname").is_err());
        assert!(config.get_value_by_path("server").is_err());
    }

    #[test]
    fn test_set_value_by_path_creates_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        Config::set_value_by_path(&path, "user.grade", "8").unwrap();
        Config::set_value_by_path(&path, "user.user_id", "u-9").unwrap();
        Config::set_value_by_path(&path, "stream.accept_event_lines", "true").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.user.grade, 8);
        assert_eq!(config.user.user_id.as_deref(), Some("u-9"));
        assert!(config.stream.accept_event_lines);
    }

    #[test]
    fn test_set_value_by_path_arrays() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        Config::set_value_by_path(&path, "karaoke.synthesizer_command", "espeak-ng -v {lang}")
            .unwrap();
        Config::set_value_by_path(
            &path,
            "karaoke.recognizer_command",
            r#"["my stt", "--lang", "{lang}"]"#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.karaoke.synthesizer_command, vec!["espeak-ng", "-v", "{lang}"]);
        assert_eq!(config.karaoke.recognizer_command, vec!["my stt", "--lang", "{lang}"]);
    }

    #[test]
    fn test_set_value_by_path_rejects_bad_values() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        assert!(Config::set_value_by_path(&path, "user.grade", "five").is_err());
        assert!(Config::set_value_by_path(&path, "user.grade", "0").is_err());
        assert!(Config::set_value_by_path(&path, "karaoke.recognizer", "whisper").is_err());
        assert!(Config::set_value_by_path(&path, "no.such_key", "1").is_err());
        assert!(!path.exists(), "rejected values must not be written");
    }

    #[test]
    fn test_set_value_preserves_other_sections() {
        let temp_file = write_config("[server]\nbase_url = \"https://school.example\"\n");

        Config::set_value_by_path(temp_file.path(), "user.native_language", "sah").unwrap();

        let config = Config::load(temp_file.path()).unwrap();
        assert_eq!(config.server.base_url, "https://school.example");
        assert_eq!(config.user.native_language, "sah");
    }
}
