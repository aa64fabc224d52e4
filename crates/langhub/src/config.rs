use langhub_core::Result;
use serde::Deserialize;
use std::time::Duration;

/// Root configuration for langhub.
///
/// Usually handed over by the editor as JSON. Every field has a default, so
/// an empty object is a valid configuration.
///
/// # Examples
///
/// ```
/// use langhub::config::LanghubConfig;
///
/// let json = r#"{
///     "highlight": { "limit": 20 },
///     "signature_help": { "trigger_wait_ms": 250 }
/// }"#;
///
/// let config = LanghubConfig::from_json(json).unwrap();
/// assert_eq!(config.highlight.limit, 20);
/// assert_eq!(config.signature_help.trigger_wait_ms, 250);
/// assert!(config.code_action.auto_apply_single);
/// ```
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
pub struct LanghubConfig {
    #[serde(default)]
    pub highlight: HighlightConfig,
    #[serde(default)]
    pub code_action: CodeActionConfig,
    #[serde(default)]
    pub signature_help: SignatureHelpConfig,
    #[serde(default)]
    pub formatting: FormattingConfig,
}

impl LanghubConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Parses editor-provided settings, falling back to defaults when absent.
    pub fn from_value(value: Option<serde_json::Value>) -> Result<Self> {
        match value {
            Some(value) => Ok(serde_json::from_value(value)?),
            None => Ok(Self::default()),
        }
    }
}

/// Symbol highlight settings.
///
/// # Defaults
///
/// - `enabled`: `true`
/// - `timeout_ms`: `300`
/// - `limit`: `100`
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct HighlightConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_highlight_timeout")]
    pub timeout_ms: u64,
    /// Maximum number of ranges rendered per window
    #[serde(default = "default_highlight_limit")]
    pub limit: usize,
    #[serde(default)]
    pub styles: HighlightStyles,
}

impl HighlightConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_ms: default_highlight_timeout(),
            limit: default_highlight_limit(),
            styles: HighlightStyles::default(),
        }
    }
}

/// Style group names handed to the editor, one per highlight kind.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct HighlightStyles {
    #[serde(default = "default_text_style")]
    pub text: String,
    #[serde(default = "default_read_style")]
    pub read: String,
    #[serde(default = "default_write_style")]
    pub write: String,
}

impl Default for HighlightStyles {
    fn default() -> Self {
        Self {
            text: default_text_style(),
            read: default_read_style(),
            write: default_write_style(),
        }
    }
}

/// Code action settings.
///
/// # Defaults
///
/// - `timeout_ms`: `500`
/// - `auto_apply_single`: `true` (a lone quickfix or `source.fixAll` skips the picker)
/// - `show_disabled`: `false`
/// - `execute_timeout_ms`: `1000`
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct CodeActionConfig {
    #[serde(default = "default_code_action_timeout")]
    pub timeout_ms: u64,
    #[serde(default = "default_true")]
    pub auto_apply_single: bool,
    #[serde(default)]
    pub show_disabled: bool,
    #[serde(default = "default_execute_timeout")]
    pub execute_timeout_ms: u64,
}

impl CodeActionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn execute_timeout(&self) -> Duration {
        Duration::from_millis(self.execute_timeout_ms)
    }
}

impl Default for CodeActionConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_code_action_timeout(),
            auto_apply_single: true,
            show_disabled: false,
            execute_timeout_ms: default_execute_timeout(),
        }
    }
}

/// Signature help settings.
///
/// `trigger_wait_ms` bounds how long a trigger may stay pending. Values
/// outside 50..=5000 are clamped with a warning.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SignatureHelpConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(
        default = "default_trigger_wait",
        deserialize_with = "deserialize_trigger_wait"
    )]
    pub trigger_wait_ms: u64,
    #[serde(default)]
    pub hide_on_text_change: bool,
}

impl SignatureHelpConfig {
    pub fn trigger_wait(&self) -> Duration {
        Duration::from_millis(self.trigger_wait_ms)
    }
}

impl Default for SignatureHelpConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            trigger_wait_ms: default_trigger_wait(),
            hide_on_text_change: false,
        }
    }
}

/// Formatting settings.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct FormattingConfig {
    #[serde(default = "default_formatting_timeout")]
    pub timeout_ms: u64,
    #[serde(default)]
    pub format_on_save: bool,
    /// Languages formatted on save; empty means every language
    #[serde(default)]
    pub format_on_save_languages: Vec<String>,
}

impl FormattingConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Whether a buffer of `language_id` should be formatted before saving.
    pub fn formats_on_save(&self, language_id: &str) -> bool {
        self.format_on_save
            && (self.format_on_save_languages.is_empty()
                || self
                    .format_on_save_languages
                    .iter()
                    .any(|language| language == language_id))
    }
}

impl Default for FormattingConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_formatting_timeout(),
            format_on_save: false,
            format_on_save_languages: Vec::new(),
        }
    }
}

// Default value functions
const fn default_true() -> bool {
    true
}

const fn default_highlight_timeout() -> u64 {
    300
}

const fn default_highlight_limit() -> usize {
    100
}

fn default_text_style() -> String {
    "LanghubHighlightText".to_string()
}

fn default_read_style() -> String {
    "LanghubHighlightRead".to_string()
}

fn default_write_style() -> String {
    "LanghubHighlightWrite".to_string()
}

const fn default_code_action_timeout() -> u64 {
    500
}

const fn default_execute_timeout() -> u64 {
    1000
}

const fn default_trigger_wait() -> u64 {
    500
}

const fn default_formatting_timeout() -> u64 {
    1000
}

const MIN_TRIGGER_WAIT_MS: u64 = 50;
const MAX_TRIGGER_WAIT_MS: u64 = 5000;

fn validate_trigger_wait(wait_ms: u64) -> u64 {
    let clamped = wait_ms.clamp(MIN_TRIGGER_WAIT_MS, MAX_TRIGGER_WAIT_MS);
    if clamped != wait_ms {
        tracing::warn!(
            "trigger_wait_ms {} outside {}..={}, using {}",
            wait_ms,
            MIN_TRIGGER_WAIT_MS,
            MAX_TRIGGER_WAIT_MS,
            clamped
        );
    }
    clamped
}

fn deserialize_trigger_wait<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let wait_ms = u64::deserialize(deserializer)?;
    Ok(validate_trigger_wait(wait_ms))
}
