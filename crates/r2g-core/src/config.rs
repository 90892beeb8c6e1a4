use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::cache_size::{max_available_memory, CacheSettings, CacheSizeConfig};
use crate::template::Template;
use crate::types::Identity;

/// Default author used for the bootstrap commit and for tags.
pub const DEFAULT_USER_NAME: &str = "RTC 2 git";
pub const DEFAULT_USER_EMAIL: &str = "rtc2git@rtc.to";
pub const DEFAULT_COMMIT_MESSAGE_FORMAT: &str = "%s %s";
pub const DEFAULT_WORKITEM_NUMBER_FORMAT: &str = "%s";
pub const DEFAULT_WORKITEM_NUMBER_DELIMITER: &str = " ";

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("io: {0}")]
    Io(String),
    #[error("parse: {0}")]
    Parse(String),
    #[error("validation: {0}")]
    Validation(String),
}

// ---------------------------------------------------------------------------
// Raw document
// ---------------------------------------------------------------------------

/// The configuration file as written by the operator.
///
/// Keys are the dotted option names (`user.name`, `commit.message.format`,
/// `rtc.workitem.number.format`, ...), which TOML maps onto the nested
/// sections below. Call [`RawConfig::validate`] to obtain the typed
/// [`MigratorConfig`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfig {
    #[serde(default)]
    pub user: UserSection,
    #[serde(default)]
    pub commit: CommitSection,
    #[serde(default)]
    pub gitattributes: Option<ListValue>,
    #[serde(default)]
    pub global: GlobalSection,
    #[serde(default)]
    pub ignore: IgnoreSection,
    #[serde(default)]
    pub rtc: RtcSection,
    #[serde(default)]
    pub packedgitopenfiles: Option<ScalarValue>,
    #[serde(default)]
    pub packedgitlimit: Option<ScalarValue>,
    #[serde(default)]
    pub packedgitwindowsize: Option<ScalarValue>,
    #[serde(default)]
    pub packedgitmmap: Option<ScalarValue>,
    #[serde(default)]
    pub deltabasecachelimit: Option<ScalarValue>,
    #[serde(default)]
    pub streamfilethreshold: Option<ScalarValue>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserSection {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommitSection {
    #[serde(default)]
    pub message: FormatSection,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FormatSection {
    #[serde(default)]
    pub format: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GlobalSection {
    #[serde(default)]
    pub gitignore: EntriesSection,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EntriesSection {
    #[serde(default)]
    pub entries: Option<ListValue>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IgnoreSection {
    #[serde(default)]
    pub file: ExtensionsSection,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExtensionsSection {
    #[serde(default)]
    pub extensions: Option<ListValue>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RtcSection {
    #[serde(default)]
    pub workitem: WorkItemSection,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkItemSection {
    #[serde(default)]
    pub number: WorkItemNumberSection,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkItemNumberSection {
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub delimiter: Option<String>,
}

/// A `;`-separated string or a TOML array of strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ListValue {
    Joined(String),
    Items(Vec<String>),
}

impl ListValue {
    /// Elements trimmed, empties dropped, original order kept.
    pub fn elements(&self) -> Vec<String> {
        let raw: Vec<&str> = match self {
            ListValue::Joined(s) => s.split(';').collect(),
            ListValue::Items(items) => items.iter().map(String::as_str).collect(),
        };
        raw.into_iter()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ToOwned::to_owned)
            .collect()
    }
}

/// Size and flag options may be written as strings, integers or booleans.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScalarValue {
    Text(String),
    Integer(i64),
    Flag(bool),
}

impl ScalarValue {
    fn as_text(&self) -> String {
        match self {
            ScalarValue::Text(s) => s.clone(),
            ScalarValue::Integer(n) => n.to_string(),
            ScalarValue::Flag(b) => b.to_string(),
        }
    }
}

impl RawConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Validate against the memory actually available to this process.
    pub fn validate(&self) -> Result<MigratorConfig, ConfigError> {
        self.validate_with_memory(max_available_memory())
    }

    /// Validate the document into a [`MigratorConfig`], bounding the stream
    /// file threshold by `max_memory`.
    pub fn validate_with_memory(&self, max_memory: u64) -> Result<MigratorConfig, ConfigError> {
        let commit_message_format = parse_template(
            "commit.message.format",
            self.commit.message.format.as_deref(),
            DEFAULT_COMMIT_MESSAGE_FORMAT,
            2,
        )?;
        let workitem_number_format = parse_template(
            "rtc.workitem.number.format",
            self.rtc.workitem.number.format.as_deref(),
            DEFAULT_WORKITEM_NUMBER_FORMAT,
            1,
        )?;

        let user_name = self
            .user
            .name
            .clone()
            .unwrap_or_else(|| DEFAULT_USER_NAME.to_string());
        if user_name.trim().is_empty() {
            return Err(ConfigError::Validation("user.name must not be empty".into()));
        }
        let user_email = self
            .user
            .email
            .clone()
            .unwrap_or_else(|| DEFAULT_USER_EMAIL.to_string());

        let mut ignored_file_extensions: Vec<String> = Vec::new();
        for ext in elements(&self.ignore.file.extensions) {
            if !ignored_file_extensions.contains(&ext) {
                ignored_file_extensions.push(ext);
            }
        }

        let text = |v: &Option<ScalarValue>| v.as_ref().map(ScalarValue::as_text);
        let cache_settings = CacheSettings {
            packed_git_open_files: text(&self.packedgitopenfiles),
            packed_git_limit: text(&self.packedgitlimit),
            packed_git_window_size: text(&self.packedgitwindowsize),
            packed_git_mmap: text(&self.packedgitmmap),
            delta_base_cache_limit: text(&self.deltabasecachelimit),
            stream_file_threshold: text(&self.streamfilethreshold),
        };

        Ok(MigratorConfig {
            user_name,
            user_email,
            commit_message_format,
            gitattributes: elements(&self.gitattributes),
            global_gitignore_entries: elements(&self.global.gitignore.entries),
            ignored_file_extensions,
            workitem_number_format,
            workitem_number_delimiter: self
                .rtc
                .workitem
                .number
                .delimiter
                .clone()
                .unwrap_or_else(|| DEFAULT_WORKITEM_NUMBER_DELIMITER.to_string()),
            cache: CacheSizeConfig::from_settings(&cache_settings, max_memory),
        })
    }
}

fn elements(value: &Option<ListValue>) -> Vec<String> {
    value.as_ref().map(ListValue::elements).unwrap_or_default()
}

fn parse_template(
    key: &str,
    value: Option<&str>,
    default: &str,
    max_arity: usize,
) -> Result<Template, ConfigError> {
    let template = Template::parse(value.unwrap_or(default))
        .map_err(|e| ConfigError::Validation(format!("{key}: {e}")))?;
    if template.arity() > max_arity {
        return Err(ConfigError::Validation(format!(
            "{key}: `{template}` uses {} arguments, at most {max_arity} are available",
            template.arity()
        )));
    }
    Ok(template)
}

// ---------------------------------------------------------------------------
// Typed configuration
// ---------------------------------------------------------------------------

/// Validated, immutable configuration of the commit-translation engine.
#[derive(Debug, Clone)]
pub struct MigratorConfig {
    pub user_name: String,
    pub user_email: String,
    /// Applied to (work-item numbers, comment).
    pub commit_message_format: Template,
    pub gitattributes: Vec<String>,
    pub global_gitignore_entries: Vec<String>,
    /// Suffixes whose files go to the root `.gitignore` instead of the index.
    pub ignored_file_extensions: Vec<String>,
    pub workitem_number_format: Template,
    pub workitem_number_delimiter: String,
    pub cache: CacheSizeConfig,
}

impl Default for MigratorConfig {
    fn default() -> Self {
        Self {
            user_name: DEFAULT_USER_NAME.to_string(),
            user_email: DEFAULT_USER_EMAIL.to_string(),
            // the parsed forms of the DEFAULT_*_FORMAT constants
            commit_message_format: Template::sequential(2, " "),
            gitattributes: Vec::new(),
            global_gitignore_entries: Vec::new(),
            ignored_file_extensions: Vec::new(),
            workitem_number_format: Template::sequential(1, ""),
            workitem_number_delimiter: DEFAULT_WORKITEM_NUMBER_DELIMITER.to_string(),
            cache: CacheSizeConfig::from_settings(&CacheSettings::default(), max_available_memory()),
        }
    }
}

impl MigratorConfig {
    /// Load and validate a TOML configuration file.
    pub fn load_from(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let text = std::fs::read_to_string(&path)
            .map_err(|e| ConfigError::Io(format!("{}: {e}", path.display())))?;
        RawConfig::from_toml_str(&text)?.validate()
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        RawConfig::from_toml_str(text)?.validate()
    }

    /// The configured default identity at the given instant.
    pub fn default_identity(&self, when_millis: i64) -> Identity {
        Identity::new(&self.user_name, &self.user_email, when_millis)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
