//! Engine configuration.
//!
//! Loaded from an optional YAML file. Every key is optional:
//!
//! ```yaml
//! placeholder: "?"
//! sentinel: "foo"
//! error_marker: "#ERROR"
//! retry:
//!   max_attempts: 3
//!   initial_backoff_ms: 50
//! functions:
//!   - name: Label
//!     params:
//!       - name: first
//!       - name: last
//!         default: Smith
//!       - name: title
//!         default: null
//!     template: "{title}{first} {last}"
//! ```

use crate::core::registry::{Callable, FunctionDescriptor, FunctionRegistry};
use crate::error::{CallError, SheetError, SheetResult};
use crate::functions;
use crate::source::RetryPolicy;
use crate::types::{Arguments, DefaultValue, Parameter, PLACEHOLDER, SENTINEL_ARGUMENT};
use regex::Regex;
use serde::{Deserialize, Deserializer};
use std::path::Path;
use std::sync::{Arc, OnceLock};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Cell content that requests computation
    pub placeholder: String,
    /// Argument used when neither a column nor a default supplies one
    pub sentinel: String,
    /// Written into cells whose function failed; `None` leaves the placeholder
    pub error_marker: Option<String>,
    pub retry: RetryPolicy,
    pub functions: Vec<TemplateFunction>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            placeholder: PLACEHOLDER.to_string(),
            sentinel: SENTINEL_ARGUMENT.to_string(),
            error_marker: None,
            retry: RetryPolicy::default(),
            functions: Vec::new(),
        }
    }
}

impl EngineConfig {
    pub fn from_yaml(content: &str) -> SheetResult<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> SheetResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_yaml(&content)?;
        debug!(path = %path.display(), functions = config.functions.len(), "loaded config");
        Ok(config)
    }

    /// Load `path` if given, defaults otherwise
    pub fn load_optional(path: Option<&Path>) -> SheetResult<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> SheetResult<()> {
        if self.placeholder.is_empty() {
            return Err(SheetError::Config(
                "placeholder must not be empty (empty cells mean \"leave blank\")".to_string(),
            ));
        }
        for function in &self.functions {
            function.validate()?;
        }
        Ok(())
    }

    /// Builtins first, then template functions. On a name clash the earlier
    /// registration wins and the clash is recorded in the registry.
    pub fn build_registry(&self) -> SheetResult<FunctionRegistry> {
        let mut builder = FunctionRegistry::builder();
        functions::register_builtins(&mut builder);
        for function in &self.functions {
            builder.register_descriptor(function.descriptor()?);
        }
        Ok(builder.build())
    }
}

/// A user-defined function that renders `{param}` references in a template
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TemplateFunction {
    pub name: String,
    #[serde(default)]
    pub params: Vec<TemplateParam>,
    pub template: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TemplateParam {
    pub name: String,
    /// Missing key: no default. `null`: the "no value" default.
    #[serde(default, deserialize_with = "present_default")]
    pub default: Option<Option<String>>,
}

fn present_default<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

impl TemplateParam {
    fn parameter(&self) -> Parameter {
        Parameter {
            name: self.name.clone(),
            default: self.default.as_ref().map(|d| match d {
                Some(text) => DefaultValue::Text(text.clone()),
                None => DefaultValue::Absent,
            }),
        }
    }
}

fn reference_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid regex"))
}

impl TemplateFunction {
    pub fn validate(&self) -> SheetResult<()> {
        if self.name.trim().is_empty() {
            return Err(SheetError::Config("function name must not be empty".to_string()));
        }
        for caps in reference_pattern().captures_iter(&self.template) {
            let reference = &caps[1];
            if !self
                .params
                .iter()
                .any(|p| p.name.eq_ignore_ascii_case(reference))
            {
                return Err(SheetError::Config(format!(
                    "function '{}' template references unknown parameter '{}'",
                    self.name, reference
                )));
            }
        }
        Ok(())
    }

    pub fn descriptor(&self) -> SheetResult<FunctionDescriptor> {
        self.validate()?;
        let template = self.template.clone();
        let parameters = self.params.iter().map(TemplateParam::parameter).collect();

        let render: Callable = Arc::new(move |args: &Arguments| -> Result<String, CallError> {
            Ok(reference_pattern()
                .replace_all(&template, |caps: &regex::Captures| {
                    args.text_or_empty(&caps[1]).to_string()
                })
                .into_owned())
        });

        Ok(FunctionDescriptor::new(self.name.clone(), parameters, render))
    }
}
