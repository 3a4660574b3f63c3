//! Capability constraint schema and per-map validation.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use strum::{Display, EnumString};
use tracing::warn;

use super::{CAPS_TARGET, CapabilityError};

/// JSON type a capability value must have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display)]
#[strum(serialize_all = "lowercase")]
pub enum ValueType {
    /// A JSON string.
    String,
    /// A JSON number.
    Number,
    /// `true` or `false`.
    Boolean,
    /// A JSON object or array.
    Object,
}

impl ValueType {
    fn accepts(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::Object => value.is_object() || value.is_array(),
        }
    }
}

/// Rules for a single capability.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Constraint {
    presence: bool,
    value_type: Option<ValueType>,
    inclusion: Vec<String>,
    inclusion_case_insensitive: Vec<String>,
    deprecated: bool,
}

impl Constraint {
    /// A constraint with no rules.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The capability must be present and non-null.
    #[must_use]
    pub fn required(mut self) -> Self {
        self.presence = true;
        self
    }

    /// The value must have `value_type`.
    #[must_use]
    pub fn of_type(mut self, value_type: ValueType) -> Self {
        self.value_type = Some(value_type);
        self
    }

    /// The value must equal one of `options`.
    #[must_use]
    pub fn one_of<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inclusion = options.into_iter().map(Into::into).collect();
        self
    }

    /// The value must equal one of `options`, ignoring ASCII case.
    #[must_use]
    pub fn one_of_ignoring_case<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inclusion_case_insensitive = options.into_iter().map(Into::into).collect();
        self
    }

    /// Using the capability logs a deprecation warning.
    #[must_use]
    pub fn deprecated(mut self) -> Self {
        self.deprecated = true;
        self
    }

    /// Whether the capability must be present.
    #[must_use]
    pub const fn is_required(&self) -> bool {
        self.presence
    }

    fn check(&self, name: &str, value: Option<&Value>, demand_presence: bool, out: &mut Vec<String>) {
        let Some(value) = value else {
            if demand_presence && self.presence {
                out.push(format!("{name} can't be blank"));
            }
            return;
        };
        if let Some(value_type) = self.value_type
            && !value_type.accepts(value)
        {
            out.push(format!("{name} must be of type {value_type}"));
        }
        if !self.inclusion.is_empty()
            && !value
                .as_str()
                .is_some_and(|text| self.inclusion.iter().any(|option| option == text))
        {
            out.push(format!("{name} {} is not included in the list", display(value)));
        }
        if !self.inclusion_case_insensitive.is_empty()
            && !value.as_str().is_some_and(|text| {
                self.inclusion_case_insensitive
                    .iter()
                    .any(|option| option.eq_ignore_ascii_case(text))
            })
        {
            out.push(format!(
                "{name} {} not part of {}",
                display(value),
                self.inclusion_case_insensitive.join(",")
            ));
        }
        if self.deprecated {
            warn!(target: CAPS_TARGET, capability = name, "{name} is a deprecated capability");
        }
    }
}

fn display(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Named capability constraints.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Constraints {
    rules: BTreeMap<String, Constraint>,
}

impl Constraints {
    /// An empty schema; every map validates.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the rule for `name`.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, constraint: Constraint) -> Self {
        self.insert(name, constraint);
        self
    }

    /// Adds or replaces the rule for `name`.
    pub fn insert(&mut self, name: impl Into<String>, constraint: Constraint) {
        self.rules.insert(name.into(), constraint);
    }

    /// Rule for `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Constraint> {
        self.rules.get(name)
    }

    /// Rules in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Constraint)> {
        self.rules.iter().map(|(name, rule)| (name.as_str(), rule))
    }

    /// The baseline schema for mobile automation sessions.
    #[must_use]
    pub fn desired_defaults() -> Self {
        let boolean = || Constraint::new().of_type(ValueType::Boolean);
        let string = || Constraint::new().of_type(ValueType::String);
        Self::new()
            .with(
                "platformName",
                string()
                    .required()
                    .one_of(["iOS", "Android", "FirefoxOS", "Fake"]),
            )
            .with("deviceName", string().required())
            .with("platformVersion", Constraint::new())
            .with("newCommandTimeout", Constraint::new().of_type(ValueType::Number))
            .with("automationName", Constraint::new().one_of(["Appium", "Selendroid"]))
            .with("autoLaunch", boolean())
            .with("udid", string())
            .with("orientation", Constraint::new().one_of(["LANDSCAPE", "PORTRAIT"]))
            .with("autoWebview", boolean())
            .with("noReset", boolean())
            .with("fullReset", boolean())
            .with("app", string())
            .with("browserName", string())
            .with("locationServicesAuthorized", boolean())
            .with("launchTimeout", Constraint::new())
    }
}

/// Which presence rules a validation pass enforces.
#[derive(Debug, Clone, Copy)]
pub enum Presence<'a> {
    /// Every required capability must be present.
    Enforced,
    /// Presence is not checked.
    Relaxed,
    /// Required capabilities already present in the given map are not demanded.
    SuppliedBy(&'a Map<String, Value>),
}

impl Presence<'_> {
    fn demands(&self, name: &str) -> bool {
        match self {
            Self::Enforced => true,
            Self::Relaxed => false,
            Self::SuppliedBy(supplied) => supplied
                .get(name)
                .is_none_or(Value::is_null),
        }
    }
}

/// Validates one capability map against `constraints`.
///
/// Null values count as absent. On success the map is returned unchanged.
///
/// # Errors
///
/// [`CapabilityError::NotAnObject`] when `caps` is not an object, otherwise
/// [`CapabilityError::Violations`] listing every broken rule.
pub fn validate_capabilities(
    caps: &Value,
    constraints: &Constraints,
    presence: Presence<'_>,
) -> Result<Map<String, Value>, CapabilityError> {
    let map = caps.as_object().ok_or(CapabilityError::NotAnObject)?;
    let mut violations = Vec::new();
    for (name, rule) in constraints.iter() {
        let value = map.get(name).filter(|value| !value.is_null());
        rule.check(name, value, presence.demands(name), &mut violations);
    }
    if violations.is_empty() {
        Ok(map.clone())
    } else {
        Err(CapabilityError::Violations(violations))
    }
}
