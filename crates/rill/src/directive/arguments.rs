//! Argument declaration, binding and coercion for directives.

use std::fmt;

use indexmap::IndexMap;

use crate::interpreter::{BindingErrorKind, RenderError, compute_suggestions};
use crate::types::Value;

/// Declared type of a directive argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArgumentType {
    /// Accepts any value unchanged.
    Any,
    /// Strings, numbers and booleans (converted to their text form).
    String,
    /// Integers, integral floats, numeric strings and booleans.
    Integer,
    /// Numbers and numeric strings.
    Float,
    /// Any value, reduced by truthiness. Parsed as a boolean expression.
    Boolean,
    /// Lists and maps; null binds as an empty list.
    Array,
}

impl fmt::Display for ArgumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ArgumentType::Any => "any",
            ArgumentType::String => "string",
            ArgumentType::Integer => "integer",
            ArgumentType::Float => "float",
            ArgumentType::Boolean => "boolean",
            ArgumentType::Array => "array",
        };
        write!(f, "{name}")
    }
}

impl ArgumentType {
    /// Coerces a value to this type, returning the offending kind on mismatch.
    ///
    /// `Null` passes through every type except `Boolean` (false) and `Array`
    /// (empty list) so optional template data never fails binding.
    pub fn coerce(self, value: Value) -> Result<Value, &'static str> {
        match (self, value) {
            (ArgumentType::Any, value) => Ok(value),
            (ArgumentType::Boolean, value) => Ok(Value::Bool(value.is_truthy())),
            (ArgumentType::Array, Value::Null) => Ok(Value::List(Vec::new())),
            (ArgumentType::Array, value @ (Value::List(_) | Value::Map(_))) => Ok(value),
            (_, Value::Null) => Ok(Value::Null),
            (ArgumentType::String, value @ (Value::String(_) | Value::Safe(_))) => Ok(value),
            (ArgumentType::String, value @ (Value::Number(_) | Value::Float(_) | Value::Bool(_))) => {
                Ok(Value::String(value.to_string()))
            }
            (ArgumentType::Integer, Value::Number(n)) => Ok(Value::Number(n)),
            (ArgumentType::Integer, Value::Bool(b)) => Ok(Value::Number(i64::from(b))),
            (ArgumentType::Integer, value @ (Value::Float(_) | Value::String(_) | Value::Safe(_))) => {
                let kind = value.kind();
                if let Some(n) = value.as_str().and_then(|s| s.trim().parse::<i64>().ok()) {
                    return Ok(Value::Number(n));
                }
                match value.to_numeric() {
                    Some(f) if f.fract() == 0.0 && f.is_finite() => Ok(Value::Number(f as i64)),
                    _ => Err(kind),
                }
            }
            (ArgumentType::Float, value @ (Value::Number(_) | Value::Float(_) | Value::String(_) | Value::Safe(_))) => {
                let kind = value.kind();
                value.to_numeric().map(Value::Float).ok_or(kind)
            }
            (_, value) => Err(value.kind()),
        }
    }
}

/// One argument accepted by a directive.
#[derive(Debug, Clone, PartialEq)]
pub struct ArgumentDefinition {
    pub name: String,
    pub kind: ArgumentType,
    pub description: String,
    pub required: bool,
    pub default: Option<Value>,
}

/// The argument contract of a directive type, declared once at registration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArgumentDefinitions {
    definitions: Vec<ArgumentDefinition>,
}

impl ArgumentDefinitions {
    /// Create an empty argument contract.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares an optional argument without a default.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        kind: ArgumentType,
        description: impl Into<String>,
    ) -> &mut Self {
        self.push(name.into(), kind, description.into(), false, None)
    }

    /// Declares a required argument.
    pub fn register_required(
        &mut self,
        name: impl Into<String>,
        kind: ArgumentType,
        description: impl Into<String>,
    ) -> &mut Self {
        self.push(name.into(), kind, description.into(), true, None)
    }

    /// Declares an optional argument bound to `default` when not supplied.
    pub fn register_with_default(
        &mut self,
        name: impl Into<String>,
        kind: ArgumentType,
        description: impl Into<String>,
        default: impl Into<Value>,
    ) -> &mut Self {
        self.push(
            name.into(),
            kind,
            description.into(),
            false,
            Some(default.into()),
        )
    }

    fn push(
        &mut self,
        name: String,
        kind: ArgumentType,
        description: String,
        required: bool,
        default: Option<Value>,
    ) -> &mut Self {
        // Re-registering a name replaces the earlier declaration.
        self.definitions.retain(|definition| definition.name != name);
        self.definitions.push(ArgumentDefinition {
            name,
            kind,
            description,
            required,
            default,
        });
        self
    }

    /// Get the declaration of an argument.
    pub fn get(&self, name: &str) -> Option<&ArgumentDefinition> {
        self.definitions
            .iter()
            .find(|definition| definition.name == name)
    }

    /// Iterate over the declarations in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &ArgumentDefinition> {
        self.definitions.iter()
    }

    /// Number of declared arguments.
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Whether the directive declares no arguments.
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Rejects unknown supplied names and missing required arguments.
    ///
    /// Runs before any argument value is evaluated.
    pub fn check_names<'a>(
        &self,
        directive: &str,
        supplied: impl IntoIterator<Item = &'a str>,
    ) -> Result<(), RenderError> {
        let supplied: Vec<&str> = supplied.into_iter().collect();
        for name in &supplied {
            if self.get(name).is_none() {
                let available: Vec<String> = self
                    .definitions
                    .iter()
                    .map(|definition| definition.name.clone())
                    .collect();
                return Err(RenderError::binding(
                    directive,
                    *name,
                    BindingErrorKind::Unknown {
                        suggestions: compute_suggestions(name, &available),
                    },
                ));
            }
        }
        for definition in &self.definitions {
            if definition.required && !supplied.contains(&definition.name.as_str()) {
                return Err(RenderError::binding(
                    directive,
                    definition.name.as_str(),
                    BindingErrorKind::Missing,
                ));
            }
        }
        Ok(())
    }

    /// Coerces evaluated argument values and fills in defaults.
    ///
    /// Names must already have passed [`ArgumentDefinitions::check_names`].
    pub fn bind(
        &self,
        directive: &str,
        supplied: Vec<(&str, Value)>,
    ) -> Result<Arguments, RenderError> {
        let mut values = IndexMap::with_capacity(self.definitions.len());
        for (name, value) in supplied {
            let Some(definition) = self.get(name) else {
                return Err(RenderError::binding(
                    directive,
                    name,
                    BindingErrorKind::Unknown {
                        suggestions: Vec::new(),
                    },
                ));
            };
            let coerced = definition.kind.coerce(value).map_err(|found| {
                RenderError::binding(
                    directive,
                    name,
                    BindingErrorKind::TypeMismatch {
                        expected: definition.kind,
                        found,
                    },
                )
            })?;
            values.insert(name.to_string(), coerced);
        }
        for definition in &self.definitions {
            if values.contains_key(&definition.name) {
                continue;
            }
            if let Some(default) = &definition.default {
                values.insert(definition.name.clone(), default.clone());
            }
        }
        Ok(Arguments { values })
    }
}

static NULL: Value = Value::Null;

/// Argument values bound to one directive invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments {
    values: IndexMap<String, Value>,
}

impl Arguments {
    /// Get an argument value; unsupplied arguments without default read as `Null`.
    pub fn get(&self, name: &str) -> &Value {
        self.values.get(name).unwrap_or(&NULL)
    }

    /// Whether the argument was supplied (or defaulted) with a non-null value.
    pub fn is_set(&self, name: &str) -> bool {
        self.values.get(name).is_some_and(|value| !value.is_null())
    }

    /// Get a string argument.
    pub fn string(&self, name: &str) -> Option<&str> {
        self.get(name).as_str()
    }

    /// Get an integer argument.
    pub fn integer(&self, name: &str) -> Option<i64> {
        self.get(name).as_number()
    }

    /// Truthiness of an argument.
    pub fn truthy(&self, name: &str) -> bool {
        self.get(name).is_truthy()
    }

    /// Iterate over bound values in binding order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }
}
