//! Setting values and their declared types
//!
//! `ValueType` is the declared type of a setting and doubles as the key the
//! renderer registry dispatches on. `SettingValue` is the runtime value.

use super::shortcut::KeyboardShortcut;
use std::borrow::Cow;
use std::fmt;

/// An enumeration type: ordered variant names, optionally combinable as flags
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EnumType {
    /// Type name (part of the dispatch key)
    pub name: String,
    /// Variant names in declaration order
    pub variants: Vec<String>,
    /// Whether variants combine as a bitmask
    pub flags: bool,
}

impl EnumType {
    pub fn new(name: impl Into<String>, variants: &[&str]) -> Self {
        Self {
            name: name.into(),
            variants: variants.iter().map(|v| v.to_string()).collect(),
            flags: false,
        }
    }

    /// Create a flags enumeration (variant `i` is bit `1 << i`)
    pub fn flags(name: impl Into<String>, variants: &[&str]) -> Self {
        Self {
            flags: true,
            ..Self::new(name, variants)
        }
    }

    pub fn index_of(&self, variant: &str) -> Option<usize> {
        self.variants.iter().position(|v| v == variant)
    }

    /// Bitmask with every variant set
    pub fn all_bits(&self) -> u64 {
        match self.variants.len() {
            0 => 0,
            n if n >= 64 => u64::MAX,
            n => (1u64 << n) - 1,
        }
    }
}

/// The declared type of a setting value
#[derive(Debug, Clone, PartialEq)]
pub enum ValueType {
    Bool,
    Int { min: Option<i64>, max: Option<i64> },
    Float { min: Option<f64>, max: Option<f64> },
    Text,
    Enum(EnumType),
    Shortcut,
    /// Host-defined type, rendered only if a renderer is registered for it
    Custom(String),
}

/// Exact dispatch key derived from a `ValueType`
///
/// Range bounds are not part of the key: `Int { .. }` always maps to `int`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeKey(Cow<'static, str>);

impl TypeKey {
    pub const BOOL: TypeKey = TypeKey(Cow::Borrowed("bool"));
    pub const INT: TypeKey = TypeKey(Cow::Borrowed("int"));
    pub const FLOAT: TypeKey = TypeKey(Cow::Borrowed("float"));
    pub const TEXT: TypeKey = TypeKey(Cow::Borrowed("string"));
    pub const SHORTCUT: TypeKey = TypeKey(Cow::Borrowed("shortcut"));

    /// Key for a host-defined type name
    pub fn custom(name: impl Into<String>) -> Self {
        TypeKey(Cow::Owned(name.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl ValueType {
    pub fn int() -> Self {
        ValueType::Int {
            min: None,
            max: None,
        }
    }

    pub fn int_range(min: i64, max: i64) -> Self {
        ValueType::Int {
            min: Some(min),
            max: Some(max),
        }
    }

    pub fn float() -> Self {
        ValueType::Float {
            min: None,
            max: None,
        }
    }

    pub fn float_range(min: f64, max: f64) -> Self {
        ValueType::Float {
            min: Some(min),
            max: Some(max),
        }
    }

    pub fn type_key(&self) -> TypeKey {
        match self {
            ValueType::Bool => TypeKey::BOOL,
            ValueType::Int { .. } => TypeKey::INT,
            ValueType::Float { .. } => TypeKey::FLOAT,
            ValueType::Text => TypeKey::TEXT,
            ValueType::Shortcut => TypeKey::SHORTCUT,
            ValueType::Enum(e) if e.flags => TypeKey::custom(format!("flags:{}", e.name)),
            ValueType::Enum(e) => TypeKey::custom(format!("enum:{}", e.name)),
            ValueType::Custom(name) => TypeKey::custom(name.clone()),
        }
    }

    /// Check whether a value is of this type (range bounds included)
    pub fn accepts(&self, value: &SettingValue) -> bool {
        match (self, value) {
            (ValueType::Bool, SettingValue::Bool(_)) => true,
            (ValueType::Int { min, max }, SettingValue::Int(v)) => {
                min.map_or(true, |m| *v >= m) && max.map_or(true, |m| *v <= m)
            }
            (ValueType::Float { min, max }, SettingValue::Float(v)) => {
                min.map_or(true, |m| *v >= m) && max.map_or(true, |m| *v <= m)
            }
            (ValueType::Text, SettingValue::Text(_)) => true,
            (ValueType::Enum(e), SettingValue::Enum(name)) => !e.flags && e.index_of(name).is_some(),
            (ValueType::Enum(e), SettingValue::Flags(bits)) => e.flags && bits & !e.all_bits() == 0,
            (ValueType::Shortcut, SettingValue::Shortcut(_)) => true,
            (ValueType::Custom(_), SettingValue::Custom(_)) => true,
            _ => false,
        }
    }

    /// Decode a persisted JSON value against this type
    pub fn decode(&self, json: &serde_json::Value) -> Option<SettingValue> {
        let value = match self {
            ValueType::Bool => SettingValue::Bool(json.as_bool()?),
            ValueType::Int { .. } => SettingValue::Int(json.as_i64()?),
            ValueType::Float { .. } => SettingValue::Float(json.as_f64()?),
            ValueType::Text => SettingValue::Text(json.as_str()?.to_string()),
            ValueType::Enum(e) if e.flags => {
                let mut bits = 0u64;
                for name in json.as_array()? {
                    let index = e.index_of(name.as_str()?)?;
                    if index >= 64 {
                        return None;
                    }
                    bits |= 1u64 << index;
                }
                SettingValue::Flags(bits)
            }
            ValueType::Enum(_) => SettingValue::Enum(json.as_str()?.to_string()),
            ValueType::Shortcut => SettingValue::Shortcut(json.as_str()?.parse().ok()?),
            ValueType::Custom(_) => SettingValue::Custom(json.clone()),
        };
        self.accepts(&value).then_some(value)
    }
}

/// A runtime setting value
#[derive(Debug, Clone, PartialEq)]
pub enum SettingValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    /// Selected variant name of a plain enumeration
    Enum(String),
    /// Bitmask over the variants of a flags enumeration
    Flags(u64),
    Shortcut(KeyboardShortcut),
    Custom(serde_json::Value),
}

impl SettingValue {
    /// Encode for persistence. Flags need their type to name the set bits.
    pub fn to_json(&self, value_type: &ValueType) -> serde_json::Value {
        match self {
            SettingValue::Bool(b) => serde_json::Value::Bool(*b),
            SettingValue::Int(i) => serde_json::json!(i),
            SettingValue::Float(f) => serde_json::json!(f),
            SettingValue::Text(s) | SettingValue::Enum(s) => serde_json::Value::String(s.clone()),
            SettingValue::Flags(bits) => {
                let names = match value_type {
                    ValueType::Enum(e) => flag_names(e, *bits),
                    _ => Vec::new(),
                };
                serde_json::Value::Array(names.into_iter().map(serde_json::Value::String).collect())
            }
            SettingValue::Shortcut(s) => serde_json::Value::String(s.to_string()),
            SettingValue::Custom(v) => v.clone(),
        }
    }

    /// String form of the value, resolving flag names when the type is known
    pub fn display_with(&self, value_type: &ValueType) -> String {
        match (self, value_type) {
            (SettingValue::Flags(bits), ValueType::Enum(e)) => {
                let names = flag_names(e, *bits);
                if names.is_empty() {
                    "None".to_string()
                } else {
                    names.join(", ")
                }
            }
            _ => self.to_string(),
        }
    }
}

fn flag_names(e: &EnumType, bits: u64) -> Vec<String> {
    e.variants
        .iter()
        .enumerate()
        .filter(|(i, _)| *i < 64 && bits & (1u64 << i) != 0)
        .map(|(_, v)| v.clone())
        .collect()
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingValue::Bool(b) => write!(f, "{b}"),
            SettingValue::Int(i) => write!(f, "{i}"),
            SettingValue::Float(v) => write!(f, "{v}"),
            SettingValue::Text(s) | SettingValue::Enum(s) => f.write_str(s),
            SettingValue::Flags(bits) => write!(f, "{bits:#b}"),
            SettingValue::Shortcut(s) => write!(f, "{s}"),
            SettingValue::Custom(v) => write!(f, "{v}"),
        }
    }
}
