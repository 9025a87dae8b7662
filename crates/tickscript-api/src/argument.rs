use std::collections::BTreeMap;

use crate::value::Value;

/// Argument types a custom command argument can be based on
pub const KNOWN_TYPES: &[&str] = &[
    "bool", "int", "float", "string", "term", "text", "pos", "block", "entities", "players",
    "item", "dimension", "identifier", "uuid", "message",
];

/// A custom command argument type declared by an app
///
/// Built from one entry of the config hook's `arguments` map, for example
/// `{"count" -> {"type" -> "int", "min" -> 1}}`.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandArgument {
    pub name: String,
    pub base_type: String,
    pub suggestions: Vec<Value>,
    pub options: BTreeMap<String, Value>,
}

impl CommandArgument {
    /// Compile an argument descriptor, rejecting descriptors without a known
    /// base `type`
    pub fn build_from_config(
        name: &str,
        spec: &BTreeMap<String, Value>,
    ) -> Result<Self, String> {
        let base_type = match spec.get("type") {
            Some(Value::Str(t)) => t.to_lowercase(),
            Some(other) => {
                return Err(format!(
                    "Custom type '{}' has an invalid 'type': {}",
                    name, other
                ));
            }
            None => return Err(format!("Custom type '{}' should define 'type'", name)),
        };

        if !KNOWN_TYPES.contains(&base_type.as_str()) {
            return Err(format!(
                "Unknown base type '{}' for custom type '{}'",
                base_type, name
            ));
        }

        let suggestions = match spec.get("suggest") {
            None => Vec::new(),
            Some(Value::List(items)) => items.clone(),
            Some(_) => {
                return Err(format!(
                    "'suggest' for custom type '{}' should be a list",
                    name
                ));
            }
        };

        let options = spec
            .iter()
            .filter(|(key, _)| key.as_str() != "type" && key.as_str() != "suggest")
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        Ok(Self {
            name: name.to_string(),
            base_type,
            suggestions,
            options,
        })
    }
}
