use crate::tools::{ConfigSchema, config_schema::SchemaKind};
use regex::Regex;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::sync::LazyLock;

/// Replacement for masked string secrets.
const MASKED_STRING: &str = "********";
/// Replacement for masked non-string secrets.
const MASKED_VALUE: &str = "[REDACTED]";

static SECRET_REFERENCE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\$\{secret[.:]([a-zA-Z0-9_-]+)\}$").expect("secret reference regex is valid")
});
static REFERENCE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\$\{[^}]+\}$").expect("reference regex is valid"));

/// Location of a secret-tagged leaf in a configuration object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretField {
    /// Name of the secret, the last segment of the path.
    pub key: String,
    /// Object field names leading to the secret.
    pub path: Vec<String>,
}

/// Plaintext secret value pulled out of a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractedSecret {
    pub key: String,
    pub value: String,
}

/// Configuration with secret values replaced by references, and the values themselves.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedSecrets {
    pub sanitized_config: JsonValue,
    pub secrets: Vec<ExtractedSecret>,
}

/// Builds a reference to the tool secret with the specified key.
pub fn secret_reference(key: &str) -> String {
    format!("${{secret.{key}}}")
}

/// Returns the key of the tool secret if the whole value is a secret reference, e.g.
/// `${secret.apiKey}` or `${secret:apiKey}`.
pub fn parse_secret_reference(value: &str) -> Option<&str> {
    SECRET_REFERENCE_REGEX
        .captures(value)
        .and_then(|captures| captures.get(1))
        .map(|key| key.as_str())
}

/// Returns `true` if the whole value is a reference of any kind, e.g. `${API_KEY}`.
pub fn is_reference(value: &str) -> bool {
    REFERENCE_REGEX.is_match(value)
}

/// Finds all secret-tagged fields described by the schema, in declaration order. Fields of all
/// union variants are reported regardless of which variant a particular configuration uses.
pub fn collect_secret_fields(schema: &ConfigSchema) -> Vec<SecretField> {
    let mut fields = vec![];
    collect_secret_fields_at(schema, &mut vec![], &mut fields);
    fields
}

fn collect_secret_fields_at(
    schema: &ConfigSchema,
    path: &mut Vec<String>,
    fields: &mut Vec<SecretField>,
) {
    let (unwrapped, is_secret) = schema.unwrap_layers();
    if is_secret && let Some(key) = path.last() {
        fields.push(SecretField {
            key: key.clone(),
            path: path.clone(),
        });
        return;
    }

    match &unwrapped.kind {
        SchemaKind::Object(object_fields) => {
            for (name, field_schema) in object_fields {
                path.push(name.clone());
                collect_secret_fields_at(field_schema, path, fields);
                path.pop();
            }
        }
        SchemaKind::Union(variants) | SchemaKind::DiscriminatedUnion { variants, .. } => {
            for variant in variants {
                collect_secret_fields_at(variant, path, fields);
            }
        }
        SchemaKind::Array(inner) | SchemaKind::Record(inner) => {
            collect_secret_fields_at(inner, path, fields);
        }
        _ => {}
    }
}

/// Replaces every plaintext secret in the configuration with a `${secret.<key>}` reference and
/// returns the replaced values. Empty strings and existing secret references are left intact,
/// so extracting from already sanitized configuration yields no secrets.
pub fn extract_secrets_from_config(schema: &ConfigSchema, config: &JsonValue) -> ExtractedSecrets {
    let mut sanitized_config = config.clone();
    let mut secrets = vec![];
    for field in collect_secret_fields(schema) {
        let Some(value) = value_at_path_mut(&mut sanitized_config, &field.path) else {
            continue;
        };

        let secret_value = match value {
            JsonValue::String(secret_value)
                if !secret_value.is_empty() && parse_secret_reference(secret_value).is_none() =>
            {
                std::mem::take(secret_value)
            }
            _ => continue,
        };

        *value = JsonValue::String(secret_reference(&field.key));
        secrets.push(ExtractedSecret {
            key: field.key,
            value: secret_value,
        });
    }

    ExtractedSecrets {
        sanitized_config,
        secrets,
    }
}

/// Hides secret values in the configuration for display. References are kept as is.
pub fn mask_secrets_in_config(schema: &ConfigSchema, config: &JsonValue) -> JsonValue {
    let mut masked_config = config.clone();
    for field in collect_secret_fields(schema) {
        let Some(value) = value_at_path_mut(&mut masked_config, &field.path) else {
            continue;
        };

        let replacement = match value {
            JsonValue::Null => continue,
            JsonValue::String(reference) if is_reference(reference) => continue,
            JsonValue::String(_) => MASKED_STRING,
            _ => MASKED_VALUE,
        };
        *value = JsonValue::String(replacement.to_string());
    }

    masked_config
}

/// Turns masked secret values back into secret references so that a masked configuration sent
/// back for update keeps the already stored secrets.
pub fn unmask_secrets_in_config(schema: &ConfigSchema, config: &JsonValue) -> JsonValue {
    let mut unmasked_config = config.clone();
    for field in collect_secret_fields(schema) {
        let Some(value) = value_at_path_mut(&mut unmasked_config, &field.path) else {
            continue;
        };

        if matches!(value.as_str(), Some(MASKED_STRING | MASKED_VALUE)) {
            *value = JsonValue::String(secret_reference(&field.key));
        }
    }

    unmasked_config
}

/// Paths consist of object field names only, values nested in arrays are never reached.
fn value_at_path_mut<'v>(value: &'v mut JsonValue, path: &[String]) -> Option<&'v mut JsonValue> {
    path.iter()
        .try_fold(value, |current, segment| current.as_object_mut()?.get_mut(segment))
}
