//! Redaction of sensitive-looking configuration values

use crate::{ConfigMap, ConfigValue};

/// Placeholder written in place of a redacted value
pub const REDACTED: &str = "(sensitive)";

/// Check if a field name suggests it holds a secret
pub fn is_sensitive(field_name: &str) -> bool {
    let lower = field_name.to_lowercase().replace(['_', '-'], "");
    lower.contains("password")
        || lower.contains("secret")
        || lower.contains("token")
        || lower.contains("connectionstring")
        || lower.contains("accesskey")
        || lower.contains("primarykey")
        || lower.contains("secondarykey")
        || lower.contains("privatekey")
        || lower.contains("credential")
}

/// Replace sensitive values in a config map, recursing into nested maps and
/// lists
pub fn redact(config: &mut ConfigMap) {
    for (key, value) in config.iter_mut() {
        if is_sensitive(key) {
            if !matches!(value, ConfigValue::Null) {
                *value = ConfigValue::String(REDACTED.to_string());
            }
            continue;
        }
        redact_value(value);
    }
}

fn redact_value(value: &mut ConfigValue) {
    match value {
        ConfigValue::Map(map) => redact(map),
        ConfigValue::List(items) => items.iter_mut().for_each(redact_value),
        _ => {},
    }
}
