//! Derives the operator's observed config from cluster-wide configuration.

use serde_json::{Map, Value};

use crate::core::client::kube_resources::ProxyStatus;

/// `observedConfig` path read by the observed-proxy hooks.
pub const PROXY_CONFIG_PATH: [&str; 2] = ["targetcsiconfig", "proxy"];

/// Env vars for the driver containers. Unset or empty fields are left out.
pub fn observe_proxy(status: Option<&ProxyStatus>) -> Map<String, Value> {
    let mut vars = Map::new();
    let Some(status) = status else {
        return vars;
    };

    for (name, value) in [
        ("HTTP_PROXY", &status.http_proxy),
        ("HTTPS_PROXY", &status.https_proxy),
        ("NO_PROXY", &status.no_proxy),
    ] {
        if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
            vars.insert(name.to_string(), Value::String(value.to_string()));
        }
    }
    vars
}

/// `current` with the proxy section replaced. Other observed keys are kept;
/// an empty proxy removes the section and any parent it leaves empty.
pub fn with_observed_proxy(current: Option<&Value>, proxy: Map<String, Value>) -> Value {
    let mut config = match current {
        Some(Value::Object(map)) => map.clone(),
        _ => Map::new(),
    };

    let [section, key] = PROXY_CONFIG_PATH;
    let mut target = match config.remove(section) {
        Some(Value::Object(map)) => map,
        _ => Map::new(),
    };
    if proxy.is_empty() {
        target.remove(key);
    } else {
        target.insert(key.to_string(), Value::Object(proxy));
    }
    if !target.is_empty() {
        config.insert(section.to_string(), Value::Object(target));
    }

    Value::Object(config)
}

/// JSON merge patch (RFC 7386) that turns `old` into `new`.
pub fn merge_patch(old: &Value, new: &Value) -> Value {
    match (old, new) {
        (Value::Object(old), Value::Object(new)) => {
            let mut patch = Map::new();
            for (key, value) in new {
                match old.get(key) {
                    Some(previous) if previous == value => {}
                    Some(previous) => {
                        patch.insert(key.clone(), merge_patch(previous, value));
                    }
                    None => {
                        patch.insert(key.clone(), value.clone());
                    }
                }
            }
            for key in old.keys().filter(|k| !new.contains_key(*k)) {
                patch.insert(key.clone(), Value::Null);
            }
            Value::Object(patch)
        }
        _ => new.clone(),
    }
}
