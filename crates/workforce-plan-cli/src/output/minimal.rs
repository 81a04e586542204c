use serde_json::Value;

use super::cell;

/// Print just the headline figure of a result.
///
/// Looks for well-known result fields in priority order, then falls back to
/// the first field of the result object.
pub fn print_minimal(value: &Value) {
    let result = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    let priority_keys = [
        "net_revenue",
        "total",
        "ebitda",
        "net_recruitment",
        "entry_count",
        "origin",
    ];

    if let Value::Object(map) = result {
        for key in &priority_keys {
            if let Some(val) = map.get(*key).filter(|v| !v.is_null()) {
                println!("{}", cell(val));
                return;
            }
        }
        if let Some((key, val)) = map.iter().next() {
            println!("{}: {}", key, cell(val));
            return;
        }
    }

    if let Value::Array(rows) = result {
        println!("{} rows", rows.len());
        return;
    }

    println!("{}", cell(result));
}
