use serde_json::{Map, Value};
use std::io;

use super::{cell, records};

type StdoutWriter<'a> = csv::Writer<io::StdoutLock<'a>>;

/// Write output as CSV to stdout.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    match value {
        Value::Object(map) => match map.get("result") {
            Some(Value::Object(result)) => write_pairs(&mut wtr, result),
            Some(Value::Array(rows)) => write_array(&mut wtr, rows),
            _ => write_pairs(&mut wtr, map),
        },
        Value::Array(arr) => write_array(&mut wtr, arr),
        _ => {
            let _ = wtr.write_record([cell(value)]);
        }
    }

    let _ = wtr.flush();
}

fn write_pairs(wtr: &mut StdoutWriter<'_>, map: &Map<String, Value>) {
    let _ = wtr.write_record(["field", "value"]);
    for (key, val) in map {
        let _ = wtr.write_record([key.as_str(), &cell(val)]);
    }
}

fn write_array(wtr: &mut StdoutWriter<'_>, arr: &[Value]) {
    match records(arr) {
        Some((headers, rows)) => {
            let _ = wtr.write_record(&headers);
            for row in rows {
                let _ = wtr.write_record(&row);
            }
        }
        None => {
            for item in arr {
                let _ = wtr.write_record([cell(item)]);
            }
        }
    }
}
