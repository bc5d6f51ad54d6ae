//! Console output formatting.
//!
//! Values are rendered close to Lua literal syntax so they can be pasted
//! back into the console:
//!
//! ```text
//! tarn> return 1, 'two', {3, x = true}
//! 1	"two"	{3, x = true}
//! ```
//!
//! Nested tables are cut off below [`MAX_DEPTH`].

use mlua::{MultiValue, Table, Value};

/// Deepest table nesting rendered in full.
pub const MAX_DEPTH: usize = 3;

/// Render every value, tab-separated like `print`.
pub fn format_values(values: &MultiValue) -> String {
    values
        .iter()
        .map(|v| format_value(v, 0))
        .collect::<Vec<_>>()
        .join("\t")
}

/// Render a single value.
pub fn format_value(value: &Value, depth: usize) -> String {
    match value {
        Value::Nil => "nil".to_string(),
        Value::Boolean(b) => b.to_string(),
        Value::Integer(i) => i.to_string(),
        Value::Number(n) => format!("{n:?}"),
        Value::String(s) => format!("{:?}", s.to_string_lossy()),
        Value::Table(t) => format_table(t, depth),
        other => format!("{}: {:p}", other.type_name(), other.to_pointer()),
    }
}

fn format_table(table: &Table, depth: usize) -> String {
    if depth >= MAX_DEPTH {
        return "{...}".to_string();
    }

    let len = table.raw_len();
    let mut items = Vec::new();
    for i in 1..=len {
        let value: Value = table.raw_get(i).unwrap_or(Value::Nil);
        items.push(format_value(&value, depth + 1));
    }

    let mut fields = Vec::new();
    for pair in table.clone().pairs::<Value, Value>() {
        let Ok((key, value)) = pair else { continue };
        if let Value::Integer(i) = key {
            if i >= 1 && (i as usize) <= len {
                continue;
            }
        }
        fields.push(format!(
            "{} = {}",
            format_key(&key, depth),
            format_value(&value, depth + 1)
        ));
    }
    // Hash order is unspecified; keep output stable.
    fields.sort();
    items.extend(fields);

    if items.is_empty() {
        "{}".to_string()
    } else {
        format!("{{{}}}", items.join(", "))
    }
}

fn format_key(key: &Value, depth: usize) -> String {
    if let Value::String(s) = key {
        let name = s.to_string_lossy();
        if is_identifier(&name) {
            return name.to_string();
        }
    }
    format!("[{}]", format_value(key, depth + 1))
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
