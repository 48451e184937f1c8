use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use holoplay_cbor::{encode, Value};

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    /// Reply re-encoded as CBOR.
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// Print a driver reply.
pub fn print_value(value: &Value, format: OutputFormat) {
    match format {
        OutputFormat::Json => println!("{}", value.to_json()),
        OutputFormat::Pretty => println!("{}", pretty(value)),
        OutputFormat::Table => match render_table(value) {
            Some(table) => println!("{table}"),
            None => println!("{}", pretty(value)),
        },
        OutputFormat::Raw => print_raw(&encode(value)),
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

/// One row per top-level map entry. `None` for anything but a map.
pub fn render_table(value: &Value) -> Option<Table> {
    let entries = value.as_map()?;
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["KEY", "VALUE"]);
    for (key, value) in entries {
        let key = key
            .as_str()
            .map_or_else(|| key.to_json().to_string(), str::to_string);
        table.add_row(vec![key, cell(value)]);
    }
    Some(table)
}

fn cell(value: &Value) -> String {
    match value {
        Value::Text(text) => text.clone(),
        Value::Bytes(bytes) => format!("<binary {} bytes>", bytes.len()),
        other => other.to_json().to_string(),
    }
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(&value.to_json()).unwrap_or_else(|_| "null".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_has_row_per_key() {
        let reply = Value::map([
            ("error", Value::from(0)),
            ("version", Value::from("1.2.3")),
            ("devices", Value::array([Value::map([("index", 0)])])),
        ]);
        let table = render_table(&reply).unwrap().to_string();
        assert!(table.contains("version"));
        assert!(table.contains("1.2.3"));
        assert!(table.contains(r#"[{"index":0}]"#));
    }

    #[test]
    fn non_map_has_no_table() {
        assert!(render_table(&Value::from(1)).is_none());
    }

    #[test]
    fn bytes_are_summarised() {
        assert_eq!(cell(&Value::from(&[1u8, 2, 3][..])), "<binary 3 bytes>");
    }
}
