//! Output formatting for CLI operations.

use arcgate::command::Reply;
use arcgate::property::{self, PropertyId, PropertyValue};
use arcgate::{ListEntry, Property};
use serde_json::{Map, Value, json};

/// Trait for output formatting
pub trait OutputFormatter {
    /// Formats the archive property record
    fn format_info(&self, info: &[Property]) -> String;

    /// Formats the item count
    fn format_count(&self, count: u32) -> String;

    /// Formats a listing
    fn format_list(&self, entries: &[ListEntry]) -> String;

    /// Formats the supported extensions
    fn format_extensions(&self, extensions: &[String]) -> String;

    /// Formats a finished extraction
    fn format_extract(&self, item: &str, destination: &str) -> String;

    /// Formats one shell reply
    fn format_reply(&self, reply: &Reply) -> String;

    /// Formats one shell error
    fn format_error(&self, error: &arcgate::Error) -> String;
}

/// Human-readable output formatter
pub struct HumanFormatter;

impl OutputFormatter for HumanFormatter {
    fn format_info(&self, info: &[Property]) -> String {
        let mut output = String::new();

        output.push_str("Archive Information:\n");
        output.push_str(&"-".repeat(40));
        output.push('\n');
        for prop in info {
            output.push_str(&format!(
                "  {:<14}{}\n",
                format!("{}:", prop.name()),
                human_value(prop)
            ));
        }

        output
    }

    fn format_count(&self, count: u32) -> String {
        format!("{count}\n")
    }

    fn format_list(&self, entries: &[ListEntry]) -> String {
        let mut output = String::new();
        if entries.iter().all(|entry| matches!(entry, ListEntry::Path(_))) {
            for entry in entries {
                output.push_str(&entry.to_string());
                output.push('\n');
            }
            return output;
        }

        // Header
        output.push_str(&format!("{:>12} {:>19} {}\n", "Size", "Modified", "Name"));
        output.push_str(&"-".repeat(70));
        output.push('\n');

        let mut total_size: u64 = 0;
        let mut file_count = 0;
        let mut dir_count = 0;

        for entry in entries {
            let ListEntry::Record(record) = entry else {
                continue;
            };
            let is_dir = matches!(
                property::find(record, PropertyId::IsDir),
                Some(PropertyValue::Bool(true))
            );
            let size = match property::find(record, PropertyId::Size) {
                Some(PropertyValue::UInt(size)) => *size,
                _ => 0,
            };
            if is_dir {
                dir_count += 1;
            } else {
                file_count += 1;
                total_size += size;
            }

            let size_str = if is_dir {
                String::new()
            } else {
                humanize_bytes(size)
            };
            let mtime_str = match property::find(record, PropertyId::MTime) {
                Some(PropertyValue::Time(secs)) => format_unix_secs(*secs),
                _ => "-".to_string(),
            };
            let path = match property::find(record, PropertyId::Path) {
                Some(PropertyValue::Text(path)) => path.as_str(),
                _ => "",
            };
            let type_indicator = if is_dir { "/" } else { "" };

            output.push_str(&format!(
                "{:>12} {:>19} {}{}\n",
                size_str, mtime_str, path, type_indicator
            ));
        }

        // Footer
        output.push_str(&"-".repeat(70));
        output.push('\n');
        output.push_str(&format!(
            "{} files, {} directories, {} total\n",
            file_count,
            dir_count,
            humanize_bytes(total_size)
        ));

        output
    }

    fn format_extensions(&self, extensions: &[String]) -> String {
        format!("{}\n", extensions.join(" "))
    }

    fn format_extract(&self, item: &str, destination: &str) -> String {
        format!("Extracted {item} -> {destination}\n")
    }

    fn format_reply(&self, reply: &Reply) -> String {
        match reply {
            Reply::Empty => String::new(),
            reply => format!("{reply}\n"),
        }
    }

    fn format_error(&self, error: &arcgate::Error) -> String {
        format!("error: {error}\n")
    }
}

/// JSON output formatter
pub struct JsonFormatter;

impl OutputFormatter for JsonFormatter {
    fn format_info(&self, info: &[Property]) -> String {
        serde_json::to_string_pretty(&record_json(info)).unwrap_or_else(|_| "{}".to_string())
    }

    fn format_count(&self, count: u32) -> String {
        json!({ "count": count }).to_string()
    }

    fn format_list(&self, entries: &[ListEntry]) -> String {
        let items: Vec<_> = entries
            .iter()
            .map(|entry| match entry {
                ListEntry::Path(path) => json!(path),
                ListEntry::Record(record) => record_json(record),
            })
            .collect();

        serde_json::to_string_pretty(&items).unwrap_or_else(|_| "[]".to_string())
    }

    fn format_extensions(&self, extensions: &[String]) -> String {
        json!(extensions).to_string()
    }

    fn format_extract(&self, item: &str, destination: &str) -> String {
        json!({ "success": true, "item": item, "destination": destination }).to_string()
    }

    fn format_reply(&self, reply: &Reply) -> String {
        json!({ "result": reply_json(reply) }).to_string()
    }

    fn format_error(&self, error: &arcgate::Error) -> String {
        json!({ "error": error.to_string() }).to_string()
    }
}

fn value_json(value: &PropertyValue) -> Value {
    match value {
        PropertyValue::UInt(v) => json!(v),
        PropertyValue::Bool(v) => json!(v),
        PropertyValue::Text(v) => json!(v),
        PropertyValue::Time(v) => json!(v),
    }
}

fn record_json(record: &[Property]) -> Value {
    let object: Map<String, Value> = record
        .iter()
        .map(|prop| (prop.name().to_string(), value_json(&prop.value)))
        .collect();
    Value::Object(object)
}

fn reply_json(reply: &Reply) -> Value {
    match reply {
        Reply::Empty => Value::Null,
        Reply::Integer(n) => json!(n),
        Reply::Text(text) => json!(text),
        Reply::List(items) => Value::Array(items.iter().map(reply_json).collect()),
    }
}

/// Creates the appropriate formatter based on output format
pub fn create_formatter(format: super::OutputFormat) -> Box<dyn OutputFormatter> {
    match format {
        super::OutputFormat::Human => Box::new(HumanFormatter),
        super::OutputFormat::Json => Box::new(JsonFormatter),
    }
}

fn human_value(prop: &Property) -> String {
    match (prop.id, &prop.value) {
        (PropertyId::Size | PropertyId::PackSize | PropertyId::PhySize, PropertyValue::UInt(v)) => {
            humanize_bytes(*v)
        }
        (_, PropertyValue::Bool(v)) => if *v { "Yes" } else { "No" }.to_string(),
        (_, PropertyValue::Time(secs)) => format_unix_secs(*secs),
        (_, value) => value.to_string(),
    }
}

/// Converts bytes to a human-readable string
pub fn humanize_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    const TB: u64 = GB * 1024;

    if bytes >= TB {
        format!("{:.1} TB", bytes as f64 / TB as f64)
    } else if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Formats Unix seconds as a UTC datetime string
pub fn format_unix_secs(secs: i64) -> String {
    let days = secs.div_euclid(86400);
    let time_of_day = secs.rem_euclid(86400);
    let hours = time_of_day / 3600;
    let minutes = (time_of_day % 3600) / 60;
    let seconds = time_of_day % 60;
    let (year, month, day) = civil_from_days(days);

    format!(
        "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
        year, month, day, hours, minutes, seconds
    )
}

// days since 1970-01-01 to (year, month, day), proleptic Gregorian
fn civil_from_days(days: i64) -> (i64, u32, u32) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let month = if mp < 10 { mp + 3 } else { mp - 9 } as u32;
    let year = yoe + era * 400 + i64::from(month <= 2);
    (year, month, day)
}
