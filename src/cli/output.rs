//! Output formatting for CLI commands.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cli::args::{HopliteArgs, OutputFormat};
use crate::error::Result;
use crate::rules::QueryRuleActions;

/// Rule evaluation for one request of a batch.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleEvaluation {
    pub index_name: String,
    pub query: String,
    pub actions: QueryRuleActions,
}

/// Summary of a validated settings file.
#[derive(Debug, Serialize, Deserialize)]
pub struct SettingsSummary {
    pub path: String,
    pub search_attributes: usize,
    pub facet_attributes: Vec<String>,
    pub sort_options: Vec<String>,
    pub query_rules: usize,
}

/// Output a result in the specified format.
pub fn output_result<T: Serialize>(message: &str, result: &T, args: &HopliteArgs) -> Result<()> {
    match args.output_format {
        OutputFormat::Human => output_human(message, result, args),
        OutputFormat::Json => output_json(result, args),
    }
}

/// Print text as is for human output, or as a JSON string otherwise.
pub fn output_text(message: &str, text: &str, args: &HopliteArgs) -> Result<()> {
    match args.output_format {
        OutputFormat::Human => {
            if args.verbosity() > 1 {
                println!("{message}");
                println!();
            }
            print!("{text}");
            Ok(())
        }
        OutputFormat::Json => output_json(&text, args),
    }
}

fn output_human<T: Serialize>(message: &str, result: &T, args: &HopliteArgs) -> Result<()> {
    if args.verbosity() > 1 {
        println!("{message}");
        println!();
    }

    let value = serde_json::to_value(result)?;
    print_human_value(&value, 0);
    Ok(())
}

fn print_human_value(value: &Value, indent: usize) {
    let pad = "  ".repeat(indent);
    match value {
        Value::Object(obj) => {
            for (key, val) in obj {
                if is_scalar(val) {
                    println!("{pad}{key}: {}", format_value(val));
                } else {
                    println!("{pad}{key}:");
                    print_human_value(val, indent + 1);
                }
            }
        }
        Value::Array(items) if !items.iter().all(is_scalar) => {
            for (i, item) in items.iter().enumerate() {
                println!("{pad}[{i}]");
                print_human_value(item, indent + 1);
            }
        }
        _ => println!("{pad}{}", format_value(value)),
    }
}

fn is_scalar(value: &Value) -> bool {
    match value {
        Value::Object(obj) => obj.is_empty(),
        Value::Array(items) => items.iter().all(|item| !item.is_object() && !item.is_array()),
        _ => true,
    }
}

fn output_json<T: Serialize>(result: &T, args: &HopliteArgs) -> Result<()> {
    let json = if args.pretty {
        serde_json::to_string_pretty(result)?
    } else {
        serde_json::to_string(result)?
    };

    println!("{json}");
    Ok(())
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Array(arr) => {
            let formatted_values = arr.iter().map(format_value).collect::<Vec<_>>().join(", ");
            format!("[{formatted_values}]")
        }
        Value::Object(_) => "{}".to_string(),
        Value::Null => "null".to_string(),
    }
}
