use crate::domain::models::{ErrorBody, JsonErr, JsonOut};
use serde::Serialize;

pub fn print_out<T: Serialize>(
    json: bool,
    data: &[T],
    row: impl Fn(&T) -> String,
) -> anyhow::Result<()> {
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&JsonOut { ok: true, data })?
        );
    } else if data.is_empty() {
        println!("(none)");
    } else {
        for d in data {
            println!("{}", row(d));
        }
    }
    Ok(())
}

pub fn print_one<T: Serialize>(
    json: bool,
    data: T,
    row: impl Fn(&T) -> String,
) -> anyhow::Result<()> {
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&JsonOut { ok: true, data })?
        );
    } else {
        println!("{}", row(&data));
    }
    Ok(())
}

/// Failure envelope on stdout in JSON mode, a plain line on stderr otherwise.
pub fn print_err(json: bool, code: &str, message: &str) {
    if json {
        let body = JsonErr {
            ok: false,
            error: ErrorBody {
                code: code.to_string(),
                message: message.to_string(),
            },
        };
        match serde_json::to_string_pretty(&body) {
            Ok(s) => println!("{}", s),
            Err(_) => println!("{{\"ok\":false,\"error\":{{\"code\":\"{}\"}}}}", code),
        }
    } else {
        eprintln!("error [{}]: {}", code, message);
    }
}

/// Text cell: empty values render as the placeholder, tabs and newlines as spaces.
pub fn cell(value: &str) -> String {
    let value = value.trim();
    if value.is_empty() {
        return crate::domain::constants::PLACEHOLDER.to_string();
    }
    value.replace(['\t', '\n', '\r'], " ")
}
