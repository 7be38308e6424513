//! Built-in dynamic values available as `{{$name(args)}}`.

use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;
use rand::distributions::Alphanumeric;

const DEFAULT_STRING_LENGTH: usize = 10;
const DEFAULT_INT_RANGE: (i64, i64) = (0, 100);

/// Evaluate a built-in function. Names match case-insensitively; unknown
/// names and unparsable arguments yield `None`.
pub fn call(name: &str, args: &str) -> Option<String> {
    let args = args.trim();
    match name.to_ascii_lowercase().as_str() {
        "randomuuid" => Some(uuid::Uuid::new_v4().to_string()),
        "timestamp" => Some(timestamp_millis().to_string()),
        "randomstring" => {
            let length = if args.is_empty() {
                DEFAULT_STRING_LENGTH
            } else {
                match args.parse() {
                    Ok(length) => length,
                    Err(_) => {
                        tracing::warn!(function = name, args, "Invalid length argument");
                        return None;
                    }
                }
            };
            Some(random_string(length))
        }
        "randomint" => {
            let (min, max) = match parse_range(args) {
                Some(range) => range,
                None => {
                    tracing::warn!(function = name, args, "Invalid range arguments");
                    return None;
                }
            };
            Some(rand::thread_rng().gen_range(min..=max).to_string())
        }
        _ => {
            tracing::warn!(function = name, "Unknown function");
            None
        }
    }
}

pub fn random_string(length: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

fn timestamp_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis())
        .unwrap_or(0)
}

fn parse_range(args: &str) -> Option<(i64, i64)> {
    if args.is_empty() {
        return Some(DEFAULT_INT_RANGE);
    }
    let (min, max) = args.split_once(',')?;
    let min: i64 = min.trim().parse().ok()?;
    let max: i64 = max.trim().parse().ok()?;
    (min <= max).then_some((min, max))
}
