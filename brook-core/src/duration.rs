//! Text form of durations: `"1h30m"`, `"250ms"`, `"1.5s"`.

use crate::error::CoerceError;
use std::time::Duration;

const UNITS: &[(&str, u128)] = &[
    ("h", 3_600_000_000_000),
    ("m", 60_000_000_000),
    ("s", 1_000_000_000),
    ("ms", 1_000_000),
    ("us", 1_000),
    ("ns", 1),
];

fn unit_nanos(unit: &str) -> Option<u128> {
    match unit {
        "µs" => Some(1_000),
        "d" => Some(24 * 3_600_000_000_000),
        _ => UNITS.iter().find(|(u, _)| *u == unit).map(|(_, n)| *n),
    }
}

/// Parse a sequence of `<number><unit>` pairs. A bare `"0"` is accepted.
pub fn parse_duration(text: &str) -> Result<Duration, CoerceError> {
    let invalid = || CoerceError::InvalidText {
        what: "duration",
        text: text.to_string(),
    };

    let s = text.trim();
    if s == "0" {
        return Ok(Duration::ZERO);
    }
    if s.is_empty() {
        return Err(invalid());
    }

    let mut total: u128 = 0;
    let mut rest = s;
    while !rest.is_empty() {
        let num_end = rest
            .find(|c: char| !c.is_ascii_digit() && c != '.')
            .unwrap_or(rest.len());
        let (num_str, tail) = rest.split_at(num_end);
        if num_str.is_empty() {
            return Err(invalid());
        }
        let unit_end = tail
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(tail.len());
        let (unit, tail) = tail.split_at(unit_end);
        let nanos = unit_nanos(unit).ok_or_else(invalid)?;

        let amount = match num_str.split_once('.') {
            None => num_str
                .parse::<u128>()
                .map_err(|_| invalid())?
                .checked_mul(nanos)
                .ok_or_else(invalid)?,
            Some(_) => {
                let n: f64 = num_str.parse().map_err(|_| invalid())?;
                (n * nanos as f64).round() as u128
            }
        };
        total = total.checked_add(amount).ok_or_else(invalid)?;
        rest = tail;
    }

    let secs = u64::try_from(total / 1_000_000_000).map_err(|_| invalid())?;
    Ok(Duration::new(secs, (total % 1_000_000_000) as u32))
}

/// Render a duration in the form accepted by [`parse_duration`].
pub fn format_duration(duration: Duration) -> String {
    let mut remaining = duration.as_nanos();
    if remaining == 0 {
        return "0s".to_string();
    }

    let mut out = String::new();
    for (unit, nanos) in UNITS {
        let count = remaining / nanos;
        if count > 0 {
            out.push_str(&count.to_string());
            out.push_str(unit);
            remaining %= nanos;
        }
    }
    out
}
