// Duration expressions such as `30s`, `10m`, `1h30m` (kubetail's --since format)

use anyhow::Result;

/// Parse a duration expression and return seconds
pub fn parse_duration(expr: &str) -> Result<i64> {
    let expr = expr.trim();
    if expr.is_empty() {
        anyhow::bail!("Duration cannot be empty");
    }

    let mut total_secs = 0i64;
    let mut digits = String::new();
    for c in expr.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
            continue;
        }
        let unit = match c {
            'd' => 86400,
            'h' => 3600,
            'm' => 60,
            's' => 1,
            _ => anyhow::bail!("Invalid duration format: {}", expr),
        };
        if digits.is_empty() {
            anyhow::bail!("Invalid duration format: {}", expr);
        }
        let value: i64 = digits.parse()?;
        total_secs = match value.checked_mul(unit).and_then(|secs| total_secs.checked_add(secs)) {
            Some(total) => total,
            None => anyhow::bail!("Duration is too large: {}", expr),
        };
        digits.clear();
    }
    if !digits.is_empty() {
        anyhow::bail!("Invalid duration format: {} (missing unit)", expr);
    }

    if total_secs == 0 {
        anyhow::bail!("Duration must be greater than 0");
    }

    Ok(total_secs)
}

/// clap value parser for `--since`; keeps the original text for kubetail
pub fn validate_since(expr: &str) -> Result<String, String> {
    parse_duration(expr)
        .map(|_| expr.trim().to_string())
        .map_err(|e| e.to_string())
}
