use std::io::IsTerminal;

// ANSI escape codes for terminal formatting
const ANSI_BOLD: &str = "\x1b[1m";
const ANSI_RESET: &str = "\x1b[0m";
const ANSI_FG_RED: &str = "\x1b[31m";
const ANSI_FG_YELLOW: &str = "\x1b[33m";

/// Check if stdout is a terminal (TTY)
pub fn is_tty() -> bool {
    std::io::stdout().is_terminal()
}

/// Check if stderr is a terminal (TTY)
pub fn is_stderr_tty() -> bool {
    std::io::stderr().is_terminal()
}

/// Get terminal width dynamically
///
/// Uses the `terminal_size` crate for reliable detection, with fallback to
/// COLUMNS environment variable and a sensible default.
pub fn get_terminal_width() -> usize {
    if let Some((terminal_size::Width(w), _)) = terminal_size::terminal_size() {
        if w > 0 {
            return w as usize;
        }
    }

    if let Ok(cols) = std::env::var("COLUMNS") {
        if let Ok(width) = cols.parse::<usize>() {
            if width > 0 && width < 10000 {
                return width;
            }
        }
    }

    120
}

fn paint(text: &str, code: &str, enabled: bool) -> String {
    if enabled {
        format!("{}{}{}", code, text, ANSI_RESET)
    } else {
        text.to_string()
    }
}

/// Apply bold formatting if in TTY mode
pub fn bold_if_tty(text: &str, is_tty: bool) -> String {
    paint(text, ANSI_BOLD, is_tty)
}

/// Print a warning to stderr, yellow on a terminal
pub fn print_warning(message: &str) {
    eprintln!("{}", paint(message, ANSI_FG_YELLOW, is_stderr_tty()));
}

/// Echo the captured output of a failed subprocess.
///
/// stdout goes to stdout unchanged, stderr is highlighted in red when stderr is a terminal.
pub fn echo_failure_output(stdout: &str, stderr: &str) {
    if !stdout.trim().is_empty() {
        print!("{}", stdout);
        if !stdout.ends_with('\n') {
            println!();
        }
    }
    if !stderr.trim().is_empty() {
        let text = stderr.trim_end_matches('\n');
        eprintln!("{}", paint(text, ANSI_FG_RED, is_stderr_tty()));
    }
}

/// Format duration in seconds for display
pub fn format_duration(secs: f64) -> String {
    let total = secs.round().max(0.0) as i64;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;

    if hours > 0 {
        format!("{}h{}m{}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m{}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

/// Format a two-column table (name, value) bounded by `width`.
///
/// The first column is sized to its longest entry; values longer than the remaining
/// space are cut with a trailing "..".
pub fn format_two_column_table(headers: (&str, &str), rows: &[(String, String)], width: usize, is_tty: bool) -> String {
    let name_width = rows
        .iter()
        .map(|(name, _)| name.chars().count())
        .chain(std::iter::once(headers.0.len()))
        .max()
        .unwrap_or(0);
    let value_width = width.saturating_sub(name_width + 1).max(10);

    let mut output = String::new();
    let header = format!("{:<nw$} {}", headers.0, headers.1, nw = name_width);
    output.push_str(&bold_if_tty(&header, is_tty));
    output.push('\n');
    let sep_width = (name_width + 1 + headers.1.len()).max(
        rows.iter()
            .map(|(_, value)| name_width + 1 + value.chars().count().min(value_width))
            .max()
            .unwrap_or(0),
    );
    output.push_str(&"-".repeat(sep_width));
    output.push('\n');

    for (name, value) in rows {
        let value = if value.chars().count() > value_width {
            let cut: String = value.chars().take(value_width.saturating_sub(2)).collect();
            format!("{}..", cut)
        } else {
            value.clone()
        };
        output.push_str(&format!("{:<nw$} {}\n", name, value, nw = name_width));
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(4.2), "4s");
        assert_eq!(format_duration(75.0), "1m15s");
        assert_eq!(format_duration(3725.0), "1h2m5s");
        assert_eq!(format_duration(-3.0), "0s");
    }

    #[test]
    fn test_two_column_table_aligns_and_truncates() {
        let rows = vec![
            ("name".to_string(), "demo".to_string()),
            ("template_parameters.num_ps".to_string(), "x".repeat(80)),
        ];
        let table = format_two_column_table(("Name", "Value"), &rows, 40, false);
        let lines: Vec<&str> = table.lines().collect();
        assert!(lines[0].starts_with("Name "));
        assert!(lines[1].chars().all(|c| c == '-'));
        assert_eq!(lines[2].find("demo"), Some(27));
        assert!(lines[3].ends_with(".."));
        assert!(lines[3].chars().count() <= 40);
    }

    #[test]
    fn test_paint_only_on_tty() {
        assert_eq!(bold_if_tty("x", false), "x");
        assert_eq!(bold_if_tty("x", true), "\x1b[1mx\x1b[0m");
    }
}
