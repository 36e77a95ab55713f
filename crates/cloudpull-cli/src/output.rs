//! Human and JSON output for CLI commands

/// Output format selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Human,
    Json,
}

impl OutputFormat {
    pub fn is_json(self) -> bool {
        matches!(self, Self::Json)
    }
}

/// Trait for formatting CLI output
///
/// `success` and `info` go to stdout, `warn` and `error` to stderr.
pub trait OutputFormatter {
    fn success(&self, message: &str);
    fn error(&self, message: &str);
    fn warn(&self, message: &str);
    fn info(&self, message: &str);
    fn print_json(&self, value: &serde_json::Value);
}

/// Severity of a one-line status message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Ok,
    Warning,
    Failure,
}

impl Status {
    fn glyph(self) -> &'static str {
        match self {
            Self::Ok => "\u{2713}",
            Self::Warning => "\u{26a0} Warning:",
            Self::Failure => "\u{2717} Error:",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Warning => "warning",
            Self::Failure => "error",
        }
    }
}

fn human_line(status: Status, message: &str) -> String {
    format!("{} {message}", status.glyph())
}

fn json_line(status: Status, message: &str) -> serde_json::Value {
    serde_json::json!({
        "status": status.label(),
        "success": status != Status::Failure,
        "message": message,
    })
}

/// Glyph-prefixed lines for terminals; `quiet` drops `info` detail lines
pub struct HumanFormatter {
    quiet: bool,
}

impl OutputFormatter for HumanFormatter {
    fn success(&self, message: &str) {
        println!("{}", human_line(Status::Ok, message));
    }
    fn error(&self, message: &str) {
        eprintln!("{}", human_line(Status::Failure, message));
    }
    fn warn(&self, message: &str) {
        eprintln!("{}", human_line(Status::Warning, message));
    }
    fn info(&self, message: &str) {
        if !self.quiet {
            println!("  {message}");
        }
    }
    fn print_json(&self, _value: &serde_json::Value) {}
}

/// One JSON document per status line; detail lines are dropped
pub struct JsonFormatter;

impl OutputFormatter for JsonFormatter {
    fn success(&self, message: &str) {
        println!("{}", json_line(Status::Ok, message));
    }
    fn error(&self, message: &str) {
        eprintln!("{}", json_line(Status::Failure, message));
    }
    fn warn(&self, message: &str) {
        eprintln!("{}", json_line(Status::Warning, message));
    }
    fn info(&self, _message: &str) {}
    fn print_json(&self, value: &serde_json::Value) {
        match serde_json::to_string_pretty(value) {
            Ok(text) => println!("{text}"),
            Err(_) => println!("{value}"),
        }
    }
}

/// Renders a byte count the way `ls -h` does
pub fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "K", "M", "G", "T"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes}B")
    } else {
        format!("{value:.1}{}", UNITS[unit])
    }
}
