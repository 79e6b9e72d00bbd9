//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use serde::Serialize;
use serde_json::Value;

use folio_core::sync::Resolved;
use folio_core::{
    ContentKey, ContentValue, HeaderLines, Loaded, ProjectList, SkillList, Source,
    UploadedImageList, VerifiedContent,
};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Check if output is in quiet mode
    pub fn is_quiet(&self) -> bool {
        matches!(self.format, OutputFormat::Quiet)
    }

    pub fn is_json(&self) -> bool {
        matches!(self.format, OutputFormat::Json)
    }

    /// Print one raw field with the tier it came from
    pub fn print_resolved(&self, key: ContentKey, resolved: &Resolved) {
        match self.format {
            OutputFormat::Human => {
                println!("── {} ({}) ──", key, source_label(resolved.source));
                println!("{}", pretty_value(&resolved.value));
            }
            OutputFormat::Json => {
                print_json(&serde_json::json!({
                    "key": key.as_str(),
                    "source": resolved.source.to_string(),
                    "value": json_value(&resolved.value),
                }));
            }
            OutputFormat::Quiet => {
                println!("{}", resolved.value);
            }
        }
    }

    /// Print the header lines, numbered from 1
    pub fn print_header(&self, loaded: &Loaded<HeaderLines>) {
        match self.format {
            OutputFormat::Human => {
                for (index, line) in loaded.doc.lines().iter().enumerate() {
                    println!("{}. {}", index + 1, line);
                }
                println!("\n(from {})", loaded.source);
            }
            OutputFormat::Json => print_loaded_json(loaded),
            OutputFormat::Quiet => {
                for line in loaded.doc.lines() {
                    println!("{}", line);
                }
            }
        }
    }

    pub fn print_skills(&self, loaded: &Loaded<SkillList>) {
        match self.format {
            OutputFormat::Human => {
                if loaded.doc.0.is_empty() {
                    println!("No skills.");
                    return;
                }
                for skill in &loaded.doc.0 {
                    println!(
                        "{:<8} | {:<24} | {:>3}% | {}",
                        truncate(&skill.id, 8),
                        truncate(&skill.title, 24),
                        skill.proficiency_level,
                        truncate(&skill.description, 40)
                    );
                }
                println!("\n{} skill(s) (from {})", loaded.doc.0.len(), loaded.source);
            }
            OutputFormat::Json => print_loaded_json(loaded),
            OutputFormat::Quiet => {
                for skill in &loaded.doc.0 {
                    println!("{}", skill.id);
                }
            }
        }
    }

    pub fn print_projects(&self, loaded: &Loaded<ProjectList>) {
        match self.format {
            OutputFormat::Human => {
                if loaded.doc.0.is_empty() {
                    println!("No projects.");
                    return;
                }
                for project in &loaded.doc.0 {
                    let stack = if project.technologies.is_empty() {
                        project.stack.clone()
                    } else {
                        project.technologies.join(", ")
                    };
                    println!(
                        "{:<8} | {:<28} | {}",
                        truncate(&project.id, 8),
                        truncate(&project.title, 28),
                        truncate(&stack, 40)
                    );
                }
                println!(
                    "\n{} project(s) (from {})",
                    loaded.doc.0.len(),
                    loaded.source
                );
            }
            OutputFormat::Json => print_loaded_json(loaded),
            OutputFormat::Quiet => {
                for project in &loaded.doc.0 {
                    println!("{}", project.id);
                }
            }
        }
    }

    pub fn print_images(&self, loaded: &Loaded<UploadedImageList>) {
        match self.format {
            OutputFormat::Human => {
                if loaded.doc.0.is_empty() {
                    println!("No uploaded images.");
                    return;
                }
                for image in &loaded.doc.0 {
                    let location = if image.is_inline() {
                        "(inline)".to_string()
                    } else {
                        image.data.clone()
                    };
                    println!(
                        "{:<30} | {:>8} | {}",
                        truncate(&image.name, 30),
                        human_size(image.size),
                        location
                    );
                }
                println!("\n{} image(s) (from {})", loaded.doc.0.len(), loaded.source);
            }
            OutputFormat::Json => print_loaded_json(loaded),
            OutputFormat::Quiet => {
                for image in &loaded.doc.0 {
                    println!("{}", image.data);
                }
            }
        }
    }

    pub fn print_verified(&self, loaded: &Loaded<VerifiedContent>) {
        let verified = &loaded.doc;
        match self.format {
            OutputFormat::Human => {
                println!("About: {}", verified.about_text);
                println!("Photo: {}", verified.photo_url);

                println!();
                println!("── Results ({}) ──", verified.results.len());
                for result in &verified.results {
                    println!(
                        "{:<8} | {} - {}",
                        truncate(&result.id, 8),
                        result.title,
                        truncate_line(&result.description, 50)
                    );
                }

                println!();
                println!("── FAQs ({}) ──", verified.faqs.len());
                for faq in &verified.faqs {
                    println!("Q: {}", faq.question);
                    println!("A: {}", truncate_line(&faq.answer, 70));
                }
                println!("\n(from {})", loaded.source);
            }
            OutputFormat::Json => print_loaded_json(loaded),
            OutputFormat::Quiet => {
                println!("{}", verified.about_text);
            }
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                print_json(&serde_json::json!({"status": "success", "message": message}));
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print a warning; shown even in quiet mode
    pub fn warning(&self, message: &str) {
        match self.format {
            OutputFormat::Json => {
                print_json(&serde_json::json!({"status": "warning", "message": message}));
            }
            _ => eprintln!("⚠ {}", message),
        }
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                print_json(&serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }
}

fn print_loaded_json<D: Serialize>(loaded: &Loaded<D>) {
    print_json(&serde_json::json!({
        "source": loaded.source.to_string(),
        "value": loaded.doc,
    }));
}

/// Print pretty JSON to stdout
pub fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to encode output: {}", e),
    }
}

/// A stored value as JSON: parsed when it is JSON text, a string otherwise
pub fn json_value(value: &ContentValue) -> Value {
    serde_json::from_str(value.as_str()).unwrap_or_else(|_| Value::String(value.to_string()))
}

/// Indented JSON when the value is JSON text, the raw text otherwise
fn pretty_value(value: &ContentValue) -> String {
    match serde_json::from_str::<Value>(value.as_str()) {
        Ok(parsed @ (Value::Array(_) | Value::Object(_))) => {
            serde_json::to_string_pretty(&parsed).unwrap_or_else(|_| value.to_string())
        }
        _ => value.to_string(),
    }
}

/// Label for the tier a value was resolved from
pub fn source_label(source: Source) -> &'static str {
    match source {
        Source::Server => "live from the server",
        Source::Cache => "from the local cache (server unreachable)",
        Source::Default => "built-in default",
        Source::Notification => "pushed by this process",
    }
}

/// Format a byte count for people
pub fn human_size(bytes: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = KIB * 1024;
    if bytes >= MIB {
        format!("{:.1} MiB", bytes as f64 / MIB as f64)
    } else if bytes >= KIB {
        format!("{:.1} KiB", bytes as f64 / KIB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Truncate a string to max length, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Truncate to first line and max length
fn truncate_line(s: &str, max_len: usize) -> String {
    let first_line = s.lines().next().unwrap_or("");
    truncate(first_line, max_len)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_flags() {
        assert_eq!(OutputFormat::from_flags(false, false), OutputFormat::Human);
        assert_eq!(OutputFormat::from_flags(true, false), OutputFormat::Json);
        assert_eq!(OutputFormat::from_flags(false, true), OutputFormat::Quiet);
        // Quiet takes precedence
        assert_eq!(OutputFormat::from_flags(true, true), OutputFormat::Quiet);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("this is a long string", 10), "this is...");
        assert_eq!(truncate("ünïcödé text", 6), "ünï...");
    }

    #[test]
    fn test_truncate_line() {
        assert_eq!(truncate_line("single line", 20), "single line");
        assert_eq!(truncate_line("line one\nline two", 20), "line one");
    }

    #[test]
    fn test_json_value() {
        assert_eq!(
            json_value(&ContentValue::new(r#"["a","b"]"#)),
            serde_json::json!(["a", "b"])
        );
        assert_eq!(
            json_value(&ContentValue::new("plain tagline")),
            Value::String("plain tagline".to_string())
        );
    }

    #[test]
    fn test_pretty_value_keeps_plain_text() {
        assert_eq!(pretty_value(&ContentValue::new("I am a sharp,")), "I am a sharp,");
        assert!(pretty_value(&ContentValue::new(r#"{"a":1}"#)).contains("\n"));
        // Numbers and quoted strings are shown as stored
        assert_eq!(pretty_value(&ContentValue::new("42")), "42");
    }

    #[test]
    fn test_human_size() {
        assert_eq!(human_size(512), "512 B");
        assert_eq!(human_size(2048), "2.0 KiB");
        assert_eq!(human_size(5 * 1024 * 1024), "5.0 MiB");
    }
}
