use colored::{ColoredString, Colorize};
use goalkit::{GoalStatus, SyncResult};

/// Print an info message
pub fn info(msg: &str) {
    println!("{} {}", "ℹ".blue(), msg);
}

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print a warning message
pub fn warn(msg: &str) {
    println!("{} {}", "⚠".yellow(), msg);
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print a dim/muted message
pub fn dim(msg: &str) {
    println!("  {}", msg.dimmed());
}

/// Print a header/title
pub fn header(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "─".repeat(title.chars().count()).dimmed());
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    println!("  {}: {}", key.dimmed(), value);
}

// ============================================================================
// Goal Output
// ============================================================================

/// Colored status label
pub fn status_badge(status: GoalStatus) -> ColoredString {
    let label = format!("{:<9}", status.to_string());
    match status {
        GoalStatus::OnTrack => label.green().bold(),
        GoalStatus::AtRisk => label.yellow().bold(),
        GoalStatus::OffTrack => label.red().bold(),
    }
}

/// Print one synced goal, indented by nesting depth
pub fn goal_line(result: &SyncResult, depth: usize) {
    println!(
        "{}{} {} {} / {} {}",
        "  ".repeat(depth + 1),
        status_badge(result.status),
        result.goal.bold(),
        format_value(result.current_value),
        format_value(result.target_value),
        format!("({})", format_percent(result.ratio())).dimmed()
    );
}

/// Format a metric value without trailing zeros
pub fn format_value(value: f64) -> String {
    let text = format!("{value:.4}");
    let trimmed = text.trim_end_matches('0').trim_end_matches('.');
    if trimmed == "-0" { "0".to_string() } else { trimmed.to_string() }
}

/// Format a ratio as a percentage
pub fn format_percent(ratio: f64) -> String {
    format!("{:.1}%", ratio * 100.0)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(40.0), "40");
        assert_eq!(format_value(0.678), "0.678");
        assert_eq!(format_value(3745000.0), "3745000");
        assert_eq!(format_value(8.12), "8.12");
        assert_eq!(format_value(-0.0), "0");
    }

    #[test]
    fn test_format_percent() {
        assert_eq!(format_percent(0.678), "67.8%");
        assert_eq!(format_percent(0.2), "20.0%");
        assert_eq!(format_percent(1.0), "100.0%");
    }

    #[test]
    fn test_status_badge_text() {
        colored::control::set_override(false);
        assert_eq!(status_badge(GoalStatus::AtRisk).to_string(), "AT_RISK  ");
        colored::control::unset_override();
    }
}
