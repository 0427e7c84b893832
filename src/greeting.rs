//! Time-of-day greeting for script lines containing `{greeting}`

use chrono::{DateTime, Local, Timelike};

pub const GREETING_PLACEHOLDER: &str = "{greeting}";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GreetingStyle {
    #[default]
    Standard,
    /// Adds "Working late" for late-night and early-morning hours
    NightOwl,
}

pub fn greeting_for_hour(hour: u32, style: GreetingStyle) -> &'static str {
    if style == GreetingStyle::NightOwl && !(5..22).contains(&hour) {
        return "Working late";
    }
    match hour {
        0..=11 => "Good morning",
        12..=17 => "Good afternoon",
        _ => "Good evening",
    }
}

/// Substitute the greeting into every line that asks for it
pub fn render_lines(lines: &[String], at: DateTime<Local>, style: GreetingStyle) -> Vec<String> {
    let greeting = greeting_for_hour(at.hour(), style);
    lines
        .iter()
        .map(|line| line.replace(GREETING_PLACEHOLDER, greeting))
        .collect()
}
