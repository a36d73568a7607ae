use crate::ui::{theme, Icons};
use chrono::{DateTime, Utc};
use owo_colors::OwoColorize;
use std::time::Duration;

pub fn header(text: &str) {
    println!("{} {}", Icons::DATABASE, text.style(theme().header.clone()));
}

pub fn success(label: &str) {
    println!("{} {}", Icons::CHECK, label.style(theme().success.clone()));
}

pub fn error(label: &str) {
    eprintln!("{} {}", Icons::CROSS, label.style(theme().error.clone()));
}

pub fn warn(label: &str) {
    eprintln!("{} {}", Icons::WARN, label.style(theme().warn.clone()));
}

pub fn info(label: &str, value: &str) {
    println!("{} {}: {}", Icons::INFO, label.style(theme().label.clone()), value);
}

pub fn section(title: &str) {
    println!();
    println!("━{}━", title.style(theme().header.clone()));
}

pub fn summary_row(label: &str, value: &str) {
    println!("  {} {}", label.style(theme().label.clone()), value);
}

/// Startup banner: endpoint, probe latency and readiness time
pub fn ready(endpoint: &str, latency: Duration, ready_at: DateTime<Utc>, tables: &[String]) {
    success(&format!("Successfully connected to {}", endpoint));
    println!(
        "  {} Server latency: {}ms",
        Icons::CLOCK,
        latency.as_millis().style(theme().value.clone())
    );
    summary_row("Ready at:", &ready_at.to_rfc3339());
    summary_row("Tables:", &tables.join(", "));
}
