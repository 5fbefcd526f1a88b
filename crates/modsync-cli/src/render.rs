use std::io::IsTerminal;

use anstyle::{AnsiColor, Effects, Style};
use serde::Deserialize;

use crate::config::CliConfig;

pub(crate) const OUTPUT_ENV: &str = "MODSYNC_OUTPUT";

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum OutputStyle {
    Plain,
    Rich,
}

impl OutputStyle {
    pub(crate) fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "plain" => Some(Self::Plain),
            "rich" => Some(Self::Rich),
            _ => None,
        }
    }
}

pub(crate) fn resolve_output_style(config: &CliConfig) -> OutputStyle {
    let env_style = std::env::var(OUTPUT_ENV)
        .ok()
        .and_then(|value| OutputStyle::parse(&value));
    output_style_from(env_style, config.output.style, std::io::stdout().is_terminal())
}

pub(crate) fn output_style_from(
    env_style: Option<OutputStyle>,
    config_style: Option<OutputStyle>,
    is_terminal: bool,
) -> OutputStyle {
    env_style.or(config_style).unwrap_or(if is_terminal {
        OutputStyle::Rich
    } else {
        OutputStyle::Plain
    })
}

pub(crate) fn render_status_line(style: OutputStyle, status: &str, message: &str) -> String {
    match style {
        OutputStyle::Plain => message.to_string(),
        OutputStyle::Rich => format!("{} {message}", status_badge(status)),
    }
}

/// Status token for one activity line of an apply run.
pub(crate) fn activity_status(line: &str) -> &'static str {
    if line.starts_with("Skipped") {
        "skip"
    } else if line.starts_with("Stopped") || line.starts_with("Removed") {
        "step"
    } else {
        "ok"
    }
}

pub(crate) fn render_activity_lines(style: OutputStyle, log: &[String]) -> Vec<String> {
    log.iter()
        .map(|line| render_status_line(style, activity_status(line), line))
        .collect()
}

pub(crate) fn print_lines(style: OutputStyle, lines: &[String]) {
    let color = style == OutputStyle::Rich && std::io::stdout().is_terminal();
    for line in lines {
        if color {
            println!("{}", colorize_badge(line));
        } else {
            println!("{line}");
        }
    }
}

fn status_badge(status: &str) -> &'static str {
    match status {
        "ok" => "[OK]",
        "skip" => "[SKIP]",
        "step" => "[..]",
        "warn" => "[WARN]",
        _ => "[ERR]",
    }
}

fn badge_style(badge: &str) -> Style {
    let color = match badge {
        "[OK]" => AnsiColor::BrightGreen,
        "[SKIP]" | "[..]" => AnsiColor::BrightBlue,
        "[WARN]" => AnsiColor::BrightYellow,
        _ => AnsiColor::BrightRed,
    };
    Style::new().fg_color(Some(color.into())).effects(Effects::BOLD)
}

fn colorize_badge(line: &str) -> String {
    let Some((badge, rest)) = line.split_once(' ') else {
        return line.to_string();
    };
    if !(badge.starts_with('[') && badge.ends_with(']')) {
        return line.to_string();
    }
    format!("{} {rest}", colorize(badge_style(badge), badge))
}

fn colorize(style: Style, text: &str) -> String {
    format!("{}{}{}", style.render(), text, style.render_reset())
}
