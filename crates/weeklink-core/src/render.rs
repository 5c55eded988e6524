use std::io::{self, IsTerminal, Write};

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use unicode_width::UnicodeWidthStr;

use crate::config::Config;
use crate::prefs::Preferences;
use crate::timezone::{self, Timezone};
use crate::week::DateRange;

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let color_cfg = cfg.get("color").unwrap_or_else(|| "on".to_string());
        let color = match color_cfg.to_ascii_lowercase().as_str() {
            "on" | "yes" | "true" | "1" => true,
            "off" | "no" | "false" | "0" => false,
            other => return Err(anyhow!("invalid color setting: {other}")),
        };

        Ok(Self { color })
    }

    #[tracing::instrument(skip(self, link))]
    pub fn print_link(&mut self, link: &str) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        writeln!(out, "{link}")?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub fn print_range(&mut self, range: &DateRange) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        writeln!(out, "{range}")?;
        Ok(())
    }

    #[tracing::instrument(skip(self, zones, recent))]
    pub fn print_timezone_table(
        &mut self,
        zones: &[&Timezone],
        selected: &str,
        recent: &[String],
    ) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        let rows = zones
            .iter()
            .map(|tz| {
                let marker = if tz.identifier == selected {
                    self.paint("*", "32")
                } else if recent.iter().any(|id| id == tz.identifier) {
                    self.paint("r", "33")
                } else {
                    String::new()
                };
                vec![marker, tz.identifier.to_string(), tz.name.to_string()]
            })
            .collect();

        write_table(&mut out, &["", "Identifier", "Name"], rows)
    }

    #[tracing::instrument(skip(self, recent))]
    pub fn print_recent(&mut self, recent: &[String], selected: &str) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        if recent.is_empty() {
            writeln!(out, "No recent timezones.")?;
            return Ok(());
        }

        let rows = recent
            .iter()
            .enumerate()
            .map(|(idx, id)| {
                let position = (idx + 1).to_string();
                let position = if id == selected {
                    self.paint(&position, "32")
                } else {
                    position
                };
                vec![position, id.clone(), timezone::display_name(id).to_string()]
            })
            .collect();

        write_table(&mut out, &["#", "Identifier", "Name"], rows)
    }

    #[tracing::instrument(skip(self, prefs))]
    pub fn print_preferences(&mut self, prefs: &Preferences) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        writeln!(
            out,
            "url       {}",
            prefs.calendar_url.clone().unwrap_or_default()
        )?;
        writeln!(
            out,
            "timezone  {}",
            prefs.timezone.clone().unwrap_or_default()
        )?;
        writeln!(out, "recent    {}", prefs.recent_timezones.join(", "))?;

        if let Some(dismissed) = prefs
            .install_dismissed_at
            .and_then(DateTime::<Utc>::from_timestamp_millis)
        {
            writeln!(
                out,
                "install   dismissed {}",
                dismissed.format("%Y-%m-%dT%H:%M:%SZ")
            )?;
        }

        Ok(())
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color || !io::stdout().is_terminal() {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn write_table<W: Write>(
    mut writer: W,
    headers: &[&str],
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let mut widths: Vec<usize> = headers
        .iter()
        .map(|header| UnicodeWidthStr::width(*header))
        .collect();

    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for (header, &width) in headers.iter().zip(&widths) {
        write!(writer, "{header:width$} ")?;
    }
    writeln!(writer)?;

    for &width in &widths {
        write!(writer, "{:-<width$} ", "")?;
    }
    writeln!(writer)?;

    for row in rows {
        for (cell, width) in row.iter().zip(&widths) {
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = width.saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}
