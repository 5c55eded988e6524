use std::fs;
use std::path::{
  Path,
  PathBuf
};
use std::sync::OnceLock;

use chrono::{
  DateTime,
  Local,
  NaiveDate,
  Utc
};
use chrono_tz::Tz;
use serde::Deserialize;

const TIME_CONFIG_FILE: &str =
  "weeklink-time.toml";
const LOCAL_TIMEZONE_ENV_VAR: &str =
  "WEEKLINK_LOCAL_TIMEZONE";
const TIME_CONFIG_ENV_VAR: &str =
  "WEEKLINK_TIME_CONFIG";

#[derive(Debug, Deserialize)]
struct TimeConfig {
  timezone: Option<String>,
  time:     Option<TimeSection>
}

#[derive(Debug, Deserialize)]
struct TimeSection {
  timezone: Option<String>
}

/// The zone "today" is measured in, or
/// `None` to follow the system clock's
/// local zone.
pub fn local_timezone()
-> Option<&'static Tz> {
  static LOCAL_TZ: OnceLock<Option<Tz>> =
    OnceLock::new();
  LOCAL_TZ
    .get_or_init(resolve_local_timezone)
    .as_ref()
}

#[must_use]
pub fn local_today(
  now: DateTime<Utc>
) -> NaiveDate {
  date_in(now, local_timezone())
}

#[must_use]
pub fn date_in(
  now: DateTime<Utc>,
  tz: Option<&Tz>
) -> NaiveDate {
  match tz {
    | Some(tz) => {
      now.with_timezone(tz).date_naive()
    }
    | None => {
      now.with_timezone(&Local)
        .date_naive()
    }
  }
}

fn resolve_local_timezone() -> Option<Tz>
{
  if let Ok(raw) =
    std::env::var(LOCAL_TIMEZONE_ENV_VAR)
    && let Some(tz) = parse_timezone(
      &raw,
      LOCAL_TIMEZONE_ENV_VAR
    )
  {
    return Some(tz);
  }

  if let Some(path) = time_config_path()
    && let Some(tz) =
      load_timezone_from_file(&path)
  {
    return Some(tz);
  }

  tracing::debug!(
    "no local timezone configured; \
     using system local time"
  );
  None
}

fn time_config_path() -> Option<PathBuf>
{
  if let Ok(raw) =
    std::env::var(TIME_CONFIG_ENV_VAR)
  {
    let trimmed = raw.trim();
    if !trimmed.is_empty() {
      return Some(PathBuf::from(
        trimmed
      ));
    }
  }

  std::env::current_dir()
    .ok()
    .map(|dir| dir.join(TIME_CONFIG_FILE))
}

fn load_timezone_from_file(
  path: &Path
) -> Option<Tz> {
  if !path.exists() {
    tracing::debug!(
      file = %path.display(),
      "time config file not found"
    );
    return None;
  }

  let raw = match fs::read_to_string(
    path
  ) {
    | Ok(raw) => raw,
    | Err(err) => {
      tracing::error!(
        file = %path.display(),
        error = %err,
        "failed reading time config file"
      );
      return None;
    }
  };

  let timezone =
    timezone_from_toml(&raw, path)?;
  parse_timezone(
    &timezone,
    &format!("file:{}", path.display())
  )
}

fn timezone_from_toml(
  raw: &str,
  path: &Path
) -> Option<String> {
  let parsed = match toml::from_str::<
    TimeConfig
  >(raw)
  {
    | Ok(parsed) => parsed,
    | Err(err) => {
      tracing::error!(
        file = %path.display(),
        error = %err,
        "failed parsing time config file"
      );
      return None;
    }
  };

  let timezone =
    parsed.timezone.or_else(|| {
      parsed.time.and_then(|section| {
        section.timezone
      })
    });
  if timezone.is_none() {
    tracing::warn!(
      file = %path.display(),
      "time config had no timezone field"
    );
  }
  timezone
}

fn parse_timezone(
  raw: &str,
  source: &str
) -> Option<Tz> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    tracing::warn!(
      source,
      "timezone source was empty"
    );
    return None;
  }

  match trimmed.parse::<Tz>() {
    | Ok(tz) => {
      tracing::info!(
        source,
        timezone = %trimmed,
        "configured local timezone"
      );
      Some(tz)
    }
    | Err(err) => {
      tracing::error!(
        source,
        timezone = %trimmed,
        error = %err,
        "failed to parse timezone id"
      );
      None
    }
  }
}

#[cfg(test)]
mod tests {
  use std::path::Path;

  use chrono::{
    NaiveDate,
    TimeZone,
    Utc
  };

  use super::{
    date_in,
    parse_timezone,
    timezone_from_toml
  };

  #[test]
  fn date_follows_the_given_zone() {
    let now = Utc
      .with_ymd_and_hms(
        2024, 6, 16, 23, 30, 0
      )
      .single()
      .expect("valid now");

    let tokyo = parse_timezone(
      "Asia/Tokyo",
      "test"
    )
    .expect("tokyo");
    let chicago = parse_timezone(
      "America/Chicago",
      "test"
    )
    .expect("chicago");

    assert_eq!(
      date_in(now, Some(&tokyo)),
      NaiveDate::from_ymd_opt(2024, 6, 17)
        .expect("date")
    );
    assert_eq!(
      date_in(now, Some(&chicago)),
      NaiveDate::from_ymd_opt(2024, 6, 16)
        .expect("date")
    );
  }

  #[test]
  fn rejects_blank_and_unknown_zones() {
    assert!(
      parse_timezone("  ", "test")
        .is_none()
    );
    assert!(
      parse_timezone("Nowhere/Land", "test")
        .is_none()
    );
  }

  #[test]
  fn reads_top_level_or_section_timezone()
   {
    let path = Path::new("inline.toml");
    assert_eq!(
      timezone_from_toml(
        "timezone = \"Europe/Paris\"",
        path
      )
      .as_deref(),
      Some("Europe/Paris")
    );
    assert_eq!(
      timezone_from_toml(
        "[time]\ntimezone = \"Asia/Dubai\"",
        path
      )
      .as_deref(),
      Some("Asia/Dubai")
    );
    assert_eq!(
      timezone_from_toml("", path),
      None
    );
  }
}
