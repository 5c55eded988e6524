use chrono::NaiveDate;
use tracing::debug;

use crate::week::{
  DateRange,
  WeekSelection,
  compute_week_range,
  format_compact_date
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkRequest {
  pub base_url:    String,
  pub timezone_id: String,
  pub week:        WeekSelection
}

impl LinkRequest {
  /// Builds a request from a pasted
  /// link, dropping everything from its
  /// first `&` onward.
  #[must_use]
  pub fn from_raw(
    raw_url: &str,
    timezone_id: &str,
    week: WeekSelection
  ) -> Self {
    Self {
      base_url: extract_base_url(
        raw_url
      )
      .to_string(),
      timezone_id: timezone_id
        .to_string(),
      week
    }
  }
}

/// Prefix of `raw_url` before its first
/// `&`, or the whole string. A lone
/// `?param` is kept as-is.
#[must_use]
pub fn extract_base_url(
  raw_url: &str
) -> &str {
  raw_url
    .split_once('&')
    .map_or(raw_url, |(base, _)| base)
}

/// Appends the timezone, week view and
/// date range parameters. Returns an
/// empty string when there is no base
/// URL.
#[must_use]
pub fn build_link(
  request: &LinkRequest,
  range: &DateRange
) -> String {
  if request.base_url.is_empty() {
    return String::new();
  }

  format!(
    "{}&ctz={}&mode=week&dates={}%2F{}",
    request.base_url,
    request.timezone_id,
    format_compact_date(range.start),
    format_compact_date(range.end)
  )
}

#[tracing::instrument(skip(raw_url), fields(has_url = !raw_url.is_empty()))]
pub fn generate_link(
  raw_url: &str,
  timezone_id: &str,
  week: WeekSelection,
  today: NaiveDate
) -> String {
  let request = LinkRequest::from_raw(
    raw_url,
    timezone_id,
    week
  );
  let range =
    compute_week_range(week, today);
  let link =
    build_link(&request, &range);
  debug!(
    base_url = %request.base_url,
    start = %range.start,
    end = %range.end,
    empty = link.is_empty(),
    "generated link"
  );
  link
}
