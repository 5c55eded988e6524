use std::fmt;

use anyhow::{
  Context,
  anyhow
};
use chrono::{
  Datelike,
  Duration,
  Months,
  NaiveDate
};
use tracing::trace;

/// Which week a generated link should
/// open on.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub enum WeekSelection {
  ThisWeek,
  NextWeek,
  CustomDate(NaiveDate)
}

/// The week choice as presented to a
/// user, before a custom date has been
/// attached.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  clap::ValueEnum,
)]
pub enum WeekMode {
  #[default]
  This,
  Next,
  Custom
}

/// Monday-to-Sunday span of one week.
/// `start` is a Monday and `end` the
/// Sunday six days later, except where
/// the week runs past the ends of the
/// calendar and gets clamped to
/// `NaiveDate::MIN`/`NaiveDate::MAX`.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub struct DateRange {
  pub start: NaiveDate,
  pub end:   NaiveDate
}

impl fmt::Display for DateRange {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    write!(
      f,
      "{} {}",
      self.start.format("%Y-%m-%d"),
      self.end.format("%Y-%m-%d")
    )
  }
}

/// Computes the week a selection refers
/// to. `today` anchors `ThisWeek` and
/// `NextWeek`; a custom date anchors
/// itself.
#[must_use]
pub fn compute_week_range(
  week: WeekSelection,
  today: NaiveDate
) -> DateRange {
  let base = match week {
    | WeekSelection::ThisWeek
    | WeekSelection::NextWeek => today,
    | WeekSelection::CustomDate(
      date
    ) => date
  };

  let mut monday = monday_of(base);
  if week == WeekSelection::NextWeek {
    monday = shift_days(monday, 7);
  }
  let sunday = shift_days(monday, 6);

  trace!(
    ?week,
    %base,
    %monday,
    %sunday,
    "computed week range"
  );

  DateRange {
    start: monday,
    end:   sunday
  }
}

fn monday_of(date: NaiveDate) -> NaiveDate {
  // Sunday=0..Saturday=6; Sunday closes
  // the week that started six days
  // earlier.
  let weekday = date
    .weekday()
    .num_days_from_sunday();
  let back = if weekday == 0 {
    6
  } else {
    weekday - 1
  };
  shift_days(date, -i64::from(back))
}

/// Saturates at the representable
/// calendar bounds.
fn shift_days(
  date: NaiveDate,
  days: i64
) -> NaiveDate {
  let limit = if days < 0 {
    NaiveDate::MIN
  } else {
    NaiveDate::MAX
  };
  date
    .checked_add_signed(Duration::days(
      days
    ))
    .unwrap_or(limit)
}

/// Renders a date as zero-padded
/// `YYYYMMDD`.
#[must_use]
pub fn format_compact_date(
  date: NaiveDate
) -> String {
  date.format("%Y%m%d").to_string()
}

pub fn parse_custom_date(
  input: &str
) -> anyhow::Result<NaiveDate> {
  let token = input.trim();
  if token.is_empty() {
    return Err(anyhow!(
      "custom date cannot be empty"
    ));
  }

  NaiveDate::parse_from_str(
    token, "%Y-%m-%d"
  )
  .with_context(|| {
    format!(
      "invalid custom date '{token}', \
       expected YYYY-MM-DD"
    )
  })
}

/// Window a custom-date picker offers:
/// from today up to the same day next
/// year.
#[must_use]
pub fn custom_date_bounds(
  today: NaiveDate
) -> (NaiveDate, NaiveDate) {
  let max = today
    .checked_add_months(Months::new(12))
    .unwrap_or(today);
  (today, max)
}

#[cfg(test)]
mod tests {
  use chrono::{
    Datelike,
    Duration,
    NaiveDate,
    Weekday
  };

  use super::{
    DateRange,
    WeekSelection,
    compute_week_range,
    custom_date_bounds,
    format_compact_date,
    parse_custom_date
  };

  fn date(
    y: i32,
    m: u32,
    d: u32
  ) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d)
      .expect("valid date")
  }

  #[test]
  fn this_week_from_wednesday() {
    let range = compute_week_range(
      WeekSelection::ThisWeek,
      date(2024, 6, 12)
    );
    assert_eq!(range, DateRange {
      start: date(2024, 6, 10),
      end:   date(2024, 6, 16)
    });
    assert_eq!(
      format_compact_date(range.start),
      "20240610"
    );
    assert_eq!(
      format_compact_date(range.end),
      "20240616"
    );
  }

  #[test]
  fn next_week_from_wednesday() {
    let range = compute_week_range(
      WeekSelection::NextWeek,
      date(2024, 6, 12)
    );
    assert_eq!(range.start, date(2024, 6, 17));
    assert_eq!(range.end, date(2024, 6, 23));
  }

  #[test]
  fn sunday_belongs_to_the_week_ending()
  {
    let range = compute_week_range(
      WeekSelection::ThisWeek,
      date(2024, 6, 16)
    );
    assert_eq!(range.start, date(2024, 6, 10));
    assert_eq!(range.end, date(2024, 6, 16));
  }

  #[test]
  fn monday_starts_its_own_week() {
    let range = compute_week_range(
      WeekSelection::ThisWeek,
      date(2024, 6, 10)
    );
    assert_eq!(range.start, date(2024, 6, 10));
  }

  #[test]
  fn custom_date_ignores_today() {
    let range = compute_week_range(
      WeekSelection::CustomDate(date(
        2025, 1, 1
      )),
      date(2024, 6, 12)
    );
    assert_eq!(range.start, date(2024, 12, 30));
    assert_eq!(range.end, date(2025, 1, 5));
  }

  #[test]
  fn weeks_span_leap_day() {
    let range = compute_week_range(
      WeekSelection::ThisWeek,
      date(2024, 2, 29)
    );
    assert_eq!(range.start, date(2024, 2, 26));
    assert_eq!(range.end, date(2024, 3, 3));
  }

  #[test]
  fn every_day_maps_to_monday_through_sunday()
   {
    let mut day = date(2023, 1, 1);
    for _ in 0..800 {
      let this = compute_week_range(
        WeekSelection::ThisWeek,
        day
      );
      let next = compute_week_range(
        WeekSelection::NextWeek,
        day
      );

      assert_eq!(this.start.weekday(), Weekday::Mon);
      assert_eq!(this.end.weekday(), Weekday::Sun);
      assert_eq!(
        this.end - this.start,
        Duration::days(6)
      );
      assert!(
        this.start <= day && day <= this.end
      );
      assert_eq!(
        next.start,
        this.start + Duration::days(7)
      );

      day += Duration::days(1);
    }
  }

  #[test]
  fn weeks_clamp_at_calendar_edges() {
    let first = NaiveDate::MIN;
    assert_ne!(first.weekday(), Weekday::Mon);
    let this = compute_week_range(
      WeekSelection::ThisWeek,
      first
    );
    assert_eq!(this.start, first);
    assert_eq!(
      this.end,
      first + Duration::days(6)
    );
    let next = compute_week_range(
      WeekSelection::NextWeek,
      first
    );
    assert_eq!(
      next.start,
      first + Duration::days(7)
    );
    assert_eq!(
      next.end,
      first + Duration::days(13)
    );

    let last = NaiveDate::MAX;
    let last_monday =
      last - Duration::days(i64::from(
        last.weekday().num_days_from_monday()
      ));
    assert_eq!(
      compute_week_range(
        WeekSelection::ThisWeek,
        last
      ),
      DateRange {
        start: last_monday,
        end:   last
      }
    );
    assert_eq!(
      compute_week_range(
        WeekSelection::NextWeek,
        last
      ),
      DateRange {
        start: last,
        end:   last
      }
    );
  }

  #[test]
  fn rejects_malformed_custom_dates() {
    assert!(parse_custom_date("").is_err());
    assert!(
      parse_custom_date("2024-13-01")
        .is_err()
    );
    assert!(
      parse_custom_date("12/06/2024")
        .is_err()
    );
    assert_eq!(
      parse_custom_date(" 2024-06-12 ")
        .expect("padded date"),
      date(2024, 6, 12)
    );
  }

  #[test]
  fn bounds_cover_one_year() {
    assert_eq!(
      custom_date_bounds(date(2024, 6, 12)),
      (date(2024, 6, 12), date(2025, 6, 12))
    );
    assert_eq!(
      custom_date_bounds(date(2024, 2, 29)).1,
      date(2025, 2, 28)
    );
  }

  #[test]
  fn range_displays_iso_dates() {
    let range = compute_week_range(
      WeekSelection::ThisWeek,
      date(2024, 6, 12)
    );
    assert_eq!(
      range.to_string(),
      "2024-06-10 2024-06-16"
    );
  }
}
