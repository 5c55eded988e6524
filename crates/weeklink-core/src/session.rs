//! UI-agnostic state behind the link
//! maker. Front ends read from it and
//! call its actions; the link is
//! recomputed on every read.

use chrono::{
  DateTime,
  NaiveDate,
  Utc
};
use tracing::{
  debug,
  info,
  warn
};

use crate::install::{
  InstallCapability,
  InstallOutcome,
  InstallPrompt
};
use crate::link::generate_link;
use crate::prefs::{
  KeyValueStore,
  Preferences,
  push_recent,
  save_calendar_url,
  save_recent_timezones,
  save_timezone
};
use crate::timezone::{
  self,
  Timezone
};
use crate::week::{
  DateRange,
  WeekMode,
  WeekSelection,
  compute_week_range,
  custom_date_bounds,
  parse_custom_date
};

#[derive(Debug)]
pub struct Session<S> {
  store:             S,
  today:             NaiveDate,
  calendar_url:      String,
  selected_timezone: String,
  timezone_search:   String,
  week_mode:         WeekMode,
  custom_date:       Option<NaiveDate>,
  recent_timezones:  Vec<String>,
  install_prompt:    InstallPrompt
}

impl<S: KeyValueStore> Session<S> {
  /// Restores saved preferences.
  /// `default_timezone` applies only
  /// when none was saved.
  #[tracing::instrument(skip(store))]
  pub fn open(
    store: S,
    today: NaiveDate,
    default_timezone: &str
  ) -> anyhow::Result<Self> {
    let prefs = Preferences::load(&store)?;

    let (selected_timezone, timezone_search) =
      match prefs.timezone {
        | Some(saved) => {
          let search = timezone::find(
            &saved
          )
          .map(|tz| tz.name.to_string())
          .unwrap_or_default();
          (saved, search)
        }
        | None => {
          (
            default_timezone.to_string(),
            timezone::display_name(
              default_timezone
            )
            .to_string()
          )
        }
      };

    info!(
      timezone = %selected_timezone,
      has_url = prefs.calendar_url.is_some(),
      "opened session"
    );

    Ok(Self {
      store,
      today,
      calendar_url: prefs
        .calendar_url
        .unwrap_or_default(),
      selected_timezone,
      timezone_search,
      week_mode: WeekMode::This,
      custom_date: Some(today),
      recent_timezones: prefs
        .recent_timezones,
      install_prompt:
        InstallPrompt::default()
    })
  }

  pub fn calendar_url(&self) -> &str {
    &self.calendar_url
  }

  pub fn selected_timezone(&self) -> &str {
    &self.selected_timezone
  }

  pub fn timezone_search(&self) -> &str {
    &self.timezone_search
  }

  pub fn week_mode(&self) -> WeekMode {
    self.week_mode
  }

  pub fn custom_date(
    &self
  ) -> Option<NaiveDate> {
    self.custom_date
  }

  pub fn recent_timezones(
    &self
  ) -> &[String] {
    &self.recent_timezones
  }

  pub fn today(&self) -> NaiveDate {
    self.today
  }

  pub fn store(&self) -> &S {
    &self.store
  }

  pub fn into_store(self) -> S {
    self.store
  }

  /// Non-empty URLs are remembered.
  pub fn set_calendar_url(
    &mut self,
    url: &str
  ) -> anyhow::Result<()> {
    self.calendar_url = url.to_string();
    if !url.is_empty() {
      save_calendar_url(
        &mut self.store,
        url
      )?;
    }
    Ok(())
  }

  #[tracing::instrument(skip(self))]
  pub fn select_timezone(
    &mut self,
    identifier: &str
  ) -> anyhow::Result<()> {
    self.selected_timezone =
      identifier.to_string();
    self.timezone_search =
      timezone::display_name(identifier)
        .to_string();

    if identifier.is_empty() {
      return Ok(());
    }

    save_timezone(
      &mut self.store,
      identifier
    )?;
    self.recent_timezones = push_recent(
      &self.recent_timezones,
      identifier
    );
    save_recent_timezones(
      &mut self.store,
      &self.recent_timezones
    )?;
    debug!(
      recent = ?self.recent_timezones,
      "updated recent timezones"
    );
    Ok(())
  }

  /// Only catalog zones can be picked
  /// from the recency list; returns
  /// whether the selection happened.
  pub fn select_recent_timezone(
    &mut self,
    identifier: &str
  ) -> anyhow::Result<bool> {
    let Some(tz) =
      timezone::find(identifier)
    else {
      warn!(
        timezone = %identifier,
        "recent timezone not in catalog"
      );
      return Ok(false);
    };
    self.select_timezone(tz.identifier)?;
    Ok(true)
  }

  pub fn set_timezone_search(
    &mut self,
    search: &str
  ) {
    self.timezone_search =
      search.to_string();
  }

  #[must_use]
  pub fn filtered_timezones(
    &self
  ) -> Vec<&'static Timezone> {
    timezone::filter(
      &self.timezone_search,
      &self.selected_timezone
    )
  }

  pub fn select_week(
    &mut self,
    mode: WeekMode
  ) {
    self.week_mode = mode;
  }

  /// An empty value clears the custom
  /// date; anything else must be
  /// `YYYY-MM-DD`.
  pub fn set_custom_date(
    &mut self,
    input: &str
  ) -> anyhow::Result<()> {
    if input.trim().is_empty() {
      self.custom_date = None;
      return Ok(());
    }
    self.custom_date =
      Some(parse_custom_date(input)?);
    Ok(())
  }

  #[must_use]
  pub fn custom_date_in_bounds(
    &self
  ) -> bool {
    let (min, max) =
      custom_date_bounds(self.today);
    self.custom_date.is_none_or(|date| {
      min <= date && date <= max
    })
  }

  #[must_use]
  pub fn week_selection(
    &self
  ) -> WeekSelection {
    match self.week_mode {
      | WeekMode::This => {
        WeekSelection::ThisWeek
      }
      | WeekMode::Next => {
        WeekSelection::NextWeek
      }
      | WeekMode::Custom => {
        WeekSelection::CustomDate(
          self
            .custom_date
            .unwrap_or(self.today)
        )
      }
    }
  }

  #[must_use]
  pub fn week_range(&self) -> DateRange {
    compute_week_range(
      self.week_selection(),
      self.today
    )
  }

  #[must_use]
  pub fn generated_link(&self) -> String {
    generate_link(
      &self.calendar_url,
      &self.selected_timezone,
      self.week_selection(),
      self.today
    )
  }

  #[must_use]
  pub fn install_prompt_visible(
    &self
  ) -> bool {
    self.install_prompt.is_visible()
  }

  pub fn offer_install(
    &mut self,
    capability: &dyn InstallCapability
  ) {
    self.install_prompt.offer(capability);
  }

  pub fn install(
    &mut self,
    capability: &mut dyn InstallCapability
  ) -> anyhow::Result<Option<InstallOutcome>>
  {
    self.install_prompt.install(capability)
  }

  pub fn dismiss_install_prompt(
    &mut self,
    now: DateTime<Utc>
  ) -> anyhow::Result<()> {
    self
      .install_prompt
      .dismiss(&mut self.store, now)
  }
}
