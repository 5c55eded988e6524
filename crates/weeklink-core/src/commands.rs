use anyhow::anyhow;
use chrono::{
  NaiveDate,
  Utc
};
use tracing::{
  debug,
  info,
  instrument,
  warn
};

use crate::actions;
use crate::cli::{
  Command,
  LinkArgs,
  WeekArgs
};
use crate::config::Config;
use crate::prefs::{
  self,
  KeyValueStore,
  Preferences
};
use crate::render::Renderer;
use crate::session::Session;
use crate::timezone;
use crate::week::{
  WeekMode,
  custom_date_bounds
};

#[instrument(skip(
  store, cfg, renderer, command
))]
pub fn dispatch<S: KeyValueStore>(
  store: S,
  cfg: &Config,
  renderer: &mut Renderer,
  command: Command,
  today: NaiveDate
) -> anyhow::Result<()> {
  debug!(?command, "dispatching command");
  let default_timezone =
    cfg.default_timezone();
  let mut session = Session::open(
    store,
    today,
    &default_timezone
  )?;

  match command {
    | Command::Link(args) => {
      cmd_link(
        &mut session,
        cfg,
        renderer,
        &args
      )
    }
    | Command::Range(args) => {
      cmd_range(
        &mut session,
        renderer,
        &args
      )
    }
    | Command::Timezones {
      query
    } => {
      cmd_timezones(
        &mut session,
        renderer,
        query.as_deref()
      )
    }
    | Command::Recent => {
      renderer.print_recent(
        session.recent_timezones(),
        session.selected_timezone()
      )
    }
    | Command::Prefs {
      clear
    } => cmd_prefs(session, renderer, clear)
  }
}

#[instrument(skip(
  session, cfg, renderer, args
))]
fn cmd_link<S: KeyValueStore>(
  session: &mut Session<S>,
  cfg: &Config,
  renderer: &mut Renderer,
  args: &LinkArgs
) -> anyhow::Result<()> {
  info!("command link");
  apply_link_args(session, args)?;

  let link = session.generated_link();
  if link.is_empty() {
    println!(
      "No calendar link saved yet. Run \
       `weeklink link <URL>` with a \
       Google Calendar link."
    );
    return Ok(());
  }

  renderer.print_link(&link)?;

  if args.copy
    || cfg
      .get_bool("link.copy")
      .unwrap_or(false)
  {
    actions::copy_to_clipboard(&link)?;
    eprintln!("Copied link to clipboard.");
  }
  if args.open
    || cfg
      .get_bool("link.open")
      .unwrap_or(false)
  {
    actions::open_in_browser(&link)?;
  }

  Ok(())
}

/// Feeds command-line choices into the
/// session the same way interactive
/// edits would.
pub fn apply_link_args<S: KeyValueStore>(
  session: &mut Session<S>,
  args: &LinkArgs
) -> anyhow::Result<()> {
  if let Some(url) = &args.url {
    session.set_calendar_url(url.trim())?;
  }

  if let Some(tz) = &args.timezone {
    let tz = tz.trim();
    if tz.is_empty() {
      return Err(anyhow!(
        "timezone cannot be empty"
      ));
    }
    if !timezone::is_known_zone(tz) {
      warn!(
        timezone = %tz,
        "timezone id not in tz database; passing it through"
      );
    }
    session.select_timezone(tz)?;
  }

  apply_week_args(session, &args.week)
}

fn apply_week_args<S: KeyValueStore>(
  session: &mut Session<S>,
  args: &WeekArgs
) -> anyhow::Result<()> {
  let mode = match (args.week, &args.date)
  {
    | (Some(mode), _) => mode,
    | (None, Some(_)) => WeekMode::Custom,
    | (None, None) => WeekMode::This
  };
  session.select_week(mode);

  if let Some(date) = &args.date {
    if mode != WeekMode::Custom {
      warn!(
        ?mode,
        date = %date,
        "--date only applies to the custom week; ignoring"
      );
      return Ok(());
    }
    session.set_custom_date(date)?;
    if !session.custom_date_in_bounds() {
      let (min, max) =
        custom_date_bounds(session.today());
      warn!(
        date = %date,
        %min,
        %max,
        "custom date is outside the usual picker window"
      );
    }
  }

  Ok(())
}

#[instrument(skip(
  session, renderer, args
))]
fn cmd_range<S: KeyValueStore>(
  session: &mut Session<S>,
  renderer: &mut Renderer,
  args: &WeekArgs
) -> anyhow::Result<()> {
  info!("command range");
  apply_week_args(session, args)?;
  renderer.print_range(&session.week_range())
}

#[instrument(skip(session, renderer))]
fn cmd_timezones<S: KeyValueStore>(
  session: &mut Session<S>,
  renderer: &mut Renderer,
  query: Option<&str>
) -> anyhow::Result<()> {
  info!("command timezones");
  session
    .set_timezone_search(query.unwrap_or(""));
  let zones = session.filtered_timezones();
  if zones.is_empty() {
    println!("No timezones match.");
    return Ok(());
  }
  renderer.print_timezone_table(
    &zones,
    session.selected_timezone(),
    session.recent_timezones()
  )
}

#[instrument(skip(session, renderer))]
fn cmd_prefs<S: KeyValueStore>(
  session: Session<S>,
  renderer: &mut Renderer,
  clear: bool
) -> anyhow::Result<()> {
  let mut store = session.into_store();
  if clear {
    prefs::clear(&mut store)?;
    println!("Cleared saved preferences.");
    return Ok(());
  }

  let saved = Preferences::load(&store)?;
  renderer.print_preferences(&saved)
}

/// Wall-clock "today" for the command
/// line, measured in the configured local
/// zone.
#[must_use]
pub fn today() -> NaiveDate {
  crate::datetime::local_today(Utc::now())
}

#[cfg(test)]
mod tests {
  use chrono::NaiveDate;

  use super::apply_link_args;
  use crate::cli::{
    LinkArgs,
    WeekArgs
  };
  use crate::prefs::MemoryStore;
  use crate::session::Session;
  use crate::week::{
    WeekMode,
    WeekSelection
  };

  fn session() -> Session<MemoryStore> {
    Session::open(
      MemoryStore::default(),
      NaiveDate::from_ymd_opt(2024, 6, 12)
        .expect("valid date"),
      "Europe/London"
    )
    .expect("open")
  }

  #[test]
  fn link_args_drive_the_session() {
    let mut session = session();
    apply_link_args(&mut session, &LinkArgs {
      url: Some(
        " https://calendar.google.com/calendar/render?action=TEMPLATE&text=Event "
          .to_string()
      ),
      timezone: Some(
        "America/Chicago".to_string()
      ),
      week: WeekArgs {
        week: Some(WeekMode::Next),
        date: None
      },
      ..LinkArgs::default()
    })
    .expect("apply");

    assert_eq!(
      session.generated_link(),
      "https://calendar.google.com/calendar/render?action=TEMPLATE&ctz=America/Chicago&mode=week&dates=20240617%2F20240623"
    );
    assert_eq!(session.recent_timezones(), [
      "America/Chicago"
    ]);
  }

  #[test]
  fn date_alone_selects_custom_week() {
    let mut session = session();
    apply_link_args(&mut session, &LinkArgs {
      week: WeekArgs {
        week: None,
        date: Some("2024-09-01".to_string())
      },
      ..LinkArgs::default()
    })
    .expect("apply");

    assert_eq!(
      session.week_selection(),
      WeekSelection::CustomDate(
        NaiveDate::from_ymd_opt(2024, 9, 1)
          .expect("valid date")
      )
    );
    assert_eq!(
      session.week_range().start,
      NaiveDate::from_ymd_opt(2024, 8, 26)
        .expect("valid date")
    );
  }

  #[test]
  fn date_is_ignored_for_fixed_weeks() {
    let mut session = session();
    apply_link_args(&mut session, &LinkArgs {
      week: WeekArgs {
        week: Some(WeekMode::This),
        date: Some("not-a-date".to_string())
      },
      ..LinkArgs::default()
    })
    .expect("apply");
    assert_eq!(
      session.week_selection(),
      WeekSelection::ThisWeek
    );
  }

  #[test]
  fn rejects_bad_input() {
    let mut session = session();
    assert!(
      apply_link_args(&mut session, &LinkArgs {
        timezone: Some("  ".to_string()),
        ..LinkArgs::default()
      })
      .is_err()
    );
    assert!(
      apply_link_args(&mut session, &LinkArgs {
        week: WeekArgs {
          week: Some(WeekMode::Custom),
          date: Some("2024/06/12".to_string())
        },
        ..LinkArgs::default()
      })
      .is_err()
    );
  }

  #[test]
  fn saved_url_is_reused_without_argument() {
    let mut session = session();
    apply_link_args(&mut session, &LinkArgs {
      url: Some(
        "https://calendar.google.com/calendar/embed?src=a"
          .to_string()
      ),
      ..LinkArgs::default()
    })
    .expect("first");

    let store = session.into_store();
    let mut reopened = Session::open(
      store,
      NaiveDate::from_ymd_opt(2024, 6, 12)
        .expect("valid date"),
      "Europe/London"
    )
    .expect("reopen");
    apply_link_args(
      &mut reopened,
      &LinkArgs::default()
    )
    .expect("second");
    assert_eq!(
      reopened.generated_link(),
      "https://calendar.google.com/calendar/embed?src=a&ctz=Europe/London&mode=week&dates=20240610%2F20240616"
    );
  }
}
