pub mod actions;
pub mod cli;
pub mod commands;
pub mod config;
pub mod datetime;
pub mod install;
pub mod link;
pub mod prefs;
pub mod render;
pub mod session;
pub mod timezone;
pub mod week;

use std::ffi::OsString;

use anyhow::Context;
use clap::Parser;
use tracing::{
  debug,
  info
};

pub use link::{
  LinkRequest,
  build_link,
  extract_base_url,
  generate_link
};
pub use week::{
  DateRange,
  WeekSelection,
  compute_week_range
};

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let pre =
    cli::preprocess_args(&raw_args)?;
  let cli = cli::GlobalCli::parse_from(
    pre.cleaned_args
  );

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting weeklink"
  );
  debug!(?pre.rc_overrides, "preprocessed rc overrides");

  let mut cfg = config::Config::load(
    cli.weeklinkrc.as_deref()
  )?;
  cfg.apply_overrides(
    pre.rc_overrides.into_iter().chain(
      cli
        .rc_overrides
        .into_iter()
        .map(|kv| (kv.key, kv.value))
    )
  );

  let data_dir =
    config::resolve_data_dir(
      &cfg,
      cli.data.as_deref()
    )
    .context(
      "failed to resolve data \
       directory"
    )?;

  let store =
    prefs::FileStore::open(&data_dir)
      .with_context(|| {
        format!(
          "failed to open preferences at \
           {}",
          data_dir.display()
        )
      })?;

  let mut renderer =
    render::Renderer::new(&cfg)?;
  let command = match cli.command {
    | Some(command) => command,
    | None => {
      cli::Command::from_default(&cfg)?
    }
  };

  commands::dispatch(
    store,
    &cfg,
    &mut renderer,
    command,
    commands::today()
  )?;

  info!("done");
  Ok(())
}
