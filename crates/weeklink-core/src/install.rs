use chrono::{
  DateTime,
  Utc
};
use tracing::{
  debug,
  info
};

use crate::prefs::{
  KeyValueStore,
  save_install_dismissed
};

#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub enum InstallOutcome {
  Accepted,
  Dismissed
}

/// Host-provided ability to install the
/// app.
pub trait InstallCapability {
  /// A deferred install prompt is
  /// waiting to be shown.
  fn has_deferred_prompt(&self) -> bool;

  fn is_installed(&self) -> bool;

  fn prompt(
    &mut self
  ) -> anyhow::Result<InstallOutcome>;
}

#[derive(Debug, Clone, Default)]
pub struct InstallPrompt {
  visible: bool
}

impl InstallPrompt {
  #[must_use]
  pub fn is_visible(&self) -> bool {
    self.visible
  }

  /// Offers installation when the host
  /// has a prompt ready and the app is
  /// not already installed.
  pub fn offer(
    &mut self,
    capability: &dyn InstallCapability
  ) {
    self.visible = capability
      .has_deferred_prompt()
      && !capability.is_installed();
    debug!(
      visible = self.visible,
      "evaluated install offer"
    );
  }

  /// Shows the host prompt once. The
  /// offer is withdrawn afterwards
  /// whatever the user chose.
  #[tracing::instrument(skip_all)]
  pub fn install(
    &mut self,
    capability: &mut dyn InstallCapability
  ) -> anyhow::Result<Option<InstallOutcome>>
  {
    if !self.visible
      || !capability.has_deferred_prompt()
    {
      debug!(
        "no install prompt pending"
      );
      return Ok(None);
    }

    let outcome = capability.prompt()?;
    if outcome == InstallOutcome::Accepted
    {
      info!("app installed");
    }
    self.visible = false;
    Ok(Some(outcome))
  }

  #[tracing::instrument(skip(
    self, store
  ))]
  pub fn dismiss<S>(
    &mut self,
    store: &mut S,
    now: DateTime<Utc>
  ) -> anyhow::Result<()>
  where
    S: KeyValueStore + ?Sized
  {
    self.visible = false;
    save_install_dismissed(
      store,
      now.timestamp_millis()
    )
  }
}
