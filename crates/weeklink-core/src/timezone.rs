use chrono_tz::Tz;
use tracing::debug;

pub const DEFAULT_TIMEZONE: &str =
  "America/New_York";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timezone {
  pub identifier: &'static str,
  pub name:       &'static str
}

const POPULAR_TIMEZONES: &[Timezone] = &[
  Timezone {
    identifier: "America/New_York",
    name:       "New York (Eastern)"
  },
  Timezone {
    identifier: "America/Chicago",
    name:       "Chicago (Central)"
  },
  Timezone {
    identifier: "America/Denver",
    name:       "Denver (Mountain)"
  },
  Timezone {
    identifier: "America/Los_Angeles",
    name:       "Los Angeles (Pacific)"
  },
  Timezone {
    identifier: "America/Phoenix",
    name:       "Phoenix (Arizona)"
  },
  Timezone {
    identifier: "America/Anchorage",
    name:       "Anchorage (Alaska)"
  },
  Timezone {
    identifier: "Pacific/Honolulu",
    name:       "Honolulu (Hawaii)"
  },
  Timezone {
    identifier: "Europe/London",
    name:       "London"
  },
  Timezone {
    identifier: "Europe/Paris",
    name:       "Paris"
  },
  Timezone {
    identifier: "Europe/Berlin",
    name:       "Berlin"
  },
  Timezone {
    identifier: "Asia/Tokyo",
    name:       "Tokyo"
  },
  Timezone {
    identifier: "Asia/Shanghai",
    name:       "Shanghai"
  },
  Timezone {
    identifier: "Asia/Dubai",
    name:       "Dubai"
  },
  Timezone {
    identifier: "Australia/Sydney",
    name:       "Sydney"
  },
  Timezone {
    identifier: "America/Toronto",
    name:       "Toronto"
  },
  Timezone {
    identifier: "America/Mexico_City",
    name:       "Mexico City"
  },
  Timezone {
    identifier: "America/Sao_Paulo",
    name:       "São Paulo"
  },
  Timezone {
    identifier: "Asia/Kolkata",
    name:       "Kolkata (India)"
  },
  Timezone {
    identifier: "Asia/Singapore",
    name:       "Singapore"
  },
  Timezone {
    identifier: "Pacific/Auckland",
    name:       "Auckland"
  }
];

#[must_use]
pub fn catalog() -> &'static [Timezone] {
  POPULAR_TIMEZONES
}

#[must_use]
pub fn find(
  identifier: &str
) -> Option<&'static Timezone> {
  catalog().iter().find(|tz| {
    tz.identifier == identifier
  })
}

/// Friendly name for a catalog zone,
/// otherwise the identifier itself.
#[must_use]
pub fn display_name(
  identifier: &str
) -> &str {
  find(identifier)
    .map_or(identifier, |tz| tz.name)
}

/// Case-insensitive search over names
/// and identifiers. An empty search, or
/// one that is exactly the selected
/// zone's name, lists everything.
#[tracing::instrument]
pub fn filter(
  search: &str,
  selected: &str
) -> Vec<&'static Timezone> {
  let needle = search.to_lowercase();
  let shows_selection = find(selected)
    .is_some_and(|tz| {
      tz.name.to_lowercase() == needle
    });

  if needle.is_empty() || shows_selection
  {
    return catalog().iter().collect();
  }

  let matches: Vec<&'static Timezone> =
    catalog()
      .iter()
      .filter(|tz| {
        tz.name
          .to_lowercase()
          .contains(&needle)
          || tz
            .identifier
            .to_lowercase()
            .contains(&needle)
      })
      .collect();
  debug!(
    count = matches.len(),
    "filtered timezones"
  );
  matches
}

/// Whether the IANA database knows the
/// identifier. Unknown ids are still
/// handed to the calendar untouched.
#[must_use]
pub fn is_known_zone(
  identifier: &str
) -> bool {
  match identifier.parse::<Tz>() {
    | Ok(_) => true,
    | Err(err) => {
      debug!(
        timezone = %identifier,
        error = %err,
        "unrecognised timezone id"
      );
      false
    }
  }
}

#[cfg(test)]
mod tests {
  use super::{
    DEFAULT_TIMEZONE,
    catalog,
    display_name,
    filter,
    find,
    is_known_zone
  };

  #[test]
  fn catalog_zones_are_valid_iana_ids() {
    assert_eq!(catalog().len(), 20);
    for tz in catalog() {
      assert!(
        is_known_zone(tz.identifier),
        "{} should parse",
        tz.identifier
      );
    }
    assert!(find(DEFAULT_TIMEZONE).is_some());
  }

  #[test]
  fn display_name_falls_back_to_identifier()
   {
    assert_eq!(
      display_name("Europe/Berlin"),
      "Berlin"
    );
    assert_eq!(
      display_name("Europe/Oslo"),
      "Europe/Oslo"
    );
  }

  #[test]
  fn empty_search_lists_everything() {
    assert_eq!(
      filter("", DEFAULT_TIMEZONE).len(),
      catalog().len()
    );
  }

  #[test]
  fn selected_name_lists_everything() {
    assert_eq!(
      filter(
        "new york (eastern)",
        DEFAULT_TIMEZONE
      )
      .len(),
      catalog().len()
    );
  }

  #[test]
  fn matches_name_or_identifier() {
    let by_name: Vec<&str> =
      filter("pacific", "Asia/Tokyo")
        .iter()
        .map(|tz| tz.identifier)
        .collect();
    assert_eq!(by_name, vec![
      "America/Los_Angeles",
      "Pacific/Honolulu",
      "Pacific/Auckland"
    ]);

    let by_id: Vec<&str> =
      filter("ASIA/", DEFAULT_TIMEZONE)
        .iter()
        .map(|tz| tz.identifier)
        .collect();
    assert_eq!(by_id.len(), 5);
    assert!(
      filter("atlantis", DEFAULT_TIMEZONE)
        .is_empty()
    );
  }

  #[test]
  fn unknown_zone_is_reported() {
    assert!(!is_known_zone("Mars/Olympus"));
  }
}
