use std::str::FromStr;
use serde::Deserialize;

/// Canonical task name type used throughout the crate.
pub type TaskName = String;

/// What a watch binding asks the reload collaborator to do after its tasks
/// completed successfully.
///
/// - `Full`: reload every connected page (default).
/// - `Inject`: swap stylesheets in place without a page reload.
/// - `None`: do not notify clients at all.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReloadKind {
    #[default]
    Full,
    Inject,
    None,
}

impl FromStr for ReloadKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "full" => Ok(ReloadKind::Full),
            "inject" => Ok(ReloadKind::Inject),
            "none" => Ok(ReloadKind::None),
            other => Err(format!(
                "invalid reload kind: {other} (expected \"full\", \"inject\" or \"none\")"
            )),
        }
    }
}

/// Kind of filesystem change carried by a [`crate::engine::ChangeEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Modified,
    Removed,
}
