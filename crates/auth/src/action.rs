use serde::{Deserialize, Serialize};

/// Operation under authorization control.
///
/// Closed set: a new action is a code change, never a configuration change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    Create,
    Read,
    Update,
    Delete,
    ChangeStatus,
}

wire_names!(Action, "action", {
    Create => "CREATE",
    Read => "READ",
    Update => "UPDATE",
    Delete => "DELETE",
    ChangeStatus => "CHANGE_STATUS",
});
