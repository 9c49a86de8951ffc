//! Documents produced from the editing state.
//!
//! | Document | Format | Purpose |
//! |----------|--------|---------|
//! | [`session::SessionDocument`] | JSON | full state incl. undo history; restores losslessly |
//! | [`scaffold::ScaffoldDocument`] | JSON (camelCase) | input for the downstream scaffolder |
//! | [`changelog::ChangeLog`] | CSV | one row per modification or group assignment |

pub mod changelog;
pub mod scaffold;
pub mod session;

use chrono::{DateTime, Utc};

/// Sort keys for one workspace's list of edits: each timestamp raised to the
/// latest one before it. Keys never decrease along the list, so a stable sort
/// on them interleaves workspaces without reordering any single list.
pub(crate) fn list_order_keys(
    timestamps: impl IntoIterator<Item = DateTime<Utc>>,
) -> Vec<DateTime<Utc>> {
    let mut latest: Option<DateTime<Utc>> = None;
    timestamps
        .into_iter()
        .map(|timestamp| {
            let key = latest.map_or(timestamp, |l| l.max(timestamp));
            latest = Some(key);
            key
        })
        .collect()
}
