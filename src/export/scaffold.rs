use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::export::list_order_keys;
use crate::workspace::state::Workspace;

/// Scaffolding document version
pub const SCAFFOLD_VERSION: u32 = 1;

/// One recorded edit, tagged with the reference it was made on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScaffoldModification {
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<u64>,

    pub reference: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScaffoldGroup {
    pub created_on: String,
    pub contigs: Vec<String>,

    /// Scaffold position of each entry of `contigs`
    pub order: Vec<usize>,

    pub visible: bool,
}

/// Input for the downstream scaffolder: all edits and groups across references
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScaffoldDocument {
    pub version: u32,
    pub created_at: DateTime<Utc>,
    pub modifications: Vec<ScaffoldModification>,
    pub chromosome_groups: BTreeMap<String, ScaffoldGroup>,
}

impl ScaffoldDocument {
    /// Merge every workspace. Each workspace's modifications keep their list
    /// order; lists are interleaved by timestamp, reference name breaking ties.
    pub fn from_workspaces<'a>(workspaces: impl IntoIterator<Item = &'a Workspace>) -> Self {
        let mut keyed = Vec::new();
        let mut chromosome_groups = BTreeMap::new();

        for workspace in workspaces {
            let keys = list_order_keys(workspace.modifications.iter().map(|r| r.timestamp));
            for (record, key) in workspace.modifications.iter().zip(keys) {
                let modification = &record.modification;
                keyed.push((key, ScaffoldModification {
                    kind: modification.kind().to_string(),
                    query: modification.query().map(str::to_string),
                    position: modification.position(),
                    reference: workspace.reference.clone(),
                    timestamp: record.timestamp,
                }));
            }

            for group in &workspace.chromosome_groups {
                chromosome_groups.insert(
                    group.name.clone(),
                    ScaffoldGroup {
                        created_on: group.created_on.clone(),
                        contigs: group.contigs.clone(),
                        order: (0..group.contigs.len()).collect(),
                        visible: group.visible,
                    },
                );
            }
        }

        keyed.sort_by(|(a_key, a), (b_key, b)| {
            a_key.cmp(b_key).then_with(|| a.reference.cmp(&b.reference))
        });
        let modifications = keyed.into_iter().map(|(_, m)| m).collect();

        Self {
            version: SCAFFOLD_VERSION,
            created_at: Utc::now(),
            modifications,
            chromosome_groups,
        }
    }

    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
