use std::collections::{BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::dataset::Dataset;
use crate::workspace::state::Workspace;

/// Default maximum number of contigs drawn at once
pub const DEFAULT_DISPLAY_CAP: usize = 500;

/// Default minimum unique-alignment ratio
pub const DEFAULT_MIN_UNIQUE_RATIO: f64 = 0.05;

/// Thresholds controlling which contigs are drawn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisibilitySettings {
    /// Contigs shorter than this are hidden (bp)
    pub min_contig_size: u64,

    /// Minimum fraction of a contig covered by unique alignments to the selected reference
    pub min_unique_ratio: f64,

    /// Maximum number of contigs allowed after filtering
    pub display_cap: usize,
}

impl Default for VisibilitySettings {
    fn default() -> Self {
        Self {
            min_contig_size: 0,
            min_unique_ratio: DEFAULT_MIN_UNIQUE_RATIO,
            display_cap: DEFAULT_DISPLAY_CAP,
        }
    }
}

/// Why a contig is or is not drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisibilityStatus {
    /// Grouped or edited; exempt from the filters and the cap
    Protected,
    /// Passed the size and ratio filters
    Passed,
    /// Member of a chromosome group the user has hidden
    GroupHidden,
    Uninformative,
    FilteredBySize,
    FilteredByRatio,
    /// Passed the filters but fell outside the display cap
    Capped,
}

impl VisibilityStatus {
    pub fn is_visible(self) -> bool {
        matches!(self, Self::Protected | Self::Passed)
    }
}

/// Per-contig filter metadata
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContigVisibility {
    pub name: String,
    pub length: u64,
    pub unique_length: u64,
    pub unique_ratio: f64,
    pub grouped: bool,
    pub modified: bool,
    pub status: VisibilityStatus,
}

/// Outcome of [`compute_allowed`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisibilityReport {
    /// Contigs to draw; also restricts the layout's axis domain
    pub allowed: BTreeSet<String>,

    /// Every contig aligned to the reference, in working-dataset order
    pub contigs: Vec<ContigVisibility>,

    /// Number of contigs removed by the display cap
    pub capped_count: usize,

    pub cap_applied: bool,
}

impl VisibilityReport {
    pub fn is_allowed(&self, name: &str) -> bool {
        self.allowed.contains(name)
    }

    pub fn count(&self, status: VisibilityStatus) -> usize {
        self.contigs.iter().filter(|c| c.status == status).count()
    }
}

#[allow(clippy::cast_precision_loss)]
fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// Decide which contigs aligned to `reference` are drawn.
///
/// Rules, first match wins:
///
/// 1. grouped or modified contigs are always allowed (unless their group is hidden)
/// 2. contigs marked uninformative are excluded
/// 3. contigs must be at least `min_contig_size` long and reach `min_unique_ratio`
///
/// If more than `display_cap` contigs remain, the largest passing contigs are
/// kept so that the total does not exceed the cap. Protected contigs are never
/// capped.
pub fn compute_allowed(
    working: &Dataset,
    reference: &str,
    workspace: &Workspace,
    settings: &VisibilitySettings,
) -> VisibilityReport {
    let mut aligned: HashSet<&str> = HashSet::new();
    let mut unique_lengths: HashMap<&str, u64> = HashMap::new();
    for alignment in working.alignments_to_reference(reference) {
        aligned.insert(alignment.query.as_str());
        if alignment.is_unique() {
            *unique_lengths.entry(alignment.query.as_str()).or_default() += alignment.length;
        }
    }

    let mut contigs: Vec<ContigVisibility> = working
        .queries
        .iter()
        .filter(|q| aligned.contains(q.name.as_str()))
        .map(|query| {
            let source = query.source_name();
            let group = workspace
                .group_of(&query.name)
                .or_else(|| workspace.group_of(source));
            let grouped = group.is_some();
            let modified = workspace.is_modified(&query.name, source);
            let unique_length = unique_lengths.get(query.name.as_str()).copied().unwrap_or(0);
            let unique_ratio = ratio(unique_length, query.length);

            let status = if group.is_some_and(|g| !g.visible) {
                VisibilityStatus::GroupHidden
            } else if grouped || modified {
                VisibilityStatus::Protected
            } else if workspace.uninformative_contigs.contains(&query.name) {
                VisibilityStatus::Uninformative
            } else if query.length < settings.min_contig_size {
                VisibilityStatus::FilteredBySize
            } else if unique_ratio < settings.min_unique_ratio {
                VisibilityStatus::FilteredByRatio
            } else {
                VisibilityStatus::Passed
            };

            ContigVisibility {
                name: query.name.clone(),
                length: query.length,
                unique_length,
                unique_ratio,
                grouped,
                modified,
                status,
            }
        })
        .collect();

    let protected = contigs
        .iter()
        .filter(|c| c.status == VisibilityStatus::Protected)
        .count();
    let mut passed: Vec<usize> = contigs
        .iter()
        .enumerate()
        .filter(|(_, c)| c.status == VisibilityStatus::Passed)
        .map(|(i, _)| i)
        .collect();

    let mut capped_count = 0;
    if protected + passed.len() > settings.display_cap {
        let slots = settings.display_cap.saturating_sub(protected);
        // Stable sort keeps input order among equal lengths
        passed.sort_by(|&a, &b| contigs[b].length.cmp(&contigs[a].length));
        for &idx in &passed[slots..] {
            contigs[idx].status = VisibilityStatus::Capped;
        }
        capped_count = passed.len() - slots;
    }

    let allowed: BTreeSet<String> = contigs
        .iter()
        .filter(|c| c.status.is_visible())
        .map(|c| c.name.clone())
        .collect();

    debug!(
        "Visibility for {reference}: {} of {} contigs allowed ({capped_count} capped)",
        allowed.len(),
        contigs.len()
    );

    VisibilityReport {
        allowed,
        contigs,
        capped_count,
        cap_applied: capped_count > 0,
    }
}
