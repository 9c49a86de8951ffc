use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::dataset::{Dataset, Query};
use crate::core::types::{AlignmentTag, Orientation};
use crate::engine::modification::ContigOrder;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LayoutError {
    #[error("Reference '{0}' is not in the working dataset")]
    UnknownReference(String),

    #[error("Reference '{0}' has zero length")]
    EmptyReference(String),

    #[error("Viewport {width}x{height} leaves no drawable area")]
    InvalidViewport { width: f64, height: f64 },
}

/// Stacking and margin parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Smallest gap inserted after a contig (bp)
    pub min_gap: u64,

    /// Gap after a contig as a fraction of its length
    pub gap_fraction: f64,

    /// Same as `gap_fraction` for segments produced by a break
    pub broken_gap_fraction: f64,

    pub margin_top: f64,
    pub margin_right: f64,
    pub margin_bottom: f64,
    pub margin_left: f64,

    /// Approximate number of reference-axis ticks
    pub tick_count: usize,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            min_gap: 10_000,
            gap_fraction: 0.1,
            broken_gap_fraction: 0.02,
            margin_top: 40.0,
            margin_right: 40.0,
            margin_bottom: 60.0,
            margin_left: 160.0,
            tick_count: 10,
        }
    }
}

impl LayoutConfig {
    /// Gap placed after a contig of `length` bp
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn gap_after(&self, length: u64, is_broken: bool) -> u64 {
        let fraction = if is_broken {
            self.broken_gap_fraction
        } else {
            self.gap_fraction
        };
        let proportional = (length as f64 * fraction).round() as u64;
        proportional.max(self.min_gap)
    }
}

/// Canvas size in pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1200.0,
            height: 800.0,
        }
    }
}

/// One contig's slot on the stacked query axis
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacedContig {
    pub name: String,
    pub length: u64,

    /// Start of the contig on the stacked axis (bp)
    pub offset: u64,

    /// Gap reserved after the contig (bp)
    pub gap: u64,

    /// Explicit order value used for sorting, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<usize>,

    pub best_identity: f64,
    pub inverted: bool,
    pub is_broken: bool,
}

/// Reference-axis tick; `position` is the true genomic coordinate
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AxisTick {
    pub position: u64,
    pub x: f64,
    pub label: String,
}

/// A line to draw for one alignment
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DrawSegment {
    pub query: String,
    pub tag: AlignmentTag,
    pub identity: f64,
    pub partial: bool,
    pub orientation: Orientation,
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

/// Scales and stacking offsets for one reference
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Layout {
    pub reference: String,
    pub reference_length: u64,
    pub viewport: Viewport,

    /// Pixels per reference bp
    pub ref_scale: f64,

    /// Pixels per stacked query bp
    pub query_scale: f64,

    /// Sum of contig lengths and gaps (bp)
    pub total_query_extent: u64,

    /// Allowed contigs, top to bottom
    pub contigs: Vec<PlacedContig>,

    pub ticks: Vec<AxisTick>,

    #[serde(skip)]
    origin: (f64, f64),

    #[serde(skip)]
    index: HashMap<String, usize>,
}

#[allow(clippy::cast_precision_loss)]
fn bp(value: u64) -> f64 {
    value as f64
}

impl Layout {
    /// Horizontal pixel for a reference coordinate. The axis is mirrored: the
    /// highest coordinate is on the left.
    pub fn ref_to_x(&self, position: u64) -> f64 {
        let mirrored = self.reference_length.saturating_sub(position);
        self.origin.0 + bp(mirrored) * self.ref_scale
    }

    /// Vertical pixel for a position within `contig`
    pub fn query_to_y(&self, contig: &str, position: u64) -> Option<f64> {
        let placed = self.contig(contig)?;
        Some(self.origin.1 + bp(placed.offset + position) * self.query_scale)
    }

    pub fn contig(&self, name: &str) -> Option<&PlacedContig> {
        self.index.get(name).map(|&i| &self.contigs[i])
    }

    pub fn offset(&self, name: &str) -> Option<u64> {
        self.contig(name).map(|c| c.offset)
    }

    pub fn ordered_names(&self) -> Vec<&str> {
        self.contigs.iter().map(|c| c.name.as_str()).collect()
    }

    /// Draw list for every alignment of a placed contig to this reference
    pub fn segments(&self, working: &Dataset) -> Vec<DrawSegment> {
        let mut segments = Vec::new();
        for alignment in working.alignments_to_reference(&self.reference) {
            let Some(placed) = self.contig(&alignment.query) else {
                continue;
            };
            let y = |pos: u64| self.origin.1 + bp(placed.offset + pos) * self.query_scale;
            let (y1, y2) = match alignment.aligned_orientation {
                Orientation::Forward => (y(alignment.query_start), y(alignment.query_end)),
                Orientation::Reverse => (y(alignment.query_end), y(alignment.query_start)),
            };
            segments.push(DrawSegment {
                query: alignment.query.clone(),
                tag: alignment.tag,
                identity: alignment.identity,
                partial: alignment.partial,
                orientation: alignment.aligned_orientation,
                x1: self.ref_to_x(alignment.ref_start),
                y1,
                x2: self.ref_to_x(alignment.ref_end),
                y2,
            });
        }
        segments
    }
}

struct Candidate<'a> {
    input_index: usize,
    order: Option<usize>,
    best_identity: f64,
    query: &'a Query,
}

fn compare(a: &Candidate<'_>, b: &Candidate<'_>) -> Ordering {
    let by_order = match (a.order, b.order) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => b.best_identity.total_cmp(&a.best_identity),
    };
    by_order.then(a.input_index.cmp(&b.input_index))
}

/// Compute scales and stacking for the `allowed` contigs of `reference`.
///
/// Contigs with an explicit `contig_order` value (their own, or their source
/// contig's for break segments) come first in ascending order; the rest
/// follow by descending best alignment identity. Input order breaks ties.
///
/// # Errors
///
/// Returns `LayoutError::UnknownReference`, `LayoutError::EmptyReference`, or
/// `LayoutError::InvalidViewport` when the margins consume the viewport.
pub fn compute_layout(
    working: &Dataset,
    reference: &str,
    allowed: &BTreeSet<String>,
    contig_order: &ContigOrder,
    viewport: Viewport,
    config: &LayoutConfig,
) -> Result<Layout, LayoutError> {
    let reference_length = working
        .reference(reference)
        .ok_or_else(|| LayoutError::UnknownReference(reference.to_string()))?
        .length;
    if reference_length == 0 {
        return Err(LayoutError::EmptyReference(reference.to_string()));
    }

    let drawable_width = viewport.width - config.margin_left - config.margin_right;
    let drawable_height = viewport.height - config.margin_top - config.margin_bottom;
    if !(drawable_width > 0.0 && drawable_height > 0.0) {
        return Err(LayoutError::InvalidViewport {
            width: viewport.width,
            height: viewport.height,
        });
    }

    let mut best_identity: HashMap<&str, f64> = HashMap::new();
    for alignment in working.alignments_to_reference(reference) {
        let entry = best_identity.entry(alignment.query.as_str()).or_insert(f64::MIN);
        *entry = entry.max(alignment.identity);
    }

    let mut candidates: Vec<Candidate<'_>> = working
        .queries
        .iter()
        .enumerate()
        .filter(|(_, q)| allowed.contains(&q.name))
        .map(|(input_index, query)| Candidate {
            input_index,
            order: contig_order
                .get(&query.name)
                .or_else(|| contig_order.get(query.source_name()))
                .copied(),
            best_identity: best_identity.get(query.name.as_str()).copied().unwrap_or(0.0),
            query,
        })
        .collect();
    candidates.sort_by(compare);

    let mut contigs = Vec::with_capacity(candidates.len());
    let mut cursor = 0u64;
    for candidate in &candidates {
        let query = candidate.query;
        let gap = config.gap_after(query.length, query.is_broken);
        contigs.push(PlacedContig {
            name: query.name.clone(),
            length: query.length,
            offset: cursor,
            gap,
            order: candidate.order,
            best_identity: candidate.best_identity,
            inverted: query.is_inverted(),
            is_broken: query.is_broken,
        });
        cursor += query.length + gap;
    }

    let ref_scale = drawable_width / bp(reference_length);
    let query_scale = if cursor == 0 {
        0.0
    } else {
        drawable_height / bp(cursor)
    };

    let index = contigs
        .iter()
        .enumerate()
        .map(|(i, c)| (c.name.clone(), i))
        .collect();

    let mut layout = Layout {
        reference: reference.to_string(),
        reference_length,
        viewport,
        ref_scale,
        query_scale,
        total_query_extent: cursor,
        contigs,
        ticks: Vec::new(),
        origin: (config.margin_left, config.margin_top),
        index,
    };
    layout.ticks = tick_positions(reference_length, config.tick_count)
        .into_iter()
        .map(|position| AxisTick {
            position,
            x: layout.ref_to_x(position),
            label: format_bp(position),
        })
        .collect();

    Ok(layout)
}

/// Round tick step (1, 2 or 5 times a power of ten) giving about `count` ticks
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn tick_step(length: u64, count: usize) -> u64 {
    let raw = (length as f64 / count.max(1) as f64).max(1.0);
    let magnitude = 10f64.powf(raw.log10().floor());
    let step = [1.0, 2.0, 5.0, 10.0]
        .into_iter()
        .map(|m| m * magnitude)
        .find(|&s| s >= raw)
        .unwrap_or(10.0 * magnitude);
    (step as u64).max(1)
}

fn tick_positions(length: u64, count: usize) -> Vec<u64> {
    let step = tick_step(length, count);
    (0..=length / step).map(|i| i * step).collect()
}

/// Human-readable base-pair label
#[allow(clippy::cast_precision_loss)]
pub fn format_bp(position: u64) -> String {
    let trim = |value: f64, unit: &str| {
        let text = format!("{value:.1}");
        let text = text.strip_suffix(".0").unwrap_or(&text);
        format!("{text} {unit}")
    };
    if position >= 1_000_000 {
        trim(position as f64 / 1e6, "Mb")
    } else if position >= 1_000 {
        trim(position as f64 / 1e3, "kb")
    } else {
        format!("{position} bp")
    }
}
