use std::collections::HashMap;
use std::fmt;

use chrono::NaiveDate;
use super::step::{DateRange, Step};

/// Path through the step tree: child indices at each nesting level.
/// The root is the empty path.
pub type StepPath = Vec<usize>;

/// Version number of a flattened projection. Every full rebuild of a
/// chart's view gets a new generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Generation(pub u64);

impl Generation {
    pub const FIRST: Generation = Generation(1);

    pub fn next(self) -> Generation {
        Generation(self.0 + 1)
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "g{}", self.0)
    }
}

/// Address of a row in a specific generation of a flattened view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeHandle {
    pub generation: Generation,
    pub index: usize,
}

impl fmt::Display for NodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.generation, self.index)
    }
}

/// One row of the flattened step tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatNode {
    /// The source step had children when this row was projected
    pub expandable: bool,
    /// Depth from the root (root = 0)
    pub level: usize,
    pub name: String,
    pub progress: i32,
    pub progress_dates: Vec<NaiveDate>,
    pub dates: DateRange,
    pub expanded: bool,
}

impl FlatNode {
    pub fn from_step(step: &Step, level: usize) -> Self {
        FlatNode {
            expandable: step.has_children(),
            level,
            name: step.name.clone(),
            progress: step.progress,
            progress_dates: step.progress_dates.clone(),
            dates: step.dates,
            expanded: step.expanded,
        }
    }

    /// Copy the step's content fields into this row, leaving
    /// `level` and `expandable` as projected.
    pub(crate) fn refresh_from(&mut self, step: &Step) {
        self.name.clone_from(&step.name);
        self.progress = step.progress;
        self.progress_dates.clone_from(&step.progress_dates);
        self.dates = step.dates;
        self.expanded = step.expanded;
    }

    /// A childless step carrying this row's content
    pub(crate) fn to_step(&self) -> Step {
        Step {
            name: self.name.clone(),
            progress: self.progress,
            dates: self.dates,
            progress_dates: self.progress_dates.clone(),
            steps: Vec::new(),
            expanded: self.expanded,
        }
    }
}

/// Error type for handle lookups against a flattened view
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ViewError {
    #[error("stale node handle {handle}: the view is now at {current}")]
    Stale {
        handle: NodeHandle,
        current: Generation,
    },
    #[error("node handle {handle} is out of range ({len} rows)")]
    OutOfRange { handle: NodeHandle, len: usize },
}

/// One generation of a chart's flattened projection: the pre-order row list
/// plus the identity maps between rows and tree paths.
#[derive(Debug, Clone)]
pub struct FlatView {
    generation: Generation,
    nodes: Vec<FlatNode>,
    /// Row index → tree path
    paths: Vec<StepPath>,
    /// Tree path → row index
    index_of: HashMap<StepPath, usize>,
}

impl FlatView {
    pub(crate) fn with_capacity(generation: Generation, capacity: usize) -> Self {
        FlatView {
            generation,
            nodes: Vec::with_capacity(capacity),
            paths: Vec::with_capacity(capacity),
            index_of: HashMap::with_capacity(capacity),
        }
    }

    pub(crate) fn push(&mut self, node: FlatNode, path: StepPath) {
        self.index_of.insert(path.clone(), self.nodes.len());
        self.nodes.push(node);
        self.paths.push(path);
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn nodes(&self) -> &[FlatNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Handle for the row at `index` in this generation
    pub fn handle(&self, index: usize) -> Option<NodeHandle> {
        (index < self.nodes.len()).then_some(NodeHandle {
            generation: self.generation,
            index,
        })
    }

    pub fn handles(&self) -> impl Iterator<Item = NodeHandle> + '_ {
        (0..self.nodes.len()).map(|index| NodeHandle {
            generation: self.generation,
            index,
        })
    }

    /// Validate a handle against this generation and return its row index
    pub fn index(&self, handle: NodeHandle) -> Result<usize, ViewError> {
        if handle.generation != self.generation {
            return Err(ViewError::Stale {
                handle,
                current: self.generation,
            });
        }
        if handle.index >= self.nodes.len() {
            return Err(ViewError::OutOfRange {
                handle,
                len: self.nodes.len(),
            });
        }
        Ok(handle.index)
    }

    pub fn node(&self, handle: NodeHandle) -> Result<&FlatNode, ViewError> {
        let index = self.index(handle)?;
        Ok(&self.nodes[index])
    }

    /// Tree path of the step a handle was projected from
    pub fn step_path(&self, handle: NodeHandle) -> Result<&[usize], ViewError> {
        let index = self.index(handle)?;
        Ok(&self.paths[index])
    }

    pub(crate) fn path_at(&self, index: usize) -> Option<&[usize]> {
        self.paths.get(index).map(Vec::as_slice)
    }

    pub fn index_of_path(&self, path: &[usize]) -> Option<usize> {
        self.index_of.get(path).copied()
    }

    pub fn handle_for_path(&self, path: &[usize]) -> Option<NodeHandle> {
        self.index_of_path(path).and_then(|index| self.handle(index))
    }

    pub(crate) fn node_mut(&mut self, index: usize) -> Option<&mut FlatNode> {
        self.nodes.get_mut(index)
    }

    /// Row indices a tree widget should currently show: every row whose
    /// ancestors are all expanded.
    pub fn visible_indices(&self) -> Vec<usize> {
        let mut visible = Vec::with_capacity(self.nodes.len());
        // Level of the nearest collapsed ancestor whose subtree is being skipped
        let mut hidden_below: Option<usize> = None;
        for (i, node) in self.nodes.iter().enumerate() {
            if let Some(level) = hidden_below {
                if node.level > level {
                    continue;
                }
                hidden_below = None;
            }
            visible.push(i);
            if node.expandable && !node.expanded {
                hidden_below = Some(node.level);
            }
        }
        visible
    }
}
