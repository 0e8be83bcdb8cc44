use crate::model::flat::{FlatNode, FlatView, Generation, StepPath};
use crate::model::step::Step;

/// Error type for rebuilding a tree from flattened rows
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProjectionError {
    #[error("no rows to rebuild from")]
    Empty,
    #[error("row {index} is a second root")]
    MultipleRoots { index: usize },
    #[error("row {index} jumps to level {level} without a parent")]
    LevelGap { index: usize, level: usize },
}

/// Flatten a step tree into one generation of rows.
///
/// Pre-order, root first at level 0. The whole tree is always projected;
/// hiding rows under collapsed steps is up to the consumer
/// (see [`FlatView::visible_indices`]).
pub fn flatten(root: &Step, generation: Generation) -> FlatView {
    let mut view = FlatView::with_capacity(generation, root.subtree_len());
    let mut path = StepPath::new();
    flatten_inner(root, 0, &mut path, &mut view);
    view
}

fn flatten_inner(step: &Step, level: usize, path: &mut StepPath, view: &mut FlatView) {
    view.push(FlatNode::from_step(step, level), path.clone());
    for (i, child) in step.steps.iter().enumerate() {
        path.push(i);
        flatten_inner(child, level + 1, path, view);
        path.pop();
    }
}

/// Rebuild the nested tree from pre-order rows and their levels.
pub fn unflatten(rows: &[FlatNode]) -> Result<Step, ProjectionError> {
    // Open ancestors of the current row; stack[n] sits at level n
    let mut stack: Vec<Step> = Vec::new();
    for (index, row) in rows.iter().enumerate() {
        if index > 0 && row.level == 0 {
            return Err(ProjectionError::MultipleRoots { index });
        }
        if row.level > stack.len() {
            return Err(ProjectionError::LevelGap {
                index,
                level: row.level,
            });
        }
        close_to(&mut stack, row.level);
        stack.push(row.to_step());
    }
    close_to(&mut stack, 1);
    stack.pop().ok_or(ProjectionError::Empty)
}

/// Pop finished steps into their parents until `depth` steps remain open
fn close_to(stack: &mut Vec<Step>, depth: usize) {
    while stack.len() > depth.max(1) {
        if let Some(done) = stack.pop()
            && let Some(parent) = stack.last_mut()
        {
            parent.steps.push(done);
        }
    }
}

/// Index of the structural parent of row `index`.
///
/// Scans backward for the nearest row at a strictly smaller level. In a
/// pre-order listing that row is always the parent: siblings and their
/// subtrees sit at the same or deeper levels. `None` for the root or an
/// index past the end.
pub fn parent_of(flat: &[FlatNode], index: usize) -> Option<usize> {
    let level = flat.get(index)?.level;
    if level == 0 {
        return None;
    }
    (0..index).rev().find(|&i| flat[i].level < level)
}
