//! Editing session for one chart.
//!
//! A [`ChartSession`] owns the step tree, the current flattened view and the
//! injected store. Every edit is written through to the store before the
//! session returns. Subscribers hear about every edit that changed the tree,
//! including one whose save then failed. Edits that change the tree's shape (add, delete, fold)
//! rebuild the view into a new generation; edits to a single step's content
//! (name, progress, dates) patch that step's row in place so open editors
//! keep their handles.

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::io::store::{ChartStore, StoreError};
use crate::io::template::{TemplateError, TemplateSource};
use crate::model::flat::{FlatNode, FlatView, Generation, NodeHandle, StepPath, ViewError};
use crate::model::step::{DateRange, Step};
use crate::ops::build::{self, BuildError};
use crate::ops::dates::{DateError, range_days};
use crate::ops::flatten::{flatten, parent_of};
use crate::ops::step_ops;

/// Error type for session operations
#[derive(Debug, thiserror::Error)]
pub enum ChartError {
    #[error(transparent)]
    InvalidRange(#[from] DateError),
    #[error(transparent)]
    View(#[from] ViewError),
    #[error("node {0} does not match a step in the chart")]
    NoSuchNode(NodeHandle),
    #[error("chart {0} already exists")]
    ChartExists(String),
    #[error(transparent)]
    Build(#[from] BuildError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Template(#[from] TemplateError),
}

/// Change notification delivered to subscribers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChartEvent {
    /// The view was rebuilt; handles from earlier generations are dead
    Rebuilt { generation: Generation },
    /// One row changed content in place; its handle stays valid
    Patched { handle: NodeHandle, node: FlatNode },
    /// The root's date range changed, so the chart's day axis did too
    CalendarChanged { days: Vec<NaiveDate> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn FnMut(&ChartEvent)>;

/// An open chart: tree, view, store and subscribers
pub struct ChartSession<S: ChartStore> {
    chart_id: String,
    root: Step,
    view: FlatView,
    store: S,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: u64,
}

impl<S: ChartStore> ChartSession<S> {
    /// Open a chart, bootstrapping it from `template` when the store has
    /// nothing usable for `chart_id`. Only a bootstrapped tree is saved here;
    /// a readable stored chart is left as it is.
    pub fn open(
        mut store: S,
        template: &dyn TemplateSource,
        chart_id: impl Into<String>,
    ) -> Result<Self, ChartError> {
        let chart_id = chart_id.into();
        let stored = match store.load(&chart_id)? {
            Some(payload) => match build::parse_stored(&payload) {
                Ok(root) => Some(root),
                Err(e) => {
                    warn!(chart = %chart_id, error = %e, "stored chart is unreadable, using template");
                    store.report_corrupt(&chart_id, &payload, &e.to_string());
                    None
                }
            },
            None => None,
        };
        let bootstrapped = stored.is_none();
        let root = match stored {
            Some(root) => root,
            None => {
                debug!(chart = %chart_id, "building chart from template");
                build::build(&template.fetch_default_template()?, None)?
            }
        };

        let view = flatten(&root, Generation::FIRST);
        let mut session = ChartSession {
            chart_id,
            root,
            view,
            store,
            listeners: Vec::new(),
            next_subscription: 0,
        };
        if bootstrapped {
            session.persist()?;
        }
        Ok(session)
    }

    pub fn chart_id(&self) -> &str {
        &self.chart_id
    }

    pub fn root(&self) -> &Step {
        &self.root
    }

    /// Current generation of the flattened view
    pub fn view(&self) -> &FlatView {
        &self.view
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Every day of the root's range: the chart's date axis
    pub fn calendar(&self) -> Vec<NaiveDate> {
        range_days(&self.root.dates).unwrap_or_default()
    }

    /// The step a handle points at
    pub fn step(&self, handle: NodeHandle) -> Result<&Step, ChartError> {
        let path = self.view.step_path(handle)?;
        step_ops::find_step(&self.root, path).ok_or(ChartError::NoSuchNode(handle))
    }

    // -----------------------------------------------------------------------
    // Subscriptions
    // -----------------------------------------------------------------------

    /// Register a listener. It immediately receives a `Rebuilt` event for
    /// the current generation, then every later change.
    pub fn subscribe(&mut self, mut listener: impl FnMut(&ChartEvent) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        listener(&ChartEvent::Rebuilt {
            generation: self.view.generation(),
        });
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Remove a listener. Returns whether it was registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _)| *lid != id);
        self.listeners.len() != before
    }

    // -----------------------------------------------------------------------
    // Local edits
    // -----------------------------------------------------------------------

    pub fn rename_step(&mut self, handle: NodeHandle, name: impl Into<String>) -> Result<(), ChartError> {
        let (index, path) = self.resolve(handle)?;
        step_ops::rename_step(self.step_mut(handle, &path)?, name);
        self.patch(handle, index, &path)
    }

    /// Set a step's progress. Returns the step's new progress dates.
    pub fn update_progress(&mut self, handle: NodeHandle, percent: i32) -> Result<Vec<NaiveDate>, ChartError> {
        let (index, path) = self.resolve(handle)?;
        let dates = step_ops::update_progress(self.step_mut(handle, &path)?, percent).to_vec();
        self.patch(handle, index, &path)?;
        Ok(dates)
    }

    /// Set a step's date range. Returns the step's new progress dates.
    ///
    /// An inverted range is rejected before anything changes. Changing the
    /// root's range also emits `CalendarChanged`.
    pub fn update_date_range(
        &mut self,
        handle: NodeHandle,
        dates: DateRange,
    ) -> Result<Vec<NaiveDate>, ChartError> {
        let (index, path) = self.resolve(handle)?;
        let done = step_ops::update_date_range(self.step_mut(handle, &path)?, dates)?.to_vec();
        let saved = self.patch(handle, index, &path);
        if path.is_empty() {
            let days = self.calendar();
            self.notify(&ChartEvent::CalendarChanged { days });
        }
        saved?;
        Ok(done)
    }

    // -----------------------------------------------------------------------
    // Structural edits
    // -----------------------------------------------------------------------

    /// Append a new child under a step. Returns the child's handle in the
    /// rebuilt view.
    pub fn add_child_step(&mut self, handle: NodeHandle) -> Result<NodeHandle, ChartError> {
        let (_, mut path) = self.resolve(handle)?;
        let child = step_ops::add_child_step(self.step_mut(handle, &path)?);
        self.rebroadcast()?;
        path.push(child);
        self.view
            .handle_for_path(&path)
            .ok_or(ChartError::NoSuchNode(handle))
    }

    /// Delete a step and its subtree. Returns `false`, changing nothing, for
    /// the root.
    pub fn delete_step(&mut self, handle: NodeHandle) -> Result<bool, ChartError> {
        let (index, path) = self.resolve(handle)?;
        let Some(parent_index) = parent_of(self.view.nodes(), index) else {
            debug!(chart = %self.chart_id, "ignoring delete of the chart root");
            return Ok(false);
        };
        let parent_path = self
            .view
            .path_at(parent_index)
            .ok_or(ChartError::NoSuchNode(handle))?
            .to_vec();
        let child = *path.last().ok_or(ChartError::NoSuchNode(handle))?;
        let parent = self.step_mut(handle, &parent_path)?;
        if step_ops::delete_child_step(parent, child).is_none() {
            return Err(ChartError::NoSuchNode(handle));
        }
        self.rebroadcast()?;
        Ok(true)
    }

    /// Flip a step's fold state. Returns the new state.
    pub fn toggle_expanded(&mut self, handle: NodeHandle) -> Result<bool, ChartError> {
        let (_, path) = self.resolve(handle)?;
        let expanded = step_ops::toggle_expanded(self.step_mut(handle, &path)?);
        self.rebroadcast()?;
        Ok(expanded)
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn resolve(&self, handle: NodeHandle) -> Result<(usize, StepPath), ChartError> {
        let index = self.view.index(handle)?;
        let path = self.view.step_path(handle)?.to_vec();
        Ok((index, path))
    }

    fn step_mut(&mut self, handle: NodeHandle, path: &[usize]) -> Result<&mut Step, ChartError> {
        step_ops::find_step_mut(&mut self.root, path).ok_or(ChartError::NoSuchNode(handle))
    }

    /// Sync one row with its step, save, and tell subscribers. The event
    /// goes out even when the save fails, since the row has changed.
    fn patch(&mut self, handle: NodeHandle, index: usize, path: &[usize]) -> Result<(), ChartError> {
        let step = step_ops::find_step(&self.root, path).ok_or(ChartError::NoSuchNode(handle))?;
        let node = self
            .view
            .node_mut(index)
            .ok_or(ChartError::NoSuchNode(handle))?;
        node.refresh_from(step);
        let node = node.clone();
        let saved = self.persist();
        self.notify(&ChartEvent::Patched { handle, node });
        saved
    }

    /// Re-flatten into a new generation, save, and tell subscribers. The
    /// event goes out even when the save fails: earlier handles are dead
    /// either way.
    fn rebroadcast(&mut self) -> Result<(), ChartError> {
        let generation = self.view.generation().next();
        self.view = flatten(&self.root, generation);
        let saved = self.persist();
        info!(chart = %self.chart_id, %generation, rows = self.view.len(), "chart rebuilt");
        self.notify(&ChartEvent::Rebuilt { generation });
        saved
    }

    fn persist(&mut self) -> Result<(), ChartError> {
        let payload = build::serialize_step(&self.root).map_err(|source| StoreError::Encode {
            key: self.chart_id.clone(),
            source,
        })?;
        self.store.save(&self.chart_id, &payload)?;
        debug!(chart = %self.chart_id, "chart saved");
        Ok(())
    }

    fn notify(&mut self, event: &ChartEvent) {
        for (_, listener) in &mut self.listeners {
            listener(event);
        }
    }
}
