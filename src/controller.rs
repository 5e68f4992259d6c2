use crate::config::{Config, LayoutPolicy};
use crate::gateway::{DiagramStore, StoreError};
use crate::model::{DiagramKind, Edge, EdgeStyle, Node, Position, SourceData};
use crate::snapshot::HandleBinding;
use crate::state::{LayoutState, RenderGraph};
use std::collections::BTreeSet;
use std::time::{Duration, Instant};

/// Outcome of the most recent persistence attempt. Failures never roll
/// back local state; this flag is the whole error surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SaveStatus {
    #[default]
    Idle,
    Saved,
    Error,
}

/// Translates user gestures into state mutations and schedules their
/// persistence. Component diagrams write through the per-row side
/// channels; everything else goes through the wholesale snapshot blob.
/// Snapshot writes are queue-of-one: scheduling a second save before the
/// first flush coalesces into a single PUT of the latest state.
pub struct DiagramSession {
    diagram_id: String,
    config: Config,
    state: LayoutState,
    store: Box<dyn DiagramStore>,
    status: SaveStatus,
    pending_nudges: Vec<(String, Instant)>,
    queued_snapshot: bool,
    current: RenderGraph,
}

impl DiagramSession {
    pub fn open(
        diagram_id: &str,
        store: Box<dyn DiagramStore>,
        config: Config,
        data: &SourceData,
    ) -> Result<Self, StoreError> {
        let doc = store.load(diagram_id)?;
        let state = LayoutState::hydrate(&doc);
        let current = state.recompute(data, &config);
        Ok(Self {
            diagram_id: diagram_id.to_string(),
            config,
            state,
            store,
            status: SaveStatus::Idle,
            pending_nudges: Vec::new(),
            queued_snapshot: false,
            current,
        })
    }

    pub fn state(&self) -> &LayoutState {
        &self.state
    }

    pub fn nodes(&self) -> &[Node] {
        &self.current.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.current.edges
    }

    pub fn graph(&self) -> &RenderGraph {
        &self.current
    }

    pub fn save_status(&self) -> SaveStatus {
        self.status
    }

    pub fn refresh(&mut self, data: &SourceData) {
        self.current = self.state.recompute(data, &self.config);
    }

    fn debounce(&self) -> Duration {
        Duration::from_millis(self.config.persistence.nudge_debounce_ms)
    }

    fn record(&mut self, result: Result<(), StoreError>) {
        match result {
            Ok(()) => {
                self.status = SaveStatus::Saved;
                if !self.queued_snapshot && self.pending_nudges.is_empty() {
                    self.state.mark_clean();
                }
            }
            Err(err) => {
                log::warn!("diagram {}: save failed: {err}", self.diagram_id);
                self.status = SaveStatus::Error;
            }
        }
    }

    fn persist_node_position(&mut self, node_id: &str) {
        let Some(position) = self.state.position(node_id) else {
            return;
        };
        match self.state.kind() {
            DiagramKind::Component => {
                let result = self.store.save_component_position(
                    &self.diagram_id,
                    node_id,
                    position.x.round() as i64,
                    position.y.round() as i64,
                );
                self.record(result);
            }
            _ => self.queued_snapshot = true,
        }
    }

    fn flush_snapshot(&mut self) {
        if !self.queued_snapshot {
            return;
        }
        self.queued_snapshot = false;
        let result = self
            .store
            .save_snapshot(&self.diagram_id, &self.state.snapshot());
        self.record(result);
    }

    /// Drag release: position is final, persist right away.
    pub fn drag_stopped(&mut self, node_id: &str, position: Position, data: &SourceData) {
        self.state.set_node_position(node_id, position);
        self.refresh(data);
        self.persist_node_position(node_id);
        self.flush_snapshot();
    }

    /// New user-drawn connection: local only, like the original gesture.
    /// The handles stick once the user reconnects or saves explicitly.
    pub fn edge_connected(&mut self, edge_id: &str, binding: HandleBinding, data: &SourceData) {
        self.state.set_edge_handles(edge_id, binding);
        self.refresh(data);
    }

    pub fn edge_reconnected(
        &mut self,
        edge_id: &str,
        source_id: &str,
        target_id: &str,
        binding: HandleBinding,
        data: &SourceData,
    ) {
        self.state.set_edge_handles(edge_id, binding.clone());
        self.refresh(data);
        match self.state.kind() {
            DiagramKind::Component => {
                let result =
                    self.store
                        .save_edge_handles(&self.diagram_id, source_id, target_id, &binding);
                self.record(result);
            }
            _ => {
                self.queued_snapshot = true;
                self.flush_snapshot();
            }
        }
    }

    pub fn area_changed(&mut self, area: &str, data: &SourceData) {
        self.state.set_area(area);
        self.refresh(data);
        self.queued_snapshot = true;
        self.flush_snapshot();
    }

    pub fn edge_style_changed(&mut self, style: EdgeStyle, data: &SourceData) {
        self.state.set_edge_style(style);
        self.refresh(data);
    }

    /// Visibility selection edit. Component diagrams mirror the selection
    /// into the membership rows (add at origin, remove on deselect);
    /// other diagrams persist the snapshot blob.
    pub fn selection_changed(&mut self, ids: Vec<String>, data: &SourceData) {
        let previous: BTreeSet<String> = self.state.selection().clone();
        let next: BTreeSet<String> = ids.iter().cloned().collect();
        self.state.set_selection(ids);
        self.refresh(data);

        match self.state.kind() {
            DiagramKind::Component => {
                let mut outcome = Ok(());
                for id in next.difference(&previous) {
                    if let Err(err) = self.store.save_component_position(&self.diagram_id, id, 0, 0)
                    {
                        log::warn!("diagram {}: adding {id} failed: {err}", self.diagram_id);
                        outcome = Err(err);
                    }
                }
                for id in previous.difference(&next) {
                    if let Err(err) = self.store.remove_component(&self.diagram_id, id) {
                        log::warn!("diagram {}: removing {id} failed: {err}", self.diagram_id);
                        outcome = Err(err);
                    }
                }
                match outcome {
                    Ok(()) => self.record(Ok(())),
                    Err(_) => self.status = SaveStatus::Error,
                }
            }
            _ => {
                self.queued_snapshot = true;
                self.flush_snapshot();
            }
        }
    }

    /// Keyboard nudge: the move lands locally at once, the write waits
    /// out the debounce window so rapid key repeats collapse into one
    /// save per node per burst.
    pub fn nudge(&mut self, node_id: &str, dx: f64, dy: f64, now: Instant, data: &SourceData) {
        let position = self
            .state
            .position(node_id)
            .or_else(|| {
                self.current
                    .nodes
                    .iter()
                    .find(|node| node.id == node_id)
                    .map(|node| node.position)
            })
            .unwrap_or_default();
        self.state
            .set_node_position(node_id, Position::new(position.x + dx, position.y + dy));
        self.refresh(data);

        let due = now + self.debounce();
        match self
            .pending_nudges
            .iter_mut()
            .find(|(id, _)| id == node_id)
        {
            Some(entry) => entry.1 = due,
            None => self.pending_nudges.push((node_id.to_string(), due)),
        }
    }

    /// Drive the debounce clock: persist every nudge whose window has
    /// elapsed, plus any queued snapshot.
    pub fn flush(&mut self, now: Instant) {
        let mut due = Vec::new();
        self.pending_nudges.retain(|(id, deadline)| {
            if *deadline <= now {
                due.push(id.clone());
                false
            } else {
                true
            }
        });
        for node_id in due {
            self.persist_node_position(&node_id);
        }
        self.flush_snapshot();
    }

    /// Explicit save action: snapshot the full current state.
    pub fn save(&mut self) {
        self.queued_snapshot = true;
        self.flush_snapshot();
    }

    /// Explicit re-layout: the one path allowed to move saved positions.
    pub fn relayout(&mut self, data: &SourceData) {
        let mut config = self.config.clone();
        config.layout.policy = LayoutPolicy::Always;
        let graph = self.state.recompute(data, &config);
        self.state.apply_layout_result(&graph);
        self.current = graph;
        self.queued_snapshot = true;
        self.flush_snapshot();
    }
}
