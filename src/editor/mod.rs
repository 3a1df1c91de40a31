//! Edit-state manager: the mutable rule tree behind a visual editor.

pub mod history;
pub mod structure;

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, trace, warn};
use uuid::Uuid;

use crate::bridge::{to_rule_node, to_specification};
use crate::error::RulespecError;
use crate::export::export;
use crate::parse::{parse, ParseError};
use crate::roundtrip::{RoundTripOptions, RoundTripValidator};
use crate::types::{
    build_complete_tree, flatten_into, is_reserved_call, subtree_ids, BridgeError, ChildEntry,
    ErrorCode, NodeConfig, NodeMap, NodeMetadata, NodeType, RuleNode, Specification,
    StructuralError, ValidationError,
};

use self::history::{History, Snapshot};
use self::structure::check_structure;

/// Which representation the host is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ViewMode {
    #[default]
    Visual,
    Dsl,
    Json,
}

/// Lifecycle of the edited tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    /// No nodes.
    Empty,
    /// Content was just created or loaded.
    Populated,
    /// Changed since the last validation.
    Dirty,
    /// Validated since the last change.
    Validated,
    /// Marked clean by the host, e.g. after saving.
    Clean,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Empty => "empty",
            Phase::Populated => "populated",
            Phase::Dirty => "dirty",
            Phase::Validated => "validated",
            Phase::Clean => "clean",
        };
        f.write_str(name)
    }
}

/// Import and export payload formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Format {
    Json,
    Dsl,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportOptions {
    pub format: Format,
    /// Append the imported rules as new roots instead of replacing the tree.
    #[serde(default)]
    pub merge: bool,
}

impl ImportOptions {
    #[must_use]
    pub fn json() -> Self {
        Self {
            format: Format::Json,
            merge: false,
        }
    }

    #[must_use]
    pub fn dsl() -> Self {
        Self {
            format: Format::Dsl,
            merge: false,
        }
    }

    #[must_use]
    pub fn with_merge(mut self, merge: bool) -> Self {
        self.merge = merge;
        self
    }
}

/// Editor settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EditorConfig {
    /// Re-validate after every mutation.
    pub auto_validate: bool,
    /// Include a round trip per root in validation.
    pub round_trip_validation: bool,
    pub max_history: usize,
    pub round_trip: RoundTripOptions,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            auto_validate: true,
            round_trip_validation: true,
            max_history: 50,
            round_trip: RoundTripOptions::default(),
        }
    }
}

impl EditorConfig {
    #[must_use]
    pub fn with_auto_validate(mut self, auto: bool) -> Self {
        self.auto_validate = auto;
        self
    }

    #[must_use]
    pub fn with_round_trip_validation(mut self, enabled: bool) -> Self {
        self.round_trip_validation = enabled;
        self
    }

    #[must_use]
    pub fn with_max_history(mut self, max: usize) -> Self {
        self.max_history = max;
        self
    }

    #[must_use]
    pub fn with_round_trip(mut self, options: RoundTripOptions) -> Self {
        self.round_trip = options;
        self
    }
}

/// A node to add. Without an id one is generated; without a label the
/// type's default label is used.
#[derive(Debug, Clone, PartialEq)]
pub struct NewNode {
    pub id: Option<String>,
    pub label: Option<String>,
    pub metadata: Option<NodeMetadata>,
    pub config: NodeConfig,
}

impl NewNode {
    #[must_use]
    pub fn new(config: NodeConfig) -> Self {
        Self {
            id: None,
            label: None,
            metadata: None,
            config,
        }
    }

    /// An unconfigured node of the given type.
    #[must_use]
    pub fn of_type(node_type: NodeType) -> Self {
        Self::new(NodeConfig::empty(node_type))
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    #[must_use]
    pub fn with_metadata(mut self, metadata: NodeMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Fields to overwrite on an existing node. Ids never change.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodePatch {
    pub label: Option<String>,
    /// `Some(None)` clears the metadata.
    pub metadata: Option<Option<NodeMetadata>>,
    pub config: Option<NodeConfig>,
}

impl NodePatch {
    #[must_use]
    pub fn label(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn config(config: NodeConfig) -> Self {
        Self {
            config: Some(config),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn metadata(metadata: Option<NodeMetadata>) -> Self {
        Self {
            metadata: Some(metadata),
            ..Self::default()
        }
    }
}

/// Notifications delivered to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorEvent {
    StateChanged,
    PhaseChanged { from: Phase, to: Phase },
    ValidationCompleted { errors: usize, warnings: usize },
}

/// Handle returned by [`RuleEditor::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Callback = Box<dyn FnMut(&EditorEvent) + Send>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditorError {
    #[error("parent node '{0}' does not exist")]
    UnknownParent(String),

    #[error("node '{0}' does not exist")]
    UnknownNode(String),

    #[error("a node with id '{0}' already exists")]
    DuplicateId(String),

    #[error("moving '{node}' under '{target}' would create a cycle")]
    WouldCreateCycle { node: String, target: String },
}

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("JSON payload has no \"type\" discriminator")]
    MissingType,

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Bridge(#[from] BridgeError),
}

/// Owns a flat rule tree and every mutation of it.
///
/// Each mutation marks the tree dirty, records an undo snapshot, notifies
/// subscribers and, when configured, re-validates.
pub struct RuleEditor {
    nodes: NodeMap,
    roots: Vec<String>,
    selected: Option<String>,
    history: History,
    dirty: bool,
    phase: Phase,
    view_mode: ViewMode,
    errors: Vec<ValidationError>,
    current_dsl: String,
    config: EditorConfig,
    validator: RoundTripValidator,
    subscribers: Vec<(SubscriptionId, Callback)>,
    next_subscription: u64,
}

impl Default for RuleEditor {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}

impl fmt::Debug for RuleEditor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleEditor")
            .field("nodes", &self.nodes.len())
            .field("roots", &self.roots)
            .field("selected", &self.selected)
            .field("phase", &self.phase)
            .field("dirty", &self.dirty)
            .field("errors", &self.errors.len())
            .field("subscribers", &self.subscribers.len())
            .finish_non_exhaustive()
    }
}

impl RuleEditor {
    #[must_use]
    pub fn new(config: EditorConfig) -> Self {
        let initial = Snapshot::new(NodeMap::new(), Vec::new(), None, "initial");
        Self {
            nodes: NodeMap::new(),
            roots: Vec::new(),
            selected: None,
            history: History::new(config.max_history, initial),
            dirty: false,
            phase: Phase::Empty,
            view_mode: ViewMode::default(),
            errors: Vec::new(),
            current_dsl: String::new(),
            validator: RoundTripValidator::new(config.round_trip.clone()),
            config,
            subscribers: Vec::new(),
            next_subscription: 0,
        }
    }

    // -- Accessors ----------------------------------------------------------

    #[must_use]
    pub fn nodes(&self) -> &NodeMap {
        &self.nodes
    }

    #[must_use]
    pub fn node(&self, id: &str) -> Option<&RuleNode> {
        self.nodes.get(id)
    }

    #[must_use]
    pub fn roots(&self) -> &[String] {
        &self.roots
    }

    #[must_use]
    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    #[must_use]
    pub fn view_mode(&self) -> ViewMode {
        self.view_mode
    }

    pub fn set_view_mode(&mut self, mode: ViewMode) {
        if self.view_mode != mode {
            self.view_mode = mode;
            self.emit(&EditorEvent::StateChanged);
        }
    }

    /// Diagnostics from the last validation.
    #[must_use]
    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    /// DSL generated for all roots by the last validation.
    #[must_use]
    pub fn current_dsl(&self) -> &str {
        &self.current_dsl
    }

    #[must_use]
    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    #[must_use]
    pub fn history(&self) -> &History {
        &self.history
    }

    /// The embedded tree under `root_id`.
    ///
    /// # Errors
    ///
    /// Returns [`StructuralError`] if the node is unknown or its subtree is
    /// broken.
    pub fn tree(&self, root_id: &str) -> Result<RuleNode, StructuralError> {
        build_complete_tree(root_id, &self.nodes)
    }

    // -- Observers ----------------------------------------------------------

    pub fn subscribe(&mut self, callback: impl FnMut(&EditorEvent) + Send + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.subscribers.push((id, Box::new(callback)));
        id
    }

    /// Returns `false` if `id` was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sub, _)| *sub != id);
        self.subscribers.len() != before
    }

    fn emit(&mut self, event: &EditorEvent) {
        for (_, callback) in &mut self.subscribers {
            callback(event);
        }
    }

    fn set_phase(&mut self, to: Phase) {
        if self.phase != to {
            let from = self.phase;
            self.phase = to;
            trace!(%from, %to, "editor phase changed");
            self.emit(&EditorEvent::PhaseChanged { from, to });
        }
    }

    // -- Mutations ----------------------------------------------------------

    /// Add a node under `parent`, or as a new root. Returns the node's id.
    ///
    /// # Errors
    ///
    /// [`EditorError::UnknownParent`] if `parent` does not exist and
    /// [`EditorError::DuplicateId`] if the requested id is taken.
    pub fn add_node(&mut self, new: NewNode, parent: Option<&str>) -> Result<String, EditorError> {
        let id = new.id.unwrap_or_else(|| Uuid::new_v4().to_string());
        if self.nodes.contains_key(&id) {
            return Err(EditorError::DuplicateId(id));
        }
        if let Some(parent_id) = parent {
            if !self.nodes.contains_key(parent_id) {
                return Err(EditorError::UnknownParent(parent_id.to_owned()));
            }
        }

        let label = new
            .label
            .unwrap_or_else(|| new.config.node_type().default_label().to_owned());
        let mut node = RuleNode::new(id.clone(), new.config).with_label(label);
        node.metadata = new.metadata;
        node.parent_id = parent.map(str::to_owned);
        self.attach(&id, parent, None);
        self.nodes.insert(id.clone(), node);

        debug!(node = %id, parent = ?parent, "node added");
        self.commit("add node", false);
        Ok(id)
    }

    /// Apply `patch` to node `id`. Returns `false` (and changes nothing) if
    /// the node does not exist.
    pub fn update_node(&mut self, id: &str, patch: NodePatch) -> bool {
        let Some(node) = self.nodes.get_mut(id) else {
            return false;
        };
        if let Some(label) = patch.label {
            node.label = Some(label);
        }
        if let Some(metadata) = patch.metadata {
            node.metadata = metadata;
        }
        if let Some(config) = patch.config {
            node.config = config;
        }
        debug!(node = %id, "node updated");
        self.commit("update node", false);
        true
    }

    /// Remove node `id` and everything below it. Returns `false` if the node
    /// does not exist.
    pub fn remove_node(&mut self, id: &str) -> bool {
        let Some(node) = self.nodes.get(id) else {
            return false;
        };
        let parent = node.parent_id.clone();
        self.detach(id, parent.as_deref());

        let removed = subtree_ids(id, &self.nodes);
        for gone in &removed {
            self.nodes.remove(gone);
        }
        if self
            .selected
            .as_ref()
            .is_some_and(|s| removed.contains(s))
        {
            self.selected = None;
        }
        debug!(node = %id, removed = removed.len(), "node removed");
        self.commit("remove node", false);
        true
    }

    /// Move node `id` under `new_parent` (or to the root list) at `index`,
    /// appending when `index` is `None` or past the end. Returns `false` if
    /// the node does not exist or already has that parent; use
    /// [`RuleEditor::reorder_node`] to change its place among siblings.
    ///
    /// # Errors
    ///
    /// [`EditorError::UnknownParent`] for a missing target and
    /// [`EditorError::WouldCreateCycle`] for a target inside the node's own
    /// subtree.
    pub fn move_node(
        &mut self,
        id: &str,
        new_parent: Option<&str>,
        index: Option<usize>,
    ) -> Result<bool, EditorError> {
        let Some(node) = self.nodes.get(id) else {
            return Ok(false);
        };
        let old_parent = node.parent_id.clone();
        if old_parent.as_deref() == new_parent {
            return Ok(false);
        }
        if let Some(target) = new_parent {
            if !self.nodes.contains_key(target) {
                return Err(EditorError::UnknownParent(target.to_owned()));
            }
            if subtree_ids(id, &self.nodes).iter().any(|n| n == target) {
                return Err(EditorError::WouldCreateCycle {
                    node: id.to_owned(),
                    target: target.to_owned(),
                });
            }
        }

        self.detach(id, old_parent.as_deref());
        self.attach(id, new_parent, index);
        if let Some(node) = self.nodes.get_mut(id) {
            node.parent_id = new_parent.map(str::to_owned);
        }
        debug!(node = %id, from = ?old_parent, to = ?new_parent, "node moved");
        self.commit("move node", false);
        Ok(true)
    }

    /// Move node `id` to `index` among its siblings, clamped to the last
    /// position. Returns `false` if the node does not exist or is already
    /// there.
    pub fn reorder_node(&mut self, id: &str, index: usize) -> bool {
        let Some(node) = self.nodes.get(id) else {
            return false;
        };
        let parent = node.parent_id.clone();
        let siblings: Vec<&str> = match parent.as_deref().and_then(|p| self.nodes.get(p)) {
            Some(parent) => parent.child_ids().collect(),
            None => self.roots.iter().map(String::as_str).collect(),
        };
        let Some(current) = siblings.iter().position(|s| *s == id) else {
            return false;
        };
        let target = index.min(siblings.len() - 1);
        if target == current {
            return false;
        }

        self.detach(id, parent.as_deref());
        self.attach(id, parent.as_deref(), Some(target));
        debug!(node = %id, from = current, to = target, "node reordered");
        self.commit("reorder node", false);
        true
    }

    /// Select a node, or clear the selection with `None`.
    ///
    /// # Errors
    ///
    /// [`EditorError::UnknownNode`] if `id` does not exist.
    pub fn select(&mut self, id: Option<&str>) -> Result<(), EditorError> {
        if let Some(id) = id {
            if !self.nodes.contains_key(id) {
                return Err(EditorError::UnknownNode(id.to_owned()));
            }
        }
        let selected = id.map(str::to_owned);
        if self.selected != selected {
            self.selected = selected;
            self.emit(&EditorEvent::StateChanged);
        }
        Ok(())
    }

    fn attach(&mut self, id: &str, parent: Option<&str>, index: Option<usize>) {
        let list = match parent {
            Some(parent_id) => match self.nodes.get_mut(parent_id) {
                Some(parent) => &mut parent.children,
                None => return,
            },
            None => {
                let at = index.map_or(self.roots.len(), |i| i.min(self.roots.len()));
                self.roots.insert(at, id.to_owned());
                return;
            }
        };
        let at = index.map_or(list.len(), |i| i.min(list.len()));
        list.insert(at, ChildEntry::Id(id.to_owned()));
    }

    fn detach(&mut self, id: &str, parent: Option<&str>) {
        match parent.and_then(|p| self.nodes.get_mut(p)) {
            Some(parent) => parent.children.retain(|c| c.id() != id),
            None => self.roots.retain(|r| r != id),
        }
    }

    // -- History ------------------------------------------------------------

    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Restore the previous snapshot. Returns `false` if there is none.
    pub fn undo(&mut self) -> bool {
        let Some(snapshot) = self.history.undo().cloned() else {
            return false;
        };
        debug!(to = %snapshot.description, "undo");
        self.restore(snapshot);
        true
    }

    /// Re-apply the next snapshot. Returns `false` if there is none.
    pub fn redo(&mut self) -> bool {
        let Some(snapshot) = self.history.redo().cloned() else {
            return false;
        };
        debug!(to = %snapshot.description, "redo");
        self.restore(snapshot);
        true
    }

    fn restore(&mut self, snapshot: Snapshot) {
        self.nodes = snapshot.nodes;
        self.roots = snapshot.roots;
        self.selected = snapshot.selected;
        self.after_change(false);
    }

    fn snapshot(&self, description: &str) -> Snapshot {
        Snapshot::new(
            self.nodes.clone(),
            self.roots.clone(),
            self.selected.clone(),
            description,
        )
    }

    /// Record a snapshot of the mutated state and run the change hooks.
    fn commit(&mut self, description: &str, loaded: bool) {
        self.history.record(self.snapshot(description));
        self.after_change(loaded);
    }

    fn after_change(&mut self, loaded: bool) {
        self.dirty = true;
        let phase = if self.nodes.is_empty() {
            Phase::Empty
        } else if loaded || self.phase == Phase::Empty {
            Phase::Populated
        } else {
            Phase::Dirty
        };
        self.set_phase(phase);
        self.emit(&EditorEvent::StateChanged);
        if self.config.auto_validate {
            self.validate_rules();
        }
    }

    /// Mark the current state as saved.
    pub fn mark_clean(&mut self) {
        self.dirty = false;
        if !self.nodes.is_empty() {
            self.set_phase(Phase::Clean);
        }
    }

    // -- Import & export ----------------------------------------------------

    /// Load rules from JSON or DSL text. Returns the id of the first new root,
    /// or `Ok(None)` when the payload holds nothing (empty text, `null`,
    /// `[]`, `{}`). On error the tree is left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError`] for malformed payloads, JSON objects without a
    /// `type` discriminator, and specifications rule nodes cannot hold.
    pub fn import(
        &mut self,
        content: &str,
        options: ImportOptions,
    ) -> Result<Option<String>, ImportError> {
        let specs = match options.format {
            Format::Json => specs_from_json(content),
            Format::Dsl => parse(content)
                .map(|parsed| parsed.into_iter().collect())
                .map_err(ImportError::from),
        }
        .inspect_err(|e| warn!(error = %e, format = ?options.format, "import rejected"))?;

        if specs.is_empty() {
            debug!(format = ?options.format, "nothing to import");
            return Ok(None);
        }
        let trees = specs
            .iter()
            .map(to_rule_node)
            .collect::<Result<Vec<_>, _>>()
            .inspect_err(|e| warn!(error = %e, "import rejected"))?;

        if !options.merge {
            self.nodes.clear();
            self.roots.clear();
            self.selected = None;
        }
        let first = trees.first().map(|t| t.id.clone());
        for tree in &trees {
            flatten_into(tree, None, &mut self.nodes);
            self.roots.push(tree.id.clone());
        }
        debug!(roots = trees.len(), merge = options.merge, "rules imported");
        self.commit("import", !options.merge);
        Ok(first)
    }

    /// Serialize every root: JSON is an array of specifications, DSL is one
    /// expression per root separated by blank lines.
    ///
    /// # Errors
    ///
    /// Returns [`RulespecError`] if a root cannot be built, translated or
    /// rendered.
    pub fn export(&self, format: Format) -> Result<String, RulespecError> {
        let specs = self.specifications()?;
        match format {
            Format::Json => Ok(serde_json::to_string_pretty(&specs)?),
            Format::Dsl => {
                let texts = specs
                    .iter()
                    .map(|spec| export(spec, &self.config.round_trip.export))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(texts.join("\n\n"))
            }
        }
    }

    fn specifications(&self) -> Result<Vec<Specification>, RulespecError> {
        self.roots
            .iter()
            .map(|root| -> Result<Specification, RulespecError> {
                let tree = build_complete_tree(root, &self.nodes)?;
                Ok(to_specification(&tree)?)
            })
            .collect()
    }

    // -- Validation ---------------------------------------------------------

    /// Check every node, the tree structure, DSL generation and (when
    /// enabled) a round trip per root. Problems become diagnostics; this
    /// never fails.
    pub fn validate_rules(&mut self) -> &[ValidationError] {
        let mut errors = Vec::new();

        for (id, node) in &self.nodes {
            errors.extend(node_problems(id, node));
        }

        for problem in check_structure(&self.nodes, &self.roots) {
            let mut error = ValidationError::error(ErrorCode::StructuralError, problem.to_string());
            if let Some(node) = problem.node_id() {
                error = error.on_node(node);
            }
            errors.push(error);
        }

        let mut dsl = Vec::new();
        for root in &self.roots {
            let Ok(tree) = build_complete_tree(root, &self.nodes) else {
                continue;
            };
            let generated = to_specification(&tree)
                .map_err(|e| e.to_string())
                .and_then(|spec| {
                    export(&spec, &self.config.round_trip.export).map_err(|e| e.to_string())
                });
            match generated {
                Ok(text) => dsl.push(text),
                Err(reason) => {
                    errors.push(
                        ValidationError::error(
                            ErrorCode::GenerationFailed,
                            format!("could not generate rule: {reason}"),
                        )
                        .on_node(root),
                    );
                    continue;
                }
            }
            if self.config.round_trip_validation {
                let result = self.validator.validate(&tree);
                errors.extend(result.errors().iter().cloned());
                errors.extend(result.warnings().iter().cloned());
            }
        }

        self.current_dsl = dsl.join("\n\n");
        self.errors = errors;
        let error_count = self.errors.iter().filter(|e| e.is_error()).count();
        let warning_count = self.errors.len() - error_count;
        debug!(errors = error_count, warnings = warning_count, "rules validated");

        if !self.nodes.is_empty() {
            self.set_phase(Phase::Validated);
        }
        self.emit(&EditorEvent::ValidationCompleted {
            errors: error_count,
            warnings: warning_count,
        });
        &self.errors
    }
}

/// Checks that need only the node itself.
fn node_problems(id: &str, node: &RuleNode) -> Vec<ValidationError> {
    let mut problems = Vec::new();
    let node_type = node.node_type();

    for field in node.config.missing_fields() {
        problems.push(
            ValidationError::error(
                ErrorCode::InvalidNode,
                format!("{node_type} is missing '{field}'"),
            )
            .on_node(id),
        );
    }

    let children = node.children.len();
    match node.config.child_arity() {
        None if children == 0 && matches!(node.config, NodeConfig::Group { .. }) => {
            problems.push(
                ValidationError::warning(ErrorCode::EmptyGroup, format!("{node_type} has no children"))
                    .on_node(id),
            );
        }
        Some(expected) if expected != children => {
            problems.push(
                ValidationError::error(
                    ErrorCode::InvalidNode,
                    format!("{node_type} needs {expected} children, has {children}"),
                )
                .on_node(id),
            );
        }
        _ => {}
    }

    if let NodeConfig::FunctionCall {
        name: Some(name), ..
    } = &node.config
    {
        if is_reserved_call(name) {
            problems.push(
                ValidationError::error(
                    ErrorCode::InvalidNode,
                    format!("function name '{name}' is reserved"),
                )
                .on_node(id),
            );
        }
    }
    problems
}

fn specs_from_json(content: &str) -> Result<Vec<Specification>, ImportError> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    let value: serde_json::Value = serde_json::from_str(trimmed)?;
    match value {
        serde_json::Value::Null => Ok(Vec::new()),
        serde_json::Value::Array(items) => items.into_iter().map(spec_from_json).collect(),
        serde_json::Value::Object(ref map) if map.is_empty() => Ok(Vec::new()),
        other => Ok(vec![spec_from_json(other)?]),
    }
}

fn spec_from_json(value: serde_json::Value) -> Result<Specification, ImportError> {
    if value.get("type").is_none() {
        return Err(ImportError::MissingType);
    }
    Ok(serde_json::from_value(value)?)
}
