//! Cycle-safe recursive descent over the recipe graph
//!
//! Every aggregator walks the same way: leaves yield their declared value,
//! composites sum `child value × edge quantity` over their components. Any
//! problem on the way (ghost, unknown id, bad quantity, missing leaf value,
//! revisit) is absorbed into a `missing` flag and the walk continues with the
//! remaining siblings.
//!
//! Under [`VisitPolicy::BranchLocal`] a shared sub-recipe is resolved once per
//! evaluation and reused for every further path that reaches it, so the work
//! grows with the number of items rather than the number of paths.

use std::collections::HashMap;
use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::models::{Catalog, Component, Item};

/// Nesting bound. Deeper branches are cut and flagged.
pub const MAX_DEPTH: usize = 64;

/// How revisits of an item are detected during one evaluation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum VisitPolicy {
    /// Only items on the current path count as visited. Shared sub-recipes
    /// in disjoint branches are evaluated in full.
    #[default]
    BranchLocal,
    /// The first occurrence of an item anywhere in the tree wins; every
    /// later occurrence is treated as a revisit.
    FirstOccurrence,
}

/// Kinds of incomplete data absorbed during a walk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Issue {
    MissingReference,
    InvalidQuantity,
    MissingLeafValue,
    CycleDetected,
    EmptyComposite,
    DepthExceeded,
    /// `child × quantity` left the finite range
    Overflow,
}

pub(crate) fn note(issue: Issue, item_id: &str) {
    tracing::debug!(?issue, item = item_id, "incomplete data");
}

/// A rolled-up value together with its completeness flag
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolved<V> {
    pub value: V,
    pub missing: bool,
}

impl<V: Default> Resolved<V> {
    pub fn complete(value: V) -> Self {
        Resolved { value, missing: false }
    }

    /// Neutral value, flagged
    pub fn missing() -> Self {
        Resolved {
            value: V::default(),
            missing: true,
        }
    }
}

/// What is being summed over the graph
pub trait Rollup {
    type Value: Default + Clone;

    /// Declared value of an item without components
    fn leaf(&self, item: &Item) -> Resolved<Self::Value>;

    /// Add `child × quantity` into `total`
    fn accumulate(&self, total: &mut Self::Value, child: &Self::Value, quantity: f64);

    /// Whether every part of `value` is a finite number
    fn is_finite(&self, value: &Self::Value) -> bool;
}

/// Parse an edge quantity. Accepts a decimal comma; rejects anything that is
/// not a finite number above zero.
pub fn parse_quantity(raw: &str) -> Option<f64> {
    let normalized = raw.trim().replace(',', ".");
    let value = normalized.parse::<f64>().ok()?;
    (value.is_finite() && value > 0.0).then_some(value)
}

/// Cached result of an item whose subtree is free of revisits and depth cuts.
/// Such a result is the same on every path; `height` is the number of
/// levels below the item, so it is only reused where it still fits under
/// `MAX_DEPTH`.
struct Memo<V> {
    resolved: Resolved<V>,
    height: usize,
}

/// Result of one subtree together with what the cache needs to know about it
struct Step<V> {
    resolved: Resolved<V>,
    height: usize,
    /// Touched a revisit or a depth cut, so the result depends on the path
    path_dependent: bool,
}

impl<V: Default> Step<V> {
    fn cut() -> Self {
        Step {
            resolved: Resolved::missing(),
            height: 0,
            path_dependent: true,
        }
    }
}

/// Per-evaluation state: the visited set and, for branch-local walks, the
/// cache of path-independent results.
struct Evaluation<V> {
    policy: VisitPolicy,
    visited: HashSet<String>,
    memo: HashMap<String, Memo<V>>,
}

impl<V: Clone> Evaluation<V> {
    fn new(policy: VisitPolicy) -> Self {
        Evaluation {
            policy,
            visited: HashSet::new(),
            memo: HashMap::new(),
        }
    }

    /// Returns false if the id was already visited
    fn enter(&mut self, id: &str) -> bool {
        self.visited.insert(id.to_string())
    }

    fn leave(&mut self, id: &str) {
        if self.policy == VisitPolicy::BranchLocal {
            self.visited.remove(id);
        }
    }

    fn cached(&self, id: &str, depth: usize) -> Option<&Memo<V>> {
        if self.policy != VisitPolicy::BranchLocal {
            return None;
        }
        self.memo.get(id).filter(|m| depth + m.height <= MAX_DEPTH)
    }

    fn remember(&mut self, id: &str, step: &Step<V>) {
        if self.policy == VisitPolicy::BranchLocal && !step.path_dependent {
            self.memo.insert(
                id.to_string(),
                Memo {
                    resolved: step.resolved.clone(),
                    height: step.height,
                },
            );
        }
    }
}

/// Resolve the component item an edge points at, if any
pub(crate) fn lookup<'a>(catalog: &'a Catalog, parent_id: &str, component: &Component) -> Option<&'a Item> {
    match &component.item_id {
        None => {
            tracing::debug!(
                parent = parent_id,
                deleted = component.deleted_item_name.as_deref().unwrap_or("?"),
                "ghost component"
            );
            note(Issue::MissingReference, parent_id);
            None
        }
        Some(id) => {
            let item = catalog.get(id);
            if item.is_none() {
                note(Issue::MissingReference, id);
            }
            item
        }
    }
}

/// Per-component outcome of a root rollup
#[derive(Debug, Clone, PartialEq)]
pub struct Line<V> {
    /// Resolved value of one unit of the child
    pub child: Resolved<V>,
    pub quantity: f64,
    /// `child × quantity` left the finite range and was not added
    pub overflow: bool,
}

/// A root rollup with the contribution of each direct component.
/// `lines[i]` is `None` when component `i` is a ghost, points at an unknown
/// item or has an invalid quantity.
#[derive(Debug, Clone, PartialEq)]
pub struct Breakdown<V> {
    pub total: Resolved<V>,
    pub lines: Vec<Option<Line<V>>>,
}

/// Roll up `components` as if they belonged to `root`.
///
/// `components` is usually `root.components`, but may be a live list being
/// edited. The root itself is marked visited so that a component leading
/// back to it is caught as a cycle.
pub fn resolve_root<R: Rollup>(
    rollup: &R,
    catalog: &Catalog,
    root: &Item,
    components: &[Component],
    policy: VisitPolicy,
) -> Resolved<R::Value> {
    resolve_root_lines(rollup, catalog, root, components, policy).total
}

/// Like [`resolve_root`], also reporting each direct component. All lines
/// share one evaluation, so they add up to the total under either policy.
pub fn resolve_root_lines<R: Rollup>(
    rollup: &R,
    catalog: &Catalog,
    root: &Item,
    components: &[Component],
    policy: VisitPolicy,
) -> Breakdown<R::Value> {
    let mut eval = Evaluation::new(policy);
    eval.enter(&root.id);
    let mut lines = Vec::with_capacity(components.len());
    let step = resolve_components(rollup, catalog, &root.id, components, &mut eval, 0, Some(&mut lines));
    Breakdown {
        total: step.resolved,
        lines,
    }
}

/// Roll up a single item with a fresh evaluation
pub fn resolve_item<R: Rollup>(
    rollup: &R,
    catalog: &Catalog,
    item: &Item,
    policy: VisitPolicy,
) -> Resolved<R::Value> {
    let mut eval = Evaluation::new(policy);
    resolve_recursive(rollup, catalog, item, &mut eval, 0).resolved
}

fn resolve_recursive<R: Rollup>(
    rollup: &R,
    catalog: &Catalog,
    item: &Item,
    eval: &mut Evaluation<R::Value>,
    depth: usize,
) -> Step<R::Value> {
    if depth > MAX_DEPTH {
        note(Issue::DepthExceeded, &item.id);
        return Step::cut();
    }

    if let Some(memo) = eval.cached(&item.id, depth) {
        return Step {
            resolved: memo.resolved.clone(),
            height: memo.height,
            path_dependent: false,
        };
    }

    if !eval.enter(&item.id) {
        note(Issue::CycleDetected, &item.id);
        return Step::cut();
    }

    let step = if item.components.is_empty() {
        let leaf = rollup.leaf(item);
        if leaf.missing {
            note(Issue::MissingLeafValue, &item.id);
        }
        Step {
            resolved: leaf,
            height: 0,
            path_dependent: false,
        }
    } else {
        resolve_components(rollup, catalog, &item.id, &item.components, eval, depth, None)
    };

    eval.leave(&item.id);
    eval.remember(&item.id, &step);
    step
}

fn resolve_components<R: Rollup>(
    rollup: &R,
    catalog: &Catalog,
    parent_id: &str,
    components: &[Component],
    eval: &mut Evaluation<R::Value>,
    depth: usize,
    mut lines: Option<&mut Vec<Option<Line<R::Value>>>>,
) -> Step<R::Value> {
    let mut total = R::Value::default();
    let mut missing = false;
    let mut height = 0;
    let mut path_dependent = false;

    for component in components {
        let Some(child) = lookup(catalog, parent_id, component) else {
            missing = true;
            if let Some(lines) = lines.as_deref_mut() {
                lines.push(None);
            }
            continue;
        };

        let Some(quantity) = parse_quantity(&component.quantity) else {
            note(Issue::InvalidQuantity, &child.id);
            missing = true;
            if let Some(lines) = lines.as_deref_mut() {
                lines.push(None);
            }
            continue;
        };

        let step = resolve_recursive(rollup, catalog, child, eval, depth + 1);
        height = height.max(step.height + 1);
        path_dependent |= step.path_dependent;
        missing |= step.resolved.missing;

        let mut next = total.clone();
        rollup.accumulate(&mut next, &step.resolved.value, quantity);
        let overflow = !rollup.is_finite(&next);
        if overflow {
            note(Issue::Overflow, &child.id);
            missing = true;
        } else {
            total = next;
        }

        if let Some(lines) = lines.as_deref_mut() {
            lines.push(Some(Line {
                child: step.resolved,
                quantity,
                overflow,
            }));
        }
    }

    Step {
        resolved: Resolved { value: total, missing },
        height,
        path_dependent,
    }
}

/// Visit every distinct component item reachable from `components`, at any
/// depth. The root itself is not visited, and each item is visited once.
///
/// The set of distinct reachable items is the same whichever visit policy an
/// aggregator uses, so one seen set serves the whole walk. An item first met
/// on a long path is descended into again if a shorter path reaches it, so a
/// depth cut on one path never hides what a shorter path can reach.
pub fn walk_reachable<'a>(
    catalog: &'a Catalog,
    root: &Item,
    components: &'a [Component],
    mut visit: impl FnMut(&'a Item),
) {
    let mut seen = HashMap::new();
    seen.insert(root.id.clone(), 0);
    walk_recursive(catalog, &root.id, components, &mut seen, 0, &mut visit);
}

fn walk_recursive<'a>(
    catalog: &'a Catalog,
    parent_id: &str,
    components: &'a [Component],
    seen: &mut HashMap<String, usize>,
    depth: usize,
    visit: &mut impl FnMut(&'a Item),
) {
    if depth >= MAX_DEPTH {
        if !components.is_empty() {
            note(Issue::DepthExceeded, parent_id);
        }
        return;
    }

    for component in components {
        let Some(child) = lookup(catalog, parent_id, component) else {
            continue;
        };
        match seen.get(&child.id) {
            Some(&at) if at <= depth + 1 => continue,
            Some(_) => {}
            None => visit(child),
        }
        seen.insert(child.id.clone(), depth + 1);
        walk_recursive(catalog, &child.id, &child.components, seen, depth + 1, visit);
    }
}
