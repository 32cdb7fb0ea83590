//! System catalog, commit, and dependency resolution.
//!
//! Systems are pushed into a [`SystemCatalog`] in any order. [`commit`]
//! turns the catalog into a [`SystemGraph`]: per kind, descriptors are sorted
//! by name, `before`/`after` names are resolved into index edges, and the
//! edge lists are normalised. Each world then asks the graph for a resolved
//! execution order with [`SystemGraph::resolve_order`].
//!
//! # Determinism
//!
//! Nodes are indexed in name order and the topological sort visits nodes and
//! their dependencies in ascending index order. Two systems with no path
//! between them therefore run in name order, and the same registration set
//! always yields the same schedule regardless of registration order.
//!
//! [`commit`]: SystemCatalog::commit

use std::collections::HashMap;
use std::fmt;

use tessera_ecs::expr::TagPredicate;
use tessera_ecs::tag::TagSet;

use crate::system::{SystemDescriptor, SystemFactory, SystemKind};
use crate::EngineError;

// ---------------------------------------------------------------------------
// SystemCatalog
// ---------------------------------------------------------------------------

/// Push-only collection of system descriptors awaiting commit.
#[derive(Debug, Default)]
pub struct SystemCatalog {
    descriptors: Vec<SystemDescriptor>,
}

impl SystemCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, descriptor: SystemDescriptor) -> &mut Self {
        self.descriptors.push(descriptor);
        self
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Resolve names into a dependency graph.
    ///
    /// # Errors
    ///
    /// - [`EngineError::DuplicateSystem`] if a name repeats within a kind.
    /// - [`EngineError::UnknownDependency`] if a `before`/`after` name does not
    ///   match a system of the same kind.
    /// - [`EngineError::SelfDependency`] if a system is ordered against itself.
    pub fn commit(self) -> Result<SystemGraph, EngineError> {
        let mut per_kind: [Vec<SystemDescriptor>; 2] = [Vec::new(), Vec::new()];
        for desc in self.descriptors {
            per_kind[desc.kind.index()].push(desc);
        }
        let [normal, fixed] = per_kind;
        let graph = SystemGraph {
            kinds: [
                KindGraph::build(SystemKind::Normal, normal)?,
                KindGraph::build(SystemKind::Fixed, fixed)?,
            ],
        };
        for kind in SystemKind::ALL {
            tracing::debug!(
                %kind,
                systems = graph.kind(kind).len(),
                "committed system graph"
            );
        }
        Ok(graph)
    }
}

// ---------------------------------------------------------------------------
// SystemNode
// ---------------------------------------------------------------------------

/// A committed system: descriptor data plus resolved `after` edges.
pub struct SystemNode {
    name: String,
    kind: SystemKind,
    factory: SystemFactory,
    /// Indices (within the same kind) that must run before this node.
    /// Sorted, deduplicated, never contains the node itself.
    after: Vec<usize>,
    predicate: Option<Box<dyn TagPredicate>>,
}

impl SystemNode {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> SystemKind {
        self.kind
    }

    pub fn after(&self) -> &[usize] {
        &self.after
    }

    pub fn factory(&self) -> &SystemFactory {
        &self.factory
    }

    pub fn is_gated(&self) -> bool {
        self.predicate.is_some()
    }

    /// Whether this system should update in a world with `tags`.
    /// Ungated systems are always active.
    pub fn is_active(&self, tags: &TagSet) -> bool {
        self.predicate.as_ref().map_or(true, |p| p.test(tags))
    }
}

impl fmt::Debug for SystemNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SystemNode")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("after", &self.after)
            .field("gated", &self.is_gated())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// KindGraph
// ---------------------------------------------------------------------------

/// The committed nodes of one [`SystemKind`], indexed in name order.
#[derive(Debug)]
pub struct KindGraph {
    kind: SystemKind,
    nodes: Vec<SystemNode>,
    by_name: HashMap<String, usize>,
}

impl KindGraph {
    fn build(kind: SystemKind, mut descriptors: Vec<SystemDescriptor>) -> Result<Self, EngineError> {
        descriptors.sort_by(|a, b| a.name.cmp(&b.name));

        let mut by_name = HashMap::with_capacity(descriptors.len());
        for (index, desc) in descriptors.iter().enumerate() {
            if by_name.insert(desc.name.clone(), index).is_some() {
                return Err(EngineError::DuplicateSystem {
                    name: desc.name.clone(),
                    kind,
                });
            }
        }

        let resolve = |system: &str, dependency: &str| {
            by_name
                .get(dependency)
                .copied()
                .ok_or_else(|| EngineError::UnknownDependency {
                    system: system.to_owned(),
                    dependency: dependency.to_owned(),
                    kind,
                })
        };

        let mut after: Vec<Vec<usize>> = vec![Vec::new(); descriptors.len()];
        for (index, desc) in descriptors.iter().enumerate() {
            for target in &desc.before {
                after[resolve(&desc.name, target)?].push(index);
            }
            for dependency in &desc.after {
                after[index].push(resolve(&desc.name, dependency)?);
            }
        }

        for (index, edges) in after.iter_mut().enumerate() {
            edges.sort_unstable();
            edges.dedup();
            if edges.binary_search(&index).is_ok() {
                return Err(EngineError::SelfDependency {
                    system: descriptors[index].name.clone(),
                    kind,
                });
            }
        }

        let nodes = descriptors
            .into_iter()
            .zip(after)
            .map(|(desc, after)| SystemNode {
                name: desc.name,
                kind,
                factory: desc.factory,
                after,
                predicate: desc.predicate,
            })
            .collect();

        Ok(Self {
            kind,
            nodes,
            by_name,
        })
    }

    pub fn kind(&self) -> SystemKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, index: usize) -> &SystemNode {
        &self.nodes[index]
    }

    pub fn nodes(&self) -> &[SystemNode] {
        &self.nodes
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    /// Depth-first topological sort.
    ///
    /// Dependencies precede dependents; unrelated nodes keep name order.
    ///
    /// # Errors
    ///
    /// [`EngineError::Cycle`] with the offending path when the `after` edges
    /// contain a cycle.
    pub fn resolve_order(&self) -> Result<Vec<usize>, EngineError> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            NotVisited,
            InProgress,
            Done,
        }

        fn visit(
            graph: &KindGraph,
            index: usize,
            marks: &mut [Mark],
            stack: &mut Vec<usize>,
            order: &mut Vec<usize>,
        ) -> Result<(), EngineError> {
            match marks[index] {
                Mark::Done => return Ok(()),
                Mark::InProgress => {
                    let start = stack.iter().position(|&i| i == index).unwrap_or(0);
                    let mut path: Vec<String> = stack[start..]
                        .iter()
                        .map(|&i| graph.nodes[i].name.clone())
                        .collect();
                    path.push(graph.nodes[index].name.clone());
                    return Err(EngineError::Cycle {
                        kind: graph.kind,
                        path,
                    });
                }
                Mark::NotVisited => {}
            }
            marks[index] = Mark::InProgress;
            stack.push(index);
            for &dependency in &graph.nodes[index].after {
                visit(graph, dependency, marks, stack, order)?;
            }
            stack.pop();
            marks[index] = Mark::Done;
            order.push(index);
            Ok(())
        }

        let mut marks = vec![Mark::NotVisited; self.nodes.len()];
        let mut stack = Vec::new();
        let mut order = Vec::with_capacity(self.nodes.len());
        for index in 0..self.nodes.len() {
            visit(self, index, &mut marks, &mut stack, &mut order)?;
        }
        Ok(order)
    }
}

// ---------------------------------------------------------------------------
// SystemGraph
// ---------------------------------------------------------------------------

/// The committed, immutable dependency graph for every kind.
#[derive(Debug)]
pub struct SystemGraph {
    kinds: [KindGraph; 2],
}

impl SystemGraph {
    /// A graph with no systems.
    pub fn empty() -> Self {
        SystemCatalog::new()
            .commit()
            .unwrap_or_else(|_| unreachable!("an empty catalog always commits"))
    }

    pub fn kind(&self, kind: SystemKind) -> &KindGraph {
        &self.kinds[kind.index()]
    }

    pub fn resolve_order(&self, kind: SystemKind) -> Result<Vec<usize>, EngineError> {
        self.kind(kind).resolve_order()
    }

    /// Resolved system names for `kind`.
    pub fn resolved_names(&self, kind: SystemKind) -> Result<Vec<&str>, EngineError> {
        let graph = self.kind(kind);
        Ok(graph
            .resolve_order()?
            .into_iter()
            .map(|i| graph.node(i).name())
            .collect())
    }

    /// blake3 hash over the resolved orders of every kind.
    ///
    /// Equal fingerprints mean byte-identical schedules.
    pub fn fingerprint(&self) -> Result<blake3::Hash, EngineError> {
        let mut hasher = blake3::Hasher::new();
        for kind in SystemKind::ALL {
            hasher.update(kind.to_string().as_bytes());
            hasher.update(&[0xff]);
            for name in self.resolved_names(kind)? {
                hasher.update(name.as_bytes());
                hasher.update(&[0]);
            }
        }
        Ok(hasher.finalize())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
