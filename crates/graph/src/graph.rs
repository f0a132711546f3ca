use crate::types::KnowledgeGraph;
use petgraph::graph::{DiGraph, NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use std::collections::HashMap;

/// Simple undirected view of a knowledge graph, used for connectivity and degree work.
///
/// Parallel edges and edges running both ways between a pair collapse into one. Relationships
/// with a missing endpoint are not projected.
pub struct UndirectedProjection {
    pub graph: UnGraph<String, ()>,
    pub nodes: HashMap<String, NodeIndex>,
}

impl UndirectedProjection {
    /// Degree of a node; a self loop contributes 2
    pub fn degree(&self, idx: NodeIndex) -> usize {
        self.graph
            .edges(idx)
            .map(|e| if e.source() == e.target() { 2 } else { 1 })
            .sum()
    }
}

/// Directed view keeping every relationship label (parallel edges included)
pub struct DirectedProjection {
    pub graph: DiGraph<String, String>,
    pub nodes: HashMap<String, NodeIndex>,
}

impl KnowledgeGraph {
    /// Build the undirected projection
    pub fn undirected(&self) -> UndirectedProjection {
        self.project_undirected(false)
    }

    /// Undirected projection where relationship endpoints that are not entities become
    /// placeholder nodes, as extractor output is read before any clean-up.
    pub fn undirected_with_missing(&self) -> UndirectedProjection {
        self.project_undirected(true)
    }

    fn project_undirected(&self, include_missing: bool) -> UndirectedProjection {
        let mut graph = UnGraph::with_capacity(self.entity_count(), self.relationship_count());
        let mut nodes = HashMap::with_capacity(self.entity_count());
        for entity in self.entities() {
            nodes.insert(entity.id.clone(), graph.add_node(entity.id.clone()));
        }
        for rel in self.relationships() {
            if include_missing {
                for id in [&rel.source, &rel.target] {
                    if !nodes.contains_key(id) {
                        nodes.insert(id.clone(), graph.add_node(id.clone()));
                    }
                }
            }
            if let (Some(&a), Some(&b)) = (nodes.get(&rel.source), nodes.get(&rel.target)) {
                graph.update_edge(a, b, ());
            }
        }
        UndirectedProjection { graph, nodes }
    }

    /// Build the directed projection
    pub fn directed(&self) -> DirectedProjection {
        let mut graph = DiGraph::with_capacity(self.entity_count(), self.relationship_count());
        let mut nodes = HashMap::with_capacity(self.entity_count());
        for entity in self.entities() {
            nodes.insert(entity.id.clone(), graph.add_node(entity.id.clone()));
        }
        for rel in self.relationships() {
            if let (Some(&a), Some(&b)) = (nodes.get(&rel.source), nodes.get(&rel.target)) {
                graph.add_edge(a, b, rel.relation.clone());
            }
        }
        DirectedProjection { graph, nodes }
    }

    /// Undirected degree of one entity (None if absent)
    pub fn degree(&self, id: &str) -> Option<usize> {
        let projection = self.undirected();
        projection.nodes.get(id).map(|&idx| projection.degree(idx))
    }

    /// Undirected degree of every entity
    pub fn degrees(&self) -> HashMap<String, usize> {
        let projection = self.undirected();
        projection
            .nodes
            .iter()
            .map(|(id, &idx)| (id.clone(), projection.degree(idx)))
            .collect()
    }

    /// Undirected degree of every entity, counting relationships whose other end is missing
    pub fn degrees_with_missing(&self) -> HashMap<String, usize> {
        let projection = self.undirected_with_missing();
        self.entities()
            .iter()
            .map(|e| {
                let degree = projection.nodes.get(&e.id).map_or(0, |&idx| projection.degree(idx));
                (e.id.clone(), degree)
            })
            .collect()
    }

    /// Normalized degree centrality: `degree / (n - 1)`.
    ///
    /// Isolated entities score 0.0 and an empty graph yields an empty map. A single-entity graph
    /// scores 1.0 only when that entity loops onto itself.
    pub fn degree_centrality(&self) -> HashMap<String, f64> {
        let n = self.entity_count();
        let degrees = self.degrees();
        if n <= 1 {
            return degrees
                .into_iter()
                .map(|(id, d)| (id, if d > 0 { 1.0 } else { 0.0 }))
                .collect();
        }
        let scale = 1.0 / (n - 1) as f64;
        degrees
            .into_iter()
            .map(|(id, d)| (id, d as f64 * scale))
            .collect()
    }

    /// Ids of entities without any (well-formed) relationship, in entity order
    pub fn isolated_entities(&self) -> Vec<&str> {
        let degrees = self.degrees();
        self.entities()
            .iter()
            .filter(|e| degrees.get(&e.id).copied().unwrap_or(0) == 0)
            .map(|e| e.id.as_str())
            .collect()
    }
}
