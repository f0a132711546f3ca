use crate::error::{GraphError, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{HashMap, HashSet};

/// Attribute mapping of an entity, in source order.
pub type Attributes = IndexMap<String, String>;

/// Entity in a knowledge graph (person, object, concept, ...)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    /// Unique name within the graph
    pub id: String,

    /// Free-form type label (e.g. "产品", "背景")
    #[serde(rename = "type", default)]
    pub entity_type: String,

    /// Key/value facts about the entity
    #[serde(default, deserialize_with = "null_as_empty")]
    pub attributes: Attributes,
}

// `"attributes": null` shows up in model output; treat it as empty.
fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<Attributes, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Attributes>::deserialize(deserializer)?.unwrap_or_default())
}

impl Entity {
    pub fn new(id: impl Into<String>, entity_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            entity_type: entity_type.into(),
            attributes: Attributes::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Same entity with a different attribute set
    pub fn with_attributes(&self, attributes: Attributes) -> Self {
        Self {
            id: self.id.clone(),
            entity_type: self.entity_type.clone(),
            attributes,
        }
    }
}

/// Directed, labelled edge between two entities
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Relationship {
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub relation: String,
}

impl Relationship {
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        relation: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            relation: relation.into(),
        }
    }

    pub fn is_self_loop(&self) -> bool {
        self.source == self.target
    }
}

/// Wire shape of a graph document; validated into [`KnowledgeGraph`].
#[derive(Debug, Deserialize)]
struct GraphDocument {
    #[serde(default)]
    entities: Vec<Entity>,
    #[serde(default)]
    relationships: Vec<Relationship>,
}

impl TryFrom<GraphDocument> for KnowledgeGraph {
    type Error = GraphError;

    fn try_from(doc: GraphDocument) -> Result<Self> {
        Self::from_parts(doc.entities, doc.relationships)
    }
}

/// Knowledge graph: entities plus a directed relationship list.
///
/// Entity ids are unique. Relationships may temporarily point at missing entities (extractor
/// output often does); [`KnowledgeGraph::drop_dangling_relationships`] restores the invariant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "GraphDocument")]
pub struct KnowledgeGraph {
    entities: Vec<Entity>,
    relationships: Vec<Relationship>,

    /// Entity id -> position in `entities`
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl KnowledgeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from raw parts. Duplicate entity ids are rejected; dangling relationships
    /// are kept as-is.
    pub fn from_parts(entities: Vec<Entity>, relationships: Vec<Relationship>) -> Result<Self> {
        let mut graph = Self::new();
        for entity in entities {
            graph.add_entity(entity)?;
        }
        graph.relationships = relationships;
        Ok(graph)
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn relationships(&self) -> &[Relationship] {
        &self.relationships
    }

    pub fn entity(&self, id: &str) -> Option<&Entity> {
        self.index.get(id).map(|&pos| &self.entities[pos])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn relationship_count(&self) -> usize {
        self.relationships.len()
    }

    /// Total number of attribute entries across all entities
    pub fn attribute_count(&self) -> usize {
        self.entities.iter().map(|e| e.attributes.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty() && self.relationships.is_empty()
    }

    /// Add entity to graph
    pub fn add_entity(&mut self, entity: Entity) -> Result<()> {
        if self.index.contains_key(&entity.id) {
            return Err(GraphError::DuplicateEntity(entity.id));
        }
        self.index.insert(entity.id.clone(), self.entities.len());
        self.entities.push(entity);
        Ok(())
    }

    /// Remove entity and every relationship touching it
    pub fn remove_entity(&mut self, id: &str) -> Option<Entity> {
        let pos = self.index.remove(id)?;
        let entity = self.entities.remove(pos);
        self.relationships
            .retain(|r| r.source != entity.id && r.target != entity.id);
        self.reindex();
        Some(entity)
    }

    /// Add edge between existing entities
    pub fn add_relationship(&mut self, relationship: Relationship) -> Result<()> {
        for endpoint in [&relationship.source, &relationship.target] {
            if !self.contains(endpoint) {
                return Err(GraphError::EntityNotFound(endpoint.clone()));
            }
        }
        self.relationships.push(relationship);
        Ok(())
    }

    /// Remove the first relationship equal to `relationship`
    pub fn remove_relationship(&mut self, relationship: &Relationship) -> bool {
        match self.relationships.iter().position(|r| r == relationship) {
            Some(pos) => {
                self.relationships.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Keep only entities matching `keep`, then drop relationships left dangling.
    /// Returns the number of removed entities.
    pub fn retain_entities<F>(&mut self, keep: F) -> usize
    where
        F: FnMut(&Entity) -> bool,
    {
        let removed = self.remove_entities_except(keep);
        self.drop_dangling_relationships();
        removed
    }

    /// Remove entities not matching `keep` along with the relationships touching them.
    /// Relationships to ids that were never entities are left alone.
    pub fn remove_entities_except<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(&Entity) -> bool,
    {
        let mut removed_ids = HashSet::new();
        self.entities.retain(|e| {
            let kept = keep(e);
            if !kept {
                removed_ids.insert(e.id.clone());
            }
            kept
        });
        if removed_ids.is_empty() {
            return 0;
        }
        self.reindex();
        self.relationships.retain(|r| {
            !removed_ids.contains(&r.source) && !removed_ids.contains(&r.target)
        });
        removed_ids.len()
    }

    /// Replace the entity list, keeping relationships. Ids must stay unique.
    pub fn with_entities(&self, entities: Vec<Entity>) -> Result<Self> {
        Self::from_parts(entities, self.relationships.clone())
    }

    /// Relationships whose source or target is not an entity of this graph
    pub fn dangling_relationships(&self) -> impl Iterator<Item = &Relationship> {
        self.relationships
            .iter()
            .filter(|r| !self.contains(&r.source) || !self.contains(&r.target))
    }

    pub fn is_well_formed(&self) -> bool {
        self.dangling_relationships().next().is_none()
    }

    /// Drop relationships with a missing endpoint. Returns how many were dropped.
    pub fn drop_dangling_relationships(&mut self) -> usize {
        let before = self.relationships.len();
        let index = &self.index;
        self.relationships
            .retain(|r| index.contains_key(&r.source) && index.contains_key(&r.target));
        let dropped = before - self.relationships.len();
        if dropped > 0 {
            log::debug!("Dropped {} dangling relationships", dropped);
        }
        dropped
    }

    fn reindex(&mut self) {
        self.index = self
            .entities
            .iter()
            .enumerate()
            .map(|(pos, e)| (e.id.clone(), pos))
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> KnowledgeGraph {
        let mut graph = KnowledgeGraph::new();
        graph
            .add_entity(Entity::new("robot", "product").with_attribute("color", "white"))
            .unwrap();
        graph.add_entity(Entity::new("expo", "venue")).unwrap();
        graph.add_entity(Entity::new("lidar", "component")).unwrap();
        graph
            .add_relationship(Relationship::new("robot", "expo", "shown at"))
            .unwrap();
        graph
            .add_relationship(Relationship::new("robot", "lidar", "carries"))
            .unwrap();
        graph
    }

    #[test]
    fn duplicate_entity_is_rejected() {
        let mut graph = sample();
        let err = graph.add_entity(Entity::new("robot", "other")).unwrap_err();
        assert!(matches!(err, GraphError::DuplicateEntity(id) if id == "robot"));
    }

    #[test]
    fn relationship_requires_endpoints() {
        let mut graph = sample();
        let err = graph
            .add_relationship(Relationship::new("robot", "ghost", "haunts"))
            .unwrap_err();
        assert!(matches!(err, GraphError::EntityNotFound(id) if id == "ghost"));
    }

    #[test]
    fn removing_entity_removes_incident_edges() {
        let mut graph = sample();
        let removed = graph.remove_entity("expo").unwrap();
        assert_eq!(removed.entity_type, "venue");
        assert_eq!(graph.relationship_count(), 1);
        assert!(graph.is_well_formed());
        assert_eq!(graph.entity("lidar").map(|e| e.id.as_str()), Some("lidar"));
    }

    #[test]
    fn remove_relationship_only_first_match() {
        let mut graph = sample();
        let edge = Relationship::new("robot", "expo", "shown at");
        graph.add_relationship(edge.clone()).unwrap();
        assert!(graph.remove_relationship(&edge));
        assert_eq!(graph.relationship_count(), 2);
        assert!(graph.remove_relationship(&edge));
        assert!(!graph.remove_relationship(&edge));
    }

    #[test]
    fn json_round_trip_keeps_dangling_until_dropped() {
        let raw = r#"{
            "entities": [
                {"id": "robot", "type": "product", "attributes": {"b": "2", "a": "1"}},
                {"id": "expo", "type": "venue"}
            ],
            "relationships": [
                {"source": "robot", "target": "expo", "relation": "shown at"},
                {"source": "robot", "target": "LiDAR", "relation": "carries"}
            ]
        }"#;
        let mut graph: KnowledgeGraph = serde_json::from_str(raw).unwrap();
        assert_eq!(graph.entity_count(), 2);
        assert!(!graph.is_well_formed());
        assert_eq!(graph.drop_dangling_relationships(), 1);
        assert!(graph.is_well_formed());

        let keys: Vec<&str> = graph
            .entity("robot")
            .unwrap()
            .attributes
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(keys, vec!["b", "a"]);
    }

    #[test]
    fn duplicate_ids_in_json_fail_to_parse() {
        let raw = r#"{"entities": [{"id": "a", "type": "x"}, {"id": "a", "type": "y"}]}"#;
        assert!(serde_json::from_str::<KnowledgeGraph>(raw).is_err());
    }

    #[test]
    fn retain_entities_reports_removed_and_cleans_edges() {
        let mut graph = sample();
        let removed = graph.retain_entities(|e| e.id != "lidar");
        assert_eq!(removed, 1);
        assert_eq!(graph.relationships().len(), 1);
        assert!(graph.contains("expo"));
        assert!(!graph.contains("lidar"));
    }

    #[test]
    fn removing_entities_keeps_edges_to_unknown_ids() {
        let mut graph = KnowledgeGraph::from_parts(
            vec![Entity::new("robot", "产品"), Entity::new("expo", "场合")],
            vec![
                Relationship::new("robot", "sensor", "carries"),
                Relationship::new("robot", "expo", "shown at"),
            ],
        )
        .unwrap();

        assert_eq!(graph.remove_entities_except(|e| e.id != "expo"), 1);
        assert_eq!(
            graph.relationships().to_vec(),
            vec![Relationship::new("robot", "sensor", "carries")]
        );
        assert_eq!(graph.remove_entities_except(|_| true), 0);
    }

    #[test]
    fn null_attributes_read_as_empty() {
        let raw = r#"{"entities": [{"id": "x", "type": "t", "attributes": null}, {"id": "y"}]}"#;
        let graph = KnowledgeGraph::from_json_str(raw).unwrap();
        assert!(graph.entities().iter().all(|e| e.attributes.is_empty()));
        assert_eq!(graph.attribute_count(), 0);
    }
}
