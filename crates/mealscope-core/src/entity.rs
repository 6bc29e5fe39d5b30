//! Scoreable entities and the taxonomy they belong to.
//!
//! Every scored subject — a dish type, a cuisine, a service zone, or a
//! partner — is an [`Entity`] with a stable string id and exactly one
//! [`EntityKind`]. Dish types roll up to cuisines via `parent`. Entities are
//! created once at pipeline start from a taxonomy reference and never change
//! during a run.

use serde::{Deserialize, Serialize};

/// Taxonomy level of a scoreable entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// A menu dish type (e.g. "family_biryani_tray").
    DishType,
    /// A cuisine grouping of dish types.
    Cuisine,
    /// A geographic service zone.
    Zone,
    /// A restaurant partner.
    Partner,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DishType => write!(f, "dish_type"),
            Self::Cuisine => write!(f, "cuisine"),
            Self::Zone => write!(f, "zone"),
            Self::Partner => write!(f, "partner"),
        }
    }
}

/// Parse a taxonomy label into `EntityKind`.
pub fn parse_entity_kind(kind: &str) -> Option<EntityKind> {
    match kind.trim().to_lowercase().as_str() {
        "dish_type" | "dish" => Some(EntityKind::DishType),
        "cuisine" => Some(EntityKind::Cuisine),
        "zone" => Some(EntityKind::Zone),
        "partner" => Some(EntityKind::Partner),
        _ => None,
    }
}

/// A scoreable subject, immutable during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    /// Stable identifier (e.g. `"dish:family_biryani_tray"`).
    pub id: String,
    /// Taxonomy level.
    pub kind: EntityKind,
    /// Roll-up parent id (dish type → cuisine). `None` at the top level.
    pub parent: Option<String>,
}

impl Entity {
    pub fn new(id: impl Into<String>, kind: EntityKind) -> Self {
        Self {
            id: id.into(),
            kind,
            parent: None,
        }
    }

    pub fn with_parent(id: impl Into<String>, kind: EntityKind, parent: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            parent: Some(parent.into()),
        }
    }
}

/// Filter a taxonomy slice down to one kind, preserving order.
pub fn entities_of_kind(entities: &[Entity], kind: EntityKind) -> Vec<&Entity> {
    entities.iter().filter(|e| e.kind == kind).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_labels_round_trip() {
        for kind in [
            EntityKind::DishType,
            EntityKind::Cuisine,
            EntityKind::Zone,
            EntityKind::Partner,
        ] {
            assert_eq!(parse_entity_kind(&kind.to_string()), Some(kind));
        }
        assert_eq!(parse_entity_kind("warehouse"), None);
    }

    #[test]
    fn filter_by_kind() {
        let entities = vec![
            Entity::with_parent("dish:paella", EntityKind::DishType, "cuisine:spanish"),
            Entity::new("cuisine:spanish", EntityKind::Cuisine),
            Entity::new("zone:north", EntityKind::Zone),
        ];
        let dishes = entities_of_kind(&entities, EntityKind::DishType);
        assert_eq!(dishes.len(), 1);
        assert_eq!(dishes[0].parent.as_deref(), Some("cuisine:spanish"));
    }
}
