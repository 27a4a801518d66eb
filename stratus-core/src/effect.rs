//! Effect - Side effects as values
//!
//! An Effect describes one change to infrastructure. Effects are computed
//! by the differ and only performed when the Interpreter applies them.

use crate::resource::{Resource, ResourceId, State};

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Refresh the state of a data source
    Read { resource: Resource },
    Create(Resource),
    Update {
        id: ResourceId,
        from: State,
        to: Resource,
    },
    /// Delete then create, for changes to create-only attributes
    Replace {
        id: ResourceId,
        from: State,
        to: Resource,
    },
    Delete {
        id: ResourceId,
        identifier: String,
    },
}

impl Effect {
    pub fn resource_id(&self) -> &ResourceId {
        match self {
            Effect::Read { resource } | Effect::Create(resource) => &resource.id,
            Effect::Update { id, .. } | Effect::Replace { id, .. } | Effect::Delete { id, .. } => {
                id
            }
        }
    }

    /// Whether this Effect changes infrastructure
    pub fn is_mutating(&self) -> bool {
        !matches!(self, Effect::Read { .. })
    }
}
