//! Dependency (todo item relation) entity model and DTOs.

use doit_core::action_log::entity_types;
use doit_core::change_detector::{set_i32, FieldSpec, Tracked};
use doit_core::mutation::JournaledEntity;
use doit_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// A row from the `todo_deps` table: `demanding_id` needs `required_id`.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Dependency {
    pub id: DbId,
    pub relation: i32,
    pub demanding_id: DbId,
    pub required_id: DbId,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

static DEPENDENCY_FIELDS: &[FieldSpec<Dependency>] = &[FieldSpec {
    name: "Relation",
    read: |d: &Dependency| d.relation.into(),
    write: |d: &mut Dependency, v| set_i32(&mut d.relation, v),
}];

impl Tracked for Dependency {
    fn tracked_fields() -> &'static [FieldSpec<Self>] {
        DEPENDENCY_FIELDS
    }
}

impl JournaledEntity for Dependency {
    const ENTITY_TYPE: &'static str = entity_types::DEPENDENCY;

    fn id(&self) -> DbId {
        self.id
    }

    fn set_id(&mut self, id: DbId) {
        self.id = id;
    }

    /// Dependencies are owned through their todo items.
    fn owner_id(&self) -> Option<DbId> {
        None
    }
}

/// DTO for creating a new dependency.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateDependency {
    #[validate(range(min = 0))]
    pub relation: i32,
    pub demanding_id: DbId,
    pub required_id: DbId,
}

impl CreateDependency {
    pub fn into_entity(self) -> Dependency {
        Dependency {
            id: 0,
            relation: self.relation,
            demanding_id: self.demanding_id,
            required_id: self.required_id,
            created_at: Timestamp::default(),
            updated_at: Timestamp::default(),
        }
    }
}
