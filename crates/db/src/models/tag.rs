//! Tag entity model and DTOs.

use doit_core::action_log::entity_types;
use doit_core::change_detector::{set_i32, set_text, FieldSpec, Tracked};
use doit_core::mutation::{HasStatus, JournaledEntity};
use doit_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// A row from the `todo_tags` table.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Tag {
    pub id: DbId,
    pub status: i32,
    pub user_id: DbId,
    pub tag_name: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

static TAG_FIELDS: &[FieldSpec<Tag>] = &[
    FieldSpec {
        name: "Status",
        read: |t: &Tag| t.status.into(),
        write: |t: &mut Tag, v| set_i32(&mut t.status, v),
    },
    FieldSpec {
        name: "TagName",
        read: |t: &Tag| t.tag_name.as_str().into(),
        write: |t: &mut Tag, v| set_text(&mut t.tag_name, v),
    },
];

impl Tracked for Tag {
    fn tracked_fields() -> &'static [FieldSpec<Self>] {
        TAG_FIELDS
    }
}

impl JournaledEntity for Tag {
    const ENTITY_TYPE: &'static str = entity_types::TAG;

    fn id(&self) -> DbId {
        self.id
    }

    fn set_id(&mut self, id: DbId) {
        self.id = id;
    }

    fn owner_id(&self) -> Option<DbId> {
        Some(self.user_id)
    }
}

impl HasStatus for Tag {
    fn status(&self) -> i32 {
        self.status
    }

    fn set_status(&mut self, status: i32) {
        self.status = status;
    }
}

/// DTO for creating a new tag.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateTag {
    #[validate(length(min = 1, max = 160))]
    pub tag_name: String,
}

impl CreateTag {
    pub fn into_entity(self, user_id: DbId) -> Tag {
        Tag {
            id: 0,
            status: 0,
            user_id,
            tag_name: self.tag_name,
            created_at: Timestamp::default(),
            updated_at: Timestamp::default(),
        }
    }
}
