//! Note entity model and DTOs.

use doit_core::action_log::entity_types;
use doit_core::change_detector::{
    set_i32, set_i64, set_opt_i64, set_opt_text, FieldSpec, Tracked,
};
use doit_core::mutation::{HasStatus, JournaledEntity};
use doit_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// A row from the `todo_notes` table.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Note {
    pub id: DbId,
    pub status: i32,
    pub user_id: DbId,
    pub person_id: Option<DbId>,
    pub tag_id: DbId,
    pub content: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

static NOTE_FIELDS: &[FieldSpec<Note>] = &[
    FieldSpec {
        name: "Status",
        read: |n: &Note| n.status.into(),
        write: |n: &mut Note, v| set_i32(&mut n.status, v),
    },
    FieldSpec {
        name: "PersonId",
        read: |n: &Note| n.person_id.into(),
        write: |n: &mut Note, v| set_opt_i64(&mut n.person_id, v),
    },
    FieldSpec {
        name: "TagId",
        read: |n: &Note| n.tag_id.into(),
        write: |n: &mut Note, v| set_i64(&mut n.tag_id, v),
    },
    FieldSpec {
        name: "Content",
        read: |n: &Note| n.content.clone().into(),
        write: |n: &mut Note, v| set_opt_text(&mut n.content, v),
    },
];

impl Tracked for Note {
    fn tracked_fields() -> &'static [FieldSpec<Self>] {
        NOTE_FIELDS
    }
}

impl JournaledEntity for Note {
    const ENTITY_TYPE: &'static str = entity_types::NOTE;

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

impl HasStatus for Note {
    fn status(&self) -> i32 {
        self.status
    }

    fn set_status(&mut self, status: i32) {
        self.status = status;
    }
}

/// DTO for creating a new note.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateNote {
    pub tag_id: DbId,
    pub person_id: Option<DbId>,
    #[validate(length(max = 4000))]
    pub content: Option<String>,
}

impl CreateNote {
    pub fn into_entity(self, user_id: DbId) -> Note {
        Note {
            id: 0,
            status: 0,
            user_id,
            person_id: self.person_id,
            tag_id: self.tag_id,
            content: self.content,
            created_at: Timestamp::default(),
            updated_at: Timestamp::default(),
        }
    }
}

/// DTO for updating an existing note. All fields are optional.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateNote {
    pub tag_id: Option<DbId>,
    pub person_id: Option<DbId>,
    #[validate(length(max = 4000))]
    pub content: Option<String>,
    pub status: Option<i32>,
}

impl UpdateNote {
    pub fn apply_to(self, note: &mut Note) {
        if let Some(tag_id) = self.tag_id {
            note.tag_id = tag_id;
        }
        if let Some(person_id) = self.person_id {
            note.person_id = Some(person_id);
        }
        if let Some(content) = self.content {
            note.content = Some(content);
        }
        if let Some(status) = self.status {
            note.status = status;
        }
    }
}
