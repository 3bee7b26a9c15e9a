//! Todo item entity model and DTOs.

use chrono::NaiveDate;
use doit_core::action_log::entity_types;
use doit_core::change_detector::{
    set_i32, set_i64, set_opt_date, set_opt_text, set_text, FieldSpec, Tracked,
};
use doit_core::mutation::{HasStatus, JournaledEntity};
use doit_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// A row from the `todo_items` table.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct TodoItem {
    pub id: DbId,
    pub user_id: DbId,
    /// 0 = active, anything else = completed.
    pub status: i32,
    pub due: Option<NaiveDate>,
    pub caption: String,
    pub content: Option<String>,
    pub author_id: DbId,
    pub contact_id: DbId,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// How pressing a todo item's due date is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DueState {
    /// Completed, undated, or due later.
    Relaxed,
    DueToday,
    Overdue,
}

impl TodoItem {
    pub fn due_state(&self, today: NaiveDate) -> DueState {
        match self.due {
            Some(due) if self.status == 0 => match due.cmp(&today) {
                std::cmp::Ordering::Less => DueState::Overdue,
                std::cmp::Ordering::Equal => DueState::DueToday,
                std::cmp::Ordering::Greater => DueState::Relaxed,
            },
            _ => DueState::Relaxed,
        }
    }
}

static TODO_ITEM_FIELDS: &[FieldSpec<TodoItem>] = &[
    FieldSpec {
        name: "Caption",
        read: |t: &TodoItem| t.caption.as_str().into(),
        write: |t: &mut TodoItem, v| set_text(&mut t.caption, v),
    },
    FieldSpec {
        name: "Content",
        read: |t: &TodoItem| t.content.clone().into(),
        write: |t: &mut TodoItem, v| set_opt_text(&mut t.content, v),
    },
    FieldSpec {
        name: "Due",
        read: |t: &TodoItem| t.due.into(),
        write: |t: &mut TodoItem, v| set_opt_date(&mut t.due, v),
    },
    FieldSpec {
        name: "Status",
        read: |t: &TodoItem| t.status.into(),
        write: |t: &mut TodoItem, v| set_i32(&mut t.status, v),
    },
    FieldSpec {
        name: "ContactId",
        read: |t: &TodoItem| t.contact_id.into(),
        write: |t: &mut TodoItem, v| set_i64(&mut t.contact_id, v),
    },
    FieldSpec {
        name: "AuthorId",
        read: |t: &TodoItem| t.author_id.into(),
        write: |t: &mut TodoItem, v| set_i64(&mut t.author_id, v),
    },
];

impl Tracked for TodoItem {
    fn tracked_fields() -> &'static [FieldSpec<Self>] {
        TODO_ITEM_FIELDS
    }
}

impl JournaledEntity for TodoItem {
    const ENTITY_TYPE: &'static str = entity_types::TODO_ITEM;

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

impl HasStatus for TodoItem {
    fn status(&self) -> i32 {
        self.status
    }

    fn set_status(&mut self, status: i32) {
        self.status = status;
    }
}

/// DTO for creating a new todo item.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateTodoItem {
    #[validate(length(min = 1, max = 160))]
    pub caption: String,
    #[validate(length(max = 2030))]
    pub content: Option<String>,
    pub due: Option<NaiveDate>,
    /// Defaults to 0 (active) if omitted.
    pub status: Option<i32>,
    pub author_id: DbId,
    pub contact_id: DbId,
}

impl CreateTodoItem {
    /// Build an unsaved entity; the repository assigns id and timestamps.
    pub fn into_entity(self, user_id: DbId) -> TodoItem {
        TodoItem {
            id: 0,
            user_id,
            status: self.status.unwrap_or(0),
            due: self.due,
            caption: self.caption,
            content: self.content,
            author_id: self.author_id,
            contact_id: self.contact_id,
            created_at: Timestamp::default(),
            updated_at: Timestamp::default(),
        }
    }
}

/// DTO for updating an existing todo item. All fields are optional.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateTodoItem {
    #[validate(length(min = 1, max = 160))]
    pub caption: Option<String>,
    #[validate(length(max = 2030))]
    pub content: Option<String>,
    pub due: Option<NaiveDate>,
    pub status: Option<i32>,
    pub author_id: Option<DbId>,
    pub contact_id: Option<DbId>,
}

impl UpdateTodoItem {
    pub fn apply_to(self, item: &mut TodoItem) {
        if let Some(caption) = self.caption {
            item.caption = caption;
        }
        if let Some(content) = self.content {
            item.content = Some(content);
        }
        if let Some(due) = self.due {
            item.due = Some(due);
        }
        if let Some(status) = self.status {
            item.status = status;
        }
        if let Some(author_id) = self.author_id {
            item.author_id = author_id;
        }
        if let Some(contact_id) = self.contact_id {
            item.contact_id = contact_id;
        }
    }
}
