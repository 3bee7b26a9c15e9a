//! Person (contact) entity model and DTOs.

use doit_core::action_log::entity_types;
use doit_core::change_detector::{set_i32, set_opt_text, set_text, FieldSpec, Tracked};
use doit_core::error::CoreError;
use doit_core::mutation::{HasStatus, JournaledEntity};
use doit_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// A row from the `todo_persons` table.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Person {
    pub id: DbId,
    pub status: i32,
    pub email: Option<String>,
    pub family_name: String,
    pub given_name: Option<String>,
    /// The user whose contact list this person belongs to.
    pub owning_user_id: DbId,
    /// Set when this person is the contact record of a login.
    pub user_id: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

static PERSON_FIELDS: &[FieldSpec<Person>] = &[
    FieldSpec {
        name: "Status",
        read: |p: &Person| p.status.into(),
        write: |p: &mut Person, v| set_i32(&mut p.status, v),
    },
    FieldSpec {
        name: "Email",
        read: |p: &Person| p.email.clone().into(),
        write: |p: &mut Person, v| set_opt_text(&mut p.email, v),
    },
    FieldSpec {
        name: "FamilyName",
        read: |p: &Person| p.family_name.as_str().into(),
        write: |p: &mut Person, v| set_text(&mut p.family_name, v),
    },
    FieldSpec {
        name: "GivenName",
        read: |p: &Person| p.given_name.clone().into(),
        write: |p: &mut Person, v| set_opt_text(&mut p.given_name, v),
    },
];

impl Tracked for Person {
    fn tracked_fields() -> &'static [FieldSpec<Self>] {
        PERSON_FIELDS
    }
}

impl JournaledEntity for Person {
    const ENTITY_TYPE: &'static str = entity_types::PERSON;

    fn id(&self) -> DbId {
        self.id
    }

    fn set_id(&mut self, id: DbId) {
        self.id = id;
    }

    fn owner_id(&self) -> Option<DbId> {
        Some(self.owning_user_id)
    }

    fn check_delete(&self) -> Result<(), CoreError> {
        if self.user_id.is_some() {
            return Err(CoreError::Forbidden(
                "Cannot delete a person linked to a user account".into(),
            ));
        }
        Ok(())
    }
}

impl HasStatus for Person {
    fn status(&self) -> i32 {
        self.status
    }

    fn set_status(&mut self, status: i32) {
        self.status = status;
    }
}

/// DTO for creating a new person.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreatePerson {
    #[validate(length(min = 1, max = 160))]
    pub family_name: String,
    #[validate(length(max = 160))]
    pub given_name: Option<String>,
    #[validate(email, length(max = 160))]
    pub email: Option<String>,
    pub status: Option<i32>,
}

impl CreatePerson {
    pub fn into_entity(self, owning_user_id: DbId) -> Person {
        Person {
            id: 0,
            status: self.status.unwrap_or(0),
            email: self.email,
            family_name: self.family_name,
            given_name: self.given_name,
            owning_user_id,
            user_id: None,
            created_at: Timestamp::default(),
            updated_at: Timestamp::default(),
        }
    }
}

/// DTO for updating an existing person. All fields are optional.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdatePerson {
    #[validate(length(min = 1, max = 160))]
    pub family_name: Option<String>,
    #[validate(length(max = 160))]
    pub given_name: Option<String>,
    #[validate(email, length(max = 160))]
    pub email: Option<String>,
    pub status: Option<i32>,
}

impl UpdatePerson {
    pub fn apply_to(self, person: &mut Person) {
        if let Some(family_name) = self.family_name {
            person.family_name = family_name;
        }
        if let Some(given_name) = self.given_name {
            person.given_name = Some(given_name);
        }
        if let Some(email) = self.email {
            person.email = Some(email);
        }
        if let Some(status) = self.status {
            person.status = status;
        }
    }
}
