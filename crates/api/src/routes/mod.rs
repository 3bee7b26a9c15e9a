pub mod dependencies;
pub mod health;
pub mod history;
pub mod notes;
pub mod persons;
pub mod tags;
pub mod todo_items;
pub mod user_config;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /todo-items                                      list, create
/// /todo-items/{id}                                 get, update, delete
/// /todo-items/{id}/toggle-status                   flip active/completed (POST)
/// /todo-items/{id}/dependencies                    list (GET)
///
/// /persons                                         list, create
/// /persons/{id}                                    get, update, delete
/// /persons/{id}/toggle-status                      flip active/completed (POST)
///
/// /tags                                            list, create
/// /tags/{id}                                       delete
/// /tags/{id}/toggle-status                         flip active/completed (POST)
///
/// /notes                                           list, create
/// /notes/{id}                                      update, delete
/// /notes/{id}/toggle-status                        flip active/completed (POST)
///
/// /dependencies                                    create
/// /dependencies/{id}                               delete
///
/// /history/{entity_type}/{entity_id}               history (GET)
/// /history/{entity_type}/{entity_id}/state         undo/redo state (GET)
/// /history/{entity_type}/{entity_id}/undo          undo (POST)
/// /history/{entity_type}/{entity_id}/redo          redo (POST), clear redo (DELETE)
/// /history/compact                                 compact caller's history (POST)
///
/// /config                                          caller's settings (GET, PUT)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/todo-items", todo_items::router())
        .nest("/persons", persons::router())
        .nest("/tags", tags::router())
        .nest("/notes", notes::router())
        .nest("/dependencies", dependencies::router())
        .nest("/history", history::router())
        .nest("/config", user_config::router())
}
