// Tauri commands exposed to the frontend, plus the events pushed back to it

use crate::models::{GeneratedString, GenerationState, StringListItem};
use crate::state::AppState;
use crate::view_model::{ConfirmPrompt, DELETE_ALL_PROMPT, DELETE_ONE_PROMPT};
use tauri::{AppHandle, Emitter, State};
use tauri_plugin_dialog::{DialogExt, MessageDialogButtons, MessageDialogKind};
use tokio::sync::oneshot;

pub const GENERATION_STATE_EVENT: &str = "generation_state_changed";
pub const STRINGS_EVENT: &str = "strings_changed";

fn list_items(strings: &[GeneratedString]) -> Vec<StringListItem> {
    strings.iter().map(StringListItem::from).collect()
}

// Tauri command to request a new string. Returns the state right after the request
// started (Loading, or Error for a bad length); the outcome arrives as an event.
#[tauri::command]
pub async fn generate_string(state: State<'_, AppState>, length: i32) -> Result<GenerationState, String> {
    log::info!("Frontend requested a random string of length {}", length);
    state.view_model.generate(length);
    Ok(state.view_model.state())
}

#[tauri::command]
pub async fn generation_state(state: State<'_, AppState>) -> Result<GenerationState, String> {
    Ok(state.view_model.state())
}

#[tauri::command]
pub async fn reset_generation_state(state: State<'_, AppState>) -> Result<(), String> {
    log::debug!("Frontend reset the generation state");
    state.view_model.reset_generation_state();
    Ok(())
}

#[tauri::command]
pub async fn list_strings(state: State<'_, AppState>) -> Result<Vec<StringListItem>, String> {
    log::info!("Frontend requested to list generated strings");
    Ok(list_items(&state.view_model.strings()))
}

// Shows a native Delete/Cancel dialog; resolves to false if the user cancels
async fn confirm(app_handle: &AppHandle, prompt: ConfirmPrompt) -> bool {
    let (tx, rx) = oneshot::channel();
    app_handle
        .dialog()
        .message(prompt.message)
        .title(prompt.title)
        .kind(MessageDialogKind::Warning)
        .buttons(MessageDialogButtons::OkCancelCustom("Delete".to_string(), "Cancel".to_string()))
        .show(move |confirmed| {
            let _ = tx.send(confirmed);
        });
    rx.await.unwrap_or(false)
}

// Both deletes ask the user first and return 0 if they cancel
#[tauri::command]
pub async fn delete_string(
    app_handle: AppHandle,
    state: State<'_, AppState>,
    record: GeneratedString,
) -> Result<u64, String> {
    log::warn!("[CMD] Frontend requested to delete generated string: {:?}", record.id);

    if !confirm(&app_handle, DELETE_ONE_PROMPT).await {
        log::info!("[CMD] Delete of {:?} cancelled by user", record.id);
        return Ok(0);
    }

    state.view_model.delete_string(&record).await.map_err(|e| {
        log::error!("[CMD] Failed to delete generated string {:?}: {:?}", record.id, e);
        format!("Failed to delete string: {}", e)
    })
}

#[tauri::command]
pub async fn delete_all_strings(app_handle: AppHandle, state: State<'_, AppState>) -> Result<u64, String> {
    log::warn!("[CMD] Frontend requested to delete all generated strings");

    if !confirm(&app_handle, DELETE_ALL_PROMPT).await {
        log::info!("[CMD] Delete all cancelled by user");
        return Ok(0);
    }

    state.view_model.delete_all_strings().await.map_err(|e| {
        log::error!("[CMD] Failed to delete all generated strings: {:?}", e);
        format!("Failed to delete strings: {}", e)
    })
}

/// Pushes generation state changes and list snapshots to the frontend as events.
pub fn forward_events(app_handle: &AppHandle, state: &AppState) {
    let mut generation = state.view_model.subscribe_state();
    let handle = app_handle.clone();
    tauri::async_runtime::spawn(async move {
        while generation.changed().await.is_ok() {
            let current = generation.borrow_and_update().clone();
            if let Err(e) = handle.emit(GENERATION_STATE_EVENT, current) {
                log::error!("Failed to emit generation state event: {:?}", e);
            }
        }
    });

    let mut strings = state.view_model.subscribe_strings();
    let handle = app_handle.clone();
    tauri::async_runtime::spawn(async move {
        while strings.changed().await.is_ok() {
            let items = list_items(&strings.borrow_and_update());
            if let Err(e) = handle.emit(STRINGS_EVENT, items) {
                log::error!("Failed to emit strings event: {:?}", e);
            }
        }
    });
}
