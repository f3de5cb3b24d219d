// Declare the modules
pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod state;
pub mod storage;
pub mod view_model;

#[cfg(feature = "desktop")]
pub mod commands;

pub use error::GenerateError;
pub use models::{GeneratedString, GenerationState};
pub use repository::RandomStringRepository;
pub use state::AppState;
pub use view_model::GeneratorViewModel;

/// Initializes `env_logger` with an `info` default, overridable through `RUST_LOG`.
/// Safe to call more than once.
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).try_init();
}

#[cfg(feature = "desktop")]
#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    use config::AppConfig;
    use tauri::Manager;

    init_logging();

    tauri::Builder::default()
        .setup(|app| {
            let app_handle = app.handle().clone();
            let config = AppConfig::from_env();
            let db_path = app_handle
                .path()
                .resolve(&config.database_file, tauri::path::BaseDirectory::AppLocalData)?;

            // Setup is synchronous; block once while storage opens and the view model spawns its tasks
            let app_state = tauri::async_runtime::block_on(async {
                let app_state = AppState::initialize(config, &db_path).await?;
                commands::forward_events(&app_handle, &app_state);
                Ok::<_, anyhow::Error>(app_state)
            })?;

            app.manage(app_state);
            Ok(())
        })
        .plugin(tauri_plugin_dialog::init())
        .invoke_handler(tauri::generate_handler![
            commands::generate_string,
            commands::generation_state,
            commands::reset_generation_state,
            commands::list_strings,
            commands::delete_string,
            commands::delete_all_strings
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
