mod auth;
mod blob;
mod cache;
mod commands;
mod excel;
mod extractor;
mod tables;
mod types;

use commands::AppState;
use std::sync::Mutex;
use tauri::Manager;

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    tauri::Builder::default()
        .plugin(tauri_plugin_dialog::init())
        .plugin(tauri_plugin_opener::init())
        .setup(|app| {
            let app_data_dir = app.path().app_data_dir().map_err(|e| e.to_string())?;
            // Load .env from app data dir so production users can place credentials there (Settings → Open app data folder)
            let env_path = app_data_dir.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
            }
            app.manage(AppState {
                authenticated: Mutex::new(false),
            });
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            commands::check_password,
            commands::get_service_status,
            commands::get_app_version,
            commands::get_app_data_path,
            commands::open_app_data_folder,
            commands::validate_receipt_image,
            commands::process_receipt,
            commands::save_summary_excel,
            commands::save_items_excel,
            commands::upload_summary_blob,
            commands::upload_items_blob,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
