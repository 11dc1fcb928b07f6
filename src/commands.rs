use crate::auth;
use crate::blob;
use crate::excel;
use crate::extractor;
use crate::tables;
use crate::types::{ReceiptItem, ReceiptReport, SummaryRow};
use serde::Serialize;
use std::fs;
use std::path::Path;
use std::sync::Mutex;
use tauri::{AppHandle, Manager, State};

#[derive(Serialize)]
pub struct ValidationResult {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Which credentials are present, without exposing their values.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceStatus {
    pub llm: String,
    pub password: String,
    pub blob: String,
}

pub struct AppState {
    pub authenticated: Mutex<bool>,
}

/// Everything after the password gate requires an authenticated session.
fn require_auth(state: &State<'_, AppState>) -> Result<(), String> {
    let authed = state.authenticated.lock().map_err(|e| e.to_string())?;
    if *authed {
        Ok(())
    } else {
        Err("Not authenticated.".to_string())
    }
}

#[tauri::command]
pub fn check_password(state: State<'_, AppState>, input: String) -> Result<bool, String> {
    let ok = auth::password_matches(&input);
    let mut authed = state.authenticated.lock().map_err(|e| e.to_string())?;
    *authed = ok;
    Ok(ok)
}

fn presence(var: &str) -> String {
    match std::env::var(var) {
        Ok(v) if !v.trim().is_empty() => "configured".to_string(),
        _ => "not_configured".to_string(),
    }
}

#[tauri::command]
pub fn get_service_status() -> ServiceStatus {
    let _ = dotenvy::dotenv();
    ServiceStatus {
        llm: presence("GROQ_API_KEY"),
        password: presence("APP_PASSWORD"),
        blob: presence("BLOB_SAS_TOKEN"),
    }
}

#[tauri::command]
pub fn get_app_version(app: AppHandle) -> String {
    app.package_info().version.to_string()
}

#[tauri::command]
pub fn get_app_data_path(app: AppHandle) -> Result<String, String> {
    let path = app.path().app_data_dir().map_err(|e| e.to_string())?;
    path.to_str()
        .map(String::from)
        .ok_or_else(|| "Invalid path".to_string())
}

#[tauri::command]
pub fn open_app_data_folder(app: AppHandle) -> Result<(), String> {
    let path = app.path().app_data_dir().map_err(|e| e.to_string())?;
    opener::open(&path).map_err(|e| e.to_string())
}

const MAX_IMAGE_BYTES: u64 = 20 * 1024 * 1024;

/// Pre-flight check for an uploaded photo: must exist, stay under the size
/// cap, and carry a JPEG or PNG signature.
#[tauri::command]
pub fn validate_receipt_image(path: String) -> Result<ValidationResult, String> {
    let path = Path::new(&path);
    if !path.exists() {
        return Ok(ValidationResult {
            valid: false,
            error: Some("File not found.".to_string()),
        });
    }
    let metadata = fs::metadata(path).map_err(|e| e.to_string())?;
    if metadata.len() > MAX_IMAGE_BYTES {
        return Ok(ValidationResult {
            valid: false,
            error: Some("File too large (max 20MB).".to_string()),
        });
    }
    let mut f = fs::File::open(path).map_err(|e| format!("Could not open: {}", e))?;
    let mut header = [0u8; 8];
    use std::io::Read;
    if f.read(&mut header).unwrap_or(0) < 4 {
        return Ok(ValidationResult {
            valid: false,
            error: Some("Not a valid image (could not read header).".to_string()),
        });
    }
    let is_jpeg = header.starts_with(&[0xFF, 0xD8, 0xFF]);
    let is_png = header.starts_with(&[0x89, 0x50, 0x4E, 0x47]);
    if !is_jpeg && !is_png {
        return Ok(ValidationResult {
            valid: false,
            error: Some("Not a valid JPEG or PNG image.".to_string()),
        });
    }
    Ok(ValidationResult {
        valid: true,
        error: None,
    })
}

/// Run extraction on the uploaded photo and shape the result into the
/// summary, items, and category tables. Category aggregation failure is
/// downgraded to a warning instead of failing the whole report.
#[tauri::command]
pub async fn process_receipt(
    state: State<'_, AppState>,
    file_path: String,
    expected_items: u32,
    paid_by: String,
) -> Result<ReceiptReport, String> {
    require_auth(&state)?;
    let path = file_path.clone();
    tauri::async_runtime::spawn_blocking(move || {
        let result = extractor::extract_receipt(&path, expected_items)?;
        let summary = tables::build_summary(&result, &paid_by);
        let items = tables::build_items(&result)
            .map_err(|_| extractor::PROCESSING_FAILED_MSG.to_string())?;
        let (categories, category_warning) =
            match tables::aggregate_categories(&items, summary.discount) {
                Ok(rows) => (rows, None),
                Err(_) => (
                    Vec::new(),
                    Some("Product category breakdown failed.".to_string()),
                ),
            };
        Ok(ReceiptReport {
            summary,
            items,
            categories,
            category_warning,
        })
    })
    .await
    .map_err(|e| e.to_string())?
}

#[tauri::command]
pub async fn save_summary_excel(
    state: State<'_, AppState>,
    summary: SummaryRow,
) -> Result<String, String> {
    require_auth(&state)?;
    tauri::async_runtime::spawn_blocking(move || {
        let bytes = excel::summary_to_xlsx_bytes(&summary)?;
        excel::save_to_downloads("osszesito.xlsx", &bytes)
    })
    .await
    .map_err(|e| e.to_string())?
}

#[tauri::command]
pub async fn save_items_excel(
    state: State<'_, AppState>,
    items: Vec<ReceiptItem>,
) -> Result<String, String> {
    require_auth(&state)?;
    tauri::async_runtime::spawn_blocking(move || {
        let bytes = excel::items_to_xlsx_bytes(&items)?;
        excel::save_to_downloads("items.xlsx", &bytes)
    })
    .await
    .map_err(|e| e.to_string())?
}

#[tauri::command]
pub async fn upload_summary_blob(
    state: State<'_, AppState>,
    summary: SummaryRow,
) -> Result<String, String> {
    require_auth(&state)?;
    tauri::async_runtime::spawn_blocking(move || {
        let name = blob::blob_name("summary", &summary.company, &summary.date);
        let bytes = excel::summary_to_xlsx_bytes(&summary)?;
        blob::upload_block_blob(&name, bytes)
    })
    .await
    .map_err(|e| e.to_string())?
}

#[tauri::command]
pub async fn upload_items_blob(
    state: State<'_, AppState>,
    summary: SummaryRow,
    items: Vec<ReceiptItem>,
) -> Result<String, String> {
    require_auth(&state)?;
    tauri::async_runtime::spawn_blocking(move || {
        let name = blob::blob_name("items", &summary.company, &summary.date);
        let bytes = excel::items_to_xlsx_bytes(&items)?;
        blob::upload_block_blob(&name, bytes)
    })
    .await
    .map_err(|e| e.to_string())?
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_temp(name: &str, bytes: &[u8]) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(name);
        fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn accepts_jpeg_and_png_signatures() {
        let jpeg = write_temp("receipt_cmd_test.jpg", &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10]);
        let result = validate_receipt_image(jpeg.to_str().unwrap().to_string()).unwrap();
        assert!(result.valid);
        fs::remove_file(jpeg).unwrap();

        let png = write_temp(
            "receipt_cmd_test.png",
            &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A],
        );
        let result = validate_receipt_image(png.to_str().unwrap().to_string()).unwrap();
        assert!(result.valid);
        fs::remove_file(png).unwrap();
    }

    #[test]
    fn rejects_non_image_content() {
        let txt = write_temp("receipt_cmd_test.txt", b"just some text, no image here");
        let result = validate_receipt_image(txt.to_str().unwrap().to_string()).unwrap();
        assert!(!result.valid);
        assert!(result.error.unwrap().contains("JPEG or PNG"));
        fs::remove_file(txt).unwrap();
    }

    #[test]
    fn rejects_missing_file() {
        let result =
            validate_receipt_image("/nonexistent/receipt_cmd_test.jpg".to_string()).unwrap();
        assert!(!result.valid);
        assert_eq!(result.error.unwrap(), "File not found.");
    }
}
