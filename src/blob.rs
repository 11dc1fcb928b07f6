use reqwest::blocking::Client;

const STORAGE_ACCOUNT_URL: &str = "https://mystorageforexcelfiles.blob.core.windows.net";
const CONTAINER: &str = "demo";
const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

fn load_env() {
    let _ = dotenvy::dotenv();
}

/// Keep only characters safe in a blob URL path segment. Whitespace becomes
/// a single underscore; everything else non-alphanumeric (except - _ .) is
/// dropped.
pub fn sanitize_fragment(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut last_was_space = false;
    for c in s.trim().chars() {
        if c.is_whitespace() {
            if !last_was_space && !out.is_empty() {
                out.push('_');
            }
            last_was_space = true;
        } else if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
            out.push(c);
            last_was_space = false;
        } else {
            last_was_space = false;
        }
    }
    out.trim_end_matches('_').to_string()
}

/// Blob name derived from the receipt's company and date fields,
/// e.g. "summary_Spar2024-10-12.xlsx".
pub fn blob_name(prefix: &str, company: &str, date: &str) -> String {
    format!(
        "{}_{}{}.xlsx",
        prefix,
        sanitize_fragment(company),
        sanitize_fragment(date)
    )
}

fn blob_url(name: &str, sas_token: &str) -> String {
    format!(
        "{}/{}/{}?{}",
        STORAGE_ACCOUNT_URL,
        CONTAINER,
        name,
        sas_token.trim_start_matches('?')
    )
}

/// PUT the spreadsheet bytes as a block blob. Existing blobs of the same
/// name are overwritten. Returns the blob URL without the SAS token.
pub fn upload_block_blob(name: &str, bytes: Vec<u8>) -> Result<String, String> {
    load_env();
    let sas_token =
        std::env::var("BLOB_SAS_TOKEN").map_err(|_| "BLOB_SAS_TOKEN not set in .env")?;
    let url = blob_url(name, &sas_token);

    let client = Client::builder()
        .timeout(std::time::Duration::from_secs(120))
        .build()
        .map_err(|e| e.to_string())?;

    let response = client
        .put(&url)
        .header("x-ms-blob-type", "BlockBlob")
        .header("Content-Type", XLSX_CONTENT_TYPE)
        .body(bytes)
        .send()
        .map_err(|e| {
            if e.is_connect() || e.is_timeout() {
                "Check your internet connection and try again."
            } else {
                "Network error."
            }
            .to_string()
        })?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().unwrap_or_default();
        return Err(format!(
            "Upload failed ({}): {}",
            status,
            if body.is_empty() {
                "Invalid SAS token?"
            } else {
                body.trim()
            }
        ));
    }

    Ok(format!("{}/{}/{}", STORAGE_ACCOUNT_URL, CONTAINER, name))
}
