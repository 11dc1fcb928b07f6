use crate::cache::extraction_cache;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use regex::RegexBuilder;
use reqwest::blocking::Client;
use serde_json::{json, Value};
use std::fs;
use std::path::Path;

const CHAT_COMPLETIONS_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
const VISION_MODEL: &str = "meta-llama/llama-4-scout-17b-16e-instruct";

pub const INVALID_KEY_MSG: &str = "Invalid API key. Please check your Groq key and try again.";
pub const PROCESSING_FAILED_MSG: &str = "Receipt processing failed. Please upload a clearer image.";

fn load_env() {
    let _ = dotenvy::dotenv();
}

/// Product categories the model must choose from for each item.
const PRODUCT_CATEGORIES: &str = "food, alcoholic drink, paper product, toy, stationery, \
home decoration, DIY product, gardening, petrol, drugstore product, cloth, electric device, \
medicine, other";

/// Prompt asking for one JSON object with the receipt fields. When the user
/// supplies the exact item count, an extra clause pins the model to it.
fn extraction_prompt(expected_items: u32) -> String {
    let mut prompt = format!(
        "Extract the following receipt details from the provided image and return them as a \
structured JSON object. Return only JSON, no extra text or explanations.\n\n\
Fields to extract:\n\
- Company\n\
- Date\n\
- Items (Description, Quantity, Unit Price, Total, Discounted Total)\n\
- Deduction\n\
- Total\n\
- Discounted Total\n\
- ProductType per item, one of the following categories: {}. If not identified use \"unknown\".\n\
If the receipt contains a discount try to extract the discounted price of the certain product \
as Discounted Total.\n\
The name of the product item is before the price of that item.\n",
        PRODUCT_CATEGORIES
    );
    if expected_items > 0 {
        prompt.push_str(&format!(
            "\nIMPORTANT: There are exactly {count} items in the receipt. \
Do not infer or hallucinate additional items. \
Return exactly {count} items in the 'Items' field of the JSON.\n",
            count = expected_items
        ));
    }
    prompt
}

/// Isolate the first brace-delimited block from the model's free-text answer
/// and parse it. The scan is greedy from the first '{' to the last '}', so
/// prose before or after the object is tolerated.
pub fn extract_json_block(text: &str) -> Result<Value, String> {
    let re = RegexBuilder::new(r"\{.*\}")
        .dot_matches_new_line(true)
        .build()
        .expect("json block regex");
    let m = re
        .find(text)
        .ok_or("No valid JSON found in model response.")?;
    let parsed: Value =
        serde_json::from_str(m.as_str()).map_err(|e| format!("Invalid JSON: {}", e))?;
    if !parsed.is_object() {
        return Err("Model response is not a JSON object.".to_string());
    }
    Ok(parsed)
}

/// Send the receipt photo to the vision model and return the parsed JSON
/// object. Results are memoized by image bytes and item-count hint so a
/// re-render does not repeat the paid API call.
pub fn extract_receipt(file_path: &str, expected_items: u32) -> Result<Value, String> {
    load_env();
    let api_key = std::env::var("GROQ_API_KEY").map_err(|_| "GROQ_API_KEY not set in .env")?;

    let bytes = fs::read(Path::new(file_path)).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            "File not found.".to_string()
        } else {
            format!("Could not read file: {}", e)
        }
    })?;
    if bytes.is_empty() {
        return Err("Image file is empty.".to_string());
    }

    let cache_key = extraction_cache::extraction_key(&bytes, expected_items);
    if let Some(cached) = extraction_cache::get_cached_extraction(cache_key) {
        #[cfg(debug_assertions)]
        eprintln!("[extract] cache hit for {}", file_path);
        return Ok(cached);
    }

    let base64_image = BASE64.encode(&bytes);
    let body = json!({
        "model": VISION_MODEL,
        "messages": [
            {
                "role": "user",
                "content": [
                    {"type": "text", "text": extraction_prompt(expected_items)},
                    {
                        "type": "image_url",
                        "image_url": {
                            "url": format!("data:image/jpeg;base64,{}", base64_image),
                        },
                    },
                ],
            }
        ],
    });

    let client = Client::builder()
        .timeout(std::time::Duration::from_secs(120))
        .build()
        .map_err(|e| e.to_string())?;

    let response = client
        .post(CHAT_COMPLETIONS_URL)
        .bearer_auth(&api_key)
        .json(&body)
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
    if status == reqwest::StatusCode::UNAUTHORIZED {
        return Err(INVALID_KEY_MSG.to_string());
    }
    if !status.is_success() {
        let body = response.text().unwrap_or_default();
        return Err(format!(
            "Extraction failed ({}): {}",
            status,
            if body.is_empty() {
                "Invalid key or endpoint?"
            } else {
                body.as_str()
            }
        ));
    }

    let response_json: Value = response
        .json()
        .map_err(|e| format!("Invalid JSON: {}", e))?;
    let content = response_json
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .ok_or("No message content in model response.")?;

    let result = extract_json_block(content).map_err(|_e| {
        #[cfg(debug_assertions)]
        eprintln!("[extract] {}", _e);
        PROCESSING_FAILED_MSG.to_string()
    })?;

    extraction_cache::set_cached_extraction(cache_key, result.clone());
    Ok(result)
}
