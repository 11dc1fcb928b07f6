fn load_env() {
    let _ = dotenvy::dotenv();
}

/// Compare a submitted password against the configured secret.
/// A missing or empty secret never matches anything.
pub fn secret_matches(input: &str, secret: Option<&str>) -> bool {
    match secret {
        Some(s) if !s.is_empty() => input == s,
        _ => false,
    }
}

pub fn password_matches(input: &str) -> bool {
    load_env();
    let secret = std::env::var("APP_PASSWORD").ok();
    secret_matches(input, secret.as_deref())
}
