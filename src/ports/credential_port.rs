//! Client-side credential storage port trait.

/// Key names the bearer token has been stored under over the portal's
/// lifetime, newest first.
pub const LEGACY_TOKEN_KEYS: [&str; 5] = ["access_token", "accessToken", "token", "authToken", "jwt"];

pub trait CredentialStore {
    fn get(&self, key: &str) -> Option<String>;
}

/// First usable bearer token found under [`LEGACY_TOKEN_KEYS`]. Surrounding
/// quotes and a `Bearer ` prefix are stripped.
pub fn resolve_bearer(store: &dyn CredentialStore) -> Option<String> {
    LEGACY_TOKEN_KEYS
        .iter()
        .filter_map(|key| store.get(key))
        .map(|raw| normalize_token(&raw))
        .find(|token| !token.is_empty())
}

fn normalize_token(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('"').trim();
    let without_scheme = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))
        .unwrap_or(trimmed);
    without_scheme.trim().to_string()
}
