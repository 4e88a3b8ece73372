use crate::app_config::{AppConfig, ApparelMatch, BackendConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::path::PathBuf;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let env = parse_environment(&or_default("CLOSET_ENV", "development"));
    let log_level = or_default("CLOSET_LOG_LEVEL", "info");
    let sites_path = lookup("CLOSET_SITES_PATH").ok().map(PathBuf::from);
    let storage_path = PathBuf::from(or_default("CLOSET_STORAGE_PATH", "./closet-storage.json"));

    let feedback_reset_ms = parse_u64("CLOSET_FEEDBACK_RESET_MS", "2000")?;
    let toast_ms = parse_u64("CLOSET_TOAST_MS", "4000")?;
    let signed_url_ttl_secs = parse_u64("CLOSET_SIGNED_URL_TTL_SECS", "3600")?;
    let apparel_match = parse_apparel_match(&or_default("CLOSET_APPAREL_MATCH", "word"))?;

    let request_timeout_secs = parse_u64("CLOSET_REQUEST_TIMEOUT_SECS", "60")?;
    let backend = match (lookup("SUPABASE_URL"), lookup("SUPABASE_ANON_KEY")) {
        (Ok(url), Ok(anon_key)) => Some(BackendConfig {
            url: url.trim_end_matches('/').to_string(),
            anon_key,
            tryon_function: or_default("CLOSET_TRYON_FUNCTION", "virtual-tryon"),
            image_bucket: or_default("CLOSET_IMAGE_BUCKET", "user-images"),
            request_timeout_secs,
            user_agent: or_default("CLOSET_USER_AGENT", "closet/0.1"),
        }),
        (Ok(_), Err(_)) => return Err(ConfigError::MissingEnvVar("SUPABASE_ANON_KEY".to_string())),
        (Err(_), Ok(_)) => return Err(ConfigError::MissingEnvVar("SUPABASE_URL".to_string())),
        (Err(_), Err(_)) => None,
    };

    Ok(AppConfig {
        env,
        log_level,
        sites_path,
        storage_path,
        backend,
        feedback_reset_ms,
        toast_ms,
        apparel_match,
        signed_url_ttl_secs,
    })
}

/// Parse a string into an `Environment` variant.
///
/// Unrecognized values default to `Environment::Development`.
fn parse_environment(s: &str) -> Environment {
    match s {
        "production" => Environment::Production,
        "test" => Environment::Test,
        _ => Environment::Development,
    }
}

fn parse_apparel_match(s: &str) -> Result<ApparelMatch, ConfigError> {
    match s {
        "substring" => Ok(ApparelMatch::Substring),
        "word" => Ok(ApparelMatch::Word),
        other => Err(ConfigError::InvalidEnvVar {
            var: "CLOSET_APPAREL_MATCH".to_string(),
            reason: format!("expected \"substring\" or \"word\", got \"{other}\""),
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::env::VarError;

    use super::*;

    fn lookup_from_map<'a>(
        map: &'a HashMap<&'a str, &'a str>,
    ) -> impl Fn(&str) -> Result<String, VarError> + 'a {
        move |key| {
            map.get(key)
                .map(|v| (*v).to_string())
                .ok_or(VarError::NotPresent)
        }
    }

    fn backend_env<'a>() -> HashMap<&'a str, &'a str> {
        let mut m = HashMap::new();
        m.insert("SUPABASE_URL", "https://project.supabase.co/");
        m.insert("SUPABASE_ANON_KEY", "anon-key");
        m
    }

    #[test]
    fn parse_environment_known_values() {
        assert_eq!(parse_environment("development"), Environment::Development);
        assert_eq!(parse_environment("test"), Environment::Test);
        assert_eq!(parse_environment("production"), Environment::Production);
    }

    #[test]
    fn parse_environment_unknown_defaults_to_development() {
        assert_eq!(parse_environment("staging"), Environment::Development);
    }

    #[test]
    fn build_app_config_defaults_without_any_vars() {
        let map: HashMap<&str, &str> = HashMap::new();
        let cfg = build_app_config(lookup_from_map(&map)).unwrap();
        assert_eq!(cfg.env, Environment::Development);
        assert_eq!(cfg.log_level, "info");
        assert!(cfg.sites_path.is_none());
        assert_eq!(cfg.storage_path.to_str(), Some("./closet-storage.json"));
        assert!(cfg.backend.is_none());
        assert_eq!(cfg.feedback_reset_ms, 2000);
        assert_eq!(cfg.toast_ms, 4000);
        assert_eq!(cfg.apparel_match, ApparelMatch::Word);
        assert_eq!(cfg.signed_url_ttl_secs, 3600);
    }

    #[test]
    fn build_app_config_reads_backend_and_strips_trailing_slash() {
        let map = backend_env();
        let cfg = build_app_config(lookup_from_map(&map)).unwrap();
        let backend = cfg.backend.expect("backend configured");
        assert_eq!(backend.url, "https://project.supabase.co");
        assert_eq!(backend.tryon_function, "virtual-tryon");
        assert_eq!(backend.image_bucket, "user-images");
        assert_eq!(backend.request_timeout_secs, 60);
    }

    #[test]
    fn build_app_config_requires_anon_key_alongside_url() {
        let mut map: HashMap<&str, &str> = HashMap::new();
        map.insert("SUPABASE_URL", "https://project.supabase.co");
        let result = build_app_config(lookup_from_map(&map));
        assert!(
            matches!(result, Err(ConfigError::MissingEnvVar(ref v)) if v == "SUPABASE_ANON_KEY"),
            "expected MissingEnvVar(SUPABASE_ANON_KEY), got: {result:?}"
        );
    }

    #[test]
    fn build_app_config_requires_url_alongside_anon_key() {
        let mut map: HashMap<&str, &str> = HashMap::new();
        map.insert("SUPABASE_ANON_KEY", "anon-key");
        let result = build_app_config(lookup_from_map(&map));
        assert!(
            matches!(result, Err(ConfigError::MissingEnvVar(ref v)) if v == "SUPABASE_URL"),
            "expected MissingEnvVar(SUPABASE_URL), got: {result:?}"
        );
    }

    #[test]
    fn build_app_config_feedback_reset_override() {
        let mut map = backend_env();
        map.insert("CLOSET_FEEDBACK_RESET_MS", "500");
        let cfg = build_app_config(lookup_from_map(&map)).unwrap();
        assert_eq!(cfg.feedback_reset_ms, 500);
    }

    #[test]
    fn build_app_config_feedback_reset_invalid() {
        let mut map = backend_env();
        map.insert("CLOSET_FEEDBACK_RESET_MS", "soon");
        let result = build_app_config(lookup_from_map(&map));
        assert!(
            matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "CLOSET_FEEDBACK_RESET_MS"),
            "expected InvalidEnvVar(CLOSET_FEEDBACK_RESET_MS), got: {result:?}"
        );
    }

    #[test]
    fn build_app_config_request_timeout_invalid() {
        let mut map = backend_env();
        map.insert("CLOSET_REQUEST_TIMEOUT_SECS", "-1");
        let result = build_app_config(lookup_from_map(&map));
        assert!(
            matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "CLOSET_REQUEST_TIMEOUT_SECS"),
            "expected InvalidEnvVar(CLOSET_REQUEST_TIMEOUT_SECS), got: {result:?}"
        );
    }

    #[test]
    fn build_app_config_substring_matching() {
        let mut map: HashMap<&str, &str> = HashMap::new();
        map.insert("CLOSET_APPAREL_MATCH", "substring");
        let cfg = build_app_config(lookup_from_map(&map)).unwrap();
        assert_eq!(cfg.apparel_match, ApparelMatch::Substring);
    }

    #[test]
    fn build_app_config_rejects_unknown_matching_mode() {
        let mut map: HashMap<&str, &str> = HashMap::new();
        map.insert("CLOSET_APPAREL_MATCH", "fuzzy");
        let result = build_app_config(lookup_from_map(&map));
        assert!(
            matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "CLOSET_APPAREL_MATCH"),
            "expected InvalidEnvVar(CLOSET_APPAREL_MATCH), got: {result:?}"
        );
    }

    #[test]
    fn backend_config_debug_redacts_anon_key() {
        let map = backend_env();
        let cfg = build_app_config(lookup_from_map(&map)).unwrap();
        let rendered = format!("{cfg:?}");
        assert!(!rendered.contains("anon-key"), "anon key leaked: {rendered}");
        assert!(rendered.contains("[redacted]"));
    }
}
