use std::env;

/// Runtime configuration, read once from the environment at launch.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_path: String,
    pub base_url: String,
    pub thumb_dir: String,
    pub cache_dir: String,
    pub font_path: String,
    pub session_hours: i64,
    pub admin_password: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            db_path: "website/db/lions.db".to_string(),
            base_url: "http://localhost:8000".to_string(),
            thumb_dir: "website/thumbs".to_string(),
            cache_dir: "website/cache".to_string(),
            font_path: "website/static/fonts/slogan.ttf".to_string(),
            session_hours: 24,
            admin_password: "admin".to_string(),
        }
    }
}

impl AppConfig {
    /// Reads the process environment; `main` loads `.env` before calling this.
    pub fn from_env() -> Self {
        let defaults = AppConfig::default();
        AppConfig {
            db_path: var_or("LIONS_DB_PATH", defaults.db_path),
            base_url: var_or("LIONS_BASE_URL", defaults.base_url)
                .trim_end_matches('/')
                .to_string(),
            thumb_dir: var_or("LIONS_THUMB_DIR", defaults.thumb_dir),
            cache_dir: var_or("LIONS_CACHE_DIR", defaults.cache_dir),
            font_path: var_or("LIONS_FONT_PATH", defaults.font_path),
            session_hours: env::var("LIONS_SESSION_HOURS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.session_hours)
                .max(1),
            admin_password: var_or("LIONS_ADMIN_PASSWORD", defaults.admin_password),
        }
    }

    /// Absolute URL for a path served by this process.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

fn var_or(key: &str, default: String) -> String {
    match env::var(key) {
        Ok(v) if !v.trim().is_empty() => v,
        _ => default,
    }
}
