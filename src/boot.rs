use log::{error, info, warn};
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use crate::config::AppConfig;

/// Required directories that will be created if missing
const REQUIRED_DIRS: &[&str] = &[
    "website",
    "website/static",
    "website/static/css",
    "website/templates",
];

/// Critical template files; the portal cannot render without these
const CRITICAL_TEMPLATES: &[&str] = &[
    "website/templates/base.html.tera",
    "website/templates/login/login.html.tera",
    "website/templates/member/mainClub.html.tera",
    "website/templates/error/errorInfo.html.tera",
];

const CRITICAL_STATIC: &[&str] = &["website/static/css/portal.css"];

const TEMPLATE_SUBDIRS: &[&str] = &[
    "website/templates/login",
    "website/templates/member",
    "website/templates/admin",
    "website/templates/board",
    "website/templates/error",
];

/// Run all boot checks. Call this before Rocket launches.
/// Creates missing directories, warns about missing files, and
/// aborts if critical dependencies are absent.
pub fn run(config: &AppConfig) {
    info!("Lions portal boot check starting...");

    let mut warnings = 0u32;
    let mut errors = 0u32;

    // ── 1. Directories ─────────────────────────────────
    let db_dir = Path::new(&config.db_path)
        .parent()
        .map(|p| p.to_path_buf())
        .unwrap_or_default();
    let mut dirs: Vec<PathBuf> = REQUIRED_DIRS.iter().map(PathBuf::from).collect();
    dirs.push(db_dir.clone());
    dirs.push(PathBuf::from(&config.thumb_dir));
    dirs.push(PathBuf::from(&config.cache_dir));

    for path in dirs.iter().filter(|p| !p.as_os_str().is_empty()) {
        if !path.exists() {
            match fs::create_dir_all(path) {
                Ok(_) => info!("  Created directory: {}", path.display()),
                Err(e) => {
                    error!("  FAILED to create directory {}: {}", path.display(), e);
                    errors += 1;
                }
            }
        }
    }

    // ── 2. Critical templates ──────────────────────────
    for file in CRITICAL_TEMPLATES {
        if !Path::new(file).exists() {
            error!("  MISSING critical template: {}", file);
            errors += 1;
        }
    }

    // ── 3. Static assets and font ──────────────────────
    for file in CRITICAL_STATIC {
        if !Path::new(file).exists() {
            warn!("  Missing static asset: {} (pages will be unstyled)", file);
            warnings += 1;
        }
    }
    if !Path::new(&config.font_path).exists() {
        warn!(
            "  Slogan font not found at {} (slogan cards will have no text)",
            config.font_path
        );
        warnings += 1;
    }

    // ── 4. Template subdirectories ─────────────────────
    for dir in TEMPLATE_SUBDIRS {
        let path = Path::new(dir);
        if !path.exists() {
            warn!("  Missing template directory: {} (some pages will 500)", dir);
            warnings += 1;
            continue;
        }
        let has_templates = fs::read_dir(path)
            .map(|entries| {
                entries.filter_map(|e| e.ok()).any(|e| {
                    e.path()
                        .extension()
                        .map(|ext| ext == "tera")
                        .unwrap_or(false)
                })
            })
            .unwrap_or(false);
        if !has_templates {
            warn!("  Template directory empty: {}", dir);
            warnings += 1;
        }
    }

    // ── 5. Writable data directories ───────────────────
    if !db_dir.as_os_str().is_empty() && !writable(&db_dir) {
        error!("  Database directory not writable: {}", db_dir.display());
        errors += 1;
    }
    for dir in [&config.thumb_dir, &config.cache_dir] {
        if !writable(Path::new(dir)) {
            warn!("  Directory not writable: {} (uploads or slogan cards will fail)", dir);
            warnings += 1;
        }
    }

    // ── 6. Rocket.toml exists ──────────────────────────
    if !Path::new("Rocket.toml").exists() {
        warn!("  Rocket.toml not found, using default config");
        warnings += 1;
    }

    // ── Summary ────────────────────────────────────────
    if errors > 0 {
        error!(
            "Boot check FAILED: {} error(s), {} warning(s). Aborting.",
            errors, warnings
        );
        process::exit(1);
    }

    if warnings > 0 {
        warn!(
            "Boot check passed with {} warning(s). Some features may not work correctly.",
            warnings
        );
    } else {
        info!("Boot check passed. All systems go.");
    }
}

fn writable(dir: &Path) -> bool {
    if !dir.exists() {
        return false;
    }
    let probe = dir.join(".write_test");
    match fs::write(&probe, "test") {
        Ok(_) => {
            let _ = fs::remove_file(&probe);
            true
        }
        Err(_) => false,
    }
}
