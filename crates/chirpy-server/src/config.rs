use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::Duration;

use chirpy_api::tokens::TokenLifetimes;

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me-to-a-random-string", "dev-secret-change-me"];

/// Upper bound for either token lifetime: 100 years.
const MAX_TTL_SECS: i64 = 100 * 365 * 24 * 60 * 60;

#[derive(Debug, Clone)]
pub struct Config {
    pub jwt_secret: String,
    pub polka_key: String,
    pub db_path: PathBuf,
    pub host: String,
    pub port: u16,
    pub static_dir: PathBuf,
    pub token_lifetimes: TokenLifetimes,
    pub prune_interval_secs: u64,
    pub reset_db: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let jwt_secret = lookup("CHIRPY_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("CHIRPY_JWT_SECRET is unset or still a placeholder");
        }

        let polka_key = lookup("CHIRPY_POLKA_KEY").unwrap_or_default();
        if polka_key.is_empty() {
            bail!("CHIRPY_POLKA_KEY is unset");
        }

        let port = parse_or(&lookup, "CHIRPY_PORT", 8080)?;
        let access_secs: i64 = parse_or(&lookup, "CHIRPY_ACCESS_TTL_SECS", 60 * 60)?;
        let refresh_secs: i64 = parse_or(&lookup, "CHIRPY_REFRESH_TTL_SECS", 60 * 24 * 60 * 60)?;
        if access_secs <= 0 || refresh_secs <= access_secs || refresh_secs > MAX_TTL_SECS {
            bail!("token lifetimes must satisfy 0 < access < refresh <= {}s", MAX_TTL_SECS);
        }
        let (Some(access), Some(refresh)) =
            (Duration::try_seconds(access_secs), Duration::try_seconds(refresh_secs))
        else {
            bail!("token lifetimes out of range");
        };

        let prune_interval_secs = parse_or(&lookup, "CHIRPY_PRUNE_INTERVAL_SECS", 60 * 60)?;
        if prune_interval_secs == 0 {
            bail!("CHIRPY_PRUNE_INTERVAL_SECS must be positive");
        }

        let db_path: PathBuf = lookup("CHIRPY_DB_PATH")
            .unwrap_or_else(|| "database.json".into())
            .into();
        let static_dir: PathBuf = lookup("CHIRPY_STATIC_DIR")
            .unwrap_or_else(|| "public".into())
            .into();
        if is_within(&db_path, &static_dir) {
            bail!(
                "CHIRPY_DB_PATH {} is inside CHIRPY_STATIC_DIR {} and would be served publicly",
                db_path.display(),
                static_dir.display()
            );
        }

        Ok(Self {
            jwt_secret,
            polka_key,
            db_path,
            host: lookup("CHIRPY_HOST").unwrap_or_else(|| "localhost".into()),
            port,
            static_dir,
            token_lifetimes: TokenLifetimes { access, refresh },
            prune_interval_secs,
            reset_db: lookup("CHIRPY_RESET_DB").is_some_and(|v| v == "true" || v == "1"),
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw.parse().with_context(|| format!("invalid {}: {:?}", key, raw)),
        None => Ok(default),
    }
}

/// Whether `file` would resolve to a path under `dir`. Symlinks are
/// followed for whichever parts exist on disk.
fn is_within(file: &Path, dir: &Path) -> bool {
    let parent = match file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let file = match file.file_name() {
        Some(name) => resolve(parent).join(name),
        None => resolve(file),
    };
    file.starts_with(resolve(dir))
}

fn resolve(path: &Path) -> PathBuf {
    path.canonicalize()
        .or_else(|_| std::path::absolute(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    const REQUIRED: [(&str, &str); 2] = [
        ("CHIRPY_JWT_SECRET", "a-real-secret"),
        ("CHIRPY_POLKA_KEY", "polka"),
    ];

    #[test]
    fn defaults_apply() {
        let cfg = config(&REQUIRED).unwrap();
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.host, "localhost");
        assert_eq!(cfg.db_path, PathBuf::from("database.json"));
        assert_eq!(cfg.static_dir, PathBuf::from("public"));
        assert_eq!(cfg.token_lifetimes.access, Duration::hours(1));
        assert_eq!(cfg.token_lifetimes.refresh, Duration::days(60));
        assert!(!cfg.reset_db);
    }

    #[test]
    fn placeholder_secret_rejected() {
        let err = config(&[
            ("CHIRPY_JWT_SECRET", "dev-secret-change-me"),
            ("CHIRPY_POLKA_KEY", "polka"),
        ]);
        assert!(err.is_err());
        assert!(config(&[("CHIRPY_POLKA_KEY", "polka")]).is_err());
    }

    #[test]
    fn missing_polka_key_rejected() {
        assert!(config(&[("CHIRPY_JWT_SECRET", "a-real-secret")]).is_err());
    }

    #[test]
    fn overrides_are_parsed() {
        let mut vars = REQUIRED.to_vec();
        vars.extend([
            ("CHIRPY_PORT", "9000"),
            ("CHIRPY_ACCESS_TTL_SECS", "600"),
            ("CHIRPY_RESET_DB", "true"),
        ]);
        let cfg = config(&vars).unwrap();
        assert_eq!(cfg.port, 9000);
        assert_eq!(cfg.token_lifetimes.access, Duration::minutes(10));
        assert!(cfg.reset_db);
    }

    #[test]
    fn bad_numbers_rejected() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("CHIRPY_PORT", "eighty"));
        assert!(config(&vars).is_err());

        let mut vars = REQUIRED.to_vec();
        vars.push(("CHIRPY_ACCESS_TTL_SECS", "0"));
        assert!(config(&vars).is_err());
    }

    #[test]
    fn huge_ttls_rejected_without_panicking() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("CHIRPY_REFRESH_TTL_SECS", "9223372036854775807"));
        assert!(config(&vars).is_err());

        let mut vars = REQUIRED.to_vec();
        vars.push(("CHIRPY_REFRESH_TTL_SECS", "3153600001"));
        assert!(config(&vars).is_err());
    }

    #[test]
    fn database_inside_static_dir_rejected() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("CHIRPY_STATIC_DIR", "."));
        assert!(config(&vars).is_err());

        let mut vars = REQUIRED.to_vec();
        vars.extend([
            ("CHIRPY_STATIC_DIR", "/srv/chirpy/public"),
            ("CHIRPY_DB_PATH", "/srv/chirpy/public/./data/database.json"),
        ]);
        assert!(config(&vars).is_err());

        let mut vars = REQUIRED.to_vec();
        vars.extend([
            ("CHIRPY_STATIC_DIR", "/srv/chirpy/public"),
            ("CHIRPY_DB_PATH", "/srv/chirpy/database.json"),
        ]);
        assert!(config(&vars).is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_static_dir_is_resolved() {
        let dir = tempfile::TempDir::new().unwrap();
        let data = dir.path().join("data");
        std::fs::create_dir(&data).unwrap();
        let link = dir.path().join("site");
        std::os::unix::fs::symlink(&data, &link).unwrap();

        assert!(is_within(&data.join("database.json"), &link));
        assert!(!is_within(&dir.path().join("database.json"), &link));
    }
}
