//! Import the LinkedIn session cookies from a local browser profile.
//!
//! Chrome only exposes plaintext values in the `value` column; profiles that
//! store encrypted values yield nothing and Firefox is tried next.

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::session::{SessionCookies, AUTH_TOKEN, SESSION_ID};

const HOST_PATTERN: &str = "%linkedin.com";

pub fn import_browser_cookies() -> Result<SessionCookies> {
    let chrome_paths = [
        dirs::home_dir().map(|h| h.join(".config/google-chrome/Default/Cookies")),
        dirs::home_dir().map(|h| h.join(".config/chromium/Default/Cookies")),
    ];

    for cookie_path in chrome_paths.into_iter().flatten() {
        if !cookie_path.exists() {
            continue;
        }
        let query = "SELECT name, value FROM cookies
             WHERE host_key LIKE ?1 AND name IN (?2, ?3) AND value != ''";
        match read_session_cookies(&cookie_path, query, "chrome") {
            Ok(cookies) if has_session(&cookies) => {
                info!(path = %cookie_path.display(), "Loaded LinkedIn cookies from Chrome");
                return Ok(cookies);
            }
            Ok(_) => warn!(path = %cookie_path.display(), "No usable LinkedIn cookies in Chrome profile"),
            Err(e) => warn!(path = %cookie_path.display(), error = %e, "Could not read Chrome cookies"),
        }
    }

    if let Some(firefox_path) = find_firefox_cookies() {
        let query = "SELECT name, value FROM moz_cookies
             WHERE host LIKE ?1 AND name IN (?2, ?3) AND value != ''";
        let cookies = read_session_cookies(&firefox_path, query, "firefox")?;
        if has_session(&cookies) {
            info!(path = %firefox_path.display(), "Loaded LinkedIn cookies from Firefox");
            return Ok(cookies);
        }
    }

    anyhow::bail!("No LinkedIn session found in Chrome, Chromium or Firefox profiles. Log in to linkedin.com in a browser first.")
}

fn has_session(cookies: &SessionCookies) -> bool {
    cookies.get(SESSION_ID).is_some() && cookies.get(AUTH_TOKEN).is_some()
}

fn read_session_cookies(db_path: &Path, query: &str, browser: &str) -> Result<SessionCookies> {
    // Browsers keep the database locked while running
    let temp_path = std::env::temp_dir().join(format!("news-poster-{}-cookies.db", browser));
    std::fs::copy(db_path, &temp_path).context("Failed to copy cookies database")?;

    let result = query_session_cookies(&temp_path, query);
    std::fs::remove_file(&temp_path).ok();
    result
}

fn query_session_cookies(db_path: &Path, query: &str) -> Result<SessionCookies> {
    let conn = Connection::open(db_path).context("Failed to open cookies database")?;
    let mut stmt = conn.prepare(query)?;

    let rows = stmt.query_map([HOST_PATTERN, SESSION_ID, AUTH_TOKEN], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;

    let mut cookies = SessionCookies::new();
    for (name, value) in rows.flatten() {
        cookies.set(&name, &value);
    }
    Ok(cookies)
}

fn find_firefox_cookies() -> Option<PathBuf> {
    let firefox_dir = dirs::home_dir()?.join(".mozilla/firefox");
    if !firefox_dir.exists() {
        return None;
    }

    let profiles_ini = firefox_dir.join("profiles.ini");
    if let Ok(content) = std::fs::read_to_string(&profiles_ini) {
        if let Some(path) = default_profile(&content) {
            let cookies_path = firefox_dir.join(path).join("cookies.sqlite");
            if cookies_path.exists() {
                return Some(cookies_path);
            }
        }
    }

    // Fallback: any profile with cookies.sqlite
    std::fs::read_dir(&firefox_dir)
        .ok()?
        .flatten()
        .map(|entry| entry.path().join("cookies.sqlite"))
        .find(|path| path.exists())
}

/// `Path=` of the profile section marked `Default=1` in profiles.ini.
fn default_profile(profiles_ini: &str) -> Option<String> {
    let mut current_path: Option<String> = None;
    let mut is_default = false;

    for line in profiles_ini.lines().map(str::trim) {
        if line.starts_with('[') {
            if is_default && current_path.is_some() {
                return current_path;
            }
            current_path = None;
            is_default = false;
        } else if let Some(path) = line.strip_prefix("Path=") {
            current_path = Some(path.to_string());
        } else if line == "Default=1" {
            is_default = true;
        }
    }

    if is_default {
        current_path
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_profile_is_found() {
        let ini = "[General]\nStartWithLastProfile=1\n\n[Profile1]\nName=work\nPath=abcd.work\n\n[Profile0]\nName=default\nPath=wxyz.default\nDefault=1\n";
        assert_eq!(default_profile(ini).as_deref(), Some("wxyz.default"));
    }

    #[test]
    fn no_default_profile() {
        assert_eq!(default_profile("[Profile0]\nPath=x\n"), None);
    }

    #[test]
    fn reads_linkedin_cookies_from_firefox_schema() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("cookies.sqlite");
        let conn = Connection::open(&db).unwrap();
        conn.execute_batch(
            "CREATE TABLE moz_cookies (host TEXT, name TEXT, value TEXT);
             INSERT INTO moz_cookies VALUES ('.www.linkedin.com', 'JSESSIONID', '\"ajax:1\"');
             INSERT INTO moz_cookies VALUES ('.linkedin.com', 'li_at', 'tok');
             INSERT INTO moz_cookies VALUES ('.linkedin.com', 'bcookie', 'x');
             INSERT INTO moz_cookies VALUES ('.example.com', 'li_at', 'other');",
        )
        .unwrap();
        drop(conn);

        let query = "SELECT name, value FROM moz_cookies
             WHERE host LIKE ?1 AND name IN (?2, ?3) AND value != ''";
        let cookies = query_session_cookies(&db, query).unwrap();

        assert_eq!(cookies.len(), 2);
        assert_eq!(cookies.get("JSESSIONID"), Some("ajax:1"));
        assert_eq!(cookies.get("li_at"), Some("tok"));
        assert!(has_session(&cookies));
    }
}
