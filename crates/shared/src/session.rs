use cookie_store::RawCookie;
use serde_json::{Map, Value};

/// Session-id cookie; doubles as the CSRF token.
pub const SESSION_ID: &str = "JSESSIONID";
/// Auth-token cookie.
pub const AUTH_TOKEN: &str = "li_at";

/// Cookies refreshed from `Set-Cookie` responses.
pub const TRACKED: [&str; 2] = [SESSION_ID, AUTH_TOKEN];

/// Named session cookie values, in the order they appear in the config file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionCookies {
    entries: Vec<(String, String)>,
}

fn normalize(value: &str) -> String {
    value.trim().trim_matches('"').trim().to_string()
}

impl SessionCookies {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from the config `cookies` object. Non-string values are kept in
    /// their JSON text form.
    pub fn from_json_map(map: &Map<String, Value>) -> Self {
        map.iter()
            .map(|(name, value)| {
                let value = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (name.clone(), value)
            })
            .collect()
    }

    pub fn to_json_map(&self) -> Map<String, Value> {
        self.entries
            .iter()
            .map(|(name, value)| (name.clone(), Value::String(value.clone())))
            .collect()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Insert or replace a value. Returns true if the stored value changed.
    pub fn set(&mut self, name: &str, value: &str) -> bool {
        let value = normalize(value);
        match self.entries.iter_mut().find(|(n, _)| n == name) {
            Some((_, current)) if *current == value => false,
            Some((_, current)) => {
                *current = value;
                true
            }
            None => {
                self.entries.push((name.to_string(), value));
                true
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn csrf_token(&self) -> Option<&str> {
        self.get(SESSION_ID)
    }

    /// Value for the `cookie` request header. The session id is sent quoted.
    pub fn header_value(&self) -> String {
        self.entries
            .iter()
            .map(|(name, value)| {
                if name == SESSION_ID {
                    format!("{}=\"{}\"", name, value)
                } else {
                    format!("{}={}", name, value)
                }
            })
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// Apply refreshed values for the tracked cookies found in `Set-Cookie`
    /// header values. Returns true if anything changed.
    pub fn refresh_from<'a, I>(&mut self, set_cookie_values: I) -> bool
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut changed = false;
        for header in set_cookie_values {
            for (name, value) in tracked_values(header) {
                if !value.is_empty() && self.set(name, &value) {
                    changed = true;
                }
            }
        }
        changed
    }
}

impl FromIterator<(String, String)> for SessionCookies {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        let mut cookies = SessionCookies::new();
        for (name, value) in iter {
            cookies.set(&name, &value);
        }
        cookies
    }
}

/// Tracked cookie values carried by a single `Set-Cookie` header.
///
/// Every `;` or `,` separated part is parsed as a `name=value` pair, so
/// tracked cookies are found wherever they sit in the value. The first
/// occurrence of each name wins.
fn tracked_values(header: &str) -> Vec<(&'static str, String)> {
    let mut found: Vec<(&'static str, String)> = Vec::new();
    for part in header.split([';', ',']) {
        let Ok(cookie) = RawCookie::parse(part.trim()) else {
            continue;
        };
        let Some(tracked) = TRACKED.iter().find(|t| **t == cookie.name()) else {
            continue;
        };
        if !found.iter().any(|(n, _)| n == tracked) {
            found.push((*tracked, normalize(cookie.value())));
        }
    }
    found
}
