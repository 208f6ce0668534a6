// SPDX-License-Identifier: AGPL-3.0
// Artsy Session Core - Persistent cookie jar
//
// Cookies are kept per host and stored as one JSON entry per host under
// the "cookies" namespace. Expired cookies are pruned when read.

use crate::storage::StorageBackend;
use crate::types::SessionError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockWriteGuard};

const COOKIE_NAMESPACE: &str = "cookies";
const ENTRY_SUFFIX: &str = ".json";

/// 9999-12-31T23:59:59Z, the expiry given to cookies without Expires/Max-Age
const SESSION_EXPIRY_SECS: i64 = 253_402_300_799;

/// A single stored cookie
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CookieRecord {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
    pub expires_at: DateTime<Utc>,
    pub secure: bool,
    pub http_only: bool,
    pub host_only: bool,
}

impl CookieRecord {
    /// Expiry used for cookies that only live as long as the session
    pub fn session_expiry() -> DateTime<Utc> {
        DateTime::from_timestamp(SESSION_EXPIRY_SECS, 0).unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }

    /// RFC 6265 path-match against a request path
    pub fn matches_path(&self, request_path: &str) -> bool {
        if request_path == self.path {
            return true;
        }
        request_path.starts_with(&self.path)
            && (self.path.ends_with('/') || request_path[self.path.len()..].starts_with('/'))
    }

    /// Parse a `Set-Cookie` header received from `host`.
    ///
    /// Returns `None` for malformed headers and for cookies whose Domain
    /// attribute does not cover `host`.
    pub fn from_set_cookie(header: &str, host: &str, now: DateTime<Utc>) -> Option<Self> {
        let parsed = cookie::Cookie::parse(header.to_string()).ok()?;
        let host = host.to_ascii_lowercase();

        let (domain, host_only) = match parsed.domain() {
            Some(domain) => {
                let domain = domain.trim_start_matches('.').to_ascii_lowercase();
                if !domain_matches(&host, &domain) {
                    tracing::debug!("Ignoring cookie {} for foreign domain {}", parsed.name(), domain);
                    return None;
                }
                (domain, false)
            }
            None => (host, true),
        };

        let path = parsed
            .path()
            .filter(|path| path.starts_with('/'))
            .unwrap_or("/")
            .to_string();

        // Max-Age wins over Expires
        let expires_at = if let Some(max_age) = parsed.max_age() {
            chrono::Duration::try_seconds(max_age.whole_seconds())
                .and_then(|age| now.checked_add_signed(age))
                .unwrap_or_else(Self::session_expiry)
        } else if let Some(expires) = parsed.expires_datetime() {
            DateTime::from_timestamp(expires.unix_timestamp(), 0).unwrap_or(now)
        } else {
            Self::session_expiry()
        };

        Some(Self {
            name: parsed.name().to_string(),
            value: parsed.value().to_string(),
            domain,
            path,
            expires_at,
            secure: parsed.secure().unwrap_or(false),
            http_only: parsed.http_only().unwrap_or(false),
            host_only,
        })
    }
}

fn domain_matches(host: &str, domain: &str) -> bool {
    host == domain
        || (host.len() > domain.len()
            && host.ends_with(domain)
            && host.as_bytes()[host.len() - domain.len() - 1] == b'.')
}

/// Host names map to file-safe entry names: [A-Za-z0-9.-] pass through,
/// anything else becomes `_XX`.
fn entry_key(host: &str) -> String {
    let mut name = String::with_capacity(host.len());
    for byte in host.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'.' || byte == b'-' {
            name.push(byte as char);
        } else {
            name.push_str(&format!("_{:02X}", byte));
        }
    }
    format!("{}/{}{}", COOKIE_NAMESPACE, name, ENTRY_SUFFIX)
}

fn host_from_key(key: &str) -> Option<String> {
    let name = key
        .strip_prefix(COOKIE_NAMESPACE)?
        .strip_prefix('/')?
        .strip_suffix(ENTRY_SUFFIX)?;

    let mut bytes = Vec::with_capacity(name.len());
    let mut iter = name.bytes();
    while let Some(byte) = iter.next() {
        if byte == b'_' {
            let hex = [iter.next()?, iter.next()?];
            let hex = std::str::from_utf8(&hex).ok()?;
            bytes.push(u8::from_str_radix(hex, 16).ok()?);
        } else {
            bytes.push(byte);
        }
    }
    String::from_utf8(bytes).ok().filter(|host| !host.is_empty())
}

#[derive(Serialize, Deserialize)]
struct CookieFile {
    host: String,
    cookies: Vec<CookieRecord>,
}

/// Per-host authentication cookies, persisted across restarts.
///
/// Storage failures are logged and never returned: a failed write leaves
/// the in-memory state correct for the current process.
pub struct CookieJar {
    cookies: RwLock<HashMap<String, Vec<CookieRecord>>>,
    storage: Arc<dyn StorageBackend>,
}

impl CookieJar {
    /// Create a jar and load every persisted host entry
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        let jar = Self {
            cookies: RwLock::new(HashMap::new()),
            storage,
        };
        jar.load_all();
        jar
    }

    fn load_all(&self) {
        let keys = match self.storage.list(COOKIE_NAMESPACE) {
            Ok(keys) => keys,
            Err(e) => {
                tracing::error!("Failed to list persisted cookies: {}", e);
                return;
            }
        };

        let mut cookies = self.lock();
        for key in keys {
            let Some(host) = host_from_key(&key) else {
                tracing::warn!("Skipping unrecognized cookie entry {}", key);
                continue;
            };

            let records = match self.storage.read(&key) {
                Ok(Some(data)) => serde_json::from_slice::<CookieFile>(&data)
                    .map(|file| file.cookies)
                    .unwrap_or_else(|e| {
                        tracing::warn!("Failed to parse cookies for {}, ignoring: {}", host, e);
                        Vec::new()
                    }),
                Ok(None) => Vec::new(),
                Err(e) => {
                    tracing::error!("Failed to read cookies for {}: {}", host, e);
                    Vec::new()
                }
            };

            tracing::debug!("Loaded {} cookies for host: {}", records.len(), host);
            if !records.is_empty() {
                cookies.insert(host, records);
            }
        }
    }

    fn lock(&self) -> RwLockWriteGuard<'_, HashMap<String, Vec<CookieRecord>>> {
        self.cookies.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace every cookie known for `host`
    pub fn store(&self, host: &str, cookies: Vec<CookieRecord>) {
        let host = host.to_ascii_lowercase();
        tracing::debug!("Saving {} cookies for host: {}", cookies.len(), host);

        let mut map = self.lock();
        self.persist(&host, &cookies);
        if cookies.is_empty() {
            map.remove(&host);
        } else {
            map.insert(host, cookies);
        }
    }

    /// Live cookies for `host`, pruning expired ones from memory and storage
    pub fn retrieve(&self, host: &str) -> Vec<CookieRecord> {
        self.retrieve_at(host, Utc::now())
    }

    /// [`retrieve`](Self::retrieve) against an explicit clock
    pub fn retrieve_at(&self, host: &str, now: DateTime<Utc>) -> Vec<CookieRecord> {
        let host = host.to_ascii_lowercase();
        let mut map = self.lock();
        let Some(cookies) = map.get(&host) else {
            return Vec::new();
        };

        let live: Vec<CookieRecord> = cookies
            .iter()
            .filter(|cookie| !cookie.is_expired_at(now))
            .cloned()
            .collect();

        if live.len() < cookies.len() {
            tracing::debug!(
                "Pruned {} expired cookies for host: {}",
                cookies.len() - live.len(),
                host
            );
            self.persist(&host, &live);
            if live.is_empty() {
                map.remove(&host);
            } else {
                map.insert(host, live.clone());
            }
        }

        live
    }

    /// Drop all cookies from memory and storage
    pub fn clear(&self) {
        tracing::info!("Clearing all cookies");
        let mut map = self.lock();
        map.clear();

        match self.storage.list(COOKIE_NAMESPACE) {
            Ok(keys) => {
                for key in keys {
                    if let Err(e) = self.storage.remove(&key) {
                        tracing::error!("Failed to remove cookie entry {}: {}", key, e);
                    }
                }
            }
            Err(e) => tracing::error!("Failed to list cookies for clearing: {}", e),
        }
    }

    /// Hosts that currently hold cookies
    pub fn hosts(&self) -> Vec<String> {
        let mut hosts: Vec<String> = self
            .cookies
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        hosts.sort();
        hosts
    }

    fn persist(&self, host: &str, cookies: &[CookieRecord]) {
        let key = entry_key(host);
        let result = if cookies.is_empty() {
            self.storage.remove(&key)
        } else {
            let file = CookieFile {
                host: host.to_string(),
                cookies: cookies.to_vec(),
            };
            serde_json::to_vec(&file)
                .map_err(SessionError::from)
                .and_then(|data| self.storage.write(&key, &data))
        };

        if let Err(e) = result {
            tracing::error!("Failed to persist cookies for {}: {}", host, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use chrono::Duration;

    fn cookie(name: &str, expires_at: DateTime<Utc>) -> CookieRecord {
        CookieRecord {
            name: name.to_string(),
            value: "v".to_string(),
            domain: "api.example.com".to_string(),
            path: "/".to_string(),
            expires_at,
            secure: true,
            http_only: true,
            host_only: true,
        }
    }

    #[test]
    fn test_store_replaces_whole_list() {
        let storage = Arc::new(MemoryStorage::new());
        let jar = CookieJar::new(storage.clone());
        let later = Utc::now() + Duration::hours(1);

        jar.store("api.example.com", vec![cookie("a", later), cookie("b", later)]);
        jar.store("api.example.com", vec![cookie("c", later)]);

        let names: Vec<String> = jar
            .retrieve("api.example.com")
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["c".to_string()]);
    }

    #[test]
    fn test_empty_list_removes_entry() {
        let storage = Arc::new(MemoryStorage::new());
        let jar = CookieJar::new(storage.clone());

        jar.store("api.example.com", vec![cookie("a", Utc::now() + Duration::hours(1))]);
        assert_eq!(storage.len(), 1);

        jar.store("api.example.com", Vec::new());
        assert!(storage.is_empty());
        assert!(jar.hosts().is_empty());
    }

    #[test]
    fn test_expired_cookies_pruned_from_storage() {
        let storage = Arc::new(MemoryStorage::new());
        let jar = CookieJar::new(storage.clone());
        let now = Utc::now();

        jar.store(
            "api.example.com",
            vec![cookie("old", now - Duration::minutes(5)), cookie("live", now + Duration::hours(1))],
        );

        let live = jar.retrieve_at("api.example.com", now);
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].name, "live");

        // A fresh jar over the same storage no longer sees the expired cookie
        let reloaded = CookieJar::new(storage);
        let names: Vec<String> = reloaded
            .retrieve_at("api.example.com", now)
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["live".to_string()]);
    }

    #[test]
    fn test_all_expired_drops_host() {
        let storage = Arc::new(MemoryStorage::new());
        let jar = CookieJar::new(storage.clone());
        let now = Utc::now();

        jar.store("api.example.com", vec![cookie("old", now - Duration::seconds(1))]);
        assert!(jar.retrieve_at("api.example.com", now).is_empty());
        assert!(storage.is_empty());
    }

    #[test]
    fn test_loads_eagerly_and_ignores_corrupt_entries() {
        let storage = Arc::new(MemoryStorage::new());
        {
            let jar = CookieJar::new(storage.clone());
            jar.store("good.example.com", vec![cookie("a", Utc::now() + Duration::days(1))]);
        }
        storage
            .write("cookies/bad.example.com.json", b"\x00not json")
            .unwrap();

        let jar = CookieJar::new(storage);
        assert_eq!(jar.hosts(), vec!["good.example.com".to_string()]);
        assert!(jar.retrieve("bad.example.com").is_empty());
    }

    #[test]
    fn test_clear_drops_everything() {
        let storage = Arc::new(MemoryStorage::new());
        let jar = CookieJar::new(storage.clone());
        let later = Utc::now() + Duration::hours(1);
        jar.store("a.example.com", vec![cookie("a", later)]);
        jar.store("b.example.com", vec![cookie("b", later)]);

        jar.clear();
        assert!(jar.hosts().is_empty());
        assert!(storage.is_empty());
    }

    #[test]
    fn test_host_keys_roundtrip() {
        for host in ["example.com", "127.0.0.1", "[::1]", "under_score.dev"] {
            assert_eq!(host_from_key(&entry_key(host)).as_deref(), Some(host));
        }
        assert_eq!(host_from_key("cookies/bad_Z.json"), None);
    }

    #[test]
    fn test_parse_set_cookie_host_only() {
        let now = Utc::now();
        let record =
            CookieRecord::from_set_cookie("token=abc; Path=/; HttpOnly; Secure", "API.example.com", now)
                .unwrap();

        assert_eq!(record.name, "token");
        assert_eq!(record.value, "abc");
        assert_eq!(record.domain, "api.example.com");
        assert!(record.host_only && record.http_only && record.secure);
        assert_eq!(record.expires_at, CookieRecord::session_expiry());
    }

    #[test]
    fn test_parse_set_cookie_max_age_and_domain() {
        let now = Utc::now();
        let record = CookieRecord::from_set_cookie(
            "token=abc; Domain=.example.com; Max-Age=3600",
            "api.example.com",
            now,
        )
        .unwrap();

        assert_eq!(record.domain, "example.com");
        assert!(!record.host_only);
        assert_eq!(record.expires_at, now + Duration::seconds(3600));
    }

    #[test]
    fn test_parse_set_cookie_rejects_foreign_domain() {
        let now = Utc::now();
        assert!(
            CookieRecord::from_set_cookie("a=b; Domain=other.com", "api.example.com", now).is_none()
        );
        assert!(
            CookieRecord::from_set_cookie("a=b; Domain=ample.com", "api.example.com", now).is_none()
        );
    }

    #[test]
    fn test_path_matching() {
        let mut record = cookie("a", Utc::now());
        record.path = "/api".to_string();

        assert!(record.matches_path("/api"));
        assert!(record.matches_path("/api/favorites"));
        assert!(!record.matches_path("/apix"));
        assert!(!record.matches_path("/"));
    }
}
