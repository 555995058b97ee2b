// src/users.rs
//! Login-gated access for the dashboard: a JSON user store plus a capped
//! access log. Passwords are stored as salted, iterated SHA-256 digests —
//! a deliberate hardening over the plain unsalted digest this replaces.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

pub const ADMIN_USERNAME: &str = "admin";
const HASH_ITERATIONS: u32 = 10_000;
const SALT_BYTES: usize = 16;
const LOG_CAP: usize = 1000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserEntry {
    /// "salt$digest", both hex.
    pub password_hash: String,
    pub role: String,
    pub name: String,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
}

/// Value returned on successful login; what the session carries around.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionIdentity {
    pub username: String,
    pub role: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessLogEntry {
    pub username: String,
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub news_title: Option<String>,
    pub timestamp: DateTime<Utc>,
}

pub struct UserStore {
    users_path: PathBuf,
    log_path: PathBuf,
}

impl UserStore {
    pub fn new<P: Into<PathBuf>, Q: Into<PathBuf>>(users_path: P, log_path: Q) -> Self {
        Self {
            users_path: users_path.into(),
            log_path: log_path.into(),
        }
    }

    /// Seed the admin account on first run. Existing stores are untouched.
    pub fn ensure_seed_admin(&self, initial_password: &str) -> Result<()> {
        let mut users = self.load_users()?;
        if users.contains_key(ADMIN_USERNAME) {
            return Ok(());
        }
        users.insert(
            ADMIN_USERNAME.to_string(),
            UserEntry {
                password_hash: hash_password(initial_password),
                role: "admin".to_string(),
                name: "系统管理员".to_string(),
                enabled: true,
                created_at: Utc::now(),
            },
        );
        self.save_users(&users)
    }

    /// Verify a login. Disabled or unknown users and wrong passwords all
    /// yield `None`; a success is recorded in the access log.
    pub fn verify_login(&self, username: &str, password: &str) -> Result<Option<SessionIdentity>> {
        let users = self.load_users()?;
        let Some(user) = users.get(username) else {
            return Ok(None);
        };
        if !user.enabled || !verify_password(password, &user.password_hash) {
            return Ok(None);
        }

        self.append_log(AccessLogEntry {
            username: username.to_string(),
            action: "login".to_string(),
            news_title: None,
            timestamp: Utc::now(),
        })?;

        Ok(Some(SessionIdentity {
            username: username.to_string(),
            role: user.role.clone(),
            name: user.name.clone(),
        }))
    }

    /// Returns false when the username is taken.
    pub fn create_user(&self, username: &str, password: &str, name: &str, role: &str) -> Result<bool> {
        let mut users = self.load_users()?;
        if users.contains_key(username) {
            return Ok(false);
        }
        users.insert(
            username.to_string(),
            UserEntry {
                password_hash: hash_password(password),
                role: role.to_string(),
                name: name.to_string(),
                enabled: true,
                created_at: Utc::now(),
            },
        );
        self.save_users(&users)?;
        Ok(true)
    }

    /// The admin account cannot be removed.
    pub fn remove_user(&self, username: &str) -> Result<bool> {
        if username == ADMIN_USERNAME {
            return Ok(false);
        }
        let mut users = self.load_users()?;
        if users.remove(username).is_none() {
            return Ok(false);
        }
        self.save_users(&users)?;
        Ok(true)
    }

    /// The admin account cannot be disabled.
    pub fn set_enabled(&self, username: &str, enabled: bool) -> Result<bool> {
        if username == ADMIN_USERNAME && !enabled {
            return Ok(false);
        }
        let mut users = self.load_users()?;
        let Some(user) = users.get_mut(username) else {
            return Ok(false);
        };
        user.enabled = enabled;
        self.save_users(&users)?;
        Ok(true)
    }

    pub fn change_password(&self, username: &str, new_password: &str) -> Result<bool> {
        let mut users = self.load_users()?;
        let Some(user) = users.get_mut(username) else {
            return Ok(false);
        };
        user.password_hash = hash_password(new_password);
        self.save_users(&users)?;
        Ok(true)
    }

    pub fn list_users(&self) -> Result<Vec<(String, UserEntry)>> {
        Ok(self.load_users()?.into_iter().collect())
    }

    /// Record that a user opened a news item.
    pub fn record_view(&self, username: &str, news_title: &str) -> Result<()> {
        self.append_log(AccessLogEntry {
            username: username.to_string(),
            action: "view_news".to_string(),
            news_title: Some(news_title.to_string()),
            timestamp: Utc::now(),
        })
    }

    /// Most recent log entries, newest first, optionally for one user.
    pub fn recent_logs(&self, username: Option<&str>, limit: usize) -> Result<Vec<AccessLogEntry>> {
        let mut logs = self.load_logs()?;
        logs.reverse();
        if let Some(username) = username {
            logs.retain(|l| l.username == username);
        }
        logs.truncate(limit);
        Ok(logs)
    }

    fn load_users(&self) -> Result<BTreeMap<String, UserEntry>> {
        read_json_or_default(&self.users_path)
    }

    fn save_users(&self, users: &BTreeMap<String, UserEntry>) -> Result<()> {
        write_json(&self.users_path, users)
    }

    fn load_logs(&self) -> Result<Vec<AccessLogEntry>> {
        read_json_or_default(&self.log_path)
    }

    fn append_log(&self, entry: AccessLogEntry) -> Result<()> {
        let mut logs = self.load_logs()?;
        logs.push(entry);
        if logs.len() > LOG_CAP {
            let excess = logs.len() - LOG_CAP;
            logs.drain(0..excess);
        }
        write_json(&self.log_path, &logs)
    }
}

fn read_json_or_default<T: Default + for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let data = match fs::read_to_string(path) {
        Ok(data) => data,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(T::default()),
        Err(e) => return Err(e).with_context(|| format!("reading {}", path.display())),
    };
    serde_json::from_str(&data).with_context(|| format!("parsing {}", path.display()))
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
        }
    }
    let json = serde_json::to_string_pretty(value).context("serializing json")?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json).with_context(|| format!("writing {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("replacing {}", path.display()))?;
    Ok(())
}

/// Salted, iterated digest: fresh random salt per call, so two users with
/// the same password never share a hash.
pub fn hash_password(password: &str) -> String {
    let mut salt = [0u8; SALT_BYTES];
    rand::rng().fill_bytes(&mut salt);
    format!("{}${}", hex(&salt), stretch(password, &salt))
}

pub fn verify_password(password: &str, stored: &str) -> bool {
    let Some((salt_hex, digest_hex)) = stored.split_once('$') else {
        return false;
    };
    let Some(salt) = unhex(salt_hex) else {
        return false;
    };
    stretch(password, &salt) == digest_hex
}

fn stretch(password: &str, salt: &[u8]) -> String {
    let mut digest = {
        let mut hasher = Sha256::new();
        hasher.update(salt);
        hasher.update(password.as_bytes());
        hasher.finalize()
    };
    for _ in 1..HASH_ITERATIONS {
        let mut hasher = Sha256::new();
        hasher.update(digest);
        digest = hasher.finalize();
    }
    hex(&digest)
}

fn hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{b:02x}");
    }
    out
}

fn unhex(s: &str) -> Option<Vec<u8>> {
    if s.len() % 2 != 0 {
        return None;
    }
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&s[i..i + 2], 16).ok())
        .collect()
}
