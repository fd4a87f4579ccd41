//! Environment context handed to the pipeline.
//!
//! # Design
//! The page location, the persistent token store and the toast surface are
//! ambient in a browser. Here each is a trait object supplied at
//! construction so the pipeline stays deterministic under test.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde_json::Value;

use crate::error::CredentialError;
use crate::image;

/// Where the client itself was loaded from.
pub trait HostContext: Send + Sync {
    /// Hostname of the current page, without scheme or port.
    fn hostname(&self) -> String;
}

/// Read access to the persistent key-value store holding the credential.
pub trait CredentialStore: Send + Sync {
    fn read(&self, key: &str) -> Result<Option<String>, CredentialError>;
}

/// User-visible transient notification.
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str);
}

/// Fixed hostname.
#[derive(Debug, Clone)]
pub struct StaticHost(String);

impl StaticHost {
    pub fn new(hostname: impl Into<String>) -> Self {
        Self(hostname.into())
    }
}

impl HostContext for StaticHost {
    fn hostname(&self) -> String {
        self.0.clone()
    }
}

/// Process-local credential store. Clones share the same entries.
#[derive(Debug, Clone, Default)]
pub struct MemoryCredentials {
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.write().insert(key.into(), value.into());
    }

    pub fn remove(&self, key: &str) -> Option<String> {
        self.entries.write().remove(key)
    }
}

impl CredentialStore for MemoryCredentials {
    fn read(&self, key: &str) -> Result<Option<String>, CredentialError> {
        Ok(self.entries.read().get(key).cloned())
    }
}

/// A JSON object on disk mapping keys to string values.
///
/// The file is read on every lookup so tokens written by another process
/// are picked up. A missing file means nothing has been stored yet.
#[derive(Debug, Clone)]
pub struct JsonFileCredentials {
    path: PathBuf,
}

impl JsonFileCredentials {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialStore for JsonFileCredentials {
    fn read(&self, key: &str) -> Result<Option<String>, CredentialError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let value: Value =
            serde_json::from_str(&raw).map_err(|e| CredentialError::Malformed(e.to_string()))?;
        let Value::Object(map) = value else {
            return Err(CredentialError::Malformed(
                "expected a JSON object at the top level".to_string(),
            ));
        };
        match map.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(other) => Err(CredentialError::Malformed(format!(
                "value under {key:?} is not a string: {other}"
            ))),
        }
    }
}

/// Emits notifications as `warn` log lines.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, message: &str) {
        tracing::warn!(target: "checkin_core::toast", "{message}");
    }
}

/// Collects notifications in order. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    messages: Arc<Mutex<Vec<String>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }

    pub fn clear(&self) {
        self.messages.lock().clear();
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, message: &str) {
        self.messages.lock().push(message.to_string());
    }
}

/// The three ambient collaborators of the pipeline.
#[derive(Clone)]
pub struct Environment {
    host: Arc<dyn HostContext>,
    credentials: Arc<dyn CredentialStore>,
    notifier: Arc<dyn Notifier>,
}

impl Environment {
    pub fn new(
        host: impl HostContext + 'static,
        credentials: impl CredentialStore + 'static,
        notifier: impl Notifier + 'static,
    ) -> Self {
        Self {
            host: Arc::new(host),
            credentials: Arc::new(credentials),
            notifier: Arc::new(notifier),
        }
    }

    pub fn host(&self) -> &Arc<dyn HostContext> {
        &self.host
    }

    pub fn credentials(&self) -> &Arc<dyn CredentialStore> {
        &self.credentials
    }

    pub fn notifier(&self) -> &Arc<dyn Notifier> {
        &self.notifier
    }

    /// Rewrite a media URL for the host this page was loaded from.
    pub fn format_image_url(&self, url: &str) -> String {
        image::format_image_url(url, &self.host.hostname())
    }
}

impl std::fmt::Debug for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Environment")
            .field("hostname", &self.host.hostname())
            .finish_non_exhaustive()
    }
}
