use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use mdui_core::model::Document;
use mdui_core::version::{IR_VERSION, Version};

use crate::migrate::MigrationError;

/// Transform from one IR version to the next. Receives an owned copy;
/// the error string becomes [`MigrationError::TransformFailed`].
pub type Transform = Arc<dyn Fn(Document) -> Result<Document, String> + Send + Sync>;

#[derive(Clone)]
pub(crate) struct Step {
    pub(crate) to: String,
    pub(crate) transform: Transform,
}

/// Registered migration steps, keyed by source version.
///
/// Migrations form a single chain, so each source version has at most one
/// outgoing step: registering `from -> to` replaces any earlier step from
/// `from`, whatever its target. An explicit value passed to
/// [`migrate_ir`](crate::migrate_ir); populate it before sharing it across
/// threads.
#[derive(Clone)]
pub struct MigrationRegistry {
    steps: BTreeMap<String, Step>,
    latest: String,
}

impl Default for MigrationRegistry {
    fn default() -> Self {
        Self {
            steps: BTreeMap::new(),
            latest: IR_VERSION.to_string(),
        }
    }
}

impl fmt::Debug for MigrationRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigrationRegistry")
            .field("steps", &self.edges())
            .field("latest", &self.latest)
            .finish()
    }
}

impl MigrationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry whose migrations end at `latest` instead of the current IR version.
    pub fn with_latest(latest: &str) -> Result<Self, MigrationError> {
        check_version(latest)?;
        Ok(Self {
            steps: BTreeMap::new(),
            latest: latest.to_string(),
        })
    }

    /// Register the step `from -> to`. A later registration for the same
    /// `from` replaces the earlier one, even when it targets another version.
    pub fn register<F>(&mut self, from: &str, to: &str, transform: F) -> Result<(), MigrationError>
    where
        F: Fn(Document) -> Result<Document, String> + Send + Sync + 'static,
    {
        check_version(from)?;
        check_version(to)?;
        let step = Step {
            to: to.to_string(),
            transform: Arc::new(transform),
        };
        match self.steps.insert(from.to_string(), step) {
            Some(old) if old.to != to => {
                warn!(from, to, replaced = %old.to, "migration step now targets a different version")
            }
            Some(_) => debug!(from, to, "replaced migration step"),
            None => {}
        }
        Ok(())
    }

    pub fn clear(&mut self) {
        self.steps.clear();
    }

    /// Version every migration ends at.
    pub fn latest(&self) -> &str {
        &self.latest
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Registered `(from, to)` pairs, ordered by `from`.
    pub fn edges(&self) -> Vec<(&str, &str)> {
        self.steps.iter().map(|(from, s)| (from.as_str(), s.to.as_str())).collect()
    }

    pub(crate) fn step(&self, from: &str) -> Option<&Step> {
        self.steps.get(from)
    }
}

pub(crate) fn check_version(v: &str) -> Result<(), MigrationError> {
    v.parse::<Version>()
        .map(|_| ())
        .map_err(|_| MigrationError::InvalidVersion { version: v.to_string() })
}
