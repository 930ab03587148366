//! Applying configuration documents to the running system.
//!
//! [`ConfigurationApplier`] is the seam between the coordinator and whatever
//! actually runs blocks and services. [`RegistryApplier`] is the in-process
//! implementation: it keeps a registry of named entities and tracks which
//! services are running.
//!
//! # Contract
//! - Entities are applied one at a time. A failure leaves every entity either
//!   fully old or fully new, but the document as a whole is not atomic.
//! - `delete_missing` only prunes collections the document actually carries,
//!   so a document without `services` never deletes services.
//! - Without `start_stop_services`, running state is never touched and a
//!   running service that would be deleted is retained instead.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::deployment::document::{ConfigurationDocument, BLOCKS, BLOCK_TYPES, SERVICES};
use crate::deployment::UpdatePolicy;
use crate::observability::metrics;

/// Errors raised while applying a document.
#[derive(Debug, Error)]
pub enum ApplyError {
    /// An entry in one of the collections is not a definition object.
    #[error("{kind} '{name}' is invalid: {reason}")]
    InvalidEntity {
        kind: &'static str,
        name: String,
        reason: String,
    },

    /// The applier refused the document for any other reason.
    #[error("{0}")]
    Rejected(String),
}

/// What an update changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApplyReport {
    /// Entities created or whose definition changed.
    pub updated: usize,
    /// Entities removed because the document no longer lists them.
    pub deleted: usize,
    pub started: usize,
    pub stopped: usize,
    /// Running services kept although absent, because stopping was not allowed.
    pub retained: usize,
}

/// Applies a validated document to the running system.
#[async_trait]
pub trait ConfigurationApplier: Send + Sync {
    async fn update(
        &self,
        document: &ConfigurationDocument,
        policy: UpdatePolicy,
    ) -> Result<ApplyReport, ApplyError>;
}

#[derive(Debug, Clone)]
struct ServiceEntry {
    definition: Value,
    running: bool,
}

#[derive(Debug, Default)]
struct Registry {
    block_types: BTreeMap<String, Value>,
    blocks: BTreeMap<String, Value>,
    services: BTreeMap<String, ServiceEntry>,
}

/// In-memory registry of blocks, block types and services.
#[derive(Debug, Default)]
pub struct RegistryApplier {
    registry: RwLock<Registry>,
}

impl RegistryApplier {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn block_names(&self) -> Vec<String> {
        self.registry.read().await.blocks.keys().cloned().collect()
    }

    pub async fn block_type_names(&self) -> Vec<String> {
        self.registry.read().await.block_types.keys().cloned().collect()
    }

    pub async fn service_names(&self) -> Vec<String> {
        self.registry.read().await.services.keys().cloned().collect()
    }

    pub async fn running_services(&self) -> Vec<String> {
        self.registry
            .read()
            .await
            .services
            .iter()
            .filter(|(_, entry)| entry.running)
            .map(|(name, _)| name.clone())
            .collect()
    }
}

fn check_definitions(kind: &'static str, entries: Option<&Map<String, Value>>) -> Result<(), ApplyError> {
    for (name, definition) in entries.into_iter().flatten() {
        if !definition.is_object() {
            return Err(ApplyError::InvalidEntity {
                kind,
                name: name.clone(),
                reason: "definition must be an object".to_string(),
            });
        }
    }
    Ok(())
}

fn auto_start(definition: &Value) -> bool {
    definition
        .get("auto_start")
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

/// Upsert plain definitions and prune missing ones. Returns (updated, deleted).
fn sync_definitions(
    current: &mut BTreeMap<String, Value>,
    incoming: Option<&Map<String, Value>>,
    delete_missing: bool,
) -> (usize, usize) {
    let Some(incoming) = incoming else {
        return (0, 0);
    };

    let mut updated = 0;
    for (name, definition) in incoming {
        if current.get(name) != Some(definition) {
            current.insert(name.clone(), definition.clone());
            updated += 1;
        }
    }

    let mut deleted = 0;
    if delete_missing {
        let before = current.len();
        current.retain(|name, _| incoming.contains_key(name));
        deleted = before - current.len();
    }
    (updated, deleted)
}

#[async_trait]
impl ConfigurationApplier for RegistryApplier {
    async fn update(
        &self,
        document: &ConfigurationDocument,
        policy: UpdatePolicy,
    ) -> Result<ApplyReport, ApplyError> {
        check_definitions(BLOCK_TYPES, document.block_types())?;
        check_definitions(BLOCKS, document.blocks())?;
        check_definitions(SERVICES, document.services())?;

        let mut guard = self.registry.write().await;
        let registry = &mut *guard;
        let mut report = ApplyReport::default();

        // Types before blocks, blocks before the services that group them.
        for (current, incoming) in [
            (&mut registry.block_types, document.block_types()),
            (&mut registry.blocks, document.blocks()),
        ] {
            let (updated, deleted) = sync_definitions(current, incoming, policy.delete_missing);
            report.updated += updated;
            report.deleted += deleted;
        }

        if let Some(services) = document.services() {
            for (name, definition) in services {
                match registry.services.get_mut(name) {
                    Some(entry) if entry.definition == *definition => {}
                    Some(entry) => {
                        let restart = entry.running && policy.start_stop_services;
                        if restart {
                            report.stopped += 1;
                        }
                        entry.definition = definition.clone();
                        if restart {
                            report.started += 1;
                        }
                        report.updated += 1;
                        tracing::debug!(service = %name, restarted = restart, "Service definition updated");
                    }
                    None => {
                        let running = policy.start_stop_services && auto_start(definition);
                        if running {
                            report.started += 1;
                        }
                        registry.services.insert(
                            name.clone(),
                            ServiceEntry {
                                definition: definition.clone(),
                                running,
                            },
                        );
                        report.updated += 1;
                        tracing::debug!(service = %name, started = running, "Service created");
                    }
                }
            }

            if policy.delete_missing {
                let missing: Vec<String> = registry
                    .services
                    .keys()
                    .filter(|name| !services.contains_key(*name))
                    .cloned()
                    .collect();

                for name in missing {
                    let running = registry.services.get(&name).is_some_and(|entry| entry.running);
                    if running && !policy.start_stop_services {
                        tracing::warn!(service = %name, "Keeping running service; stopping services is disabled");
                        report.retained += 1;
                        continue;
                    }
                    if running {
                        report.stopped += 1;
                    }
                    registry.services.remove(&name);
                    report.deleted += 1;
                }
            }
        }

        metrics::record_registry_size("block_types", registry.block_types.len());
        metrics::record_registry_size("blocks", registry.blocks.len());
        metrics::record_registry_size("services", registry.services.len());

        Ok(report)
    }
}
