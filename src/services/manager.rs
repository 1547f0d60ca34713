//! Services manager for long-running and background services.
//!
//! Services register with the manager and are started/stopped together.
//! Start order respects [dependencies](Service::dependencies); a service is only
//! started after all of its dependencies.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::future::join_all;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Health status of a service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Result of a service health check.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceHealth {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ServiceHealth {
    pub fn healthy() -> Self {
        Self {
            status: HealthStatus::Healthy,
            message: None,
        }
    }

    pub fn degraded(message: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Degraded,
            message: Some(message.into()),
        }
    }

    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Unhealthy,
            message: Some(message.into()),
        }
    }
}

/// A service that can be started, stopped and health-checked by the manager.
///
/// Log lifecycle events with [tracing] and a `service` field so they are
/// filterable (e.g. `tracing::info!(service = %self.name(), "Started")`).
#[async_trait]
pub trait Service: Send + Sync + 'static {
    /// Unique name for logging and lookup (e.g. "database", "scan").
    fn name(&self) -> &str;

    /// Names of services that must be started before this one. Cycles are an error.
    fn dependencies(&self) -> Vec<String> {
        Vec::new()
    }

    /// Start background tasks or connections. Must be idempotent.
    async fn start(&self) -> Result<()>;

    /// Stop background tasks and release resources. Must be idempotent.
    async fn stop(&self) -> Result<()>;

    async fn health(&self) -> Result<ServiceHealth> {
        Ok(ServiceHealth::healthy())
    }
}

/// Registry and lifecycle controller for services.
#[derive(Default)]
pub struct ServicesManager {
    services: RwLock<HashMap<String, Arc<dyn Service>>>,
    started: RwLock<HashSet<String>>,
}

impl ServicesManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a service. Does not start it. A service with the same name
    /// is replaced without being stopped.
    pub async fn register(&self, service: Arc<dyn Service>) {
        let name = service.name().to_string();
        let mut guard = self.services.write().await;
        if guard.insert(name.clone(), service).is_some() {
            warn!(service = %name, "Service '{}' reregistered, overwriting previous", name);
        } else {
            info!(service = %name, "Service '{}' registered", name);
        }
    }

    /// Compute start order from dependencies (topological order). Returns an
    /// error on unknown deps or cycles.
    async fn start_order(&self) -> Result<Vec<String>> {
        let guard = self.services.read().await;
        let mut names: Vec<String> = guard.keys().cloned().collect();
        names.sort();
        let mut deps: HashMap<String, Vec<String>> = HashMap::new();
        for (name, svc) in guard.iter() {
            let d = svc.dependencies();
            if let Some(dep) = d.iter().find(|dep| !guard.contains_key(*dep)) {
                anyhow::bail!("Service {} depends on {} which is not registered", name, dep);
            }
            deps.insert(name.clone(), d);
        }
        drop(guard);

        // Kahn's algorithm: dependencies first
        let mut in_degree: HashMap<&str, usize> = deps
            .iter()
            .map(|(name, d)| (name.as_str(), d.len()))
            .collect();
        let mut dependents: HashMap<&str, Vec<&str>> = HashMap::new();
        for (name, d) in &deps {
            for dep in d {
                dependents.entry(dep.as_str()).or_default().push(name.as_str());
            }
        }

        let mut ready: Vec<&str> = names
            .iter()
            .map(String::as_str)
            .filter(|n| in_degree.get(n) == Some(&0))
            .collect();
        let mut order = Vec::with_capacity(names.len());
        while let Some(n) = ready.pop() {
            order.push(n.to_string());
            for s in dependents.get(n).into_iter().flatten() {
                if let Some(deg) = in_degree.get_mut(s) {
                    *deg -= 1;
                    if *deg == 0 {
                        ready.push(*s);
                    }
                }
            }
        }
        if order.len() != names.len() {
            anyhow::bail!("Service dependency cycle detected");
        }
        Ok(order)
    }

    /// Start all registered services in dependency order.
    /// Returns an error on unknown dependency, cycle, or if any start fails.
    pub async fn start_all(&self) -> Result<()> {
        let order = self.start_order().await?;
        for name in &order {
            let Some(svc) = self.get(name).await else {
                continue;
            };
            if let Err(e) = svc.start().await {
                warn!(service = %name, error = %e, "Service '{}' start failed", name);
                return Err(e).context(format!("failed to start service {}", name));
            }
            self.started.write().await.insert(name.clone());
            info!(service = %name, "Service '{}' started", name);
        }
        Ok(())
    }

    /// Stop all registered services in reverse dependency order (dependents first).
    pub async fn stop_all(&self) -> Result<()> {
        let order = self.start_order().await?;
        for name in order.into_iter().rev() {
            let Some(svc) = self.get(&name).await else {
                continue;
            };
            if let Err(e) = svc.stop().await {
                warn!(service = %name, error = %e, "Service '{}' stop failed", name);
            } else {
                info!(service = %name, "Service '{}' stopped", name);
            }
            self.started.write().await.remove(&name);
        }
        Ok(())
    }

    /// Health check for all registered services. Services whose check fails
    /// are reported as [Unhealthy](HealthStatus::Unhealthy).
    pub async fn health_all(&self) -> HashMap<String, ServiceHealth> {
        let services: Vec<(String, Arc<dyn Service>)> = self
            .services
            .read()
            .await
            .iter()
            .map(|(n, s)| (n.clone(), s.clone()))
            .collect();

        join_all(services.into_iter().map(|(name, svc)| async move {
            let health = svc
                .health()
                .await
                .unwrap_or_else(|e| ServiceHealth::unhealthy(e.to_string()));
            (name, health)
        }))
        .await
        .into_iter()
        .collect()
    }

    pub async fn is_started(&self, name: &str) -> bool {
        self.started.read().await.contains(name)
    }

    pub async fn get(&self, name: &str) -> Option<Arc<dyn Service>> {
        self.services.read().await.get(name).cloned()
    }
}
