//! Round-robin instance selection.
//!
//! Pure rotation, no health weighting: the circuit breaker is the health
//! authority. Cursors are process-local by design.

use dashmap::DashMap;

#[derive(Debug, Default)]
struct ServicePool {
    instances: Vec<String>,
    cursor: usize,
}

/// Ordered instance URLs per service with a rotating cursor.
pub struct LoadBalancer {
    services: DashMap<String, ServicePool>,
}

impl LoadBalancer {
    pub fn new() -> Self {
        Self {
            services: DashMap::new(),
        }
    }

    pub fn from_config(services: &[crate::config::ServiceConfig]) -> Self {
        let balancer = Self::new();
        for service in services {
            for instance in &service.instances {
                balancer.add_instance(&service.name, instance);
            }
        }
        balancer
    }

    /// The instance at the cursor, advancing it modulo the list length.
    pub fn next_instance(&self, service: &str) -> Option<String> {
        let mut pool = self.services.get_mut(service)?;
        if pool.instances.is_empty() {
            return None;
        }
        let index = pool.cursor % pool.instances.len();
        let instance = pool.instances[index].clone();
        pool.cursor = (index + 1) % pool.instances.len();
        Some(instance)
    }

    /// Register an instance. Duplicates are ignored. Used for dynamic
    /// registration during deploys.
    pub fn add_instance(&self, service: &str, url: &str) {
        let mut pool = self.services.entry(service.to_string()).or_default();
        if !pool.instances.iter().any(|u| u == url) {
            pool.instances.push(url.to_string());
            tracing::info!(service = %service, instance = %url, "Registered instance");
        }
    }

    /// Deregister an instance; the cursor stays valid.
    pub fn remove_instance(&self, service: &str, url: &str) {
        if let Some(mut pool) = self.services.get_mut(service) {
            pool.instances.retain(|u| u != url);
            if !pool.instances.is_empty() {
                pool.cursor %= pool.instances.len();
            } else {
                pool.cursor = 0;
            }
            tracing::info!(service = %service, instance = %url, "Deregistered instance");
        }
    }

    /// Whether any instances are registered for the service.
    pub fn has_service(&self, service: &str) -> bool {
        self.services
            .get(service)
            .is_some_and(|pool| !pool.instances.is_empty())
    }
}

impl Default for LoadBalancer {
    fn default() -> Self {
        Self::new()
    }
}
