//! Loaded services and queries.

use std::collections::HashMap;

use crate::error::ConfigError;
use crate::model::{Query, Service};

/// Services in configuration order and the queries they reference, by name.
///
/// Built once when the collector starts and read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Registry {
    services: Vec<Service>,
    queries: HashMap<String, Query>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a service.
    pub fn add_service(&mut self, service: Service) -> Result<(), ConfigError> {
        self.services.try_reserve(1)?;
        self.services.push(service);
        Ok(())
    }

    /// Register a query under its name.
    ///
    /// A name that is already taken is rejected and the registered query is
    /// left untouched.
    pub fn insert_query(&mut self, query: Query) -> Result<(), ConfigError> {
        if self.queries.contains_key(&query.name) {
            return Err(ConfigError::DuplicateQuery { name: query.name });
        }
        self.queries.try_reserve(1)?;
        self.queries.insert(query.name.clone(), query);
        Ok(())
    }

    pub fn query(&self, name: &str) -> Option<&Query> {
        self.queries.get(name)
    }

    pub fn services(&self) -> &[Service] {
        &self.services
    }

    pub fn query_count(&self) -> usize {
        self.queries.len()
    }

    /// `(service, query)` pairs whose query is not registered.
    pub fn unresolved(&self) -> impl Iterator<Item = (&str, &str)> {
        self.services.iter().flat_map(move |service| {
            service
                .queries
                .iter()
                .filter(move |name| !self.queries.contains_key(name.as_str()))
                .map(move |name| (service.name.as_str(), name.as_str()))
        })
    }
}
