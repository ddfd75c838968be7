//! Builds the [`Registry`] from the configuration tree.
//!
//! The tree is walked once. An invalid block is logged, recorded in
//! [`Loaded::warnings`] and dropped while its siblings are still loaded. Only
//! allocation failures abort loading.
//!
//! ```text
//! Service "mock1U"
//!     Host "localhost:10000"
//!     Queries "thermal"
//! Query "thermal"
//!     Endpoint "/Chassis[0]/Thermal"
//!     Resource "Fans"
//!         Property "Reading"
//!             Type "fanspeed"
//!             TypeInstanceAttr "Name"
//! ```

use tracing::{debug, info, warn};

use crate::config::{ConfigNode, ConfigValue};
use crate::error::ConfigError;
use crate::model::{
    Attribute, ElementFilter, Property, Query, Resource, Selection, Service, TypeInstance,
};
use crate::registry::Registry;
use crate::selector::Selector;
use crate::types::TypesDb;

/// Endpoints with this prefix are absolute Redfish URIs.
pub const REDFISH_URI_PREFIX: &str = "/redfish/";

/// Result of a successful load.
#[derive(Debug)]
pub struct Loaded {
    pub registry: Registry,
    /// Recoverable errors, one per dropped block.
    pub warnings: Vec<ConfigError>,
}

/// Load every `Service` and `Query` block of `blocks`.
pub fn load(blocks: &[ConfigNode], types: &TypesDb) -> Result<Loaded, ConfigError> {
    let mut loader = Loader {
        types,
        warnings: Vec::new(),
    };
    let mut registry = Registry::new();

    for node in blocks {
        if node.is("Service") {
            let service = loader.service(node);
            if let Some(service) = loader.recover(service)? {
                registry.add_service(service)?;
            }
        } else if node.is("Query") {
            let query = loader.query(node);
            if let Some(query) = loader.recover(query)? {
                let inserted = registry.insert_query(query);
                loader.recover(inserted)?;
            }
        } else {
            loader.unknown_key(node, "top level");
        }
    }

    for (service, query) in registry.unresolved() {
        warn!(service = %service, query = %query, "Service references an undefined query");
    }

    info!(
        services = registry.services().len(),
        queries = registry.query_count(),
        warnings = loader.warnings.len(),
        "Redfish configuration loaded"
    );

    Ok(Loaded {
        registry,
        warnings: loader.warnings,
    })
}

struct Loader<'a> {
    types: &'a TypesDb,
    warnings: Vec<ConfigError>,
}

impl Loader<'_> {
    /// Turn a recoverable error into a warning; pass fatal ones through.
    fn recover<T>(&mut self, result: Result<T, ConfigError>) -> Result<Option<T>, ConfigError> {
        match result {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                warn!(error = %e, "Ignoring invalid configuration block");
                push(&mut self.warnings, e)?;
                Ok(None)
            }
        }
    }

    fn unknown_key(&self, node: &ConfigNode, block: &str) {
        warn!(key = %node.key, block = %block, "Ignoring unknown configuration key");
    }

    fn service(&mut self, node: &ConfigNode) -> Result<Service, ConfigError> {
        let name = block_name(node)?;
        let block = format!("Service {}", name);
        let mut host = None;
        let mut service = Service::new(name, String::new());

        for child in &node.children {
            if child.is("Host") {
                host = Some(string_value(child, &block)?);
            } else if child.is("User") {
                service.user = Some(string_value(child, &block)?);
            } else if child.is("Passwd") {
                service.passwd = Some(string_value(child, &block)?);
            } else if child.is("Queries") {
                for name in string_values(child, &block)? {
                    push(&mut service.queries, name)?;
                }
            } else {
                self.unknown_key(child, &block);
            }
        }

        service.host = host.ok_or_else(|| missing(&block, "Host"))?;
        if service.queries.is_empty() {
            warn!(service = %service.name, "Service has no queries");
        }

        debug!(service = %service.name, host = %service.host, queries = ?service.queries, "Loaded service");
        Ok(service)
    }

    fn query(&mut self, node: &ConfigNode) -> Result<Query, ConfigError> {
        let name = block_name(node)?;
        let block = format!("Query {}", name);

        let has_resources = node.children.iter().any(|c| c.is("Resource"));
        let has_attributes = node.children.iter().any(|c| c.is("Attribute"));
        if has_resources && has_attributes {
            return Err(ConfigError::MixedSelection { query: name });
        }

        let mut endpoint = None;
        let mut resources = Vec::new();
        let mut attributes = Vec::new();

        for child in &node.children {
            if child.is("Endpoint") {
                let value = string_value(child, &block)?;
                if !value.starts_with(REDFISH_URI_PREFIX) {
                    Selector::parse(&value)?;
                }
                endpoint = Some(value);
            } else if child.is("Resource") {
                let resource = self.resource(child, &block);
                if let Some(resource) = self.recover(resource)? {
                    push(&mut resources, resource)?;
                }
            } else if child.is("Attribute") {
                let attribute = self.attribute(child, &block);
                if let Some(attribute) = self.recover(attribute)? {
                    push(&mut attributes, attribute)?;
                }
            } else {
                self.unknown_key(child, &block);
            }
        }

        let endpoint = endpoint.ok_or_else(|| missing(&block, "Endpoint"))?;
        let selection = if has_attributes {
            Selection::Attributes(attributes)
        } else {
            Selection::Resources(resources)
        };
        if selection.is_empty() {
            warn!(query = %name, "Query has nothing to extract");
        }

        debug!(query = %name, endpoint = %endpoint, "Loaded query");
        Ok(Query {
            name,
            endpoint,
            selection,
        })
    }

    fn resource(&mut self, node: &ConfigNode, parent: &str) -> Result<Resource, ConfigError> {
        let selector = Selector::parse(&string_value(node, parent)?)?;
        let block = format!("{} Resource {}", parent, selector);
        let mut properties = Vec::new();

        for child in &node.children {
            if child.is("Property") {
                let property = self.property(child, &block);
                if let Some(property) = self.recover(property)? {
                    push(&mut properties, property)?;
                }
            } else {
                self.unknown_key(child, &block);
            }
        }

        Ok(Resource {
            selector,
            properties,
        })
    }

    fn property(&mut self, node: &ConfigNode, parent: &str) -> Result<Property, ConfigError> {
        let name = string_value(node, parent)?;
        let block = format!("{} Property {}", parent, name);

        let mut plugin_instance = None;
        let mut type_name = None;
        let mut literal = None;
        let mut attr = None;
        let mut prefix_id = false;
        let mut ids = Vec::new();
        let mut attr_values = Vec::new();
        let mut select_attrs = Vec::new();

        for child in &node.children {
            if child.is("PluginInstance") {
                plugin_instance = Some(string_value(child, &block)?);
            } else if child.is("Type") {
                type_name = Some(string_value(child, &block)?);
            } else if child.is("TypeInstance") {
                literal = Some(string_value(child, &block)?);
            } else if child.is("TypeInstanceAttr") {
                attr = Some(string_value(child, &block)?);
            } else if child.is("TypeInstancePrefixID") {
                prefix_id = bool_value(child, &block)?;
            } else if child.is("SelectIDs") {
                if child.values.is_empty() {
                    return Err(missing(&block, &child.key));
                }
                ids.try_reserve(child.values.len())?;
                for value in &child.values {
                    ids.push(select_id(&child.key, value)?);
                }
            } else if child.is("SelectAttrs") {
                for field in string_values(child, &block)? {
                    push(&mut select_attrs, field)?;
                }
            } else if child.is("SelectAttrValue") {
                push(&mut attr_values, attr_value_pair(child, &block)?)?;
            } else {
                self.unknown_key(child, &block);
            }
        }

        if !ids.is_empty() && !attr_values.is_empty() {
            return Err(conflict(&block, "SelectIDs", "SelectAttrValue"));
        }
        if literal.is_some() && attr.is_some() {
            return Err(conflict(&block, "TypeInstance", "TypeInstanceAttr"));
        }

        let type_name = type_name.ok_or_else(|| missing(&block, "Type"))?;
        let kind = self.types.lookup(&type_name)?;

        let type_instance = match (literal, attr) {
            (Some(literal), _) => TypeInstance::Literal(literal),
            (None, Some(attr)) => TypeInstance::Attr(attr),
            (None, None) => TypeInstance::MemberId,
        };
        let filter = if !ids.is_empty() {
            ElementFilter::Ids(ids)
        } else if !attr_values.is_empty() {
            ElementFilter::AttrValues(attr_values)
        } else {
            ElementFilter::All
        };

        Ok(Property {
            name,
            plugin_instance,
            type_name,
            kind,
            type_instance,
            prefix_id,
            filter,
            select_attrs,
        })
    }

    fn attribute(&mut self, node: &ConfigNode, parent: &str) -> Result<Attribute, ConfigError> {
        let selector = Selector::parse(&string_value(node, parent)?)?;
        let block = format!("{} Attribute {}", parent, selector);

        let mut plugin_instance = None;
        let mut type_name = None;
        let mut type_instance = None;

        for child in &node.children {
            if child.is("PluginInstance") {
                plugin_instance = Some(string_value(child, &block)?);
            } else if child.is("Type") {
                type_name = Some(string_value(child, &block)?);
            } else if child.is("TypeInstance") {
                type_instance = Some(string_value(child, &block)?);
            } else {
                self.unknown_key(child, &block);
            }
        }

        let type_name = type_name.ok_or_else(|| missing(&block, "Type"))?;
        let kind = self.types.lookup(&type_name)?;

        Ok(Attribute {
            selector,
            plugin_instance,
            type_name,
            kind,
            type_instance,
        })
    }
}

fn push<T>(list: &mut Vec<T>, item: T) -> Result<(), ConfigError> {
    list.try_reserve(1)?;
    list.push(item);
    Ok(())
}

fn missing(block: &str, key: &str) -> ConfigError {
    ConfigError::MissingKey {
        block: block.to_string(),
        key: key.to_string(),
    }
}

fn conflict(block: &str, first: &str, second: &str) -> ConfigError {
    ConfigError::Conflict {
        block: block.to_string(),
        first: first.to_string(),
        second: second.to_string(),
    }
}

fn mismatch(key: &str, expected: &'static str, found: &ConfigValue) -> ConfigError {
    ConfigError::TypeMismatch {
        key: key.to_string(),
        expected,
        found: found.kind_name(),
    }
}

/// The string naming a `Service` or `Query` block.
fn block_name(node: &ConfigNode) -> Result<String, ConfigError> {
    match node.values.first() {
        None => Err(missing(&node.key, "name")),
        Some(ConfigValue::String(s)) => Ok(s.clone()),
        Some(other) => Err(mismatch(&node.key, "string", other)),
    }
}

fn string_value(node: &ConfigNode, block: &str) -> Result<String, ConfigError> {
    match node.values.first() {
        None => Err(missing(block, &node.key)),
        Some(ConfigValue::String(s)) => Ok(s.clone()),
        Some(other) => Err(mismatch(&node.key, "string", other)),
    }
}

fn string_values(node: &ConfigNode, block: &str) -> Result<Vec<String>, ConfigError> {
    if node.values.is_empty() {
        return Err(missing(block, &node.key));
    }

    let mut strings = Vec::new();
    strings.try_reserve(node.values.len())?;
    for value in &node.values {
        let s = value
            .as_str()
            .ok_or_else(|| mismatch(&node.key, "string", value))?;
        strings.push(s.to_string());
    }
    Ok(strings)
}

fn bool_value(node: &ConfigNode, block: &str) -> Result<bool, ConfigError> {
    match node.values.first() {
        None => Err(missing(block, &node.key)),
        Some(ConfigValue::Boolean(b)) => Ok(*b),
        Some(other) => Err(mismatch(&node.key, "boolean", other)),
    }
}

fn select_id(key: &str, value: &ConfigValue) -> Result<usize, ConfigError> {
    match value {
        ConfigValue::Number(n) if n.fract() == 0.0 && (1.0..=u32::MAX as f64).contains(n) => {
            Ok(*n as usize)
        }
        ConfigValue::Number(n) => Err(ConfigError::InvalidId {
            value: n.to_string(),
        }),
        other => Err(mismatch(key, "number", other)),
    }
}

fn attr_value_pair(node: &ConfigNode, block: &str) -> Result<(String, String), ConfigError> {
    let strings = string_values(node, block)?;
    match <[String; 2]>::try_from(strings) {
        Ok([key, value]) => Ok((key, value)),
        Err(_) => Err(missing(block, "SelectAttrValue value")),
    }
}
