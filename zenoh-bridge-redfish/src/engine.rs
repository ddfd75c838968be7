//! Extraction of samples from fetched Redfish documents.
//!
//! A cycle visits every service in order and runs its queries one after the
//! other. For each query the document is fetched through a [`Transport`],
//! samples are extracted by [`extract_query`] and handed to a [`Dispatch`]
//! implementation. Failures are absorbed at the smallest possible scope: a
//! bad field skips one sample, a failed fetch skips one query.

use redfish_common::{SampleKind, SampleRecord};
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::dispatch::Dispatch;
use crate::model::{Attribute, ElementFilter, Property, Query, Resource, Selection, Service, TypeInstance};
use crate::registry::Registry;
use crate::selector::{Element, elements, field_label, get_field, member_id, select_by_index, select_by_value};
use crate::transport::Transport;
use crate::value::{RawValue, convert};

/// Samples extracted from one document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    pub records: Vec<SampleRecord>,
    /// Samples that matched the configuration but could not be produced.
    pub skipped: usize,
}

/// Counters for one collection cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleStats {
    pub queries_run: usize,
    pub queries_failed: usize,
    pub samples_dispatched: usize,
    pub samples_skipped: usize,
    pub dispatch_failed: usize,
}

impl CycleStats {
    pub fn merge(&mut self, other: CycleStats) {
        self.queries_run += other.queries_run;
        self.queries_failed += other.queries_failed;
        self.samples_dispatched += other.samples_dispatched;
        self.samples_skipped += other.samples_skipped;
        self.dispatch_failed += other.dispatch_failed;
    }
}

/// Extract every sample `query` describes from `document`.
///
/// `service` is the host identity stamped on the records.
pub fn extract_query(service: &str, query: &Query, document: &Value) -> Extraction {
    let mut extractor = Extractor {
        service,
        query,
        out: Extraction::default(),
    };

    match &query.selection {
        Selection::Resources(resources) => {
            for resource in resources {
                extractor.resource(resource, document);
            }
        }
        Selection::Attributes(attributes) => {
            for attribute in attributes {
                extractor.attribute(attribute, document);
            }
        }
    }

    extractor.out
}

struct Extractor<'a> {
    service: &'a str,
    query: &'a Query,
    out: Extraction,
}

/// Identification shared by the samples read from one element.
struct Labels<'a> {
    plugin_instance: &'a str,
    type_name: &'a str,
    kind: SampleKind,
}

impl Extractor<'_> {
    fn resource(&mut self, resource: &Resource, document: &Value) {
        let Some(node) = resource.selector.select(document) else {
            debug!(
                query = %self.query.name,
                resource = %resource.selector,
                "Resource not present in document"
            );
            return;
        };

        let all = elements(node);
        if all.is_empty() {
            debug!(
                query = %self.query.name,
                resource = %resource.selector,
                "Resource is neither an object nor an array"
            );
            return;
        }

        for property in &resource.properties {
            let selected = match &property.filter {
                ElementFilter::All => all.clone(),
                ElementFilter::Ids(ids) => select_by_index(&all, ids),
                ElementFilter::AttrValues(pairs) => pairs
                    .iter()
                    .fold(all.clone(), |kept, (key, value)| select_by_value(&kept, key, value)),
            };

            for element in &selected {
                self.property(resource, property, element);
            }
        }
    }

    fn property(&mut self, resource: &Resource, property: &Property, element: &Element<'_>) {
        let plugin_instance = property
            .plugin_instance
            .clone()
            .or_else(|| get_field(element.node, "Name").and_then(field_label))
            .unwrap_or_else(|| resource.selector.to_string());

        let label = match &property.type_instance {
            TypeInstance::Literal(label) => label.clone(),
            TypeInstance::Attr(attr) => match get_field(element.node, attr).and_then(field_label) {
                Some(label) => label,
                None => {
                    debug!(
                        query = %self.query.name,
                        property = %property.name,
                        attr = %attr,
                        position = element.position,
                        "Element has no type instance attribute"
                    );
                    self.out.skipped += 1;
                    return;
                }
            },
            TypeInstance::MemberId => member_id(element),
        };
        let label = if property.prefix_id {
            format!("{}-{}", member_id(element), label)
        } else {
            label
        };

        let labels = Labels {
            plugin_instance: &plugin_instance,
            type_name: &property.type_name,
            kind: property.kind,
        };

        self.emit(
            &property.name,
            get_field(element.node, &property.name),
            &labels,
            label.clone(),
        );

        for attr in &property.select_attrs {
            self.emit(
                attr,
                get_field(element.node, attr),
                &labels,
                format!("{}-{}", label, attr),
            );
        }
    }

    fn attribute(&mut self, attribute: &Attribute, document: &Value) {
        let plugin_instance = attribute
            .plugin_instance
            .clone()
            .or_else(|| get_field(document, "Name").and_then(field_label))
            .unwrap_or_else(|| self.query.name.clone());
        let type_instance = attribute
            .type_instance
            .clone()
            .unwrap_or_else(|| attribute.selector.last_name().to_string());

        let labels = Labels {
            plugin_instance: &plugin_instance,
            type_name: &attribute.type_name,
            kind: attribute.kind,
        };

        self.emit(
            &attribute.selector.to_string(),
            attribute.selector.select(document),
            &labels,
            type_instance,
        );
    }

    /// Convert one field and queue the resulting record.
    fn emit(&mut self, field: &str, value: Option<&Value>, labels: &Labels<'_>, type_instance: String) {
        let Some(value) = value else {
            debug!(query = %self.query.name, field = %field, "Field not present");
            self.out.skipped += 1;
            return;
        };

        let Some(raw) = RawValue::from_json(value) else {
            debug!(query = %self.query.name, field = %field, "Field is not a scalar");
            self.out.skipped += 1;
            return;
        };

        if raw.is_boolean() {
            debug!(query = %self.query.name, field = %field, "Skipping boolean field");
            self.out.skipped += 1;
            return;
        }

        match convert(&raw, labels.kind) {
            Ok(sample) => {
                let record = SampleRecord::new(
                    self.service,
                    labels.plugin_instance,
                    labels.type_name,
                    type_instance,
                    sample,
                );
                trace!(id = %record.identifier(), value = %record.value, "Extracted sample");
                self.out.records.push(record);
            }
            Err(e) => {
                warn!(
                    service = %self.service,
                    query = %self.query.name,
                    field = %field,
                    error = %e,
                    "Failed to convert value"
                );
                self.out.skipped += 1;
            }
        }
    }
}

/// Runs collection cycles over a [`Registry`].
#[derive(Debug)]
pub struct Engine<T, D> {
    transport: T,
    dispatcher: D,
}

impl<T: Transport, D: Dispatch> Engine<T, D> {
    pub fn new(transport: T, dispatcher: D) -> Self {
        Self {
            transport,
            dispatcher,
        }
    }

    pub fn dispatcher(&self) -> &D {
        &self.dispatcher
    }

    /// Run one cycle: every service, in configuration order.
    pub async fn collect(&self, registry: &Registry) -> CycleStats {
        let mut stats = CycleStats::default();

        for service in registry.services() {
            stats.merge(self.collect_service(registry, service).await);
        }

        debug!(
            queries_run = stats.queries_run,
            queries_failed = stats.queries_failed,
            dispatched = stats.samples_dispatched,
            skipped = stats.samples_skipped,
            dispatch_failed = stats.dispatch_failed,
            "Collection cycle complete"
        );

        stats
    }

    /// Run the queries of one service.
    pub async fn collect_service(&self, registry: &Registry, service: &Service) -> CycleStats {
        let mut stats = CycleStats::default();

        for name in &service.queries {
            let Some(query) = registry.query(name) else {
                warn!(service = %service.name, query = %name, "Query is not defined");
                stats.queries_failed += 1;
                continue;
            };

            let document = match self.transport.fetch(service, &query.endpoint).await {
                Ok(document) => document,
                Err(e) => {
                    warn!(
                        service = %service.name,
                        query = %query.name,
                        endpoint = %query.endpoint,
                        error = %e,
                        "Failed to fetch endpoint"
                    );
                    stats.queries_failed += 1;
                    continue;
                }
            };
            stats.queries_run += 1;

            let extraction = extract_query(&service.name, query, &document);
            stats.samples_skipped += extraction.skipped;

            for record in extraction.records {
                let id = record.identifier();
                match self.dispatcher.dispatch(record).await {
                    Ok(()) => stats.samples_dispatched += 1,
                    Err(e) => {
                        warn!(service = %service.name, id = %id, error = %e, "Failed to dispatch sample");
                        stats.dispatch_failed += 1;
                    }
                }
            }
        }

        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::DispatchError;
    use crate::selector::Selector;
    use crate::transport::TransportError;
    use redfish_common::Sample;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Mutex;

    fn thermal() -> Value {
        json!({
            "Name": "Thermal",
            "Fans": [
                { "MemberId": "0", "Name": "BaseBoard System Fan", "Reading": 2100, "ReadingUnits": "RPM",
                  "LowerThresholdFatal": 0, "Status": { "State": "Enabled" } },
                { "MemberId": "1", "Name": "BaseBoard System Fan Backup", "Reading": 2050, "ReadingUnits": "RPM",
                  "LowerThresholdFatal": 0 }
            ],
            "Temperatures": [
                { "MemberId": "0", "Name": "CPU1 Temp", "ReadingCelsius": 41, "PhysicalContext": "CPU" },
                { "MemberId": "1", "Name": "Inlet Temp", "ReadingCelsius": 22.5, "PhysicalContext": "Intake" },
                { "Id": "Board", "ReadingCelsius": "30", "PhysicalContext": "SystemBoard" },
                { "ReadingCelsius": true, "PhysicalContext": "Intake" }
            ]
        })
    }

    fn resource_query(resource: &str, properties: Vec<Property>) -> Query {
        Query {
            name: "thermal".to_string(),
            endpoint: "/Chassis[0]/Thermal".to_string(),
            selection: Selection::Resources(vec![Resource {
                selector: Selector::parse(resource).unwrap(),
                properties,
            }]),
        }
    }

    fn labels(extraction: &Extraction) -> Vec<(&str, &str)> {
        extraction
            .records
            .iter()
            .map(|r| (r.plugin_instance.as_str(), r.type_instance.as_str()))
            .collect()
    }

    #[test]
    fn test_select_ids_with_type_instance_attr() {
        let mut property = Property::new("Reading", "fanspeed", SampleKind::Gauge);
        property.plugin_instance = Some("Fans".to_string());
        property.type_instance = TypeInstance::Attr("Name".to_string());
        property.filter = ElementFilter::Ids(vec![1]);

        let out = extract_query("mock1U", &resource_query("Fans", vec![property]), &thermal());

        assert_eq!(out.records.len(), 1);
        let record = &out.records[0];
        assert_eq!(record.host, "mock1U");
        assert_eq!(record.plugin, "redfish");
        assert_eq!(record.plugin_instance, "Fans");
        assert_eq!(record.type_name, "fanspeed");
        assert_eq!(record.type_instance, "BaseBoard System Fan");
        assert_eq!(record.value, Sample::Gauge(2100.0));
        assert_eq!(out.skipped, 0);
    }

    #[test]
    fn test_select_attr_value() {
        let mut property = Property::new("ReadingCelsius", "temperature", SampleKind::Gauge);
        property.plugin_instance = Some("Temperatures".to_string());
        property.filter = ElementFilter::AttrValues(vec![
            ("PhysicalContext".to_string(), "Intake".to_string()),
            ("Name".to_string(), "Inlet Temp".to_string()),
        ]);

        let out = extract_query("mock1U", &resource_query("Temperatures", vec![property]), &thermal());

        assert_eq!(labels(&out), vec![("Temperatures", "1")]);
        assert_eq!(out.records[0].value, Sample::Gauge(22.5));
    }

    #[test]
    fn test_default_labels_and_skips() {
        let property = Property::new("ReadingCelsius", "temperature", SampleKind::Gauge);

        let out = extract_query("mock1U", &resource_query("Temperatures", vec![property]), &thermal());

        // Plugin instance falls back to the element name, then to the resource.
        assert_eq!(
            labels(&out),
            vec![
                ("CPU1 Temp", "0"),
                ("Inlet Temp", "1"),
                ("Temperatures", "Board"),
            ]
        );
        assert_eq!(out.records[2].value, Sample::Gauge(30.0));
        // The boolean reading.
        assert_eq!(out.skipped, 1);
    }

    #[test]
    fn test_prefix_id_and_literal() {
        let doc = json!({
            "Voltages": [
                { "MemberId": "0", "ReadingVolts": 12.1 },
                { "MemberId": "1", "ReadingVolts": 3.3 },
                { "ReadingVolts": 5 }
            ]
        });
        let mut property = Property::new("ReadingVolts", "voltage", SampleKind::Gauge);
        property.plugin_instance = Some("Voltages".to_string());
        property.type_instance = TypeInstance::Literal("VRM".to_string());
        property.prefix_id = true;

        let out = extract_query("mock1U", &resource_query("Voltages", vec![property]), &doc);

        assert_eq!(
            labels(&out),
            vec![("Voltages", "0-VRM"), ("Voltages", "1-VRM"), ("Voltages", "3-VRM")]
        );
    }

    #[test]
    fn test_select_attrs() {
        let mut property = Property::new("Reading", "fanspeed", SampleKind::Gauge);
        property.plugin_instance = Some("Fans".to_string());
        property.filter = ElementFilter::Ids(vec![1]);
        property.select_attrs = vec![
            "LowerThresholdFatal".to_string(),
            "ReadingUnits".to_string(),
            "Status".to_string(),
            "Missing".to_string(),
        ];

        let out = extract_query("mock1U", &resource_query("Fans", vec![property]), &thermal());

        assert_eq!(labels(&out), vec![("Fans", "0"), ("Fans", "0-LowerThresholdFatal")]);
        assert_eq!(out.records[1].value, Sample::Gauge(0.0));
        // Non-numeric, non-scalar and missing fields.
        assert_eq!(out.skipped, 3);
    }

    #[test]
    fn test_missing_type_instance_attr_skips_element() {
        let mut property = Property::new("ReadingCelsius", "temperature", SampleKind::Gauge);
        property.type_instance = TypeInstance::Attr("Name".to_string());

        let out = extract_query("mock1U", &resource_query("Temperatures", vec![property]), &thermal());

        assert_eq!(out.records.len(), 2);
        assert_eq!(out.skipped, 2);
    }

    #[test]
    fn test_single_object_resource() {
        let doc = json!({ "Status": { "Name": "Chassis", "Health": "OK", "Uptime": 3600 } });
        let property = Property::new("Uptime", "uptime", SampleKind::Gauge);

        let out = extract_query("mock1U", &resource_query("Status", vec![property]), &doc);

        assert_eq!(labels(&out), vec![("Chassis", "1")]);
    }

    #[test]
    fn test_structural_anomalies_are_skipped() {
        let property = Property::new("Reading", "fanspeed", SampleKind::Gauge);
        let query = resource_query("Fans", vec![property]);

        for doc in [json!({}), json!({ "Fans": "none" }), json!([1, 2]), json!({ "Fans": [] })] {
            let out = extract_query("mock1U", &query, &doc);
            assert!(out.records.is_empty());
            assert_eq!(out.skipped, 0);
        }
    }

    #[test]
    fn test_conversion_errors_are_skipped() {
        let doc = json!({ "Items": [ { "Abc": -5 }, { "Abc": "n/a" }, { "Abc": 4567 } ] });
        let property = Property::new("Abc", "counter", SampleKind::Counter);

        let out = extract_query("localhost", &resource_query("Items", vec![property]), &doc);

        assert_eq!(out.records.len(), 1);
        assert_eq!(out.records[0].value, Sample::Counter(4567));
        assert_eq!(out.skipped, 2);
    }

    #[test]
    fn test_large_counters_are_exact() {
        let doc = json!({ "Items": [
            { "Abc": 18446744073709551615u64 },
            { "Abc": 9223372036854775809u64 }
        ] });
        let property = Property::new("Abc", "counter", SampleKind::Counter);

        let out = extract_query("localhost", &resource_query("Items", vec![property]), &doc);

        let values: Vec<Sample> = out.records.iter().map(|r| r.value).collect();
        assert_eq!(
            values,
            vec![
                Sample::Counter(u64::MAX),
                Sample::Counter(9_223_372_036_854_775_809)
            ]
        );
        assert_eq!(out.skipped, 0);
    }

    #[test]
    fn test_derive_property() {
        let doc = json!({ "Items": [ { "Abc": 4567 } ] });
        let mut property = Property::new("Abc", "MAGIC", SampleKind::Derive);
        property.plugin_instance = Some("TestPluginInstance".to_string());
        property.type_instance = TypeInstance::Literal("TestTypeInstance".to_string());

        let out = extract_query("localhost", &resource_query("Items", vec![property]), &doc);
        let record = &out.records[0];

        assert_eq!(record.host, "localhost");
        assert_eq!(record.plugin, "redfish");
        assert_eq!(record.plugin_instance, "TestPluginInstance");
        assert_eq!(record.type_name, "MAGIC");
        assert_eq!(record.type_instance, "TestTypeInstance");
        assert_eq!(record.value, Sample::Derive(4567));
    }

    #[test]
    fn test_attributes() {
        let doc = json!({
            "Name": "PS1 Sensor",
            "Reading": "12.1",
            "Thresholds": { "UpperCritical": { "Reading": 13.2 } }
        });
        let mut literal = Attribute::new(Selector::parse("Reading").unwrap(), "voltage", SampleKind::Gauge);
        literal.plugin_instance = Some("Voltages".to_string());
        literal.type_instance = Some("PS1 Voltage".to_string());
        let nested = Attribute::new(
            Selector::parse("Thresholds/UpperCritical/Reading").unwrap(),
            "voltage",
            SampleKind::Gauge,
        );
        let missing = Attribute::new(Selector::parse("Power").unwrap(), "power", SampleKind::Gauge);

        let query = Query {
            name: "ps1_voltage".to_string(),
            endpoint: "/Chassis[0]/Sensors[15]".to_string(),
            selection: Selection::Attributes(vec![literal, nested, missing]),
        };

        let out = extract_query("mock1U", &query, &doc);

        assert_eq!(
            labels(&out),
            vec![("Voltages", "PS1 Voltage"), ("PS1 Sensor", "Reading")]
        );
        assert_eq!(out.records[0].value, Sample::Gauge(12.1));
        assert_eq!(out.records[1].value, Sample::Gauge(13.2));
        assert_eq!(out.skipped, 1);

        let unnamed = extract_query("mock1U", &query, &json!({ "Reading": 1 }));
        assert_eq!(unnamed.records[0].plugin_instance, "Voltages");
    }

    #[test]
    fn test_attribute_plugin_instance_falls_back_to_query_name() {
        let query = Query {
            name: "ps1_voltage".to_string(),
            endpoint: "/Chassis[0]/Sensors[15]".to_string(),
            selection: Selection::Attributes(vec![Attribute::new(
                Selector::parse("Reading").unwrap(),
                "voltage",
                SampleKind::Gauge,
            )]),
        };

        let out = extract_query("mock1U", &query, &json!({ "Reading": 12 }));

        assert_eq!(labels(&out), vec![("ps1_voltage", "Reading")]);
    }

    struct MockTransport {
        documents: HashMap<String, Value>,
    }

    impl Transport for MockTransport {
        async fn fetch(&self, _service: &Service, endpoint: &str) -> Result<Value, TransportError> {
            self.documents
                .get(endpoint)
                .cloned()
                .ok_or_else(|| TransportError::NotFound {
                    path: endpoint.to_string(),
                })
        }
    }

    #[derive(Default)]
    struct Recorder {
        records: Mutex<Vec<SampleRecord>>,
        reject_type: Option<String>,
    }

    impl Dispatch for Recorder {
        async fn dispatch(&self, record: SampleRecord) -> Result<(), DispatchError> {
            if self.reject_type.as_deref() == Some(record.type_name.as_str()) {
                return Err(DispatchError::Publish {
                    key: record.identifier(),
                    message: "rejected".to_string(),
                });
            }
            self.records.lock().unwrap().push(record);
            Ok(())
        }
    }

    fn registry(queries: Vec<Query>, service_queries: &[&str]) -> Registry {
        let mut registry = Registry::new();
        for query in queries {
            registry.insert_query(query).unwrap();
        }
        let mut service = Service::new("mock1U", "localhost:10000");
        service.queries = service_queries.iter().map(|q| q.to_string()).collect();
        registry.add_service(service).unwrap();
        registry
    }

    fn fans_query(name: &str, endpoint: &str) -> Query {
        let mut property = Property::new("Reading", "fanspeed", SampleKind::Gauge);
        property.plugin_instance = Some("Fans".to_string());
        Query {
            name: name.to_string(),
            endpoint: endpoint.to_string(),
            ..resource_query("Fans", vec![property])
        }
    }

    #[tokio::test]
    async fn test_failed_fetch_does_not_stop_the_service() {
        let transport = MockTransport {
            documents: HashMap::from([("/Chassis[0]/Thermal".to_string(), thermal())]),
        };
        let engine = Engine::new(transport, Recorder::default());
        let registry = registry(
            vec![
                fans_query("broken", "/Chassis[9]/Thermal"),
                fans_query("fans", "/Chassis[0]/Thermal"),
            ],
            &["broken", "undefined", "fans"],
        );

        let stats = engine.collect(&registry).await;

        assert_eq!(
            stats,
            CycleStats {
                queries_run: 1,
                queries_failed: 2,
                samples_dispatched: 2,
                samples_skipped: 0,
                dispatch_failed: 0,
            }
        );
        let records = engine.dispatcher().records.lock().unwrap();
        assert_eq!(records[0].type_instance, "0");
        assert_eq!(records[1].type_instance, "1");
    }

    #[tokio::test]
    async fn test_dispatch_failures_are_counted() {
        let transport = MockTransport {
            documents: HashMap::from([("/Chassis[0]/Thermal".to_string(), thermal())]),
        };
        let recorder = Recorder {
            reject_type: Some("fanspeed".to_string()),
            ..Default::default()
        };
        let engine = Engine::new(transport, recorder);
        let registry = registry(vec![fans_query("fans", "/Chassis[0]/Thermal")], &["fans", "fans"]);

        let stats = engine.collect(&registry).await;

        assert_eq!(stats.queries_run, 2);
        assert_eq!(stats.dispatch_failed, 4);
        assert_eq!(stats.samples_dispatched, 0);
        assert!(engine.dispatcher().records.lock().unwrap().is_empty());
    }

    #[test]
    fn test_stats_merge() {
        let mut total = CycleStats::default();
        total.merge(CycleStats {
            queries_run: 1,
            samples_dispatched: 3,
            ..Default::default()
        });
        total.merge(CycleStats {
            queries_failed: 1,
            samples_skipped: 2,
            dispatch_failed: 1,
            ..Default::default()
        });

        assert_eq!(total.queries_run, 1);
        assert_eq!(total.queries_failed, 1);
        assert_eq!(total.samples_dispatched, 3);
        assert_eq!(total.samples_skipped, 2);
        assert_eq!(total.dispatch_failed, 1);
    }
}
