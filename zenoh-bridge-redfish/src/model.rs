//! Collector model: services, the queries they run and what each query
//! extracts from the fetched document.

use redfish_common::SampleKind;

use crate::selector::Selector;

/// A Redfish management endpoint to poll.
#[derive(Debug, Clone, PartialEq)]
pub struct Service {
    /// Host identity of every sample read from this service.
    pub name: String,

    /// Connection target, `host[:port]` or a full base URL.
    pub host: String,

    pub user: Option<String>,
    pub passwd: Option<String>,

    /// Names of the queries to run, in order.
    pub queries: Vec<String>,
}

impl Service {
    pub fn new(name: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            user: None,
            passwd: None,
            queries: Vec::new(),
        }
    }

    /// Basic auth credentials. An empty user disables authentication.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        let user = self.user.as_deref().filter(|u| !u.is_empty())?;
        Some((user, self.passwd.as_deref().unwrap_or_default()))
    }
}

/// A named request against a service and the extraction rules for its
/// response.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub name: String,
    pub endpoint: String,
    pub selection: Selection,
}

/// What a query extracts. A query holds resources or attributes, never both.
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    Resources(Vec<Resource>),
    Attributes(Vec<Attribute>),
}

impl Default for Selection {
    fn default() -> Self {
        Selection::Resources(Vec::new())
    }
}

impl Selection {
    pub fn is_empty(&self) -> bool {
        match self {
            Selection::Resources(resources) => resources.is_empty(),
            Selection::Attributes(attributes) => attributes.is_empty(),
        }
    }
}

/// A sub-tree of the response holding one object or an array of objects.
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    pub selector: Selector,
    pub properties: Vec<Property>,
}

/// A single scalar field of the response.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub selector: Selector,
    pub plugin_instance: Option<String>,
    pub type_name: String,
    pub kind: SampleKind,
    pub type_instance: Option<String>,
}

impl Attribute {
    pub fn new(selector: Selector, type_name: impl Into<String>, kind: SampleKind) -> Self {
        Self {
            selector,
            plugin_instance: None,
            type_name: type_name.into(),
            kind,
            type_instance: None,
        }
    }
}

/// Where the type-instance label of a property sample comes from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TypeInstance {
    /// Fixed label.
    Literal(String),
    /// Value of this field in the element. Elements without it are skipped.
    Attr(String),
    /// The element's `MemberId`, else `Id`, else its position.
    #[default]
    MemberId,
}

/// Which elements of a resource a property reads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ElementFilter {
    #[default]
    All,
    /// 1-based element positions.
    Ids(Vec<usize>),
    /// Every `(key, value)` pair must match.
    AttrValues(Vec<(String, String)>),
}

/// A field read from every selected element of a resource.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub name: String,
    pub plugin_instance: Option<String>,
    pub type_name: String,
    pub kind: SampleKind,
    pub type_instance: TypeInstance,
    pub prefix_id: bool,
    pub filter: ElementFilter,
    /// Extra fields read from the same elements, labelled `<label>-<field>`.
    pub select_attrs: Vec<String>,
}

impl Property {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>, kind: SampleKind) -> Self {
        Self {
            name: name.into(),
            plugin_instance: None,
            type_name: type_name.into(),
            kind,
            type_instance: TypeInstance::default(),
            prefix_id: false,
            filter: ElementFilter::default(),
            select_attrs: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials() {
        let mut service = Service::new("mock1U", "localhost:10000");
        assert_eq!(service.credentials(), None);

        service.user = Some(String::new());
        service.passwd = Some("secret".to_string());
        assert_eq!(service.credentials(), None);

        service.user = Some("admin".to_string());
        assert_eq!(service.credentials(), Some(("admin", "secret")));

        service.passwd = None;
        assert_eq!(service.credentials(), Some(("admin", "")));
    }

    #[test]
    fn test_property_defaults() {
        let property = Property::new("Reading", "fanspeed", SampleKind::Gauge);

        assert_eq!(property.type_instance, TypeInstance::MemberId);
        assert_eq!(property.filter, ElementFilter::All);
        assert!(!property.prefix_id);
        assert!(property.select_attrs.is_empty());
    }

    #[test]
    fn test_selection_default_is_empty() {
        assert!(Selection::default().is_empty());
        assert!(!Selection::Attributes(vec![Attribute::new(
            Selector::parse("Reading").unwrap(),
            "voltage",
            SampleKind::Gauge
        )])
        .is_empty());
    }
}
