use crate::sample::SampleRecord;

/// Default key expression prefix for redfish samples.
pub const KEY_PREFIX: &str = "zensight/redfish";

/// Builder for the key expressions records are published on.
///
/// Records map to `<prefix>/<host>/<plugin_instance>/<type>/<type_instance>`.
#[derive(Debug, Clone)]
pub struct KeyExprBuilder {
    prefix: String,
}

impl Default for KeyExprBuilder {
    fn default() -> Self {
        Self::new(KEY_PREFIX)
    }
}

impl KeyExprBuilder {
    /// Create a builder with the given prefix. Trailing slashes are dropped.
    pub fn new(prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        Self {
            prefix: prefix.trim_end_matches('/').to_string(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Key for a single record.
    ///
    /// # Example
    /// ```
    /// use redfish_common::keyexpr::KeyExprBuilder;
    /// use redfish_common::sample::{Sample, SampleRecord};
    ///
    /// let record = SampleRecord::new("mock1U", "Fans", "fanspeed", "Fan 1", Sample::Gauge(2100.0));
    /// let key = KeyExprBuilder::default().record_key(&record);
    /// assert_eq!(key, "zensight/redfish/mock1U/Fans/fanspeed/Fan 1");
    /// ```
    pub fn record_key(&self, record: &SampleRecord) -> String {
        format!(
            "{}/{}/{}/{}/{}",
            self.prefix,
            sanitize_chunk(&record.host),
            sanitize_chunk(&record.plugin_instance),
            sanitize_chunk(&record.type_name),
            sanitize_chunk(&record.type_instance)
        )
    }

    /// Key the bridge status is published on.
    pub fn status_key(&self) -> String {
        format!("{}/@/status", self.prefix)
    }
}

/// Make a label usable as a single key expression chunk.
///
/// Zenoh reserves `*`, `$`, `?` and `#`, `/` separates chunks, a leading `@`
/// marks a verbatim chunk, and chunks may not be empty.
pub fn sanitize_chunk(label: &str) -> String {
    if label.is_empty() {
        return "_".to_string();
    }

    label
        .chars()
        .enumerate()
        .map(|(i, c)| match c {
            '*' | '$' | '?' | '#' | '/' => '_',
            '@' if i == 0 => '_',
            c => c,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::Sample;

    #[test]
    fn test_record_key() {
        let builder = KeyExprBuilder::new("site/redfish/");
        let record = SampleRecord::new("bmc01", "Voltages", "voltage", "0-VRM", Sample::Gauge(1.2));

        assert_eq!(
            builder.record_key(&record),
            "site/redfish/bmc01/Voltages/voltage/0-VRM"
        );
    }

    #[test]
    fn test_empty_chunks_are_filled() {
        let record = SampleRecord::new("bmc01", "", "temperature", "", Sample::Gauge(20.0));

        assert_eq!(
            KeyExprBuilder::default().record_key(&record),
            "zensight/redfish/bmc01/_/temperature/_"
        );
    }

    #[test]
    fn test_sanitize_reserved() {
        assert_eq!(sanitize_chunk("CPU*1/Temp?"), "CPU_1_Temp_");
        assert_eq!(sanitize_chunk("$#"), "__");
        assert_eq!(sanitize_chunk("PS1 Voltage"), "PS1 Voltage");
    }

    #[test]
    fn test_leading_at_is_not_verbatim() {
        assert_eq!(sanitize_chunk("@odata.id"), "_odata.id");
        assert_eq!(sanitize_chunk("user@bmc"), "user@bmc");

        let record = SampleRecord::new("bmc01", "Fans", "fanspeed", "@Redfish.Fan", Sample::Gauge(1.0));
        assert_eq!(
            KeyExprBuilder::default().record_key(&record),
            "zensight/redfish/bmc01/Fans/fanspeed/_Redfish.Fan"
        );
    }

    #[test]
    fn test_status_key() {
        assert_eq!(
            KeyExprBuilder::default().status_key(),
            "zensight/redfish/@/status"
        );
    }
}
