use serde::Serialize;

use crate::error::Result;

/// Payload encoding for dispatched records and status messages.
///
/// Set once per bridge through the `serialization` key of the bridge file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    #[default]
    Json,
    Cbor,
}

/// Encode a payload in the configured format.
pub fn encode<T: Serialize>(value: &T, format: Format) -> Result<Vec<u8>> {
    let payload = match format {
        Format::Json => serde_json::to_vec(value)?,
        Format::Cbor => {
            let mut buf = Vec::new();
            ciborium::into_writer(value, &mut buf)?;
            buf
        }
    };
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::{Sample, SampleRecord};

    fn record() -> SampleRecord {
        SampleRecord::new("mock1U", "Voltages", "voltage", "PS1 Voltage", Sample::Gauge(12.1))
    }

    #[test]
    fn test_json_payload_shape() {
        let encoded = encode(&record(), Format::Json).unwrap();
        let text = String::from_utf8(encoded).unwrap();

        assert!(text.contains(r#""plugin":"redfish""#));
        assert!(text.contains(r#""type":"voltage""#));
        assert!(text.contains(r#""value":{"kind":"gauge","value":12.1}"#));
    }

    #[test]
    fn test_cbor_payload_reads_back() {
        let original = record();
        let encoded = encode(&original, Format::Cbor).unwrap();
        let decoded: SampleRecord = ciborium::from_reader(encoded.as_slice()).unwrap();

        assert_eq!(decoded, original);
    }

    #[test]
    fn test_cbor_is_smaller() {
        let json = encode(&record(), Format::Json).unwrap();
        let cbor = encode(&record(), Format::Cbor).unwrap();

        assert!(cbor.len() < json.len(), "CBOR should be smaller than JSON");
    }

    #[test]
    fn test_format_from_config() {
        let format: Format = serde_json::from_str(r#""cbor""#).unwrap();
        assert_eq!(format, Format::Cbor);
        assert_eq!(Format::default(), Format::Json);
    }
}
