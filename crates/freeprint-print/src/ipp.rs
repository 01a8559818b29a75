// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Minimal IPP binary codec (RFC 8010).
//
// Only what printer discovery needs: encoding a Get-Printer-Attributes
// request and flattening any response into an ordered name → value map.
//
// # Wire format
//
// ```text
// version-number:  2 bytes (major, minor)
// operation-id / status-code: 2 bytes (big-endian)
// request-id:      4 bytes (big-endian)
// attribute-groups: variable
//   delimiter-tag: 1 byte
//   attributes:    variable
//     value-tag:    1 byte
//     name-length:  2 bytes (big-endian)
//     name:         name-length bytes
//     value-length: 2 bytes (big-endian)
//     value:        value-length bytes
// end-of-attributes-tag: 1 byte (0x03)
// ```

use freeprint_core::PropertyMap;
use tracing::debug;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const IPP_VERSION_MAJOR: u8 = 0x01;
pub const IPP_VERSION_MINOR: u8 = 0x01;

/// Get-Printer-Attributes operation identifier (RFC 8011 §4.2.5).
pub const OP_GET_PRINTER_ATTRIBUTES: u16 = 0x000B;

/// Request id sent with every request.  Responses are not matched against it.
pub const REQUEST_ID: u32 = 12345;

pub const STATUS_OK: u16 = 0x0000;

// Delimiter tags (RFC 8010 §3.5.1)
pub const TAG_OPERATION_ATTRIBUTES: u8 = 0x01;
pub const TAG_END_OF_ATTRIBUTES: u8 = 0x03;
pub const TAG_PRINTER_ATTRIBUTES: u8 = 0x04;

/// Tags up to this value are delimiters, not value tags.
const MAX_DELIMITER_TAG: u8 = 0x0F;

// Value tags (RFC 8010 §3.5.2)
pub const VALUE_TAG_INTEGER: u8 = 0x21;
pub const VALUE_TAG_BOOLEAN: u8 = 0x22;
pub const VALUE_TAG_ENUM: u8 = 0x23;
pub const VALUE_TAG_TEXT: u8 = 0x41;
pub const VALUE_TAG_NAME: u8 = 0x42;
pub const VALUE_TAG_KEYWORD: u8 = 0x44;
pub const VALUE_TAG_URI: u8 = 0x45;
pub const VALUE_TAG_CHARSET: u8 = 0x47;
pub const VALUE_TAG_NATURAL_LANGUAGE: u8 = 0x48;

/// Key under which the decoded status code is stored.
pub const STATUS_ATTRIBUTE: &str = "ipp-status-code";

/// Value of [`STATUS_ATTRIBUTE`] for a successful response.
pub const STATUS_SUCCESSFUL_OK: &str = "0x0000 (successful-ok)";

/// Responses shorter than this carry no attributes worth reading.
const MIN_RESPONSE_LEN: usize = 9;

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// Builder for IPP messages.
///
/// The second header field is the operation id in a request and the status
/// code in a response; the encoding is the same.
#[derive(Debug)]
pub struct IppMessageBuilder {
    buf: Vec<u8>,
}

impl IppMessageBuilder {
    pub fn new(operation_or_status: u16, request_id: u32) -> Self {
        let mut buf = Vec::with_capacity(256);
        buf.push(IPP_VERSION_MAJOR);
        buf.push(IPP_VERSION_MINOR);
        buf.extend_from_slice(&operation_or_status.to_be_bytes());
        buf.extend_from_slice(&request_id.to_be_bytes());
        Self { buf }
    }

    pub fn begin_group(&mut self, delimiter: u8) -> &mut Self {
        self.buf.push(delimiter);
        self
    }

    pub fn charset(&mut self, name: &str, value: &str) -> &mut Self {
        self.write_attr(VALUE_TAG_CHARSET, name, value.as_bytes())
    }

    pub fn natural_language(&mut self, name: &str, value: &str) -> &mut Self {
        self.write_attr(VALUE_TAG_NATURAL_LANGUAGE, name, value.as_bytes())
    }

    pub fn uri(&mut self, name: &str, value: &str) -> &mut Self {
        self.write_attr(VALUE_TAG_URI, name, value.as_bytes())
    }

    pub fn keyword(&mut self, name: &str, value: &str) -> &mut Self {
        self.write_attr(VALUE_TAG_KEYWORD, name, value.as_bytes())
    }

    /// Additional value of the previous attribute (name-length 0).
    pub fn keyword_additional(&mut self, value: &str) -> &mut Self {
        self.write_attr(VALUE_TAG_KEYWORD, "", value.as_bytes())
    }

    pub fn text(&mut self, name: &str, value: &str) -> &mut Self {
        self.write_attr(VALUE_TAG_TEXT, name, value.as_bytes())
    }

    pub fn integer(&mut self, name: &str, value: i32) -> &mut Self {
        self.write_attr(VALUE_TAG_INTEGER, name, &value.to_be_bytes())
    }

    pub fn enum_attr(&mut self, name: &str, value: i32) -> &mut Self {
        self.write_attr(VALUE_TAG_ENUM, name, &value.to_be_bytes())
    }

    pub fn boolean(&mut self, name: &str, value: bool) -> &mut Self {
        self.write_attr(VALUE_TAG_BOOLEAN, name, &[u8::from(value)])
    }

    /// Write one attribute.  Names and values longer than 65535 bytes are
    /// truncated to fit their length field.
    pub fn write_attr(&mut self, value_tag: u8, name: &str, value: &[u8]) -> &mut Self {
        self.buf.push(value_tag);
        self.write_field(name.as_bytes());
        self.write_field(value);
        self
    }

    fn write_field(&mut self, bytes: &[u8]) {
        let len = bytes.len().min(u16::MAX as usize);
        self.buf.extend_from_slice(&(len as u16).to_be_bytes());
        self.buf.extend_from_slice(&bytes[..len]);
    }

    /// Terminate with end-of-attributes and return the bytes.
    pub fn build(mut self) -> Vec<u8> {
        self.buf.push(TAG_END_OF_ATTRIBUTES);
        self.buf
    }
}

/// Encode a Get-Printer-Attributes request asking for every attribute.
pub fn build_get_attributes_request(printer_uri: &str) -> Vec<u8> {
    let mut builder = IppMessageBuilder::new(OP_GET_PRINTER_ATTRIBUTES, REQUEST_ID);
    builder
        .begin_group(TAG_OPERATION_ATTRIBUTES)
        .charset("attributes-charset", "utf-8")
        .natural_language("attributes-natural-language", "en")
        .uri("printer-uri", printer_uri)
        .keyword("requested-attributes", "all");
    builder.build()
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Flatten an IPP response into attribute name → display value.
///
/// The status code is always recorded under [`STATUS_ATTRIBUTE`].  Additional
/// values of a multi-valued attribute are joined with `", "`.  Parsing stops
/// quietly at the first length field that overruns the buffer, returning
/// whatever was decoded up to that point.
pub fn parse_response(data: &[u8]) -> PropertyMap {
    let mut attrs = PropertyMap::new();
    if data.len() < MIN_RESPONSE_LEN {
        debug!(len = data.len(), "IPP response too short");
        return attrs;
    }

    let status = u16::from_be_bytes([data[2], data[3]]);
    let status_text = if status == STATUS_OK {
        STATUS_SUCCESSFUL_OK.to_string()
    } else {
        format!("0x{status:04x}")
    };
    attrs.insert(STATUS_ATTRIBUTE.to_string(), status_text);

    let mut reader = Reader { data, pos: 8 };
    let mut last_name = String::new();

    while let Some(tag) = reader.u8() {
        if tag == TAG_END_OF_ATTRIBUTES {
            break;
        }
        if tag <= MAX_DELIMITER_TAG {
            continue;
        }

        let Some(name_bytes) = reader.field() else {
            debug!(pos = reader.pos, "truncated IPP attribute name");
            break;
        };
        let additional = name_bytes.is_empty();
        if !additional {
            last_name = String::from_utf8_lossy(name_bytes).trim().to_string();
        }
        let Some(value) = reader.field() else {
            debug!(pos = reader.pos, "truncated IPP attribute value");
            break;
        };

        if last_name.is_empty() {
            continue;
        }
        let value = decode_value(tag, value);
        match attrs.get_mut(&last_name) {
            Some(existing) if additional => {
                existing.push_str(", ");
                existing.push_str(&value);
            }
            _ => {
                attrs.insert(last_name.clone(), value);
            }
        }
    }

    attrs
}

/// Whether a decoded response reports `successful-ok`.
pub fn is_successful(attrs: &PropertyMap) -> bool {
    attrs
        .get(STATUS_ATTRIBUTE)
        .is_some_and(|s| s.contains("successful-ok"))
}

fn decode_value(tag: u8, value: &[u8]) -> String {
    match tag {
        VALUE_TAG_INTEGER | VALUE_TAG_ENUM => match *value {
            [a] => (a as i8).to_string(),
            [a, b] => i16::from_be_bytes([a, b]).to_string(),
            [a, b, c, d] => i32::from_be_bytes([a, b, c, d]).to_string(),
            _ => {
                let bytes: Vec<String> = value.iter().map(|&b| (b as i8).to_string()).collect();
                format!("int_val({})", bytes.join(", "))
            }
        },
        VALUE_TAG_BOOLEAN => match value.first() {
            Some(&b) => (b != 0).to_string(),
            None => "invalid_bool".to_string(),
        },
        _ => String::from_utf8_lossy(value).trim().to_string(),
    }
}

/// Bounds-checked cursor over a response body.
struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn u8(&mut self) -> Option<u8> {
        let b = *self.data.get(self.pos)?;
        self.pos += 1;
        Some(b)
    }

    /// A 2-byte length followed by that many bytes.
    fn field(&mut self) -> Option<&'a [u8]> {
        let len = self.data.get(self.pos..self.pos + 2)?;
        let len = u16::from_be_bytes([len[0], len[1]]) as usize;
        let bytes = self.data.get(self.pos + 2..self.pos + 2 + len)?;
        self.pos += 2 + len;
        Some(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16) -> IppMessageBuilder {
        let mut builder = IppMessageBuilder::new(status, 1);
        builder
            .begin_group(TAG_OPERATION_ATTRIBUTES)
            .charset("attributes-charset", "utf-8")
            .begin_group(TAG_PRINTER_ATTRIBUTES);
        builder
    }

    #[test]
    fn request_layout_is_exact() {
        let bytes = build_get_attributes_request("ipp://10.0.0.5:631/ipp/print");
        assert_eq!(&bytes[..9], &[0x01, 0x01, 0x00, 0x0B, 0x00, 0x00, 0x30, 0x39, 0x01]);
        assert_eq!(bytes[9], VALUE_TAG_CHARSET);
        assert_eq!(&bytes[10..12], &[0x00, 18]);
        assert_eq!(&bytes[12..30], b"attributes-charset");
        assert_eq!(&bytes[30..32], &[0x00, 5]);
        assert_eq!(&bytes[32..37], b"utf-8");
        assert!(bytes.ends_with(b"requested-attributes\x00\x03all\x03"));
    }

    #[test]
    fn request_attributes_decode_in_order() {
        let attrs = parse_response(&build_get_attributes_request("ipp://h/ipp/print"));
        let keys: Vec<_> = attrs.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            [
                STATUS_ATTRIBUTE,
                "attributes-charset",
                "attributes-natural-language",
                "printer-uri",
                "requested-attributes"
            ]
        );
        assert_eq!(attrs["printer-uri"], "ipp://h/ipp/print");
        // The operation id sits where a response carries its status.
        assert_eq!(attrs[STATUS_ATTRIBUTE], "0x000b");
    }

    #[test]
    fn successful_response_with_printer_name() {
        let mut builder = IppMessageBuilder::new(STATUS_OK, 1);
        builder
            .begin_group(TAG_PRINTER_ATTRIBUTES)
            .keyword("printer-name", "MyPrinter");
        let attrs = parse_response(&builder.build());

        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs[STATUS_ATTRIBUTE], "0x0000 (successful-ok)");
        assert_eq!(attrs["printer-name"], "MyPrinter");
        assert!(is_successful(&attrs));
    }

    #[test]
    fn error_status_still_yields_attributes() {
        let mut builder = response(0x0406);
        builder.text("status-message", "not found");
        let attrs = parse_response(&builder.build());
        assert_eq!(attrs[STATUS_ATTRIBUTE], "0x0406");
        assert_eq!(attrs["status-message"], "not found");
        assert!(!is_successful(&attrs));
    }

    #[test]
    fn additional_values_are_joined() {
        let mut builder = response(STATUS_OK);
        builder
            .keyword("document-format-supported", "application/pdf")
            .keyword_additional("image/jpeg")
            .keyword_additional("text/plain");
        let attrs = parse_response(&builder.build());
        assert_eq!(attrs["document-format-supported"], "application/pdf, image/jpeg, text/plain");
    }

    #[test]
    fn numeric_and_boolean_values() {
        let mut builder = response(STATUS_OK);
        builder
            .enum_attr("printer-state", 3)
            .integer("queued-job-count", -2)
            .boolean("color-supported", true)
            .write_attr(VALUE_TAG_INTEGER, "one-byte", &[0xFF])
            .write_attr(VALUE_TAG_INTEGER, "two-byte", &[0x01, 0x00])
            .write_attr(VALUE_TAG_INTEGER, "odd-width", &[0x01, 0x80, 0x02])
            .write_attr(VALUE_TAG_BOOLEAN, "empty-bool", &[]);
        let attrs = parse_response(&builder.build());

        assert_eq!(attrs["printer-state"], "3");
        assert_eq!(attrs["queued-job-count"], "-2");
        assert_eq!(attrs["color-supported"], "true");
        assert_eq!(attrs["one-byte"], "-1");
        assert_eq!(attrs["two-byte"], "256");
        assert_eq!(attrs["odd-width"], "int_val(1, -128, 2)");
        assert_eq!(attrs["empty-bool"], "invalid_bool");
    }

    #[test]
    fn text_values_are_trimmed() {
        let mut builder = response(STATUS_OK);
        builder.text("printer-make-and-model", "  Acme LaserJet 9000 \n");
        let attrs = parse_response(&builder.build());
        assert_eq!(attrs["printer-make-and-model"], "Acme LaserJet 9000");
    }

    #[test]
    fn truncated_name_returns_partial_results() {
        let mut builder = response(STATUS_OK);
        builder.keyword("printer-name", "MyPrinter");
        let mut bytes = builder.build();
        bytes.pop();
        // Claim a 200-byte name the buffer cannot satisfy.
        bytes.extend_from_slice(&[VALUE_TAG_KEYWORD, 0x00, 200, b'x']);

        let attrs = parse_response(&bytes);
        assert_eq!(attrs["printer-name"], "MyPrinter");
        assert_eq!(attrs.len(), 3);
    }

    #[test]
    fn value_one_byte_short_stops_parsing() {
        let mut builder = response(STATUS_OK);
        builder.keyword("printer-name", "MyPrinter");
        let mut bytes = builder.build();
        bytes.truncate(bytes.len() - 2);

        let attrs = parse_response(&bytes);
        assert!(!attrs.contains_key("printer-name"));
        assert_eq!(attrs["attributes-charset"], "utf-8");
    }

    #[test]
    fn short_input_yields_nothing() {
        assert!(parse_response(&[]).is_empty());
        assert!(parse_response(&[0x01, 0x01, 0x00, 0x00, 0, 0, 0, 1]).is_empty());
    }

    #[test]
    fn values_before_any_name_are_discarded() {
        let mut builder = IppMessageBuilder::new(STATUS_OK, 1);
        builder
            .begin_group(TAG_PRINTER_ATTRIBUTES)
            .keyword_additional("orphan")
            .keyword("printer-name", "MyPrinter");
        let attrs = parse_response(&builder.build());
        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs["printer-name"], "MyPrinter");
    }
}
