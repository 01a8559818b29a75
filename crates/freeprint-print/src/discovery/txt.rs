// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// DNS-SD TXT record handling (RFC 6763 §6).

use freeprint_core::PropertyMap;
use mdns_sd::TxtProperties;
use tracing::warn;

/// Property holding the undecoded TXT rdata as decimal byte values.
pub const RAW_TXT_ATTRIBUTE: &str = "raw_txt_data";

/// Decode TXT rdata: a sequence of length-prefixed `key=value` strings.
///
/// A zero length byte ends the record.  An entry without `=` is a
/// boolean-present key and maps to `""`.  An entry whose length overruns the
/// buffer stops decoding.  The raw bytes are kept under
/// [`RAW_TXT_ATTRIBUTE`].
pub fn decode(rdata: &[u8]) -> PropertyMap {
    let mut properties = PropertyMap::new();
    if rdata.is_empty() {
        return properties;
    }
    properties.insert(RAW_TXT_ATTRIBUTE.to_string(), raw_bytes(rdata));

    let mut pos = 0;
    while let Some(&len) = rdata.get(pos) {
        let len = usize::from(len);
        if len == 0 {
            break;
        }
        pos += 1;
        let Some(entry) = rdata.get(pos..pos + len) else {
            warn!(pos, len, "malformed TXT record, entry out of bounds");
            break;
        };
        pos += len;

        let entry = String::from_utf8_lossy(entry);
        let (key, value) = entry.split_once('=').unwrap_or((&*entry, ""));
        if !key.is_empty() {
            properties.insert(key.to_string(), value.to_string());
        }
    }
    properties
}

/// Rebuild wire rdata from the properties mdns-sd already split apart.
///
/// Entries too long for a single length byte are truncated.
pub fn encode(txt: &TxtProperties) -> Vec<u8> {
    let entries: Vec<(String, Option<Vec<u8>>)> = txt
        .iter()
        .map(|p| (p.key().to_string(), p.val().map(<[u8]>::to_vec)))
        .collect();
    encode_entries(&entries)
}

fn encode_entries(entries: &[(String, Option<Vec<u8>>)]) -> Vec<u8> {
    let mut rdata = Vec::new();
    for (key, value) in entries {
        let mut entry = key.as_bytes().to_vec();
        if let Some(value) = value {
            entry.push(b'=');
            entry.extend_from_slice(value);
        }
        entry.truncate(usize::from(u8::MAX));
        rdata.push(entry.len() as u8);
        rdata.extend_from_slice(&entry);
    }
    rdata
}

fn raw_bytes(rdata: &[u8]) -> String {
    rdata
        .iter()
        .map(u8::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}
