//! Extraction of candidate flow fields from an SDP session description.
//!
//! Only the first value seen for each field is kept. Lines that don't parse
//! are skipped.

use crate::field_value::FieldValue;
use crate::record::FieldMap;

fn set_once(out: &mut FieldMap, key: &str, value: FieldValue) {
    out.entry(key.to_string()).or_insert(value);
}

fn strip_ttl(addr: &str) -> &str {
    addr.split('/').next().unwrap_or(addr)
}

pub fn parse_sdp(text: &str) -> FieldMap {
    let mut out = FieldMap::new();
    for raw in text.lines() {
        let line = raw.trim();
        let Some((prefix, rest)) = line.split_once('=') else {
            continue;
        };
        match prefix {
            "m" => {
                let mut parts = rest.split_whitespace();
                if let Some(media) = parts.next() {
                    set_once(&mut out, "media_type", media.into());
                }
                if let Some(Ok(port)) = parts.next().map(str::parse::<i64>) {
                    set_once(&mut out, "group_port_a", FieldValue::Integer(port));
                }
            }
            "c" => {
                if let Some(addr) = rest.split_whitespace().last() {
                    set_once(&mut out, "multicast_addr_a", strip_ttl(addr).into());
                }
            }
            "a" => {
                if let Some(filter) = rest.strip_prefix("source-filter:") {
                    // incl IN IP4 <dest> <source>
                    let tokens: Vec<&str> = filter.split_whitespace().collect();
                    if tokens.len() >= 5 {
                        set_once(&mut out, "source_addr_a", tokens[4].into());
                        set_once(&mut out, "multicast_addr_a", strip_ttl(tokens[3]).into());
                    }
                } else if rest.starts_with("rtpmap:") {
                    if let Some(encoding) = rest.split_whitespace().nth(1) {
                        set_once(&mut out, "media_type", strip_ttl(encoding).into());
                    }
                } else if rest.starts_with("group:") {
                    set_once(&mut out, "redundancy_group", rest.into());
                }
            }
            _ => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const SDP: &str = "v=0\r\n\
o=- 1 1 IN IP4 10.0.0.5\r\n\
s=Camera 1\r\n\
a=group:DUP primary secondary\r\n\
m=video 5004 RTP/AVP 96\r\n\
c=IN IP4 239.1.1.1/32\r\n\
a=source-filter: incl IN IP4 239.1.1.1 10.0.0.5\r\n\
a=rtpmap:96 raw/90000\r\n\
m=video 5006 RTP/AVP 96\r\n\
c=IN IP4 239.2.2.2/32\r\n";

    #[test]
    fn first_media_section_wins() {
        let fields = parse_sdp(SDP);
        assert_eq!(fields.get("media_type"), Some(&FieldValue::Text("video".into())));
        assert_eq!(fields.get("group_port_a"), Some(&FieldValue::Integer(5004)));
        assert_eq!(
            fields.get("multicast_addr_a"),
            Some(&FieldValue::Text("239.1.1.1".into()))
        );
        assert_eq!(
            fields.get("source_addr_a"),
            Some(&FieldValue::Text("10.0.0.5".into()))
        );
        assert_eq!(
            fields.get("redundancy_group"),
            Some(&FieldValue::Text("group:DUP primary secondary".into()))
        );
    }

    #[test]
    fn garbage_yields_nothing() {
        assert!(parse_sdp("not an sdp\nm=\n").is_empty());
    }
}
