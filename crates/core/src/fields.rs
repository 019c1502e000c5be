//! Closed registry of flow record fields.
//!
//! Every field a record may carry is listed here with the kind of value it
//! holds. The normalizer uses the kind to decide coercion; edit mappings that
//! name a field outside this table are rejected.

/// Identifier field. Immutable once assigned, never part of a patch.
pub const IDENTIFIER_FIELD: &str = "flow_id";

/// Lock flag. Tracked outside the field mapping.
pub const LOCK_FIELD: &str = "locked";

/// Human-facing name of a flow; one of the fields that satisfies creation.
pub const IDENTITY_FIELD: &str = "display_name";

/// Addressing fields that satisfy creation when no display name is given.
pub const ADDRESS_FIELDS: &[&str] = &["multicast_addr_a", "source_addr_a"];

/// Field whose value doubles as the identifier when a record is created
/// without an explicit one.
pub const DISCOVERY_ID_FIELD: &str = "nmos_flow_id";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Number,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDef {
    pub name: &'static str,
    pub kind: FieldKind,
}

const fn text(name: &'static str) -> FieldDef {
    FieldDef {
        name,
        kind: FieldKind::Text,
    }
}

const fn number(name: &'static str) -> FieldDef {
    FieldDef {
        name,
        kind: FieldKind::Number,
    }
}

pub static FIELDS: &[FieldDef] = &[
    text("display_name"),
    // Addressing, path A then path B
    text("source_addr_a"),
    number("source_port_a"),
    text("multicast_addr_a"),
    number("group_port_a"),
    text("source_addr_b"),
    number("source_port_b"),
    text("multicast_addr_b"),
    number("group_port_b"),
    text("transport_protocol"),
    // Discovery metadata
    text("nmos_node_id"),
    text("nmos_flow_id"),
    text("nmos_sender_id"),
    text("nmos_device_id"),
    text("nmos_node_label"),
    text("nmos_node_description"),
    text("nmos_is04_host"),
    number("nmos_is04_port"),
    text("nmos_is04_base_url"),
    text("nmos_is05_host"),
    number("nmos_is05_port"),
    text("nmos_is05_base_url"),
    text("nmos_is04_version"),
    text("nmos_is05_version"),
    text("sdp_url"),
    text("sdp_cache"),
    text("nmos_label"),
    text("nmos_description"),
    text("management_url"),
    // Protocol
    text("media_type"),
    text("st2110_format"),
    text("redundancy_group"),
    text("alias1"),
    text("alias2"),
    text("alias3"),
    text("alias4"),
    text("alias5"),
    text("alias6"),
    text("alias7"),
    text("alias8"),
    // Status
    text("flow_status"),
    text("availability"),
    text("last_seen"),
    text("data_source"),
    text("rds_address"),
    text("rds_api_url"),
    text("user_field1"),
    text("user_field2"),
    text("user_field3"),
    text("user_field4"),
    text("user_field5"),
    text("user_field6"),
    text("user_field7"),
    text("user_field8"),
    text("note"),
];

pub fn lookup(name: &str) -> Option<&'static FieldDef> {
    FIELDS.iter().find(|def| def.name == name)
}

pub fn kind_of(name: &str) -> Option<FieldKind> {
    lookup(name).map(|def| def.kind)
}

/// Fields that may never be written through a patch or difference set.
pub fn is_reserved(name: &str) -> bool {
    name == IDENTIFIER_FIELD || name == LOCK_FIELD
}
