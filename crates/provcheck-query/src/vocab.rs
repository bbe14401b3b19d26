//! IRIs of the metadata4ing / schema.org vocabulary that method provenance uses.

pub const M4I_NS: &str = "http://w3id.org/nfdi4ing/metadata4ing#";
pub const SCHEMA_NS: &str = "http://schema.org/";
pub const RDFS_NS: &str = "http://www.w3.org/2000/01/rdf-schema#";
pub const SSN_NS: &str = "http://www.w3.org/ns/ssn/";

pub const M4I_METHOD: &str = "http://w3id.org/nfdi4ing/metadata4ing#Method";
/// Method -> input quantity.
pub const M4I_HAS_PARAMETER: &str = "http://w3id.org/nfdi4ing/metadata4ing#hasParameter";
/// Method -> output quantity.
pub const M4I_INVESTIGATES: &str = "http://w3id.org/nfdi4ing/metadata4ing#investigates";
pub const SCHEMA_PROPERTY_VALUE: &str = "http://schema.org/PropertyValue";
pub const SCHEMA_VALUE: &str = "http://schema.org/value";
pub const SCHEMA_SOFTWARE_APPLICATION: &str = "http://schema.org/SoftwareApplication";
pub const RDFS_LABEL: &str = "http://www.w3.org/2000/01/rdf-schema#label";
pub const SSN_IMPLEMENTED_BY: &str = "http://www.w3.org/ns/ssn/implementedBy";

/// Prefixes declared by every generated query, in declaration order.
pub const PREFIXES: &[(&str, &str)] = &[
    ("schema", SCHEMA_NS),
    ("rdfs", RDFS_NS),
    ("m4i", M4I_NS),
    ("ssn", SSN_NS),
];
