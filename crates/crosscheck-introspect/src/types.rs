/// Coarse grouping of Postgres type names used for compatibility and
/// type-appropriateness checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeFamily {
    Integer,
    Decimal,
    Float,
    Text,
    Uuid,
    Boolean,
    Date,
    Timestamp,
    Time,
    Json,
    Other,
}

pub fn type_family(data_type: &str) -> TypeFamily {
    let lowered = data_type.trim().to_ascii_lowercase();
    let base = lowered.split('(').next().unwrap_or("").trim();
    match base {
        "smallint" | "integer" | "bigint" | "int" | "int2" | "int4" | "int8" | "serial"
        | "bigserial" | "smallserial" | "oid" => TypeFamily::Integer,
        "numeric" | "decimal" | "money" => TypeFamily::Decimal,
        "real" | "double precision" | "float4" | "float8" => TypeFamily::Float,
        "text" | "character varying" | "varchar" | "character" | "char" | "bpchar"
        | "citext" | "name" => TypeFamily::Text,
        "uuid" => TypeFamily::Uuid,
        "boolean" | "bool" => TypeFamily::Boolean,
        "date" => TypeFamily::Date,
        "time" | "time without time zone" | "time with time zone" => TypeFamily::Time,
        "json" | "jsonb" => TypeFamily::Json,
        other if other.starts_with("timestamp") => TypeFamily::Timestamp,
        _ => TypeFamily::Other,
    }
}

/// Whether two declared types could plausibly hold the same key values.
pub fn types_compatible(left: &str, right: &str) -> bool {
    use TypeFamily::*;
    let (left, right) = (type_family(left), type_family(right));
    match (left, right) {
        (Other, _) | (_, Other) => false,
        (Integer, Decimal) | (Decimal, Integer) => true,
        (a, b) => a == b,
    }
}
