use std::fmt;

/// Scalar kind of a value. `Handle` is an opaque pointer-sized value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TypeCode {
    Int,
    UInt,
    Float,
    Handle,
}

/// Element kind, bit width and lane count of an IR value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Type {
    pub code: TypeCode,
    pub bits: u8,
    pub lanes: u32,
}

/// Scalar types that may be named in generator params and target files.
const NAMED_TYPES: &[(&str, Type)] = &[
    ("bool", Type::bool()),
    ("int8", Type::int(8)),
    ("int16", Type::int(16)),
    ("int32", Type::int(32)),
    ("uint8", Type::uint(8)),
    ("uint16", Type::uint(16)),
    ("uint32", Type::uint(32)),
    ("float32", Type::float(32)),
    ("float64", Type::float(64)),
];

impl Type {
    pub const fn int(bits: u8) -> Self {
        Self {
            code: TypeCode::Int,
            bits,
            lanes: 1,
        }
    }

    pub const fn uint(bits: u8) -> Self {
        Self {
            code: TypeCode::UInt,
            bits,
            lanes: 1,
        }
    }

    pub const fn float(bits: u8) -> Self {
        Self {
            code: TypeCode::Float,
            bits,
            lanes: 1,
        }
    }

    pub const fn bool() -> Self {
        Self::uint(1)
    }

    pub const fn handle() -> Self {
        Self {
            code: TypeCode::Handle,
            bits: 64,
            lanes: 1,
        }
    }

    /// Look up one of the named scalar types (`"uint8"`, `"float32"`, ...).
    pub fn from_name(name: &str) -> Option<Self> {
        NAMED_TYPES
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, t)| *t)
    }

    pub fn type_names() -> impl Iterator<Item = &'static str> {
        NAMED_TYPES.iter().map(|(n, _)| *n)
    }

    pub fn with_lanes(self, lanes: u32) -> Self {
        Self { lanes, ..self }
    }

    pub fn element_of(self) -> Self {
        self.with_lanes(1)
    }

    /// Storage size of one element in bytes.
    pub fn bytes(&self) -> i64 {
        (self.bits as i64 + 7) / 8
    }

    pub fn is_vector(&self) -> bool {
        self.lanes > 1
    }

    pub fn is_scalar(&self) -> bool {
        self.lanes == 1
    }

    pub fn is_bool(&self) -> bool {
        self.code == TypeCode::UInt && self.bits == 1
    }

    pub fn is_int(&self) -> bool {
        self.code == TypeCode::Int
    }

    pub fn is_uint(&self) -> bool {
        self.code == TypeCode::UInt
    }

    /// Integer-valued (signed, unsigned or bool).
    pub fn is_integral(&self) -> bool {
        matches!(self.code, TypeCode::Int | TypeCode::UInt)
    }

    /// Truncate `value` to this type's bit width, sign-extending signed types.
    pub fn wrap(&self, value: i64) -> i64 {
        if !self.is_integral() || self.bits >= 64 {
            return value;
        }
        let shift = 64 - self.bits as u32;
        match self.code {
            TypeCode::Int => (value << shift) >> shift,
            _ => ((value as u64) << shift >> shift) as i64,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            _ if self.is_bool() => write!(f, "bool")?,
            TypeCode::Int => write!(f, "int{}", self.bits)?,
            TypeCode::UInt => write!(f, "uint{}", self.bits)?,
            TypeCode::Float => write!(f, "float{}", self.bits)?,
            TypeCode::Handle => write!(f, "handle")?,
        }
        if self.is_vector() {
            write!(f, "x{}", self.lanes)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes() {
        assert_eq!(Type::bool().bytes(), 1);
        assert_eq!(Type::uint(8).bytes(), 1);
        assert_eq!(Type::int(16).with_lanes(8).bytes(), 2);
        assert_eq!(Type::float(64).bytes(), 8);
    }

    #[test]
    fn test_from_name_covers_table() {
        assert_eq!(Type::from_name("uint16"), Some(Type::uint(16)));
        assert_eq!(Type::from_name("bool"), Some(Type::bool()));
        assert_eq!(Type::from_name("float64"), Some(Type::float(64)));
        assert_eq!(Type::from_name("int64"), None);
        assert_eq!(Type::type_names().count(), 9);
    }

    #[test]
    fn test_display() {
        assert_eq!(Type::int(32).to_string(), "int32");
        assert_eq!(Type::uint(8).with_lanes(16).to_string(), "uint8x16");
        assert_eq!(Type::bool().with_lanes(4).to_string(), "boolx4");
    }

    #[test]
    fn test_wrap() {
        assert_eq!(Type::int(8).wrap(200), -56);
        assert_eq!(Type::uint(8).wrap(-1), 255);
        assert_eq!(Type::uint(16).wrap(65537), 1);
        assert_eq!(Type::int(32).wrap(1 << 31), -(1 << 31));
        assert_eq!(Type::int(64).wrap(i64::MIN), i64::MIN);
    }
}
