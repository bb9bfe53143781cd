// (c) Copyright 2025 Helsing GmbH. All rights reserved.
//! Scalar payloads of leaves and leaf-list entries.
//!
//! [`Value`] is the only place where actual data lives in a data tree; everything else is
//! structure. Values double as list keys and as members of unique tuples, so unlike plain Rust
//! floats they are totally ordered and hashable.
use std::{
    cmp::Ordering,
    fmt,
    hash::{Hash, Hasher},
};

/// The value stored in a leaf or a leaf-list entry.
// NOTE: Why no U32 or I32? Range restrictions are a schema concern, not a storage one.
#[derive(Clone)]
#[cfg_attr(feature = "serde", derive(::serde::Deserialize, ::serde::Serialize))]
pub enum Value {
    Bytes(#[cfg_attr(feature = "serde", serde(with = "serde_bytes"))] Vec<u8>),
    String(String),
    Float(f32),
    Double(f64),
    U64(u64),
    I64(i64),
    Bool(bool),
    /// The value of a leaf of YANG type `empty`: present, but carrying nothing.
    Empty,
    #[cfg(feature = "ulid")]
    Ulid(ulid::Ulid),
}

impl Value {
    /// When ordering Value instances of different types, we order them
    /// according to this order.
    const fn comparison_order(&self) -> usize {
        // Desired order: Bytes > String > Ulid > Double > Float > U64 > I64 > Bool > Empty
        match self {
            Value::Bytes(_) => 8,
            Value::String(_) => 7,
            #[cfg(feature = "ulid")]
            Value::Ulid(_) => 6,
            Value::Double(_) => 5,
            Value::Float(_) => 4,
            Value::U64(_) => 3,
            Value::I64(_) => 2,
            Value::Bool(_) => 1,
            Value::Empty => 0,
        }
    }

    /// Returns the contained string, if this is a [`Value::String`].
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the contained integer if it fits an `i64`, whichever integer variant holds it.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::I64(i) => Some(*i),
            Value::U64(u) => i64::try_from(*u).ok(),
            _ => None,
        }
    }

    /// Gives a short name to describe the type of this value.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Bytes(_) => "bytes",
            Value::String(_) => "string",
            Value::Float(_) => "float",
            Value::Double(_) => "double",
            Value::U64(_) => "u64",
            Value::I64(_) => "i64",
            Value::Bool(_) => "bool",
            Value::Empty => "empty",
            #[cfg(feature = "ulid")]
            Value::Ulid(_) => "ulid",
        }
    }
}

macro_rules! impl_from {
(
    $(
        $source:ty => $target:ident $(with $conv:ident)?
    ),* $(,)?
    ) => {
        $(
            impl From<$source> for Value {
                fn from(value: $source) -> Self {
                    Self::$target(impl_from!(value$(, $conv)?))
                }
            }
        )*
    };

    ($value:ident, $conv:ident) => {
        $value.$conv()
    };

    ($value:ident) => {
        $value
    };
}

impl_from!(
    &[u8]      => Bytes with into,
    Vec<u8>    => Bytes,
    String     => String,
    &str       => String with to_string,
    f32        => Float,
    f64        => Double,
    u8         => U64 with into,
    u16        => U64 with into,
    u32        => U64 with into,
    u64        => U64,
    i8         => I64 with into,
    i16        => I64 with into,
    i32        => I64 with into,
    i64        => I64,
    bool       => Bool,
);

#[cfg(feature = "ulid")]
impl From<ulid::Ulid> for Value {
    fn from(value: ulid::Ulid) -> Self {
        Self::Ulid(value)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bytes(inner) => write!(f, "{inner:02X?}"),
            Self::String(inner) => fmt::Debug::fmt(inner, f),
            Self::Bool(inner) => fmt::Debug::fmt(inner, f),
            // Make sure to always print at least 1 decimal, so we can non-ambiguously
            // tell apart I64 and floats (this is achieved by {:?} instead of {}).
            Self::Float(inner) => write!(f, "{inner:?}f"),
            Self::Double(inner) => write!(f, "{inner:?}d"),
            Self::U64(inner) => write!(f, "{inner}u"),
            Self::I64(inner) => write!(f, "{inner}"),
            Self::Empty => f.write_str("[empty]"),
            #[cfg(feature = "ulid")]
            Self::Ulid(inner) => fmt::Debug::fmt(inner, f),
        }
    }
}

/// Renders the value the way it appears in path predicates and error messages.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bytes(inner) => {
                for b in inner {
                    write!(f, "{b:02x}")?;
                }
                Ok(())
            }
            Self::String(inner) => f.write_str(inner),
            Self::Bool(inner) => fmt::Display::fmt(inner, f),
            Self::Float(inner) => fmt::Display::fmt(inner, f),
            Self::Double(inner) => fmt::Display::fmt(inner, f),
            Self::U64(inner) => fmt::Display::fmt(inner, f),
            Self::I64(inner) => fmt::Display::fmt(inner, f),
            Self::Empty => Ok(()),
            #[cfg(feature = "ulid")]
            Self::Ulid(inner) => fmt::Display::fmt(inner, f),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other).is_eq()
    }
}
impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.comparison_order().hash(state);
        match self {
            Value::Bytes(b) => b.hash(state),
            Value::String(s) => s.hash(state),
            // consistent with total_cmp-based equality
            Value::Float(v) => v.to_bits().hash(state),
            Value::Double(v) => v.to_bits().hash(state),
            Value::U64(u) => u.hash(state),
            Value::I64(i) => i.hash(state),
            Value::Bool(b) => b.hash(state),
            Value::Empty => {}
            #[cfg(feature = "ulid")]
            Value::Ulid(u) => u.hash(state),
        }
    }
}

impl PartialEq<str> for Value {
    fn eq(&self, other: &str) -> bool {
        matches!(self, Self::String(s) if s == other)
    }
}
impl PartialEq<&str> for Value {
    fn eq(&self, other: &&str) -> bool {
        matches!(self, Self::String(s) if s == other)
    }
}
impl PartialEq<bool> for Value {
    fn eq(&self, other: &bool) -> bool {
        matches!(self, Self::Bool(b) if b == other)
    }
}
impl PartialEq<u64> for Value {
    fn eq(&self, other: &u64) -> bool {
        match self {
            Self::U64(u) => u == other,
            Self::I64(i) => u64::try_from(*i).is_ok_and(|u| &u == other),
            _ => false,
        }
    }
}
impl PartialEq<i64> for Value {
    fn eq(&self, other: &i64) -> bool {
        self.as_i64().is_some_and(|i| &i == other)
    }
}
// i32 because it's the "default" inference integer type
impl PartialEq<i32> for Value {
    fn eq(&self, other: &i32) -> bool {
        self.as_i64().is_some_and(|i| i == i64::from(*other))
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        use Value::*;
        // For order of cross-variant comparisons, see:
        // [`Value::comparison_order`]
        match (self, other) {
            (Bytes(b1), Bytes(b2)) => b1.cmp(b2),
            (String(s1), String(s2)) => s1.cmp(s2),
            (Double(d1), Double(d2)) => d1.total_cmp(d2),
            (Float(d1), Float(d2)) => d1.total_cmp(d2),
            (U64(u1), U64(u2)) => u1.cmp(u2),
            (I64(i1), I64(i2)) => i1.cmp(i2),
            (Bool(b1), Bool(b2)) => b1.cmp(b2),
            (Empty, Empty) => Ordering::Equal,
            #[cfg(feature = "ulid")]
            (Ulid(ulid1), Ulid(ulid2)) => ulid1.cmp(ulid2),
            (a, b) => {
                let a_order = a.comparison_order();
                let b_order = b.comparison_order();
                debug_assert_ne!(
                    a_order, b_order,
                    "match must handle all comparisons between similar variants"
                );
                a_order.cmp(&b_order)
            }
        }
    }
}

#[cfg(any(test, feature = "arbitrary"))]
impl quickcheck::Arbitrary for Value {
    fn arbitrary(g: &mut quickcheck::Gen) -> Self {
        let mut choices = vec!["bytes", "string", "double", "u64", "i64", "bool", "empty"];
        if cfg!(feature = "ulid") {
            choices.push("ulid");
        }
        match *g.choose(&choices).unwrap() {
            "bytes" => Self::Bytes(<_>::arbitrary(g)),
            "string" => Self::String(<_>::arbitrary(g)),
            "double" => Self::Double(<_>::arbitrary(g)),
            "u64" => Self::U64(<_>::arbitrary(g)),
            "i64" => Self::I64(<_>::arbitrary(g)),
            "bool" => Self::Bool(<_>::arbitrary(g)),
            "empty" => Self::Empty,
            #[cfg(feature = "ulid")]
            "ulid" => Self::Ulid(ulid::Ulid(<_>::arbitrary(g))),
            _ => unreachable!(),
        }
    }

    fn shrink(&self) -> Box<dyn Iterator<Item = Self>> {
        match self {
            Value::Bytes(v) => Box::new(v.shrink().map(Value::Bytes)),
            Value::String(v) => Box::new(v.shrink().map(Value::String)),
            Value::Double(v) => Box::new(v.shrink().map(Value::Double)),
            Value::U64(v) => Box::new(v.shrink().map(Value::U64)),
            Value::I64(v) => Box::new(v.shrink().map(Value::I64)),
            _ => quickcheck::empty_shrinker(),
        }
    }
}
