//! Wire names for the closed policy vocabularies.
//!
//! Every enum in the policy model round-trips through one fixed upper-case name
//! (`"DEPARTMENT_HEAD"`, `"CHANGE_STATUS"`). The serde derives use the same
//! spelling; `wire_names!` provides the lookup used when parsing policy sources.

use thiserror::Error;

/// A name that is not part of a closed vocabulary.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! wire_names {
    ($t:ident, $kind:literal, { $($variant:ident => $name:literal),+ $(,)? }) => {
        impl $t {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$t] = &[$($t::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($t::$variant => $name),+
                }
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl core::str::FromStr for $t {
            type Err = $crate::names::UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($name => Ok($t::$variant),)+
                    other => Err($crate::names::UnknownVariant {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}
