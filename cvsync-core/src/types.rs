//! Record types exchanged with MetaContrata (source) and CVSecurity (target).
//!
//! Field names follow each system's JSON wire format via serde renames.
//! Business codes arrive as strings or integers depending on the endpoint; both
//! decode into [`BusinessCode`].

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// The join key shared by both systems: an employee pin or a department code.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct BusinessCode(pub String);

impl BusinessCode {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BusinessCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for BusinessCode {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for BusinessCode {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl AsRef<str> for BusinessCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for BusinessCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Text(String),
            Signed(i64),
            Unsigned(u64),
        }

        Ok(match Repr::deserialize(deserializer)? {
            Repr::Text(s) => Self(s),
            Repr::Signed(n) => Self(n.to_string()),
            Repr::Unsigned(n) => Self(n.to_string()),
        })
    }
}

// ---------------------------------------------------------------------------
// MetaContrata (source)
// ---------------------------------------------------------------------------

/// A MetaContrata subcontractor ("subcontrata"), mirrored as a CV department.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDepartment {
    #[serde(rename = "coInSub")]
    pub code: BusinessCode,
    #[serde(rename = "nombre", default, deserialize_with = "de::lenient_string")]
    pub name: String,
}

/// A MetaContrata employee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceEmployee {
    #[serde(rename = "coInEmpl")]
    pub code: BusinessCode,
    #[serde(rename = "nombre", default, deserialize_with = "de::lenient_string")]
    pub first_name: String,
    #[serde(rename = "apellido1", default, deserialize_with = "de::lenient_string")]
    pub surname1: String,
    #[serde(rename = "apellido2", default, deserialize_with = "de::lenient_string")]
    pub surname2: String,
    #[serde(rename = "coInSub")]
    pub department_code: BusinessCode,
    /// `accesoPermitido`: only an integer `1` grants access; anything else,
    /// including a missing field, denies it.
    #[serde(rename = "accesoPermitido", default, deserialize_with = "de::access_flag")]
    pub access_allowed: bool,
}

impl SourceEmployee {
    /// Both surnames joined the way they are sent to CVSecurity's `lastName`.
    pub fn last_name(&self) -> String {
        format!("{} {}", self.surname1, self.surname2)
    }
}

// ---------------------------------------------------------------------------
// CVSecurity (target)
// ---------------------------------------------------------------------------

/// A CVSecurity department.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetDepartment {
    pub code: BusinessCode,
    #[serde(default, deserialize_with = "de::lenient_string")]
    pub name: String,
}

/// A CVSecurity person.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetPerson {
    pub pin: BusinessCode,
    #[serde(default, deserialize_with = "de::lenient_code")]
    pub dept_code: BusinessCode,
    #[serde(default, deserialize_with = "de::lenient_string")]
    pub name: String,
    #[serde(default, deserialize_with = "de::lenient_string")]
    pub last_name: String,
    /// Absent on freshly created persons; CVSecurity then treats them as enabled.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "de::optional_flag"
    )]
    pub is_disabled: Option<bool>,
}

impl TargetPerson {
    /// Access is allowed unless the person is explicitly disabled.
    pub fn access_allowed(&self) -> bool {
        !self.is_disabled.unwrap_or(false)
    }
}

// ---------------------------------------------------------------------------
// Lenient decoders
// ---------------------------------------------------------------------------

mod de {
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
        Text(String),
    }

    impl Flag {
        fn is_set(&self) -> bool {
            match self {
                Flag::Bool(b) => *b,
                Flag::Int(n) => *n == 1,
                Flag::Text(s) => s.trim().parse::<i64>() == Ok(1),
            }
        }
    }

    pub(super) fn lenient_string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        Ok(Option::<String>::deserialize(d)?.unwrap_or_default())
    }

    pub(super) fn lenient_code<'de, D: Deserializer<'de>>(
        d: D,
    ) -> Result<super::BusinessCode, D::Error> {
        Ok(Option::<super::BusinessCode>::deserialize(d)?.unwrap_or_default())
    }

    pub(super) fn access_flag<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
        Ok(Option::<Flag>::deserialize(d)?.is_some_and(|f| f.is_set()))
    }

    pub(super) fn optional_flag<'de, D: Deserializer<'de>>(
        d: D,
    ) -> Result<Option<bool>, D::Error> {
        Ok(Option::<Flag>::deserialize(d)?.map(|f| f.is_set()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
