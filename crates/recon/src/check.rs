use serde::{Serialize, Serializer};

/// Outcome of checking one (submission, question) pair.
///
/// `Ungraded` means the question was never submitted and is distinct from a
/// `Checked` result with an empty mismatch list.
#[derive(Debug, Clone, PartialEq)]
pub enum Check<T> {
    Ungraded,
    Checked(T),
}

impl<T> Check<T> {
    pub fn is_ungraded(&self) -> bool {
        matches!(self, Self::Ungraded)
    }

    pub fn checked(&self) -> Option<&T> {
        match self {
            Self::Checked(t) => Some(t),
            Self::Ungraded => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Check<U> {
        match self {
            Self::Checked(t) => Check::Checked(f(t)),
            Self::Ungraded => Check::Ungraded,
        }
    }

    pub fn as_ref(&self) -> Check<&T> {
        match self {
            Self::Checked(t) => Check::Checked(t),
            Self::Ungraded => Check::Ungraded,
        }
    }
}

pub const UNGRADED: &str = "UNGRADED";

impl<T: Serialize> Serialize for Check<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Ungraded => serializer.serialize_str(UNGRADED),
            Self::Checked(t) => t.serialize(serializer),
        }
    }
}
