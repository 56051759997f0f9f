// ── Optional parameter field ──
//
// `Field<T>` distinguishes "not part of this message" from a value. It
// serializes as the bare value when set; unset fields are skipped by the
// containing struct. Absent and `null` keys both decode as `Unset`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Field<T> {
    Unset,
    Set(T),
}

impl<T> Default for Field<T> {
    fn default() -> Self {
        Self::Unset
    }
}

impl<T> Field<T> {
    pub fn is_set(&self) -> bool {
        matches!(self, Self::Set(_))
    }

    pub fn is_unset(&self) -> bool {
        matches!(self, Self::Unset)
    }

    pub fn get(&self) -> Option<&T> {
        match self {
            Self::Set(v) => Some(v),
            Self::Unset => None,
        }
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            Self::Set(v) => Some(v),
            Self::Unset => None,
        }
    }

    /// Overwrite `self` with `other` if `other` is set.
    pub fn merge(&mut self, other: Self) {
        if other.is_set() {
            *self = other;
        }
    }
}

impl<T: Copy> Field<T> {
    pub fn value(&self) -> Option<T> {
        self.get().copied()
    }
}

impl<T> From<Option<T>> for Field<T> {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Self::Unset, Self::Set)
    }
}

impl<T: Serialize> Serialize for Field<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Set(v) => v.serialize(serializer),
            Self::Unset => serializer.serialize_none(),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Field<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Option::<T>::deserialize(deserializer).map(Self::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_keeps_existing_when_other_unset() {
        let mut f = Field::Set(5);
        f.merge(Field::Unset);
        assert_eq!(f, Field::Set(5));
        f.merge(Field::Set(7));
        assert_eq!(f, Field::Set(7));
    }

    #[test]
    fn option_conversion() {
        assert_eq!(Field::from(Some(1)), Field::Set(1));
        assert_eq!(Field::<i32>::from(None), Field::Unset);
        assert_eq!(Field::Set(3).into_option(), Some(3));
    }
}
