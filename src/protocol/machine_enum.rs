use std::fmt::Debug;

/// Types that can be decoded from, and encoded to, a single wire byte.
pub trait MachineEnumerable: TryFrom<u8> + Into<u8> + Copy + Debug {}

impl<T> MachineEnumerable for T where T: TryFrom<u8> + Into<u8> + Copy + Debug {}

/// Wraps a machine enumeration that may have unknown values.
#[derive(Copy, Clone, PartialEq, Eq)]
pub enum MachineEnum<T: MachineEnumerable> {
    Value(T),
    Unknown(u8),
}

impl<T: MachineEnumerable> MachineEnum<T> {
    pub fn decode(value: u8) -> Self {
        if let Ok(value) = T::try_from(value) {
            MachineEnum::Value(value)
        } else {
            MachineEnum::Unknown(value)
        }
    }

    /// Returns the known value, or the raw byte if it isn't in our table.
    pub fn known(self) -> Result<T, u8> {
        match self {
            MachineEnum::Value(v) => Ok(v),
            MachineEnum::Unknown(v) => Err(v),
        }
    }
}

impl<T: MachineEnumerable> From<T> for MachineEnum<T> {
    fn from(t: T) -> Self {
        MachineEnum::Value(t)
    }
}

impl<T: MachineEnumerable> From<MachineEnum<T>> for u8 {
    fn from(value: MachineEnum<T>) -> u8 {
        match value {
            MachineEnum::Value(v) => v.into(),
            MachineEnum::Unknown(v) => v,
        }
    }
}

impl<T: MachineEnumerable> Debug for MachineEnum<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Value(t) => t.fmt(f),
            Self::Unknown(v) => write!(f, "Unknown({:#04x})", v),
        }
    }
}

impl<T: MachineEnumerable + PartialEq> PartialEq<T> for MachineEnum<T> {
    fn eq(&self, other: &T) -> bool {
        match self {
            Self::Value(t) => t.eq(other),
            Self::Unknown(_v) => false,
        }
    }
}
