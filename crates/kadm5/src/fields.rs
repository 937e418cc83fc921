//! Principal record fields and field sets.
//!
//! Every remote call that reads or writes a principal names the fields it
//! touches. [`Field`] is the closed set of those fields; [`FieldSet`] is the
//! dirty-tracking and request mask built from them.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Principal,
    PrincExpireTime,
    PwExpiration,
    LastPwdChange,
    Attributes,
    MaxLife,
    ModTime,
    ModName,
    Kvno,
    Mkvno,
    AuxAttributes,
    Policy,
    PolicyClr,
    MaxRLife,
    LastSuccess,
    LastFailed,
    FailAuthCount,
    KeyData,
}

impl Field {
    pub const ALL: [Field; 18] = [
        Field::Principal,
        Field::PrincExpireTime,
        Field::PwExpiration,
        Field::LastPwdChange,
        Field::Attributes,
        Field::MaxLife,
        Field::ModTime,
        Field::ModName,
        Field::Kvno,
        Field::Mkvno,
        Field::AuxAttributes,
        Field::Policy,
        Field::PolicyClr,
        Field::MaxRLife,
        Field::LastSuccess,
        Field::LastFailed,
        Field::FailAuthCount,
        Field::KeyData,
    ];

    /// Protocol mask bit for this field.
    pub const fn mask(self) -> u32 {
        match self {
            Field::Principal => 0x000001,
            Field::PrincExpireTime => 0x000002,
            Field::PwExpiration => 0x000004,
            Field::LastPwdChange => 0x000008,
            Field::Attributes => 0x000010,
            Field::MaxLife => 0x000020,
            Field::ModTime => 0x000040,
            Field::ModName => 0x000080,
            Field::Kvno => 0x000100,
            Field::Mkvno => 0x000200,
            Field::AuxAttributes => 0x000400,
            Field::Policy => 0x000800,
            Field::PolicyClr => 0x001000,
            Field::MaxRLife => 0x002000,
            Field::LastSuccess => 0x004000,
            Field::LastFailed => 0x008000,
            Field::FailAuthCount => 0x010000,
            Field::KeyData => 0x020000,
        }
    }

    /// Whether a create request may carry this field. Server-maintained
    /// fields are rejected by the service.
    pub const fn allowed_on_create(self) -> bool {
        match self {
            Field::Principal
            | Field::PrincExpireTime
            | Field::PwExpiration
            | Field::Attributes
            | Field::MaxLife
            | Field::Kvno
            | Field::Policy
            | Field::MaxRLife => true,
            Field::LastPwdChange
            | Field::ModTime
            | Field::ModName
            | Field::Mkvno
            | Field::AuxAttributes
            | Field::PolicyClr
            | Field::LastSuccess
            | Field::LastFailed
            | Field::FailAuthCount
            | Field::KeyData => false,
        }
    }

    /// Whether a modify request may carry this field. The name itself only
    /// changes through rename.
    pub const fn allowed_on_modify(self) -> bool {
        match self {
            Field::PrincExpireTime
            | Field::PwExpiration
            | Field::Attributes
            | Field::MaxLife
            | Field::Kvno
            | Field::Policy
            | Field::PolicyClr
            | Field::MaxRLife
            | Field::FailAuthCount => true,
            Field::Principal
            | Field::LastPwdChange
            | Field::ModTime
            | Field::ModName
            | Field::Mkvno
            | Field::AuxAttributes
            | Field::LastSuccess
            | Field::LastFailed
            | Field::KeyData => false,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Field::Principal => "principal",
            Field::PrincExpireTime => "princ_expire_time",
            Field::PwExpiration => "pw_expiration",
            Field::LastPwdChange => "last_pwd_change",
            Field::Attributes => "attributes",
            Field::MaxLife => "max_life",
            Field::ModTime => "mod_time",
            Field::ModName => "mod_name",
            Field::Kvno => "kvno",
            Field::Mkvno => "mkvno",
            Field::AuxAttributes => "aux_attributes",
            Field::Policy => "policy",
            Field::PolicyClr => "policy_clr",
            Field::MaxRLife => "max_rlife",
            Field::LastSuccess => "last_success",
            Field::LastFailed => "last_failed",
            Field::FailAuthCount => "fail_auth_count",
            Field::KeyData => "key_data",
        }
    }
}

/// A set of [`Field`]s, stored as the protocol bit mask.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct FieldSet(u32);

impl FieldSet {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub fn all() -> Self {
        Field::ALL.into_iter().collect()
    }

    /// Everything a read can return. Key material is never requested.
    pub fn readable() -> Self {
        Self::all().without(Field::KeyData)
    }

    /// Build from a protocol mask, dropping unknown bits.
    pub fn from_bits_truncate(bits: u32) -> Self {
        Self(bits & Self::all().0)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn contains(self, field: Field) -> bool {
        self.0 & field.mask() != 0
    }

    pub fn insert(&mut self, field: Field) {
        self.0 |= field.mask();
    }

    pub fn remove(&mut self, field: Field) {
        self.0 &= !field.mask();
    }

    pub fn clear(&mut self) {
        self.0 = 0;
    }

    #[must_use]
    pub const fn with(self, field: Field) -> Self {
        Self(self.0 | field.mask())
    }

    #[must_use]
    pub const fn without(self, field: Field) -> Self {
        Self(self.0 & !field.mask())
    }

    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    #[must_use]
    pub const fn difference(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    pub fn iter(self) -> impl Iterator<Item = Field> {
        Field::ALL.into_iter().filter(move |f| self.contains(*f))
    }

    /// The subset a create request may carry.
    pub fn for_create(self) -> Self {
        self.iter().filter(|f| f.allowed_on_create()).collect()
    }

    /// The subset a modify request may carry.
    pub fn for_modify(self) -> Self {
        self.iter().filter(|f| f.allowed_on_modify()).collect()
    }
}

impl FromIterator<Field> for FieldSet {
    fn from_iter<I: IntoIterator<Item = Field>>(iter: I) -> Self {
        let mut set = Self::empty();
        for field in iter {
            set.insert(field);
        }
        set
    }
}

impl From<Field> for FieldSet {
    fn from(field: Field) -> Self {
        Self(field.mask())
    }
}

impl fmt::Debug for FieldSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter().map(Field::as_str)).finish()
    }
}
