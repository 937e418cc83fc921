//! Principal Record
//!
//! The attribute snapshot exchanged with the administration service.
//! Values are kept in their wire encoding (epoch seconds, duration seconds,
//! `0` for unset); the semantic conversion happens in the entity accessors.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::fields::{Field, FieldSet};
use crate::name::PrincipalName;

/// KDB attribute flags carried in the `attributes` field
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrincipalFlags(u32);

impl PrincipalFlags {
    pub const DISALLOW_POSTDATED: Self = Self(0x0001);
    pub const DISALLOW_FORWARDABLE: Self = Self(0x0002);
    pub const DISALLOW_TGT_BASED: Self = Self(0x0004);
    pub const DISALLOW_RENEWABLE: Self = Self(0x0008);
    pub const DISALLOW_PROXIABLE: Self = Self(0x0010);
    pub const DISALLOW_DUP_SKEY: Self = Self(0x0020);
    pub const DISALLOW_ALL_TIX: Self = Self(0x0040);
    pub const REQUIRES_PRE_AUTH: Self = Self(0x0080);
    pub const REQUIRES_HW_AUTH: Self = Self(0x0100);
    pub const REQUIRES_PWCHANGE: Self = Self(0x0200);
    pub const DISALLOW_SVR: Self = Self(0x1000);
    pub const PWCHANGE_SERVICE: Self = Self(0x2000);

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }
}

impl std::ops::BitOr for PrincipalFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl fmt::Debug for PrincipalFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrincipalFlags({:#06x})", self.0)
    }
}

/// One principal's attributes as the service reports them
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrincipalRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub principal: Option<PrincipalName>,
    pub princ_expire_time: i64,
    pub last_pwd_change: i64,
    pub pw_expiration: i64,
    pub max_life: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mod_name: Option<PrincipalName>,
    pub mod_date: i64,
    pub attributes: PrincipalFlags,
    pub kvno: u32,
    pub mkvno: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy: Option<String>,
    pub aux_attributes: i64,
    pub max_renewable_life: i64,
    /// Only maintained when the KDC tracks authentication history
    pub last_success: i64,
    pub last_failed: i64,
    pub fail_auth_count: u32,
}

impl PrincipalRecord {
    pub fn named(principal: PrincipalName) -> Self {
        Self {
            principal: Some(principal),
            ..Self::default()
        }
    }

    /// Copy the values of `fields` from `other`. Fields without storage
    /// (policy clear, key data) are ignored.
    pub fn merge_from(&mut self, other: &PrincipalRecord, fields: FieldSet) {
        for field in fields.iter() {
            match field {
                Field::Principal => self.principal = other.principal.clone(),
                Field::PrincExpireTime => self.princ_expire_time = other.princ_expire_time,
                Field::PwExpiration => self.pw_expiration = other.pw_expiration,
                Field::LastPwdChange => self.last_pwd_change = other.last_pwd_change,
                Field::Attributes => self.attributes = other.attributes,
                Field::MaxLife => self.max_life = other.max_life,
                Field::ModTime => self.mod_date = other.mod_date,
                Field::ModName => self.mod_name = other.mod_name.clone(),
                Field::Kvno => self.kvno = other.kvno,
                Field::Mkvno => self.mkvno = other.mkvno,
                Field::AuxAttributes => self.aux_attributes = other.aux_attributes,
                Field::Policy => self.policy = other.policy.clone(),
                Field::MaxRLife => self.max_renewable_life = other.max_renewable_life,
                Field::LastSuccess => self.last_success = other.last_success,
                Field::LastFailed => self.last_failed = other.last_failed,
                Field::FailAuthCount => self.fail_auth_count = other.fail_auth_count,
                Field::PolicyClr | Field::KeyData => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(text: &str) -> PrincipalName {
        PrincipalName::parse(text, "EXAMPLE.COM").unwrap()
    }

    #[test]
    fn test_merge_copies_only_selected_fields() {
        let mut local = PrincipalRecord::named(name("jdoe"));
        local.max_life = 3600;

        let remote = PrincipalRecord {
            principal: Some(name("other")),
            max_life: 7200,
            pw_expiration: 1_700_000_000,
            policy: Some("strict".to_string()),
            ..PrincipalRecord::default()
        };

        let fields = FieldSet::from(Field::PwExpiration).with(Field::Policy);
        local.merge_from(&remote, fields);

        assert_eq!(local.principal, Some(name("jdoe")));
        assert_eq!(local.max_life, 3600);
        assert_eq!(local.pw_expiration, 1_700_000_000);
        assert_eq!(local.policy.as_deref(), Some("strict"));
    }

    #[test]
    fn test_flags() {
        let mut flags = PrincipalFlags::REQUIRES_PRE_AUTH | PrincipalFlags::DISALLOW_SVR;
        assert!(flags.contains(PrincipalFlags::REQUIRES_PRE_AUTH));
        flags.remove(PrincipalFlags::REQUIRES_PRE_AUTH);
        assert_eq!(flags.bits(), 0x1000);
    }

    #[test]
    fn test_serialization_skips_absent_names() {
        let json = serde_json::to_value(PrincipalRecord::default()).unwrap();
        assert!(json.get("principal").is_none());
        assert_eq!(json["maxRenewableLife"], 0);
    }
}
