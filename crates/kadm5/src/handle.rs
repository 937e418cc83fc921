//! Collaborator traits for the administration service
//!
//! The core never speaks the wire protocol itself. An [`Authenticator`]
//! establishes an authenticated [`AdminHandle`], and every remote primitive
//! goes through that handle as a blocking call returning a raw status.
//! Translation into [`crate::Error`] happens in the session, not here.

use std::fmt;

use crate::error::RawResult;
use crate::fields::FieldSet;
use crate::name::PrincipalName;
use crate::record::PrincipalRecord;

/// Privilege bits reported by the administration service for the session's client
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Privileges(u32);

impl Privileges {
    pub const GET: Self = Self(0x01);
    pub const ADD: Self = Self(0x02);
    pub const MODIFY: Self = Self(0x04);
    pub const DELETE: Self = Self(0x08);
    pub const LIST: Self = Self(0x10);
    pub const CHANGE_PASSWORD: Self = Self(0x20);
    pub const ALL: Self = Self(0x3f);

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Every bit of `other` is granted
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for Privileges {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl fmt::Debug for Privileges {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [(Privileges, &str); 6] = [
            (Privileges::GET, "get"),
            (Privileges::ADD, "add"),
            (Privileges::MODIFY, "modify"),
            (Privileges::DELETE, "delete"),
            (Privileges::LIST, "list"),
            (Privileges::CHANGE_PASSWORD, "cpw"),
        ];
        f.debug_set()
            .entries(NAMES.iter().filter(|(p, _)| self.contains(*p)).map(|(_, n)| n))
            .finish()
    }
}

/// Resolved connection parameters handed to the authenticator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitParams {
    pub realm: String,
    pub admin_server: String,
    pub port: u16,
}

/// An authenticated session with the administration service.
///
/// Implementations own whatever the transport needs and release it on drop.
pub trait AdminHandle: Send + Sync {
    /// Read the fields in `fields` of `name`
    fn get_principal(&self, name: &PrincipalName, fields: FieldSet) -> RawResult<PrincipalRecord>;

    /// Create `record.principal` with the fields in `fields`
    fn create_principal(
        &self,
        record: &PrincipalRecord,
        fields: FieldSet,
        password: &[u8],
    ) -> RawResult<()>;

    /// Write the fields in `fields` of `record.principal`
    fn modify_principal(&self, record: &PrincipalRecord, fields: FieldSet) -> RawResult<()>;

    fn rename_principal(&self, from: &PrincipalName, to: &PrincipalName) -> RawResult<()>;

    fn chpass_principal(&self, name: &PrincipalName, password: &[u8]) -> RawResult<()>;

    fn delete_principal(&self, name: &PrincipalName) -> RawResult<()>;

    /// Names matching a glob expression. An expression without a realm
    /// matches in the session realm.
    fn get_principals(&self, expression: &str) -> RawResult<Vec<String>>;

    fn get_privileges(&self) -> RawResult<Privileges>;
}

/// Kerberos library side of session establishment
pub trait Authenticator: Send + Sync {
    /// The local default principal (the primary of the default credential cache)
    fn default_principal(&self) -> RawResult<PrincipalName>;

    /// Default credential cache name
    fn default_ccache_name(&self) -> String;

    /// Principal stored in a credential cache. Fails when the cache does not exist.
    fn ccache_principal(&self, ccache: &str) -> RawResult<PrincipalName>;

    fn init_with_password(
        &self,
        client: &PrincipalName,
        password: &[u8],
        params: &InitParams,
    ) -> RawResult<Box<dyn AdminHandle>>;

    fn init_with_ccache(&self, ccache: &str, params: &InitParams) -> RawResult<Box<dyn AdminHandle>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_privilege_bits() {
        let privs = Privileges::GET | Privileges::LIST;
        assert!(privs.contains(Privileges::GET));
        assert!(!privs.contains(Privileges::ADD));
        assert!(!privs.contains(Privileges::GET | Privileges::ADD));
        assert!(Privileges::ALL.contains(privs));
        assert_eq!(
            Privileges::ALL,
            Privileges::GET
                | Privileges::ADD
                | Privileges::MODIFY
                | Privileges::DELETE
                | Privileges::LIST
                | Privileges::CHANGE_PASSWORD
        );
    }

    #[test]
    fn test_privileges_debug() {
        assert_eq!(format!("{:?}", Privileges::GET | Privileges::DELETE), "{\"get\", \"delete\"}");
    }
}
