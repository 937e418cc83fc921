//! kadm5 - Kerberos realm administration
//!
//! An object model over the remote administration protocol. A
//! [`Connection`] authenticates a [`Session`] and hands out [`Principal`]s,
//! which load lazily, track local changes per field and apply them with
//! [`Principal::commit`].
//!
//! The protocol itself is reached through the [`Authenticator`] and
//! [`AdminHandle`] traits. [`memory::MemoryRealm`] implements both in memory.
//!
//! ```no_run
//! use kadm5::{memory::MemoryRealm, Connection, Lifetime};
//!
//! # fn main() -> kadm5::Result<()> {
//! let realm = MemoryRealm::new("EXAMPLE.COM");
//! let conn = Connection::from_password(&realm.admin_config(), &realm, "secret")?;
//!
//! let mut principal = conn.create_principal("jdoe", None)?;
//! principal.set_max_lifetime(Lifetime::hours(10));
//! principal.commit()?;
//! # Ok(())
//! # }
//! ```

pub mod connection;
pub mod error;
pub mod fields;
pub mod handle;
pub mod memory;
pub mod name;
pub mod password;
pub mod principal;
pub mod record;
pub mod secret;
pub mod session;

pub use connection::Connection;
pub use error::{Error, RawResult, Result, Status};
pub use fields::{Field, FieldSet};
pub use handle::{AdminHandle, Authenticator, InitParams, Privileges};
pub use name::PrincipalName;
pub use password::{CharacterClass, PasswordGenerator};
pub use principal::Principal;
pub use record::{PrincipalFlags, PrincipalRecord};
pub use secret::Secret;
pub use session::{Credentials, Resolver, Session};

pub use kadm_common::{Lifetime, Moment};
