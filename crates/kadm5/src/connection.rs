//! Connection
//!
//! Entry point of the library: authenticates a session and hands out
//! [`Principal`]s. Every operation checks the client's privileges first;
//! privileges are queried on each check since they can change mid-session.

use kadm_config::AdminConfig;
use std::sync::Arc;
use tracing::info;

use crate::error::{AuthOperation, Error, Result};
use crate::handle::{Authenticator, Privileges};
use crate::name::PrincipalName;
use crate::password::PasswordGenerator;
use crate::principal::Principal;
use crate::secret::Secret;
use crate::session::{Credentials, Session};

pub struct Connection {
    session: Arc<Session>,
    generator: Arc<PasswordGenerator>,
}

impl Connection {
    /// Authenticate with the client's password
    pub fn from_password(
        config: &AdminConfig,
        authenticator: &dyn Authenticator,
        password: impl Into<Secret>,
    ) -> Result<Self> {
        Self::connect(config, authenticator, Credentials::Password(password.into()))
    }

    /// Authenticate with the credentials in a credential cache
    pub fn from_credential_cache(
        config: &AdminConfig,
        authenticator: &dyn Authenticator,
        ccache: Option<&str>,
    ) -> Result<Self> {
        Self::connect(
            config,
            authenticator,
            Credentials::CredentialCache(ccache.map(str::to_string)),
        )
    }

    fn connect(config: &AdminConfig, authenticator: &dyn Authenticator, credentials: Credentials) -> Result<Self> {
        let generator = PasswordGenerator::from_settings(&config.password)?;
        let session = Session::establish(config, authenticator, credentials)?;
        Ok(Self::new(Arc::new(session), Arc::new(generator)))
    }

    pub fn new(session: Arc<Session>, generator: Arc<PasswordGenerator>) -> Self {
        Self { session, generator }
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn client(&self) -> &PrincipalName {
        self.session.client()
    }

    pub fn realm(&self) -> &str {
        self.session.realm()
    }

    pub fn host(&self) -> &str {
        self.session.host()
    }

    pub fn port(&self) -> u16 {
        self.session.port()
    }

    /// A new, uncommitted principal. A random password is generated at
    /// commit when none is given.
    ///
    /// The existence check and the later create are separate remote calls,
    /// so a principal created elsewhere in between makes the commit fail
    /// with an already-exists error instead.
    pub fn create_principal(&self, name: &str, password: Option<&str>) -> Result<Principal> {
        self.require(Privileges::ADD, AuthOperation::Add)?;

        let id = self.session.parse_name(name)?;
        if !self.list_principals(&id.to_string())?.is_empty() {
            return Err(Error::already_exists());
        }

        let mut principal = Principal::new_absent(Arc::clone(&self.session), Arc::clone(&self.generator), id);
        if let Some(password) = password.filter(|p| !p.is_empty()) {
            principal.set_password(password);
        }
        Ok(principal)
    }

    /// The single principal matching `filter`. Its attributes are read on first access.
    pub fn get_principal(&self, filter: &str) -> Result<Principal> {
        self.require(Privileges::GET, AuthOperation::Get)?;

        let mut names = self.list_principals(filter)?;
        match names.len() {
            0 => Err(Error::unknown_principal()),
            1 => {
                let name = names.remove(0);
                Ok(self.principal(self.session.parse_name(&name)?))
            }
            _ => Err(Error::ambiguous_name()),
        }
    }

    /// Every principal matching `filter`
    pub fn get_principals(&self, filter: &str) -> Result<Vec<Principal>> {
        self.require(Privileges::GET, AuthOperation::Get)?;

        self.list_principals(filter)?
            .iter()
            .map(|name| self.session.parse_name(name).map(|id| self.principal(id)))
            .collect()
    }

    /// Names matching a glob `filter`; the session realm applies when the filter has none
    pub fn list_principals(&self, filter: &str) -> Result<Vec<String>> {
        self.require(Privileges::LIST, AuthOperation::List)?;
        self.session.list(filter)
    }

    /// Delete the principal on the server under its identifier
    pub fn delete_principal(&self, principal: &mut Principal) -> Result<()> {
        self.require(Privileges::DELETE, AuthOperation::Delete)?;

        self.session.delete(principal.id())?;
        info!(principal = %principal.id(), "Deleted principal");
        principal.mark_deleted();
        Ok(())
    }

    pub fn privileges(&self) -> Result<Privileges> {
        self.session.privileges()
    }

    pub fn may_get(&self) -> Result<bool> {
        self.has_privileges(Privileges::GET)
    }

    pub fn may_add(&self) -> Result<bool> {
        self.has_privileges(Privileges::ADD)
    }

    pub fn may_modify(&self) -> Result<bool> {
        self.has_privileges(Privileges::MODIFY)
    }

    pub fn may_delete(&self) -> Result<bool> {
        self.has_privileges(Privileges::DELETE)
    }

    pub fn may_list(&self) -> Result<bool> {
        self.has_privileges(Privileges::LIST)
    }

    pub fn may_change_password(&self) -> Result<bool> {
        self.has_privileges(Privileges::CHANGE_PASSWORD)
    }

    pub fn may_all(&self) -> Result<bool> {
        self.has_privileges(Privileges::ALL)
    }

    fn has_privileges(&self, required: Privileges) -> Result<bool> {
        Ok(self.session.privileges()?.contains(required))
    }

    fn require(&self, required: Privileges, operation: AuthOperation) -> Result<()> {
        if self.has_privileges(required)? {
            Ok(())
        } else {
            Err(Error::unauthorized(operation))
        }
    }

    fn principal(&self, id: PrincipalName) -> Principal {
        Principal::new(Arc::clone(&self.session), Arc::clone(&self.generator), id)
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection").field("session", &self.session).finish()
    }
}
