//! Authenticated session with the administration service
//!
//! A [`Session`] owns the handle returned by the [`Authenticator`], caches
//! the resolved client, realm, host and port, and exposes the remote
//! primitives. Raw statuses are translated into [`Error`] here and nowhere
//! else. Sessions are shared behind an `Arc` by the connection and every
//! principal it hands out.

use kadm_config::{AdminConfig, DEFAULT_KADMIND_PORT};
use std::fmt;
use tracing::{debug, info};

use crate::error::{codes, Error, Result, Status};
use crate::fields::FieldSet;
use crate::handle::{AdminHandle, Authenticator, InitParams, Privileges};
use crate::name::{PrincipalName, ADMIN_INSTANCE};
use crate::record::PrincipalRecord;
use crate::secret::Secret;

/// How a session authenticates
pub enum Credentials {
    Password(Secret),
    /// Credential cache name; the configured or library default cache when `None`
    CredentialCache(Option<String>),
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Password(_) => f.write_str("Password(<redacted>)"),
            Self::CredentialCache(name) => f.debug_tuple("CredentialCache").field(name).finish(),
        }
    }
}

/// Resolves connection parameters from explicit settings and library defaults
pub struct Resolver<'a> {
    config: &'a AdminConfig,
}

impl<'a> Resolver<'a> {
    pub fn new(config: &'a AdminConfig) -> Self {
        Self { config }
    }

    /// Explicit realm, else the library default realm
    pub fn resolve_realm(&self) -> Result<String> {
        self.config
            .session
            .realm
            .as_deref()
            .filter(|r| !r.is_empty())
            .or(self.config.libdefaults.default_realm.as_deref())
            .filter(|r| !r.is_empty())
            .map(str::to_string)
            .ok_or_else(|| Error::from(Status::new(codes::KRB5_CONFIG_NODEFREALM)))
    }

    /// The client principal with its instance forced to `admin`. Without an
    /// explicit client the local default principal is used.
    pub fn resolve_client(&self, realm: &str, authenticator: &dyn Authenticator) -> Result<PrincipalName> {
        let base = match self.config.session.client.as_deref().filter(|c| !c.is_empty()) {
            Some(client) => PrincipalName::parse(client, realm)?,
            None => authenticator.default_principal().map_err(Error::from)?,
        };
        Ok(base.with_instance(ADMIN_INSTANCE))
    }

    /// Explicit admin server, else the realm's configured one, without any port
    pub fn resolve_host(&self, realm: &str) -> Result<String> {
        let server = self.admin_server(realm).ok_or_else(no_admin_server)?;
        let (host, _) = split_admin_server(server)?;
        Ok(host.to_string())
    }

    /// A port embedded in the admin server string always wins over the
    /// explicit port, which wins over the service default.
    pub fn resolve_port(&self, realm: &str) -> Result<u16> {
        if let Some(server) = self.admin_server(realm) {
            if let (_, Some(port)) = split_admin_server(server)? {
                return Ok(port);
            }
        }
        Ok(self
            .config
            .session
            .port
            .filter(|p| *p > 0)
            .unwrap_or(DEFAULT_KADMIND_PORT))
    }

    pub fn resolve_params(&self, realm: &str) -> Result<InitParams> {
        Ok(InitParams {
            realm: realm.to_string(),
            admin_server: self.resolve_host(realm)?,
            port: self.resolve_port(realm)?,
        })
    }

    fn admin_server(&self, realm: &str) -> Option<&'a str> {
        self.config
            .session
            .admin_server
            .as_deref()
            .filter(|s| !s.is_empty())
            .or_else(|| self.config.realm_admin_server(realm))
    }
}

fn no_admin_server() -> Error {
    Error::from(Status::new(codes::KADM5_BAD_SERVER_NAME))
}

/// Split `host[:port]`
fn split_admin_server(server: &str) -> Result<(&str, Option<u16>)> {
    match server.rsplit_once(':') {
        Some((host, port)) if !host.is_empty() => {
            let port = port.parse::<u16>().ok().filter(|p| *p > 0).ok_or_else(no_admin_server)?;
            Ok((host, Some(port)))
        }
        Some(_) => Err(no_admin_server()),
        None => Ok((server, None)),
    }
}

/// Credential cache name with the `FILE:` type assumed when none is given
fn qualify_ccache_name(name: &str) -> String {
    if name.contains(':') {
        name.to_string()
    } else {
        format!("FILE:{}", name)
    }
}

pub struct Session {
    handle: Box<dyn AdminHandle>,
    client: PrincipalName,
    realm: String,
    host: String,
    port: u16,
}

impl Session {
    /// Resolve parameters, authenticate, and verify the new handle with one
    /// privilege query.
    pub fn establish(
        config: &AdminConfig,
        authenticator: &dyn Authenticator,
        credentials: Credentials,
    ) -> Result<Self> {
        let resolver = Resolver::new(config);
        let realm = resolver.resolve_realm()?;
        let params = resolver.resolve_params(&realm)?;

        let (client, handle) = match credentials {
            Credentials::Password(password) => {
                let client = resolver.resolve_client(&realm, authenticator)?;
                let handle = authenticator
                    .init_with_password(&client, password.expose(), &params)
                    .map_err(Error::from)?;
                (client, handle)
            }
            Credentials::CredentialCache(name) => {
                let name = name
                    .or_else(|| config.session.ccache.clone())
                    .unwrap_or_else(|| authenticator.default_ccache_name());
                let name = qualify_ccache_name(&name);
                debug!(ccache = %name, "Opening credential cache");

                // The cache must exist before the handle is requested
                let client = authenticator.ccache_principal(&name).map_err(Error::from)?;
                let handle = authenticator
                    .init_with_ccache(&name, &params)
                    .map_err(Error::from)?;
                (client, handle)
            }
        };

        let privileges = handle.get_privileges().map_err(Error::from)?;

        info!(
            client = %client,
            realm = %realm,
            host = %params.admin_server,
            port = params.port,
            ?privileges,
            "Administration session established"
        );

        Ok(Self {
            handle,
            client,
            realm,
            host: params.admin_server,
            port: params.port,
        })
    }

    pub fn client(&self) -> &PrincipalName {
        &self.client
    }

    pub fn realm(&self) -> &str {
        &self.realm
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Parse a name, defaulting to the session realm
    pub fn parse_name(&self, text: &str) -> Result<PrincipalName> {
        PrincipalName::parse(text, &self.realm)
    }

    pub fn unparse_name(&self, name: &PrincipalName) -> String {
        name.to_string()
    }

    /// The `default` template principal of the session realm
    pub fn default_template(&self) -> Result<PrincipalName> {
        PrincipalName::default_template(&self.realm)
    }

    pub fn fetch(&self, name: &PrincipalName, fields: FieldSet) -> Result<PrincipalRecord> {
        debug!(principal = %name, ?fields, "Fetching principal");
        self.handle.get_principal(name, fields).map_err(Error::from)
    }

    pub fn create(&self, record: &PrincipalRecord, fields: FieldSet, password: &Secret) -> Result<()> {
        debug!(principal = ?record.principal, ?fields, "Creating principal");
        self.handle
            .create_principal(record, fields, password.expose())
            .map_err(Error::from)
    }

    pub fn modify(&self, record: &PrincipalRecord, fields: FieldSet) -> Result<()> {
        debug!(principal = ?record.principal, ?fields, "Modifying principal");
        self.handle.modify_principal(record, fields).map_err(Error::from)
    }

    pub fn rename(&self, from: &PrincipalName, to: &PrincipalName) -> Result<()> {
        debug!(from = %from, to = %to, "Renaming principal");
        self.handle.rename_principal(from, to).map_err(Error::from)
    }

    pub fn change_password(&self, name: &PrincipalName, password: &Secret) -> Result<()> {
        debug!(principal = %name, "Changing password");
        self.handle
            .chpass_principal(name, password.expose())
            .map_err(Error::from)
    }

    pub fn delete(&self, name: &PrincipalName) -> Result<()> {
        debug!(principal = %name, "Deleting principal");
        self.handle.delete_principal(name).map_err(Error::from)
    }

    pub fn list(&self, filter: &str) -> Result<Vec<String>> {
        debug!(filter, "Listing principals");
        self.handle.get_principals(filter).map_err(Error::from)
    }

    pub fn privileges(&self) -> Result<Privileges> {
        self.handle.get_privileges().map_err(Error::from)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("client", &self.client)
            .field("realm", &self.realm)
            .field("host", &self.host)
            .field("port", &self.port)
            .finish_non_exhaustive()
    }
}
