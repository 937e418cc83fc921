//! Principal Entity
//!
//! A lazily loaded, dirty-tracked view of one principal. Reads are deferred
//! until an accessor needs them; setters change only the local snapshot and
//! record the touched field. [`Principal::commit`] applies the pending
//! changes as a sequence of remote calls:
//!
//! 1. create, when the principal does not exist yet (and nothing else)
//! 2. change password, under the current identifier
//! 3. rename to the pending name
//! 4. modify the remaining fields
//!
//! A failing step leaves exactly the unapplied changes marked, so calling
//! `commit` again resumes where the previous attempt stopped.

use kadm_common::{Lifetime, Moment};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::fields::{Field, FieldSet};
use crate::name::PrincipalName;
use crate::password::PasswordGenerator;
use crate::record::{PrincipalFlags, PrincipalRecord};
use crate::secret::{Secret, SecretSlot};
use crate::session::Session;

/// Pending name of a principal relative to its identifier
#[derive(Debug, Clone, Default, PartialEq, Eq)]
enum NameSlot {
    /// The name is the identifier
    #[default]
    Aliased,
    /// A rename to this name has not been committed yet
    Pending(PrincipalName),
}

impl NameSlot {
    fn pending(&self) -> Option<&PrincipalName> {
        match self {
            Self::Pending(name) => Some(name),
            Self::Aliased => None,
        }
    }

    fn replace(&mut self, name: PrincipalName) -> Option<PrincipalName> {
        match std::mem::replace(self, Self::Pending(name)) {
            Self::Pending(previous) => Some(previous),
            Self::Aliased => None,
        }
    }

    fn take(&mut self) -> Option<PrincipalName> {
        match std::mem::take(self) {
            Self::Pending(name) => Some(name),
            Self::Aliased => None,
        }
    }
}

/// What is known about the principal on the server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Presence {
    /// Not asked yet
    Unknown,
    Absent,
    Present,
}

pub struct Principal {
    session: Arc<Session>,
    generator: Arc<PasswordGenerator>,
    id: PrincipalName,
    name: NameSlot,
    record: PrincipalRecord,
    secret: SecretSlot,
    loaded: bool,
    presence: Presence,
    dirty: FieldSet,
}

impl Principal {
    /// A principal expected to exist on the server. Nothing is read yet.
    pub(crate) fn new(session: Arc<Session>, generator: Arc<PasswordGenerator>, id: PrincipalName) -> Self {
        Self {
            session,
            generator,
            id,
            name: NameSlot::Aliased,
            record: PrincipalRecord::default(),
            secret: SecretSlot::default(),
            loaded: false,
            presence: Presence::Unknown,
            dirty: FieldSet::empty(),
        }
    }

    /// A principal known not to exist on the server yet
    pub(crate) fn new_absent(
        session: Arc<Session>,
        generator: Arc<PasswordGenerator>,
        id: PrincipalName,
    ) -> Self {
        let mut principal = Self::new(session, generator, id);
        principal.presence = Presence::Absent;
        principal
    }

    /// The name the server knows this principal by
    pub fn id(&self) -> &PrincipalName {
        &self.id
    }

    /// The display name: the pending name if a rename is pending, else the identifier
    pub fn name(&self) -> &PrincipalName {
        self.name.pending().unwrap_or(&self.id)
    }

    /// Parse and stage a new name. A malformed name fails here, not at commit.
    pub fn set_name(&mut self, name: &str) -> Result<()> {
        let name = self.session.parse_name(name)?;
        if name == self.id {
            self.name.take();
            self.dirty.remove(Field::Principal);
        } else {
            self.name.replace(name);
            self.dirty.insert(Field::Principal);
        }
        Ok(())
    }

    /// Stage a new password, wiping any previously staged one
    pub fn set_password(&mut self, password: impl Into<Secret>) {
        self.secret.replace(password.into());
    }

    /// Stage a random password from the connection's generator
    pub fn randomize_password(&mut self) {
        let password = self.generator.generate();
        self.secret.replace(password);
    }

    pub fn exists_on_server(&mut self) -> Result<bool> {
        self.load()?;
        Ok(self.presence == Presence::Present)
    }

    /// Not on the server yet, fields changed locally, or a password staged.
    /// An unloaded principal of unknown presence is not modified.
    pub fn is_modified(&self) -> bool {
        self.presence == Presence::Absent || !self.dirty.is_empty() || self.secret.is_pending()
    }

    /// Read every field that has no local change. A principal unknown to the
    /// server is prefilled from the realm's `default` template instead.
    /// Idempotent until the next commit.
    pub fn load(&mut self) -> Result<()> {
        if self.loaded {
            return Ok(());
        }

        let fields = FieldSet::readable().difference(self.dirty).with(Field::Principal);
        let merged = fields.without(Field::Principal);

        if self.presence != Presence::Absent {
            match self.session.fetch(&self.id, fields) {
                Ok(remote) => {
                    self.record.merge_from(&remote, merged);
                    self.presence = Presence::Present;
                    self.loaded = true;
                    return Ok(());
                }
                Err(e) if e.is_unknown_principal() => {
                    debug!(principal = %self.id, "Principal not found, using realm defaults");
                    self.presence = Presence::Absent;
                }
                Err(e) => return Err(e),
            }
        }

        let template = PrincipalName::default_template(self.id.realm())?;
        match self.session.fetch(&template, fields) {
            Ok(defaults) => self.record.merge_from(&defaults, merged),
            Err(e) if e.is_unknown_principal() => {
                debug!(template = %template, "No default template in realm");
            }
            Err(e) => return Err(e),
        }

        self.loaded = true;
        Ok(())
    }

    /// Apply all staged changes
    pub fn commit(&mut self) -> Result<()> {
        if !self.exists_on_server()? {
            return self.apply_create();
        }

        self.apply_password_change()?;

        if self.dirty.contains(Field::Principal) {
            self.apply_rename()?;
        }

        if !self.dirty.is_empty() {
            self.apply_modify()?;
        }

        Ok(())
    }

    fn apply_create(&mut self) -> Result<()> {
        if !self.secret.is_pending() {
            self.randomize_password();
        }

        let name = self.name().clone();
        let fields = self.dirty.with(Field::Principal).for_create();
        let record = PrincipalRecord {
            principal: Some(name.clone()),
            ..self.record.clone()
        };

        if let Some(password) = self.secret.pending() {
            self.session.create(&record, fields, password)?;
        }
        self.secret.erase();

        info!(principal = %name, "Created principal");

        self.id = name;
        self.name = NameSlot::Aliased;
        self.dirty.clear();
        self.presence = Presence::Present;
        // Server defaults for the omitted fields are unknown locally
        self.loaded = false;
        Ok(())
    }

    fn apply_password_change(&mut self) -> Result<()> {
        if let Some(password) = self.secret.pending() {
            self.session.change_password(&self.id, password)?;
            self.secret.erase();
            self.loaded = false;
        }
        Ok(())
    }

    fn apply_rename(&mut self) -> Result<()> {
        if let Some(target) = self.name.pending() {
            self.session.rename(&self.id, target)?;
            info!(from = %self.id, to = %target, "Renamed principal");
        }

        if let Some(target) = self.name.take() {
            self.id = target;
        }
        self.dirty.remove(Field::Principal);
        self.loaded = false;
        Ok(())
    }

    fn apply_modify(&mut self) -> Result<()> {
        let fields = self.dirty.for_modify();
        if !fields.is_empty() {
            let record = PrincipalRecord {
                principal: Some(self.id.clone()),
                ..self.record.clone()
            };
            self.session.modify(&record, fields)?;
            self.loaded = false;
        }
        self.dirty.clear();
        Ok(())
    }

    /// Record that the principal was deleted on the server
    pub(crate) fn mark_deleted(&mut self) {
        self.name = NameSlot::Aliased;
        self.record = PrincipalRecord::default();
        self.dirty.clear();
        self.presence = Presence::Absent;
        self.loaded = false;
    }

    /// Set a field, marking it dirty unless the loaded value is unchanged
    fn assign<T: PartialEq>(
        &mut self,
        field: Field,
        slot: impl FnOnce(&mut PrincipalRecord) -> &mut T,
        value: T,
    ) {
        let loaded = self.loaded;
        let current = slot(&mut self.record);
        if !loaded || *current != value {
            *current = value;
            self.dirty.insert(field);
        }
    }

    pub fn expire_time(&mut self) -> Result<Moment> {
        self.load()?;
        Ok(Moment::from_expiry_epoch(self.record.princ_expire_time))
    }

    /// Stored with whole-second precision.
    pub fn set_expire_time(&mut self, time: impl Into<Moment>) {
        let value = time.into().to_epoch();
        self.assign(Field::PrincExpireTime, |r| &mut r.princ_expire_time, value);
    }

    pub fn password_expiration(&mut self) -> Result<Moment> {
        self.load()?;
        Ok(Moment::from_expiry_epoch(self.record.pw_expiration))
    }

    /// Stored with whole-second precision.
    pub fn set_password_expiration(&mut self, time: impl Into<Moment>) {
        let value = time.into().to_epoch();
        self.assign(Field::PwExpiration, |r| &mut r.pw_expiration, value);
    }

    pub fn max_lifetime(&mut self) -> Result<Lifetime> {
        self.load()?;
        Ok(Lifetime::from_seconds(self.record.max_life))
    }

    pub fn set_max_lifetime(&mut self, lifetime: impl Into<Lifetime>) {
        let value = lifetime.into().to_seconds();
        self.assign(Field::MaxLife, |r| &mut r.max_life, value);
    }

    pub fn max_renewable_lifetime(&mut self) -> Result<Lifetime> {
        self.load()?;
        Ok(Lifetime::from_seconds(self.record.max_renewable_life))
    }

    pub fn set_max_renewable_lifetime(&mut self, lifetime: impl Into<Lifetime>) {
        let value = lifetime.into().to_seconds();
        self.assign(Field::MaxRLife, |r| &mut r.max_renewable_life, value);
    }

    pub fn attributes(&mut self) -> Result<PrincipalFlags> {
        self.load()?;
        Ok(self.record.attributes)
    }

    pub fn set_attributes(&mut self, flags: PrincipalFlags) {
        self.assign(Field::Attributes, |r| &mut r.attributes, flags);
    }

    pub fn policy(&mut self) -> Result<Option<&str>> {
        self.load()?;
        Ok(self.record.policy.as_deref())
    }

    /// Assign a policy, or clear it with `None`
    pub fn set_policy(&mut self, policy: Option<&str>) {
        match policy {
            Some(policy) => {
                self.dirty.remove(Field::PolicyClr);
                self.assign(Field::Policy, |r| &mut r.policy, Some(policy.to_string()));
            }
            None => {
                self.dirty.remove(Field::Policy);
                self.assign(Field::PolicyClr, |r| &mut r.policy, None);
            }
        }
    }

    pub fn last_password_change(&mut self) -> Result<Moment> {
        self.load()?;
        Ok(Moment::from_history_epoch(self.record.last_pwd_change))
    }

    pub fn modify_time(&mut self) -> Result<Moment> {
        self.load()?;
        Ok(Moment::from_history_epoch(self.record.mod_date))
    }

    /// The principal that last modified this one, if it exists on the server
    pub fn modifier(&mut self) -> Result<Option<Principal>> {
        if !self.exists_on_server()? {
            return Ok(None);
        }
        Ok(self.record.mod_name.clone().map(|name| {
            Principal::new(Arc::clone(&self.session), Arc::clone(&self.generator), name)
        }))
    }

    /// Last successful authentication. `NegInfinity` when the KDC does not
    /// track authentication history.
    pub fn last_success(&mut self) -> Result<Moment> {
        self.load()?;
        Ok(Moment::from_history_epoch(self.record.last_success))
    }

    pub fn last_failed(&mut self) -> Result<Moment> {
        self.load()?;
        Ok(Moment::from_history_epoch(self.record.last_failed))
    }

    pub fn fail_auth_count(&mut self) -> Result<u32> {
        self.load()?;
        Ok(self.record.fail_auth_count)
    }

    pub fn key_version(&mut self) -> Result<u32> {
        self.load()?;
        Ok(self.record.kvno)
    }
}

impl Drop for Principal {
    fn drop(&mut self) {
        if !self.dirty.is_empty() || self.secret.is_pending() {
            warn!(
                principal = %self.id,
                fields = ?self.dirty,
                password_pending = self.secret.is_pending(),
                "Dropping principal with uncommitted changes"
            );
        }
    }
}

impl fmt::Debug for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Principal")
            .field("id", &self.id)
            .field("pending_name", &self.name.pending())
            .field("presence", &self.presence)
            .field("loaded", &self.loaded)
            .field("dirty", &self.dirty)
            .finish_non_exhaustive()
    }
}
