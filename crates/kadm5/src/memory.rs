//! In-memory administration service
//!
//! [`MemoryRealm`] implements both collaborator traits against a principal
//! database held in memory. It enforces the server-side rules the core relies
//! on (unknown principals, duplicates, field masks a request may not carry,
//! glob filters) and records every call in order, so tests can assert on the
//! remote traffic a sequence of operations produced. Failures can be injected
//! for the next call of a given kind.

use kadm_config::AdminConfig;
use parking_lot::Mutex;
use regex::Regex;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;
use zeroize::Zeroizing;

use crate::error::{codes, RawResult, Status};
use crate::fields::{Field, FieldSet};
use crate::handle::{AdminHandle, Authenticator, InitParams, Privileges};
use crate::name::PrincipalName;
use crate::record::PrincipalRecord;

/// Administrative client seeded into every realm
pub const ADMIN_CLIENT: &str = "admin/admin";

/// Password of [`ADMIN_CLIENT`]
pub const ADMIN_PASSWORD: &str = "secret";

/// Fake clock start; every mutating call advances it by one second
const EPOCH_BASE: i64 = 1_700_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    Init,
    Get,
    Create,
    Modify,
    Rename,
    ChangePassword,
    Delete,
    List,
    Privileges,
}

/// One call received by the service
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    InitWithPassword { client: String },
    InitWithCcache { ccache: String },
    Get { name: String, fields: FieldSet },
    Create { name: String, fields: FieldSet },
    Modify { name: String, fields: FieldSet },
    Rename { from: String, to: String },
    ChangePassword { name: String },
    Delete { name: String },
    List { expression: String },
    Privileges,
}

impl Call {
    pub fn kind(&self) -> CallKind {
        match self {
            Self::InitWithPassword { .. } | Self::InitWithCcache { .. } => CallKind::Init,
            Self::Get { .. } => CallKind::Get,
            Self::Create { .. } => CallKind::Create,
            Self::Modify { .. } => CallKind::Modify,
            Self::Rename { .. } => CallKind::Rename,
            Self::ChangePassword { .. } => CallKind::ChangePassword,
            Self::Delete { .. } => CallKind::Delete,
            Self::List { .. } => CallKind::List,
            Self::Privileges => CallKind::Privileges,
        }
    }
}

struct Entry {
    record: PrincipalRecord,
    password: Zeroizing<Vec<u8>>,
}

struct RealmState {
    realm: String,
    principals: BTreeMap<String, Entry>,
    privileges: Privileges,
    default_principal: Option<PrincipalName>,
    ccaches: HashMap<String, PrincipalName>,
    calls: Vec<Call>,
    failures: HashMap<CallKind, VecDeque<Status>>,
    last_init: Option<InitParams>,
    clock: i64,
}

impl RealmState {
    /// Log a call and pop an injected failure for its kind, if any
    fn enter(&mut self, call: Call) -> RawResult<()> {
        let kind = call.kind();
        self.calls.push(call);
        match self.failures.get_mut(&kind).and_then(VecDeque::pop_front) {
            Some(status) => Err(status),
            None => Ok(()),
        }
    }

    fn tick(&mut self) -> i64 {
        self.clock += 1;
        self.clock
    }

    fn entry_mut(&mut self, name: &PrincipalName) -> RawResult<&mut Entry> {
        self.principals
            .get_mut(&name.to_string())
            .ok_or(Status::new(codes::KADM5_UNK_PRINC))
    }

    fn insert(&mut self, record: PrincipalRecord, password: &[u8]) -> RawResult<()> {
        let name = record
            .principal
            .as_ref()
            .ok_or(Status::new(codes::KADM5_BAD_PRINCIPAL))?
            .to_string();
        if self.principals.contains_key(&name) {
            return Err(Status::new(codes::KADM5_DUP));
        }
        self.principals.insert(
            name,
            Entry {
                record,
                password: Zeroizing::new(password.to_vec()),
            },
        );
        Ok(())
    }
}

/// Cheaply cloneable handle to a shared in-memory realm
#[derive(Clone)]
pub struct MemoryRealm {
    state: Arc<Mutex<RealmState>>,
}

impl MemoryRealm {
    /// An empty realm holding only [`ADMIN_CLIENT`], which has every privilege
    pub fn new(realm: &str) -> Self {
        let state = RealmState {
            realm: realm.to_string(),
            principals: BTreeMap::new(),
            privileges: Privileges::ALL,
            default_principal: None,
            ccaches: HashMap::new(),
            calls: Vec::new(),
            failures: HashMap::new(),
            last_init: None,
            clock: EPOCH_BASE,
        };
        let memory = Self {
            state: Arc::new(Mutex::new(state)),
        };
        if let Err(status) = memory.add_principal(ADMIN_CLIENT, ADMIN_PASSWORD) {
            tracing::warn!(realm, code = status.code(), "Could not seed the admin principal");
        }
        memory
    }

    pub fn with_principal(self, name: &str, password: &str) -> RawResult<Self> {
        self.add_principal(name, password)?;
        Ok(self)
    }

    /// Store a principal directly. Fails with `KADM5_BAD_PRINCIPAL` for an
    /// unparsable name and `KADM5_DUP` when it is already present.
    pub fn add_principal(&self, name: &str, password: &str) -> RawResult<()> {
        let mut state = self.state.lock();
        let principal = PrincipalName::parse(name, &state.realm)
            .map_err(|_| Status::new(codes::KADM5_BAD_PRINCIPAL))?;
        let now = state.tick();
        let record = PrincipalRecord {
            principal: Some(principal),
            kvno: 1,
            last_pwd_change: now,
            mod_date: now,
            ..PrincipalRecord::default()
        };
        state.insert(record, password.as_bytes())
    }

    /// Change a stored record directly, bypassing the service rules
    pub fn update_record(&self, name: &str, update: impl FnOnce(&mut PrincipalRecord)) -> RawResult<()> {
        let mut state = self.state.lock();
        let key = self.key(&state, name);
        let entry = state
            .principals
            .get_mut(&key)
            .ok_or(Status::new(codes::KADM5_UNK_PRINC))?;
        update(&mut entry.record);
        Ok(())
    }

    pub fn record(&self, name: &str) -> Option<PrincipalRecord> {
        let state = self.state.lock();
        let key = self.key(&state, name);
        state.principals.get(&key).map(|e| e.record.clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.record(name).is_some()
    }

    pub fn password_matches(&self, name: &str, password: &str) -> bool {
        let state = self.state.lock();
        let key = self.key(&state, name);
        state
            .principals
            .get(&key)
            .is_some_and(|e| e.password.as_slice() == password.as_bytes())
    }

    /// Sorted names of every stored principal
    pub fn principal_names(&self) -> Vec<String> {
        self.state.lock().principals.keys().cloned().collect()
    }

    pub fn set_privileges(&self, privileges: Privileges) {
        self.state.lock().privileges = privileges;
    }

    /// The principal `default_principal()` reports, as the local Kerberos library would
    pub fn set_default_principal(&self, name: &str) {
        let mut state = self.state.lock();
        let principal = PrincipalName::parse(name, &state.realm).ok();
        state.default_principal = principal;
    }

    /// Register a credential cache holding tickets for `principal`
    pub fn add_ccache(&self, ccache: &str, principal: &str) {
        let mut state = self.state.lock();
        if let Ok(principal) = PrincipalName::parse(principal, &state.realm) {
            state.ccaches.insert(ccache.to_string(), principal);
        }
    }

    /// Make the next call of `kind` fail with `status`
    pub fn fail_next(&self, kind: CallKind, status: Status) {
        self.state
            .lock()
            .failures
            .entry(kind)
            .or_default()
            .push_back(status);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().calls.clone()
    }

    pub fn call_kinds(&self) -> Vec<CallKind> {
        self.state.lock().calls.iter().map(Call::kind).collect()
    }

    pub fn call_count(&self, kind: CallKind) -> usize {
        self.state.lock().calls.iter().filter(|c| c.kind() == kind).count()
    }

    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    /// Parameters of the most recent session initialisation
    pub fn last_init_params(&self) -> Option<InitParams> {
        self.state.lock().last_init.clone()
    }

    /// Configuration pointing at this realm with [`ADMIN_CLIENT`] as client
    pub fn admin_config(&self) -> AdminConfig {
        let realm = self.state.lock().realm.clone();
        let mut config = AdminConfig::default();
        config.session.client = Some(ADMIN_CLIENT.to_string());
        config.libdefaults.default_realm = Some(realm.clone());
        config.realms.insert(
            realm.clone(),
            kadm_config::RealmSettings {
                admin_server: Some(format!("kdc.{}", realm.to_lowercase())),
            },
        );
        config
    }

    fn key(&self, state: &RealmState, name: &str) -> String {
        match PrincipalName::parse(name, &state.realm) {
            Ok(principal) => principal.to_string(),
            Err(_) => name.to_string(),
        }
    }

    fn handle(&self, client: PrincipalName, params: &InitParams) -> Box<dyn AdminHandle> {
        self.state.lock().last_init = Some(params.clone());
        Box::new(MemoryHandle {
            state: Arc::clone(&self.state),
            client,
        })
    }
}

impl Authenticator for MemoryRealm {
    fn default_principal(&self) -> RawResult<PrincipalName> {
        self.state
            .lock()
            .default_principal
            .clone()
            .ok_or(Status::new(codes::KRB5_CC_NOTFOUND))
    }

    fn default_ccache_name(&self) -> String {
        "FILE:/tmp/krb5cc_memory".to_string()
    }

    fn ccache_principal(&self, ccache: &str) -> RawResult<PrincipalName> {
        self.state
            .lock()
            .ccaches
            .get(ccache)
            .cloned()
            .ok_or(Status::new(codes::KRB5_FCC_NOFILE))
    }

    fn init_with_password(
        &self,
        client: &PrincipalName,
        password: &[u8],
        params: &InitParams,
    ) -> RawResult<Box<dyn AdminHandle>> {
        {
            let mut state = self.state.lock();
            state.enter(Call::InitWithPassword {
                client: client.to_string(),
            })?;
            if params.realm != state.realm {
                return Err(Status::new(codes::KRB5_REALM_UNKNOWN));
            }
            let accepted = state
                .principals
                .get(&client.to_string())
                .is_some_and(|e| e.password.as_slice() == password);
            if !accepted {
                return Err(Status::new(codes::KADM5_BAD_PASSWORD));
            }
        }
        Ok(self.handle(client.clone(), params))
    }

    fn init_with_ccache(&self, ccache: &str, params: &InitParams) -> RawResult<Box<dyn AdminHandle>> {
        let client = {
            let mut state = self.state.lock();
            state.enter(Call::InitWithCcache {
                ccache: ccache.to_string(),
            })?;
            if params.realm != state.realm {
                return Err(Status::new(codes::KRB5_REALM_UNKNOWN));
            }
            state
                .ccaches
                .get(ccache)
                .cloned()
                .ok_or(Status::new(codes::KRB5_FCC_NOFILE))?
        };
        Ok(self.handle(client, params))
    }
}

struct MemoryHandle {
    state: Arc<Mutex<RealmState>>,
    client: PrincipalName,
}

/// Reject masks carrying a field the operation does not accept
fn check_mask(fields: FieldSet, allowed: fn(Field) -> bool) -> RawResult<()> {
    if fields.iter().all(allowed) {
        Ok(())
    } else {
        Err(Status::new(codes::KADM5_BAD_MASK))
    }
}

/// Translate a glob expression into an anchored regex
fn glob_to_regex(expression: &str) -> Option<Regex> {
    let mut pattern = String::from("^");
    for c in expression.chars() {
        match c {
            '*' => pattern.push_str(".*"),
            '?' => pattern.push('.'),
            other => pattern.push_str(&regex::escape(other.encode_utf8(&mut [0; 4]))),
        }
    }
    pattern.push('$');
    Regex::new(&pattern).ok()
}

impl AdminHandle for MemoryHandle {
    fn get_principal(&self, name: &PrincipalName, fields: FieldSet) -> RawResult<PrincipalRecord> {
        let mut state = self.state.lock();
        state.enter(Call::Get {
            name: name.to_string(),
            fields,
        })?;

        let entry = state.entry_mut(name)?;
        let mut out = PrincipalRecord::default();
        out.merge_from(&entry.record, fields);
        Ok(out)
    }

    fn create_principal(
        &self,
        record: &PrincipalRecord,
        fields: FieldSet,
        password: &[u8],
    ) -> RawResult<()> {
        let mut state = self.state.lock();
        state.enter(Call::Create {
            name: record
                .principal
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default(),
            fields,
        })?;

        check_mask(fields, Field::allowed_on_create)?;
        if !fields.contains(Field::Principal) {
            return Err(Status::new(codes::KADM5_BAD_MASK));
        }
        if password.is_empty() {
            return Err(Status::new(codes::KADM5_PASS_Q_TOOSHORT));
        }

        let now = state.tick();
        let mut stored = PrincipalRecord {
            kvno: 1,
            ..PrincipalRecord::default()
        };
        stored.merge_from(record, fields);
        stored.last_pwd_change = now;
        stored.mod_date = now;
        stored.mod_name = Some(self.client.clone());

        state.insert(stored, password)
    }

    fn modify_principal(&self, record: &PrincipalRecord, fields: FieldSet) -> RawResult<()> {
        let mut state = self.state.lock();
        let name = record
            .principal
            .clone()
            .ok_or(Status::new(codes::KADM5_BAD_PRINCIPAL))?;
        state.enter(Call::Modify {
            name: name.to_string(),
            fields,
        })?;

        check_mask(fields, Field::allowed_on_modify)?;
        if fields.contains(Field::Policy) && fields.contains(Field::PolicyClr) {
            return Err(Status::new(codes::KADM5_BAD_MASK));
        }

        let now = state.tick();
        let entry = state.entry_mut(&name)?;
        entry.record.merge_from(record, fields);
        if fields.contains(Field::PolicyClr) {
            entry.record.policy = None;
        }
        entry.record.mod_date = now;
        entry.record.mod_name = Some(self.client.clone());
        Ok(())
    }

    fn rename_principal(&self, from: &PrincipalName, to: &PrincipalName) -> RawResult<()> {
        let mut state = self.state.lock();
        state.enter(Call::Rename {
            from: from.to_string(),
            to: to.to_string(),
        })?;

        if state.principals.contains_key(&to.to_string()) {
            return Err(Status::new(codes::KADM5_DUP));
        }
        let mut entry = state
            .principals
            .remove(&from.to_string())
            .ok_or(Status::new(codes::KADM5_UNK_PRINC))?;

        entry.record.principal = Some(to.clone());
        entry.record.mod_date = state.tick();
        entry.record.mod_name = Some(self.client.clone());
        state.principals.insert(to.to_string(), entry);
        Ok(())
    }

    fn chpass_principal(&self, name: &PrincipalName, password: &[u8]) -> RawResult<()> {
        let mut state = self.state.lock();
        state.enter(Call::ChangePassword {
            name: name.to_string(),
        })?;

        if password.is_empty() {
            return Err(Status::new(codes::KADM5_PASS_Q_TOOSHORT));
        }

        let now = state.tick();
        let entry = state.entry_mut(name)?;
        entry.password = Zeroizing::new(password.to_vec());
        entry.record.kvno += 1;
        entry.record.last_pwd_change = now;
        entry.record.mod_date = now;
        entry.record.mod_name = Some(self.client.clone());
        Ok(())
    }

    fn delete_principal(&self, name: &PrincipalName) -> RawResult<()> {
        let mut state = self.state.lock();
        state.enter(Call::Delete {
            name: name.to_string(),
        })?;

        state
            .principals
            .remove(&name.to_string())
            .map(|_| ())
            .ok_or(Status::new(codes::KADM5_UNK_PRINC))
    }

    fn get_principals(&self, expression: &str) -> RawResult<Vec<String>> {
        let mut state = self.state.lock();
        state.enter(Call::List {
            expression: expression.to_string(),
        })?;

        let expression = if expression.contains('@') {
            expression.to_string()
        } else {
            format!("{}@{}", expression, state.realm)
        };
        let regex = glob_to_regex(&expression).ok_or(Status::new(codes::KADM5_FAILURE))?;

        Ok(state
            .principals
            .keys()
            .filter(|name| regex.is_match(name))
            .cloned()
            .collect())
    }

    fn get_privileges(&self) -> RawResult<Privileges> {
        let mut state = self.state.lock();
        state.enter(Call::Privileges)?;
        Ok(state.privileges)
    }
}
