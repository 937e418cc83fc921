//! Error taxonomy for the administration protocol.
//!
//! Every non-zero status returned by the administration service or the
//! Kerberos library is translated into exactly one [`Error`] at the session
//! boundary. The enum variants are the categories callers match on; each
//! carries a kind and the original numeric code.
//!
//! `Error` is `Copy` and holds no heap data, so translating a status never
//! allocates. That keeps the out-of-memory status reportable like any other.

use std::fmt;
use thiserror::Error;

/// Numeric status codes understood by the translation table.
pub mod codes {
    pub const OK: i32 = 0;

    // Administration service (kadm5 error table)
    pub const KADM5_FAILURE: i32 = 43787520;
    pub const KADM5_AUTH_GET: i32 = 43787521;
    pub const KADM5_AUTH_ADD: i32 = 43787522;
    pub const KADM5_AUTH_MODIFY: i32 = 43787523;
    pub const KADM5_AUTH_DELETE: i32 = 43787524;
    pub const KADM5_AUTH_INSUFFICIENT: i32 = 43787525;
    pub const KADM5_BAD_DB: i32 = 43787526;
    pub const KADM5_DUP: i32 = 43787527;
    pub const KADM5_RPC_ERROR: i32 = 43787528;
    pub const KADM5_NO_SRV: i32 = 43787529;
    pub const KADM5_BAD_HIST_KEY: i32 = 43787530;
    pub const KADM5_NOT_INIT: i32 = 43787531;
    pub const KADM5_UNK_PRINC: i32 = 43787532;
    pub const KADM5_UNK_POLICY: i32 = 43787533;
    pub const KADM5_BAD_MASK: i32 = 43787534;
    pub const KADM5_BAD_CLASS: i32 = 43787535;
    pub const KADM5_BAD_LENGTH: i32 = 43787536;
    pub const KADM5_BAD_POLICY: i32 = 43787537;
    pub const KADM5_BAD_PRINCIPAL: i32 = 43787538;
    pub const KADM5_BAD_AUX_ATTR: i32 = 43787539;
    pub const KADM5_BAD_HISTORY: i32 = 43787540;
    pub const KADM5_BAD_MIN_PASS_LIFE: i32 = 43787541;
    pub const KADM5_PASS_Q_TOOSHORT: i32 = 43787542;
    pub const KADM5_PASS_Q_CLASS: i32 = 43787543;
    pub const KADM5_PASS_Q_DICT: i32 = 43787544;
    pub const KADM5_PASS_REUSE: i32 = 43787545;
    pub const KADM5_PASS_TOOSOON: i32 = 43787546;
    pub const KADM5_POLICY_REF: i32 = 43787547;
    pub const KADM5_INIT: i32 = 43787548;
    pub const KADM5_BAD_PASSWORD: i32 = 43787549;
    pub const KADM5_PROTECT_PRINCIPAL: i32 = 43787550;
    pub const KADM5_BAD_SERVER_HANDLE: i32 = 43787551;
    pub const KADM5_BAD_STRUCT_VERSION: i32 = 43787552;
    pub const KADM5_OLD_STRUCT_VERSION: i32 = 43787553;
    pub const KADM5_NEW_STRUCT_VERSION: i32 = 43787554;
    pub const KADM5_BAD_API_VERSION: i32 = 43787555;
    pub const KADM5_OLD_LIB_API_VERSION: i32 = 43787556;
    pub const KADM5_OLD_SERVER_API_VERSION: i32 = 43787557;
    pub const KADM5_NEW_LIB_API_VERSION: i32 = 43787558;
    pub const KADM5_NEW_SERVER_API_VERSION: i32 = 43787559;
    pub const KADM5_SECURE_PRINC_MISSING: i32 = 43787560;
    pub const KADM5_NO_RENAME_SALT: i32 = 43787561;
    pub const KADM5_BAD_CLIENT_PARAMS: i32 = 43787562;
    pub const KADM5_BAD_SERVER_PARAMS: i32 = 43787563;
    pub const KADM5_AUTH_LIST: i32 = 43787564;
    pub const KADM5_AUTH_CHANGEPW: i32 = 43787565;
    pub const KADM5_BAD_TL_TYPE: i32 = 43787566;
    pub const KADM5_MISSING_CONF_PARAMS: i32 = 43787567;
    pub const KADM5_BAD_SERVER_NAME: i32 = 43787568;

    /// Raised locally when a name filter matches more than one principal.
    pub const KADM5_AMBIGUOUS_KEY: i32 = 43500000;

    // Kerberos library (krb5 error table)
    pub const KRB5_PARSE_ILLCHAR: i32 = -1765328251;
    pub const KRB5_PARSE_MALFORMED: i32 = -1765328250;
    pub const KRB5_CC_NOTFOUND: i32 = -1765328243;
    pub const KRB5_FCC_NOFILE: i32 = -1765328189;
    pub const KRB5_CONFIG_NODEFREALM: i32 = -1765328160;
    pub const KRB5_REALM_UNKNOWN: i32 = -1765328230;

    /// errno ENOMEM as passed through by the libraries.
    pub const ENOMEM: i32 = 12;
}

/// Raw status as returned by a collaborator. `0` is success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Status(i32);

impl Status {
    pub const OK: Status = Status(codes::OK);

    pub const fn new(code: i32) -> Self {
        Self(code)
    }

    pub const fn code(self) -> i32 {
        self.0
    }

    pub const fn is_ok(self) -> bool {
        self.0 == codes::OK
    }

    /// Translate into a typed result.
    pub fn check(self) -> Result<()> {
        if self.is_ok() {
            Ok(())
        } else {
            Err(Error::from(self))
        }
    }
}

/// Result of a raw collaborator call, before translation.
pub type RawResult<T> = std::result::Result<T, Status>;

pub type Result<T> = std::result::Result<T, Error>;

macro_rules! kind_display {
    ($($kind:ty),+ $(,)?) => {
        $(
            impl fmt::Display for $kind {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(self.as_str())
                }
            }
        )+
    };
}

/// Operation whose privilege was missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthOperation {
    /// The service did not say which privilege was lacking
    Any,
    Get,
    Add,
    Modify,
    Delete,
    List,
    ChangePassword,
}

impl AuthOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Any => "perform this operation",
            Self::Get => "get principals",
            Self::Add => "add principals",
            Self::Modify => "modify principals",
            Self::Delete => "delete principals",
            Self::List => "list principals",
            Self::ChangePassword => "change passwords",
        }
    }

    /// Status the service uses for this missing privilege.
    pub fn code(self) -> i32 {
        match self {
            Self::Any => codes::KADM5_AUTH_INSUFFICIENT,
            Self::Get => codes::KADM5_AUTH_GET,
            Self::Add => codes::KADM5_AUTH_ADD,
            Self::Modify => codes::KADM5_AUTH_MODIFY,
            Self::Delete => codes::KADM5_AUTH_DELETE,
            Self::List => codes::KADM5_AUTH_LIST,
            Self::ChangePassword => codes::KADM5_AUTH_CHANGEPW,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigurationKind {
    /// The server's configuration parameters are invalid
    Remote,
    /// The client's configuration parameters are invalid
    Local,
    MissingParams,
    /// No usable admin server for the realm
    BadServer,
    Database,
}

impl ConfigurationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Remote => "bad server parameters",
            Self::Local => "bad client parameters",
            Self::MissingParams => "missing required configuration",
            Self::BadServer => "no admin server for realm",
            Self::Database => "principal database unavailable",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionKind {
    Rpc,
    NoServer,
    NotInitialized,
    AlreadyInitialized,
    BadPassword,
    BadServerHandle,
    /// The credential cache does not exist or holds no principal
    NoCredentials,
}

impl ConnectionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rpc => "communication failure with server",
            Self::NoServer => "server unreachable",
            Self::NotInitialized => "connection not initialized",
            Self::AlreadyInitialized => "connection already initialized",
            Self::BadPassword => "incorrect password",
            Self::BadServerHandle => "invalid server handle",
            Self::NoCredentials => "no credentials found",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterKind {
    AlreadyExists,
    UnknownPrincipal,
    UnknownPolicy,
    BadMask,
    BadClass,
    BadLength,
    BadPolicy,
    BadPrincipal,
    BadAuxAttributes,
    BadHistory,
    BadMinPasswordLife,
    AmbiguousName,
    PolicyInUse,
    ProtectedPrincipal,
    BadTlType,
    BadHistoryKey,
    NoRenameSalt,
    SecurePrincipalMissing,
}

impl ParameterKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AlreadyExists => "principal already exists",
            Self::UnknownPrincipal => "principal does not exist",
            Self::UnknownPolicy => "policy does not exist",
            Self::BadMask => "invalid field mask",
            Self::BadClass => "invalid character class",
            Self::BadLength => "invalid password length",
            Self::BadPolicy => "invalid policy name",
            Self::BadPrincipal => "malformed principal name",
            Self::BadAuxAttributes => "invalid auxiliary attributes",
            Self::BadHistory => "invalid password history count",
            Self::BadMinPasswordLife => "invalid minimum password lifetime",
            Self::AmbiguousName => "name matches more than one principal",
            Self::PolicyInUse => "policy is in use",
            Self::ProtectedPrincipal => "principal is protected",
            Self::BadTlType => "invalid tagged data type",
            Self::BadHistoryKey => "password history key mismatch",
            Self::NoRenameSalt => "principal keys cannot be renamed",
            Self::SecurePrincipalMissing => "required secure principal missing",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PasswordQualityKind {
    TooShort,
    TooFewClasses,
    InDictionary,
    Reused,
    TooSoon,
}

impl PasswordQualityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TooShort => "password is too short",
            Self::TooFewClasses => "password uses too few character classes",
            Self::InDictionary => "password is in the dictionary",
            Self::Reused => "password was used before",
            Self::TooSoon => "password changed too recently",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VersionKind {
    Struct,
    Api,
}

impl VersionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Struct => "structure version",
            Self::Api => "API version",
        }
    }
}

kind_display!(
    AuthOperation,
    ConfigurationKind,
    ConnectionKind,
    ParameterKind,
    PasswordQualityKind,
    VersionKind,
);

/// A translated administration error.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    #[error("Not authorized to {operation} (status {code})")]
    Authorization { operation: AuthOperation, code: i32 },

    #[error("Configuration error: {kind} (status {code})")]
    Configuration { kind: ConfigurationKind, code: i32 },

    #[error("Connection error: {kind} (status {code})")]
    Connection { kind: ConnectionKind, code: i32 },

    #[error("Bad parameter: {kind} (status {code})")]
    BadParameter { kind: ParameterKind, code: i32 },

    #[error("Password rejected: {kind} (status {code})")]
    PasswordQuality { kind: PasswordQualityKind, code: i32 },

    #[error("Version mismatch: {kind} (status {code})")]
    VersionMismatch { kind: VersionKind, code: i32 },

    #[error("Administration failure (status {code})")]
    Generic { code: i32 },
}

impl Error {
    pub fn unauthorized(operation: AuthOperation) -> Self {
        Self::Authorization {
            operation,
            code: operation.code(),
        }
    }

    pub fn unknown_principal() -> Self {
        Self::from(Status::new(codes::KADM5_UNK_PRINC))
    }

    pub fn already_exists() -> Self {
        Self::from(Status::new(codes::KADM5_DUP))
    }

    pub fn ambiguous_name() -> Self {
        Self::from(Status::new(codes::KADM5_AMBIGUOUS_KEY))
    }

    pub fn malformed_name() -> Self {
        Self::from(Status::new(codes::KRB5_PARSE_MALFORMED))
    }

    pub fn bad_class() -> Self {
        Self::from(Status::new(codes::KADM5_BAD_CLASS))
    }

    /// The numeric status this error was translated from.
    pub fn code(&self) -> i32 {
        match *self {
            Self::Authorization { code, .. }
            | Self::Configuration { code, .. }
            | Self::Connection { code, .. }
            | Self::BadParameter { code, .. }
            | Self::PasswordQuality { code, .. }
            | Self::VersionMismatch { code, .. }
            | Self::Generic { code } => code,
        }
    }

    pub fn is_unknown_principal(&self) -> bool {
        matches!(
            self,
            Self::BadParameter {
                kind: ParameterKind::UnknownPrincipal,
                ..
            }
        )
    }
}

impl From<Status> for Error {
    fn from(status: Status) -> Self {
        use codes::*;

        let code = status.code();
        let auth = |operation| Error::Authorization { operation, code };
        let config = |kind| Error::Configuration { kind, code };
        let conn = |kind| Error::Connection { kind, code };
        let param = |kind| Error::BadParameter { kind, code };
        let quality = |kind| Error::PasswordQuality { kind, code };
        let version = |kind| Error::VersionMismatch { kind, code };

        match code {
            KADM5_AUTH_INSUFFICIENT => auth(AuthOperation::Any),
            KADM5_AUTH_GET => auth(AuthOperation::Get),
            KADM5_AUTH_ADD => auth(AuthOperation::Add),
            KADM5_AUTH_MODIFY => auth(AuthOperation::Modify),
            KADM5_AUTH_DELETE => auth(AuthOperation::Delete),
            KADM5_AUTH_LIST => auth(AuthOperation::List),
            KADM5_AUTH_CHANGEPW => auth(AuthOperation::ChangePassword),

            KADM5_BAD_SERVER_PARAMS => config(ConfigurationKind::Remote),
            KADM5_BAD_CLIENT_PARAMS => config(ConfigurationKind::Local),
            KADM5_MISSING_CONF_PARAMS | KRB5_CONFIG_NODEFREALM => {
                config(ConfigurationKind::MissingParams)
            }
            KADM5_BAD_SERVER_NAME | KRB5_REALM_UNKNOWN => config(ConfigurationKind::BadServer),
            KADM5_BAD_DB => config(ConfigurationKind::Database),

            KADM5_RPC_ERROR => conn(ConnectionKind::Rpc),
            KADM5_NO_SRV => conn(ConnectionKind::NoServer),
            KADM5_NOT_INIT => conn(ConnectionKind::NotInitialized),
            KADM5_INIT => conn(ConnectionKind::AlreadyInitialized),
            KADM5_BAD_PASSWORD => conn(ConnectionKind::BadPassword),
            KADM5_BAD_SERVER_HANDLE => conn(ConnectionKind::BadServerHandle),
            KRB5_FCC_NOFILE | KRB5_CC_NOTFOUND => conn(ConnectionKind::NoCredentials),

            KADM5_DUP => param(ParameterKind::AlreadyExists),
            KADM5_UNK_PRINC => param(ParameterKind::UnknownPrincipal),
            KADM5_UNK_POLICY => param(ParameterKind::UnknownPolicy),
            KADM5_BAD_MASK => param(ParameterKind::BadMask),
            KADM5_BAD_CLASS => param(ParameterKind::BadClass),
            KADM5_BAD_LENGTH => param(ParameterKind::BadLength),
            KADM5_BAD_POLICY => param(ParameterKind::BadPolicy),
            KADM5_BAD_PRINCIPAL | KRB5_PARSE_MALFORMED | KRB5_PARSE_ILLCHAR => {
                param(ParameterKind::BadPrincipal)
            }
            KADM5_BAD_AUX_ATTR => param(ParameterKind::BadAuxAttributes),
            KADM5_BAD_HISTORY => param(ParameterKind::BadHistory),
            KADM5_BAD_MIN_PASS_LIFE => param(ParameterKind::BadMinPasswordLife),
            KADM5_AMBIGUOUS_KEY => param(ParameterKind::AmbiguousName),
            KADM5_POLICY_REF => param(ParameterKind::PolicyInUse),
            KADM5_PROTECT_PRINCIPAL => param(ParameterKind::ProtectedPrincipal),
            KADM5_BAD_TL_TYPE => param(ParameterKind::BadTlType),
            KADM5_BAD_HIST_KEY => param(ParameterKind::BadHistoryKey),
            KADM5_NO_RENAME_SALT => param(ParameterKind::NoRenameSalt),
            KADM5_SECURE_PRINC_MISSING => param(ParameterKind::SecurePrincipalMissing),

            KADM5_PASS_Q_TOOSHORT => quality(PasswordQualityKind::TooShort),
            KADM5_PASS_Q_CLASS => quality(PasswordQualityKind::TooFewClasses),
            KADM5_PASS_Q_DICT => quality(PasswordQualityKind::InDictionary),
            KADM5_PASS_REUSE => quality(PasswordQualityKind::Reused),
            KADM5_PASS_TOOSOON => quality(PasswordQualityKind::TooSoon),

            KADM5_BAD_STRUCT_VERSION | KADM5_OLD_STRUCT_VERSION | KADM5_NEW_STRUCT_VERSION => {
                version(VersionKind::Struct)
            }
            KADM5_BAD_API_VERSION
            | KADM5_OLD_LIB_API_VERSION
            | KADM5_OLD_SERVER_API_VERSION
            | KADM5_NEW_LIB_API_VERSION
            | KADM5_NEW_SERVER_API_VERSION => version(VersionKind::Api),

            // KADM5_FAILURE, ENOMEM and everything unrecognised
            _ => Error::Generic { code },
        }
    }
}
