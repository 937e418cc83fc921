//! Connection lookup, creation and privilege tests.

use kadm5::error::{AuthOperation, ParameterKind};
use kadm5::memory::{CallKind, MemoryRealm, ADMIN_PASSWORD};
use kadm5::{Connection, Error, Privileges};

fn setup() -> (MemoryRealm, Connection) {
    let realm = MemoryRealm::new("EXAMPLE.COM")
        .with_principal("foo1", "pw")
        .unwrap()
        .with_principal("foo2", "pw")
        .unwrap()
        .with_principal("bar", "pw")
        .unwrap();
    let conn = Connection::from_password(&realm.admin_config(), &realm, ADMIN_PASSWORD).unwrap();
    realm.clear_calls();
    (realm, conn)
}

fn is_parameter(result: &kadm5::Result<impl Sized>, expected: ParameterKind) -> bool {
    matches!(result, Err(Error::BadParameter { kind, .. }) if *kind == expected)
}

fn is_unauthorized(result: &kadm5::Result<impl Sized>, expected: AuthOperation) -> bool {
    matches!(result, Err(Error::Authorization { operation, .. }) if *operation == expected)
}

mod lookup_tests {
    use super::*;

    #[test]
    fn test_single_match() {
        let (_realm, conn) = setup();
        let principal = conn.get_principal("bar").unwrap();
        assert_eq!(principal.id().to_string(), "bar@EXAMPLE.COM");
    }

    #[test]
    fn test_no_match_is_unknown_principal() {
        let (_realm, conn) = setup();
        let result = conn.get_principal("nobody");
        assert!(is_parameter(&result, ParameterKind::UnknownPrincipal));
    }

    #[test]
    fn test_multiple_matches_are_ambiguous() {
        let (_realm, conn) = setup();
        let result = conn.get_principal("foo*");
        assert!(is_parameter(&result, ParameterKind::AmbiguousName));
    }

    #[test]
    fn test_get_principals_returns_every_match() {
        let (_realm, conn) = setup();
        let principals = conn.get_principals("foo*").unwrap();
        let ids: Vec<String> = principals.iter().map(|p| p.id().to_string()).collect();
        assert_eq!(ids, vec!["foo1@EXAMPLE.COM", "foo2@EXAMPLE.COM"]);
    }

    #[test]
    fn test_list_principals_with_explicit_realm() {
        let (_realm, conn) = setup();
        assert_eq!(conn.list_principals("*@EXAMPLE.COM").unwrap().len(), 4);
        assert!(conn.list_principals("*@OTHER.REALM").unwrap().is_empty());
    }
}

mod create_tests {
    use super::*;

    #[test]
    fn test_existing_name_is_rejected() {
        let (realm, conn) = setup();
        let result = conn.create_principal("bar", None);
        assert!(is_parameter(&result, ParameterKind::AlreadyExists));
        assert_eq!(realm.call_count(CallKind::Create), 0);
    }

    #[test]
    fn test_create_is_deferred_until_commit() {
        let (realm, conn) = setup();
        let mut principal = conn.create_principal("baz", Some("s3cret!")).unwrap();
        assert!(!realm.contains("baz"));

        principal.commit().unwrap();
        assert!(realm.password_matches("baz", "s3cret!"));
    }

    #[test]
    fn test_concurrent_create_surfaces_at_commit() {
        let (realm, conn) = setup();
        let mut principal = conn.create_principal("race", None).unwrap();

        // Created by someone else between the check and the commit
        realm.add_principal("race", "theirs").unwrap();

        let result = principal.commit();
        assert!(is_parameter(&result, ParameterKind::AlreadyExists));
        assert!(realm.password_matches("race", "theirs"));
    }
}

mod delete_tests {
    use super::*;

    #[test]
    fn test_delete_marks_principal_absent() {
        let (realm, conn) = setup();
        let mut principal = conn.get_principal("bar").unwrap();
        assert!(principal.exists_on_server().unwrap());

        conn.delete_principal(&mut principal).unwrap();

        assert!(!realm.contains("bar"));
        assert!(!principal.exists_on_server().unwrap());
        assert!(principal.is_modified());
    }

    #[test]
    fn test_delete_unknown_principal_fails() {
        let (realm, conn) = setup();
        let mut principal = conn.get_principal("bar").unwrap();
        let mut again = conn.get_principal("bar").unwrap();

        conn.delete_principal(&mut principal).unwrap();
        let result = conn.delete_principal(&mut again);
        assert!(is_parameter(&result, ParameterKind::UnknownPrincipal));
        assert_eq!(realm.call_count(CallKind::Delete), 2);
    }
}

mod privilege_tests {
    use super::*;

    #[test]
    fn test_predicates() {
        let (realm, conn) = setup();
        assert!(conn.may_all().unwrap());

        realm.set_privileges(Privileges::GET | Privileges::LIST);
        assert!(conn.may_get().unwrap());
        assert!(conn.may_list().unwrap());
        assert!(!conn.may_add().unwrap());
        assert!(!conn.may_modify().unwrap());
        assert!(!conn.may_delete().unwrap());
        assert!(!conn.may_change_password().unwrap());
        assert!(!conn.may_all().unwrap());
    }

    #[test]
    fn test_privileges_are_queried_on_every_check() {
        let (realm, conn) = setup();
        conn.may_get().unwrap();
        conn.may_get().unwrap();
        assert_eq!(realm.call_count(CallKind::Privileges), 2);
    }

    #[test]
    fn test_missing_privileges_are_reported_per_operation() {
        let (realm, conn) = setup();
        let mut principal = conn.get_principal("bar").unwrap();

        realm.set_privileges(Privileges::GET | Privileges::LIST);
        assert!(is_unauthorized(&conn.create_principal("new", None), AuthOperation::Add));
        assert!(is_unauthorized(&conn.delete_principal(&mut principal), AuthOperation::Delete));

        realm.set_privileges(Privileges::GET);
        assert!(is_unauthorized(&conn.list_principals("*"), AuthOperation::List));
        assert!(is_unauthorized(&conn.get_principal("bar"), AuthOperation::List));

        realm.set_privileges(Privileges::LIST);
        assert!(is_unauthorized(&conn.get_principals("*"), AuthOperation::Get));
        assert_eq!(realm.call_count(CallKind::List), 1);
    }

    #[test]
    fn test_session_accessors() {
        let (_realm, conn) = setup();
        assert_eq!(conn.client().to_string(), "admin/admin@EXAMPLE.COM");
        assert_eq!(conn.realm(), "EXAMPLE.COM");
        assert_eq!(conn.host(), "kdc.example.com");
        assert_eq!(conn.port(), 749);
    }
}
