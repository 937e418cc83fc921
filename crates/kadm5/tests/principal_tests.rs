//! Principal state machine tests against the in-memory service.

use chrono::DateTime;
use kadm5::error::{codes, ConnectionKind, ParameterKind};
use kadm5::memory::{Call, CallKind, MemoryRealm, ADMIN_PASSWORD};
use kadm5::{Connection, Error, Lifetime, Moment, PrincipalFlags, Status};

fn setup() -> (MemoryRealm, Connection) {
    kadm_common::logging::init_logging("kadm5-tests");
    let realm = MemoryRealm::new("EXAMPLE.COM").with_principal("jdoe", "initial").unwrap();
    let conn = Connection::from_password(&realm.admin_config(), &realm, ADMIN_PASSWORD).unwrap();
    realm.clear_calls();
    (realm, conn)
}

mod load_tests {
    use super::*;

    #[test]
    fn test_load_is_idempotent() {
        let (realm, conn) = setup();
        let mut principal = conn.get_principal("jdoe").unwrap();
        realm.clear_calls();

        principal.load().unwrap();
        principal.load().unwrap();
        principal.max_lifetime().unwrap();
        principal.expire_time().unwrap();

        assert_eq!(realm.call_count(CallKind::Get), 1);
    }

    #[test]
    fn test_get_defers_the_read() {
        let (realm, conn) = setup();
        let _principal = conn.get_principal("jdoe").unwrap();
        assert_eq!(realm.call_count(CallKind::Get), 0);
    }

    #[test]
    fn test_load_skips_dirty_fields() {
        let (realm, conn) = setup();
        realm.update_record("jdoe", |r| r.max_life = 3600).unwrap();

        let mut principal = conn.get_principal("jdoe").unwrap();
        principal.set_max_lifetime(Lifetime::hours(5));
        principal.load().unwrap();

        assert_eq!(principal.max_lifetime().unwrap(), Lifetime::hours(5));
        match &realm.calls()[..] {
            [.., Call::Get { fields, .. }] => assert!(!fields.contains(kadm5::Field::MaxLife)),
            calls => panic!("unexpected calls {:?}", calls),
        }
    }

    #[test]
    fn test_unknown_principal_is_prefilled_from_template() {
        let (realm, conn) = setup();
        realm.add_principal("default", "unused").unwrap();
        realm.update_record("default", |r| r.max_renewable_life = 7 * 24 * 3600).unwrap();

        let mut principal = conn.create_principal("newbie", None).unwrap();
        assert_eq!(principal.max_renewable_lifetime().unwrap(), Lifetime::hours(7 * 24));
        assert!(!principal.exists_on_server().unwrap());
    }

    #[test]
    fn test_missing_template_keeps_defaults() {
        let (_realm, conn) = setup();
        let mut principal = conn.create_principal("newbie", None).unwrap();

        assert_eq!(principal.expire_time().unwrap(), Moment::PosInfinity);
        assert_eq!(principal.max_lifetime().unwrap(), Lifetime::Unbounded);
        assert!(!principal.exists_on_server().unwrap());
    }

    #[test]
    fn test_load_propagates_other_errors() {
        let (realm, conn) = setup();
        let mut principal = conn.get_principal("jdoe").unwrap();

        realm.fail_next(CallKind::Get, Status::new(codes::KADM5_RPC_ERROR));
        assert!(matches!(
            principal.load(),
            Err(Error::Connection { kind: ConnectionKind::Rpc, .. })
        ));
        // Nothing was cached, the next attempt reads again
        principal.load().unwrap();
        assert!(principal.exists_on_server().unwrap());
    }
}

mod commit_tests {
    use super::*;

    #[test]
    fn test_password_change_precedes_rename() {
        let (realm, conn) = setup();
        let mut principal = conn.get_principal("jdoe").unwrap();
        principal.set_password("n3w-Secret");
        principal.set_name("jsmith").unwrap();
        realm.clear_calls();

        principal.commit().unwrap();

        assert_eq!(
            realm.calls(),
            vec![
                Call::Get {
                    name: "jdoe@EXAMPLE.COM".to_string(),
                    fields: kadm5::FieldSet::readable(),
                },
                Call::ChangePassword { name: "jdoe@EXAMPLE.COM".to_string() },
                Call::Rename {
                    from: "jdoe@EXAMPLE.COM".to_string(),
                    to: "jsmith@EXAMPLE.COM".to_string(),
                },
            ]
        );
        assert_eq!(principal.id().to_string(), "jsmith@EXAMPLE.COM");
        assert!(realm.password_matches("jsmith", "n3w-Secret"));
        assert!(!principal.is_modified());
    }

    #[test]
    fn test_retry_after_failed_rename_skips_password_change() {
        let (realm, conn) = setup();
        let mut principal = conn.get_principal("jdoe").unwrap();
        principal.set_password("n3w-Secret");
        principal.set_name("jsmith").unwrap();

        realm.fail_next(CallKind::Rename, Status::new(codes::KADM5_RPC_ERROR));
        assert!(principal.commit().is_err());

        assert!(principal.is_modified());
        assert_eq!(principal.id().to_string(), "jdoe@EXAMPLE.COM");
        assert_eq!(principal.name().to_string(), "jsmith@EXAMPLE.COM");

        principal.commit().unwrap();

        assert_eq!(realm.call_count(CallKind::ChangePassword), 1);
        assert_eq!(realm.call_count(CallKind::Rename), 2);
        assert!(realm.contains("jsmith"));
        assert!(!realm.contains("jdoe"));
    }

    #[test]
    fn test_retry_after_failed_modify_skips_rename() {
        let (realm, conn) = setup();
        let mut principal = conn.get_principal("jdoe").unwrap();
        principal.set_name("jsmith").unwrap();
        principal.set_max_lifetime(Lifetime::hours(8));

        realm.fail_next(CallKind::Modify, Status::new(codes::KADM5_UNK_POLICY));
        assert!(matches!(
            principal.commit(),
            Err(Error::BadParameter { kind: ParameterKind::UnknownPolicy, .. })
        ));
        assert_eq!(principal.id().to_string(), "jsmith@EXAMPLE.COM");

        principal.commit().unwrap();

        assert_eq!(realm.call_count(CallKind::Rename), 1);
        assert_eq!(realm.call_count(CallKind::Modify), 2);
        assert_eq!(realm.record("jsmith").unwrap().max_life, 8 * 3600);
    }

    #[test]
    fn test_modify_uses_identifier_and_allowed_fields() {
        let (realm, conn) = setup();
        let mut principal = conn.get_principal("jdoe").unwrap();
        principal.set_attributes(PrincipalFlags::REQUIRES_PRE_AUTH);
        principal.set_policy(Some("strict"));
        principal.commit().unwrap();

        let record = realm.record("jdoe").unwrap();
        assert_eq!(record.attributes, PrincipalFlags::REQUIRES_PRE_AUTH);
        assert_eq!(record.policy.as_deref(), Some("strict"));
        assert_eq!(
            record.mod_name.map(|n| n.to_string()).as_deref(),
            Some("admin/admin@EXAMPLE.COM")
        );
    }

    #[test]
    fn test_rename_onto_existing_principal_keeps_pending_name() {
        let (realm, conn) = setup();
        realm.add_principal("taken", "pw").unwrap();

        let mut principal = conn.get_principal("jdoe").unwrap();
        principal.set_name("taken").unwrap();

        assert!(matches!(
            principal.commit(),
            Err(Error::BadParameter { kind: ParameterKind::AlreadyExists, .. })
        ));
        assert_eq!(principal.name().to_string(), "taken@EXAMPLE.COM");
        assert!(principal.is_modified());
    }

    #[test]
    fn test_malformed_name_fails_eagerly() {
        let (_realm, conn) = setup();
        let mut principal = conn.get_principal("jdoe").unwrap();

        assert!(matches!(
            principal.set_name("bad@REALM@TWICE"),
            Err(Error::BadParameter { kind: ParameterKind::BadPrincipal, .. })
        ));
        assert!(!principal.is_modified());
    }

    #[test]
    fn test_noop_commit_issues_no_writes() {
        let (realm, conn) = setup();
        let mut principal = conn.get_principal("jdoe").unwrap();
        principal.commit().unwrap();

        assert_eq!(
            realm.call_kinds(),
            vec![CallKind::Privileges, CallKind::Privileges, CallKind::List, CallKind::Get]
        );
    }
}

mod create_tests {
    use super::*;

    #[test]
    fn test_create_adopts_pending_name() {
        let (realm, conn) = setup();
        let mut principal = conn.create_principal("draft", Some("Pa55word")).unwrap();
        principal.set_name("final").unwrap();
        principal.commit().unwrap();

        assert_eq!(principal.id().to_string(), "final@EXAMPLE.COM");
        assert!(realm.password_matches("final", "Pa55word"));
        assert!(!realm.contains("draft"));
        assert_eq!(realm.call_count(CallKind::Rename), 0);
        assert!(principal.exists_on_server().unwrap());
    }

    #[test]
    fn test_create_generates_password_when_none_given() {
        let (realm, conn) = setup();
        let mut principal = conn.create_principal("robot", Some("")).unwrap();
        principal.commit().unwrap();

        assert!(realm.contains("robot"));
        assert!(!realm.password_matches("robot", ""));
    }

    #[test]
    fn test_create_only_sends_fields_allowed_on_create() {
        let (realm, conn) = setup();
        let mut principal = conn.create_principal("svc", None).unwrap();
        principal.set_max_lifetime(Lifetime::hours(1));
        principal.set_policy(None);
        principal.commit().unwrap();

        let fields = realm
            .calls()
            .into_iter()
            .find_map(|call| match call {
                Call::Create { fields, .. } => Some(fields),
                _ => None,
            })
            .unwrap();
        assert!(fields.contains(kadm5::Field::Principal));
        assert!(fields.contains(kadm5::Field::MaxLife));
        assert!(!fields.contains(kadm5::Field::PolicyClr));
    }

    #[test]
    fn test_is_modified_lifecycle() {
        let (_realm, conn) = setup();
        let mut principal = conn.create_principal("cycle", None).unwrap();
        assert!(principal.is_modified());

        principal.commit().unwrap();
        assert!(!principal.is_modified());

        principal.set_password_expiration(Moment::PosInfinity);
        assert!(principal.is_modified());

        principal.commit().unwrap();
        assert!(!principal.is_modified());
    }

    #[test]
    fn test_create_is_followed_by_fresh_load() {
        let (realm, conn) = setup();
        let mut principal = conn.create_principal("fresh", None).unwrap();
        principal.commit().unwrap();
        realm.clear_calls();

        assert_eq!(principal.key_version().unwrap(), 1);
        assert_eq!(realm.call_count(CallKind::Get), 1);
    }
}

mod attribute_tests {
    use super::*;

    #[test]
    fn test_expire_time_round_trip() {
        let (realm, conn) = setup();
        let t = Moment::from(DateTime::from_timestamp(1_800_000_000, 0).unwrap());

        let mut principal = conn.get_principal("jdoe").unwrap();
        principal.set_expire_time(t);
        principal.commit().unwrap();
        assert_eq!(principal.expire_time().unwrap(), t);

        principal.set_expire_time(Moment::PosInfinity);
        principal.commit().unwrap();
        assert_eq!(realm.record("jdoe").unwrap().princ_expire_time, 0);
        assert_eq!(principal.expire_time().unwrap(), Moment::PosInfinity);
    }

    #[test]
    fn test_subsecond_expiry_reads_back_equal() {
        let (realm, conn) = setup();
        let precise = DateTime::from_timestamp(1_800_000_000, 750_000_000).unwrap();

        let mut principal = conn.get_principal("jdoe").unwrap();
        principal.set_password_expiration(precise);
        principal.commit().unwrap();

        assert_eq!(realm.record("jdoe").unwrap().pw_expiration, 1_800_000_000);
        assert_eq!(principal.password_expiration().unwrap(), Moment::from(precise));
    }

    #[test]
    fn test_pre_epoch_expiry_encodes_as_never() {
        let (realm, conn) = setup();
        let mut principal = conn.get_principal("jdoe").unwrap();
        principal.set_expire_time(Moment::from_timestamp(-3600).unwrap());
        principal.commit().unwrap();

        assert_eq!(realm.record("jdoe").unwrap().princ_expire_time, 0);
        assert_eq!(principal.expire_time().unwrap(), Moment::PosInfinity);
    }

    #[test]
    fn test_unbounded_lifetime_round_trip() {
        let (realm, conn) = setup();
        realm.update_record("jdoe", |r| r.max_renewable_life = 3600).unwrap();

        let mut principal = conn.get_principal("jdoe").unwrap();
        assert_eq!(principal.max_renewable_lifetime().unwrap(), Lifetime::hours(1));

        principal.set_max_renewable_lifetime(Lifetime::Unbounded);
        principal.commit().unwrap();

        assert_eq!(realm.record("jdoe").unwrap().max_renewable_life, 0);
        assert_eq!(principal.max_renewable_lifetime().unwrap(), Lifetime::Unbounded);
    }

    #[test]
    fn test_history_fields_absent_means_never() {
        let (_realm, conn) = setup();
        let mut principal = conn.get_principal("jdoe").unwrap();

        assert_eq!(principal.last_success().unwrap(), Moment::NegInfinity);
        assert_eq!(principal.last_failed().unwrap(), Moment::NegInfinity);
        assert_eq!(principal.fail_auth_count().unwrap(), 0);
        assert!(!principal.last_password_change().unwrap().is_infinite());
        assert!(!principal.modify_time().unwrap().is_infinite());
    }

    #[test]
    fn test_modifier_is_unloaded_principal() {
        let (realm, conn) = setup();
        let mut principal = conn.get_principal("jdoe").unwrap();
        principal.set_max_lifetime(Lifetime::hours(2));
        principal.commit().unwrap();

        let mut modifier = principal.modifier().unwrap().unwrap();
        assert_eq!(modifier.id().to_string(), "admin/admin@EXAMPLE.COM");

        realm.clear_calls();
        assert!(modifier.exists_on_server().unwrap());
        assert_eq!(realm.call_count(CallKind::Get), 1);
    }

    #[test]
    fn test_password_change_bumps_key_version() {
        let (_realm, conn) = setup();
        let mut principal = conn.get_principal("jdoe").unwrap();
        let before = principal.key_version().unwrap();

        principal.randomize_password();
        principal.commit().unwrap();

        assert_eq!(principal.key_version().unwrap(), before + 1);
    }
}
