//! Type registry behaviour: registration, encode, decode, unknown types.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use serde::{Deserialize, Serialize};

use hubnet_core::protocol::{Message, TypeRegistry};
use hubnet_core::{ErrorClass, HubError, MemberId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Greeting {
    from: MemberId,
    text: String,
}

impl Message for Greeting {
    const TYPE_ID: &'static str = "test.greeting";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Impostor {
    text: String,
}

impl Message for Impostor {
    const TYPE_ID: &'static str = "test.greeting";
}

#[test]
fn registered_message_decodes_to_the_same_value() {
    let reg = TypeRegistry::new();
    reg.register::<Greeting>().unwrap();

    let msg = Greeting {
        from: MemberId::new(),
        text: "hello: world".into(),
    };
    let raw = reg.encode(&msg).unwrap();
    assert!(raw.starts_with(b"test.greeting:"));

    let decoded = reg.decode(&raw).unwrap().expect("known type");
    assert_eq!(decoded.type_id, "test.greeting");
    assert_eq!(decoded.downcast_ref::<Greeting>(), Some(&msg));
}

#[test]
fn encode_unregistered_is_local_configuration_error() {
    let reg = TypeRegistry::new();
    let err = reg
        .encode(&Greeting {
            from: MemberId::new(),
            text: "x".into(),
        })
        .unwrap_err();
    assert!(matches!(err, HubError::UnregisteredType("test.greeting")));
    assert_eq!(err.class(), ErrorClass::LocalConfiguration);
}

#[test]
fn unknown_type_id_is_dropped_not_an_error() {
    let reg = TypeRegistry::new();
    reg.register::<Greeting>().unwrap();
    let res = reg.decode(b"future.type:{\"anything\":true}").unwrap();
    assert!(res.is_none());
}

#[test]
fn malformed_payload_is_decode_error() {
    let reg = TypeRegistry::new();
    reg.register::<Greeting>().unwrap();
    let err = reg.decode(b"test.greeting:{not json").unwrap_err();
    assert_eq!(err.class(), ErrorClass::Decode);
}

#[test]
fn same_tag_for_two_types_is_rejected() {
    let reg = TypeRegistry::new();
    reg.register::<Greeting>().unwrap();
    reg.register::<Greeting>().unwrap();

    let err = reg.register::<Impostor>().unwrap_err();
    assert!(matches!(err, HubError::DuplicateType { type_id: "test.greeting", .. }));
    assert_eq!(reg.registered_types(), vec!["test.greeting"]);
}
