#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use hubnet_node::config::{self, PostModuleName, PreModuleName};

#[test]
fn deny_unknown_fields_nested() {
    let bad = r#"
version: 1
node:
  server_id: "lobby-1"
chat:
  max_mesage_len: 100 # typo should fail
"#;

    let err = config::load_from_str(bad).expect_err("must fail");
    assert_eq!(err.class().as_str(), "LOCAL_CONFIGURATION");
}

#[test]
fn ok_minimal_config() {
    let ok = r#"
version: 1
node:
  server_id: "lobby-1"
"#;
    let cfg = config::load_from_str(ok).expect("must parse");
    assert_eq!(cfg.version, 1);
    assert_eq!(cfg.node.server_id, "lobby-1");
    assert_eq!(cfg.channels.all(), ["hubnet:party", "hubnet:chat", "hubnet:location"]);
    assert_eq!(cfg.chat.global_channel, "global");
    assert_eq!(cfg.chat.pre_modules.first(), Some(&PreModuleName::Sanitize));
    assert_eq!(cfg.chat.post_modules.first(), Some(&PostModuleName::Blocklist));
    assert_eq!(cfg.party.invite_ttl_ms, 60000);
}

#[test]
fn shipped_sample_config_parses() {
    let cfg = config::load_from_file(concat!(env!("CARGO_MANIFEST_DIR"), "/../../hubnet.yaml"))
        .expect("sample config must parse");
    assert_eq!(cfg.chat.static_channels[0].id, "staff");
    assert_eq!(cfg.chat.post_modules.len(), 8);
}

#[test]
fn unknown_module_name_is_rejected() {
    let bad = r#"
version: 1
node:
  server_id: "lobby-1"
chat:
  post_modules: [blocklist, emoji]
"#;
    let err = config::load_from_str(bad).expect_err("must fail");
    assert_eq!(err.class().as_str(), "LOCAL_CONFIGURATION");
}

#[test]
fn unsupported_version_is_rejected() {
    let bad = r#"
version: 2
node:
  server_id: "lobby-1"
"#;
    let err = config::load_from_str(bad).expect_err("must fail");
    assert_eq!(err.class().as_str(), "LOCAL_CONFIGURATION");
    assert!(err.to_string().contains("version"));
}

#[test]
fn out_of_range_values_are_rejected() {
    for body in [
        "chat:\n  max_message_len: 0\n",
        "chat:\n  session_queue: 100000\n",
        "party:\n  invite_ttl_ms: 10\n",
    ] {
        let yaml = format!("version: 1\nnode:\n  server_id: \"a\"\n{body}");
        let err = config::load_from_str(&yaml).expect_err(body);
        assert_eq!(err.class().as_str(), "LOCAL_CONFIGURATION", "{body}");
    }
}

#[test]
fn channel_names_must_be_distinct() {
    let bad = r#"
version: 1
node:
  server_id: "lobby-1"
channels:
  party: "same"
  chat: "same"
"#;
    assert!(config::load_from_str(bad).is_err());
}

#[test]
fn reserved_or_duplicate_static_channels_are_rejected() {
    let reserved = r#"
version: 1
node:
  server_id: "lobby-1"
chat:
  static_channels:
    - id: "party"
"#;
    assert!(config::load_from_str(reserved).is_err());

    let dup = r#"
version: 1
node:
  server_id: "lobby-1"
chat:
  static_channels:
    - id: "staff"
    - id: "staff"
"#;
    assert!(config::load_from_str(dup).is_err());
}

#[test]
fn duplicate_modules_are_rejected() {
    let bad = r#"
version: 1
node:
  server_id: "lobby-1"
chat:
  pre_modules: [sanitize, sanitize]
"#;
    assert!(config::load_from_str(bad).is_err());
}

#[test]
fn empty_server_id_is_rejected() {
    let bad = r#"
version: 1
node:
  server_id: "  "
"#;
    assert!(config::load_from_str(bad).is_err());
}
