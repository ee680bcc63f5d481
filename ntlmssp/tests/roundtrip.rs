//! Full three-message handshake exercised purely through the public wire
//! types, mirroring how two independent processes would actually talk:
//! each side only ever sees the other's encoded bytes.

use ntlmssp::message::{AuthenticateMessage, ChallengeMessage, NegotiateMessage};
use ntlmssp::{
    AccountLookup, AccountRecord, AcceptorContext, CompatibilityLevel, Credentials,
    InitiatorConfig, InitiatorContext, NtlmMessage, Secret,
};

struct SingleAccount(AccountRecord);

impl AccountLookup for SingleAccount {
    fn find(&self, domain: &str, username: &str) -> Option<AccountRecord> {
        if domain.eq_ignore_ascii_case(&self.0.domain) && username.eq_ignore_ascii_case(&self.0.username)
        {
            Some(self.0.clone())
        } else {
            None
        }
    }
}

#[test]
fn test_negotiate_message_round_trips_through_generic_dispatch() {
    let msg = NegotiateMessage {
        flags: ntlmssp::NegotiateFlags::NEGOTIATE_UNICODE | ntlmssp::NegotiateFlags::NEGOTIATE_NTLM,
        domain_name: Some("CORP".to_string()),
        workstation: Some("DESK01".to_string()),
        version: None,
    };
    let bytes = msg.encode();
    let parsed = NtlmMessage::parse(&bytes).unwrap();
    match parsed {
        NtlmMessage::Negotiate(decoded) => assert_eq!(decoded, msg),
        _ => panic!("expected a Negotiate message"),
    }
}

#[test]
fn test_full_handshake_round_trips_over_the_wire_only() {
    let nt_hash = ntlmssp::keys::ntowf_v1("hunter2");
    let credentials = Credentials {
        username: "bob".to_string(),
        domain: "CORP".to_string(),
        secret: Secret::NtHash(nt_hash),
    };
    let mut config = InitiatorConfig::default();
    config.compat_level = CompatibilityLevel::Lm3;

    let mut initiator = InitiatorContext::new(credentials, config);
    let negotiate = initiator.initiate().unwrap();
    let negotiate_bytes = negotiate.encode();

    // The acceptor only ever sees bytes, decoded back into a message.
    let negotiate_on_wire = NegotiateMessage::decode(&negotiate_bytes).unwrap();

    let lookup = SingleAccount(AccountRecord {
        username: "bob".to_string(),
        domain: "CORP".to_string(),
        nt_hash,
    });
    let mut acceptor = AcceptorContext::new(lookup, "CORP".to_string(), None);
    let challenge = acceptor
        .receive_negotiate(&negotiate_on_wire, &negotiate_bytes)
        .unwrap();
    let challenge_bytes = challenge.encode();

    let challenge_on_wire = ChallengeMessage::decode(&challenge_bytes).unwrap();
    let authenticate = initiator
        .accept_challenge(&challenge_on_wire, &challenge_bytes)
        .unwrap();
    let authenticate_bytes = authenticate.encode();

    let authenticate_on_wire = AuthenticateMessage::decode(&authenticate_bytes).unwrap();
    acceptor.receive_authenticate(&authenticate_on_wire).unwrap();

    assert!(initiator.is_established());
    assert!(acceptor.is_established());
    assert_eq!(initiator.exported_session_key(), acceptor.exported_session_key());
}

#[test]
fn test_handshake_wrap_unwrap_after_establishment() {
    let nt_hash = ntlmssp::keys::ntowf_v1("correct-horse-battery-staple");
    let credentials = Credentials {
        username: "carol".to_string(),
        domain: "CORP".to_string(),
        secret: Secret::NtHash(nt_hash),
    };
    let mut initiator = InitiatorContext::new(credentials, InitiatorConfig::default());
    let negotiate = initiator.initiate().unwrap();
    let negotiate_bytes = negotiate.encode();

    let lookup = SingleAccount(AccountRecord {
        username: "carol".to_string(),
        domain: "CORP".to_string(),
        nt_hash,
    });
    let mut acceptor = AcceptorContext::new(lookup, "CORP".to_string(), None);
    let challenge = acceptor.receive_negotiate(&negotiate, &negotiate_bytes).unwrap();
    let challenge_bytes = challenge.encode();
    let authenticate = initiator.accept_challenge(&challenge, &challenge_bytes).unwrap();
    acceptor.receive_authenticate(&authenticate).unwrap();

    let (ciphertext, signature) = initiator.sign_seal().unwrap().wrap(b"ping").unwrap();
    let plaintext = acceptor.sign_seal().unwrap().unwrap(&ciphertext, &signature).unwrap();
    assert_eq!(plaintext, b"ping");
}
