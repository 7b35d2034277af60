use super::*;
use std::collections::HashMap;

#[test]
fn nonce_claim_accepts_every_base64_flavour() {
    // 32 bytes so that padded and unpadded encodings differ
    let json = r#"{
        "array": [66,122,57,74,233,100,0,81,233,18,161,146,73,187,208,102,231,115,200,171,115,221,29,230,134,241,159,154,25,120,18,196],
        "base64url": "Qno5SulkAFHpEqGSSbvQZudzyKtz3R3mhvGfmhl4EsQ",
        "base64url_padded": "Qno5SulkAFHpEqGSSbvQZudzyKtz3R3mhvGfmhl4EsQ=",
        "base64": "Qno5SulkAFHpEqGSSbvQZudzyKtz3R3mhvGfmhl4EsQ="
    }"#;

    let decoded: HashMap<&str, Bytes> = serde_json::from_str(json).expect("failed to deserialize");

    assert_eq!(decoded["array"].len(), 32);
    assert_eq!(decoded["array"], decoded["base64url"]);
    assert_eq!(decoded["base64url"], decoded["base64url_padded"]);
    assert_eq!(decoded["base64url"], decoded["base64"]);
}

#[test]
fn array_of_strings_is_rejected() {
    let json = r#"{ "sig": ["Qno5", "Sulk"] }"#;

    serde_json::from_str::<HashMap<&str, Bytes>>(json)
        .expect_err("an array of strings is not binary data");
}

#[test]
fn garbage_string_is_not_base64() {
    assert_eq!(Bytes::try_from("not*base64!"), Err(NotBase64Encoded));
}

#[test]
fn cbor_byte_string() {
    let mut out = Vec::new();
    ciborium::ser::into_writer(&ciborium::value::Value::Bytes(vec![0xde, 0xad]), &mut out)
        .expect("serialize");

    let bytes: Bytes = ciborium::de::from_reader(out.as_slice()).expect("deserialize");

    assert_eq!(bytes, Bytes::from(vec![0xde, 0xad]));
}
