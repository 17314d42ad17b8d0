// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

#[test]
fn parses_well_formed_request() {
    let v = json!({"jsonrpc": "2.0", "id": 7, "method": "listQueues"});
    let msg = parse_value(v).expect("should parse");
    match msg {
        Message::Request(r) => {
            assert_eq!(r.id, RpcId::Number(7));
            assert_eq!(r.method, "listQueues");
        }
        other => panic!("expected Request, got {other:?}"),
    }
}

#[test]
fn parses_notification_without_id() {
    let v = json!({"jsonrpc": "2.0", "method": "jobStateChanged", "params": {"moleQueueId": 1}});
    let msg = parse_value(v).expect("should parse");
    assert!(matches!(msg, Message::Notification(_)));
}

#[test]
fn rejects_missing_jsonrpc_field() {
    let v = json!({"id": 1, "method": "x"});
    let err = parse_value(v).unwrap_err();
    assert_eq!(err.code, RpcErrorCode::InvalidRequest.code());
}

#[test]
fn rejects_non_string_method() {
    let v = json!({"jsonrpc": "2.0", "id": 1, "method": 5});
    let err = parse_value(v).unwrap_err();
    assert_eq!(err.code, RpcErrorCode::InvalidRequest.code());
}

#[test]
fn rejects_both_result_and_error() {
    let v = json!({"jsonrpc": "2.0", "id": 1, "result": 1, "error": {"code": -1, "message": "x"}});
    let err = parse_value(v).unwrap_err();
    assert_eq!(err.code, RpcErrorCode::InvalidRequest.code());
}

#[test]
fn malformed_json_bytes_yield_parse_error() {
    let err = decode(b"{not json").unwrap_err();
    assert_eq!(err.code, RpcErrorCode::ParseError.code());
}

#[test]
fn unknown_method_uses_method_not_found_code() {
    // decode() itself never judges method names — this documents the
    // value the dispatcher is expected to use when a handler lookup
    // misses (§4.2, scenario 2 in spec.md §8).
    assert_eq!(RpcErrorCode::MethodNotFound.code(), -32601);
}

#[test]
fn batch_array_processed_element_by_element() {
    let bytes = serde_json::to_vec(&json!([
        {"jsonrpc": "2.0", "id": 1, "method": "a"},
        {"jsonrpc": "2.0", "method": "notify_only"},
        {"jsonrpc": "2.0", "id": 2, "result": "ok"},
    ]))
    .unwrap();
    let results = decode(&bytes).expect("batch decode should succeed");
    assert_eq!(results.len(), 3);
    assert!(matches!(results[0], Ok(Message::Request(_))));
    assert!(matches!(results[1], Ok(Message::Notification(_))));
    assert!(matches!(results[2], Ok(Message::Response(_))));
}

#[test]
fn response_echoes_client_id_verbatim() {
    let response = Message::Response(Response { id: RpcId::String("abc".into()), result: json!(true) });
    let bytes = serde_json::to_vec(&response).unwrap();
    let round_tripped: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(round_tripped["id"], json!("abc"));
    assert_eq!(round_tripped["jsonrpc"], json!("2.0"));
}

#[test]
fn error_with_description_nests_data() {
    let e = RpcError::with_description(RpcErrorCode::InvalidParams, "queue not found: bogus");
    assert_eq!(e.code, -32602);
    assert_eq!(e.data.unwrap()["description"], json!("queue not found: bogus"));
}

mod property_tests {
    use super::*;
    use proptest::prelude::*;

    fn arb_rpc_id() -> impl Strategy<Value = RpcId> {
        prop_oneof![any::<i64>().prop_map(RpcId::Number), "[a-z]{1,8}".prop_map(RpcId::String)]
    }

    fn arb_params() -> impl Strategy<Value = Option<Value>> {
        prop_oneof![
            Just(None),
            Just(Some(Value::Null)),
            any::<bool>().prop_map(|b| Some(Value::Bool(b))),
            any::<i64>().prop_map(|n| Some(json!(n))),
            "[a-zA-Z0-9]{0,12}".prop_map(|s| Some(Value::String(s))),
        ]
    }

    proptest! {
        #[test]
        fn request_round_trips_through_encode_decode(
            id in arb_rpc_id(),
            method in "[a-zA-Z]{1,16}",
            params in arb_params(),
        ) {
            let request = Message::Request(Request { id: id.clone(), method: method.clone(), params: params.clone() });
            let bytes = encode_many(&[request]).expect("encode");
            let decoded = decode(&bytes).expect("decode");
            prop_assert_eq!(decoded.len(), 1);
            match decoded.into_iter().next().unwrap() {
                Ok(Message::Request(r)) => {
                    prop_assert_eq!(r.id, id);
                    prop_assert_eq!(r.method, method);
                    prop_assert_eq!(r.params, params);
                }
                other => prop_assert!(false, "expected a request, got {other:?}"),
            }
        }
    }
}
