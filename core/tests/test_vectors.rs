//! Check classification and request building against JSON vectors stored in
//! `test-vectors/`.
//!
//! Bodies are compared as parsed JSON (not raw strings) so field order does
//! not matter.

mod common;

use common::{client, status, ScriptedTransport, BASE_URL};
use seriestrack_core::{classify_response, ApiError, Disposition, HttpMethod, HttpResponse};
use serde_json::Value;

fn parse_method(s: &str) -> HttpMethod {
    match s {
        "GET" => HttpMethod::Get,
        "POST" => HttpMethod::Post,
        "PUT" => HttpMethod::Put,
        "DELETE" => HttpMethod::Delete,
        other => panic!("unknown method: {other}"),
    }
}

fn load(raw: &str) -> Vec<Value> {
    let vectors: Value = serde_json::from_str(raw).unwrap();
    vectors["cases"].as_array().unwrap().clone()
}

// ---------------------------------------------------------------------------
// Status classification
// ---------------------------------------------------------------------------

fn response_from(case: &Value) -> HttpResponse {
    let sim = &case["response"];
    let headers = match sim["content_type"].as_str() {
        Some(ct) => vec![("content-type".to_string(), ct.to_string())],
        None => Vec::new(),
    };
    HttpResponse {
        status: sim["status"].as_u64().unwrap() as u16,
        status_text: sim["status_text"].as_str().unwrap().to_string(),
        headers,
        body: sim["body"].as_str().unwrap().to_string(),
    }
}

fn check_error(name: &str, err: &ApiError, expected: &Value) {
    match expected["kind"].as_str().unwrap() {
        "validation" => assert!(matches!(err, ApiError::Validation { .. }), "{name}: {err:?}"),
        "response" => {
            assert!(matches!(err, ApiError::Response { .. }), "{name}: {err:?}");
            assert_eq!(
                err.status().map(u64::from),
                expected["status"].as_u64(),
                "{name}: status"
            );
        }
        "deserialization" => {
            assert!(matches!(err, ApiError::Deserialization(_)), "{name}: {err:?}");
            return;
        }
        other => panic!("{name}: unknown kind {other}"),
    }
    assert_eq!(
        err.to_string(),
        expected["message"].as_str().unwrap(),
        "{name}: message"
    );
}

#[test]
fn status_test_vectors() {
    for case in load(include_str!("../../test-vectors/status.json")) {
        let name = case["name"].as_str().unwrap();
        let endpoint = case["endpoint"].as_str().unwrap();
        let expected = &case["expected"];

        let disposition = classify_response(endpoint, &response_from(&case));
        match (expected["disposition"].as_str().unwrap(), disposition) {
            ("success", Disposition::Success(value)) => {
                assert_eq!(value.unwrap_or(Value::Null), expected["value"], "{name}: value");
            }
            ("retry", Disposition::Retry(err)) => {
                assert!(err.is_retryable(), "{name}: retry must be retryable");
                check_error(name, &err, expected);
            }
            ("fail", Disposition::Fail(err)) => check_error(name, &err, expected),
            (want, got) => panic!("{name}: expected {want}, got {got:?}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Endpoint shapes
// ---------------------------------------------------------------------------

#[tokio::test]
async fn endpoint_test_vectors() {
    for case in load(include_str!("../../test-vectors/endpoints.json")) {
        let operation = case["operation"].as_str().unwrap();
        let args: Vec<&str> = case["args"]
            .as_array()
            .unwrap()
            .iter()
            .map(|a| a.as_str().unwrap())
            .collect();

        let transport = ScriptedTransport::always(status(204));
        let c = client(&transport);
        // Only the request matters here; most typed results fail to decode
        // an empty body.
        let _ = match (operation, args.as_slice()) {
            ("get_user", [id]) => c.get_user(id).await.map(drop),
            ("get_user_by_email", [email]) => c.get_user_by_email(email).await.map(drop),
            ("get_user_by_username", [name]) => c.get_user_by_username(name).await.map(drop),
            ("delete_user", [id]) => c.delete_user(id).await,
            ("get_series", [u, s]) => c.get_series(u, s).await.map(drop),
            ("delete_series", [u, s]) => c.delete_series(u, s).await,
            ("get_user_series", [u]) => c.get_user_series(u).await.map(drop),
            ("get_recommendations", [u]) => c.get_recommendations(u).await.map(drop),
            ("like_series", [s, o, u]) => c.like_series(s, o, u).await.map(drop),
            ("unlike_series", [s, o, u]) => c.unlike_series(s, o, u).await.map(drop),
            ("send_friend_request", [a, b]) => c.send_friend_request(a, b).await.map(drop),
            ("get_friend_requests", [u]) => c.get_friend_requests(u).await.map(drop),
            ("accept_friend_request", [r]) => c.accept_friend_request(r).await.map(drop),
            ("reject_friend_request", [r]) => c.reject_friend_request(r).await.map(drop),
            ("get_friends", [u]) => c.get_friends(u).await.map(drop),
            ("remove_friend", [u, f]) => c.remove_friend(u, f).await,
            ("get_favorite_lists", [u]) => c.get_favorite_lists(u).await.map(drop),
            ("get_favorite_list", [u, l]) => c.get_favorite_list(u, l).await.map(drop),
            ("delete_favorite_list", [u, l]) => c.delete_favorite_list(u, l).await,
            ("add_series_to_list", [u, l, s]) => c.add_series_to_list(u, l, s).await.map(drop),
            ("remove_series_from_list", [u, l, s]) => {
                c.remove_series_from_list(u, l, s).await.map(drop)
            }
            _ => panic!("unknown operation {operation} with {args:?}"),
        };

        assert_eq!(transport.calls(), 1, "{operation}: calls");
        let sent = transport.last_request();
        assert_eq!(
            sent.method,
            parse_method(case["method"].as_str().unwrap()),
            "{operation}: method"
        );
        assert_eq!(
            sent.path,
            format!("{BASE_URL}{}", case["path"].as_str().unwrap()),
            "{operation}: path"
        );
        assert_eq!(sent.header("content-type"), Some("application/json"), "{operation}");
        let body = match sent.body.as_deref() {
            Some(raw) => serde_json::from_str(raw).unwrap(),
            None => Value::Null,
        };
        assert_eq!(body, case["body"], "{operation}: body");
    }
}

