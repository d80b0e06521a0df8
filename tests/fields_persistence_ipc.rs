
use serde_json::json;
use test_support::{request_err, request_ok, spawn_sidecar, temp_dir};

#[test]
fn fields_survive_restart_and_clear_all_keeps_credential() {
    let workspace = temp_dir("lessonplan-fields");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "fields.set",
        json!({ "id": "subject", "value": "数学" }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "fields.set",
        json!({ "id": "api-key", "value": "sk-test" }),
    );
    // Every change persists, including overwrites.
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "fields.set",
        json!({ "id": "subject", "value": "物理" }),
    );

    let got = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "fields.get",
        json!({ "id": "subject" }),
    );
    assert_eq!(got.get("value").and_then(|v| v.as_str()), Some("物理"));

    // Restart: a new sidecar restores from the same workspace.
    drop(stdin);
    let _ = child.wait();
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let all = request_ok(&mut stdin, &mut reader, "7", "fields.getAll", json!({}));
    let map = all.get("fields").and_then(|v| v.as_object()).expect("fields");
    assert_eq!(map.get("subject").and_then(|v| v.as_str()), Some("物理"));
    assert_eq!(map.get("api-key").and_then(|v| v.as_str()), Some("sk-test"));

    let cleared = request_ok(&mut stdin, &mut reader, "8", "fields.clearAll", json!({}));
    assert_eq!(cleared.get("cleared").and_then(|v| v.as_u64()), Some(1));

    let all = request_ok(&mut stdin, &mut reader, "9", "fields.getAll", json!({}));
    let map = all.get("fields").and_then(|v| v.as_object()).expect("fields");
    assert_eq!(map.len(), 1, "only the credential survives: {:?}", map);
    assert_eq!(map.get("api-key").and_then(|v| v.as_str()), Some("sk-test"));

    let got = request_ok(
        &mut stdin,
        &mut reader,
        "10",
        "fields.get",
        json!({ "id": "subject" }),
    );
    assert!(got.get("value").expect("value").is_null());

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn unknown_field_ids_are_rejected() {
    let workspace = temp_dir("lessonplan-fields-unknown");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let (code, _) = request_err(
        &mut stdin,
        &mut reader,
        "2",
        "fields.set",
        json!({ "id": "password", "value": "x" }),
    );
    assert_eq!(code, "bad_params");

    // Process cells outside the fixed grid are not valid field ids either.
    let (code, _) = request_err(
        &mut stdin,
        &mut reader,
        "3",
        "fields.set",
        json!({ "id": "teachingProcess_9_0", "value": "x" }),
    );
    assert_eq!(code, "bad_params");

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn field_methods_require_a_workspace() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let (code, _) = request_err(
        &mut stdin,
        &mut reader,
        "1",
        "fields.set",
        json!({ "id": "subject", "value": "数学" }),
    );
    assert_eq!(code, "no_workspace");

    drop(stdin);
    let _ = child.wait();
}
