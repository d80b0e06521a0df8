
use serde_json::json;
use test_support::{request_ok, spawn_sidecar, temp_dir};

fn get_value(
    stdin: &mut std::process::ChildStdin,
    reader: &mut std::io::BufReader<std::process::ChildStdout>,
    id: &str,
    field: &str,
) -> serde_json::Value {
    request_ok(stdin, reader, id, "fields.get", json!({ "id": field }))
        .get("value")
        .cloned()
        .expect("value")
}

#[test]
fn fill_persists_present_fields_and_leaves_the_rest() {
    let workspace = temp_dir("lessonplan-fill");
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
        json!({ "id": "student-analysis", "value": "手写学情" }),
    );

    let filled = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "lesson.fill",
        json!({
            "content": {
                "keyPoints": "重点A",
                "teachingProcess": [
                    { "teacherActivity": "讲解", "studentActivity": "练习", "designIntent": "巩固" },
                    { "teacherActivity": "提问" }
                ]
            }
        }),
    );
    assert_eq!(filled.get("processSteps").and_then(|v| v.as_u64()), Some(2));

    assert_eq!(get_value(&mut stdin, &mut reader, "4", "key-points"), json!("重点A"));
    // A present step writes all three cells; missing sub-fields become empty.
    assert_eq!(
        get_value(&mut stdin, &mut reader, "5", "teachingProcess_0_0"),
        json!("讲解")
    );
    assert_eq!(
        get_value(&mut stdin, &mut reader, "6", "teachingProcess_1_0"),
        json!("提问")
    );
    assert_eq!(
        get_value(&mut stdin, &mut reader, "7", "teachingProcess_1_1"),
        json!("")
    );
    // Fields absent from the content keep their current value.
    assert_eq!(
        get_value(&mut stdin, &mut reader, "8", "student-analysis"),
        json!("手写学情")
    );
    // Trailing rows beyond the supplied steps are untouched.
    assert_eq!(
        get_value(&mut stdin, &mut reader, "9", "teachingProcess_2_0"),
        serde_json::Value::Null
    );

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn fill_is_idempotent() {
    let workspace = temp_dir("lessonplan-fill-idem");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let content = json!({
        "content": {
            "keyPoints": "重点A",
            "blackboardDesign": "板书",
            "teachingProcess": [
                { "teacherActivity": "讲解", "studentActivity": "练习", "designIntent": "巩固" }
            ]
        }
    });

    let first = request_ok(&mut stdin, &mut reader, "2", "lesson.fill", content.clone());
    let snapshot = request_ok(&mut stdin, &mut reader, "3", "fields.getAll", json!({}));
    let second = request_ok(&mut stdin, &mut reader, "4", "lesson.fill", content);
    let after = request_ok(&mut stdin, &mut reader, "5", "fields.getAll", json!({}));

    assert_eq!(first, second);
    assert_eq!(snapshot, after);

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn excess_steps_are_silently_discarded() {
    let workspace = temp_dir("lessonplan-fill-excess");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let steps: Vec<_> = (0..8)
        .map(|i| json!({ "teacherActivity": format!("活动{}", i) }))
        .collect();
    let filled = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "lesson.fill",
        json!({ "content": { "teachingProcess": steps } }),
    );
    assert_eq!(filled.get("processSteps").and_then(|v| v.as_u64()), Some(5));

    assert_eq!(
        get_value(&mut stdin, &mut reader, "3", "teachingProcess_4_0"),
        json!("活动4")
    );
    assert_eq!(
        get_value(&mut stdin, &mut reader, "4", "teachingProcess_5_0"),
        serde_json::Value::Null
    );

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}
