
use serde_json::json;
use test_support::{request_err, request_ok, spawn_sidecar, temp_dir};

#[test]
fn fill_then_export_end_to_end() {
    let workspace = temp_dir("lessonplan-export");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    for (i, (id, value)) in [
        ("subject", "数学"),
        ("grade", "高一"),
        ("lesson-topic", "函数的概念"),
    ]
    .iter()
    .enumerate()
    {
        let _ = request_ok(
            &mut stdin,
            &mut reader,
            &format!("2-{}", i),
            "fields.set",
            json!({ "id": id, "value": value }),
        );
    }
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "lesson.fill",
        json!({
            "content": {
                "keyPoints": "重点A",
                "teachingProcess": [
                    { "teacherActivity": "讲解", "studentActivity": "练习", "designIntent": "巩固" }
                ]
            }
        }),
    );

    let rendered = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "export.render",
        json!({ "template": "print" }),
    );
    let html = rendered.get("html").and_then(|v| v.as_str()).expect("html");
    assert!(html.contains("重点A"));
    assert!(html.contains("【环节1】\n讲解"));
    assert!(html.contains("【环节1】\n练习"));
    assert!(html.contains("<tr><td>1</td><td>函数的概念</td><td>3</td></tr>"));

    let file_name = rendered
        .get("fileName")
        .and_then(|v| v.as_str())
        .expect("fileName");
    assert!(file_name.starts_with("教案_数学_高一_函数的概念_"));
    assert!(file_name.ends_with(".html"));

    // Flat layout shares the same record.
    let rendered = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "export.render",
        json!({ "template": "flat" }),
    );
    let html = rendered.get("html").and_then(|v| v.as_str()).expect("html");
    assert!(html.contains("<td>环节1</td><td>讲解</td><td>练习</td><td>巩固</td>"));
    assert!(html.contains("重点A"));

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn exports_escape_markup_and_read_latest_values() {
    let workspace = temp_dir("lessonplan-export-escape");
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
        json!({ "id": "key-points", "value": "<script>alert(1)</script> & \"quotes\"" }),
    );

    let rendered = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "export.render",
        json!({ "template": "print" }),
    );
    let html = rendered.get("html").and_then(|v| v.as_str()).expect("html");
    assert!(!html.contains("<script>"));
    assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt; &amp; &quot;quotes&quot;"));

    // A later edit shows up in the next export; nothing is cached.
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "fields.set",
        json!({ "id": "key-points", "value": "新重点" }),
    );
    let rendered = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "export.render",
        json!({ "template": "print" }),
    );
    let html = rendered.get("html").and_then(|v| v.as_str()).expect("html");
    assert!(html.contains("新重点"));
    assert!(!html.contains("&lt;script&gt;"));

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn process_steps_split_across_print_pages() {
    let workspace = temp_dir("lessonplan-export-split");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let steps: Vec<_> = (1..=5)
        .map(|i| json!({ "teacherActivity": format!("步骤{}", i) }))
        .collect();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "lesson.fill",
        json!({ "content": { "teachingProcess": steps } }),
    );

    let rendered = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "export.render",
        json!({ "template": "print" }),
    );
    let html = rendered.get("html").and_then(|v| v.as_str()).expect("html");
    // ceil(5/2) = 3 on page one; numbering continues 4..5 on page two.
    for n in 1..=5 {
        assert!(html.contains(&format!("【环节{}】\n步骤{}", n, n)), "step {}", n);
    }
    assert!(!html.contains("【环节6】"));

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn export_write_produces_the_file_and_no_leftovers() {
    let workspace = temp_dir("lessonplan-export-write");
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
    // A slash in the topic must not escape into the path.
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "fields.set",
        json!({ "id": "lesson-topic", "value": "分数/除法" }),
    );

    let written = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "export.write",
        json!({ "template": "print" }),
    );
    let path = written.get("path").and_then(|v| v.as_str()).expect("path");
    let file_name = written
        .get("fileName")
        .and_then(|v| v.as_str())
        .expect("fileName");
    assert!(file_name.contains("分数-除法"));

    let contents = std::fs::read_to_string(path).expect("read exported file");
    assert!(contents.contains("分数/除法"));
    assert!(contents.ends_with("</html>"));

    // No temp files left behind.
    let leftovers: Vec<_> = std::fs::read_dir(&workspace)
        .expect("read workspace")
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().ends_with(".part"))
        .collect();
    assert!(leftovers.is_empty());

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn unknown_template_kind_is_rejected() {
    let workspace = temp_dir("lessonplan-export-badkind");
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
        "export.render",
        json!({ "template": "docx" }),
    );
    assert_eq!(code, "bad_params");

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}
