use serde_json::json;

use super::{db_conn, opt_str};
use crate::fields::{self, LessonContent};
use crate::ipc::{err, ok, AppState, Request};
use crate::llm::{ChatClient, GenerateError, DEFAULT_API_BASE};
use crate::prompt::{build_prompt, CoverMetadata};

fn cover_from_store(conn: &rusqlite::Connection) -> anyhow::Result<CoverMetadata> {
    let read = |id: &str| -> anyhow::Result<String> {
        Ok(fields::get(conn, id)?.unwrap_or_default())
    };
    Ok(CoverMetadata {
        subject: read("subject")?,
        grade: read("grade")?,
        class: read("class")?,
        academic_year: read("academic-year")?,
        teacher: read("teacher")?,
        lesson_topic: read("lesson-topic")?,
    }
    .trimmed())
}

fn generate_error(req: &Request, e: GenerateError) -> serde_json::Value {
    match &e {
        GenerateError::Transport(source) => {
            tracing::warn!(error = %source, "generation request failed to reach the endpoint");
            err(&req.id, "transport_error", e.to_string(), None)
        }
        GenerateError::Api { status, body } => err(
            &req.id,
            "api_error",
            e.to_string(),
            Some(json!({ "status": status, "body": body })),
        ),
        // Raw text already went to the log in parse_lesson_content; the
        // response carries only the retry suggestion.
        GenerateError::Parse { .. } => err(&req.id, "parse_error", e.to_string(), None),
    }
}

fn handle_generate(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };

    let cover = match cover_from_store(conn) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    // Validation happens before anything touches the network.
    let missing = cover.missing_required();
    if !missing.is_empty() {
        return err(
            &req.id,
            "missing_cover_fields",
            "请先填写封面的学科和年级信息",
            Some(json!({ "missing": missing })),
        );
    }

    let api_key = match opt_str(req, "apiKey") {
        Some(key) => key,
        None => match fields::get(conn, fields::API_KEY_ID) {
            Ok(Some(key)) if !key.trim().is_empty() => key.trim().to_string(),
            Ok(_) => return err(&req.id, "missing_api_key", "请输入API密钥", None),
            Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
        },
    };
    let api_base = opt_str(req, "apiBase").unwrap_or_else(|| DEFAULT_API_BASE.to_string());

    let client = match ChatClient::new(&api_base, &api_key) {
        Ok(v) => v,
        Err(e) => return generate_error(req, e),
    };
    let prompt = build_prompt(&cover);
    let content = match client.generate(&prompt) {
        Ok(v) => v,
        Err(e) => return generate_error(req, e),
    };

    match fields::apply_generated(conn, &content) {
        Ok(filled) => ok(
            &req.id,
            json!({
                "fields": filled,
                "processSteps": content.teaching_process.len().min(fields::PROCESS_ROWS)
            }),
        ),
        Err(e) => err(&req.id, "db_update_failed", e.to_string(), None),
    }
}

fn handle_fill(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let Some(raw) = req.params.get("content") else {
        return err(&req.id, "bad_params", "missing content", None);
    };
    let content: LessonContent = match serde_json::from_value(raw.clone()) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "bad_params", format!("invalid content: {}", e), None),
    };

    match fields::apply_generated(conn, &content) {
        Ok(filled) => ok(
            &req.id,
            json!({
                "fields": filled,
                "processSteps": content.teaching_process.len().min(fields::PROCESS_ROWS)
            }),
        ),
        Err(e) => err(&req.id, "db_update_failed", e.to_string(), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "lesson.generate" => Some(handle_generate(state, req)),
        "lesson.fill" => Some(handle_fill(state, req)),
        _ => None,
    }
}
