use chrono::Local;
use serde_json::json;
use std::path::{Path, PathBuf};

use super::{db_conn, opt_str};
use crate::fields;
use crate::ipc::{err, ok, AppState, Request};
use crate::render::{self, TemplateKind};

fn template_kind(req: &Request) -> Result<TemplateKind, serde_json::Value> {
    let raw = opt_str(req, "template").unwrap_or_else(|| "print".to_string());
    TemplateKind::parse(&raw).ok_or_else(|| {
        err(
            &req.id,
            "bad_params",
            "template must be one of: print, flat",
            None,
        )
    })
}

fn handle_render(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let kind = match template_kind(req) {
        Ok(v) => v,
        Err(e) => return e,
    };

    // Always a fresh read; exports never reuse stale field values.
    let record = match fields::collect_record(conn) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let html = render::render(kind, &record);
    let file_name = render::export_file_name(&record, Local::now().date_naive());

    ok(&req.id, json!({ "html": html, "fileName": file_name }))
}

/// Write through a sibling temp file so a failed write leaves nothing
/// half-finished behind.
fn write_atomic(path: &Path, contents: &str) -> anyhow::Result<()> {
    let tmp = path.with_extension("html.part");
    if let Err(e) = std::fs::write(&tmp, contents) {
        let _ = std::fs::remove_file(&tmp);
        return Err(e.into());
    }
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(e.into());
    }
    Ok(())
}

fn handle_write(state: &mut AppState, req: &Request) -> serde_json::Value {
    let kind = match template_kind(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let record = match fields::collect_record(conn) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let html = render::render(kind, &record);
    let file_name = render::export_file_name(&record, Local::now().date_naive());

    let out_path = match opt_str(req, "outPath") {
        Some(p) => PathBuf::from(p),
        None => {
            let Some(workspace) = state.workspace.as_ref() else {
                return err(&req.id, "no_workspace", "select a workspace first", None);
            };
            workspace.join(&file_name)
        }
    };

    if let Err(e) = write_atomic(&out_path, &html) {
        return err(&req.id, "io_failed", e.to_string(), None);
    }

    ok(
        &req.id,
        json!({
            "path": out_path.to_string_lossy(),
            "fileName": file_name,
            "bytes": html.len()
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "export.render" => Some(handle_render(state, req)),
        "export.write" => Some(handle_write(state, req)),
        _ => None,
    }
}
