use chrono::Utc;
use serde_json::{json, Map, Value};
use std::path::PathBuf;

use super::{db_conn, opt_str, required_str};
use crate::db;
use crate::fields;
use crate::ipc::{err, ok, AppState, Request};

fn handle_set(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let id = match required_str(req, "id") {
        Ok(v) => v,
        Err(e) => return e,
    };
    if !fields::is_known_id(&id) {
        return err(
            &req.id,
            "bad_params",
            format!("unknown field id: {}", id),
            None,
        );
    }
    let value = match required_str(req, "value") {
        Ok(v) => v,
        Err(e) => return e,
    };

    match fields::set(conn, &id, &value) {
        Ok(()) => ok(&req.id, json!({ "id": id })),
        Err(e) => err(&req.id, "db_update_failed", e.to_string(), None),
    }
}

fn handle_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let id = match required_str(req, "id") {
        Ok(v) => v,
        Err(e) => return e,
    };

    match fields::get(conn, &id) {
        Ok(value) => ok(&req.id, json!({ "id": id, "value": value })),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn stored_fields(conn: &rusqlite::Connection) -> anyhow::Result<Map<String, Value>> {
    let mut out = Map::new();
    for (key, value) in db::fields_all(conn, fields::KEY_PREFIX)? {
        if let Some(id) = key.strip_prefix(fields::KEY_PREFIX) {
            out.insert(id.to_string(), Value::String(value));
        }
    }
    Ok(out)
}

fn handle_get_all(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    match stored_fields(conn) {
        Ok(map) => ok(&req.id, json!({ "fields": map })),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_clear_all(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    // The credential survives a clear; everything else under the prefix goes.
    let keep = fields::store_key(fields::API_KEY_ID);
    match db::fields_clear(conn, fields::KEY_PREFIX, &[keep.as_str()]) {
        Ok(cleared) => ok(&req.id, json!({ "cleared": cleared })),
        Err(e) => err(&req.id, "db_update_failed", e.to_string(), None),
    }
}

fn handle_export_json(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let mut map = match stored_fields(conn) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    map.remove(fields::API_KEY_ID);

    let out_path = match opt_str(req, "outPath") {
        Some(p) => PathBuf::from(p),
        None => {
            let Some(workspace) = state.workspace.as_ref() else {
                return err(&req.id, "no_workspace", "select a workspace first", None);
            };
            workspace.join(format!("教案数据_{}.json", Utc::now().timestamp()))
        }
    };

    let text = match serde_json::to_string_pretty(&Value::Object(map.clone())) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "io_failed", e.to_string(), None),
    };
    if let Err(e) = std::fs::write(&out_path, text) {
        return err(&req.id, "io_failed", e.to_string(), None);
    }

    ok(
        &req.id,
        json!({ "path": out_path.to_string_lossy(), "exported": map.len() }),
    )
}

fn handle_import_json(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let path = match required_str(req, "path") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let text = match std::fs::read_to_string(&path) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "io_failed", e.to_string(), None),
    };
    let value: Value = match serde_json::from_str(&text) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "bad_params", format!("invalid JSON: {}", e), None),
    };
    let Some(obj) = value.as_object() else {
        return err(&req.id, "bad_params", "file must contain a JSON object", None);
    };

    let mut imported = 0usize;
    let mut skipped = 0usize;
    for (id, v) in obj {
        let Some(s) = v.as_str() else {
            skipped += 1;
            continue;
        };
        if !fields::is_known_id(id) || id == fields::API_KEY_ID {
            skipped += 1;
            continue;
        }
        if let Err(e) = fields::set(conn, id, s) {
            return err(&req.id, "db_update_failed", e.to_string(), None);
        }
        imported += 1;
    }

    ok(&req.id, json!({ "imported": imported, "skipped": skipped }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "fields.set" => Some(handle_set(state, req)),
        "fields.get" => Some(handle_get(state, req)),
        "fields.getAll" => Some(handle_get_all(state, req)),
        "fields.clearAll" => Some(handle_clear_all(state, req)),
        "fields.exportJson" => Some(handle_export_json(state, req)),
        "fields.importJson" => Some(handle_import_json(state, req)),
        _ => None,
    }
}
