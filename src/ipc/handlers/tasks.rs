use crate::tasks::{service, TaskError, TaskPatch};
use crate::AppContext;
use anyhow::Result;
use serde_json::{json, Value};

fn s(v: &Value, key: &str) -> Option<String> {
    v.get(key).and_then(|v| v.as_str()).map(String::from)
}
fn sv<'a>(v: &'a Value, key: &str) -> Option<&'a str> {
    v.get(key).and_then(|v| v.as_str())
}
fn n(v: &Value, key: &str) -> Option<u64> {
    v.get(key).and_then(|v| v.as_u64())
}

fn missing(field: &str) -> anyhow::Error {
    TaskError::InvalidInput(format!("missing required field: {field}")).into()
}

pub async fn get_all(_params: Value, ctx: &AppContext) -> Result<Value> {
    let tasks = ctx.store.get_all();
    Ok(serde_json::to_value(tasks)?)
}

pub async fn get_by_id(params: Value, ctx: &AppContext) -> Result<Value> {
    let id = sv(&params, "id").ok_or_else(|| missing("id"))?;
    let task = ctx.store.get_by_id(id)?;
    Ok(serde_json::to_value(task)?)
}

pub async fn create(params: Value, ctx: &AppContext) -> Result<Value> {
    let title = s(&params, "title").ok_or_else(|| missing("title"))?;
    let description = s(&params, "description");

    let task = service::create(&ctx.store, title, description)?;
    ctx.broadcaster.task_created(&task);
    Ok(serde_json::to_value(task)?)
}

pub async fn update(params: Value, ctx: &AppContext) -> Result<Value> {
    let id = sv(&params, "id").ok_or_else(|| missing("id"))?;
    let patch = TaskPatch {
        title: s(&params, "title"),
        description: s(&params, "description"),
    };

    let task = service::update(&ctx.store, id, patch)?;
    ctx.broadcaster.task_updated(&task);
    Ok(serde_json::to_value(task)?)
}

pub async fn delete(params: Value, ctx: &AppContext) -> Result<Value> {
    let id = sv(&params, "id").ok_or_else(|| missing("id"))?;
    ctx.store.delete(id)?;
    ctx.broadcaster.task_deleted(id);
    Ok(json!({ "success": true }))
}

pub async fn get_paginated(params: Value, ctx: &AppContext) -> Result<Value> {
    let limit = n(&params, "limit").ok_or_else(|| missing("limit"))? as usize;
    let cursor = s(&params, "cursor");

    let page = service::get_paginated(&ctx.store, limit, cursor.as_deref())?;
    Ok(json!({
        "items": page.items,
        "nextCursor": page.next_cursor
    }))
}
