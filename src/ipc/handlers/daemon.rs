use crate::AppContext;
use anyhow::Result;
use serde_json::{json, Value};

pub async fn ping(_params: Value, _ctx: &AppContext) -> Result<Value> {
    Ok(json!({ "pong": true, "version": env!("CARGO_PKG_VERSION") }))
}

/// Liveness probe for clients that only want a yes/no answer.
pub async fn healthcheck(_params: Value, _ctx: &AppContext) -> Result<Value> {
    Ok(json!({ "status": "ok" }))
}

pub async fn status(_params: Value, ctx: &AppContext) -> Result<Value> {
    let uptime = ctx.started_at.elapsed().as_secs();
    Ok(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime": uptime,
        "tasks": ctx.store.len(),
        "port": ctx.config.port
    }))
}
