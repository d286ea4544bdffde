//! Demo tool set backing the built-in plan templates.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use latentflow_executor::{ToolError, ToolParams, ToolRegistry};
use serde_json::{json, Value};

fn param(params: &ToolParams, key: &str) -> Value {
    params.get(key).cloned().unwrap_or(Value::Null)
}

/// Registry with every tool the templates can emit.
///
/// Ids handed out by `create_transfer` and `create_order` come from one
/// shared sequence, so a single registry gives unique ids across sessions.
pub fn demo_registry() -> ToolRegistry {
    let seq = Arc::new(AtomicU64::new(1));
    let next_id = move |prefix: &str| format!("{prefix}-{}", seq.fetch_add(1, Ordering::Relaxed));
    let next_order_id = next_id.clone();

    let mut registry = ToolRegistry::new();
    registry
        .register_fn("check_user", |p| {
            let user = param(p, "user");
            let exists = user.as_str().is_some_and(|u| u != "Unknown");
            Ok(json!({ "user": user, "exists": exists }))
        })
        .register_fn("check_balance", |p| {
            Ok(json!({ "ok": true, "currency": param(p, "currency"), "amount": param(p, "amount") }))
        })
        .register_fn("create_transfer", move |p| {
            Ok(json!({
                "transfer_id": next_id("T"),
                "to": param(p, "to"),
                "amount": param(p, "amount"),
                "currency": param(p, "currency"),
            }))
        })
        .register_fn("submit_transfer", |_| Ok(json!({ "submitted": true })))
        .register_fn("submit_withdraw", |p| {
            Ok(json!({ "submitted": true, "amount": param(p, "amount"), "currency": param(p, "currency") }))
        })
        .register_fn("load_order", |p| match param(p, "order_id") {
            Value::Null => Err(ToolError::new("order_id is required")),
            order_id => Ok(json!({ "order_id": order_id, "status": "CREATED" })),
        })
        .register_fn("cancel_order", |p| {
            Ok(json!({ "order_id": param(p, "order_id"), "canceled": true }))
        })
        .register_fn("create_order", move |p| {
            Ok(json!({ "order_id": next_order_id("O"), "item": param(p, "item"), "status": "CREATED" }))
        })
        .register_fn("submit_order", |_| Ok(json!({ "submitted": true })))
        .register_fn("answer", |p| {
            Ok(json!({ "query": param(p, "query"), "answer": "no knowledge source configured" }))
        });
    registry
}
