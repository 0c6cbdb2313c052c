use serde_json::json;
use serde_json::Value;
use tracing::debug;

use termtap_ipc::ClientError;
use termtap_ipc::DaemonClient;

use crate::commands::OutputFormat;
use crate::presenter::{create_presenter, format_uptime_ms, Presenter};

pub type HandlerResult = Result<(), Box<dyn std::error::Error>>;

pub struct HandlerContext<'a> {
    pub client: &'a mut DaemonClient,
    pub format: OutputFormat,
    presenter: Box<dyn Presenter>,
}

impl<'a> HandlerContext<'a> {
    pub fn new(client: &'a mut DaemonClient, format: OutputFormat) -> Self {
        Self {
            client,
            format,
            presenter: create_presenter(format),
        }
    }

    pub fn presenter(&self) -> &dyn Presenter {
        self.presenter.as_ref()
    }

    fn call(&mut self, method: &str, params: Option<Value>) -> Result<Value, ClientError> {
        debug!(method, "Calling daemon");
        self.client.call(method, params)
    }

    /// JSON mode prints the raw result; text mode runs `text`.
    fn present<F>(&self, result: &Value, text: F)
    where
        F: FnOnce(&dyn Presenter, &Value),
    {
        match self.format {
            OutputFormat::Json => self.presenter.present_value(result),
            OutputFormat::Text => text(self.presenter(), result),
        }
    }
}

fn str_field<'v>(value: &'v Value, key: &str) -> &'v str {
    value.get(key).and_then(Value::as_str).unwrap_or_default()
}

fn u64_field(value: &Value, key: &str) -> u64 {
    value.get(key).and_then(Value::as_u64).unwrap_or_default()
}

pub fn handle_exec(ctx: &mut HandlerContext, command: Vec<String>, force: bool) -> HandlerResult {
    let command = command.join(" ");
    let params = json!({ "command": command, "force": force });

    let result = match ctx.call("execute", Some(params)) {
        Ok(result) => result,
        Err(e) => {
            // The daemon consumed this output when it refused the command.
            if let (OutputFormat::Text, Some(output)) = (ctx.format, e.unread_output()) {
                ctx.presenter().present_output(output);
            }
            return Err(e.into());
        }
    };

    ctx.present(&result, |p, r| p.present_output(str_field(r, "output")));
    Ok(())
}

pub fn handle_exec_async(ctx: &mut HandlerContext, command: Vec<String>) -> HandlerResult {
    let command = command.join(" ");
    let result = ctx.call("execute_async", Some(json!({ "command": command })))?;

    ctx.present(&result, |p, r| {
        p.present_success(&format!("Started: {}", str_field(r, "command")))
    });
    Ok(())
}

pub fn handle_read(ctx: &mut HandlerContext) -> HandlerResult {
    let result = ctx.call("read_output", None)?;
    ctx.present(&result, |p, r| p.present_output(str_field(r, "output")));
    Ok(())
}

pub fn handle_peek(ctx: &mut HandlerContext) -> HandlerResult {
    let result = ctx.call("peek", None)?;
    ctx.present(&result, |p, r| {
        if let Some(output) = r.get("output").and_then(Value::as_str) {
            p.present_output(output);
        }
    });
    Ok(())
}

pub fn handle_has_unread(ctx: &mut HandlerContext) -> HandlerResult {
    let result = ctx.call("has_unread", None)?;
    ctx.present(&result, |p, r| {
        let has_unread = r.get("has_unread").and_then(Value::as_bool).unwrap_or(false);
        p.present_info(if has_unread { "yes" } else { "no" });
    });
    Ok(())
}

pub fn handle_screen(ctx: &mut HandlerContext, lines: Option<usize>) -> HandlerResult {
    let params = lines.map(|n| json!({ "lines": n }));
    let result = ctx.call("read_screen", params)?;
    ctx.present(&result, |p, r| p.present_output(str_field(r, "screen")));
    Ok(())
}

pub fn handle_control(ctx: &mut HandlerContext, signal: String) -> HandlerResult {
    let result = ctx.call("send_control", Some(json!({ "signal": signal })))?;
    ctx.present(&result, |p, r| {
        p.present_success(&format!(
            "Sent {} (0x{:02x})",
            str_field(r, "signal"),
            u64_field(r, "code")
        ))
    });
    Ok(())
}

pub fn handle_status(ctx: &mut HandlerContext) -> HandlerResult {
    let result = ctx.call("status", None)?;
    ctx.present(&result, |p, r| {
        p.present_info(&format!("Session {}", str_field(r, "session_id")));
        match r.get("pending_command").and_then(Value::as_str) {
            Some(command) => {
                p.present_kv("Pending", command);
                p.present_kv(
                    "Running for",
                    &format_uptime_ms(u64_field(r, "pending_for_ms")),
                );
            }
            None => p.present_kv("Pending", "none"),
        }
        p.present_kv(
            "Last read",
            &format!("{} ago", format_uptime_ms(u64_field(r, "last_read_age_ms"))),
        );
    });
    Ok(())
}

pub fn handle_ping(ctx: &mut HandlerContext) -> HandlerResult {
    let result = ctx.call("ping", None)?;
    ctx.present(&result, |p, _| p.present_info("pong"));
    Ok(())
}

pub fn handle_health(ctx: &mut HandlerContext) -> HandlerResult {
    let result = ctx.call("health", None)?;
    ctx.present(&result, |p, r| {
        p.present_info(&format!("Daemon {}", str_field(r, "status")));
        p.present_kv("PID", &u64_field(r, "pid").to_string());
        p.present_kv("Uptime", &format_uptime_ms(u64_field(r, "uptime_ms")));
        p.present_kv("Session", str_field(r, "session_id"));
        p.present_kv("Version", str_field(r, "version"));
        p.present_kv(
            "Connections",
            &u64_field(r, "active_connections").to_string(),
        );
    });
    Ok(())
}

pub fn handle_shutdown(ctx: &mut HandlerContext) -> HandlerResult {
    let result = ctx.call("shutdown", None)?;
    ctx.present(&result, |p, _| p.present_success("Daemon stopping"));
    Ok(())
}
