use serde_json::Value;

use termtap_ipc::ClientError;

use crate::commands::OutputFormat;

/// Output formatting for the CLI, so handlers stay format-agnostic.
pub trait Presenter {
    /// Terminal output exactly as captured.
    fn present_output(&self, output: &str);

    /// The full daemon result.
    fn present_value(&self, value: &Value);

    fn present_kv(&self, key: &str, value: &str);

    fn present_success(&self, message: &str);

    fn present_info(&self, message: &str);

    fn present_client_error(&self, error: &ClientError);
}

pub struct TextPresenter;

impl Presenter for TextPresenter {
    fn present_output(&self, output: &str) {
        if output.is_empty() {
            return;
        }
        if output.ends_with('\n') {
            print!("{}", output);
        } else {
            println!("{}", output);
        }
    }

    fn present_value(&self, value: &Value) {
        if let Some(s) = value.as_str() {
            println!("{}", s);
        } else {
            println!(
                "{}",
                serde_json::to_string_pretty(value).unwrap_or_default()
            );
        }
    }

    fn present_kv(&self, key: &str, value: &str) {
        println!("  {}: {}", key, value);
    }

    fn present_success(&self, message: &str) {
        println!("{}", message);
    }

    fn present_info(&self, message: &str) {
        println!("{}", message);
    }

    fn present_client_error(&self, error: &ClientError) {
        eprintln!("Error: {}", error);
        if let Some(suggestion) = error.suggestion() {
            eprintln!("Suggestion: {}", suggestion);
        }
        if error.is_retryable() {
            eprintln!("(This error may be transient - retry may succeed)");
        }
    }
}

pub struct JsonPresenter;

impl Presenter for JsonPresenter {
    fn present_output(&self, output: &str) {
        self.present_value(&serde_json::json!({ "output": output }));
    }

    fn present_value(&self, value: &Value) {
        println!("{}", serde_json::to_string(value).unwrap_or_default());
    }

    fn present_kv(&self, key: &str, value: &str) {
        self.present_value(&serde_json::json!({ key: value }));
    }

    fn present_success(&self, message: &str) {
        self.present_value(&serde_json::json!({
            "success": true,
            "message": message
        }));
    }

    fn present_info(&self, message: &str) {
        self.present_value(&serde_json::json!({ "info": message }));
    }

    fn present_client_error(&self, error: &ClientError) {
        eprintln!("{}", error.to_json());
    }
}

pub fn create_presenter(format: OutputFormat) -> Box<dyn Presenter> {
    match format {
        OutputFormat::Json => Box::new(JsonPresenter),
        OutputFormat::Text => Box::new(TextPresenter),
    }
}

pub fn format_uptime_ms(uptime_ms: u64) -> String {
    let secs = uptime_ms / 1000;
    let mins = secs / 60;
    let hours = mins / 60;
    if hours > 0 {
        format!("{}h {}m {}s", hours, mins % 60, secs % 60)
    } else if mins > 0 {
        format!("{}m {}s", mins, secs % 60)
    } else {
        format!("{}s", secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_uptime() {
        assert_eq!(format_uptime_ms(999), "0s");
        assert_eq!(format_uptime_ms(61_000), "1m 1s");
        assert_eq!(format_uptime_ms(3_723_000), "1h 2m 3s");
    }

    #[test]
    fn test_presenters_do_not_panic() {
        for presenter in [
            create_presenter(OutputFormat::Text),
            create_presenter(OutputFormat::Json),
        ] {
            presenter.present_output("");
            presenter.present_output("line\n");
            presenter.present_kv("key", "value");
            presenter.present_success("done");
            presenter.present_client_error(&ClientError::DaemonNotRunning);
        }
    }
}
