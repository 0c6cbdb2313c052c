use std::time::Duration;

use clap::CommandFactory;
use clap::Parser;
use clap_complete::generate;

use termtap::commands::Cli;
use termtap::commands::Commands;
use termtap::commands::SessionCommand;
use termtap::handlers;
use termtap::presenter::create_presenter;
use termtap::HandlerContext;
use termtap::HandlerResult;
use termtap_common::init_tracing;
use termtap_daemon::start_daemon;
use termtap_daemon::DaemonError;
use termtap_ipc::error_codes::ErrorCategory;
use termtap_ipc::ensure_daemon;
use termtap_ipc::ClientError;
use termtap_ipc::DaemonClient;

fn main() {
    let cli = Cli::parse();
    let format = cli.effective_format();

    if let Err(e) = run(cli) {
        if let Some(client_error) = e.downcast_ref::<ClientError>() {
            create_presenter(format).present_client_error(client_error);
            std::process::exit(exit_code_for_client_error(client_error));
        } else if let Some(daemon_error) = e.downcast_ref::<DaemonError>() {
            eprintln!("Error: {}", daemon_error);
            eprintln!("Suggestion: {}", daemon_error.suggestion());
            if daemon_error.is_retryable() {
                eprintln!("(This error may be transient - retry may succeed)");
            }
            std::process::exit(74); // EX_IOERR
        } else {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

fn exit_code_for_client_error(error: &ClientError) -> i32 {
    match error.category() {
        Some(ErrorCategory::InvalidInput) => 64, // EX_USAGE
        Some(ErrorCategory::NotFound) => 69,     // EX_UNAVAILABLE
        Some(ErrorCategory::Busy) => 73,         // EX_CANTCREAT
        Some(ErrorCategory::External) => 74,     // EX_IOERR
        Some(ErrorCategory::Internal) => 74,     // EX_IOERR
        Some(ErrorCategory::Timeout) => 75,      // EX_TEMPFAIL
        None => 1,
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match &cli.command {
        Commands::Daemon => {
            let _telemetry = init_tracing("info");
            start_daemon().map_err(Into::into)
        }
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(*shell, &mut cmd, "termtap", &mut std::io::stdout());
            Ok(())
        }
        Commands::Session(command) => run_session_command(&cli, command),
    }
}

fn run_session_command(cli: &Cli, command: &SessionCommand) -> HandlerResult {
    let _telemetry = init_tracing("warn");

    let mut client = if cli.no_autostart || command.requires_running_daemon() {
        DaemonClient::connect()?
    } else {
        ensure_daemon()?
    };
    if let Some(secs) = cli.timeout {
        client = client.with_read_timeout(Duration::from_secs(secs));
    }

    let mut ctx = HandlerContext::new(&mut client, cli.effective_format());

    match command.clone() {
        SessionCommand::Exec { force, command } => handlers::handle_exec(&mut ctx, command, force),
        SessionCommand::ExecAsync { command } => handlers::handle_exec_async(&mut ctx, command),
        SessionCommand::Read => handlers::handle_read(&mut ctx),
        SessionCommand::Peek => handlers::handle_peek(&mut ctx),
        SessionCommand::HasUnread => handlers::handle_has_unread(&mut ctx),
        SessionCommand::Screen { lines } => handlers::handle_screen(&mut ctx, lines),
        SessionCommand::Control { signal } => handlers::handle_control(&mut ctx, signal),

        SessionCommand::Status => handlers::handle_status(&mut ctx),
        SessionCommand::Ping => handlers::handle_ping(&mut ctx),
        SessionCommand::Health => handlers::handle_health(&mut ctx),
        SessionCommand::Shutdown => handlers::handle_shutdown(&mut ctx),
    }
}
