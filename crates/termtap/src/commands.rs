use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
pub use clap_complete::Shell;

const LONG_ABOUT: &str = r#"termtap runs shell commands in one persistent terminal and hands back
only the output produced since you last looked.

A background daemon owns the shell. Every command goes to the same shell, so
working directory, environment and running programs carry over between calls.

WORKFLOW:
    1. exec a command and get its new output
    2. exec-async a long-running command and come back later with read
    3. exec refuses to run while earlier output is unread; the refused call
       prints that output so nothing is lost (or pass --force)

EXAMPLES:
    termtap exec ls -la
    termtap exec-async "cargo build"
    termtap has-unread
    termtap read
    termtap control c
    termtap screen --lines 20"#;

#[derive(Parser)]
#[command(name = "termtap")]
#[command(author, version)]
#[command(about = "Run commands in a persistent terminal and read back only new output")]
#[command(long_about = LONG_ABOUT)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format
    #[arg(short, long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Output as JSON (shorthand for --format json)
    #[arg(long, global = true)]
    pub json: bool,

    /// Fail instead of starting the daemon when it is not running
    #[arg(long, global = true, env = "TERMTAP_NO_AUTOSTART")]
    pub no_autostart: bool,

    /// Seconds to wait for the daemon's answer (default 60)
    #[arg(long, global = true, env = "TERMTAP_TIMEOUT", value_name = "SECS")]
    pub timeout: Option<u64>,
}

impl Cli {
    /// Returns the effective output format, considering --json shorthand.
    pub fn effective_format(&self) -> OutputFormat {
        if self.json {
            OutputFormat::Json
        } else {
            self.format
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    #[command(flatten)]
    Session(SessionCommand),

    /// Run the daemon in the foreground
    Daemon,

    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Commands answered by the daemon.
#[derive(Debug, Clone, Subcommand)]
pub enum SessionCommand {
    /// Run a command and print the output it produced
    #[command(long_about = r#"Run a command and print the output it produced.

Waits for the terminal to react, then prints everything that appeared since
the command was typed. If an earlier exec-async left output unread, the
command is NOT run: the unread output is printed instead and the exit code
is 73. Run the command again afterwards, or pass --force to skip the check.

EXAMPLES:
    termtap exec pwd
    termtap exec git status --short
    termtap exec --force q"#)]
    Exec {
        /// Run even if earlier output has not been read
        #[arg(long)]
        force: bool,

        /// Command line to type into the shell
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },

    /// Start a command without waiting for it
    ExecAsync {
        /// Command line to type into the shell
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },

    /// Print output produced since the last read and mark it as read
    Read,

    /// Print unread output without consuming it
    Peek,

    /// Report whether a started command has output waiting
    HasUnread,

    /// Print the tail of the terminal buffer
    Screen {
        /// Number of trailing lines (whole buffer when omitted)
        #[arg(short = 'n', long)]
        lines: Option<usize>,
    },

    /// Send a control signal
    #[command(long_about = r#"Send a control signal to the terminal.

SIGNALS:
    A-Z     Ctrl+<letter> (c interrupts, d sends EOF, z suspends)
    ]       Ctrl+] (telnet escape)
    ESC     Escape

EXAMPLES:
    termtap control c
    termtap control ESC"#)]
    Control {
        /// Signal name, case-insensitive
        signal: String,
    },

    /// Show the session's read state
    Status,

    /// Check that the daemon answers
    Ping,

    /// Show daemon health
    Health,

    /// Stop the daemon and its shell
    Shutdown,
}

impl SessionCommand {
    /// Commands that should never start a daemon just to talk to it.
    pub fn requires_running_daemon(&self) -> bool {
        matches!(self, SessionCommand::Shutdown | SessionCommand::Ping)
    }
}

#[derive(Clone, Copy, Debug, ValueEnum, Default, PartialEq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}
