//! Layering checks: the session engine only knows about `SnapshotSource`,
//! never about PTYs, sockets or the daemon.

use std::fs;
use std::path::Path;

fn forbidden_imports(file_path: &Path, forbidden_patterns: &[&str]) -> Vec<String> {
    let content = match fs::read_to_string(file_path) {
        Ok(c) => c,
        Err(_) => return vec![],
    };

    let mut violations = Vec::new();
    for (line_num, line) in content.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.starts_with("//") || !trimmed.starts_with("use ") {
            continue;
        }
        for pattern in forbidden_patterns {
            if trimmed.contains(pattern) {
                violations.push(format!(
                    "{}:{}: forbidden import '{}' in '{}'",
                    file_path.display(),
                    line_num + 1,
                    pattern,
                    trimmed
                ));
            }
        }
    }
    violations
}

fn check_directory(dir: &Path, forbidden_patterns: &[&str]) -> Vec<String> {
    let mut violations = Vec::new();
    for entry in fs::read_dir(dir).unwrap().flatten() {
        let path = entry.path();
        if path.is_dir() {
            violations.extend(check_directory(&path, forbidden_patterns));
        } else if path.extension().is_some_and(|ext| ext == "rs") {
            violations.extend(forbidden_imports(&path, forbidden_patterns));
        }
    }
    violations
}

#[test]
fn core_does_not_import_io_layers() {
    let forbidden = &[
        "termtap_terminal",
        "termtap_ipc",
        "termtap_daemon",
        "portable_pty",
        "vt100",
        "tokio::net",
    ];

    let src = Path::new(env!("CARGO_MANIFEST_DIR")).join("src");
    let violations = check_directory(&src, forbidden);

    if !violations.is_empty() {
        panic!("Core has forbidden imports:\n{}", violations.join("\n"));
    }
}

#[test]
fn only_session_drives_the_source() {
    let src = Path::new(env!("CARGO_MANIFEST_DIR")).join("src");
    let forbidden = &["crate::session"];

    let mut violations = Vec::new();
    for name in ["diff.rs", "completion.rs", "control.rs", "sleeper.rs", "source.rs"] {
        violations.extend(forbidden_imports(&src.join(name), forbidden));
    }

    if !violations.is_empty() {
        panic!(
            "Leaf modules depend on the session:\n{}",
            violations.join("\n")
        );
    }
}
