// system-tests/src/bin/pwsh.rs
// ============================================================================
// Module: Fixture Script Interpreter
// Description: A stand-in for the `pwsh` interpreter the engine always
//              launches case scripts through, interpreting a tiny
//              fixture DSL instead of real PowerShell.
// Purpose: Let system-test scenarios drive a real `pvtx_engine::Engine`
//          end to end without requiring PowerShell Core to be installed
//          wherever the workspace's tests run.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Built under the name `pwsh` and put ahead of any real interpreter via
//! the `PATH` each scenario writes into its suite manifest's
//! `environment.env` (see `helpers::pwsh_path_override`), so
//! `node::run_attempt`'s `Command::new("pwsh")` resolves to this binary
//! unmodified. Accepts and
//! ignores PowerShell's own CLI flags (`-NoLogo`, `-NoProfile`, named
//! parameter arguments), reads the `-File` target, and interprets it one
//! line at a time against the fixture DSL below:
//!
//! - `exit N` — exit immediately with code `N`.
//! - `sleep N` — sleep `N` seconds, then continue.
//! - `counter THRESHOLD BELOW AT_OR_ABOVE` — increments a count persisted
//!   in `attempt.count` in the current directory (starting at 0) and
//!   exits `BELOW` if the new count is less than `THRESHOLD`, else
//!   `AT_OR_ABOVE`.
//! - `write-control NAME` followed by literal body lines up to a line
//!   reading exactly `end-control`, written verbatim to
//!   `$PVTX_CONTROL_DIR/NAME`.
//!
//! Blank lines and lines starting with `#` are skipped. Reaching end of
//! file without an `exit` line exits `0`.

use std::io::Write as _;
use std::path::Path;
use std::path::PathBuf;

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(script_path) = find_file_arg(&args) else {
        write_stderr_line("pwsh: no -File argument given");
        std::process::exit(2);
    };

    let body = match std::fs::read_to_string(&script_path) {
        Ok(body) => body,
        Err(err) => {
            write_stderr_line(&format!("pwsh: cannot read {}: {err}", script_path.display()));
            std::process::exit(2);
        }
    };

    std::process::exit(run_script(&body));
}

/// Finds the path following a `-File` flag in `args`.
fn find_file_arg(args: &[String]) -> Option<PathBuf> {
    args.iter().position(|arg| arg == "-File").and_then(|index| args.get(index + 1)).map(PathBuf::from)
}

/// Interprets `body` line by line, returning the process exit code.
fn run_script(body: &str) -> i32 {
    let mut lines = body.lines();
    while let Some(raw_line) = lines.next() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut tokens = line.split_whitespace();
        let Some(command) = tokens.next() else { continue };
        match command {
            "exit" => return parse_u8_arg(tokens.next()),
            "sleep" => sleep_seconds(tokens.next()),
            "counter" => return run_counter(tokens.next(), tokens.next(), tokens.next()),
            "write-control" => {
                if let Some(name) = tokens.next() {
                    run_write_control(name, &mut lines);
                }
            }
            other => {
                write_stderr_line(&format!("pwsh: unrecognized fixture directive {other:?}"));
                return 2;
            }
        }
    }
    0
}

/// Parses an exit-code argument, defaulting to `0` on a missing or
/// malformed value.
fn parse_u8_arg(arg: Option<&str>) -> i32 {
    arg.and_then(|value| value.parse::<i32>().ok()).unwrap_or(0)
}

/// Sleeps for the given whole number of seconds; a missing or malformed
/// argument is treated as zero.
fn sleep_seconds(arg: Option<&str>) {
    let seconds = arg.and_then(|value| value.parse::<u64>().ok()).unwrap_or(0);
    std::thread::sleep(std::time::Duration::from_secs(seconds));
}

/// Runs the `counter` directive: increments the persisted attempt count
/// and returns the exit code for the threshold it lands on.
fn run_counter(threshold: Option<&str>, below: Option<&str>, at_or_above: Option<&str>) -> i32 {
    let threshold: i64 = threshold.and_then(|value| value.parse().ok()).unwrap_or(0);
    let below = parse_i32_arg(below);
    let at_or_above = parse_i32_arg(at_or_above);

    let counter_path = Path::new("attempt.count");
    let previous: i64 = std::fs::read_to_string(counter_path).ok().and_then(|content| content.trim().parse().ok()).unwrap_or(0);
    let next = previous + 1;
    if std::fs::write(counter_path, next.to_string()).is_err() {
        write_stderr_line("pwsh: failed to persist attempt.count");
        return 2;
    }

    if next < threshold { below } else { at_or_above }
}

/// Parses an exit-code argument, defaulting to `0` on a missing or
/// malformed value.
fn parse_i32_arg(arg: Option<&str>) -> i32 {
    arg.and_then(|value| value.parse().ok()).unwrap_or(0)
}

/// Runs the `write-control` directive: collects every line up to
/// `end-control` and writes it verbatim to `$PVTX_CONTROL_DIR/name`.
fn run_write_control(name: &str, lines: &mut std::str::Lines<'_>) {
    let mut body = String::new();
    for raw_line in lines.by_ref() {
        if raw_line.trim() == "end-control" {
            break;
        }
        body.push_str(raw_line);
        body.push('\n');
    }

    let Ok(control_dir) = std::env::var("PVTX_CONTROL_DIR") else {
        write_stderr_line("pwsh: PVTX_CONTROL_DIR is not set");
        return;
    };
    let target = Path::new(&control_dir).join(name);
    if let Err(err) = std::fs::write(&target, body) {
        write_stderr_line(&format!("pwsh: failed to write {}: {err}", target.display()));
    }
}

/// Writes a single line to stderr without panicking.
fn write_stderr_line(message: &str) {
    let mut stderr = std::io::stderr();
    let _ = writeln!(&mut stderr, "{message}");
}
