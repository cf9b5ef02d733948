//! Line protocol over stdin/stdout.
//!
//! Each non-blank line is one request:
//! - `<operation> <json>` posts the body to the operation
//! - `OPTIONS <operation>` answers the preflight
//! - `#quit` exits
//!
//! Every request produces exactly one JSON line: `{"status": .., "body": ..}`.

use bazi_core::{EngineConfig, Handler, Response};
use std::error::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeadlessOptions {
    pub seed: Option<u64>,
}

/// One parsed input line.
#[derive(Debug, PartialEq, Eq)]
pub enum Line<'a> {
    Blank,
    Quit,
    Request {
        method: &'a str,
        operation: &'a str,
        body: &'a str,
    },
}

pub fn parse_line(line: &str) -> Line<'_> {
    let line = line.trim();
    if line.is_empty() {
        return Line::Blank;
    }
    if let Some(command) = line.strip_prefix('#') {
        if matches!(command.trim(), "quit" | "exit") {
            return Line::Quit;
        }
    }

    let (head, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    if head.eq_ignore_ascii_case("OPTIONS") {
        return Line::Request {
            method: head,
            operation: rest.trim(),
            body: "",
        };
    }
    Line::Request {
        method: "POST",
        operation: head,
        body: rest.trim(),
    }
}

/// Run the request loop until `#quit` or end of input.
pub async fn run_headless(
    config: EngineConfig,
    options: HeadlessOptions,
) -> Result<(), Box<dyn Error>> {
    let mut handler = match options.seed {
        Some(seed) => Handler::from_seed(config, seed)?,
        None => Handler::from_config(config)?,
    };
    tracing::info!(seed = ?options.seed, "headless session started");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await? {
        let response = match parse_line(&line) {
            Line::Blank => continue,
            Line::Quit => break,
            Line::Request {
                method,
                operation,
                body,
            } => handler.handle_raw(method, operation, body),
        };
        stdout.write_all(render(&response).as_bytes()).await?;
        stdout.write_all(b"\n").await?;
        stdout.flush().await?;
    }

    tracing::info!("headless session ended");
    Ok(())
}

fn render(response: &Response) -> String {
    serde_json::to_string(response)
        .unwrap_or_else(|e| format!(r#"{{"status":500,"body":{{"error":"{e}"}}}}"#))
}

/// Parse driver options from command line arguments.
pub fn parse_options_from_args(args: &[String]) -> Result<HeadlessOptions, String> {
    let mut options = HeadlessOptions::default();

    let mut i = 0;
    while i < args.len() {
        if args[i] == "--seed" {
            let value = args.get(i + 1).ok_or("--seed needs a value")?;
            let seed = value
                .parse()
                .map_err(|_| format!("--seed expects an integer, got {value}"))?;
            options.seed = Some(seed);
            i += 1;
        }
        i += 1;
    }

    Ok(options)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_post() {
        assert_eq!(
            parse_line(r#"check_relationship {"positions": [0, 1]}"#),
            Line::Request {
                method: "POST",
                operation: "check_relationship",
                body: r#"{"positions": [0, 1]}"#,
            }
        );
        assert_eq!(
            parse_line("settings"),
            Line::Request {
                method: "POST",
                operation: "settings",
                body: "",
            }
        );
    }

    #[test]
    fn test_parse_preflight_and_commands() {
        assert_eq!(
            parse_line("OPTIONS new_game"),
            Line::Request {
                method: "OPTIONS",
                operation: "new_game",
                body: "",
            }
        );
        assert_eq!(parse_line("   "), Line::Blank);
        assert_eq!(parse_line("#quit"), Line::Quit);
    }

    #[test]
    fn test_parse_seed() {
        let args: Vec<String> = ["bazi", "--seed", "42"].iter().map(|s| s.to_string()).collect();
        assert_eq!(parse_options_from_args(&args).unwrap().seed, Some(42));

        let bad: Vec<String> = ["bazi", "--seed", "x"].iter().map(|s| s.to_string()).collect();
        assert!(parse_options_from_args(&bad).is_err());
    }

    #[test]
    fn test_render_is_one_line() {
        let mut handler = Handler::from_seed(EngineConfig::default(), 1).unwrap();
        let response = handler.handle_raw("POST", "settings", "");
        let line = render(&response);
        assert!(!line.contains('\n'));
        assert!(line.starts_with(r#"{"status":200"#));
    }
}
