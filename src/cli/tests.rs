//! Unit tests for CLI commands

use std::io::Write;

use crate::cli::{default_registry, execute, Cli, Commands};
use clap::Parser;

fn config_file(service: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
    writeln!(file, "service: {service}\nlog_path: jsonrest-test.log\nendpoint: /api").unwrap();
    file
}

#[test]
fn test_call_command_parses() {
    let cli = Cli::try_parse_from([
        "jsonrest", "call", "--config", "h.yaml", "--path", "/echo", "--body", "{}", "-H",
        "x-a: 1",
    ])
    .unwrap();

    match cli.command {
        Commands::Call {
            path, body, headers, ..
        } => {
            assert_eq!(path, "/echo");
            assert_eq!(body.as_deref(), Some("{}"));
            assert_eq!(headers, vec!["x-a: 1".to_string()]);
        }
        Commands::Routes { .. } => panic!("Expected Call command"),
    }
}

#[test]
fn test_session_and_login_conflict() {
    let parsed = Cli::try_parse_from([
        "jsonrest", "call", "-c", "h.yaml", "-p", "/x", "--session", "s", "--login", "ann",
    ]);
    assert!(parsed.is_err());
}

#[test]
fn test_routes_lists_echo_service() {
    let file = config_file("echo");
    let output = execute(
        &Commands::Routes {
            config: file.path().to_path_buf(),
        },
        &default_registry(),
    )
    .unwrap();

    assert!(output.starts_with("service=EchoService count=5"), "{output}");
    assert!(output.contains("/echo -> EchoService.echo(message: String) -> String [log_io]"));
    assert!(output.contains("/whoami -> EchoService.whoami(ctx: RequestContext) -> anyhow::Result<String> [auth]"));
}

#[test]
fn test_call_echo() {
    let file = config_file("echo");
    let command = Commands::Call {
        config: file.path().to_path_buf(),
        path: "/api/Echo".to_string(),
        body: Some(r#"{"Message":"hi"}"#.to_string()),
        session: None,
        login: None,
        headers: Vec::new(),
    };
    let output = execute(&command, &default_registry()).unwrap();
    assert_eq!(output, "200\n{\"response\":\"hi\"}");
}

#[test]
fn test_call_whoami_with_login() {
    let file = config_file("echo");
    let mut command = Commands::Call {
        config: file.path().to_path_buf(),
        path: "/api/whoami".to_string(),
        body: None,
        session: None,
        login: Some("ann".to_string()),
        headers: Vec::new(),
    };
    let output = execute(&command, &default_registry()).unwrap();
    assert_eq!(output, "200\n{\"response\":\"ann\"}");

    if let Commands::Call { login, .. } = &mut command {
        *login = None;
    }
    let output = execute(&command, &default_registry()).unwrap();
    assert_eq!(output, "401\n{\"error\":\"You're not connected.\"}");
}

#[test]
fn test_unknown_service() {
    let file = config_file("nope");
    let err = execute(
        &Commands::Routes {
            config: file.path().to_path_buf(),
        },
        &default_registry(),
    )
    .unwrap_err();
    assert_eq!(err.to_string(), "Type nope not found");
}
