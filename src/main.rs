// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Proteus-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Proteus and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Proteus CLI entrypoint.
//!
//! By default this serves the graph protocol over TCP against the built-in
//! demo host; a real editor embeds the library and supplies its own
//! `EditorHost` instead. `--script` runs a Rhai script against the same
//! service in-process and exits.

use std::error::Error;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use proteus::host::DemoHost;
use proteus::net::{self, NetConfig};
use proteus::script::ScriptRunner;
use proteus::service::{GraphService, ServiceConfig};

fn print_usage(program: &str) {
    eprintln!(
        "Usage:\n  {program} [--port <port>] [--max-sessions <n>] [--idle-timeout <secs>] [--watchdog <secs>]\n  {program} --script <file.rhai>\n  {program} --print-protocol-schema\n\nServes the graph protocol on 127.0.0.1:<port> (default {}) against the\nbuilt-in demo host. --watchdog force-fails compiles that have not settled\nafter the given number of seconds (off by default).\n\n--script runs a Rhai script against an in-process service and exits.\n--print-protocol-schema writes a JSON schema of the wire protocol to stdout.",
        net::DEFAULT_PORT
    );
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct CliOptions {
    port: Option<u16>,
    max_sessions: Option<usize>,
    idle_timeout_secs: Option<u64>,
    watchdog_secs: Option<u64>,
    script: Option<String>,
    print_schema: bool,
}

fn parse_options(mut args: impl Iterator<Item = String>) -> Result<CliOptions, ()> {
    let mut options = CliOptions::default();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--port" => {
                if options.port.is_some() {
                    return Err(());
                }
                options.port = Some(args.next().ok_or(())?.parse().map_err(|_| ())?);
            }
            "--max-sessions" => {
                if options.max_sessions.is_some() {
                    return Err(());
                }
                let raw: usize = args.next().ok_or(())?.parse().map_err(|_| ())?;
                if raw == 0 {
                    return Err(());
                }
                options.max_sessions = Some(raw);
            }
            "--idle-timeout" => {
                if options.idle_timeout_secs.is_some() {
                    return Err(());
                }
                options.idle_timeout_secs = Some(args.next().ok_or(())?.parse().map_err(|_| ())?);
            }
            "--watchdog" => {
                if options.watchdog_secs.is_some() {
                    return Err(());
                }
                options.watchdog_secs = Some(args.next().ok_or(())?.parse().map_err(|_| ())?);
            }
            "--script" => {
                if options.script.is_some() {
                    return Err(());
                }
                options.script = Some(args.next().ok_or(())?);
            }
            "--print-protocol-schema" => {
                if options.print_schema {
                    return Err(());
                }
                options.print_schema = true;
            }
            _ => return Err(()),
        }
    }

    if options.print_schema
        && (options.script.is_some() || options.port.is_some() || options.watchdog_secs.is_some())
    {
        return Err(());
    }
    if options.script.is_some() && options.port.is_some() {
        return Err(());
    }

    Ok(options)
}

fn service_config(options: &CliOptions) -> ServiceConfig {
    let mut config = ServiceConfig::default();
    if let Some(max_sessions) = options.max_sessions {
        config.max_sessions = max_sessions;
    }
    if let Some(secs) = options.idle_timeout_secs {
        config.idle_timeout = Duration::from_secs(secs);
    }
    if let Some(secs) = options.watchdog_secs {
        config.compile_watchdog = Some(Duration::from_secs(secs));
    }
    config
}

fn main() {
    let result = (|| -> Result<(), Box<dyn Error>> {
        let mut args = std::env::args();
        let program = args.next().unwrap_or_else(|| "proteus".to_owned());

        let options = match parse_options(args) {
            Ok(options) => options,
            Err(()) => {
                print_usage(&program);
                std::process::exit(2);
            }
        };

        if options.print_schema {
            let schema = proteus::protocol::protocol_schema();
            println!("{}", serde_json::to_string_pretty(&schema)?);
            return Ok(());
        }

        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("proteus=info")),
            )
            .init();

        let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
        let config = service_config(&options);

        if let Some(path) = options.script {
            let source = std::fs::read_to_string(&path)?;
            let service = {
                let _guard = runtime.enter();
                GraphService::spawn(Box::new(DemoHost::new()), config)?
            };
            let runner = ScriptRunner::new(service, runtime.handle().clone());
            match runner.run(&source) {
                Ok(value) if value.is_unit() => {}
                Ok(value) => println!("{value}"),
                Err(err) => {
                    eprintln!("{program}: script error: {err}");
                    std::process::exit(1);
                }
            }
            return Ok(());
        }

        let port = options.port.unwrap_or(net::DEFAULT_PORT);
        runtime.block_on(async move {
            let service = GraphService::spawn(Box::new(DemoHost::new()), config)?;
            let listener = tokio::net::TcpListener::bind(("127.0.0.1", port)).await?;
            net::serve(listener, service, NetConfig::default()).await?;
            Ok::<(), Box<dyn Error>>(())
        })?;

        Ok(())
    })();

    if let Err(err) = result {
        eprintln!("proteus: {err}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_options, CliOptions};

    fn parse(args: &[&str]) -> Result<CliOptions, ()> {
        parse_options(args.iter().map(|arg| (*arg).to_owned()))
    }

    #[test]
    fn parses_empty_args() {
        let options = parse(&[]).expect("parse options");
        assert_eq!(options, CliOptions::default());
    }

    #[test]
    fn parses_server_flags() {
        let options = parse(&[
            "--port",
            "4000",
            "--max-sessions",
            "4",
            "--idle-timeout",
            "60",
            "--watchdog",
            "15",
        ])
        .expect("parse options");
        assert_eq!(options.port, Some(4000));
        assert_eq!(options.max_sessions, Some(4));
        assert_eq!(options.idle_timeout_secs, Some(60));
        assert_eq!(options.watchdog_secs, Some(15));
    }

    #[test]
    fn parses_script_mode() {
        let options = parse(&["--script", "build.rhai"]).expect("parse options");
        assert_eq!(options.script.as_deref(), Some("build.rhai"));
    }

    #[test]
    fn rejects_script_mode_with_a_port() {
        parse(&["--script", "build.rhai", "--port", "4000"]).unwrap_err();
    }

    #[test]
    fn rejects_schema_mode_with_server_flags() {
        parse(&["--print-protocol-schema", "--port", "4000"]).unwrap_err();
    }

    #[test]
    fn rejects_zero_session_cap() {
        parse(&["--max-sessions", "0"]).unwrap_err();
    }

    #[test]
    fn rejects_unknown_and_duplicate_flags() {
        parse(&["--nope"]).unwrap_err();
        parse(&["--port", "1", "--port", "2"]).unwrap_err();
        parse(&["--port"]).unwrap_err();
        parse(&["--port", "not-a-port"]).unwrap_err();
    }
}
