// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Drawbridge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Drawbridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Drawbridge CLI entrypoint.
//!
//! Hosts a surface over stdio: commands are written to stdout, surface messages are read from
//! stdin, one JSON text per line. Logs go to stderr.

use std::error::Error;
use std::path::Path;
use std::sync::Arc;

use drawbridge::bridge::Bridge;
use drawbridge::config::BridgeConfig;
use drawbridge::download::{DownloadEmitter, DownloadFolder};
use drawbridge::host::{ExportJob, HostJob};
use drawbridge::protocol::UserFormat;

fn print_usage(program: &str) {
    eprintln!(
        "Usage:\n  {program} [--config <file>] [--out-dir <dir>] [--name <file>] [--export drawio|png|svg] [--verbose] <diagram-file>\n\nReads surface messages from stdin as `{{\"origin\": ..., \"data\": ...}}` lines and writes commands to stdout.\nThe diagram is shown once the surface sends its handshake.\n\n--export downloads the shown diagram into --out-dir (default: current directory) as <name>.<ext>.\n--name defaults to the diagram file stem.\n--verbose enables debug logging unless RUST_LOG is set."
    );
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct CliOptions {
    config: Option<String>,
    out_dir: Option<String>,
    name: Option<String>,
    export: Option<UserFormat>,
    verbose: bool,
    diagram: String,
}

fn parse_options(mut args: impl Iterator<Item = String>) -> Result<CliOptions, ()> {
    let mut options = CliOptions::default();
    let mut diagram = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                if options.config.is_some() {
                    return Err(());
                }
                options.config = Some(args.next().ok_or(())?);
            }
            "--out-dir" => {
                if options.out_dir.is_some() {
                    return Err(());
                }
                options.out_dir = Some(args.next().ok_or(())?);
            }
            "--name" => {
                if options.name.is_some() {
                    return Err(());
                }
                options.name = Some(args.next().ok_or(())?);
            }
            "--export" => {
                if options.export.is_some() {
                    return Err(());
                }
                let raw = args.next().ok_or(())?;
                options.export = Some(raw.parse().map_err(|_| ())?);
            }
            "--verbose" | "-v" => {
                if options.verbose {
                    return Err(());
                }
                options.verbose = true;
            }
            _ if arg.starts_with('-') => return Err(()),
            _ => {
                if diagram.is_some() {
                    return Err(());
                }
                diagram = Some(arg);
            }
        }
    }

    options.diagram = diagram.ok_or(())?;
    Ok(options)
}

fn main() {
    let result = (|| -> Result<(), Box<dyn Error>> {
        let mut args = std::env::args();
        let program = args.next().unwrap_or_else(|| "drawbridge".to_owned());

        let options = match parse_options(args) {
            Ok(options) => options,
            Err(()) => {
                print_usage(&program);
                std::process::exit(2);
            }
        };

        drawbridge::logging::init(options.verbose);

        let config = match options.config.as_deref() {
            Some(path) => BridgeConfig::load(path)?,
            None => BridgeConfig::default(),
        };
        let diagram = std::fs::read_to_string(&options.diagram)
            .map_err(|err| format!("cannot read {}: {err}", options.diagram))?;

        let export = options.export.map(|format| {
            let name = options.name.clone().unwrap_or_else(|| {
                Path::new(&options.diagram)
                    .file_stem()
                    .map(|stem| stem.to_string_lossy().into_owned())
                    .unwrap_or_default()
            });
            let out_dir = options.out_dir.clone().unwrap_or_else(|| ".".to_owned());
            let emitter = DownloadEmitter::new(Arc::new(DownloadFolder::new(out_dir)), &config.download);
            ExportJob { format, name, emitter }
        });
        let wants_export = export.is_some();

        let bridge = Bridge::new(config);
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
        let report = runtime.block_on(drawbridge::host::run(
            bridge,
            tokio::io::stdin(),
            tokio::io::stdout(),
            HostJob { diagram, export },
        ));
        // A pending stdin read must not keep the process alive.
        runtime.shutdown_background();

        let report = report?;
        if wants_export && report.download.is_none() {
            return Err("export failed".into());
        }
        Ok(())
    })();

    if let Err(err) = result {
        eprintln!("drawbridge: {err}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_options, CliOptions};
    use drawbridge::protocol::UserFormat;

    fn parse(args: &[&str]) -> Result<CliOptions, ()> {
        parse_options(args.iter().map(|arg| (*arg).to_owned()))
    }

    #[test]
    fn requires_a_diagram_file() {
        assert!(parse(&[]).is_err());
        assert!(parse(&["--verbose"]).is_err());
    }

    #[test]
    fn parses_positional_diagram() {
        let options = parse(&["flow.drawio"]).expect("parse options");
        assert_eq!(
            options,
            CliOptions { diagram: "flow.drawio".to_owned(), ..CliOptions::default() }
        );
    }

    #[test]
    fn parses_all_flags_in_any_order() {
        let options = parse(&[
            "--export", "PNG", "flow.drawio", "--out-dir", "out", "--name", "chart", "--config",
            "bridge.toml", "-v",
        ])
        .expect("parse options");
        assert_eq!(options.export, Some(UserFormat::Png));
        assert_eq!(options.out_dir.as_deref(), Some("out"));
        assert_eq!(options.name.as_deref(), Some("chart"));
        assert_eq!(options.config.as_deref(), Some("bridge.toml"));
        assert!(options.verbose);
        assert_eq!(options.diagram, "flow.drawio");
    }

    #[test]
    fn rejects_unknown_export_format() {
        assert!(parse(&["--export", "pdf", "flow.drawio"]).is_err());
    }

    #[test]
    fn rejects_unknown_args() {
        assert!(parse(&["--nope", "flow.drawio"]).is_err());
    }

    #[test]
    fn rejects_duplicate_flags() {
        assert!(parse(&["--name", "a", "--name", "b", "flow.drawio"]).is_err());
        assert!(parse(&["-v", "--verbose", "flow.drawio"]).is_err());
    }

    #[test]
    fn rejects_multiple_diagram_files() {
        assert!(parse(&["a.drawio", "b.drawio"]).is_err());
    }

    #[test]
    fn rejects_missing_flag_value() {
        assert!(parse(&["flow.drawio", "--out-dir"]).is_err());
    }
}
