use std::path::Path;

use super::*;
use crate::domain::types::CompileFlavor;

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.server.port = Some(4000);
    raw.logging.level = Some("info".to_string());

    let overrides = ServeOverrides {
        server_port: Some(4321),
        log_level: Some("debug".to_string()),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.server.addr.port(), 4321);
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
}

#[test]
fn defaults_are_applied() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.server.addr.to_string(), "127.0.0.1:8080");
    assert_eq!(settings.storage.bucket, "documents");
    assert_eq!(
        settings.storage.max_request_bytes.get(),
        DEFAULT_STORAGE_REQUEST_LIMIT_BYTES
    );
    assert_eq!(settings.compile.latex_program, Path::new("pdflatex"));
    assert_eq!(settings.compile.typst_program, Path::new("typst"));
    assert_eq!(settings.compile.timeout, Duration::from_secs(60));
    assert_eq!(
        settings.compile.max_request_bytes.get(),
        DEFAULT_COMPILE_REQUEST_LIMIT_BYTES
    );
    assert!(settings.compile.workspace_root.is_none());
    assert_eq!(settings.auth.token_ttl, time::Duration::hours(24));
    assert!(settings.auth.jwt_secret.is_none());
    assert!(matches!(settings.logging.format, LogFormat::Compact));
}

#[test]
fn compile_overrides_apply_to_compile_command() {
    let mut raw = RawSettings::default();
    raw.compile.timeout_seconds = Some(120);

    let overrides = CompileOverrides {
        latex_program: Some(PathBuf::from("/opt/texlive/bin/pdflatex")),
        timeout_seconds: Some(5),
        max_concurrent: Some(3),
        ..Default::default()
    };
    raw.apply_compile_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(
        settings.compile.latex_program,
        Path::new("/opt/texlive/bin/pdflatex")
    );
    assert_eq!(settings.compile.timeout, Duration::from_secs(5));
    assert_eq!(settings.compile.max_concurrent.get(), 3);
}

#[test]
fn zero_values_are_rejected() {
    let mut raw = RawSettings::default();
    raw.compile.timeout_seconds = Some(0);
    match Settings::from_raw(raw) {
        Err(LoadError::Invalid { key, .. }) => assert_eq!(key, "compile.timeout_seconds"),
        other => panic!("unexpected result: {other:?}"),
    }

    let mut raw = RawSettings::default();
    raw.compile.max_concurrent = Some(0);
    match Settings::from_raw(raw) {
        Err(LoadError::Invalid { key, .. }) => assert_eq!(key, "compile.max_concurrent"),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn short_jwt_secret_is_rejected() {
    let mut raw = RawSettings::default();
    raw.auth.jwt_secret = Some("too-short".to_string());
    match Settings::from_raw(raw) {
        Err(LoadError::Invalid { key, .. }) => assert_eq!(key, "auth.jwt_secret"),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn bucket_must_be_single_segment() {
    let mut raw = RawSettings::default();
    raw.storage.bucket = Some("../escape".to_string());
    assert!(Settings::from_raw(raw).is_err());
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    let overrides = ServeOverrides {
        log_json: Some(true),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn default_to_serve_command() {
    let args = CliArgs::parse_from(["notepress"]);
    let command = args
        .command
        .unwrap_or(Command::Serve(Box::<ServeArgs>::default()));
    assert!(matches!(command, Command::Serve(_)));
}

#[test]
fn parse_compile_arguments() {
    let args = CliArgs::parse_from([
        "notepress",
        "compile",
        "--compile-typst-program",
        "/usr/local/bin/typst",
        "notes/report.typ",
    ]);

    match args.command.expect("compile command") {
        Command::Compile(compile) => {
            assert_eq!(compile.resolve_flavor(), Some(CompileFlavor::Typst));
            assert_eq!(compile.output_path(), Path::new("notes/report.pdf"));
            assert_eq!(
                compile.overrides.typst_program.as_deref(),
                Some(Path::new("/usr/local/bin/typst"))
            );
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn explicit_flavor_wins_over_extension() {
    let args = CliArgs::parse_from([
        "notepress",
        "compile",
        "--flavor",
        "latex",
        "--output",
        "/tmp/out.pdf",
        "paper.txt",
    ]);

    match args.command.expect("compile command") {
        Command::Compile(compile) => {
            assert_eq!(compile.resolve_flavor(), Some(CompileFlavor::Latex));
            assert_eq!(compile.output_path(), Path::new("/tmp/out.pdf"));
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn parse_migrate_arguments() {
    let args = CliArgs::parse_from([
        "notepress",
        "migrate",
        "--database-url",
        "postgres://example",
    ]);

    match args.command.expect("migrate command") {
        Command::Migrate(migrate) => {
            assert_eq!(
                migrate.database.database_url.as_deref(),
                Some("postgres://example")
            );
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn parse_serve_overrides() {
    let args = CliArgs::parse_from([
        "notepress",
        "serve",
        "--server-host",
        "0.0.0.0",
        "--database-url",
        "postgres://override",
        "--compile-timeout-seconds",
        "15",
    ]);

    match args.command.expect("serve command") {
        Command::Serve(serve) => {
            assert_eq!(serve.overrides.server_host.as_deref(), Some("0.0.0.0"));
            assert_eq!(
                serve.overrides.database_url.as_deref(),
                Some("postgres://override")
            );
            assert_eq!(serve.overrides.compile.timeout_seconds, Some(15));
        }
        _ => panic!("wrong command parsed"),
    }
}
