use crate::cli::DevArgs;
use crate::config::*;
use crate::error::CliError;
use hotdev::{ConfigError, HotdevError, IndexFile};
use serial_test::serial;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn write_config(dir: &TempDir, json: &str) -> PathBuf {
    let path = dir.path().join(CONFIG_FILE);
    fs::write(&path, json).unwrap();
    path
}

fn clear_env() {
    unsafe {
        std::env::remove_var("HOTDEV_PORT");
        std::env::remove_var("HOTDEV_SOURCE");
        std::env::remove_var("HOTDEV_CWD");
    }
}

#[test]
#[serial]
fn test_load_config_file() {
    clear_env();
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"{
            "source": "public",
            "publicPath": "/assets/",
            "port": 4100,
            "hotdev": { "index": false, "serverSideRender": true }
        }"#,
    );

    let config = CliConfig::load_with(Some(&path), None, None).unwrap();
    assert_eq!(config.source, Some(PathBuf::from("public")));
    assert_eq!(config.output_path, PathBuf::from("/dist"));
    assert_eq!(config.public_path.as_deref(), Some("/assets/"));
    assert_eq!(config.port, 4100);

    let session = config.session_config().unwrap();
    assert_eq!(session.index, IndexFile::Disabled);
    assert!(session.server_side_render);
    assert!(config.validate().is_ok());
}

#[test]
#[serial]
fn test_default_file_found_in_cwd() {
    clear_env();
    let dir = TempDir::new().unwrap();
    write_config(&dir, r#"{ "source": "src", "hotdev": {} }"#);

    let config = CliConfig::load_with(None, None, Some(dir.path())).unwrap();
    assert_eq!(config.source, Some(PathBuf::from("src")));
    assert_eq!(config.cwd.as_deref(), Some(dir.path()));

    let sources = config.mirror_sources();
    assert_eq!(sources.len(), 1);
    assert_eq!(sources[0].source, dir.path().join("src"));
    assert_eq!(sources[0].target.output_path, PathBuf::from("/dist"));
}

#[test]
#[serial]
fn test_missing_explicit_file() {
    clear_env();
    let err = CliConfig::load_with(Some(std::path::Path::new("/no/such/hotdev.json")), None, None)
        .unwrap_err();
    assert!(matches!(err, CliError::FileNotFound(_)));
}

#[test]
#[serial]
fn test_priority_flags_over_env_over_file() {
    clear_env();
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, r#"{ "source": "public", "port": 4100, "hotdev": {} }"#);

    unsafe {
        std::env::set_var("HOTDEV_PORT", "4200");
        std::env::set_var("HOTDEV_SOURCE", "www");
    }
    let from_env = CliConfig::load_with(Some(&path), None, None).unwrap();
    assert_eq!(from_env.port, 4200);
    assert_eq!(from_env.source, Some(PathBuf::from("www")));

    let from_flag = CliConfig::load_with(Some(&path), Some(4300), None).unwrap();
    assert_eq!(from_flag.port, 4300);
    clear_env();
}

#[test]
#[serial]
fn test_lazy_flag_applies_to_session() {
    clear_env();
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, r#"{ "source": "public", "hotdev": {} }"#);

    let args = DevArgs {
        config: Some(path),
        lazy: true,
        ..DevArgs::default()
    };
    let config = CliConfig::load(&args).unwrap();
    assert!(config.session_config().unwrap().lazy);
}

#[test]
#[serial]
fn test_unknown_field_rejected() {
    clear_env();
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, r#"{ "source": "public", "sauce": "x", "hotdev": {} }"#);

    let err = CliConfig::load_with(Some(&path), None, None).unwrap_err();
    assert!(matches!(
        err,
        CliError::Config(ConfigError::InvalidValue { ref field, .. }) if field == "configuration"
    ));
}

#[test]
fn test_missing_hotdev_section() {
    let config = CliConfig {
        source: Some(PathBuf::from("public")),
        ..CliConfig::default()
    };
    let err = config.validate().unwrap_err();
    assert!(matches!(
        err,
        CliError::Config(ConfigError::MissingSection { ref section, .. }) if section == "hotdev"
    ));
}

#[test]
fn test_missing_source() {
    let config = CliConfig {
        hotdev: Some(Default::default()),
        ..CliConfig::default()
    };
    let err = config.validate().unwrap_err();
    assert!(matches!(err, CliError::Config(ConfigError::MissingField { .. })));
}

#[test]
fn test_relative_output_path_rejected() {
    let config = CliConfig {
        source: Some(PathBuf::from("public")),
        output_path: PathBuf::from("dist"),
        hotdev: Some(Default::default()),
        ..CliConfig::default()
    };
    assert!(matches!(
        config.validate().unwrap_err(),
        CliError::Config(ConfigError::InvalidValue { .. })
    ));
}

#[test]
fn test_invalid_session_section() {
    let config = CliConfig {
        source: Some(PathBuf::from("public")),
        hotdev: Some(hotdev::HotdevConfig {
            hmr_path: "events".to_string(),
            ..Default::default()
        }),
        ..CliConfig::default()
    };
    assert!(matches!(
        config.validate().unwrap_err(),
        CliError::Hotdev(HotdevError::Config(_))
    ));
}

#[test]
fn test_bundles() {
    let config = CliConfig {
        bundles: vec![
            BundleConfig {
                name: Some("client".to_string()),
                source: PathBuf::from("/srv/web"),
                output_path: PathBuf::from("/client"),
                public_path: Some("/static/".to_string()),
            },
            BundleConfig {
                name: Some("docs".to_string()),
                source: PathBuf::from("/srv/docs"),
                output_path: PathBuf::from("/docs"),
                public_path: Some("/docs/".to_string()),
            },
        ],
        hotdev: Some(Default::default()),
        ..CliConfig::default()
    };
    assert!(config.validate().is_ok());

    let sources = config.mirror_sources();
    assert_eq!(sources.len(), 2);
    assert_eq!(sources[0].source, PathBuf::from("/srv/web"));
    assert_eq!(sources[0].target.name.as_deref(), Some("client"));
    assert_eq!(sources[1].target.public_path.as_deref(), Some("/docs/"));

    let mut duplicate = config.clone();
    duplicate.bundles[1].output_path = PathBuf::from("/client");
    assert!(duplicate.validate().is_err());

    let mut both = config;
    both.source = Some(PathBuf::from("public"));
    assert!(both.validate().is_err());
}

#[test]
fn test_serialization_skips_unset() {
    let json = serde_json::to_value(CliConfig::default()).unwrap();
    assert_eq!(json["outputPath"], "/dist");
    assert_eq!(json["port"], 3000);
    assert!(json.get("source").is_none());
    assert!(json.get("hotdev").is_none());
    assert!(json.get("bundles").is_none());
}
