//! 属性构建器的分层合并、环境选择与绑定测试

use crate::{PlaceholderResolver, PropertyBuilder, StaticSource};
use config_abstractions::{
    priority, PropertyResolver, PropertyResolverExt, PropertySource, PROFILES_ACTIVE_KEY,
};
use infrastructure_common::{ConfigError, PropertyBlock};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
struct ServerProperties {
    host: String,
    port: u16,
    debug: bool,
    tags: Vec<String>,
}

impl Default for ServerProperties {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            debug: false,
            tags: Vec::new(),
        }
    }
}

impl PropertyBlock for ServerProperties {
    fn prefix() -> &'static str {
        "server"
    }
}

fn write(dir: &Path, name: &str, content: &str) {
    fs::write(dir.join(name), content).unwrap();
}

/// 不读取进程环境变量的构建器
fn builder(dir: &Path) -> PropertyBuilder {
    PropertyBuilder::new(dir).with_placeholder_resolver(PlaceholderResolver::with_env_lookup(|_| None))
}

#[test]
fn test_base_file_only() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "application.yml", "app:\n  name: demo\nserver:\n  port: 9000\n");

    let properties = builder(dir.path());
    properties.build(None).unwrap();

    assert!(properties.is_built());
    assert_eq!(properties.get_property("app.name"), Some(json!("demo")));
    assert_eq!(properties.active_profile(), None);
    assert_eq!(properties.load::<ServerProperties>().unwrap().port, 9000);
}

#[test]
fn test_active_profile_overrides_base() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "application.yml", "app:\n  name: base\n  profiles:\n    active: dev\n");
    write(dir.path(), "application-dev.yml", "app:\n  name: dev\n");
    write(dir.path(), "application-prod.yml", "app:\n  name: prod\n");

    let properties = builder(dir.path());
    properties.build(None).unwrap();

    assert_eq!(properties.active_profile().as_deref(), Some("dev"));
    assert_eq!(properties.get_property("app.name"), Some(json!("dev")));
}

#[test]
fn test_explicit_profile_wins_and_is_written_back() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "application.yml", "app:\n  name: base\n  profiles:\n    active: dev\n");
    write(dir.path(), "application-dev.yml", "app:\n  name: dev\n");
    write(dir.path(), "application-prod.yml", "app:\n  name: prod\n");

    let properties = builder(dir.path());
    properties.build(Some("prod")).unwrap();

    assert_eq!(properties.get_property("app.name"), Some(json!("prod")));
    assert_eq!(properties.get_property(PROFILES_ACTIVE_KEY), Some(json!("prod")));
}

#[test]
fn test_environment_variable_selects_profile() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "application.yml", "app:\n  name: base\n");
    write(dir.path(), "application-staging.yml", "app:\n  name: staging\n");

    let properties = PropertyBuilder::new(dir.path()).with_placeholder_resolver(
        PlaceholderResolver::with_env_lookup(|name| {
            (name == "APP_PROFILES_ACTIVE").then(|| "staging".to_string())
        }),
    );
    properties.build(None).unwrap();

    assert_eq!(properties.active_profile().as_deref(), Some("staging"));
    assert_eq!(properties.get_property("app.name"), Some(json!("staging")));
}

#[test]
fn test_included_profiles_merge_in_order() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "application.yml",
        "app:\n  profiles:\n    active: dev\n    include: [mysql, db, unused]\nvalue: base\n",
    );
    write(dir.path(), "application-db.yml", "value: db\ndb: true\n");
    write(dir.path(), "application-mysql.yml", "value: mysql\nmysql: true\n");
    write(dir.path(), "application-cache.yml", "cache: true\n");
    write(dir.path(), "application-dev.yml", "dev: true\n");

    let properties = builder(dir.path());
    properties.build(None).unwrap();

    // 名称短的先合并，后合并者覆盖
    assert_eq!(properties.get_property("value"), Some(json!("mysql")));
    assert_eq!(properties.get_property("db"), Some(json!(true)));
    assert_eq!(properties.get_property("dev"), Some(json!(true)));
    assert_eq!(properties.get_property("cache"), None);
}

#[test]
fn test_no_include_list_means_no_overlays() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "application.yml", "value: base\n");
    write(dir.path(), "application-db.yml", "value: db\n");

    let properties = builder(dir.path());
    properties.build(None).unwrap();

    assert_eq!(properties.get_property("value"), Some(json!("base")));
}

#[test]
fn test_active_profile_beats_included() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "application.yml",
        "app:\n  profiles:\n    include: db\n",
    );
    write(dir.path(), "application-db.yml", "value: db\n");
    write(dir.path(), "application-local.yml", "value: local\n");

    let properties = builder(dir.path());
    properties.build(Some("local")).unwrap();

    assert_eq!(properties.get_property("value"), Some(json!("local")));
}

#[test]
fn test_command_line_overrides_files() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "application.yml", "server:\n  port: 9000\n  tags: [a]\n");
    write(dir.path(), "application-dev.yml", "server:\n  port: 9100\n");

    let properties = builder(dir.path()).with_args([
        "--server.port=9200",
        "--server.tags=x,y",
        "--server.debug",
    ]);
    properties.build(Some("dev")).unwrap();

    let server = properties.load::<ServerProperties>().unwrap();
    assert_eq!(server.port, 9200);
    assert_eq!(server.tags, vec!["x".to_string(), "y".to_string()]);
    assert!(server.debug);
}

#[test]
fn test_override_file_between_profile_and_command_line() {
    let dir = TempDir::new().unwrap();
    let external = TempDir::new().unwrap();
    write(dir.path(), "application.yml", "a: base\nb: base\n");
    write(external.path(), "override.toml", "a = \"external\"\nb = \"external\"\n");

    let properties = builder(dir.path())
        .with_override_file(external.path().join("override.toml"))
        .with_override_file(external.path().join("missing.yml"))
        .with_args(["--b=cli"]);
    properties.build(None).unwrap();

    assert_eq!(properties.get_property("a"), Some(json!("external")));
    assert_eq!(properties.get_property("b"), Some(json!("cli")));
}

#[test]
fn test_malformed_file_is_skipped() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "application.yml", "value: base\n");
    write(dir.path(), "application.json", "{ broken");

    let properties = builder(dir.path());
    properties.build(None).unwrap();

    assert_eq!(properties.get_property("value"), Some(json!("base")));
}

#[test]
fn test_nested_files_merge_after_top_level() {
    let dir = TempDir::new().unwrap();
    let nested = dir.path().join("prod");
    fs::create_dir_all(&nested).unwrap();
    write(dir.path(), "application.yml", "server:\n  host: base\n  port: 9000\n");
    write(dir.path(), "application-prod.yml", "server:\n  port: 9100\n");
    write(&nested, "application-prod.toml", "[server]\nport = 9200\ndebug = \"yes\"\n");

    let properties = builder(dir.path());
    properties.build(Some("prod")).unwrap();

    let server = properties.load::<ServerProperties>().unwrap();
    assert_eq!(server.host, "base");
    assert_eq!(server.port, 9200);
    assert!(server.debug);
}

#[test]
fn test_failing_source_is_skipped() {
    #[derive(Debug)]
    struct Unreachable;

    impl PropertySource for Unreachable {
        fn load(&self) -> Result<serde_json::Value, ConfigError> {
            Err(ConfigError::DiscoveryError {
                message: "remote store unavailable".to_string(),
            })
        }

        fn name(&self) -> &str {
            "remote"
        }

        fn priority(&self) -> i32 {
            priority::EXTERNAL
        }
    }

    let dir = TempDir::new().unwrap();
    write(dir.path(), "application.yml", "value: base\n");

    let properties = builder(dir.path()).with_source(Box::new(Unreachable));
    properties.build(None).unwrap();

    assert_eq!(properties.get_property("value"), Some(json!("base")));
}

#[test]
fn test_missing_config_dir_builds_defaults() {
    let properties = builder(Path::new("/no/such/dir"));
    properties.set_default_property("server.port", json!(7000));
    properties.build(None).unwrap();

    assert_eq!(properties.load::<ServerProperties>().unwrap().port, 7000);
}

#[test]
fn test_defaults_and_runtime_precedence() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "application.yml", "a: file\nb: file\n");

    let properties = builder(dir.path());
    properties.set_default_property("a", json!("default"));
    properties.set_default_property("c", json!("default"));
    properties.set_property("b", json!("runtime"));
    properties.build(None).unwrap();

    assert_eq!(properties.get_property("a"), Some(json!("file")));
    assert_eq!(properties.get_property("b"), Some(json!("runtime")));
    assert_eq!(properties.get_property("c"), Some(json!("default")));

    properties.set_property("a", json!("later"));
    properties.set_default_property("a", json!("ignored"));
    assert_eq!(properties.get_property("a"), Some(json!("later")));
}

#[test]
fn test_custom_source_priority() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "application.yml", "a: base\n");

    let properties = builder(dir.path())
        .with_source(Box::new(StaticSource::new("low", json!({ "a": "low", "b": "low" }), priority::DEFAULTS)))
        .with_source(Box::new(StaticSource::new("high", json!({ "c": "high" }), priority::EXTERNAL)));
    properties.build(None).unwrap();

    assert_eq!(properties.get_property("a"), Some(json!("base")));
    assert_eq!(properties.get_property("b"), Some(json!("low")));
    assert_eq!(properties.get_property("c"), Some(json!("high")));
}

#[test]
fn test_placeholders_resolved_after_build() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "application.yml",
        "app:\n  name: demo\n  title: \"${app.name} v${app.version:1}\"\nserver:\n  port: \"${app.port}\"\n",
    );

    let properties = builder(dir.path()).with_args(["--app.port=9300"]);
    properties.build(None).unwrap();

    assert_eq!(properties.get_property("app.title"), Some(json!("demo v1")));
    assert_eq!(properties.replace("${app.name}!"), json!("demo!"));
    assert_eq!(properties.load::<ServerProperties>().unwrap().port, 9300);
}

#[test]
fn test_lazy_placeholder_after_runtime_set() {
    let properties = builder(Path::new("/no/such/dir"));
    properties.build(None).unwrap();
    properties.set_property("greeting", json!("hello ${user.name:guest}"));

    assert_eq!(properties.get_property("greeting"), Some(json!("hello guest")));
    properties.set_property("user.name", json!("ada"));
    assert_eq!(properties.get_property("greeting"), Some(json!("hello ada")));
}

#[test]
fn test_bind_decode_failure_and_fallback() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "application.yml", "server:\n  port: not-a-number\n  host: example\n");

    let properties = builder(dir.path());
    properties.build(None).unwrap();

    assert!(properties.bind::<ServerProperties>().is_err());
    assert_eq!(properties.bind_or_default::<ServerProperties>(), ServerProperties::default());
}

#[test]
fn test_keys_lists_leaves() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "application.toml", "[server]\nport = 1\nhost = \"h\"\n");

    let properties = builder(dir.path());
    properties.build(None).unwrap();

    let mut keys = properties.keys();
    keys.sort();
    assert_eq!(keys, vec!["server.host", "server.port"]);
}
