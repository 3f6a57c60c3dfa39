use predicates::prelude::*;
use std::fs;


use test_utils::{assertions, TestEnv};

#[test]
fn test_help_lists_commands() {
    let env = TestEnv::new();

    env.cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("sync"))
        .stdout(predicate::str::contains("locate"))
        .stdout(predicate::str::contains("doctor"));
}

#[test]
fn test_completions_bash() {
    let env = TestEnv::new();

    env.cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("hytale-sources"));
}

#[test]
fn test_config_set_and_show() {
    let env = TestEnv::new();

    env.cmd()
        .args(["config", "set", "install.patchline", "pre-release"])
        .assert()
        .success()
        .stdout(predicate::str::contains("✓ install.patchline = \"pre-release\""))
        .stdout(predicate::str::contains("Configuration saved"));

    assertions::file_contains(&env.config_file(), "patchline = \"pre-release\"");

    env.cmd()
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("pre-release"))
        .stdout(predicate::str::contains("dependency.version"));
}

#[test]
fn test_config_set_clears_optional_path() {
    let env = TestEnv::new();

    env.cmd()
        .args(["config", "set", "install.server_jar", "/opt/HytaleServer.jar"])
        .assert()
        .success();
    assertions::file_contains(&env.config_file(), "/opt/HytaleServer.jar");

    env.cmd()
        .args(["config", "set", "install.server_jar", ""])
        .assert()
        .success()
        .stdout(predicate::str::contains("<cleared>"));

    let content = fs::read_to_string(env.config_file()).unwrap();
    assert!(!content.contains("HytaleServer.jar"));
}

#[test]
fn test_config_set_unknown_key_fails() {
    let env = TestEnv::new();

    env.cmd()
        .args(["config", "set", "registry.url", "https://example.com"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("Unknown key: registry.url"))
        .stderr(predicate::str::contains("Invalid configuration key"));
}

#[test]
fn test_config_set_invalid_mode_fails() {
    let env = TestEnv::new();

    env.cmd()
        .args(["config", "set", "dependency.mode", "flatdir"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown mode 'flatdir'"));
}

#[test]
fn test_cache_path() {
    let env = TestEnv::new();
    env.write_config("");

    env.cmd()
        .args(["cache", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains(env.cache_dir.display().to_string()));
}

#[test]
fn test_cache_clean_dry_run_then_clean() {
    let env = TestEnv::new();
    env.write_config("");
    fs::create_dir_all(&env.cache_dir).unwrap();
    fs::write(env.cache_dir.join("HytaleServer.jar"), b"jar").unwrap();
    fs::write(env.cache_dir.join("HytaleServer-sources.jar"), b"sources").unwrap();
    fs::write(env.cache_dir.join("vineflower.jar"), b"tool").unwrap();

    env.cmd()
        .args(["cache", "clean", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[DRY RUN] Would remove"));
    assertions::file_exists(&env.cache_dir.join("HytaleServer.jar"));

    env.cmd()
        .args(["cache", "clean"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed 2 entries"));

    assertions::not_exists(&env.cache_dir.join("HytaleServer.jar"));
    assertions::not_exists(&env.cache_dir.join("HytaleServer-sources.jar"));
    assertions::file_exists(&env.cache_dir.join("vineflower.jar"));
}

#[test]
fn test_cache_info_empty() {
    let env = TestEnv::new();
    env.write_config("");

    env.cmd()
        .args(["cache", "info"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Files:       0"));
}

#[test]
fn test_locate_configured_home() {
    let env = TestEnv::new();
    let home = env.fake_install("release", b"jar");
    env.write_config(&format!(
        "[install]\nhytale_home = {:?}\n",
        home.display().to_string()
    ));

    env.cmd()
        .arg("locate")
        .assert()
        .success()
        .stdout(predicate::str::contains("package"))
        .stdout(predicate::str::contains("✓"))
        .stdout(predicate::str::contains("HytaleServer.jar"));
}

#[test]
fn test_locate_reports_missing_files() {
    let env = TestEnv::new();
    let home = env.fake_install("release", b"jar");
    env.write_config(&format!(
        "[install]\nhytale_home = {:?}\n",
        home.display().to_string()
    ));

    env.cmd()
        .args(["locate", "--patchline", "pre-release"])
        .assert()
        .success()
        .stdout(predicate::str::contains("(missing)"));
}

#[test]
fn test_locate_missing_home_fails() {
    let env = TestEnv::new();
    let absent = env.path().join("no-such-Hytale");
    env.write_config(&format!(
        "[install]\nhytale_home = {:?}\n",
        absent.display().to_string()
    ));

    env.cmd()
        .arg("locate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Could not find Hytale installation"));
}

#[test]
fn test_sync_local_lists_missing_files() {
    let env = TestEnv::new();
    let home = env.fake_install("release", b"jar");
    let assets = home.join("install/release/package/game/latest/Assets.zip");
    fs::remove_file(&assets).unwrap();
    env.write_config(&format!(
        "[install]\nhytale_home = {:?}\n",
        home.display().to_string()
    ));

    env.cmd()
        .args(["sync", "--local"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Missing local Hytale installation files"))
        .stderr(predicate::str::contains(assets.display().to_string()));

    assertions::not_exists(&env.cache_dir.join("HytaleServer.jar"));
}

#[test]
fn test_sync_rejects_empty_version() {
    let env = TestEnv::new();
    env.write_config("");

    env.cmd()
        .args(["sync", "--version", " "])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid version selector"));
}

#[cfg(unix)]
#[test]
fn test_sync_local_decompiles_once() {
    let env = TestEnv::new();
    let home = env.fake_install("release", b"server v1");
    let java = env.fake_java();

    let mut server = mockito::Server::new();
    let tool = server
        .mock("GET", "/vineflower.jar")
        .with_status(200)
        .with_body("tool")
        .expect(1)
        .create();

    env.write_config(&format!(
        "[install]\nhytale_home = {:?}\n\n[dependency]\nmode = \"local\"\nversion = \"1.0.0\"\n\n\
         [decompiler]\nurl = \"{}/vineflower.jar\"\njava_path = {:?}\n",
        home.display().to_string(),
        server.url(),
        java.display().to_string()
    ));

    env.cmd()
        .arg("sync")
        .assert()
        .success()
        .stdout(predicate::str::contains("✓ Resolved com.hypixel.hytale:Server:1.0.0"))
        .stdout(predicate::str::contains("✓ Decompiled sources"));

    let published = TestEnv::published_dir(&env.cache_dir.join("repository"), "1.0.0");
    assertions::file_bytes(&published.join("Server-1.0.0.jar"), b"server v1");
    assertions::file_bytes(&published.join("Server-1.0.0-sources.jar"), b"server v1");
    assertions::file_contains(
        &published.join("Server-1.0.0.pom"),
        "<artifactId>Server</artifactId>",
    );

    // Unchanged jar: nothing is downloaded or decompiled again
    let output = env
        .cmd()
        .args(["sync", "--json"])
        .output()
        .expect("Failed to run sync");
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["refreshed"], false);
    assert_eq!(report["decompiled"], false);
    assert_eq!(report["coordinates"]["version"], "1.0.0");

    tool.assert();
}

#[cfg(unix)]
#[test]
fn test_sync_maven_publishes_retrieved_pom() {
    let env = TestEnv::new();
    let java = env.fake_java();

    let mut server = mockito::Server::new();
    let _metadata = server
        .mock(
            "GET",
            "/release/com/hypixel/hytale/Server/maven-metadata.xml",
        )
        .with_status(200)
        .with_body(
            "<metadata><versioning><release>2026.01.20</release>\
             <versions><version>2026.01.20</version></versions></versioning></metadata>",
        )
        .create();
    let _jar = server
        .mock(
            "GET",
            "/release/com/hypixel/hytale/Server/2026.01.20/Server-2026.01.20.jar",
        )
        .with_status(200)
        .with_body("remote server")
        .create();
    let _pom = server
        .mock(
            "GET",
            "/release/com/hypixel/hytale/Server/2026.01.20/Server-2026.01.20.pom",
        )
        .with_status(200)
        .with_body("<project>upstream</project>")
        .create();
    let _tool = server
        .mock("GET", "/vineflower.jar")
        .with_status(200)
        .with_body("tool")
        .create();

    env.write_config(&format!(
        "[dependency]\nmaven_url = \"{url}\"\n\n\
         [decompiler]\nurl = \"{url}/vineflower.jar\"\njava_path = {:?}\n",
        java.display().to_string(),
        url = server.url()
    ));

    let repo = env.path().join("maven-local");
    env.cmd()
        .args(["sync", "--repo-dir"])
        .arg(&repo)
        .assert()
        .success()
        .stdout(predicate::str::contains("Server:2026.01.20"));

    let published = TestEnv::published_dir(&repo, "2026.01.20");
    assertions::file_bytes(&published.join("Server-2026.01.20.jar"), b"remote server");
    assertions::file_bytes(
        &published.join("Server-2026.01.20-sources.jar"),
        b"remote server",
    );
    assertions::file_bytes(
        &published.join("Server-2026.01.20.pom"),
        b"<project>upstream</project>",
    );
}

#[cfg(unix)]
#[test]
fn test_sync_with_relative_paths() {
    let env = TestEnv::new();
    let home = env.fake_install("release", b"server v1");
    env.fake_java();

    // Pre-seeded tool, so nothing is downloaded
    let cache = env.path().join("rel-cache");
    fs::create_dir_all(&cache).unwrap();
    fs::write(cache.join("vineflower.jar"), b"tool").unwrap();

    env.write_config(&format!(
        "[install]\nhytale_home = {:?}\n\n[dependency]\nmode = \"local\"\nversion = \"1.0.0\"\n\n\
         [decompiler]\njava_path = \"fake-java\"\n",
        home.display().to_string()
    ));

    env.cmd()
        .current_dir(env.path())
        .args(["sync", "--cache-dir", "rel-cache"])
        .assert()
        .success()
        .stdout(predicate::str::contains("✓ Decompiled sources"));

    let published = TestEnv::published_dir(&cache.join("repository"), "1.0.0");
    assertions::file_bytes(&published.join("Server-1.0.0-sources.jar"), b"server v1");
}

#[test]
fn test_doctor_reports_summary() {
    let env = TestEnv::new();
    let home = env.fake_install("release", b"jar");
    env.write_config(&format!(
        "[install]\nhytale_home = {:?}\n",
        home.display().to_string()
    ));

    env.cmd()
        .arg("doctor")
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration - Valid configuration loaded"))
        .stdout(predicate::str::contains("Installation - Found release install"))
        .stdout(predicate::str::contains("Decompiler - Not downloaded yet"))
        .stdout(predicate::str::contains("Summary:"));
}
