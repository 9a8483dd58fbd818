//! End-to-end packaging scenarios
//!
//! Each test runs the full pipeline against a temporary project with a
//! cooker that writes a fixed cooked tree, so no engine is required.

use modpak::Error;
use modpak::config::Config;
use modpak::modules::DEFAULT_BUILD_ID;
use modpak::pipeline::PipelineState;
use modpak_integration_tests::compare::{archived_build_ids, dir_contents, zip_contents};
use modpak_integration_tests::fixture::{FixtureCooker, ModProject, RecordingLauncher};

#[test]
fn test_package_project_plugin_to_archive() {
    let fixture = ModProject::new();
    let launcher = RecordingLauncher::default();

    let report = fixture
        .pipeline(Config::default(), &launcher)
        .run()
        .expect("packaging should succeed");

    assert_eq!(report.final_state, PipelineState::Cleaned);

    let archive = fixture.archive("Windows");
    assert!(archive.is_file(), "missing archive at {}", archive);
    assert_eq!(report.archives.len(), 1);
    assert_eq!(report.archives[0].path, archive);

    let names: Vec<String> = zip_contents(&archive).unwrap().into_keys().collect();
    assert_eq!(
        names,
        vec![
            "Binaries/Win64/UnrealGame.modules",
            "Binaries/Win64/UnrealServer.modules",
            "Content/Maps/Level.umap",
            "Foo.uplugin",
        ]
    );

    let ids = archived_build_ids(&archive).unwrap();
    assert_eq!(ids.len(), 2);
    assert!(ids.values().all(|id| id == DEFAULT_BUILD_ID));

    assert!(!fixture.stage_root("Windows").exists());
    assert!(launcher.launched().is_empty());
    assert!(!fixture.installed_plugin().exists());
}

#[test]
fn test_package_and_copy_to_game_dir() {
    let fixture = ModProject::new();
    let launcher = RecordingLauncher::default();
    let mut config = Config::default();
    config.deploy.install_dir = Some(fixture.game_dir());
    config.deploy.copy_to_install = true;

    let report = fixture
        .pipeline(config, &launcher)
        .run()
        .expect("packaging should succeed");

    let installed = fixture.installed_plugin();
    assert_eq!(report.deploy.installed, vec![installed.clone()]);
    assert!(installed.is_dir());

    let archived = zip_contents(&fixture.archive("Windows")).unwrap();
    let copied = dir_contents(&installed).unwrap();
    assert_eq!(archived, copied);

    assert!(!fixture.stage_root("Windows").exists());
    assert!(launcher.launched().is_empty());
}

#[test]
fn test_launch_without_executable_fails_after_archiving() {
    let fixture = ModProject::new();
    let launcher = RecordingLauncher::default();
    let mut config = Config::default();
    config.deploy.install_dir = Some(fixture.game_dir());
    config.deploy.launch = true;

    let err = fixture
        .pipeline(config, &launcher)
        .run()
        .expect_err("launch without an executable must fail");

    assert!(err.is_config(), "unexpected error: {err}");
    assert!(fixture.archive("Windows").is_file());
    assert!(launcher.launched().is_empty());
    assert!(!fixture.stage_root("Windows").exists());
}

#[test]
fn test_launch_with_executable() {
    let fixture = ModProject::new();
    std::fs::write(fixture.game_dir().join("FactoryGame.exe"), "").unwrap();
    std::fs::write(fixture.game_dir().join("CrashReporter.exe"), "").unwrap();
    let launcher = RecordingLauncher::default();
    let mut config = Config::default();
    config.deploy.install_dir = Some(fixture.game_dir());
    config.deploy.copy_to_install = true;
    config.deploy.launch = true;

    let report = fixture.pipeline(config, &launcher).run().unwrap();

    let expected = fixture.game_dir().join("FactoryGame.exe");
    assert_eq!(report.deploy.launched, Some(expected.clone()));
    assert_eq!(launcher.launched(), vec![expected]);
}

#[test]
fn test_copy_without_game_dir_fails_before_any_work() {
    let fixture = ModProject::new();
    let launcher = RecordingLauncher::default();
    let mut config = Config::default();
    config.deploy.copy_to_install = true;

    let err = fixture.pipeline(config, &launcher).run().unwrap_err();

    assert!(err.is_config());
    assert!(!fixture.project.directory.join("Saved").exists());
}

#[test]
fn test_repackaging_replaces_archive_and_install() {
    let fixture = ModProject::new();
    let launcher = RecordingLauncher::default();
    let mut config = Config::default();
    config.deploy.install_dir = Some(fixture.game_dir());
    config.deploy.copy_to_install = true;

    fixture.pipeline(config.clone(), &launcher).run().unwrap();
    let stale = fixture.installed_plugin().join("Stale.txt");
    std::fs::write(&stale, "left behind").unwrap();

    let mut cooker = FixtureCooker::new("FactoryGame", "Foo");
    cooker.asset = "second cook".to_string();
    modpak::pipeline::Pipeline::new(fixture.request(config))
        .with_cooker(cooker)
        .with_launcher(launcher.clone())
        .run()
        .unwrap();

    let archive_dir = fixture.archive("Windows");
    let entries: Vec<_> = std::fs::read_dir(archive_dir.parent().unwrap())
        .unwrap()
        .collect();
    assert_eq!(entries.len(), 1);

    let archived = zip_contents(&archive_dir).unwrap();
    assert_eq!(archived["Content/Maps/Level.umap"], b"second cook");
    assert!(!stale.exists());
}

#[test]
fn test_custom_build_id_and_server_contexts() {
    let fixture = ModProject::new();
    let launcher = RecordingLauncher::default();
    let mut config = Config::default();
    config.package.build_id = "MYBUILD".to_string();
    config.package.dedicated_server = true;

    let report = fixture.pipeline(config, &launcher).run().unwrap();

    assert_eq!(report.contexts, vec!["Windows", "WindowsServer"]);
    for label in ["Windows", "WindowsServer"] {
        let ids = archived_build_ids(&fixture.archive(label)).unwrap();
        assert!(!ids.is_empty());
        assert!(ids.values().all(|id| id == "MYBUILD"));
        assert!(!fixture.stage_root(label).exists());
    }
}

#[test]
fn test_unknown_plugin_is_config_error() {
    let fixture = ModProject::new();

    let err = modpak::pipeline::PackageRequest::new(
        fixture.project.clone(),
        "DoesNotExist",
        Config::default(),
    )
    .unwrap_err();

    assert!(matches!(err, Error::Config { .. }));
}
