// tests/workflow.rs

//! End-to-end manifest workflows against canned provider responses.

mod common;

use common::{deleter, TestProject};
use libdrop::{ErrorCode, Manifest, OperationResult};
use std::collections::BTreeMap;
use tokio_util::sync::CancellationToken;

const JQUERY_311: &[(&str, &str)] = &[
    ("jquery.js", "/* jquery 3.1.1 */"),
    ("jquery.min.js", "/* jquery 3.1.1 min */"),
];

#[tokio::test]
async fn test_install_single_file_from_cdnjs() {
    let project = TestProject::new();
    project.serve_cdnjs("jquery", "3.1.1", JQUERY_311);
    let mut manifest = Manifest::new(project.deps.clone());

    let result = manifest
        .install_library(
            "jquery",
            "3.1.1",
            Some("cdnjs"),
            Some(vec!["jquery.js".to_string()]),
            Some("lib"),
            &CancellationToken::new(),
        )
        .await;

    let goal = match result {
        OperationResult::Success(goal) => goal,
        other => panic!("install failed: {:?}", other.errors()),
    };

    let expected_cache = project.cache_path(&["cdnjs", "jquery", "3.1.1", "jquery.js"]);
    let mut expected = BTreeMap::new();
    expected.insert(
        "lib/jquery.js".to_string(),
        expected_cache.to_string_lossy().into_owned(),
    );
    assert_eq!(goal.installed_files, expected);

    assert_eq!(project.read("lib/jquery.js"), "/* jquery 3.1.1 */");
    assert!(!project.path("lib/jquery.min.js").exists());
    assert!(expected_cache.is_file());

    // The first install adopts the provider as the default
    assert_eq!(manifest.default_provider(), Some("cdnjs"));
    assert_eq!(manifest.libraries().len(), 1);
}

#[tokio::test]
async fn test_restore_is_idempotent() {
    let project = TestProject::new();
    project.serve_cdnjs("jquery", "3.1.1", JQUERY_311);
    let manifest = project.manifest(
        r#"{
            "version": "1.0",
            "defaultProvider": "cdnjs",
            "libraries": [{ "library": "jquery@3.1.1", "destination": "lib/jquery" }]
        }"#,
    );
    let cancel = CancellationToken::new();

    let first = manifest.restore(&cancel).await;
    assert_eq!(first.len(), 1);
    assert!(first[0].success());
    assert!(!first[0].up_to_date());
    assert_eq!(project.read("lib/jquery/jquery.min.js"), "/* jquery 3.1.1 min */");

    let downloads = project.downloader.requests().len();
    let second = manifest.restore(&cancel).await;
    assert!(second[0].up_to_date());
    assert_eq!(project.downloader.requests().len(), downloads);
}

#[tokio::test]
async fn test_restore_reports_every_library() {
    let project = TestProject::new();
    project.serve_cdnjs("jquery", "3.1.1", JQUERY_311);
    project.serve_cdnjs("lodash.js", "4.17.21", &[("lodash.js", "/* lodash */")]);
    let manifest = project.manifest(
        r#"{
            "version": "1.0",
            "defaultProvider": "cdnjs",
            "libraries": [
                { "library": "jquery@3.1.1", "destination": "lib/jquery" },
                { "library": "thing@1.0.0", "provider": "nope", "destination": "lib/thing" },
                { "library": "lodash.js@4.17.21", "destination": "lib/lodash" }
            ]
        }"#,
    );

    let results = manifest.restore(&CancellationToken::new()).await;

    assert_eq!(results.len(), 3);
    assert!(results[0].success());
    assert!(!results[1].success());
    assert_eq!(results[1].errors()[0].code, ErrorCode::ProviderUnknown);
    assert!(results[2].success());
    assert!(project.path("lib/lodash/lodash.js").is_file());
}

#[tokio::test]
async fn test_validation_reports_conflicting_destinations() {
    let project = TestProject::new();
    project.serve_cdnjs("jquery", "3.1.1", JQUERY_311);
    project.serve_cdnjs("jquery", "3.2.0", JQUERY_311);
    let manifest = project.manifest(
        r#"{
            "version": "1.0",
            "defaultProvider": "cdnjs",
            "defaultDestination": "lib",
            "libraries": [
                { "library": "jquery@3.1.1", "files": ["jquery.js"] },
                { "library": "jquery@3.2.0", "files": ["jquery.js"] }
            ]
        }"#,
    );

    let results = manifest.get_validation_results(&CancellationToken::new()).await;

    assert_eq!(results.len(), 1);
    let errors = results[0].errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].code, ErrorCode::ConflictingFilesInManifest);
    assert!(errors[0].message.contains("lib/jquery.js"));
}

#[tokio::test]
async fn test_validation_reports_duplicates_before_fetching() {
    let project = TestProject::new();
    let manifest = project.manifest(
        r#"{
            "version": "1.0",
            "defaultProvider": "cdnjs",
            "libraries": [
                { "library": "jquery@3.1.1", "destination": "a" },
                { "library": "jquery@3.1.1", "destination": "b" }
            ]
        }"#,
    );

    let results = manifest.get_validation_results(&CancellationToken::new()).await;

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].errors()[0].code, ErrorCode::DuplicateLibrariesInManifest);
    assert!(project.downloader.requests().is_empty());
}

#[tokio::test]
async fn test_unsupported_manifest_version() {
    let project = TestProject::new();
    let manifest = project.manifest(r#"{ "version": "9.9", "libraries": [] }"#);

    let results = manifest.get_validation_results(&CancellationToken::new()).await;

    assert_eq!(results.len(), 1);
    assert!(results[0].installation_state.is_none());
    assert_eq!(results[0].errors()[0].code, ErrorCode::VersionIsNotSupported);
}

#[tokio::test]
async fn test_save_and_reload_preserves_declarations() {
    let project = TestProject::new();
    let text = r#"{
        "version": "1.0",
        "defaultProvider": "cdnjs",
        "defaultDestination": "lib",
        "libraries": [
            { "library": "jquery@3.1.1" },
            { "library": "@angular/core@17.0.0", "provider": "unpkg", "destination": "vendor/angular", "files": ["bundles/core.umd.js"] }
        ]
    }"#;
    let manifest = project.manifest(text);
    let path = project.path("libdrop.json");

    manifest.save(&path).await.unwrap();
    let reloaded = Manifest::from_file(&path, project.deps.clone()).await.unwrap();

    assert_eq!(reloaded.libraries(), manifest.libraries());
    assert_eq!(reloaded.to_json(), manifest.to_json());

    let saved: serde_json::Value = serde_json::from_str(&project.read("libdrop.json")).unwrap();
    let first = &saved["libraries"][0];
    assert_eq!(first["library"], "jquery@3.1.1");
    assert!(first.get("provider").is_none());
    assert!(first.get("destination").is_none());
    assert_eq!(saved["libraries"][1]["library"], "@angular/core@17.0.0");
}

#[tokio::test]
async fn test_uninstall_unknown_library_leaves_manifest() {
    let project = TestProject::new();
    let mut manifest = project.manifest(
        r#"{ "version": "1.0", "defaultProvider": "cdnjs", "libraries": [{ "library": "jquery@3.1.1", "destination": "lib" }] }"#,
    );
    let before = manifest.libraries().to_vec();

    let result = manifest
        .uninstall("react@18.2.0", None, deleter(&project.root), &CancellationToken::new())
        .await;

    assert!(!result.success());
    assert_eq!(result.errors()[0].code, ErrorCode::CouldNotDeleteLibrary);
    assert_eq!(manifest.libraries(), before.as_slice());
}

#[tokio::test]
async fn test_uninstall_removes_files_and_declaration() {
    let project = TestProject::new();
    project.serve_cdnjs("jquery", "3.1.1", JQUERY_311);
    let mut manifest = project.manifest(
        r#"{ "version": "1.0", "defaultProvider": "cdnjs", "libraries": [{ "library": "jquery@3.1.1", "destination": "lib" }] }"#,
    );
    let cancel = CancellationToken::new();
    assert!(manifest.restore(&cancel).await[0].success());

    let result = manifest
        .uninstall("jquery@3.1.1", None, deleter(&project.root), &cancel)
        .await;

    assert!(result.success());
    assert!(manifest.libraries().is_empty());
    assert!(!project.path("lib/jquery.js").exists());
    assert!(!project.path("lib/jquery.min.js").exists());
}

#[tokio::test]
async fn test_clean_keeps_declarations() {
    let project = TestProject::new();
    project.serve_cdnjs("jquery", "3.1.1", JQUERY_311);
    let manifest = project.manifest(
        r#"{ "version": "1.0", "defaultProvider": "cdnjs", "libraries": [{ "library": "jquery@3.1.1", "destination": "lib" }] }"#,
    );
    let cancel = CancellationToken::new();
    manifest.restore(&cancel).await;

    let results = manifest.clean(deleter(&project.root), &cancel).await;

    assert_eq!(results.len(), 1);
    assert!(results[0].success());
    assert!(!project.path("lib/jquery.js").exists());
    assert_eq!(manifest.libraries().len(), 1);
}

#[tokio::test]
async fn test_update_deletes_files_of_old_version() {
    let project = TestProject::new();
    project.serve_cdnjs("jquery", "3.1.1", JQUERY_311);
    project.serve_cdnjs("jquery", "3.7.1", &[("jquery.js", "/* jquery 3.7.1 */")]);
    let mut manifest = project.manifest(
        r#"{ "version": "1.0", "defaultProvider": "cdnjs", "libraries": [{ "library": "jquery@3.1.1", "destination": "lib" }] }"#,
    );
    let cancel = CancellationToken::new();
    manifest.restore(&cancel).await;
    assert!(project.path("lib/jquery.min.js").is_file());

    let previous = manifest.clone();
    let old = manifest.replace_library_version(0, "3.7.1").unwrap();
    assert_eq!(old.version, "3.1.1");

    let deleted = manifest
        .delete_unwanted_files(&previous, deleter(&project.root), &cancel)
        .await;
    match deleted {
        OperationResult::Success(files) => {
            assert_eq!(files, vec!["lib/jquery.js".to_string(), "lib/jquery.min.js".to_string()]);
        }
        other => panic!("unexpected result: {:?}", other.errors()),
    }

    let results = manifest.restore(&cancel).await;
    assert!(results[0].success());
    assert_eq!(project.read("lib/jquery.js"), "/* jquery 3.7.1 */");
    assert!(!project.path("lib/jquery.min.js").exists());
}

#[tokio::test]
async fn test_cancelled_restore_writes_nothing() {
    let project = TestProject::new();
    project.serve_cdnjs("jquery", "3.1.1", JQUERY_311);
    let manifest = project.manifest(
        r#"{ "version": "1.0", "defaultProvider": "cdnjs", "libraries": [{ "library": "jquery@3.1.1", "destination": "lib" }] }"#,
    );
    let cancel = CancellationToken::new();
    cancel.cancel();

    let results = manifest.restore(&cancel).await;

    assert_eq!(results.len(), 1);
    assert!(results[0].cancelled_result());
    assert!(!project.path("lib").exists());
}

#[tokio::test]
async fn test_filesystem_directory_source() {
    let project = TestProject::new();
    std::fs::create_dir_all(project.path("shared/css")).unwrap();
    std::fs::write(project.path("shared/util.js"), "util").unwrap();
    std::fs::write(project.path("shared/css/site.css"), "body {}").unwrap();
    let manifest = project.manifest(
        r#"{ "version": "1.0", "libraries": [{ "library": "shared", "provider": "filesystem", "destination": "wwwroot/shared" }] }"#,
    );

    let results = manifest.restore(&CancellationToken::new()).await;

    assert!(results[0].success(), "{:?}", results[0].errors());
    assert_eq!(project.read("wwwroot/shared/util.js"), "util");
    assert_eq!(project.read("wwwroot/shared/css/site.css"), "body {}");
    assert!(project.downloader.requests().is_empty());
}

#[tokio::test]
async fn test_goal_state_failure_stops_at_first_library() {
    let project = TestProject::new();
    project.serve_cdnjs("jquery", "3.1.1", JQUERY_311);
    let manifest = project.manifest(
        r#"{
            "version": "1.0",
            "defaultProvider": "cdnjs",
            "libraries": [
                { "library": "no-such-lib@1.0.0", "destination": "lib/missing" },
                { "library": "jquery@3.1.1", "destination": "lib/jquery" }
            ]
        }"#,
    );

    let results = manifest.get_validation_results(&CancellationToken::new()).await;

    assert_eq!(results.len(), 1);
    assert!(!results[0].success());
    let failed = results[0].installation_state.as_ref().unwrap();
    assert_eq!(failed.name, "no-such-lib");
    assert!(!results[0].errors().is_empty());
    assert!(project.downloader.requests().iter().all(|url| !url.contains("jquery")));
    assert!(!project.path("lib").exists());
}

#[tokio::test]
async fn test_absolute_destination_inside_project() {
    let project = TestProject::new();
    project.serve_cdnjs("jquery", "3.1.1", JQUERY_311);
    let destination = project.root.join("lib").to_string_lossy().into_owned();
    let manifest = project.manifest(
        &serde_json::json!({
            "version": "1.0",
            "defaultProvider": "cdnjs",
            "libraries": [{ "library": "jquery@3.1.1", "destination": destination, "files": ["jquery.js"] }]
        })
        .to_string(),
    );
    let cancel = CancellationToken::new();

    let validated = manifest.get_validation_results(&cancel).await;
    let goal = validated[0].goal_state().unwrap();
    assert_eq!(goal.installed_files.keys().collect::<Vec<_>>(), vec!["lib/jquery.js"]);

    let results = manifest.restore(&cancel).await;
    assert!(results[0].success(), "{:?}", results[0].errors());
    assert_eq!(project.read("lib/jquery.js"), "/* jquery 3.1.1 */");
}

#[tokio::test]
async fn test_uninstall_ambiguous_name_deletes_nothing() {
    let project = TestProject::new();
    project.serve_cdnjs("jquery", "3.1.1", JQUERY_311);
    project.serve_cdnjs("jquery", "3.7.1", &[("jquery.slim.js", "/* slim */")]);
    let mut manifest = project.manifest(
        r#"{
            "version": "1.0",
            "defaultProvider": "cdnjs",
            "libraries": [
                { "library": "jquery@3.1.1", "destination": "lib/old" },
                { "library": "jquery@3.7.1", "destination": "lib/new" }
            ]
        }"#,
    );
    let cancel = CancellationToken::new();
    assert!(manifest.restore(&cancel).await.iter().all(|r| r.success()));
    let before = manifest.libraries().to_vec();

    let result = manifest
        .uninstall("jquery", None, deleter(&project.root), &cancel)
        .await;

    assert!(!result.success());
    let error = &result.errors()[0];
    assert_eq!(error.code, ErrorCode::CouldNotDeleteLibrary);
    assert!(error.message.contains("jquery@3.1.1"));
    assert!(error.message.contains("jquery@3.7.1"));
    assert_eq!(manifest.libraries(), before.as_slice());
    assert!(project.path("lib/old/jquery.js").is_file());
    assert!(project.path("lib/new/jquery.slim.js").is_file());
}
