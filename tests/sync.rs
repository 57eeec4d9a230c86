//! Synchronizer runs against directory-backed templates and content

use std::fs;

use blockweave::sync::{DirectorySource, FileStore, PersistenceStore, SyncError, Synchronizer};
use blockweave::{Compiler, ProjectConfig};
use pretty_assertions::assert_eq;

fn write_template(dir: &std::path::Path, id: &str, text: &str) {
    fs::write(dir.join(format!("{}.html", id)), text).unwrap();
}

#[test]
fn test_sync_preserves_edits_across_deploys() {
    let templates = tempfile::tempdir().unwrap();
    let content = tempfile::tempdir().unwrap();
    write_template(
        templates.path(),
        "landing",
        r#"<h1>Welcome</h1><p key="pitch">Describe the product</p>"#,
    );

    let synchronizer = Synchronizer::new(
        Compiler::default(),
        DirectorySource::new(templates.path()),
        FileStore::open(content.path()).unwrap(),
    );
    let first = synchronizer.sync("landing", "home").unwrap();
    assert_eq!(first.report.inserted, vec!["pitch".to_string()]);

    // an editor rewrites the keyed paragraph
    let stored = fs::read_to_string(content.path().join("home.html")).unwrap();
    let edited = stored.replace("Describe the product", "The fastest widget on the market");
    fs::write(content.path().join("home.html"), &edited).unwrap();

    write_template(
        templates.path(),
        "landing",
        r#"<h1>Hello there</h1><p key="pitch">Describe the product</p><hr>"#,
    );
    let second = synchronizer.sync("landing", "home").unwrap();
    assert_eq!(second.report.preserved, vec!["pitch".to_string()]);
    assert_eq!(
        second.content,
        concat!(
            r#"<!-- wp:heading {"level":1} --><h1>Hello there</h1><!-- /wp:heading -->"#,
            r#"<!-- wp:paragraph {"metadata":{"key":"pitch"}} --><p>The fastest widget on the market</p><!-- /wp:paragraph -->"#,
            "<!-- wp:separator --><hr><!-- /wp:separator -->"
        )
    );
    let on_disk = fs::read_to_string(content.path().join("home.html")).unwrap();
    assert_eq!(on_disk, second.content);

    let tree = synchronizer.store().get("home").unwrap();
    assert_eq!(tree.revision, Some(second.revision));
}

#[test]
fn test_sync_is_stable_without_changes() {
    let templates = tempfile::tempdir().unwrap();
    let content = tempfile::tempdir().unwrap();
    write_template(templates.path(), "page", "<h2>Title</h2><p>Body</p>");

    let synchronizer = Synchronizer::new(
        Compiler::default(),
        DirectorySource::new(templates.path()),
        FileStore::open(content.path()).unwrap(),
    );
    let first = synchronizer.sync("page", "p1").unwrap();
    let second = synchronizer.sync("page", "p1").unwrap();
    assert_eq!(first.content, second.content);
    assert_eq!(first.revision, second.revision);
}

#[test]
fn test_sync_from_config() {
    let templates = tempfile::tempdir().unwrap();
    let content = tempfile::tempdir().unwrap();
    write_template(templates.path(), "t", r#"<callout>Heads up</callout>"#);
    let config = ProjectConfig::from_str(
        r#"
[sync]
max_retries = 5

[[overrides]]
tag = "callout"
block = "acme/callout"

[[blocks]]
name = "acme/callout"
"#,
    )
    .unwrap();

    let synchronizer = Synchronizer::from_config(
        &config,
        DirectorySource::new(templates.path()),
        FileStore::open(content.path()).unwrap(),
    )
    .unwrap();
    let outcome = synchronizer.sync("t", "c").unwrap();
    assert!(outcome.warnings.is_empty());
    assert_eq!(
        outcome.content,
        "<!-- wp:acme/callout --><callout>Heads up</callout><!-- /wp:acme/callout -->"
    );
}

#[test]
fn test_sync_missing_template() {
    let templates = tempfile::tempdir().unwrap();
    let content = tempfile::tempdir().unwrap();
    let synchronizer = Synchronizer::new(
        Compiler::default(),
        DirectorySource::new(templates.path()),
        FileStore::open(content.path()).unwrap(),
    );
    assert!(matches!(
        synchronizer.sync("absent", "c"),
        Err(SyncError::Source(_))
    ));
    assert!(!content.path().join("c.html").exists());
}
