//! Cache-key properties of the build context: identical repository content
//! always hashes to the same image tag, and any byte difference (in the
//! repository or in a control script) changes it.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use repo_read_sandbox::{BuildContext, SandboxConfig, SandboxError, IMAGE_REPOSITORY};

fn write_sample_repo(root: &Path) -> Result<()> {
    fs::create_dir_all(root.join("src"))?;
    fs::create_dir_all(root.join(".git"))?;
    fs::write(root.join("src/lib.rs"), "pub fn answer() -> u32 { 42 }\n")?;
    fs::write(root.join("README.md"), "sample repository\n")?;
    fs::write(root.join(".git/HEAD"), "ref: refs/heads/main\n")?;
    Ok(())
}

fn write_templates(dir: &Path) -> Result<()> {
    fs::write(dir.join("Dockerfile.seagoat"), "FROM scratch\nCOPY repo /repo\n")?;
    fs::write(dir.join("run.seagoat.sh"), "#!/bin/sh\nexec analysis\n")?;
    Ok(())
}

fn config_for(template_dir: &Path) -> SandboxConfig {
    SandboxConfig {
        dockerfile_template: template_dir.join("Dockerfile.seagoat"),
        run_script_template: template_dir.join("run.seagoat.sh"),
        ..SandboxConfig::default()
    }
}

#[test]
fn identical_content_produces_identical_bytes_and_tag() -> Result<()> {
    let templates = tempfile::tempdir().context("template dir")?;
    write_templates(templates.path())?;
    let config = config_for(templates.path());

    let repo_a = tempfile::tempdir().context("repo a")?;
    let repo_b = tempfile::tempdir().context("repo b")?;
    write_sample_repo(repo_a.path())?;
    write_sample_repo(repo_b.path())?;

    let context_a = BuildContext::assemble(repo_a.path(), &config)?;
    let context_b = BuildContext::assemble(repo_b.path(), &config)?;

    assert_eq!(context_a.bytes(), context_b.bytes());
    assert_eq!(context_a.image_tag(), context_b.image_tag());

    // Re-assembling the same tree is also stable.
    let context_a2 = BuildContext::assemble(repo_a.path(), &config)?;
    assert_eq!(context_a.image_tag(), context_a2.image_tag());
    Ok(())
}

#[test]
fn tag_is_derived_from_the_content_digest() -> Result<()> {
    let templates = tempfile::tempdir()?;
    write_templates(templates.path())?;
    let repo = tempfile::tempdir()?;
    write_sample_repo(repo.path())?;

    let context = BuildContext::assemble(repo.path(), &config_for(templates.path()))?;
    let tag = context.image_tag();

    let suffix = tag
        .strip_prefix(&format!("{IMAGE_REPOSITORY}:"))
        .expect("tag carries the image repository prefix");
    assert_eq!(suffix.len(), 16);
    assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
    Ok(())
}

#[test]
fn any_repository_byte_change_changes_the_tag() -> Result<()> {
    let templates = tempfile::tempdir()?;
    write_templates(templates.path())?;
    let config = config_for(templates.path());

    let repo = tempfile::tempdir()?;
    write_sample_repo(repo.path())?;
    let before = BuildContext::assemble(repo.path(), &config)?;

    fs::write(repo.path().join("src/lib.rs"), "pub fn answer() -> u32 { 43 }\n")?;
    let after = BuildContext::assemble(repo.path(), &config)?;

    assert_ne!(before.image_tag(), after.image_tag());
    Ok(())
}

#[test]
fn hidden_and_vcs_files_are_part_of_the_key() -> Result<()> {
    let templates = tempfile::tempdir()?;
    write_templates(templates.path())?;
    let config = config_for(templates.path());

    let repo = tempfile::tempdir()?;
    write_sample_repo(repo.path())?;
    let before = BuildContext::assemble(repo.path(), &config)?;

    fs::write(repo.path().join(".git/HEAD"), "ref: refs/heads/other\n")?;
    let after = BuildContext::assemble(repo.path(), &config)?;

    assert_ne!(before.image_tag(), after.image_tag());
    Ok(())
}

#[test]
fn control_script_changes_change_the_tag() -> Result<()> {
    let templates = tempfile::tempdir()?;
    write_templates(templates.path())?;
    let config = config_for(templates.path());

    let repo = tempfile::tempdir()?;
    write_sample_repo(repo.path())?;
    let before = BuildContext::assemble(repo.path(), &config)?;

    fs::write(
        templates.path().join("run.seagoat.sh"),
        "#!/bin/sh\nexec analysis --verbose\n",
    )?;
    let after = BuildContext::assemble(repo.path(), &config)?;

    assert_ne!(before.image_tag(), after.image_tag());
    Ok(())
}

#[test]
fn missing_template_is_resource_unavailable() -> Result<()> {
    let templates = tempfile::tempdir()?;
    write_templates(templates.path())?;
    let mut config = config_for(templates.path());
    config.dockerfile_template = templates.path().join("no-such-template");

    let repo = tempfile::tempdir()?;
    write_sample_repo(repo.path())?;

    let err = BuildContext::assemble(repo.path(), &config)
        .err()
        .expect("missing template must fail");
    match err {
        SandboxError::ResourceUnavailable(path) => {
            assert!(path.ends_with("no-such-template"));
        }
        other => panic!("expected ResourceUnavailable, got {other}"),
    }
    Ok(())
}
