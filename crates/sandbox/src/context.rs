use std::fs;
use std::path::Path;

use sha2::{Digest, Sha256};
use tar::{Builder, EntryType, Header};

use crate::config::SandboxConfig;
use crate::error::{Result, SandboxError};

/// Image name; the tag suffix is the truncated content digest, so one
/// repository state maps to exactly one image.
pub const IMAGE_REPOSITORY: &str = "repo-read/seagoat";

const TAG_DIGEST_CHARS: usize = 16;

/// Archive entry names the control scripts are stored under; the Dockerfile
/// template refers to these.
const DOCKERFILE_ENTRY: &str = "Dockerfile";
const RUN_SCRIPT_ENTRY: &str = "run.sh";
const REPO_ENTRY: &str = "repo";

/// Self-contained build context: control scripts plus a verbatim snapshot of
/// the repository, serialized as one deterministic tar stream.
///
/// Entries are appended in a fixed order (Dockerfile, run script, then the
/// repository tree with sorted directory entries) and carry zeroed
/// owner/timestamp metadata, so identical repository content always produces
/// identical bytes; the byte stream itself is the cache key.
pub struct BuildContext {
    bytes: Vec<u8>,
    tag: String,
}

impl BuildContext {
    /// Package `repo_root` together with the configured control scripts.
    ///
    /// The snapshot is unfiltered on purpose: hidden files and `.git` are
    /// included because the analysis tool may rely on commit history.
    pub fn assemble(repo_root: &Path, config: &SandboxConfig) -> Result<Self> {
        let dockerfile = read_template(&config.dockerfile_template)?;
        let run_script = read_template(&config.run_script_template)?;

        let mut builder = Builder::new(Vec::new());
        append_file(&mut builder, Path::new(DOCKERFILE_ENTRY), &dockerfile, 0o644)?;
        append_file(&mut builder, Path::new(RUN_SCRIPT_ENTRY), &run_script, 0o755)?;
        append_dir(&mut builder, Path::new(REPO_ENTRY))?;
        append_tree(&mut builder, repo_root, Path::new(REPO_ENTRY))?;
        let bytes = builder.into_inner()?;

        let tag = image_tag_for(&bytes);
        Ok(Self { bytes, tag })
    }

    /// The exact bytes handed to the build step.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Content-addressed image tag derived from [`Self::bytes`].
    pub fn image_tag(&self) -> &str {
        &self.tag
    }
}

fn read_template(path: &Path) -> Result<Vec<u8>> {
    match fs::read(path) {
        Ok(bytes) => Ok(bytes),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            Err(SandboxError::ResourceUnavailable(path.to_path_buf()))
        }
        Err(err) => Err(err.into()),
    }
}

fn image_tag_for(context_bytes: &[u8]) -> String {
    let digest = Sha256::digest(context_bytes);
    let hex = hex_encode_lower(&digest);
    format!("{IMAGE_REPOSITORY}:{}", &hex[..TAG_DIGEST_CHARS])
}

fn hex_encode_lower(bytes: &[u8]) -> String {
    use std::fmt::Write;

    let mut out = String::with_capacity(bytes.len().saturating_mul(2));
    for b in bytes {
        let _ = write!(out, "{b:02x}");
    }
    out
}

fn deterministic_header(entry_type: EntryType, size: u64, mode: u32) -> Header {
    let mut header = Header::new_gnu();
    header.set_entry_type(entry_type);
    header.set_size(size);
    header.set_mode(mode);
    header.set_mtime(0);
    header.set_uid(0);
    header.set_gid(0);
    header
}

fn append_file(
    builder: &mut Builder<Vec<u8>>,
    archive_path: &Path,
    data: &[u8],
    mode: u32,
) -> Result<()> {
    let mut header = deterministic_header(EntryType::Regular, data.len() as u64, mode);
    builder.append_data(&mut header, archive_path, data)?;
    Ok(())
}

fn append_dir(builder: &mut Builder<Vec<u8>>, archive_path: &Path) -> Result<()> {
    let mut header = deterministic_header(EntryType::Directory, 0, 0o755);
    builder.append_data(&mut header, archive_path, std::io::empty())?;
    Ok(())
}

fn append_symlink(
    builder: &mut Builder<Vec<u8>>,
    archive_path: &Path,
    target: &Path,
) -> Result<()> {
    let mut header = deterministic_header(EntryType::Symlink, 0, 0o777);
    builder.append_link(&mut header, archive_path, target)?;
    Ok(())
}

fn append_tree(builder: &mut Builder<Vec<u8>>, dir: &Path, archive_dir: &Path) -> Result<()> {
    let mut entries = fs::read_dir(dir)?.collect::<std::io::Result<Vec<_>>>()?;
    entries.sort_by_key(|entry| entry.file_name());

    for entry in entries {
        let path = entry.path();
        let archive_path = archive_dir.join(entry.file_name());
        let meta = fs::symlink_metadata(&path)?;
        let file_type = meta.file_type();

        if file_type.is_symlink() {
            let target = fs::read_link(&path)?;
            append_symlink(builder, &archive_path, &target)?;
        } else if file_type.is_dir() {
            append_dir(builder, &archive_path)?;
            append_tree(builder, &path, &archive_path)?;
        } else {
            let data = fs::read(&path)?;
            let mode = if is_executable(&meta) { 0o755 } else { 0o644 };
            append_file(builder, &archive_path, &data, mode)?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn is_executable(meta: &fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn is_executable(_meta: &fs::Metadata) -> bool {
    false
}
