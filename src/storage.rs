use std::io::ErrorKind;
use std::path::Path;

/// Replaces `path` with `contents` by writing a sibling temp file and renaming
/// it over the target, so readers only ever see the old or the new document.
pub(crate) fn atomic_write(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| std::io::Error::other("missing parent directory"))?;
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("store.json");
    let pid = std::process::id();
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();

    for attempt in 0..10u32 {
        let temp_name = format!(".{file_name}.tmp-{pid}-{nanos}-{attempt}");
        let temp_path = parent.join(temp_name);
        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&temp_path)
        {
            Ok(mut file) => {
                use std::io::Write as _;
                let written = file
                    .write_all(contents)
                    .and_then(|()| file.sync_all())
                    .and_then(|()| std::fs::rename(&temp_path, path));
                if written.is_err() {
                    let _ = std::fs::remove_file(&temp_path);
                }
                return written;
            }
            Err(err) if err.kind() == ErrorKind::AlreadyExists => continue,
            Err(err) => return Err(err),
        }
    }

    Err(std::io::Error::new(
        ErrorKind::AlreadyExists,
        "failed to create temp file",
    ))
}
