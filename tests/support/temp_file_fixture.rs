use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

pub(crate) const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];
pub(crate) const JPEG_SIGNATURE: [u8; 4] = [0xff, 0xd8, 0xff, 0xe0];

pub(crate) fn write_image_file(name: &str, signature: &[u8]) -> TestFile {
    let mut bytes = signature.to_vec();
    bytes.extend_from_slice(&[0, 0, 0, 13, 0x49, 0x48, 0x44, 0x52]);
    write_named_file(name, &bytes)
}

/// Writes `bytes` under a fresh temp directory so `name` is preserved as-is.
pub(crate) fn write_named_file(name: &str, bytes: &[u8]) -> TestFile {
    let dir = unique_temp_dir("roomrug-fixture");
    fs::create_dir_all(&dir).expect("test fixture directory must be creatable");
    let path = dir.join(name);

    fs::write(&path, bytes).expect("test fixture file must be writable");
    TestFile { path, dir }
}

pub(crate) fn unique_temp_dir(prefix: &str) -> PathBuf {
    static NEXT_ID: AtomicU64 = AtomicU64::new(1);
    let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock should be after UNIX_EPOCH")
        .as_nanos();
    std::env::temp_dir().join(format!("{prefix}-{nanos}-{id}"))
}

pub(crate) struct TestFile {
    path: PathBuf,
    dir: PathBuf,
}

impl TestFile {
    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn path_string(&self) -> String {
        self.path.to_string_lossy().to_string()
    }
}

impl Drop for TestFile {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
        let _ = fs::remove_dir(&self.dir);
    }
}
