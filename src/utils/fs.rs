// Directory copying used by init and update-template

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Recursively copy `src` into `dst`, merging with what is already there.
///
/// Entries for which `skip` returns true (given the path relative to `src`) are left out.
pub fn copy_tree<F>(src: &Path, dst: &Path, skip: &F) -> Result<()>
where
    F: Fn(&Path) -> bool,
{
    copy_dir(src, src, dst, skip)
}

fn copy_dir<F>(root: &Path, src: &Path, dst: &Path, skip: &F) -> Result<()>
where
    F: Fn(&Path) -> bool,
{
    fs::create_dir_all(dst).with_context(|| format!("Failed to create {}", dst.display()))?;
    for entry in fs::read_dir(src).with_context(|| format!("Failed to read {}", src.display()))? {
        let entry = entry?;
        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(&path);
        if skip(relative) {
            continue;
        }
        let target = dst.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir(root, &path, &target, skip)?;
        } else {
            fs::copy(&path, &target)
                .with_context(|| format!("Failed to copy {} to {}", path.display(), target.display()))?;
        }
    }
    Ok(())
}

/// Copy everything
pub fn copy_all(_: &Path) -> bool {
    false
}
