use anyhow::{Context, Result};
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use zip::ZipArchive;

#[derive(Debug, Clone, Default)]
pub struct ExtractOutcome {
    pub raw_dir: PathBuf,
    pub extracted: usize,
    pub skipped: usize,
}

fn is_macos_metadata(path: &Path) -> bool {
    path.components().any(|c| match c {
        Component::Normal(part) => {
            let part = part.to_string_lossy();
            part == "__MACOSX" || part.starts_with("._") || part == ".DS_Store"
        }
        _ => false,
    })
}

/// Replace `raw_dir` with the contents of an uploaded export archive.
pub fn extract_upload(zip_path: &Path, raw_dir: &Path) -> Result<ExtractOutcome> {
    let file = fs::File::open(zip_path)
        .with_context(|| format!("failed to open {}", zip_path.display()))?;
    let mut archive = ZipArchive::new(file)
        .with_context(|| format!("{} is not a readable zip archive", zip_path.display()))?;

    if raw_dir.exists() {
        fs::remove_dir_all(raw_dir)
            .with_context(|| format!("failed to clear {}", raw_dir.display()))?;
    }
    fs::create_dir_all(raw_dir)
        .with_context(|| format!("failed to create {}", raw_dir.display()))?;

    let mut outcome = ExtractOutcome {
        raw_dir: raw_dir.to_path_buf(),
        ..ExtractOutcome::default()
    };
    for idx in 0..archive.len() {
        let mut entry = archive
            .by_index(idx)
            .with_context(|| format!("failed to read entry {idx} of {}", zip_path.display()))?;
        // enclosed_name rejects absolute paths and `..` traversal
        let Some(relative) = entry.enclosed_name() else {
            outcome.skipped += 1;
            continue;
        };
        if is_macos_metadata(&relative) {
            outcome.skipped += 1;
            continue;
        }

        let out_path = raw_dir.join(&relative);
        if entry.is_dir() {
            fs::create_dir_all(&out_path)
                .with_context(|| format!("failed to create {}", out_path.display()))?;
            continue;
        }
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let mut out = fs::File::create(&out_path)
            .with_context(|| format!("failed to create {}", out_path.display()))?;
        io::copy(&mut entry, &mut out)
            .with_context(|| format!("failed to extract {}", out_path.display()))?;
        outcome.extracted += 1;
    }

    Ok(outcome)
}
