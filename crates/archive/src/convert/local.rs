//! Conversion backend that runs entirely on the local machine

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Context, Result};

use super::pdf::text_to_pdf;
use super::{ConversionBackend, DraftId};
use crate::naming::sanitize_filename;

/// Drafts are text files in a scratch directory; PDFs are laid out with lopdf
///
/// Markup is flattened to text with `htmd` before layout.
pub struct LocalPdfBackend {
    scratch_dir: PathBuf,
    counter: AtomicU64,
}

impl LocalPdfBackend {
    pub fn new(scratch_dir: impl AsRef<Path>) -> Result<Self> {
        let scratch_dir = scratch_dir.as_ref().to_path_buf();
        fs::create_dir_all(&scratch_dir)
            .with_context(|| format!("Failed to create scratch directory {:?}", scratch_dir))?;
        Ok(Self {
            scratch_dir,
            counter: AtomicU64::new(0),
        })
    }

    pub fn scratch_dir(&self) -> &Path {
        &self.scratch_dir
    }
}

impl ConversionBackend for LocalPdfBackend {
    fn create_draft(&self, title: &str, text: &str) -> Result<DraftId> {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        let path = self
            .scratch_dir
            .join(format!("{}-{}.txt", sanitize_filename(title, 64), n));
        fs::write(&path, text).with_context(|| format!("Failed to write draft {:?}", path))?;
        Ok(DraftId(path.to_string_lossy().into_owned()))
    }

    fn export_pdf(&self, draft: &DraftId) -> Result<Vec<u8>> {
        let text = fs::read_to_string(&draft.0)
            .with_context(|| format!("Failed to read draft {}", draft.0))?;
        text_to_pdf(&text)
    }

    fn discard_draft(&self, draft: &DraftId) -> Result<()> {
        let path = Path::new(&draft.0);
        if path.exists() {
            fs::remove_file(path).with_context(|| format!("Failed to remove draft {}", draft.0))?;
        }
        Ok(())
    }

    fn markup_to_pdf(&self, markup: &str) -> Result<Vec<u8>> {
        let text = htmd::convert(markup).context("Failed to flatten markup")?;
        text_to_pdf(&text)
    }
}
