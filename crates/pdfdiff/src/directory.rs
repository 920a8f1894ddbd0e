//! [`PageSource`] over a directory of pre-rendered pages.
//!
//! Page rasters are files named `page_<N>.<ext>` (`png`, `jpg`, `jpeg`,
//! `bmp`, or `webp`), taken in ascending order of `N`; gaps in the
//! numbering are skipped. Each page may have a sidecar with the same
//! stem:
//!
//! - `page_<N>.json`: a serialized [`PageText`] with positioned blocks,
//!   so header/footer band selection applies;
//! - `page_<N>.txt`: plain page text.
//!
//! The JSON sidecar wins when both exist. A page without a sidecar has
//! empty text.

use std::path::{Path, PathBuf};

use pdfdiff_core::source::fit_to_max_side;
use pdfdiff_core::{PageSource, PageText, RenderOptions, RgbImage, SourceError};

const IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "bmp", "webp"];

#[derive(Debug, Clone)]
struct PageFiles {
    number: u32,
    image: PathBuf,
}

/// Pages found in one directory.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
    pages: Vec<PageFiles>,
}

impl DirectorySource {
    /// Scan `root` for page rasters.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Io`] if the directory cannot be read.
    pub fn open(root: &Path) -> Result<Self, SourceError> {
        let mut pages = Vec::new();
        for entry in std::fs::read_dir(root)? {
            let path = entry?.path();
            if let Some(number) = page_number(&path) {
                pages.push(PageFiles {
                    number,
                    image: path,
                });
            }
        }
        pages.sort_by_key(|p| p.number);
        pages.dedup_by_key(|p| p.number);

        tracing::debug!(dir = %root.display(), pages = pages.len(), "page directory scanned");
        Ok(Self {
            root: root.to_path_buf(),
            pages,
        })
    }

    /// Directory the pages were read from.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn page(&self, index: usize) -> Result<&PageFiles, SourceError> {
        self.pages.get(index).ok_or(SourceError::PageOutOfRange {
            index,
            count: self.pages.len(),
        })
    }
}

/// The `N` of a `page_<N>.<image ext>` path.
fn page_number(path: &Path) -> Option<u32> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    if !IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        return None;
    }
    path.file_stem()?
        .to_str()?
        .strip_prefix("page_")?
        .parse()
        .ok()
}

impl PageSource for DirectorySource {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn render_page(&self, index: usize, options: RenderOptions) -> Result<RgbImage, SourceError> {
        let files = self.page(index)?;
        let image = image::open(&files.image)?.to_rgb8();
        Ok(fit_to_max_side(image, options.max_side))
    }

    fn page_text(&self, index: usize) -> Result<PageText, SourceError> {
        let files = self.page(index)?;
        let json = files.image.with_extension("json");
        if json.is_file() {
            let raw = std::fs::read_to_string(&json)?;
            return serde_json::from_str(&raw)
                .map_err(|e| SourceError::Backend(format!("{}: {e}", json.display())));
        }
        let txt = files.image.with_extension("txt");
        if txt.is_file() {
            return Ok(PageText::plain(std::fs::read_to_string(&txt)?));
        }
        Ok(PageText::default())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    /// A fresh scratch directory under the system temp dir.
    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("pdfdiff-{name}-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write_page(dir: &Path, file: &str, width: u32) {
        RgbImage::from_pixel(width, 10, image::Rgb([255, 255, 255]))
            .save(dir.join(file))
            .unwrap();
    }

    const OPTIONS: RenderOptions = RenderOptions {
        dpi: 220,
        max_side: 3000,
    };

    #[test]
    fn page_number_parsing() {
        assert_eq!(page_number(Path::new("page_0001.png")), Some(1));
        assert_eq!(page_number(Path::new("dir/page_12.JPG")), Some(12));
        assert_eq!(page_number(Path::new("page_0001.txt")), None);
        assert_eq!(page_number(Path::new("cover.png")), None);
        assert_eq!(page_number(Path::new("page_x.png")), None);
    }

    #[test]
    fn pages_are_ordered_by_number() {
        let dir = scratch("order");
        write_page(&dir, "page_10.png", 30);
        write_page(&dir, "page_2.png", 20);
        write_page(&dir, "page_0001.png", 10);
        std::fs::write(dir.join("notes.txt"), "ignored").unwrap();

        let source = DirectorySource::open(&dir).unwrap();
        assert_eq!(source.page_count(), 3);
        let widths: Vec<u32> = (0..3)
            .map(|i| source.render_page(i, OPTIONS).unwrap().width())
            .collect();
        assert_eq!(widths, vec![10, 20, 30]);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn sidecars_supply_text() {
        let dir = scratch("sidecars");
        write_page(&dir, "page_1.png", 10);
        write_page(&dir, "page_2.png", 10);
        write_page(&dir, "page_3.png", 10);
        std::fs::write(dir.join("page_1.txt"), "plain text").unwrap();
        let positioned = PageText {
            height: 100.0,
            blocks: vec![pdfdiff_core::TextBlock {
                top: 40.0,
                bottom: 50.0,
                text: "body".to_owned(),
            }],
            full: "body".to_owned(),
        };
        std::fs::write(dir.join("page_2.json"), serde_json::to_string(&positioned).unwrap()).unwrap();

        let source = DirectorySource::open(&dir).unwrap();
        assert_eq!(source.page_text(0).unwrap().full, "plain text");
        assert_eq!(source.page_text(1).unwrap(), positioned);
        assert_eq!(source.page_text(2).unwrap(), PageText::default());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn bad_json_sidecar_is_a_page_error() {
        let dir = scratch("badjson");
        write_page(&dir, "page_1.png", 10);
        std::fs::write(dir.join("page_1.json"), "{not json").unwrap();

        let source = DirectorySource::open(&dir).unwrap();
        assert!(matches!(source.page_text(0), Err(SourceError::Backend(_))));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_directory_is_an_error() {
        let result = DirectorySource::open(Path::new("/nonexistent/pdfdiff/pages"));
        assert!(matches!(result, Err(SourceError::Io(_))));
    }
}
