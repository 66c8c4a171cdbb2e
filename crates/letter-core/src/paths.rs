/// Path constants and utilities for staged letters
use letter_types::{LetterKind, LetterRequest};
use std::path::{Path, PathBuf};

// Directory names (relative to the output root)
pub const HTML_DIR_NAME: &str = "htmls";
pub const PDF_DIR_NAME: &str = "pdfs";
pub const MERGED_DIR_NAME: &str = "merged";

pub const HTML_EXTENSION: &str = "html";
pub const PDF_EXTENSION: &str = "pdf";

/// Directory layout of one run's staged and rendered files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagingLayout {
    root: PathBuf,
}

impl StagingLayout {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn html_dir(&self, kind: LetterKind) -> PathBuf {
        self.root.join(HTML_DIR_NAME).join(kind.directory_name())
    }

    pub fn pdf_dir(&self, kind: LetterKind) -> PathBuf {
        self.root.join(PDF_DIR_NAME).join(kind.directory_name())
    }

    pub fn merged_dir(&self, kind: LetterKind) -> PathBuf {
        self.root.join(MERGED_DIR_NAME).join(kind.directory_name())
    }

    /// Staging directory → PDF directory, one entry per letter kind
    pub fn directory_map(&self) -> Vec<(PathBuf, PathBuf)> {
        LetterKind::ALL
            .iter()
            .map(|kind| (self.html_dir(*kind), self.pdf_dir(*kind)))
            .collect()
    }

    /// PDF path for a staged HTML file: same stem, mapped directory.
    /// Returns `None` for files outside the staging directories.
    pub fn pdf_path_for(&self, staged: &Path) -> Option<PathBuf> {
        let parent = staged.parent()?;
        let stem = staged.file_stem()?;
        self.directory_map()
            .into_iter()
            .find(|(html_dir, _)| html_dir.as_path() == parent)
            .map(|(_, pdf_dir)| {
                pdf_dir.join(format!("{}.{}", stem.to_string_lossy(), PDF_EXTENSION))
            })
    }

    /// Staged file names for a request, one per printed copy
    pub fn staged_paths(&self, request: &LetterRequest) -> Option<Vec<PathBuf>> {
        let dir = self.html_dir(request.kind());
        let names: Vec<String> = match request {
            LetterRequest::GardenWaste {
                reference,
                subscriptions,
                ..
            } => {
                let stem = safe_file_stem(reference.as_str())?;
                (1..=*subscriptions)
                    .map(|copy| format!("{}-{}", stem, copy))
                    .collect()
            }
            LetterRequest::Recycling { reference, .. } => {
                vec![safe_file_stem(reference.as_str())?]
            }
            LetterRequest::CollectionChange {
                property, address, ..
            } => {
                let property = safe_file_stem(property.as_str())?;
                match safe_file_stem(address) {
                    Some(address) => vec![format!("{}-{}", property, address)],
                    None => vec![property],
                }
            }
        };

        Some(
            names
                .into_iter()
                .map(|name| dir.join(format!("{}.{}", name, HTML_EXTENSION)))
                .collect(),
        )
    }
}

/// File-name form of a key: path separators and reserved characters removed,
/// commas dropped and whitespace collapsed to `_`. `None` when nothing is left.
pub fn safe_file_stem(raw: &str) -> Option<String> {
    let cleaned = sanitize_filename::sanitize(raw.replace(',', " "));
    let stem = cleaned
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .trim_matches('.')
        .to_string();

    if stem.is_empty() {
        None
    } else {
        Some(stem)
    }
}

// Tests module
#[cfg(test)]
mod tests {
    use super::*;
    use letter_types::ReferenceKey;

    #[test]
    fn test_pdf_path_inverts_staging_path() {
        let layout = StagingLayout::new("");
        for kind in LetterKind::ALL {
            let staged = layout.html_dir(kind).join("ABC123-1.html");
            let expected = PathBuf::from(format!("pdfs/{}/ABC123-1.pdf", kind.directory_name()));
            assert_eq!(layout.pdf_path_for(&staged), Some(expected));
        }
    }

    #[test]
    fn test_pdf_path_with_nested_root() {
        let layout = StagingLayout::new("/srv/letters/run");
        let staged = PathBuf::from("/srv/letters/run/htmls/gw/ABC123-1.html");
        assert_eq!(
            layout.pdf_path_for(&staged),
            Some(PathBuf::from("/srv/letters/run/pdfs/gw/ABC123-1.pdf"))
        );
    }

    #[test]
    fn test_pdf_path_rejects_unknown_directory() {
        let layout = StagingLayout::new("out");
        assert_eq!(layout.pdf_path_for(Path::new("out/htmls/other/A.html")), None);
        assert_eq!(layout.pdf_path_for(Path::new("A.html")), None);
    }

    #[test]
    fn test_garden_waste_paths_numbered_per_copy() {
        let layout = StagingLayout::new("");
        let request = LetterRequest::GardenWaste {
            occupier: "Occupier".to_string(),
            address: "1 Main St".to_string(),
            reference: ReferenceKey::new("ABC123"),
            subscriptions: 3,
        };
        let paths = layout.staged_paths(&request).unwrap();
        assert_eq!(
            paths,
            vec![
                PathBuf::from("htmls/gw/ABC123-1.html"),
                PathBuf::from("htmls/gw/ABC123-2.html"),
                PathBuf::from("htmls/gw/ABC123-3.html"),
            ]
        );
    }

    #[test]
    fn test_change_path_uses_property_and_address() {
        let layout = StagingLayout::new("");
        let request = LetterRequest::CollectionChange {
            occupier: "Occupier".to_string(),
            address: "12 High St, Northallerton, DL6 1AA".to_string(),
            property: ReferenceKey::new("10001234"),
        };
        let paths = layout.staged_paths(&request).unwrap();
        assert_eq!(
            paths,
            vec![PathBuf::from("htmls/changes/10001234-12_High_St_Northallerton_DL6_1AA.html")]
        );
    }

    #[test]
    fn test_safe_file_stem_strips_separators() {
        assert_eq!(safe_file_stem("AB/12\\34"), Some("AB1234".to_string()));
        assert_eq!(safe_file_stem("../etc"), Some("etc".to_string()));
        assert_eq!(safe_file_stem("  "), None);
        assert_eq!(safe_file_stem("/"), None);
    }
}
