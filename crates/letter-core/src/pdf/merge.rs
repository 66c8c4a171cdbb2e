//! Batch merging of converted letters into one printable document

use super::convert::list_files;
use crate::error::{LetterError, Result};
use crate::paths::{StagingLayout, HTML_EXTENSION, PDF_EXTENSION};
use letter_types::{LetterKind, RunContext};
use lopdf::{Document, Object, ObjectId};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

/// A merged batch and the files it was built from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedBatch {
    pub kind: LetterKind,
    pub output: PathBuf,
    pub sources: Vec<PathBuf>,
    pub pages: usize,
}

pub struct BatchMerger {
    layout: StagingLayout,
}

impl BatchMerger {
    pub fn new(layout: StagingLayout) -> Self {
        Self { layout }
    }

    /// Merge every PDF of `kind` into `merged/<dir>/<YYYYMMDDHHMM>.pdf`, or
    /// `<YYYYMMDDHHMM>-<n>.pdf` when an earlier batch already has that name.
    /// Returns `None` when there is nothing to merge.
    pub fn merge_kind(&self, kind: LetterKind, context: &RunContext) -> Result<Option<MergedBatch>> {
        let sources = list_files(&self.layout.pdf_dir(kind), PDF_EXTENSION)?;
        if sources.is_empty() {
            log::info!("No {} PDFs to merge", kind);
            return Ok(None);
        }

        let merged_dir = self.layout.merged_dir(kind);
        std::fs::create_dir_all(&merged_dir)?;
        let output = unused_batch_path(&merged_dir, &context.batch_stamp());

        let pages = merge_files(&sources, &output)?;
        log::info!(
            "Merged {} {} PDFs ({} pages) into {}",
            sources.len(),
            kind,
            pages,
            output.display()
        );

        Ok(Some(MergedBatch {
            kind,
            output,
            sources,
            pages,
        }))
    }

    /// Delete the merged sources and the kind's staged HTML files
    pub fn cleanup(&self, batch: &MergedBatch) -> Result<usize> {
        let mut removed = 0;
        for path in &batch.sources {
            std::fs::remove_file(path)?;
            removed += 1;
        }
        for path in list_files(&self.layout.html_dir(batch.kind), HTML_EXTENSION)? {
            std::fs::remove_file(&path)?;
            removed += 1;
        }

        log::debug!("Removed {} intermediate {} files", removed, batch.kind);
        Ok(removed)
    }
}

/// First of `<stamp>.pdf`, `<stamp>-2.pdf`, ... not yet present in `dir`
fn unused_batch_path(dir: &Path, stamp: &str) -> PathBuf {
    let mut candidate = dir.join(format!("{}.{}", stamp, PDF_EXTENSION));
    let mut suffix = 2;
    while candidate.exists() {
        candidate = dir.join(format!("{}-{}.{}", stamp, suffix, PDF_EXTENSION));
        suffix += 1;
    }
    candidate
}

/// Concatenate `inputs` page for page into `output`, returning the page count.
/// Any unreadable input fails the whole merge. An existing `output` is never
/// replaced.
pub fn merge_files(inputs: &[PathBuf], output: &Path) -> Result<usize> {
    let mut documents = Vec::with_capacity(inputs.len());
    for path in inputs {
        let document = Document::load(path)
            .map_err(|e| LetterError::Merge(format!("cannot read {}: {}", path.display(), e)))?;
        documents.push(document);
    }

    let mut merged = concatenate(documents)?;
    let pages = merged.get_pages().len();

    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(output)
        .map_err(|e| LetterError::Merge(format!("cannot create {}: {}", output.display(), e)))?;
    if let Err(e) = merged.save_to(&mut file) {
        drop(file);
        let _ = std::fs::remove_file(output);
        return Err(LetterError::Merge(format!("cannot write {}: {}", output.display(), e)));
    }

    Ok(pages)
}

fn concatenate(documents: Vec<Document>) -> Result<Document> {
    let mut max_id = 1;
    let mut pages: Vec<(ObjectId, Object)> = Vec::new();
    let mut objects = Vec::new();

    for mut document in documents {
        document.renumber_objects_with(max_id);
        max_id = document.max_id + 1;

        // get_pages is keyed by page number, so this keeps page order
        for (_, page_id) in document.get_pages() {
            let page = document.get_object(page_id)?.to_owned();
            pages.push((page_id, page));
        }
        objects.extend(document.objects);
    }

    let mut merged = Document::with_version("1.5");
    let mut catalog: Option<(ObjectId, Object)> = None;
    let mut page_tree: Option<(ObjectId, Object)> = None;

    for (object_id, object) in objects {
        let type_name = object.type_name().unwrap_or("").to_string();
        match type_name.as_str() {
            "Catalog" => {
                let id = catalog.as_ref().map(|(id, _)| *id).unwrap_or(object_id);
                catalog = Some((id, object));
            }
            "Pages" => {
                if let Ok(dictionary) = object.as_dict() {
                    let mut dictionary = dictionary.clone();
                    if let Some((_, ref previous)) = page_tree {
                        if let Ok(previous) = previous.as_dict() {
                            dictionary.extend(previous);
                        }
                    }
                    let id = page_tree.as_ref().map(|(id, _)| *id).unwrap_or(object_id);
                    page_tree = Some((id, Object::Dictionary(dictionary)));
                }
            }
            "Page" | "Outlines" | "Outline" => {}
            _ => {
                merged.objects.insert(object_id, object);
            }
        }
    }

    let (page_tree_id, page_tree) =
        page_tree.ok_or_else(|| LetterError::Merge("no page tree found".to_string()))?;
    let (catalog_id, catalog) =
        catalog.ok_or_else(|| LetterError::Merge("no document catalog found".to_string()))?;

    for (page_id, page) in &pages {
        if let Ok(dictionary) = page.as_dict() {
            let mut dictionary = dictionary.clone();
            dictionary.set("Parent", page_tree_id);
            merged.objects.insert(*page_id, Object::Dictionary(dictionary));
        }
    }

    let mut tree = page_tree.as_dict()?.clone();
    tree.set("Count", pages.len() as i64);
    tree.set(
        "Kids",
        pages
            .iter()
            .map(|(page_id, _)| Object::Reference(*page_id))
            .collect::<Vec<_>>(),
    );
    tree.remove(b"Parent");
    merged.objects.insert(page_tree_id, Object::Dictionary(tree));

    let mut root = catalog.as_dict()?.clone();
    root.set("Pages", page_tree_id);
    root.remove(b"Outlines");
    merged.objects.insert(catalog_id, Object::Dictionary(root));

    merged.trailer.set("Root", catalog_id);
    merged.max_id = merged.objects.len() as u32;
    merged.renumber_objects();
    merged.compress();

    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Local, TimeZone};
    use lopdf::dictionary;
    use tempfile::TempDir;

    /// Single page PDF whose page width identifies it
    fn write_single_page_pdf(path: &Path, width: i64) {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), width.into(), 842.into()],
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.save(path).unwrap();
    }

    fn page_widths(path: &Path) -> Vec<i64> {
        let doc = Document::load(path).unwrap();
        doc.get_pages()
            .values()
            .map(|page_id| {
                let page = doc.get_dictionary(*page_id).unwrap();
                let media_box = page.get(b"MediaBox").unwrap().as_array().unwrap();
                media_box[2].as_i64().unwrap()
            })
            .collect()
    }

    fn context() -> RunContext {
        RunContext::new(Local.with_ymd_and_hms(2018, 6, 18, 9, 5, 0).unwrap())
    }

    #[test]
    fn test_three_single_pages_merge_in_name_order() {
        let temp_dir = TempDir::new().unwrap();
        let layout = StagingLayout::new(temp_dir.path());
        let pdf_dir = layout.pdf_dir(LetterKind::GardenWaste);
        std::fs::create_dir_all(&pdf_dir).unwrap();
        write_single_page_pdf(&pdf_dir.join("B-1.pdf"), 200);
        write_single_page_pdf(&pdf_dir.join("A-1.pdf"), 100);
        write_single_page_pdf(&pdf_dir.join("C-1.pdf"), 300);

        let merger = BatchMerger::new(layout.clone());
        let batch = merger
            .merge_kind(LetterKind::GardenWaste, &context())
            .unwrap()
            .unwrap();

        assert_eq!(batch.pages, 3);
        assert_eq!(
            batch.output,
            layout.merged_dir(LetterKind::GardenWaste).join("201806180905.pdf")
        );
        assert_eq!(page_widths(&batch.output), vec![100, 200, 300]);
    }

    #[test]
    fn test_cleanup_removes_sources_and_staged_html() {
        let temp_dir = TempDir::new().unwrap();
        let layout = StagingLayout::new(temp_dir.path());
        let pdf_dir = layout.pdf_dir(LetterKind::Recycling);
        let html_dir = layout.html_dir(LetterKind::Recycling);
        std::fs::create_dir_all(&pdf_dir).unwrap();
        std::fs::create_dir_all(&html_dir).unwrap();
        for (name, width) in [("R1", 100), ("R2", 200), ("R3", 300)] {
            write_single_page_pdf(&pdf_dir.join(format!("{}.pdf", name)), width);
            std::fs::write(html_dir.join(format!("{}.html", name)), "<html></html>").unwrap();
        }

        let merger = BatchMerger::new(layout.clone());
        let batch = merger.merge_kind(LetterKind::Recycling, &context()).unwrap().unwrap();
        let removed = merger.cleanup(&batch).unwrap();

        assert_eq!(removed, 6);
        for source in &batch.sources {
            assert!(!source.exists());
        }
        assert!(list_files(&html_dir, "html").unwrap().is_empty());
        assert!(batch.output.exists());
    }

    #[test]
    fn test_nothing_to_merge() {
        let temp_dir = TempDir::new().unwrap();
        let merger = BatchMerger::new(StagingLayout::new(temp_dir.path()));
        assert!(merger
            .merge_kind(LetterKind::CollectionChange, &context())
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_second_batch_in_same_minute_keeps_first() {
        let temp_dir = TempDir::new().unwrap();
        let layout = StagingLayout::new(temp_dir.path());
        let pdf_dir = layout.pdf_dir(LetterKind::GardenWaste);
        std::fs::create_dir_all(&pdf_dir).unwrap();
        let merger = BatchMerger::new(layout.clone());

        write_single_page_pdf(&pdf_dir.join("A-1.pdf"), 100);
        write_single_page_pdf(&pdf_dir.join("B-1.pdf"), 200);
        let first = merger.merge_kind(LetterKind::GardenWaste, &context()).unwrap().unwrap();
        merger.cleanup(&first).unwrap();

        write_single_page_pdf(&pdf_dir.join("C-1.pdf"), 300);
        let later = RunContext::new(Local.with_ymd_and_hms(2018, 6, 18, 9, 5, 20).unwrap());
        let second = merger.merge_kind(LetterKind::GardenWaste, &later).unwrap().unwrap();

        let merged_dir = layout.merged_dir(LetterKind::GardenWaste);
        assert_eq!(first.output, merged_dir.join("201806180905.pdf"));
        assert_eq!(second.output, merged_dir.join("201806180905-2.pdf"));
        assert_eq!(page_widths(&first.output), vec![100, 200]);
        assert_eq!(page_widths(&second.output), vec![300]);
    }

    #[test]
    fn test_existing_output_is_not_replaced() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("a.pdf");
        let output = temp_dir.path().join("out.pdf");
        write_single_page_pdf(&input, 100);
        std::fs::write(&output, b"earlier batch").unwrap();

        let err = merge_files(&[input], &output).unwrap_err();
        assert!(matches!(err, LetterError::Merge(_)));
        assert_eq!(std::fs::read(&output).unwrap(), b"earlier batch");
    }

    #[test]
    fn test_malformed_input_fails_whole_merge() {
        let temp_dir = TempDir::new().unwrap();
        let good = temp_dir.path().join("a.pdf");
        let bad = temp_dir.path().join("b.pdf");
        write_single_page_pdf(&good, 100);
        std::fs::write(&bad, b"%PDF-1.4 truncated").unwrap();
        let output = temp_dir.path().join("out.pdf");

        let err = merge_files(&[good, bad], &output).unwrap_err();
        assert!(matches!(err, LetterError::Merge(_)));
        assert!(!output.exists());
    }
}
