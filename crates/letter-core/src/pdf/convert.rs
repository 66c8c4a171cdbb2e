//! HTML to PDF conversion through the external renderer binary

use crate::config::RendererConfig;
use crate::error::{LetterError, Result};
use crate::paths::{StagingLayout, HTML_EXTENSION};
use letter_types::LetterKind;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::process::Command;

/// Fixed page layout passed to every renderer invocation
pub const LAYOUT_ARGS: [&str; 13] = [
    "--quiet",
    "--page-size",
    "A4",
    "--encoding",
    "utf-8",
    "-T",
    "10mm",
    "-B",
    "10mm",
    "-L",
    "10mm",
    "-R",
    "10mm",
];

pub struct PdfConverter {
    config: RendererConfig,
    layout: StagingLayout,
}

impl PdfConverter {
    pub fn new(config: RendererConfig, layout: StagingLayout) -> Self {
        Self { config, layout }
    }

    /// Arguments for converting `input` into `output`
    pub fn command_args(&self, input: &Path, output: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = LAYOUT_ARGS.iter().map(OsString::from).collect();
        if let Some(proxy) = &self.config.proxy {
            args.push("-p".into());
            args.push(proxy.into());
        }
        args.push(input.as_os_str().to_os_string());
        args.push(output.as_os_str().to_os_string());
        args
    }

    /// Convert one staged file. The renderer's exit status is checked and
    /// its output must exist and look like a PDF.
    pub async fn convert(&self, staged: &Path) -> Result<PathBuf> {
        let output = self.layout.pdf_path_for(staged).ok_or_else(|| LetterError::RenderFailed {
            path: staged.to_path_buf(),
            reason: "file is not inside a staging directory".to_string(),
        })?;

        if let Some(parent) = output.parent() {
            std::fs::create_dir_all(parent)?;
        }

        log::debug!("Rendering {} -> {}", staged.display(), output.display());
        let result = Command::new(&self.config.binary)
            .args(self.command_args(staged, &output))
            .output()
            .await
            .map_err(|e| LetterError::RenderFailed {
                path: staged.to_path_buf(),
                reason: format!("could not start {}: {}", self.config.binary.display(), e),
            })?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(LetterError::RenderFailed {
                path: staged.to_path_buf(),
                reason: format!("renderer exited with {}: {}", result.status, stderr.trim()),
            });
        }

        let pdf_data = std::fs::read(&output).map_err(|e| LetterError::RenderFailed {
            path: staged.to_path_buf(),
            reason: format!("no output at {}: {}", output.display(), e),
        })?;
        if !validate_pdf(&pdf_data) {
            return Err(LetterError::RenderFailed {
                path: staged.to_path_buf(),
                reason: format!("{} is not a PDF", output.display()),
            });
        }

        Ok(output)
    }

    /// Convert every staged HTML file of `kind`, in file name order
    pub async fn convert_all(&self, kind: LetterKind) -> Result<Vec<PathBuf>> {
        let staged = list_files(&self.layout.html_dir(kind), HTML_EXTENSION)?;
        log::info!("Converting {} {} letters to PDF", staged.len(), kind);

        let mut pdfs = Vec::with_capacity(staged.len());
        for path in &staged {
            pdfs.push(self.convert(path).await?);
        }
        Ok(pdfs)
    }
}

/// Check the PDF magic bytes
pub fn validate_pdf(pdf_data: &[u8]) -> bool {
    pdf_data.len() >= 4 && pdf_data.starts_with(b"%PDF")
}

/// Regular files in `dir` with the given extension, sorted by name.
/// A missing directory has no files.
pub fn list_files(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let matches = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case(extension))
            .unwrap_or(false);
        if path.is_file() && matches {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn converter(proxy: Option<&str>) -> PdfConverter {
        PdfConverter::new(
            RendererConfig {
                binary: PathBuf::from("wkhtmltopdf"),
                proxy: proxy.map(str::to_string),
            },
            StagingLayout::new(""),
        )
    }

    #[test]
    fn test_command_args_end_with_input_and_output() {
        let args = converter(None).command_args(
            Path::new("htmls/gw/ABC123-1.html"),
            Path::new("pdfs/gw/ABC123-1.pdf"),
        );
        assert_eq!(args.len(), LAYOUT_ARGS.len() + 2);
        assert_eq!(args[0], "--quiet");
        assert_eq!(args[args.len() - 2], "htmls/gw/ABC123-1.html");
        assert_eq!(args[args.len() - 1], "pdfs/gw/ABC123-1.pdf");
        assert!(!args.contains(&OsString::from("-p")));
    }

    #[test]
    fn test_command_args_include_proxy() {
        let args = converter(Some("http://proxy.local:8080"))
            .command_args(Path::new("in.html"), Path::new("out.pdf"));
        let position = args.iter().position(|a| a == "-p").unwrap();
        assert_eq!(args[position + 1], "http://proxy.local:8080");
    }

    #[test]
    fn test_validate_pdf() {
        assert!(validate_pdf(b"%PDF-1.4\n...rest of pdf..."));
        assert!(!validate_pdf(b"Not a PDF file"));
        assert!(!validate_pdf(b""));
        assert!(!validate_pdf(b"AB"));
    }

    #[test]
    fn test_list_files_sorted_and_filtered() {
        let temp_dir = TempDir::new().unwrap();
        for name in ["b.html", "a.html", "c.pdf", "d.HTML"] {
            std::fs::write(temp_dir.path().join(name), "x").unwrap();
        }
        std::fs::create_dir(temp_dir.path().join("e.html")).unwrap();

        let files = list_files(temp_dir.path(), "html").unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.html", "b.html", "d.HTML"]);

        assert!(list_files(&temp_dir.path().join("missing"), "html").unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_convert_rejects_file_outside_staging() {
        let err = converter(None).convert(Path::new("elsewhere/a.html")).await.unwrap_err();
        assert!(matches!(err, LetterError::RenderFailed { .. }));
    }

    #[tokio::test]
    async fn test_missing_binary_is_render_failure() {
        let temp_dir = TempDir::new().unwrap();
        let layout = StagingLayout::new(temp_dir.path());
        let staged = layout.html_dir(LetterKind::Recycling).join("R1.html");
        std::fs::create_dir_all(staged.parent().unwrap()).unwrap();
        std::fs::write(&staged, "<html></html>").unwrap();

        let converter = PdfConverter::new(
            RendererConfig {
                binary: temp_dir.path().join("no-such-renderer"),
                proxy: None,
            },
            layout,
        );
        let err = converter.convert(&staged).await.unwrap_err();
        assert!(err.to_string().contains("could not start"));
    }
}
