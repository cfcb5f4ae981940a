//! Collaborator seams: template sourcing and program compilation.
//!
//! The cache talks to the outside world through these two traits so the
//! core stays free of GPU and resource-system dependencies. Tests plug in
//! in-memory fakes; production code wires a real resource loader and a
//! backend compiler.

use std::fs;
use std::path::PathBuf;

use crate::datablock::{language_extension, ShaderStage};
use crate::errors::{HlmsError, Result};

/// Everything the external compiler needs to build one program.
#[derive(Debug)]
pub struct ProgramDescriptor<'a> {
    /// Deterministic program name: hex cache hash plus stage suffix.
    pub name: String,
    pub source: &'a str,
    pub language: &'a str,
    pub stage: ShaderStage,
    pub profiles: &'a [String],
}

/// Source of raw template and piece text.
pub trait TemplateProvider {
    /// Raw text of a template file named per the datablock convention
    /// (e.g. `Basic_vs.glslt`).
    fn template(&self, file_name: &str) -> Result<String>;

    /// Raw texts of every piece file applicable to a stage and language,
    /// in a deterministic order.
    fn piece_files(&self, stage: ShaderStage, language: &str) -> Result<Vec<String>>;
}

/// Backend that turns generated source into a program handle.
pub trait ShaderCompiler {
    type Program: Clone;

    fn compile(&mut self, descriptor: &ProgramDescriptor<'_>) -> Result<Self::Program>;
}

/// [`TemplateProvider`] over a flat directory of template and piece files.
///
/// Piece files are recognized by the stage tag (`piece_vs`, `piece_ps`,
/// ...) appearing anywhere in the file name, case-insensitively, with an
/// extension belonging to the requested language (`glsl` or `glslt` for
/// GLSL, and so on). Files are returned sorted by name so renders are
/// reproducible across platforms.
#[derive(Debug, Clone)]
pub struct DirectoryTemplateProvider {
    root: PathBuf,
}

impl DirectoryTemplateProvider {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &std::path::Path {
        &self.root
    }
}

impl TemplateProvider for DirectoryTemplateProvider {
    fn template(&self, file_name: &str) -> Result<String> {
        let path = self.root.join(file_name);
        if !path.is_file() {
            return Err(HlmsError::TemplateNotFound(file_name.to_string()));
        }
        Ok(fs::read_to_string(path)?)
    }

    fn piece_files(&self, stage: ShaderStage, language: &str) -> Result<Vec<String>> {
        let tag = stage.piece_tag();
        let extension = language_extension(language);
        let template_extension = format!("{extension}t");

        let mut paths = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            let name = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default()
                .to_ascii_lowercase();
            let ext_matches = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e == extension || e == template_extension);
            if ext_matches && name.contains(tag) {
                paths.push(path);
            }
        }
        paths.sort();

        let mut texts = Vec::with_capacity(paths.len());
        for path in paths {
            texts.push(fs::read_to_string(path)?);
        }
        Ok(texts)
    }
}
