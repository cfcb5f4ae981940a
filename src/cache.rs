//! Hash-keyed shader program cache.
//!
//! [`ShaderCache`] guarantees that template rendering and compilation run
//! at most once per distinct datablock hash. Compilation failures are not
//! memoized: a later request with the same hash retries, so a fixed
//! template or property set is picked up instead of a stale failure.

use rustc_hash::FxHashMap;

use crate::datablock::ShaderDatablock;
use crate::errors::Result;
use crate::keys;
use crate::parser::{RenderOutput, TemplateParser};
use crate::provider::{ProgramDescriptor, ShaderCompiler, TemplateProvider};

/// Renders a datablock's shader source without compiling or caching.
///
/// Strict counterpart to the cache's best-effort path: the first syntax
/// error recorded during rendering fails the whole render.
pub fn render_source(
    datablock: &ShaderDatablock,
    provider: &dyn TemplateProvider,
) -> Result<String> {
    let mut output = generate(datablock, provider)?;
    match output.errors.drain(..).next() {
        Some(error) => Err(error.into()),
        None => Ok(output.source),
    }
}

fn generate(datablock: &ShaderDatablock, provider: &dyn TemplateProvider) -> Result<RenderOutput> {
    let template = provider.template(&datablock.template_file_name())?;
    let pieces = provider.piece_files(datablock.stage(), datablock.language())?;

    // Math and counter directives mutate properties while rendering; a
    // scratch copy keeps the datablock's hash stable across the render.
    let mut scratch = datablock.properties().clone();
    Ok(TemplateParser::new(&mut scratch).render(&template, &pieces))
}

/// Owning map from datablock hash to compiled program handle.
pub struct ShaderCache<C: ShaderCompiler> {
    compiler: C,
    programs: FxHashMap<u32, C::Program>,
}

impl<C: ShaderCompiler> ShaderCache<C> {
    pub fn new(compiler: C) -> Self {
        keys::preload_reserved_names();
        Self {
            compiler,
            programs: FxHashMap::default(),
        }
    }

    /// Returns the program for the datablock, rendering and compiling on
    /// the first request for its hash.
    ///
    /// Rendering is best-effort: syntax errors have already been logged by
    /// the parser and do not block compilation of the degraded source.
    /// Missing templates and compiler rejections are hard errors and
    /// leave no cache entry behind.
    pub fn get_program(
        &mut self,
        datablock: &ShaderDatablock,
        provider: &dyn TemplateProvider,
    ) -> Result<C::Program> {
        let hash = datablock.hash();
        if let Some(program) = self.programs.get(&hash) {
            return Ok(program.clone());
        }

        log::debug!(
            "generating {:?} program {:08x} from '{}'",
            datablock.stage(),
            hash,
            datablock.template_file_name()
        );
        let output = generate(datablock, provider)?;
        let descriptor = ProgramDescriptor {
            name: format!("{hash:08x}{}", datablock.stage().template_suffix()),
            source: &output.source,
            language: datablock.language(),
            stage: datablock.stage(),
            profiles: datablock.profiles(),
        };

        let program = self.compiler.compile(&descriptor)?;
        self.programs.insert(hash, program.clone());
        Ok(program)
    }

    #[must_use]
    pub fn contains(&self, hash: u32) -> bool {
        self.programs.contains_key(&hash)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.programs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }

    /// Drops every cached handle. Subsequent requests regenerate.
    pub fn clear(&mut self) {
        self.programs.clear();
    }

    #[must_use]
    pub fn compiler(&self) -> &C {
        &self.compiler
    }
}
