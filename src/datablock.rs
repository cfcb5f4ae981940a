//! Shader identity: stage, language, template and properties.
//!
//! A [`ShaderDatablock`] is the cache-facing identity of one shader
//! program. Its combined hash folds together everything that changes the
//! generated source, so two datablocks with equal hashes render and
//! compile to interchangeable programs.

use std::cell::Cell;

use crate::properties::PropertyStore;
use crate::utils::hashing::{self, HASH_SEED};

/// Pipeline stage a template targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
    Geometry,
    Domain,
    Hull,
}

impl ShaderStage {
    pub const ALL: [Self; 5] = [
        Self::Vertex,
        Self::Fragment,
        Self::Geometry,
        Self::Domain,
        Self::Hull,
    ];

    /// Suffix appended to template file names.
    #[must_use]
    pub fn template_suffix(self) -> &'static str {
        match self {
            Self::Vertex => "_vs",
            Self::Fragment => "_fs",
            Self::Geometry => "_gs",
            Self::Domain => "_ds",
            Self::Hull => "_hs",
        }
    }

    /// Substring tag that marks a piece file as belonging to this stage.
    /// The fragment stage uses the HLSL-style `ps` tag.
    #[must_use]
    pub fn piece_tag(self) -> &'static str {
        match self {
            Self::Vertex => "piece_vs",
            Self::Fragment => "piece_ps",
            Self::Geometry => "piece_gs",
            Self::Domain => "piece_ds",
            Self::Hull => "piece_hs",
        }
    }
}

/// File extension a shading language's templates use. GLSL ES shares the
/// GLSL templates.
pub(crate) fn language_extension(language: &str) -> &str {
    if language == "glsles" {
        "glsl"
    } else {
        language
    }
}

/// Identity of one shader program: template name, stage, target language,
/// required profiles and the generation properties.
///
/// The stage/language/template/profile component of the hash is cached in
/// a `Cell` (0 is the dirty sentinel, like the property-store hash) and
/// recomputed lazily after any setter call; the property component is
/// cached by the store itself. Renders never mutate this store, they work
/// on a scratch copy, so the hash observed before generation still keys
/// the result.
#[derive(Debug, Clone)]
pub struct ShaderDatablock {
    template: String,
    stage: ShaderStage,
    language: String,
    profiles: Vec<String>,
    properties: PropertyStore,
    identity: Cell<u32>,
}

impl ShaderDatablock {
    #[must_use]
    pub fn new(template: impl Into<String>, stage: ShaderStage, language: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            stage,
            language: language.into(),
            profiles: Vec::new(),
            properties: PropertyStore::new(),
            identity: Cell::new(0),
        }
    }

    #[must_use]
    pub fn template(&self) -> &str {
        &self.template
    }

    #[must_use]
    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    #[must_use]
    pub fn language(&self) -> &str {
        &self.language
    }

    #[must_use]
    pub fn profiles(&self) -> &[String] {
        &self.profiles
    }

    #[must_use]
    pub fn properties(&self) -> &PropertyStore {
        &self.properties
    }

    pub fn properties_mut(&mut self) -> &mut PropertyStore {
        &mut self.properties
    }

    pub fn set_template(&mut self, template: impl Into<String>) {
        self.template = template.into();
        self.identity.set(0);
    }

    pub fn set_language(&mut self, language: impl Into<String>) {
        self.language = language.into();
        self.identity.set(0);
    }

    pub fn set_profiles(&mut self, profiles: Vec<String>) {
        self.profiles = profiles;
        self.identity.set(0);
    }

    /// Template file this datablock renders from, e.g. `Basic_vs.glslt`.
    #[must_use]
    pub fn template_file_name(&self) -> String {
        format!(
            "{}{}.{}t",
            self.template,
            self.stage.template_suffix(),
            language_extension(&self.language)
        )
    }

    /// Combined cache hash.
    ///
    /// XOR of the template name, stage suffix, language and profile-list
    /// hashes with the property-store hash. Profile hashing chains the
    /// seed through each entry, so profile order is significant.
    #[must_use]
    pub fn hash(&self) -> u32 {
        let mut base = self.identity.get();
        if base == 0 {
            base = hashing::hash_str(&self.template)
                ^ hashing::hash_str(self.stage.template_suffix())
                ^ hashing::hash_str(&self.language)
                ^ self
                    .profiles
                    .iter()
                    .fold(HASH_SEED, |seed, p| hashing::murmur3_32(p.as_bytes(), seed));
            self.identity.set(base);
        }
        base ^ self.properties.hash()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_file_names_follow_the_convention() {
        let block = ShaderDatablock::new("Basic", ShaderStage::Vertex, "glsl");
        assert_eq!(block.template_file_name(), "Basic_vs.glslt");

        let block = ShaderDatablock::new("Basic", ShaderStage::Fragment, "hlsl");
        assert_eq!(block.template_file_name(), "Basic_fs.hlslt");
    }

    #[test]
    fn glsles_shares_glsl_templates() {
        let block = ShaderDatablock::new("Basic", ShaderStage::Fragment, "glsles");
        assert_eq!(block.template_file_name(), "Basic_fs.glslt");
    }

    #[test]
    fn fragment_piece_tag_is_ps() {
        assert_eq!(ShaderStage::Fragment.piece_tag(), "piece_ps");
        assert_eq!(ShaderStage::Vertex.piece_tag(), "piece_vs");
    }

    #[test]
    fn equal_datablocks_hash_equally() {
        let mut a = ShaderDatablock::new("Basic", ShaderStage::Vertex, "glsl");
        let mut b = ShaderDatablock::new("Basic", ShaderStage::Vertex, "glsl");
        a.properties_mut().set_property("hlms_normal", 1);
        b.properties_mut().set_property("hlms_normal", 1);
        assert_eq!(a.hash(), b.hash());
    }

    #[test]
    fn every_identity_component_feeds_the_hash() {
        let base = ShaderDatablock::new("Basic", ShaderStage::Vertex, "glsl");
        let h = base.hash();

        let mut other = base.clone();
        other.set_template("Fancy");
        assert_ne!(other.hash(), h);

        let other = ShaderDatablock::new("Basic", ShaderStage::Fragment, "glsl");
        assert_ne!(other.hash(), h);

        let mut other = base.clone();
        other.set_language("hlsl");
        assert_ne!(other.hash(), h);

        let mut other = base.clone();
        other.set_profiles(vec!["vs_3_0".to_string()]);
        assert_ne!(other.hash(), h);

        let mut other = base.clone();
        other.properties_mut().set_property("hlms_skeleton", 1);
        assert_ne!(other.hash(), h);
    }

    #[test]
    fn setters_invalidate_the_cached_identity() {
        let mut block = ShaderDatablock::new("Basic", ShaderStage::Vertex, "glsl");
        let h1 = block.hash();
        assert_eq!(block.hash(), h1);

        block.set_language("hlsl");
        let h2 = block.hash();
        assert_ne!(h1, h2);

        block.set_language("glsl");
        assert_eq!(block.hash(), h1);
    }

    #[test]
    fn profile_order_is_significant() {
        let mut a = ShaderDatablock::new("Basic", ShaderStage::Vertex, "hlsl");
        a.set_profiles(vec!["vs_3_0".to_string(), "vs_2_0".to_string()]);
        let mut b = ShaderDatablock::new("Basic", ShaderStage::Vertex, "hlsl");
        b.set_profiles(vec!["vs_2_0".to_string(), "vs_3_0".to_string()]);
        assert_ne!(a.hash(), b.hash());
    }
}
