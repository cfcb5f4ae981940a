pub mod cache;
pub mod datablock;
pub mod errors;
pub mod expression;
pub mod keys;
pub mod parser;
pub mod properties;
pub mod provider;
pub mod subview;
pub mod utils;

pub use cache::{render_source, ShaderCache};
pub use datablock::{ShaderDatablock, ShaderStage};
pub use errors::{HlmsError, Result, SyntaxError};
pub use parser::{RenderOutput, TemplateParser};
pub use properties::{PropertyKey, PropertyStore};
pub use provider::{DirectoryTemplateProvider, ProgramDescriptor, ShaderCompiler, TemplateProvider};
pub use subview::SubStringRef;
pub use utils::interner;
