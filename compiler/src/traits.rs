use crate::{
    emit::{EmitContext, EmitOptions, SourceUnit},
    error::AdlError,
};

/// A code generation target.
///
/// An emitter turns one resolved module into one source unit. Every
/// declaration kind goes through the same dispatch, so supporting another
/// language only needs another implementation of this trait and an entry in
/// [`crate::emit::EMITTERS`].
pub trait Emitter: Send + Sync {
    /// Identifier used in configuration and on the command line.
    fn name(&self) -> &'static str;

    /// File extension of generated units, without the dot.
    fn extension(&self) -> &'static str;

    fn emit(&self, ctx: &EmitContext, module: &str, options: &EmitOptions) -> Result<SourceUnit, AdlError>;
}
