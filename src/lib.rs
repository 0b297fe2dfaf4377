pub mod errors;
pub mod frontend;
pub mod index;
pub mod middle;

use crate::{
    errors::CompileError,
    frontend::{SourceFile, ast, parser::Parser},
    middle::{resolve, tac, type_check},
};

/// Parses and fully analyzes a source file. Parse faults abort the process;
/// everything later comes back as a [`CompileError`].
pub fn analyze(
    source: &SourceFile,
) -> Result<(ast::Program<'_>, resolve::NameResolution, type_check::TypeCheckResults), CompileError>
{
    let program = Parser::parse_program(source);
    let resolution = resolve::resolve_program(&program)?;
    let types = type_check::check_program(&program, &resolution)?;

    Ok((program, resolution, types))
}

/// The whole pipeline: parse, resolve names, check types, and flatten to
/// three address code
pub fn compile(source: &SourceFile) -> Result<tac::Program, CompileError> {
    let (program, resolution, types) = analyze(source)?;

    tac::lowering::lower_program(&program, &resolution, &types)
}
