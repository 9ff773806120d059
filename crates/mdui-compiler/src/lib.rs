#![doc = r#"
⚠️ INTERNAL CRATE – NOT A STABLE API

Markdown dialect → IR compiler: extension parser, inline converter,
container compiler, translator with deterministic ids, and the reference
resolver. Use `mdui-io` instead of depending on this crate directly.
"#]

pub mod container;
pub mod ids;
pub mod inline;
pub mod options;
pub mod parser;
pub mod resolve;
pub mod translate;

use std::collections::HashSet;

use tracing::debug;

use mdui_core::diagnostics::{Diagnostic, DiagnosticCode, has_errors};
use mdui_core::model::Document;
use mdui_schema::{SchemaRegistry, ValidateOptions, validate_ir};

pub use options::{CompileOptions, InvalidBlockPolicy};

/// Result of [`compile`]. The IR is always produced; `diagnostics` say
/// whether it can be trusted.
#[derive(Debug, Clone, PartialEq)]
pub struct Compilation {
    pub ir: Document,
    pub diagnostics: Vec<Diagnostic>,
}

impl Compilation {
    /// False when any error diagnostic was reported.
    pub fn is_valid(&self) -> bool {
        !has_errors(&self.diagnostics)
    }
}

/// Compile source text to IR.
pub fn compile(source: &str, registry: &SchemaRegistry, opts: &CompileOptions) -> Compilation {
    let raw = parser::parse(source);
    let mut diagnostics = raw.diagnostics;

    let mut translator = translate::Translator::new(registry, &raw.index, opts.invalid_blocks);
    let drafts = translator.translate(raw.nodes, 0);
    let orphaned = translator.into_orphaned();

    let (blocks, block_diags) = ids::assign_ids(drafts);
    diagnostics.extend(block_diags);
    diagnostics.extend(orphaned);

    let resolution = resolve::resolve(&blocks, registry, opts.dangling_references);
    diagnostics.extend(resolution.diagnostics);

    let mut ir = Document::new(raw.frontmatter.document_id.unwrap_or_else(|| opts.document_id.clone()));
    ir.metadata = raw.frontmatter.metadata;
    ir.layout = raw.frontmatter.layout;
    ir.blocks = blocks;
    ir.references = resolution.references;

    if opts.validate {
        let validate_opts = ValidateOptions {
            dangling_references: opts.dangling_references,
            ..ValidateOptions::default()
        };
        // Findings the compiler already reported (same code, block and path)
        // are not repeated; `invalid_block` restates a reported payload error.
        let seen: HashSet<_> = diagnostics.iter().map(dedup_key).collect();
        let extra: Vec<Diagnostic> = validate_ir(&ir, registry, &validate_opts)
            .into_iter()
            .filter(|d| d.code != DiagnosticCode::InvalidBlock && !seen.contains(&dedup_key(d)))
            .collect();
        diagnostics.extend(extra);
    }

    debug!(
        document = %ir.id,
        blocks = ir.blocks.len(),
        references = ir.references.len(),
        diagnostics = diagnostics.len(),
        errors = has_errors(&diagnostics),
        "compiled document"
    );

    Compilation { ir, diagnostics }
}

fn dedup_key(d: &Diagnostic) -> (DiagnosticCode, Option<String>, Option<String>) {
    (d.code, d.block_id.clone(), d.path.clone())
}
