use mdui_compiler::{CompileOptions, InvalidBlockPolicy, compile};
use mdui_core::diagnostics::{DiagnosticCode, Severity};
use mdui_schema::SchemaRegistry;

struct Case {
    id: &'static str,
    source: &'static str,
    opts: CompileOptions,
    codes: Vec<DiagnosticCode>,
    valid: bool,
    blocks: usize,
}

fn lenient() -> CompileOptions {
    CompileOptions::default()
}

#[test]
fn diagnostics_matrix() {
    use DiagnosticCode::*;

    let cases = vec![
        Case {
            id: "clean",
            source: "# Title\n\nSee [the title](#title).\n",
            opts: lenient(),
            codes: vec![],
            valid: true,
            blocks: 2,
        },
        Case {
            id: "dangling-lenient",
            source: "See [x](#missing).\n",
            opts: lenient(),
            codes: vec![DanglingReference],
            valid: true,
            blocks: 1,
        },
        Case {
            id: "dangling-strict",
            source: "See [x](#missing).\n",
            opts: CompileOptions::strict(),
            codes: vec![DanglingReference],
            valid: false,
            blocks: 1,
        },
        Case {
            id: "unknown-component",
            source: "```ui:chart\nkind: bar\n```\n",
            opts: lenient(),
            codes: vec![UnknownComponent],
            valid: true,
            blocks: 1,
        },
        Case {
            id: "yaml-malformed",
            source: "```ui:poll\nquestion: [unclosed\n```\n",
            opts: lenient(),
            codes: vec![YamlMalformed],
            valid: false,
            blocks: 1,
        },
        Case {
            id: "yaml-not-mapping",
            source: "```ui:poll\n- a\n- b\n```\n",
            opts: lenient(),
            codes: vec![YamlMalformed],
            valid: false,
            blocks: 1,
        },
        Case {
            id: "unterminated-fence",
            source: "Intro\n\n```ui:poll\nquestion: Q\n",
            opts: lenient(),
            codes: vec![UnterminatedFence],
            valid: false,
            blocks: 1,
        },
        Case {
            id: "unterminated-fence-in-quote",
            source: "> ```ui:poll\n> question: Q\n",
            opts: lenient(),
            codes: vec![UnterminatedFence],
            valid: false,
            blocks: 1,
        },
        Case {
            id: "unterminated-fence-in-list",
            source: "- item\n\n  ```js\n  let x;\n",
            opts: lenient(),
            codes: vec![UnterminatedFence],
            valid: false,
            blocks: 1,
        },
        Case {
            id: "typed-fence-in-list",
            source: "- item\n\n  ```ui:poll\n  question: Q\n  options: []\n  ```\n",
            opts: lenient(),
            codes: vec![TypedBlockLifted, SchemaViolation],
            valid: false,
            // list, then the invalid poll kept at the top level
            blocks: 2,
        },
        Case {
            id: "typed-fence-in-quote",
            source: "> Before\n>\n> ```ui:callout\n> body: B\n> ```\n>\n> After\n",
            opts: lenient(),
            codes: vec![TypedBlockLifted],
            valid: true,
            blocks: 3,
        },
        Case {
            id: "frontmatter-malformed",
            source: "---\ntitle: [oops\n---\n\nBody\n",
            opts: lenient(),
            codes: vec![FrontmatterMalformed],
            valid: false,
            blocks: 1,
        },
        Case {
            id: "frontmatter-unterminated",
            source: "---\ntitle: x\n\nBody\n",
            opts: lenient(),
            codes: vec![FrontmatterUnterminated],
            valid: true,
            // the opening `---` is a thematic break
            blocks: 3,
        },
        Case {
            id: "unknown-field",
            source: "```ui:callout\nbody: B\ncolour: red\n```\n",
            opts: lenient(),
            codes: vec![UnknownField],
            valid: true,
            blocks: 1,
        },
        Case {
            id: "invalid-dropped",
            source: "Keep me\n\n```ui:poll\nquestion: Q\noptions: []\n```\n",
            opts: CompileOptions { invalid_blocks: InvalidBlockPolicy::Drop, ..CompileOptions::default() },
            codes: vec![SchemaViolation],
            valid: false,
            blocks: 1,
        },
        Case {
            id: "comparison-refinement",
            source: "```ui:comparison\noptions: [A, B]\nfeatures:\n  - name: Speed\n    values: [1]\n```\n",
            opts: lenient(),
            codes: vec![SchemaViolation],
            valid: false,
            blocks: 1,
        },
        Case {
            id: "layout-invalid",
            source: "---\nlayout:\n  spacing: huge\n---\n",
            opts: lenient(),
            codes: vec![InvalidLayout],
            valid: false,
            blocks: 0,
        },
    ];

    let registry = SchemaRegistry::default();
    let mut passed = 0usize;
    let total = cases.len();

    for c in cases {
        let out = compile(c.source, &registry, &c.opts);
        let codes: Vec<DiagnosticCode> = out.diagnostics.iter().map(|d| d.code).collect();
        assert_eq!(codes, c.codes, "case {}: {:?}", c.id, out.diagnostics);
        assert_eq!(out.is_valid(), c.valid, "case {}", c.id);
        assert_eq!(out.ir.blocks.len(), c.blocks, "case {}", c.id);
        passed += 1;
    }

    eprintln!("compile diagnostics conformance: {passed}/{total}");
}

#[test]
fn dangling_severity_follows_policy() {
    let registry = SchemaRegistry::default();
    let src = "One [a](#nope) and [b](#nope).\n";

    let lenient = compile(src, &registry, &CompileOptions::default());
    assert_eq!(lenient.diagnostics.len(), 2);
    assert!(lenient.diagnostics.iter().all(|d| d.severity == Severity::Warning));
    assert_eq!(lenient.ir.references.len(), 2);

    let strict = compile(src, &registry, &CompileOptions::strict());
    assert_eq!(strict.diagnostics.len(), 2);
    assert!(strict.diagnostics.iter().all(|d| d.severity == Severity::Error));
    // dangling references are reported, never removed
    assert_eq!(strict.ir.references, lenient.ir.references);
}

#[test]
fn document_id_comes_from_frontmatter_or_options() {
    let registry = SchemaRegistry::default();
    let from_frontmatter = compile("---\nid: guide\n---\n", &registry, &CompileOptions::default());
    assert_eq!(from_frontmatter.ir.id, "guide");

    let opts = CompileOptions { document_id: "fallback".to_string(), ..CompileOptions::default() };
    assert_eq!(compile("Body\n", &registry, &opts).ir.id, "fallback");
}
