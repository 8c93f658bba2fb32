//! Per-language grammar registry: maps a file extension to the tree-sitter
//! grammar and the node-kind tables [`treewalk`](super::treewalk) needs to
//! tell a callable declaration from a type declaration from a comment.
//!
//! Swift gets the richest table because spec.md's [`ChunkKind`] vocabulary
//! (`Protocol`, `Actor`, `Extension`, `Initializer`, `Subscript`,
//! `Typealias`) is drawn from it — every other language maps onto the
//! smaller `Function`/`Method`/`Class`/`Struct`/`Enum` subset.

use crate::domain::types::ChunkKind;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Everything [`super::treewalk::extract`] needs to drive one grammar.
pub struct LanguageSpec {
    pub language_name: &'static str,
    pub ts_language: fn() -> tree_sitter::Language,
    /// Node kinds treated as function-like chunks.
    pub callable_kinds: &'static [(&'static str, ChunkKind)],
    /// Node kinds treated as type declarations — emitted as two chunks when
    /// the node declares a conformance (see `conformance_field`), one
    /// full-body chunk otherwise.
    pub type_kinds: &'static [(&'static str, ChunkKind)],
    /// Node kinds treated as leading doc comments.
    pub comment_kinds: &'static [&'static str],
    /// Field name (if any) on a type-declaration node holding its
    /// conformance/supertype list, used for `Chunk::conformances`.
    pub conformance_field: Option<&'static str>,
}

macro_rules! lang {
    ($fn_name:ident, $crate_mod:ident) => {
        fn $fn_name() -> tree_sitter::Language {
            $crate_mod::LANGUAGE.into()
        }
    };
}

lang!(rust_language, tree_sitter_rust);
lang!(python_language, tree_sitter_python);
lang!(java_language, tree_sitter_java);
lang!(go_language, tree_sitter_go);
lang!(c_language, tree_sitter_c);
lang!(cpp_language, tree_sitter_cpp);
lang!(c_sharp_language, tree_sitter_c_sharp);
lang!(ruby_language, tree_sitter_ruby);
lang!(swift_language, tree_sitter_swift);
lang!(json_language, tree_sitter_json);
lang!(yaml_language, tree_sitter_yaml);

fn javascript_language() -> tree_sitter::Language {
    tree_sitter_javascript::LANGUAGE.into()
}

fn typescript_language() -> tree_sitter::Language {
    tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into()
}

fn php_language() -> tree_sitter::Language {
    tree_sitter_php::LANGUAGE_PHP.into()
}

fn kotlin_language() -> tree_sitter::Language {
    tree_sitter_kotlin_ng::LANGUAGE.into()
}

const RUST: LanguageSpec = LanguageSpec {
    language_name: "rust",
    ts_language: rust_language,
    callable_kinds: &[("function_item", ChunkKind::Function)],
    type_kinds: &[
        ("struct_item", ChunkKind::Struct),
        ("enum_item", ChunkKind::Enum),
        ("trait_item", ChunkKind::Protocol),
        ("impl_item", ChunkKind::Extension),
        ("mod_item", ChunkKind::Class),
        ("type_item", ChunkKind::Typealias),
    ],
    comment_kinds: &["line_comment", "block_comment"],
    conformance_field: None,
};

const PYTHON: LanguageSpec = LanguageSpec {
    language_name: "python",
    ts_language: python_language,
    callable_kinds: &[("function_definition", ChunkKind::Function)],
    type_kinds: &[("class_definition", ChunkKind::Class)],
    comment_kinds: &["comment"],
    conformance_field: Some("superclasses"),
};

const JAVASCRIPT: LanguageSpec = LanguageSpec {
    language_name: "javascript",
    ts_language: javascript_language,
    callable_kinds: &[
        ("function_declaration", ChunkKind::Function),
        ("method_definition", ChunkKind::Method),
    ],
    type_kinds: &[("class_declaration", ChunkKind::Class)],
    comment_kinds: &["comment"],
    conformance_field: Some("heritage"),
};

const TYPESCRIPT: LanguageSpec = LanguageSpec {
    language_name: "typescript",
    ts_language: typescript_language,
    callable_kinds: &[
        ("function_declaration", ChunkKind::Function),
        ("method_definition", ChunkKind::Method),
    ],
    type_kinds: &[
        ("class_declaration", ChunkKind::Class),
        ("interface_declaration", ChunkKind::Protocol),
        ("type_alias_declaration", ChunkKind::Typealias),
        ("enum_declaration", ChunkKind::Enum),
    ],
    comment_kinds: &["comment"],
    conformance_field: Some("heritage"),
};

const JAVA: LanguageSpec = LanguageSpec {
    language_name: "java",
    ts_language: java_language,
    callable_kinds: &[
        ("method_declaration", ChunkKind::Method),
        ("constructor_declaration", ChunkKind::Initializer),
    ],
    type_kinds: &[
        ("class_declaration", ChunkKind::Class),
        ("interface_declaration", ChunkKind::Protocol),
        ("enum_declaration", ChunkKind::Enum),
    ],
    comment_kinds: &["line_comment", "block_comment"],
    conformance_field: Some("interfaces"),
};

const GO: LanguageSpec = LanguageSpec {
    language_name: "go",
    ts_language: go_language,
    callable_kinds: &[
        ("function_declaration", ChunkKind::Function),
        ("method_declaration", ChunkKind::Method),
    ],
    type_kinds: &[("type_declaration", ChunkKind::Struct)],
    comment_kinds: &["comment"],
    conformance_field: None,
};

const C: LanguageSpec = LanguageSpec {
    language_name: "c",
    ts_language: c_language,
    callable_kinds: &[("function_definition", ChunkKind::Function)],
    type_kinds: &[
        ("struct_specifier", ChunkKind::Struct),
        ("enum_specifier", ChunkKind::Enum),
    ],
    comment_kinds: &["comment"],
    conformance_field: None,
};

const CPP: LanguageSpec = LanguageSpec {
    language_name: "cpp",
    ts_language: cpp_language,
    callable_kinds: &[("function_definition", ChunkKind::Function)],
    type_kinds: &[
        ("class_specifier", ChunkKind::Class),
        ("struct_specifier", ChunkKind::Struct),
        ("enum_specifier", ChunkKind::Enum),
    ],
    comment_kinds: &["comment"],
    conformance_field: Some("base_class_clause"),
};

const C_SHARP: LanguageSpec = LanguageSpec {
    language_name: "c_sharp",
    ts_language: c_sharp_language,
    callable_kinds: &[
        ("method_declaration", ChunkKind::Method),
        ("constructor_declaration", ChunkKind::Initializer),
    ],
    type_kinds: &[
        ("class_declaration", ChunkKind::Class),
        ("interface_declaration", ChunkKind::Protocol),
        ("struct_declaration", ChunkKind::Struct),
        ("enum_declaration", ChunkKind::Enum),
    ],
    comment_kinds: &["comment"],
    conformance_field: Some("bases"),
};

const RUBY: LanguageSpec = LanguageSpec {
    language_name: "ruby",
    ts_language: ruby_language,
    callable_kinds: &[("method", ChunkKind::Method)],
    type_kinds: &[("class", ChunkKind::Class), ("module", ChunkKind::Class)],
    comment_kinds: &["comment"],
    conformance_field: Some("superclass"),
};

const PHP: LanguageSpec = LanguageSpec {
    language_name: "php",
    ts_language: php_language,
    callable_kinds: &[
        ("function_definition", ChunkKind::Function),
        ("method_declaration", ChunkKind::Method),
    ],
    type_kinds: &[
        ("class_declaration", ChunkKind::Class),
        ("interface_declaration", ChunkKind::Protocol),
    ],
    comment_kinds: &["comment"],
    conformance_field: Some("base_clause"),
};

const KOTLIN: LanguageSpec = LanguageSpec {
    language_name: "kotlin",
    ts_language: kotlin_language,
    callable_kinds: &[("function_declaration", ChunkKind::Function)],
    type_kinds: &[
        ("class_declaration", ChunkKind::Class),
        ("object_declaration", ChunkKind::Class),
    ],
    comment_kinds: &["line_comment", "multiline_comment"],
    conformance_field: Some("delegation_specifiers"),
};

/// Swift is the flagship native structural parser: its grammar is the only
/// one that actually exercises `Protocol`/`Actor`/`Extension`/
/// `Initializer`/`Subscript`/`Typealias` chunk kinds end to end.
const SWIFT: LanguageSpec = LanguageSpec {
    language_name: "swift",
    ts_language: swift_language,
    callable_kinds: &[
        ("function_declaration", ChunkKind::Function),
        ("init_declaration", ChunkKind::Initializer),
        ("subscript_declaration", ChunkKind::Subscript),
    ],
    type_kinds: &[
        ("class_declaration", ChunkKind::Class),
        ("protocol_declaration", ChunkKind::Protocol),
        ("extension_declaration", ChunkKind::Extension),
        ("enum_declaration", ChunkKind::Enum),
        ("typealias_declaration", ChunkKind::Typealias),
    ],
    comment_kinds: &["comment", "multiline_comment"],
    conformance_field: Some("inheritance_specifier"),
};

static REGISTRY: LazyLock<HashMap<&'static str, &'static LanguageSpec>> = LazyLock::new(|| {
    let mut m: HashMap<&'static str, &'static LanguageSpec> = HashMap::new();
    m.insert("rs", &RUST);
    m.insert("py", &PYTHON);
    m.insert("js", &JAVASCRIPT);
    m.insert("jsx", &JAVASCRIPT);
    m.insert("mjs", &JAVASCRIPT);
    m.insert("ts", &TYPESCRIPT);
    m.insert("tsx", &TYPESCRIPT);
    m.insert("java", &JAVA);
    m.insert("go", &GO);
    m.insert("c", &C);
    m.insert("h", &C);
    m.insert("cc", &CPP);
    m.insert("cpp", &CPP);
    m.insert("cxx", &CPP);
    m.insert("hpp", &CPP);
    // No Objective-C grammar is available in the dependency stack; `.m`/`.mm`
    // fall through to the regex/brace fallback chunker rather than the C
    // grammar, which would misparse `@interface`/`@implementation` blocks.
    m.insert("cs", &C_SHARP);
    m.insert("rb", &RUBY);
    m.insert("php", &PHP);
    m.insert("kt", &KOTLIN);
    m.insert("kts", &KOTLIN);
    m.insert("swift", &SWIFT);
    m
});

pub fn lookup(extension: &str) -> Option<&'static LanguageSpec> {
    REGISTRY.get(extension).copied()
}

pub fn language_name_for_extension(extension: &str) -> &'static str {
    lookup(extension).map(|s| s.language_name).unwrap_or("plaintext")
}

pub(super) fn json_spec() -> (fn() -> tree_sitter::Language, &'static str) {
    (json_language, "json")
}

pub(super) fn yaml_spec() -> (fn() -> tree_sitter::Language, &'static str) {
    (yaml_language, "yaml")
}
