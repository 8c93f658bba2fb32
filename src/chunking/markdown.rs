//! Markdown section splitter: one [`InfoSnippet`] per heading-delimited
//! section, with a breadcrumb built from the enclosing heading stack
//! (`"Guide > Installation > Prerequisites"`) and fenced code blocks pulled
//! out as `Example` snippets.

use pulldown_cmark::{Event, HeadingLevel, Parser, Tag, TagEnd};

use crate::domain::hashing::file_hash as whole_file_hash_fn;
use crate::domain::types::{Chunk, ChunkKind, InfoSnippet, SnippetKind};

struct Section {
    heading_stack: Vec<String>,
    start_line: u32,
    body: String,
}

pub fn extract(path: &str, content: &str) -> (Vec<Chunk>, Vec<InfoSnippet>) {
    let line_offsets = build_line_offsets(content);
    let whole_file_hash = whole_file_hash_fn(content.as_bytes());

    let mut sections: Vec<Section> = Vec::new();
    let mut heading_stack: Vec<(HeadingLevel, String)> = Vec::new();
    let mut current_heading_text = String::new();
    let mut in_heading = false;
    let mut current_body = String::new();
    let mut current_start_line = 1u32;
    let mut in_code_block = false;
    let mut examples: Vec<(u32, String)> = Vec::new();
    let mut code_start_line = 0u32;
    let mut code_body = String::new();

    let parser = Parser::new(content);
    for (event, range) in parser.into_offset_iter() {
        let line = byte_offset_to_line(&line_offsets, range.start);
        match event {
            Event::Start(Tag::Heading { level, .. }) => {
                if !current_body.trim().is_empty() {
                    sections.push(Section {
                        heading_stack: heading_stack.iter().map(|(_, t)| t.clone()).collect(),
                        start_line: current_start_line,
                        body: std::mem::take(&mut current_body),
                    });
                }
                while heading_stack.last().is_some_and(|(l, _)| *l >= level) {
                    heading_stack.pop();
                }
                in_heading = true;
                current_heading_text.clear();
                current_start_line = line;
            }
            Event::End(TagEnd::Heading(level)) => {
                in_heading = false;
                heading_stack.push((level, current_heading_text.trim().to_string()));
            }
            Event::Start(Tag::CodeBlock(_)) => {
                in_code_block = true;
                code_start_line = line;
                code_body.clear();
            }
            Event::End(TagEnd::CodeBlock) => {
                in_code_block = false;
                if !code_body.trim().is_empty() {
                    examples.push((code_start_line, std::mem::take(&mut code_body)));
                }
            }
            Event::Text(text) | Event::Code(text) => {
                if in_heading {
                    current_heading_text.push_str(&text);
                } else if in_code_block {
                    code_body.push_str(&text);
                } else {
                    current_body.push_str(&text);
                    current_body.push(' ');
                }
            }
            Event::SoftBreak | Event::HardBreak => current_body.push('\n'),
            _ => {}
        }
    }
    if !current_body.trim().is_empty() {
        sections.push(Section {
            heading_stack: heading_stack.iter().map(|(_, t)| t.clone()).collect(),
            start_line: current_start_line,
            body: current_body,
        });
    }

    let mut chunks = Vec::new();
    let mut snippets = Vec::new();
    for section in sections {
        let end_line = section.start_line + section.body.lines().count() as u32;
        let end_line = end_line.max(section.start_line);
        let breadcrumb = if section.heading_stack.is_empty() {
            None
        } else {
            Some(section.heading_stack.join(" > "))
        };

        // One document chunk per section, so the section is both searchable
        // (BM25/ANN index over `Chunk`) and linkable from its snippet.
        let mut chunk = Chunk::new(
            path.to_string(),
            section.start_line,
            end_line,
            ChunkKind::Document,
            section.body.trim().to_string(),
            "markdown".to_string(),
        )
        .with_file_hash(whole_file_hash.clone());
        chunk.breadcrumb = breadcrumb.clone();

        let mut snippet = InfoSnippet::new(
            path.to_string(),
            section.start_line,
            end_line,
            SnippetKind::MarkdownSection,
            section.body.trim().to_string(),
            "markdown".to_string(),
        );
        snippet.breadcrumb = breadcrumb;
        snippet.chunk_id = Some(chunk.id.clone());

        chunks.push(chunk);
        snippets.push(snippet);
    }
    for (start_line, body) in examples {
        let end_line = start_line + body.lines().count() as u32;
        snippets.push(InfoSnippet::new(
            path.to_string(),
            start_line,
            end_line.max(start_line),
            SnippetKind::Example,
            body.trim().to_string(),
            "markdown".to_string(),
        ));
    }

    (chunks, snippets)
}

fn build_line_offsets(content: &str) -> Vec<usize> {
    let mut offsets = vec![0];
    for (idx, ch) in content.char_indices() {
        if ch == '\n' {
            offsets.push(idx + 1);
        }
    }
    offsets
}

fn byte_offset_to_line(offsets: &[usize], byte_offset: usize) -> u32 {
    match offsets.binary_search(&byte_offset) {
        Ok(idx) => idx as u32 + 1,
        Err(idx) => idx as u32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_sections_by_heading() {
        let src = "# Title\n\nIntro text.\n\n## Sub\n\nSub body.\n";
        let (_, snippets) = extract("README.md", src);
        assert!(snippets.iter().any(|s| s.content.contains("Intro")));
        assert!(snippets.iter().any(|s| s.breadcrumb.as_deref() == Some("Title > Sub")));
    }

    #[test]
    fn extracts_fenced_code_as_example() {
        let src = "# Title\n\n```rust\nfn x() {}\n```\n";
        let (_, snippets) = extract("doc.md", src);
        assert!(snippets
            .iter()
            .any(|s| matches!(s.kind, SnippetKind::Example) && s.content.contains("fn x()")));
    }

    #[test]
    fn each_section_gets_a_document_chunk_linked_by_chunk_id() {
        let src = "# Title\n\nIntro text.\n\n## Sub\n\nSub body.\n";
        let (chunks, snippets) = extract("README.md", src);
        assert_eq!(chunks.len(), 2);
        assert!(chunks.iter().all(|c| c.kind == ChunkKind::Document));

        let sub_snippet = snippets
            .iter()
            .find(|s| matches!(s.kind, SnippetKind::MarkdownSection) && s.content.contains("Sub body"))
            .expect("sub-section snippet");
        let chunk_id = sub_snippet.chunk_id.as_ref().expect("chunk_id must be set");
        let linked_chunk = chunks.iter().find(|c| &c.id == chunk_id).expect("matching chunk");
        assert!(linked_chunk.content.contains("Sub body"));
    }

    #[test]
    fn examples_are_not_linked_to_a_chunk() {
        let src = "# Title\n\n```rust\nfn x() {}\n```\n";
        let (_, snippets) = extract("doc.md", src);
        let example = snippets.iter().find(|s| matches!(s.kind, SnippetKind::Example)).unwrap();
        assert!(example.chunk_id.is_none());
    }
}
