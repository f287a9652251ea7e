//! Semantic HTML generation.
//!
//! Lowers a section tree into an HTML skeleton: one `main` landmark, one
//! `section` per heading with `hN` levels mirroring the tree, and list or
//! table containers for runs of list items, citations and table rows. No
//! styling is emitted; accessibility styling belongs to the enhancer.

use std::collections::BTreeMap;
use std::fmt::Write;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};

use crate::classify::rules::split_cells;
use crate::config::GeneratorConfig;
use crate::dom::escape_html;
use crate::model::{
    BlockKind, ImageAsset, ImageSource, LineStream, Section, SectionChild, StructuralBlock,
    TableAsset,
};
use crate::patterns::TABLE_CAPTION_RE;
use crate::slug::SlugRegistry;

/// Id of the main landmark.
pub const MAIN_ID: &str = "main-content";

/// Characters escaped in relative image paths.
const PATH_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Extracted assets and the stream that locates blocks on pages.
#[derive(Debug, Clone, Copy)]
pub struct PageAssets<'a> {
    pub stream: &'a LineStream,
    pub images: &'a [ImageAsset],
    pub tables: &'a [TableAsset],
}

/// Generate a document from a section tree.
pub fn generate(root: &Section, title: &str, config: &GeneratorConfig) -> String {
    generate_with_assets(root, title, config, None)
}

/// Generate a document, placing extracted images and tables after the last
/// block of their page.
pub fn generate_with_assets(
    root: &Section,
    title: &str,
    config: &GeneratorConfig,
    assets: Option<PageAssets<'_>>,
) -> String {
    let mut generator = HtmlGenerator::new(config);
    if let Some(assets) = assets {
        generator.plan_assets(root, assets);
    }
    generator.document(root, title)
}

enum Asset<'a> {
    Image(&'a ImageAsset),
    Table(&'a TableAsset),
}

struct HtmlGenerator<'a> {
    config: &'a GeneratorConfig,
    slugs: SlugRegistry,
    out: String,
    /// Non-heading blocks rendered so far.
    ordinal: usize,
    tables: usize,
    references: usize,
    /// Assets to emit once the block with the given ordinal is rendered.
    placements: BTreeMap<usize, Vec<Asset<'a>>>,
    trailing: Vec<Asset<'a>>,
}

impl<'a> HtmlGenerator<'a> {
    fn new(config: &'a GeneratorConfig) -> Self {
        Self {
            config,
            slugs: SlugRegistry::with_reserved([MAIN_ID]),
            out: String::new(),
            ordinal: 0,
            tables: 0,
            references: 0,
            placements: BTreeMap::new(),
            trailing: Vec::new(),
        }
    }

    /// Map each asset to the last block of its page.
    fn plan_assets(&mut self, root: &Section, assets: PageAssets<'a>) {
        let mut last_on_page: BTreeMap<usize, usize> = BTreeMap::new();
        let mut ordinal = 0;
        visit_blocks(root, &mut |block| {
            let page = assets.stream.page_of(block.source_line_range.end);
            last_on_page.insert(page, ordinal);
            ordinal += 1;
        });

        let mut place = |page: usize, asset: Asset<'a>| match last_on_page.get(&page) {
            Some(&ord) => self.placements.entry(ord).or_default().push(asset),
            None => self.trailing.push(asset),
        };
        for image in assets.images {
            place(image.page, Asset::Image(image));
        }
        for table in assets.tables {
            place(table.page, Asset::Table(table));
        }
    }

    fn document(mut self, root: &Section, title: &str) -> String {
        let _ = write!(
            self.out,
            "<!DOCTYPE html>\n<html lang=\"{}\">\n<head>\n\
             <meta charset=\"utf-8\">\n\
             <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
             <title>{}</title>\n</head>\n<body>\n<main id=\"{}\">\n",
            escape_html(&self.config.language),
            escape_html(title),
            MAIN_ID
        );
        self.children(root);
        for asset in std::mem::take(&mut self.trailing) {
            self.asset(&asset);
        }
        self.out.push_str("</main>\n</body>\n</html>\n");
        self.out
    }

    fn section(&mut self, section: &Section) {
        let Some(heading) = &section.heading else {
            self.children(section);
            return;
        };
        let slug = self.slugs.unique(&heading.text, "section");
        let level = section.level.clamp(1, 6);
        let _ = writeln!(self.out, "<section id=\"{slug}\" aria-labelledby=\"{slug}-heading\">");
        let _ = write!(self.out, "<h{level} id=\"{slug}-heading\">");
        if let Some(num) = &heading.numbering {
            let dot = if num.contains('.') { "" } else { "." };
            let _ = write!(self.out, "<span class=\"section-number\">{}{}</span> ", escape_html(num), dot);
        }
        let _ = writeln!(self.out, "{}</h{level}>", escape_html(&heading.text));
        self.children(section);
        self.out.push_str("</section>\n");
    }

    fn children(&mut self, section: &Section) {
        let heading = section.title();
        let children = &section.children;
        let mut i = 0;

        while i < children.len() {
            let block = match &children[i] {
                SectionChild::Section(sub) => {
                    self.section(sub);
                    i += 1;
                    continue;
                }
                SectionChild::Block(block) => block,
            };

            let end = run_end(children, i);
            let run = blocks_in(&children[i..end]);

            match block.kind {
                BlockKind::Paragraph => {
                    // A "Table N" paragraph directly before a table run is its caption.
                    let before_table = matches!(
                        children.get(end),
                        Some(SectionChild::Block(b)) if b.kind == BlockKind::TableRow
                    );
                    let caption = run
                        .last()
                        .filter(|p| before_table && TABLE_CAPTION_RE.is_match(&p.text));
                    let body = if caption.is_some() { &run[..run.len() - 1] } else { &run[..] };
                    for p in body {
                        let _ = writeln!(self.out, "<p>{}</p>", escape_html(&p.text));
                    }
                    if let Some(caption) = caption {
                        self.advance(body.len());
                        let table_end = run_end_at(children, end);
                        let rows = blocks_in(&children[end..table_end]);
                        self.table_run(&rows, Some(&caption.text));
                        self.advance(rows.len() + 1);
                        i = table_end;
                        continue;
                    }
                }
                BlockKind::ListItem => self.list_run(&run),
                BlockKind::ReferenceEntry => self.reference_run(&run),
                BlockKind::TableRow => {
                    let caption = (i == 0).then_some(heading).flatten();
                    self.table_run(&run, caption);
                }
                BlockKind::Unclassified => {
                    for b in &run {
                        self.unclassified(b);
                    }
                }
                BlockKind::Heading => {}
            }

            self.advance(run.len());
            i = end;
        }
    }

    fn list_run(&mut self, run: &[&StructuralBlock]) {
        let ordered = run[0]
            .numbering
            .as_deref()
            .is_some_and(|m| m.chars().any(char::is_alphanumeric));
        let tag = if ordered { "ol" } else { "ul" };
        let _ = writeln!(self.out, "<{tag}>");
        for item in run {
            let _ = writeln!(self.out, "<li>{}</li>", escape_html(&item.text));
        }
        let _ = writeln!(self.out, "</{tag}>");
    }

    fn reference_run(&mut self, run: &[&StructuralBlock]) {
        self.out.push_str("<ol class=\"references-list\">\n");
        for entry in run {
            self.references += 1;
            let number = entry
                .numbering
                .as_deref()
                .and_then(|n| n.parse::<usize>().ok())
                .unwrap_or(self.references);
            let id = self.slugs.claim(format!("ref-{number}"));
            let _ = writeln!(
                self.out,
                "<li id=\"{id}\" value=\"{number}\">{}</li>",
                escape_html(&entry.text)
            );
        }
        self.out.push_str("</ol>\n");
    }

    fn table_run(&mut self, run: &[&StructuralBlock], caption: Option<&str>) {
        let rows: Vec<Vec<String>> = run
            .iter()
            .map(|b| split_cells(&b.text).map_or_else(|| vec![b.text.clone()], |(_, cells)| cells))
            .collect();
        let Some((header, body)) = rows.split_first() else {
            return;
        };
        self.table(caption, header, body);
    }

    fn table(&mut self, caption: Option<&str>, header: &[String], body: &[Vec<String>]) {
        self.tables += 1;
        let number = caption
            .and_then(|c| TABLE_CAPTION_RE.captures(c))
            .and_then(|c| c["num"].parse::<usize>().ok())
            .unwrap_or(self.tables);
        let id = self.slugs.claim(format!("table-{number}"));

        let _ = writeln!(self.out, "<table id=\"{id}\">");
        if let Some(caption) = caption {
            let _ = writeln!(self.out, "<caption>{}</caption>", escape_html(caption));
        }
        self.out.push_str("<thead>\n<tr>");
        for cell in header {
            let _ = write!(self.out, "<th scope=\"col\">{}</th>", escape_html(cell));
        }
        self.out.push_str("</tr>\n</thead>\n");
        if !body.is_empty() {
            self.out.push_str("<tbody>\n");
            for row in body {
                self.out.push_str("<tr>");
                for cell in row {
                    let _ = write!(self.out, "<td>{}</td>", escape_html(cell));
                }
                self.out.push_str("</tr>\n");
            }
            self.out.push_str("</tbody>\n");
        }
        self.out.push_str("</table>\n");
    }

    fn unclassified(&mut self, block: &StructuralBlock) {
        if !block.needs_review(self.config.review_threshold) {
            // Page furniture such as running page numbers.
            return;
        }
        let _ = writeln!(
            self.out,
            "<div class=\"needs-review\" role=\"note\" data-confidence=\"{:.2}\">\n\
             <p>Reading order of the following text could not be determined.</p>\n\
             <pre>{}</pre>\n</div>",
            block.confidence,
            escape_html(&block.text)
        );
    }

    /// Count `n` rendered blocks and emit the assets placed after them.
    fn advance(&mut self, n: usize) {
        let start = self.ordinal;
        self.ordinal += n;
        let keys: Vec<usize> = self
            .placements
            .range(start..self.ordinal)
            .map(|(&k, _)| k)
            .collect();
        for key in keys {
            for asset in self.placements.remove(&key).unwrap_or_default() {
                self.asset(&asset);
            }
        }
    }

    fn asset(&mut self, asset: &Asset<'_>) {
        match asset {
            Asset::Image(image) => self.image(image),
            Asset::Table(table) => {
                let fallback = format!("Table from page {}", table.page);
                let caption = table.caption.clone().unwrap_or(fallback);
                let (header, body) = if table.headers.is_empty() {
                    match table.rows.split_first() {
                        Some((h, b)) => (h.as_slice(), b),
                        None => return,
                    }
                } else {
                    (table.headers.as_slice(), table.rows.as_slice())
                };
                self.table(Some(&caption), header, body);
            }
        }
    }

    fn image(&mut self, image: &ImageAsset) {
        let src = match &image.source {
            ImageSource::Path(path) => {
                utf8_percent_encode(&path.to_string_lossy().replace('\\', "/"), PATH_SET).to_string()
            }
            ImageSource::Data { mime, bytes } => {
                format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
            }
        };
        let fallback = format!("Figure from page {}", image.page);
        let alt = image.alt.as_deref().unwrap_or(&fallback);

        let _ = write!(
            self.out,
            "<p><img src=\"{}\" alt=\"{}\" data-image-id=\"{}\"",
            escape_html(&src),
            escape_html(alt),
            escape_html(&image.id)
        );
        if let (Some(w), Some(h)) = (image.width, image.height) {
            let _ = write!(self.out, " width=\"{w}\" height=\"{h}\"");
        }
        self.out.push_str("></p>\n");
        if let Some(caption) = &image.caption {
            let _ = writeln!(self.out, "<p>{}</p>", escape_html(caption));
        }
    }
}

/// End of the same-kind block run starting at `start`.
fn run_end(children: &[SectionChild], start: usize) -> usize {
    let kind = match &children[start] {
        SectionChild::Block(b) => b.kind,
        SectionChild::Section(_) => return start + 1,
    };
    let mut end = start + 1;
    while let Some(SectionChild::Block(b)) = children.get(end) {
        if b.kind != kind || (kind == BlockKind::ListItem && list_style_changes(&children[start], b)) {
            break;
        }
        end += 1;
    }
    end
}

fn run_end_at(children: &[SectionChild], start: usize) -> usize {
    if start >= children.len() {
        return start;
    }
    run_end(children, start)
}

fn list_style_changes(first: &SectionChild, item: &StructuralBlock) -> bool {
    let ordered = |b: &StructuralBlock| {
        b.numbering
            .as_deref()
            .is_some_and(|m| m.chars().any(char::is_alphanumeric))
    };
    matches!(first, SectionChild::Block(f) if ordered(f) != ordered(item))
}

fn blocks_in(children: &[SectionChild]) -> Vec<&StructuralBlock> {
    children
        .iter()
        .filter_map(|c| match c {
            SectionChild::Block(b) => Some(b),
            SectionChild::Section(_) => None,
        })
        .collect()
}

/// Visit non-heading blocks in document order.
fn visit_blocks<'s>(section: &'s Section, visit: &mut impl FnMut(&'s StructuralBlock)) {
    for child in &section.children {
        match child {
            SectionChild::Block(b) => visit(b),
            SectionChild::Section(s) => visit_blocks(s, visit),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assemble::assemble;
    use crate::model::LineRange;

    fn block(kind: BlockKind, text: &str, line: usize) -> StructuralBlock {
        StructuralBlock::new(kind, text, LineRange::single(line), 0.9)
    }

    fn heading(level: u8, text: &str) -> StructuralBlock {
        StructuralBlock::heading(level, text, LineRange::single(0), 0.9)
    }

    fn render(blocks: &[StructuralBlock]) -> String {
        generate(&assemble(blocks), "Doc", &GeneratorConfig::default())
    }

    #[test]
    fn skeleton() {
        let html = render(&[
            heading(1, "INTRODUCTION").with_numbering("I"),
            block(BlockKind::Paragraph, "This is body text.", 1),
            heading(2, "Background").with_numbering("1.1"),
            block(BlockKind::Paragraph, "More text.", 3),
        ]);
        assert!(html.starts_with("<!DOCTYPE html>\n<html lang=\"en\">"));
        assert!(html.contains("<title>Doc</title>"));
        assert_eq!(html.matches("<main id=\"main-content\">").count(), 1);
        assert!(html.contains(
            "<section id=\"introduction\" aria-labelledby=\"introduction-heading\">"
        ));
        assert!(html.contains(
            "<h1 id=\"introduction-heading\"><span class=\"section-number\">I.</span> INTRODUCTION</h1>"
        ));
        assert!(html.contains("<h2 id=\"background-heading\"><span class=\"section-number\">1.1</span> Background</h2>"));
        // The subsection is nested inside the first section.
        let inner = html.find("<section id=\"background\"").unwrap();
        let outer_close = html.rfind("</section>").unwrap();
        assert!(inner < outer_close);
        assert!(!html.contains("<style"));
    }

    #[test]
    fn list_runs_group_and_split_by_style() {
        let html = render(&[
            block(BlockKind::ListItem, "one", 0).with_numbering("-"),
            block(BlockKind::ListItem, "two", 1).with_numbering("-"),
            block(BlockKind::ListItem, "first", 2).with_numbering("1."),
        ]);
        assert!(html.contains("<ul>\n<li>one</li>\n<li>two</li>\n</ul>"));
        assert!(html.contains("<ol>\n<li>first</li>\n</ol>"));
    }

    #[test]
    fn references_get_ids() {
        let html = render(&[
            heading(1, "References"),
            block(BlockKind::ReferenceEntry, "A. Smith.", 1).with_numbering("1"),
            block(BlockKind::ReferenceEntry, "B. Jones.", 2).with_numbering("2"),
        ]);
        assert!(html.contains("<ol class=\"references-list\">"));
        assert!(html.contains("<li id=\"ref-1\" value=\"1\">A. Smith.</li>"));
        assert!(html.contains("<li id=\"ref-2\" value=\"2\">B. Jones.</li>"));
    }

    #[test]
    fn table_with_caption_paragraph() {
        let html = render(&[
            heading(1, "Results"),
            block(BlockKind::Paragraph, "Some text.", 1),
            block(BlockKind::Paragraph, "Table 2: Scores", 2),
            block(BlockKind::TableRow, "Name   Score", 3),
            block(BlockKind::TableRow, "Alice   91", 4),
        ]);
        assert!(html.contains("<table id=\"table-2\">\n<caption>Table 2: Scores</caption>"));
        assert!(html.contains("<th scope=\"col\">Name</th><th scope=\"col\">Score</th>"));
        assert!(html.contains("<td>Alice</td><td>91</td>"));
        assert!(!html.contains("<p>Table 2: Scores</p>"));
    }

    #[test]
    fn table_opening_section_uses_heading_caption() {
        let html = render(&[
            heading(2, "Benchmarks"),
            block(BlockKind::TableRow, "a | b", 1),
            block(BlockKind::TableRow, "1 | 2", 2),
        ]);
        assert!(html.contains("<table id=\"table-1\">\n<caption>Benchmarks</caption>"));
    }

    #[test]
    fn review_regions_and_page_furniture() {
        let html = render(&[
            StructuralBlock::new(BlockKind::Unclassified, "x <y>\nz", LineRange { start: 0, end: 1 }, 0.2),
            StructuralBlock::new(BlockKind::Unclassified, "12", LineRange::single(2), 1.0),
        ]);
        assert!(html.contains("<div class=\"needs-review\" role=\"note\" data-confidence=\"0.20\">"));
        assert!(html.contains("<pre>x &lt;y&gt;\nz</pre>"));
        assert!(!html.contains(">12<"));
    }

    #[test]
    fn flagged_regions_ignore_review_threshold() {
        let config = GeneratorConfig {
            review_threshold: 0.05,
            ..GeneratorConfig::default()
        };
        let garbled =
            StructuralBlock::new(BlockKind::Unclassified, "of the\nTable", LineRange { start: 0, end: 1 }, 0.075)
                .for_review();
        let html = generate(&assemble(&[garbled]), "Doc", &config);
        assert!(html.contains("<pre>of the\nTable</pre>"));
    }

    #[test]
    fn assets_follow_last_block_of_their_page() {
        let stream = LineStream::from_text("First page.\n\x0cSecond page.");
        let root = assemble(&[
            block(BlockKind::Paragraph, "First page.", 0),
            block(BlockKind::Paragraph, "Second page.", 1),
        ]);
        let mut image = ImageAsset::new("img-1", 1, ImageSource::Path("images/fig 1.png".into()));
        image.alt = Some("A bar chart".to_string());
        let late = ImageAsset::new(
            "img-9",
            9,
            ImageSource::Data {
                mime: "image/png".to_string(),
                bytes: vec![1, 2, 3],
            },
        );
        let table = TableAsset {
            page: 2,
            caption: None,
            headers: vec!["k".to_string(), "v".to_string()],
            rows: vec![vec!["a".to_string(), "1".to_string()]],
        };
        let images = [image, late];
        let tables = [table];
        let html = generate_with_assets(
            &root,
            "Doc",
            &GeneratorConfig::default(),
            Some(PageAssets {
                stream: &stream,
                images: &images,
                tables: &tables,
            }),
        );

        let first = html.find("First page.").unwrap();
        let img = html.find("images/fig%201.png").unwrap();
        let second = html.find("Second page.").unwrap();
        let table = html.find("Table from page 2").unwrap();
        let data = html.find("data:image/png;base64,AQID").unwrap();
        assert!(first < img && img < second && second < table && table < data);
        assert!(html.contains("alt=\"A bar chart\" data-image-id=\"img-1\""));
        assert!(html.contains("alt=\"Figure from page 9\""));
    }
}
