//! Print the element tree of an `AsciiDoc` file.
//!
//! ```text
//! cargo run --example inspect_ast -- FILE [--json] [--no-color] [--threads N] [--max-depth N]
//! ```
use std::{
    io::{self, Write},
    path::PathBuf,
};

use adocflow_parser::{
    BlockContent, Element, ListItem, Options, inlines_to_plain_text, parse_file,
};
use crossterm::style::Stylize;

struct Args {
    file: PathBuf,
    json: bool,
    color: bool,
    threads: Option<usize>,
    /// Maximum depth to display (0 = unlimited)
    max_depth: usize,
}

impl Args {
    fn parse() -> Result<Self, String> {
        let mut file = None;
        let mut args = Self {
            file: PathBuf::new(),
            json: false,
            color: true,
            threads: None,
            max_depth: 0,
        };
        let mut raw = std::env::args().skip(1);
        while let Some(arg) = raw.next() {
            match arg.as_str() {
                "--json" => args.json = true,
                "--no-color" => args.color = false,
                "--threads" | "--max-depth" => {
                    let value = raw
                        .next()
                        .and_then(|value| value.parse().ok())
                        .ok_or_else(|| format!("{arg} needs a number"))?;
                    if arg == "--threads" {
                        args.threads = Some(value);
                    } else {
                        args.max_depth = value;
                    }
                }
                _ if file.is_none() => file = Some(PathBuf::from(arg)),
                _ => return Err(format!("unexpected argument: {arg}")),
            }
        }
        args.file = file.ok_or("usage: inspect_ast FILE [--json] [--no-color] [--threads N] [--max-depth N]")?;
        Ok(args)
    }
}

fn truncate(text: &str, width: usize) -> String {
    let flat = text.replace('\n', " ");
    if flat.chars().count() <= width {
        flat
    } else {
        format!("{}...", flat.chars().take(width).collect::<String>())
    }
}

struct TreePrinter<W: Write> {
    writer: W,
    is_last_stack: Vec<bool>,
    color: bool,
    max_depth: usize,
}

impl<W: Write> TreePrinter<W> {
    fn line(&mut self, name: &str, detail: Option<&str>) -> io::Result<()> {
        let depth = self.is_last_stack.len();
        if self.max_depth != 0 && depth > self.max_depth {
            return Ok(());
        }
        for (i, last) in self.is_last_stack.iter().enumerate() {
            let segment = match (i + 1 == depth, last) {
                (true, true) => "└─ ",
                (true, false) => "├─ ",
                (false, true) => "   ",
                (false, false) => "│  ",
            };
            write!(self.writer, "{segment}")?;
        }
        if self.color {
            write!(self.writer, "{}", name.cyan().bold())?;
        } else {
            write!(self.writer, "{name}")?;
        }
        if let Some(detail) = detail {
            if self.color {
                write!(self.writer, ": {}", detail.yellow())?;
            } else {
                write!(self.writer, ": {detail}")?;
            }
        }
        writeln!(self.writer)
    }

    fn children(&mut self, elements: &[Element]) -> io::Result<()> {
        for (index, element) in elements.iter().enumerate() {
            self.is_last_stack.push(index + 1 == elements.len());
            self.element(element)?;
            self.is_last_stack.pop();
        }
        Ok(())
    }

    fn items(&mut self, items: &[ListItem]) -> io::Result<()> {
        for (index, item) in items.iter().enumerate() {
            self.is_last_stack.push(index + 1 == items.len());
            let text = if item.term.is_empty() {
                inlines_to_plain_text(&item.principal)
            } else {
                inlines_to_plain_text(&item.term)
            };
            self.line("ListItem", Some(&format!("{} {}", item.marker, truncate(&text, 40))))?;
            self.children(&item.children)?;
            self.is_last_stack.pop();
        }
        Ok(())
    }

    #[allow(clippy::wildcard_enum_match_arm)]
    fn element(&mut self, element: &Element) -> io::Result<()> {
        match element {
            Element::Section(section) => {
                let title = inlines_to_plain_text(&section.title);
                let detail = format!("Level {} - {} [#{}]", section.level, truncate(&title, 40), section.id);
                self.line("Section", Some(&detail))?;
                self.children(&section.children)
            }
            Element::Preamble(preamble) => {
                self.line("Preamble", None)?;
                self.children(&preamble.children)
            }
            Element::Paragraph(paragraph) => {
                let text = inlines_to_plain_text(&paragraph.content);
                self.line("Paragraph", Some(&truncate(&text, 50)))
            }
            Element::DelimitedBlock(block) => {
                self.line("DelimitedBlock", Some(&format!("{:?}", block.kind)))?;
                match &block.content {
                    BlockContent::Compound { children } => self.children(children),
                    BlockContent::Verbatim { lines, .. } => {
                        self.is_last_stack.push(true);
                        let result = self.line("Lines", Some(&lines.len().to_string()));
                        self.is_last_stack.pop();
                        result
                    }
                    BlockContent::Raw { .. } => Ok(()),
                }
            }
            Element::DiscreteHeading(heading) => {
                let title = inlines_to_plain_text(&heading.title);
                let detail = format!("Level {} - {}", heading.level, truncate(&title, 40));
                self.line("DiscreteHeading", Some(&detail))
            }
            Element::List(list) | Element::LabeledList(list) => {
                self.line("List", Some(&format!("{:?}", list.kind)))?;
                self.items(&list.items)
            }
            Element::Table(table) => {
                let columns = table.rows.first().map_or(0, |row| row.cells.len());
                let detail = format!("{} rows x {columns} columns", table.rows.len());
                self.line("Table", Some(&detail))
            }
            Element::ImageBlock(image) => self.line("Image", Some(&truncate(&image.target, 50))),
            Element::AttributeDeclaration(declaration) => {
                let detail = format!("{} = {}", declaration.attribute_name, declaration.value.to_text());
                self.line("Attribute", Some(&truncate(&detail, 50)))
            }
            Element::AttributeReset(reset) => self.line("AttributeReset", Some(&reset.attribute_name)),
            Element::AttributeCluster(cluster) => self.line("AttributeCluster", cluster.attributes.style()),
            Element::TableOfContentsPlaceholder(_) => self.line("TableOfContents", None),
            Element::ThematicBreak(_) => self.line("ThematicBreak", None),
            Element::PageBreak(_) => self.line("PageBreak", None),
            Element::Comment(_) => self.line("Comment", None),
            Element::BlankLine(_) => Ok(()),
            other => self.line("Element", Some(&format!("{:?}", other.line()))),
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse()?;
    let mut options = Options::builder();
    if let Some(capacity) = args.threads {
        options = options.with_threads(capacity);
    }
    let document = parse_file(&args.file, &options.build())?;

    let stdout = io::stdout();
    if args.json {
        serde_json::to_writer_pretty(stdout.lock(), &document)?;
        println!();
        return Ok(());
    }
    let mut printer = TreePrinter {
        writer: stdout.lock(),
        is_last_stack: Vec::new(),
        color: args.color,
        max_depth: args.max_depth,
    };
    printer.line("Document", None)?;
    printer.children(&document.elements)?;
    if !document.footnotes.is_empty() {
        printer.line("Footnotes", Some(&document.footnotes.len().to_string()))?;
    }
    Ok(())
}
