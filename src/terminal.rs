use console::{Color, Style, measure_text_width};
use pulldown_cmark::{
    CodeBlockKind, Event, HeadingLevel, Options as MarkdownOptions, Parser as MarkdownParser, Tag,
    TagEnd,
};

use crate::config::{RenderConfig, color_named};
use crate::stream::MarkdownRenderer;

const BULLET: &str = "•";
const QUOTE_GUTTER: &str = "│ ";
const RULE: &str = "─";

/// Renders Markdown to ANSI-styled terminal text.
#[derive(Debug, Clone)]
pub struct TerminalRenderer {
    config: RenderConfig,
    heading_color: Color,
    code_color: Color,
}

impl TerminalRenderer {
    pub fn new(config: RenderConfig) -> Self {
        let heading_color = color_named(&config.heading_color).unwrap_or(Color::Cyan);
        let code_color = color_named(&config.code_color).unwrap_or(Color::Yellow);
        Self {
            config,
            heading_color,
            code_color,
        }
    }
}

impl Default for TerminalRenderer {
    fn default() -> Self {
        Self::new(RenderConfig::default())
    }
}

impl MarkdownRenderer for TerminalRenderer {
    fn render(&self, markdown: &str) -> String {
        let mut options = MarkdownOptions::empty();
        options.insert(MarkdownOptions::ENABLE_STRIKETHROUGH);
        options.insert(MarkdownOptions::ENABLE_TABLES);
        options.insert(MarkdownOptions::ENABLE_TASKLISTS);

        let mut writer = Writer::new(self);
        for event in MarkdownParser::new_ext(markdown, options) {
            writer.event(event);
        }
        writer.out
    }
}

struct CodeBlock {
    language: Option<String>,
    text: String,
}

struct Link {
    url: String,
    text: String,
}

#[derive(Default)]
struct Table {
    rows: Vec<Vec<String>>,
    row: Vec<String>,
    cell: String,
}

struct Writer<'a> {
    theme: &'a TerminalRenderer,
    out: String,
    at_line_start: bool,
    item_pending: bool,
    heading: Option<HeadingLevel>,
    strong: usize,
    emphasis: usize,
    strikethrough: usize,
    quote_depth: usize,
    lists: Vec<Option<u64>>,
    links: Vec<Link>,
    code_block: Option<CodeBlock>,
    table: Option<Table>,
}

impl<'a> Writer<'a> {
    fn new(theme: &'a TerminalRenderer) -> Self {
        Self {
            theme,
            out: String::new(),
            at_line_start: true,
            item_pending: false,
            heading: None,
            strong: 0,
            emphasis: 0,
            strikethrough: 0,
            quote_depth: 0,
            lists: Vec::new(),
            links: Vec::new(),
            code_block: None,
            table: None,
        }
    }

    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) => self.text(&text),
            Event::Code(code) => {
                let style = Style::new().fg(self.theme.code_color);
                self.write(&code, &style);
            }
            Event::Html(html) | Event::InlineHtml(html) => self.write(&html, &Style::new()),
            Event::SoftBreak | Event::HardBreak => {
                if let Some(table) = self.table.as_mut() {
                    table.cell.push(' ');
                } else {
                    self.newline();
                }
            }
            Event::Rule => {
                self.start_block();
                let rule = RULE.repeat(self.theme.config.rule_width);
                self.write(&rule, &Style::new().dim());
                self.newline();
            }
            Event::TaskListMarker(checked) => {
                let marker = if checked { "[x] " } else { "[ ] " };
                self.write(marker, &Style::new().dim());
            }
            _ => {}
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph => self.start_block(),
            Tag::Heading { level, .. } => {
                self.start_block();
                self.heading = Some(level);
                let prefix = format!("{} ", "#".repeat(heading_depth(level)));
                let style = self.current_style();
                self.write(&prefix, &style);
            }
            Tag::BlockQuote(_) => {
                self.start_block();
                self.quote_depth += 1;
            }
            Tag::CodeBlock(kind) => {
                self.start_block();
                let language = match kind {
                    CodeBlockKind::Fenced(lang) => Some(lang.into_string()),
                    CodeBlockKind::Indented => None,
                };
                self.code_block = Some(CodeBlock {
                    language,
                    text: String::new(),
                });
            }
            Tag::List(start) => {
                if self.lists.is_empty() {
                    self.start_block();
                } else if !self.at_line_start {
                    self.newline();
                }
                self.lists.push(start);
            }
            Tag::Item => {
                if !self.at_line_start {
                    self.newline();
                }
                let depth = self.lists.len().saturating_sub(1);
                let marker = match self.lists.last() {
                    Some(Some(number)) => format!("{number}."),
                    _ => BULLET.to_string(),
                };
                let text = format!("{}{} ", "  ".repeat(depth), marker);
                self.write(&text, &Style::new().dim());
                self.item_pending = true;
            }
            Tag::Emphasis => self.emphasis += 1,
            Tag::Strong => self.strong += 1,
            Tag::Strikethrough => self.strikethrough += 1,
            Tag::Link { dest_url, .. } | Tag::Image { dest_url, .. } => {
                self.links.push(Link {
                    url: dest_url.into_string(),
                    text: String::new(),
                });
            }
            Tag::Table(_) => {
                self.start_block();
                self.table = Some(Table::default());
            }
            Tag::TableHead | Tag::TableRow => {
                if let Some(table) = self.table.as_mut() {
                    table.row.clear();
                }
            }
            Tag::TableCell => {
                if let Some(table) = self.table.as_mut() {
                    table.cell.clear();
                }
            }
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => self.end_line(),
            TagEnd::Heading(_) => {
                self.heading = None;
                self.end_line();
            }
            TagEnd::BlockQuote(_) => {
                self.quote_depth = self.quote_depth.saturating_sub(1);
                self.end_line();
            }
            TagEnd::CodeBlock => {
                if let Some(block) = self.code_block.take() {
                    self.write_code_block(&block);
                }
            }
            TagEnd::List(_) => {
                self.lists.pop();
                self.end_line();
            }
            TagEnd::Item => {
                self.item_pending = false;
                self.end_line();
                if let Some(Some(number)) = self.lists.last_mut() {
                    *number += 1;
                }
            }
            TagEnd::Emphasis => self.emphasis = self.emphasis.saturating_sub(1),
            TagEnd::Strong => self.strong = self.strong.saturating_sub(1),
            TagEnd::Strikethrough => self.strikethrough = self.strikethrough.saturating_sub(1),
            TagEnd::Link | TagEnd::Image => {
                if let Some(link) = self.links.pop() {
                    if !link.url.is_empty() && link.url != link.text {
                        self.write(&format!(" ({})", link.url), &Style::new().dim());
                    }
                }
            }
            TagEnd::TableHead | TagEnd::TableRow => {
                if let Some(table) = self.table.as_mut() {
                    let row = std::mem::take(&mut table.row);
                    table.rows.push(row);
                }
            }
            TagEnd::TableCell => {
                if let Some(table) = self.table.as_mut() {
                    let cell = std::mem::take(&mut table.cell);
                    table.row.push(cell);
                }
            }
            TagEnd::Table => {
                if let Some(table) = self.table.take() {
                    self.write_table(&table.rows);
                }
            }
            _ => {}
        }
    }

    fn text(&mut self, text: &str) {
        if let Some(block) = self.code_block.as_mut() {
            block.text.push_str(text);
            return;
        }
        if let Some(link) = self.links.last_mut() {
            link.text.push_str(text);
        }
        self.item_pending = false;
        let style = self.current_style();
        self.write(text, &style);
    }

    fn current_style(&self) -> Style {
        let mut style = Style::new();
        if let Some(level) = self.heading {
            style = style.fg(self.theme.heading_color).bold();
            if level == HeadingLevel::H1 {
                style = style.underlined();
            }
        }
        if self.strong > 0 {
            style = style.bold();
        }
        if self.emphasis > 0 {
            style = style.italic();
        }
        if self.strikethrough > 0 {
            style = style.strikethrough();
        }
        if !self.links.is_empty() {
            style = style.underlined();
        }
        if self.quote_depth > 0 {
            style = style.dim();
        }
        style
    }

    fn write(&mut self, text: &str, style: &Style) {
        if text.is_empty() {
            return;
        }
        if let Some(table) = self.table.as_mut() {
            table.cell.push_str(&style.apply_to(text).to_string());
            return;
        }
        if self.at_line_start && self.quote_depth > 0 {
            let gutter = QUOTE_GUTTER.repeat(self.quote_depth);
            self.out.push_str(&Style::new().dim().apply_to(gutter).to_string());
        }
        self.out.push_str(&style.apply_to(text).to_string());
        self.at_line_start = false;
    }

    fn newline(&mut self) {
        self.out.push('\n');
        self.at_line_start = true;
    }

    fn end_line(&mut self) {
        if !self.at_line_start {
            self.newline();
        }
    }

    /// Separates a new block from earlier output by one blank line.
    fn start_block(&mut self) {
        if self.item_pending {
            return;
        }
        if !self.out.is_empty() {
            self.end_line();
            if self.lists.is_empty() && !self.out.ends_with("\n\n") {
                self.newline();
            }
        }
    }

    fn write_code_block(&mut self, block: &CodeBlock) {
        let indent = " ".repeat(self.theme.config.code_indent);
        let language = block.language.as_deref().map(str::trim).unwrap_or("");
        if self.theme.config.show_code_language && !language.is_empty() {
            self.write(&format!("{indent}{language}"), &Style::new().dim());
            self.newline();
        }
        let style = Style::new().fg(self.theme.code_color);
        for line in block.text.trim_end_matches('\n').split('\n') {
            self.write(&format!("{indent}{line}"), &style);
            self.newline();
        }
    }

    fn write_table(&mut self, rows: &[Vec<String>]) {
        let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
        if columns == 0 {
            return;
        }
        let mut widths = vec![0usize; columns];
        for row in rows {
            for (index, cell) in row.iter().enumerate() {
                widths[index] = widths[index].max(measure_text_width(cell));
            }
        }

        let separator = Style::new().dim().apply_to(" │ ").to_string();
        for (index, row) in rows.iter().enumerate() {
            let cells: Vec<String> = widths
                .iter()
                .enumerate()
                .map(|(column, width)| {
                    let cell = row.get(column).map(String::as_str).unwrap_or("");
                    let padding = " ".repeat(width.saturating_sub(measure_text_width(cell)));
                    if index == 0 {
                        format!("{}{padding}", Style::new().bold().apply_to(cell))
                    } else {
                        format!("{cell}{padding}")
                    }
                })
                .collect();
            self.out.push_str(cells.join(separator.as_str()).trim_end());
            self.newline();
            if index == 0 && rows.len() > 1 {
                let rule: Vec<String> = widths.iter().map(|w| RULE.repeat(*w)).collect();
                let rule = Style::new().dim().apply_to(rule.join("─┼─")).to_string();
                self.out.push_str(&rule);
                self.newline();
            }
        }
    }
}

fn heading_depth(level: HeadingLevel) -> usize {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(markdown: &str) -> String {
        let rendered = TerminalRenderer::default().render(markdown);
        console::strip_ansi_codes(&rendered).trim_end().to_string()
    }

    #[test]
    fn renders_heading_with_section_prefix() {
        assert_eq!(plain("## Install"), "## Install");
    }

    #[test]
    fn renders_inline_styles_as_plain_text() {
        assert_eq!(plain("Some **bold** and *soft* `code`"), "Some bold and soft code");
    }

    #[test]
    fn renders_bullets_and_numbers() {
        assert_eq!(plain("- one"), "• one");
        assert_eq!(plain("3. three"), "3. three");
        assert_eq!(plain("1. a\n2. b"), "1. a\n2. b");
    }

    #[test]
    fn renders_task_list_markers() {
        assert_eq!(plain("- [x] done"), "• [x] done");
    }

    #[test]
    fn renders_fenced_code_with_language_label() {
        let rendered = plain("```js\nconsole.log(1)\n```\n");
        assert_eq!(rendered, "    js\n    console.log(1)");
    }

    #[test]
    fn hides_language_label_when_disabled() {
        let renderer = TerminalRenderer::new(RenderConfig {
            show_code_language: false,
            code_indent: 2,
            ..RenderConfig::default()
        });
        let rendered = renderer.render("```rust\nlet x = 1;\n```\n");
        assert_eq!(console::strip_ansi_codes(&rendered).trim_end(), "  let x = 1;");
    }

    #[test]
    fn unterminated_fence_still_renders_code() {
        let rendered = plain("```\nstill open");
        assert!(rendered.contains("still open"));
    }

    #[test]
    fn renders_link_with_url() {
        assert_eq!(
            plain("[docs](https://example.com)"),
            "docs (https://example.com)"
        );
        assert_eq!(plain("<https://example.com>"), "https://example.com");
    }

    #[test]
    fn renders_quote_with_gutter() {
        assert_eq!(plain("> quoted"), "│ quoted");
    }

    #[test]
    fn renders_rule_with_configured_width() {
        let renderer = TerminalRenderer::new(RenderConfig {
            rule_width: 5,
            ..RenderConfig::default()
        });
        assert_eq!(console::strip_ansi_codes(&renderer.render("---")).trim_end(), "─────");
    }

    #[test]
    fn renders_table_with_aligned_columns() {
        let rendered = plain("| a | bb |\n|---|---|\n| ccc | d |\n");
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "a   │ bb");
        assert_eq!(lines[1], "────┼───");
        assert_eq!(lines[2], "ccc │ d");
    }

    #[test]
    fn empty_input_renders_nothing() {
        assert_eq!(plain(""), "");
    }
}
