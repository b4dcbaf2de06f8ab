//! Incremental, line-based rendering of streamed Markdown.
//!
//! Fragments arrive at arbitrary boundaries. Text is held back until a line
//! break completes it, then rendered on its own, except inside a fenced code
//! block where lines accumulate until the closing fence and the whole block is
//! rendered as one unit.

use std::io::{self, Write};

use crate::error::Result;

const FENCE: &str = "```";

/// Converts a unit of Markdown into terminal-formatted text.
pub trait MarkdownRenderer {
    fn render(&self, markdown: &str) -> String;
}

impl<F> MarkdownRenderer for F
where
    F: Fn(&str) -> String,
{
    fn render(&self, markdown: &str) -> String {
        self(markdown)
    }
}

/// Per-stream renderer state: the unterminated tail of the input plus the
/// currently open code fence, if any.
pub struct MarkdownStream<'a, R: ?Sized, W> {
    renderer: &'a R,
    out: W,
    buffer: String,
    in_code_block: bool,
    code_block_buffer: String,
}

impl<'a, R, W> MarkdownStream<'a, R, W>
where
    R: MarkdownRenderer + ?Sized,
    W: Write,
{
    pub fn new(renderer: &'a R, out: W) -> Self {
        Self {
            renderer,
            out,
            buffer: String::new(),
            in_code_block: false,
            code_block_buffer: String::new(),
        }
    }

    pub fn is_in_code_block(&self) -> bool {
        self.in_code_block
    }

    /// Consumes one fragment, rendering every line it completes.
    pub fn push(&mut self, fragment: &str) -> Result<()> {
        if fragment.is_empty() {
            return Ok(());
        }
        self.buffer.push_str(fragment);
        let Some(last_break) = self.buffer.rfind('\n') else {
            return Ok(());
        };

        let tail = self.buffer.split_off(last_break + 1);
        let complete = std::mem::replace(&mut self.buffer, tail);
        for line in complete[..last_break].split('\n') {
            self.process_line(line)?;
        }
        Ok(())
    }

    /// Flushes whatever is left once the input has ended.
    ///
    /// Only a tail with non-whitespace content is flushed. Inside an open
    /// fence the tail is appended and the whole fence is rendered as-is,
    /// markers included; with a blank tail the open fence is not rendered.
    pub fn finish(mut self) -> Result<W> {
        let tail = std::mem::take(&mut self.buffer);
        if tail.trim().is_empty() {
            return Ok(self.out);
        }
        if self.in_code_block {
            self.code_block_buffer.push_str(&tail);
            let block = std::mem::take(&mut self.code_block_buffer);
            self.in_code_block = false;
            self.emit(&block)?;
        } else {
            self.emit(&tail)?;
        }
        Ok(self.out)
    }

    fn process_line(&mut self, line: &str) -> Result<()> {
        if line.trim_start().starts_with(FENCE) {
            if self.in_code_block {
                self.code_block_buffer.push_str(line);
                self.code_block_buffer.push('\n');
                let block = std::mem::take(&mut self.code_block_buffer);
                self.in_code_block = false;
                self.emit(&block)?;
            } else {
                self.in_code_block = true;
                self.code_block_buffer.clear();
                self.code_block_buffer.push_str(line);
                self.code_block_buffer.push('\n');
            }
        } else if self.in_code_block {
            self.code_block_buffer.push_str(line);
            self.code_block_buffer.push('\n');
        } else {
            self.emit(line)?;
        }
        Ok(())
    }

    fn emit(&mut self, markdown: &str) -> Result<()> {
        let rendered = self.renderer.render(markdown);
        self.out.write_all(rendered.trim_end().as_bytes())?;
        self.out.write_all(b"\n")?;
        self.out.flush()?;
        Ok(())
    }
}

/// Renders every fragment of `fragments` to `out` as lines complete.
///
/// The first upstream error is returned as-is; a partial line still buffered
/// at that point is dropped.
pub fn render_markdown_stream<I, R, W>(fragments: I, renderer: &R, out: W) -> Result<W>
where
    I: IntoIterator<Item = Result<String>>,
    R: MarkdownRenderer + ?Sized,
    W: Write,
{
    let mut stream = MarkdownStream::new(renderer, out);
    for fragment in fragments {
        stream.push(&fragment?)?;
    }
    stream.finish()
}

/// [`render_markdown_stream`] writing to standard output.
pub fn render_markdown_stream_to_stdout<I, R>(fragments: I, renderer: &R) -> Result<()>
where
    I: IntoIterator<Item = Result<String>>,
    R: MarkdownRenderer + ?Sized,
{
    let stdout = io::stdout();
    render_markdown_stream(fragments, renderer, stdout.lock())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn echo(markdown: &str) -> String {
        format!("<{markdown}>")
    }

    #[test]
    fn holds_partial_line_until_break() {
        let mut stream = MarkdownStream::new(&echo, Vec::new());
        stream.push("par").expect("push");
        stream.push("tial").expect("push");
        assert!(stream.out.is_empty());
        stream.push("\nnext").expect("push");
        assert_eq!(stream.out, b"<partial>\n");
        assert_eq!(stream.buffer, "next");
    }

    #[test]
    fn tracks_fence_state_across_fragments() {
        let mut stream = MarkdownStream::new(&echo, Vec::new());
        stream.push("``").expect("push");
        assert!(!stream.is_in_code_block());
        stream.push("`rust\nfn main() {}\n").expect("push");
        assert!(stream.is_in_code_block());
        assert_eq!(stream.code_block_buffer, "```rust\nfn main() {}\n");
        stream.push("```\n").expect("push");
        assert!(!stream.is_in_code_block());
        assert!(stream.code_block_buffer.is_empty());
    }

    #[test]
    fn indented_fence_opens_block() {
        let mut stream = MarkdownStream::new(&echo, Vec::new());
        stream.push("   ```\n").expect("push");
        assert!(stream.is_in_code_block());
    }

    #[test]
    fn trims_trailing_whitespace_of_rendered_output() {
        let padded = |markdown: &str| format!("{markdown}  \n\n");
        let out = render_markdown_stream(vec![Ok("a\n".to_string())], &padded, Vec::new())
            .expect("render");
        assert_eq!(out, b"a\n");
    }
}
