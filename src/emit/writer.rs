//! HCL writer with indentation tracking
//!
//! Blocks indent by two spaces and consecutive attributes have their `=` aligned,
//! the layout `terraform fmt` produces.

const INDENT_WIDTH: usize = 2;

pub struct HclWriter {
    output: String,
    indent_level: usize,
    at_line_start: bool,
}

impl Default for HclWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl HclWriter {
    pub fn new() -> Self {
        Self {
            output: String::new(),
            indent_level: 0,
            at_line_start: true,
        }
    }

    pub fn finish(self) -> String {
        self.output
    }

    pub fn indent(&mut self) {
        self.indent_level += 1;
    }

    pub fn dedent(&mut self) {
        self.indent_level = self.indent_level.saturating_sub(1);
    }

    fn write_indent(&mut self) {
        if self.at_line_start {
            self.output.push_str(&" ".repeat(self.indent_level * INDENT_WIDTH));
            self.at_line_start = false;
        }
    }

    pub fn write(&mut self, s: &str) {
        if s.is_empty() {
            return;
        }
        self.write_indent();
        self.output.push_str(s);
    }

    pub fn writeln(&mut self, s: &str) {
        self.write(s);
        self.newline();
    }

    pub fn newline(&mut self) {
        self.output.push('\n');
        self.at_line_start = true;
    }

    pub fn blank_lines(&mut self, count: usize) {
        for _ in 0..count {
            self.newline();
        }
    }

    /// `# text`, one comment line per line of `text`.
    pub fn comment(&mut self, text: &str) {
        for line in text.lines() {
            if line.is_empty() {
                self.writeln("#");
            } else {
                self.writeln(&format!("# {}", line));
            }
        }
    }

    /// Open a block: `header {`, then indent.
    pub fn open(&mut self, header: &str) {
        self.writeln(&format!("{} {{", header));
        self.indent();
    }

    pub fn close(&mut self) {
        self.dedent();
        self.writeln("}");
    }

    /// A run of `name = value` lines with aligned `=`.
    pub fn attributes(&mut self, attrs: &[(String, String)]) {
        let width = attrs.iter().map(|(k, _)| k.chars().count()).max().unwrap_or(0);
        for (key, value) in attrs {
            let pad = width - key.chars().count();
            self.writeln(&format!("{}{} = {}", key, " ".repeat(pad), value));
        }
    }

    pub fn attribute(&mut self, name: &str, value: &str) {
        self.attributes(&[(name.to_string(), value.to_string())]);
    }
}

/// Line-by-line diff of `expected` against `actual`, `None` when identical.
///
/// Lines are compared by position: `-` lines are on disk, `+` lines would be written.
pub fn line_diff(actual: &str, expected: &str) -> Option<String> {
    if actual == expected {
        return None;
    }
    let mut diff = String::new();
    let actual_lines: Vec<&str> = actual.lines().collect();
    let expected_lines: Vec<&str> = expected.lines().collect();

    for i in 0..actual_lines.len().max(expected_lines.len()) {
        let old = actual_lines.get(i).copied().unwrap_or("");
        let new = expected_lines.get(i).copied().unwrap_or("");
        if old != new {
            if !old.is_empty() {
                diff.push_str(&format!("-{:4} | {}\n", i + 1, old));
            }
            if !new.is_empty() {
                diff.push_str(&format!("+{:4} | {}\n", i + 1, new));
            }
        }
    }
    Some(diff)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_blocks() {
        let mut w = HclWriter::new();
        w.open("run \"defaults\"");
        w.attribute("command", "plan");
        w.blank_lines(1);
        w.open("assert");
        w.attribute("condition", "output.x == 1");
        w.close();
        w.close();
        assert_eq!(
            w.finish(),
            "run \"defaults\" {\n  command = plan\n\n  assert {\n    condition = output.x == 1\n  }\n}\n"
        );
    }

    #[test]
    fn test_attributes_align() {
        let mut w = HclWriter::new();
        w.attributes(&[
            ("environment".to_string(), "\"dev\"".to_string()),
            ("size".to_string(), "3".to_string()),
        ]);
        assert_eq!(w.finish(), "environment = \"dev\"\nsize        = 3\n");
    }

    #[test]
    fn test_comment_lines() {
        let mut w = HclWriter::new();
        w.indent();
        w.comment("one\n\ntwo");
        assert_eq!(w.finish(), "  # one\n  #\n  # two\n");
    }

    #[test]
    fn test_dedent_at_zero_stays_zero() {
        let mut w = HclWriter::new();
        w.dedent();
        w.writeln("x");
        assert_eq!(w.finish(), "x\n");
    }

    #[test]
    fn test_line_diff() {
        assert_eq!(line_diff("a\nb\n", "a\nb\n"), None);
        assert_eq!(
            line_diff("a\nb\n", "a\nc\nd\n").unwrap(),
            "-   2 | b\n+   2 | c\n+   3 | d\n"
        );
    }
}
