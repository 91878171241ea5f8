//! Line-level comparison between a Global source and a local translation
//!
//! Backs manual reconciliation of Overridden translations: the editor sees
//! which lines the local version removed from or added to the source and
//! then either accepts the source wholesale or keeps the local document.

use serde::Serialize;

/// Side a diff line belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffOp {
    /// Present in both
    Unchanged,
    /// Only in the source
    Removed,
    /// Only in the local version
    Added,
}

impl DiffOp {
    /// Prefix used for unified-style rendering
    pub fn marker(&self) -> char {
        match self {
            DiffOp::Unchanged => ' ',
            DiffOp::Removed => '-',
            DiffOp::Added => '+',
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffLine {
    pub op: DiffOp,
    pub text: String,
}

/// Result of comparing source content with local content
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Comparison {
    pub lines: Vec<DiffLine>,
    pub added: usize,
    pub removed: usize,
    pub unchanged: usize,
}

impl Comparison {
    /// Returns true if both sides are identical
    pub fn is_identical(&self) -> bool {
        self.added == 0 && self.removed == 0
    }

    /// Renders the comparison with `-`/`+`/` ` prefixes
    pub fn to_unified(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            out.push(line.op.marker());
            out.push_str(&line.text);
            out.push('\n');
        }
        out
    }
}

/// Compares two bodies line by line using a longest-common-subsequence table
pub fn compare(source: &str, local: &str) -> Comparison {
    let a: Vec<&str> = source.lines().collect();
    let b: Vec<&str> = local.lines().collect();

    // lcs[i][j] = LCS length of a[i..] and b[j..]
    let mut lcs = vec![vec![0usize; b.len() + 1]; a.len() + 1];
    for i in (0..a.len()).rev() {
        for j in (0..b.len()).rev() {
            lcs[i][j] = if a[i] == b[j] {
                lcs[i + 1][j + 1] + 1
            } else {
                lcs[i + 1][j].max(lcs[i][j + 1])
            };
        }
    }

    let mut lines = Vec::with_capacity(a.len().max(b.len()));
    let (mut i, mut j) = (0, 0);

    while i < a.len() && j < b.len() {
        if a[i] == b[j] {
            lines.push(diff_line(DiffOp::Unchanged, a[i]));
            i += 1;
            j += 1;
        } else if lcs[i + 1][j] >= lcs[i][j + 1] {
            lines.push(diff_line(DiffOp::Removed, a[i]));
            i += 1;
        } else {
            lines.push(diff_line(DiffOp::Added, b[j]));
            j += 1;
        }
    }
    lines.extend(a[i..].iter().map(|l| diff_line(DiffOp::Removed, l)));
    lines.extend(b[j..].iter().map(|l| diff_line(DiffOp::Added, l)));

    let count = |op: DiffOp| lines.iter().filter(|l| l.op == op).count();
    let (added, removed, unchanged) = (count(DiffOp::Added), count(DiffOp::Removed), count(DiffOp::Unchanged));

    Comparison {
        lines,
        added,
        removed,
        unchanged,
    }
}

fn diff_line(op: DiffOp, text: &str) -> DiffLine {
    DiffLine {
        op,
        text: text.to_string(),
    }
}
