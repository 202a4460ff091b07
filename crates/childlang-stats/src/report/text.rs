/// Column-aligned plain text table. The first column is left aligned, the
/// rest are right aligned.
#[derive(Debug, Clone, Default)]
pub struct TextTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    separators: Vec<usize>,
}

impl TextTable {
    pub fn new<S: Into<String>>(headers: Vec<S>) -> Self {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
            separators: Vec::new(),
        }
    }

    pub fn push(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    /// Draw a rule before the next pushed row.
    pub fn rule(&mut self) {
        self.separators.push(self.rows.len());
    }

    pub fn render(&self) -> String {
        let n_cols = self
            .rows
            .iter()
            .map(Vec::len)
            .chain(std::iter::once(self.headers.len()))
            .max()
            .unwrap_or(0);

        let mut widths = vec![0usize; n_cols];
        for row in std::iter::once(&self.headers).chain(self.rows.iter()) {
            for (i, cell) in row.iter().enumerate() {
                widths[i] = widths[i].max(cell.chars().count());
            }
        }
        let total = widths.iter().sum::<usize>() + 2 * n_cols.saturating_sub(1);
        let rule = "-".repeat(total);

        let mut out = String::new();
        out.push_str(&rule);
        out.push('\n');
        out.push_str(&format_row(&self.headers, &widths));
        out.push_str(&rule);
        out.push('\n');
        for (idx, row) in self.rows.iter().enumerate() {
            if self.separators.contains(&idx) {
                out.push_str(&rule);
                out.push('\n');
            }
            out.push_str(&format_row(row, &widths));
        }
        out.push_str(&rule);
        out.push('\n');
        out
    }
}

fn format_row(row: &[String], widths: &[usize]) -> String {
    let cells: Vec<String> = widths
        .iter()
        .enumerate()
        .map(|(i, &w)| {
            let cell = row.get(i).map(String::as_str).unwrap_or("");
            if i == 0 {
                format!("{:<w$}", cell, w = w)
            } else {
                format!("{:>w$}", cell, w = w)
            }
        })
        .collect();
    let mut line = cells.join("  ");
    line.truncate(line.trim_end().len());
    line.push('\n');
    line
}

/// Fixed-precision number, `NA` for missing.
pub fn fmt_num(value: f64, digits: usize) -> String {
    if value.is_nan() {
        "NA".to_string()
    } else if value.is_infinite() {
        if value > 0.0 { "Inf" } else { "-Inf" }.to_string()
    } else {
        format!("{:.*}", digits, value)
    }
}

/// p-value in APA-like style: three decimals, `< .001` below that.
pub fn fmt_p(p: f64) -> String {
    if p.is_nan() {
        "NA".to_string()
    } else if p < 0.001 {
        "< .001".to_string()
    } else {
        let s = format!("{:.3}", p);
        s.strip_prefix('0').map(str::to_string).unwrap_or(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_aligns_columns() {
        let mut table = TextTable::new(vec!["name", "value"]);
        table.push(vec!["a".to_string(), "1.00".to_string()]);
        table.push(vec!["longer".to_string(), "10.00".to_string()]);
        let out = table.render();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[1], "name    value");
        assert_eq!(lines[3], "a        1.00");
        assert_eq!(lines[4], "longer  10.00");
    }

    #[test]
    fn fmt_p_drops_leading_zero() {
        assert_eq!(fmt_p(0.0312), ".031");
        assert_eq!(fmt_p(0.00001), "< .001");
        assert_eq!(fmt_p(1.0), "1.000");
    }
}
