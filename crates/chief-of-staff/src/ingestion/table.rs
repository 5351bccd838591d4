//! Plain-text table rendering for tabular uploads

use tabled::builder::Builder;
use tabled::settings::object::Segment;
use tabled::settings::{Alignment, Modify, Style};

/// Render a header row plus data rows as an aligned text table.
///
/// Columns are right aligned and there is no index column. Ragged rows are
/// padded with empty cells so every row has the same width.
pub fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let width = rows
        .iter()
        .map(Vec::len)
        .chain(std::iter::once(headers.len()))
        .max()
        .unwrap_or(0);

    if width == 0 {
        return String::new();
    }

    let pad = |cells: &[String]| -> Vec<String> {
        let mut padded = cells.to_vec();
        padded.resize(width, String::new());
        padded
    };

    let mut builder = Builder::default();
    builder.push_record(pad(headers));
    for row in rows {
        builder.push_record(pad(row));
    }

    let mut table = builder.build();
    table
        .with(Style::blank())
        .with(Modify::new(Segment::all()).with(Alignment::right()));

    table
        .to_string()
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_render_aligns_columns() {
        let out = render_table(
            &s(&["name", "arr"]),
            &[s(&["Acme", "1200000"]), s(&["Globex", "5"])],
        );
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("name"));
        assert!(lines[1].contains("Acme"));
        assert!(lines[2].ends_with('5'));
        // right aligned: last column ends at the same offset on every row
        assert_eq!(lines[1].len(), lines[2].len());
    }

    #[test]
    fn test_render_pads_ragged_rows() {
        let out = render_table(&s(&["a"]), &[s(&["1", "2", "3"])]);
        assert!(out.contains('3'));
        assert_eq!(out.lines().count(), 2);
    }

    #[test]
    fn test_render_empty() {
        assert_eq!(render_table(&[], &[]), "");
    }
}
