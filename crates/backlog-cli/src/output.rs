use serde::Serialize;

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{}", json);
    Ok(())
}

pub fn print_table(headers: &[&str], rows: Vec<Vec<String>>) {
    print!("{}", render_table(headers, &rows));
}

/// Left-aligned columns separated by two spaces, with a dashed rule under the
/// header. Widths count characters; cells beyond the header count are dropped.
fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = table_line(headers.iter().copied(), &widths);
    let rule: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();
    out += &table_line(rule.iter().map(String::as_str), &widths);
    for row in rows {
        out += &table_line(row.iter().map(String::as_str), &widths);
    }
    out
}

fn table_line<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    let padded: Vec<String> = cells
        .zip(widths)
        .map(|(cell, &w)| format!("{cell:<w$}"))
        .collect();
    format!("{}\n", padded.join("  ").trim_end())
}

/// Pretty-print `content` when it can be repaired into JSON; otherwise
/// return it unchanged.
pub fn pretty_content(content: &str) -> String {
    backlog_core::repair::repair(content)
        .ok()
        .and_then(|v| serde_json::to_string_pretty(&v).ok())
        .unwrap_or_else(|| content.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn columns_align_to_widest_cell() {
        let rows = vec![
            vec!["1".into(), "req_agent".into()],
            vec!["12".into(), "x".into()],
        ];
        let table = render_table(&["ID", "BY"], &rows);
        assert_eq!(table, "ID  BY\n--  ---------\n1   req_agent\n12  x\n");
    }

    #[test]
    fn widths_count_characters() {
        let rows = vec![vec!["rené".into(), "open".into()]];
        let table = render_table(&["BY", "STATUS"], &rows);
        assert_eq!(table.lines().nth(2), Some("rené  open"));
    }

    #[test]
    fn extra_cells_are_dropped() {
        let rows = vec![vec!["1".into(), "spare".into()]];
        assert_eq!(render_table(&["ID"], &rows), "ID\n--\n1\n");
    }

    #[test]
    fn pretty_content_falls_back_to_raw_text() {
        assert_eq!(pretty_content("not json"), "not json");
        assert!(pretty_content("```json\n{\"a\": 1,}\n```").contains("\"a\": 1"));
    }
}
