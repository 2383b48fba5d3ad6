//! Terminal output for spendmap commands

use colored::Colorize;
use comfy_table::{presets::UTF8_FULL_CONDENSED, ContentArrangement, Table};

pub fn success(msg: &str) {
    println!("{}", msg.green());
}

pub fn error(msg: &str) {
    eprintln!("{}", msg.red());
}

pub fn warning(msg: &str) {
    println!("{}", msg.yellow());
}

pub fn info(msg: &str) {
    println!("{}", msg.cyan());
}

/// Two-column label/value table for run summaries
pub fn summary_table(rows: &[(&str, String)]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    for (label, value) in rows {
        table.add_row(vec![label.to_string(), value.clone()]);
    }
    table
}

/// Warn about a set of items, one per line, truncated after `limit`
pub fn warning_list(heading: &str, items: &[String], limit: usize) {
    if items.is_empty() {
        return;
    }
    warning(&format!("{} ({}):", heading, items.len()));
    for line in list_lines(items, limit) {
        println!("  {}", line);
    }
}

fn list_lines(items: &[String], limit: usize) -> Vec<String> {
    let mut lines: Vec<String> = items.iter().take(limit).cloned().collect();
    if items.len() > limit {
        lines.push(format!("... and {} more", items.len() - limit));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_table_rows() {
        let table = summary_table(&[
            ("Transactions", "412".to_string()),
            ("Distinct postcodes", "87".to_string()),
        ]);
        let rendered = table.to_string();
        assert!(rendered.contains("Transactions"));
        assert!(rendered.contains("412"));
        assert!(rendered.contains("Distinct postcodes"));
    }

    #[test]
    fn test_list_lines_truncates() {
        let items: Vec<String> = (1..=5).map(|i| format!("B9{i} 9ZZ")).collect();
        assert_eq!(list_lines(&items, 10).len(), 5);
        assert_eq!(
            list_lines(&items, 2),
            vec!["B91 9ZZ", "B92 9ZZ", "... and 3 more"]
        );
    }
}
