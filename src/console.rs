use std::io::{self, BufRead, Write};

use arml_client::list::Column;
use arml_core::{form::FormErrors, sort::SortIndicator};

fn header(column: &Column) -> String {
    match column.indicator {
        Some(SortIndicator::Ascending) => format!("{} ^", column.label),
        Some(SortIndicator::Descending) => format!("{} v", column.label),
        Some(SortIndicator::Unsorted) => format!("{} -", column.label),
        None => column.label.to_string(),
    }
}

/// Left-aligned text table with a separator under the header.
pub fn table(columns: &[Column], rows: &[Vec<String>]) -> String {
    let headers: Vec<String> = columns.iter().map(header).collect();
    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(i, header)| {
            rows.iter()
                .filter_map(|row| row.get(i))
                .map(|cell| cell.chars().count())
                .chain(std::iter::once(header.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let line = |cells: &[String]| -> String {
        let padded: Vec<String> = cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
            .collect();
        padded.join(" | ").trim_end().to_string()
    };

    let mut out = String::new();
    out.push_str(&line(&headers));
    out.push('\n');
    let separator: Vec<String> = widths.iter().map(|width| "-".repeat(*width)).collect();
    out.push_str(&separator.join("-+-"));
    out.push('\n');
    for row in rows {
        out.push_str(&line(row));
        out.push('\n');
    }
    out
}

pub fn details(fields: &[(&str, String)]) -> String {
    let width = fields
        .iter()
        .map(|(label, _)| label.chars().count())
        .max()
        .unwrap_or(0);
    fields
        .iter()
        .map(|(label, value)| format!("{:<width$} : {}\n", label, value, width = width))
        .collect()
}

pub fn form_errors(errors: &FormErrors) -> String {
    errors
        .iter()
        .map(|(field, error)| match &error.message {
            Some(message) => format!("{}: {}\n", field, message),
            None => format!("{}: {}\n", field, error.code),
        })
        .collect()
}

/// Asks `prompt` and reads a yes/no answer. Anything but `y`/`yes` is a no.
pub fn confirm(prompt: &str, mut input: impl BufRead, mut output: impl Write) -> io::Result<bool> {
    write!(output, "{} [y/N] ", prompt)?;
    output.flush()?;
    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}
