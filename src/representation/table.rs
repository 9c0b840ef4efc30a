use std::fmt;

use tracing::warn;

const HEADER_TOTAL: &str = "Total";

/// Fixed-width text table of counts with a "Total" column and a "Total" row.
///
/// Widths are recomputed from the whole column on every write, so the layout
/// depends only on the final cell values and not on the order of `set` calls.
#[derive(Clone, Debug)]
pub(crate) struct Table {
    header: String,
    columns: Vec<Column>,
    rows: Vec<Row>,
    header_width: usize,
    total_width: usize,
}

#[derive(Clone, Debug)]
struct Column {
    header: String,
    width: usize,
}

#[derive(Clone, Debug)]
struct Row {
    header: String,
    cells: Vec<Cell>,
}

#[derive(Clone, Copy, Debug)]
struct Cell {
    value: u64,
    width: usize,
}

impl Table {
    pub(crate) fn new<S: AsRef<str>>(header: &str, rows: &[S], columns: &[S]) -> Self {
        let columns: Vec<Column> = columns
            .iter()
            .map(|header| {
                let header = header.as_ref().to_string();
                let width = text_width(&header).max(digits(0));
                Column { header, width }
            })
            .collect();
        let header_width = rows
            .iter()
            .map(|row| text_width(row.as_ref()))
            .chain([text_width(header), text_width(HEADER_TOTAL)])
            .max()
            .unwrap_or_default();
        let rows = rows
            .iter()
            .map(|row| Row {
                header: row.as_ref().to_string(),
                cells: columns
                    .iter()
                    .map(|column| Cell {
                        value: 0,
                        width: column.width,
                    })
                    .collect(),
            })
            .collect();
        Self {
            header: header.to_string(),
            columns,
            rows,
            header_width,
            total_width: text_width(HEADER_TOTAL),
        }
    }

    /// Stores a count. Writes outside the table are ignored.
    pub(crate) fn set(&mut self, row: usize, column: usize, value: u64) {
        if row >= self.rows.len() || column >= self.columns.len() {
            warn!(
                "cell ({row}, {column}) is out of range of {}x{} table",
                self.rows.len(),
                self.columns.len()
            );
            return;
        }
        self.rows[row].cells[column].value = value;

        let width = self
            .rows
            .iter()
            .map(|row| digits(row.cells[column].value))
            .chain([
                text_width(&self.columns[column].header),
                digits(self.column_total(column)),
            ])
            .max()
            .unwrap_or_default();
        self.columns[column].width = width;
        for row in &mut self.rows {
            row.cells[column].width = width;
        }

        self.total_width = digits(self.grand_total()).max(text_width(HEADER_TOTAL));
    }

    fn column_total(&self, column: usize) -> u64 {
        self.rows.iter().map(|row| row.cells[column].value).sum()
    }

    fn grand_total(&self) -> u64 {
        self.rows.iter().map(Row::total).sum()
    }

    fn write_line<I>(f: &mut fmt::Formatter<'_>, parts: I) -> fmt::Result
    where
        I: IntoIterator<Item = String>,
    {
        let parts: Vec<String> = parts.into_iter().collect();
        write!(f, " | {} | ", parts.join(" | "))
    }

    fn write_separator(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Self::write_line(
            f,
            std::iter::once(self.header_width)
                .chain(self.columns.iter().map(|column| column.width))
                .chain([self.total_width])
                .map(|width| "-".repeat(width)),
        )
    }
}

impl Row {
    fn total(&self) -> u64 {
        self.cells.iter().map(|cell| cell.value).sum()
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.rows.is_empty() || self.columns.is_empty() {
            return Ok(());
        }

        Self::write_line(
            f,
            std::iter::once(pad(&self.header, self.header_width))
                .chain(
                    self.columns
                        .iter()
                        .map(|column| pad(&column.header, column.width)),
                )
                .chain([pad(HEADER_TOTAL, self.total_width)]),
        )?;
        f.write_str("\n")?;
        self.write_separator(f)?;

        for row in &self.rows {
            f.write_str("\n")?;
            Self::write_line(
                f,
                std::iter::once(pad(&row.header, self.header_width))
                    .chain(
                        row.cells
                            .iter()
                            .map(|cell| pad(&cell.value.to_string(), cell.width)),
                    )
                    .chain([pad(&row.total().to_string(), self.total_width)]),
            )?;
        }

        f.write_str("\n")?;
        self.write_separator(f)?;
        f.write_str("\n")?;
        Self::write_line(
            f,
            std::iter::once(pad(HEADER_TOTAL, self.header_width))
                .chain(self.columns.iter().enumerate().map(|(index, column)| {
                    pad(&self.column_total(index).to_string(), column.width)
                }))
                .chain([pad(&self.grand_total().to_string(), self.total_width)]),
        )
    }
}

fn text_width(text: &str) -> usize {
    text.chars().count()
}

fn digits(value: u64) -> usize {
    value.to_string().len()
}

fn pad(text: &str, width: usize) -> String {
    format!("{text:<width$}")
}
