use std::io::{Cursor, Read};

use calamine::{open_workbook_from_rs, Data, Reader, Xlsx};

use super::IngestionError;

/// Untyped sheet contents: trimmed header cells and the text of every data row.
#[derive(Debug, Default)]
pub(crate) struct RawTable {
    pub(crate) headers: Vec<String>,
    pub(crate) rows: Vec<RawRow>,
}

#[derive(Debug)]
pub(crate) struct RawRow {
    /// Row number as the operator sees it in the sheet (the header is row 1).
    pub(crate) number: usize,
    pub(crate) cells: Vec<String>,
}

impl RawRow {
    pub(crate) fn cell(&self, index: usize) -> &str {
        self.cells.get(index).map(String::as_str).unwrap_or("")
    }
}

pub(crate) fn read_csv<R: Read>(reader: R) -> Result<RawTable, IngestionError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers = csv_reader
        .headers()?
        .iter()
        .map(clean_header)
        .collect::<Vec<_>>();

    let mut rows = Vec::new();
    for (index, record) in csv_reader.records().enumerate() {
        let record = record?;
        let cells = record.iter().map(tidy_numeric).collect::<Vec<_>>();
        push_row(&mut rows, index + 2, cells);
    }

    Ok(RawTable { headers, rows })
}

/// Reads the first worksheet of an `.xlsx` workbook.
pub(crate) fn read_xlsx(bytes: Vec<u8>) -> Result<RawTable, IngestionError> {
    let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(IngestionError::EmptyWorkbook)??;

    let mut sheet_rows = range.rows();
    let headers = match sheet_rows.next() {
        Some(cells) => cells
            .iter()
            .map(|cell| clean_header(&cell_text(cell)))
            .collect(),
        None => return Err(IngestionError::EmptyWorkbook),
    };

    let mut rows = Vec::new();
    for (index, cells) in sheet_rows.enumerate() {
        let cells = cells.iter().map(cell_text).collect::<Vec<_>>();
        push_row(&mut rows, index + 2, cells);
    }

    Ok(RawTable { headers, rows })
}

fn push_row(rows: &mut Vec<RawRow>, number: usize, cells: Vec<String>) {
    if cells.iter().all(|cell| cell.is_empty()) {
        return;
    }
    rows.push(RawRow { number, cells });
}

fn clean_header(raw: &str) -> String {
    raw.trim_start_matches('\u{feff}').trim().to_string()
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::String(value) | Data::DateTimeIso(value) | Data::DurationIso(value) => {
            value.trim().to_string()
        }
        Data::Int(value) => value.to_string(),
        Data::Float(value) => format_float(*value),
        Data::Bool(value) => value.to_string(),
        Data::DateTime(value) => format_float(value.as_f64()),
        _ => String::new(),
    }
}

fn format_float(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

/// `2.0` and `9876543210.00` become `2` and `9876543210`; everything else is kept verbatim.
fn tidy_numeric(raw: &str) -> String {
    let trimmed = raw.trim();
    if let Some((whole, fraction)) = trimmed.split_once('.') {
        let digits = whole.strip_prefix('-').unwrap_or(whole);
        if !digits.is_empty()
            && digits.chars().all(|c| c.is_ascii_digit())
            && !fraction.is_empty()
            && fraction.chars().all(|c| c == '0')
        {
            return whole.to_string();
        }
    }
    trimmed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_headers_are_trimmed_and_bom_stripped() {
        let input = "\u{feff} Student Name ,Email,Total Payment Dues\nAsha,asha@x.com,500\n";
        let table = read_csv(input.as_bytes()).expect("csv parses");
        assert_eq!(
            table.headers,
            vec!["Student Name", "Email", "Total Payment Dues"]
        );
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0].number, 2);
        assert_eq!(table.rows[0].cell(2), "500");
    }

    #[test]
    fn blank_rows_are_skipped_but_numbering_is_kept() {
        let input = "Student Name,Email,Total Payment Dues\nAsha,a@x.com,1\n,,\nRavi,r@x.com,2\n";
        let table = read_csv(input.as_bytes()).expect("csv parses");
        let numbers = table.rows.iter().map(|row| row.number).collect::<Vec<_>>();
        assert_eq!(numbers, vec![2, 4]);
    }

    #[test]
    fn short_rows_read_as_empty_cells() {
        let input = "Student Name,Email,Total Payment Dues,City\nAsha,a@x.com,1\n";
        let table = read_csv(input.as_bytes()).expect("csv parses");
        assert_eq!(table.rows[0].cell(3), "");
    }

    #[test]
    fn integral_floats_lose_their_fraction() {
        assert_eq!(tidy_numeric("2.0"), "2");
        assert_eq!(tidy_numeric("9876543210.00"), "9876543210");
        assert_eq!(tidy_numeric("12.50"), "12.50");
        assert_eq!(tidy_numeric("v1.0"), "v1.0");
        assert_eq!(format_float(10.0), "10");
        assert_eq!(format_float(2.5), "2.5");
    }

    #[test]
    fn xlsx_cells_render_without_trailing_zero() {
        assert_eq!(cell_text(&Data::Float(9876543210.0)), "9876543210");
        assert_eq!(cell_text(&Data::Int(4)), "4");
        assert_eq!(cell_text(&Data::String(" KG ".to_string())), "KG");
        assert_eq!(cell_text(&Data::Empty), "");
    }

    #[test]
    fn garbage_bytes_are_not_a_workbook() {
        assert!(matches!(
            read_xlsx(b"not a zip archive".to_vec()),
            Err(IngestionError::Spreadsheet(_))
        ));
    }
}
