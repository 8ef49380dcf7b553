use rust_decimal::prelude::ToPrimitive;
use rust_xlsxwriter::{Format, Workbook, XlsxError};

use crate::workflows::admissions::AdmissionRequest;
use crate::workflows::fees::{format_amount, ColumnLayout, ColumnRole, FeeRecord};

use super::pdf::{fit_to_width, PdfCanvas, MARGIN, PAGE_HEIGHT, PAGE_WIDTH};
use super::DocumentError;

/// Row cap of the PDF table export.
pub const PDF_ROW_LIMIT: usize = 30;

const PDF_FONT_SIZE: f32 = 8.0;
const PDF_ROW_HEIGHT: f32 = PDF_FONT_SIZE * 1.5;
const PAYMENT_LINK_HEADER: &str = "Payment Link";
const PAYMENT_QR_HEADER: &str = "Payment QR";

const ROSTER_HEADERS: [&str; 10] = [
    "Timestamp",
    "Student Name",
    "Father's Name",
    "Mother's Name",
    "Address",
    "Class",
    "Parent's Mobile Number",
    "Registration Fee Payment (₹)",
    "Status",
    "Admin Comment",
];

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("csv export failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("xlsx export failed: {0}")]
    Xlsx(#[from] XlsxError),
    #[error(transparent)]
    Pdf(#[from] DocumentError),
}

fn record_headers(layout: &ColumnLayout) -> Vec<String> {
    layout
        .columns()
        .iter()
        .map(|column| column.header.clone())
        .chain([PAYMENT_LINK_HEADER.to_string(), PAYMENT_QR_HEADER.to_string()])
        .collect()
}

fn record_row(layout: &ColumnLayout, record: &FeeRecord) -> Vec<String> {
    layout
        .columns()
        .iter()
        .map(|column| record.value_for(column))
        .chain([
            record.payment_link.clone(),
            record
                .payment_qr
                .as_ref()
                .map(|qr| qr.data_uri().to_string())
                .unwrap_or_default(),
        ])
        .collect()
}

fn roster_row(request: &AdmissionRequest) -> [String; 10] {
    [
        request.submitted_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        request.fields.student_name.clone(),
        request.fields.father_name.clone(),
        request.fields.mother_name.clone(),
        request.fields.address.clone(),
        request.fields.class.clone(),
        request.fields.parent_mobile.clone(),
        format_amount(request.fields.registration_fee),
        request.status.label().to_string(),
        request.admin_comment.clone(),
    ]
}

fn write_csv<I, R>(headers: &[String], rows: I) -> Result<Vec<u8>, ExportError>
where
    I: IntoIterator<Item = R>,
    R: IntoIterator<Item = String>,
{
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(headers)?;
    for row in rows {
        writer.write_record(row)?;
    }
    writer
        .into_inner()
        .map_err(|err| ExportError::Csv(csv::Error::from(err.into_error())))
}

/// Sheet export of the given records, including the generated payment columns.
pub fn export_records_csv(
    layout: &ColumnLayout,
    records: &[&FeeRecord],
) -> Result<Vec<u8>, ExportError> {
    write_csv(
        &record_headers(layout),
        records.iter().map(|record| record_row(layout, record)),
    )
}

pub fn export_records_xlsx(
    layout: &ColumnLayout,
    records: &[&FeeRecord],
) -> Result<Vec<u8>, ExportError> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();
    let worksheet = workbook.add_worksheet();

    for (col, header) in record_headers(layout).iter().enumerate() {
        worksheet.write_string_with_format(0, column_index(col), header, &header_format)?;
    }

    for (index, record) in records.iter().enumerate() {
        let row = row_index(index + 1);
        for (col, column) in layout.columns().iter().enumerate() {
            let col = column_index(col);
            match column.role {
                ColumnRole::Dues => {
                    worksheet.write_number(row, col, record.dues.to_f64().unwrap_or_default())?;
                }
                ColumnRole::PastDelayCount => {
                    if let Some(count) = record.past_delay_count {
                        worksheet.write_number(row, col, f64::from(count))?;
                    }
                }
                _ => {
                    worksheet.write_string(row, col, record.value_for(column))?;
                }
            }
        }
        let link_col = column_index(layout.columns().len());
        worksheet.write_string(row, link_col, &record.payment_link)?;
        if let Some(qr) = &record.payment_qr {
            worksheet.write_string(row, link_col + 1, qr.data_uri())?;
        }
    }

    Ok(workbook.save_to_buffer()?)
}

/// Equal-width table of the first [`PDF_ROW_LIMIT`] records, paginated with a repeated header row.
pub fn export_records_pdf(
    layout: &ColumnLayout,
    records: &[&FeeRecord],
) -> Result<Vec<u8>, ExportError> {
    let mut headers: Vec<String> = layout
        .columns()
        .iter()
        .map(|column| column.header.clone())
        .collect();
    headers.push(PAYMENT_LINK_HEADER.to_string());

    let column_width = PAGE_WIDTH / (headers.len() as f32 + 1.0);
    let table_width = column_width * headers.len() as f32;
    let left = ((PAGE_WIDTH - table_width) / 2.0).max(0.0);

    let mut canvas = PdfCanvas::new();
    let mut y = PAGE_HEIGHT - MARGIN - PDF_ROW_HEIGHT;
    draw_row(&mut canvas, left, y, column_width, &headers);
    y -= PDF_ROW_HEIGHT;

    for record in records.iter().take(PDF_ROW_LIMIT) {
        if y < MARGIN {
            canvas.new_page();
            y = PAGE_HEIGHT - MARGIN - PDF_ROW_HEIGHT;
            draw_row(&mut canvas, left, y, column_width, &headers);
            y -= PDF_ROW_HEIGHT;
        }
        let mut cells: Vec<String> = layout
            .columns()
            .iter()
            .map(|column| record.value_for(column))
            .collect();
        cells.push(record.payment_link.clone());
        draw_row(&mut canvas, left, y, column_width, &cells);
        y -= PDF_ROW_HEIGHT;
    }

    Ok(canvas.finish()?)
}

fn draw_row(canvas: &mut PdfCanvas, left: f32, y: f32, column_width: f32, cells: &[String]) {
    const PADDING: f32 = 2.0;
    for (index, cell) in cells.iter().enumerate() {
        let x = left + column_width * index as f32;
        canvas.rect(x, y, column_width, PDF_ROW_HEIGHT);
        let text = fit_to_width(cell, column_width - 2.0 * PADDING, PDF_FONT_SIZE);
        canvas.text(x + PADDING, y + PADDING + 1.0, PDF_FONT_SIZE, &text);
    }
}

/// Approved admissions with their form fields, decision and comment.
pub fn export_roster_csv(roster: &[AdmissionRequest]) -> Result<Vec<u8>, ExportError> {
    let headers: Vec<String> = ROSTER_HEADERS.iter().map(|h| h.to_string()).collect();
    write_csv(&headers, roster.iter().map(roster_row))
}

pub fn export_roster_xlsx(roster: &[AdmissionRequest]) -> Result<Vec<u8>, ExportError> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();
    let worksheet = workbook.add_worksheet();

    for (col, header) in ROSTER_HEADERS.iter().enumerate() {
        worksheet.write_string_with_format(0, column_index(col), *header, &header_format)?;
    }
    for (index, request) in roster.iter().enumerate() {
        let row = row_index(index + 1);
        for (col, value) in roster_row(request).iter().enumerate() {
            if col == 7 {
                let fee = request.fields.registration_fee.to_f64().unwrap_or_default();
                worksheet.write_number(row, column_index(col), fee)?;
            } else {
                worksheet.write_string(row, column_index(col), value)?;
            }
        }
    }

    Ok(workbook.save_to_buffer()?)
}

fn row_index(index: usize) -> u32 {
    u32::try_from(index).unwrap_or(u32::MAX)
}

fn column_index(index: usize) -> u16 {
    u16::try_from(index).unwrap_or(u16::MAX)
}
