use crate::types::{ReceiptItem, SummaryRow};
use rust_xlsxwriter::{Format, FormatAlign, Workbook, Worksheet, XlsxError};
use std::path::Path;

const SHEET_NAME: &str = "Sheet1";

/// Headers for the summary export (column order matches the summary table).
const SUMMARY_HEADERS: &[&str] = &["Company", "Date", "Discount", "Total", "Paid_by"];

/// Headers for the itemized export.
const ITEMS_HEADERS: &[&str] = &[
    "Description",
    "Quantity",
    "Unit Price",
    "Total",
    "Discounted Total",
    "ProductType",
];

/// Remove or replace characters that can corrupt the sheet XML and cause
/// "unreadable content" in Excel. Drops control chars (except tab, newline,
/// CR). Replaces & < > so raw XML is never broken.
fn sanitize_cell(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        let u = c as u32;
        if c == '\t' || c == '\n' || c == '\r' {
            out.push(c);
        } else if u < 0x20 || u == 0x7F || u == 0xFFFE || u == 0xFFFF {
            // skip control and invalid
        } else {
            match c {
                '&' => out.push_str(" and "),
                '<' => out.push(' '),
                '>' => out.push(' '),
                _ => out.push(c),
            }
        }
    }
    out
}

fn write_text_cell_safe(
    worksheet: &mut Worksheet,
    row: u32,
    col: u16,
    text: &str,
    format: &Format,
) -> Result<(), XlsxError> {
    let cleaned = sanitize_cell(text);
    worksheet
        .write_string_with_format(row, col, &cleaned, format)
        .map(|_| ())
}

/// Write number cell: parse as f64 and write a real number, or fall back to
/// sanitized text when the value is not numeric (e.g. "Unknown").
fn write_number_cell_safe(
    worksheet: &mut Worksheet,
    row: u32,
    col: u16,
    value: &str,
    number_format: &Format,
    text_format: &Format,
) -> Result<(), XlsxError> {
    let cleaned = value.replace(',', "").replace(' ', "").trim().to_string();
    match cleaned.parse::<f64>() {
        Ok(num) => worksheet
            .write_number_with_format(row, col, num, number_format)
            .map(|_| ()),
        Err(_) => {
            let text = sanitize_cell(value);
            worksheet
                .write_string_with_format(row, col, &text, text_format)
                .map(|_| ())
        }
    }
}

fn header_format() -> Format {
    Format::new()
        .set_bold()
        .set_background_color(rust_xlsxwriter::Color::RGB(0x2563EB))
        .set_font_color(rust_xlsxwriter::Color::RGB(0xFFFFFF))
}

fn amount_format() -> Format {
    Format::new()
        .set_num_format("#,##0.00")
        .set_align(FormatAlign::Right)
}

/// Estimate column width from text length (char count × 1.2, clamped 10–50).
fn estimate_text_width(text: &str) -> f64 {
    let w = text.chars().count() as f64 * 1.2;
    w.clamp(10.0, 50.0)
}

/// Per-column widths: max of header width and cell widths.
fn set_column_widths(
    worksheet: &mut Worksheet,
    headers: &[&str],
    rows: &[Vec<String>],
) -> Result<(), String> {
    for (col, header) in headers.iter().enumerate() {
        let mut width = estimate_text_width(header);
        for row in rows {
            if let Some(cell) = row.get(col) {
                let w = estimate_text_width(cell);
                if w > width {
                    width = w;
                }
            }
        }
        worksheet
            .set_column_width(col as u16, width)
            .map_err(|e: XlsxError| e.to_string())?;
    }
    Ok(())
}

fn write_headers(worksheet: &mut Worksheet, headers: &[&str]) -> Result<(), String> {
    let format = header_format();
    for (col, header) in headers.iter().enumerate() {
        write_text_cell_safe(worksheet, 0, col as u16, header, &format)
            .map_err(|e: XlsxError| e.to_string())?;
    }
    Ok(())
}

/// Serialize the summary row to a single-sheet xlsx byte stream.
pub fn summary_to_xlsx_bytes(summary: &SummaryRow) -> Result<Vec<u8>, String> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet
        .set_name(SHEET_NAME)
        .map_err(|e: XlsxError| e.to_string())?;

    let preview = vec![vec![
        summary.company.clone(),
        summary.date.clone(),
        format!("{}", summary.discount),
        summary.total.clone(),
        summary.paid_by.clone(),
    ]];
    set_column_widths(worksheet, SUMMARY_HEADERS, &preview)?;
    write_headers(worksheet, SUMMARY_HEADERS)?;

    let amount = amount_format();
    let text = Format::new();
    write_text_cell_safe(worksheet, 1, 0, &summary.company, &text)
        .map_err(|e: XlsxError| e.to_string())?;
    write_text_cell_safe(worksheet, 1, 1, &summary.date, &text)
        .map_err(|e: XlsxError| e.to_string())?;
    worksheet
        .write_number_with_format(1, 2, summary.discount, &amount)
        .map_err(|e: XlsxError| e.to_string())?;
    // Total may be a formatted amount or "Unknown".
    write_number_cell_safe(worksheet, 1, 3, &summary.total, &amount, &text)
        .map_err(|e: XlsxError| e.to_string())?;
    write_text_cell_safe(worksheet, 1, 4, &summary.paid_by, &text)
        .map_err(|e: XlsxError| e.to_string())?;

    let _ = worksheet.set_freeze_panes(1, 0);
    workbook.save_to_buffer().map_err(|e: XlsxError| e.to_string())
}

/// Serialize the items table to a single-sheet xlsx byte stream.
pub fn items_to_xlsx_bytes(items: &[ReceiptItem]) -> Result<Vec<u8>, String> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet
        .set_name(SHEET_NAME)
        .map_err(|e: XlsxError| e.to_string())?;

    let preview: Vec<Vec<String>> = items
        .iter()
        .map(|item| {
            vec![
                item.description.clone(),
                format!("{}", item.quantity),
                format!("{}", item.unit_price),
                format!("{}", item.total),
                format!("{}", item.discounted_total),
                item.product_type.clone(),
            ]
        })
        .collect();
    set_column_widths(worksheet, ITEMS_HEADERS, &preview)?;
    write_headers(worksheet, ITEMS_HEADERS)?;

    let amount = amount_format();
    let text = Format::new();
    for (row_idx, item) in items.iter().enumerate() {
        let row = (row_idx + 1) as u32;
        write_text_cell_safe(worksheet, row, 0, &item.description, &text)
            .map_err(|e: XlsxError| e.to_string())?;
        worksheet
            .write_number(row, 1, item.quantity)
            .map_err(|e: XlsxError| e.to_string())?;
        worksheet
            .write_number_with_format(row, 2, item.unit_price, &amount)
            .map_err(|e: XlsxError| e.to_string())?;
        worksheet
            .write_number_with_format(row, 3, item.total, &amount)
            .map_err(|e: XlsxError| e.to_string())?;
        worksheet
            .write_number_with_format(row, 4, item.discounted_total, &amount)
            .map_err(|e: XlsxError| e.to_string())?;
        write_text_cell_safe(worksheet, row, 5, &item.product_type, &text)
            .map_err(|e: XlsxError| e.to_string())?;
    }

    let _ = worksheet.set_freeze_panes(1, 0);
    workbook.save_to_buffer().map_err(|e: XlsxError| e.to_string())
}

/// Write spreadsheet bytes into the Downloads folder (Desktop fallback).
/// An existing file of the same name gets a counter suffix. Returns the
/// final path.
pub fn save_to_downloads(file_name: &str, bytes: &[u8]) -> Result<String, String> {
    let dir = dirs::download_dir()
        .or_else(dirs::desktop_dir)
        .ok_or("Could not find Downloads or Desktop folder.")?;

    let stem = Path::new(file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("export");
    let mut path = dir.join(format!("{}.xlsx", stem));
    let mut counter = 2u32;
    while path.exists() {
        path = dir.join(format!("{}_{}.xlsx", stem, counter));
        counter += 1;
    }

    std::fs::write(&path, bytes).map_err(|e| format!("Could not write file: {}", e))?;
    path.to_str()
        .map(String::from)
        .ok_or_else(|| "Invalid path characters.".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::{DataType, Reader, Xlsx};
    use std::io::Cursor;

    fn open_sheet(bytes: Vec<u8>) -> calamine::Range<calamine::Data> {
        let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes)).expect("valid xlsx");
        workbook.worksheet_range(SHEET_NAME).expect("Sheet1 present")
    }

    fn cell_string(range: &calamine::Range<calamine::Data>, row: u32, col: u32) -> String {
        range
            .get_value((row, col))
            .and_then(|c| c.as_string())
            .unwrap_or_default()
    }

    #[test]
    fn summary_round_trips_headers_and_values() {
        let summary = SummaryRow {
            company: "Spar".to_string(),
            date: "2024-10-12".to_string(),
            discount: 150.0,
            total: "4890".to_string(),
            paid_by: "Zita".to_string(),
        };
        let bytes = summary_to_xlsx_bytes(&summary).unwrap();
        let range = open_sheet(bytes);

        for (col, header) in SUMMARY_HEADERS.iter().enumerate() {
            assert_eq!(cell_string(&range, 0, col as u32), *header);
        }
        assert_eq!(cell_string(&range, 1, 0), "Spar");
        assert_eq!(cell_string(&range, 1, 1), "2024-10-12");
        assert_eq!(
            range.get_value((1, 2)).and_then(|c| c.as_f64()),
            Some(150.0)
        );
        assert_eq!(range.get_value((1, 3)).and_then(|c| c.as_f64()), Some(4890.0));
        assert_eq!(cell_string(&range, 1, 4), "Zita");
    }

    #[test]
    fn summary_keeps_unknown_total_as_text() {
        let summary = SummaryRow {
            company: "Spar".to_string(),
            date: "Unknown".to_string(),
            discount: 0.0,
            total: "Unknown".to_string(),
            paid_by: "Mátyás".to_string(),
        };
        let bytes = summary_to_xlsx_bytes(&summary).unwrap();
        let range = open_sheet(bytes);
        assert_eq!(cell_string(&range, 1, 3), "Unknown");
    }

    #[test]
    fn items_round_trip_headers_and_values() {
        let items = vec![
            ReceiptItem {
                description: "Milk 1.5%".to_string(),
                quantity: 2.0,
                unit_price: 350.0,
                total: 700.0,
                discounted_total: 650.0,
                product_type: "food".to_string(),
            },
            ReceiptItem {
                description: "Notebook".to_string(),
                quantity: 1.0,
                unit_price: 1200.0,
                total: 1200.0,
                discounted_total: 1200.0,
                product_type: "stationery".to_string(),
            },
        ];
        let bytes = items_to_xlsx_bytes(&items).unwrap();
        let range = open_sheet(bytes);

        for (col, header) in ITEMS_HEADERS.iter().enumerate() {
            assert_eq!(cell_string(&range, 0, col as u32), *header);
        }
        assert_eq!(cell_string(&range, 1, 0), "Milk 1.5%");
        assert_eq!(range.get_value((1, 3)).and_then(|c| c.as_f64()), Some(700.0));
        assert_eq!(cell_string(&range, 2, 0), "Notebook");
        assert_eq!(cell_string(&range, 2, 5), "stationery");
    }

    #[test]
    fn sanitize_strips_control_chars_and_xml_breakers() {
        assert_eq!(sanitize_cell("a\u{0001}b"), "ab");
        assert_eq!(sanitize_cell("Fish & Chips"), "Fish  and  Chips");
        assert_eq!(sanitize_cell("a<b>c"), "a b c");
        assert_eq!(sanitize_cell("line1\nline2"), "line1\nline2");
    }
}
