//! Excel workbooks: first worksheet, first row as header

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};

use super::FormatReader;
use crate::error::{ReadError, ReadResult};
use crate::schema::ColumnSchema;
use crate::token_type::{classify, TokenType};

pub struct ExcelFormat;

impl FormatReader for ExcelFormat {
    fn infer(&self, path: &Path, sample_rows: usize) -> ReadResult<ColumnSchema> {
        let mut workbook = open_workbook_auto(path)?;
        let range = workbook.worksheet_range_at(0).ok_or(ReadError::NoWorksheet)??;

        let mut rows = range.rows();
        let Some(header) = rows.next() else {
            return Ok(ColumnSchema::new());
        };

        let mut kinds = vec![CellKind::Null; header.len()];
        for row in rows.take(sample_rows) {
            for (kind, cell) in kinds.iter_mut().zip(row) {
                *kind = kind.unify(CellKind::of(cell));
            }
        }

        Ok(header
            .iter()
            .enumerate()
            .map(|(index, cell)| header_name(cell, index))
            .zip(kinds)
            .map(|(name, kind)| (name, kind.label()))
            .collect())
    }
}

/// Kind of value seen in a column so far
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CellKind {
    Null,
    Bool,
    Int,
    Float,
    Datetime,
    Duration,
    Str,
}

impl CellKind {
    fn of(cell: &Data) -> Self {
        match cell {
            Data::Empty => CellKind::Null,
            Data::Bool(_) => CellKind::Bool,
            Data::Int(_) => CellKind::Int,
            // xlsx stores every number as a double
            Data::Float(f) if f.is_finite() && f.fract() == 0.0 => CellKind::Int,
            Data::Float(_) => CellKind::Float,
            Data::DateTime(_) | Data::DateTimeIso(_) => CellKind::Datetime,
            Data::DurationIso(_) => CellKind::Duration,
            Data::String(text) => CellKind::of_text(text),
            Data::Error(_) => CellKind::Str,
            #[allow(unreachable_patterns)]
            _ => CellKind::Str,
        }
    }

    /// Text cells typed by the token classifier
    fn of_text(text: &str) -> Self {
        match classify(text) {
            TokenType::Int => CellKind::Int,
            TokenType::Float => CellKind::Float,
            TokenType::Date => CellKind::Datetime,
            TokenType::String => CellKind::Str,
        }
    }

    /// Narrowest kind holding both; empty cells never widen a column
    fn unify(self, other: Self) -> Self {
        match (self, other) {
            (a, b) if a == b => a,
            (CellKind::Null, b) => b,
            (a, CellKind::Null) => a,
            (CellKind::Int, CellKind::Float) | (CellKind::Float, CellKind::Int) => CellKind::Float,
            _ => CellKind::Str,
        }
    }

    fn label(self) -> &'static str {
        match self {
            CellKind::Null => "Null",
            CellKind::Bool => "Boolean",
            CellKind::Int => "Int64",
            CellKind::Float => "Float64",
            CellKind::Datetime => "Datetime",
            CellKind::Duration => "Duration",
            CellKind::Str => "String",
        }
    }
}

fn header_name(cell: &Data, index: usize) -> String {
    match cell {
        Data::Empty => format!("__UNNAMED__{index}"),
        Data::String(name) => name.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;
    use zip::write::SimpleFileOptions;
    use zip::{CompressionMethod, ZipWriter};

    const WORKBOOK: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
<sheets><sheet name="Orders" sheetId="1" r:id="rId1"/></sheets>
</workbook>"#;

    const WORKBOOK_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
</Relationships>"#;

    const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>
<Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>
</Types>"#;

    const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
</Relationships>"#;

    fn text(cell: &str, value: &str) -> String {
        format!(r#"<c r="{cell}" t="inlineStr"><is><t>{value}</t></is></c>"#)
    }

    fn number(cell: &str, value: &str) -> String {
        format!(r#"<c r="{cell}"><v>{value}</v></c>"#)
    }

    /// Minimal single-sheet workbook; each row is a list of rendered cells
    fn write_workbook(path: &Path, rows: &[Vec<String>]) {
        let sheet_data: String = rows
            .iter()
            .enumerate()
            .map(|(i, cells)| format!(r#"<row r="{}">{}</row>"#, i + 1, cells.concat()))
            .collect();
        let sheet = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>{sheet_data}</sheetData></worksheet>"#
        );

        let mut zip = ZipWriter::new(File::create(path).unwrap());
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        for (name, body) in [
            ("[Content_Types].xml", CONTENT_TYPES),
            ("_rels/.rels", ROOT_RELS),
            ("xl/workbook.xml", WORKBOOK),
            ("xl/_rels/workbook.xml.rels", WORKBOOK_RELS),
            ("xl/worksheets/sheet1.xml", sheet.as_str()),
        ] {
            zip.start_file(name, options).unwrap();
            zip.write_all(body.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }

    #[test]
    fn test_reads_header_and_types_from_workbook() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("orders.xlsx");
        write_workbook(
            &path,
            &[
                vec![text("A1", "id"), text("B1", "amount"), text("C1", "placed"), text("D1", "note")],
                vec![number("A2", "1"), number("B2", "2.5"), text("C2", "2024-01-05"), text("D2", "rush")],
                vec![number("A3", "2"), number("B3", "3"), text("C3", "2024-01-06"), text("D3", "12")],
            ],
        );

        let schema = ExcelFormat.infer(&path, 100).unwrap();
        assert_eq!(schema.names().collect::<Vec<_>>(), vec!["id", "amount", "placed", "note"]);
        assert_eq!(schema.get("id"), Some("Int64"));
        assert_eq!(schema.get("amount"), Some("Float64"));
        assert_eq!(schema.get("placed"), Some("Datetime"));
        assert_eq!(schema.get("note"), Some("String"));
    }

    #[test]
    fn test_workbook_sampling_stops_at_sample_rows() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("late.xlsx");
        write_workbook(
            &path,
            &[
                vec![text("A1", "value")],
                vec![number("A2", "1")],
                vec![number("A3", "2")],
                vec![text("A4", "not a number")],
            ],
        );

        assert_eq!(ExcelFormat.infer(&path, 2).unwrap().get("value"), Some("Int64"));
        assert_eq!(ExcelFormat.infer(&path, 10).unwrap().get("value"), Some("String"));
    }

    #[test]
    fn test_whole_floats_are_ints() {
        assert_eq!(CellKind::of(&Data::Float(3.0)), CellKind::Int);
        assert_eq!(CellKind::of(&Data::Float(3.5)), CellKind::Float);
        assert_eq!(CellKind::of(&Data::Float(f64::INFINITY)), CellKind::Float);
    }

    #[test]
    fn test_text_cells_use_token_classifier() {
        assert_eq!(CellKind::of(&Data::String("42".into())), CellKind::Int);
        assert_eq!(CellKind::of(&Data::String("4.2".into())), CellKind::Float);
        assert_eq!(CellKind::of(&Data::String("2024-01-05".into())), CellKind::Datetime);
        assert_eq!(CellKind::of(&Data::String("north".into())), CellKind::Str);
    }

    #[test]
    fn test_unify_widens_numbers_and_ignores_empty() {
        let kinds = [Data::Empty, Data::Int(1), Data::Float(2.5), Data::Empty];
        let kind = kinds
            .iter()
            .fold(CellKind::Null, |acc, cell| acc.unify(CellKind::of(cell)));
        assert_eq!(kind.label(), "Float64");
    }

    #[test]
    fn test_mixed_values_become_strings() {
        let kind = CellKind::Bool.unify(CellKind::of(&Data::Int(3)));
        assert_eq!(kind, CellKind::Str);
        assert_eq!(CellKind::Null.unify(CellKind::Null).label(), "Null");
    }

    #[test]
    fn test_header_names() {
        assert_eq!(header_name(&Data::String("id".into()), 0), "id");
        assert_eq!(header_name(&Data::Empty, 3), "__UNNAMED__3");
        assert_eq!(header_name(&Data::Int(2024), 1), "2024");
    }
}
