//! CSV export of answer rows

use csv::WriterBuilder;
use std::io;
use survey_core::{AnswerRow, SurveyError, SurveyResult};

/// Column names, in output order
pub const HEADER: [&str; 5] = [
    "Pesquisa Nome",
    "Alternativa Texto",
    "Alternativa Valor",
    "Resposta Alternativa",
    "Resposta Texto",
];

/// Write `rows` as CSV with a header line, even when there are no rows.
pub fn write_answer_rows<W: io::Write>(rows: &[AnswerRow], sink: W) -> SurveyResult<usize> {
    let export_err = |e: csv::Error| SurveyError::Export(e.to_string());

    let mut writer = WriterBuilder::new().has_headers(false).from_writer(sink);
    writer.write_record(HEADER).map_err(export_err)?;
    for row in rows {
        writer.serialize(row).map_err(export_err)?;
    }
    writer
        .flush()
        .map_err(|e| SurveyError::Export(e.to_string()))?;
    Ok(rows.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_export_still_has_header() {
        let mut out = Vec::new();
        assert_eq!(write_answer_rows(&[], &mut out).unwrap(), 0);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Pesquisa Nome,Alternativa Texto,Alternativa Valor,Resposta Alternativa,Resposta Texto\n"
        );
    }

    #[test]
    fn rows_are_quoted_when_needed() {
        let rows = vec![AnswerRow {
            research_title: "Sleep, revisited".into(),
            alternative_text: "8h".into(),
            alternative_value: 8,
            answer_alternative: "8h".into(),
            answer_text: None,
        }];
        let mut out = Vec::new();
        write_answer_rows(&rows, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().nth(1), Some("\"Sleep, revisited\",8h,8,8h,"));
    }
}
