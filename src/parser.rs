use crate::types::PricePoint;

use chrono::NaiveDate;
use scraper::{Html, Selector};

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Invalid selector '{0}': {1}")]
    InvalidSelector(String, String),
    #[error("Table not found with selector '{0}', check if the source page was modified")]
    TableNotFound(String),
    #[error("Unknown month abbreviation: '{0}'")]
    UnknownMonth(String),
    #[error("Invalid month-year text: '{0}'")]
    InvalidMonthYear(String),
    #[error("Invalid price text: '{0}'")]
    InvalidPrice(String),
    #[error("Row has fewer than two cells: '{0}'")]
    MalformedRow(String),
}

/// Italian month abbreviations as printed in the tariff tables,
/// in calendar order.
const MONTH_ABBREVIATIONS: [&str; 12] = [
    "gen", "feb", "mar", "apr", "mag", "giu", "lug", "ago", "set", "ott", "nov", "dic",
];

/// Parses a localized month-year cell like `"mag 24"` into the first day of
/// that month (`2024-05-01`). Two-digit years are relative to 2000.
pub fn parse_month_year(text: &str) -> Result<NaiveDate, ParseError> {
    let mut tokens = text.split_whitespace();
    let (Some(month), Some(year), None) = (tokens.next(), tokens.next(), tokens.next()) else {
        return Err(ParseError::InvalidMonthYear(text.to_string()));
    };

    let month_number = MONTH_ABBREVIATIONS
        .iter()
        .position(|abbr| abbr.eq_ignore_ascii_case(month))
        .map(|idx| idx as u32 + 1)
        .ok_or_else(|| ParseError::UnknownMonth(month.to_string()))?;

    let year = year
        .parse::<i32>()
        .map_err(|_| ParseError::InvalidMonthYear(text.to_string()))?;

    NaiveDate::from_ymd_opt(2000 + year, month_number, 1)
        .ok_or_else(|| ParseError::InvalidMonthYear(text.to_string()))
}

/// Parses a price cell using the Italian comma decimal separator ("0,1024").
pub fn parse_price(text: &str) -> Result<f64, ParseError> {
    text.trim()
        .replace(',', ".")
        .parse::<f64>()
        .map_err(|_| ParseError::InvalidPrice(text.trim().to_string()))
}

/// Extracts `(date, price)` rows from the table body located by `selector`.
///
/// The first row is a header and is always skipped. A row whose date or price
/// cell fails to parse is skipped with a warning; the remaining rows are still
/// returned, in document order. Only a missing table is an error: that means
/// the page layout changed and the scraper is broken.
pub fn extract_price_table(html: &str, selector: &str) -> Result<Vec<PricePoint>, ParseError> {
    let document = Html::parse_document(html);
    let table_selector = Selector::parse(selector)
        .map_err(|e| ParseError::InvalidSelector(selector.to_string(), e.to_string()))?;

    let table = document
        .select(&table_selector)
        .next()
        .ok_or_else(|| ParseError::TableNotFound(selector.to_string()))?;

    let row_selector = Selector::parse("tr").unwrap();
    let cell_selector = Selector::parse("td, th").unwrap();

    let mut points = Vec::new();
    for row in table.select(&row_selector).skip(1) {
        let cells: Vec<String> = row
            .select(&cell_selector)
            .map(|cell| cell.text().collect::<String>().trim().to_string())
            .collect();

        match parse_row(&cells) {
            Ok(point) => points.push(point),
            Err(e) => log::warn!("Skipping malformed table row {:?}: {}", cells, e),
        }
    }

    Ok(points)
}

fn parse_row(cells: &[String]) -> Result<PricePoint, ParseError> {
    let [date_text, price_text, ..] = cells else {
        return Err(ParseError::MalformedRow(cells.join(" | ")));
    };

    Ok(PricePoint {
        date: parse_month_year(date_text)?,
        price: parse_price(price_text)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_month_year_to_first_of_month() {
        assert_eq!(
            parse_month_year("mag 24").unwrap(),
            NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
        );
        assert_eq!(
            parse_month_year("dic 99").unwrap(),
            NaiveDate::from_ymd_opt(2099, 12, 1).unwrap()
        );
        assert_eq!(
            parse_month_year("gen 00").unwrap(),
            NaiveDate::from_ymd_opt(2000, 1, 1).unwrap()
        );
    }

    #[test]
    fn month_abbreviation_is_case_insensitive() {
        assert_eq!(
            parse_month_year("Mag 24").unwrap(),
            NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
        );
    }

    #[test]
    fn unknown_month_abbreviation_is_an_error() {
        assert!(matches!(
            parse_month_year("may 24"),
            Err(ParseError::UnknownMonth(_))
        ));
    }

    #[test]
    fn malformed_month_year_is_an_error() {
        assert!(matches!(
            parse_month_year("mag"),
            Err(ParseError::InvalidMonthYear(_))
        ));
        assert!(matches!(
            parse_month_year("mag 24 extra"),
            Err(ParseError::InvalidMonthYear(_))
        ));
        assert!(matches!(
            parse_month_year("mag xx"),
            Err(ParseError::InvalidMonthYear(_))
        ));
    }

    #[test]
    fn parses_comma_decimal_prices() {
        assert_eq!(parse_price("0,1024").unwrap(), 0.1024);
        assert_eq!(parse_price(" 0.39 ").unwrap(), 0.39);
        assert!(matches!(
            parse_price("n.d."),
            Err(ParseError::InvalidPrice(_))
        ));
    }

    const SAMPLE_TABLE: &str = r#"
        <html><body><div><table><tbody>
            <tr><th>Mese</th><th>Prezzo</th></tr>
            <tr><td>mar 24</td><td>0,0891</td></tr>
            <tr><td>apr 24</td><td>0,0925</td></tr>
            <tr><td>mag 24</td><td>0,1012</td></tr>
        </tbody></table></div></body></html>
    "#;

    #[test]
    fn extracts_rows_in_document_order_skipping_the_header() {
        let points = extract_price_table(SAMPLE_TABLE, "table tbody").unwrap();

        assert_eq!(points.len(), 3);
        assert_eq!(points[0].date, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert_eq!(points[0].price, 0.0891);
        assert_eq!(points[2].date, NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
        assert_eq!(points[2].price, 0.1012);
    }

    #[test]
    fn header_only_table_yields_no_points() {
        let html = r#"
            <table><tbody>
                <tr><th>Mese</th><th>Prezzo</th></tr>
            </tbody></table>
        "#;

        let points = extract_price_table(html, "table tbody").unwrap();
        assert!(points.is_empty());
    }

    #[test]
    fn malformed_row_is_skipped_without_aborting_the_table() {
        let html = r#"
            <table><tbody>
                <tr><th>Mese</th><th>Prezzo</th></tr>
                <tr><td>mar 24</td><td>0,0891</td></tr>
                <tr><td>apr 24</td><td>n.d.</td></tr>
                <tr><td>mag 24</td><td>0,1012</td></tr>
            </tbody></table>
        "#;

        let points = extract_price_table(html, "table tbody").unwrap();

        assert_eq!(points.len(), 2);
        assert_eq!(points[0].date, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert_eq!(points[1].date, NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
    }

    #[test]
    fn row_with_a_single_cell_is_skipped() {
        let html = r#"
            <table><tbody>
                <tr><th>Mese</th><th>Prezzo</th></tr>
                <tr><td>mar 24</td><td>0,0891</td></tr>
                <tr><td>nessun dato</td></tr>
            </tbody></table>
        "#;

        let points = extract_price_table(html, "table tbody").unwrap();
        assert_eq!(points.len(), 1);
    }

    #[test]
    fn structural_selector_distinguishes_sibling_tables() {
        let html = r#"
            <html><body>
                <div><table><tbody>
                    <tr><th>Mese</th><th>PUN</th></tr>
                    <tr><td>mag 24</td><td>0,1012</td></tr>
                </tbody></table></div>
                <div><table><tbody>
                    <tr><th>Mese</th><th>PSV</th></tr>
                    <tr><td>mag 24</td><td>0,3421</td></tr>
                </tbody></table></div>
            </body></html>
        "#;

        let psv = extract_price_table(html, "body > div:nth-of-type(2) table tbody").unwrap();
        assert_eq!(psv.len(), 1);
        assert_eq!(psv[0].price, 0.3421);
    }

    #[test]
    fn missing_table_is_an_error_carrying_the_selector() {
        let err = extract_price_table("<html><body></body></html>", "table tbody").unwrap_err();
        assert!(matches!(err, ParseError::TableNotFound(ref s) if s == "table tbody"));
    }

    #[test]
    fn unparseable_selector_is_an_error() {
        assert!(matches!(
            extract_price_table("<html></html>", ":::"),
            Err(ParseError::InvalidSelector(..))
        ));
    }
}
