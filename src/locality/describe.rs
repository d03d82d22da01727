use anyhow::Result;
use quick_xml::escape::{resolve_html5_entity, unescape_with};
use regex::Regex;

/// Fields recovered from a feature's description table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Description {
    pub locality: Option<String>,
    pub lga: Option<String>,
}

/// Reads `locality` / `lga` rows out of the HTML table embedded in a KML description.
pub(crate) struct DescriptionParser {
    row: Regex,
    cell: Regex,
    tag: Regex,
}

impl DescriptionParser {
    pub(crate) fn new() -> Result<Self> {
        Ok(Self {
            row: Regex::new(r"(?is)<tr\b[^>]*>(.*?)</tr\s*>")?,
            cell: Regex::new(r"(?is)<td\b[^>]*>(.*?)</td\s*>")?,
            tag: Regex::new(r"(?s)<[^>]*>")?,
        })
    }

    /// Only rows with exactly two cells count. Labels match case-insensitively,
    /// values are kept verbatim (trimmed), and the first row for each label wins.
    pub(crate) fn parse(&self, html: &str) -> Description {
        let mut out = Description::default();

        for row in self.row.captures_iter(html) {
            let cells: Vec<_> = self.cell.captures_iter(&row[1]).collect();
            if cells.len() != 2 { continue }

            let label = self.text(&cells[0][1]).to_lowercase();
            let slot = match label.as_str() {
                "locality" => &mut out.locality,
                "lga" => &mut out.lga,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(self.text(&cells[1][1]));
            }
        }

        out
    }

    /// Text content of a cell: tags removed, HTML character references decoded, trimmed.
    /// A cell with an unknown reference is kept as written.
    fn text(&self, fragment: &str) -> String {
        let stripped = self.tag.replace_all(fragment, "");
        let decoded = unescape_with(&stripped, resolve_html5_entity)
            .map(|text| text.into_owned())
            .unwrap_or_else(|_| stripped.to_string());
        decoded.trim().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(html: &str) -> Description {
        DescriptionParser::new().unwrap().parse(html)
    }

    #[test]
    fn extracts_both_labels() {
        let html = r##"<html><body><table>
            <tr><th colspan="2">Attributes</th></tr>
            <tr bgcolor="#E3E3F3"><td>LOC_PID</td><td>QLD1234</td></tr>
            <tr><td>LOCALITY</td><td> Spring Hill </td></tr>
            <tr><td>Lga</td><td><span>Brisbane City</span></td></tr>
        </table></body></html>"##;
        assert_eq!(parse(html), Description {
            locality: Some("Spring Hill".into()),
            lga: Some("Brisbane City".into()),
        });
    }

    #[test]
    fn first_row_per_label_wins() {
        let html = "<table>\
            <tr><td>locality</td><td>First</td></tr>\
            <tr><td>locality</td><td>Second</td></tr>\
        </table>";
        assert_eq!(parse(html).locality.as_deref(), Some("First"));
    }

    #[test]
    fn rows_without_exactly_two_cells_are_ignored() {
        let html = "<table>\
            <tr><td>locality</td></tr>\
            <tr><td>lga</td><td>Logan City</td><td>extra</td></tr>\
            <tr><td>lga</td><td>Moreton Bay City</td></tr>\
        </table>";
        let description = parse(html);
        assert_eq!(description.locality, None);
        assert_eq!(description.lga.as_deref(), Some("Moreton Bay City"));
    }

    #[test]
    fn value_case_is_preserved() {
        let html = "<tr><TD>LGA</TD><TD>McDowall Shire</TD></tr>";
        assert_eq!(parse(html).lga.as_deref(), Some("McDowall Shire"));
    }

    #[test]
    fn cell_text_is_stripped_and_decoded() {
        let html = "<tr><td><b>Locality</b></td><td>  Mount&nbsp;Gravatt &amp; East&#39;s </td></tr>\
            <tr><td>lga</td><td>&bogus; Shire</td></tr>";
        let description = parse(html);
        assert_eq!(description.locality.as_deref(), Some("Mount\u{a0}Gravatt & East's"));
        assert_eq!(description.lga.as_deref(), Some("&bogus; Shire"));
    }

    #[test]
    fn empty_description_yields_nothing() {
        assert_eq!(parse(""), Description::default());
    }
}
