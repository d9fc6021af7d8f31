use std::{path::Path, str::FromStr, sync::OnceLock};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::db::models::Annotation;
use crate::error::LinkError;

/// Decoded `NOTERPAGE:` link. A link without a usable fragment still carries
/// its path; the location fields are then absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoterPageLink {
    pub pdf_path: String,
    pub page: Option<u32>,
    pub x: Option<f64>,
    pub y: Option<f64>,
}

fn fragment_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(\d+)\s+([0-9.]+)\s+\.\s+([0-9.]+)").expect("fragment pattern is valid")
    })
}

impl FromStr for NoterPageLink {
    type Err = LinkError;

    fn from_str(link: &str) -> Result<Self, Self::Err> {
        let decoded = urlencoding::decode(link)
            .map(|cow| cow.into_owned())
            .unwrap_or_else(|_| link.to_string());

        // Paths may contain ':' themselves, so only the scheme is dropped.
        let mut segments = decoded.split(':');
        segments.next();
        let rest: Vec<&str> = segments.collect();
        if rest.is_empty() {
            return Err(LinkError::MissingSchemeSeparator(link.to_string()));
        }
        let path_and_fragment = rest.join(":");

        let (raw_path, fragment) = match path_and_fragment.split_once('#') {
            Some((path, fragment)) => (path, fragment),
            None => (path_and_fragment.as_str(), ""),
        };
        let pdf_path = raw_path.trim().to_string();
        let fragment = fragment
            .trim()
            .trim_matches(|c| c == '(' || c == ')');

        let mut parsed = NoterPageLink {
            pdf_path,
            page: None,
            x: None,
            y: None,
        };

        if let Some(caps) = fragment_pattern().captures(fragment) {
            // Textual order is (page y . x). All three or none.
            let location = (
                caps[1].parse::<u32>(),
                caps[2].parse::<f64>(),
                caps[3].parse::<f64>(),
            );
            if let (Ok(page), Ok(y), Ok(x)) = location {
                parsed.page = Some(page);
                parsed.y = Some(y);
                parsed.x = Some(x);
            }
        }

        Ok(parsed)
    }
}

/// Parse a NOTERPAGE link. Returns `None` only when the link has no `:` at all.
pub fn parse_noter_page_link(link: &str) -> Option<NoterPageLink> {
    link.parse().ok()
}

/// Pull the target out of an org-style `[[target][description]]` link.
/// Text that is not bracketed is returned trimmed.
pub fn extract_link_target(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(inner) = trimmed.strip_prefix("[[") else {
        return trimmed;
    };
    match inner.find("][") {
        Some(end) => &inner[..end],
        None => inner.strip_suffix("]]").unwrap_or(inner),
    }
}

fn strip_quotes(value: &str) -> String {
    value.replace('"', "")
}

fn file_base_name(file: &str) -> String {
    Path::new(file)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| file.to_string())
}

/// Render an annotation as the org link the desktop side pastes into notes:
/// `[[NOTERPAGE:{file}#({page} {y} . {x})][{contents} < {outlines} < {name}]]`.
pub fn format_annotation_for_noter_page(annotation: &Annotation) -> String {
    let file = strip_quotes(&annotation.file);
    let contents = strip_quotes(&annotation.contents);
    let outlines = strip_quotes(&annotation.outlines);
    let base_name = file_base_name(&file);

    let target = match annotation.ratios() {
        Some((x, y)) => format!("NOTERPAGE:{file}#({} {y} . {x})", annotation.page),
        None => {
            log::warn!(
                "annotation {} has unreadable edges '{}'; linking to file only",
                annotation.id,
                annotation.edges
            );
            format!("NOTERPAGE:{file}")
        }
    };

    let description = if outlines.is_empty() {
        format!("{contents} < {base_name}")
    } else {
        format!("{contents} < {outlines} < {base_name}")
    };

    format!("[[{target}][{description}]]")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn annotation(edges: &str, outlines: &str) -> Annotation {
        Annotation {
            id: "/docs/paper.pdf#1700000000".into(),
            file: "/docs/paper.pdf".into(),
            page: 4,
            edges: edges.into(),
            kind: "text".into(),
            color: String::new(),
            contents: "a \"quoted\" note".into(),
            subject: String::new(),
            created: "(25939 61696)".into(),
            modified: "(25939 61696)".into(),
            outlines: outlines.into(),
        }
    }

    #[test]
    fn parses_page_y_then_x() {
        let link = parse_noter_page_link("noterpage:/x.pdf#(3 0.25 . 0.75)").unwrap();
        assert_eq!(link.pdf_path, "/x.pdf");
        assert_eq!(link.page, Some(3));
        assert_eq!(link.y, Some(0.25));
        assert_eq!(link.x, Some(0.75));
    }

    #[test]
    fn path_without_fragment_is_partial_success() {
        let link = parse_noter_page_link("noterpage:/a/b.pdf").unwrap();
        assert_eq!(link.pdf_path, "/a/b.pdf");
        assert_eq!(link.page, None);
        assert_eq!(link.x, None);
        assert_eq!(link.y, None);
    }

    #[test]
    fn missing_scheme_separator_fails() {
        assert!(parse_noter_page_link("/a/b.pdf#(1 0.1 . 0.2)").is_none());
        assert_eq!(
            "plain".parse::<NoterPageLink>(),
            Err(LinkError::MissingSchemeSeparator("plain".into()))
        );
    }

    #[test]
    fn keeps_colons_inside_the_path() {
        let link = parse_noter_page_link("NOTERPAGE:C:/Users/me/a.pdf#(2 0.5 . 0.5)").unwrap();
        assert_eq!(link.pdf_path, "C:/Users/me/a.pdf");
        assert_eq!(link.page, Some(2));
    }

    #[test]
    fn decodes_percent_escapes() {
        let link = parse_noter_page_link("NOTERPAGE:/my%20docs/a.pdf#(7%200.1%20.%200.9)").unwrap();
        assert_eq!(link.pdf_path, "/my docs/a.pdf");
        assert_eq!(link.page, Some(7));
        assert_eq!(link.y, Some(0.1));
        assert_eq!(link.x, Some(0.9));
    }

    #[test]
    fn garbage_fragment_keeps_path() {
        let link = parse_noter_page_link("NOTERPAGE: /a.pdf #(oops)").unwrap();
        assert_eq!(link.pdf_path, "/a.pdf");
        assert_eq!(link.page, None);
    }

    #[test]
    fn malformed_ratio_drops_whole_location() {
        let link = parse_noter_page_link("NOTERPAGE:/a.pdf#(3 0.1.2 . 0.5)").unwrap();
        assert_eq!(link.pdf_path, "/a.pdf");
        assert_eq!((link.page, link.y, link.x), (None, None, None));
    }

    #[test]
    fn formats_three_level_breadcrumb() {
        let text = format_annotation_for_noter_page(&annotation("(0.75 0.25)", "Intro < Part I"));
        assert_eq!(
            text,
            "[[NOTERPAGE:/docs/paper.pdf#(4 0.25 . 0.75)][a quoted note < Intro < Part I < paper.pdf]]"
        );
    }

    #[test]
    fn omits_empty_outlines() {
        let text = format_annotation_for_noter_page(&annotation("(0.1 0.2)", ""));
        assert!(text.ends_with("][a quoted note < paper.pdf]]"));
    }

    #[test]
    fn format_then_parse_recovers_location() {
        let original = annotation("(0.3125 0.8)", "Methods");
        let text = format_annotation_for_noter_page(&original);
        let link = parse_noter_page_link(extract_link_target(&text)).unwrap();

        let (x, y) = original.ratios().unwrap();
        assert_eq!(link.pdf_path, original.file);
        assert_eq!(link.page, Some(original.page));
        assert!((link.x.unwrap() - x).abs() < 1e-9);
        assert!((link.y.unwrap() - y).abs() < 1e-9);
    }

    #[test]
    fn extract_target_handles_plain_text() {
        assert_eq!(extract_link_target("  NOTERPAGE:/a.pdf "), "NOTERPAGE:/a.pdf");
        assert_eq!(extract_link_target("[[NOTERPAGE:/a.pdf]]"), "NOTERPAGE:/a.pdf");
    }
}
