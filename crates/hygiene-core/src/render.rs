//! Page rendering.
//!
//! The build hands every page to a [`PageRenderer`] together with the
//! identifiers computed for it; renderers must use those URLs as given.
//! [`HtmlRenderer`] produces plain, escaped HTML documents. Templated
//! output plugs in behind the same trait.

use std::fmt::Write as _;

use html_escape::{encode_double_quoted_attribute, encode_text};

use crate::identifier::{AuthorityIdentifier, Identifier};
use crate::types::{Address, Authority, Establishment, FhrsRating, Rating};
use crate::{Error, Result};

/// Everything needed to render one establishment page.
#[derive(Debug, Clone, Copy)]
pub struct EstablishmentPage<'a> {
    /// The establishment.
    pub establishment: &'a Establishment,
    /// Its identifier; the canonical URL is taken from here.
    pub identifier: &'a Identifier,
    /// Owning authority.
    pub authority: &'a Authority,
    /// Identifier of the owning authority, for the index link.
    pub authority_identifier: &'a AuthorityIdentifier,
}

/// One establishment row on an authority index page.
#[derive(Debug, Clone, Copy)]
pub struct IndexEntry<'a> {
    /// The establishment.
    pub establishment: &'a Establishment,
    /// Its identifier.
    pub identifier: &'a Identifier,
}

/// Everything needed to render one authority index page.
#[derive(Debug, Clone)]
pub struct AuthorityIndexPage<'a> {
    /// The authority.
    pub authority: &'a Authority,
    /// Its identifier; the canonical URL is taken from here.
    pub identifier: &'a AuthorityIdentifier,
    /// Establishments in dataset order.
    pub entries: Vec<IndexEntry<'a>>,
}

/// Turns page data into document text.
pub trait PageRenderer: Send + Sync {
    /// Render an establishment page.
    fn establishment_page(&self, page: &EstablishmentPage<'_>) -> Result<String>;

    /// Render an authority index page.
    fn authority_index(&self, page: &AuthorityIndexPage<'_>) -> Result<String>;
}

/// Minimal HTML renderer; all text and attributes are escaped.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlRenderer;

impl HtmlRenderer {
    /// Create a renderer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

fn head(out: &mut String, title: &str, canonical: &str) -> std::fmt::Result {
    writeln!(out, "<!DOCTYPE html>")?;
    writeln!(out, "<html lang=\"en-GB\">")?;
    writeln!(out, "<head>")?;
    writeln!(out, "<meta charset=\"utf-8\">")?;
    writeln!(out, "<title>{}</title>", encode_text(title))?;
    writeln!(
        out,
        "<link rel=\"canonical\" href=\"{}\">",
        encode_double_quoted_attribute(canonical)
    )?;
    writeln!(out, "</head>")?;
    writeln!(out, "<body>")
}

fn rating_section(out: &mut String, rating: &Rating) -> std::fmt::Result {
    let scheme = match rating {
        Rating::Fhrs(_) => "FHRS",
        Rating::Fhis(_) => "FHIS",
    };
    writeln!(
        out,
        "<p class=\"rating\" data-scheme=\"{scheme}\">Rating: {}</p>",
        encode_text(&rating.label())
    )?;
    if let Some(date) = rating.date() {
        writeln!(out, "<p class=\"rating-date\">Rated on {}</p>", date.format("%-d %B %Y"))?;
    }
    if let Rating::Fhrs(FhrsRating::Graded {
        scores: Some(scores),
        ..
    }) = rating
    {
        writeln!(out, "<dl class=\"scores\">")?;
        writeln!(out, "<dt>Hygiene</dt><dd>{}</dd>", scores.hygiene)?;
        writeln!(out, "<dt>Structural</dt><dd>{}</dd>", scores.structural)?;
        writeln!(
            out,
            "<dt>Confidence in management</dt><dd>{}</dd>",
            scores.confidence_in_management
        )?;
        writeln!(out, "</dl>")?;
    }
    Ok(())
}

fn address_section(out: &mut String, address: &Address) -> std::fmt::Result {
    writeln!(out, "<address>")?;
    for line in address.lines().iter() {
        writeln!(out, "{}<br>", encode_text(line))?;
    }
    writeln!(out, "</address>")?;
    if let Address::Geocoded {
        latitude,
        longitude,
        ..
    } = address
    {
        writeln!(
            out,
            "<p class=\"geo\" data-lat=\"{latitude}\" data-lon=\"{longitude}\"></p>"
        )?;
    }
    Ok(())
}

fn render_error(err: std::fmt::Error) -> Error {
    Error::Serialization(format!("render error: {err}"))
}

fn write_establishment(out: &mut String, page: &EstablishmentPage<'_>) -> std::fmt::Result {
    let est = page.establishment;

    head(out, &est.business_name, page.identifier.canonical_url())?;
    writeln!(out, "<h1>{}</h1>", encode_text(&est.business_name))?;
    writeln!(out, "<p class=\"type\">{}</p>", encode_text(&est.business_type))?;
    address_section(out, &est.address)?;
    rating_section(out, &est.rating)?;
    if est.new_rating_pending {
        writeln!(out, "<p class=\"pending\">A new rating is pending.</p>")?;
    }
    writeln!(
        out,
        "<p><a href=\"{}\">{}</a> ({})</p>",
        encode_double_quoted_attribute(page.authority_identifier.index_url()),
        encode_text(&page.authority.name),
        page.identifier.region()
    )?;
    writeln!(out, "</body>\n</html>")
}

fn write_authority_index(out: &mut String, page: &AuthorityIndexPage<'_>) -> std::fmt::Result {
    head(out, &page.authority.name, page.identifier.index_url())?;
    writeln!(out, "<h1>{}</h1>", encode_text(&page.authority.name))?;
    writeln!(
        out,
        "<p>{} ({} establishments)</p>",
        page.authority.region,
        page.entries.len()
    )?;
    writeln!(out, "<ul>")?;
    for entry in &page.entries {
        writeln!(
            out,
            "<li><a href=\"{}\">{}</a> {}</li>",
            encode_double_quoted_attribute(entry.identifier.canonical_url()),
            encode_text(&entry.establishment.business_name),
            encode_text(&entry.establishment.rating.label())
        )?;
    }
    writeln!(out, "</ul>")?;
    writeln!(out, "</body>\n</html>")
}

impl PageRenderer for HtmlRenderer {
    fn establishment_page(&self, page: &EstablishmentPage<'_>) -> Result<String> {
        let mut out = String::new();
        write_establishment(&mut out, page).map_err(render_error)?;
        Ok(out)
    }

    fn authority_index(&self, page: &AuthorityIndexPage<'_>) -> Result<String> {
        let mut out = String::new();
        write_authority_index(&mut out, page).map_err(render_error)?;
        Ok(out)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::identifier::{RegionIndex, UrlScheme};
    use crate::types::{AddressLines, Region, Scores};

    fn fixture() -> (Authority, Establishment) {
        let authority = Authority {
            code: "760".to_string(),
            name: "Aberdeen City".to_string(),
            friendly_name: "aberdeen-city".to_string(),
            region: Region::Scotland,
            dataset_url: "https://example.org/FHRS760en-GB.json".to_string(),
        };
        let establishment = Establishment {
            id: 42,
            business_name: "Fish & Chips <Deluxe>".to_string(),
            business_type: "Takeaway".to_string(),
            authority_code: "760".to_string(),
            address: Address::NotGeocoded {
                lines: AddressLines {
                    line1: Some("1 \"Quay\" Street".to_string()),
                    postcode: Some("AB1 2CD".to_string()),
                    ..AddressLines::default()
                },
            },
            rating: Rating::Fhrs(FhrsRating::Graded {
                grade: 5,
                locale: crate::types::RatingLocale::English,
                date: None,
                scores: Some(Scores {
                    hygiene: 0,
                    structural: 5,
                    confidence_in_management: 10,
                }),
            }),
            new_rating_pending: false,
        };
        (authority, establishment)
    }

    #[test]
    fn test_establishment_page_escapes_and_links_canonically() {
        let (authority, establishment) = fixture();
        let scheme = UrlScheme::new("https://example.org/").unwrap();
        let regions = RegionIndex::from_authorities([&authority]).unwrap();
        let identifier = scheme.establishment(&establishment, &regions).unwrap();
        let authority_identifier = scheme.authority(&authority).unwrap();

        let html = HtmlRenderer::new()
            .establishment_page(&EstablishmentPage {
                establishment: &establishment,
                identifier: &identifier,
                authority: &authority,
                authority_identifier: &authority_identifier,
            })
            .unwrap();

        assert!(html.contains(&format!(
            "<link rel=\"canonical\" href=\"{}\">",
            identifier.canonical_url()
        )));
        assert!(html.contains("Fish &amp; Chips &lt;Deluxe&gt;"));
        assert!(!html.contains("<Deluxe>"));
        assert!(html.contains("<dt>Confidence in management</dt><dd>10</dd>"));
        assert!(html.contains(authority_identifier.index_url()));
    }

    #[test]
    fn test_authority_index_lists_every_entry() {
        let (authority, establishment) = fixture();
        let scheme = UrlScheme::new("https://example.org").unwrap();
        let regions = RegionIndex::from_authorities([&authority]).unwrap();
        let identifier = scheme.establishment(&establishment, &regions).unwrap();
        let authority_identifier = scheme.authority(&authority).unwrap();

        let html = HtmlRenderer::new()
            .authority_index(&AuthorityIndexPage {
                authority: &authority,
                identifier: &authority_identifier,
                entries: vec![IndexEntry {
                    establishment: &establishment,
                    identifier: &identifier,
                }],
            })
            .unwrap();

        assert!(html.contains(&format!(
            "<link rel=\"canonical\" href=\"{}\">",
            authority_identifier.index_url()
        )));
        assert_eq!(html.matches("<li>").count(), 1);
        assert!(html.contains(identifier.canonical_url()));
    }
}
