//! Sitemap documents.
//!
//! A build writes three kinds of sitemap files:
//!
//! - one `<urlset>` shard per authority listing its establishment pages
//! - a `<sitemapindex>` over every shard
//! - a `<urlset>` listing every authority index page
//!
//! Locations are written exactly as given; they are expected to be the
//! canonical URLs computed by [`crate::identifier::UrlScheme`].

use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

use crate::{Error, Result};

/// XML namespace of the sitemap protocol.
pub const SITEMAP_NS: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";

/// Build a `<urlset>` document with one `<url><loc>` per location.
pub fn urlset<'a>(locs: impl IntoIterator<Item = &'a str>) -> Result<String> {
    document("urlset", "url", locs)
}

/// Build a `<sitemapindex>` document with one `<sitemap><loc>` per location.
pub fn sitemap_index<'a>(locs: impl IntoIterator<Item = &'a str>) -> Result<String> {
    document("sitemapindex", "sitemap", locs)
}

fn document<'a>(
    root: &str,
    entry: &str,
    locs: impl IntoIterator<Item = &'a str>,
) -> Result<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(xml_error)?;
    writer
        .write_event(Event::Start(
            BytesStart::new(root).with_attributes([("xmlns", SITEMAP_NS)]),
        ))
        .map_err(xml_error)?;

    for loc in locs {
        writer
            .write_event(Event::Start(BytesStart::new(entry)))
            .map_err(xml_error)?;
        writer
            .write_event(Event::Start(BytesStart::new("loc")))
            .map_err(xml_error)?;
        writer
            .write_event(Event::Text(BytesText::new(loc)))
            .map_err(xml_error)?;
        writer
            .write_event(Event::End(BytesEnd::new("loc")))
            .map_err(xml_error)?;
        writer
            .write_event(Event::End(BytesEnd::new(entry)))
            .map_err(xml_error)?;
    }

    writer
        .write_event(Event::End(BytesEnd::new(root)))
        .map_err(xml_error)?;

    let mut xml = String::from_utf8(writer.into_inner())
        .map_err(|e| Error::Serialization(e.to_string()))?;
    xml.push('\n');
    Ok(xml)
}

fn xml_error(err: impl std::fmt::Display) -> Error {
    Error::Serialization(format!("XML write error: {err}"))
}

/// Collect every `<loc>` value of a `<urlset>` or `<sitemapindex>` document,
/// in document order.
pub fn parse_locs(xml: &str) -> Result<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut locs = Vec::new();
    let mut buf = Vec::new();
    let mut in_loc = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                in_loc = e.local_name().as_ref() == b"loc";
            },
            Ok(Event::End(_)) => in_loc = false,
            Ok(Event::Text(e)) if in_loc => {
                let text = e
                    .unescape()
                    .map_err(|e| Error::Serialization(e.to_string()))?;
                locs.push(text.trim().to_string());
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::Serialization(format!("XML parse error: {e}"))),
            _ => {},
        }
        buf.clear();
    }

    Ok(locs)
}
