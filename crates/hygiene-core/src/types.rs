//! Core data types: authorities, raw datasets and normalized establishments.
//!
//! Raw types mirror the upstream open-data documents and are deliberately
//! loose: every field is optional and scalars may arrive as strings or
//! numbers. Validation ([`crate::validate`]) turns them into the normalized
//! types, whose shapes only admit valid combinations.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// One of the twelve fixed UK statistical regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Region {
    /// East Counties
    EastCounties,
    /// East Midlands
    EastMidlands,
    /// London
    London,
    /// North East
    NorthEast,
    /// North West
    NorthWest,
    /// South East
    SouthEast,
    /// South West
    SouthWest,
    /// West Midlands
    WestMidlands,
    /// Yorkshire and Humberside
    YorkshireAndHumberside,
    /// Northern Ireland
    NorthernIreland,
    /// Scotland
    Scotland,
    /// Wales
    Wales,
}

impl Region {
    /// Every region, in listing order.
    pub const ALL: [Self; 12] = [
        Self::EastCounties,
        Self::EastMidlands,
        Self::London,
        Self::NorthEast,
        Self::NorthWest,
        Self::SouthEast,
        Self::SouthWest,
        Self::WestMidlands,
        Self::YorkshireAndHumberside,
        Self::NorthernIreland,
        Self::Scotland,
        Self::Wales,
    ];

    /// Name as it appears in the upstream authority listing.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::EastCounties => "East Counties",
            Self::EastMidlands => "East Midlands",
            Self::London => "London",
            Self::NorthEast => "North East",
            Self::NorthWest => "North West",
            Self::SouthEast => "South East",
            Self::SouthWest => "South West",
            Self::WestMidlands => "West Midlands",
            Self::YorkshireAndHumberside => "Yorkshire and Humberside",
            Self::NorthernIreland => "Northern Ireland",
            Self::Scotland => "Scotland",
            Self::Wales => "Wales",
        }
    }

    /// Path segment used below `region-` in page URLs.
    #[must_use]
    pub const fn slug(self) -> &'static str {
        match self {
            Self::EastCounties => "east-counties",
            Self::EastMidlands => "east-midlands",
            Self::London => "london",
            Self::NorthEast => "north-east",
            Self::NorthWest => "north-west",
            Self::SouthEast => "south-east",
            Self::SouthWest => "south-west",
            Self::WestMidlands => "west-midlands",
            Self::YorkshireAndHumberside => "yorkshire-and-humberside",
            Self::NorthernIreland => "northern-ireland",
            Self::Scotland => "scotland",
            Self::Wales => "wales",
        }
    }

    /// Look a region up by its listing name, ignoring case and surrounding space.
    #[must_use]
    pub fn from_display_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|region| region.display_name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// A local authority owning one raw dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Authority {
    /// Stable authority code, matched against each record's authority code.
    pub code: String,
    /// Human readable name.
    pub name: String,
    /// Path-safe name used for the authority's own pages.
    pub friendly_name: String,
    /// Region the authority belongs to.
    pub region: Region,
    /// Address of the authority's raw dataset.
    pub dataset_url: String,
}

/// Entry of the upstream authority listing, before region resolution.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawAuthority {
    local_authority_id_code: Option<RawText>,
    name: Option<String>,
    friendly_name: Option<String>,
    region_name: Option<String>,
    file_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawAuthorityListing {
    authorities: Vec<RawAuthority>,
}

/// The parsed upstream authority listing.
#[derive(Debug, Clone, Default)]
pub struct AuthorityListing {
    /// Authorities in listing order.
    pub authorities: Vec<Authority>,
}

impl AuthorityListing {
    /// Parse the listing document (`{"authorities": [...]}`).
    ///
    /// Every entry must carry a code, a name, a friendly name, a known
    /// region name and a dataset address.
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: RawAuthorityListing = serde_json::from_str(json)?;
        let authorities = raw
            .authorities
            .into_iter()
            .enumerate()
            .map(|(index, entry)| entry.into_authority(index))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { authorities })
    }
}

impl RawAuthority {
    fn into_authority(self, index: usize) -> Result<Authority> {
        let field = |name: &str| format!("authorities[{index}].{name}");
        let required = |value: Option<String>, name: &str| {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| Error::schema(field(name), "required value is missing"))
        };

        let code = required(
            self.local_authority_id_code.map(RawText::into_string),
            "LocalAuthorityIdCode",
        )?;
        let region_name = required(self.region_name, "RegionName")?;
        let region = Region::from_display_name(&region_name).ok_or_else(|| {
            Error::schema(
                field("RegionName"),
                format!("'{region_name}' is not one of the twelve regions"),
            )
        })?;

        Ok(Authority {
            code,
            name: required(self.name, "Name")?,
            friendly_name: required(self.friendly_name, "FriendlyName")?,
            region,
            dataset_url: required(self.file_name, "FileName")?,
        })
    }
}

/// A scalar that upstream sometimes encodes as a string and sometimes as a number.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawText {
    /// JSON string.
    Text(String),
    /// JSON number.
    Number(serde_json::Number),
}

impl RawText {
    /// The value as written, without surrounding whitespace.
    #[must_use]
    pub fn into_string(self) -> String {
        match self {
            Self::Text(text) => text.trim().to_string(),
            Self::Number(number) => number.to_string(),
        }
    }
}

impl From<&str> for RawText {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// Header of a raw dataset.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawHeader {
    /// Date the extract was produced.
    pub extract_date: Option<String>,
    /// Declared number of records.
    pub item_count: Option<RawText>,
    /// Upstream return code, e.g. `Success`.
    pub return_code: Option<String>,
}

/// The record collection of a raw dataset.
///
/// Upstream wraps the records in an `EstablishmentDetail` object; some
/// exports carry the bare array instead.
#[derive(Debug, Clone)]
pub enum RawCollection {
    /// `{"EstablishmentDetail": [...]}`
    Wrapped {
        /// The records.
        establishment_detail: Vec<RawEstablishment>,
    },
    /// `[...]`
    Flat(Vec<RawEstablishment>),
}

impl RawCollection {
    /// The records regardless of wrapping.
    #[must_use]
    pub fn records(&self) -> &[RawEstablishment] {
        match self {
            Self::Wrapped {
                establishment_detail,
            } => establishment_detail,
            Self::Flat(records) => records,
        }
    }

    /// Read the collection from its JSON value, one record at a time.
    ///
    /// A record that does not fit [`RawEstablishment`] is a schema violation
    /// naming the record's position.
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        match value {
            serde_json::Value::Array(items) => Ok(Self::Flat(raw_records(items)?)),
            serde_json::Value::Object(mut object) => match object.remove("EstablishmentDetail") {
                Some(serde_json::Value::Array(items)) => Ok(Self::Wrapped {
                    establishment_detail: raw_records(items)?,
                }),
                Some(other) => Err(Error::schema(
                    "EstablishmentCollection.EstablishmentDetail",
                    format!("must be an array of records, got {}", json_kind(&other)),
                )),
                None => Err(Error::schema(
                    "EstablishmentCollection",
                    "object has no EstablishmentDetail array",
                )),
            },
            other => Err(Error::schema(
                "EstablishmentCollection",
                format!(
                    "must be an array or an EstablishmentDetail object, got {}",
                    json_kind(&other)
                ),
            )),
        }
    }
}

fn raw_records(items: Vec<serde_json::Value>) -> Result<Vec<RawEstablishment>> {
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            serde_json::from_value(item).map_err(|e| {
                Error::schema(
                    format!("EstablishmentCollection[{index}]"),
                    format!("is not a record: {e}"),
                )
            })
        })
        .collect()
}

const fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

/// One authority's raw dataset: header plus nullable record collection.
#[derive(Debug, Clone, Default)]
pub struct RawDataset {
    /// Dataset header.
    pub header: RawHeader,
    /// Records; `None` when upstream sent `null` or omitted the collection.
    pub establishment_collection: Option<RawCollection>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawDatasetBody {
    header: RawHeader,
    establishment_collection: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct RawDocument {
    #[serde(rename = "FHRSEstablishment")]
    establishment: RawDatasetBody,
}

impl RawDataset {
    /// Parse a dataset document (`{"FHRSEstablishment": {...}}`).
    ///
    /// Malformed JSON is a serialization error; a collection or record of
    /// the wrong shape is a schema violation.
    pub fn from_json(json: &str) -> Result<Self> {
        let document: RawDocument = serde_json::from_str(json)?;
        let body = document.establishment;
        Ok(Self {
            header: body.header,
            establishment_collection: body
                .establishment_collection
                .map(RawCollection::from_value)
                .transpose()?,
        })
    }
}

/// Raw sub-scores of an inspected establishment.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawScores {
    /// Hygiene sub-score, any JSON type.
    pub hygiene: Option<serde_json::Value>,
    /// Structural sub-score, any JSON type.
    pub structural: Option<serde_json::Value>,
    /// Confidence-in-management sub-score, any JSON type.
    pub confidence_in_management: Option<serde_json::Value>,
    /// Anything else upstream put in the object.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Raw coordinates.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawGeocode {
    /// Longitude, as text or number.
    pub longitude: Option<RawText>,
    /// Latitude, as text or number.
    pub latitude: Option<RawText>,
}

/// One raw establishment record.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawEstablishment {
    /// Numeric establishment identifier, any JSON type.
    #[serde(rename = "FHRSID")]
    pub fhrs_id: Option<serde_json::Value>,
    /// Business name.
    pub business_name: Option<String>,
    /// Business type.
    pub business_type: Option<String>,
    /// Address line 1.
    pub address_line1: Option<String>,
    /// Address line 2.
    pub address_line2: Option<String>,
    /// Address line 3.
    pub address_line3: Option<String>,
    /// Address line 4.
    pub address_line4: Option<String>,
    /// Postcode.
    pub post_code: Option<String>,
    /// Rating value: grade, special code or FHIS category.
    pub rating_value: Option<RawText>,
    /// Locale-specific rating key.
    pub rating_key: Option<String>,
    /// Date of the rating.
    pub rating_date: Option<String>,
    /// Owning authority code.
    pub local_authority_code: Option<RawText>,
    /// Sub-scores.
    pub scores: Option<RawScores>,
    /// Rating scheme tag, `FHRS` or `FHIS`.
    pub scheme_type: Option<String>,
    /// Coordinates.
    pub geocode: Option<RawGeocode>,
    /// Whether a new rating is pending publication.
    pub new_rating_pending: Option<RawText>,
}

/// Address lines; each one independently optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressLines {
    /// Line 1.
    pub line1: Option<String>,
    /// Line 2.
    pub line2: Option<String>,
    /// Line 3.
    pub line3: Option<String>,
    /// Line 4.
    pub line4: Option<String>,
    /// Postcode.
    pub postcode: Option<String>,
}

impl AddressLines {
    /// Present lines in order, postcode last.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        [
            &self.line1,
            &self.line2,
            &self.line3,
            &self.line4,
            &self.postcode,
        ]
        .into_iter()
        .filter_map(|line| line.as_deref())
    }
}

/// Address of an establishment: with coordinates or without, never partly.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Address {
    /// Address with coordinates.
    Geocoded {
        /// Latitude in degrees.
        latitude: f64,
        /// Longitude in degrees.
        longitude: f64,
        /// Address lines.
        lines: AddressLines,
    },
    /// Address without coordinates.
    NotGeocoded {
        /// Address lines.
        lines: AddressLines,
    },
}

impl Address {
    /// Address lines of either shape.
    #[must_use]
    pub const fn lines(&self) -> &AddressLines {
        match self {
            Self::Geocoded { lines, .. } | Self::NotGeocoded { lines } => lines,
        }
    }
}

/// Locale of an FHRS rating key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RatingLocale {
    /// `en-GB`
    English,
    /// `cy-GB`
    Welsh,
}

impl RatingLocale {
    /// Both locales, in key order.
    pub const ALL: [Self; 2] = [Self::English, Self::Welsh];

    /// Locale suffix used in rating keys.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::English => "en-GB",
            Self::Welsh => "cy-GB",
        }
    }
}

/// Sub-scores; each value belongs to its category's domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Scores {
    /// Hygiene sub-score.
    pub hygiene: u8,
    /// Structural sub-score.
    pub structural: u8,
    /// Confidence-in-management sub-score.
    pub confidence_in_management: u8,
}

/// Rating under the FHRS scheme.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum FhrsRating {
    /// Numeric grade 0-5.
    Graded {
        /// The grade.
        grade: u8,
        /// Locale of the rating key.
        locale: RatingLocale,
        /// Date of the rating, if known.
        date: Option<NaiveDate>,
        /// Sub-scores, if published.
        scores: Option<Scores>,
    },
    /// Registered but not yet inspected.
    AwaitingInspection,
    /// Inspected, rating not yet published.
    AwaitingPublication,
    /// Exempt from the scheme.
    Exempt,
}

/// The six FHIS categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FhisValue {
    /// `Pass`
    Pass,
    /// `Pass and Eat Safe`
    PassAndEatSafe,
    /// `Improvement Required`
    ImprovementRequired,
    /// `Awaiting Publication`
    AwaitingPublication,
    /// `Awaiting Inspection`
    AwaitingInspection,
    /// `Exempt`
    Exempt,
}

impl FhisValue {
    /// Every category.
    pub const ALL: [Self; 6] = [
        Self::Pass,
        Self::PassAndEatSafe,
        Self::ImprovementRequired,
        Self::AwaitingPublication,
        Self::AwaitingInspection,
        Self::Exempt,
    ];

    /// Rating value as written upstream.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pass => "Pass",
            Self::PassAndEatSafe => "Pass and Eat Safe",
            Self::ImprovementRequired => "Improvement Required",
            Self::AwaitingPublication => "Awaiting Publication",
            Self::AwaitingInspection => "Awaiting Inspection",
            Self::Exempt => "Exempt",
        }
    }

    /// The single rating key registered for the category.
    #[must_use]
    pub const fn rating_key(self) -> &'static str {
        match self {
            Self::Pass => "fhis_pass_en-GB",
            Self::PassAndEatSafe => "fhis_pass_and_eat_safe_en-GB",
            Self::ImprovementRequired => "fhis_improvement_required_en-GB",
            Self::AwaitingPublication => "fhis_awaiting_publication_en-GB",
            Self::AwaitingInspection => "fhis_awaiting_inspection_en-GB",
            Self::Exempt => "fhis_exempt_en-GB",
        }
    }

    /// Parse an upstream rating value.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|v| v.as_str() == value)
    }
}

/// Rating under the FHIS scheme. Never carries scores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FhisRating {
    /// The category.
    pub value: FhisValue,
    /// Date of the rating, if known.
    pub date: Option<NaiveDate>,
}

/// Rating discriminated by scheme.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "scheme", content = "rating")]
pub enum Rating {
    /// Food Hygiene Rating Scheme (England, Wales, Northern Ireland).
    #[serde(rename = "FHRS")]
    Fhrs(FhrsRating),
    /// Food Hygiene Information Scheme (Scotland).
    #[serde(rename = "FHIS")]
    Fhis(FhisRating),
}

impl Rating {
    /// Short human readable label, e.g. `5`, `Exempt`, `Pass and Eat Safe`.
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::Fhrs(FhrsRating::Graded { grade, .. }) => grade.to_string(),
            Self::Fhrs(FhrsRating::AwaitingInspection) => "Awaiting Inspection".to_string(),
            Self::Fhrs(FhrsRating::AwaitingPublication) => "Awaiting Publication".to_string(),
            Self::Fhrs(FhrsRating::Exempt) => "Exempt".to_string(),
            Self::Fhis(rating) => rating.value.as_str().to_string(),
        }
    }

    /// Rating date, when the rating carries one.
    #[must_use]
    pub fn date(&self) -> Option<NaiveDate> {
        match self {
            Self::Fhrs(FhrsRating::Graded { date, .. }) | Self::Fhis(FhisRating { date, .. }) => {
                *date
            },
            Self::Fhrs(_) => None,
        }
    }
}

/// A validated establishment.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Establishment {
    /// Numeric identifier, unique across all authorities.
    pub id: u64,
    /// Business name as published.
    pub business_name: String,
    /// Business type.
    pub business_type: String,
    /// Code of the owning authority.
    pub authority_code: String,
    /// Address.
    pub address: Address,
    /// Rating.
    pub rating: Rating,
    /// Whether a new rating is pending publication.
    pub new_rating_pending: bool,
}

/// Validated dataset header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetHeader {
    /// Date the extract was produced.
    pub extract_date: NaiveDate,
    /// Declared number of records.
    pub item_count: usize,
    /// Upstream return code.
    pub return_code: String,
}

/// A fully validated dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    /// Header.
    pub header: DatasetHeader,
    /// Establishments in upstream order.
    pub establishments: Vec<Establishment>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_region_names_round_trip() {
        for region in Region::ALL {
            assert_eq!(Region::from_display_name(region.display_name()), Some(region));
        }
        assert_eq!(
            Region::from_display_name("  yorkshire and humberside "),
            Some(Region::YorkshireAndHumberside)
        );
        assert_eq!(Region::from_display_name("Atlantis"), None);
    }

    #[test]
    fn test_region_slugs_are_unique_and_path_safe() {
        let mut slugs: Vec<_> = Region::ALL.iter().map(|r| r.slug()).collect();
        slugs.sort_unstable();
        slugs.dedup();
        assert_eq!(slugs.len(), 12);
        assert!(
            slugs
                .iter()
                .all(|s| s.chars().all(|c| c.is_ascii_lowercase() || c == '-'))
        );
    }

    #[test]
    fn test_authority_listing_parses_entries() {
        let json = r#"{
            "authorities": [
                {
                    "LocalAuthorityId": 197,
                    "LocalAuthorityIdCode": "760",
                    "Name": "Aberdeen City",
                    "FriendlyName": "aberdeen-city",
                    "RegionName": "Scotland",
                    "FileName": "http://ratings.food.gov.uk/OpenDataFiles/FHRS760en-GB.json"
                },
                {
                    "LocalAuthorityIdCode": 527,
                    "Name": "Barnet",
                    "FriendlyName": "barnet",
                    "RegionName": "London",
                    "FileName": "http://ratings.food.gov.uk/OpenDataFiles/FHRS527en-GB.json"
                }
            ]
        }"#;

        let listing = AuthorityListing::from_json(json).unwrap();
        assert_eq!(listing.authorities.len(), 2);
        assert_eq!(listing.authorities[0].code, "760");
        assert_eq!(listing.authorities[0].region, Region::Scotland);
        assert_eq!(listing.authorities[1].code, "527");
        assert_eq!(listing.authorities[1].region, Region::London);
    }

    #[test]
    fn test_authority_listing_rejects_unknown_region() {
        let json = r#"{"authorities": [{
            "LocalAuthorityIdCode": "1", "Name": "X", "FriendlyName": "x",
            "RegionName": "Mercia", "FileName": "http://example.org/FHRS1en-GB.json"
        }]}"#;

        match AuthorityListing::from_json(json) {
            Err(Error::SchemaViolation { field, .. }) => {
                assert_eq!(field, "authorities[0].RegionName");
            },
            other => panic!("expected schema violation, got {other:?}"),
        }
    }

    #[test]
    fn test_authority_listing_requires_dataset_address() {
        let json = r#"{"authorities": [{
            "LocalAuthorityIdCode": "1", "Name": "X", "FriendlyName": "x",
            "RegionName": "Wales", "FileName": "  "
        }]}"#;

        assert!(matches!(
            AuthorityListing::from_json(json),
            Err(Error::SchemaViolation { field, .. }) if field == "authorities[0].FileName"
        ));
    }

    #[test]
    fn test_raw_dataset_accepts_both_collection_shapes() {
        let wrapped = r#"{"FHRSEstablishment": {
            "Header": {"ExtractDate": "2024-01-10", "ItemCount": "1", "ReturnCode": "Success"},
            "EstablishmentCollection": {"EstablishmentDetail": [{"FHRSID": 1}]}
        }}"#;
        let flat = r#"{"FHRSEstablishment": {
            "Header": {"ExtractDate": "2024-01-10", "ItemCount": 1, "ReturnCode": "Success"},
            "EstablishmentCollection": [{"FHRSID": 1}]
        }}"#;

        for json in [wrapped, flat] {
            let dataset = RawDataset::from_json(json).unwrap();
            let records = dataset.establishment_collection.unwrap();
            assert_eq!(records.records().len(), 1);
            assert_eq!(records.records()[0].fhrs_id, Some(serde_json::json!(1)));
        }
    }

    #[test]
    fn test_raw_dataset_null_collection() {
        let json = r#"{"FHRSEstablishment": {
            "Header": {"ExtractDate": "2024-01-10", "ItemCount": "0", "ReturnCode": "Success"},
            "EstablishmentCollection": null
        }}"#;

        let dataset = RawDataset::from_json(json).unwrap();
        assert!(dataset.establishment_collection.is_none());
        assert_eq!(
            dataset.header.item_count.map(RawText::into_string).as_deref(),
            Some("0")
        );
    }

    fn dataset_with_collection(collection: &str) -> Result<RawDataset> {
        RawDataset::from_json(&format!(
            r#"{{"FHRSEstablishment": {{
                "Header": {{"ExtractDate": "2024-01-10", "ItemCount": "1", "ReturnCode": "Success"}},
                "EstablishmentCollection": {collection}
            }}}}"#
        ))
    }

    fn schema_violation(result: Result<RawDataset>) -> (String, String) {
        match result {
            Err(Error::SchemaViolation { field, rule }) => (field, rule),
            other => panic!("expected schema violation, got {other:?}"),
        }
    }

    #[test]
    fn test_mistyped_integers_survive_parsing() {
        let dataset = dataset_with_collection(
            r#"[{"FHRSID": "12", "Scores": {"Hygiene": "5", "Structural": 5.5,
                "ConfidenceInManagement": true}}]"#,
        )
        .unwrap();

        let collection = dataset.establishment_collection.unwrap();
        let record = &collection.records()[0];
        assert_eq!(record.fhrs_id, Some(serde_json::json!("12")));
        let scores = record.scores.as_ref().unwrap();
        assert_eq!(scores.hygiene, Some(serde_json::json!("5")));
        assert_eq!(scores.structural, Some(serde_json::json!(5.5)));
        assert_eq!(scores.confidence_in_management, Some(serde_json::json!(true)));
    }

    #[test]
    fn test_collection_of_wrong_shape_names_the_collection() {
        let (field, rule) = schema_violation(dataset_with_collection(r#""none""#));
        assert_eq!(field, "EstablishmentCollection");
        assert!(rule.contains("a string"), "{rule}");

        let (field, _) = schema_violation(dataset_with_collection(r#"{"Detail": []}"#));
        assert_eq!(field, "EstablishmentCollection");

        let (field, rule) =
            schema_violation(dataset_with_collection(r#"{"EstablishmentDetail": {"FHRSID": 1}}"#));
        assert_eq!(field, "EstablishmentCollection.EstablishmentDetail");
        assert!(rule.contains("an object"), "{rule}");
    }

    #[test]
    fn test_record_of_wrong_shape_names_its_position() {
        let (field, rule) = schema_violation(dataset_with_collection(
            r#"{"EstablishmentDetail": [{"FHRSID": 1}, {"FHRSID": 2, "BusinessName": 7}]}"#,
        ));
        assert_eq!(field, "EstablishmentCollection[1]");
        assert!(rule.starts_with("is not a record"), "{rule}");

        let (field, _) = schema_violation(dataset_with_collection(r#"[{"FHRSID": 1}, "x"]"#));
        assert_eq!(field, "EstablishmentCollection[1]");

        let (field, _) = schema_violation(dataset_with_collection(r#"[{"Geocode": "here"}]"#));
        assert_eq!(field, "EstablishmentCollection[0]");
    }

    #[test]
    fn test_malformed_json_stays_a_serialization_error() {
        let err = RawDataset::from_json(r#"{"FHRSEstablishment": "#).unwrap_err();
        assert_eq!(err.category(), "serialization");
    }

    #[test]
    fn test_raw_scores_capture_unexpected_fields() {
        let scores: RawScores = serde_json::from_str(
            r#"{"Hygiene": 5, "Structural": 0, "ConfidenceInManagement": 10, "Bonus": 1}"#,
        )
        .unwrap();
        assert_eq!(scores.hygiene, Some(serde_json::json!(5)));
        assert!(scores.extra.contains_key("Bonus"));
    }

    #[test]
    fn test_rating_labels() {
        let graded = Rating::Fhrs(FhrsRating::Graded {
            grade: 4,
            locale: RatingLocale::English,
            date: None,
            scores: None,
        });
        assert_eq!(graded.label(), "4");
        assert_eq!(Rating::Fhrs(FhrsRating::Exempt).label(), "Exempt");
        assert_eq!(
            Rating::Fhis(FhisRating {
                value: FhisValue::PassAndEatSafe,
                date: None
            })
            .label(),
            "Pass and Eat Safe"
        );
    }

    #[test]
    fn test_address_lines_skip_missing() {
        let lines = AddressLines {
            line1: Some("1 High Street".to_string()),
            line3: Some("Aberdeen".to_string()),
            postcode: Some("AB1 2CD".to_string()),
            ..AddressLines::default()
        };
        let collected: Vec<_> = lines.iter().collect();
        assert_eq!(collected, vec!["1 High Street", "Aberdeen", "AB1 2CD"]);
    }
}
