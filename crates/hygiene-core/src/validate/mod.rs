//! Strict validation of raw datasets into normalized establishments.
//!
//! [`validate_dataset`] either accepts the whole dataset or rejects it with
//! the first rule broken. Nothing is repaired: a value outside its domain is
//! a [`Error::SchemaViolation`] naming the field and the rule.
//!
//! ```rust
//! use hygiene_core::{RawDataset, validate::validate_dataset};
//!
//! let raw = RawDataset::from_json(r#"{"FHRSEstablishment": {
//!     "Header": {"ExtractDate": "2024-01-10", "ItemCount": 0, "ReturnCode": "Success"},
//!     "EstablishmentCollection": null
//! }}"#)?;
//! let dataset = validate_dataset(&raw)?;
//! assert!(dataset.establishments.is_empty());
//! # Ok::<(), hygiene_core::Error>(())
//! ```

pub mod descriptors;

use chrono::{NaiveDate, NaiveDateTime};

use crate::types::{
    Address, AddressLines, Dataset, DatasetHeader, Establishment, FhisRating, FhisValue,
    FhrsRating, RatingLocale, RawDataset, RawEstablishment, RawGeocode, RawHeader, RawScores,
    RawText, Rating, Scores,
};
use crate::{Error, Result};
use descriptors::{
    FHRS_MAX_GRADE, FHRS_SPECIAL_CODES, SCORE_DOMAINS, ScoreCategory, fhrs_rating_key,
};

/// Validate a raw dataset as a whole.
///
/// The record collection must be `null` exactly when the declared item count
/// is zero, and otherwise hold exactly that many records. One invalid record
/// rejects the dataset.
pub fn validate_dataset(raw: &RawDataset) -> Result<Dataset> {
    let header = validate_header(&raw.header)?;

    let records = match (header.item_count, &raw.establishment_collection) {
        (0, None) => &[][..],
        (0, Some(_)) => {
            return Err(Error::schema(
                "EstablishmentCollection",
                "must be null when ItemCount is 0",
            ));
        },
        (_, None) => {
            return Err(Error::schema(
                "EstablishmentCollection",
                format!("is null but ItemCount is {}", header.item_count),
            ));
        },
        (count, Some(collection)) => {
            let records = collection.records();
            if records.len() != count {
                return Err(Error::schema(
                    "EstablishmentCollection",
                    format!("holds {} records but ItemCount is {count}", records.len()),
                ));
            }
            records
        },
    };

    let establishments = records
        .iter()
        .enumerate()
        .map(|(index, record)| {
            validate_record(record, &format!("EstablishmentCollection[{index}]"))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Dataset {
        header,
        establishments,
    })
}

fn validate_header(raw: &RawHeader) -> Result<DatasetHeader> {
    let extract_date = raw
        .extract_date
        .as_deref()
        .ok_or_else(|| Error::schema("Header.ExtractDate", "required value is missing"))
        .and_then(|text| parse_date(text, "Header.ExtractDate"))?;

    let item_count = raw
        .item_count
        .clone()
        .map(RawText::into_string)
        .ok_or_else(|| Error::schema("Header.ItemCount", "required value is missing"))?;
    let item_count = item_count.parse::<usize>().map_err(|_| {
        Error::schema(
            "Header.ItemCount",
            format!("'{item_count}' is not a non-negative integer"),
        )
    })?;

    let return_code = raw
        .return_code
        .as_deref()
        .map(str::trim)
        .filter(|code| !code.is_empty())
        .ok_or_else(|| Error::schema("Header.ReturnCode", "required value is missing"))?;

    Ok(DatasetHeader {
        extract_date,
        item_count,
        return_code: return_code.to_string(),
    })
}

/// Validate one raw record. `at` prefixes field names in rejections.
pub fn validate_record(raw: &RawEstablishment, at: &str) -> Result<Establishment> {
    let field = |name: &str| format!("{at}.{name}");
    let missing = |name: &str| Error::schema(field(name), "required value is missing");

    let id = integer(raw.fhrs_id.as_ref(), &field("FHRSID"))?
        .ok_or_else(|| missing("FHRSID"))?;
    let id = u64::try_from(id)
        .map_err(|_| Error::schema(field("FHRSID"), format!("{id} is negative")))?;
    let business_name = raw
        .business_name
        .clone()
        .ok_or_else(|| missing("BusinessName"))?;
    let business_type = raw
        .business_type
        .clone()
        .ok_or_else(|| missing("BusinessType"))?;
    let authority_code = raw
        .local_authority_code
        .clone()
        .map(RawText::into_string)
        .filter(|code| !code.is_empty())
        .ok_or_else(|| missing("LocalAuthorityCode"))?;

    let rating = match raw.scheme_type.as_deref() {
        Some("FHRS") => Rating::Fhrs(validate_fhrs(raw, &field)?),
        Some("FHIS") => Rating::Fhis(validate_fhis(raw, &field)?),
        Some(other) => {
            return Err(Error::schema(
                field("SchemeType"),
                format!("'{other}' is not a supported scheme (expected FHRS or FHIS)"),
            ));
        },
        None => return Err(missing("SchemeType")),
    };

    let address = validate_address(raw, &field)?;
    let new_rating_pending = match raw.new_rating_pending.clone().map(RawText::into_string) {
        None => false,
        Some(flag) if flag.eq_ignore_ascii_case("true") => true,
        Some(flag) if flag.eq_ignore_ascii_case("false") => false,
        Some(flag) => {
            return Err(Error::schema(
                field("NewRatingPending"),
                format!("'{flag}' is not a boolean"),
            ));
        },
    };

    Ok(Establishment {
        id,
        business_name,
        business_type,
        authority_code,
        address,
        rating,
        new_rating_pending,
    })
}

fn validate_fhrs(raw: &RawEstablishment, field: &dyn Fn(&str) -> String) -> Result<FhrsRating> {
    let value = rating_value(raw, field)?;

    if let Some(code) = FHRS_SPECIAL_CODES.iter().find(|code| **code == value) {
        if raw.rating_date.is_some() {
            return Err(Error::schema(
                field("RatingDate"),
                format!("must be absent for rating value {code}"),
            ));
        }
        if raw.scores.is_some() {
            return Err(Error::schema(
                field("Scores"),
                format!("must be absent for rating value {code}"),
            ));
        }
        return Ok(match *code {
            "AwaitingInspection" => FhrsRating::AwaitingInspection,
            "AwaitingPublication" => FhrsRating::AwaitingPublication,
            _ => FhrsRating::Exempt,
        });
    }

    let grade = match value.as_bytes() {
        [digit @ b'0'..=b'9'] if digit - b'0' <= FHRS_MAX_GRADE => digit - b'0',
        _ => {
            return Err(Error::schema(
                field("RatingValue"),
                format!("'{value}' is neither a grade 0-5 nor a special FHRS code"),
            ));
        },
    };

    let key = raw
        .rating_key
        .as_deref()
        .ok_or_else(|| Error::schema(field("RatingKey"), "required value is missing"))?;
    let locale = RatingLocale::ALL
        .into_iter()
        .find(|locale| fhrs_rating_key(grade, *locale) == key)
        .ok_or_else(|| {
            Error::schema(
                field("RatingKey"),
                format!("'{key}' does not match rating value {grade}"),
            )
        })?;

    let date = optional_date(raw, field)?;
    let scores = raw
        .scores
        .as_ref()
        .map(|scores| validate_scores(scores, field))
        .transpose()?;

    Ok(FhrsRating::Graded {
        grade,
        locale,
        date,
        scores,
    })
}

fn validate_fhis(raw: &RawEstablishment, field: &dyn Fn(&str) -> String) -> Result<FhisRating> {
    let value = rating_value(raw, field)?;
    let value = FhisValue::parse(&value).ok_or_else(|| {
        Error::schema(
            field("RatingValue"),
            format!("'{value}' is not an FHIS rating"),
        )
    })?;

    let key = raw
        .rating_key
        .as_deref()
        .ok_or_else(|| Error::schema(field("RatingKey"), "required value is missing"))?;
    if key != value.rating_key() {
        return Err(Error::schema(
            field("RatingKey"),
            format!(
                "'{key}' does not match rating value {} (expected {})",
                value.as_str(),
                value.rating_key()
            ),
        ));
    }

    if raw.scores.is_some() {
        return Err(Error::schema(
            field("Scores"),
            "must be absent under the FHIS scheme",
        ));
    }

    Ok(FhisRating {
        value,
        date: optional_date(raw, field)?,
    })
}

fn rating_value(raw: &RawEstablishment, field: &dyn Fn(&str) -> String) -> Result<String> {
    raw.rating_value
        .clone()
        .map(RawText::into_string)
        .ok_or_else(|| Error::schema(field("RatingValue"), "required value is missing"))
}

fn optional_date(
    raw: &RawEstablishment,
    field: &dyn Fn(&str) -> String,
) -> Result<Option<NaiveDate>> {
    raw.rating_date
        .as_deref()
        .map(|text| parse_date(text, &field("RatingDate")))
        .transpose()
}

fn validate_scores(raw: &RawScores, field: &dyn Fn(&str) -> String) -> Result<Scores> {
    if let Some(extra) = raw.extra.keys().next() {
        return Err(Error::schema(
            field(&format!("Scores.{extra}")),
            "unexpected sub-score field",
        ));
    }

    let score = |category: ScoreCategory, value: Option<&serde_json::Value>| -> Result<u8> {
        let name = field(&format!("Scores.{}", category.field_name()));
        let value = integer(value, &name)?
            .ok_or_else(|| Error::schema(&name, "required value is missing"))?;
        if !SCORE_DOMAINS.contains(category, value) {
            let allowed: Vec<String> = SCORE_DOMAINS
                .domain(category)
                .iter()
                .map(ToString::to_string)
                .collect();
            return Err(Error::schema(
                name,
                format!("{value} is not one of {}", allowed.join(", ")),
            ));
        }
        // Domain members are u8 by construction.
        u8::try_from(value).map_err(|_| Error::schema(field("Scores"), "score out of range"))
    };

    Ok(Scores {
        hygiene: score(ScoreCategory::Hygiene, raw.hygiene.as_ref())?,
        structural: score(ScoreCategory::Structural, raw.structural.as_ref())?,
        confidence_in_management: score(
            ScoreCategory::ConfidenceInManagement,
            raw.confidence_in_management.as_ref(),
        )?,
    })
}

fn validate_address(raw: &RawEstablishment, field: &dyn Fn(&str) -> String) -> Result<Address> {
    let line = |value: &Option<String>| {
        value
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(ToString::to_string)
    };
    let lines = AddressLines {
        line1: line(&raw.address_line1),
        line2: line(&raw.address_line2),
        line3: line(&raw.address_line3),
        line4: line(&raw.address_line4),
        postcode: line(&raw.post_code),
    };

    match &raw.geocode {
        None
        | Some(RawGeocode {
            longitude: None,
            latitude: None,
        }) => Ok(Address::NotGeocoded { lines }),
        Some(RawGeocode {
            longitude: Some(longitude),
            latitude: Some(latitude),
        }) => Ok(Address::Geocoded {
            latitude: coordinate(latitude, 90.0, &field("Geocode.Latitude"))?,
            longitude: coordinate(longitude, 180.0, &field("Geocode.Longitude"))?,
            lines,
        }),
        Some(RawGeocode {
            longitude: None, ..
        }) => Err(Error::schema(
            field("Geocode.Longitude"),
            "latitude is present without longitude",
        )),
        Some(RawGeocode { latitude: None, .. }) => Err(Error::schema(
            field("Geocode.Latitude"),
            "longitude is present without latitude",
        )),
    }
}

/// A JSON integer, or `None` for an absent or null value. Strings holding
/// digits are not integers.
fn integer(value: Option<&serde_json::Value>, field: &str) -> Result<Option<i64>> {
    match value {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(value) => value
            .as_i64()
            .map(Some)
            .ok_or_else(|| Error::schema(field, format!("{value} is not an integer"))),
    }
}

fn coordinate(raw: &RawText, limit: f64, field: &str) -> Result<f64> {
    let text = raw.clone().into_string();
    match text.parse::<f64>() {
        Ok(value) if value.is_finite() && value.abs() <= limit => Ok(value),
        _ => Err(Error::schema(
            field,
            format!("'{text}' is not a coordinate within ±{limit}"),
        )),
    }
}

fn parse_date(text: &str, field: &str) -> Result<NaiveDate> {
    let text = text.trim();
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S")
        .map(|datetime| datetime.date())
        .or_else(|_| NaiveDate::parse_from_str(text, "%Y-%m-%d"))
        .map_err(|_| {
            Error::schema(
                field,
                format!("'{text}' is not a date (expected YYYY-MM-DD or YYYY-MM-DDTHH:MM:SS)"),
            )
        })
}
