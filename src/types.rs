use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use validator::{Validate, ValidationError};

pub const DEFAULT_IMAGE: &str = "default-image.jpg";
const MIN_TITLE_LENGTH: usize = 3;
/// Longest accepted availability window, in days.
const MAX_AVAILABILITY_DAYS: i64 = 3 * 366;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "PascalCase")]
#[validate(schema(function = "validate_date_range"))]
pub struct Availability {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i32>,
    #[serde(with = "calendar_date")]
    pub start_date: NaiveDate,
    #[serde(with = "calendar_date")]
    pub end_date: NaiveDate,
    #[validate(
        length(min = 1, message = "at least one timeslot is required"),
        custom(function = "no_blank_entries")
    )]
    pub timeslots: Vec<String>,
    #[validate(
        length(min = 1, message = "at least one service is required"),
        custom(function = "no_blank_entries")
    )]
    pub services: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl Availability {
    /// Both bounds are inclusive.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }

    pub fn offers(&self, service: &str) -> bool {
        self.services.iter().any(|offered| offered == service)
    }
}

/// A booked appointment. `uid` is the stable key, ids are only assigned by
/// persistent backends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "PascalCase")]
pub struct Schedule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i32>,
    #[validate(custom(function = "not_blank"))]
    pub contact_name: String,
    #[serde(with = "calendar_date")]
    pub selected_date: NaiveDate,
    #[validate(
        length(min = 1, message = "at least one service is required"),
        custom(function = "no_blank_entries")
    )]
    pub services: Vec<String>,
    #[validate(
        length(min = 1, message = "at least one timeslot is required"),
        custom(function = "no_blank_entries")
    )]
    pub timeslots: Vec<String>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub uid: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "PascalCase")]
pub struct PricingPlan {
    #[validate(custom(function = "not_blank"))]
    pub name: String,
    #[serde(default)]
    pub initial_setup_fee: String,
    #[serde(default)]
    pub monthly_subscription: String,
    #[serde(default)]
    pub features: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "PascalCase")]
pub struct Service {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i32>,
    #[validate(custom(function = "title_length"))]
    pub title: String,
    #[validate(length(min = 10, message = "description needs at least 10 characters"))]
    pub description: String,
    #[serde(default)]
    pub file_name: String,
    #[validate(range(min = 0.0, message = "price can't be negative"))]
    pub price: f64,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    #[validate(nested)]
    pub pricing_plans: Vec<PricingPlan>,
}

impl Service {
    pub fn normalize(mut self) -> Self {
        self.title = self.title.trim().to_string();
        if self.file_name.trim().is_empty() {
            self.file_name = DEFAULT_IMAGE.into();
        }
        self
    }

    pub fn has_title(&self, title: &str) -> bool {
        self.title.trim().to_lowercase() == title.trim().to_lowercase()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i16", into = "i16")]
pub enum UserRole {
    Admin = 1,
    Owner = 2,
    Subscriber = 3,
}

impl From<UserRole> for i16 {
    fn from(role: UserRole) -> i16 {
        role as i16
    }
}

impl TryFrom<i16> for UserRole {
    type Error = String;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Admin),
            2 => Ok(Self::Owner),
            3 => Ok(Self::Subscriber),
            other => Err(format!("unknown user role {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i16", into = "i16")]
pub enum Provider {
    Google = 1,
    Facebook = 2,
    Apple = 3,
}

impl From<Provider> for i16 {
    fn from(provider: Provider) -> i16 {
        provider as i16
    }
}

impl TryFrom<i16> for Provider {
    type Error = String;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Google),
            2 => Ok(Self::Facebook),
            3 => Ok(Self::Apple),
            other => Err(format!("unknown sign-in provider {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "PascalCase")]
pub struct User {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub email_verified: bool,
    #[validate(custom(function = "not_blank"))]
    pub uid: String,
    pub role: UserRole,
    pub provider: Provider,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DateQuery {
    #[serde(with = "calendar_date")]
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "PascalCase")]
pub struct TimeslotQuery {
    #[serde(with = "calendar_date")]
    pub date: NaiveDate,
    #[serde(default)]
    pub services: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UploadResponse {
    pub file_name: String,
}

/// Body of successful requests that have nothing else to return.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

fn validate_date_range(availability: &Availability) -> Result<(), ValidationError> {
    if availability.start_date > availability.end_date {
        return Err(ValidationError::new("date_range")
            .with_message(Cow::from("start date must not be after end date")));
    }
    if (availability.end_date - availability.start_date).num_days() >= MAX_AVAILABILITY_DAYS {
        return Err(ValidationError::new("date_range")
            .with_message(Cow::from("availability may span at most three years")));
    }
    Ok(())
}

/// Titles are stored trimmed, so the minimum applies to the trimmed title.
fn title_length(title: &str) -> Result<(), ValidationError> {
    if title.trim().chars().count() < MIN_TITLE_LENGTH {
        return Err(ValidationError::new("length")
            .with_message(Cow::from("title needs at least 3 characters")));
    }
    Ok(())
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank").with_message(Cow::from("must not be blank")));
    }
    Ok(())
}

fn no_blank_entries(values: &[String]) -> Result<(), ValidationError> {
    if values.iter().any(|value| value.trim().is_empty()) {
        return Err(ValidationError::new("blank_entry")
            .with_message(Cow::from("entries must not be blank")));
    }
    Ok(())
}

/// Calendar dates on the wire. Browsers tend to send full RFC 3339
/// timestamps for date pickers, so both forms are accepted on input.
pub mod calendar_date {
    use chrono::{DateTime, NaiveDate};
    use serde::{de, Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%d";

    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&date.format(FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(de::Error::custom)
    }

    pub fn parse(raw: &str) -> Result<NaiveDate, String> {
        let raw = raw.trim();
        NaiveDate::parse_from_str(raw, FORMAT)
            .or_else(|_| DateTime::parse_from_rfc3339(raw).map(|datetime| datetime.date_naive()))
            .map_err(|err| format!("invalid date '{raw}': {err}"))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use test_case::test_case;

    fn availability(start: &str, end: &str) -> Availability {
        Availability {
            id: None,
            start_date: calendar_date::parse(start).unwrap(),
            end_date: calendar_date::parse(end).unwrap(),
            timeslots: vec!["9:00 AM - 10:00 AM".into()],
            services: vec!["Portrait Session".into()],
            description: None,
        }
    }

    #[test_case("2025-05-16", 2025, 5, 16 ; "plain date")]
    #[test_case("2025-05-16T00:00:00.000Z", 2025, 5, 16 ; "utc timestamp")]
    #[test_case("2025-05-16T23:30:00-05:00", 2025, 5, 16 ; "offset timestamp keeps written date")]
    #[test_case(" 2025-01-02 ", 2025, 1, 2 ; "surrounding whitespace")]
    fn parse_calendar_dates(raw: &str, year: i32, month: u32, day: u32) {
        assert_eq!(
            calendar_date::parse(raw).unwrap(),
            NaiveDate::from_ymd_opt(year, month, day).unwrap()
        );
    }

    #[test]
    fn reject_garbage_dates() {
        calendar_date::parse("16.05.2025").unwrap_err();
        calendar_date::parse("").unwrap_err();
    }

    #[test]
    fn availability_date_range_must_be_ordered() {
        availability("2025-05-01", "2025-05-01").validate().unwrap();
        availability("2025-05-01", "2025-05-31").validate().unwrap();
        availability("2025-05-31", "2025-05-01").validate().unwrap_err();
    }

    #[test_case("2025-01-01", "2027-12-31", true ; "just under three years")]
    #[test_case("2025-01-01", "2028-01-04", false ; "three years and more")]
    #[test_case("0001-01-01", "9999-12-31", false ; "whole calendar")]
    fn availability_range_is_capped(start: &str, end: &str, valid: bool) {
        assert_eq!(availability(start, end).validate().is_ok(), valid);
    }

    #[test]
    fn availability_needs_timeslots_and_services() {
        let mut record = availability("2025-05-01", "2025-05-02");
        record.timeslots.clear();
        record.validate().unwrap_err();

        let mut record = availability("2025-05-01", "2025-05-02");
        record.services = vec!["  ".into()];
        record.validate().unwrap_err();
    }

    #[test]
    fn availability_wire_format_is_pascal_case() {
        let json = r#"{
            "StartDate": "2025-05-01T00:00:00Z",
            "EndDate": "2025-05-03",
            "Timeslots": ["9:00 AM - 10:00 AM"],
            "Services": ["Wedding Photography"]
        }"#;
        let record: Availability = serde_json::from_str(json).unwrap();
        assert_eq!(record.id, None);
        assert!(record.contains(NaiveDate::from_ymd_opt(2025, 5, 3).unwrap()));
        assert!(!record.contains(NaiveDate::from_ymd_opt(2025, 5, 4).unwrap()));

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["StartDate"], "2025-05-01");
        assert!(value.get("Id").is_none());
    }

    #[test]
    fn service_defaults_and_normalization() {
        let json = r#"{"Title": "  Portrait Session ", "Description": "Studio portraits", "Price": 120}"#;
        let service: Service = serde_json::from_str(json).unwrap();
        service.validate().unwrap();
        let service = service.normalize();
        assert_eq!(service.title, "Portrait Session");
        assert_eq!(service.file_name, DEFAULT_IMAGE);
        assert!(service.has_title("portrait session"));
        assert!(service.features.is_empty());
    }

    #[test_case("Video", true ; "short word")]
    #[test_case("  ab  ", false ; "padded two characters")]
    #[test_case("      ", false ; "only spaces")]
    #[test_case(" Été ", true ; "non ascii")]
    fn service_title_length_ignores_padding(title: &str, valid: bool) {
        let service = Service {
            id: None,
            title: title.into(),
            description: "Event videography".into(),
            file_name: String::new(),
            price: 10.0,
            features: vec![],
            pricing_plans: vec![],
        };
        assert_eq!(service.validate().is_ok(), valid);
    }

    #[test]
    fn service_titles_compare_unicode_case_insensitively() {
        let service: Service = serde_json::from_str(
            r#"{"Title": "Été Portraits", "Description": "Summer portraits", "Price": 1}"#,
        )
        .unwrap();
        assert!(service.has_title("ÉTÉ PORTRAITS"));
        assert!(!service.has_title("Ete Portraits"));
    }

    #[test]
    fn service_rejects_negative_price_and_unnamed_plan() {
        let mut service: Service = serde_json::from_str(
            r#"{"Title": "Video", "Description": "Event videography", "Price": -1}"#,
        )
        .unwrap();
        service.validate().unwrap_err();

        service.price = 10.0;
        service.pricing_plans.push(PricingPlan {
            name: String::new(),
            initial_setup_fee: "$10".into(),
            monthly_subscription: "$1".into(),
            features: vec![],
        });
        service.validate().unwrap_err();
    }

    #[test_case(r#"{"Uid": "abc", "Role": 1, "Provider": 1}"#, true ; "admin via google")]
    #[test_case(r#"{"Uid": "abc", "Role": 3, "Provider": 3}"#, true ; "subscriber via apple")]
    #[test_case(r#"{"Uid": "abc", "Role": 4, "Provider": 1}"#, false ; "unknown role")]
    #[test_case(r#"{"Uid": "abc", "Role": 1, "Provider": 0}"#, false ; "unknown provider")]
    fn user_numeric_enums(json: &str, valid: bool) {
        let user = serde_json::from_str::<User>(json);
        assert_eq!(user.is_ok(), valid);
        if let Ok(user) = user {
            let value = serde_json::to_value(&user).unwrap();
            assert_eq!(value["Role"], i16::from(user.role));
        }
    }
}
