//! Matching availability records against dates, services and bookings.
//!
//! Everything here is a linear scan over the records handed in. The lists are
//! small (a studio publishes a handful of availability windows), so nothing is
//! indexed or cached.

use crate::types::{Availability, Schedule};
use chrono::NaiveDate;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// How the services of several availability records covering the same date
/// are combined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ServiceMerge {
    /// A service is bookable if any covering record offers it.
    #[default]
    Union,
    /// A service is bookable only if every covering record offers it.
    Intersection,
}

fn covering(records: &[Availability], date: NaiveDate) -> impl Iterator<Item = &Availability> {
    records.iter().filter(move |record| record.contains(date))
}

fn push_unique(values: &mut Vec<String>, value: &str) {
    if !values.iter().any(|existing| existing == value) {
        values.push(value.to_string());
    }
}

/// Every date contained in at least one record, ascending.
pub fn covered_dates(records: &[Availability]) -> Vec<NaiveDate> {
    let mut dates = BTreeSet::new();
    for record in records {
        dates.extend(
            record
                .start_date
                .iter_days()
                .take_while(|date| *date <= record.end_date),
        );
    }
    dates.into_iter().collect()
}

pub fn services_for_date(
    records: &[Availability],
    date: NaiveDate,
    merge: ServiceMerge,
) -> Vec<String> {
    let mut services = Vec::new();
    for record in covering(records, date) {
        for service in &record.services {
            push_unique(&mut services, service);
        }
    }

    if merge == ServiceMerge::Intersection {
        services.retain(|service| covering(records, date).all(|record| record.offers(service)));
    }
    services
}

/// Timeslots in which all of `services` can be booked on `date`.
///
/// The relevant records are those covering `date` that offer at least one of
/// the requested services. A requested service that none of them offers makes
/// the whole request unbookable.
pub fn timeslots_for(records: &[Availability], date: NaiveDate, services: &[String]) -> Vec<String> {
    if services.is_empty() {
        return vec![];
    }

    let matching: Vec<&Availability> = covering(records, date)
        .filter(|record| services.iter().any(|service| record.offers(service)))
        .collect();

    let every_service_offered = services
        .iter()
        .all(|service| matching.iter().any(|record| record.offers(service)));
    let Some((first, rest)) = matching.split_first() else {
        return vec![];
    };
    if !every_service_offered {
        return vec![];
    }

    let mut timeslots = Vec::new();
    for timeslot in &first.timeslots {
        if rest.iter().all(|record| record.timeslots.contains(timeslot)) {
            push_unique(&mut timeslots, timeslot);
        }
    }
    timeslots
}

/// Two records collide when their date ranges overlap and they share a
/// service.
pub fn collides(a: &Availability, b: &Availability) -> bool {
    a.start_date <= b.end_date
        && b.start_date <= a.end_date
        && a.services.iter().any(|service| b.offers(service))
}

/// First existing record colliding with `candidate`, skipping the record with
/// id `exclude`.
pub fn find_collision<'a>(
    existing: &'a [Availability],
    candidate: &Availability,
    exclude: Option<i32>,
) -> Option<&'a Availability> {
    existing
        .iter()
        .filter(|record| exclude.is_none() || record.id != exclude)
        .find(|record| collides(record, candidate))
}

/// Timeslots of `schedule` that its date and services don't allow.
pub fn unoffered_timeslots<'a>(records: &[Availability], schedule: &'a Schedule) -> Vec<&'a str> {
    let offered = timeslots_for(records, schedule.selected_date, &schedule.services);
    schedule
        .timeslots
        .iter()
        .filter(|timeslot| !offered.contains(*timeslot))
        .map(String::as_str)
        .collect()
}

/// First timeslot of `candidate` already held by another schedule on the same
/// date, skipping the schedule with uid `exclude`.
pub fn double_booked<'a>(
    existing: &[Schedule],
    candidate: &'a Schedule,
    exclude: Option<&str>,
) -> Option<&'a str> {
    let taken: Vec<&String> = existing
        .iter()
        .filter(|schedule| Some(schedule.uid.as_str()) != exclude)
        .filter(|schedule| schedule.selected_date == candidate.selected_date)
        .flat_map(|schedule| &schedule.timeslots)
        .collect();

    candidate
        .timeslots
        .iter()
        .find(|timeslot| taken.contains(timeslot))
        .map(String::as_str)
}
