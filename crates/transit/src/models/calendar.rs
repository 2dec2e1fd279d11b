//! Service calendar for determining when trips run.
//!
//! Only calendar_dates.txt is supported: a service runs on exactly the dates
//! listed with an "added" exception. There is no weekly base pattern.

use std::collections::{BTreeSet, HashMap, HashSet};

use chrono::NaiveDate;
use dashmap::DashMap;

use crate::identifiers::ServiceIdentifier;
use crate::models::types::{ExceptionType, ServiceException};

/// Determines which services operate on which dates
#[derive(Debug, Default)]
pub struct ServiceCalendar {
    dates_by_service: HashMap<ServiceIdentifier, BTreeSet<NaiveDate>>,
    services_by_date: HashMap<NaiveDate, HashSet<ServiceIdentifier>>,

    // Never evicted. The key space is bounded by distinct services times the
    // dates actually queried, and the calendar is immutable once built.
    activity_memo: DashMap<(ServiceIdentifier, NaiveDate), bool>,
}

impl ServiceCalendar {
    /// Build the calendar from calendar_dates rows. Removed exceptions are dropped.
    pub fn from_exceptions(exceptions: impl IntoIterator<Item = ServiceException>) -> Self {
        let mut dates_by_service: HashMap<ServiceIdentifier, BTreeSet<NaiveDate>> = HashMap::new();
        let mut services_by_date: HashMap<NaiveDate, HashSet<ServiceIdentifier>> = HashMap::new();

        for exception in exceptions {
            if exception.exception_type != ExceptionType::Added {
                continue;
            }
            dates_by_service
                .entry(exception.service_id.clone())
                .or_default()
                .insert(exception.date);
            services_by_date
                .entry(exception.date)
                .or_default()
                .insert(exception.service_id);
        }

        Self {
            dates_by_service,
            services_by_date,
            activity_memo: DashMap::new(),
        }
    }

    /// Ordered dates on which the service runs. Empty for unknown services.
    pub fn active_dates(&self, service_id: &ServiceIdentifier) -> Vec<NaiveDate> {
        self.dates_by_service
            .get(service_id)
            .map(|dates| dates.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Services running on `date`
    pub fn active_services(&self, date: NaiveDate) -> HashSet<ServiceIdentifier> {
        self.services_by_date.get(&date).cloned().unwrap_or_default()
    }

    /// Every date on which at least one service runs
    pub fn operating_dates(&self) -> impl Iterator<Item = &NaiveDate> {
        self.services_by_date.keys()
    }

    /// Check if the service runs on a given date
    ///
    /// The first lookup for a `(service, date)` pair is memoized; concurrent
    /// first lookups may both compute, which is harmless since they agree.
    pub fn is_active(&self, service_id: &ServiceIdentifier, date: NaiveDate) -> bool {
        let key = (service_id.clone(), date);
        if let Some(active) = self.activity_memo.get(&key) {
            return *active;
        }

        let active = self
            .services_by_date
            .get(&date)
            .is_some_and(|services| services.contains(service_id));
        self.activity_memo.insert(key, active);
        active
    }
}
