//! The merged office record handed to downstream collaborators.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::PermitRequirements;

/// Kind of government running the office.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Jurisdiction {
    City,
    County,
    State,
    SpecialDistrict,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reliability {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    Verified,
    Unverified,
    Outdated,
}

/// How the record was obtained. `Api` exists for downstream
/// compatibility; this engine only produces `Static` and `Dynamic`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrapingMethod {
    Static,
    Dynamic,
    Api,
}

/// Business hours keyed by weekday. A missing entry means the day was
/// not found on the site, not that the office is closed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BusinessHours {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monday: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tuesday: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wednesday: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thursday: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub friday: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saturday: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sunday: Option<String>,
}

impl BusinessHours {
    pub fn is_empty(&self) -> bool {
        self.days_set() == 0
    }

    /// Number of weekdays with an hours entry.
    pub fn days_set(&self) -> usize {
        [
            &self.monday,
            &self.tuesday,
            &self.wednesday,
            &self.thursday,
            &self.friday,
            &self.saturday,
            &self.sunday,
        ]
        .iter()
        .filter(|d| d.is_some())
        .count()
    }

    pub fn get(&self, day: &str) -> Option<&str> {
        let slot = match day {
            "monday" => &self.monday,
            "tuesday" => &self.tuesday,
            "wednesday" => &self.wednesday,
            "thursday" => &self.thursday,
            "friday" => &self.friday,
            "saturday" => &self.saturday,
            "sunday" => &self.sunday,
            _ => return None,
        };
        slot.as_deref()
    }

    pub fn set(&mut self, day: &str, value: String) {
        let slot = match day {
            "monday" => &mut self.monday,
            "tuesday" => &mut self.tuesday,
            "wednesday" => &mut self.wednesday,
            "thursday" => &mut self.thursday,
            "friday" => &mut self.friday,
            "saturday" => &mut self.saturday,
            "sunday" => &mut self.sunday,
            _ => return,
        };
        *slot = Some(value);
    }
}

/// The fixed permit-service map. One flag per service the office is
/// observed to provide.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceFlags {
    pub building_permits: bool,
    pub electrical_permits: bool,
    pub plumbing_permits: bool,
    pub mechanical_permits: bool,
    pub zoning_permits: bool,
    pub planning_review: bool,
    pub inspections: bool,
    pub site_inspections: bool,
    pub land_development: bool,
    pub subdivision_review: bool,
    pub variance_applications: bool,
    pub special_event_permits: bool,
    pub sign_permits: bool,
    pub demolition_permits: bool,
    pub fire_department_review: bool,
    pub health_department_review: bool,
    pub environmental_review: bool,
}

impl ServiceFlags {
    pub const TOTAL: usize = 17;

    pub fn flags(&self) -> [bool; Self::TOTAL] {
        [
            self.building_permits,
            self.electrical_permits,
            self.plumbing_permits,
            self.mechanical_permits,
            self.zoning_permits,
            self.planning_review,
            self.inspections,
            self.site_inspections,
            self.land_development,
            self.subdivision_review,
            self.variance_applications,
            self.special_event_permits,
            self.sign_permits,
            self.demolition_permits,
            self.fire_department_review,
            self.health_department_review,
            self.environmental_review,
        ]
    }

    pub fn count_set(&self) -> usize {
        self.flags().iter().filter(|f| **f).count()
    }

    /// Field-wise OR. A flag set by any source stays set.
    pub fn merge(self, other: Self) -> Self {
        let mut out = self;
        out.building_permits |= other.building_permits;
        out.electrical_permits |= other.electrical_permits;
        out.plumbing_permits |= other.plumbing_permits;
        out.mechanical_permits |= other.mechanical_permits;
        out.zoning_permits |= other.zoning_permits;
        out.planning_review |= other.planning_review;
        out.inspections |= other.inspections;
        out.site_inspections |= other.site_inspections;
        out.land_development |= other.land_development;
        out.subdivision_review |= other.subdivision_review;
        out.variance_applications |= other.variance_applications;
        out.special_event_permits |= other.special_event_permits;
        out.sign_permits |= other.sign_permits;
        out.demolition_permits |= other.demolition_permits;
        out.fire_department_review |= other.fire_department_review;
        out.health_department_review |= other.health_department_review;
        out.environmental_review |= other.environmental_review;
        out
    }
}

/// Online self-service capabilities advertised by the office.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnlineServiceFlags {
    pub online_applications: bool,
    pub online_payments: bool,
    pub permit_tracking: bool,
    pub scheduling_inspections: bool,
    pub document_submission: bool,
    pub status_updates: bool,
    pub renewals: bool,
    pub appeals: bool,
}

impl OnlineServiceFlags {
    pub const TOTAL: usize = 8;

    pub fn flags(&self) -> [bool; Self::TOTAL] {
        [
            self.online_applications,
            self.online_payments,
            self.permit_tracking,
            self.scheduling_inspections,
            self.document_submission,
            self.status_updates,
            self.renewals,
            self.appeals,
        ]
    }

    pub fn count_set(&self) -> usize {
        self.flags().iter().filter(|f| **f).count()
    }

    pub fn merge(self, other: Self) -> Self {
        let mut out = self;
        out.online_applications |= other.online_applications;
        out.online_payments |= other.online_payments;
        out.permit_tracking |= other.permit_tracking;
        out.scheduling_inspections |= other.scheduling_inspections;
        out.document_submission |= other.document_submission;
        out.status_updates |= other.status_updates;
        out.renewals |= other.renewals;
        out.appeals |= other.appeals;
        out
    }
}

/// Named self-service portal links.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Portals {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permits: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payments: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inspections: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub planning: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub citizen: Option<String>,
}

impl Portals {
    /// Fill unset fields from `other`. Existing values win.
    pub fn merge_missing(&mut self, other: Self) {
        merge_option(&mut self.permits, other.permits);
        merge_option(&mut self.payments, other.payments);
        merge_option(&mut self.inspections, other.inspections);
        merge_option(&mut self.planning, other.planning);
        merge_option(&mut self.citizen, other.citizen);
    }
}

/// Free-text fee summary lines, one per fee category found.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeeSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub building_permit_fees: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inspection_fees: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan_review_fees: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expedited_service_fees: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fee_schedule_url: Option<String>,
}

impl FeeSummary {
    pub fn fields_set(&self) -> usize {
        [
            &self.building_permit_fees,
            &self.inspection_fees,
            &self.plan_review_fees,
            &self.expedited_service_fees,
            &self.fee_schedule_url,
        ]
        .iter()
        .filter(|f| f.is_some())
        .count()
    }

    pub const TOTAL: usize = 5;

    pub fn merge_missing(&mut self, other: Self) {
        merge_option(&mut self.building_permit_fees, other.building_permit_fees);
        merge_option(&mut self.inspection_fees, other.inspection_fees);
        merge_option(&mut self.plan_review_fees, other.plan_review_fees);
        merge_option(
            &mut self.expedited_service_fees,
            other.expedited_service_fees,
        );
        merge_option(&mut self.fee_schedule_url, other.fee_schedule_url);
    }
}

/// One named staff member with optional direct contact details.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StaffContact {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// The five staff roles worth naming on a permit office record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StaffContacts {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub building_official: Option<StaffContact>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chief_inspector: Option<StaffContact>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan_reviewer: Option<StaffContact>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zoning_administrator: Option<StaffContact>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permit_coordinator: Option<StaffContact>,
}

impl StaffContacts {
    pub const TOTAL: usize = 5;

    pub fn roles_filled(&self) -> usize {
        [
            &self.building_official,
            &self.chief_inspector,
            &self.plan_reviewer,
            &self.zoning_administrator,
            &self.permit_coordinator,
        ]
        .iter()
        .filter(|r| r.as_ref().is_some_and(|c| !c.name.is_empty()))
        .count()
    }

    pub fn merge_missing(&mut self, other: Self) {
        merge_option(&mut self.building_official, other.building_official);
        merge_option(&mut self.chief_inspector, other.chief_inspector);
        merge_option(&mut self.plan_reviewer, other.plan_reviewer);
        merge_option(&mut self.zoning_administrator, other.zoning_administrator);
        merge_option(&mut self.permit_coordinator, other.permit_coordinator);
    }
}

/// A downloadable or linked form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormLink {
    pub name: String,
    pub url: String,
    /// "PDF", "DOC", "XLS", or "LINK".
    pub file_type: String,
}

/// Forms grouped by permit category.
///
/// Lists are concatenated across sources without deduplication: a
/// duplicate form link is harmless downstream, a dropped one is not.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormCategories {
    pub building: Vec<FormLink>,
    pub electrical: Vec<FormLink>,
    pub plumbing: Vec<FormLink>,
    pub mechanical: Vec<FormLink>,
    pub zoning: Vec<FormLink>,
    pub planning: Vec<FormLink>,
    pub other: Vec<FormLink>,
}

impl FormCategories {
    pub fn total(&self) -> usize {
        self.building.len()
            + self.electrical.len()
            + self.plumbing.len()
            + self.mechanical.len()
            + self.zoning.len()
            + self.planning.len()
            + self.other.len()
    }

    pub fn push(&mut self, category: &str, form: FormLink) {
        match category {
            "building" => self.building.push(form),
            "electrical" => self.electrical.push(form),
            "plumbing" => self.plumbing.push(form),
            "mechanical" => self.mechanical.push(form),
            "zoning" => self.zoning.push(form),
            "planning" => self.planning.push(form),
            _ => self.other.push(form),
        }
    }

    /// Concatenate `other` onto this set, category by category.
    pub fn extend(&mut self, other: Self) {
        self.building.extend(other.building);
        self.electrical.extend(other.electrical);
        self.plumbing.extend(other.plumbing);
        self.mechanical.extend(other.mechanical);
        self.zoning.extend(other.zoning);
        self.planning.extend(other.planning);
        self.other.extend(other.other);
    }
}

/// Application process details.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permit_process_steps: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub typical_processing_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requirements_checklist: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inspection_types: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub appeal_process: Option<String>,
}

impl ProcessInfo {
    pub const TOTAL: usize = 5;

    pub fn fields_set(&self) -> usize {
        self.permit_process_steps.is_some() as usize
            + self.typical_processing_time.is_some() as usize
            + self.requirements_checklist.is_some() as usize
            + self.inspection_types.is_some() as usize
            + self.appeal_process.is_some() as usize
    }

    pub fn merge_missing(&mut self, other: Self) {
        merge_option(&mut self.permit_process_steps, other.permit_process_steps);
        merge_option(
            &mut self.typical_processing_time,
            other.typical_processing_time,
        );
        merge_option(
            &mut self.requirements_checklist,
            other.requirements_checklist,
        );
        merge_option(&mut self.inspection_types, other.inspection_types);
        merge_option(&mut self.appeal_process, other.appeal_process);
    }
}

/// An emergency contact line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmergencyContact {
    pub kind: String,
    pub phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hours: Option<String>,
}

/// Notices, meeting schedules, and other loose ends.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdditionalInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_notice_requirements: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meeting_schedules: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub emergency_contacts: Vec<EmergencyContact>,
}

impl AdditionalInfo {
    pub fn merge_missing(&mut self, other: Self) {
        merge_option(
            &mut self.public_notice_requirements,
            other.public_notice_requirements,
        );
        merge_option(&mut self.meeting_schedules, other.meeting_schedules);
        if self.emergency_contacts.is_empty() {
            self.emergency_contacts = other.emergency_contacts;
        }
    }
}

/// Provenance and trust metadata for a scraped record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeMetadata {
    pub last_scraped: DateTime<Utc>,
    /// Completeness score in [0, 100].
    pub data_completeness: u8,
    pub source_reliability: Reliability,
    pub validation_status: ValidationStatus,
    pub scraping_method: ScrapingMethod,
}

impl Default for ScrapeMetadata {
    fn default() -> Self {
        Self {
            last_scraped: Utc::now(),
            data_completeness: 0,
            source_reliability: Reliability::Medium,
            validation_status: ValidationStatus::Unverified,
            scraping_method: ScrapingMethod::Static,
        }
    }
}

/// The final merged permit office record.
///
/// Downstream collaborators persist this as-is; it owns no on-disk
/// format.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetailedOfficeInfo {
    pub office_name: String,
    pub department: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jurisdiction: Option<Jurisdiction>,

    pub address: String,
    pub phone: String,
    pub email: String,
    pub website: String,

    pub business_hours: BusinessHours,
    pub services: ServiceFlags,
    pub online_services: OnlineServiceFlags,
    pub portals: Portals,
    pub fee_structure: FeeSummary,
    pub staff_contacts: StaffContacts,
    pub forms: FormCategories,
    pub process_info: ProcessInfo,
    /// Crawl-session roll-up (fees, timelines, contacts, documents).
    pub requirements: PermitRequirements,
    pub additional_info: AdditionalInfo,

    #[serde(default)]
    pub metadata: ScrapeMetadata,
}

fn merge_option<T>(target: &mut Option<T>, source: Option<T>) {
    if target.is_none() {
        *target = source;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_flags_merge_never_clears() {
        let a = ServiceFlags {
            building_permits: true,
            ..Default::default()
        };
        let b = ServiceFlags {
            electrical_permits: true,
            building_permits: false,
            ..Default::default()
        };
        let merged = a.merge(b);
        assert!(merged.building_permits);
        assert!(merged.electrical_permits);
        assert_eq!(merged.count_set(), 2);
    }

    #[test]
    fn portals_merge_prefers_existing() {
        let mut a = Portals {
            permits: Some("https://a.example.gov/permits".into()),
            ..Default::default()
        };
        a.merge_missing(Portals {
            permits: Some("https://b.example.gov/permits".into()),
            payments: Some("https://b.example.gov/pay".into()),
            ..Default::default()
        });
        assert_eq!(a.permits.as_deref(), Some("https://a.example.gov/permits"));
        assert_eq!(a.payments.as_deref(), Some("https://b.example.gov/pay"));
    }

    #[test]
    fn hours_day_accessors() {
        let mut hours = BusinessHours::default();
        hours.set("monday", "8:00 am - 5:00 pm".into());
        hours.set("noday", "ignored".into());
        assert_eq!(hours.days_set(), 1);
        assert_eq!(hours.get("monday"), Some("8:00 am - 5:00 pm"));
        assert_eq!(hours.get("noday"), None);
    }
}
