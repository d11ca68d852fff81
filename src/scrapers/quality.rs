//! Completeness scoring for merged office records.

use crate::models::{
    DetailedOfficeInfo, FeeSummary, OnlineServiceFlags, ProcessInfo, ServiceFlags, StaffContacts,
};

/// Form count at which the forms category earns full marks.
const FORM_COUNT_CAP: f64 = 10.0;

/// Score a merged record 0-100.
///
/// Deterministic and side-effect free; the weights are the contract.
/// Identity and contact fields carry 20 points, hours 10, service flags
/// 20, online flags 15, forms 15 (linear up to ten forms), staff 10,
/// fees 5, process info 5.
pub fn completeness(info: &DetailedOfficeInfo) -> u8 {
    let mut score = 0.0;

    // Identity + contact: 5 points each.
    if !info.office_name.is_empty() {
        score += 5.0;
    }
    if !info.address.is_empty() {
        score += 5.0;
    }
    if !info.phone.is_empty() {
        score += 5.0;
    }
    if !info.email.is_empty() {
        score += 5.0;
    }

    // Business hours: fraction of the week covered.
    score += (info.business_hours.days_set() as f64 / 7.0) * 10.0;

    // Service coverage.
    score += (info.services.count_set() as f64 / ServiceFlags::TOTAL as f64) * 20.0;
    score += (info.online_services.count_set() as f64 / OnlineServiceFlags::TOTAL as f64) * 15.0;

    // Forms: linear up to the cap.
    score += (info.forms.total() as f64 / FORM_COUNT_CAP).min(1.0) * 15.0;

    // Staff, fees, process info: coverage fractions.
    score += (info.staff_contacts.roles_filled() as f64 / StaffContacts::TOTAL as f64) * 10.0;
    score += (info.fee_structure.fields_set() as f64 / FeeSummary::TOTAL as f64) * 5.0;
    score += (info.process_info.fields_set() as f64 / ProcessInfo::TOTAL as f64) * 5.0;

    score.round().clamp(0.0, 100.0) as u8
}
