//! Data models for permit office scraping.

mod office;
mod page;
mod requirements;

pub use office::{
    AdditionalInfo, BusinessHours, DetailedOfficeInfo, EmergencyContact, FeeSummary,
    FormCategories, FormLink, Jurisdiction, OnlineServiceFlags, Portals, ProcessInfo, Reliability,
    ScrapeMetadata, ScrapingMethod, ServiceFlags, StaffContact, StaffContacts, ValidationStatus,
};
pub use page::{
    CrawlConfig, CrawlSession, FieldDescriptor, FormDescriptor, PageRecord, TableRecord,
};
pub use requirements::{Contact, FeeStructure, PermitRequirements, Timeline, VariableFee};
