//! Static export templates
//!
//! A template fixes which record fields are exported, the human labels they
//! appear under, and the chunking thresholds of its export type. Templates
//! are validated once at registry construction; nothing downstream trusts
//! ad hoc field/header pairs.

use std::collections::HashMap;

use anyhow::Result;

use super::ExportType;

/// Per-export-type spreadsheet layout and chunking thresholds
#[derive(Debug, Clone)]
pub struct Template {
    pub name: &'static str,
    /// Source field names, in output column order
    pub fields: Vec<&'static str>,
    /// Human column labels; same length as `fields`
    pub headers: Vec<&'static str>,
    /// Above this record count, chunking is mandatory
    pub max_records_single_file: u64,
    /// Default chunk size when chunking, before planner clamping
    pub recommended_chunk_size: u64,
}

impl Template {
    fn validate(&self, export_type: ExportType) -> Result<()> {
        if self.fields.len() != self.headers.len() {
            anyhow::bail!(
                "template '{}' for '{export_type}': {} fields but {} headers",
                self.name,
                self.fields.len(),
                self.headers.len()
            );
        }
        if self.fields.is_empty() {
            anyhow::bail!("template '{}' for '{export_type}' has no fields", self.name);
        }
        if self.max_records_single_file == 0 || self.recommended_chunk_size == 0 {
            anyhow::bail!(
                "template '{}' for '{export_type}' has non-positive thresholds",
                self.name
            );
        }
        Ok(())
    }
}

/// Lookup table mapping (export type, template name) to a validated template
#[derive(Debug)]
pub struct TemplateRegistry {
    templates: HashMap<(ExportType, &'static str), Template>,
}

impl TemplateRegistry {
    /// Build the built-in template set, validating every entry.
    pub fn builtin() -> Result<Self> {
        let mut templates = HashMap::new();

        for (export_type, template) in builtin_templates() {
            template.validate(export_type)?;
            templates.insert((export_type, template.name), template);
        }

        Ok(Self { templates })
    }

    pub fn get(&self, export_type: ExportType, name: &str) -> Option<&Template> {
        self.templates
            .iter()
            .find(|((ty, n), _)| *ty == export_type && *n == name)
            .map(|(_, template)| template)
    }

    /// Template names available for an export type, for error messages
    pub fn names_for(&self, export_type: ExportType) -> Vec<&'static str> {
        let mut names: Vec<_> = self
            .templates
            .keys()
            .filter(|(ty, _)| *ty == export_type)
            .map(|(_, name)| *name)
            .collect();
        names.sort_unstable();
        names
    }
}

fn builtin_templates() -> Vec<(ExportType, Template)> {
    vec![
        (
            ExportType::Participants,
            Template {
                name: "standard",
                fields: vec![
                    "id",
                    "first_name",
                    "last_name",
                    "email",
                    "phone",
                    "registration_date",
                    "status",
                ],
                headers: vec![
                    "ID",
                    "First Name",
                    "Last Name",
                    "Email",
                    "Phone",
                    "Registration Date",
                    "Status",
                ],
                max_records_single_file: 10_000,
                recommended_chunk_size: 4_000,
            },
        ),
        (
            ExportType::Participants,
            Template {
                name: "detailed",
                fields: vec![
                    "id",
                    "first_name",
                    "last_name",
                    "email",
                    "phone",
                    "registration_date",
                    "status",
                    "ticket_type",
                    "amount_paid",
                    "checked_in",
                    "notes",
                ],
                headers: vec![
                    "ID",
                    "First Name",
                    "Last Name",
                    "Email",
                    "Phone",
                    "Registration Date",
                    "Status",
                    "Ticket Type",
                    "Amount Paid",
                    "Checked In",
                    "Notes",
                ],
                max_records_single_file: 5_000,
                recommended_chunk_size: 2_000,
            },
        ),
        (
            ExportType::Payments,
            Template {
                name: "standard",
                fields: vec![
                    "id",
                    "participant_id",
                    "amount",
                    "currency",
                    "status",
                    "payment_method",
                    "paid_at",
                ],
                headers: vec![
                    "ID",
                    "Participant ID",
                    "Amount",
                    "Currency",
                    "Status",
                    "Payment Method",
                    "Paid At",
                ],
                max_records_single_file: 10_000,
                recommended_chunk_size: 4_000,
            },
        ),
        (
            ExportType::Payments,
            Template {
                name: "detailed",
                fields: vec![
                    "id",
                    "participant_id",
                    "amount",
                    "fee",
                    "net_amount",
                    "currency",
                    "status",
                    "payment_method",
                    "reference",
                    "paid_at",
                    "refunded_at",
                ],
                headers: vec![
                    "ID",
                    "Participant ID",
                    "Amount",
                    "Fee",
                    "Net Amount",
                    "Currency",
                    "Status",
                    "Payment Method",
                    "Reference",
                    "Paid At",
                    "Refunded At",
                ],
                max_records_single_file: 5_000,
                recommended_chunk_size: 2_000,
            },
        ),
        (
            ExportType::Ambassadors,
            Template {
                name: "standard",
                fields: vec![
                    "id",
                    "name",
                    "email",
                    "referral_code",
                    "referrals",
                    "commission_total",
                    "status",
                    "joined_at",
                ],
                headers: vec![
                    "ID",
                    "Name",
                    "Email",
                    "Referral Code",
                    "Referrals",
                    "Commission Total",
                    "Status",
                    "Joined At",
                ],
                max_records_single_file: 10_000,
                recommended_chunk_size: 4_000,
            },
        ),
    ]
}
