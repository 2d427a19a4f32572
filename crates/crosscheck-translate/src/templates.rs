//! Parameterized SQL templates for the common check families.

use crosscheck_core::{TableInfo, ValidationProposal, ValidationType, qualified_ident, quote_ident};

use crate::resolve::{
    JoinSpec, ResolvedProposal, creation_column, date_pair, status_column, uniqueness_column,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateKind {
    OrphanCount,
    PairedDates,
    JoinedStatus,
    DuplicateGroups,
}

impl TemplateKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateKind::OrphanCount => "orphan-count",
            TemplateKind::PairedDates => "paired-dates",
            TemplateKind::JoinedStatus => "joined-status",
            TemplateKind::DuplicateGroups => "duplicate-groups",
        }
    }

    fn for_type(validation_type: ValidationType) -> Option<Self> {
        match validation_type {
            ValidationType::ReferentialIntegrity => Some(TemplateKind::OrphanCount),
            ValidationType::TemporalConsistency => Some(TemplateKind::PairedDates),
            ValidationType::StatusConsistency => Some(TemplateKind::JoinedStatus),
            ValidationType::Uniqueness => Some(TemplateKind::DuplicateGroups),
            _ => None,
        }
    }
}

/// Lexical cues per template, in match order.
const CUES: &[(TemplateKind, &[&str])] = &[
    (
        TemplateKind::OrphanCount,
        &[
            "orphan", "referential", "foreign key", "dangling", "without a matching",
            "without matching", "missing parent", "non-existent", "nonexistent", "integrity",
            "must exist", "references",
        ],
    ),
    (
        TemplateKind::PairedDates,
        &[
            "before", "after", "earlier", "later", "chronolog", "precede", "temporal",
            "date order", "timeline",
        ],
    ),
    (
        TemplateKind::JoinedStatus,
        &["status", "state", "inactive", "cancelled", "canceled", "closed", "terminal"],
    ),
    (
        TemplateKind::DuplicateGroups,
        &["duplicate", "unique", "uniqueness", "more than once", "repeated"],
    ),
];

const TERMINAL_STATUSES: &[&str] = &[
    "cancelled", "canceled", "closed", "inactive", "archived", "disabled", "suspended",
    "deleted", "terminated", "expired", "rejected",
];

const ACTIVE_STATUSES: &[&str] = &["active", "open", "pending", "processing", "new", "in_progress"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateMatch {
    pub kind: TemplateKind,
    pub sql: String,
}

/// Try the template for the proposal's type, then templates whose cues
/// appear in the description. A template that cannot parameterize itself
/// from the resolved tables does not match.
pub fn match_template(
    proposal: &ValidationProposal,
    resolved: &ResolvedProposal<'_>,
) -> Option<TemplateMatch> {
    let preferred = TemplateKind::for_type(proposal.validation_type);
    if let Some(kind) = preferred {
        if let Some(sql) = render(kind, proposal, resolved) {
            return Some(TemplateMatch { kind, sql });
        }
    }

    let description = proposal.description.to_lowercase();
    CUES.iter()
        .filter(|(kind, _)| Some(*kind) != preferred)
        .filter(|(_, cues)| cues.iter().any(|cue| description.contains(cue)))
        .find_map(|(kind, _)| {
            render(*kind, proposal, resolved).map(|sql| TemplateMatch { kind: *kind, sql })
        })
}

fn render(
    kind: TemplateKind,
    proposal: &ValidationProposal,
    resolved: &ResolvedProposal<'_>,
) -> Option<String> {
    match kind {
        TemplateKind::OrphanCount => resolved.join.as_ref().map(orphan_count),
        TemplateKind::PairedDates => paired_dates(resolved),
        TemplateKind::JoinedStatus => joined_status(resolved),
        TemplateKind::DuplicateGroups => duplicate_groups(resolved, &proposal.description),
    }
}

fn orphan_count(join: &JoinSpec<'_>) -> String {
    let child = ident(join.child);
    let parent = ident(join.parent);
    let cc = quote_ident(&join.child_column.name);
    let pc = quote_ident(&join.parent_column.name);
    format!(
        "-- orphan check: child rows without a matching parent key\n\
         select\n  \
           count(*) as total_records,\n  \
           count(*) filter (where c.{cc} is not null and p.{pc} is null) as orphaned_records,\n  \
           count(*) filter (where c.{cc} is null or p.{pc} is not null) as valid_records\n\
         from {child} c\n\
         left join (select distinct {pc} from {parent}) p on p.{pc} = c.{cc}"
    )
}

fn paired_dates(resolved: &ResolvedProposal<'_>) -> Option<String> {
    if let Some(first) = resolved.tables.first() {
        if let Some(sql) = dates_within(first) {
            return Some(sql);
        }
    }
    if let Some(join) = &resolved.join {
        if let (Some(child_date), Some(parent_date)) =
            (creation_column(join.child), creation_column(join.parent))
        {
            return Some(format!(
                "-- date order: child date must not precede parent date\n\
                 select\n  \
                   count(*) as total_records,\n  \
                   count(*) filter (where c.{} < p.{}) as invalid_records\n\
                 from {} c\n\
                 join {} p on p.{} = c.{}",
                quote_ident(&child_date.name),
                quote_ident(&parent_date.name),
                ident(join.child),
                ident(join.parent),
                quote_ident(&join.parent_column.name),
                quote_ident(&join.child_column.name),
            ));
        }
    }
    resolved.tables.iter().skip(1).find_map(|table| dates_within(table))
}

fn dates_within(table: &TableInfo) -> Option<String> {
    let (start, end) = date_pair(table)?;
    Some(format!(
        "-- date order: end date must not precede start date\n\
         select\n  \
           count(*) as total_records,\n  \
           count(*) filter (where t.{end} < t.{start}) as invalid_records\n\
         from {table} t",
        end = quote_ident(&end.name),
        start = quote_ident(&start.name),
        table = ident(table),
    ))
}

fn joined_status(resolved: &ResolvedProposal<'_>) -> Option<String> {
    if let Some(join) = &resolved.join {
        if let Some(parent_status) = status_column(join.parent) {
            let terminal = format!(
                "lower(p.{}::text) in ({})",
                quote_ident(&parent_status.name),
                literal_list(TERMINAL_STATUSES)
            );
            let (label, condition) = match status_column(join.child) {
                Some(child_status) => (
                    "active",
                    format!(
                        "{terminal} and lower(c.{}::text) in ({})",
                        quote_ident(&child_status.name),
                        literal_list(ACTIVE_STATUSES)
                    ),
                ),
                None => ("any", terminal),
            };
            return Some(format!(
                "-- status check: {label} child rows under a terminal parent\n\
                 select\n  \
                   count(*) as total_records,\n  \
                   count(*) filter (where {condition}) as invalid_records\n\
                 from {} c\n\
                 join {} p on p.{} = c.{}",
                ident(join.child),
                ident(join.parent),
                quote_ident(&join.parent_column.name),
                quote_ident(&join.child_column.name),
            ));
        }
    }

    let (table, status) = resolved
        .tables
        .iter()
        .find_map(|table| status_column(table).map(|status| (*table, status)))?;
    let column = quote_ident(&status.name);
    Some(format!(
        "-- status check: blank status values\n\
         select\n  \
           count(*) as total_records,\n  \
           count(*) filter (where t.{column} is null or btrim(t.{column}::text) = '') as invalid_records\n\
         from {} t",
        ident(table),
    ))
}

fn duplicate_groups(resolved: &ResolvedProposal<'_>, description: &str) -> Option<String> {
    let (table, column) = resolved.tables.iter().find_map(|table| {
        uniqueness_column(table, description).map(|column| (*table, column))
    })?;
    let name = ident(table);
    let col = quote_ident(&column.name);
    Some(format!(
        "-- duplicate check: repeated non-null values\n\
         with value_counts as (\n  \
           select t.{col} as value, count(*) as occurrences\n  \
           from {name} t\n  \
           where t.{col} is not null\n  \
           group by t.{col}\n\
         )\n\
         select\n  \
           (select count(*) from {name}) as total_records,\n  \
           coalesce(sum(occurrences) filter (where occurrences > 1), 0)::bigint as duplicate_records,\n  \
           count(*) filter (where occurrences > 1) as duplicate_values\n\
         from value_counts"
    ))
}

fn ident(table: &TableInfo) -> String {
    qualified_ident(&table.schema, &table.name)
}

fn literal_list(values: &[&str]) -> String {
    values
        .iter()
        .map(|value| format!("'{value}'"))
        .collect::<Vec<_>>()
        .join(", ")
}
