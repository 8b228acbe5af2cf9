use policyrag_core::types::MetadataFilter;

/// Render a metadata filter as a LanceDB `only_if` predicate.
pub fn filter_to_sql(filter: &MetadataFilter) -> Option<String> {
    let mut clauses = Vec::new();
    if let Some(policy_type) = &filter.policy_type {
        clauses.push(format!("policy_type_key = '{}'", escape(&policy_type.to_lowercase())));
    }
    if let Some(number) = &filter.policy_number {
        clauses.push(format!("policy_number = '{}'", escape(number)));
    }
    if clauses.is_empty() { None } else { Some(clauses.join(" AND ")) }
}

fn escape(value: &str) -> String { value.replace('\'', "''") }
