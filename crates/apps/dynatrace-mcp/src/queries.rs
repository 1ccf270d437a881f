//! DQL statements issued by the entity, log and event tools.

/// Maximum number of entities `find_entity_by_name` returns.
pub const ENTITY_SEARCH_LIMIT: usize = 50;

/// Entity tables searched by name, in result order.
const ENTITY_TABLES: &[&str] = &[
    "dt.entity.application",
    "dt.entity.service",
    "dt.entity.host",
    "dt.entity.process_group",
    "dt.entity.cloud_application",
    "dt.entity.kubernetes_cluster",
    "dt.entity.kubernetes_node",
    "dt.entity.kubernetes_namespace",
    "dt.entity.kubernetes_workload",
    "dt.entity.container_group",
    "dt.entity.container",
    "dt.entity.database_service",
    "dt.entity.cloud_application_instance",
    "dt.entity.ec2_instance",
    "dt.entity.azure_vm",
    "dt.entity.gcp_compute_instance",
];

/// Escape a value for use inside a double-quoted DQL string literal.
pub fn escape_string(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Search all monitored entity tables for names containing `entity_name`.
pub fn find_entity_query(entity_name: &str) -> String {
    let name = escape_string(entity_name);
    let fetch = |table: &str| {
        format!(
            "fetch {} | search \"*{}*\" | fieldsAdd entity.type",
            table, name
        )
    };

    let mut dql = String::new();
    for (i, table) in ENTITY_TABLES.iter().enumerate() {
        if i == 0 {
            dql.push_str(&fetch(table));
        } else {
            dql.push_str(&format!("\n| append [{}]", fetch(table)));
        }
    }
    dql.push_str(&format!("\n| limit {}", ENTITY_SEARCH_LIMIT));
    dql
}

/// Logs whose source entity is `entity`.
pub fn logs_for_entity_query(entity: &str) -> String {
    format!(
        "fetch logs | filter dt.source_entity == \"{}\"",
        escape_string(entity)
    )
}

/// Events of one Kubernetes cluster, or of every cluster when `None`.
pub fn kubernetes_events_query(cluster_id: Option<&str>) -> String {
    match cluster_id.map(str::trim).filter(|id| !id.is_empty()) {
        Some(id) => format!(
            "fetch events | filter k8s.cluster.uid == \"{}\"",
            escape_string(id)
        ),
        None => "fetch events | filter isNotNull(k8s.cluster.uid)".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_string() {
        assert_eq!(escape_string("plain"), "plain");
        assert_eq!(escape_string("say \"hi\""), "say \\\"hi\\\"");
        assert_eq!(escape_string("C:\\temp"), "C:\\\\temp");
    }

    #[test]
    fn test_find_entity_query_covers_all_tables() {
        let dql = find_entity_query("checkout");

        assert!(dql.starts_with(
            "fetch dt.entity.application | search \"*checkout*\" | fieldsAdd entity.type"
        ));
        assert_eq!(dql.matches("| append [").count(), ENTITY_TABLES.len() - 1);
        assert!(
            dql.contains("append [fetch dt.entity.gcp_compute_instance | search \"*checkout*\"")
        );
        assert!(dql.ends_with("| limit 50"));
    }

    #[test]
    fn test_find_entity_query_escapes_quotes() {
        let dql = find_entity_query("a\" | fetch logs");
        assert!(dql.contains("search \"*a\\\" | fetch logs*\""));
    }

    #[test]
    fn test_logs_for_entity_query() {
        assert_eq!(
            logs_for_entity_query("HOST-1"),
            "fetch logs | filter dt.source_entity == \"HOST-1\""
        );
    }

    #[test]
    fn test_kubernetes_events_query() {
        assert_eq!(
            kubernetes_events_query(Some("uid-1")),
            "fetch events | filter k8s.cluster.uid == \"uid-1\""
        );
        assert_eq!(
            kubernetes_events_query(None),
            "fetch events | filter isNotNull(k8s.cluster.uid)"
        );
        assert_eq!(
            kubernetes_events_query(Some("  ")),
            "fetch events | filter isNotNull(k8s.cluster.uid)"
        );
    }
}
